//! # Planning Requests
//!
//! End-to-end run used by the binary: read a JSON request, build the grocery
//! list and the cart, return both as one report.
//!
//! When a request carries no explicit requirements, they are derived from the
//! selected shopping-list entries, one per numeric amount.

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::aggregator::{select_entries, ShoppingListEntry};
use crate::cart::{build_cart, Cart};
use crate::config::PlannerConfig;
use crate::grocery_list::{GroceryItem, GroceryListBuilder};
use crate::ingredient_model::{IngredientRequirement, Recipe};
use crate::oracle::{GuardedOracle, HttpOracle, OracleAssistedMatcher};
use crate::procurement::{ProcurementMatcher, Product, Requirement, RequirementResolver};
use crate::unit_converter::TableConverter;

/// A recipe as written, quantities for the whole recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeInput {
    pub id: u64,
    pub name: String,
    /// Defaults to 4 when absent or not positive
    #[serde(default)]
    pub portions: Option<f64>,
    #[serde(default)]
    pub ingredients: Vec<IngredientRequirement>,
    #[serde(default)]
    pub instructions: String,
}

impl RecipeInput {
    pub fn to_recipe(&self) -> Result<Recipe> {
        let portions = self.portions.unwrap_or(0.0);
        let recipe = Recipe::from_requirements(self.id, &self.name, portions, &self.ingredients)
            .with_context(|| format!("Invalid recipe '{}'", self.name))?;
        Ok(recipe.with_instructions(&self.instructions))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanRequest {
    #[serde(default)]
    pub recipes: Vec<RecipeInput>,
    /// Recipe id → servings to cook
    #[serde(default)]
    pub servings: HashMap<u64, f64>,
    /// Entry indices to keep; all entries when absent
    #[serde(default)]
    pub selected: Option<Vec<usize>>,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    #[serde(default)]
    pub catalog: Vec<Product>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanReport {
    pub grocery_list: Vec<GroceryItem>,
    pub cart: Cart,
}

/// Read a planning request from a JSON file
pub fn load_request(path: &Path) -> Result<PlanRequest> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file {}", path.display()))?;
    serde_json::from_str(&text).context("Failed to parse planning request")
}

/// One requirement per numeric amount bucket of each entry
pub fn requirements_from_entries(entries: &[ShoppingListEntry]) -> Vec<Requirement> {
    entries
        .iter()
        .flat_map(|entry| {
            entry.amounts.iter().filter_map(move |bucket| {
                bucket.total.map(|total| Requirement {
                    name: entry.canonical_name.clone(),
                    quantity: total,
                    unit: bucket.unit.clone(),
                    form: Some(entry.form.to_string()),
                })
            })
        })
        .collect()
}

/// Build the grocery list and the cart for a request
pub async fn run_plan(request: &PlanRequest, config: &PlannerConfig) -> Result<PlanReport> {
    let recipes = request
        .recipes
        .iter()
        .map(RecipeInput::to_recipe)
        .collect::<Result<Vec<_>>>()?;

    let http = HttpOracle::from_config(&config.oracle).map(Arc::new);

    let mut builder = GroceryListBuilder::default();
    if let Some(oracle) = &http {
        info!("Using oracle at {}", config.oracle.endpoint.as_deref().unwrap_or_default());
        builder = builder.with_oracle(oracle.clone(), &config.oracle);
    }

    let mut entries = builder.entries(&recipes, &request.servings).await;
    if let Some(selected) = &request.selected {
        entries = select_entries(entries, selected);
    }
    let grocery_list: Vec<GroceryItem> = entries.iter().map(GroceryItem::from).collect();

    let requirements = if request.requirements.is_empty() {
        requirements_from_entries(&entries)
    } else {
        request.requirements.clone()
    };

    let resolver: Box<dyn RequirementResolver> = match http {
        Some(oracle) => Box::new(OracleAssistedMatcher::new(
            TableConverter::default(),
            GuardedOracle::new(oracle, &config.oracle),
            config.matcher.clone(),
        )),
        None => Box::new(ProcurementMatcher::with_config(config.matcher.clone())),
    };
    let cart = build_cart(&requirements, &request.catalog, resolver.as_ref()).await;

    Ok(PlanReport { grocery_list, cart })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirements_skip_qualitative_buckets() {
        let request: PlanRequest = serde_json::from_str(
            r#"{
                "recipes": [{
                    "id": 1, "name": "Soup", "portions": 2,
                    "ingredients": [
                        {"name": "carrot", "quantity": "3", "unit": "medium"},
                        {"name": "salt", "quantity": "to taste", "unit": "pinch"}
                    ]
                }]
            }"#,
        )
        .unwrap();
        let recipe = request.recipes[0].to_recipe().unwrap();
        let rows = crate::aggregator::Aggregator::flatten(&[recipe], &request.servings);
        let entries = crate::aggregator::Aggregator::default().merge(&rows, None);

        let requirements = requirements_from_entries(&entries);
        assert_eq!(requirements.len(), 1);
        assert_eq!(requirements[0].name, "carrot");
        assert_eq!(requirements[0].quantity, 3.0);
        assert_eq!(requirements[0].form.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_load_and_run_request_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("request.json");
        fs::write(
            &path,
            r#"{
                "recipes": [{
                    "id": 1, "name": "Mash", "portions": 4,
                    "ingredients": [
                        {"name": "potatoes", "quantity": "800", "unit": "g", "category": "produce"},
                        {"name": "butter", "quantity": "2", "unit": "tbsp", "category": "dairy"}
                    ]
                }],
                "catalog": [
                    {
                        "id": "p1", "name": "Potatoes 1 kg", "ingredient_type": "potatoes",
                        "price": 1200, "package_quantity": 1, "unit": "kg"
                    }
                ]
            }"#,
        )
        .unwrap();

        let request = load_request(&path).unwrap();
        let report = run_plan(&request, &PlannerConfig::default()).await.unwrap();

        assert_eq!(report.grocery_list.len(), 2);
        assert_eq!(report.cart.items.len(), 1);
        assert_eq!(report.cart.items[0].product_id, "p1");
        assert_eq!(report.cart.unresolved_names(), vec!["butter"]);
    }

    #[test]
    fn test_load_request_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_request(&dir.path().join("missing.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read request file"));
    }

    #[test]
    fn test_duplicate_ingredient_is_an_error() {
        let input = RecipeInput {
            id: 7,
            name: "Twice".to_string(),
            portions: None,
            ingredients: vec![
                IngredientRequirement::new("egg", "1", ""),
                IngredientRequirement::new("Egg", "2", ""),
            ],
            instructions: String::new(),
        };
        let err = input.to_recipe().unwrap_err();
        assert!(format!("{:#}", err).contains("Duplicate ingredient"));
    }
}
