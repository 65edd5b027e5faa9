//! # Grocery List
//!
//! Builds the export grocery list from a set of recipes: flatten, ask the
//! canonicalization oracle (if configured), merge, keep the selected entries.
//! Lists can be written to and read back from a JSON file.

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::aggregator::{select_entries, Aggregator, ShoppingListEntry};
use crate::config::OracleConfig;
use crate::ingredient_model::{Category, Form, Recipe};
use crate::oracle::{CanonicalizationOracle, GuardedOracle};

/// One line of the exported grocery list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroceryItem {
    pub index: usize,
    pub name: String,
    /// Combined amount, e.g. "3 medium + 2 lb"
    pub amount_str: String,
    pub form: Form,
    pub category: Category,
    pub optional: bool,
    pub pantry_item: bool,
    /// Stocked, non-perishable item: a larger package is fine when cheaper per unit
    pub prefer_bulk: bool,
}

impl From<&ShoppingListEntry> for GroceryItem {
    fn from(entry: &ShoppingListEntry) -> Self {
        Self {
            index: entry.index,
            name: entry.name.clone(),
            amount_str: entry.amount_str.clone(),
            form: entry.form,
            category: entry.category,
            optional: entry.optional,
            pantry_item: entry.pantry_item,
            prefer_bulk: entry.pantry_item && entry.category.is_non_perishable(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GroceryListFile {
    items: Vec<GroceryItem>,
}

/// Builds grocery lists, optionally consulting a canonicalization oracle
pub struct GroceryListBuilder {
    aggregator: Aggregator,
    oracle: Option<GuardedOracle<Arc<dyn CanonicalizationOracle>>>,
}

impl Default for GroceryListBuilder {
    fn default() -> Self {
        Self::new(Aggregator::default())
    }
}

impl GroceryListBuilder {
    pub fn new(aggregator: Aggregator) -> Self {
        Self {
            aggregator,
            oracle: None,
        }
    }

    pub fn with_oracle(
        mut self,
        oracle: Arc<dyn CanonicalizationOracle>,
        config: &OracleConfig,
    ) -> Self {
        self.oracle = Some(GuardedOracle::new(oracle, config));
        self
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Flatten and merge, using oracle overrides when they pass validation
    pub async fn entries(
        &self,
        recipes: &[Recipe],
        servings: &HashMap<u64, f64>,
    ) -> Vec<ShoppingListEntry> {
        let rows = Aggregator::flatten(recipes, servings);
        let overrides = match &self.oracle {
            Some(oracle) => oracle.canonical_overrides(&rows).await,
            None => None,
        };
        self.aggregator.merge(&rows, overrides.as_deref())
    }

    /// Build the export list.
    ///
    /// `selected` keeps only those entry indices (renumbered from zero); `None` keeps all.
    pub async fn build_grocery_list(
        &self,
        recipes: &[Recipe],
        servings: &HashMap<u64, f64>,
        selected: Option<&[usize]>,
    ) -> Vec<GroceryItem> {
        if recipes.is_empty() {
            return Vec::new();
        }

        let mut entries = self.entries(recipes, servings).await;
        if let Some(indices) = selected {
            entries = select_entries(entries, indices);
        }

        info!("Grocery list has {} items from {} recipes", entries.len(), recipes.len());
        entries.iter().map(GroceryItem::from).collect()
    }
}

/// Write a grocery list as `{"items": [...]}`, creating parent directories
pub fn write_grocery_list(items: &[GroceryItem], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create grocery list directory")?;
    }
    let file = GroceryListFile { items: items.to_vec() };
    let json = serde_json::to_string_pretty(&file).context("Failed to serialize grocery list")?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write grocery list to {}", path.display()))?;
    Ok(())
}

/// Read a grocery list written by [`write_grocery_list`]; `None` if missing or unreadable
pub fn load_grocery_list(path: &Path) -> Option<Vec<GroceryItem>> {
    let text = fs::read_to_string(path).ok()?;
    match serde_json::from_str::<GroceryListFile>(&text) {
        Ok(file) => Some(file.items),
        Err(e) => {
            warn!("Ignoring invalid grocery list at {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingredient_model::IngredientRequirement;

    fn recipe() -> Recipe {
        Recipe::from_requirements(
            1,
            "Pasta",
            2.0,
            &[
                IngredientRequirement::new("salt", "to taste", "")
                    .with_category(Category::Spice)
                    .pantry(),
                IngredientRequirement::new("spaghetti", "200", "g").with_category(Category::Pantry),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_prefer_bulk_only_for_stocked_non_perishables() {
        let rows = Aggregator::flatten(&[recipe()], &HashMap::new());
        let entries = Aggregator::default().merge(&rows, None);
        let items: Vec<GroceryItem> = entries.iter().map(GroceryItem::from).collect();

        let salt = items.iter().find(|i| i.name == "Salt").unwrap();
        assert!(salt.prefer_bulk);
        let pasta = items.iter().find(|i| i.name == "Spaghetti").unwrap();
        assert!(!pasta.prefer_bulk);
    }

    #[tokio::test]
    async fn test_build_without_oracle_and_selection() {
        let builder = GroceryListBuilder::default();
        let all = builder.build_grocery_list(&[recipe()], &HashMap::new(), None).await;
        assert_eq!(all.len(), 2);

        let one = builder.build_grocery_list(&[recipe()], &HashMap::new(), Some(&[1])).await;
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].index, 0);
        assert_eq!(one[0].name, all[1].name);
    }

    #[tokio::test]
    async fn test_no_recipes_no_items() {
        let builder = GroceryListBuilder::default();
        assert!(builder.build_grocery_list(&[], &HashMap::new(), None).await.is_empty());
    }

    #[test]
    fn test_write_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("grocery_list.json");
        let rows = Aggregator::flatten(&[recipe()], &HashMap::new());
        let entries = Aggregator::default().merge(&rows, None);
        let items: Vec<GroceryItem> = entries.iter().map(GroceryItem::from).collect();

        write_grocery_list(&items, &path).unwrap();
        assert_eq!(load_grocery_list(&path), Some(items));
    }

    #[test]
    fn test_load_missing_or_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grocery_list.json");
        assert!(load_grocery_list(&path).is_none());

        fs::write(&path, "not json").unwrap();
        assert!(load_grocery_list(&path).is_none());
    }
}
