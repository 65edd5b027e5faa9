//! # Recipe and Ingredient Data Model
//!
//! Data structures for recipes and the ingredient rows they own.
//!
//! ## Core Concepts
//!
//! - **IngredientRequirement**: An ingredient as written for the whole recipe,
//!   with a free-text quantity ("1 1/2", "to taste")
//! - **RecipeIngredient**: The stored form of a requirement, with the quantity
//!   converted to a per-portion number (or `None` for qualitative amounts)
//! - **Recipe**: An ordered list of recipe ingredients plus a portion count
//!
//! ## Usage
//!
//! ```rust
//! use grocery_planner::ingredient_model::{Category, IngredientRequirement, Recipe};
//!
//! let mut recipe = Recipe::new(1, "Mashed potatoes", 4.0);
//! recipe
//!     .add_ingredient(
//!         IngredientRequirement::new("potato", "2", "lb").with_category(Category::Produce),
//!     )
//!     .unwrap();
//!
//! assert_eq!(recipe.ingredients[0].quantity_per_portion, Some(0.5));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{AsRefStr, Display, EnumString};

use crate::errors::ModelError;
use crate::quantity_parser::parse_quantity;

/// Portion count used when a recipe states none (or a non-positive one)
pub const DEFAULT_PORTIONS: f64 = 4.0;

/// Broad category of an ingredient
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, AsRefStr, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Pantry,
    Dairy,
    Produce,
    Meat,
    Seafood,
    Spice,
    Condiment,
    Frozen,
    #[default]
    Other,
}

/// How the recipe specifies an ingredient
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Display, AsRefStr,
    EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(from = "String", into = "String")]
pub enum Form {
    #[default]
    Fresh,
    Canned,
    Frozen,
    Dried,
    Liquid,
}

impl Category {
    /// Parse free text, defaulting to `Other` for anything unknown
    pub fn from_label(label: &str) -> Self {
        label.trim().parse().unwrap_or_default()
    }

    /// Categories whose items keep well enough to buy in bulk
    pub fn is_non_perishable(&self) -> bool {
        matches!(self, Category::Pantry | Category::Spice | Category::Condiment)
    }
}

impl Form {
    /// Parse free text, defaulting to `Fresh` for anything unknown
    pub fn from_label(label: &str) -> Self {
        label.trim().parse().unwrap_or_default()
    }
}

impl From<String> for Category {
    fn from(label: String) -> Self {
        Category::from_label(&label)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_ref().to_string()
    }
}

impl From<String> for Form {
    fn from(label: String) -> Self {
        Form::from_label(&label)
    }
}

impl From<Form> for String {
    fn from(form: Form) -> Self {
        form.as_ref().to_string()
    }
}

/// An ingredient as written in a recipe, quantity per whole recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientRequirement {
    /// Ingredient name as used in the recipe (e.g. "olive oil")
    pub name: String,

    /// Free-text quantity ("2", "1/2", "to taste")
    #[serde(default)]
    pub quantity: String,

    /// Unit ("tbsp", "g") or a qualitative phrase ("pinch")
    #[serde(default)]
    pub unit: String,

    #[serde(default)]
    pub category: Category,

    #[serde(default)]
    pub form: Form,

    /// The recipe marks this ingredient as optional
    #[serde(default)]
    pub optional: bool,

    /// Typically kept stocked at home (salt, oil, flour)
    #[serde(default)]
    pub pantry_item: bool,
}

impl IngredientRequirement {
    pub fn new(name: &str, quantity: &str, unit: &str) -> Self {
        Self {
            name: name.to_string(),
            quantity: quantity.to_string(),
            unit: unit.to_string(),
            category: Category::Other,
            form: Form::Fresh,
            optional: false,
            pantry_item: false,
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_form(mut self, form: Form) -> Self {
        self.form = form;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn pantry(mut self) -> Self {
        self.pantry_item = true;
        self
    }
}

/// A stored recipe row with its quantity expressed per portion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub name: String,

    /// Numeric amount for one portion; `None` for "to taste" and similar
    pub quantity_per_portion: Option<f64>,

    #[serde(default)]
    pub unit: String,

    #[serde(default)]
    pub category: Category,

    #[serde(default)]
    pub form: Form,

    #[serde(default)]
    pub optional: bool,

    #[serde(default)]
    pub pantry_item: bool,
}

impl RecipeIngredient {
    /// Convert a whole-recipe requirement into a per-portion row
    pub fn from_requirement(requirement: &IngredientRequirement, portions: f64) -> Self {
        let portions = effective_portions(Some(portions));
        Self {
            name: requirement.name.trim().to_string(),
            quantity_per_portion: parse_quantity(&requirement.quantity).map(|q| q / portions),
            unit: requirement.unit.trim().to_string(),
            category: requirement.category,
            form: requirement.form,
            optional: requirement.optional,
            pantry_item: requirement.pantry_item,
        }
    }
}

/// A recipe with its ingredient rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: u64,
    pub name: String,

    /// Number of portions the recipe is written for, always > 0
    pub portions: f64,

    #[serde(default)]
    pub ingredients: Vec<RecipeIngredient>,

    #[serde(default)]
    pub instructions: String,

    #[serde(default)]
    pub source_url: Option<String>,
}

/// Resolve a portion count, treating absent, non-finite or non-positive values as 4
pub fn effective_portions(portions: Option<f64>) -> f64 {
    match portions {
        Some(p) if p.is_finite() && p > 0.0 => p,
        _ => DEFAULT_PORTIONS,
    }
}

impl Recipe {
    /// Create an empty recipe; portions ≤ 0 are replaced by 4
    pub fn new(id: u64, name: &str, portions: f64) -> Self {
        Self {
            id,
            name: name.to_string(),
            portions: effective_portions(Some(portions)),
            ingredients: Vec::new(),
            instructions: String::new(),
            source_url: None,
        }
    }

    /// Build a recipe from whole-recipe requirements
    pub fn from_requirements(
        id: u64,
        name: &str,
        portions: f64,
        requirements: &[IngredientRequirement],
    ) -> Result<Self, ModelError> {
        let mut recipe = Self::new(id, name, portions);
        for requirement in requirements {
            recipe.add_ingredient(requirement.clone())?;
        }
        Ok(recipe)
    }

    pub fn with_instructions(mut self, instructions: &str) -> Self {
        self.instructions = instructions.to_string();
        self
    }

    pub fn with_source_url(mut self, url: &str) -> Self {
        self.source_url = Some(url.to_string());
        self
    }

    /// Add a requirement, converting its quantity to per-portion.
    ///
    /// Rejects a second row with the same raw name (trimmed, case-insensitive).
    pub fn add_ingredient(
        &mut self,
        requirement: IngredientRequirement,
    ) -> Result<&RecipeIngredient, ModelError> {
        let key = requirement.name.trim().to_lowercase();
        if self
            .ingredients
            .iter()
            .any(|existing| existing.name.to_lowercase() == key)
        {
            return Err(ModelError::DuplicateIngredient(requirement.name.trim().to_string()));
        }

        let row = RecipeIngredient::from_requirement(&requirement, self.portions);
        self.ingredients.push(row);
        Ok(&self.ingredients[self.ingredients.len() - 1])
    }
}

impl fmt::Display for RecipeIngredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.quantity_per_portion {
            Some(q) => write!(f, "{} {} {} per portion", q, self.unit, self.name)?,
            None => {
                let unit = if self.unit.is_empty() {
                    "to taste"
                } else {
                    self.unit.as_str()
                };
                write!(f, "{} ({})", self.name, unit)?
            }
        }
        if self.optional {
            write!(f, " [optional]")?;
        }
        Ok(())
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({} portions):", self.name, self.portions)?;
        for ingredient in &self.ingredients {
            writeln!(f, "  • {}", ingredient)?;
        }
        Ok(())
    }
}
