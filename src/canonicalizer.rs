//! # Unit and Name Canonicalizer
//!
//! Maps raw ingredient names and units to the canonical keys used for merging
//! shopping-list rows. Lookups are case-insensitive and many-to-one; anything
//! not in the tables passes through trimmed and lowercased.
//!
//! The alias tables are plain data handed to the canonicalizer at construction,
//! so tests and callers can substitute their own.
//!
//! ```rust
//! use grocery_planner::canonicalizer::UnitCanonicalizer;
//!
//! let canon = UnitCanonicalizer::default();
//! assert_eq!(canon.canonical_ingredient_key("Garlic Cloves"), "garlic");
//! assert_eq!(canon.canonical_unit_key("Tablespoons"), "tbsp");
//! assert_eq!(UnitCanonicalizer::display_name("olive oil"), "Olive Oil");
//! ```

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::Arc;

/// Built-in ingredient aliases: variant → canonical name
const INGREDIENT_ALIASES: &[(&str, &str)] = &[
    // Garlic
    ("garlic", "garlic"),
    ("garlic clove", "garlic"),
    ("garlic cloves", "garlic"),
    ("clove garlic", "garlic"),
    ("cloves garlic", "garlic"),
    // Salt
    ("salt", "salt"),
    ("sea salt", "salt"),
    ("kosher salt", "salt"),
    ("table salt", "salt"),
    ("fine salt", "salt"),
    ("coarse salt", "salt"),
    // Oil
    ("olive oil", "olive oil"),
    ("extra virgin olive oil", "olive oil"),
    ("evoo", "olive oil"),
    ("vegetable oil", "vegetable oil"),
    ("cooking oil", "vegetable oil"),
    // Pepper
    ("black pepper", "black pepper"),
    ("ground black pepper", "black pepper"),
    ("pepper", "black pepper"),
    ("freshly ground black pepper", "black pepper"),
    // Onion
    ("onion", "onion"),
    ("onions", "onion"),
    ("yellow onion", "onion"),
    ("white onion", "onion"),
    ("red onion", "onion"),
    // Butter
    ("butter", "butter"),
    ("unsalted butter", "butter"),
    ("salted butter", "butter"),
    // Baking
    ("all-purpose flour", "flour"),
    ("plain flour", "flour"),
    ("flour", "flour"),
    ("sugar", "sugar"),
    ("granulated sugar", "sugar"),
    ("white sugar", "sugar"),
    ("brown sugar", "brown sugar"),
    // Eggs and dairy
    ("eggs", "egg"),
    ("egg", "egg"),
    ("large egg", "egg"),
    ("large eggs", "egg"),
    ("milk", "milk"),
    ("whole milk", "milk"),
    ("parmesan", "parmesan"),
    ("parmesan cheese", "parmesan"),
    ("parmigiano-reggiano", "parmesan"),
    // Liquids and sauces
    ("water", "water"),
    ("lemon juice", "lemon juice"),
    ("fresh lemon juice", "lemon juice"),
    ("lime juice", "lime juice"),
    ("soy sauce", "soy sauce"),
    // Tomatoes
    ("tomato paste", "tomato paste"),
    ("canned tomatoes", "canned tomatoes"),
    ("diced tomatoes", "canned tomatoes"),
    ("crushed tomatoes", "canned tomatoes"),
    // Herbs
    ("parsley", "parsley"),
    ("fresh parsley", "parsley"),
    ("cilantro", "cilantro"),
    ("fresh cilantro", "cilantro"),
    ("coriander", "cilantro"),
    ("fresh coriander", "cilantro"),
];

/// Built-in unit aliases: variant → canonical unit.
/// Different units (tbsp vs cup) stay distinct.
const UNIT_ALIASES: &[(&str, &str)] = &[
    ("tbsp", "tbsp"),
    ("tablespoon", "tbsp"),
    ("tablespoons", "tbsp"),
    ("tb", "tbsp"),
    ("tsp", "tsp"),
    ("teaspoon", "tsp"),
    ("teaspoons", "tsp"),
    ("cup", "cup"),
    ("cups", "cup"),
    ("g", "g"),
    ("gram", "g"),
    ("grams", "g"),
    ("kg", "kg"),
    ("kilogram", "kg"),
    ("kilograms", "kg"),
    ("ml", "ml"),
    ("milliliter", "ml"),
    ("milliliters", "ml"),
    ("millilitre", "ml"),
    ("millilitres", "ml"),
    ("l", "l"),
    ("liter", "l"),
    ("liters", "l"),
    ("litre", "l"),
    ("litres", "l"),
    ("oz", "oz"),
    ("ounce", "oz"),
    ("ounces", "oz"),
    ("fl oz", "fl oz"),
    ("fluid ounce", "fl oz"),
    ("fluid ounces", "fl oz"),
    ("lb", "lb"),
    ("lbs", "lb"),
    ("pound", "lb"),
    ("pounds", "lb"),
    ("clove", "clove"),
    ("cloves", "clove"),
    ("piece", "piece"),
    ("pieces", "piece"),
    ("pinch", "pinch"),
    ("pinches", "pinch"),
    ("dash", "dash"),
    ("dashes", "dash"),
    ("to taste", "to taste"),
    ("", ""),
];

/// Read-only alias tables (ingredient names and units), keys lowercase
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasTables {
    pub ingredients: HashMap<String, String>,
    pub units: HashMap<String, String>,
}

impl AliasTables {
    /// Build tables from (variant, canonical) pairs; variants are lowercased
    pub fn from_pairs(ingredients: &[(&str, &str)], units: &[(&str, &str)]) -> Self {
        let collect = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(variant, canonical)| (variant.trim().to_lowercase(), canonical.to_string()))
                .collect::<HashMap<_, _>>()
        };
        Self {
            ingredients: collect(ingredients),
            units: collect(units),
        }
    }

    /// The built-in English tables
    pub fn builtin() -> Self {
        Self::from_pairs(INGREDIENT_ALIASES, UNIT_ALIASES)
    }
}

lazy_static! {
    static ref BUILTIN_TABLES: Arc<AliasTables> = Arc::new(AliasTables::builtin());
}

/// Pure, deterministic canonicalization over injected alias tables
#[derive(Debug, Clone)]
pub struct UnitCanonicalizer {
    tables: Arc<AliasTables>,
}

impl Default for UnitCanonicalizer {
    fn default() -> Self {
        Self {
            tables: Arc::clone(&BUILTIN_TABLES),
        }
    }
}

impl UnitCanonicalizer {
    pub fn new(tables: AliasTables) -> Self {
        Self {
            tables: Arc::new(tables),
        }
    }

    /// Canonical merge-key name; unknown names pass through lowercased
    pub fn canonical_ingredient_key(&self, raw: &str) -> String {
        lookup(&self.tables.ingredients, raw)
    }

    /// Canonical unit for bucket comparison; unknown units pass through lowercased
    pub fn canonical_unit_key(&self, raw: &str) -> String {
        lookup(&self.tables.units, raw)
    }

    /// Presentation name for a canonical key: hyphens become spaces, words title-cased
    pub fn display_name(key: &str) -> String {
        let mut out = String::with_capacity(key.len());
        let mut previous_is_letter = false;
        for c in key.chars() {
            let c = if c == '-' { ' ' } else { c };
            if c.is_alphabetic() {
                if previous_is_letter {
                    out.extend(c.to_lowercase());
                } else {
                    out.extend(c.to_uppercase());
                }
                previous_is_letter = true;
            } else {
                out.push(c);
                previous_is_letter = false;
            }
        }
        out
    }
}

fn lookup(table: &HashMap<String, String>, raw: &str) -> String {
    let key = raw.trim().to_lowercase();
    match table.get(&key) {
        Some(canonical) => canonical.clone(),
        None => key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingredient_aliases() {
        let canon = UnitCanonicalizer::default();
        assert_eq!(canon.canonical_ingredient_key("garlic clove"), "garlic");
        assert_eq!(canon.canonical_ingredient_key("  Kosher Salt "), "salt");
        assert_eq!(canon.canonical_ingredient_key("EVOO"), "olive oil");
    }

    #[test]
    fn test_unknown_passes_through_lowercased() {
        let canon = UnitCanonicalizer::default();
        assert_eq!(canon.canonical_ingredient_key("Dragon Fruit"), "dragon fruit");
        assert_eq!(canon.canonical_unit_key("Medium"), "medium");
        assert_eq!(canon.canonical_unit_key(""), "");
    }

    #[test]
    fn test_unit_aliases() {
        let canon = UnitCanonicalizer::default();
        assert_eq!(canon.canonical_unit_key("Tablespoons"), "tbsp");
        assert_eq!(canon.canonical_unit_key("lbs"), "lb");
        assert_eq!(canon.canonical_unit_key("Litres"), "l");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(UnitCanonicalizer::display_name("olive oil"), "Olive Oil");
        assert_eq!(UnitCanonicalizer::display_name("all-purpose flour"), "All Purpose Flour");
        assert_eq!(UnitCanonicalizer::display_name(""), "");
    }

    #[test]
    fn test_injected_tables() {
        let tables = AliasTables::from_pairs(&[("Papas", "potato")], &[("Kilo", "kg")]);
        let canon = UnitCanonicalizer::new(tables);
        assert_eq!(canon.canonical_ingredient_key("papas"), "potato");
        assert_eq!(canon.canonical_unit_key("KILO"), "kg");
        // Built-in aliases are not consulted
        assert_eq!(canon.canonical_ingredient_key("garlic clove"), "garlic clove");
    }
}
