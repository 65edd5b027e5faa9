//! # Unit Converter
//!
//! Converts a quantity and unit into a base unit so package sizes can be
//! compared by price. Base units per class:
//!
//! - **Mass**: grams
//! - **Volume**: milliliters
//! - **Count**: each
//!
//! [`TableConverter`] covers common kitchen and retail units from a static
//! table. Anything it does not know is a [`ConversionError`], which callers
//! may hand to the catalog oracle instead.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::canonicalizer::UnitCanonicalizer;
use crate::errors::ConversionError;

/// Grams per garlic clove
pub const GARLIC_CLOVE_GRAMS: f64 = 3.0;

/// Unit class, which determines the base unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitClass {
    Mass,
    Volume,
    Count,
}

impl UnitClass {
    pub fn base_unit(&self) -> &'static str {
        match self {
            UnitClass::Mass => "g",
            UnitClass::Volume => "ml",
            UnitClass::Count => "each",
        }
    }
}

/// A quantity expressed in a base unit.
///
/// `class` is `None` when the value came from an oracle that only reports a number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseQuantity {
    pub value: f64,
    pub class: Option<UnitClass>,
}

impl BaseQuantity {
    pub fn new(value: f64, class: UnitClass) -> Self {
        Self {
            value,
            class: Some(class),
        }
    }

    pub fn unclassified(value: f64) -> Self {
        Self { value, class: None }
    }

    /// Two quantities can be compared unless both classes are known and differ
    pub fn is_compatible(&self, other: &BaseQuantity) -> bool {
        match (self.class, other.class) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}

impl fmt::Display for BaseQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.class {
            Some(class) => write!(f, "{} {}", self.value, class.base_unit()),
            None => write!(f, "{}", self.value),
        }
    }
}

/// Converts (quantity, unit, ingredient) into a base-unit quantity
pub trait UnitConverter: Send + Sync {
    fn to_base(
        &self,
        quantity: f64,
        unit: &str,
        ingredient: &str,
    ) -> Result<BaseQuantity, ConversionError>;
}

lazy_static! {
    /// Canonical unit → (class, factor to base unit)
    static ref UNIT_FACTORS: HashMap<&'static str, (UnitClass, f64)> = {
        let mut map = HashMap::new();

        // Mass units
        map.insert("g", (UnitClass::Mass, 1.0));
        map.insert("kg", (UnitClass::Mass, 1000.0));
        map.insert("mg", (UnitClass::Mass, 0.001));
        map.insert("oz", (UnitClass::Mass, 28.3495));
        map.insert("lb", (UnitClass::Mass, 453.592));

        // Volume units
        map.insert("ml", (UnitClass::Volume, 1.0));
        map.insert("cl", (UnitClass::Volume, 10.0));
        map.insert("dl", (UnitClass::Volume, 100.0));
        map.insert("l", (UnitClass::Volume, 1000.0));
        map.insert("tsp", (UnitClass::Volume, 4.92892));
        map.insert("tbsp", (UnitClass::Volume, 14.7868));
        map.insert("cup", (UnitClass::Volume, 236.588));
        map.insert("fl oz", (UnitClass::Volume, 29.5735));

        // Count units
        map.insert("", (UnitClass::Count, 1.0));
        map.insert("each", (UnitClass::Count, 1.0));
        map.insert("piece", (UnitClass::Count, 1.0));
        map.insert("unit", (UnitClass::Count, 1.0));
        map.insert("un", (UnitClass::Count, 1.0));
        map.insert("item", (UnitClass::Count, 1.0));
        map.insert("whole", (UnitClass::Count, 1.0));
        map.insert("small", (UnitClass::Count, 1.0));
        map.insert("medium", (UnitClass::Count, 1.0));
        map.insert("large", (UnitClass::Count, 1.0));
        map.insert("dozen", (UnitClass::Count, 12.0));

        map
    };
}

/// Table-based conversion for common units
#[derive(Debug, Clone, Default)]
pub struct TableConverter {
    canonicalizer: UnitCanonicalizer,
}

impl TableConverter {
    pub fn new(canonicalizer: UnitCanonicalizer) -> Self {
        Self { canonicalizer }
    }

    /// Class of a unit string, if the table knows it
    pub fn unit_class(&self, unit: &str, ingredient: &str) -> Option<UnitClass> {
        self.lookup(unit, ingredient).map(|(class, _)| class)
    }

    fn lookup(&self, unit: &str, ingredient: &str) -> Option<(UnitClass, f64)> {
        let canonical = self.canonicalizer.canonical_unit_key(unit);

        if canonical == "clove" {
            return Some(if ingredient.to_lowercase().contains("garlic") {
                (UnitClass::Mass, GARLIC_CLOVE_GRAMS)
            } else {
                (UnitClass::Count, 1.0)
            });
        }

        if let Some(entry) = UNIT_FACTORS.get(canonical.as_str()) {
            return Some(*entry);
        }

        // Try without pluralization
        let singular = canonical.strip_suffix('s')?;
        UNIT_FACTORS.get(singular).copied()
    }
}

impl UnitConverter for TableConverter {
    fn to_base(
        &self,
        quantity: f64,
        unit: &str,
        ingredient: &str,
    ) -> Result<BaseQuantity, ConversionError> {
        if !quantity.is_finite() || quantity < 0.0 {
            return Err(ConversionError::InvalidQuantity(quantity));
        }

        let (class, factor) = self
            .lookup(unit, ingredient)
            .ok_or_else(|| ConversionError::UnknownUnit {
                unit: unit.to_string(),
                ingredient: ingredient.to_string(),
            })?;

        Ok(BaseQuantity::new(quantity * factor, class))
    }
}
