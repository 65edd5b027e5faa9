//! # Shopping List Aggregator
//!
//! Turns a set of recipes into a deduplicated shopping list.
//!
//! ## Pipeline
//!
//! 1. [`Aggregator::flatten`] scales every recipe ingredient to the requested
//!    servings, producing one [`FlattenedRow`] per ingredient.
//! 2. [`Aggregator::merge`] groups rows by merge key (canonical name, form).
//!    Inside a group, rows with the same canonical unit are summed; other units
//!    are kept as separate amounts ("3 medium + 2 lb"). No conversion between
//!    units is attempted here.
//!
//! Every flattened row ends up in exactly one entry.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::canonicalizer::UnitCanonicalizer;
use crate::ingredient_model::{effective_portions, Category, Form, Recipe};

/// Display name used for rows whose name canonicalizes to nothing
pub const UNNAMED_DISPLAY: &str = "Unnamed";

/// One recipe ingredient scaled to the requested servings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlattenedRow {
    pub name: String,
    pub unit: String,
    pub form: Form,
    /// `None` when the recipe amount is qualitative
    pub total: Option<f64>,
    pub category: Category,
    pub optional: bool,
    pub pantry_item: bool,
}

/// Preferred (name, unit) for one flattened row, usually from the canonicalization oracle
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CanonicalOverride {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub unit: String,
}

impl CanonicalOverride {
    pub fn new(name: &str, unit: &str) -> Self {
        Self {
            name: name.to_string(),
            unit: unit.to_string(),
        }
    }
}

/// Summed amount for one canonical unit inside an entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmountBucket {
    pub total: Option<f64>,
    pub unit: String,
}

/// A merged shopping-list line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingListEntry {
    /// Position in the sorted list; callers use it to select entries
    pub index: usize,
    /// Title-cased name for presentation
    pub name: String,
    /// Merge-key name
    pub canonical_name: String,
    pub form: Form,
    /// Amounts in order of first appearance
    pub amounts: Vec<AmountBucket>,
    /// Amounts rendered and joined with " + "
    pub amount_str: String,
    /// Category of the first contributing row
    pub category: Category,
    /// True if any contributing row is optional
    pub optional: bool,
    /// True only if every contributing row is a pantry item
    pub pantry_item: bool,
    /// Number of flattened rows merged into this entry
    pub row_count: usize,
}

impl From<&ShoppingListEntry> for FlattenedRow {
    /// Re-feed an entry as a single row; its combined amount becomes an opaque unit
    fn from(entry: &ShoppingListEntry) -> Self {
        Self {
            name: entry.name.clone(),
            unit: entry.amount_str.clone(),
            form: entry.form,
            total: None,
            category: entry.category,
            optional: entry.optional,
            pantry_item: entry.pantry_item,
        }
    }
}

struct EntryBuilder {
    name_key: String,
    form: Form,
    buckets: Vec<AmountBucket>,
    category: Category,
    optional: bool,
    pantry_item: bool,
    row_count: usize,
}

impl EntryBuilder {
    fn add(&mut self, total: Option<f64>, unit: String) {
        match self.buckets.iter_mut().find(|b| b.unit == unit) {
            Some(bucket) => {
                bucket.total = match (bucket.total, total) {
                    (Some(a), Some(b)) => Some(a + b),
                    (None, Some(b)) => Some(b),
                    (existing, None) => existing,
                };
            }
            None => self.buckets.push(AmountBucket { total, unit }),
        }
    }

    fn first_unit(&self) -> &str {
        self.buckets.first().map(|b| b.unit.as_str()).unwrap_or("")
    }
}

/// Flattens and merges recipe ingredients
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    canonicalizer: UnitCanonicalizer,
}

impl Aggregator {
    pub fn new(canonicalizer: UnitCanonicalizer) -> Self {
        Self { canonicalizer }
    }

    pub fn canonicalizer(&self) -> &UnitCanonicalizer {
        &self.canonicalizer
    }

    /// Scale every recipe ingredient to its effective servings.
    ///
    /// `servings_override` maps recipe id → servings; an override below 1 is ignored.
    /// Rows keep recipe order, recipes keep input order.
    pub fn flatten(recipes: &[Recipe], servings_override: &HashMap<u64, f64>) -> Vec<FlattenedRow> {
        let mut rows = Vec::new();

        for recipe in recipes {
            let servings = match servings_override.get(&recipe.id) {
                Some(&s) if s.is_finite() && s >= 1.0 => s,
                _ => effective_portions(Some(recipe.portions)),
            };

            for ingredient in &recipe.ingredients {
                rows.push(FlattenedRow {
                    name: ingredient.name.trim().to_string(),
                    unit: ingredient.unit.trim().to_string(),
                    form: ingredient.form,
                    total: ingredient.quantity_per_portion.map(|q| q * servings),
                    category: ingredient.category,
                    optional: ingredient.optional,
                    pantry_item: ingredient.pantry_item,
                });
            }
        }

        debug!("Flattened {} recipes into {} rows", recipes.len(), rows.len());
        rows
    }

    /// Merge rows into shopping-list entries.
    ///
    /// `overrides`, when given, must line up with `rows` one-to-one; a list of any
    /// other length is discarded as a whole and the static tables are used instead.
    pub fn merge(
        &self,
        rows: &[FlattenedRow],
        overrides: Option<&[CanonicalOverride]>,
    ) -> Vec<ShoppingListEntry> {
        let overrides = match overrides {
            Some(list) if list.len() == rows.len() => Some(list),
            Some(list) => {
                warn!(
                    "Discarding canonical overrides: {} overrides for {} rows",
                    list.len(),
                    rows.len()
                );
                None
            }
            None => None,
        };

        let mut builders: Vec<EntryBuilder> = Vec::new();
        let mut positions: HashMap<(String, Form), usize> = HashMap::new();

        for (i, row) in rows.iter().enumerate() {
            let preferred = overrides.map(|list| &list[i]);

            let name_key = preferred
                .map(|o| o.name.trim().to_lowercase())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| self.canonicalizer.canonical_ingredient_key(&row.name));
            if name_key.is_empty() {
                warn!("Row {} has an empty canonical name; keeping it as an unnamed entry", i);
            }

            let display_unit = preferred
                .map(|o| o.unit.trim().to_lowercase())
                .filter(|unit| !unit.is_empty())
                .unwrap_or_else(|| row.unit.trim().to_string());
            let bucket_unit = self.canonicalizer.canonical_unit_key(&display_unit);

            let key = (name_key, row.form);
            let existing = positions.get(&key).copied();
            match existing {
                Some(pos) => {
                    let builder = &mut builders[pos];
                    builder.add(row.total, bucket_unit);
                    builder.pantry_item = builder.pantry_item && row.pantry_item;
                    builder.optional = builder.optional || row.optional;
                    builder.row_count += 1;
                }
                None => {
                    positions.insert(key.clone(), builders.len());
                    builders.push(EntryBuilder {
                        name_key: key.0,
                        form: key.1,
                        buckets: vec![AmountBucket {
                            total: row.total,
                            unit: bucket_unit,
                        }],
                        category: row.category,
                        optional: row.optional,
                        pantry_item: row.pantry_item,
                        row_count: 1,
                    });
                }
            }
        }

        builders.sort_by(|a, b| {
            let left = (a.first_unit(), a.name_key.as_str(), a.form);
            left.cmp(&(b.first_unit(), b.name_key.as_str(), b.form))
        });

        let entries: Vec<ShoppingListEntry> = builders
            .into_iter()
            .enumerate()
            .map(|(index, builder)| {
                let amount_str = builder
                    .buckets
                    .iter()
                    .map(|b| format_amount(b.total, &b.unit))
                    .collect::<Vec<_>>()
                    .join(" + ");
                let name = if builder.name_key.is_empty() {
                    UNNAMED_DISPLAY.to_string()
                } else {
                    UnitCanonicalizer::display_name(&builder.name_key)
                };

                ShoppingListEntry {
                    index,
                    name,
                    canonical_name: builder.name_key,
                    form: builder.form,
                    amounts: builder.buckets,
                    amount_str,
                    category: builder.category,
                    optional: builder.optional,
                    pantry_item: builder.pantry_item,
                    row_count: builder.row_count,
                }
            })
            .collect();

        debug!("Merged {} rows into {} entries", rows.len(), entries.len());
        entries
    }
}

/// Keep only the entries whose index is selected, renumbering them from zero
pub fn select_entries(
    entries: Vec<ShoppingListEntry>,
    selected: &[usize],
) -> Vec<ShoppingListEntry> {
    let selected: HashSet<usize> = selected.iter().copied().collect();
    entries
        .into_iter()
        .filter(|entry| selected.contains(&entry.index))
        .enumerate()
        .map(|(index, mut entry)| {
            entry.index = index;
            entry
        })
        .collect()
}

/// Render a total and unit for display ("3 tbsp", "0.33 cup", "to taste").
///
/// Integral totals print bare; others use two significant digits with
/// trailing zeros removed. An absent total prints the unit alone.
pub fn format_amount(total: Option<f64>, unit: &str) -> String {
    let unit = unit.trim();
    match total {
        None if unit.is_empty() => "to taste".to_string(),
        None => unit.to_string(),
        Some(t) => format!("{} {}", format_number(t), unit).trim().to_string(),
    }
}

fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value.fract() == 0.0 {
        return format!("{}", value as i64);
    }

    let magnitude = value.abs().log10().floor() as i32;
    let scale = 10f64.powi(magnitude - 1);
    let rounded = (value / scale).round() * scale;
    let decimals = (1 - magnitude).max(0) as usize;

    let text = format!("{:.*}", decimals, rounded);
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, total: Option<f64>, unit: &str) -> FlattenedRow {
        FlattenedRow {
            name: name.to_string(),
            unit: unit.to_string(),
            form: Form::Fresh,
            total,
            category: Category::Other,
            optional: false,
            pantry_item: false,
        }
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(Some(3.0), "tbsp"), "3 tbsp");
        assert_eq!(format_amount(Some(1.0 / 3.0), "cup"), "0.33 cup");
        assert_eq!(format_amount(Some(1.5), "cup"), "1.5 cup");
        assert_eq!(format_amount(Some(2.5), ""), "2.5");
        assert_eq!(format_amount(Some(12.5), "g"), "13 g");
        assert_eq!(format_amount(Some(123.4), "g"), "120 g");
        assert_eq!(format_amount(Some(0.05), "tsp"), "0.05 tsp");
        assert_eq!(format_amount(None, "pinch"), "pinch");
        assert_eq!(format_amount(None, ""), "to taste");
    }

    #[test]
    fn test_sum_within_unit_bucket() {
        let aggregator = Aggregator::default();
        let rows = vec![
            row("garlic clove", Some(2.0), "tbsp"),
            row("garlic cloves", Some(1.0), "tablespoons"),
        ];
        let entries = aggregator.merge(&rows, None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Garlic");
        assert_eq!(entries[0].amount_str, "3 tbsp");
        assert_eq!(entries[0].row_count, 2);
    }

    #[test]
    fn test_absent_totals() {
        let aggregator = Aggregator::default();
        let rows = vec![
            row("salt", None, "pinch"),
            row("salt", Some(1.0), "pinch"),
            row("salt", None, "pinch"),
            row("pepper", None, ""),
        ];
        let entries = aggregator.merge(&rows, None);
        let salt = entries.iter().find(|e| e.canonical_name == "salt").unwrap();
        assert_eq!(salt.amount_str, "1 pinch");
        let pepper = entries.iter().find(|e| e.canonical_name == "black pepper").unwrap();
        assert_eq!(pepper.amounts[0].total, None);
        assert_eq!(pepper.amount_str, "to taste");
    }

    #[test]
    fn test_flags_and_category() {
        let aggregator = Aggregator::default();
        let mut a = row("butter", Some(1.0), "tbsp");
        a.pantry_item = true;
        a.category = Category::Dairy;
        let mut b = row("unsalted butter", Some(2.0), "tbsp");
        b.optional = true;
        b.category = Category::Other;

        let entries = aggregator.merge(&[a, b], None);
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].pantry_item);
        assert!(entries[0].optional);
        assert_eq!(entries[0].category, Category::Dairy);
    }

    #[test]
    fn test_form_separates_entries() {
        let aggregator = Aggregator::default();
        let fresh = row("tomato", Some(2.0), "");
        let mut canned = row("tomato", Some(1.0), "");
        canned.form = Form::Canned;
        let entries = aggregator.merge(&[fresh, canned], None);
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_sorted_by_first_unit_then_name() {
        let aggregator = Aggregator::default();
        let rows = vec![
            row("zucchini", Some(1.0), ""),
            row("flour", Some(2.0), "cup"),
            row("apple", Some(3.0), ""),
        ];
        let entries = aggregator.merge(&rows, None);
        let names: Vec<&str> = entries.iter().map(|e| e.canonical_name.as_str()).collect();
        assert_eq!(names, vec!["apple", "zucchini", "flour"]);
        let indices: Vec<usize> = entries.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_name_kept_as_unnamed() {
        let aggregator = Aggregator::default();
        let entries = aggregator.merge(&[row("  ", Some(1.0), "")], None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].canonical_name, "");
        assert_eq!(entries[0].name, UNNAMED_DISPLAY);
    }

    #[test]
    fn test_select_entries_renumbers() {
        let aggregator = Aggregator::default();
        let rows = vec![
            row("apple", Some(1.0), ""),
            row("banana", Some(1.0), ""),
            row("cherry", Some(1.0), ""),
        ];
        let entries = aggregator.merge(&rows, None);
        let selected = select_entries(entries, &[0, 2, 9]);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].canonical_name, "apple");
        assert_eq!(selected[1].canonical_name, "cherry");
        assert_eq!(selected[1].index, 1);
    }
}
