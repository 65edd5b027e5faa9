//! # Procurement Matcher
//!
//! Finds the cheapest way to buy one required ingredient from a product catalog.
//!
//! ## Algorithm
//!
//! 1. Convert the requirement to a base unit (g, ml or each)
//! 2. Keep catalog products of the same ingredient type and a compatible form
//! 3. Convert every candidate package to the same base unit
//! 4. If some packages cover the requirement on their own, only those compete
//! 5. Otherwise every candidate is bought in multiples until it covers the requirement
//! 6. Score by price per base unit, with a penalty when buying far more than needed
//! 7. Lowest score wins; ties go to the product listed first in the catalog
//!
//! The resulting [`PurchasePlan`] is advisory: nothing here touches a cart.

use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::MatcherConfig;
use crate::unit_converter::{BaseQuantity, TableConverter, UnitConverter};

/// A purchasable catalog product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Ingredient this product satisfies (matched against the requirement name)
    pub ingredient_type: String,
    #[serde(default)]
    pub form: Option<String>,
    /// Price of one package
    pub price: f64,
    /// Amount in one package, in `unit`
    pub package_quantity: f64,
    #[serde(default)]
    pub unit: String,
}

impl Product {
    pub fn new(
        id: &str,
        name: &str,
        ingredient_type: &str,
        price: f64,
        package_quantity: f64,
        unit: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            ingredient_type: ingredient_type.to_string(),
            form: None,
            price,
            package_quantity,
            unit: unit.to_string(),
        }
    }

    pub fn with_form(mut self, form: &str) -> Self {
        self.form = Some(form.to_string());
        self
    }
}

/// One ingredient to buy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub name: String,
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub form: Option<String>,
}

impl Requirement {
    pub fn new(name: &str, quantity: f64, unit: &str) -> Self {
        Self {
            name: name.to_string(),
            quantity,
            unit: unit.to_string(),
            form: None,
        }
    }

    pub fn with_form(mut self, form: &str) -> Self {
        self.form = Some(form.to_string());
        self
    }
}

/// Whether one package covered the requirement or several are needed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageMode {
    Direct,
    MultiPackage,
}

/// The chosen product and how many packages to buy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchasePlan {
    pub product_id: String,
    pub product_name: String,
    pub package_count: u32,
    pub total_price: f64,
    /// Total amount bought, in the base unit
    pub total_quantity: f64,
    pub price_per_unit: f64,
    pub score: f64,
    pub mode: CoverageMode,
}

/// Why an ingredient could not be resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum NoMatchReason {
    /// The required quantity could not be expressed in a base unit
    Conversion(String),
    /// The required quantity is zero or negative
    InvalidRequirement,
    /// No catalog product matches the ingredient and form
    NoCandidates,
    /// Candidates exist but none converts to the requirement's unit class
    NoComparableCandidates,
}

impl fmt::Display for NoMatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoMatchReason::Conversion(msg) => write!(f, "conversion failed: {msg}"),
            NoMatchReason::InvalidRequirement => write!(f, "required quantity is not positive"),
            NoMatchReason::NoCandidates => write!(f, "no matching products"),
            NoMatchReason::NoComparableCandidates => write!(f, "no products in a comparable unit"),
        }
    }
}

/// Outcome of resolving one requirement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    Resolved(PurchasePlan),
    Unresolved(NoMatchReason),
}

impl Resolution {
    pub fn plan(&self) -> Option<&PurchasePlan> {
        match self {
            Resolution::Resolved(plan) => Some(plan),
            Resolution::Unresolved(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}

/// A candidate product with its package size in the base unit
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCandidate<'a> {
    pub product: &'a Product,
    pub normalized_quantity: f64,
    /// `f64::INFINITY` when the package quantity is not positive
    pub price_per_unit: f64,
}

impl<'a> NormalizedCandidate<'a> {
    pub fn new(product: &'a Product, normalized_quantity: f64) -> Self {
        let price_per_unit = if normalized_quantity > 0.0 {
            product.price / normalized_quantity
        } else {
            f64::INFINITY
        };
        Self {
            product,
            normalized_quantity,
            price_per_unit,
        }
    }
}

pub(crate) fn forms_compatible(wanted: Option<&str>, offered: Option<&str>) -> bool {
    let wanted = wanted.map(str::trim).filter(|f| !f.is_empty());
    let offered = offered.map(str::trim).filter(|f| !f.is_empty());
    match (wanted, offered) {
        (Some(w), Some(o)) => w.eq_ignore_ascii_case(o),
        _ => true,
    }
}

/// Exact candidate filter: same ingredient type (case-insensitive) and compatible form.
///
/// Catalog order is preserved.
pub fn find_candidates<'a>(requirement: &Requirement, catalog: &'a [Product]) -> Vec<&'a Product> {
    let name = requirement.name.trim().to_lowercase();
    catalog
        .iter()
        .filter(|p| p.ingredient_type.trim().to_lowercase() == name)
        .filter(|p| forms_compatible(requirement.form.as_deref(), p.form.as_deref()))
        .collect()
}

fn penalized(price_per_unit: f64, overbuy_ratio: f64, config: &MatcherConfig) -> f64 {
    if overbuy_ratio > config.overbuy_ratio_threshold {
        price_per_unit * config.overbuy_penalty
    } else {
        price_per_unit
    }
}

fn comparable_score(score: f64) -> f64 {
    if score.is_nan() {
        f64::INFINITY
    } else {
        score
    }
}

/// Score normalized candidates against a positive required quantity and pick the cheapest.
///
/// Returns `None` when no candidate yields a plan: `candidates` is empty, or every
/// package is so small that the package count would not fit a `u32`.
pub fn select_plan(
    required: f64,
    candidates: &[NormalizedCandidate<'_>],
    config: &MatcherConfig,
) -> Option<PurchasePlan> {
    let covering: Vec<&NormalizedCandidate<'_>> = candidates
        .iter()
        .filter(|c| c.normalized_quantity >= required)
        .collect();

    let plans: Vec<PurchasePlan> = if !covering.is_empty() {
        covering
            .into_iter()
            .map(|c| {
                let ratio = c.normalized_quantity / required;
                PurchasePlan {
                    product_id: c.product.id.clone(),
                    product_name: c.product.name.clone(),
                    package_count: 1,
                    total_price: c.product.price,
                    total_quantity: c.normalized_quantity,
                    price_per_unit: c.price_per_unit,
                    score: penalized(c.price_per_unit, ratio, config),
                    mode: CoverageMode::Direct,
                }
            })
            .collect()
    } else {
        candidates
            .iter()
            .filter_map(|c| multi_package_plan(required, c, config))
            .collect()
    };

    let mut best: Option<PurchasePlan> = None;
    for plan in plans {
        let better = match &best {
            Some(current) => comparable_score(plan.score) < comparable_score(current.score),
            None => true,
        };
        if better {
            best = Some(plan);
        }
    }
    best
}

fn multi_package_plan(
    required: f64,
    candidate: &NormalizedCandidate<'_>,
    config: &MatcherConfig,
) -> Option<PurchasePlan> {
    let product = candidate.product;

    if candidate.normalized_quantity <= 0.0 {
        return Some(PurchasePlan {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            package_count: 1,
            total_price: product.price,
            total_quantity: 0.0,
            price_per_unit: f64::INFINITY,
            score: f64::INFINITY,
            mode: CoverageMode::MultiPackage,
        });
    }

    let count = (required / candidate.normalized_quantity).ceil().max(1.0);
    if !count.is_finite() || count > f64::from(u32::MAX) {
        debug!(
            "Dropping '{}': {} packages of {} needed",
            product.id, count, candidate.normalized_quantity
        );
        return None;
    }
    let package_count = count as u32;
    let total_price = count * product.price;
    let total_quantity = count * candidate.normalized_quantity;
    let price_per_unit = total_price / total_quantity;

    Some(PurchasePlan {
        product_id: product.id.clone(),
        product_name: product.name.clone(),
        package_count,
        total_price,
        total_quantity,
        price_per_unit,
        score: penalized(price_per_unit, total_quantity / required, config),
        mode: CoverageMode::MultiPackage,
    })
}

/// Finish resolution once the requirement and candidates are in base units.
///
/// Candidates of a different unit class than the requirement are dropped.
pub fn resolve_normalized(
    requirement: &Requirement,
    required: BaseQuantity,
    candidates: Vec<(&Product, BaseQuantity)>,
    config: &MatcherConfig,
) -> Resolution {
    if required.value.is_nan() || required.value <= 0.0 {
        info!("Requirement '{}' has no positive quantity", requirement.name);
        return Resolution::Unresolved(NoMatchReason::InvalidRequirement);
    }

    let normalized: Vec<NormalizedCandidate<'_>> = candidates
        .into_iter()
        .filter(|(product, quantity)| {
            let keep = quantity.is_compatible(&required);
            if !keep {
                debug!("Dropping '{}': {} is not comparable to {}", product.id, quantity, required);
            }
            keep
        })
        .map(|(product, quantity)| NormalizedCandidate::new(product, quantity.value))
        .collect();

    match select_plan(required.value, &normalized, config) {
        Some(plan) => {
            debug!(
                "Resolved '{}' to '{}' x{} for {:.2}",
                requirement.name, plan.product_id, plan.package_count, plan.total_price
            );
            Resolution::Resolved(plan)
        }
        None => {
            info!("No comparable product for '{}'", requirement.name);
            Resolution::Unresolved(NoMatchReason::NoComparableCandidates)
        }
    }
}

/// Synchronous matcher over a local unit converter
#[derive(Debug, Clone, Default)]
pub struct ProcurementMatcher<C = TableConverter> {
    converter: C,
    config: MatcherConfig,
}

impl ProcurementMatcher<TableConverter> {
    /// Matcher over the built-in conversion table
    pub fn with_config(config: MatcherConfig) -> Self {
        Self::new(TableConverter::default(), config)
    }
}

impl<C: UnitConverter> ProcurementMatcher<C> {
    pub fn new(converter: C, config: MatcherConfig) -> Self {
        Self { converter, config }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn converter(&self) -> &C {
        &self.converter
    }

    /// Resolve one requirement against the catalog
    pub fn resolve(&self, requirement: &Requirement, catalog: &[Product]) -> Resolution {
        let required = match self
            .converter
            .to_base(requirement.quantity, &requirement.unit, &requirement.name)
        {
            Ok(q) => q,
            Err(e) => {
                info!("Cannot normalize requirement '{}': {}", requirement.name, e);
                return Resolution::Unresolved(NoMatchReason::Conversion(e.to_string()));
            }
        };

        let candidates = find_candidates(requirement, catalog);
        if candidates.is_empty() {
            info!("No catalog products for '{}'", requirement.name);
            return Resolution::Unresolved(NoMatchReason::NoCandidates);
        }

        let converted = candidates
            .into_iter()
            .filter_map(|product| {
                match self
                    .converter
                    .to_base(product.package_quantity, &product.unit, &product.name)
                {
                    Ok(q) => Some((product, q)),
                    Err(e) => {
                        debug!("Dropping '{}': {}", product.id, e);
                        None
                    }
                }
            })
            .collect();

        resolve_normalized(requirement, required, converted, &self.config)
    }
}

/// Anything that can resolve a requirement against a catalog, possibly by asking an oracle
#[async_trait]
pub trait RequirementResolver: Send + Sync {
    async fn resolve(&self, requirement: &Requirement, catalog: &[Product]) -> Resolution;
}

#[async_trait]
impl<C: UnitConverter> RequirementResolver for ProcurementMatcher<C> {
    async fn resolve(&self, requirement: &Requirement, catalog: &[Product]) -> Resolution {
        ProcurementMatcher::resolve(self, requirement, catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> ProcurementMatcher {
        ProcurementMatcher::default()
    }

    #[test]
    fn test_find_candidates_filters_type_and_form() {
        let catalog = vec![
            Product::new("1", "Papas 1 kg", "papas", 1000.0, 1.0, "kg").with_form("fresco"),
            Product::new("2", "Papas congeladas", "papas", 2000.0, 1.0, "kg")
                .with_form("congelado"),
            Product::new("3", "Papas sin forma", "PAPAS", 900.0, 1.0, "kg"),
            Product::new("4", "Ajo", "ajo", 500.0, 100.0, "g"),
        ];
        let requirement = Requirement::new("papas", 500.0, "g").with_form("Fresco");
        let ids: Vec<&str> = find_candidates(&requirement, &catalog)
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids, vec!["1", "3"]);

        let any_form = Requirement::new("papas", 500.0, "g");
        assert_eq!(find_candidates(&any_form, &catalog).len(), 3);
    }

    #[test]
    fn test_overbuy_penalty_applies_above_ratio() {
        let small = Product::new("s", "Small", "rice", 300.0, 300.0, "g");
        let large = Product::new("l", "Large", "rice", 1000.0, 1000.0, "g");
        let candidates = vec![
            NormalizedCandidate::new(&small, 300.0),
            NormalizedCandidate::new(&large, 1000.0),
        ];

        // Both cost 1 per gram; the large bag is more than 3x the requirement
        let plan = select_plan(200.0, &candidates, &MatcherConfig::default()).unwrap();
        assert_eq!(plan.product_id, "s");
        assert_eq!(plan.score, 1.0);
        assert_eq!(plan.mode, CoverageMode::Direct);
    }

    #[test]
    fn test_ties_go_to_catalog_order() {
        let a = Product::new("a", "A", "salt", 100.0, 100.0, "g");
        let b = Product::new("b", "B", "salt", 100.0, 100.0, "g");
        let candidates = vec![
            NormalizedCandidate::new(&a, 100.0),
            NormalizedCandidate::new(&b, 100.0),
        ];
        let plan = select_plan(50.0, &candidates, &MatcherConfig::default()).unwrap();
        assert_eq!(plan.product_id, "a");
    }

    #[test]
    fn test_zero_quantity_package_is_kept_but_last() {
        let broken = Product::new("x", "Broken", "milk", 1.0, 0.0, "ml");
        let ok = Product::new("y", "Milk", "milk", 1000.0, 250.0, "ml");
        let candidates = vec![
            NormalizedCandidate::new(&broken, 0.0),
            NormalizedCandidate::new(&ok, 250.0),
        ];
        assert_eq!(candidates[0].price_per_unit, f64::INFINITY);

        let plan = select_plan(1000.0, &candidates, &MatcherConfig::default()).unwrap();
        assert_eq!(plan.product_id, "y");
        assert_eq!(plan.package_count, 4);

        let only_broken = vec![NormalizedCandidate::new(&broken, 0.0)];
        let plan = select_plan(1000.0, &only_broken, &MatcherConfig::default()).unwrap();
        assert_eq!(plan.product_id, "x");
        assert_eq!(plan.score, f64::INFINITY);
    }

    #[test]
    fn test_package_count_beyond_u32_is_dropped() {
        let dust = Product::new("dust", "Dust", "saffron", 1.0, 1e-12, "g");
        let jar = Product::new("jar", "Jar", "saffron", 5000.0, 2.0, "g");
        let both = vec![
            NormalizedCandidate::new(&dust, 1e-12),
            NormalizedCandidate::new(&jar, 2.0),
        ];

        let plan = select_plan(10.0, &both, &MatcherConfig::default()).unwrap();
        assert_eq!(plan.product_id, "jar");
        assert_eq!(plan.package_count, 5);

        let only_dust = vec![NormalizedCandidate::new(&dust, 1e-12)];
        assert!(select_plan(10.0, &only_dust, &MatcherConfig::default()).is_none());
    }

    #[test]
    fn test_tiny_packages_leave_no_comparable_candidate() {
        let catalog = vec![Product::new("dust", "Dust", "saffron", 1.0, 1e-9, "mg")];
        let resolution = matcher().resolve(&Requirement::new("saffron", 10.0, "kg"), &catalog);
        assert_eq!(resolution, Resolution::Unresolved(NoMatchReason::NoComparableCandidates));
    }

    #[test]
    fn test_empty_candidates() {
        assert!(select_plan(10.0, &[], &MatcherConfig::default()).is_none());
    }

    #[test]
    fn test_resolve_conversion_failure_is_no_match() {
        let catalog = vec![Product::new("1", "Parsley", "parsley", 500.0, 1.0, "bunch")];
        let resolution = matcher().resolve(&Requirement::new("parsley", 1.0, "handful"), &catalog);
        assert!(matches!(resolution, Resolution::Unresolved(NoMatchReason::Conversion(_))));
    }

    #[test]
    fn test_resolve_drops_incomparable_classes() {
        let catalog = vec![Product::new("1", "Milk 1L", "milk", 1000.0, 1.0, "l")];
        let resolution = matcher().resolve(&Requirement::new("milk", 200.0, "g"), &catalog);
        assert_eq!(resolution, Resolution::Unresolved(NoMatchReason::NoComparableCandidates));
    }

    #[test]
    fn test_resolve_zero_requirement() {
        let catalog = vec![Product::new("1", "Salt", "salt", 500.0, 1.0, "kg")];
        let resolution = matcher().resolve(&Requirement::new("salt", 0.0, "g"), &catalog);
        assert_eq!(resolution, Resolution::Unresolved(NoMatchReason::InvalidRequirement));
    }

    #[test]
    fn test_resolve_no_candidates() {
        let resolution = matcher().resolve(&Requirement::new("saffron", 1.0, "g"), &[]);
        assert_eq!(resolution, Resolution::Unresolved(NoMatchReason::NoCandidates));
    }
}
