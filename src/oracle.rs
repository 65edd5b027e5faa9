//! # Oracle Module
//!
//! External helpers consulted when the static tables are not enough:
//!
//! - [`CanonicalizationOracle`]: preferred (name, unit) for each shopping-list row
//! - [`CatalogOracle`]: unit conversion and fuzzy candidate matching for procurement
//!
//! Oracle answers are never trusted blindly. [`GuardedOracle`] bounds every call
//! with a timeout, validates the shape of the answer and trips a circuit breaker
//! after repeated failures. Any failure means "use the local path", logged at
//! `warn!`; a partial answer is discarded in full.
//!
//! [`HttpOracle`] implements both traits over a JSON HTTP service.

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::aggregator::{CanonicalOverride, FlattenedRow};
use crate::circuit_breaker::CircuitBreaker;
use crate::config::{MatcherConfig, OracleConfig};
use crate::errors::{ConversionError, OracleError};
use crate::procurement::{
    find_candidates, forms_compatible, resolve_normalized, NoMatchReason, Product, Requirement,
    RequirementResolver, Resolution,
};
use crate::unit_converter::{BaseQuantity, TableConverter, UnitConverter};

/// Maps (raw name, raw unit) pairs to canonical (name, unit) pairs, same length and order
#[async_trait]
pub trait CanonicalizationOracle: Send + Sync {
    async fn canonicalize(
        &self,
        items: &[(String, String)],
    ) -> Result<Vec<CanonicalOverride>, OracleError>;
}

/// Quantity conversion and fuzzy product matching
#[async_trait]
pub trait CatalogOracle: Send + Sync {
    /// Value of `quantity unit` of `name` in its implied base unit (g, ml or count)
    async fn convert_quantity(
        &self,
        quantity: f64,
        unit: &str,
        name: &str,
    ) -> Result<f64, OracleError>;

    /// Identifiers of listed products that satisfy the requirement
    async fn match_candidates(
        &self,
        requirement: &Requirement,
        listing: &[Product],
    ) -> Result<Vec<String>, OracleError>;
}

#[async_trait]
impl<T: CanonicalizationOracle + ?Sized> CanonicalizationOracle for Arc<T> {
    async fn canonicalize(
        &self,
        items: &[(String, String)],
    ) -> Result<Vec<CanonicalOverride>, OracleError> {
        (**self).canonicalize(items).await
    }
}

#[async_trait]
impl<T: CatalogOracle + ?Sized> CatalogOracle for Arc<T> {
    async fn convert_quantity(
        &self,
        quantity: f64,
        unit: &str,
        name: &str,
    ) -> Result<f64, OracleError> {
        (**self).convert_quantity(quantity, unit, name).await
    }

    async fn match_candidates(
        &self,
        requirement: &Requirement,
        listing: &[Product],
    ) -> Result<Vec<String>, OracleError> {
        (**self).match_candidates(requirement, listing).await
    }
}

/// Wraps an oracle with a timeout, response validation and a circuit breaker
#[derive(Debug)]
pub struct GuardedOracle<O> {
    inner: O,
    breaker: CircuitBreaker,
    timeout_secs: u64,
    catalog_listing_limit: usize,
}

impl<O> GuardedOracle<O> {
    pub fn new(inner: O, config: &OracleConfig) -> Self {
        Self {
            inner,
            breaker: CircuitBreaker::new(config.recovery.clone()),
            timeout_secs: config.timeout_secs,
            catalog_listing_limit: config.catalog_listing_limit,
        }
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Run one oracle call under the timeout and breaker, recording the outcome
    async fn call<T, F>(&self, operation: &str, fut: F) -> Result<T, OracleError>
    where
        F: Future<Output = Result<T, OracleError>>,
    {
        if self.breaker.is_open() {
            return Err(OracleError::Unavailable(format!("circuit open, skipping {operation}")));
        }

        let outcome = tokio::time::timeout(Duration::from_secs(self.timeout_secs), fut)
            .await
            .map_err(|_| OracleError::Timeout(self.timeout_secs))
            .and_then(|result| result);

        match &outcome {
            Ok(_) => self.breaker.record_success(),
            Err(OracleError::Unavailable(_)) => {}
            Err(_) => self.breaker.record_failure(),
        }
        outcome
    }
}

impl<O: CanonicalizationOracle> GuardedOracle<O> {
    /// Ask for canonical overrides for every row.
    ///
    /// Returns `None` when the oracle fails, answers empty or answers with the wrong length.
    pub async fn canonical_overrides(
        &self,
        rows: &[FlattenedRow],
    ) -> Option<Vec<CanonicalOverride>> {
        if rows.is_empty() {
            return None;
        }

        let items: Vec<(String, String)> = rows
            .iter()
            .map(|r| (r.name.clone(), r.unit.clone()))
            .collect();
        let result = self
            .call("canonicalize", async {
                let overrides = self.inner.canonicalize(&items).await?;
                if overrides.is_empty() {
                    return Err(OracleError::Malformed("empty canonicalization result".to_string()));
                }
                if overrides.len() != items.len() {
                    return Err(OracleError::LengthMismatch {
                        expected: items.len(),
                        actual: overrides.len(),
                    });
                }
                Ok::<_, OracleError>(overrides)
            })
            .await;

        match result {
            Ok(overrides) => {
                debug!("Canonicalization oracle answered for {} rows", overrides.len());
                Some(overrides)
            }
            Err(e) => {
                warn!("Falling back to static canonicalization: {}", e);
                None
            }
        }
    }
}

impl<O: CatalogOracle> GuardedOracle<O> {
    /// Convert through the oracle; the class of the result is unknown
    pub async fn convert(
        &self,
        quantity: f64,
        unit: &str,
        name: &str,
    ) -> Result<BaseQuantity, ConversionError> {
        let value = self
            .call("convert", async {
                let value = self.inner.convert_quantity(quantity, unit, name).await?;
                if !value.is_finite() || value < 0.0 {
                    return Err(OracleError::Malformed(format!("conversion returned {value}")));
                }
                Ok::<_, OracleError>(value)
            })
            .await?;
        Ok(BaseQuantity::unclassified(value))
    }

    /// Fuzzy candidates restricted to catalog members with a compatible form, in catalog order.
    ///
    /// Only the first `catalog_listing_limit` products are shown to the oracle.
    /// Empty on failure.
    pub async fn fuzzy_candidates<'a>(
        &self,
        requirement: &Requirement,
        catalog: &'a [Product],
    ) -> Vec<&'a Product> {
        if catalog.is_empty() {
            return Vec::new();
        }

        let listing = &catalog[..catalog.len().min(self.catalog_listing_limit)];
        let ids = match self
            .call("match_candidates", self.inner.match_candidates(requirement, listing))
            .await
        {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Falling back to exact candidate filter for '{}': {}", requirement.name, e);
                return Vec::new();
            }
        };

        let ids: HashSet<&str> = ids.iter().map(|id| id.trim()).collect();
        let listed: Vec<&Product> = catalog
            .iter()
            .filter(|p| ids.contains(p.id.as_str()))
            .collect();
        if listed.len() < ids.len() {
            debug!(
                "Ignored {} candidate ids not present in the catalog",
                ids.len() - listed.len()
            );
        }

        listed
            .into_iter()
            .filter(|p| {
                let keep = forms_compatible(requirement.form.as_deref(), p.form.as_deref());
                if !keep {
                    debug!("Ignored oracle candidate '{}': form does not match", p.id);
                }
                keep
            })
            .collect()
    }
}

/// Procurement matcher that asks a catalog oracle when the local path falls short.
///
/// - Conversion: local table first, oracle for unknown units
/// - Candidates: the exact filter, widened by the oracle's ids
pub struct OracleAssistedMatcher<O, C = TableConverter> {
    converter: C,
    oracle: GuardedOracle<O>,
    config: MatcherConfig,
}

impl<O: CatalogOracle, C: UnitConverter> OracleAssistedMatcher<O, C> {
    pub fn new(converter: C, oracle: GuardedOracle<O>, config: MatcherConfig) -> Self {
        Self {
            converter,
            oracle,
            config,
        }
    }

    pub fn oracle(&self) -> &GuardedOracle<O> {
        &self.oracle
    }

    async fn to_base(
        &self,
        quantity: f64,
        unit: &str,
        name: &str,
    ) -> Result<BaseQuantity, ConversionError> {
        match self.converter.to_base(quantity, unit, name) {
            Ok(q) => Ok(q),
            Err(ConversionError::InvalidQuantity(q)) => Err(ConversionError::InvalidQuantity(q)),
            Err(local) => {
                debug!("Local conversion failed ({}), asking oracle", local);
                self.oracle.convert(quantity, unit, name).await
            }
        }
    }
}

#[async_trait]
impl<O: CatalogOracle, C: UnitConverter> RequirementResolver for OracleAssistedMatcher<O, C> {
    async fn resolve(&self, requirement: &Requirement, catalog: &[Product]) -> Resolution {
        let required = match self
            .to_base(requirement.quantity, &requirement.unit, &requirement.name)
            .await
        {
            Ok(q) => q,
            Err(e) => {
                warn!("Cannot normalize requirement '{}': {}", requirement.name, e);
                return Resolution::Unresolved(NoMatchReason::Conversion(e.to_string()));
            }
        };

        let exact = find_candidates(requirement, catalog);
        let fuzzy = self.oracle.fuzzy_candidates(requirement, catalog).await;
        let candidates: Vec<&Product> = catalog
            .iter()
            .filter(|p| exact.iter().chain(&fuzzy).any(|c| std::ptr::eq(*c, *p)))
            .collect();
        if candidates.is_empty() {
            return Resolution::Unresolved(NoMatchReason::NoCandidates);
        }

        let mut converted = Vec::with_capacity(candidates.len());
        for product in candidates {
            match self.to_base(product.package_quantity, &product.unit, &product.name).await {
                Ok(q) => converted.push((product, q)),
                Err(e) => debug!("Dropping '{}': {}", product.id, e),
            }
        }

        resolve_normalized(requirement, required, converted, &self.config)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireItem {
    #[serde(default)]
    name: String,
    #[serde(default)]
    unit: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CanonicalizeBody {
    items: Vec<WireItem>,
}

#[derive(Debug, Serialize)]
struct ConvertRequest<'a> {
    quantity: f64,
    unit: &'a str,
    ingredient: &'a str,
}

#[derive(Debug, Deserialize)]
struct ConvertResponse {
    value: f64,
}

#[derive(Debug, Serialize)]
struct ListedProduct<'a> {
    id: &'a str,
    name: &'a str,
    ingredient_type: &'a str,
    form: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct CandidatesRequest<'a> {
    requirement: &'a Requirement,
    products: Vec<ListedProduct<'a>>,
}

#[derive(Debug, Deserialize)]
struct CandidatesResponse {
    #[serde(default)]
    ids: Vec<String>,
}

/// JSON-over-HTTP oracle.
///
/// Endpoints, all `POST` relative to the base URL:
/// - `/canonicalize`: `{"items":[{"name","unit"}]}` → same shape
/// - `/convert`: `{"quantity","unit","ingredient"}` → `{"value"}`
/// - `/candidates`: `{"requirement", "products":[...]}` → `{"ids"}`, each product
///   listed as `{"id","name","ingredient_type","form"}`
#[derive(Debug, Clone)]
pub struct HttpOracle {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpOracle {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    /// Build from configuration; `None` when no endpoint is configured
    pub fn from_config(config: &OracleConfig) -> Option<Self> {
        config.endpoint.as_deref().map(Self::new)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, OracleError>
    where
        B: Serialize + ?Sized + Sync,
        R: serde::de::DeserializeOwned,
    {
        let url = format!("{}/{}", self.endpoint, path);
        debug!("POST {}", url);
        let response = self.client.post(&url).json(body).send().await?.error_for_status()?;
        Ok(response.json::<R>().await?)
    }
}

#[async_trait]
impl CanonicalizationOracle for HttpOracle {
    async fn canonicalize(
        &self,
        items: &[(String, String)],
    ) -> Result<Vec<CanonicalOverride>, OracleError> {
        let body = CanonicalizeBody {
            items: items
                .iter()
                .map(|(name, unit)| WireItem {
                    name: name.clone(),
                    unit: unit.clone(),
                })
                .collect(),
        };
        let response: CanonicalizeBody = self.post("canonicalize", &body).await?;
        Ok(response
            .items
            .into_iter()
            .map(|item| CanonicalOverride {
                name: item.name,
                unit: item.unit,
            })
            .collect())
    }
}

#[async_trait]
impl CatalogOracle for HttpOracle {
    async fn convert_quantity(
        &self,
        quantity: f64,
        unit: &str,
        name: &str,
    ) -> Result<f64, OracleError> {
        let body = ConvertRequest {
            quantity,
            unit,
            ingredient: name,
        };
        let response: ConvertResponse = self.post("convert", &body).await?;
        Ok(response.value)
    }

    async fn match_candidates(
        &self,
        requirement: &Requirement,
        listing: &[Product],
    ) -> Result<Vec<String>, OracleError> {
        let body = CandidatesRequest {
            requirement,
            products: listing
                .iter()
                .map(|p| ListedProduct {
                    id: &p.id,
                    name: &p.name,
                    ingredient_type: &p.ingredient_type,
                    form: p.form.as_deref(),
                })
                .collect(),
        };
        let response: CandidatesResponse = self.post("candidates", &body).await?;
        Ok(response.ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecoveryConfig;
    use crate::ingredient_model::{Category, Form};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingOracle {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CanonicalizationOracle for FailingOracle {
        async fn canonicalize(
            &self,
            _items: &[(String, String)],
        ) -> Result<Vec<CanonicalOverride>, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(OracleError::Transport("connection refused".to_string()))
        }
    }

    struct SlowOracle;

    #[async_trait]
    impl CanonicalizationOracle for SlowOracle {
        async fn canonicalize(
            &self,
            items: &[(String, String)],
        ) -> Result<Vec<CanonicalOverride>, OracleError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(items.iter().map(|(n, u)| CanonicalOverride::new(n, u)).collect())
        }
    }

    fn row(name: &str) -> FlattenedRow {
        FlattenedRow {
            name: name.to_string(),
            unit: "g".to_string(),
            form: Form::Fresh,
            total: Some(1.0),
            category: Category::Other,
            optional: false,
            pantry_item: false,
        }
    }

    #[tokio::test]
    async fn test_breaker_stops_calling_failing_oracle() {
        let config = OracleConfig {
            recovery: RecoveryConfig {
                circuit_breaker_threshold: 2,
                circuit_breaker_reset_secs: 60,
            },
            ..OracleConfig::default()
        };
        let guarded = GuardedOracle::new(FailingOracle { calls: AtomicUsize::new(0) }, &config);
        let rows = vec![row("flour")];

        for _ in 0..4 {
            assert!(guarded.canonical_overrides(&rows).await.is_none());
        }
        assert_eq!(guarded.inner().calls.load(Ordering::SeqCst), 2);
        assert!(guarded.breaker().is_open());
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let config = OracleConfig {
            timeout_secs: 0,
            ..OracleConfig::default()
        };
        let guarded = GuardedOracle::new(SlowOracle, &config);
        assert!(guarded.canonical_overrides(&[row("flour")]).await.is_none());
    }

    #[tokio::test]
    async fn test_empty_rows_skip_oracle() {
        let failing = FailingOracle {
            calls: AtomicUsize::new(0),
        };
        let guarded = GuardedOracle::new(failing, &OracleConfig::default());
        assert!(guarded.canonical_overrides(&[]).await.is_none());
        assert_eq!(guarded.inner().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_http_oracle_from_config() {
        assert!(HttpOracle::from_config(&OracleConfig::default()).is_none());
        let config = OracleConfig {
            endpoint: Some("http://localhost:9000/".to_string()),
            ..OracleConfig::default()
        };
        let oracle = HttpOracle::from_config(&config).unwrap();
        assert_eq!(oracle.endpoint, "http://localhost:9000");
    }
}
