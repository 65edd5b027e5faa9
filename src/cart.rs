//! # Cart Building
//!
//! Resolves every requirement against the catalog and collects the purchase
//! plans into cart items. Requirements are independent, so they are resolved
//! concurrently and joined at the end; the output keeps requirement order.
//!
//! Actually adding items to an external cart is delegated to a [`CartFiller`].
//! A failure there is reported but never changes the plan.

use async_trait::async_trait;
use futures::future::join_all;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::procurement::{NoMatchReason, Product, Requirement, RequirementResolver, Resolution};

/// A resolved cart line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Requirement name this item satisfies
    pub ingredient: String,
    pub product_id: String,
    pub product_name: String,
    /// Number of packages
    pub quantity: u32,
    /// Total price for all packages
    pub price: f64,
}

/// A requirement that could not be matched to any product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnresolvedItem {
    pub ingredient: String,
    pub reason: NoMatchReason,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
    pub unresolved: Vec<UnresolvedItem>,
}

impl Cart {
    pub fn total_price(&self) -> f64 {
        self.items.iter().map(|item| item.price).sum()
    }

    /// Names of the requirements that were not matched
    pub fn unresolved_names(&self) -> Vec<&str> {
        self.unresolved.iter().map(|u| u.ingredient.as_str()).collect()
    }
}

/// Resolve all requirements concurrently
pub async fn build_cart<R>(requirements: &[Requirement], catalog: &[Product], resolver: &R) -> Cart
where
    R: RequirementResolver + ?Sized,
{
    let resolutions = join_all(requirements.iter().map(|r| resolver.resolve(r, catalog))).await;

    let mut cart = Cart::default();
    for (requirement, resolution) in requirements.iter().zip(resolutions) {
        match resolution {
            Resolution::Resolved(plan) => cart.items.push(CartItem {
                ingredient: requirement.name.clone(),
                product_id: plan.product_id,
                product_name: plan.product_name,
                quantity: plan.package_count,
                price: plan.total_price,
            }),
            Resolution::Unresolved(reason) => {
                info!("Leaving '{}' out of the cart: {}", requirement.name, reason);
                cart.unresolved.push(UnresolvedItem {
                    ingredient: requirement.name.clone(),
                    reason,
                });
            }
        }
    }

    info!(
        "Cart: {} items, {} unresolved, total {:.2}",
        cart.items.len(),
        cart.unresolved.len(),
        cart.total_price()
    );
    cart
}

/// External collaborator that puts a planned item into a real cart
#[async_trait]
pub trait CartFiller: Send + Sync {
    async fn add_to_cart(&self, item: &CartItem) -> anyhow::Result<()>;
}

/// A cart item the filler could not add
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillFailure {
    pub product_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartReport {
    pub added: Vec<String>,
    pub failed: Vec<FillFailure>,
}

impl CartReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Hand every cart item to the filler, one at a time, recording failures
pub async fn fill_cart<F>(cart: &Cart, filler: &F) -> CartReport
where
    F: CartFiller + ?Sized,
{
    let mut report = CartReport::default();
    for item in &cart.items {
        match filler.add_to_cart(item).await {
            Ok(()) => report.added.push(item.product_id.clone()),
            Err(e) => {
                warn!("Failed to add '{}' to cart: {:#}", item.product_id, e);
                report.failed.push(FillFailure {
                    product_id: item.product_id.clone(),
                    error: format!("{:#}", e),
                });
            }
        }
    }
    report
}
