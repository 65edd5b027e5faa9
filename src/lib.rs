//! # Grocery Planner
//!
//! Aggregates ingredient requirements from several recipes into one
//! deduplicated shopping list, and finds the cheapest catalog products that
//! cover each required ingredient.
//!
//! External language-model helpers are consumed through the traits in
//! [`oracle`]; every oracle call has a local fallback.

pub mod aggregator;
pub mod canonicalizer;
pub mod cart;
pub mod circuit_breaker;
pub mod config;
pub mod errors;
pub mod grocery_list;
pub mod ingredient_model;
pub mod oracle;
pub mod planner;
pub mod procurement;
pub mod quantity_parser;
pub mod unit_converter;
