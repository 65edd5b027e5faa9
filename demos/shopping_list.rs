//! # Shopping List Example
//!
//! Merges two recipes into one shopping list, then picks the cheapest
//! products from a small catalog. No oracle is configured, so everything
//! runs on the built-in tables.

use grocery_planner::aggregator::Aggregator;
use grocery_planner::cart::build_cart;
use grocery_planner::config::MatcherConfig;
use grocery_planner::grocery_list::GroceryListBuilder;
use grocery_planner::ingredient_model::{Category, Form, IngredientRequirement, Recipe};
use grocery_planner::procurement::{ProcurementMatcher, Product, Requirement};
use std::collections::HashMap;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🛒 Shopping List Example");
    println!("========================\n");

    let soup = Recipe::from_requirements(
        1,
        "Potato soup",
        4.0,
        &[
            IngredientRequirement::new("potatoes", "1 1/2", "lb").with_category(Category::Produce),
            IngredientRequirement::new("yellow onion", "1", "").with_category(Category::Produce),
            IngredientRequirement::new("garlic cloves", "3", "cloves"),
            IngredientRequirement::new("kosher salt", "to taste", "")
                .with_category(Category::Spice)
                .pantry(),
        ],
    )?;
    let salad = Recipe::from_requirements(
        2,
        "Corn salad",
        2.0,
        &[
            IngredientRequirement::new("corn", "1", "cup").with_form(Form::Canned),
            IngredientRequirement::new("onion", "1/2", "").with_category(Category::Produce),
            IngredientRequirement::new("garlic", "1", "clove"),
            IngredientRequirement::new("salt", "1", "pinch").pantry(),
        ],
    )?;

    for recipe in [&soup, &salad] {
        println!("{}", recipe);
    }

    // Cook the salad for 4
    let mut servings = HashMap::new();
    servings.insert(2, 4.0);

    let recipes = vec![soup, salad];
    let builder = GroceryListBuilder::new(Aggregator::default());
    let items = builder.build_grocery_list(&recipes, &servings, None).await;

    println!("📝 Grocery list:");
    for item in &items {
        let bulk = if item.prefer_bulk { " (bulk ok)" } else { "" };
        println!("  {}. {} - {}{}", item.index, item.name, item.amount_str, bulk);
    }

    let catalog = vec![
        Product::new("potato-1kg", "Potatoes 1 kg", "potato", 1200.0, 1.0, "kg"),
        Product::new("potato-3kg", "Potatoes 3 kg", "potato", 2900.0, 3.0, "kg"),
        Product::new("onion-3", "Onions x3", "onion", 700.0, 3.0, "each"),
        Product::new("garlic-100", "Garlic 100 g", "garlic", 800.0, 100.0, "g"),
    ];
    let requirements = vec![
        Requirement::new("potato", 1.5, "lb"),
        Requirement::new("onion", 2.0, ""),
        Requirement::new("garlic", 5.0, "cloves"),
        Requirement::new("corn", 2.0, "cup").with_form("canned"),
    ];

    let matcher = ProcurementMatcher::with_config(MatcherConfig::default());
    let cart = build_cart(&requirements, &catalog, &matcher).await;

    println!("\n🧾 Cart:");
    for item in &cart.items {
        println!(
            "  {} → {} x{} = {:.0}",
            item.ingredient, item.product_name, item.quantity, item.price
        );
    }
    for name in cart.unresolved_names() {
        println!("  {} → no matching product", name);
    }
    println!("  Total: {:.0}", cart.total_price());

    Ok(())
}
