use anyhow::{bail, Context, Result};
use log::info;
use std::env;
use std::path::PathBuf;

use grocery_planner::config::PlannerConfig;
use grocery_planner::planner::{load_request, run_plan};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let path = match env::args().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => bail!("usage: grocery-planner <request.json>"),
    };

    // Loads .env before reading variables
    let config = PlannerConfig::from_env();

    info!("Planning from {}", path.display());
    let request = load_request(&path)?;
    let report = run_plan(&request, &config).await?;

    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    println!("{}", json);
    Ok(())
}
