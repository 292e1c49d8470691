use anyhow::{Context, Result};

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, query: &str, format: &OutputFormat) -> Result<()> {
    let item = app.find_item(query)?;
    let mut coordinator = app.coordinator();
    let removed = coordinator.remove_item(item.id).context("Failed to remove item")?;
    // Also sweeps progress a failed delete left behind
    coordinator.purge_orphans().context("Failed to clean up progress")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&removed)?);
        }
        OutputFormat::Plain => {
            println!("Removed \"{}\" and its review progress", removed.term);
        }
    }

    Ok(())
}
