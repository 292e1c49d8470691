use anyhow::{Context, Result};

use recall_lib::progress::ProgressStore;
use recall_lib::review::ReviewSelector;
use recall_lib::vocabulary::ItemCatalog;

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

pub fn run(app: &App, days: u32, format: &OutputFormat, use_color: bool) -> Result<()> {
    let items = app.vocabulary.item_ids().context("Failed to list items")?;
    let now = app.now();
    let selector = ReviewSelector::new(app.store.as_ref());

    let summary = selector.summary(&items, now).context("Failed to summarize progress")?;
    let forecast = selector.upcoming(&items, now, days).context("Failed to forecast reviews")?;
    let usage = app.store.usage().context("Failed to read storage usage")?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "summary": summary,
                "forecast": forecast,
                "storage": usage,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Items:     {}", summary.total_items);
            println!("  New:      {}", summary.new_items);
            println!("  Learning: {}", summary.learning_items);
            println!("  Mature:   {}", summary.mature_items);
            println!("Due now:   {}", paint(&summary.due_items.to_string(), Color::YELLOW, use_color));
            println!("Lapses:    {}", summary.total_lapses);

            if !forecast.is_empty() {
                println!("\nUpcoming:");
                for (day, count) in forecast.iter().enumerate() {
                    let label = if day == 0 { "tomorrow".to_string() } else { format!("day {}", day + 1) };
                    println!("  {:<9} {:>4} {}", label, count, "\u{2587}".repeat((*count).min(40)));
                }
            }

            let percent = if usage.capacity_bytes > 0 {
                usage.used_bytes as f64 * 100.0 / usage.capacity_bytes as f64
            } else {
                0.0
            };
            println!(
                "\nStorage:   {} of {} bytes ({:.1}%) in {}",
                usage.used_bytes,
                usage.capacity_bytes,
                percent,
                app.data_dir.display()
            );
        }
    }

    Ok(())
}
