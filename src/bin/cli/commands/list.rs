use anyhow::{Context, Result};

use crate::app::App;
use crate::render::terminal::{describe_due, paint, rule, truncate, Color};
use crate::OutputFormat;

pub fn run(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let items = app.list_items()?;
    let coordinator = app.coordinator();
    let now = app.now();

    match format {
        OutputFormat::Json => {
            let mut output = Vec::new();
            for item in &items {
                let progress = coordinator.progress(item.id).context("Failed to read progress")?;
                output.push(serde_json::json!({
                    "item": item,
                    "progress": progress,
                }));
            }
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if items.is_empty() {
                println!("No items yet. Add one with `recall-cli add <term> <definition>`.");
                return Ok(());
            }

            let term_w = items.iter().map(|i| i.term.chars().count()).max().unwrap_or(4).clamp(4, 30);
            let id_w = 8;

            println!("{:<id_w$} {:<term_w$} {:>6} {:>5} {}", "ID", "Term", "Streak", "Ease", "Next");
            println!("{}", rule(&[id_w, term_w, 6, 5, 12]));

            for item in &items {
                let progress = coordinator.progress(item.id).context("Failed to read progress")?;
                let due = describe_due(progress.next_review_at, now);
                let due = if progress.is_due(now) {
                    paint(&due, Color::YELLOW, use_color)
                } else {
                    due
                };
                println!(
                    "{:<id_w$} {:<term_w$} {:>6} {:>5.2} {}",
                    &item.id.to_string()[..id_w],
                    truncate(&item.term, term_w),
                    progress.streak,
                    progress.ease_factor,
                    due,
                );
            }

            println!("\n{} items total", items.len());
        }
    }

    Ok(())
}
