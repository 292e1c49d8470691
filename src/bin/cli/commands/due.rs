use std::collections::HashMap;

use anyhow::{Context, Result};

use recall_lib::vocabulary::VocabularyItem;

use crate::app::App;
use crate::render::terminal::{describe_due, paint, Color};
use crate::OutputFormat;

pub fn run(app: &App, limit: Option<usize>, format: &OutputFormat, use_color: bool) -> Result<()> {
    let coordinator = app.coordinator();
    let mut due = coordinator.due_items().context("Failed to compute due items")?;
    if let Some(limit) = limit {
        due.truncate(limit);
    }

    let items: HashMap<_, VocabularyItem> = app.list_items()?.into_iter().map(|i| (i.id, i)).collect();
    let now = app.now();

    match format {
        OutputFormat::Json => {
            let mut output = Vec::new();
            for item_id in &due {
                let progress = coordinator.progress(*item_id).context("Failed to read progress")?;
                output.push(serde_json::json!({
                    "id": item_id.to_string(),
                    "term": items.get(item_id).map(|i| i.term.as_str()),
                    "nextReviewAt": progress.next_review_at.map(|d| d.to_rfc3339()),
                }));
            }
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if due.is_empty() {
                println!("Nothing is due. Come back later!");
                return Ok(());
            }

            for (n, item_id) in due.iter().enumerate() {
                let progress = coordinator.progress(*item_id).context("Failed to read progress")?;
                let term = items.get(item_id).map(|i| i.term.as_str()).unwrap_or("?");
                println!(
                    "{:>3}. {} {}",
                    n + 1,
                    paint(term, Color::BOLD, use_color),
                    paint(&format!("({})", describe_due(progress.next_review_at, now)), Color::GRAY, use_color),
                );
            }

            println!("\n{} items due", due.len());
        }
    }

    Ok(())
}
