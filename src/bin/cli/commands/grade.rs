use anyhow::{bail, Context, Result};

use recall_lib::scheduling::{format_interval, Grade};
use recall_lib::session::SessionError;

use crate::app::App;
use crate::render::terminal::describe_due;
use crate::OutputFormat;

pub fn run(app: &App, query: &str, grade: &str, format: &OutputFormat, _use_color: bool) -> Result<()> {
    let grade: Grade = grade.parse()?;
    let item = app.find_item(query)?;

    let mut coordinator = app.coordinator();
    coordinator.start_session(usize::MAX).context("Failed to start session")?;
    let result = coordinator.submit_review(item.id, grade);
    coordinator.end_session().context("Failed to end session")?;

    let record = match result {
        Ok(record) => record,
        Err(SessionError::NotInSession(_)) => {
            let progress = coordinator.progress(item.id).context("Failed to read progress")?;
            bail!(
                "\"{}\" is not due yet ({})",
                item.term,
                describe_due(progress.next_review_at, app.now())
            );
        }
        Err(e) => return Err(e).context("Failed to save review"),
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        OutputFormat::Plain => {
            println!(
                "Graded \"{}\" {}: streak {}, next review in {}",
                item.term,
                grade,
                record.streak,
                format_interval(record.interval_days)
            );
        }
    }

    Ok(())
}
