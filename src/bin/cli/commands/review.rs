use std::collections::HashMap;
use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

use recall_lib::progress::ProgressStoreError;
use recall_lib::scheduling::{format_interval, Grade, ItemId};
use recall_lib::session::{SessionCoordinator, SessionError, SessionStats};
use recall_lib::vocabulary::VocabularyItem;

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

/// What the learner typed at a prompt
enum Input {
    Line(String),
    Quit,
}

fn prompt(stdin: &mut impl BufRead, text: &str) -> Result<Input> {
    print!("{}", text);
    io::stdout().flush()?;

    let mut line = String::new();
    if stdin.read_line(&mut line)? == 0 {
        return Ok(Input::Quit);
    }
    let line = line.trim().to_string();
    if line.eq_ignore_ascii_case("q") {
        return Ok(Input::Quit);
    }
    Ok(Input::Line(line))
}

pub fn run(app: &App, limit: Option<usize>, format: &OutputFormat, use_color: bool) -> Result<()> {
    let mut coordinator = app.coordinator();
    let limit = limit.unwrap_or(coordinator.config().default_limit);

    let queue = coordinator.start_session(limit).context("Failed to start session")?;
    let items: HashMap<ItemId, VocabularyItem> = app.list_items()?.into_iter().map(|i| (i.id, i)).collect();

    let outcome = if queue.is_empty() {
        println!("Nothing is due. Come back later!");
        Ok(())
    } else {
        println!("{} items to review. Type q to stop.\n", queue.len());
        review_queue(&mut coordinator, &queue, &items, use_color)
    };

    // Always close the session, even when reviewing failed part way
    let stats = coordinator.end_session().context("Failed to end session")?;
    outcome?;

    if !queue.is_empty() {
        print_stats(&stats, format, use_color)?;
    }
    Ok(())
}

fn review_queue(
    coordinator: &mut SessionCoordinator,
    queue: &[ItemId],
    items: &HashMap<ItemId, VocabularyItem>,
    use_color: bool,
) -> Result<()> {
    let stdin = io::stdin();
    let mut stdin = stdin.lock();

    for (n, item_id) in queue.iter().enumerate() {
        let Some(item) = items.get(item_id) else {
            continue;
        };

        println!("[{}/{}] {}", n + 1, queue.len(), paint(&item.term, Color::BOLD, use_color));
        if let Input::Quit = prompt(&mut stdin, "  (Enter to reveal) ")? {
            return Ok(());
        }

        println!("  {}", paint(&item.definition, Color::CYAN, use_color));
        if let Some(example) = &item.example {
            println!("  {}", paint(example, Color::GRAY, use_color));
        }

        let progress = coordinator.progress(*item_id).context("Failed to read progress")?;
        let [again, hard, good, easy] = coordinator.engine().preview_intervals(&progress);
        let choices = format!(
            "  1) Again {}  2) Hard {}  3) Good {}  4) Easy {}\n  > ",
            format_interval(again),
            format_interval(hard),
            format_interval(good),
            format_interval(easy)
        );

        let grade = loop {
            match prompt(&mut stdin, &choices)? {
                Input::Quit => return Ok(()),
                Input::Line(line) => match line.parse::<Grade>() {
                    Ok(grade) => break grade,
                    Err(e) => println!("  {}", paint(&e.to_string(), Color::RED, use_color)),
                },
            }
        };

        match coordinator.submit_review(*item_id, grade) {
            Ok(record) => {
                let next = format_interval(record.interval_days);
                println!("  {}\n", paint(&format!("Next review in {}", next), Color::GREEN, use_color));
            }
            Err(SessionError::Store(ProgressStoreError::CapacityExceeded { required, budget, .. })) => {
                eprintln!(
                    "{}",
                    paint(
                        &format!(
                            "Progress storage is full ({} of {} bytes). This review was not saved; remove unused items or raise storage.capacity_bytes.",
                            required, budget
                        ),
                        Color::RED,
                        use_color
                    )
                );
                return Ok(());
            }
            Err(e) => return Err(e).context("Failed to save review"),
        }
    }

    Ok(())
}

fn print_stats(stats: &SessionStats, format: &OutputFormat, use_color: bool) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(stats)?);
        }
        OutputFormat::Plain => {
            println!("Session complete");
            println!(
                "  Reviewed: {}  Passed: {}  Failed: {}",
                stats.reviewed,
                paint(&stats.passed.to_string(), Color::GREEN, use_color),
                paint(&stats.failed.to_string(), Color::RED, use_color),
            );
            if stats.remaining > 0 {
                println!("  Left for later: {}", stats.remaining);
            }
            if !stats.streak_distribution.is_empty() {
                let streaks = stats
                    .streak_distribution
                    .iter()
                    .map(|(streak, count)| format!("{}\u{00d7}{}", count, streak))
                    .collect::<Vec<_>>()
                    .join("  ");
                println!("  Streaks: {}", streaks);
            }
        }
    }
    Ok(())
}
