use chrono::{DateTime, Utc};

use recall_lib::scheduling::format_interval;

/// ANSI color codes
#[allow(dead_code)]
pub struct Color;

#[allow(dead_code)]
impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";
}

/// Wrap text in a color when colors are enabled
pub fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", color, text, Color::RESET)
    } else {
        text.to_string()
    }
}

/// Describe when an item is next due, relative to `now`
pub fn describe_due(next_review_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match next_review_at {
        None => "new".to_string(),
        Some(due) if due <= now => {
            let overdue = (now - due).num_days();
            if overdue == 0 {
                "due".to_string()
            } else {
                format!("overdue {}", format_interval(overdue.min(u32::MAX as i64) as u32))
            }
        }
        Some(due) => {
            let days = (due - now).num_days().max(0) as u32;
            if days == 0 {
                "later today".to_string()
            } else {
                format!("in {}", format_interval(days))
            }
        }
    }
}

/// Shorten text to `width` characters, marking the cut with an ellipsis
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{}\u{2026}", kept)
}

/// Print a separator line under a header of the given column widths
pub fn rule(widths: &[usize]) -> String {
    widths
        .iter()
        .map(|w| "\u{2500}".repeat(*w))
        .collect::<Vec<_>>()
        .join(" ")
}
