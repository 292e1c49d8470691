use anyhow::Result;

use recall_lib::vocabulary::NewItem;

use crate::app::App;
use crate::OutputFormat;

pub fn run(
    app: &App,
    term: String,
    definition: String,
    example: Option<String>,
    tags: Option<&str>,
    format: &OutputFormat,
) -> Result<()> {
    let tag_list = tags
        .map(|t| {
            t.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let item = app.add_item(NewItem {
        term,
        definition,
        example,
        tags: tag_list,
    })?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&item)?);
        }
        OutputFormat::Plain => {
            println!("Added \"{}\"", item.term);
            if !item.tags.is_empty() {
                println!("  Tags: {}", item.tags.iter().map(|t| format!("#{}", t)).collect::<Vec<_>>().join(" "));
            }
            println!("  ID: {}", item.id);
        }
    }

    Ok(())
}
