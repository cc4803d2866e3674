//! Search command implementation.

use super::App;
use crate::display::print_manga;
use anyhow::{Context, Result};

/// Search `connector` for `title` and print the matches.
pub(crate) async fn search(app: &App, connector: &str, title: &str, json: bool) -> Result<()> {
    let connector = app.connector(connector)?;
    let results = connector.search_manga(title).await;
    tracing::info!(connector = connector.name(), title, results = results.len(), "search finished");

    if json {
        let rendered = serde_json::to_string_pretty(&results).context("Failed to render results")?;
        println!("{rendered}");
    } else {
        print_manga(&results);
    }
    Ok(())
}
