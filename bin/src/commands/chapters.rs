//! Chapters command implementation.

use super::{App, fetch_manga};
use crate::display::print_chapters;
use anyhow::Result;

/// List the chapters of the manga at `url`.
pub(crate) async fn list_chapters(app: &App, connector: &str, url: &str) -> Result<()> {
    let connector = app.connector(connector)?;
    let manga = fetch_manga(connector.as_ref(), url).await?;
    let chapters = connector.list_chapters(&manga).await;

    print_chapters(&manga, &chapters, &app.settings.download_location);
    Ok(())
}
