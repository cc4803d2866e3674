//! Config command implementation.

use super::App;
use anyhow::{Context, Result};

/// Print the resolved settings as TOML, or only the config file path.
pub(crate) fn show_config(app: &App, path_only: bool) -> Result<()> {
    if path_only {
        println!("{}", app.config_path.display());
        return Ok(());
    }

    let rendered =
        toml::to_string_pretty(app.settings.as_ref()).context("Failed to render settings")?;
    println!("# {}", app.config_path.display());
    print!("{rendered}");
    Ok(())
}
