//! Connectors command implementation.

use super::App;
use anyhow::Result;

/// List the built-in connectors.
pub(crate) fn list_connectors(app: &App) -> Result<()> {
    let registry = app.connectors()?;

    println!("{:<15}", "NAME");
    println!("{}", "-".repeat(15));
    for name in registry.names() {
        println!("{name:<15}");
    }

    println!("\nTotal: {} connectors", registry.len());
    Ok(())
}
