//! Columns command - list the columns available for criteria.

use csvsift_core::{discover_columns, Config};
use std::path::Path;

/// Run the columns command.
pub fn run(
    config: &Config,
    folder: &Path,
    recursive: Option<bool>,
    quiet: bool,
) -> anyhow::Result<()> {
    let recursive = recursive.unwrap_or(config.scan.recursive);
    let columns = discover_columns(folder, recursive, &config.scan)?;

    for column in &columns {
        println!("{}", column);
    }

    if !quiet {
        eprintln!("Discovered {} columns.", columns.len());
    }
    Ok(())
}
