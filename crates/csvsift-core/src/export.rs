//! CSV export of result rows.
//!
//! A field is wrapped in double quotes, with inner quotes doubled, when it
//! contains a comma, a double quote, or a newline. Every row ends with `\n`.

use crate::error::{Result, SiftError};
use crate::types::ResultRow;
use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Quote a field if needed.
pub fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Write rows as CSV.
pub fn write_rows<W: Write>(rows: &[ResultRow], writer: &mut W) -> Result<()> {
    write_csv(rows, writer)?;
    Ok(())
}

fn write_csv<W: Write>(rows: &[ResultRow], writer: &mut W) -> io::Result<()> {
    for row in rows {
        let mut first = true;
        for field in &row.fields {
            if !first {
                writer.write_all(b",")?;
            }
            first = false;
            writer.write_all(escape_field(field).as_bytes())?;
        }
        writer.write_all(b"\n")?;
    }
    Ok(())
}

/// Write rows to a CSV file, creating parent directories as needed.
///
/// Every failure is reported as [`SiftError::Export`] naming `path`.
pub fn save_to_path(rows: &[ResultRow], path: &Path) -> Result<()> {
    let export_error = |e: io::Error| SiftError::Export {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(export_error)?;
        }
    }

    let file = File::create(path).map_err(export_error)?;
    let mut writer = BufWriter::new(file);
    write_csv(rows, &mut writer).map_err(export_error)?;
    writer.flush().map_err(export_error)?;

    info!(path = %path.display(), rows = rows.len(), "Results exported");
    Ok(())
}
