//! Column discovery.
//!
//! Reads the header line of the first CSV entry in the first archive found,
//! so callers can offer column names before any criteria are filled in. No
//! data rows are read.

use crate::config::ScanConfig;
use crate::error::{Result, SiftError};
use crate::scanner::{archive_display_name, find_archives, has_extension, read_line, strip_bom};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tracing::info;
use zip::ZipArchive;

/// Discover the columns of the first CSV entry of the first archive under
/// `folder`.
pub fn discover_columns(folder: &Path, recursive: bool, scan: &ScanConfig) -> Result<Vec<String>> {
    let archives = find_archives(folder, recursive, &scan.archive_extension)?;
    let first = archives.first().ok_or_else(|| SiftError::NoArchives {
        folder: folder.to_path_buf(),
    })?;

    let name = archive_display_name(first);
    let file = File::open(first).map_err(|e| SiftError::archive(&name, e))?;
    let columns = read_columns(&name, BufReader::new(file), &scan.entry_extension)?;

    info!(archive = %name, columns = columns.len(), "Columns discovered");
    Ok(columns)
}

/// Read the trimmed header labels of the first matching entry in an archive.
pub fn read_columns<R: Read + Seek>(
    archive_name: &str,
    reader: R,
    entry_extension: &str,
) -> Result<Vec<String>> {
    let mut archive = ZipArchive::new(reader).map_err(|e| SiftError::archive(archive_name, e))?;

    for index in 0..archive.len() {
        let entry = archive
            .by_index(index)
            .map_err(|e| SiftError::archive(archive_name, e))?;
        if entry.is_dir() || !has_extension(entry.name(), entry_extension) {
            continue;
        }

        let entry_name = entry.name().to_string();
        let mut reader = BufReader::new(entry);
        let mut buf = Vec::new();
        let header = read_line(&mut reader, &mut buf)
            .map_err(|e| SiftError::archive(archive_name, format!("{}: {}", entry_name, e)))?
            .ok_or_else(|| SiftError::EmptyEntry {
                archive: archive_name.to_string(),
                entry: entry_name.clone(),
            })?;

        return Ok(strip_bom(&header)
            .split(',')
            .map(|h| h.trim().to_string())
            .collect());
    }

    Err(SiftError::NoCsvEntries {
        archive: archive_name.to_string(),
    })
}
