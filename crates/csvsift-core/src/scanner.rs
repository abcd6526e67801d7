//! Streaming scan of CSV entries inside ZIP archives.
//!
//! For every CSV entry the scanner reads the header line, maps each
//! criterion's column to a header index, then streams the remaining lines one
//! at a time through the compiled [`Expression`]. Entries are never loaded
//! into memory whole.
//!
//! ## Known Limitation
//!
//! Lines are split on every comma. Quoted fields with embedded commas or
//! quotes are not recognised, in headers or in data rows.

use crate::criteria::Criterion;
use crate::error::{Result, SiftError};
use crate::expr::{ColumnLookup, Expression};
use crate::progress::CancelToken;
use crate::types::ResultRow;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::ZipArchive;

/// Default extension of archives to scan
pub const DEFAULT_ARCHIVE_EXTENSION: &str = "zip";

/// Default extension of archive entries to scan
pub const DEFAULT_ENTRY_EXTENSION: &str = "csv";

/// Case-insensitive check that `name` ends with `.ext`.
pub fn has_extension(name: &str, ext: &str) -> bool {
    let ext = ext.trim_start_matches('.');
    name.rsplit_once('.')
        .map_or(false, |(_, e)| e.eq_ignore_ascii_case(ext))
}

/// Display name of an archive: its file name.
pub fn archive_display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// List archives under `folder`, sorted by file name within each directory.
///
/// Only the folder's own files are listed unless `recursive` is set.
pub fn find_archives(folder: &Path, recursive: bool, extension: &str) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(SiftError::FolderNotFound {
            path: folder.to_path_buf(),
        });
    }

    let mut walker = WalkDir::new(folder).min_depth(1).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut archives = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| SiftError::Enumeration {
            path: e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| folder.to_path_buf()),
            reason: e.to_string(),
        })?;
        let is_archive = entry.path().is_file()
            && has_extension(&entry.file_name().to_string_lossy(), extension);
        if is_archive {
            archives.push(entry.into_path());
        }
    }

    debug!(folder = %folder.display(), recursive, count = archives.len(), "Archives found");
    Ok(archives)
}

/// Read one line, without its terminator, decoding invalid UTF-8 lossily.
pub(crate) fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<Option<String>> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(None);
    }
    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}

/// Strip a UTF-8 byte-order mark from the start of a header line.
pub(crate) fn strip_bom(line: &str) -> &str {
    line.strip_prefix('\u{feff}').unwrap_or(line)
}

/// Header index for each criterion column found in one entry.
#[derive(Debug, Default)]
pub struct ColumnMap {
    indices: HashMap<String, usize>,
}

impl ColumnMap {
    /// Match every named criterion column against the trimmed header labels,
    /// ignoring case. The first matching header wins.
    pub fn resolve<S: AsRef<str>>(headers: &[S], criteria: &[Criterion]) -> Self {
        let mut indices = HashMap::new();
        for criterion in criteria {
            if criterion.column_name.is_empty() {
                continue;
            }
            let wanted = criterion.column_name.to_lowercase();
            if let Some(index) = headers
                .iter()
                .position(|h| h.as_ref().trim().to_lowercase() == wanted)
            {
                indices.insert(criterion.column_name.clone(), index);
            }
        }
        ColumnMap { indices }
    }

    /// Header index of a criterion column
    pub fn index(&self, column: &str) -> Option<usize> {
        self.indices.get(column).copied()
    }

    /// Returns true if no criterion column was found
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// One data line seen through the entry's column map.
struct RowView<'a> {
    columns: &'a ColumnMap,
    values: &'a [&'a str],
}

impl ColumnLookup for RowView<'_> {
    fn value(&self, column: &str) -> Option<&str> {
        self.columns
            .index(column)
            .and_then(|i| self.values.get(i).copied())
    }
}

/// Counters for one archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    /// CSV entries whose rows were read
    pub entries_scanned: usize,
    /// CSV entries skipped because no criterion column was present
    pub entries_skipped: usize,
    /// Non-blank data lines evaluated
    pub rows_read: u64,
    /// Data lines that matched
    pub rows_matched: u64,
    /// Cancellation was observed before every entry was visited
    pub cancelled: bool,
}

/// Scans archives against one compiled query.
pub struct ArchiveScanner<'a> {
    criteria: &'a [Criterion],
    expression: &'a Expression,
    entry_extension: String,
}

impl<'a> ArchiveScanner<'a> {
    /// Create a scanner for the given active criteria and their expression.
    pub fn new(criteria: &'a [Criterion], expression: &'a Expression) -> Self {
        ArchiveScanner {
            criteria,
            expression,
            entry_extension: DEFAULT_ENTRY_EXTENSION.to_string(),
        }
    }

    /// Scan entries with a different extension
    pub fn with_entry_extension(mut self, extension: impl Into<String>) -> Self {
        self.entry_extension = extension.into();
        self
    }

    /// Open and scan an archive file, appending results to `out`.
    ///
    /// Rows appended before an error stay in `out`.
    pub fn scan_file(
        &self,
        path: &Path,
        cancel: &CancelToken,
        out: &mut Vec<ResultRow>,
    ) -> Result<ArchiveStats> {
        let name = archive_display_name(path);
        let file = File::open(path).map_err(|e| SiftError::archive(&name, e))?;
        self.scan_archive(&name, BufReader::new(file), cancel, out)
    }

    /// Scan an already-open archive, appending results to `out`.
    pub fn scan_archive<R: Read + Seek>(
        &self,
        archive_name: &str,
        reader: R,
        cancel: &CancelToken,
        out: &mut Vec<ResultRow>,
    ) -> Result<ArchiveStats> {
        let mut archive = ZipArchive::new(reader).map_err(|e| SiftError::archive(archive_name, e))?;
        let mut stats = ArchiveStats::default();

        for index in 0..archive.len() {
            let entry = archive
                .by_index(index)
                .map_err(|e| SiftError::archive(archive_name, e))?;
            if entry.is_dir() || !has_extension(entry.name(), &self.entry_extension) {
                continue;
            }
            if cancel.is_cancelled() {
                stats.cancelled = true;
                break;
            }

            let entry_name = entry.name().to_string();
            match self.scan_entry(archive_name, &entry_name, entry, out)? {
                Some((read, matched)) => {
                    stats.entries_scanned += 1;
                    stats.rows_read += read;
                    stats.rows_matched += matched;
                }
                None => stats.entries_skipped += 1,
            }
        }

        info!(
            archive = %archive_name,
            entries = stats.entries_scanned,
            skipped = stats.entries_skipped,
            rows = stats.rows_read,
            matched = stats.rows_matched,
            "Archive scanned"
        );
        Ok(stats)
    }

    /// Stream one CSV entry. Returns `None` when the entry was skipped,
    /// otherwise the number of rows read and matched.
    fn scan_entry<R: Read>(
        &self,
        archive_name: &str,
        entry_name: &str,
        reader: R,
        out: &mut Vec<ResultRow>,
    ) -> Result<Option<(u64, u64)>> {
        let read_error =
            |e: io::Error| SiftError::archive(archive_name, format!("{}: {}", entry_name, e));

        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();

        let Some(header_line) = read_line(&mut reader, &mut buf).map_err(read_error)? else {
            debug!(archive = %archive_name, entry = %entry_name, "Empty entry skipped");
            return Ok(None);
        };
        let headers: Vec<&str> = strip_bom(&header_line).split(',').collect();

        let columns = ColumnMap::resolve(&headers, self.criteria);
        if columns.is_empty() {
            debug!(archive = %archive_name, entry = %entry_name, "No query column in entry, skipped");
            return Ok(None);
        }

        let mut header_emitted = false;
        let mut read = 0u64;
        let mut matched = 0u64;

        while let Some(line) = read_line(&mut reader, &mut buf).map_err(read_error)? {
            if line.trim().is_empty() {
                continue;
            }
            read += 1;

            let values: Vec<&str> = line.split(',').collect();
            let row = RowView {
                columns: &columns,
                values: &values,
            };
            if self.expression.evaluate(&row) {
                if !header_emitted {
                    out.push(ResultRow::header(&headers));
                    header_emitted = true;
                }
                out.push(ResultRow::matched(archive_name, entry_name, &values));
                matched += 1;
            }
        }

        debug!(archive = %archive_name, entry = %entry_name, rows = read, matched, "Entry scanned");
        Ok(Some((read, matched)))
    }
}
