//! Core data types for scan results.

use serde::{Deserialize, Serialize};

/// Label of the first provenance column in synthesized header rows
pub const ARCHIVE_COLUMN: &str = "Source ZIP Archive";

/// Label of the second provenance column in synthesized header rows
pub const ENTRY_COLUMN: &str = "Source CSV File";

/// Whether a result row carries data or header labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowKind {
    /// Synthesized once per archive entry, before its first match
    Header,
    /// A matching data row
    Match,
}

/// One output row, prefixed with the archive and entry it came from.
///
/// `fields` is `[archive name, entry path, ...original CSV fields]`. For
/// header rows the first two fields are the provenance column labels and the
/// rest are the entry's header labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRow {
    pub kind: RowKind,
    pub fields: Vec<String>,
}

impl ResultRow {
    /// Build the synthetic header row for an entry.
    pub fn header<S: AsRef<str>>(headers: &[S]) -> Self {
        ResultRow {
            kind: RowKind::Header,
            fields: prefixed(ARCHIVE_COLUMN, ENTRY_COLUMN, headers),
        }
    }

    /// Build a provenance-prefixed data row.
    pub fn matched<S: AsRef<str>>(archive: &str, entry: &str, values: &[S]) -> Self {
        ResultRow {
            kind: RowKind::Match,
            fields: prefixed(archive, entry, values),
        }
    }

    /// Returns true for synthesized header rows
    pub fn is_header(&self) -> bool {
        self.kind == RowKind::Header
    }

    /// The original CSV fields, without the provenance prefix
    pub fn values(&self) -> &[String] {
        self.fields.get(2..).unwrap_or(&[])
    }
}

fn prefixed<S: AsRef<str>>(first: &str, second: &str, rest: &[S]) -> Vec<String> {
    let mut fields = Vec::with_capacity(rest.len() + 2);
    fields.push(first.to_string());
    fields.push(second.to_string());
    fields.extend(rest.iter().map(|s| s.as_ref().to_string()));
    fields
}

/// Number of data rows (headers excluded) in a result set
pub fn count_matches(rows: &[ResultRow]) -> usize {
    rows.iter().filter(|r| !r.is_header()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_row() {
        let row = ResultRow::header(&["Name", "Age"]);
        assert!(row.is_header());
        assert_eq!(
            row.fields,
            vec!["Source ZIP Archive", "Source CSV File", "Name", "Age"]
        );
        assert_eq!(row.values(), &["Name".to_string(), "Age".to_string()]);
    }

    #[test]
    fn test_matched_row() {
        let row = ResultRow::matched("people.zip", "2024/people.csv", &["Alice", "30"]);
        assert!(!row.is_header());
        assert_eq!(row.fields[0], "people.zip");
        assert_eq!(row.fields[1], "2024/people.csv");
        assert_eq!(row.values().len(), 2);
    }

    #[test]
    fn test_count_matches_skips_headers() {
        let rows = vec![
            ResultRow::header(&["Name"]),
            ResultRow::matched("a.zip", "a.csv", &["x"]),
            ResultRow::matched("a.zip", "a.csv", &["y"]),
        ];
        assert_eq!(count_matches(&rows), 2);
    }
}
