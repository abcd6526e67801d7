//! The editable criteria list and its query-file persistence.
//!
//! A [`Query`] keeps criteria in order and enforces the indentation rules
//! that keep the implicit tree well formed:
//!
//! - the first criterion always sits at indent level 0
//! - a criterion may be indented only up to one level deeper than its
//!   predecessor
//! - indentation never goes below 0
//!
//! ## Query File Format
//!
//! A pretty-printed JSON array of criterion objects:
//!
//! ```json
//! [
//!   {
//!     "columnName": "Age",
//!     "searchType": "GreaterThan",
//!     "value": "18",
//!     "value2": "",
//!     "isNot": false,
//!     "logicalOperator": "AND",
//!     "indentLevel": 0
//!   }
//! ]
//! ```

use crate::criteria::Criterion;
use crate::error::{Result, SiftError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// An ordered list of criteria.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query {
    criteria: Vec<Criterion>,
}

impl Default for Query {
    fn default() -> Self {
        Query::new()
    }
}

impl Query {
    /// Create a query holding a single blank criterion.
    pub fn new() -> Self {
        Query {
            criteria: vec![Criterion::default()],
        }
    }

    /// Wrap an existing list of criteria as-is.
    pub fn from_criteria(criteria: Vec<Criterion>) -> Self {
        Query { criteria }
    }

    /// All criteria, in order
    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    /// Mutable access to a single criterion
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Criterion> {
        self.criteria.get_mut(index)
    }

    /// Number of criteria
    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    /// Returns true if the list is empty
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Append a blank criterion and return its index.
    pub fn add(&mut self) -> usize {
        self.push(Criterion::default())
    }

    /// Append a criterion and return its index.
    pub fn push(&mut self, criterion: Criterion) -> usize {
        self.criteria.push(criterion);
        self.criteria.len() - 1
    }

    /// Remove the criterion at `index`.
    ///
    /// Whatever becomes the first criterion is pulled back to indent level 0.
    pub fn remove(&mut self, index: usize) -> Result<Criterion> {
        if index >= self.criteria.len() {
            return Err(SiftError::InvalidEdit {
                reason: format!("no criterion at index {}", index),
            });
        }
        let removed = self.criteria.remove(index);
        if let Some(first) = self.criteria.first_mut() {
            first.indent_level = 0;
        }
        Ok(removed)
    }

    /// Whether the criterion at `index` has a meaningful joining operator.
    pub fn is_first(&self, index: usize) -> bool {
        index == 0
    }

    /// A criterion can be indented when it is not first and does not already
    /// sit deeper than its predecessor.
    pub fn can_indent(&self, index: usize) -> bool {
        if index == 0 || index >= self.criteria.len() {
            return false;
        }
        self.criteria[index].indent_level <= self.criteria[index - 1].indent_level
    }

    /// Increase the indent level of the criterion at `index`.
    pub fn indent(&mut self, index: usize) -> Result<()> {
        if !self.can_indent(index) {
            return Err(SiftError::InvalidEdit {
                reason: format!("criterion {} cannot be indented further", index),
            });
        }
        self.criteria[index].indent_level += 1;
        Ok(())
    }

    /// A criterion can be outdented when it is indented at all.
    pub fn can_outdent(&self, index: usize) -> bool {
        self.criteria
            .get(index)
            .map_or(false, |c| c.indent_level > 0)
    }

    /// Decrease the indent level of the criterion at `index`.
    pub fn outdent(&mut self, index: usize) -> Result<()> {
        if !self.can_outdent(index) {
            return Err(SiftError::InvalidEdit {
                reason: format!("criterion {} is already at the outermost level", index),
            });
        }
        self.criteria[index].indent_level -= 1;
        Ok(())
    }

    /// The criteria that take part in evaluation, in their original order.
    pub fn active(&self) -> Vec<Criterion> {
        self.criteria
            .iter()
            .filter(|c| c.is_active())
            .cloned()
            .collect()
    }

    /// A search can start once at least one criterion is active.
    pub fn is_searchable(&self) -> bool {
        self.criteria.iter().any(Criterion::is_active)
    }

    /// Saving is worthwhile once any criterion names a column.
    pub fn has_named_columns(&self) -> bool {
        self.criteria
            .iter()
            .any(|c| !c.column_name.trim().is_empty())
    }

    /// Serialize to the query file format.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse the query file format.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a query file.
    pub fn load_from(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "Loading query");
        let contents = fs::read_to_string(path).map_err(|e| SiftError::QueryFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let query: Query = serde_json::from_str(&contents).map_err(|e| SiftError::QueryFile {
            path: path.to_path_buf(),
            reason: format!("Failed to parse query: {}", e),
        })?;
        debug!(criteria = query.len(), "Query loaded");
        Ok(query)
    }

    /// Save to a query file, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let file_error = |e: std::io::Error| SiftError::QueryFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(file_error)?;
            }
        }

        info!(path = %path.display(), criteria = self.len(), "Saving query");
        let contents = self.to_json()?;
        fs::write(path, contents).map_err(file_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::{LogicalOperator, SearchType};
    use tempfile::TempDir;

    fn sample_query() -> Query {
        Query::from_criteria(vec![
            Criterion::new("Age", SearchType::GreaterThan, "18"),
            Criterion::new("City", SearchType::IsOneOf, "Oslo, Bergen").indented(1),
            Criterion::new("Joined", SearchType::IsBetweenDates, "2020-01-01")
                .with_value2("2020-12-31")
                .joined_by(LogicalOperator::Or)
                .indented(1),
            Criterion::new("Status", SearchType::Regex, "^inact")
                .negated()
                .joined_by(LogicalOperator::And),
        ])
    }

    #[test]
    fn test_new_query_has_one_blank_criterion() {
        let query = Query::new();
        assert_eq!(query.len(), 1);
        assert!(!query.is_searchable());
        assert!(!query.has_named_columns());
    }

    #[test]
    fn test_indent_rules() {
        let mut query = Query::new();
        query.add();
        query.add();

        // First criterion never indents
        assert!(!query.can_indent(0));
        assert!(query.indent(0).is_err());

        // Second may go one level deeper than the first, no further
        assert!(query.can_indent(1));
        query.indent(1).unwrap();
        assert_eq!(query.criteria()[1].indent_level, 1);
        assert!(!query.can_indent(1));

        // Third can follow the second down to level 2
        query.indent(2).unwrap();
        query.indent(2).unwrap();
        assert_eq!(query.criteria()[2].indent_level, 2);
        assert!(!query.can_indent(2));

        assert!(!query.can_indent(99));
    }

    #[test]
    fn test_outdent_rules() {
        let mut query = Query::new();
        query.add();
        assert!(!query.can_outdent(1));
        assert!(query.outdent(1).is_err());

        query.indent(1).unwrap();
        assert!(query.can_outdent(1));
        query.outdent(1).unwrap();
        assert_eq!(query.criteria()[1].indent_level, 0);
    }

    #[test]
    fn test_remove_resets_first_indent() {
        let mut query = sample_query();
        let removed = query.remove(0).unwrap();
        assert_eq!(removed.column_name, "Age");
        assert_eq!(query.criteria()[0].column_name, "City");
        assert_eq!(query.criteria()[0].indent_level, 0);
        // Later criteria keep their indentation
        assert_eq!(query.criteria()[1].indent_level, 1);

        assert!(query.remove(10).is_err());
    }

    #[test]
    fn test_active_preserves_order() {
        let mut query = sample_query();
        query.push(Criterion::new("Ignored", SearchType::ExactMatch, ""));
        let active = query.active();
        assert_eq!(active.len(), 4);
        let names: Vec<_> = active.iter().map(|c| c.column_name.as_str()).collect();
        assert_eq!(names, vec!["Age", "City", "Joined", "Status"]);
    }

    #[test]
    fn test_json_is_an_array() {
        let json = sample_query().to_json().unwrap();
        assert!(json.trim_start().starts_with('['));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("queries").join("MyQuery.json");

        let query = sample_query();
        query.save_to(&path).unwrap();
        let loaded = Query::load_from(&path).unwrap();

        assert_eq!(loaded, query);
    }

    #[test]
    fn test_load_invalid_names_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let err = Query::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_save_failure_names_file() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let path = blocker.join("MyQuery.json");

        let err = sample_query().save_to(&path).unwrap_err();
        assert!(matches!(err, SiftError::QueryFile { path: ref p, .. } if *p == path));
    }

    #[test]
    fn test_load_desktop_query_file() {
        let json = r#"[
          {"ColumnName":"Age","SearchType":3,"Value":"18","Value2":null,"IsNot":false,"LogicalOperator":0,"IsNotFirst":false,"IndentLevel":0},
          {"ColumnName":"City","SearchType":0,"Value":"Oslo","Value2":null,"IsNot":true,"LogicalOperator":1,"IsNotFirst":true,"IndentLevel":1}
        ]"#;
        let query = Query::from_json(json).unwrap();
        assert_eq!(query.len(), 2);
        assert_eq!(query.criteria()[0].search_type, SearchType::GreaterThan);
        assert_eq!(query.criteria()[1].logical_operator, LogicalOperator::Or);
        assert!(query.criteria()[1].is_not);

        // Saved back by name
        let saved = query.to_json().unwrap();
        assert!(saved.contains("\"GreaterThan\""));
        assert_eq!(Query::from_json(&saved).unwrap(), query);
    }
}
