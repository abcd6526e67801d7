//! The criterion model.
//!
//! A query is an ordered list of [`Criterion`] values. Each one is a leaf test
//! (column, search type, operands, negation) plus the structural metadata that
//! encodes the boolean tree implicitly:
//!
//! - `logical_operator` joins the criterion to the previous one at the same
//!   indent level (meaningless on the first criterion)
//! - `indent_level` is the nesting depth; a run of criteria indented deeper
//!   than their predecessor forms a parenthesized group
//!
//! These types are serialized by field name to the query file format, with
//! enum values written by name. Enum values are also read back from their
//! declaration index, which is how older query files store them.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The comparison performed by a criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum SearchType {
    #[default]
    ExactMatch,
    IsOneOf,
    Regex,
    GreaterThan,
    LessThan,
    IsBetween,
    OnDate,
    BeforeDate,
    AfterDate,
    IsBetweenDates,
}

impl SearchType {
    /// Every search type, in display order
    pub const ALL: [SearchType; 10] = [
        SearchType::ExactMatch,
        SearchType::IsOneOf,
        SearchType::Regex,
        SearchType::GreaterThan,
        SearchType::LessThan,
        SearchType::IsBetween,
        SearchType::OnDate,
        SearchType::BeforeDate,
        SearchType::AfterDate,
        SearchType::IsBetweenDates,
    ];

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            SearchType::ExactMatch => "Exact Match",
            SearchType::IsOneOf => "Is One Of (List)",
            SearchType::Regex => "Regex",
            SearchType::GreaterThan => "Greater Than (>)",
            SearchType::LessThan => "Less Than (<)",
            SearchType::IsBetween => "Is Between",
            SearchType::OnDate => "On Date",
            SearchType::BeforeDate => "Before Date",
            SearchType::AfterDate => "After Date",
            SearchType::IsBetweenDates => "Is Between Dates",
        }
    }

    /// Serialized name (matches the query file format)
    pub fn name(&self) -> &'static str {
        match self {
            SearchType::ExactMatch => "ExactMatch",
            SearchType::IsOneOf => "IsOneOf",
            SearchType::Regex => "Regex",
            SearchType::GreaterThan => "GreaterThan",
            SearchType::LessThan => "LessThan",
            SearchType::IsBetween => "IsBetween",
            SearchType::OnDate => "OnDate",
            SearchType::BeforeDate => "BeforeDate",
            SearchType::AfterDate => "AfterDate",
            SearchType::IsBetweenDates => "IsBetweenDates",
        }
    }

    /// Short alias accepted on the command line
    pub fn alias(&self) -> &'static str {
        match self {
            SearchType::ExactMatch => "eq",
            SearchType::IsOneOf => "in",
            SearchType::Regex => "re",
            SearchType::GreaterThan => "gt",
            SearchType::LessThan => "lt",
            SearchType::IsBetween => "between",
            SearchType::OnDate => "on",
            SearchType::BeforeDate => "before",
            SearchType::AfterDate => "after",
            SearchType::IsBetweenDates => "between-dates",
        }
    }

    /// Whether the second operand (`value2`) is used
    pub fn uses_second_value(&self) -> bool {
        matches!(self, SearchType::IsBetween | SearchType::IsBetweenDates)
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for SearchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        SearchType::ALL
            .into_iter()
            .find(|t| s.eq_ignore_ascii_case(t.name()) || s.eq_ignore_ascii_case(t.alias()))
            .ok_or_else(|| format!("Unknown search type: {}", s))
    }
}

/// Operator joining a criterion to its predecessor at the same level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum LogicalOperator {
    #[default]
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl LogicalOperator {
    /// Every operator, in declaration order
    pub const ALL: [LogicalOperator; 2] = [LogicalOperator::And, LogicalOperator::Or];

    /// Combine `left` with a lazily evaluated right operand.
    ///
    /// `right` is only called when `left` does not decide the result.
    pub fn apply(self, left: bool, right: impl FnOnce() -> bool) -> bool {
        match self {
            LogicalOperator::And => left && right(),
            LogicalOperator::Or => left || right(),
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOperator::And => write!(f, "AND"),
            LogicalOperator::Or => write!(f, "OR"),
        }
    }
}

impl FromStr for LogicalOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "AND" => Ok(LogicalOperator::And),
            "OR" => Ok(LogicalOperator::Or),
            _ => Err(format!("Unknown logical operator: {}", s)),
        }
    }
}

/// A single leaf test plus its position in the implicit expression tree.
///
/// ## Example
///
/// ```
/// use csvsift_core::{Criterion, LogicalOperator, SearchType};
///
/// let adults = Criterion::new("Age", SearchType::GreaterThan, "18");
/// let in_oslo = Criterion::new("City", SearchType::ExactMatch, "Oslo")
///     .joined_by(LogicalOperator::And)
///     .indented(1);
/// assert!(adults.is_active());
/// assert_eq!(in_oslo.indent_level, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Criterion {
    /// Header name of the column to test (empty = inert)
    #[serde(alias = "ColumnName", deserialize_with = "null_as_empty")]
    pub column_name: String,

    /// The comparison to perform
    #[serde(alias = "SearchType")]
    pub search_type: SearchType,

    /// Primary operand
    #[serde(alias = "Value", deserialize_with = "null_as_empty")]
    pub value: String,

    /// Secondary operand, only used by the range types
    #[serde(alias = "Value2", deserialize_with = "null_as_empty")]
    pub value2: String,

    /// Invert the comparison result
    #[serde(alias = "IsNot")]
    pub is_not: bool,

    /// Operator joining this criterion to the previous one at its level
    #[serde(alias = "LogicalOperator")]
    pub logical_operator: LogicalOperator,

    /// Nesting depth
    #[serde(alias = "IndentLevel")]
    pub indent_level: u32,
}

impl Criterion {
    /// Create a criterion joined with AND at indent level 0.
    pub fn new(
        column_name: impl Into<String>,
        search_type: SearchType,
        value: impl Into<String>,
    ) -> Self {
        Criterion {
            column_name: column_name.into(),
            search_type,
            value: value.into(),
            ..Default::default()
        }
    }

    /// Set the secondary operand
    pub fn with_value2(mut self, value2: impl Into<String>) -> Self {
        self.value2 = value2.into();
        self
    }

    /// Invert the result
    pub fn negated(mut self) -> Self {
        self.is_not = true;
        self
    }

    /// Set the joining operator
    pub fn joined_by(mut self, op: LogicalOperator) -> Self {
        self.logical_operator = op;
        self
    }

    /// Set the nesting depth
    pub fn indented(mut self, level: u32) -> Self {
        self.indent_level = level;
        self
    }

    /// A criterion participates in evaluation only when both its column and
    /// its primary value are non-blank.
    pub fn is_active(&self) -> bool {
        !self.column_name.trim().is_empty() && !self.value.trim().is_empty()
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_not {
            write!(f, "NOT ")?;
        }
        match self.search_type {
            SearchType::ExactMatch => write!(f, "{} = {}", self.column_name, self.value),
            SearchType::IsOneOf => write!(f, "{} IN [{}]", self.column_name, self.value),
            SearchType::Regex => write!(f, "{} ~ /{}/", self.column_name, self.value),
            SearchType::GreaterThan => write!(f, "{} > {}", self.column_name, self.value),
            SearchType::LessThan => write!(f, "{} < {}", self.column_name, self.value),
            SearchType::IsBetween => write!(
                f,
                "{} BETWEEN {} AND {}",
                self.column_name, self.value, self.value2
            ),
            SearchType::OnDate => write!(f, "{} ON {}", self.column_name, self.value),
            SearchType::BeforeDate => write!(f, "{} BEFORE {}", self.column_name, self.value),
            SearchType::AfterDate => write!(f, "{} AFTER {}", self.column_name, self.value),
            SearchType::IsBetweenDates => write!(
                f,
                "{} BETWEEN DATES {} AND {}",
                self.column_name, self.value, self.value2
            ),
        }
    }
}

/// An enum value as stored in a query file: a name or a declaration index.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredEnum {
    Index(u64),
    Name(String),
}

fn from_stored<'de, D, T>(deserializer: D, all: &[T], what: &str) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Copy + FromStr,
{
    match StoredEnum::deserialize(deserializer)? {
        StoredEnum::Index(index) => usize::try_from(index)
            .ok()
            .and_then(|i| all.get(i).copied())
            .ok_or_else(|| de::Error::custom(format!("{} index out of range: {}", what, index))),
        StoredEnum::Name(name) => name
            .parse()
            .map_err(|_| de::Error::custom(format!("unknown {}: {}", what, name))),
    }
}

impl<'de> Deserialize<'de> for SearchType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        from_stored(deserializer, &SearchType::ALL, "search type")
    }
}

impl<'de> Deserialize<'de> for LogicalOperator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        from_stored(deserializer, &LogicalOperator::ALL, "logical operator")
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
