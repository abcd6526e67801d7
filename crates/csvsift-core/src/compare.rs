//! Cell comparison for each search type.
//!
//! Comparisons never fail. Text that does not parse as a number or date, or a
//! pattern that does not compile, simply makes the test `false`; negation is
//! applied afterwards, so a negated test over unparsable input is `true`.
//!
//! Operands are parsed once when a [`Comparator`] is built, which lets the
//! evaluator reuse the compiled form across every row of a scan.

use crate::criteria::{Criterion, SearchType};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::{Regex, RegexBuilder};

/// Date-time layouts tried, in order, when parsing a date.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

/// Date-only layouts tried after the date-time ones.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
];

/// Parse a floating-point number, ignoring surrounding whitespace.
pub fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok()
}

/// Parse a date, discarding any time-of-day component.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        })
}

/// Pre-parsed form of a criterion's test.
#[derive(Debug, Clone)]
enum Test {
    Exact(String),
    OneOf(Vec<String>),
    /// `None` when the pattern failed to compile
    Pattern(Option<Regex>),
    Greater(Option<f64>),
    Less(Option<f64>),
    Between(Option<f64>, Option<f64>),
    OnDate(Option<NaiveDate>),
    BeforeDate(Option<NaiveDate>),
    AfterDate(Option<NaiveDate>),
    BetweenDates(Option<NaiveDate>, Option<NaiveDate>),
}

/// A criterion's comparison, compiled once and applied to many cells.
#[derive(Debug, Clone)]
pub struct Comparator {
    test: Test,
    negate: bool,
}

impl Comparator {
    /// Compile the comparison described by `criterion`.
    pub fn new(criterion: &Criterion) -> Self {
        let value = criterion.value.as_str();
        let value2 = criterion.value2.as_str();

        let test = match criterion.search_type {
            SearchType::ExactMatch => Test::Exact(value.to_lowercase()),
            SearchType::IsOneOf => Test::OneOf(
                value
                    .split(',')
                    .map(|token| token.trim().to_lowercase())
                    .collect(),
            ),
            SearchType::Regex => Test::Pattern(
                RegexBuilder::new(value)
                    .case_insensitive(true)
                    .build()
                    .ok(),
            ),
            SearchType::GreaterThan => Test::Greater(parse_number(value)),
            SearchType::LessThan => Test::Less(parse_number(value)),
            SearchType::IsBetween => Test::Between(parse_number(value), parse_number(value2)),
            SearchType::OnDate => Test::OnDate(parse_date(value)),
            SearchType::BeforeDate => Test::BeforeDate(parse_date(value)),
            SearchType::AfterDate => Test::AfterDate(parse_date(value)),
            SearchType::IsBetweenDates => {
                Test::BetweenDates(parse_date(value), parse_date(value2))
            }
        };

        Comparator {
            test,
            negate: criterion.is_not,
        }
    }

    /// Run the type-specific test without applying negation.
    pub fn test(&self, cell: &str) -> bool {
        match &self.test {
            Test::Exact(expected) => cell.to_lowercase() == *expected,
            Test::OneOf(tokens) => {
                let cell = cell.to_lowercase();
                tokens.iter().any(|token| *token == cell)
            }
            Test::Pattern(regex) => regex.as_ref().map_or(false, |re| re.is_match(cell)),
            Test::Greater(bound) => compare_number(cell, *bound, |c, b| c > b),
            Test::Less(bound) => compare_number(cell, *bound, |c, b| c < b),
            Test::Between(low, high) => match (parse_number(cell), low, high) {
                (Some(c), Some(low), Some(high)) => c >= *low && c <= *high,
                _ => false,
            },
            Test::OnDate(day) => compare_date(cell, *day, |c, d| c == d),
            Test::BeforeDate(day) => compare_date(cell, *day, |c, d| c < d),
            Test::AfterDate(day) => compare_date(cell, *day, |c, d| c > d),
            Test::BetweenDates(first, last) => match (parse_date(cell), first, last) {
                (Some(c), Some(first), Some(last)) => c >= *first && c <= *last,
                _ => false,
            },
        }
    }

    /// Run the test and apply the criterion's negation.
    pub fn matches(&self, cell: &str) -> bool {
        self.test(cell) != self.negate
    }
}

fn compare_number(cell: &str, bound: Option<f64>, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (parse_number(cell), bound) {
        (Some(c), Some(b)) => cmp(c, b),
        _ => false,
    }
}

fn compare_date(
    cell: &str,
    day: Option<NaiveDate>,
    cmp: impl Fn(NaiveDate, NaiveDate) -> bool,
) -> bool {
    match (parse_date(cell), day) {
        (Some(c), Some(d)) => cmp(c, d),
        _ => false,
    }
}

/// Test a single cell against a criterion, negation included.
///
/// Convenience wrapper that compiles the criterion on every call; scans use
/// [`Comparator`] directly.
pub fn matches(cell: &str, criterion: &Criterion) -> bool {
    Comparator::new(criterion).matches(cell)
}
