//! Boolean expression reconstruction and evaluation.
//!
//! The criteria list encodes a boolean tree through indentation. This module
//! rebuilds that tree once per scan with a recursive descent over a cursor,
//! then evaluates it against every row.
//!
//! ## Grammar
//!
//! ```text
//! expression(level) := term(level) { op term(level) }     while next.indent >= level
//! term(level)       := expression(next.indent)            if next.indent == level + 1
//!                    | leaf                               if next.indent <= level
//! ```
//!
//! - `op` is the logical operator of the criterion that starts the right
//!   operand; for a nested group that is the criterion opening the group
//! - operators fold strictly left to right: `A AND B OR C` is `(A AND B) OR C`
//! - a group ends at the first criterion indented less than the group
//! - a criterion indented more than one level deeper than the current level
//!   makes the expression malformed, and a malformed expression matches no row

use crate::compare::Comparator;
use crate::criteria::{Criterion, LogicalOperator};
use crate::error::{Result, SiftError};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::BuildHasher;
use tracing::warn;

/// Access to one row's values by column name.
pub trait ColumnLookup {
    /// The raw value of `column`, or `None` when the row has no such column.
    fn value(&self, column: &str) -> Option<&str>;
}

impl<S: BuildHasher> ColumnLookup for HashMap<String, String, S> {
    fn value(&self, column: &str) -> Option<&str> {
        self.get(column).map(String::as_str)
    }
}

impl<'a, S: BuildHasher> ColumnLookup for HashMap<&'a str, &'a str, S> {
    fn value(&self, column: &str) -> Option<&str> {
        self.get(column).copied()
    }
}

impl ColumnLookup for BTreeMap<String, String> {
    fn value(&self, column: &str) -> Option<&str> {
        self.get(column).map(String::as_str)
    }
}

/// A node of the reconstructed tree.
#[derive(Debug, Clone)]
enum Node {
    Leaf {
        criterion: Criterion,
        comparator: Comparator,
    },
    Group {
        first: Box<Node>,
        rest: Vec<(LogicalOperator, Node)>,
    },
}

impl Node {
    fn leaf(criterion: &Criterion) -> Self {
        Node::Leaf {
            comparator: Comparator::new(criterion),
            criterion: criterion.clone(),
        }
    }

    fn evaluate<R: ColumnLookup + ?Sized>(&self, row: &R) -> bool {
        match self {
            Node::Leaf {
                criterion,
                comparator,
            } => match row.value(&criterion.column_name) {
                Some(cell) => comparator.matches(cell.trim()),
                // Absent column: false regardless of negation
                None => false,
            },
            Node::Group { first, rest } => rest
                .iter()
                .fold(first.evaluate(row), |left, (op, right)| {
                    op.apply(left, || right.evaluate(row))
                }),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Leaf { criterion, .. } => write!(f, "{}", criterion),
            Node::Group { first, rest } => {
                write!(f, "({}", first)?;
                for (op, node) in rest {
                    write!(f, " {} {}", op, node)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Cursor-driven parser state, threaded through the recursive calls.
struct Parser<'a> {
    criteria: &'a [Criterion],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Criterion> {
        self.criteria.get(self.pos)
    }

    fn parse_expression(&mut self, level: u32) -> Result<Node> {
        let first = self.parse_term(level)?;
        let mut rest = Vec::new();

        while let Some(next) = self.peek() {
            if next.indent_level < level {
                break;
            }
            let op = next.logical_operator;
            rest.push((op, self.parse_term(level)?));
        }

        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Node::Group {
                first: Box::new(first),
                rest,
            })
        }
    }

    fn parse_term(&mut self, level: u32) -> Result<Node> {
        let criterion = self.peek().ok_or_else(|| SiftError::MalformedExpression {
            position: self.pos,
            reason: "unexpected end of expression".to_string(),
        })?;

        if criterion.indent_level > level.saturating_add(1) {
            return Err(SiftError::MalformedExpression {
                position: self.pos,
                reason: format!(
                    "indent jumps from level {} to level {}",
                    level, criterion.indent_level
                ),
            });
        }

        if criterion.indent_level > level {
            return self.parse_expression(criterion.indent_level);
        }

        self.pos += 1;
        Ok(Node::leaf(criterion))
    }
}

#[derive(Debug, Clone)]
enum Root {
    /// No criteria: every row matches
    Empty,
    Tree(Node),
    /// Structurally invalid: no row matches
    Malformed(String),
}

/// A compiled query, built once per scan and evaluated per row.
///
/// ## Example
///
/// ```
/// use csvsift_core::{Criterion, Expression, LogicalOperator, SearchType};
/// use std::collections::HashMap;
///
/// let criteria = vec![
///     Criterion::new("Age", SearchType::GreaterThan, "18"),
///     Criterion::new("City", SearchType::ExactMatch, "Oslo")
///         .joined_by(LogicalOperator::Or),
/// ];
/// let expression = Expression::compile(&criteria).unwrap();
///
/// let mut row = HashMap::new();
/// row.insert("Age".to_string(), "12".to_string());
/// row.insert("City".to_string(), "oslo".to_string());
/// assert!(expression.evaluate(&row));
/// ```
#[derive(Debug, Clone)]
pub struct Expression {
    root: Root,
}

impl Expression {
    /// Rebuild the tree encoded by `criteria`.
    ///
    /// `criteria` should already be filtered down to active criteria.
    pub fn compile(criteria: &[Criterion]) -> Result<Self> {
        if criteria.is_empty() {
            return Ok(Expression { root: Root::Empty });
        }

        let mut parser = Parser { criteria, pos: 0 };
        let node = parser.parse_expression(0)?;

        if parser.pos < criteria.len() {
            return Err(SiftError::MalformedExpression {
                position: parser.pos,
                reason: "trailing criteria after the expression".to_string(),
            });
        }

        Ok(Expression {
            root: Root::Tree(node),
        })
    }

    /// Like [`compile`](Self::compile), but a malformed list yields an
    /// expression that matches nothing instead of an error.
    pub fn from_criteria(criteria: &[Criterion]) -> Self {
        Self::compile(criteria).unwrap_or_else(|e| {
            warn!(error = %e, "Malformed query, no rows will match");
            Expression {
                root: Root::Malformed(e.to_string()),
            }
        })
    }

    /// Returns true if there are no criteria (every row matches)
    pub fn is_empty(&self) -> bool {
        matches!(self.root, Root::Empty)
    }

    /// Returns true if the criteria did not form a valid tree
    pub fn is_malformed(&self) -> bool {
        matches!(self.root, Root::Malformed(_))
    }

    /// Evaluate against one row.
    pub fn evaluate<R: ColumnLookup + ?Sized>(&self, row: &R) -> bool {
        match &self.root {
            Root::Empty => true,
            Root::Tree(node) => node.evaluate(row),
            Root::Malformed(_) => false,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.root {
            Root::Empty => write!(f, "(match all)"),
            Root::Tree(node) => write!(f, "{}", node),
            Root::Malformed(reason) => write!(f, "(malformed: {})", reason),
        }
    }
}

/// Evaluate `criteria` against one row in a single call.
///
/// Structural errors make the row non-matching.
pub fn evaluate<R: ColumnLookup + ?Sized>(row: &R, criteria: &[Criterion]) -> bool {
    Expression::compile(criteria).map_or(false, |expr| expr.evaluate(row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare;
    use crate::criteria::SearchType;

    fn flag(column: &str) -> Criterion {
        Criterion::new(column, SearchType::ExactMatch, "1")
    }

    fn row(pairs: &[(&str, bool)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), if *v { "1" } else { "0" }.to_string()))
            .collect()
    }

    fn bits(n: usize, width: usize) -> Vec<bool> {
        (0..width).map(|i| n & (1 << i) != 0).collect()
    }

    #[test]
    fn test_empty_criteria_match_everything() {
        let expr = Expression::compile(&[]).unwrap();
        assert!(expr.is_empty());
        assert!(expr.evaluate(&HashMap::<String, String>::new()));
        assert!(evaluate(&row(&[("a", false)]), &[]));
    }

    #[test]
    fn test_single_leaf_equals_comparator() {
        let criteria = [
            Criterion::new("Age", SearchType::GreaterThan, "18"),
            Criterion::new("Age", SearchType::GreaterThan, "18").negated(),
            Criterion::new("Age", SearchType::Regex, "(bad"),
        ];
        for criterion in &criteria {
            for cell in ["30", "10", "abc", ""] {
                let mut r = HashMap::new();
                r.insert("Age".to_string(), cell.to_string());
                assert_eq!(
                    evaluate(&r, std::slice::from_ref(criterion)),
                    compare::matches(cell, criterion),
                    "{} on {:?}",
                    criterion,
                    cell
                );
            }
        }
    }

    #[test]
    fn test_cells_are_trimmed_before_comparison() {
        let mut r = HashMap::new();
        r.insert("City", "  Oslo ");
        let criteria = [Criterion::new("City", SearchType::ExactMatch, "oslo")];
        assert!(evaluate(&r, &criteria));
    }

    #[test]
    fn test_absent_column_is_false_even_when_negated() {
        let r = row(&[("a", true)]);
        assert!(!evaluate(&r, &[flag("missing")]));
        assert!(!evaluate(&r, &[flag("missing").negated()]));

        // The absent leaf only falsifies itself
        let criteria = [flag("missing"), flag("a").joined_by(LogicalOperator::Or)];
        assert!(evaluate(&r, &criteria));
    }

    #[test]
    fn test_strict_left_to_right_fold() {
        // A AND B OR C == (A AND B) OR C, not A AND (B OR C)
        let criteria = [
            flag("a"),
            flag("b").joined_by(LogicalOperator::And),
            flag("c").joined_by(LogicalOperator::Or),
        ];
        for n in 0..8 {
            let v = bits(n, 3);
            let r = row(&[("a", v[0]), ("b", v[1]), ("c", v[2])]);
            assert_eq!(evaluate(&r, &criteria), (v[0] && v[1]) || v[2], "{:?}", v);
        }

        // A OR B AND C == (A OR B) AND C
        let criteria = [
            flag("a"),
            flag("b").joined_by(LogicalOperator::Or),
            flag("c").joined_by(LogicalOperator::And),
        ];
        for n in 0..8 {
            let v = bits(n, 3);
            let r = row(&[("a", v[0]), ("b", v[1]), ("c", v[2])]);
            assert_eq!(evaluate(&r, &criteria), (v[0] || v[1]) && v[2], "{:?}", v);
        }
    }

    #[test]
    fn test_nested_group() {
        // A(0), B(1, OR), C(1, AND), D(0, AND) == (A OR (B AND C)) AND D
        let criteria = [
            flag("a"),
            flag("b").joined_by(LogicalOperator::Or).indented(1),
            flag("c").joined_by(LogicalOperator::And).indented(1),
            flag("d").joined_by(LogicalOperator::And),
        ];
        let expr = Expression::compile(&criteria).unwrap();
        for n in 0..16 {
            let v = bits(n, 4);
            let r = row(&[("a", v[0]), ("b", v[1]), ("c", v[2]), ("d", v[3])]);
            let expected = (v[0] || (v[1] && v[2])) && v[3];
            assert_eq!(expr.evaluate(&r), expected, "{:?}", v);
        }
    }

    #[test]
    fn test_group_combinator_comes_from_inner_criterion() {
        // A(0), B(1, AND), C(1, OR) == A AND (B OR C)
        let criteria = [
            flag("a"),
            flag("b").joined_by(LogicalOperator::And).indented(1),
            flag("c").joined_by(LogicalOperator::Or).indented(1),
        ];
        for n in 0..8 {
            let v = bits(n, 3);
            let r = row(&[("a", v[0]), ("b", v[1]), ("c", v[2])]);
            assert_eq!(evaluate(&r, &criteria), v[0] && (v[1] || v[2]), "{:?}", v);
        }
    }

    #[test]
    fn test_deep_nesting_closes_several_levels() {
        // A(0), B(1,AND), C(2,OR), D(2,AND), E(0,OR) == (A AND (B OR (C AND D))) OR E
        let criteria = [
            flag("a"),
            flag("b").joined_by(LogicalOperator::And).indented(1),
            flag("c").joined_by(LogicalOperator::Or).indented(2),
            flag("d").joined_by(LogicalOperator::And).indented(2),
            flag("e").joined_by(LogicalOperator::Or),
        ];
        let expr = Expression::compile(&criteria).unwrap();
        for n in 0..32 {
            let v = bits(n, 5);
            let r = row(&[("a", v[0]), ("b", v[1]), ("c", v[2]), ("d", v[3]), ("e", v[4])]);
            let expected = (v[0] && (v[1] || (v[2] && v[3]))) || v[4];
            assert_eq!(expr.evaluate(&r), expected, "{:?}", v);
        }
    }

    #[test]
    fn test_leading_group() {
        // A(1), B(1, OR), C(0, AND) == (A OR B) AND C
        let criteria = [
            flag("a").indented(1),
            flag("b").joined_by(LogicalOperator::Or).indented(1),
            flag("c").joined_by(LogicalOperator::And),
        ];
        for n in 0..8 {
            let v = bits(n, 3);
            let r = row(&[("a", v[0]), ("b", v[1]), ("c", v[2])]);
            assert_eq!(evaluate(&r, &criteria), (v[0] || v[1]) && v[2], "{:?}", v);
        }
    }

    #[test]
    fn test_indent_jump_is_malformed() {
        let criteria = [flag("a"), flag("b").indented(2)];
        let err = Expression::compile(&criteria).unwrap_err();
        assert!(matches!(err, SiftError::MalformedExpression { position: 1, .. }));

        // The whole row is treated as non-matching
        let r = row(&[("a", true), ("b", true)]);
        assert!(!evaluate(&r, &criteria));

        let expr = Expression::from_criteria(&criteria);
        assert!(expr.is_malformed());
        assert!(!expr.evaluate(&r));
    }

    #[test]
    fn test_display_shows_grouping() {
        let criteria = [
            Criterion::new("Age", SearchType::GreaterThan, "18"),
            Criterion::new("City", SearchType::ExactMatch, "oslo").indented(1),
            Criterion::new("City", SearchType::ExactMatch, "bergen")
                .joined_by(LogicalOperator::Or)
                .indented(1),
        ];
        let expr = Expression::compile(&criteria).unwrap();
        assert_eq!(
            expr.to_string(),
            "(Age > 18 AND (City = oslo OR City = bergen))"
        );
    }
}
