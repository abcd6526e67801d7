//! Query command - create and edit query files.
//!
//! Positions on the command line are 1-based, matching `query show`.

use anyhow::{bail, Context};
use csvsift_core::{Criterion, Expression, Query};
use std::fmt::Write;
use std::path::Path;

/// Create an empty query file.
pub fn new(file: &Path, force: bool) -> anyhow::Result<()> {
    if file.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            file.display()
        );
    }
    Query::from_criteria(Vec::new()).save_to(file)?;
    eprintln!("Created {}", file.display());
    Ok(())
}

/// Append a criterion, nesting it `indent` levels deep.
pub fn add(file: &Path, criterion: Criterion, indent: u32) -> anyhow::Result<()> {
    let mut query = if file.exists() {
        Query::load_from(file)?
    } else {
        Query::from_criteria(Vec::new())
    };

    let index = query.push(criterion);
    for _ in 0..indent {
        query
            .indent(index)
            .with_context(|| format!("cannot nest criterion {} {} levels deep", index + 1, indent))?;
    }

    query.save_to(file)?;
    print!("{}", render(&query));
    Ok(())
}

/// Remove the criterion at a 1-based position.
pub fn remove(file: &Path, position: usize) -> anyhow::Result<()> {
    edit(file, position, |query, index| {
        query.remove(index)?;
        Ok(())
    })
}

/// Nest the criterion at a 1-based position one level deeper.
pub fn indent(file: &Path, position: usize) -> anyhow::Result<()> {
    edit(file, position, |query, index| Ok(query.indent(index)?))
}

/// Move the criterion at a 1-based position one level out.
pub fn outdent(file: &Path, position: usize) -> anyhow::Result<()> {
    edit(file, position, |query, index| Ok(query.outdent(index)?))
}

/// Print the criteria and the expression they form.
pub fn show(file: &Path) -> anyhow::Result<()> {
    let query = Query::load_from(file)?;
    print!("{}", render(&query));
    Ok(())
}

fn edit(
    file: &Path,
    position: usize,
    apply: impl FnOnce(&mut Query, usize) -> anyhow::Result<()>,
) -> anyhow::Result<()> {
    let mut query = Query::load_from(file)?;
    if position == 0 || position > query.len() {
        bail!(
            "no criterion at position {} ({} criteria in {})",
            position,
            query.len(),
            file.display()
        );
    }

    apply(&mut query, position - 1)?;
    query.save_to(file)?;
    print!("{}", render(&query));
    Ok(())
}

/// Numbered, indented listing followed by the compiled expression.
fn render(query: &Query) -> String {
    let mut out = String::new();

    if query.is_empty() {
        out.push_str("(no criteria)\n");
        return out;
    }

    for (i, criterion) in query.criteria().iter().enumerate() {
        let pad = "  ".repeat(criterion.indent_level as usize);
        let op = if query.is_first(i) {
            String::new()
        } else {
            format!("{} ", criterion.logical_operator)
        };
        let inactive = if criterion.is_active() { "" } else { "  (inactive)" };
        let _ = writeln!(out, "{:>3}. {}{}{}{}", i + 1, pad, op, criterion, inactive);
    }

    let active = query.active();
    if active.is_empty() {
        out.push_str("\nNo active criteria.\n");
    } else {
        match Expression::compile(&active) {
            Ok(expression) => {
                let _ = writeln!(out, "\nExpression: {}", expression);
            }
            Err(e) => {
                let _ = writeln!(out, "\nExpression is malformed: {}", e);
            }
        }
    }
    out
}
