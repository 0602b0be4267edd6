//! Fact file loading
//!
//! Fact files are plain text, one `<method>\t<value>` record per line, no
//! header. Blank lines are skipped; every other line must have exactly two
//! tab-separated fields.
//!
//! Global invariants enforced:
//! - A malformed line fails the whole load (no partial maps)
//! - Maps are ordered by method id so downstream iteration is deterministic

use crate::error::{ClassifyError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Fully-qualified method signature, compared by exact string match
pub type MethodId = String;

/// Per-method weight or cost record of one analysis run
pub type FactMap = BTreeMap<MethodId, u64>;

/// Method -> set of methods it requires
pub type EdgeMap = BTreeMap<MethodId, BTreeSet<MethodId>>;

/// Whether a fact file has to be present on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Mandatory,
    /// A missing file reads as empty. Only the caller decides this.
    Optional,
}

/// Load a two-column `<method>\t<non-negative integer>` fact file
pub fn load(path: &Path) -> Result<FactMap> {
    let content = read_fact_file(path)?;
    let mut facts = FactMap::new();

    for (line_no, line) in records(&content) {
        let (method, value) = split_record(path, line_no, line)?;
        let value = parse_count(value).ok_or_else(|| {
            ClassifyError::malformed(
                path,
                line_no,
                format!("'{}' is not a non-negative integer", value),
            )
        })?;
        if facts.insert(method.to_string(), value).is_some() {
            tracing::debug!(
                "{}:{}: duplicate entry for {}, keeping last",
                path.display(),
                line_no,
                method
            );
        }
    }

    tracing::debug!("loaded {} facts from {}", facts.len(), path.display());
    Ok(facts)
}

/// Load a `<method>\t<requiredMethod>` fact file
///
/// Multiple lines for the same method accumulate into one set.
pub fn load_edges(path: &Path, requirement: Requirement) -> Result<EdgeMap> {
    if requirement == Requirement::Optional && !path.exists() {
        tracing::debug!("optional fact file {} absent, no edges", path.display());
        return Ok(EdgeMap::new());
    }

    let content = read_fact_file(path)?;
    let mut edges = EdgeMap::new();

    for (line_no, line) in records(&content) {
        let (method, required) = split_record(path, line_no, line)?;
        if required.is_empty() {
            return Err(ClassifyError::malformed(path, line_no, "empty required method"));
        }
        edges
            .entry(method.to_string())
            .or_default()
            .insert(required.to_string());
    }

    Ok(edges)
}

fn read_fact_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ClassifyError::Input {
            path: path.to_path_buf(),
        },
        _ => ClassifyError::io(path, e),
    })
}

/// Non-blank lines with 1-based line numbers
///
/// Only spaces count as blank; a line holding a tab is a record.
fn records(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.strip_suffix('\r').unwrap_or(line)))
        .filter(|(_, line)| !line.trim_matches(' ').is_empty())
}

/// Bare decimal digits only: no sign, no padding
fn parse_count(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

fn split_record<'a>(path: &Path, line_no: usize, line: &'a str) -> Result<(&'a str, &'a str)> {
    let mut fields = line.split('\t');
    match (fields.next(), fields.next(), fields.next()) {
        (Some(method), Some(value), None) => {
            if method.is_empty() {
                return Err(ClassifyError::malformed(path, line_no, "empty method id"));
            }
            Ok((method, value))
        }
        _ => Err(ClassifyError::malformed(
            path,
            line_no,
            format!("expected 2 tab-separated fields, got {}", line.split('\t').count()),
        )),
    }
}
