//! Method dependency graph
//!
//! An edge `X -> Y` reads "X requires Y": whenever X is analyzed with the
//! expensive abstraction, Y has to be as well. Edges never influence ratio
//! computation; they are consulted only while classifying.

use crate::error::Result;
use crate::facts::{self, EdgeMap, MethodId, Requirement};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::path::Path;

/// How far the expensive class spreads along requires-edges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Propagation {
    /// Ignore dependency edges
    None,
    /// Direct requirements of a directly classified method only
    #[default]
    OneHop,
    /// Full requires-closure
    Transitive,
}

impl Propagation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Propagation::None => "none",
            Propagation::OneHop => "one-hop",
            Propagation::Transitive => "transitive",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyGraph {
    edges: EdgeMap,
}

impl DependencyGraph {
    pub fn new() -> Self {
        DependencyGraph::default()
    }

    /// Load edges from a requires fact file
    pub fn load(path: &Path, requirement: Requirement) -> Result<Self> {
        Ok(DependencyGraph {
            edges: facts::load_edges(path, requirement)?,
        })
    }

    /// Add a requires edge (method -> required)
    pub fn add_edge(&mut self, method: impl Into<MethodId>, required: impl Into<MethodId>) {
        self.edges
            .entry(method.into())
            .or_default()
            .insert(required.into());
    }

    /// One-hop requirement set of `method`, in id order
    pub fn requires(&self, method: &str) -> impl Iterator<Item = &str> {
        self.edges
            .get(method)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Every method reachable from `method` through requires-edges, excluding
    /// `method` itself unless it sits on a cycle
    ///
    /// Breadth-first with each frontier in id order, so the result order is
    /// deterministic.
    pub fn closure(&self, method: &str) -> Vec<&str> {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut order = Vec::new();
        let mut queue: VecDeque<&str> = self.requires(method).collect();

        while let Some(next) = queue.pop_front() {
            if !seen.insert(next) {
                continue;
            }
            order.push(next);
            queue.extend(self.requires(next));
        }

        order
    }

    /// Methods required under `propagation` once `method` is made expensive
    pub fn required_by(&self, method: &str, propagation: Propagation) -> Vec<&str> {
        match propagation {
            Propagation::None => Vec::new(),
            Propagation::OneHop => self.requires(method).collect(),
            Propagation::Transitive => self.closure(method),
        }
    }

    /// Every method named on either side of an edge
    pub fn methods(&self) -> BTreeSet<&str> {
        self.edges
            .iter()
            .flat_map(|(method, required)| {
                std::iter::once(method.as_str()).chain(required.iter().map(String::as_str))
            })
            .collect()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
