//! Sensitivity classification
//!
//! Visit order:
//! 1. Forced methods, by id
//! 2. Ranked methods, ratio ascending, ties by id
//!
//! A directly visited method that qualifies for the expensive class spreads it
//! to its requirements (per [`Propagation`]). Because every method with
//! ratio <= threshold is visited before any method above it, propagation never
//! meets a method already assigned the cheap class.
//!
//! Global invariants enforced:
//! - Each method is assigned exactly once
//! - Output order is assignment order, fully determined by the inputs

use crate::deps::{DependencyGraph, Propagation};
use crate::facts::MethodId;
use crate::ratio::RatioSet;
use serde::Serialize;
use std::collections::BTreeMap;

/// Abstraction chosen for a method in the hybrid analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SensitivityClass {
    ContextInsensitive,
    ObjectSensitive,
}

impl SensitivityClass {
    /// Label understood by the analysis engine
    pub fn label(&self) -> &'static str {
        match self {
            SensitivityClass::ContextInsensitive => "context-insensitive",
            SensitivityClass::ObjectSensitive => "2-object",
        }
    }
}

/// How a method got its class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Threshold,
    Forced,
    Propagated,
    /// Present in some input but not in the insensitive weight set
    Unmeasured,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    method: MethodId,
    class: SensitivityClass,
    origin: Origin,
}

/// Per-class and per-cause totals for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassCounts {
    pub object_sensitive: usize,
    pub context_insensitive: usize,
    /// Methods lacking matching high-precision data
    pub missing: usize,
    pub pattern_forced: usize,
    pub propagated: usize,
    pub unmeasured: usize,
}

/// Final method -> class mapping, kept in assignment order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    entries: Vec<Entry>,
    index: BTreeMap<MethodId, usize>,
    missing: usize,
    pattern_forced: usize,
}

impl Classification {
    /// First assignment wins
    fn assign(&mut self, method: &str, class: SensitivityClass, origin: Origin) {
        if self.index.contains_key(method) {
            return;
        }
        self.index.insert(method.to_string(), self.entries.len());
        self.entries.push(Entry {
            method: method.to_string(),
            class,
            origin,
        });
    }

    pub fn get(&self, method: &str) -> Option<SensitivityClass> {
        self.index.get(method).map(|&i| self.entries[i].class)
    }

    pub fn origin(&self, method: &str) -> Option<Origin> {
        self.index.get(method).map(|&i| self.entries[i].origin)
    }

    /// (method, class) pairs in assignment order
    pub fn iter(&self) -> impl Iterator<Item = (&str, SensitivityClass)> {
        self.entries.iter().map(|e| (e.method.as_str(), e.class))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append every not-yet-classified method of `methods` as expensive
    pub fn include_unmeasured<'m>(mut self, methods: impl IntoIterator<Item = &'m str>) -> Self {
        let mut extra: Vec<&str> = methods.into_iter().collect();
        extra.sort_unstable();
        extra.dedup();
        for method in extra {
            self.assign(method, SensitivityClass::ObjectSensitive, Origin::Unmeasured);
        }
        self
    }

    pub fn counts(&self) -> ClassCounts {
        let mut counts = ClassCounts {
            missing: self.missing,
            pattern_forced: self.pattern_forced,
            ..ClassCounts::default()
        };
        for entry in &self.entries {
            match entry.class {
                SensitivityClass::ObjectSensitive => counts.object_sensitive += 1,
                SensitivityClass::ContextInsensitive => counts.context_insensitive += 1,
            }
            match entry.origin {
                Origin::Propagated => counts.propagated += 1,
                Origin::Unmeasured => counts.unmeasured += 1,
                Origin::Threshold | Origin::Forced => {}
            }
        }
        counts
    }
}

/// Assign every method of `ratios` a class under `threshold`
pub fn classify(
    ratios: &RatioSet,
    threshold: f64,
    graph: &DependencyGraph,
    propagation: Propagation,
) -> Classification {
    let mut classification = Classification {
        missing: ratios.missing,
        pattern_forced: ratios.pattern_forced(),
        ..Classification::default()
    };

    for method in ratios.forced.keys() {
        visit(&mut classification, graph, propagation, method, Origin::Forced);
    }
    for (method, ratio) in ratios.ranked() {
        if ratio <= threshold {
            visit(&mut classification, graph, propagation, method, Origin::Threshold);
        } else {
            classification.assign(
                method,
                SensitivityClass::ContextInsensitive,
                Origin::Threshold,
            );
        }
    }

    let counts = classification.counts();
    tracing::debug!(
        "classified {} methods: {} 2-object, {} context-insensitive, {} propagated",
        classification.len(),
        counts.object_sensitive,
        counts.context_insensitive,
        counts.propagated
    );

    classification
}

/// Make `method` expensive and spread the class to its requirements
///
/// Runs even when `method` was already reached by propagation, so a directly
/// selected method always covers its own requirements.
fn visit(
    classification: &mut Classification,
    graph: &DependencyGraph,
    propagation: Propagation,
    method: &str,
    origin: Origin,
) {
    classification.assign(method, SensitivityClass::ObjectSensitive, origin);
    for required in graph.required_by(method, propagation) {
        classification.assign(
            required,
            SensitivityClass::ObjectSensitive,
            Origin::Propagated,
        );
    }
}
