//! Precision/cost ratio model
//!
//! Ratio = sensitive weight / insensitive weight. A low ratio means the
//! expensive abstraction keeps the method's weight small relative to the cheap
//! one, so those methods are the first to receive it.
//!
//! Global invariants enforced:
//! - Every method in the insensitive weight set lands in exactly one of
//!   `ratios` or `forced`
//! - A missing sensitive value is never read as zero
//! - Ranking order is total: ratio ascending, then method id ascending

use crate::facts::{FactMap, MethodId};
use globset::GlobSet;
use serde::Serialize;
use std::collections::BTreeMap;

/// Outcome of looking up the high-precision side of a method
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Precision {
    Measured(f64),
    /// No sensitive record exists; the method cannot enter the search
    Unavailable,
}

/// Why a method bypasses the threshold and is classified expensive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ForceReason {
    MissingSensitiveWeight,
    MissingCost,
    Pattern,
}

/// Result of the ratio model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatioSet {
    /// Search population
    pub ratios: BTreeMap<MethodId, f64>,
    /// Unconditionally expensive methods
    pub forced: BTreeMap<MethodId, ForceReason>,
    /// Methods lacking matching high-precision data
    pub missing: usize,
}

/// Look up the ratio for a single method
pub fn precision_of(insens_weight: u64, sens_weight: Option<u64>) -> Precision {
    match sens_weight {
        None => Precision::Unavailable,
        Some(_) if insens_weight == 0 => Precision::Measured(0.0),
        Some(sens) => Precision::Measured(sens as f64 / insens_weight as f64),
    }
}

/// Derive per-method ratios from paired weight records
pub fn compute_ratios(insens_weights: &FactMap, sens_weights: &FactMap) -> RatioSet {
    let mut set = RatioSet::default();

    for (method, &insens) in insens_weights {
        match precision_of(insens, sens_weights.get(method).copied()) {
            Precision::Measured(ratio) => {
                set.ratios.insert(method.clone(), ratio);
            }
            Precision::Unavailable => {
                set.forced
                    .insert(method.clone(), ForceReason::MissingSensitiveWeight);
                set.missing += 1;
            }
        }
    }

    set
}

impl RatioSet {
    /// Search population ordered by ratio ascending, ties by method id
    pub fn ranked(&self) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self
            .ratios
            .iter()
            .map(|(method, &ratio)| (method.as_str(), ratio))
            .collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }

    /// Move every ratio-bearing method without both cost entries to `forced`
    pub fn require_costs(self, insens_costs: &FactMap, sens_costs: &FactMap) -> RatioSet {
        let RatioSet {
            ratios,
            mut forced,
            mut missing,
        } = self;

        let (priced, unpriced): (BTreeMap<_, _>, BTreeMap<_, _>) =
            ratios.into_iter().partition(|(method, _)| {
                insens_costs.contains_key(method) && sens_costs.contains_key(method)
            });

        for method in unpriced.into_keys() {
            forced.insert(method, ForceReason::MissingCost);
            missing += 1;
        }

        RatioSet {
            ratios: priced,
            forced,
            missing,
        }
    }

    /// Move every ratio-bearing method whose id matches `patterns` to `forced`
    pub fn force_matching(self, patterns: &GlobSet) -> RatioSet {
        if patterns.is_empty() {
            return self;
        }

        let RatioSet {
            ratios,
            mut forced,
            missing,
        } = self;

        let (matched, kept): (BTreeMap<_, _>, BTreeMap<_, _>) = ratios
            .into_iter()
            .partition(|(method, _)| patterns.is_match(method.as_str()));

        for method in matched.into_keys() {
            forced.insert(method, ForceReason::Pattern);
        }

        RatioSet {
            ratios: kept,
            forced,
            missing,
        }
    }

    pub fn pattern_forced(&self) -> usize {
        self.forced
            .values()
            .filter(|reason| **reason == ForceReason::Pattern)
            .count()
    }
}
