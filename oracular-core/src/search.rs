//! Cost model and threshold search
//!
//! `cost_at(t)` predicts the total cost of a hybrid run in which every ranked
//! method with ratio <= t gets the sensitive treatment, the rest the
//! insensitive one, and every forced method the sensitive one.
//!
//! Global invariants enforced:
//! - `cost_at` is monotonically non-decreasing in `t` whenever sensitive cost
//!   >= insensitive cost per method; the search relies on it
//! - Only observed ratios are candidate thresholds
//! - Sums are exact (u128) and evaluated in ranking order

use crate::classify::{Classification, SensitivityClass};
use crate::error::{ClassifyError, Result};
use crate::facts::FactMap;
use crate::ratio::RatioSet;
use serde::Serialize;

#[derive(Debug, Clone, Copy)]
struct PricedMethod<'a> {
    method: &'a str,
    ratio: f64,
    insens_cost: u64,
    sens_cost: u64,
}

/// Predicted cost of a hybrid analysis as a function of the threshold
#[derive(Debug, Clone)]
pub struct CostModel<'a> {
    ranked: Vec<PricedMethod<'a>>,
    forced_cost: u128,
    baseline: u128,
    unpriced: usize,
}

impl<'a> CostModel<'a> {
    /// Build the model over a ratio set whose population is fully priced
    pub fn new(ratios: &'a RatioSet, insens_costs: &FactMap, sens_costs: &FactMap) -> Result<Self> {
        let mut ranked = Vec::with_capacity(ratios.ratios.len());
        let mut baseline: u128 = 0;

        for (method, ratio) in ratios.ranked() {
            let (Some(&insens_cost), Some(&sens_cost)) =
                (insens_costs.get(method), sens_costs.get(method))
            else {
                return Err(ClassifyError::InvalidArgument(format!(
                    "ranked method {} has no cost entry",
                    method
                )));
            };
            baseline += u128::from(insens_cost);
            ranked.push(PricedMethod {
                method,
                ratio,
                insens_cost,
                sens_cost,
            });
        }

        let mut forced_cost: u128 = 0;
        let mut unpriced = 0;
        for method in ratios.forced.keys() {
            let insens = insens_costs.get(method).copied();
            if let Some(cost) = insens {
                baseline += u128::from(cost);
            }
            match sens_costs.get(method).copied().or(insens) {
                Some(cost) => forced_cost += u128::from(cost),
                None => unpriced += 1,
            }
        }

        Ok(CostModel {
            ranked,
            forced_cost,
            baseline,
            unpriced,
        })
    }

    /// Total predicted cost with every ranked method of ratio <= `threshold`
    /// made sensitive
    pub fn cost_at(&self, threshold: f64) -> u128 {
        self.ranked
            .iter()
            .fold(self.forced_cost, |total, m| {
                let cost = if m.ratio <= threshold {
                    m.sens_cost
                } else {
                    m.insens_cost
                };
                total + u128::from(cost)
            })
    }

    /// Sum of insensitive costs over the measured population
    pub fn baseline(&self) -> u128 {
        self.baseline
    }

    /// Fixed cost of the forced-expensive methods
    pub fn forced_cost(&self) -> u128 {
        self.forced_cost
    }

    /// Forced methods with no cost entry in either run
    pub fn unpriced(&self) -> usize {
        self.unpriced
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    /// Ratio at rank `index`
    pub fn ratio_at(&self, index: usize) -> Option<f64> {
        self.ranked.get(index).map(|m| m.ratio)
    }

    /// Ranked (method, ratio) pairs
    pub fn ranked(&self) -> impl Iterator<Item = (&'a str, f64)> + '_ {
        self.ranked.iter().map(|m| (m.method, m.ratio))
    }
}

/// Where the chosen threshold came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    /// Target at or below the cheapest reachable cost
    Minimum,
    /// Target at or above the most expensive reachable cost
    Maximum,
    Interior,
}

/// Result of the threshold search
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdChoice {
    pub threshold: f64,
    pub index: usize,
    pub predicted_cost: u128,
    pub boundary: Boundary,
    /// Number of `cost_at` evaluations performed
    pub evaluations: usize,
}

/// Find the observed ratio whose induced cost is closest to
/// `target_slowdown * baseline`
///
/// Binary search over ranks, not over continuous ratio values: the cost only
/// changes at observed breakpoints. Ties between the two surviving candidates
/// go to the lower rank.
pub fn find_threshold(model: &CostModel<'_>, target_slowdown: f64) -> Result<ThresholdChoice> {
    if !target_slowdown.is_finite() || target_slowdown <= 0.0 {
        return Err(ClassifyError::InvalidArgument(format!(
            "target slowdown must be a positive number (got {})",
            target_slowdown
        )));
    }
    if model.is_empty() {
        return Err(ClassifyError::DegenerateInput(
            "no method has both weight and cost measurements".to_string(),
        ));
    }
    if model.baseline() == 0 {
        return Err(ClassifyError::DegenerateInput(
            "baseline cost is zero".to_string(),
        ));
    }

    let baseline = model.baseline() as f64;
    let target_cost = target_slowdown * baseline;
    let last = model.len() - 1;
    let ratio = |i: usize| model.ranked[i].ratio;

    let min_cost = model.cost_at(ratio(0));
    if target_slowdown <= min_cost as f64 / baseline {
        return Ok(ThresholdChoice {
            threshold: ratio(0),
            index: 0,
            predicted_cost: min_cost,
            boundary: Boundary::Minimum,
            evaluations: 1,
        });
    }

    let max_cost = model.cost_at(ratio(last));
    if target_slowdown >= max_cost as f64 / baseline {
        return Ok(ThresholdChoice {
            threshold: ratio(last),
            index: last,
            predicted_cost: max_cost,
            boundary: Boundary::Maximum,
            evaluations: 2,
        });
    }

    // cost(lo) < target <= cost(hi) holds on every iteration
    let (mut lo, mut hi) = (0, last);
    let (mut lo_cost, mut hi_cost) = (min_cost, max_cost);
    let mut evaluations = 2;
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        let cost = model.cost_at(ratio(mid));
        evaluations += 1;
        if (cost as f64) < target_cost {
            lo = mid;
            lo_cost = cost;
        } else {
            hi = mid;
            hi_cost = cost;
        }
    }

    let lo_distance = (lo_cost as f64 - target_cost).abs();
    let hi_distance = (hi_cost as f64 - target_cost).abs();
    let (index, predicted_cost) = if hi_distance < lo_distance {
        (hi, hi_cost)
    } else {
        (lo, lo_cost)
    };

    Ok(ThresholdChoice {
        threshold: ratio(index),
        index,
        predicted_cost,
        boundary: Boundary::Interior,
        evaluations,
    })
}

/// Predicted cost of a finished classification
///
/// Each 2-object method costs its sensitive cost, each context-insensitive
/// method its insensitive cost; the other run's cost stands in when one is
/// absent. Methods with no cost entry at all add nothing.
pub fn classification_cost(
    classification: &Classification,
    insens_costs: &FactMap,
    sens_costs: &FactMap,
) -> u128 {
    classification
        .iter()
        .map(|(method, class)| {
            let (preferred, fallback) = match class {
                SensitivityClass::ObjectSensitive => (sens_costs, insens_costs),
                SensitivityClass::ContextInsensitive => (insens_costs, sens_costs),
            };
            preferred
                .get(method)
                .or_else(|| fallback.get(method))
                .map_or(0, |&cost| u128::from(cost))
        })
        .sum()
}
