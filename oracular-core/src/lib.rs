//! Oracular core library - budget-constrained context-sensitivity selection
//!
//! Given per-method weight and cost facts from a cheap context-insensitive
//! pre-analysis and an expensive 2-object-sensitive one, decide for every
//! method which abstraction the final hybrid analysis should use so that its
//! predicted cost approximates a target multiple of the cheap run.

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Stages are pure functions over immutable maps
// - No global mutable state
// - No randomness, clocks, threads, or async
// - Deterministic traversal order must be explicit
// - Identical input yields byte-for-byte identical output
// - Nothing is written on a fatal path

pub mod classify;
pub mod config;
pub mod deps;
pub mod emit;
pub mod error;
pub mod facts;
pub mod layout;
pub mod ratio;
pub mod report;
pub mod search;

pub use classify::{ClassCounts, Classification, SensitivityClass};
pub use config::ResolvedConfig;
pub use deps::{DependencyGraph, Propagation};
pub use error::{ClassifyError, Result};
pub use facts::{FactMap, MethodId, Requirement};
pub use ratio::RatioSet;
pub use report::{render_json, render_text, ClassificationSummary};
pub use search::{CostModel, ThresholdChoice};

use globset::GlobSet;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Fact files consumed by one classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifyInputs {
    pub insens_weights: PathBuf,
    pub sens_weights: PathBuf,
    pub insens_costs: PathBuf,
    pub sens_costs: PathBuf,
    pub dependencies: Option<(PathBuf, Requirement)>,
}

#[derive(Debug, Clone)]
pub struct ClassifyOptions {
    /// Hybrid cost as a multiple of the insensitive baseline; 1.0 matches it
    pub target_slowdown: f64,
    pub propagation: Propagation,
    /// Methods always analyzed 2-object, outside the search population
    pub force_sensitive: GlobSet,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        ClassifyOptions {
            target_slowdown: 1.0,
            propagation: Propagation::default(),
            force_sensitive: GlobSet::empty(),
        }
    }
}

impl ClassifyOptions {
    pub fn from_config(config: &ResolvedConfig) -> Self {
        ClassifyOptions {
            target_slowdown: config.target_slowdown,
            propagation: config.propagation,
            force_sensitive: config.force_sensitive.clone(),
        }
    }
}

/// Parsed contents of every input fact file
#[derive(Debug, Clone, Default)]
pub struct LoadedFacts {
    pub insens_weights: FactMap,
    pub sens_weights: FactMap,
    pub insens_costs: FactMap,
    pub sens_costs: FactMap,
    pub graph: DependencyGraph,
}

impl LoadedFacts {
    /// Load all inputs; any failure aborts before anything else happens
    pub fn load(inputs: &ClassifyInputs) -> Result<Self> {
        let graph = match &inputs.dependencies {
            Some((path, requirement)) => DependencyGraph::load(path, *requirement)?,
            None => DependencyGraph::new(),
        };
        tracing::debug!("{} dependency edges", graph.edge_count());

        Ok(LoadedFacts {
            insens_weights: facts::load(&inputs.insens_weights)?,
            sens_weights: facts::load(&inputs.sens_weights)?,
            insens_costs: facts::load(&inputs.insens_costs)?,
            sens_costs: facts::load(&inputs.sens_costs)?,
            graph,
        })
    }

    /// Methods named anywhere outside the insensitive weight set
    fn unmeasured_methods(&self) -> BTreeSet<&str> {
        self.sens_weights
            .keys()
            .chain(self.insens_costs.keys())
            .chain(self.sens_costs.keys())
            .map(String::as_str)
            .chain(self.graph.methods())
            .filter(|method| !self.insens_weights.contains_key(*method))
            .collect()
    }
}

/// Everything decided by a run, before anything is written
#[derive(Debug, Clone)]
pub struct Plan {
    pub ratios: RatioSet,
    pub choice: ThresholdChoice,
    pub baseline_cost: u128,
    /// Cost of `classification` as written, propagation included
    pub predicted_cost: u128,
    pub unpriced: usize,
    pub classification: Classification,
}

/// Derive ratios, search the threshold and classify every method
pub fn plan(facts: &LoadedFacts, options: &ClassifyOptions) -> Result<Plan> {
    let ratios = ratio::compute_ratios(&facts.insens_weights, &facts.sens_weights)
        .force_matching(&options.force_sensitive)
        .require_costs(&facts.insens_costs, &facts.sens_costs);
    tracing::debug!(
        "{} ranked methods, {} forced",
        ratios.ratios.len(),
        ratios.forced.len()
    );

    let model = CostModel::new(&ratios, &facts.insens_costs, &facts.sens_costs)?;
    let choice = search::find_threshold(&model, options.target_slowdown)?;
    let baseline_cost = model.baseline();
    let unpriced = model.unpriced();
    tracing::debug!(
        "selected threshold {} after {} cost evaluations: search cost {} for target {:.0}",
        choice.threshold,
        choice.evaluations,
        choice.predicted_cost,
        options.target_slowdown * baseline_cost as f64
    );

    if ratios.missing > 0 {
        tracing::warn!(
            "{} method(s) lack high-precision data and default to 2-object",
            ratios.missing
        );
    }

    let classification = classify::classify(
        &ratios,
        choice.threshold,
        &facts.graph,
        options.propagation,
    )
    .include_unmeasured(facts.unmeasured_methods());

    let predicted_cost =
        search::classification_cost(&classification, &facts.insens_costs, &facts.sens_costs);
    tracing::info!(
        "threshold {}: predicted cost {} ({:.2}x of baseline {}) after propagation",
        choice.threshold,
        predicted_cost,
        predicted_cost as f64 / baseline_cost as f64,
        baseline_cost
    );

    Ok(Plan {
        ratios,
        choice,
        baseline_cost,
        predicted_cost,
        unpriced,
        classification,
    })
}

/// Load, classify and write the classification to `output`
pub fn run_classification(
    inputs: &ClassifyInputs,
    options: &ClassifyOptions,
    output: &Path,
) -> Result<ClassificationSummary> {
    let facts = LoadedFacts::load(inputs)?;
    let plan = plan(&facts, options)?;
    emit::write(output, &plan.classification)?;

    Ok(
        ClassificationSummary::new(&plan, options.target_slowdown, options.propagation)
            .with_output(output.to_path_buf()),
    )
}
