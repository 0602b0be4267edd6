//! Per-application fact namespace and pre-analysis cache
//!
//! Every fact file of one application lives in the cache directory as
//! `<app>.<Role>.facts`, so several applications share one cache without
//! clobbering each other. A pre-analysis run is imported from the analysis
//! engine's database directory once; later classifications reuse the cached
//! copy until it is re-imported with `force`.
//!
//! Global invariants enforced:
//! - Exports are parsed before they enter the cache; a malformed or missing
//!   export never replaces a good cached file
//! - Cached files are written atomically

use crate::emit::atomic_write;
use crate::error::{ClassifyError, Result};
use crate::facts::{self, Requirement};
use crate::ClassifyInputs;
use std::path::{Path, PathBuf};

/// Weight export written by the analysis engine's pre-analysis
pub const WEIGHT_EXPORT: &str = "MethodWeight.csv";
/// Cost export written by the analysis engine's pre-analysis
pub const COST_EXPORT: &str = "MethodCost.csv";
/// Requires-edge export written by the analysis engine
pub const REQUIRES_EXPORT: &str = "MethodRequires.csv";

/// Role of a fact file within one application's namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactRole {
    InsensitiveWeight,
    SensitiveWeight,
    InsensitiveCost,
    SensitiveCost,
    Dependencies,
}

impl FactRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactRole::InsensitiveWeight => "InsensitiveWeight",
            FactRole::SensitiveWeight => "SensitiveWeight",
            FactRole::InsensitiveCost => "InsensitiveCost",
            FactRole::SensitiveCost => "SensitiveCost",
            FactRole::Dependencies => "Dependencies",
        }
    }
}

/// One of the two pre-analysis runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreAnalysisRun {
    /// Cheap context-insensitive run
    Insensitive,
    /// Expensive 2-object-sensitive+heap run
    Sensitive,
}

impl PreAnalysisRun {
    /// Analysis name as the engine knows it
    pub fn analysis_name(&self) -> &'static str {
        match self {
            PreAnalysisRun::Insensitive => "context-insensitive",
            PreAnalysisRun::Sensitive => "2-object-sensitive+heap",
        }
    }

    fn weight_role(&self) -> FactRole {
        match self {
            PreAnalysisRun::Insensitive => FactRole::InsensitiveWeight,
            PreAnalysisRun::Sensitive => FactRole::SensitiveWeight,
        }
    }

    fn cost_role(&self) -> FactRole {
        match self {
            PreAnalysisRun::Insensitive => FactRole::InsensitiveCost,
            PreAnalysisRun::Sensitive => FactRole::SensitiveCost,
        }
    }
}

/// Fact file locations for one application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactLayout {
    pub cache_dir: PathBuf,
    pub app: String,
}

impl FactLayout {
    pub fn new(cache_dir: impl Into<PathBuf>, app: impl Into<String>) -> Self {
        FactLayout {
            cache_dir: cache_dir.into(),
            app: app.into(),
        }
    }

    pub fn path(&self, role: FactRole) -> PathBuf {
        self.cache_dir
            .join(format!("{}.{}.facts", self.app, role.as_str()))
    }

    /// Classification inputs read from this namespace
    pub fn inputs(&self, dependencies: Requirement) -> ClassifyInputs {
        ClassifyInputs {
            insens_weights: self.path(FactRole::InsensitiveWeight),
            sens_weights: self.path(FactRole::SensitiveWeight),
            insens_costs: self.path(FactRole::InsensitiveCost),
            sens_costs: self.path(FactRole::SensitiveCost),
            dependencies: Some((self.path(FactRole::Dependencies), dependencies)),
        }
    }

    /// Output file for a given target slowdown
    pub fn output_path(&self, out_dir: &Path, target_slowdown: f64) -> PathBuf {
        out_dir.join(format!(
            "{}-MethodSensitivity-S{}.facts",
            self.app, target_slowdown
        ))
    }

    /// Whether both exports of `run` are already in the cache
    pub fn is_cached(&self, run: PreAnalysisRun) -> bool {
        self.path(run.weight_role()).is_file() && self.path(run.cost_role()).is_file()
    }

    /// Fail unless both pre-analysis runs have been imported
    pub fn ensure_complete(&self) -> Result<()> {
        for run in [PreAnalysisRun::Insensitive, PreAnalysisRun::Sensitive] {
            if !self.is_cached(run) {
                return Err(ClassifyError::ExternalToolFailure {
                    stage: run.analysis_name().to_string(),
                    reason: format!(
                        "no cached facts for app '{}' in {}; import the run first",
                        self.app,
                        self.cache_dir.display()
                    ),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    pub run: PreAnalysisRun,
    /// Also import the requires-edge export; its absence is then an error
    pub with_dependencies: bool,
    /// Re-import even when the run is already cached
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported(Vec<PathBuf>),
    /// The cached copy was kept
    Cached,
}

/// Copy one pre-analysis run's exports from `database_dir` into the cache
pub fn import_run(
    layout: &FactLayout,
    database_dir: &Path,
    options: ImportOptions,
) -> Result<ImportOutcome> {
    let deps_cached = !options.with_dependencies || layout.path(FactRole::Dependencies).is_file();
    if !options.force && layout.is_cached(options.run) && deps_cached {
        tracing::info!(
            "reusing cached {} facts for app '{}'",
            options.run.analysis_name(),
            layout.app
        );
        return Ok(ImportOutcome::Cached);
    }

    let mut plan = vec![
        (WEIGHT_EXPORT, options.run.weight_role()),
        (COST_EXPORT, options.run.cost_role()),
    ];
    if options.with_dependencies {
        plan.push((REQUIRES_EXPORT, FactRole::Dependencies));
    }

    // Validate everything before touching the cache
    let mut staged = Vec::with_capacity(plan.len());
    for (export, role) in plan {
        let source = database_dir.join(export);
        if !source.is_file() {
            return Err(ClassifyError::ExternalToolFailure {
                stage: options.run.analysis_name().to_string(),
                reason: format!("export {} not found", source.display()),
            });
        }
        match role {
            FactRole::Dependencies => {
                facts::load_edges(&source, Requirement::Mandatory)?;
            }
            _ => {
                facts::load(&source)?;
            }
        }
        let content =
            std::fs::read_to_string(&source).map_err(|e| ClassifyError::io(&source, e))?;
        staged.push((layout.path(role), content));
    }

    let mut written = Vec::with_capacity(staged.len());
    for (target, content) in staged {
        atomic_write(&target, &content)?;
        written.push(target);
    }

    tracing::info!(
        "imported {} {} export(s) for app '{}'",
        written.len(),
        options.run.analysis_name(),
        layout.app
    );
    Ok(ImportOutcome::Imported(written))
}
