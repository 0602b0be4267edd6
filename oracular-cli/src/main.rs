//! Oracular CLI - budget-constrained context-sensitivity selection

#![deny(warnings)]

// Global invariants enforced:
// - Deterministic output ordering
// - Identical input yields byte-for-byte identical output
// - CLI flags take precedence over config file values

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use oracular_core::config::{self, ResolvedConfig};
use oracular_core::layout::{self, FactLayout, ImportOptions, ImportOutcome, PreAnalysisRun};
use oracular_core::{ratio, report};
use oracular_core::{
    render_json, render_text, run_classification, ClassifyInputs, ClassifyOptions, LoadedFacts,
    Propagation, Requirement,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "oracular")]
#[command(about = "Choose per-method context sensitivity under a target analysis cost")]
#[command(version = env!("ORACULAR_VERSION"))]
struct Cli {
    /// Log pipeline decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify every method and write the sensitivity fact file
    Classify {
        #[command(flatten)]
        inputs: InputArgs,

        /// Target slowdown relative to the insensitive run (overrides config file)
        #[arg(long)]
        slowdown: Option<f64>,

        /// Dependency propagation mode (overrides config file)
        #[arg(long)]
        propagation: Option<PropagationArg>,

        /// Output fact file (default: <out-dir>/<app>-MethodSensitivity-S<slowdown>.facts)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output directory for the default output path (overrides config file)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Summary format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Import a pre-analysis run's exports into the fact cache
    Import {
        /// Which pre-analysis produced the exports
        #[arg(long)]
        run: RunArg,

        /// Analysis database directory holding the exports
        #[arg(long, default_value = "last-analysis")]
        from: PathBuf,

        /// Fact namespace (overrides config file)
        #[arg(long)]
        app: Option<String>,

        /// Fact cache directory (overrides config file)
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Also import the method dependency export
        #[arg(long)]
        with_deps: bool,

        /// Re-import even when the run is already cached
        #[arg(long)]
        force: bool,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List the searched methods ordered by precision ratio
    Ratios {
        #[command(flatten)]
        inputs: InputArgs,

        /// Show only the first N rows
        #[arg(long)]
        top: Option<usize>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Validate a configuration file
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

// Either all four weight and cost files are named explicitly, or none are
// and they are read from the fact cache.
#[derive(Args)]
struct InputArgs {
    /// Insensitive-run weight facts
    #[arg(long)]
    insens_weights: Option<PathBuf>,

    /// Sensitive-run weight facts
    #[arg(long)]
    sens_weights: Option<PathBuf>,

    /// Insensitive-run cost facts
    #[arg(long)]
    insens_costs: Option<PathBuf>,

    /// Sensitive-run cost facts
    #[arg(long)]
    sens_costs: Option<PathBuf>,

    /// Method dependency facts
    #[arg(long)]
    deps: Option<PathBuf>,

    /// Treat a missing dependency file as "no edges"
    #[arg(long)]
    deps_optional: bool,

    /// Fact namespace (overrides config file)
    #[arg(long)]
    app: Option<String>,

    /// Fact cache directory (overrides config file)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Path to config file (default: auto-discover)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without running a classification
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum PropagationArg {
    None,
    OneHop,
    Transitive,
}

impl From<PropagationArg> for Propagation {
    fn from(arg: PropagationArg) -> Self {
        match arg {
            PropagationArg::None => Propagation::None,
            PropagationArg::OneHop => Propagation::OneHop,
            PropagationArg::Transitive => Propagation::Transitive,
        }
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum RunArg {
    Insensitive,
    Sensitive,
}

impl From<RunArg> for PreAnalysisRun {
    fn from(arg: RunArg) -> Self {
        match arg {
            RunArg::Insensitive => PreAnalysisRun::Insensitive,
            RunArg::Sensitive => PreAnalysisRun::Sensitive,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Classify {
            inputs,
            slowdown,
            propagation,
            output,
            out_dir,
            format,
        } => {
            let resolved = load_config(inputs.config.as_deref())?;

            // CLI flags override config file values
            let mut options = ClassifyOptions::from_config(&resolved);
            if let Some(slowdown) = slowdown {
                config::validate_slowdown(slowdown)?;
                options.target_slowdown = slowdown;
            }
            if let Some(propagation) = propagation {
                options.propagation = propagation.into();
            }

            let (fact_layout, classify_inputs) = resolve_inputs(&inputs, &resolved)?;
            let output_path = output.unwrap_or_else(|| {
                let out_dir = out_dir.unwrap_or_else(|| resolved.out_dir.clone());
                fact_layout.output_path(&out_dir, options.target_slowdown)
            });

            let summary = run_classification(&classify_inputs, &options, &output_path)?;

            match format {
                OutputFormat::Text => print!("{}", render_text(&summary)),
                OutputFormat::Json => println!("{}", render_json(&summary)),
            }
        }
        Commands::Import {
            run,
            from,
            app,
            cache_dir,
            with_deps,
            force,
            config: config_path,
        } => {
            let resolved = load_config(config_path.as_deref())?;
            let fact_layout = fact_layout(app, cache_dir, &resolved)?;
            let options = ImportOptions {
                run: run.into(),
                with_dependencies: with_deps,
                force,
            };

            match layout::import_run(&fact_layout, &from, options)? {
                ImportOutcome::Imported(files) => {
                    for file in files {
                        println!("Imported: {}", file.display());
                    }
                }
                ImportOutcome::Cached => {
                    println!(
                        "Using cached {} facts for app '{}' (pass --force to re-import)",
                        options.run.analysis_name(),
                        fact_layout.app
                    );
                }
            }
        }
        Commands::Ratios {
            inputs,
            top,
            format,
        } => {
            let resolved = load_config(inputs.config.as_deref())?;
            let (_, classify_inputs) = resolve_inputs(&inputs, &resolved)?;
            let facts = LoadedFacts::load(&classify_inputs)?;

            let ratios = ratio::compute_ratios(&facts.insens_weights, &facts.sens_weights)
                .force_matching(&resolved.force_sensitive)
                .require_costs(&facts.insens_costs, &facts.sens_costs);
            if ratios.missing > 0 {
                eprintln!(
                    "{} method(s) lack high-precision data and are not listed",
                    ratios.missing
                );
            }

            let mut rows = report::ratio_rows(&ratios);
            if let Some(n) = top {
                rows.truncate(n);
            }

            match format {
                OutputFormat::Text => print!("{}", report::render_ratio_table(&rows)),
                OutputFormat::Json => println!("{}", report::render_ratio_json(&rows)),
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref());

                match resolved {
                    Ok(config) => {
                        if let Some(ref p) = config.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref())
                    .context("failed to load configuration")?;

                println!("Configuration:");
                if let Some(ref p) = resolved.config_path {
                    println!("  Source: {}", p.display());
                } else {
                    println!("  Source: defaults (no config file found)");
                }
                println!();
                println!("Search:");
                println!("  target_slowdown: {}", resolved.target_slowdown);
                println!("  propagation: {}", resolved.propagation.as_str());
                println!(
                    "  force_sensitive: {}",
                    if resolved.force_sensitive_count > 0 {
                        format!("{} pattern(s)", resolved.force_sensitive_count)
                    } else {
                        "none".to_string()
                    }
                );
                println!();
                println!("Facts:");
                println!("  app: {}", resolved.app);
                println!("  cache_dir: {}", resolved.cache_dir.display());
                println!("  out_dir: {}", resolved.out_dir.display());
                println!(
                    "  dependencies: {}",
                    if resolved.dependencies_optional {
                        "optional"
                    } else {
                        "required"
                    }
                );
            }
        },
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(config_path: Option<&Path>) -> anyhow::Result<ResolvedConfig> {
    let project_root = std::env::current_dir()?;
    let resolved = config::load_and_resolve(&project_root, config_path)
        .context("failed to load configuration")?;

    if let Some(config_path) = &resolved.config_path {
        eprintln!("Using config: {}", config_path.display());
    }
    Ok(resolved)
}

fn fact_layout(
    app: Option<String>,
    cache_dir: Option<PathBuf>,
    resolved: &ResolvedConfig,
) -> anyhow::Result<FactLayout> {
    let app = match app {
        Some(app) => {
            config::validate_app(&app)?;
            app
        }
        None => resolved.app.clone(),
    };
    let cache_dir = cache_dir.unwrap_or_else(|| resolved.cache_dir.clone());
    Ok(FactLayout::new(cache_dir, app))
}

/// Explicit paths when all four are given, otherwise the cached namespace
fn resolve_inputs(
    inputs: &InputArgs,
    resolved: &ResolvedConfig,
) -> anyhow::Result<(FactLayout, ClassifyInputs)> {
    let fact_layout = fact_layout(inputs.app.clone(), inputs.cache_dir.clone(), resolved)?;
    let explicit = [
        &inputs.insens_weights,
        &inputs.sens_weights,
        &inputs.insens_costs,
        &inputs.sens_costs,
    ];

    let classify_inputs = match explicit {
        [Some(insens_weights), Some(sens_weights), Some(insens_costs), Some(sens_costs)] => {
            if inputs.deps_optional && inputs.deps.is_none() {
                anyhow::bail!("--deps-optional requires --deps with explicit fact files");
            }
            let requirement = if inputs.deps_optional {
                Requirement::Optional
            } else {
                Requirement::Mandatory
            };
            ClassifyInputs {
                insens_weights: insens_weights.clone(),
                sens_weights: sens_weights.clone(),
                insens_costs: insens_costs.clone(),
                sens_costs: sens_costs.clone(),
                dependencies: inputs.deps.clone().map(|path| (path, requirement)),
            }
        }
        [None, None, None, None] => {
            fact_layout.ensure_complete()?;
            let requirement = if inputs.deps_optional || resolved.dependencies_optional {
                Requirement::Optional
            } else {
                Requirement::Mandatory
            };
            let mut cached = fact_layout.inputs(requirement);
            if let Some(deps) = &inputs.deps {
                cached.dependencies = Some((deps.clone(), requirement));
            }
            cached
        }
        _ => anyhow::bail!(
            "--insens-weights, --sens-weights, --insens-costs and --sens-costs must be given together"
        ),
    };

    Ok((fact_layout, classify_inputs))
}
