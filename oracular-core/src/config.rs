//! Configuration file support for Oracular
//!
//! Loads project-specific configuration from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.oracularrc.json` in the working directory
//! 3. `oracular.config.json` in the working directory
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::deps::Propagation;
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_APP: &str = "temp";
pub const DEFAULT_CACHE_DIR: &str = "oracular/cache";
pub const DEFAULT_OUT_DIR: &str = "oracular/out";

/// Oracular configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OracularConfig {
    /// Hybrid cost as a multiple of the insensitive baseline (default: 1.0)
    #[serde(default)]
    pub target_slowdown: Option<f64>,

    /// Dependency propagation mode (default: one-hop)
    #[serde(default)]
    pub propagation: Option<Propagation>,

    /// Glob patterns over method ids that are always analyzed 2-object
    #[serde(default)]
    pub force_sensitive: Vec<String>,

    /// Fact namespace inside the cache (default: "temp")
    #[serde(default)]
    pub app: Option<String>,

    /// Directory holding imported pre-analysis facts (default: oracular/cache)
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Directory receiving classification output (default: oracular/out)
    #[serde(default)]
    pub out_dir: Option<PathBuf>,

    /// Treat a missing dependency fact file in the cache as "no edges"
    /// (default: true)
    #[serde(default)]
    pub dependencies_optional: Option<bool>,
}

/// Resolved configuration with compiled glob patterns
#[derive(Debug)]
pub struct ResolvedConfig {
    pub target_slowdown: f64,
    pub propagation: Propagation,
    /// Compiled force_sensitive patterns (empty set when none)
    pub force_sensitive: GlobSet,
    pub force_sensitive_count: usize,
    pub app: String,
    pub cache_dir: PathBuf,
    pub out_dir: PathBuf,
    pub dependencies_optional: bool,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl OracularConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if let Some(slowdown) = self.target_slowdown {
            validate_slowdown(slowdown)?;
        }

        if let Some(ref app) = self.app {
            validate_app(app)?;
        }

        for pattern in &self.force_sensitive {
            Glob::new(pattern)
                .with_context(|| format!("invalid force_sensitive pattern: {}", pattern))?;
        }

        Ok(())
    }

    /// Resolve config into compiled form ready for use
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let mut builder = GlobSetBuilder::new();
        for pattern in &self.force_sensitive {
            builder.add(Glob::new(pattern)?);
        }
        let force_sensitive = builder.build()?;

        Ok(ResolvedConfig {
            target_slowdown: self.target_slowdown.unwrap_or(1.0),
            propagation: self.propagation.unwrap_or_default(),
            force_sensitive,
            force_sensitive_count: self.force_sensitive.len(),
            app: self.app.clone().unwrap_or_else(|| DEFAULT_APP.to_string()),
            cache_dir: self
                .cache_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR)),
            out_dir: self
                .out_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR)),
            dependencies_optional: self.dependencies_optional.unwrap_or(true),
            config_path: None,
        })
    }
}

/// Target slowdown must be a finite positive number
pub fn validate_slowdown(slowdown: f64) -> Result<()> {
    if !slowdown.is_finite() || slowdown <= 0.0 {
        anyhow::bail!("target_slowdown must be positive (got {})", slowdown);
    }
    Ok(())
}

/// App names become file name prefixes inside the cache
pub fn validate_app(app: &str) -> Result<()> {
    if app.is_empty() {
        anyhow::bail!("app must not be empty");
    }
    if app.contains(['/', '\\', '\t', '\n']) || app == "." || app == ".." {
        anyhow::bail!("app must be a plain name (got {:?})", app);
    }
    Ok(())
}

/// Discover and load a config file from the project root
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(project_root: &Path) -> Result<Option<(OracularConfig, PathBuf)>> {
    for name in [".oracularrc.json", "oracular.config.json"] {
        let path = project_root.join(name);
        if path.exists() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }
    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<OracularConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: OracularConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load and resolve config for a project
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config from the project root.
/// Returns default config if nothing is found.
pub fn load_and_resolve(project_root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(project_root)? {
            Some((config, path)) => (config, Some(path)),
            None => (OracularConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    resolved.config_path = source_path;
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config_is_valid() {
        let config = OracularConfig::default();
        config.validate().expect("default config should be valid");
        let resolved = config.resolve().expect("default config should resolve");
        assert_eq!(resolved.target_slowdown, 1.0);
        assert_eq!(resolved.propagation, Propagation::OneHop);
        assert_eq!(resolved.app, "temp");
        assert_eq!(resolved.cache_dir, PathBuf::from("oracular/cache"));
        assert_eq!(resolved.out_dir, PathBuf::from("oracular/out"));
        assert!(resolved.dependencies_optional);
        assert!(resolved.force_sensitive.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "target_slowdown": 2.5,
            "propagation": "transitive",
            "force_sensitive": ["<java.util.*"],
            "app": "antlr",
            "cache_dir": "scratch/cache",
            "out_dir": "scratch/out",
            "dependencies_optional": false
        }"#;
        let config: OracularConfig = serde_json::from_str(json).unwrap();
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.target_slowdown, 2.5);
        assert_eq!(resolved.propagation, Propagation::Transitive);
        assert_eq!(resolved.force_sensitive_count, 1);
        assert!(resolved
            .force_sensitive
            .is_match("<java.util.HashMap: java.lang.Object get(java.lang.Object)>"));
        assert_eq!(resolved.app, "antlr");
        assert_eq!(resolved.cache_dir, PathBuf::from("scratch/cache"));
        assert!(!resolved.dependencies_optional);
    }

    #[test]
    fn test_reject_unknown_fields() {
        let json = r#"{"threshold": 0.3}"#;
        let result: Result<OracularConfig, _> = serde_json::from_str(json);
        assert!(result.is_err(), "unknown fields should be rejected");
    }

    #[test]
    fn test_reject_unknown_propagation() {
        let json = r#"{"propagation": "two-hop"}"#;
        let result: Result<OracularConfig, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_reject_non_positive_slowdown() {
        for json in [r#"{"target_slowdown": 0.0}"#, r#"{"target_slowdown": -2.0}"#] {
            let config: OracularConfig = serde_json::from_str(json).unwrap();
            assert!(config.validate().is_err(), "{} should be rejected", json);
        }
    }

    #[test]
    fn test_reject_app_with_separator() {
        let config: OracularConfig = serde_json::from_str(r#"{"app": "../etc"}"#).unwrap();
        assert!(config.validate().is_err());
        let config: OracularConfig = serde_json::from_str(r#"{"app": ""}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_invalid_glob_pattern() {
        let config: OracularConfig =
            serde_json::from_str(r#"{"force_sensitive": ["[invalid"]}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_discover_rc_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join(".oracularrc.json");
        fs::write(&config_path, r#"{"target_slowdown": 3.0}"#).unwrap();

        let (config, path) = discover_config(dir.path()).unwrap().unwrap();
        assert_eq!(config.target_slowdown, Some(3.0));
        assert_eq!(path, config_path);
    }

    #[test]
    fn test_discover_priority_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".oracularrc.json"), r#"{"app": "first"}"#).unwrap();
        fs::write(dir.path().join("oracular.config.json"), r#"{"app": "second"}"#).unwrap();

        let (config, _) = discover_config(dir.path()).unwrap().unwrap();
        assert_eq!(
            config.app.as_deref(),
            Some("first"),
            ".oracularrc.json should take priority"
        );
    }

    #[test]
    fn test_no_config_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_config(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_load_and_resolve_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("custom.json");
        fs::write(&config_path, r#"{"propagation": "none"}"#).unwrap();

        let resolved = load_and_resolve(dir.path(), Some(&config_path)).unwrap();
        assert_eq!(resolved.propagation, Propagation::None);
        assert_eq!(resolved.config_path, Some(config_path));
    }

    #[test]
    fn test_load_and_resolve_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = load_and_resolve(dir.path(), None).unwrap();
        assert!(resolved.config_path.is_none());
        assert_eq!(resolved.target_slowdown, 1.0);
    }

    #[test]
    fn test_invalid_file_names_path_in_error() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("bad.json");
        fs::write(&config_path, r#"{"target_slowdown": -1}"#).unwrap();

        let err = load_config_file(&config_path).unwrap_err();
        assert!(format!("{:#}", err).contains("bad.json"));
    }
}
