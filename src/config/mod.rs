//! Configuration loading and management for Frontend Guardian
//!
//! Architecture: Anti-Corruption Layer - Configuration translates external YAML and environment
//! - Raw YAML structures are converted to clean domain objects
//! - Directory names come from an explicit value, never from process-wide state
//! - Environment overrides are applied through an injectable lookup so they stay testable

use crate::domain::findings::{GuardianError, GuardianResult, Severity};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file names looked up in the current directory when none is given
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "frontend_guardian.yaml",
    "frontend_guardian.yml",
    ".frontend_guardian.yaml",
];

/// Main configuration structure for Frontend Guardian
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardianConfig {
    /// Configuration format version
    pub version: String,
    /// Project layout
    #[serde(default)]
    pub paths: PathsConfig,
    /// Numeric thresholds used by rules
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Rule toggles and severity overrides
    #[serde(default)]
    pub rules: RulesConfig,
    /// External markup conformance service
    #[serde(default)]
    pub conformance: ConformanceConfig,
}

/// Directory layout of the checked project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Project root; every other directory is relative to it
    pub working_dir: PathBuf,
    /// Directory holding the HTML pages
    pub html_dir: String,
    /// Directory holding SCSS/CSS sources
    pub styles_dir: String,
    /// Directory holding source images
    pub images_dir: String,
    /// Directory holding generated assets
    pub assets_dir: String,
    /// Glob patterns excluded from the project tree (gitignore-style, `!` re-includes)
    pub exclude: Vec<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("."),
            html_dir: ".".to_string(),
            styles_dir: "styles".to_string(),
            images_dir: "images".to_string(),
            assets_dir: "assets".to_string(),
            exclude: vec!["**/node_modules/**".to_string(), "**/.git/**".to_string()],
        }
    }
}

impl PathsConfig {
    pub fn html_path(&self) -> PathBuf {
        self.working_dir.join(&self.html_dir)
    }

    pub fn styles_path(&self) -> PathBuf {
        self.working_dir.join(&self.styles_dir)
    }

    pub fn images_path(&self) -> PathBuf {
        self.working_dir.join(&self.images_dir)
    }

    pub fn assets_path(&self) -> PathBuf {
        self.working_dir.join(&self.assets_dir)
    }

    /// Images that ship with the generated assets
    pub fn asset_images_dir(&self) -> PathBuf {
        Path::new(&self.assets_dir).join("images")
    }
}

/// Thresholds shared by rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum selector nesting depth
    pub max_nesting_depth: usize,
    /// Maximum width or height of a generated raster image, in pixels
    pub max_image_dimension: u32,
    /// Maximum size of a generated raster image, in bytes
    pub max_image_bytes: u64,
    /// Minimum number of distinct sectioning tags per page
    pub min_semantic_tags: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: 2,
            max_image_dimension: 2000,
            max_image_bytes: 1024 * 1024,
            min_semantic_tags: 3,
        }
    }
}

/// Rule toggles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Rule ids that should not run
    pub disabled: Vec<String>,
    /// Per-rule severity overrides
    pub severity: BTreeMap<String, Severity>,
}

/// External markup validator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConformanceConfig {
    /// Whether to send pages to the external validator
    pub enabled: bool,
    /// Nu HTML Checker endpoint returning JSON
    pub endpoint: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ConformanceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "https://validator.w3.org/nu/?out=json".to_string(),
            timeout_secs: 30,
        }
    }
}

impl GuardianConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> GuardianResult<Self> {
        let contents = fs::read_to_string(&path).map_err(|e| {
            GuardianError::config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = serde_yaml::from_str(&contents).map_err(|e| {
            GuardianError::config(format!(
                "Failed to parse config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from string content
    pub fn load_from_str(content: &str) -> GuardianResult<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| GuardianError::config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Resolve the effective configuration: explicit file, else a default file
    /// in the current directory, else built-in defaults; then environment.
    pub fn discover(explicit: Option<&Path>) -> GuardianResult<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => match DEFAULT_CONFIG_FILES.iter().find(|name| Path::new(name).exists()) {
                Some(name) => {
                    tracing::debug!("Using configuration file {}", name);
                    Self::load_from_file(name)?
                }
                None => Self::default(),
            },
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply `WORKING_DIR`, `HTML_DIR`, `STYLES_DIR`, `IMAGES_DIR` and `ASSETS_DIR`
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(dir) = non_empty("WORKING_DIR") {
            self.paths.working_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty("HTML_DIR") {
            self.paths.html_dir = dir;
        }
        if let Some(dir) = non_empty("STYLES_DIR") {
            self.paths.styles_dir = dir;
        }
        if let Some(dir) = non_empty("IMAGES_DIR") {
            self.paths.images_dir = dir;
        }
        if let Some(dir) = non_empty("ASSETS_DIR") {
            self.paths.assets_dir = dir;
        }
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> GuardianResult<()> {
        if !["1.0"].contains(&self.version.as_str()) {
            return Err(GuardianError::config(format!(
                "Unsupported configuration version: {}. Supported versions: 1.0",
                self.version
            )));
        }

        for pattern in &self.paths.exclude {
            let pattern = pattern.strip_prefix('!').unwrap_or(pattern);
            glob::Pattern::new(pattern).map_err(|e| {
                GuardianError::config(format!("Invalid exclude pattern '{pattern}': {e}"))
            })?;
        }

        let known = crate::rules::RULE_IDS;
        for rule_id in self.rules.disabled.iter().chain(self.rules.severity.keys()) {
            if !known.contains(&rule_id.as_str()) {
                return Err(GuardianError::config(format!(
                    "Unknown rule id '{rule_id}'"
                )));
            }
        }

        let limits = &self.limits;
        if limits.max_nesting_depth == 0
            || limits.max_image_dimension == 0
            || limits.max_image_bytes == 0
            || limits.min_semantic_tags == 0
        {
            return Err(GuardianError::config("Limits must be greater than zero"));
        }

        if self.conformance.enabled && self.conformance.endpoint.trim().is_empty() {
            return Err(GuardianError::config(
                "Conformance validation is enabled but no endpoint is configured",
            ));
        }

        Ok(())
    }

    /// Whether a rule id is switched on
    pub fn is_rule_enabled(&self, rule_id: &str) -> bool {
        !self.rules.disabled.iter().any(|id| id == rule_id)
    }

    /// Severity override for a rule, if any
    pub fn severity_override(&self, rule_id: &str) -> Option<Severity> {
        self.rules.severity.get(rule_id).copied()
    }

    /// Convert to JSON for serialization
    pub fn to_json(&self) -> GuardianResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| GuardianError::config(format!("Failed to serialize config: {e}")))
    }

    /// Stable fingerprint of the configuration, reported alongside results
    pub fn fingerprint(&self) -> String {
        // serde_json keeps struct field order and BTreeMap keys sorted
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        let digest = Sha256::digest(&canonical);
        digest.iter().take(8).map(|byte| format!("{byte:02x}")).collect()
    }
}

impl Default for GuardianConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            paths: PathsConfig::default(),
            limits: LimitsConfig::default(),
            rules: RulesConfig::default(),
            conformance: ConformanceConfig::default(),
        }
    }
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: GuardianConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: GuardianConfig::default(),
        }
    }

    /// Set the project root
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.paths.working_dir = dir.into();
        self
    }

    /// Add an exclude pattern
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.config.paths.exclude.push(pattern.into());
        self
    }

    /// Switch a rule off
    pub fn disable_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.config.rules.disabled.push(rule_id.into());
        self
    }

    /// Enable the external markup validator
    pub fn with_conformance(mut self, endpoint: impl Into<String>) -> Self {
        self.config.conformance.enabled = true;
        self.config.conformance.endpoint = endpoint.into();
        self
    }

    pub fn build(self) -> GuardianResult<GuardianConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
