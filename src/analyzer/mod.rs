//! Main analysis orchestrator for Frontend Guardian
//!
//! Architecture: Domain Services - Analyzer runs every registered rule over one snapshot
//! - Rules are independent and read the snapshot without mutating it
//! - A rule that errors or panics becomes a single finding, the run continues
//! - Parallel and sequential runs produce the same report

pub mod registry;

pub use registry::{RuleMetadata, RuleRegistry};

use crate::config::GuardianConfig;
use crate::domain::findings::{
    Finding, GuardianError, GuardianResult, Severity, ValidationReport,
};
use crate::rules::Rule;
use crate::snapshot::ProjectSnapshot;
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Path used for findings that concern the whole project
pub const PROJECT_PATH: &str = ".";

/// Main analyzer that orchestrates the entire validation process
pub struct Analyzer {
    /// Configuration for this analysis
    config: GuardianConfig,
    /// Rules executed on every run
    registry: RuleRegistry,
}

/// Options for customizing analysis behavior
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Whether to run rules in parallel
    pub parallel: bool,
    /// Drop findings below this severity
    pub min_severity: Severity,
    /// Keep at most this many findings, after sorting
    pub max_findings: Option<usize>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            min_severity: Severity::Info,
            max_findings: None,
        }
    }
}

impl Analyzer {
    /// Create an analyzer running every rule the configuration enables
    pub fn new(config: GuardianConfig) -> GuardianResult<Self> {
        let registry = RuleRegistry::default_rules(&config)?;
        Ok(Self { config, registry })
    }

    /// Create an analyzer with an explicit rule set
    pub fn with_registry(config: GuardianConfig, registry: RuleRegistry) -> Self {
        Self { config, registry }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn config(&self) -> &GuardianConfig {
        &self.config
    }

    /// Load the configured working directory and analyze it
    pub fn analyze_directory(&self, options: &AnalysisOptions) -> GuardianResult<ValidationReport> {
        let snapshot = ProjectSnapshot::load(&self.config.paths)?;
        Ok(self.analyze_snapshot(&snapshot, options))
    }

    /// Run every registered rule over a loaded snapshot
    pub fn analyze_snapshot(
        &self,
        snapshot: &ProjectSnapshot,
        options: &AnalysisOptions,
    ) -> ValidationReport {
        let rules = self.registry.rules();

        // collect keeps registry order whether or not rules ran in parallel
        let results: Vec<Vec<Finding>> = if options.parallel && rules.len() > 1 {
            rules
                .par_iter()
                .map(|rule| self.run_rule(rule.as_ref(), snapshot))
                .collect()
        } else {
            rules
                .iter()
                .map(|rule| self.run_rule(rule.as_ref(), snapshot))
                .collect()
        };

        let mut report = ValidationReport::new();
        let mut findings: Vec<Finding> = results
            .into_iter()
            .flatten()
            .filter(|finding| finding.severity >= options.min_severity)
            .collect();
        findings.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        if let Some(max) = options.max_findings {
            findings.truncate(max);
        }

        for finding in findings {
            report.add_finding(finding);
        }
        report.set_files_analyzed(snapshot.total_files());
        report.set_rules_run(rules.len());

        report
    }

    /// Run one rule, turning an error or panic into a finding
    fn run_rule(&self, rule: &dyn Rule, snapshot: &ProjectSnapshot) -> Vec<Finding> {
        tracing::debug!("Running rule {}", rule.id());

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| rule.check(snapshot)));
        let cause = match outcome {
            Ok(Ok(mut findings)) => {
                if let Some(severity) = self.config.severity_override(rule.id()) {
                    for finding in &mut findings {
                        finding.severity = severity;
                    }
                }
                return findings;
            }
            Ok(Err(GuardianError::RuleExecution { message, .. })) => message,
            Ok(Err(other)) => other.to_string(),
            Err(payload) => panic_message(payload.as_ref()),
        };

        // failures keep error severity whatever the rule is configured to report at
        tracing::warn!("Rule {} failed: {}", rule.id(), cause);
        vec![failure_finding(rule, &cause)]
    }
}

fn failure_finding(rule: &dyn Rule, cause: &str) -> Finding {
    Finding::new(
        rule.id(),
        rule.category(),
        PROJECT_PATH,
        format!("{} failed: {}", rule.id(), cause),
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
