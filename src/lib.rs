//! Frontend Guardian - convention checks for static HTML/SCSS projects
//!
//! Architecture: Clean Architecture - Library interface serves as the application layer
//! - A project directory is loaded once into an immutable snapshot
//! - Independent rules read the snapshot and produce findings
//! - Reports are formatted for people, CI systems and code scanning tools

pub mod analyzer;
pub mod config;
pub mod domain;
pub mod report;
pub mod rules;
pub mod snapshot;

// Re-export main types for convenient access
pub use domain::findings::{
    Finding, GuardianError, GuardianResult, RuleCategory, Severity, ValidationReport,
    ValidationSummary,
};

pub use config::{ConfigBuilder, GuardianConfig, PathsConfig};

pub use analyzer::{AnalysisOptions, Analyzer, RuleMetadata, RuleRegistry};

pub use report::{OutputFormat, ReportFormatter, ReportOptions};

pub use rules::Rule;

pub use snapshot::ProjectSnapshot;

use std::path::Path;
use std::sync::Arc;

/// Main entry point: load a project, run the rules, format the result
pub struct FrontendGuardian {
    analyzer: Arc<Analyzer>,
    report_formatter: ReportFormatter,
}

impl FrontendGuardian {
    /// Create a guardian with the given configuration
    pub fn new(config: GuardianConfig) -> GuardianResult<Self> {
        config.validate()?;
        let report_formatter = ReportFormatter::new(ReportOptions {
            config_fingerprint: Some(config.fingerprint()),
            ..Default::default()
        });
        let analyzer = Analyzer::new(config)?;

        Ok(Self {
            analyzer: Arc::new(analyzer),
            report_formatter,
        })
    }

    /// Create a guardian with default configuration rooted at `dir`
    pub fn for_directory<P: AsRef<Path>>(dir: P) -> GuardianResult<Self> {
        let config = ConfigBuilder::new().working_dir(dir.as_ref()).build()?;
        Self::new(config)
    }

    /// Set custom report formatter
    pub fn with_report_formatter(mut self, formatter: ReportFormatter) -> Self {
        self.report_formatter = formatter;
        self
    }

    pub fn config(&self) -> &GuardianConfig {
        self.analyzer.config()
    }

    /// Metadata for every rule this guardian runs
    pub fn rules(&self) -> Vec<RuleMetadata> {
        self.analyzer.registry().rule_metadata()
    }

    /// Read the configured working directory into a snapshot
    pub fn load_snapshot(&self) -> GuardianResult<ProjectSnapshot> {
        ProjectSnapshot::load(&self.config().paths)
    }

    /// Validate the configured working directory
    pub fn validate_directory(&self, options: &AnalysisOptions) -> GuardianResult<ValidationReport> {
        self.analyzer.analyze_directory(options)
    }

    /// Validate an already loaded snapshot
    pub fn validate_snapshot(
        &self,
        snapshot: &ProjectSnapshot,
        options: &AnalysisOptions,
    ) -> ValidationReport {
        self.analyzer.analyze_snapshot(snapshot, options)
    }

    /// Validate the working directory on the blocking thread pool, keeping
    /// file IO and the external validator off the async runtime
    pub async fn validate(&self, options: AnalysisOptions) -> GuardianResult<ValidationReport> {
        let analyzer = Arc::clone(&self.analyzer);
        tokio::task::spawn_blocking(move || analyzer.analyze_directory(&options))
            .await
            .map_err(|e| GuardianError::validation(format!("Validation task failed: {e}")))?
    }

    /// Format a validation report for output
    pub fn format_report(&self, report: &ValidationReport, format: OutputFormat) -> GuardianResult<String> {
        self.report_formatter.format_report(report, format)
    }
}

/// Convenience function to validate a directory with default settings
pub fn validate_directory<P: AsRef<Path>>(directory: P) -> GuardianResult<ValidationReport> {
    let guardian = FrontendGuardian::for_directory(directory)?;
    guardian.validate_directory(&AnalysisOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const INDEX: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Studio</title>
  <meta name="description" content="Design studio">
  <link rel="icon" href="images/favicon.svg">
</head>
<body class="page">
  <header class="header">
    <nav class="header__nav">
      <a class="header__link" href="index.html" aria-current="page">Home</a>
    </nav>
  </header>
  <main class="page__main">
    <h1 class="page__title">Studio</h1>
  </main>
  <footer class="footer">Contacts</footer>
</body>
</html>
"#;

    fn project() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("styles")).unwrap();
        fs::create_dir_all(root.join("assets")).unwrap();
        fs::write(root.join("index.html"), INDEX).unwrap();
        fs::write(root.join("styles/normalize.css"), "html { line-height: 1.15; }").unwrap();
        fs::write(root.join("styles/main.scss"), ".page {\n  margin: 0;\n}\n").unwrap();
        temp_dir
    }

    fn guardian(root: &Path) -> FrontendGuardian {
        FrontendGuardian::for_directory(root).unwrap()
    }

    #[test]
    fn test_missing_images_directory() {
        let temp_dir = project();
        let report = guardian(temp_dir.path())
            .validate_directory(&AnalysisOptions::default())
            .unwrap();

        let structure: Vec<_> = report
            .findings
            .iter()
            .filter(|f| f.rule_id == rules::structure::RULE_ID)
            .map(|f| f.message.as_str())
            .collect();
        assert_eq!(structure, vec!["Required directory not found: images"]);
        assert!(!report.passed());
    }

    #[test]
    fn test_runs_are_deterministic() {
        let temp_dir = project();
        let root = temp_dir.path();
        fs::write(root.join("about.html"), "<html><body><div class=\"Bad_Class\"><p>x</p></div></body></html>").unwrap();

        let guardian = guardian(root);
        let snapshot = guardian.load_snapshot().unwrap();
        let parallel = guardian.validate_snapshot(&snapshot, &AnalysisOptions::default());
        let sequential = guardian.validate_snapshot(
            &snapshot,
            &AnalysisOptions {
                parallel: false,
                ..Default::default()
            },
        );
        let again = guardian.validate_directory(&AnalysisOptions::default()).unwrap();

        assert_eq!(parallel, sequential);
        assert_eq!(parallel, again);
        assert!(parallel.findings.iter().any(|f| f.message.contains("Bad_Class")));
    }

    #[test]
    fn test_missing_working_directory_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");

        assert!(validate_directory(missing).is_err());
    }

    #[test]
    fn test_report_formatting() {
        let temp_dir = project();
        let guardian = guardian(temp_dir.path());
        let report = guardian.validate_directory(&AnalysisOptions::default()).unwrap();

        let json = guardian.format_report(&report, OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed["findings"].is_array());
        assert_eq!(parsed["config_fingerprint"], guardian.config().fingerprint());
    }

    #[tokio::test]
    async fn test_async_validate() {
        let temp_dir = project();
        fs::create_dir_all(temp_dir.path().join("images")).unwrap();
        let guardian = guardian(temp_dir.path());

        let report = guardian
            .validate(AnalysisOptions {
                min_severity: Severity::Error,
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(report.findings.iter().all(|f| f.severity == Severity::Error));
        assert!(!report
            .findings
            .iter()
            .any(|f| f.message.starts_with("Required directory not found")));
    }

    #[test]
    fn test_rule_listing() {
        let temp_dir = project();
        let mut config = GuardianConfig::default();
        config.paths.working_dir = temp_dir.path().to_path_buf();
        config.rules.disabled.push(rules::bem::CLASS_NAMING.to_string());

        let guardian = FrontendGuardian::new(config).unwrap();
        let ids: Vec<_> = guardian.rules().into_iter().map(|rule| rule.id).collect();

        assert!(!ids.iter().any(|id| id == rules::bem::CLASS_NAMING));
        assert!(ids.iter().any(|id| id == rules::structure::RULE_ID));
    }
}
