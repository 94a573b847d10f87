//! Core domain models for front-end findings and validation results
//!
//! Architecture: Rich Domain Models - a Finding is an immutable value produced by a rule
//! - Findings carry their own location, context and suggested fix
//! - ValidationReport acts as the aggregate root, grouping findings by file and by category
//! - Reports hold no timestamps so that identical snapshots produce identical reports

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Severity levels for findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational messages and suggestions
    Info,
    /// Secondary problems, e.g. ARIA-only labelling
    Warning,
    /// Convention violations
    Error,
}

impl Severity {
    /// Whether this severity level is an outright error
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Error)
    }

    /// Convert to string for display
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Family a rule belongs to, used to group findings in reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    /// BEM class naming and wrapper markup
    Bem,
    /// Document-level HTML semantics
    Html,
    /// Links, buttons and form controls
    Accessibility,
    /// SCSS/CSS authoring conventions
    Styles,
    /// Image references and image files
    Images,
    /// Project directory layout and file naming
    Structure,
    /// External markup conformance service
    Conformance,
}

impl RuleCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bem => "bem",
            Self::Html => "html",
            Self::Accessibility => "accessibility",
            Self::Styles => "styles",
            Self::Images => "images",
            Self::Structure => "structure",
            Self::Conformance => "conformance",
        }
    }

    /// All categories in display order
    pub fn all() -> &'static [RuleCategory] {
        &[
            Self::Bem,
            Self::Html,
            Self::Accessibility,
            Self::Styles,
            Self::Images,
            Self::Structure,
            Self::Conformance,
        ]
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single rule violation found in the project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Registry name of the rule that produced this finding
    pub rule_id: String,
    /// Category of the producing rule
    pub category: RuleCategory,
    /// Severity level of this finding
    pub severity: Severity,
    /// File path relative to the working directory
    pub file_path: PathBuf,
    /// Line number (1-indexed) where the problem occurs
    pub line: Option<u32>,
    /// Human-readable description
    pub message: String,
    /// Source snippet around the problem
    pub context: Option<String>,
    /// Suggested fix (if available)
    pub suggestion: Option<String>,
}

impl Finding {
    /// Create a new error-level finding
    pub fn new(
        rule_id: impl Into<String>,
        category: RuleCategory,
        file_path: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            category,
            severity: Severity::Error,
            file_path: file_path.into(),
            line: None,
            message: message.into(),
            context: None,
            suggestion: None,
        }
    }

    /// Set the line number; zero means "unknown" and is ignored
    pub fn at_line(mut self, line: u32) -> Self {
        self.line = (line > 0).then_some(line);
        self
    }

    /// Override the severity
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Add source context; blank context is dropped
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        let trimmed = context.trim();
        if !trimmed.is_empty() {
            self.context = Some(trimmed.to_string());
        }
        self
    }

    /// Add a suggested fix
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Whether this finding is an error
    pub fn is_blocking(&self) -> bool {
        self.severity.is_blocking()
    }

    /// Format finding for a single display line
    pub fn format_display(&self) -> String {
        let location = self.line.map(|line| format!(":{line}")).unwrap_or_default();

        format!(
            "{}{} [{}] {}",
            self.file_path.display(),
            location,
            self.severity.as_str(),
            self.message
        )
    }

    pub(crate) fn sort_key(&self) -> (&Path, u32, &str, &str) {
        (
            self.file_path.as_path(),
            self.line.unwrap_or(0),
            self.rule_id.as_str(),
            self.message.as_str(),
        )
    }
}

/// Count of findings by severity level
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
}

impl SeverityCounts {
    pub fn total(&self) -> usize {
        self.error + self.warning + self.info
    }

    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.error += 1,
            Severity::Warning => self.warning += 1,
            Severity::Info => self.info += 1,
        }
    }
}

/// Summary statistics for a validation report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// Number of source files (pages and stylesheets) in the snapshot
    pub total_files: usize,
    /// Number of rules that ran
    pub rules_run: usize,
    /// Findings by severity
    pub by_severity: SeverityCounts,
    /// Findings by rule category
    pub by_category: BTreeMap<RuleCategory, usize>,
}

/// Complete validation report for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// All findings, sorted by file, line and rule
    pub findings: Vec<Finding>,
    /// Summary statistics
    pub summary: ValidationSummary,
}

impl ValidationReport {
    /// Create a new empty validation report
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a finding to the report
    pub fn add_finding(&mut self, finding: Finding) {
        self.summary.by_severity.add(finding.severity);
        *self.summary.by_category.entry(finding.category).or_insert(0) += 1;
        self.findings.push(finding);
    }

    /// Whether the run passed: no findings of any severity
    pub fn passed(&self) -> bool {
        self.findings.is_empty()
    }

    /// Whether the report contains error-level findings
    pub fn has_errors(&self) -> bool {
        self.summary.by_severity.error > 0
    }

    /// Findings of a specific severity
    pub fn findings_by_severity(&self, severity: Severity) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.severity == severity)
    }

    /// Findings grouped per file, files in path order
    pub fn by_file(&self) -> BTreeMap<&Path, Vec<&Finding>> {
        let mut grouped: BTreeMap<&Path, Vec<&Finding>> = BTreeMap::new();
        for finding in &self.findings {
            grouped.entry(finding.file_path.as_path()).or_default().push(finding);
        }
        grouped
    }

    /// Findings grouped per rule category
    pub fn by_category(&self) -> BTreeMap<RuleCategory, Vec<&Finding>> {
        let mut grouped: BTreeMap<RuleCategory, Vec<&Finding>> = BTreeMap::new();
        for finding in &self.findings {
            grouped.entry(finding.category).or_default().push(finding);
        }
        grouped
    }

    pub fn set_files_analyzed(&mut self, count: usize) {
        self.summary.total_files = count;
    }

    pub fn set_rules_run(&mut self, count: usize) {
        self.summary.rules_run = count;
    }

    /// Sort findings by file path, line and rule for stable output
    pub fn sort_findings(&mut self) {
        self.findings.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    }
}

/// Error types that can occur during validation
#[derive(Debug, thiserror::Error)]
pub enum GuardianError {
    /// Configuration file could not be loaded or parsed
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// File or directory could not be read
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Glob or regex pattern failed to compile
    #[error("Pattern error: {message}")]
    Pattern { message: String },

    /// Markup or stylesheet could not be parsed
    #[error("Parse error in {file}: {message}")]
    Parse { file: String, message: String },

    /// A rule failed unexpectedly
    #[error("{rule} failed: {message}")]
    RuleExecution { rule: String, message: String },

    /// The external markup validator could not be reached or answered garbage
    #[error("External validator error: {message}")]
    ExternalValidator { message: String },

    /// Validation operation failed
    #[error("Validation error: {message}")]
    Validation { message: String },
}

impl GuardianError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn pattern(message: impl Into<String>) -> Self {
        Self::Pattern {
            message: message.into(),
        }
    }

    pub fn parse(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn rule(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RuleExecution {
            rule: rule.into(),
            message: message.into(),
        }
    }

    pub fn external(message: impl Into<String>) -> Self {
        Self::ExternalValidator {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// A required directory (the working directory itself) is missing
    pub fn missing_directory(path: &Path) -> Self {
        Self::Io {
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("directory not found: {}", path.display()),
            ),
        }
    }
}

/// Result type for Guardian operations
pub type GuardianResult<T> = Result<T, GuardianError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(file: &str, line: u32, rule: &str) -> Finding {
        Finding::new(rule, RuleCategory::Html, file, "message").at_line(line)
    }

    #[test]
    fn test_finding_creation() {
        let finding = Finding::new(
            "html/document",
            RuleCategory::Html,
            "index.html",
            "Missing h1 tag",
        );

        assert_eq!(finding.rule_id, "html/document");
        assert_eq!(finding.severity, Severity::Error);
        assert_eq!(finding.file_path, Path::new("index.html"));
        assert!(finding.line.is_none());
        assert!(finding.is_blocking());
    }

    #[test]
    fn test_finding_builders() {
        let finding = Finding::new("bem/class-naming", RuleCategory::Bem, "about.html", "msg")
            .at_line(12)
            .with_context("   <div class=\"Card\">   ")
            .with_suggestion("Use lowercase")
            .with_severity(Severity::Warning);

        assert_eq!(finding.line, Some(12));
        assert_eq!(finding.context.as_deref(), Some("<div class=\"Card\">"));
        assert_eq!(finding.suggestion.as_deref(), Some("Use lowercase"));
        assert!(!finding.is_blocking());
        assert_eq!(finding.format_display(), "about.html:12 [warning] msg");
    }

    #[test]
    fn test_zero_line_and_blank_context_are_dropped() {
        let finding = Finding::new("r", RuleCategory::Structure, ".", "m")
            .at_line(0)
            .with_context("   ");
        assert!(finding.line.is_none());
        assert!(finding.context.is_none());
    }

    #[test]
    fn test_report_grouping_and_counts() {
        let mut report = ValidationReport::new();
        report.add_finding(finding("b.html", 3, "html/document"));
        report.add_finding(finding("a.html", 7, "html/document"));
        report.add_finding(
            Finding::new("css/units", RuleCategory::Styles, "styles/main.scss", "m")
                .with_severity(Severity::Warning),
        );

        assert!(!report.passed());
        assert!(report.has_errors());
        assert_eq!(report.summary.by_severity.total(), 3);
        assert_eq!(report.summary.by_severity.warning, 1);
        assert_eq!(report.summary.by_category[&RuleCategory::Html], 2);

        let by_file = report.by_file();
        let files: Vec<_> = by_file.keys().map(|p| p.to_string_lossy().to_string()).collect();
        assert_eq!(files, vec!["a.html", "b.html", "styles/main.scss"]);
        assert_eq!(report.by_category()[&RuleCategory::Styles].len(), 1);
    }

    #[test]
    fn test_sort_is_stable_across_insertion_order() {
        let mut first = ValidationReport::new();
        first.add_finding(finding("b.html", 1, "x"));
        first.add_finding(finding("a.html", 9, "y"));
        first.add_finding(finding("a.html", 2, "z"));
        first.sort_findings();

        let mut second = ValidationReport::new();
        second.add_finding(finding("a.html", 2, "z"));
        second.add_finding(finding("b.html", 1, "x"));
        second.add_finding(finding("a.html", 9, "y"));
        second.sort_findings();

        assert_eq!(first, second);
        assert_eq!(first.findings[0].line, Some(2));
    }

    #[test]
    fn test_empty_report_passes() {
        let report = ValidationReport::new();
        assert!(report.passed());
        assert!(!report.has_errors());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
        assert!(Severity::Error.is_blocking());
        assert!(!Severity::Warning.is_blocking());
    }

    #[test]
    fn test_rule_execution_error_message() {
        let error = GuardianError::rule("css/units", "index out of range");
        assert_eq!(error.to_string(), "css/units failed: index out of range");
    }
}
