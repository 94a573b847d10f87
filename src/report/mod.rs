//! Report generation with multiple output formats
//!
//! Architecture: Anti-Corruption Layer - Formatters translate domain objects to external formats
//! - ValidationReport (domain) is converted to various external representations
//! - Each formatter encapsulates the rules for its specific output format
//! - Filtering happens in the analyzer; formatters only present what they are given

use crate::domain::findings::{Finding, GuardianError, GuardianResult, Severity, ValidationReport};
use colored::{ColoredString, Colorize};
use serde_json::Value as JsonValue;

/// Supported output formats for validation reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Per-file text blocks with colors and context
    Human,
    /// JSON format for programmatic consumption
    Json,
    /// JUnit XML format for CI/CD integration
    Junit,
    /// SARIF format for code scanning tools
    Sarif,
    /// GitHub Actions workflow commands
    GitHub,
}

impl OutputFormat {
    /// Parse format from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "human" => Some(Self::Human),
            "json" => Some(Self::Json),
            "junit" => Some(Self::Junit),
            "sarif" => Some(Self::Sarif),
            "github" => Some(Self::GitHub),
            _ => None,
        }
    }

    /// Get all available format names
    pub fn all_formats() -> &'static [&'static str] {
        &["human", "json", "junit", "sarif", "github"]
    }
}

/// Options for customizing report output
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Whether to use colored output (for human format)
    pub use_colors: bool,
    /// Whether to show the source snippet of each finding
    pub show_context: bool,
    /// Whether to show suggested fixes
    pub show_suggestions: bool,
    /// Configuration fingerprint embedded in JSON and SARIF output
    pub config_fingerprint: Option<String>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            use_colors: true,
            show_context: true,
            show_suggestions: true,
            config_fingerprint: None,
        }
    }
}

/// Main report formatter that dispatches to specific formatters
#[derive(Debug, Clone, Default)]
pub struct ReportFormatter {
    options: ReportOptions,
}

impl ReportFormatter {
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    /// Format a validation report in the specified format
    pub fn format_report(&self, report: &ValidationReport, format: OutputFormat) -> GuardianResult<String> {
        match format {
            OutputFormat::Human => Ok(self.format_human(report)),
            OutputFormat::Json => self.format_json(report),
            OutputFormat::Junit => Ok(self.format_junit(report)),
            OutputFormat::Sarif => self.format_sarif(report),
            OutputFormat::GitHub => Ok(self.format_github(report)),
        }
    }

    fn paint(&self, text: &str, style: fn(&str) -> ColoredString) -> String {
        if self.options.use_colors {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn format_human(&self, report: &ValidationReport) -> String {
        let mut output = String::new();

        if report.findings.is_empty() {
            output.push_str(&self.paint("✅ All checks passed", |s| s.green().bold()));
            output.push('\n');
            output.push_str(&self.format_summary(report));
            return output;
        }

        for (file, findings) in report.by_file() {
            output.push_str(&self.paint(&format!("📁 {}", file.display()), |s| s.bold()));
            output.push('\n');

            for (index, finding) in findings.iter().enumerate() {
                let location = match finding.line {
                    Some(line) => format!("{}:{}", file.display(), line),
                    None => file.display().to_string(),
                };
                let marker = match finding.severity {
                    Severity::Error => self.paint("error", |s| s.red().bold()),
                    Severity::Warning => self.paint("warning", |s| s.yellow().bold()),
                    Severity::Info => self.paint("info", |s| s.cyan()),
                };

                output.push_str(&format!(
                    "   #{} {} {} {}\n",
                    index + 1,
                    marker,
                    location,
                    self.paint(&format!("[{}]", finding.rule_id), |s| s.dimmed())
                ));
                output.push_str(&format!("      • {}\n", finding.message));

                if self.options.show_context {
                    if let Some(context) = &finding.context {
                        let mut lines = context.lines();
                        if let Some(first) = lines.next() {
                            output.push_str(&self.paint(&format!("      • Context: {first}"), |s| s.dimmed()));
                            output.push('\n');
                        }
                        for line in lines {
                            output.push_str(&self.paint(&format!("        {line}"), |s| s.dimmed()));
                            output.push('\n');
                        }
                    }
                }

                if self.options.show_suggestions {
                    if let Some(suggestion) = &finding.suggestion {
                        output.push_str(&self.paint(&format!("      💡 {suggestion}"), |s| s.green()));
                        output.push('\n');
                    }
                }
            }
            output.push('\n');
        }

        output.push_str(&self.format_summary(report));
        output
    }

    fn format_summary(&self, report: &ValidationReport) -> String {
        let counts = &report.summary.by_severity;
        let files = report.summary.total_files;

        if counts.total() == 0 {
            return format!("📊 Summary: 0 findings in {files} files\n");
        }

        let mut parts = Vec::new();
        if counts.error > 0 {
            let text = format!("{} error{}", counts.error, plural(counts.error));
            parts.push(self.paint(&text, |s| s.red()));
        }
        if counts.warning > 0 {
            let text = format!("{} warning{}", counts.warning, plural(counts.warning));
            parts.push(self.paint(&text, |s| s.yellow()));
        }
        if counts.info > 0 {
            parts.push(self.paint(&format!("{} info", counts.info), |s| s.cyan()));
        }

        let by_category: Vec<String> = report
            .summary
            .by_category
            .iter()
            .map(|(category, count)| format!("{category}: {count}"))
            .collect();

        format!(
            "📊 Summary: {} in {} files ({})\n",
            parts.join(", "),
            files,
            by_category.join(", ")
        )
    }

    fn format_json(&self, report: &ValidationReport) -> GuardianResult<String> {
        let findings: Vec<JsonValue> = report
            .findings
            .iter()
            .map(|f| {
                serde_json::json!({
                    "rule_id": f.rule_id,
                    "category": f.category.as_str(),
                    "severity": f.severity.as_str(),
                    "file_path": f.file_path.display().to_string(),
                    "line": f.line,
                    "message": f.message,
                    "context": f.context,
                    "suggestion": f.suggestion,
                })
            })
            .collect();

        let by_category: serde_json::Map<String, JsonValue> = report
            .summary
            .by_category
            .iter()
            .map(|(category, count)| (category.as_str().to_string(), JsonValue::from(*count)))
            .collect();

        let json_report = serde_json::json!({
            "passed": report.passed(),
            "findings": findings,
            "summary": {
                "total_files": report.summary.total_files,
                "rules_run": report.summary.rules_run,
                "by_severity": {
                    "error": report.summary.by_severity.error,
                    "warning": report.summary.by_severity.warning,
                    "info": report.summary.by_severity.info,
                },
                "by_category": by_category,
            },
            "config_fingerprint": self.options.config_fingerprint,
            "generated_at": chrono::Utc::now().to_rfc3339(),
        });

        serde_json::to_string_pretty(&json_report)
            .map_err(|e| GuardianError::validation(format!("JSON serialization failed: {e}")))
    }

    fn format_junit(&self, report: &ValidationReport) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");

        let failures = report.findings_by_severity(Severity::Error).count();
        xml.push_str(&format!(
            "<testsuite name=\"frontend-guardian\" tests=\"{}\" failures=\"{}\" errors=\"0\">\n",
            report.findings.len(),
            failures
        ));

        for finding in &report.findings {
            xml.push_str(&format!(
                "  <testcase classname=\"{}\" name=\"{}\">\n",
                escape_xml(&finding.rule_id),
                escape_xml(&location(finding))
            ));

            let tag = if finding.severity == Severity::Error { "failure" } else { "system-out" };
            if tag == "failure" {
                xml.push_str(&format!("    <failure message=\"{}\">\n", escape_xml(&finding.message)));
            } else {
                xml.push_str("    <system-out>\n");
                xml.push_str(&format!("      {}\n", escape_xml(&finding.message)));
            }
            if let Some(context) = &finding.context {
                xml.push_str(&format!("      Context: {}\n", escape_xml(context)));
            }
            xml.push_str(&format!("    </{tag}>\n"));
            xml.push_str("  </testcase>\n");
        }

        xml.push_str("</testsuite>\n");
        xml
    }

    fn format_sarif(&self, report: &ValidationReport) -> GuardianResult<String> {
        let results: Vec<JsonValue> = report
            .findings
            .iter()
            .map(|f| {
                let level = match f.severity {
                    Severity::Error => "error",
                    Severity::Warning => "warning",
                    Severity::Info => "note",
                };

                serde_json::json!({
                    "ruleId": f.rule_id,
                    "level": level,
                    "message": { "text": f.message },
                    "locations": [{
                        "physicalLocation": {
                            "artifactLocation": { "uri": f.file_path.display().to_string() },
                            "region": {
                                "startLine": f.line.unwrap_or(1),
                                "snippet": f.context.as_ref().map(|c| serde_json::json!({ "text": c })),
                            }
                        }
                    }]
                })
            })
            .collect();

        let sarif_report = serde_json::json!({
            "version": "2.1.0",
            "$schema": "https://json.schemastore.org/sarif-2.1.0.json",
            "runs": [{
                "tool": {
                    "driver": {
                        "name": "frontend-guardian",
                        "version": env!("CARGO_PKG_VERSION"),
                    }
                },
                "properties": {
                    "configFingerprint": self.options.config_fingerprint,
                },
                "results": results
            }]
        });

        serde_json::to_string_pretty(&sarif_report)
            .map_err(|e| GuardianError::validation(format!("SARIF serialization failed: {e}")))
    }

    fn format_github(&self, report: &ValidationReport) -> String {
        let mut output = String::new();

        for finding in &report.findings {
            let level = match finding.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Info => "notice",
            };
            let line = finding.line.map(|line| format!(",line={line}")).unwrap_or_default();

            output.push_str(&format!(
                "::{} file={}{},title={}::{}\n",
                level,
                finding.file_path.display(),
                line,
                finding.rule_id,
                escape_workflow(&finding.message)
            ));
        }

        output
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

fn location(finding: &Finding) -> String {
    match finding.line {
        Some(line) => format!("{}:{}", finding.file_path.display(), line),
        None => finding.file_path.display().to_string(),
    }
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Workflow commands end at the first newline unless it is percent-encoded
fn escape_workflow(s: &str) -> String {
    s.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
}
