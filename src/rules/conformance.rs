//! External markup conformance through the Nu HTML Checker
//!
//! Architecture: Anti-Corruption Layer - the checker's JSON vocabulary stays in this module
//! - `MarkupValidator` is the seam; the rule never talks HTTP directly
//! - Checker messages become findings with a source line, recovered heuristically when absent
//! - A failed call is a finding on the page, never a failed run

use super::{line_context, Rule};
use crate::config::ConformanceConfig;
use crate::domain::findings::{Finding, GuardianError, GuardianResult, RuleCategory, Severity};
use crate::snapshot::{Element, HtmlDocument, ProjectSnapshot};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

pub const RULE_ID: &str = "markup/conformance";

/// One message reported by a markup validator
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub sub_type: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub first_line: Option<u32>,
    #[serde(default)]
    pub last_line: Option<u32>,
    #[serde(default)]
    pub extract: Option<String>,
}

impl ValidatorMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: "error".to_string(),
            sub_type: None,
            message: message.into(),
            first_line: None,
            last_line: None,
            extract: None,
        }
    }

    pub fn at_line(mut self, line: u32) -> Self {
        self.last_line = Some(line);
        self
    }

    /// Severity of the finding this message turns into; plain informational
    /// notes are not reported
    fn severity(&self) -> Option<Severity> {
        match (self.kind.as_str(), self.sub_type.as_deref()) {
            ("error" | "non-document-error", _) => Some(Severity::Error),
            ("info", Some("warning")) => Some(Severity::Warning),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NuResponse {
    #[serde(default)]
    messages: Vec<ValidatorMessage>,
}

/// Anything that can check a whole HTML document
pub trait MarkupValidator: Send + Sync {
    fn validate(&self, source: &str) -> GuardianResult<Vec<ValidatorMessage>>;
}

/// Client for the Nu HTML Checker JSON API
pub struct NuHtmlValidator {
    endpoint: String,
    timeout: Duration,
    client: OnceLock<reqwest::blocking::Client>,
}

impl NuHtmlValidator {
    pub fn new(config: &ConformanceConfig) -> GuardianResult<Self> {
        reqwest::Url::parse(&config.endpoint).map_err(|e| {
            GuardianError::config(format!("Invalid conformance endpoint '{}': {}", config.endpoint, e))
        })?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            client: OnceLock::new(),
        })
    }

    // Built on first use so that constructing the rule stays cheap and
    // happens outside of any async context.
    fn client(&self) -> GuardianResult<&reqwest::blocking::Client> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("frontend-guardian/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GuardianError::external(e.to_string()))?;
        Ok(self.client.get_or_init(|| client))
    }
}

impl MarkupValidator for NuHtmlValidator {
    fn validate(&self, source: &str) -> GuardianResult<Vec<ValidatorMessage>> {
        debug!("Sending {} bytes to {}", source.len(), self.endpoint);

        let response = self
            .client()?
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/html; charset=utf-8")
            .body(source.to_string())
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|e| GuardianError::external(e.to_string()))?;

        let parsed: NuResponse = response
            .json()
            .map_err(|e| GuardianError::external(format!("unexpected response: {e}")))?;
        Ok(parsed.messages)
    }
}

lazy_static! {
    static ref QUOTED: Regex = Regex::new(r#"[“"]([^”"]+)[”"]"#).expect("valid quoted-name regex");
}

/// Names quoted in a checker message, in order
fn quoted_names(message: &str) -> Vec<&str> {
    QUOTED
        .captures_iter(message)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// Best-effort source line for a message that carries none
fn locate(page: &HtmlDocument, message: &str) -> Option<u32> {
    let lower = message.to_lowercase();
    let names = quoted_names(message);

    if lower.contains("duplicate id") {
        let id = names.first()?;
        return page
            .root
            .descendants_and_self()
            .filter(|el| el.attr("id") == Some(*id))
            .nth(1)
            .map(|el| el.line);
    }

    if lower.contains("not allowed as child of element") {
        let (child, parent) = (names.first()?, names.get(1)?);
        let mut found: Option<&Element> = None;
        page.root.walk_with_ancestors(&mut |el, ancestors| {
            if found.is_none()
                && el.tag.eq_ignore_ascii_case(child)
                && ancestors.last().is_some_and(|p| p.tag.eq_ignore_ascii_case(parent))
            {
                found = Some(el);
            }
        });
        return found.map(|el| el.line);
    }

    if lower.contains("action") && lower.contains("form") {
        return page.elements_by_tag("form").next().map(|el| el.line);
    }

    None
}

/// Runs every page through an external markup validator
pub struct ConformanceRule {
    validator: Box<dyn MarkupValidator>,
}

impl ConformanceRule {
    pub fn new(validator: Box<dyn MarkupValidator>) -> Self {
        Self { validator }
    }

    fn check_page(&self, page: &HtmlDocument, findings: &mut Vec<Finding>) {
        let messages = match self.validator.validate(&page.source) {
            Ok(messages) => messages,
            Err(e) => {
                warn!("Markup validation of {} failed: {}", page.path.display(), e);
                let reason = match e {
                    GuardianError::ExternalValidator { message } => message,
                    other => other.to_string(),
                };
                findings.push(
                    self.finding(&page.path, format!("W3C validation failed: {reason}"))
                        .at_line(1)
                        .with_suggestion("Check network access to the validator or disable conformance checks"),
                );
                return;
            }
        };

        for message in messages {
            let Some(severity) = message.severity() else {
                continue;
            };
            let line = message
                .last_line
                .or(message.first_line)
                .or_else(|| locate(page, &message.message))
                .unwrap_or(1);

            let mut finding = self
                .finding(&page.path, message.message.trim())
                .with_severity(severity)
                .at_line(line);
            let context = line_context(page, line);
            if !context.is_empty() {
                finding = finding.with_context(context);
            }
            findings.push(finding);
        }
    }
}

impl Rule for ConformanceRule {
    fn id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "Pages pass the W3C Nu HTML Checker"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Conformance
    }

    fn check(&self, snapshot: &ProjectSnapshot) -> GuardianResult<Vec<Finding>> {
        let mut findings = Vec::new();
        for page in &snapshot.pages {
            self.check_page(page, &mut findings);
        }
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathsConfig;

    struct StubValidator {
        messages: Vec<ValidatorMessage>,
    }

    impl MarkupValidator for StubValidator {
        fn validate(&self, _source: &str) -> GuardianResult<Vec<ValidatorMessage>> {
            Ok(self.messages.clone())
        }
    }

    struct FailingValidator;

    impl MarkupValidator for FailingValidator {
        fn validate(&self, _source: &str) -> GuardianResult<Vec<ValidatorMessage>> {
            Err(GuardianError::external("connection refused"))
        }
    }

    const PAGE: &str = "<!DOCTYPE html>\n<html lang=\"en\">\n<body>\n<form>\n<ul>\n<div id=\"x\"></div>\n</ul>\n<p id=\"x\"></p>\n</form>\n</body>\n</html>";

    fn check(validator: impl MarkupValidator + 'static) -> Vec<Finding> {
        let mut snapshot = ProjectSnapshot::empty(PathsConfig::default());
        snapshot.add_page("index.html", PAGE);
        ConformanceRule::new(Box::new(validator)).check(&snapshot).unwrap()
    }

    #[test]
    fn test_parses_nu_response() {
        let json = r#"{"messages":[
            {"type":"error","lastLine":4,"firstColumn":1,"message":"Stray end tag “div”.","extract":"</div>"},
            {"type":"info","subType":"warning","firstLine":2,"message":"Consider adding a lang attribute."},
            {"type":"info","message":"Trailing slash on void elements has no effect."}
        ]}"#;
        let parsed: NuResponse = serde_json::from_str(json).unwrap();

        assert_eq!(parsed.messages.len(), 3);
        assert_eq!(parsed.messages[0].last_line, Some(4));
        assert_eq!(parsed.messages[1].sub_type.as_deref(), Some("warning"));
        assert_eq!(parsed.messages[1].severity(), Some(Severity::Warning));
        assert_eq!(parsed.messages[2].severity(), None);
    }

    #[test]
    fn test_messages_become_findings() {
        let findings = check(StubValidator {
            messages: vec![
                ValidatorMessage::error("Stray end tag “div”.").at_line(7),
                ValidatorMessage {
                    kind: "info".to_string(),
                    sub_type: None,
                    message: "Just so you know".to_string(),
                    first_line: None,
                    last_line: None,
                    extract: None,
                },
            ],
        });

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, RULE_ID);
        assert_eq!(findings[0].line, Some(7));
        assert_eq!(findings[0].context.as_deref(), Some("</ul>"));
    }

    #[test]
    fn test_lines_are_recovered_from_message_shapes() {
        let findings = check(StubValidator {
            messages: vec![
                ValidatorMessage::error("Duplicate ID “x”."),
                ValidatorMessage::error("Element “div” not allowed as child of element “ul” in this context."),
                ValidatorMessage::error("Element “form” is missing required attribute “action”."),
                ValidatorMessage::error("Something without a location."),
            ],
        });
        let lines: Vec<_> = findings.iter().map(|f| f.line).collect();

        assert_eq!(lines, vec![Some(8), Some(6), Some(4), Some(1)]);
    }

    #[test]
    fn test_validator_failure_is_a_finding() {
        let findings = check(FailingValidator);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message, "W3C validation failed: connection refused");
        assert_eq!(findings[0].line, Some(1));
        assert_eq!(findings[0].severity, Severity::Error);
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let config = ConformanceConfig {
            enabled: true,
            endpoint: "not a url".to_string(),
            timeout_secs: 5,
        };
        assert!(NuHtmlValidator::new(&config).is_err());
    }
}
