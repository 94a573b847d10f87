//! Commented-out code left in stylesheets

use super::{parsed_sheets, sheet_context};
use crate::domain::findings::{Finding, GuardianResult, RuleCategory, Severity};
use crate::rules::Rule;
use crate::snapshot::ProjectSnapshot;
use lazy_static::lazy_static;
use regex::Regex;

pub const RULE_ID: &str = "css/commented-code";

lazy_static! {
    static ref DECLARATION_LIKE: Regex =
        Regex::new(r"(?m)^\s*[a-z-]+\s*:\s*[^;]+;").expect("valid declaration regex");
    static ref RULE_LIKE: Regex =
        Regex::new(r"(?m)^\s*[.#&@a-z][^{}]*\{").expect("valid rule regex");
}

/// Whether comment text reads like CSS rather than prose
pub fn looks_like_code(text: &str) -> bool {
    DECLARATION_LIKE.is_match(text) || RULE_LIKE.is_match(text)
}

pub struct CommentedCodeRule;

impl Rule for CommentedCodeRule {
    fn id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "Commented-out declarations and rules are removed instead of kept"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Styles
    }

    fn check(&self, snapshot: &ProjectSnapshot) -> GuardianResult<Vec<Finding>> {
        let mut findings = Vec::new();

        for (sheet, parsed) in parsed_sheets(snapshot) {
            for comment in parsed.comments() {
                if looks_like_code(&comment.text) {
                    findings.push(
                        self.finding(&sheet.path, "Commented-out code should be removed")
                            .with_severity(Severity::Warning)
                            .at_line(comment.line)
                            .with_context(sheet_context(sheet, comment.line))
                            .with_suggestion("Delete unused styles; version control keeps the history"),
                    );
                }
            }
        }

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathsConfig;

    #[test]
    fn test_looks_like_code() {
        assert!(looks_like_code(" color: red; "));
        assert!(looks_like_code(".card {\n  margin: 0;\n}"));
        assert!(!looks_like_code(" Header block "));
        assert!(!looks_like_code(" TODO: tidy up the grid, then ship "));
    }

    #[test]
    fn test_commented_code_findings() {
        let mut snapshot = ProjectSnapshot::empty(PathsConfig::default());
        snapshot.add_stylesheet(
            "styles/main.scss",
            "/* Layout */\n.card {\n  // margin: 0 auto;\n  padding: 0;\n}\n/*\n.old { color: red; }\n*/",
        );

        let findings = CommentedCodeRule.check(&snapshot).unwrap();
        let lines: Vec<_> = findings.iter().map(|f| f.line).collect();
        assert_eq!(lines, vec![Some(3), Some(6)]);
    }
}
