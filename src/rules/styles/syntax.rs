//! Parse failures and the built-in lint pass over stylesheets

use super::sheet_context;
use crate::domain::findings::{Finding, GuardianResult, RuleCategory, Severity};
use crate::rules::Rule;
use crate::snapshot::{ProjectSnapshot, Stylesheet, StylesheetSource};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

pub const RULE_ID: &str = "css/syntax";

lazy_static! {
    static ref VENDOR_PREFIX: Regex =
        Regex::new(r"(?:^|[\s,(])(-(?:webkit|moz|ms|o)-[a-zA-Z-]+)").expect("valid vendor regex");
    static ref HEX_COLOR: Regex = Regex::new(r"#([0-9a-zA-Z]+)").expect("valid hex regex");
    static ref URL_CALL: Regex = Regex::new(r"(?i)url\([^)]*\)").expect("valid url regex");
    static ref ID_SELECTOR: Regex = Regex::new(r"#[a-zA-Z_-][a-zA-Z0-9_-]*").expect("valid id regex");
    static ref BRACKETED: Regex = Regex::new(r"\[[^\]]*\]|#\{[^}]*\}").expect("valid bracket regex");
}

/// Whether `#` is followed by a valid 3, 4, 6 or 8 digit hex color
pub fn is_valid_hex(digits: &str) -> bool {
    matches!(digits.len(), 3 | 4 | 6 | 8) && digits.chars().all(|c| c.is_ascii_hexdigit())
}

/// Reports stylesheets that do not parse, then lints the ones that do
pub struct SyntaxRule;

impl SyntaxRule {
    fn lint(&self, sheet: &StylesheetSource, parsed: &Stylesheet, findings: &mut Vec<Finding>) {
        let report = |line: u32, message: String, severity: Severity| {
            self.finding(&sheet.path, message)
                .with_severity(severity)
                .at_line(line)
                .with_context(sheet_context(sheet, line))
        };

        for decl in parsed.declarations() {
            let property = decl.property_lower();
            if let Some(caps) = VENDOR_PREFIX.captures(&property) {
                findings.push(
                    report(
                        decl.line,
                        format!("Vendor prefix should be left to autoprefixer: {}", &caps[1]),
                        Severity::Warning,
                    )
                    .with_suggestion("Write the standard property; prefixes are added at build time"),
                );
            }
            for caps in VENDOR_PREFIX.captures_iter(&decl.value) {
                findings.push(report(
                    decl.line,
                    format!("Vendor prefix should be left to autoprefixer: {}", &caps[1]),
                    Severity::Warning,
                ));
            }

            if decl.important {
                findings.push(
                    report(decl.line, format!("Avoid !important on {}", decl.property), Severity::Warning)
                        .with_suggestion("Raise specificity with a modifier class instead"),
                );
            }

            let without_urls = URL_CALL.replace_all(&decl.value, "");
            for caps in HEX_COLOR.captures_iter(&without_urls) {
                if !is_valid_hex(&caps[1]) {
                    findings.push(report(
                        decl.line,
                        format!("Invalid hex color \"#{}\"", &caps[1]),
                        Severity::Error,
                    ));
                }
            }
        }

        let mut seen: HashMap<(String, String), u32> = HashMap::new();
        for rule in parsed.rules() {
            let selector = rule.display_selector();

            if rule.is_empty() {
                findings.push(
                    report(rule.line(), format!("Empty rule block: {selector}"), Severity::Warning)
                        .with_suggestion("Remove the empty rule"),
                );
            }

            let plain = BRACKETED.replace_all(&rule.rule.selector, "");
            if ID_SELECTOR.is_match(&plain) {
                findings.push(
                    report(
                        rule.line(),
                        format!("ID selector should be replaced with a class: {selector}"),
                        Severity::Warning,
                    ),
                );
            }

            match seen.get(&(rule.context.clone(), selector.clone())) {
                Some(first) => findings.push(report(
                    rule.line(),
                    format!("Duplicate selector {selector} (first defined on line {first})"),
                    Severity::Warning,
                )),
                None => {
                    seen.insert((rule.context.clone(), selector), rule.line());
                }
            }
        }
    }
}

impl Rule for SyntaxRule {
    fn id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "Stylesheets parse and avoid vendor prefixes, !important, empty blocks, bad hex colors, ID and duplicate selectors"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Styles
    }

    fn check(&self, snapshot: &ProjectSnapshot) -> GuardianResult<Vec<Finding>> {
        let mut findings = Vec::new();

        for sheet in snapshot.authored_stylesheets() {
            match &sheet.parsed {
                Err(e) => findings.push(
                    self.finding(&sheet.path, format!("Stylesheet could not be parsed: {}", e.message))
                        .at_line(e.line)
                        .with_context(sheet_context(sheet, e.line)),
                ),
                Ok(parsed) => self.lint(sheet, parsed, &mut findings),
            }
        }

        Ok(findings)
    }
}
