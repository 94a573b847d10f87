//! Paragraphs take their typography from context, not from their own class

use super::styles::{mentions_class, parsed_sheets};
use super::Rule;
use crate::domain::findings::{Finding, GuardianResult, RuleCategory, Severity};
use crate::snapshot::{Declaration, ProjectSnapshot, StylesheetSource};

pub const RULE_ID: &str = "html/paragraph-typography";

fn is_typography_property(property: &str) -> bool {
    property.contains("font")
        || matches!(property, "line-height" | "letter-spacing" | "text-align")
}

pub struct ParagraphTypographyRule;

impl Rule for ParagraphTypographyRule {
    fn id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "Classes on <p> elements do not set font, line-height, letter-spacing or text-align"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Styles
    }

    fn check(&self, snapshot: &ProjectSnapshot) -> GuardianResult<Vec<Finding>> {
        // every typography declaration, with the selectors that carry it
        let mut styled: Vec<(&StylesheetSource, &Declaration, Vec<String>)> = Vec::new();
        for (sheet, parsed) in parsed_sheets(snapshot) {
            for rule in parsed.rules() {
                for decl in rule.declarations() {
                    if is_typography_property(&decl.property_lower()) {
                        styled.push((sheet, decl, rule.selectors.clone()));
                    }
                }
            }
        }
        if styled.is_empty() {
            return Ok(Vec::new());
        }

        let mut findings = Vec::new();
        for page in &snapshot.pages {
            for paragraph in page.elements_by_tag("p") {
                for class in paragraph.classes() {
                    for (sheet, decl, selectors) in &styled {
                        if !selectors.iter().any(|selector| mentions_class(selector, class)) {
                            continue;
                        }
                        findings.push(
                            self.finding(
                                &page.path,
                                format!("Paragraph element should not have direct font styling. Class: {class}"),
                            )
                            .with_severity(Severity::Warning)
                            .at_line(paragraph.line)
                            .with_context(format!(
                                "{}: {} - defined in {}:{}",
                                decl.property,
                                decl.value,
                                sheet.path.display(),
                                decl.line
                            ))
                            .with_suggestion("Move font styles to a parent element or create a typography class"),
                        );
                    }
                }
            }
        }

        Ok(findings)
    }
}
