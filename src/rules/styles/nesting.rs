//! Selector nesting depth

use super::{class_names, compounds, has_state_pseudo, parsed_sheets, sheet_context};
use crate::domain::findings::{Finding, GuardianResult, RuleCategory};
use crate::rules::Rule;
use crate::snapshot::ProjectSnapshot;

pub const RULE_ID: &str = "css/nesting-depth";

/// Depth of a resolved selector: descendant steps plus the deepest BEM
/// element chain within one class
pub fn selector_depth(selector: &str) -> usize {
    let steps = compounds(selector).len().saturating_sub(1);
    let element_chain = class_names(selector)
        .iter()
        .map(|class| class.matches("__").count())
        .max()
        .unwrap_or(0);
    steps + element_chain
}

pub struct NestingDepthRule {
    max_depth: usize,
}

impl NestingDepthRule {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }
}

impl Rule for NestingDepthRule {
    fn id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "Selectors stay shallow; state selectors are exempt"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Styles
    }

    fn check(&self, snapshot: &ProjectSnapshot) -> GuardianResult<Vec<Finding>> {
        let mut findings = Vec::new();

        for (sheet, parsed) in parsed_sheets(snapshot) {
            for rule in parsed.rules() {
                let deepest = rule
                    .selectors
                    .iter()
                    .filter(|selector| !has_state_pseudo(selector) && !selector.contains('['))
                    .map(|selector| (selector_depth(selector), selector))
                    .filter(|(depth, _)| *depth > self.max_depth)
                    .max_by_key(|(depth, _)| *depth);

                if let Some((depth, selector)) = deepest {
                    findings.push(
                        self.finding(
                            &sheet.path,
                            format!(
                                "Selector nesting depth {depth} exceeds {}: {selector}",
                                self.max_depth
                            ),
                        )
                        .at_line(rule.line())
                        .with_context(sheet_context(sheet, rule.line()))
                        .with_suggestion("Target the element with its own BEM class"),
                    );
                }
            }
        }

        Ok(findings)
    }
}
