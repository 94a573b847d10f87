//! Redundant declarations: repeats, overlapping shorthands, restated
//! inherited values and default `display` values

use super::{compounds, parsed_sheets, sheet_context, type_selector};
use crate::domain::findings::{Finding, GuardianResult, RuleCategory, Severity};
use crate::rules::Rule;
use crate::snapshot::{Declaration, FlatRule, ProjectSnapshot, StylesheetSource};
use std::collections::HashMap;

pub const RULE_ID: &str = "css/declarations";

/// Shorthands whose values may be a prefix of each other
const SHORTHAND_PROPERTIES: &[&str] = &[
    "padding",
    "margin",
    "border",
    "background",
    "font",
    "border-radius",
    "transition",
    "animation",
    "flex",
    "grid",
    "outline",
];

/// Properties children inherit from their parents
const INHERITED_PROPERTIES: &[&str] = &[
    "color",
    "cursor",
    "font-family",
    "font-size",
    "font-style",
    "font-weight",
    "letter-spacing",
    "line-height",
    "text-align",
    "text-transform",
    "visibility",
    "white-space",
    "word-spacing",
];

/// Elements that are `display: block` by default; `li` is `list-item`
const BLOCK_ELEMENTS: &[&str] = &[
    "div", "p", "h1", "h2", "h3", "h4", "h5", "h6", "article", "aside", "footer", "header",
    "section", "nav", "main", "form", "ul", "ol", "li",
];

fn default_display(element: &str) -> Option<&'static str> {
    if element == "li" {
        Some("list-item")
    } else if BLOCK_ELEMENTS.contains(&element) {
        Some("block")
    } else {
        None
    }
}

/// One value list is a strict prefix of the other, e.g. `10px` and `10px 20px`
pub fn has_partial_overlap(first: &str, second: &str) -> bool {
    let a: Vec<&str> = first.split_whitespace().collect();
    let b: Vec<&str> = second.split_whitespace().collect();
    if a.len() == 1 && b.len() == 1 {
        return false;
    }
    let (shorter, longer) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    shorter.len() != longer.len() && longer.starts_with(shorter)
}

fn location(sheet: &StylesheetSource, decl: &Declaration) -> String {
    format!("{}: {} ({}:{})", decl.property, decl.value, sheet.path.display(), decl.line)
}

pub struct DeclarationsRule;

impl DeclarationsRule {
    fn check_repeats(&self, sheet: &StylesheetSource, rule: &FlatRule<'_>, findings: &mut Vec<Finding>) {
        if rule.selectors.iter().any(|selector| selector.contains(':')) {
            return;
        }

        let mut previous: HashMap<String, &Declaration> = HashMap::new();
        for decl in rule.declarations() {
            let property = decl.property_lower();
            if let Some(prev) = previous.get(&property) {
                let identical = prev.value == decl.value;
                let overlapping = !identical
                    && SHORTHAND_PROPERTIES.contains(&property.as_str())
                    && has_partial_overlap(&prev.value, &decl.value);

                if identical || overlapping {
                    let (message, severity, suggestion) = if identical {
                        (
                            format!("Duplicate property \"{property}\" with identical values"),
                            Severity::Error,
                            "Remove duplicate property",
                        )
                    } else {
                        (
                            format!("Property \"{property}\" has overlapping values"),
                            Severity::Warning,
                            "Use individual properties instead of shorthand with partial overlap",
                        )
                    };
                    findings.push(
                        self.finding(&sheet.path, message)
                            .with_severity(severity)
                            .at_line(decl.line)
                            .with_context(format!(
                                "Previous: {}\nCurrent: {}",
                                location(sheet, prev),
                                location(sheet, decl)
                            ))
                            .with_suggestion(suggestion),
                    );
                }
            }
            previous.insert(property, decl);
        }
    }

    fn check_inherited(
        &self,
        sheet: &StylesheetSource,
        rule: &FlatRule<'_>,
        rules: &[FlatRule<'_>],
        findings: &mut Vec<Finding>,
    ) {
        for decl in rule.declarations() {
            let property = decl.property_lower();
            if !INHERITED_PROPERTIES.contains(&property.as_str()) {
                continue;
            }

            let parent = rule.selectors.iter().find_map(|selector| {
                if selector.contains(':') || selector.contains(" + ") || selector.contains(" ~ ") {
                    return None;
                }
                let chain = compounds(selector);
                rules
                    .iter()
                    .filter(|candidate| candidate.context == rule.context)
                    .find_map(|candidate| {
                        let ancestor = candidate.selectors.iter().find(|ancestor| {
                            let prefix = compounds(ancestor);
                            !ancestor.contains(':')
                                && prefix.len() < chain.len()
                                && chain.starts_with(&prefix)
                        })?;
                        candidate
                            .declarations()
                            .any(|other| other.property_lower() == property && other.value == decl.value)
                            .then_some(ancestor)
                    })
            });

            if let Some(ancestor) = parent {
                findings.push(
                    self.finding(
                        &sheet.path,
                        format!("Property \"{property}\" restates the value inherited from {ancestor}"),
                    )
                    .with_severity(Severity::Warning)
                    .at_line(decl.line)
                    .with_context(sheet_context(sheet, decl.line))
                    .with_suggestion("Remove the declaration; the value is inherited"),
                );
            }
        }
    }

    fn check_display(&self, sheet: &StylesheetSource, rule: &FlatRule<'_>, findings: &mut Vec<Finding>) {
        if !rule.context.is_empty() {
            return;
        }
        let element = rule.selectors.iter().find_map(|selector| {
            let subject = compounds(selector).pop()?;
            if subject.contains(':') {
                return None;
            }
            let element = type_selector(&subject)?.to_ascii_lowercase();
            default_display(&element).map(|display| (element, display))
        });
        let Some((element, display)) = element else {
            return;
        };

        for decl in rule.declarations() {
            if decl.property_lower() == "display" && decl.value.trim().eq_ignore_ascii_case(display) {
                findings.push(
                    self.finding(&sheet.path, format!("Unnecessary display property override on {element}"))
                        .with_severity(Severity::Warning)
                        .at_line(decl.line)
                        .with_context(location(sheet, decl))
                        .with_suggestion(format!(
                            "Remove redundant display property, {element} is {display} by default"
                        )),
                );
            }
        }
    }
}

impl Rule for DeclarationsRule {
    fn id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "No repeated, overlapping, inherited or default-valued declarations"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Styles
    }

    fn check(&self, snapshot: &ProjectSnapshot) -> GuardianResult<Vec<Finding>> {
        let mut findings = Vec::new();

        for (sheet, parsed) in parsed_sheets(snapshot) {
            let rules = parsed.rules();
            for rule in &rules {
                self.check_repeats(sheet, rule, &mut findings);
                self.check_inherited(sheet, rule, &rules, &mut findings);
                self.check_display(sheet, rule, &mut findings);
            }
        }

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathsConfig;

    fn check(source: &str) -> Vec<Finding> {
        let mut snapshot = ProjectSnapshot::empty(PathsConfig::default());
        snapshot.add_stylesheet("styles/main.scss", source);
        DeclarationsRule.check(&snapshot).unwrap()
    }

    fn messages(findings: &[Finding]) -> Vec<&str> {
        findings.iter().map(|f| f.message.as_str()).collect()
    }

    #[test]
    fn test_partial_overlap() {
        assert!(has_partial_overlap("10px", "10px 20px"));
        assert!(has_partial_overlap("0 auto 1px", "0 auto"));
        assert!(!has_partial_overlap("10px", "20px"));
        assert!(!has_partial_overlap("10px 20px", "20px 10px"));
        assert!(!has_partial_overlap("1px 2px", "1px 2px"));
    }

    #[test]
    fn test_repeated_declarations() {
        let findings = check(
            r#".card {
  color: #000;
  padding: 10px;
  color: #000;
  padding: 10px 20px;
  width: 10px;
  width: 20px;
}
.card:hover {
  color: #000;
  color: #000;
}"#,
        );

        assert_eq!(
            messages(&findings),
            vec![
                "Duplicate property \"color\" with identical values",
                "Property \"padding\" has overlapping values",
            ]
        );
        assert_eq!(findings[0].line, Some(4));
        assert_eq!(
            findings[0].context.as_deref(),
            Some("Previous: color: #000 (styles/main.scss:2)\nCurrent: color: #000 (styles/main.scss:4)")
        );
        assert_eq!(findings[1].severity, Severity::Warning);
    }

    #[test]
    fn test_inherited_restatement() {
        let findings = check(
            r#".menu {
  color: #333;
  font-size: 16px;
}
.menu .menu__link {
  color: #333;
  font-size: 14px;
  margin: 0;
}
.footer .menu__link { color: #333; }"#,
        );

        assert_eq!(
            messages(&findings),
            vec!["Property \"color\" restates the value inherited from .menu"]
        );
        assert_eq!(findings[0].line, Some(6));
    }

    #[test]
    fn test_nested_children_are_resolved() {
        let findings = check(".nav {\n  color: #fff;\n  a { color: #fff; }\n}");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, Some(3));
    }

    #[test]
    fn test_redundant_display() {
        let findings = check(
            r#"div.card { display: block; }
li { display: list-item; }
li.menu__item { display: block; }
span { display: block; }
@media (max-width: 600px) {
  section { display: block; }
}"#,
        );

        assert_eq!(
            messages(&findings),
            vec![
                "Unnecessary display property override on div",
                "Unnecessary display property override on li",
            ]
        );
        assert_eq!(
            findings[1].suggestion.as_deref(),
            Some("Remove redundant display property, li is list-item by default")
        );
    }
}
