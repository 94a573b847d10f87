//! Hover, focus and active states of interactive elements

use super::{class_names, compounds, parsed_sheets, pseudo_classes, sheet_context};
use crate::domain::findings::{Finding, GuardianResult, RuleCategory};
use crate::rules::Rule;
use crate::snapshot::ProjectSnapshot;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

pub const RULE_ID: &str = "css/interactive-states";

/// States every interactive element must style
const REQUIRED_STATES: &[&str] = &["hover", "focus", "active"];

/// BEM segments that name an interactive element
const INTERACTIVE_NAMES: &[&str] = &["btn", "button", "link"];

/// Properties that move or resize the element and its neighbours
const LAYOUT_PROPERTIES: &[&str] = &[
    "width",
    "height",
    "min-width",
    "min-height",
    "max-width",
    "max-height",
    "position",
    "top",
    "right",
    "bottom",
    "left",
];

const LAYOUT_PREFIXES: &[&str] = &["margin", "padding", "inset"];

/// The class without its modifier when a block or element segment names a
/// button or link, e.g. `nav__link--active` gives `nav__link`
pub fn interactive_key(class: &str) -> Option<&str> {
    let base = class.split("--").next().unwrap_or(class);
    let is_interactive = base.split("__").any(|segment| {
        INTERACTIVE_NAMES.iter().any(|name| {
            segment == *name || segment.ends_with(&format!("-{name}"))
        })
    });
    is_interactive.then_some(base)
}

fn is_layout_property(property: &str) -> bool {
    LAYOUT_PROPERTIES.contains(&property)
        || LAYOUT_PREFIXES
            .iter()
            .any(|prefix| property == *prefix || property.starts_with(&format!("{prefix}-")))
}

fn as_state(pseudo: &str) -> Option<&'static str> {
    match pseudo {
        "hover" => Some("hover"),
        "active" => Some("active"),
        "focus" | "focus-visible" => Some("focus"),
        _ => None,
    }
}

/// Where an interactive class is first styled without a state
struct Definition {
    path: PathBuf,
    line: u32,
    context: String,
}

pub struct InteractiveStatesRule;

impl Rule for InteractiveStatesRule {
    fn id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "Buttons and links style :hover, :focus and :active without changing layout"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Styles
    }

    fn check(&self, snapshot: &ProjectSnapshot) -> GuardianResult<Vec<Finding>> {
        let mut findings = Vec::new();
        let mut definitions: BTreeMap<String, Definition> = BTreeMap::new();
        let mut states: BTreeMap<String, BTreeSet<&'static str>> = BTreeMap::new();

        for (sheet, parsed) in parsed_sheets(snapshot) {
            for rule in parsed.rules() {
                let mut rule_states = BTreeSet::new();

                for selector in &rule.selectors {
                    let parts = compounds(selector);
                    for (index, compound) in parts.iter().enumerate() {
                        let compound_states: Vec<&'static str> = pseudo_classes(compound)
                            .iter()
                            .filter_map(|pseudo| as_state(pseudo))
                            .collect();
                        let is_subject = index + 1 == parts.len();

                        for key in class_names(compound).into_iter().filter_map(interactive_key) {
                            if compound_states.is_empty() {
                                if is_subject && !compound.contains(':') {
                                    definitions.entry(key.to_string()).or_insert_with(|| Definition {
                                        path: sheet.path.clone(),
                                        line: rule.line(),
                                        context: sheet_context(sheet, rule.line()),
                                    });
                                }
                            } else {
                                states
                                    .entry(key.to_string())
                                    .or_default()
                                    .extend(compound_states.iter().copied());
                                rule_states.extend(compound_states.iter().copied());
                            }
                        }
                    }
                }

                let Some(state) = rule_states.iter().next() else {
                    continue;
                };
                for decl in rule.declarations() {
                    let property = decl.property_lower();
                    if is_layout_property(&property) {
                        findings.push(
                            self.finding(
                                &sheet.path,
                                format!("Layout property \"{property}\" changes on :{state}"),
                            )
                            .at_line(decl.line)
                            .with_context(sheet_context(sheet, decl.line))
                            .with_suggestion("Animate transform or opacity instead"),
                        );
                    }
                }
            }
        }

        for (key, definition) in &definitions {
            let styled = states.get(key);
            let missing: Vec<String> = REQUIRED_STATES
                .iter()
                .filter(|state| !styled.is_some_and(|set| set.contains(*state)))
                .map(|state| format!(":{state}"))
                .collect();
            if missing.is_empty() {
                continue;
            }
            let noun = if missing.len() == 1 { "state" } else { "states" };
            findings.push(
                self.finding(
                    &definition.path,
                    format!("Interactive element .{key} is missing {} {noun}", missing.join(", ")),
                )
                .at_line(definition.line)
                .with_context(&definition.context),
            );
        }

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathsConfig;

    fn check(sources: &[(&str, &str)]) -> Vec<Finding> {
        let mut snapshot = ProjectSnapshot::empty(PathsConfig::default());
        for (path, source) in sources {
            snapshot.add_stylesheet(*path, source);
        }
        InteractiveStatesRule.check(&snapshot).unwrap()
    }

    #[test]
    fn test_interactive_key() {
        assert_eq!(interactive_key("btn"), Some("btn"));
        assert_eq!(interactive_key("nav__link--active"), Some("nav__link"));
        assert_eq!(interactive_key("header__menu-button"), Some("header__menu-button"));
        assert_eq!(interactive_key("card__title"), None);
        assert_eq!(interactive_key("linked-list"), None);
    }

    #[test]
    fn test_complete_states_pass() {
        let findings = check(&[(
            "styles/main.scss",
            r#".btn {
  padding: 10px;
  &:hover { opacity: 0.8; }
  &:focus-visible { outline: 2px solid #000; }
  &:active { transform: scale(0.98); }
  &--primary { color: #fff; }
}"#,
        )]);
        assert!(findings.is_empty(), "{findings:?}");
    }

    #[test]
    fn test_states_may_live_in_other_files() {
        let findings = check(&[
            ("styles/blocks/nav.scss", ".nav__link { color: #000; }"),
            (
                "styles/states.scss",
                ".nav__link:hover, .nav__link:focus, .nav__link:active { color: #333; }",
            ),
        ]);
        assert!(findings.is_empty(), "{findings:?}");
    }

    #[test]
    fn test_missing_states_reported_at_definition() {
        let findings = check(&[(
            "styles/main.scss",
            ".footer__link { color: #000; }\n.footer__link:hover { color: #333; }",
        )]);

        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].message,
            "Interactive element .footer__link is missing :focus, :active states"
        );
        assert_eq!(findings[0].line, Some(1));
    }

    #[test]
    fn test_layout_changes_in_states() {
        let findings = check(&[(
            "styles/main.scss",
            r#".button { color: #000; }
.button:hover {
  margin-top: 2px;
  width: 110%;
  transform: translateY(-2px);
}
.button:focus, .button:active { opacity: 0.9; }"#,
        )]);

        let messages: Vec<_> = findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Layout property \"margin-top\" changes on :hover",
                "Layout property \"width\" changes on :hover",
            ]
        );
        assert_eq!(findings[0].line, Some(3));
    }
}
