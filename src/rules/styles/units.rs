//! Unit consistency for font sizes and spacing

use super::{parsed_sheets, sheet_context};
use crate::domain::findings::{Finding, GuardianResult, RuleCategory};
use crate::rules::Rule;
use crate::snapshot::ProjectSnapshot;
use lazy_static::lazy_static;
use regex::Regex;

pub const RULE_ID: &str = "css/units";

lazy_static! {
    static ref FONT_SIZE: Regex =
        Regex::new(r"([0-9]*\.?[0-9]+)(px|em|rem)\b").expect("valid font-size regex");
    static ref LENGTH: Regex =
        Regex::new(r"(?:^|[\s(,])-?([0-9]*\.?[0-9]+)([a-z]+)\b").expect("valid length regex");
}

/// Units of the non-zero lengths in a value, in order
fn length_units(value: &str) -> Vec<&str> {
    LENGTH
        .captures_iter(value)
        .filter(|caps| caps[1].parse::<f64>().map_or(true, |number| number != 0.0))
        .filter_map(|caps| caps.get(2))
        .map(|m| m.as_str())
        .collect()
}

/// The first font-size in a stylesheet fixes its unit; later font sizes and
/// spacing must follow it
pub struct UnitsRule;

impl Rule for UnitsRule {
    fn id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "Font sizes, margins and paddings use the unit the stylesheet established"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Styles
    }

    fn check(&self, snapshot: &ProjectSnapshot) -> GuardianResult<Vec<Finding>> {
        let mut findings = Vec::new();

        for (sheet, parsed) in parsed_sheets(snapshot) {
            let mut established: Option<String> = None;

            for decl in parsed.declarations() {
                let property = decl.property_lower();
                let report = |message: String| {
                    self.finding(&sheet.path, message)
                        .at_line(decl.line)
                        .with_context(sheet_context(sheet, decl.line))
                };

                if property == "font-size" {
                    let Some(caps) = FONT_SIZE.captures(&decl.value) else {
                        continue;
                    };
                    let unit = &caps[2];
                    let Some(current) = established.clone() else {
                        established = Some(unit.to_string());
                        continue;
                    };
                    if current != unit {
                        findings.push(
                            report(format!("Inconsistent units: mixing {current} and {unit}"))
                                .with_suggestion(format!("Express font sizes in {current}")),
                        );
                    }
                    continue;
                }

                let Some(current) = &established else {
                    continue;
                };
                let family = ["margin", "padding"]
                    .into_iter()
                    .find(|family| property == *family || property.starts_with(&format!("{family}-")));
                let Some(family) = family else {
                    continue;
                };

                if let Some(unit) = length_units(&decl.value).into_iter().find(|unit| *unit != current.as_str()) {
                    findings.push(report(format!(
                        "Inconsistent units: {family} uses {unit} while font-size uses {current}"
                    )));
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

    fn check(source: &str) -> Vec<Finding> {
        let mut snapshot = ProjectSnapshot::empty(PathsConfig::default());
        snapshot.add_stylesheet("styles/main.scss", source);
        UnitsRule.check(&snapshot).unwrap()
    }

    #[test]
    fn test_length_units_skip_zero() {
        assert_eq!(length_units("0 auto"), Vec::<&str>::new());
        assert_eq!(length_units("0px 1.5rem -2em"), vec!["rem", "em"]);
    }

    #[test]
    fn test_consistent_units_pass() {
        let findings = check(
            r#".a { margin: 10px; }
.b { font-size: 16px; margin: 0 auto; padding: 8px 16px; }
.c { font-size: 24px; padding-top: 0; }"#,
        );
        assert!(findings.is_empty(), "{findings:?}");
    }

    #[test]
    fn test_mixed_units_are_reported() {
        let findings = check(
            r#".a {
  font-size: 1rem;
  margin: 0 1rem 2px;
}
.b {
  font-size: 14px;
  padding-left: 1em;
}"#,
        );
        let messages: Vec<_> = findings.iter().map(|f| f.message.as_str()).collect();

        assert_eq!(
            messages,
            vec![
                "Inconsistent units: margin uses px while font-size uses rem",
                "Inconsistent units: mixing rem and px",
                "Inconsistent units: padding uses em while font-size uses rem",
            ]
        );
        assert_eq!(findings[0].line, Some(3));
        assert_eq!(findings[2].line, Some(7));
    }
}
