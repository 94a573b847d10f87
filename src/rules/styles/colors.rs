//! Color notation and reuse across stylesheets

use super::{parsed_sheets, sheet_context};
use crate::domain::findings::{Finding, GuardianResult, RuleCategory, Severity};
use crate::rules::Rule;
use crate::snapshot::ProjectSnapshot;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::path::PathBuf;

pub const FORMAT_RULE_ID: &str = "css/color-format";
pub const DUPLICATE_RULE_ID: &str = "css/duplicate-colors";

/// CSS named colors that authors reach for; keywords such as `transparent`,
/// `currentColor` and `inherit` are not colors in this sense
const NAMED_COLORS: &[&str] = &[
    "aqua", "beige", "black", "blue", "brown", "coral", "crimson", "cyan", "darkblue",
    "darkgray", "darkgreen", "darkgrey", "darkred", "fuchsia", "gold", "gray", "green",
    "grey", "indigo", "ivory", "khaki", "lavender", "lightblue", "lightgray", "lightgreen",
    "lightgrey", "lime", "magenta", "maroon", "navy", "olive", "orange", "orangered",
    "orchid", "pink", "plum", "purple", "red", "salmon", "silver", "skyblue", "snow",
    "tan", "teal", "tomato", "turquoise", "violet", "wheat", "white", "whitesmoke",
    "yellow", "yellowgreen",
];

/// Property prefixes whose values may carry a color
const COLOR_PROPERTY_PREFIXES: &[&str] = &[
    "background",
    "border",
    "outline",
    "fill",
    "stroke",
    "box-shadow",
    "text-shadow",
    "text-decoration",
    "column-rule",
];

lazy_static! {
    static ref COLOR_FUNCTION: Regex =
        Regex::new(r"(?i)\b(rgba?|hsla?)\(").expect("valid color function regex");
    static ref COLOR_LITERAL: Regex =
        Regex::new(r"(?i)(#[0-9a-f]{3,8}\b|\b(?:rgba?|hsla?)\([^)]*\))").expect("valid color literal regex");
    static ref URL_CALL: Regex = Regex::new(r"(?i)url\([^)]*\)").expect("valid url regex");
}

pub fn is_named_color(word: &str) -> bool {
    NAMED_COLORS.iter().any(|name| name.eq_ignore_ascii_case(word))
}

fn is_color_property(property: &str) -> bool {
    property == "color"
        || property.ends_with("-color")
        || COLOR_PROPERTY_PREFIXES
            .iter()
            .any(|prefix| property == *prefix || property.starts_with(&format!("{prefix}-")))
}

/// Lowercased color literal with whitespace removed, e.g. `rgba(0,0,0,.5)`
fn canonical(literal: &str) -> String {
    literal
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Hex is the house notation for colors
pub struct ColorFormatRule;

impl Rule for ColorFormatRule {
    fn id(&self) -> &'static str {
        FORMAT_RULE_ID
    }

    fn description(&self) -> &'static str {
        "Colors are written as hex rather than rgb(), hsl() or names"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Styles
    }

    fn check(&self, snapshot: &ProjectSnapshot) -> GuardianResult<Vec<Finding>> {
        let mut findings = Vec::new();

        for (sheet, parsed) in parsed_sheets(snapshot) {
            for decl in parsed.declarations() {
                let value = URL_CALL.replace_all(&decl.value, "");
                let context = sheet_context(sheet, decl.line);

                for caps in COLOR_FUNCTION.captures_iter(&value) {
                    findings.push(
                        self.finding(
                            &sheet.path,
                            format!("Use hex colors instead of {}()", caps[1].to_ascii_lowercase()),
                        )
                        .at_line(decl.line)
                        .with_context(&context),
                    );
                }

                if !is_color_property(&decl.property_lower()) {
                    continue;
                }
                let named = value
                    .split(|c: char| c.is_whitespace() || matches!(c, ',' | '(' | ')' | '/'))
                    .filter(|word| is_named_color(word));
                for word in named {
                    findings.push(
                        self.finding(
                            &sheet.path,
                            format!("Named color \"{word}\" should be written as hex"),
                        )
                        .at_line(decl.line)
                        .with_context(&context),
                    );
                }
            }
        }

        Ok(findings)
    }
}

struct ColorUsage {
    path: PathBuf,
    line: u32,
    context: String,
}

/// The same literal color in several declarations belongs in a variable
pub struct DuplicateColorsRule;

impl Rule for DuplicateColorsRule {
    fn id(&self) -> &'static str {
        DUPLICATE_RULE_ID
    }

    fn description(&self) -> &'static str {
        "Colors repeated across stylesheets are extracted into variables"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Styles
    }

    fn check(&self, snapshot: &ProjectSnapshot) -> GuardianResult<Vec<Finding>> {
        let mut order: Vec<String> = Vec::new();
        let mut usages: HashMap<String, Vec<ColorUsage>> = HashMap::new();

        for (sheet, parsed) in parsed_sheets(snapshot) {
            for decl in parsed.declarations() {
                if decl.is_variable() || decl.value.contains('$') || decl.value.contains("var(") {
                    continue;
                }
                let value = URL_CALL.replace_all(&decl.value, "");
                let mut seen_here = Vec::new();

                for m in COLOR_LITERAL.find_iter(&value) {
                    let color = canonical(m.as_str());
                    if seen_here.contains(&color) {
                        continue;
                    }
                    seen_here.push(color.clone());

                    let entry = usages.entry(color.clone()).or_default();
                    if entry.is_empty() {
                        order.push(color);
                    }
                    entry.push(ColorUsage {
                        path: sheet.path.clone(),
                        line: decl.line,
                        context: sheet_context(sheet, decl.line),
                    });
                }
            }
        }

        let mut findings = Vec::new();
        for color in order {
            let Some(uses) = usages.get(&color).filter(|uses| uses.len() > 1) else {
                continue;
            };
            let first = &uses[0];
            let others: Vec<String> = uses[1..]
                .iter()
                .map(|usage| format!("  • {}:{}: {}", usage.path.display(), usage.line, usage.context))
                .collect();

            findings.push(
                self.finding(
                    &first.path,
                    format!("Color \"{color}\" is used multiple times. Consider using a variable."),
                )
                .with_severity(Severity::Warning)
                .at_line(first.line)
                .with_context(format!(
                    "First usage: {}\nOther usages:\n{}",
                    first.context,
                    others.join("\n")
                )),
            );
        }

        Ok(findings)
    }
}
