//! Background images need a color to fall back on

use super::{parsed_sheets, sheet_context};
use crate::domain::findings::{Finding, GuardianResult, RuleCategory};
use crate::rules::Rule;
use crate::snapshot::ProjectSnapshot;
use lazy_static::lazy_static;
use regex::Regex;

pub const RULE_ID: &str = "css/background-fallback";

lazy_static! {
    static ref URL_TARGET: Regex =
        Regex::new(r#"(?i)url\(\s*['"]?([^'")]*)['"]?\s*\)"#).expect("valid url regex");
    static ref COLOR_TOKEN: Regex = Regex::new(
        r"(?i)(#[0-9a-f]{3,8}\b|\b(rgba?|hsla?)\(|\$[a-z_][\w-]*|\bvar\(|\b(transparent|currentcolor)\b)"
    )
    .expect("valid color token regex");
}

/// Whether a `url()` target is a vector image
fn is_svg(target: &str) -> bool {
    let path = target.split(['?', '#']).next().unwrap_or(target);
    path.to_ascii_lowercase().ends_with(".svg")
}

/// Whether the `background` shorthand carries a color of its own
fn shorthand_has_color(value: &str) -> bool {
    let without_urls = URL_TARGET.replace_all(value, "");
    COLOR_TOKEN.is_match(&without_urls)
        || without_urls
            .split_whitespace()
            .any(|word| super::colors::is_named_color(word))
}

pub struct BackgroundFallbackRule;

impl Rule for BackgroundFallbackRule {
    fn id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "Raster background images are paired with a background color"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Styles
    }

    fn check(&self, snapshot: &ProjectSnapshot) -> GuardianResult<Vec<Finding>> {
        let mut findings = Vec::new();

        for (sheet, parsed) in parsed_sheets(snapshot) {
            for rule in parsed.rules() {
                let mut targets = Vec::new();
                let mut has_color = false;

                for decl in rule.declarations() {
                    match decl.property_lower().as_str() {
                        "background-image" => {
                            targets.extend(URL_TARGET.captures_iter(&decl.value).map(|caps| caps[1].to_string()));
                        }
                        "background" => {
                            targets.extend(URL_TARGET.captures_iter(&decl.value).map(|caps| caps[1].to_string()));
                            has_color |= shorthand_has_color(&decl.value);
                        }
                        "background-color" => has_color = true,
                        _ => {}
                    }
                }

                if targets.is_empty() || has_color || targets.iter().all(|target| is_svg(target)) {
                    continue;
                }

                findings.push(
                    self.finding(&sheet.path, "Background image without a fallback background-color")
                        .at_line(rule.line())
                        .with_context(sheet_context(sheet, rule.line()))
                        .with_suggestion("Add a background-color close to the image's dominant tone"),
                );
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
        BackgroundFallbackRule.check(&snapshot).unwrap()
    }

    #[test]
    fn test_raster_background_needs_color() {
        let findings = check(".hero {\n  background-image: url(bg.jpg);\n}");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message, "Background image without a fallback background-color");
        assert_eq!(findings[0].line, Some(1));
    }

    #[test]
    fn test_svg_background_needs_nothing() {
        assert!(check(".hero {\n  background-image: url(icon.svg);\n}").is_empty());
        assert!(check(".hero { background: url('../images/icon.svg?v=1') no-repeat; }").is_empty());
    }

    #[test]
    fn test_colors_satisfy_the_fallback() {
        assert!(check(".a { background-image: url(bg.jpg); background-color: #222; }").is_empty());
        assert!(check(".a { background: #222 url(bg.jpg) center / cover; }").is_empty());
        assert!(check(".a { background: url(bg.webp) $dark; }").is_empty());
        assert!(check(".a { background: url(bg.webp) black; }").is_empty());
    }

    #[test]
    fn test_shorthand_without_color() {
        assert_eq!(check(".a { background: url(\"bg.png\") no-repeat center; }").len(), 1);
    }
}
