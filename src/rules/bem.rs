//! BEM class naming and wrapper markup

use super::{line_context, Rule};
use crate::domain::findings::{Finding, GuardianResult, RuleCategory};
use crate::snapshot::{Element, ProjectSnapshot};
use lazy_static::lazy_static;
use regex::Regex;

pub const CLASS_NAMING: &str = "bem/class-naming";
pub const UNNECESSARY_WRAPPER: &str = "bem/unnecessary-wrapper";

/// Class names that are exempt from the wrapper check
const ACCESSIBILITY_CLASSES: &[&str] = &["visually-hidden"];

/// Elements whose single child is structural, not a wrapper
const NON_WRAPPER_TAGS: &[&str] = &[
    "html", "head", "body", "ul", "ol", "dl", "table", "thead", "tbody", "tfoot", "tr",
    "picture", "label", "a", "button", "select", "datalist", "optgroup", "svg", "form",
    "fieldset",
];

lazy_static! {
    static ref BEM_CLASS: Regex = Regex::new(
        r"^[a-z]+(-[a-z]+)*(__[a-z]+(-[a-z]+)*)?(--[a-z]+(-[a-z]+)*)?$"
    )
    .expect("valid BEM regex");
    static ref PRESENTATIONAL_PREFIX: Regex =
        Regex::new(r"^((fz|fs|color|bg|margin|padding|left|right|top|bottom)([-_]|$)|block-)")
            .expect("valid prefix regex");
    static ref PRESENTATIONAL_SUFFIX: Regex =
        Regex::new(r"(^|[-_])(left|right|center|bold|italic)$").expect("valid suffix regex");
}

/// Whether a class follows `block__element--modifier` with lowercase hyphenated segments
pub fn is_valid_bem(class: &str) -> bool {
    BEM_CLASS.is_match(class)
}

/// Whether a class name describes appearance rather than meaning
pub fn is_presentational(class: &str) -> bool {
    PRESENTATIONAL_PREFIX.is_match(class) || PRESENTATIONAL_SUFFIX.is_match(class)
}

/// Every class attribute value must follow the BEM grammar and avoid presentational names
pub struct ClassNamingRule;

impl Rule for ClassNamingRule {
    fn id(&self) -> &'static str {
        CLASS_NAMING
    }

    fn description(&self) -> &'static str {
        "Class names follow block__element--modifier and do not describe presentation"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Bem
    }

    fn check(&self, snapshot: &ProjectSnapshot) -> GuardianResult<Vec<Finding>> {
        let mut findings = Vec::new();

        for page in &snapshot.pages {
            for element in page.root.descendants_and_self() {
                for class in element.classes() {
                    if !is_valid_bem(class) {
                        findings.push(
                            self.finding(&page.path, format!("Invalid BEM class name: \"{class}\""))
                                .at_line(element.line)
                                .with_context(line_context(page, element.line))
                                .with_suggestion(
                                    "Use lowercase block__element--modifier names, e.g. card__title--large",
                                ),
                        );
                    }
                    if is_presentational(class) {
                        findings.push(
                            self.finding(
                                &page.path,
                                format!("Presentational class name detected: \"{class}\""),
                            )
                            .at_line(element.line)
                            .with_context(line_context(page, element.line))
                            .with_suggestion("Name the class after what the element is, not how it looks"),
                        );
                    }
                }
            }
        }

        Ok(findings)
    }
}

/// A classed element whose only content is one child element
pub struct UnnecessaryWrapperRule;

impl UnnecessaryWrapperRule {
    fn is_wrapper(element: &Element) -> bool {
        if NON_WRAPPER_TAGS.contains(&element.tag.as_str()) {
            return false;
        }
        if element.attr("class").is_none() {
            return false;
        }
        if element.classes().any(|class| ACCESSIBILITY_CLASSES.contains(&class)) {
            return false;
        }
        element.child_elements().count() == 1
            && !element.has_text()
            && element.find("img").is_none()
    }
}

impl Rule for UnnecessaryWrapperRule {
    fn id(&self) -> &'static str {
        UNNECESSARY_WRAPPER
    }

    fn description(&self) -> &'static str {
        "Elements that only wrap a single child usually stand in for missing semantics"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Bem
    }

    fn check(&self, snapshot: &ProjectSnapshot) -> GuardianResult<Vec<Finding>> {
        let mut findings = Vec::new();

        for page in &snapshot.pages {
            for element in page.root.descendants() {
                if Self::is_wrapper(element) {
                    findings.push(
                        self.finding(&page.path, "Unnecessary wrapper element detected")
                            .at_line(element.line)
                            .with_context(line_context(page, element.line))
                            .with_suggestion("Move the classes onto the child or use a semantic element"),
                    );
                }
            }
        }

        Ok(findings)
    }
}
