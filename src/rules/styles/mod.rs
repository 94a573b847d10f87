//! Stylesheet authoring rules and the selector helpers they share
//!
//! Architecture: every rule walks the authored stylesheets only
//! - Vendor resets such as normalize.css are skipped
//! - Stylesheets that failed to parse are reported once by `css/syntax`
//!   and ignored by the other rules
//! - Nested SCSS rules are checked through their resolved selectors

pub mod background;
pub mod colors;
pub mod comments;
pub mod declarations;
pub mod nesting;
pub mod states;
pub mod syntax;
pub mod units;

use super::truncate;
use crate::snapshot::{ProjectSnapshot, Stylesheet, StylesheetSource};
use lazy_static::lazy_static;
use regex::Regex;

/// Pseudo-classes that describe a user or form state
pub(crate) const STATE_PSEUDO_CLASSES: &[&str] = &[
    "checked",
    "hover",
    "focus",
    "focus-visible",
    "focus-within",
    "active",
    "disabled",
    "target",
    "valid",
    "invalid",
];

lazy_static! {
    static ref CLASS_NAME: Regex =
        Regex::new(r"\.(-?[_a-zA-Z][_a-zA-Z0-9-]*)").expect("valid class regex");
    static ref TYPE_SELECTOR: Regex =
        Regex::new(r"^([a-zA-Z][a-zA-Z0-9]*)").expect("valid type selector regex");
}

/// Authored stylesheets that parsed, with their trees
pub(crate) fn parsed_sheets(
    snapshot: &ProjectSnapshot,
) -> impl Iterator<Item = (&StylesheetSource, &Stylesheet)> {
    snapshot
        .authored_stylesheets()
        .filter_map(|sheet| sheet.stylesheet().map(|parsed| (sheet, parsed)))
}

/// Trimmed source line of a stylesheet, used as finding context
pub(crate) fn sheet_context(sheet: &StylesheetSource, line: u32) -> String {
    let text = line
        .checked_sub(1)
        .and_then(|index| sheet.source.lines().nth(index as usize))
        .unwrap_or("")
        .trim();
    truncate(text, 160)
}

/// Compound selectors of one complex selector; combinators are dropped
pub(crate) fn compounds(selector: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for ch in selector.chars() {
        match ch {
            '(' | '[' => {
                depth += 1;
                current.push(ch);
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            c if depth == 0 && (c.is_whitespace() || matches!(c, '>' | '+' | '~')) => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Class names used anywhere in a selector
pub(crate) fn class_names(selector: &str) -> Vec<&str> {
    CLASS_NAME
        .captures_iter(selector)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// Whether the selector uses `.class` as a whole class name
pub(crate) fn mentions_class(selector: &str, class: &str) -> bool {
    class_names(selector).contains(&class)
}

/// Single-colon pseudo-classes of a selector, pseudo-elements excluded
pub(crate) fn pseudo_classes(selector: &str) -> Vec<String> {
    let chars: Vec<char> = selector.chars().collect();
    let mut found = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != ':' {
            i += 1;
            continue;
        }
        if chars.get(i + 1) == Some(&':') {
            i += 2;
            continue;
        }
        let name: String = chars[i + 1..]
            .iter()
            .take_while(|c| c.is_ascii_alphanumeric() || **c == '-')
            .collect();
        i += 1 + name.len();
        if !name.is_empty() {
            found.push(name.to_ascii_lowercase());
        }
    }
    found
}

/// Whether a selector targets a user or form state
pub(crate) fn has_state_pseudo(selector: &str) -> bool {
    pseudo_classes(selector)
        .iter()
        .any(|pseudo| pseudo == "not" || STATE_PSEUDO_CLASSES.contains(&pseudo.as_str()))
}

/// Leading element name of a compound selector, e.g. `p` in `p.lead`
pub(crate) fn type_selector(compound: &str) -> Option<&str> {
    TYPE_SELECTOR
        .captures(compound)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compounds() {
        assert_eq!(compounds(".a .b > .c"), vec![".a", ".b", ".c"]);
        assert_eq!(compounds(".a:not(.b .c)"), vec![".a:not(.b .c)"]);
        assert_eq!(compounds("[data-x=\"a b\"] + p"), vec!["[data-x=\"a b\"]", "p"]);
    }

    #[test]
    fn test_class_names() {
        assert_eq!(class_names(".card__title.is-open a"), vec!["card__title", "is-open"]);
        assert!(mentions_class(".card .card__title", "card"));
        assert!(!mentions_class(".card__title", "card"));
    }

    #[test]
    fn test_pseudo_classes() {
        assert_eq!(pseudo_classes(".btn:hover:focus-visible"), vec!["hover", "focus-visible"]);
        assert!(pseudo_classes(".btn::before").is_empty());
        assert!(has_state_pseudo(".field:not(.field--wide)"));
        assert!(has_state_pseudo("a:hover span"));
        assert!(!has_state_pseudo("li:first-child"));
    }

    #[test]
    fn test_type_selector() {
        assert_eq!(type_selector("p.lead"), Some("p"));
        assert_eq!(type_selector("h2"), Some("h2"));
        assert_eq!(type_selector(".card"), None);
    }
}
