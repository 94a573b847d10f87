//! Header and footer markup must match the entry page

use super::Rule;
use crate::domain::findings::{Finding, GuardianResult, RuleCategory};
use crate::snapshot::{Element, HtmlDocument, Node, ProjectSnapshot};

pub const RULE_ID: &str = "html/layout-consistency";

/// Attributes whose values legitimately differ between pages
const PAGE_SPECIFIC_ATTRS: &[&str] = &["href", "aria-current"];

/// Regions shared by every page, with their display name
const REGIONS: &[(&str, &str)] = &[("header", "Header"), ("footer", "Footer")];

pub struct LayoutConsistencyRule;

/// One normalised line of a region outline and where it came from
#[derive(Debug, Clone, PartialEq)]
struct OutlineLine {
    text: String,
    line: u32,
}

fn is_active_class(class: &str) -> bool {
    class == "active" || class.ends_with("--active") || class.ends_with("_active")
}

/// Flatten a region into indented lines, ignoring link targets and
/// current-page markers
fn outline(element: &Element) -> Vec<OutlineLine> {
    let mut lines = Vec::new();
    outline_into(element, 0, &mut lines);
    lines
}

fn outline_into(element: &Element, depth: usize, lines: &mut Vec<OutlineLine>) {
    let indent = "  ".repeat(depth);
    let mut tag = format!("{indent}<{}", element.tag);
    let mut attrs: Vec<_> = element.attrs.iter().collect();
    attrs.sort();
    for (key, value) in attrs {
        if PAGE_SPECIFIC_ATTRS.contains(&key.as_str()) {
            continue;
        }
        if key == "class" {
            let classes: Vec<&str> = element.classes().filter(|class| !is_active_class(class)).collect();
            if !classes.is_empty() {
                tag.push_str(&format!(" class=\"{}\"", classes.join(" ")));
            }
            continue;
        }
        tag.push_str(&format!(" {key}=\"{value}\""));
    }
    tag.push('>');
    lines.push(OutlineLine {
        text: tag,
        line: element.line,
    });

    for child in &element.children {
        match child {
            Node::Element(child) => outline_into(child, depth + 1, lines),
            Node::Text(text) => {
                let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
                if !text.is_empty() {
                    lines.push(OutlineLine {
                        text: format!("{indent}  {text}"),
                        line: element.line,
                    });
                }
            }
        }
    }
}

impl LayoutConsistencyRule {
    fn compare(
        &self,
        reference: &HtmlDocument,
        page: &HtmlDocument,
        tag: &str,
        name: &str,
    ) -> Option<Finding> {
        let expected = outline(reference.elements_by_tag(tag).next()?);
        let found = page.elements_by_tag(tag).next().map(outline).unwrap_or_default();

        let position = (0..expected.len().max(found.len()))
            .find(|&i| expected.get(i).map(|l| &l.text) != found.get(i).map(|l| &l.text))?;

        let line = found
            .get(position)
            .or_else(|| found.last())
            .map(|l| l.line)
            .unwrap_or_else(|| page.body_line());
        let describe = |lines: &[OutlineLine]| {
            lines
                .get(position)
                .map(|l| l.text.trim().to_string())
                .unwrap_or_else(|| format!("(end of {tag})"))
        };

        Some(
            self.finding(&page.path, format!("{name} structure differs from {}", reference.file_name()))
                .at_line(line)
                .with_context(format!("Expected: {}\nFound: {}", describe(&expected), describe(&found)))
                .with_suggestion(format!("Copy the {tag} markup from {}", reference.file_name())),
        )
    }
}

impl Rule for LayoutConsistencyRule {
    fn id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "Every page repeats the entry page's header and footer markup"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Html
    }

    fn check(&self, snapshot: &ProjectSnapshot) -> GuardianResult<Vec<Finding>> {
        let Some(reference) = snapshot.index_page() else {
            tracing::debug!("No entry page, skipping layout comparison");
            return Ok(Vec::new());
        };

        let mut findings = Vec::new();
        for page in snapshot.pages.iter().filter(|page| page.path != reference.path) {
            for (tag, name) in REGIONS {
                findings.extend(self.compare(reference, page, tag, name));
            }
        }
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathsConfig;

    const HEADER: &str = r#"<header class="header">
<nav class="nav">
<a href="index.html" class="nav__link nav__link--active" aria-current="page">Home</a>
<a href="about.html" class="nav__link">About</a>
</nav>
</header>"#;

    fn page(header: &str, footer: &str) -> String {
        format!("<html><body>\n{header}\n<main></main>\n{footer}\n</body></html>")
    }

    fn check(index: &str, other: &str) -> Vec<Finding> {
        let mut snapshot = ProjectSnapshot::empty(PathsConfig::default());
        snapshot.add_page("index.html", index);
        snapshot.add_page("about.html", other);
        LayoutConsistencyRule.check(&snapshot).unwrap()
    }

    #[test]
    fn test_hrefs_and_active_markers_are_ignored() {
        let about_header = r#"<header class="header">
<nav class="nav">
<a href="./index.html" class="nav__link">Home</a>
<a href="about.html" class="nav__link active" aria-current="page">About</a>
</nav>
</header>"#;
        let footer = "<footer class=\"footer\">(c) Studio</footer>";

        assert!(check(&page(HEADER, footer), &page(about_header, footer)).is_empty());
    }

    #[test]
    fn test_first_difference_is_reported() {
        let about_header = HEADER.replace(">About<", ">About us<");
        let findings = check(&page(HEADER, ""), &page(&about_header, ""));

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message, "Header structure differs from index.html");
        assert_eq!(findings[0].file_path, std::path::Path::new("about.html"));
        assert_eq!(findings[0].line, Some(5));
        assert_eq!(
            findings[0].context.as_deref(),
            Some("Expected: About\nFound: About us")
        );
    }

    #[test]
    fn test_missing_region() {
        let footer = "<footer class=\"footer\">(c) Studio</footer>";
        let findings = check(&page(HEADER, footer), &page(HEADER, ""));

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message, "Footer structure differs from index.html");
        assert_eq!(
            findings[0].context.as_deref(),
            Some("Expected: <footer class=\"footer\">\nFound: (end of footer)")
        );
    }

    #[test]
    fn test_no_entry_page_means_no_findings() {
        let mut snapshot = ProjectSnapshot::empty(PathsConfig::default());
        snapshot.add_page("about.html", &page(HEADER, ""));
        snapshot.add_page("contacts.html", &page("<header></header>", ""));
        assert!(LayoutConsistencyRule.check(&snapshot).unwrap().is_empty());
    }
}
