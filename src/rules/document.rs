//! Document-level semantics: doctype, language, charset, headings, sectioning, favicon

use super::{line_context, Rule};
use crate::domain::findings::{Finding, GuardianResult, RuleCategory};
use crate::snapshot::{HtmlDocument, ProjectSnapshot};

pub const RULE_ID: &str = "html/document";

/// Sectioning tags counted towards semantic markup
pub const SEMANTIC_TAGS: &[&str] = &["header", "main", "footer", "nav", "article", "section", "aside"];

pub struct DocumentRule {
    min_semantic_tags: usize,
}

impl DocumentRule {
    pub fn new(min_semantic_tags: usize) -> Self {
        Self { min_semantic_tags }
    }

    fn check_page(&self, page: &HtmlDocument, findings: &mut Vec<Finding>) {
        let is_html5 = page
            .doctype
            .as_deref()
            .is_some_and(|name| name.eq_ignore_ascii_case("html"));
        if !is_html5 {
            findings.push(
                self.finding(&page.path, "Missing or incorrect DOCTYPE declaration")
                    .at_line(1)
                    .with_context(line_context(page, 1))
                    .with_suggestion("Start the page with <!DOCTYPE html>"),
            );
        }

        if page.root.non_empty_attr("lang").is_none() {
            findings.push(
                self.finding(&page.path, "Missing lang attribute on <html> tag")
                    .at_line(page.root.line)
                    .with_context(line_context(page, page.root.line)),
            );
        }

        let has_charset = page
            .elements_by_tag("meta")
            .any(|meta| meta.non_empty_attr("charset").is_some());
        if !has_charset {
            findings.push(
                self.finding(&page.path, "Missing charset meta tag")
                    .at_line(page.head_line())
                    .with_suggestion("Add <meta charset=\"utf-8\"> as the first element of <head>"),
            );
        }

        let headings: Vec<_> = page.elements_by_tag("h1").collect();
        match headings.as_slice() {
            [] => findings.push(
                self.finding(&page.path, "Missing h1 tag")
                    .at_line(page.body_line()),
            ),
            [_] => {}
            [_, extra, ..] => findings.push(
                self.finding(&page.path, "Multiple h1 tags found")
                    .at_line(extra.line)
                    .with_context(format!("Found {} h1 elements", headings.len()))
                    .with_suggestion("Keep one h1 per page and demote the rest"),
            ),
        }

        let used: Vec<&str> = SEMANTIC_TAGS
            .iter()
            .copied()
            .filter(|tag| page.elements_by_tag(tag).next().is_some())
            .collect();
        if used.len() < self.min_semantic_tags {
            let found = if used.is_empty() {
                "none".to_string()
            } else {
                used.join(", ")
            };
            findings.push(
                self.finding(&page.path, "Insufficient use of semantic tags")
                    .at_line(page.body_line())
                    .with_context(format!("Found: {found}"))
                    .with_suggestion(format!(
                        "Use at least {} of: {}",
                        self.min_semantic_tags,
                        SEMANTIC_TAGS.join(", ")
                    )),
            );
        }

        let has_favicon = page.elements_by_tag("link").any(|link| {
            link.attr("rel")
                .unwrap_or("")
                .split_whitespace()
                .any(|rel| rel.eq_ignore_ascii_case("icon"))
        });
        if !has_favicon {
            findings.push(
                self.finding(&page.path, "Missing favicon")
                    .at_line(page.head_line())
                    .with_suggestion("Add <link rel=\"icon\" href=\"favicon.svg\">"),
            );
        }
    }
}

impl Rule for DocumentRule {
    fn id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "Pages declare doctype, lang, charset, one h1, sectioning tags and a favicon"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Html
    }

    fn check(&self, snapshot: &ProjectSnapshot) -> GuardianResult<Vec<Finding>> {
        let mut findings = Vec::new();
        for page in &snapshot.pages {
            self.check_page(page, &mut findings);
        }
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathsConfig;

    const GOOD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <link rel="shortcut icon" href="favicon.ico">
  <title>Home</title>
</head>
<body>
  <header></header>
  <main><h1>Home</h1></main>
  <footer></footer>
</body>
</html>"#;

    fn check(html: &str) -> Vec<Finding> {
        let mut snapshot = ProjectSnapshot::empty(PathsConfig::default());
        snapshot.add_page("index.html", html);
        DocumentRule::new(3).check(&snapshot).unwrap()
    }

    #[test]
    fn test_well_formed_page_passes() {
        assert!(check(GOOD).is_empty());
    }

    #[test]
    fn test_bare_page_reports_everything() {
        let findings = check("<html>\n<head></head>\n<body>\n<div>Hi</div>\n</body>\n</html>");
        let messages: Vec<_> = findings.iter().map(|f| f.message.as_str()).collect();

        assert_eq!(
            messages,
            vec![
                "Missing or incorrect DOCTYPE declaration",
                "Missing lang attribute on <html> tag",
                "Missing charset meta tag",
                "Missing h1 tag",
                "Insufficient use of semantic tags",
                "Missing favicon",
            ]
        );
        assert_eq!(findings[2].line, Some(2));
        assert_eq!(findings[3].line, Some(3));
        assert_eq!(findings[4].context.as_deref(), Some("Found: none"));
    }

    #[test]
    fn test_multiple_h1_points_at_the_extra_heading() {
        let html = GOOD.replace("<footer></footer>", "<footer><h1>Again</h1></footer>");
        let findings = check(&html);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message, "Multiple h1 tags found");
        assert_eq!(findings[0].line, Some(11));
    }

    #[test]
    fn test_semantic_threshold_is_configurable() {
        let html = GOOD.replace("<footer></footer>", "");
        let mut snapshot = ProjectSnapshot::empty(PathsConfig::default());
        snapshot.add_page("index.html", &html);

        assert_eq!(DocumentRule::new(3).check(&snapshot).unwrap().len(), 1);
        assert!(DocumentRule::new(2).check(&snapshot).unwrap().is_empty());
    }
}
