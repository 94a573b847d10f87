//! Links and buttons: targets, accessible names, external links, current-page marking

use super::{line_context, Rule};
use crate::domain::findings::{Finding, GuardianResult, RuleCategory, Severity};
use crate::snapshot::{Element, HtmlDocument, ProjectSnapshot, INDEX_PAGE};

pub const RULE_ID: &str = "html/interactive";

pub struct InteractiveRule;

/// Whether an element exposes a name to assistive technology: visible text,
/// `aria-label`, `aria-labelledby`, `title`, an image with alt text or an
/// SVG with a `<title>`
pub fn has_accessible_name(element: &Element) -> bool {
    if element.has_text() {
        return true;
    }
    if ["aria-label", "aria-labelledby", "title"]
        .iter()
        .any(|attr| element.non_empty_attr(attr).is_some())
    {
        return true;
    }
    element.descendants().any(|child| match child.tag.as_str() {
        "img" => child.non_empty_attr("alt").is_some(),
        "svg" => child
            .descendants()
            .any(|node| node.tag == "title" && node.has_text()),
        _ => false,
    })
}

/// `http://`, `https://` and protocol-relative URLs
pub fn is_external(href: &str) -> bool {
    let lowered = href.trim().to_ascii_lowercase();
    lowered.starts_with("http://") || lowered.starts_with("https://") || lowered.starts_with("//")
}

/// Whether `href` points at the page itself; fragment-only links stay inside the page and do not count
fn targets_page(href: &str, page: &HtmlDocument) -> bool {
    let href = href.trim();
    if href.starts_with('#') || is_external(href) || href.contains(':') {
        return false;
    }
    if href.starts_with('?') {
        return true;
    }
    let path = href.split(['?', '#']).next().unwrap_or("");
    let path = path.trim_start_matches("./").trim_start_matches('/');
    if path.is_empty() {
        return page.file_name() == INDEX_PAGE;
    }
    path == page.file_name()
}

fn marked_current(link: &Element) -> bool {
    link.attr("aria-current")
        .is_some_and(|value| value.eq_ignore_ascii_case("page"))
        || link
            .classes()
            .any(|class| class == "active" || class.ends_with("--active") || class.ends_with("_active"))
}

impl InteractiveRule {
    fn check_link(
        &self,
        page: &HtmlDocument,
        link: &Element,
        in_nav: bool,
        findings: &mut Vec<Finding>,
    ) {
        let context = line_context(page, link.line);
        let href = link.attr("href").map(str::trim);

        match href {
            None | Some("") => findings.push(
                self.finding(&page.path, "Link missing href attribute")
                    .at_line(link.line)
                    .with_context(&context),
            ),
            Some("#") => findings.push(
                self.finding(&page.path, "Link with href=\"#\" is a placeholder")
                    .with_severity(Severity::Warning)
                    .at_line(link.line)
                    .with_context(&context)
                    .with_suggestion("Point the link at a real target, or use a <button> for actions"),
            ),
            Some(_) => {}
        }

        if !has_accessible_name(link) {
            findings.push(
                self.finding(&page.path, "Link has no accessible name")
                    .at_line(link.line)
                    .with_context(&context)
                    .with_suggestion("Add link text, aria-label or a titled icon"),
            );
        }

        if let Some(href) = href.filter(|href| is_external(href)) {
            let opens_new_context = link
                .attr("target")
                .is_some_and(|target| target.eq_ignore_ascii_case("_blank"));
            if !opens_new_context {
                findings.push(
                    self.finding(&page.path, "External link missing target=\"_blank\" attribute")
                        .at_line(link.line)
                        .with_context(&context)
                        .with_suggestion("Add target=\"_blank\" rel=\"noopener noreferrer\""),
                );
            } else if !link
                .attr("rel")
                .unwrap_or("")
                .split_whitespace()
                .any(|rel| rel.eq_ignore_ascii_case("noopener") || rel.eq_ignore_ascii_case("noreferrer"))
            {
                findings.push(
                    self.finding(&page.path, format!("External link to {href} opens a new tab without rel=\"noopener\""))
                        .with_severity(Severity::Info)
                        .at_line(link.line)
                        .with_context(&context),
                );
            }
        }

        if !in_nav {
            return;
        }
        let Some(href) = href.filter(|href| !href.is_empty() && *href != "#") else {
            return;
        };

        let is_current = targets_page(href, page);
        let is_marked = marked_current(link);
        if is_current && link.attr("aria-current").map(str::trim) != Some("page") {
            findings.push(
                self.finding(
                    &page.path,
                    "Link to the current page should be marked with aria-current=\"page\"",
                )
                .at_line(link.line)
                .with_context(&context),
            );
        } else if !is_current && is_marked {
            findings.push(
                self.finding(
                    &page.path,
                    format!("Link marked as the current page points to {href}"),
                )
                .at_line(link.line)
                .with_context(&context)
                .with_suggestion("Mark only the link to this page as current"),
            );
        }
    }
}

impl Rule for InteractiveRule {
    fn id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "Links and buttons have targets and accessible names; navigation marks the current page"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Accessibility
    }

    fn check(&self, snapshot: &ProjectSnapshot) -> GuardianResult<Vec<Finding>> {
        let mut findings = Vec::new();

        for page in &snapshot.pages {
            page.root.walk_with_ancestors(&mut |element, ancestors| match element.tag.as_str() {
                "a" => {
                    let in_nav = ancestors.iter().any(|ancestor| ancestor.tag == "nav");
                    self.check_link(page, element, in_nav, &mut findings);
                }
                "button" if !has_accessible_name(element) => findings.push(
                    self.finding(&page.path, "Button has no accessible name")
                        .at_line(element.line)
                        .with_context(line_context(page, element.line))
                        .with_suggestion("Add button text or aria-label"),
                ),
                _ => {}
            });
        }

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathsConfig;

    fn check(path: &str, body: &str) -> Vec<Finding> {
        let mut snapshot = ProjectSnapshot::empty(PathsConfig::default());
        snapshot.add_page(path, &format!("<html><body>\n{body}\n</body></html>"));
        InteractiveRule.check(&snapshot).unwrap()
    }

    fn messages(findings: &[Finding]) -> Vec<&str> {
        findings.iter().map(|f| f.message.as_str()).collect()
    }

    #[test]
    fn test_accessible_names() {
        let findings = check(
            "index.html",
            r#"<a href="about.html">About</a>
<a href="about.html" aria-label="About us"><span></span></a>
<a href="about.html"><img src="i.svg" alt="About"></a>
<a href="about.html"><svg><title>About</title></svg></a>
<a href="about.html"><svg></svg></a>
<button type="button"></button>
<button type="button">Send</button>"#,
        );

        assert_eq!(
            messages(&findings),
            vec!["Link has no accessible name", "Button has no accessible name"]
        );
        assert_eq!(findings[0].line, Some(6));
        assert_eq!(findings[1].line, Some(7));
    }

    #[test]
    fn test_href_checks() {
        let findings = check(
            "index.html",
            r##"<a>Nowhere</a>
<a href="#">Soon</a>
<a href="#contacts">Contacts</a>"##,
        );

        assert_eq!(
            messages(&findings),
            vec!["Link missing href attribute", "Link with href=\"#\" is a placeholder"]
        );
        assert_eq!(findings[1].severity, Severity::Warning);
    }

    #[test]
    fn test_external_links() {
        let findings = check(
            "index.html",
            r#"<a href="https://example.com">Example</a>
<a href="https://example.com" target="_blank">Example</a>
<a href="https://example.com" target="_blank" rel="noopener">Example</a>"#,
        );

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].message, "External link missing target=\"_blank\" attribute");
        assert_eq!(findings[1].severity, Severity::Info);
        assert_eq!(findings[1].line, Some(3));
    }

    #[test]
    fn test_current_page_marking_in_navigation() {
        let findings = check(
            "about.html",
            r#"<nav>
<a href="index.html" class="nav__link nav__link--active">Home</a>
<a href="./about.html">About</a>
<a href="contacts.html">Contacts</a>
</nav>
<a href="about.html">Footer link</a>"#,
        );

        assert_eq!(
            messages(&findings),
            vec![
                "Link marked as the current page points to index.html",
                "Link to the current page should be marked with aria-current=\"page\"",
            ]
        );
        assert_eq!(findings[0].line, Some(3));
        assert_eq!(findings[1].line, Some(4));
    }

    #[test]
    fn test_correctly_marked_navigation_passes() {
        let findings = check(
            "index.html",
            r#"<nav>
<a href="index.html" aria-current="page" class="nav__link nav__link--active">Home</a>
<a href="about.html" class="nav__link">About</a>
</nav>"#,
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn test_targets_page() {
        let mut snapshot = ProjectSnapshot::empty(PathsConfig::default());
        snapshot.add_page("index.html", "<html></html>");
        let page = &snapshot.pages[0];

        assert!(targets_page("index.html", page));
        assert!(targets_page("./index.html#top", page));
        assert!(targets_page("/", page));
        assert!(!targets_page("#top", page));
        assert!(!targets_page("about.html", page));
        assert!(!targets_page("mailto:hi@example.com", page));
    }
}
