//! Titles and meta descriptions, unique across the page set

use super::{line_context, Rule};
use crate::domain::findings::{Finding, GuardianResult, RuleCategory};
use crate::snapshot::{Element, HtmlDocument, ProjectSnapshot};
use std::collections::HashMap;
use std::path::Path;

pub const RULE_ID: &str = "html/metadata";

/// Every page needs a title and description, and no two pages may share one.
/// Pages are processed in path order; the first owner of a value wins.
pub struct MetadataRule;

impl MetadataRule {
    fn title(page: &HtmlDocument) -> Option<(&Element, String)> {
        let title = page.elements_by_tag("title").next()?;
        let text = title.text().split_whitespace().collect::<Vec<_>>().join(" ");
        (!text.is_empty()).then_some((title, text))
    }

    fn meta_description(page: &HtmlDocument) -> Option<(&Element, String)> {
        page.elements_by_tag("meta")
            .find(|meta| {
                meta.attr("name")
                    .is_some_and(|name| name.eq_ignore_ascii_case("description"))
            })
            .and_then(|meta| {
                meta.non_empty_attr("content")
                    .map(|content| (meta, content.to_string()))
            })
    }

    fn owner(path: &Path) -> String {
        path.display().to_string()
    }
}

impl Rule for MetadataRule {
    fn id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "Every page has a non-empty, unique title and meta description"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Html
    }

    fn check(&self, snapshot: &ProjectSnapshot) -> GuardianResult<Vec<Finding>> {
        let mut findings = Vec::new();
        let mut titles: HashMap<String, &Path> = HashMap::new();
        let mut descriptions: HashMap<String, &Path> = HashMap::new();

        for page in &snapshot.pages {
            match Self::title(page) {
                None => findings.push(
                    self.finding(&page.path, "Missing or empty title tag")
                        .at_line(page.head_line())
                        .with_suggestion("Describe the page in a <title> inside <head>"),
                ),
                Some((element, text)) => match titles.get(&text) {
                    Some(owner) => findings.push(
                        self.finding(
                            &page.path,
                            format!("Duplicate title \"{text}\" also used in {}", Self::owner(owner)),
                        )
                        .at_line(element.line)
                        .with_context(line_context(page, element.line)),
                    ),
                    None => {
                        titles.insert(text, &page.path);
                    }
                },
            }

            match Self::meta_description(page) {
                None => findings.push(
                    self.finding(&page.path, "Missing or empty meta description")
                        .at_line(page.head_line())
                        .with_suggestion("Add <meta name=\"description\" content=\"...\">"),
                ),
                Some((element, text)) => match descriptions.get(&text) {
                    Some(owner) => findings.push(
                        self.finding(
                            &page.path,
                            format!("Duplicate meta description also used in {}", Self::owner(owner)),
                        )
                        .at_line(element.line)
                        .with_context(line_context(page, element.line)),
                    ),
                    None => {
                        descriptions.insert(text, &page.path);
                    }
                },
            }
        }

        Ok(findings)
    }
}
