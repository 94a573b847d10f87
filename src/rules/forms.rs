//! Forms: submission targets, control names, labels and grouping

use super::{line_context, Rule};
use crate::domain::findings::{Finding, GuardianResult, RuleCategory, Severity};
use crate::snapshot::{Element, HtmlDocument, ProjectSnapshot};
use std::collections::{BTreeMap, HashSet};

pub const RULE_ID: &str = "html/forms";

const CONTROL_TAGS: &[&str] = &["input", "textarea", "select"];

/// Input types that submit or reset a form rather than carry a value
const ACTION_INPUT_TYPES: &[&str] = &["submit", "button", "reset", "image"];

pub struct FormsRule;

/// A form control with what its ancestors say about it
struct Control<'a> {
    element: &'a Element,
    in_form: bool,
    in_label: bool,
    in_fieldset: bool,
}

impl Control<'_> {
    fn input_type(&self) -> Option<String> {
        self.element
            .non_empty_attr("type")
            .map(str::to_ascii_lowercase)
    }

    /// Submit buttons, resets and hidden inputs have nothing to label
    fn needs_label(&self) -> bool {
        match self.input_type() {
            Some(kind) => kind != "hidden" && !ACTION_INPUT_TYPES.contains(&kind.as_str()),
            None => true,
        }
    }

    fn needs_name(&self) -> bool {
        self.input_type()
            .map_or(true, |kind| !ACTION_INPUT_TYPES.contains(&kind.as_str()))
    }
}

impl FormsRule {
    fn check_page(&self, page: &HtmlDocument, findings: &mut Vec<Finding>) {
        let mut controls = Vec::new();
        let mut label_targets = HashSet::new();

        page.root.walk_with_ancestors(&mut |element, ancestors| {
            let has_ancestor = |tag: &str| ancestors.iter().any(|ancestor| ancestor.tag == tag);
            match element.tag.as_str() {
                "form" if element.attr("action").is_none() => findings.push(
                    self.finding(&page.path, "Form missing action attribute")
                        .at_line(element.line)
                        .with_context(line_context(page, element.line)),
                ),
                "fieldset" => {
                    let starts_with_legend = element
                        .child_elements()
                        .next()
                        .is_some_and(|first| first.tag == "legend");
                    if !starts_with_legend {
                        findings.push(
                            self.finding(&page.path, "Fieldset should start with a legend")
                                .at_line(element.line)
                                .with_context(line_context(page, element.line)),
                        );
                    }
                }
                "label" => {
                    if let Some(target) = element.non_empty_attr("for") {
                        label_targets.insert(target.to_string());
                    }
                }
                tag if CONTROL_TAGS.contains(&tag) => controls.push(Control {
                    element,
                    in_form: has_ancestor("form"),
                    in_label: has_ancestor("label"),
                    in_fieldset: has_ancestor("fieldset"),
                }),
                _ => {}
            }
        });

        let mut groups: BTreeMap<String, Vec<&Control<'_>>> = BTreeMap::new();

        for control in &controls {
            let element = control.element;
            let context = line_context(page, element.line);

            if element.tag == "input" && element.non_empty_attr("type").is_none() {
                findings.push(
                    self.finding(&page.path, "Input missing type attribute")
                        .at_line(element.line)
                        .with_context(&context),
                );
            }

            if control.in_form && control.needs_name() && element.non_empty_attr("name").is_none() {
                findings.push(
                    self.finding(&page.path, "Form control missing name attribute")
                        .at_line(element.line)
                        .with_context(&context),
                );
            }

            if control.needs_label() {
                let labelled_by_element = control.in_label
                    || element
                        .non_empty_attr("id")
                        .is_some_and(|id| label_targets.contains(id));
                let labelled_by_aria = element.non_empty_attr("aria-label").is_some()
                    || element.non_empty_attr("aria-labelledby").is_some();

                if !labelled_by_element && labelled_by_aria {
                    findings.push(
                        self.finding(&page.path, "Form control is labelled only through ARIA")
                            .with_severity(Severity::Warning)
                            .at_line(element.line)
                            .with_context(&context)
                            .with_suggestion("Prefer a visible <label for=\"...\">"),
                    );
                } else if !labelled_by_element {
                    findings.push(
                        self.finding(&page.path, "Form control has no associated label")
                            .at_line(element.line)
                            .with_context(&context)
                            .with_suggestion("Wrap the control in <label> or point a label at its id"),
                    );
                }
            }

            if matches!(control.input_type().as_deref(), Some("radio" | "checkbox")) {
                if let Some(name) = element.non_empty_attr("name") {
                    groups.entry(name.to_string()).or_default().push(control);
                }
            }
        }

        for (name, members) in groups {
            if members.len() < 2 || members.iter().all(|member| member.in_fieldset) {
                continue;
            }
            let first = members[0].element;
            findings.push(
                self.finding(
                    &page.path,
                    format!("Related controls \"{name}\" should be grouped in a fieldset"),
                )
                .at_line(first.line)
                .with_context(line_context(page, first.line))
                .with_suggestion("Wrap the group in <fieldset> with a <legend>"),
            );
        }
    }
}

impl Rule for FormsRule {
    fn id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "Forms have an action, named and labelled controls, and grouped choices"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Accessibility
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

    fn check(body: &str) -> Vec<Finding> {
        let mut snapshot = ProjectSnapshot::empty(PathsConfig::default());
        snapshot.add_page("index.html", &format!("<html><body>\n{body}\n</body></html>"));
        FormsRule.check(&snapshot).unwrap()
    }

    fn messages(findings: &[Finding]) -> Vec<&str> {
        findings.iter().map(|f| f.message.as_str()).collect()
    }

    #[test]
    fn test_labelled_form_passes() {
        let findings = check(
            r#"<form action="/send" method="post">
<label for="email">Email</label>
<input id="email" type="email" name="email">
<label>Message <textarea name="message"></textarea></label>
<fieldset>
<legend>Plan</legend>
<label><input type="radio" name="plan" value="a"> A</label>
<label><input type="radio" name="plan" value="b"> B</label>
</fieldset>
<input type="hidden" name="token" value="x">
<button type="submit">Send</button>
<input type="submit" value="Send">
</form>"#,
        );
        assert!(findings.is_empty(), "{:?}", messages(&findings));
    }

    #[test]
    fn test_form_attributes() {
        let findings = check(
            r#"<form>
<label>Name <input name="name"></label>
<label>City <input type="text"></label>
</form>"#,
        );

        assert_eq!(
            messages(&findings),
            vec![
                "Form missing action attribute",
                "Input missing type attribute",
                "Form control missing name attribute",
            ]
        );
        assert_eq!(findings[0].line, Some(2));
        assert_eq!(findings[1].line, Some(3));
        assert_eq!(findings[2].line, Some(4));
    }

    #[test]
    fn test_label_association() {
        let findings = check(
            r#"<input type="text" id="search">
<input type="text" aria-label="Search">
<label for="other">Other</label>"#,
        );

        assert_eq!(
            messages(&findings),
            vec![
                "Form control has no associated label",
                "Form control is labelled only through ARIA",
            ]
        );
        assert_eq!(findings[1].severity, Severity::Warning);
    }

    #[test]
    fn test_choice_groups_need_fieldset() {
        let findings = check(
            r#"<fieldset>
<label><input type="checkbox" name="news"> News</label>
</fieldset>
<label><input type="radio" name="size" value="s"> S</label>
<label><input type="radio" name="size" value="m"> M</label>"#,
        );

        assert_eq!(
            messages(&findings),
            vec![
                "Fieldset should start with a legend",
                "Related controls \"size\" should be grouped in a fieldset",
            ]
        );
        assert_eq!(findings[1].line, Some(5));
    }
}
