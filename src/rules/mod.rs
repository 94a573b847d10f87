//! Rule trait and the built-in rule catalog
//!
//! Each rule is a pure function of the project snapshot. Rules never see
//! each other's output; cross-page checks read the entry page straight from
//! the snapshot.

use crate::config::GuardianConfig;
use crate::domain::findings::{Finding, GuardianResult, RuleCategory};
use crate::snapshot::{HtmlDocument, ProjectSnapshot};
use std::path::PathBuf;

pub mod bem;
pub mod conformance;
pub mod document;
pub mod forms;
pub mod images;
pub mod interactive;
pub mod layout;
pub mod metadata;
pub mod structure;
pub mod styles;
pub mod typography;

/// A named check over the whole project
pub trait Rule: Send + Sync {
    /// Unique identifier, e.g. `bem/class-naming`
    fn id(&self) -> &'static str;

    /// Human-readable description
    fn description(&self) -> &'static str;

    /// Family used to group findings
    fn category(&self) -> RuleCategory;

    /// Run the check over a loaded snapshot
    fn check(&self, snapshot: &ProjectSnapshot) -> GuardianResult<Vec<Finding>>;

    /// Start an error-level finding attributed to this rule
    fn finding(&self, file: impl Into<PathBuf>, message: impl Into<String>) -> Finding
    where
        Self: Sized,
    {
        Finding::new(self.id(), self.category(), file, message)
    }
}

/// Every built-in rule id, in registry order
pub const RULE_IDS: &[&str] = &[
    bem::CLASS_NAMING,
    bem::UNNECESSARY_WRAPPER,
    document::RULE_ID,
    metadata::RULE_ID,
    interactive::RULE_ID,
    forms::RULE_ID,
    images::PAGE_IMAGES,
    layout::RULE_ID,
    typography::RULE_ID,
    styles::syntax::RULE_ID,
    styles::nesting::RULE_ID,
    styles::states::RULE_ID,
    styles::background::RULE_ID,
    styles::comments::RULE_ID,
    styles::colors::FORMAT_RULE_ID,
    styles::colors::DUPLICATE_RULE_ID,
    styles::units::RULE_ID,
    styles::declarations::RULE_ID,
    images::ASSET_IMAGES,
    structure::RULE_ID,
    conformance::RULE_ID,
];

/// Instantiate the catalog for a configuration. The external conformance
/// rule is only built when it is enabled, since it needs network access.
pub fn all_rules(config: &GuardianConfig) -> GuardianResult<Vec<Box<dyn Rule>>> {
    let limits = &config.limits;
    let mut rules: Vec<Box<dyn Rule>> = vec![
        Box::new(bem::ClassNamingRule),
        Box::new(bem::UnnecessaryWrapperRule),
        Box::new(document::DocumentRule::new(limits.min_semantic_tags)),
        Box::new(metadata::MetadataRule),
        Box::new(interactive::InteractiveRule),
        Box::new(forms::FormsRule),
        Box::new(images::PageImagesRule),
        Box::new(layout::LayoutConsistencyRule),
        Box::new(typography::ParagraphTypographyRule),
        Box::new(styles::syntax::SyntaxRule),
        Box::new(styles::nesting::NestingDepthRule::new(limits.max_nesting_depth)),
        Box::new(styles::states::InteractiveStatesRule),
        Box::new(styles::background::BackgroundFallbackRule),
        Box::new(styles::comments::CommentedCodeRule),
        Box::new(styles::colors::ColorFormatRule),
        Box::new(styles::colors::DuplicateColorsRule),
        Box::new(styles::units::UnitsRule),
        Box::new(styles::declarations::DeclarationsRule),
        Box::new(images::AssetImagesRule::new(
            limits.max_image_dimension,
            limits.max_image_bytes,
        )),
        Box::new(structure::ProjectStructureRule),
    ];

    if config.conformance.enabled {
        let validator = conformance::NuHtmlValidator::new(&config.conformance)?;
        rules.push(Box::new(conformance::ConformanceRule::new(Box::new(validator))));
    }

    Ok(rules)
}

/// Trimmed source line used as finding context
pub(crate) fn line_context(page: &HtmlDocument, line: u32) -> String {
    let text = page.source_line(line).unwrap_or("").trim();
    truncate(text, 160)
}

/// Cut overly long context at a character boundary
pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}
