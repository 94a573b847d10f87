//! Project layout: required directories, entry page, file naming and stray files

use super::Rule;
use crate::analyzer::PROJECT_PATH;
use crate::domain::findings::{Finding, GuardianResult, RuleCategory};
use crate::snapshot::{
    extension_of, normalize_relative, ProjectSnapshot, TreeEntry, IMAGE_EXTENSIONS, INDEX_PAGE,
};
use std::path::{Path, PathBuf};

pub const RULE_ID: &str = "structure/project";

/// OS metadata files that never belong in a repository
const SYSTEM_FILES: &[&str] = &[".DS_Store", "Thumbs.db"];

/// Conventional upper-case file names
const UPPERCASE_EXEMPT: &[&str] = &["README.md", "LICENSE", "CHANGELOG.md"];

/// Archives, backups and editor leftovers
const UNNECESSARY_EXTENSIONS: &[&str] = &["zip", "rar", "7z", "bak", "tmp"];

const STYLE_EXTENSIONS: &[&str] = &["css", "scss"];

pub(crate) fn is_system_file(name: &str) -> bool {
    SYSTEM_FILES.contains(&name)
}

fn has_forbidden_characters(name: &str) -> bool {
    name.chars()
        .any(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ')))
}

fn is_unnecessary(entry: &TreeEntry) -> bool {
    entry.file_name().ends_with('~')
        || extension_of(&entry.path).is_some_and(|ext| UNNECESSARY_EXTENSIONS.contains(&ext.as_str()))
}

/// Configured directory relative to the working directory; `None` for the root itself
fn configured_dir(dir: &str) -> Option<PathBuf> {
    let path = normalize_relative(Path::new(dir));
    (!path.as_os_str().is_empty()).then_some(path)
}

pub struct ProjectStructureRule;

impl ProjectStructureRule {
    fn check_layout(&self, snapshot: &ProjectSnapshot, findings: &mut Vec<Finding>) {
        let paths = &snapshot.paths;
        for dir in [&paths.styles_dir, &paths.images_dir, &paths.assets_dir] {
            let Some(relative) = configured_dir(dir) else {
                continue;
            };
            if !snapshot.contains_dir(&relative) {
                findings.push(
                    self.finding(PROJECT_PATH, format!("Required directory not found: {dir}"))
                        .with_suggestion(format!("Create the {dir}/ directory")),
                );
            }
        }

        let index = Path::new(&paths.html_dir).join(INDEX_PAGE);
        if !snapshot.contains_file(&index) {
            findings.push(self.finding(PROJECT_PATH, "Main page (index.html) not found in root directory"));
        }
    }

    fn check_entries(&self, snapshot: &ProjectSnapshot, findings: &mut Vec<Finding>) {
        for entry in snapshot.entries.iter().filter(|entry| !entry.is_dir) {
            let name = entry.file_name();
            let shown = entry.path.display();

            if is_system_file(&name) {
                findings.push(
                    self.finding(&entry.path, format!("System file found in repository: {shown}"))
                        .with_suggestion("Delete it and add it to .gitignore"),
                );
                continue;
            }
            if name != name.to_lowercase() && !UPPERCASE_EXEMPT.contains(&name.as_str()) {
                findings.push(self.finding(&entry.path, format!("File name should be lowercase: {shown}")));
            }
            if name.contains(' ') {
                findings.push(
                    self.finding(&entry.path, format!("File name should not contain spaces: {shown}"))
                        .with_suggestion("Use hyphens between words"),
                );
            }
            if has_forbidden_characters(&name) {
                findings.push(self.finding(
                    &entry.path,
                    format!("File name contains forbidden characters: {shown}"),
                ));
            }
            if is_unnecessary(entry) {
                findings.push(self.finding(&entry.path, format!("Unnecessary file found: {shown}")));
            }
        }

        for page in snapshot.pages.iter().filter(|page| page.source.trim().is_empty()) {
            findings.push(self.finding(&page.path, format!("Empty HTML file: {}", page.path.display())));
        }

        for (path, error) in &snapshot.unreadable {
            findings.push(self.finding(path, format!("File could not be read: {error}")));
        }
    }

    fn check_styles_dir(&self, snapshot: &ProjectSnapshot, findings: &mut Vec<Finding>) {
        let Some(styles) = configured_dir(&snapshot.paths.styles_dir) else {
            return;
        };
        if !snapshot.contains_dir(&styles) {
            return;
        }

        if !snapshot.stylesheets.iter().any(|sheet| sheet.is_vendor()) {
            findings.push(
                self.finding(&styles, "Normalize.css not found in styles directory")
                    .with_suggestion("Add normalize.css to the styles directory"),
            );
        }

        for entry in files_under(snapshot, &styles) {
            let is_style = extension_of(&entry.path)
                .is_some_and(|ext| STYLE_EXTENSIONS.contains(&ext.as_str()));
            if !is_style && !is_system_file(&entry.file_name()) {
                findings.push(self.finding(
                    &entry.path,
                    format!("Non-style file found in styles directory: {}", entry.path.display()),
                ));
            }
        }
    }

    fn check_images_dir(&self, snapshot: &ProjectSnapshot, findings: &mut Vec<Finding>) {
        let Some(images) = configured_dir(&snapshot.paths.images_dir) else {
            return;
        };

        for entry in files_under(snapshot, &images) {
            let is_image = extension_of(&entry.path)
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()));
            if !is_image && !is_system_file(&entry.file_name()) {
                findings.push(self.finding(
                    &entry.path,
                    format!("Non-image file found in images directory: {}", entry.path.display()),
                ));
            }
        }
    }
}

fn files_under<'a>(snapshot: &'a ProjectSnapshot, dir: &'a Path) -> impl Iterator<Item = &'a TreeEntry> {
    snapshot
        .entries
        .iter()
        .filter(move |entry| !entry.is_dir && entry.path.starts_with(dir))
}

impl Rule for ProjectStructureRule {
    fn id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "Required directories and entry page exist; files are named cleanly and nothing stray is committed"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Structure
    }

    fn check(&self, snapshot: &ProjectSnapshot) -> GuardianResult<Vec<Finding>> {
        let mut findings = Vec::new();
        self.check_layout(snapshot, &mut findings);
        self.check_entries(snapshot, &mut findings);
        self.check_styles_dir(snapshot, &mut findings);
        self.check_images_dir(snapshot, &mut findings);
        Ok(findings)
    }
}
