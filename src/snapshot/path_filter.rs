//! Path filtering using .gitignore-style patterns
//!
//! Architectural Principle: Service Layer - PathFilter decides which parts of the project tree
//! the loader sees at all
//! - Patterns are evaluated in order, later matches win, `!` re-includes
//! - Paths are always matched relative to the working directory
//! - A `.guardianignore` file at the project root contributes extra patterns

use crate::domain::findings::{GuardianError, GuardianResult};
use std::fs;
use std::path::Path;

/// Name of the optional ignore file at the project root
pub const IGNORE_FILE: &str = ".guardianignore";

/// Decides which project paths are excluded from a snapshot
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    patterns: Vec<FilterPattern>,
}

/// A single path filter pattern
#[derive(Debug, Clone)]
struct FilterPattern {
    /// The glob pattern
    pattern: glob::Pattern,
    /// Whether this re-includes a path (starts with !)
    is_include: bool,
    /// Original pattern string, without the `!`
    original: String,
}

impl FilterPattern {
    fn parse(raw: &str) -> GuardianResult<Self> {
        let (is_include, pattern_str) = match raw.strip_prefix('!') {
            Some(stripped) => (true, stripped),
            None => (false, raw),
        };

        let pattern = glob::Pattern::new(pattern_str.trim_end_matches('/'))
            .map_err(|e| GuardianError::pattern(format!("Invalid pattern '{pattern_str}': {e}")))?;

        Ok(Self {
            pattern,
            is_include,
            original: pattern_str.to_string(),
        })
    }

    /// Gitignore-flavoured matching on a relative path
    fn matches(&self, path: &Path, is_dir: bool) -> bool {
        let path_str = path.to_string_lossy();

        if self.original.ends_with('/') && !is_dir {
            return false;
        }

        let anchored = self.original.starts_with('/') || self.original.trim_end_matches('/').contains('/');
        if anchored {
            let trimmed = self.original.trim_start_matches('/').trim_end_matches('/');
            return glob::Pattern::new(trimmed)
                .map(|p| p.matches(&path_str))
                .unwrap_or(false);
        }

        path.file_name()
            .map(|name| self.pattern.matches(&name.to_string_lossy()))
            .unwrap_or(false)
    }
}

impl PathFilter {
    /// Create a filter from configured patterns
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> GuardianResult<Self> {
        let patterns = patterns
            .iter()
            .map(|p| FilterPattern::parse(p.as_ref()))
            .collect::<GuardianResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Create a filter for a project root, appending its `.guardianignore` patterns
    pub fn for_project<S: AsRef<str>>(root: &Path, patterns: &[S]) -> GuardianResult<Self> {
        let mut filter = Self::new(patterns)?;
        let ignore_file = root.join(IGNORE_FILE);
        if ignore_file.is_file() {
            let content = fs::read_to_string(&ignore_file)?;
            for line in content.lines().map(str::trim) {
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                match FilterPattern::parse(line) {
                    Ok(pattern) => filter.patterns.push(pattern),
                    Err(e) => {
                        tracing::warn!("Skipping pattern in {}: {}", ignore_file.display(), e);
                    }
                }
            }
        }
        Ok(filter)
    }

    /// Add a pattern to the filter
    pub fn add_pattern(&mut self, pattern: &str) -> GuardianResult<()> {
        self.patterns.push(FilterPattern::parse(pattern)?);
        Ok(())
    }

    /// Whether a file, relative to the project root, is excluded
    pub fn is_excluded(&self, relative: &Path) -> bool {
        self.evaluate(relative, false)
    }

    /// Whether a directory is excluded; a directory whose contents are
    /// all excluded by a `dir/**` pattern counts as excluded itself
    pub fn is_dir_excluded(&self, relative: &Path) -> bool {
        self.evaluate(relative, true) || self.evaluate(&relative.join("_"), false)
    }

    fn evaluate(&self, relative: &Path, is_dir: bool) -> bool {
        let mut excluded = false;
        for pattern in &self.patterns {
            if pattern.matches(relative, is_dir) {
                excluded = !pattern.is_include;
            }
        }
        excluded
    }
}
