//! Project snapshot: every page, stylesheet, image and tree entry of one run
//!
//! Architecture: Repository Pattern - the snapshot is the only thing rules see
//! - Loaded once per run, then shared read-only across rules
//! - Paths are stored relative to the working directory
//! - Missing optional directories produce empty collections, not errors

pub mod css;
pub mod html;
pub mod path_filter;

pub use css::{CssNode, CssParseError, Declaration, FlatRule, Stylesheet};
pub use html::{Element, HtmlDocument, Node};
pub use path_filter::PathFilter;

use crate::config::PathsConfig;
use crate::domain::findings::{GuardianError, GuardianResult};
use rayon::prelude::*;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File extensions recognised as images
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "svg", "webp"];

/// Image formats whose pixel dimensions are read
pub const RASTER_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Name of the entry page every project must have
pub const INDEX_PAGE: &str = "index.html";

/// A stylesheet source with its parse outcome
#[derive(Debug, Clone)]
pub struct StylesheetSource {
    /// Path relative to the working directory
    pub path: PathBuf,
    pub source: String,
    pub parsed: Result<Stylesheet, CssParseError>,
}

impl StylesheetSource {
    pub fn parse(path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        let source = source.into();
        let parsed = Stylesheet::parse(&source);
        Self {
            path: path.into(),
            source,
            parsed,
        }
    }

    /// Third-party reset stylesheets such as normalize.css
    pub fn is_vendor(&self) -> bool {
        file_name_of(&self.path).to_ascii_lowercase().contains("normalize")
    }

    /// The parsed tree, when parsing succeeded
    pub fn stylesheet(&self) -> Option<&Stylesheet> {
        self.parsed.as_ref().ok()
    }
}

/// An image file found in the images or generated assets directory
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAsset {
    /// Path relative to the working directory
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Whether the image lives under the generated assets directory
    pub in_assets: bool,
    /// Pixel dimensions for raster assets, or the reason they could not be read
    pub dimensions: Option<Result<(u32, u32), String>>,
}

/// A file or directory in the project tree
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TreeEntry {
    /// Path relative to the working directory
    pub path: PathBuf,
    pub is_dir: bool,
}

impl TreeEntry {
    pub fn file_name(&self) -> String {
        file_name_of(&self.path)
    }
}

/// In-memory view of the checked project
#[derive(Debug, Clone)]
pub struct ProjectSnapshot {
    /// Absolute or caller-given working directory
    pub root: PathBuf,
    /// Layout the snapshot was loaded with
    pub paths: PathsConfig,
    /// Top-level HTML pages, sorted by name
    pub pages: Vec<HtmlDocument>,
    /// Stylesheets under the styles directory, sorted by path
    pub stylesheets: Vec<StylesheetSource>,
    /// Images under the images and generated assets directories
    pub images: Vec<ImageAsset>,
    /// Every non-excluded file and directory, sorted by path
    pub entries: Vec<TreeEntry>,
    /// Files that existed but could not be read
    pub unreadable: Vec<(PathBuf, String)>,
}

impl ProjectSnapshot {
    /// Empty snapshot rooted at the given layout
    pub fn empty(paths: PathsConfig) -> Self {
        Self {
            root: paths.working_dir.clone(),
            paths,
            pages: Vec::new(),
            stylesheets: Vec::new(),
            images: Vec::new(),
            entries: Vec::new(),
            unreadable: Vec::new(),
        }
    }

    /// Load every relevant file under the working directory
    pub fn load(paths: &PathsConfig) -> GuardianResult<Self> {
        let root = paths.working_dir.clone();
        if !root.is_dir() {
            return Err(GuardianError::missing_directory(&root));
        }

        let filter = PathFilter::for_project(&root, &paths.exclude)?;
        let mut snapshot = Self::empty(paths.clone());

        snapshot.entries = walk_entries(&root, &filter, &mut snapshot.unreadable);
        tracing::debug!("Found {} entries under {}", snapshot.entries.len(), root.display());

        let page_files = snapshot.list_files(&paths.html_path(), false, &filter, &["html"]);
        let style_files = snapshot.list_files(&paths.styles_path(), true, &filter, &["css", "scss"]);

        let pages: Vec<_> = page_files
            .par_iter()
            .map(|rel| read_text(&root, rel).map(|source| HtmlDocument::parse(rel.clone(), source)))
            .collect();
        let stylesheets: Vec<_> = style_files
            .par_iter()
            .map(|rel| read_text(&root, rel).map(|source| StylesheetSource::parse(rel.clone(), source)))
            .collect();

        for (rel, result) in page_files.iter().zip(pages) {
            match result {
                Ok(page) => snapshot.pages.push(page),
                Err(e) => snapshot.record_unreadable(rel, e),
            }
        }
        for (rel, result) in style_files.iter().zip(stylesheets) {
            match result {
                Ok(sheet) => snapshot.stylesheets.push(sheet),
                Err(e) => snapshot.record_unreadable(rel, e),
            }
        }

        let image_files = snapshot.list_files(&paths.images_path(), true, &filter, IMAGE_EXTENSIONS);
        let asset_dir = root.join(paths.asset_images_dir());
        let asset_files = snapshot.list_files(&asset_dir, true, &filter, IMAGE_EXTENSIONS);

        let images = image_files
            .into_iter()
            .map(|rel| (rel, false))
            .chain(asset_files.into_iter().map(|rel| (rel, true)));
        for (rel, in_assets) in images {
            if snapshot.images.iter().any(|image| image.path == rel) {
                continue;
            }
            match load_image(&root, &rel, in_assets) {
                Ok(image) => snapshot.images.push(image),
                Err(e) => snapshot.record_unreadable(&rel, e),
            }
        }

        tracing::debug!(
            "Loaded {} pages, {} stylesheets, {} images",
            snapshot.pages.len(),
            snapshot.stylesheets.len(),
            snapshot.images.len()
        );

        Ok(snapshot)
    }

    fn record_unreadable(&mut self, rel: &Path, error: impl fmt::Display) {
        record_unreadable(&mut self.unreadable, rel, error);
    }

    /// Files with one of the extensions under `dir`, relative to the root, sorted.
    /// Entries that cannot be listed or inspected are recorded as unreadable.
    fn list_files(
        &mut self,
        dir: &Path,
        recursive: bool,
        filter: &PathFilter,
        extensions: &[&str],
    ) -> Vec<PathBuf> {
        if !dir.is_dir() {
            tracing::debug!("Directory {} not present", dir.display());
            return Vec::new();
        }

        let root = self.root.clone();
        let max_depth = if recursive { usize::MAX } else { 1 };
        let walker = WalkDir::new(dir)
            .max_depth(max_depth)
            .into_iter()
            .filter_entry(|entry| {
                !(entry.file_type().is_dir() && filter.is_dir_excluded(&relative_to(&root, entry.path())))
            });

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let rel = e.path().map_or_else(|| relative_to(&root, dir), |path| relative_to(&root, path));
                    self.record_unreadable(&rel, e);
                    continue;
                }
            };
            // symlinks are kept so that a dangling one fails loudly when read
            if !(entry.file_type().is_file() || entry.path_is_symlink()) {
                continue;
            }
            let rel = relative_to(&root, entry.path());
            let wanted = extension_of(&rel).is_some_and(|ext| extensions.contains(&ext.as_str()));
            if wanted && !filter.is_excluded(&rel) {
                files.push(rel);
            }
        }
        files.sort();
        files
    }

    /// Add a page parsed from source
    pub fn add_page(&mut self, path: impl Into<PathBuf>, source: &str) {
        let path = path.into();
        self.add_entry(&path, false);
        self.pages.push(HtmlDocument::parse(path, source));
        self.pages.sort_by(|a, b| a.path.cmp(&b.path));
    }

    /// Add a stylesheet parsed from source
    pub fn add_stylesheet(&mut self, path: impl Into<PathBuf>, source: &str) {
        let path = path.into();
        self.add_entry(&path, false);
        self.stylesheets.push(StylesheetSource::parse(path, source));
        self.stylesheets.sort_by(|a, b| a.path.cmp(&b.path));
    }

    /// Add a tree entry along with its parent directories
    pub fn add_entry(&mut self, path: &Path, is_dir: bool) {
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            let entry = TreeEntry {
                path: ancestor.to_path_buf(),
                is_dir: true,
            };
            if !self.entries.contains(&entry) {
                self.entries.push(entry);
            }
        }
        let entry = TreeEntry {
            path: path.to_path_buf(),
            is_dir,
        };
        if !self.entries.contains(&entry) {
            self.entries.push(entry);
        }
        self.entries.sort();
    }

    /// Page by file path relative to the working directory
    pub fn page(&self, path: &Path) -> Option<&HtmlDocument> {
        self.pages.iter().find(|page| page.path == path)
    }

    /// The entry page, used as the reference for cross-page checks
    pub fn index_page(&self) -> Option<&HtmlDocument> {
        self.pages.iter().find(|page| page.file_name() == INDEX_PAGE)
    }

    /// Stylesheets written by the project authors
    pub fn authored_stylesheets(&self) -> impl Iterator<Item = &StylesheetSource> {
        self.stylesheets.iter().filter(|sheet| !sheet.is_vendor())
    }

    /// Whether a file exists in the tree
    pub fn contains_file(&self, path: &Path) -> bool {
        let path = normalize_relative(path);
        self.entries.iter().any(|entry| !entry.is_dir && entry.path == path)
    }

    /// Whether a directory exists in the tree
    pub fn contains_dir(&self, path: &Path) -> bool {
        let path = normalize_relative(path);
        self.entries.iter().any(|entry| entry.is_dir && entry.path == path)
    }

    /// Number of source files (pages and stylesheets)
    pub fn total_files(&self) -> usize {
        self.pages.len() + self.stylesheets.len()
    }
}

/// Resolve `.` and `..` lexically; leading `..` segments are kept
pub fn normalize_relative(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    parts.iter().collect()
}

/// Lowercased extension of a path
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn relative_to(root: &Path, path: &Path) -> PathBuf {
    normalize_relative(path.strip_prefix(root).unwrap_or(path))
}

fn record_unreadable(unreadable: &mut Vec<(PathBuf, String)>, rel: &Path, error: impl fmt::Display) {
    if unreadable.iter().any(|(path, _)| path == rel) {
        return;
    }
    tracing::warn!("Could not read {}: {}", rel.display(), error);
    unreadable.push((rel.to_path_buf(), error.to_string()));
}

fn walk_entries(
    root: &Path,
    filter: &PathFilter,
    unreadable: &mut Vec<(PathBuf, String)>,
) -> Vec<TreeEntry> {
    let mut entries = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let rel = relative_to(root, entry.path());
            if entry.file_type().is_dir() {
                !filter.is_dir_excluded(&rel)
            } else {
                !filter.is_excluded(&rel)
            }
        });

    for entry in walker {
        match entry {
            Ok(entry) => entries.push(TreeEntry {
                path: relative_to(root, entry.path()),
                is_dir: entry.file_type().is_dir(),
            }),
            Err(e) => {
                let rel = e.path().map_or_else(|| PathBuf::from("."), |path| relative_to(root, path));
                record_unreadable(unreadable, &rel, e);
            }
        }
    }
    entries.sort();
    entries
}

fn read_text(root: &Path, rel: &Path) -> std::io::Result<String> {
    let bytes = fs::read(root.join(rel))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn load_image(root: &Path, rel: &Path, in_assets: bool) -> std::io::Result<ImageAsset> {
    let full = root.join(rel);
    let size_bytes = fs::metadata(&full)?.len();

    let is_raster = extension_of(rel)
        .map(|ext| RASTER_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false);
    let dimensions = (in_assets && is_raster)
        .then(|| image::image_dimensions(&full).map_err(|e| e.to_string()));

    Ok(ImageAsset {
        path: rel.to_path_buf(),
        size_bytes,
        in_assets,
        dimensions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("styles/blocks")).unwrap();
        fs::create_dir_all(root.join("images")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("index.html"), "<!DOCTYPE html><html><body></body></html>").unwrap();
        fs::write(root.join("about.html"), "<html></html>").unwrap();
        fs::write(root.join("styles/main.scss"), ".a { color: #fff; }").unwrap();
        fs::write(root.join("styles/blocks/card.css"), ".card {").unwrap();
        fs::write(root.join("styles/normalize.css"), "html { line-height: 1.15; }").unwrap();
        fs::write(root.join("images/logo.svg"), "<svg></svg>").unwrap();
        fs::write(root.join("node_modules/pkg/index.html"), "<html></html>").unwrap();
        temp_dir
    }

    fn layout(root: &Path) -> PathsConfig {
        PathsConfig {
            working_dir: root.to_path_buf(),
            ..PathsConfig::default()
        }
    }

    #[test]
    fn test_load_collects_sorted_relative_files() {
        let temp_dir = project();
        let snapshot = ProjectSnapshot::load(&layout(temp_dir.path())).unwrap();

        let pages: Vec<_> = snapshot.pages.iter().map(|p| p.path.clone()).collect();
        assert_eq!(pages, vec![PathBuf::from("about.html"), PathBuf::from("index.html")]);

        let sheets: Vec<_> = snapshot.stylesheets.iter().map(|s| s.path.clone()).collect();
        assert_eq!(
            sheets,
            vec![
                PathBuf::from("styles/blocks/card.css"),
                PathBuf::from("styles/main.scss"),
                PathBuf::from("styles/normalize.css"),
            ]
        );
        assert!(snapshot.stylesheets[0].parsed.is_err());
        assert_eq!(snapshot.authored_stylesheets().count(), 2);

        assert_eq!(snapshot.images.len(), 1);
        assert!(snapshot.images[0].dimensions.is_none());
        assert_eq!(snapshot.total_files(), 5);
    }

    #[test]
    fn test_excluded_paths_are_invisible() {
        let temp_dir = project();
        let snapshot = ProjectSnapshot::load(&layout(temp_dir.path())).unwrap();

        assert!(snapshot.contains_dir(Path::new("styles/blocks")));
        assert!(snapshot.contains_file(Path::new("./images/logo.svg")));
        assert!(!snapshot
            .entries
            .iter()
            .any(|entry| entry.path.starts_with("node_modules")));
    }

    #[test]
    fn test_missing_working_dir_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let result = ProjectSnapshot::load(&layout(&temp_dir.path().join("missing")));
        assert!(matches!(result, Err(GuardianError::Io { .. })));
    }

    #[test]
    fn test_missing_subdirectories_yield_empty_collections() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("index.html"), "<html></html>").unwrap();

        let snapshot = ProjectSnapshot::load(&layout(temp_dir.path())).unwrap();
        assert_eq!(snapshot.pages.len(), 1);
        assert!(snapshot.stylesheets.is_empty());
        assert!(snapshot.images.is_empty());
    }

    #[test]
    fn test_asset_dimensions_are_read() {
        let temp_dir = TempDir::new().unwrap();
        let asset_dir = temp_dir.path().join("assets/images");
        fs::create_dir_all(&asset_dir).unwrap();
        image::RgbImage::new(3, 2).save(asset_dir.join("hero.png")).unwrap();
        fs::write(asset_dir.join("broken.jpg"), b"not an image").unwrap();

        let snapshot = ProjectSnapshot::load(&layout(temp_dir.path())).unwrap();
        let hero = snapshot
            .images
            .iter()
            .find(|image| image.path.ends_with("hero.png"))
            .unwrap();
        assert!(hero.in_assets);
        assert_eq!(hero.dimensions, Some(Ok((3, 2))));

        let broken = snapshot
            .images
            .iter()
            .find(|image| image.path.ends_with("broken.jpg"))
            .unwrap();
        assert!(matches!(broken.dimensions, Some(Err(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_image_symlink_is_recorded_as_unreadable() {
        let temp_dir = project();
        let root = temp_dir.path();
        std::os::unix::fs::symlink(root.join("images/gone.png"), root.join("images/hero.png")).unwrap();
        std::os::unix::fs::symlink(root.join("styles/gone.scss"), root.join("styles/broken.scss")).unwrap();

        let snapshot = ProjectSnapshot::load(&layout(root)).unwrap();
        let unreadable: Vec<_> = snapshot.unreadable.iter().map(|(path, _)| path.clone()).collect();

        assert_eq!(
            unreadable,
            vec![PathBuf::from("styles/broken.scss"), PathBuf::from("images/hero.png")]
        );
        assert!(!snapshot.images.iter().any(|image| image.path.ends_with("hero.png")));
        assert!(snapshot.contains_file(Path::new("images/hero.png")));
    }

    #[test]
    fn test_in_memory_snapshot_tracks_entries() {
        let mut snapshot = ProjectSnapshot::empty(PathsConfig::default());
        snapshot.add_stylesheet("styles/blocks/card.scss", ".card { }");

        assert!(snapshot.contains_dir(Path::new("styles")));
        assert!(snapshot.contains_dir(Path::new("styles/blocks")));
        assert!(snapshot.contains_file(Path::new("styles/blocks/card.scss")));
    }

    #[test]
    fn test_normalize_relative() {
        assert_eq!(normalize_relative(Path::new("./a/../b/c")), PathBuf::from("b/c"));
        assert_eq!(normalize_relative(Path::new("../x")), PathBuf::from("../x"));
    }
}
