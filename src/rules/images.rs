//! Image rules: `<img>` markup on pages and the generated image assets

use super::structure::is_system_file;
use super::{line_context, Rule};
use crate::domain::findings::{Finding, GuardianResult, RuleCategory, Severity};
use crate::snapshot::{
    extension_of, normalize_relative, Element, HtmlDocument, ProjectSnapshot, IMAGE_EXTENSIONS,
};
use std::path::{Path, PathBuf};

pub const PAGE_IMAGES: &str = "html/images";
pub const ASSET_IMAGES: &str = "images/assets";

/// Formats that need no further optimisation
const OPTIMIZED_EXTENSIONS: &[&str] = &["webp", "svg"];

/// Every `<img>` must describe itself, reserve its box and point at an
/// optimised file that exists in the project
pub struct PageImagesRule;

impl PageImagesRule {
    fn check_image(
        &self,
        snapshot: &ProjectSnapshot,
        page: &HtmlDocument,
        image: &Element,
        findings: &mut Vec<Finding>,
    ) {
        let context = line_context(page, image.line);
        let report = |message: String| {
            self.finding(&page.path, message)
                .at_line(image.line)
                .with_context(&context)
        };

        if !image.has_attr("alt") {
            findings.push(
                report("Image missing alt attribute".to_string())
                    .with_suggestion("Describe the image, or use alt=\"\" for decoration"),
            );
        }
        if image.non_empty_attr("width").is_none() || image.non_empty_attr("height").is_none() {
            findings.push(
                report("Image missing width or height attribute".to_string())
                    .with_suggestion("Set the intrinsic width and height to avoid layout shift"),
            );
        }

        let Some(src) = image.non_empty_attr("src") else {
            findings.push(report("Image missing src attribute".to_string()));
            return;
        };
        if src.starts_with("data:") {
            return;
        }

        let lowered = src.to_ascii_lowercase();
        if lowered.starts_with("http://")
            || lowered.starts_with("https://")
            || src.starts_with("//")
            || src.starts_with('/')
        {
            findings.push(
                report(format!("Image path should be relative: {src}"))
                    .with_suggestion("Reference images relative to the page, e.g. images/photo.webp"),
            );
            return;
        }

        let target = resolve_src(&page.path, src);
        let is_optimized = extension_of(&target)
            .is_some_and(|ext| OPTIMIZED_EXTENSIONS.contains(&ext.as_str()));
        if !is_optimized {
            findings.push(
                report(format!("Image should use an optimized format (WebP or SVG): {src}"))
                    .with_severity(Severity::Warning),
            );
        }

        if !snapshot.contains_file(&target) {
            findings.push(report(format!("Image file not found: {src}")));
        }
    }
}

/// Resolve an image `src` against the directory of the page using it
fn resolve_src(page: &Path, src: &str) -> PathBuf {
    let path = src.split(['?', '#']).next().unwrap_or(src).replace("%20", " ");
    let base = page.parent().unwrap_or_else(|| Path::new(""));
    normalize_relative(&base.join(path))
}

impl Rule for PageImagesRule {
    fn id(&self) -> &'static str {
        PAGE_IMAGES
    }

    fn description(&self) -> &'static str {
        "Images carry alt text and dimensions and reference existing WebP/SVG files by relative path"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Images
    }

    fn check(&self, snapshot: &ProjectSnapshot) -> GuardianResult<Vec<Finding>> {
        let mut findings = Vec::new();
        for page in &snapshot.pages {
            for image in page.elements_by_tag("img") {
                self.check_image(snapshot, page, image, &mut findings);
            }
        }
        Ok(findings)
    }
}

/// Size limits and allowed formats for the generated image assets
pub struct AssetImagesRule {
    max_dimension: u32,
    max_bytes: u64,
}

impl AssetImagesRule {
    pub fn new(max_dimension: u32, max_bytes: u64) -> Self {
        Self {
            max_dimension,
            max_bytes,
        }
    }
}

impl Rule for AssetImagesRule {
    fn id(&self) -> &'static str {
        ASSET_IMAGES
    }

    fn description(&self) -> &'static str {
        "Generated images use image formats and stay within the pixel and file size limits"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Images
    }

    fn check(&self, snapshot: &ProjectSnapshot) -> GuardianResult<Vec<Finding>> {
        let mut findings = Vec::new();

        for image in snapshot.images.iter().filter(|image| image.in_assets) {
            let Some(dimensions) = &image.dimensions else {
                continue;
            };

            match dimensions {
                Err(e) => findings.push(self.finding(&image.path, format!("Error processing image: {e}"))),
                Ok((width, height)) => {
                    if *width > self.max_dimension || *height > self.max_dimension {
                        findings.push(
                            self.finding(
                                &image.path,
                                format!("Image dimensions too large: {width}x{height}px"),
                            )
                            .with_suggestion(format!(
                                "Resize to at most {0}x{0}px",
                                self.max_dimension
                            )),
                        );
                    }
                    if image.size_bytes > self.max_bytes {
                        findings.push(
                            self.finding(
                                &image.path,
                                format!(
                                    "Image file size too large: {:.2}MB",
                                    image.size_bytes as f64 / (1024.0 * 1024.0)
                                ),
                            )
                            .with_suggestion("Compress the image or convert it to WebP"),
                        );
                    }
                }
            }
        }

        let asset_dir = snapshot.paths.asset_images_dir();
        for entry in snapshot
            .entries
            .iter()
            .filter(|entry| !entry.is_dir && entry.path.starts_with(&asset_dir))
        {
            let is_image = extension_of(&entry.path)
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()));
            if !is_image && !is_system_file(&entry.file_name()) {
                findings.push(
                    self.finding(
                        &entry.path,
                        format!("Invalid image file extension: {}", entry.path.display()),
                    )
                    .with_suggestion("Keep only JPEG, PNG, GIF, SVG or WebP files here"),
                );
            }
        }

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathsConfig;
    use crate::snapshot::ImageAsset;

    fn snapshot_with(body: &str, files: &[&str]) -> ProjectSnapshot {
        let mut snapshot = ProjectSnapshot::empty(PathsConfig::default());
        snapshot.add_page("index.html", &format!("<html><body>\n{body}\n</body></html>"));
        for file in files {
            snapshot.add_entry(Path::new(file), false);
        }
        snapshot
    }

    fn messages(findings: &[Finding]) -> Vec<&str> {
        findings.iter().map(|f| f.message.as_str()).collect()
    }

    #[test]
    fn test_complete_image_passes() {
        let snapshot = snapshot_with(
            r#"<img src="images/photo.webp" alt="Photo" width="640" height="480">
<img src="./images/icons/logo.svg?v=2" alt="" width="32" height="32">
<img src="data:image/png;base64,AAAA" alt="" width="1" height="1">"#,
            &["images/photo.webp", "images/icons/logo.svg"],
        );
        let findings = PageImagesRule.check(&snapshot).unwrap();
        assert!(findings.is_empty(), "{:?}", messages(&findings));
    }

    #[test]
    fn test_attribute_findings() {
        let snapshot = snapshot_with(
            r#"<img src="images/photo.webp" width="640">
<img alt="Nothing" width="1" height="1">"#,
            &["images/photo.webp"],
        );
        let findings = PageImagesRule.check(&snapshot).unwrap();

        assert_eq!(
            messages(&findings),
            vec![
                "Image missing alt attribute",
                "Image missing width or height attribute",
                "Image missing src attribute",
            ]
        );
        assert_eq!(findings[2].line, Some(3));
    }

    #[test]
    fn test_path_and_format_findings() {
        let snapshot = snapshot_with(
            r#"<img src="/images/a.webp" alt="" width="1" height="1">
<img src="images/b.jpg" alt="" width="1" height="1">
<img src="images/missing.svg" alt="" width="1" height="1">"#,
            &["images/b.jpg"],
        );
        let findings = PageImagesRule.check(&snapshot).unwrap();

        assert_eq!(
            messages(&findings),
            vec![
                "Image path should be relative: /images/a.webp",
                "Image should use an optimized format (WebP or SVG): images/b.jpg",
                "Image file not found: images/missing.svg",
            ]
        );
        assert_eq!(findings[1].severity, Severity::Warning);
    }

    #[test]
    fn test_resolve_src() {
        assert_eq!(
            resolve_src(Path::new("index.html"), "./images/my%20photo.webp#x"),
            PathBuf::from("images/my photo.webp")
        );
        assert_eq!(
            resolve_src(Path::new("pages/about.html"), "../images/a.svg"),
            PathBuf::from("images/a.svg")
        );
    }

    #[test]
    fn test_asset_limits() {
        let mut snapshot = ProjectSnapshot::empty(PathsConfig::default());
        let asset = |path: &str, size_bytes: u64, dimensions| ImageAsset {
            path: PathBuf::from(path),
            size_bytes,
            in_assets: true,
            dimensions,
        };
        snapshot.images = vec![
            asset("assets/images/ok.png", 1_000, Some(Ok((800, 600)))),
            asset("assets/images/wide.png", 1_000, Some(Ok((2400, 600)))),
            asset("assets/images/heavy.jpg", 3 * 1024 * 1024, Some(Ok((100, 100)))),
            asset("assets/images/broken.png", 10, Some(Err("corrupt header".to_string()))),
            asset("assets/images/icon.svg", 10_000_000, None),
        ];

        let findings = AssetImagesRule::new(2000, 1024 * 1024).check(&snapshot).unwrap();

        assert_eq!(
            messages(&findings),
            vec![
                "Image dimensions too large: 2400x600px",
                "Image file size too large: 3.00MB",
                "Error processing image: corrupt header",
            ]
        );
        assert_eq!(findings[0].file_path, PathBuf::from("assets/images/wide.png"));
    }

    #[test]
    fn test_non_image_assets_are_flagged() {
        let mut snapshot = ProjectSnapshot::empty(PathsConfig::default());
        for file in [
            "assets/images/photo.webp",
            "assets/images/raw/photo.psd",
            "assets/images/notes.txt",
            "assets/images/.DS_Store",
            "assets/fonts/inter.woff2",
        ] {
            snapshot.add_entry(Path::new(file), false);
        }

        let findings = AssetImagesRule::new(2000, 1024 * 1024).check(&snapshot).unwrap();

        assert_eq!(
            messages(&findings),
            vec![
                "Invalid image file extension: assets/images/notes.txt",
                "Invalid image file extension: assets/images/raw/photo.psd",
            ]
        );
        assert_eq!(findings[0].rule_id, ASSET_IMAGES);
    }
}
