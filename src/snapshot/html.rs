//! HTML parse adapter
//!
//! Wraps `scraper` (html5ever) and converts its DOM into an owned element
//! tree annotated with source lines. html5ever drops positions, so lines are
//! recovered by scanning the raw source for each start tag in document order;
//! elements the parser synthesised (an implied `<tbody>`, say) inherit the
//! line of the scan cursor.

use scraper::{ElementRef, Html, Node as DomNode};
use std::ops::Range;
use std::path::PathBuf;

/// A parsed HTML page
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    /// Path relative to the working directory
    pub path: PathBuf,
    /// Raw source text
    pub source: String,
    /// Doctype name, when one was declared
    pub doctype: Option<String>,
    /// The `<html>` element
    pub root: Element,
}

/// Child of an element
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An element with its attributes, children and originating line
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
    pub line: u32,
}

impl HtmlDocument {
    /// Parse a page; html5ever recovers from any input, so this never fails
    pub fn parse(path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        let source = source.into();
        let dom = Html::parse_document(&source);

        let doctype = dom.tree.root().children().find_map(|node| match node.value() {
            DomNode::Doctype(doctype) => Some(doctype.name().to_string()),
            _ => None,
        });

        let mut locator = LineLocator::new(&source);
        let root = convert(dom.root_element(), &mut locator);

        Self {
            path: path.into(),
            source,
            doctype,
            root,
        }
    }

    /// `<head>`, which html5ever always creates
    pub fn head(&self) -> Option<&Element> {
        self.root.child_elements().find(|el| el.tag == "head")
    }

    /// `<body>`, which html5ever always creates
    pub fn body(&self) -> Option<&Element> {
        self.root.child_elements().find(|el| el.tag == "body")
    }

    /// Line of `<head>`, falling back to the first line
    pub fn head_line(&self) -> u32 {
        self.head().map(|el| el.line).unwrap_or(1)
    }

    /// Line of `<body>`, falling back to the first line
    pub fn body_line(&self) -> u32 {
        self.body().map(|el| el.line).unwrap_or(1)
    }

    /// Source text of a 1-based line
    pub fn source_line(&self, line: u32) -> Option<&str> {
        line.checked_sub(1)
            .and_then(|index| self.source.lines().nth(index as usize))
    }

    /// All elements with the given tag, in document order
    pub fn elements_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.root.descendants_and_self().filter(move |el| el.tag == tag)
    }

    /// Page file name, e.g. `about.html`
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|(key, _)| key == name)
    }

    /// Attribute value with surrounding whitespace removed, `None` when blank
    pub fn non_empty_attr(&self, name: &str) -> Option<&str> {
        self.attr(name).map(str::trim).filter(|value| !value.is_empty())
    }

    /// Individual class names
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    /// Direct element children
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    /// All descendant elements in document order, excluding `self`
    pub fn descendants(&self) -> Descendants<'_> {
        let mut stack: Vec<&Element> = self.child_elements().collect();
        stack.reverse();
        Descendants { stack }
    }

    /// `self` followed by all descendants
    pub fn descendants_and_self(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Concatenated text content of the subtree
    pub fn text(&self) -> String {
        let mut text = String::new();
        self.collect_text(&mut text);
        text
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(t),
                Node::Element(el) => el.collect_text(out),
            }
        }
    }

    /// Whether any non-whitespace text sits anywhere in the subtree
    pub fn has_text(&self) -> bool {
        self.children.iter().any(|child| match child {
            Node::Text(t) => !t.trim().is_empty(),
            Node::Element(el) => el.has_text(),
        })
    }

    /// First descendant with the given tag
    pub fn find(&self, tag: &str) -> Option<&Element> {
        self.descendants().find(|el| el.tag == tag)
    }

    /// Start tag as written, used for finding context
    pub fn start_tag(&self) -> String {
        let mut tag = format!("<{}", self.tag);
        for (key, value) in &self.attrs {
            tag.push_str(&format!(" {key}=\"{value}\""));
        }
        tag.push('>');
        tag
    }

    /// Visit every element with the chain of its ancestors (outermost first)
    pub fn walk_with_ancestors<'a, F>(&'a self, visit: &mut F)
    where
        F: FnMut(&'a Element, &[&'a Element]),
    {
        let mut ancestors = Vec::new();
        self.walk_inner(&mut ancestors, visit);
    }

    fn walk_inner<'a, F>(&'a self, ancestors: &mut Vec<&'a Element>, visit: &mut F)
    where
        F: FnMut(&'a Element, &[&'a Element]),
    {
        visit(self, ancestors);
        ancestors.push(self);
        for child in self.child_elements() {
            child.walk_inner(ancestors, visit);
        }
        ancestors.pop();
    }
}

/// Pre-order iterator over an element subtree
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        let mut children: Vec<&Element> = next.child_elements().collect();
        children.reverse();
        self.stack.extend(children);
        Some(next)
    }
}

fn convert(element: ElementRef<'_>, locator: &mut LineLocator) -> Element {
    let value = element.value();
    let tag = value.name().to_string();
    let line = locator.locate(&tag);
    let attrs = value
        .attrs()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();

    let mut children = Vec::new();
    for child in element.children() {
        match child.value() {
            DomNode::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    children.push(Node::Element(convert(child_element, locator)));
                }
            }
            DomNode::Text(text) => children.push(Node::Text(String::from(&**text))),
            _ => {}
        }
    }

    Element {
        tag,
        attrs,
        children,
        line,
    }
}

/// Elements whose content the parser keeps as text, never as child elements
const RAW_TEXT_TAGS: &[&str] = &["script", "style", "textarea", "title", "noscript"];

/// Maps start tags back to source lines by scanning forward in document order
struct LineLocator {
    lowered: Vec<u8>,
    line_starts: Vec<usize>,
    /// Comments and raw-text element bodies, sorted by start offset
    skipped: Vec<Range<usize>>,
    cursor: usize,
}

impl LineLocator {
    fn new(source: &str) -> Self {
        let lowered = source.to_ascii_lowercase().into_bytes();
        let mut line_starts = vec![0];
        line_starts.extend(
            lowered
                .iter()
                .enumerate()
                .filter(|(_, byte)| **byte == b'\n')
                .map(|(index, _)| index + 1),
        );
        let skipped = skipped_regions(&lowered);
        Self {
            lowered,
            line_starts,
            skipped,
            cursor: 0,
        }
    }

    fn locate(&mut self, tag: &str) -> u32 {
        let needle = format!("<{}", tag.to_ascii_lowercase());
        let needle = needle.as_bytes();
        let mut position = self.cursor;

        while position + needle.len() <= self.lowered.len() {
            let Some(offset) = find_bytes(&self.lowered[position..], needle) else {
                break;
            };
            let start = position + offset;
            if let Some(region) = self.skipped.iter().find(|region| region.contains(&start)) {
                position = region.end;
                continue;
            }
            let after = self.lowered.get(start + needle.len()).copied();
            if is_name_boundary(after) {
                self.cursor = tag_end(&self.lowered, start + needle.len());
                return self.line_of(start);
            }
            position = start + 1;
        }

        self.line_of(self.cursor)
    }

    fn line_of(&self, offset: usize) -> u32 {
        let index = match self.line_starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index - 1,
        };
        (index + 1) as u32
    }
}

fn is_name_boundary(byte: Option<u8>) -> bool {
    matches!(byte, None | Some(b'>' | b'/' | b' ' | b'\t' | b'\n' | b'\r'))
}

/// Offset just past the `>` closing a start tag, skipping quoted attribute values
fn tag_end(source: &[u8], from: usize) -> usize {
    let mut quote: Option<u8> = None;
    for (index, &byte) in source.iter().enumerate().skip(from) {
        match (quote, byte) {
            (Some(open), _) if byte == open => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(byte),
            (None, b'>') => return index + 1,
            (None, _) => {}
        }
    }
    source.len()
}

/// Byte ranges that cannot contain start tags: comments and the bodies of raw-text elements
fn skipped_regions(source: &[u8]) -> Vec<Range<usize>> {
    let mut regions = Vec::new();
    let mut index = 0;

    while index < source.len() {
        if source[index] != b'<' {
            index += 1;
            continue;
        }
        if source[index..].starts_with(b"<!--") {
            let end = find_bytes(&source[index + 4..], b"-->")
                .map_or(source.len(), |offset| index + 4 + offset + 3);
            regions.push(index..end);
            index = end;
            continue;
        }

        let raw = RAW_TEXT_TAGS.iter().find(|tag| {
            let name = tag.as_bytes();
            source[index + 1..].starts_with(name)
                && is_name_boundary(source.get(index + 1 + name.len()).copied())
        });
        let Some(tag) = raw else {
            index += 1;
            continue;
        };

        let body = tag_end(source, index + 1 + tag.len());
        let close = format!("</{tag}");
        let end = find_bytes(&source[body..], close.as_bytes()).map_or(source.len(), |offset| body + offset);
        regions.push(body..end);
        index = end.max(index + 1);
    }

    regions
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n  <title>Home</title>\n</head>\n<body>\n  <header class=\"header\">\n    <nav class=\"nav\"><a href=\"/\">Home</a></nav>\n  </header>\n  <main>\n    <h1>Title</h1>\n  </main>\n</body>\n</html>\n";

    #[test]
    fn test_parse_tracks_lines() {
        let doc = HtmlDocument::parse("index.html", PAGE);

        assert_eq!(doc.doctype.as_deref(), Some("html"));
        assert_eq!(doc.root.tag, "html");
        assert_eq!(doc.root.line, 2);
        assert_eq!(doc.head_line(), 3);
        assert_eq!(doc.body_line(), 6);

        let header = doc.elements_by_tag("header").next().unwrap();
        assert_eq!(header.line, 7);
        let link = doc.elements_by_tag("a").next().unwrap();
        assert_eq!(link.line, 8);
        let h1 = doc.elements_by_tag("h1").next().unwrap();
        assert_eq!(h1.line, 11);
    }

    #[test]
    fn test_tag_prefix_is_not_confused() {
        // <header> must not be located at the "<head" of "<header"
        let source = "<html>\n<body>\n<header>\n</header>\n<p>x</p>\n</body>\n</html>";
        let doc = HtmlDocument::parse("a.html", source);
        let p = doc.elements_by_tag("p").next().unwrap();
        assert_eq!(p.line, 5);
        let header = doc.elements_by_tag("header").next().unwrap();
        assert_eq!(header.line, 3);
    }

    #[test]
    fn test_commented_and_raw_text_tags_are_skipped() {
        let source = "<!DOCTYPE html>\n<html>\n<body>\n<p>x</p>\n<!-- <img src=\"old.png\"> -->\n<img src=\"new.png\">\n<script>document.write('<img src=\"x.png\">');</script>\n<a title=\"<img>\" href=\"/\">Home</a>\n<img src=\"last.png\">\n</body>\n</html>";
        let doc = HtmlDocument::parse("index.html", source);

        let lines: Vec<_> = doc.elements_by_tag("img").map(|img| img.line).collect();
        assert_eq!(lines, vec![6, 9]);
        assert_eq!(doc.elements_by_tag("script").next().unwrap().line, 7);
        assert_eq!(doc.elements_by_tag("a").next().unwrap().line, 8);
    }

    #[test]
    fn test_element_helpers() {
        let doc = HtmlDocument::parse(
            "a.html",
            "<div class=\"card  card--big\" id=\"x\"><span> hi </span><img src=\"a.webp\"></div>",
        );
        let div = doc.elements_by_tag("div").next().unwrap();

        assert_eq!(div.classes().collect::<Vec<_>>(), vec!["card", "card--big"]);
        assert!(div.has_class("card--big"));
        assert_eq!(div.attr("id"), Some("x"));
        assert!(div.has_text());
        assert_eq!(div.text().trim(), "hi");
        assert!(div.find("img").is_some());
        assert_eq!(div.child_elements().count(), 2);
        assert!(div.start_tag().starts_with("<div class=\"card  card--big\""));
    }

    #[test]
    fn test_walk_with_ancestors() {
        let doc = HtmlDocument::parse(
            "a.html",
            "<form><label>Name <input name=\"n\"></label></form>",
        );
        let mut seen = None;
        doc.root.walk_with_ancestors(&mut |el, ancestors| {
            if el.tag == "input" {
                seen = Some(ancestors.iter().map(|a| a.tag.clone()).collect::<Vec<_>>());
            }
        });
        assert_eq!(
            seen.unwrap(),
            vec!["html", "body", "form", "label"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_missing_doctype() {
        let doc = HtmlDocument::parse("a.html", "<html><body></body></html>");
        assert!(doc.doctype.is_none());
        assert_eq!(doc.source_line(1), Some("<html><body></body></html>"));
    }
}
