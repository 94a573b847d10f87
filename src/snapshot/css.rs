//! SCSS/CSS parser producing a positioned tree
//!
//! Understands the subset of SCSS used by page stylesheets: nested rules with
//! `&`, `//` and `/* */` comments, `#{}` interpolation, at-rules with and
//! without blocks, nested property groups (`font: { family: ... }`) and
//! `$variable` declarations. Every node records its 1-based starting line.

/// A parsed stylesheet
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Stylesheet {
    pub nodes: Vec<CssNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CssNode {
    Rule(StyleRule),
    AtRule(AtRule),
    Declaration(Declaration),
    Comment(Comment),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
    /// Selector as written, possibly containing `&`
    pub selector: String,
    pub line: u32,
    pub children: Vec<CssNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtRule {
    pub name: String,
    pub params: String,
    pub line: u32,
    pub children: Option<Vec<CssNode>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub important: bool,
    pub line: u32,
}

impl Declaration {
    /// `$name` or `--name`
    pub fn is_variable(&self) -> bool {
        self.property.starts_with('$') || self.property.starts_with("--")
    }

    /// Lowercased property name
    pub fn property_lower(&self) -> String {
        self.property.to_ascii_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub text: String,
    pub line: u32,
    /// `//` comment rather than `/* */`
    pub inline: bool,
}

/// Syntax error with the line it was detected on
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct CssParseError {
    pub line: u32,
    pub message: String,
}

/// A style rule with its selectors resolved against enclosing rules
#[derive(Debug, Clone)]
pub struct FlatRule<'a> {
    pub rule: &'a StyleRule,
    /// Fully resolved selector list
    pub selectors: Vec<String>,
    /// Resolved selectors of the enclosing style rule, empty at top level
    pub parent_selectors: Vec<String>,
    /// Enclosing at-rules, e.g. `@media (max-width: 768px)`
    pub context: String,
}

impl<'a> FlatRule<'a> {
    pub fn line(&self) -> u32 {
        self.rule.line
    }

    /// Declarations written directly inside this rule
    pub fn declarations(&self) -> impl Iterator<Item = &'a Declaration> {
        self.rule.children.iter().filter_map(|node| match node {
            CssNode::Declaration(decl) => Some(decl),
            _ => None,
        })
    }

    /// Whether the block is empty (comments do not count)
    pub fn is_empty(&self) -> bool {
        self.rule
            .children
            .iter()
            .all(|node| matches!(node, CssNode::Comment(_)))
    }

    /// Resolved selectors joined for display
    pub fn display_selector(&self) -> String {
        self.selectors.join(", ")
    }
}

impl Stylesheet {
    /// Parse SCSS or CSS source
    pub fn parse(source: &str) -> Result<Self, CssParseError> {
        let mut parser = Parser::new(source);
        let nodes = parser.parse_block(None)?;
        Ok(Self { nodes })
    }

    /// All style rules in source order, parents before their nested rules.
    /// Rules inside `@keyframes` are frames, not selectors, and are skipped.
    pub fn rules(&self) -> Vec<FlatRule<'_>> {
        let mut out = Vec::new();
        flatten_rules(&self.nodes, &[], "", &mut out);
        out
    }

    /// Every declaration in source order
    pub fn declarations(&self) -> Vec<&Declaration> {
        let mut out = Vec::new();
        collect_declarations(&self.nodes, &mut out);
        out
    }

    /// Every comment in source order
    pub fn comments(&self) -> Vec<&Comment> {
        let mut out = Vec::new();
        collect_comments(&self.nodes, &mut out);
        out
    }
}

fn children_of(node: &CssNode) -> &[CssNode] {
    match node {
        CssNode::Rule(rule) => &rule.children,
        CssNode::AtRule(at) => at.children.as_deref().unwrap_or(&[]),
        _ => &[],
    }
}

fn flatten_rules<'a>(
    nodes: &'a [CssNode],
    parents: &[String],
    context: &str,
    out: &mut Vec<FlatRule<'a>>,
) {
    for node in nodes {
        match node {
            CssNode::Rule(rule) => {
                let selectors = resolve_selector(parents, &rule.selector);
                out.push(FlatRule {
                    rule,
                    selectors: selectors.clone(),
                    parent_selectors: parents.to_vec(),
                    context: context.to_string(),
                });
                flatten_rules(&rule.children, &selectors, context, out);
            }
            CssNode::AtRule(at) => {
                let Some(children) = &at.children else {
                    continue;
                };
                if at.name.ends_with("keyframes") {
                    continue;
                }
                let nested_context = if context.is_empty() {
                    format!("@{} {}", at.name, at.params)
                } else {
                    format!("{context} @{} {}", at.name, at.params)
                };
                flatten_rules(children, parents, nested_context.trim(), out);
            }
            _ => {}
        }
    }
}

fn collect_declarations<'a>(nodes: &'a [CssNode], out: &mut Vec<&'a Declaration>) {
    for node in nodes {
        if let CssNode::Declaration(decl) = node {
            out.push(decl);
        }
        collect_declarations(children_of(node), out);
    }
}

fn collect_comments<'a>(nodes: &'a [CssNode], out: &mut Vec<&'a Comment>) {
    for node in nodes {
        if let CssNode::Comment(comment) = node {
            out.push(comment);
        }
        collect_comments(children_of(node), out);
    }
}

/// Resolve a possibly nested selector list against its parents' selectors
pub fn resolve_selector(parents: &[String], selector: &str) -> Vec<String> {
    let parts: Vec<String> = split_top_level(selector, ',')
        .into_iter()
        .map(|part| normalize_selector(&part))
        .filter(|part| !part.is_empty())
        .collect();

    if parents.is_empty() {
        return parts;
    }

    let mut resolved = Vec::with_capacity(parents.len() * parts.len());
    for parent in parents {
        for part in &parts {
            if part.contains('&') {
                resolved.push(part.replace('&', parent));
            } else {
                resolved.push(format!("{parent} {part}"));
            }
        }
    }
    resolved.into_iter().map(|s| normalize_selector(&s)).collect()
}

/// Split on a delimiter outside parentheses, brackets and quotes
pub fn split_top_level(input: &str, delimiter: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in input.chars() {
        if let Some(q) = quote {
            current.push(ch);
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => {
                quote = Some(ch);
                current.push(ch);
            }
            '(' | '[' => {
                depth += 1;
                current.push(ch);
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            c if c == delimiter && depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }
    parts.push(current);
    parts.into_iter().map(|p| p.trim().to_string()).collect()
}

/// Collapse whitespace and put single spaces around `>`, `+` and `~` combinators
pub fn normalize_selector(selector: &str) -> String {
    let mut out = String::new();
    let mut depth = 0usize;
    let mut pending_space = false;

    for ch in selector.trim().chars() {
        match ch {
            '(' | '[' => {
                if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
                depth += 1;
                out.push(ch);
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                out.push(ch);
            }
            '>' | '+' | '~' if depth == 0 => {
                let trimmed = out.trim_end().len();
                out.truncate(trimmed);
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push(ch);
                out.push(' ');
                pending_space = false;
            }
            c if c.is_whitespace() && depth == 0 => {
                pending_space = !out.is_empty() && !out.ends_with(' ');
            }
            c => {
                if pending_space {
                    out.push(' ');
                    pending_space = false;
                }
                out.push(c);
            }
        }
    }
    out.trim().to_string()
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    line: u32,
}

impl Parser {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
        }
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn error(line: u32, message: impl Into<String>) -> CssParseError {
        CssParseError {
            line,
            message: message.into(),
        }
    }

    /// Parse statements until the closing `}` of a block opened on `open_line`,
    /// or until end of input at top level
    fn parse_block(&mut self, open_line: Option<u32>) -> Result<Vec<CssNode>, CssParseError> {
        let mut nodes = Vec::new();

        loop {
            self.skip_whitespace();
            let line = self.line;

            let Some(ch) = self.peek() else {
                return match open_line {
                    Some(open) => Err(Self::error(open, "Unclosed block")),
                    None => Ok(nodes),
                };
            };

            if self.starts_with("/*") {
                nodes.push(CssNode::Comment(self.block_comment()?));
            } else if self.starts_with("//") {
                nodes.push(CssNode::Comment(self.line_comment()));
            } else if ch == '}' {
                if open_line.is_some() {
                    self.bump();
                    return Ok(nodes);
                }
                return Err(Self::error(line, "Unexpected }"));
            } else if ch == ';' {
                self.bump();
            } else {
                let (prelude, terminator) = self.read_prelude(line)?;
                match terminator {
                    Some('{') => {
                        self.bump();
                        let children = self.parse_block(Some(line))?;
                        self.push_block(&mut nodes, prelude, line, children);
                    }
                    Some(';') => {
                        self.bump();
                        if let Some(node) = Self::statement(&prelude, line)? {
                            nodes.push(node);
                        }
                    }
                    _ => {
                        // `}` or end of input: last statement without a semicolon
                        if let Some(node) = Self::statement(&prelude, line)? {
                            nodes.push(node);
                        }
                    }
                }
            }
        }
    }

    fn push_block(&self, nodes: &mut Vec<CssNode>, prelude: String, line: u32, children: Vec<CssNode>) {
        if let Some(rest) = prelude.strip_prefix('@') {
            let (name, params) = split_at_rule(rest);
            nodes.push(CssNode::AtRule(AtRule {
                name,
                params,
                line,
                children: Some(children),
            }));
        } else if let Some(prefix) = prelude.strip_suffix(':') {
            // nested property group: `font: { family: x }` -> `font-family: x`
            let prefix = prefix.trim();
            for child in children {
                match child {
                    CssNode::Declaration(mut decl) => {
                        decl.property = format!("{prefix}-{}", decl.property);
                        nodes.push(CssNode::Declaration(decl));
                    }
                    other => nodes.push(other),
                }
            }
        } else {
            nodes.push(CssNode::Rule(StyleRule {
                selector: prelude,
                line,
                children,
            }));
        }
    }

    fn statement(prelude: &str, line: u32) -> Result<Option<CssNode>, CssParseError> {
        let prelude = prelude.trim();
        if prelude.is_empty() {
            return Ok(None);
        }

        if let Some(rest) = prelude.strip_prefix('@') {
            let (name, params) = split_at_rule(rest);
            return Ok(Some(CssNode::AtRule(AtRule {
                name,
                params,
                line,
                children: None,
            })));
        }

        let Some((property, value)) = prelude.split_once(':') else {
            return Err(Self::error(line, format!("Unknown word \"{prelude}\"")));
        };

        let property = property.trim();
        if property.is_empty() {
            return Err(Self::error(line, "Missing property name"));
        }

        let mut value = value.trim().to_string();
        let mut important = false;
        let lowered = value.to_ascii_lowercase();
        if let Some(index) = lowered.rfind("!important") {
            important = true;
            value = value[..index].trim_end().to_string();
        }

        Ok(Some(CssNode::Declaration(Declaration {
            property: property.to_string(),
            value,
            important,
            line,
        })))
    }

    fn block_comment(&mut self) -> Result<Comment, CssParseError> {
        let line = self.line;
        self.bump();
        self.bump();
        let mut text = String::new();
        loop {
            if self.starts_with("*/") {
                self.bump();
                self.bump();
                break;
            }
            match self.bump() {
                Some(ch) => text.push(ch),
                None => return Err(Self::error(line, "Unclosed comment")),
            }
        }
        Ok(Comment {
            text: text.trim().to_string(),
            line,
            inline: false,
        })
    }

    fn line_comment(&mut self) -> Comment {
        let line = self.line;
        self.bump();
        self.bump();
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            text.push(ch);
            self.bump();
        }
        Comment {
            text: text.trim().to_string(),
            line,
            inline: true,
        }
    }

    /// Read up to (not including) the next top-level `;`, `{` or `}`
    fn read_prelude(&mut self, line: u32) -> Result<(String, Option<char>), CssParseError> {
        let mut text = String::new();
        let mut depth = 0usize;

        while let Some(ch) = self.peek() {
            match ch {
                '"' | '\'' => {
                    text.push(ch);
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('\\') => {
                                text.push('\\');
                                if let Some(escaped) = self.bump() {
                                    text.push(escaped);
                                }
                            }
                            Some(c) if c == ch => {
                                text.push(c);
                                break;
                            }
                            Some('\n') | None => {
                                return Err(Self::error(line, "Unclosed string"));
                            }
                            Some(c) => text.push(c),
                        }
                    }
                }
                '#' if self.peek_at(1) == Some('{') => {
                    // interpolation may contain braces of its own
                    let mut braces = 0usize;
                    while let Some(c) = self.bump() {
                        text.push(c);
                        match c {
                            '{' => braces += 1,
                            '}' => {
                                braces -= 1;
                                if braces == 0 {
                                    break;
                                }
                            }
                            _ => {}
                        }
                    }
                    if braces != 0 {
                        return Err(Self::error(line, "Unclosed interpolation"));
                    }
                }
                '/' if self.peek_at(1) == Some('*') => {
                    self.block_comment()?;
                }
                '/' if depth == 0
                    && self.peek_at(1) == Some('/')
                    && (text.is_empty() || text.ends_with(char::is_whitespace)) =>
                {
                    self.line_comment();
                }
                '(' => {
                    depth += 1;
                    text.push(ch);
                    self.bump();
                }
                ')' => {
                    depth = depth.saturating_sub(1);
                    text.push(ch);
                    self.bump();
                }
                ';' | '{' | '}' if depth == 0 => {
                    return Ok((text.trim().to_string(), Some(ch)));
                }
                _ => {
                    text.push(ch);
                    self.bump();
                }
            }
        }

        if depth > 0 {
            return Err(Self::error(line, "Unclosed bracket"));
        }
        Ok((text.trim().to_string(), None))
    }
}

fn split_at_rule(rest: &str) -> (String, String) {
    let end = rest
        .find(|c: char| c.is_whitespace() || c == '(')
        .unwrap_or(rest.len());
    (rest[..end].to_string(), rest[end..].trim().to_string())
}
