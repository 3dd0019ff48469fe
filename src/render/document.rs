//! Generic document model shared by the dialect printers.
//!
//! The source is markdown with a small HTML subset mixed in. It is parsed
//! once into blocks and inline spans; each dialect then prints that model.
//! HTML is read with `scraper`, so entities arrive decoded in text nodes.

use crate::error::{ReleaseError, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Node};

/// Inline content of a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Bold(Vec<Inline>),
    Italic(Vec<Inline>),
    Code(String),
    Link { href: String, content: Vec<Inline> },
    Image { src: String, alt: String },
    LineBreak,
}

/// Block-level structure. Nested lists are flattened into their parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, content: Vec<Inline> },
    Paragraph(Vec<Inline>),
    List { ordered: bool, items: Vec<Vec<Inline>> },
    Code(String),
    Rule,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn parse(source: &str) -> Result<Self> {
        Ok(BlockParser::new()?.parse(source))
    }
}

struct OpenList {
    ordered: bool,
    items: Vec<String>,
}

struct BlockParser {
    blocks: Vec<Block>,
    paragraph: Vec<String>,
    list: Option<OpenList>,
    heading: Regex,
    rule: Regex,
    list_item: Regex,
    html_start: Regex,
}

impl BlockParser {
    fn new() -> Result<Self> {
        let compile = |pattern: &str| Regex::new(pattern).map_err(|e| ReleaseError::render(e.to_string()));
        Ok(BlockParser {
            blocks: Vec::new(),
            paragraph: Vec::new(),
            list: None,
            heading: compile(r"^\s{0,3}(#{1,6})\s+(.*?)\s*#*\s*$")?,
            rule: compile(r"^\s{0,3}(?:(?:\*\s*){3,}|(?:-\s*){3,}|(?:_\s*){3,})$")?,
            list_item: compile(r"^(\s*)(?:([-*+])|(\d+)[.)])\s+(.*)$")?,
            html_start: compile(r"(?i)^\s*</?(?:h[1-6]|p|ul|ol|li|div|hr|br|pre)\b")?,
        })
    }

    fn parse(mut self, source: &str) -> Document {
        let lines: Vec<&str> = source.lines().collect();
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];
            let trimmed = line.trim();

            if trimmed.is_empty() {
                self.flush_paragraph();
                i += 1;
            } else if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                self.flush_all();
                let fence = &trimmed[..3];
                let mut code = Vec::new();
                i += 1;
                while i < lines.len() && !lines[i].trim().starts_with(fence) {
                    code.push(lines[i]);
                    i += 1;
                }
                self.blocks.push(Block::Code(code.join("\n")));
                i += 1;
            } else if self.html_start.is_match(line) {
                self.flush_all();
                let mut chunk = Vec::new();
                while i < lines.len() && !lines[i].trim().is_empty() {
                    chunk.push(lines[i]);
                    i += 1;
                }
                self.blocks.extend(parse_html_blocks(&chunk.join("\n")));
            } else if let Some(caps) = self.heading.captures(line) {
                self.flush_all();
                self.blocks.push(Block::Heading {
                    level: caps[1].len() as u8,
                    content: parse_inlines(&caps[2]),
                });
                i += 1;
            } else if self.rule.is_match(line) {
                self.flush_all();
                self.blocks.push(Block::Rule);
                i += 1;
            } else if let Some(caps) = self.list_item.captures(line) {
                self.flush_paragraph();
                let ordered = caps.get(3).is_some();
                let nested = !caps[1].is_empty();
                let text = caps[4].to_string();
                match self.list.as_mut() {
                    Some(list) if list.ordered == ordered || nested => list.items.push(text),
                    _ => {
                        self.flush_list();
                        self.list = Some(OpenList {
                            ordered,
                            items: vec![text],
                        });
                    }
                }
                i += 1;
            } else if self.list.is_some() && line.starts_with(char::is_whitespace) && self.paragraph.is_empty() {
                // Continuation of the last list item
                if let Some(last) = self.list.as_mut().and_then(|l| l.items.last_mut()) {
                    last.push(' ');
                    last.push_str(trimmed);
                }
                i += 1;
            } else {
                self.flush_list();
                self.paragraph.push(trimmed.strip_prefix('>').map(str::trim).unwrap_or(trimmed).to_string());
                i += 1;
            }
        }

        self.flush_all();
        Document {
            blocks: self.blocks,
        }
    }

    fn flush_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let text = self.paragraph.join("\n");
        self.paragraph.clear();
        self.blocks.push(Block::Paragraph(parse_inlines(&text)));
    }

    fn flush_list(&mut self) {
        if let Some(list) = self.list.take() {
            self.blocks.push(Block::List {
                ordered: list.ordered,
                items: list.items.iter().map(|item| parse_inlines(item)).collect(),
            });
        }
    }

    fn flush_all(&mut self) {
        self.flush_paragraph();
        self.flush_list();
    }
}

/// How text nodes inside HTML are read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextMode {
    /// Inline markdown between tags of a markdown paragraph
    Markdown,
    /// Character data of an HTML block; whitespace runs collapse to one space
    Html,
}

/// Block-level HTML: headings, paragraphs, lists, rules and preformatted text.
/// Loose inline content between blocks becomes a paragraph.
fn parse_html_blocks(chunk: &str) -> Vec<Block> {
    let fragment = Html::parse_fragment(chunk);
    let mut builder = HtmlBlocks::default();
    builder.visit(fragment.root_element());
    builder.finish()
}

#[derive(Default)]
struct HtmlBlocks {
    blocks: Vec<Block>,
    pending: Vec<Inline>,
}

impl HtmlBlocks {
    fn visit(&mut self, parent: ElementRef<'_>) {
        for child in parent.children() {
            if let Some(element) = ElementRef::wrap(child) {
                self.element(element);
            } else if let Node::Text(text) = child.value() {
                push_inline(&mut self.pending, Inline::Text(collapse_whitespace(text)));
            }
        }
    }

    fn element(&mut self, element: ElementRef<'_>) {
        let name = element.value().name();
        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush();
                let content = trim_inlines(element_inlines(element, TextMode::Html));
                if !content.is_empty() {
                    self.blocks.push(Block::Heading {
                        level: name[1..].parse().unwrap_or(1),
                        content,
                    });
                }
            }
            "p" => {
                self.flush();
                self.pending = element_inlines(element, TextMode::Html);
                self.flush();
            }
            "div" | "section" | "article" | "blockquote" => {
                self.flush();
                self.visit(element);
                self.flush();
            }
            "ul" | "ol" => {
                self.flush();
                let mut items = Vec::new();
                list_items(element, &mut items);
                self.blocks.push(Block::List {
                    ordered: name == "ol",
                    items,
                });
            }
            "hr" => {
                self.flush();
                self.blocks.push(Block::Rule);
            }
            "pre" => {
                self.flush();
                let code: String = element.text().collect();
                self.blocks.push(Block::Code(code.trim_matches('\n').to_string()));
            }
            _ => {
                for inline in html_inline(element, TextMode::Html) {
                    push_inline(&mut self.pending, inline);
                }
            }
        }
    }

    fn flush(&mut self) {
        let content = trim_inlines(std::mem::take(&mut self.pending));
        if !content.is_empty() {
            self.blocks.push(Block::Paragraph(content));
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        self.blocks
    }
}

/// Items of a list, nested lists appended in document order.
fn list_items(list: ElementRef<'_>, items: &mut Vec<Vec<Inline>>) {
    for child in list.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "li" => {
                let mut own = Vec::new();
                let mut nested = Vec::new();
                for node in child.children() {
                    if let Some(element) = ElementRef::wrap(node) {
                        if matches!(element.value().name(), "ul" | "ol") {
                            nested.push(element);
                        } else {
                            for inline in html_inline(element, TextMode::Html) {
                                push_inline(&mut own, inline);
                            }
                        }
                    } else if let Node::Text(text) = node.value() {
                        push_inline(&mut own, Inline::Text(collapse_whitespace(text)));
                    }
                }
                let own = trim_inlines(own);
                if !own.is_empty() {
                    items.push(own);
                }
                for list in nested {
                    list_items(list, items);
                }
            }
            "ul" | "ol" => list_items(child, items),
            _ => {}
        }
    }
}

/// Inline content of an element's children.
fn element_inlines(parent: ElementRef<'_>, mode: TextMode) -> Vec<Inline> {
    let mut out = Vec::new();
    for child in parent.children() {
        if let Some(element) = ElementRef::wrap(child) {
            for inline in html_inline(element, mode) {
                push_inline(&mut out, inline);
            }
        } else if let Node::Text(text) = child.value() {
            match mode {
                TextMode::Markdown => {
                    for inline in markdown_inlines(text) {
                        push_inline(&mut out, inline);
                    }
                }
                TextMode::Html => push_inline(&mut out, Inline::Text(collapse_whitespace(text))),
            }
        }
    }
    out
}

/// Inline HTML (`strong`, `b`, `em`, `i`, `a`, `img`, `code`, `br`).
/// Any other element is dropped and its content kept.
fn html_inline(element: ElementRef<'_>, mode: TextMode) -> Vec<Inline> {
    let value = element.value();
    match value.name() {
        "strong" | "b" => vec![Inline::Bold(element_inlines(element, mode))],
        "em" | "i" => vec![Inline::Italic(element_inlines(element, mode))],
        "code" => vec![Inline::Code(element.text().collect())],
        "a" => vec![Inline::Link {
            href: value.attr("href").unwrap_or_default().to_string(),
            content: element_inlines(element, mode),
        }],
        "img" => vec![Inline::Image {
            src: value.attr("src").unwrap_or_default().to_string(),
            alt: value.attr("alt").unwrap_or_default().to_string(),
        }],
        "br" => vec![Inline::LineBreak],
        _ => element_inlines(element, mode),
    }
}

/// Append, merging adjacent text.
fn push_inline(out: &mut Vec<Inline>, inline: Inline) {
    if let (Some(Inline::Text(last)), Inline::Text(text)) = (out.last_mut(), &inline) {
        last.push_str(text);
        return;
    }
    if !matches!(&inline, Inline::Text(text) if text.is_empty()) {
        out.push(inline);
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            space = true;
            continue;
        }
        if space {
            out.push(' ');
            space = false;
        }
        out.push(c);
    }
    if space {
        out.push(' ');
    }
    out
}

fn trim_inlines(mut content: Vec<Inline>) -> Vec<Inline> {
    if let Some(Inline::Text(first)) = content.first_mut() {
        *first = first.trim_start().to_string();
    }
    if let Some(Inline::Text(last)) = content.last_mut() {
        *last = last.trim_end().to_string();
    }
    content.retain(|inline| !matches!(inline, Inline::Text(text) if text.is_empty()));
    content
}

/// Parse inline markdown with inline HTML mixed in.
///
/// Code spans are taken verbatim. Elsewhere tags and entities go through the
/// HTML parser and the text between tags is read as markdown. Text decoded
/// from an entity is never read as a tag.
pub fn parse_inlines(text: &str) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut segment = 0;
    let mut from = 0;

    while let Some(found) = text[from..].find('`') {
        let open = from + found;
        match delimited(&text[open..], "`") {
            Some((code, consumed)) => {
                for inline in mixed_inlines(&text[segment..open]) {
                    push_inline(&mut out, inline);
                }
                push_inline(&mut out, Inline::Code(code.to_string()));
                segment = open + consumed;
                from = segment;
            }
            None => from = open + 1,
        }
    }
    for inline in mixed_inlines(&text[segment..]) {
        push_inline(&mut out, inline);
    }
    out
}

fn mixed_inlines(text: &str) -> Vec<Inline> {
    if !text.contains(['<', '&']) {
        return markdown_inlines(text);
    }
    let fragment = Html::parse_fragment(text);
    element_inlines(fragment.root_element(), TextMode::Markdown)
}

/// Inline markdown only.
fn markdown_inlines(text: &str) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut plain = String::new();
    let mut rest = text;
    let mut prev: Option<char> = None;

    while let Some(c) = rest.chars().next() {
        let after_word = prev.is_some_and(char::is_alphanumeric);
        if let Some((inline, consumed)) = match_inline(rest, after_word) {
            if !plain.is_empty() {
                out.push(Inline::Text(std::mem::take(&mut plain)));
            }
            out.push(inline);
            rest = &rest[consumed..];
            prev = None;
            continue;
        }
        plain.push(c);
        prev = Some(c);
        rest = &rest[c.len_utf8()..];
    }
    if !plain.is_empty() {
        out.push(Inline::Text(plain));
    }
    out
}

/// Try to read one inline construct at the start of `rest`, returning it and the bytes consumed.
///
/// Underscore emphasis does not start inside a word.
fn match_inline(rest: &str, after_word: bool) -> Option<(Inline, usize)> {
    for delim in ["**", "__"] {
        if after_word && delim == "__" {
            continue;
        }
        if let Some((inner, consumed)) = delimited(rest, delim) {
            return Some((Inline::Bold(markdown_inlines(inner)), consumed));
        }
    }
    for delim in ["*", "_"] {
        if after_word && delim == "_" {
            continue;
        }
        if let Some((inner, consumed)) = delimited(rest, delim) {
            return Some((Inline::Italic(markdown_inlines(inner)), consumed));
        }
    }
    if let Some((inner, consumed)) = delimited(rest, "`") {
        return Some((Inline::Code(inner.to_string()), consumed));
    }
    if let Some(after) = rest.strip_prefix("![") {
        let (alt, href, consumed) = bracketed_link(after)?;
        return Some((
            Inline::Image {
                src: href.to_string(),
                alt: alt.to_string(),
            },
            consumed + 2,
        ));
    }
    if let Some(after) = rest.strip_prefix('[') {
        if let Some((label, href, consumed)) = bracketed_link(after) {
            return Some((
                Inline::Link {
                    href: href.to_string(),
                    content: markdown_inlines(label),
                },
                consumed + 1,
            ));
        }
    }
    None
}

/// `delim inner delim` with non-empty inner text not starting with whitespace.
fn delimited<'a>(rest: &'a str, delim: &str) -> Option<(&'a str, usize)> {
    let after = rest.strip_prefix(delim)?;
    if after.starts_with(char::is_whitespace) || after.starts_with(delim) {
        return None;
    }
    let end = after.find(delim)?;
    let inner = &after[..end];
    if inner.is_empty() || inner.ends_with(char::is_whitespace) {
        return None;
    }
    Some((inner, delim.len() * 2 + end))
}

/// Parses `label](href)` returning label, href and bytes consumed.
fn bracketed_link(after: &str) -> Option<(&str, &str, usize)> {
    let mut depth = 0usize;
    let mut close = None;
    for (i, c) in after.char_indices() {
        match c {
            '[' => depth += 1,
            ']' if depth == 0 => {
                close = Some(i);
                break;
            }
            ']' => depth -= 1,
            _ => {}
        }
    }
    let close = close?;
    let label = &after[..close];
    let target = after[close + 1..].strip_prefix('(')?;
    let end = target.find(')')?;
    let href = target[..end].split_whitespace().next().unwrap_or("");
    Some((label, href, close + 2 + end + 1))
}
