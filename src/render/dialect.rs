//! Printers turning the document model into channel markup.

use super::document::{Block, Document, Inline};
use crate::error::{ReleaseError, Result};
use regex::Regex;

/// Host-application description markup: `<size=24>`, `<b>` and `<i>` only.
///
/// Angle brackets in text stay escaped, so no other tag reaches the host.
pub fn to_restricted(doc: &Document) -> String {
    let mut out = String::new();
    let mut previous: Option<&Block> = None;

    for block in &doc.blocks {
        if previous.is_some_and(|b| !matches!(b, Block::Heading { .. })) {
            out.push('\n');
        }
        match block {
            Block::Heading { content, .. } => {
                out.push_str("<size=24>");
                out.push_str(&restricted_inlines(content));
                out.push_str("</size>\n");
            }
            Block::Paragraph(content) => {
                out.push_str(&restricted_inlines(content));
                out.push('\n');
            }
            Block::List { items, .. } => {
                for item in items {
                    out.push_str(&restricted_inlines(item));
                    out.push('\n');
                }
            }
            Block::Code(code) => {
                out.push_str(&escape_angles(code));
                out.push('\n');
            }
            Block::Rule => out.push('\n'),
        }
        previous = Some(block);
    }

    out
}

fn restricted_inlines(content: &[Inline]) -> String {
    let mut out = String::new();
    for inline in content {
        match inline {
            Inline::Text(text) | Inline::Code(text) => out.push_str(&escape_angles(text)),
            Inline::Bold(inner) => {
                out.push_str("<b>");
                out.push_str(&restricted_inlines(inner));
                out.push_str("</b>");
            }
            Inline::Italic(inner) => {
                out.push_str("<i>");
                out.push_str(&restricted_inlines(inner));
                out.push_str("</i>");
            }
            Inline::Link { content, .. } => out.push_str(&restricted_inlines(content)),
            Inline::Image { .. } => {}
            Inline::LineBreak => out.push('\n'),
        }
    }
    out
}

fn escape_angles(text: &str) -> String {
    text.replace('<', "&lt;").replace('>', "&gt;")
}

/// Bulletin-board markup. Lists become ` - ` lines since the forum has no nested lists.
pub fn to_forum(doc: &Document) -> Result<String> {
    let mut out = String::new();

    for block in &doc.blocks {
        match block {
            Block::Heading { level, content } => {
                let level = (*level).clamp(1, 3);
                out.push_str(&format!("[h{}]{}[/h{}]\n", level, forum_inlines(content), level));
            }
            Block::Paragraph(content) => {
                out.push_str(&forum_inlines(content));
                out.push_str("\n\n");
            }
            Block::List { items, .. } => {
                for item in items {
                    out.push_str(" - ");
                    out.push_str(&forum_inlines(item));
                    out.push('\n');
                }
                out.push('\n');
            }
            Block::Code(code) => {
                out.push_str("[code]\n");
                out.push_str(code);
                out.push_str("\n[/code]\n\n");
            }
            Block::Rule => out.push_str("[hr][/hr]\n\n"),
        }
    }

    Ok(collapse_blank_lines(&out)?.trim_end().to_string())
}

fn forum_inlines(content: &[Inline]) -> String {
    let mut out = String::new();
    for inline in content {
        match inline {
            Inline::Text(text) | Inline::Code(text) => out.push_str(text),
            Inline::Bold(inner) => out.push_str(&format!("[b]{}[/b]", forum_inlines(inner))),
            Inline::Italic(inner) => out.push_str(&format!("[i]{}[/i]", forum_inlines(inner))),
            Inline::Link { href, content } => {
                out.push_str(&format!("[url={}]{}[/url]", href, forum_inlines(content)))
            }
            Inline::Image { src, .. } => out.push_str(&format!("[img]{}[/img]", src)),
            Inline::LineBreak => out.push('\n'),
        }
    }
    out
}

fn collapse_blank_lines(text: &str) -> Result<String> {
    let runs = Regex::new(r"\n{3,}").map_err(|e| ReleaseError::render(e.to_string()))?;
    Ok(runs.replace_all(text, "\n\n").into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Document {
        Document::parse(source).unwrap()
    }

    /// Names of every tag in restricted output
    fn tag_names(out: &str) -> Vec<String> {
        let tags = Regex::new(r"<(/?)([^<>=\s/]+)").unwrap();
        tags.captures_iter(out).map(|caps| caps[2].to_string()).collect()
    }

    #[test]
    fn test_restricted_heading_and_paragraph() {
        let doc = parse("<h1>Title</h1><p>Body</p>");
        assert_eq!(to_restricted(&doc), "<size=24>Title</size>\nBody\n");
    }

    #[test]
    fn test_restricted_keeps_only_allowed_tags() {
        let doc = parse("Some **bold**, *italic* and a [link](https://x).\n\n![img](a.png)");
        let out = to_restricted(&doc);
        assert_eq!(out, "Some <b>bold</b>, <i>italic</i> and a link.\n\n\n");
    }

    #[test]
    fn test_restricted_unescapes_ampersand() {
        let doc = parse("<p>Salt &amp; Pepper</p>");
        assert_eq!(to_restricted(&doc), "Salt & Pepper\n");
    }

    #[test]
    fn test_restricted_keeps_escaped_tags_escaped() {
        let doc = parse("<p>&lt;color=red&gt;alert&lt;/color&gt; &amp; <b>bold</b></p>");
        assert_eq!(
            to_restricted(&doc),
            "&lt;color=red&gt;alert&lt;/color&gt; & <b>bold</b>\n"
        );
    }

    #[test]
    fn test_restricted_emits_only_allowed_tags() {
        let doc = parse(
            "# Title\n\nUse &lt;color=red&gt; with <color=blue>raw</color> and <span>span</span>, `a<b>c`.\n\n```\n<i>code</i>\n```",
        );
        let out = to_restricted(&doc);
        let names = tag_names(&out);
        assert!(!names.is_empty());
        assert!(
            names.iter().all(|n| ["size", "b", "i"].contains(&n.as_str())),
            "unexpected tags in {:?}",
            out
        );
        assert!(out.contains("Use &lt;color=red&gt; with raw and span, a&lt;b&gt;c."));
        assert!(out.contains("&lt;i&gt;code&lt;/i&gt;"));
    }

    #[test]
    fn test_restricted_paragraphs_separated() {
        let doc = parse("one\n\ntwo");
        assert_eq!(to_restricted(&doc), "one\n\ntwo\n");
    }

    #[test]
    fn test_forum_list_is_dash_lines() {
        let doc = parse("- first\n- second");
        let out = to_forum(&doc).unwrap();
        assert_eq!(out, " - first\n - second");
        assert!(!out.contains("[list]"));
        assert!(!out.contains("[ul]"));
        assert!(!out.contains("[li]"));
        assert!(!out.contains("[*]"));
    }

    #[test]
    fn test_forum_blocks() {
        let doc = parse("# Colony\nManages **everything**.\n\n### Links\n[Forum](https://f/t)");
        assert_eq!(
            to_forum(&doc).unwrap(),
            "[h1]Colony[/h1]\nManages [b]everything[/b].\n\n[h3]Links[/h3]\n[url=https://f/t]Forum[/url]"
        );
    }

    #[test]
    fn test_forum_never_has_more_than_one_blank_line() {
        let doc = parse("a\n\n---\n\n- x\n\n```\ncode\n```\n\nb");
        let out = to_forum(&doc).unwrap();
        assert!(!out.contains("\n\n\n"));
        assert!(out.starts_with("a\n\n[hr][/hr]\n\n - x\n\n[code]\ncode\n[/code]\n\nb"));
    }

    #[test]
    fn test_forum_deep_heading_clamped() {
        let doc = parse("##### small");
        assert_eq!(to_forum(&doc).unwrap(), "[h3]small[/h3]");
    }
}
