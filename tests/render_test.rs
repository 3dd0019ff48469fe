// tests/render_test.rs
use mod_release::config::Config;
use mod_release::domain::{HostVersion, ModDescriptor, Version};
use mod_release::render::{self, Dialect, RenderContext, RenderOptions, Templates};
use mod_release::ReleaseError;

const DESCRIPTION: &str = "# {mod.name}

Manages **everything** in your colony.

## Features
- Work {mod.name == 'Colony' ? 'queues' : 'lists'}
- Stockpile *priorities*

Made by {config.author} for {host_version}.";

fn descriptor() -> ModDescriptor {
    let mut descriptor = ModDescriptor::bootstrap("Colony", 1, None, vec!["1.3".to_string(), "1.4".to_string()]);
    descriptor.version = Version::new(1, 3, 31).with_alpha(1);
    descriptor.changenote = "2024-03-02 :: Bea :: add tooltip".to_string();
    descriptor
        .contributors
        .0
        .insert("Bea".to_string(), "add tooltip".to_string());
    descriptor
}

fn templates() -> Templates {
    Templates {
        description: DESCRIPTION.to_string(),
        version: Some("Version {version}".to_string()),
        footer: Some("---\nDiscuss on the [forum]({config.forum_thread})".to_string()),
    }
}

fn config() -> Config {
    Config {
        forum_thread: "https://forum.example/t/1".to_string(),
        ..Config::default()
    }
}

fn render(dialect: Dialect) -> String {
    let descriptor = descriptor();
    let config = config();
    let templates = templates();
    let host = HostVersion::parse("1.4.3704 rev1012").unwrap();
    let ctx = RenderContext {
        descriptor: &descriptor,
        config: &config,
        templates: &templates,
        host_version: Some(&host),
    };
    render::render(&ctx, dialect, RenderOptions::for_dialect(dialect)).unwrap()
}

#[test]
fn test_plain_keeps_markdown_and_adds_badge_and_notes() {
    let out = render(Dialect::Plain);

    assert!(out.starts_with("[![RimWorld 1.3 | 1.4]("));
    assert!(out.contains("# Colony\n\nManages **everything** in your colony."));
    assert!(out.contains("- Work queues"));
    assert!(out.contains("Made by Fluffy for 1.4.3704."));
    assert!(out.contains("# Contributors\n - Bea:\tadd tooltip"));
    assert!(out.contains("Version 1.3.31"));
    assert!(out.ends_with("# Changenotes\n - 2024-03-02 :: Bea :: add tooltip"));
    // Footer is a forum-only section
    assert!(!out.contains("Discuss on the"));
}

#[test]
fn test_restricted_uses_host_markup_only() {
    let out = render(Dialect::Restricted);

    assert!(out.starts_with("<size=24>Colony</size>\n"));
    assert!(out.contains("Manages <b>everything</b> in your colony."));
    assert!(out.contains("<size=24>Features</size>"));
    assert!(out.contains("Work queues\nStockpile <i>priorities</i>"));
    assert!(!out.contains("**"));
    assert!(!out.contains("[!["));
    assert!(!out.contains("Changenotes"));
}

#[test]
fn test_forum_uses_bulletin_board_markup() {
    let out = render(Dialect::Forum);

    assert!(out.starts_with("[h1]Colony[/h1]\n"));
    assert!(out.contains("[h2]Features[/h2]"));
    assert!(out.contains(" - Work queues\n - Stockpile [i]priorities[/i]"));
    assert!(out.contains("[hr][/hr]"));
    assert!(out.contains("[url=https://forum.example/t/1]forum[/url]"));
    assert!(!out.contains("\n\n\n"));
    assert!(!out.contains("Changenotes"));
}

#[test]
fn test_html_template_renders_in_every_dialect() {
    let mut descriptor = descriptor();
    descriptor.changenote.clear();
    descriptor.contributors.0.clear();
    let config = config();
    let templates = Templates {
        description: "<h1>Colony</h1><p>Salt &amp; <b>pepper</b></p><ul><li>one</li><li>two</li></ul>"
            .to_string(),
        version: None,
        footer: None,
    };
    let ctx = RenderContext {
        descriptor: &descriptor,
        config: &config,
        templates: &templates,
        host_version: None,
    };

    let restricted = render::render(&ctx, Dialect::Restricted, RenderOptions::bare()).unwrap();
    assert!(restricted.contains("<size=24>Colony</size>"));
    assert!(restricted.contains("Salt & <b>pepper</b>"));
    assert!(!restricted.contains("<p>"));
    assert!(!restricted.contains("<li>"));

    let forum = render::render(&ctx, Dialect::Forum, RenderOptions::bare()).unwrap();
    assert!(forum.contains("[h1]Colony[/h1]"));
    assert!(forum.contains(" - one\n - two"));
}

#[test]
fn test_render_named_rejects_unknown_dialect() {
    let descriptor = descriptor();
    let config = config();
    let templates = templates();
    let ctx = RenderContext {
        descriptor: &descriptor,
        config: &config,
        templates: &templates,
        host_version: None,
    };

    assert!(render::render_named(&ctx, "steam").unwrap().starts_with("[h1]Colony[/h1]"));
    assert!(matches!(
        render::render_named(&ctx, "html"),
        Err(ReleaseError::Config(_))
    ));
}

#[test]
fn test_bad_expression_names_the_source() {
    let descriptor = descriptor();
    let config = config();
    let templates = Templates {
        description: "By {author.name}".to_string(),
        ..Templates::default()
    };
    let ctx = RenderContext {
        descriptor: &descriptor,
        config: &config,
        templates: &templates,
        host_version: None,
    };

    let err = render::render(&ctx, Dialect::Plain, RenderOptions::bare()).unwrap_err();
    assert!(matches!(err, ReleaseError::Expression(_)));
    assert!(err.to_string().contains("author.name"));
}
