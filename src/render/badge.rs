use crate::config::BadgeConfig;
use crate::error::{ReleaseError, Result};
use url::Url;

const SHIELDS_BASE: &str = "https://img.shields.io/badge/";

/// Markdown image for a shields.io static badge, wrapped in a link when `href` is set.
pub fn badge(subject: &str, status: &str, color: &str, href: Option<&str>) -> Result<String> {
    let mut shield = Url::parse(SHIELDS_BASE).map_err(|e| ReleaseError::render(e.to_string()))?;
    let segment = format!("{}-{}-{}.svg", escape(subject), escape(status), color);
    shield
        .path_segments_mut()
        .map_err(|_| ReleaseError::render("badge base URL cannot take path segments"))?
        .pop_if_empty()
        .push(&segment);

    let image = format!("![{} {}]({})", subject, status, shield);
    Ok(match href {
        Some(href) if !href.is_empty() => format!("[{}]({})", image, href),
        _ => image,
    })
}

/// The compatibility badge: supported tags, else the host version, else "unknown".
pub fn compatibility_badge(config: &BadgeConfig, tags: &[String], host_version: Option<&str>) -> Result<String> {
    let status = if !tags.is_empty() {
        tags.join(" | ")
    } else {
        host_version.unwrap_or("unknown").to_string()
    };
    badge(&config.subject, &status, &config.color, config.href.as_deref())
}

// shields.io reads `-` and `_` as separators; doubling them makes them literal.
fn escape(text: &str) -> String {
    text.replace('-', "--").replace('_', "__")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_badge_with_link() {
        let out = badge("RimWorld", "1.4", "brightgreen", Some("http://rimworldgame.com/")).unwrap();
        assert_eq!(
            out,
            "[![RimWorld 1.4](https://img.shields.io/badge/RimWorld-1.4-brightgreen.svg)](http://rimworldgame.com/)"
        );
    }

    #[test]
    fn test_badge_encodes_segment() {
        let out = badge("Rim World", "1.3 | 1.4", "blue", None).unwrap();
        assert!(out.starts_with("![Rim World 1.3 | 1.4](https://img.shields.io/badge/Rim%20World-1.3%20"));
        assert!(out.ends_with("1.4-blue.svg)"));
        let url = out.split("](").nth(1).unwrap();
        assert!(!url.contains(' '));
    }

    #[test]
    fn test_badge_escapes_separators() {
        let out = badge("mod-release", "v1", "red", None).unwrap();
        assert!(out.contains("/badge/mod--release-v1-red.svg"));
    }

    #[test]
    fn test_compatibility_prefers_tags() {
        let config = BadgeConfig::default();
        let tagged = compatibility_badge(&config, &["1.3".to_string(), "1.4".to_string()], Some("1.4")).unwrap();
        assert!(tagged.starts_with("[![RimWorld 1.3 | 1.4]"));

        let untagged = compatibility_badge(&config, &[], Some("1.5")).unwrap();
        assert!(untagged.starts_with("[![RimWorld 1.5]"));
    }
}
