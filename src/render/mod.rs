//! Description rendering for every distribution channel.
//!
//! A description is assembled from the canonical template and run data, then
//! printed in one of three dialects:
//! - [`Dialect::Plain`]: markdown as written (source hosting, readme)
//! - [`Dialect::Restricted`]: the host application's in-engine markup
//! - [`Dialect::Forum`]: bulletin-board markup

pub mod badge;
pub mod dialect;
pub mod document;
pub mod expr;

use crate::boundary::BoundaryWarning;
use crate::config::Config;
use crate::domain::{HostVersion, ModDescriptor};
use crate::error::{ReleaseError, Result};
use document::Document;
use expr::Snapshot;
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Target markup flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Plain,
    Restricted,
    Forum,
}

impl Dialect {
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Plain => "plain",
            Dialect::Restricted => "restricted",
            Dialect::Forum => "forum",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = ReleaseError;

    /// Accepts the dialect names and the channel names they are used for.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "github" | "markdown" => Ok(Dialect::Plain),
            "restricted" | "rimworld" => Ok(Dialect::Restricted),
            "forum" | "steam" | "bbcode" => Ok(Dialect::Forum),
            other => Err(ReleaseError::config(format!(
                "Unrecognized description format '{}'",
                other
            ))),
        }
    }
}

/// Optional sections of a rendered description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub badges: bool,
    pub footer: bool,
    pub changenotes: bool,
}

impl RenderOptions {
    /// Badges and change notes for plain, the footer for forum, nothing extra for restricted.
    pub fn for_dialect(dialect: Dialect) -> Self {
        RenderOptions {
            badges: dialect == Dialect::Plain,
            footer: dialect == Dialect::Forum,
            changenotes: dialect == Dialect::Plain,
        }
    }

    pub fn bare() -> Self {
        RenderOptions {
            badges: false,
            footer: false,
            changenotes: false,
        }
    }
}

/// Raw template text, read once per run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Templates {
    pub description: String,
    pub version: Option<String>,
    pub footer: Option<String>,
}

impl Templates {
    /// Read the configured templates. The description is required; the
    /// optional ones are dropped with a warning when their file is missing.
    pub fn load(config: &Config, source: &Path) -> Result<(Self, Vec<BoundaryWarning>)> {
        let description_path = config.resolve(source, &config.paths.description_template);
        let description = fs::read_to_string(&description_path).map_err(|e| {
            ReleaseError::config(format!(
                "Cannot read description template '{}': {}",
                description_path.display(),
                e
            ))
        })?;

        let mut warnings = Vec::new();
        let mut optional = |path: &Option<std::path::PathBuf>| -> Option<String> {
            let path = config.resolve(source, path.as_ref()?);
            match fs::read_to_string(&path) {
                Ok(text) => Some(text),
                Err(_) => {
                    let warning = BoundaryWarning::MissingTemplate { path };
                    warning.emit();
                    warnings.push(warning);
                    None
                }
            }
        };
        let version = optional(&config.paths.version_template);
        let footer = optional(&config.paths.footer_template);

        Ok((
            Templates {
                description,
                version,
                footer,
            },
            warnings,
        ))
    }
}

/// Everything a render reads. Borrowed, never mutated.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub descriptor: &'a ModDescriptor,
    pub config: &'a Config,
    pub templates: &'a Templates,
    pub host_version: Option<&'a HostVersion>,
}

impl<'a> RenderContext<'a> {
    /// The immutable view template expressions are evaluated against.
    pub fn snapshot(&self, dialect: Dialect) -> Result<Snapshot> {
        let host_version = match self.host_version {
            Some(host) => Value::String(host.to_string()),
            None => Value::Null,
        };
        Ok(Snapshot::new()
            .with("mod", serde_json::to_value(self.descriptor)?)
            .with("config", serde_json::to_value(self.config)?)
            .with("format", Value::String(dialect.name().to_string()))
            .with("version", Value::String(self.descriptor.version_string()))
            .with("host_version", host_version))
    }
}

/// Assemble and print a description.
///
/// Sections, in order: badge, description, contributors, footer, version
/// block, change notes. Missing optional sections are skipped silently.
pub fn render(ctx: &RenderContext<'_>, dialect: Dialect, options: RenderOptions) -> Result<String> {
    let snapshot = ctx.snapshot(dialect)?;
    let descriptor = ctx.descriptor;
    let mut parts = Vec::new();

    if options.badges {
        let host = ctx.host_version.map(HostVersion::main);
        parts.push(badge::compatibility_badge(
            &ctx.config.badge,
            &descriptor.tags,
            host.as_deref(),
        )?);
    }

    parts.push(expr::fill(&ctx.templates.description, &snapshot)?);

    let mut contributors = descriptor.contributors.described().peekable();
    if contributors.peek().is_some() {
        let mut section = String::from("# Contributors");
        for (name, summary) in contributors {
            section.push_str(&format!("\n - {}:\t{}", name, summary));
        }
        parts.push(section);
    }

    if options.footer {
        if let Some(footer) = &ctx.templates.footer {
            parts.push(expr::fill(footer, &snapshot)?);
        }
    }

    if let Some(version) = &ctx.templates.version {
        parts.push(expr::fill(version, &snapshot)?);
    }

    if options.changenotes && !descriptor.changenote.trim().is_empty() {
        let lines: Vec<String> = descriptor
            .changenote
            .lines()
            .map(|line| format!(" - {}", line))
            .collect();
        parts.push(format!("# Changenotes\n{}", lines.join("\n")));
    }

    let text = parts.join("\n\n");
    tracing::debug!(dialect = %dialect, bytes = text.len(), "rendered description");

    Ok(match dialect {
        Dialect::Plain => text,
        Dialect::Restricted => dialect::to_restricted(&Document::parse(&text)?),
        Dialect::Forum => dialect::to_forum(&Document::parse(&text)?)?,
    })
}

/// Render by dialect name; an unknown name is a configuration error.
pub fn render_named(ctx: &RenderContext<'_>, dialect: &str) -> Result<String> {
    let dialect: Dialect = dialect.parse()?;
    render(ctx, dialect, RenderOptions::for_dialect(dialect))
}
