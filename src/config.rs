use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ReleaseError, Result};

/// Default file name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "modrelease.toml";

/// File name looked up in the user configuration directory.
pub const USER_CONFIG_FILE: &str = ".modrelease.toml";

/// Represents the complete configuration for mod-release.
///
/// Contains author defaults, file locations relative to the mod source directory,
/// badge and forum settings, and the external commands backing each distribution channel.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_author")]
    pub author: String,

    #[serde(default)]
    pub forum_thread: String,

    #[serde(default = "default_alpha")]
    pub current_alpha: u32,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default = "default_no_log_marker")]
    pub no_log_marker: String,

    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub badge: BadgeConfig,

    #[serde(default)]
    pub forum: ForumConfig,

    #[serde(default)]
    pub channels: ChannelsConfig,
}

fn default_author() -> String {
    "Fluffy".to_string()
}

fn default_alpha() -> u32 {
    1
}

fn default_no_log_marker() -> String {
    "[nolog]".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

/// File locations. Relative paths resolve against the mod source directory.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PathsConfig {
    #[serde(default = "default_descriptor_path")]
    pub descriptor: PathBuf,

    #[serde(default = "default_change_notes_path")]
    pub change_notes: PathBuf,

    #[serde(default = "default_description_template")]
    pub description_template: PathBuf,

    #[serde(default)]
    pub version_template: Option<PathBuf>,

    #[serde(default)]
    pub footer_template: Option<PathBuf>,

    #[serde(default)]
    pub host_version: Option<PathBuf>,

    #[serde(default = "default_about_path")]
    pub about: PathBuf,

    #[serde(default = "default_manifest_path")]
    pub manifest: PathBuf,

    /// Where the workshop uploader leaves the item id
    #[serde(default = "default_published_file_id_path")]
    pub published_file_id: PathBuf,

    #[serde(default)]
    pub assembly_info: Option<PathBuf>,

    #[serde(default = "default_readme_path")]
    pub readme: PathBuf,

    #[serde(default = "default_archives_path")]
    pub archives: PathBuf,
}

fn default_descriptor_path() -> PathBuf {
    PathBuf::from("Source/ModConfig.json")
}

fn default_change_notes_path() -> PathBuf {
    PathBuf::from("changenotes.json")
}

fn default_description_template() -> PathBuf {
    PathBuf::from("Source/Description.md")
}

fn default_about_path() -> PathBuf {
    PathBuf::from("About/About.xml")
}

fn default_manifest_path() -> PathBuf {
    PathBuf::from("About/Manifest.xml")
}

fn default_published_file_id_path() -> PathBuf {
    PathBuf::from("About/PublishedFileId.txt")
}

fn default_readme_path() -> PathBuf {
    PathBuf::from("Readme.md")
}

fn default_archives_path() -> PathBuf {
    PathBuf::from("archives")
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            descriptor: default_descriptor_path(),
            change_notes: default_change_notes_path(),
            description_template: default_description_template(),
            version_template: None,
            footer_template: None,
            host_version: None,
            about: default_about_path(),
            manifest: default_manifest_path(),
            published_file_id: default_published_file_id_path(),
            assembly_info: None,
            readme: default_readme_path(),
            archives: default_archives_path(),
        }
    }
}

/// Compatibility badge prepended to the plain dialect.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BadgeConfig {
    #[serde(default = "default_badge_subject")]
    pub subject: String,

    #[serde(default = "default_badge_color")]
    pub color: String,

    #[serde(default)]
    pub href: Option<String>,
}

fn default_badge_subject() -> String {
    "RimWorld".to_string()
}

fn default_badge_color() -> String {
    "brightgreen".to_string()
}

impl Default for BadgeConfig {
    fn default() -> Self {
        BadgeConfig {
            subject: default_badge_subject(),
            color: default_badge_color(),
            href: Some("http://rimworldgame.com/".to_string()),
        }
    }
}

/// Forum thread settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ForumConfig {
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    #[serde(default = "default_title_prefix")]
    pub title_prefix: String,
}

fn default_max_bytes() -> usize {
    20_000
}

fn default_title_prefix() -> String {
    "[MODLIST]".to_string()
}

impl Default for ForumConfig {
    fn default() -> Self {
        ForumConfig {
            max_bytes: default_max_bytes(),
            title_prefix: default_title_prefix(),
        }
    }
}

/// An external program invocation.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CommandSpec {
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,
}

/// External commands backing each distribution channel. Unset channels cannot publish.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct ChannelsConfig {
    #[serde(default)]
    pub build: Option<CommandSpec>,

    #[serde(default)]
    pub registry: Option<CommandSpec>,

    #[serde(default)]
    pub workshop: Option<CommandSpec>,

    #[serde(default)]
    pub forum: Option<CommandSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            author: default_author(),
            forum_thread: String::new(),
            current_alpha: default_alpha(),
            tags: Vec::new(),
            no_log_marker: default_no_log_marker(),
            remote: default_remote(),
            paths: PathsConfig::default(),
            badge: BadgeConfig::default(),
            forum: ForumConfig::default(),
            channels: ChannelsConfig::default(),
        }
    }
}

impl Config {
    /// Resolve a configured path against the mod source directory.
    pub fn resolve(&self, source: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            source.join(path)
        }
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `modrelease.toml` in current directory
/// 3. `.modrelease.toml` in user config directory
/// 4. Default configuration if no file found
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config_str = if let Some(path) = config_path {
        read_config_file(path)?
    } else if Path::new(LOCAL_CONFIG_FILE).exists() {
        read_config_file(Path::new(LOCAL_CONFIG_FILE))?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(USER_CONFIG_FILE);
        if config_path.exists() {
            read_config_file(&config_path)?
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    parse_config(&config_str)
}

/// Parses configuration from TOML text.
pub fn parse_config(config_str: &str) -> Result<Config> {
    toml::from_str(config_str).map_err(|e| ReleaseError::config(e.to_string()))
}

fn read_config_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        ReleaseError::config(format!("cannot read config '{}': {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.no_log_marker, "[nolog]");
        assert_eq!(config.forum.max_bytes, 20_000);
        assert_eq!(config.remote, "origin");
        assert!(config.channels.registry.is_none());
    }

    #[test]
    fn test_empty_toml_equals_default() {
        let config = parse_config("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let config = Config::default();
        let source = Path::new("/mods/Colony");
        assert_eq!(
            config.resolve(source, Path::new("Readme.md")),
            PathBuf::from("/mods/Colony/Readme.md")
        );
        assert_eq!(
            config.resolve(source, Path::new("/tmp/notes.json")),
            PathBuf::from("/tmp/notes.json")
        );
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = parse_config("author = [").unwrap_err();
        assert!(err.to_string().starts_with("Configuration error"));
    }
}
