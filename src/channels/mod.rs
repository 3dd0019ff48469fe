//! Distribution channels
//!
//! Every external destination of a release (the build tool, the source
//! host's release registry, the marketplace and the forum) is reached through
//! the [`Channel`] trait:
//! - [`command::CommandChannel`]: runs a configured program with `MODRELEASE_*` variables
//! - [`NullChannel`]: stands in for a channel without configuration

pub mod command;

pub use command::CommandChannel;

use crate::config::ChannelsConfig;
use crate::error::{ReleaseError, Result};
use std::collections::HashMap;
use std::path::PathBuf;

/// The destinations a release is handed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Build,
    Registry,
    Workshop,
    Forum,
}

impl ChannelKind {
    pub fn name(&self) -> &'static str {
        match self {
            ChannelKind::Build => "build",
            ChannelKind::Registry => "registry",
            ChannelKind::Workshop => "workshop",
            ChannelKind::Forum => "forum",
        }
    }
}

/// What is handed to a channel
#[derive(Debug, Clone, PartialEq)]
pub struct Publication {
    pub kind: ChannelKind,
    /// Mod name
    pub name: String,
    /// Version string, `M.m.b`
    pub version: String,
    /// Mod source directory; commands run here
    pub source: PathBuf,
    pub title: String,
    /// Rendered body in the channel's dialect
    pub body: String,
    /// Release tag, `v<version>`
    pub tag: Option<String>,
    /// Archive to attach
    pub asset: Option<PathBuf>,
    pub draft: bool,
    pub prerelease: bool,
    /// Change-note summary of this run
    pub changenote: String,
    /// Marketplace item id, when already published
    pub published_file_id: Option<String>,
    /// Build profile, `debug` or `release`
    pub profile: Option<String>,
}

impl Publication {
    pub fn new(kind: ChannelKind, name: &str, version: &str, source: PathBuf) -> Self {
        Publication {
            kind,
            name: name.to_string(),
            version: version.to_string(),
            source,
            title: String::new(),
            body: String::new(),
            tag: None,
            asset: None,
            draft: false,
            prerelease: false,
            changenote: String::new(),
            published_file_id: None,
            profile: None,
        }
    }

    /// Environment handed to external commands, `MODRELEASE_*`.
    pub fn to_env_vars(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();

        env.insert("MODRELEASE_CHANNEL".to_string(), self.kind.name().to_string());
        env.insert("MODRELEASE_NAME".to_string(), self.name.clone());
        env.insert("MODRELEASE_VERSION".to_string(), self.version.clone());
        env.insert("MODRELEASE_SOURCE".to_string(), self.source.display().to_string());
        env.insert("MODRELEASE_TITLE".to_string(), self.title.clone());
        env.insert("MODRELEASE_DRAFT".to_string(), self.draft.to_string());
        env.insert("MODRELEASE_PRERELEASE".to_string(), self.prerelease.to_string());

        if let Some(ref tag) = self.tag {
            env.insert("MODRELEASE_TAG".to_string(), tag.clone());
        }

        if let Some(ref asset) = self.asset {
            env.insert("MODRELEASE_ASSET".to_string(), asset.display().to_string());
        }

        if let Some(ref id) = self.published_file_id {
            env.insert("MODRELEASE_PUBLISHED_FILE_ID".to_string(), id.clone());
        }

        if let Some(ref profile) = self.profile {
            env.insert("MODRELEASE_BUILD_PROFILE".to_string(), profile.clone());
        }

        env
    }
}

/// A distribution destination. Channels do not retry.
pub trait Channel: Send + Sync {
    fn publish(&self, publication: &Publication) -> Result<()>;

    /// Whether publishing can do anything at all
    fn is_configured(&self) -> bool {
        true
    }
}

/// Channel without configuration; publishing through it is an error.
#[derive(Debug, Clone, Copy)]
pub struct NullChannel(pub ChannelKind);

impl Channel for NullChannel {
    fn publish(&self, publication: &Publication) -> Result<()> {
        Err(ReleaseError::config(format!(
            "no command configured for the {} channel (publishing {} v{})",
            self.0.name(),
            publication.name,
            publication.version
        )))
    }

    fn is_configured(&self) -> bool {
        false
    }
}

/// One channel per [`ChannelKind`]
pub struct Channels {
    channels: HashMap<ChannelKind, Box<dyn Channel>>,
}

impl Channels {
    /// All channels unconfigured
    pub fn new() -> Self {
        Channels {
            channels: HashMap::new(),
        }
    }

    /// Command channels for every configured entry.
    pub fn from_config(config: &ChannelsConfig) -> Self {
        let configured = [
            (ChannelKind::Build, &config.build),
            (ChannelKind::Registry, &config.registry),
            (ChannelKind::Workshop, &config.workshop),
            (ChannelKind::Forum, &config.forum),
        ];

        configured
            .into_iter()
            .fold(Self::new(), |channels, (kind, spec)| match spec {
                Some(spec) => channels.with(kind, Box::new(CommandChannel::new(kind, spec.clone()))),
                None => channels,
            })
    }

    pub fn with(mut self, kind: ChannelKind, channel: Box<dyn Channel>) -> Self {
        self.channels.insert(kind, channel);
        self
    }

    pub fn is_configured(&self, kind: ChannelKind) -> bool {
        self.channels.get(&kind).is_some_and(|c| c.is_configured())
    }

    pub fn publish(&self, publication: &Publication) -> Result<()> {
        match self.channels.get(&publication.kind) {
            Some(channel) => channel.publish(publication),
            None => NullChannel(publication.kind).publish(publication),
        }
    }
}

impl Default for Channels {
    fn default() -> Self {
        Self::new()
    }
}
