//! The release, update and update-remote step lists.

use super::Step;
use crate::boundary::BoundaryWarning;
use crate::channels::{ChannelKind, Channels, Publication};
use crate::config::Config;
use crate::domain::note::changenote_text;
use crate::domain::{ChangeNote, GitCoordinates, HostVersion, ModDescriptor, VersionBump};
use crate::error::{ReleaseError, Result};
use crate::forum;
use crate::git::VersionControl;
use crate::notes::{ChangeNoteStore, Collector};
use crate::persist::write_atomic;
use crate::render::{self, Dialect, RenderContext, RenderOptions, Templates};
use crate::stamp::{self, AboutFields, ManifestFields};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const PUBLISHED_FILE_ID: &str = "PublishedFileId.txt";

/// Which command is being run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Workflow {
    /// Intermediate update: build bump, metadata refresh, build
    Update,
    /// Full release to every channel
    Release,
    /// Point the remote at `https://github.com/<user>/<repo>.git`
    UpdateRemote { user: String, repo: Option<String> },
}

/// Command-line switches of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseFlags {
    pub prerelease: bool,
    pub draft: bool,
    pub major: bool,
    pub force_commit: bool,
    pub no_version_bump: bool,
    pub build_release: bool,
    pub reset_tag: bool,
    pub forum_title: Option<String>,
    pub no_build: bool,
    pub no_github: bool,
    pub no_steam: bool,
    pub no_forum: bool,
}

/// State shared by the steps of one run.
pub struct ReleaseContext {
    pub config: Config,
    /// Mod source directory
    pub source: PathBuf,
    /// Name for a mod released for the first time; defaults to the directory name
    pub name: Option<String>,
    pub workflow: Workflow,
    pub flags: ReleaseFlags,
    pub repo: Arc<dyn VersionControl>,
    pub channels: Channels,
    pub descriptor: Option<ModDescriptor>,
    pub host_version: Option<HostVersion>,
    pub templates: Option<Templates>,
    /// Notes collected by this run
    pub new_notes: Vec<ChangeNote>,
    pub warnings: Vec<BoundaryWarning>,
}

impl ReleaseContext {
    pub fn new(
        config: Config,
        source: PathBuf,
        workflow: Workflow,
        repo: Arc<dyn VersionControl>,
        channels: Channels,
    ) -> Self {
        ReleaseContext {
            config,
            source,
            name: None,
            workflow,
            flags: ReleaseFlags::default(),
            repo,
            channels,
            descriptor: None,
            host_version: None,
            templates: None,
            new_notes: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn with_flags(mut self, flags: ReleaseFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn path(&self, configured: &Path) -> PathBuf {
        self.config.resolve(&self.source, configured)
    }

    pub fn descriptor_path(&self) -> PathBuf {
        self.path(&self.config.paths.descriptor)
    }

    pub fn store_path(&self) -> PathBuf {
        self.path(&self.config.paths.change_notes)
    }

    pub fn descriptor(&self) -> Result<&ModDescriptor> {
        self.descriptor
            .as_ref()
            .ok_or_else(|| ReleaseError::config("mod descriptor has not been loaded"))
    }

    pub fn descriptor_mut(&mut self) -> Result<&mut ModDescriptor> {
        self.descriptor
            .as_mut()
            .ok_or_else(|| ReleaseError::config("mod descriptor has not been loaded"))
    }

    pub fn directive(&self) -> VersionBump {
        VersionBump::from_flags(self.flags.major, self.workflow == Workflow::Release)
    }

    fn warn(&mut self, warning: BoundaryWarning) {
        self.warnings.push(warning);
    }

    /// Repository name attached to collected notes.
    fn repo_name(&self) -> Result<String> {
        let descriptor = self.descriptor()?;
        Ok(if descriptor.git_repo.is_empty() {
            descriptor.name.clone()
        } else {
            descriptor.git_repo.clone()
        })
    }

    fn ensure_templates(&mut self) -> Result<()> {
        if self.templates.is_none() {
            let (templates, warnings) = Templates::load(&self.config, &self.source)?;
            self.warnings.extend(warnings);
            self.templates = Some(templates);
        }
        Ok(())
    }

    /// Render the mod description. Templates are read on first use.
    pub fn render(&mut self, dialect: Dialect, options: RenderOptions) -> Result<String> {
        self.ensure_templates()?;
        let templates = self
            .templates
            .as_ref()
            .ok_or_else(|| ReleaseError::config("templates have not been loaded"))?;
        let ctx = RenderContext {
            descriptor: self.descriptor()?,
            config: &self.config,
            templates,
            host_version: self.host_version.as_ref(),
        };
        render::render(&ctx, dialect, options)
    }

    /// Read the workshop item id, copying it next to `About.xml` when it
    /// lives elsewhere. A missing or empty file is a warning.
    fn lookup_published_file_id(&mut self) -> Result<Option<String>> {
        let path = self.path(&self.config.paths.published_file_id);
        let reason = match fs::read_to_string(&path) {
            Ok(raw) if !raw.trim().is_empty() => {
                let id = raw.trim().to_string();
                let mirror = self
                    .path(&self.config.paths.about)
                    .parent()
                    .map(|dir| dir.join(PUBLISHED_FILE_ID));
                if let Some(mirror) = mirror.filter(|mirror| *mirror != path) {
                    write_atomic(&mirror, &id)?;
                }
                return Ok(Some(id));
            }
            Ok(_) => "file is empty".to_string(),
            Err(e) => e.to_string(),
        };
        let warning = BoundaryWarning::MissingPublishedFileId { path, reason };
        warning.emit();
        self.warn(warning);
        Ok(None)
    }

    fn publication(&self, kind: ChannelKind) -> Result<Publication> {
        let descriptor = self.descriptor()?;
        let mut publication = Publication::new(
            kind,
            &descriptor.name,
            &descriptor.version_string(),
            self.source.clone(),
        );
        publication.changenote = descriptor.changenote.clone();
        publication.published_file_id = descriptor.published_file_id.clone();
        Ok(publication)
    }

    fn version_label(&self) -> String {
        self.descriptor
            .as_ref()
            .map(|d| format!("v{}", d.version))
            .unwrap_or_else(|| "the new version".to_string())
    }

    fn build_profile(&self) -> &'static str {
        if self.workflow == Workflow::Release || self.flags.build_release {
            "release"
        } else {
            "debug"
        }
    }
}

/// Steps for a workflow, in execution order.
pub fn steps_for(workflow: &Workflow) -> Vec<Step<ReleaseContext>> {
    match workflow {
        Workflow::Update => update_steps(),
        Workflow::Release => release_steps(),
        Workflow::UpdateRemote { .. } => update_remote_steps(),
    }
}

pub fn update_steps() -> Vec<Step<ReleaseContext>> {
    vec![
        load_descriptor(),
        update_descriptor(),
        update_readme(),
        update_about(),
        update_assembly_info(),
        build(),
    ]
}

pub fn release_steps() -> Vec<Step<ReleaseContext>> {
    vec![
        check_git_status(),
        load_descriptor(),
        update_descriptor(),
        update_readme(),
        update_about(),
        update_assembly_info(),
        update_manifest(),
        build(),
        commit_push(),
        github_release(),
        workshop_release(),
        forum_post(),
    ]
}

pub fn update_remote_steps() -> Vec<Step<ReleaseContext>> {
    vec![load_descriptor(), update_remote(), save_descriptor()]
}

pub fn check_git_status() -> Step<ReleaseContext> {
    Step::new("check-git-status", |ctx: &mut ReleaseContext| {
        let status = ctx.repo.status(&ctx.config.remote)?;
        if status.is_clean() {
            return Ok(());
        }
        if ctx.flags.force_commit {
            tracing::warn!(
                dirty = status.dirty.len(),
                unpushed = status.unpushed,
                "working tree not clean; continuing because of --force-commit"
            );
            return Ok(());
        }
        let mut problems = Vec::new();
        if !status.dirty.is_empty() {
            problems.push(format!("uncommitted changes in {}", status.dirty.join(", ")));
        }
        if status.unpushed > 0 {
            problems.push(format!("{} unpushed commit(s)", status.unpushed));
        }
        Err(ReleaseError::vcs(format!(
            "{}; commit and push first or pass --force-commit",
            problems.join(" and ")
        )))
    })
    .describe(|ctx| {
        format!(
            "check for uncommitted changes and commits not pushed to '{}'",
            ctx.config.remote
        )
    })
}

pub fn load_descriptor() -> Step<ReleaseContext> {
    Step::new("load-descriptor", |ctx: &mut ReleaseContext| {
        let path = ctx.descriptor_path();
        let mut descriptor = match ModDescriptor::try_load(&path) {
            Ok(descriptor) => descriptor,
            Err(warning) => {
                warning.emit();
                ctx.warn(warning);
                let name = ctx
                    .name
                    .clone()
                    .or_else(|| {
                        ctx.source
                            .canonicalize()
                            .ok()
                            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
                    })
                    .ok_or_else(|| ReleaseError::config("cannot derive a mod name; pass --name"))?;
                let git = ctx
                    .repo
                    .remote_url(&ctx.config.remote)?
                    .and_then(|url| GitCoordinates::from_remote_url(&url));
                ModDescriptor::bootstrap(&name, ctx.config.current_alpha, git, ctx.config.tags.clone())
            }
        };
        descriptor.normalize_package_id(&ctx.config.author)?;

        if let Some(configured) = ctx.config.paths.host_version.clone() {
            let host_path = ctx.path(&configured);
            let raw = fs::read_to_string(&host_path).map_err(|e| {
                ReleaseError::config(format!(
                    "cannot read host version file '{}': {}",
                    host_path.display(),
                    e
                ))
            })?;
            ctx.host_version = Some(HostVersion::parse(&raw)?);
        }

        tracing::info!(
            name = %descriptor.name,
            version = %descriptor.version,
            "loaded mod descriptor"
        );
        ctx.descriptor = Some(descriptor);
        Ok(())
    })
    .describe(|ctx| format!("load the mod descriptor from {}", ctx.descriptor_path().display()))
}

pub fn update_descriptor() -> Step<ReleaseContext> {
    Step::new("update-descriptor", |ctx: &mut ReleaseContext| {
        let remote = ctx.config.remote.clone();
        let marker = ctx.config.no_log_marker.clone();

        if ctx.flags.reset_tag {
            ctx.repo.fetch_tags(&remote)?;
        }
        let tag = ctx.repo.latest_tag()?;
        if tag.is_none() {
            let warning = BoundaryWarning::NoReleaseTag;
            warning.emit();
            ctx.warn(warning);
        }
        let lines = ctx.repo.log_since(tag.as_deref())?;

        let repo_name = ctx.repo_name()?;
        let collected = Collector::new(&repo_name, &marker).collect(&lines);
        ctx.warnings.extend(collected.warnings);
        tracing::info!(
            notes = collected.notes.len(),
            excluded = collected.excluded,
            since = tag.as_deref().unwrap_or("<root>"),
            "collected change notes"
        );

        let store_path = ctx.store_path();
        let (mut store, warning) = ChangeNoteStore::load(&store_path);
        if let Some(warning) = warning {
            ctx.warn(warning);
        }
        let added = store.merge(collected.notes.iter().cloned(), &marker);
        store.save(&store_path)?;
        tracing::debug!(added, total = store.len(), "saved change-note store");

        let authors = ctx.repo.authors()?;
        let branches = ctx.repo.version_branches()?;

        let directive = ctx.directive();
        let no_bump = ctx.flags.no_version_bump;
        let owner = ctx.config.author.clone();
        let descriptor = ctx.descriptor_mut()?;
        let previous = descriptor.version;
        descriptor.version = previous.bump(directive, no_bump);
        descriptor.changenote = changenote_text(&collected.notes, &marker);
        descriptor.changenotes = collected.notes.clone();
        descriptor.contributors.merge_authors(&authors, &owner);
        if !branches.is_empty() {
            descriptor.tags = branches;
        }
        tracing::info!(
            from = %previous,
            to = %descriptor.version,
            directive = directive.name(),
            "bumped version"
        );

        if ctx.descriptor()?.published_file_id.is_none() {
            let id = ctx.lookup_published_file_id()?;
            ctx.descriptor_mut()?.published_file_id = id;
        }

        let path = ctx.descriptor_path();
        ctx.descriptor()?.save(&path)?;
        ctx.new_notes = collected.notes;
        Ok(())
    })
    .describe(|ctx| {
        format!(
            "bump the version ({}), collect change notes since the last tag into {} and save {}",
            ctx.directive().name(),
            ctx.store_path().display(),
            ctx.descriptor_path().display()
        )
    })
}

pub fn update_readme() -> Step<ReleaseContext> {
    Step::new("update-readme", |ctx: &mut ReleaseContext| {
        let options = RenderOptions {
            badges: true,
            footer: true,
            changenotes: false,
        };
        let readme = ctx.render(Dialect::Plain, options)?;
        let path = ctx.path(&ctx.config.paths.readme);
        write_atomic(&path, &readme)?;
        tracing::info!(path = %path.display(), "updated readme");
        Ok(())
    })
    .describe(|ctx| format!("write {} in the plain dialect", ctx.path(&ctx.config.paths.readme).display()))
}

pub fn update_about() -> Step<ReleaseContext> {
    Step::new("update-about", |ctx: &mut ReleaseContext| {
        let description = ctx.render(Dialect::Restricted, RenderOptions::bare())?;
        let path = ctx.path(&ctx.config.paths.about);
        let descriptor = ctx.descriptor()?;
        let supported = if descriptor.tags.is_empty() {
            ctx.host_version.iter().map(HostVersion::main).collect()
        } else {
            descriptor.tags.clone()
        };
        let fields = AboutFields {
            name: &descriptor.name,
            package_id: &descriptor.package_id,
            author: &ctx.config.author,
            description: &description,
            supported_versions: &supported,
        };
        stamp::stamp_about(&path, &fields)?;
        Ok(())
    })
    .describe(|ctx| {
        format!(
            "stamp name, package id and description into {}",
            ctx.path(&ctx.config.paths.about).display()
        )
    })
}

pub fn update_assembly_info() -> Step<ReleaseContext> {
    Step::new("update-assembly-info", |ctx: &mut ReleaseContext| {
        let configured = ctx
            .config
            .paths
            .assembly_info
            .clone()
            .ok_or_else(|| ReleaseError::config("no assembly info path configured"))?;
        let path = ctx.path(&configured);
        stamp::update_assembly_info(&path, &ctx.descriptor()?.version)
    })
    .skip_if(|ctx| ctx.config.paths.assembly_info.is_none())
    .describe(|ctx| format!("stamp {} into the assembly info", ctx.version_label()))
}

pub fn update_manifest() -> Step<ReleaseContext> {
    Step::new("update-manifest", |ctx: &mut ReleaseContext| {
        let descriptor = ctx.descriptor()?;
        let git = descriptor.git_coordinates().ok_or_else(|| {
            ReleaseError::config("manifest URLs need git coordinates; run update-remote first")
        })?;
        let branch = ctx
            .host_version
            .as_ref()
            .map(HostVersion::main)
            .or_else(|| descriptor.tags.last().cloned())
            .ok_or_else(|| {
                ReleaseError::config("manifest URL needs a host version file or a compatibility tag")
            })?;

        let version = descriptor.version_string();
        let relative = ctx.config.paths.manifest.to_string_lossy().replace('\\', "/");
        let manifest_uri = git.raw_url(&branch, &relative);
        let download_uri = git.release_url(&format!("v{}", version));
        let fields = ManifestFields {
            version: &version,
            manifest_uri: &manifest_uri,
            download_uri: &download_uri,
        };
        stamp::stamp_manifest(&ctx.path(&ctx.config.paths.manifest), &fields)?;
        Ok(())
    })
    .skip_if(|ctx| ctx.flags.no_github || ctx.flags.prerelease || ctx.flags.draft)
    .describe(|ctx| {
        format!(
            "stamp {} and its update URLs into {}",
            ctx.version_label(),
            ctx.path(&ctx.config.paths.manifest).display()
        )
    })
}

pub fn build() -> Step<ReleaseContext> {
    Step::new("build", |ctx: &mut ReleaseContext| {
        let mut publication = ctx.publication(ChannelKind::Build)?;
        publication.profile = Some(ctx.build_profile().to_string());
        ctx.channels.publish(&publication)
    })
    .skip_if(|ctx| ctx.flags.no_build || !ctx.channels.is_configured(ChannelKind::Build))
    .describe(|ctx| format!("run the {} build", ctx.build_profile()))
}

pub fn commit_push() -> Step<ReleaseContext> {
    Step::new("commit-push", |ctx: &mut ReleaseContext| {
        let message = format!(
            "Release {} {}",
            ctx.descriptor()?.version,
            ctx.config.no_log_marker
        );
        ctx.repo.commit_all(message.trim_end())?;
        ctx.repo.push(&ctx.config.remote)?;
        tracing::info!(message = %message, remote = %ctx.config.remote, "committed and pushed release");
        Ok(())
    })
    .describe(|ctx| {
        format!(
            "commit all changes for {} and push to '{}'",
            ctx.version_label(),
            ctx.config.remote
        )
    })
}

pub fn github_release() -> Step<ReleaseContext> {
    Step::new("github-release", |ctx: &mut ReleaseContext| {
        let body = if ctx.flags.major {
            ctx.render(Dialect::Plain, RenderOptions::for_dialect(Dialect::Plain))?
        } else {
            ctx.descriptor()?.changenote.clone()
        };

        let mut publication = ctx.publication(ChannelKind::Registry)?;
        publication.tag = Some(format!("v{}", publication.version));
        publication.title = match &ctx.host_version {
            Some(host) => format!("{} v{} ({})", publication.name, publication.version, host),
            None => format!("{} v{}", publication.name, publication.version),
        };
        let archives = ctx.path(&ctx.config.paths.archives);
        publication.asset = Some(archives.join(format!("{} v{}.zip", publication.name, publication.version)));
        publication.draft = ctx.flags.draft;
        publication.prerelease = ctx.flags.prerelease;
        publication.body = body;
        ctx.channels.publish(&publication)
    })
    .skip_if(|ctx| ctx.flags.no_github)
    .describe(|ctx| format!("publish the {} release to the source host", ctx.version_label()))
}

pub fn workshop_release() -> Step<ReleaseContext> {
    Step::new("workshop-release", |ctx: &mut ReleaseContext| {
        let body = ctx.render(Dialect::Forum, RenderOptions::for_dialect(Dialect::Forum))?;
        let mut publication = ctx.publication(ChannelKind::Workshop)?;
        publication.title = publication.name.clone();
        publication.body = body;
        ctx.channels.publish(&publication)
    })
    .skip_if(|ctx| ctx.flags.no_steam || ctx.flags.prerelease || ctx.flags.draft)
    .describe(|ctx| format!("upload {} to the workshop", ctx.version_label()))
}

pub fn forum_post() -> Step<ReleaseContext> {
    Step::new("forum-post", |ctx: &mut ReleaseContext| {
        let body = ctx.render(Dialect::Forum, RenderOptions::for_dialect(Dialect::Forum))?;
        let store_path = ctx.store_path();
        let (mut store, warning) = ChangeNoteStore::load(&store_path);
        if let Some(warning) = warning {
            ctx.warn(warning);
        }

        let message = forum::compose(
            &mut store,
            &ctx.new_notes,
            &body,
            ctx.config.forum.max_bytes,
            &ctx.config.no_log_marker,
        );
        store.save(&store_path)?;

        let mut publication = ctx.publication(ChannelKind::Forum)?;
        publication.title = forum::post_title(
            &ctx.config.forum.title_prefix,
            ctx.flags.forum_title.as_deref(),
            &Local::now(),
        );
        publication.body = message;
        ctx.channels.publish(&publication)
    })
    .skip_if(|ctx| ctx.flags.no_forum)
    .describe(|ctx| {
        format!(
            "update the forum thread with change notes (at most {} bytes)",
            ctx.config.forum.max_bytes
        )
    })
}

pub fn update_remote() -> Step<ReleaseContext> {
    Step::new("update-remote", |ctx: &mut ReleaseContext| {
        let (user, repo) = match &ctx.workflow {
            Workflow::UpdateRemote { user, repo } => (user.clone(), repo.clone()),
            other => {
                return Err(ReleaseError::config(format!(
                    "update-remote cannot run as part of {:?}",
                    other
                )))
            }
        };
        let repo = match repo {
            Some(repo) => repo,
            None => ctx.repo_name()?,
        };
        let coordinates = GitCoordinates { user, repo };
        let url = coordinates.https_url();

        ctx.repo.set_remote_url(&ctx.config.remote, &url)?;
        let descriptor = ctx.descriptor_mut()?;
        descriptor.git_user = coordinates.user;
        descriptor.git_repo = coordinates.repo;
        tracing::info!(url = %url, "updated remote");
        Ok(())
    })
    .describe(|ctx| match &ctx.workflow {
        Workflow::UpdateRemote { user, repo } => format!(
            "point '{}' at https://github.com/{}/{}.git",
            ctx.config.remote,
            user,
            repo.as_deref().unwrap_or("<repo>")
        ),
        _ => "update the remote".to_string(),
    })
}

pub fn save_descriptor() -> Step<ReleaseContext> {
    Step::new("save-descriptor", |ctx: &mut ReleaseContext| {
        let path = ctx.descriptor_path();
        ctx.descriptor()?.save(&path)
    })
    .describe(|ctx| format!("save {}", ctx.descriptor_path().display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_lists() {
        let names = |steps: Vec<Step<ReleaseContext>>| -> Vec<String> {
            steps.iter().map(|s| s.name().to_string()).collect()
        };
        assert_eq!(
            names(update_steps()),
            vec![
                "load-descriptor",
                "update-descriptor",
                "update-readme",
                "update-about",
                "update-assembly-info",
                "build"
            ]
        );
        assert_eq!(release_steps().len(), 12);
        let release = names(release_steps());
        let manifest = release.iter().position(|n| n == "update-manifest").unwrap();
        assert_eq!(release[manifest - 1], "update-assembly-info");
        assert_eq!(release[manifest + 1], "build");
        assert_eq!(release_steps()[0].name(), "check-git-status");
        assert_eq!(
            names(update_remote_steps()),
            vec!["load-descriptor", "update-remote", "save-descriptor"]
        );
    }

    #[test]
    fn test_directive_per_workflow() {
        let repo = Arc::new(crate::git::MockRepository::new());
        let mut ctx = ReleaseContext::new(
            Config::default(),
            PathBuf::from("."),
            Workflow::Update,
            repo,
            Channels::new(),
        );
        assert_eq!(ctx.directive(), VersionBump::Build);
        ctx.workflow = Workflow::Release;
        assert_eq!(ctx.directive(), VersionBump::Standard);
        ctx.flags.major = true;
        assert_eq!(ctx.directive(), VersionBump::Major);
    }
}
