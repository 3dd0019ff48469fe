use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

use mod_release::channels::Channels;
use mod_release::config;
use mod_release::git::{Git2Repository, VersionControl};
use mod_release::pipeline::steps::{self, ReleaseContext, ReleaseFlags, Workflow};
use mod_release::pipeline::{Pipeline, RunOptions};
use mod_release::ui;

#[derive(Parser)]
#[command(
    name = "mod-release",
    version,
    about = "Version, document and publish a mod to every distribution channel"
)]
struct Cli {
    #[arg(short, long, global = true, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(short, long, global = true, default_value = ".", help = "Mod source directory")]
    source: PathBuf,

    #[arg(short, long, global = true, help = "Mod name for a first release")]
    name: Option<String>,

    #[arg(short, long, global = true, help = "Fetch and prune remote tags before collecting notes")]
    reset_tag: bool,

    #[arg(
        short = 'm',
        long = "mock",
        visible_alias = "dry-run",
        global = true,
        help = "Show what every step would do without doing it"
    )]
    dry_run: bool,

    #[arg(short, long, action = ArgAction::Count, global = true, help = "Increase log verbosity")]
    verbose: u8,

    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Bump the build number, refresh metadata and build
    Update {
        #[arg(long, help = "Build with the release profile")]
        build_release: bool,

        #[arg(short = 'V', long, help = "Keep the current version")]
        no_version_bump: bool,
    },

    /// Release a new version to every channel
    Release {
        #[arg(short, long, help = "Mark the release as a prerelease")]
        prerelease: bool,

        #[arg(short, long, help = "Create the release as a draft")]
        draft: bool,

        #[arg(short = 'M', long, help = "Bump the major version")]
        major: bool,

        #[arg(short, long, help = "Release even with uncommitted or unpushed changes")]
        force_commit: bool,

        #[arg(short = 'V', long, help = "Keep the current version")]
        no_version_bump: bool,

        #[arg(short = 'T', long, help = "Custom forum post title")]
        forum_title: Option<String>,

        #[arg(long, help = "Skip the build")]
        no_build: bool,

        #[arg(long, help = "Skip the source-host release")]
        no_github: bool,

        #[arg(long, help = "Skip the workshop upload")]
        no_steam: bool,

        #[arg(long, help = "Skip the forum post")]
        no_forum: bool,
    },

    /// Point the remote at a GitHub repository
    UpdateRemote {
        /// GitHub user or organisation
        git_user: String,
        /// Repository name, defaults to the mod's
        git_repo: Option<String>,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Update { .. } => "update",
            Command::Release { .. } => "release",
            Command::UpdateRemote { .. } => "update-remote",
        }
    }

    fn into_workflow(self, reset_tag: bool) -> (Workflow, ReleaseFlags) {
        let mut flags = ReleaseFlags {
            reset_tag,
            ..ReleaseFlags::default()
        };
        let workflow = match self {
            Command::Update {
                build_release,
                no_version_bump,
            } => {
                flags.build_release = build_release;
                flags.no_version_bump = no_version_bump;
                Workflow::Update
            }
            Command::Release {
                prerelease,
                draft,
                major,
                force_commit,
                no_version_bump,
                forum_title,
                no_build,
                no_github,
                no_steam,
                no_forum,
            } => {
                flags = ReleaseFlags {
                    prerelease,
                    draft,
                    major,
                    force_commit,
                    no_version_bump,
                    forum_title,
                    no_build,
                    no_github,
                    no_steam,
                    no_forum,
                    ..flags
                };
                Workflow::Release
            }
            Command::UpdateRemote { git_user, git_repo } => Workflow::UpdateRemote {
                user: git_user,
                repo: git_repo,
            },
        };
        (workflow, flags)
    }
}

fn init_tracing(verbose: u8, format: LogFormat) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match verbose {
        0 => "mod_release=info",
        1 => "mod_release=debug",
        _ => "mod_release=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    let config = match config::load_config(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            ui::display_error(&format!("Error loading config: {}", e));
            std::process::exit(1);
        }
    };

    let repo: Arc<dyn VersionControl> = Arc::new(
        Git2Repository::open(&cli.source)
            .with_context(|| format!("no git repository at {}", cli.source.display()))?,
    );

    let command = cli.command.name();
    let (workflow, flags) = cli.command.into_workflow(cli.reset_tag);
    let channels = Channels::from_config(&config.channels);
    let mut ctx = ReleaseContext::new(config, cli.source, workflow, repo, channels)
        .with_flags(flags)
        .with_name(cli.name);

    let options = RunOptions {
        dry_run: cli.dry_run,
        verbosity: cli.verbose,
    };
    let mut pipeline = Pipeline::new(steps::steps_for(&ctx.workflow));
    ui::display_plan(command, &pipeline.step_names(), options.dry_run);

    let result = pipeline.run(&mut ctx, &options);

    println!();
    ui::display_step_records(pipeline.records(), options.verbosity > 0);
    for warning in &ctx.warnings {
        ui::display_boundary_warning(warning);
    }

    if let Err(e) = result {
        ui::display_failure(&e);
        std::process::exit(1);
    }

    ui::display_summary(pipeline.records());
    if let Some(descriptor) = &ctx.descriptor {
        if !options.dry_run {
            ui::display_status(&format!("{} is at v{}", descriptor.name, descriptor.version));
        }
    }

    Ok(())
}
