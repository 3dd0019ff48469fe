use crate::channels::{Channel, ChannelKind, Publication};
use crate::config::CommandSpec;
use crate::error::{ReleaseError, Result};
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

/// Publishes by running an external program
///
/// The program runs in the mod source directory with the publication's
/// `MODRELEASE_*` variables set. The body and change note are written to
/// temporary files named by `MODRELEASE_BODY_FILE` and
/// `MODRELEASE_CHANGENOTE_FILE`. Exit code 0 means success.
pub struct CommandChannel {
    kind: ChannelKind,
    spec: CommandSpec,
}

impl CommandChannel {
    pub fn new(kind: ChannelKind, spec: CommandSpec) -> Self {
        CommandChannel { kind, spec }
    }

    fn text_file(&self, contents: &str) -> Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        file.write_all(contents.as_bytes())?;
        file.flush()?;
        Ok(file)
    }
}

impl Channel for CommandChannel {
    fn publish(&self, publication: &Publication) -> Result<()> {
        let body = self.text_file(&publication.body)?;
        let changenote = self.text_file(&publication.changenote)?;

        let mut cmd = Command::new(&self.spec.program);
        cmd.args(&self.spec.args);
        if publication.source.is_dir() {
            cmd.current_dir(&publication.source);
        }

        for (key, value) in publication.to_env_vars() {
            cmd.env(key, value);
        }
        cmd.env("MODRELEASE_BODY_FILE", body.path());
        cmd.env("MODRELEASE_CHANGENOTE_FILE", changenote.path());

        tracing::info!(
            channel = self.kind.name(),
            program = %self.spec.program,
            "running channel command"
        );

        let output = cmd.output().map_err(|e| {
            ReleaseError::channel(
                self.kind.name(),
                format!("failed to run '{}': {}", self.spec.program, e),
            )
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(ReleaseError::channel(
                self.kind.name(),
                format!(
                    "'{}' exited with code {}\nStdout: {}\nStderr: {}",
                    self.spec.program,
                    output.status.code().unwrap_or(-1),
                    stdout.trim_end(),
                    stderr.trim_end()
                ),
            ));
        }

        tracing::debug!(channel = self.kind.name(), "channel command finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn spec(program: &str, args: &[&str]) -> CommandSpec {
        CommandSpec {
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_missing_program_fails() {
        let channel = CommandChannel::new(ChannelKind::Forum, spec("/nonexistent/forum-poster", &[]));
        let publication = Publication::new(ChannelKind::Forum, "Colony", "1.0.0", PathBuf::from("."));
        let err = channel.publish(&publication).unwrap_err();
        assert!(matches!(err, ReleaseError::Channel { .. }));
        assert!(err.to_string().contains("failed to run"));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_fails() {
        let channel = CommandChannel::new(ChannelKind::Workshop, spec("sh", &["-c", "echo nope >&2; exit 3"]));
        let publication = Publication::new(ChannelKind::Workshop, "Colony", "1.0.0", PathBuf::from("."));
        let err = channel.publish(&publication).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("exited with code 3"));
        assert!(message.contains("nope"));
    }

    #[cfg(unix)]
    #[test]
    fn test_body_file_and_env_are_visible() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("seen.txt");
        let script = format!(
            "cat \"$MODRELEASE_BODY_FILE\" > '{0}'; echo \" $MODRELEASE_TAG\" >> '{0}'",
            out.display()
        );
        let channel = CommandChannel::new(ChannelKind::Registry, spec("sh", &["-c", &script]));
        let mut publication =
            Publication::new(ChannelKind::Registry, "Colony", "1.0.0", dir.path().to_path_buf());
        publication.body = "release body".to_string();
        publication.tag = Some("v1.0.0".to_string());

        channel.publish(&publication).unwrap();
        let seen = std::fs::read_to_string(out).unwrap();
        assert_eq!(seen.trim_end(), "release body v1.0.0");
    }
}
