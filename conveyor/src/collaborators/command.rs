//! Shell-command stage action, used by pipeline definition files.

use super::{ActionContext, ActionOutcome, StageAction};
use crate::errors::StageError;
use async_trait::async_trait;
use tokio::process::Command;

const DETAIL_LIMIT: usize = 400;

/// Runs a shell command as a stage's external action.
///
/// Exit status zero is a pass; a non-zero exit is returned as a
/// [`StageError`] so the executor's retry budget applies. The child is
/// spawned with `kill_on_drop`, so an attempt abandoned by cancellation or
/// an attempt deadline takes its process down with it.
#[derive(Debug, Clone)]
pub struct CommandAction {
    command: String,
}

impl CommandAction {
    /// Creates an action that runs `command` through `sh -c`.
    #[must_use]
    pub fn shell(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// The command line this action runs.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl StageAction for CommandAction {
    async fn run(&self, ctx: &ActionContext) -> Result<ActionOutcome, StageError> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .env("CONVEYOR_RUN_ID", ctx.identity.run_id.to_string())
            .env(
                "CONVEYOR_COMMIT_SHA",
                ctx.identity.commit_sha.clone().unwrap_or_default(),
            )
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| StageError::Command(format!("cannot spawn '{}': {e}", self.command)))?;

        if output.status.success() {
            Ok(ActionOutcome::passed())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail = truncate(stderr.trim());
            Err(StageError::Command(format!(
                "'{}' exited with {}: {tail}",
                self.command, output.status
            )))
        }
    }
}

fn truncate(s: &str) -> &str {
    match s.char_indices().nth(DETAIL_LIMIT) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
