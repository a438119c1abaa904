//! Post-batch command

use crate::error::{EngineError, Result};
use tokio::process::Command;
use tracing::info;

/// Run `command` (split on whitespace, no shell) and return its combined
/// output. An empty command does nothing.
pub async fn run_post_batch_command(command: &str) -> Result<Option<String>> {
    let mut parts = command.split_whitespace();
    let Some(program) = parts.next() else {
        return Ok(None);
    };

    info!("Running post-batch command: {}", command);
    let output = Command::new(program).args(parts).output().await?;

    let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if !output.status.success() {
        return Err(EngineError::CommandFailed(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            combined.trim()
        )));
    }

    Ok(Some(combined))
}
