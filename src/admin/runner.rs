//! One-shot command execution.

use tokio::io::AsyncReadExt;

use super::AdminError;
use crate::ssh::{close_quietly, BoxedReader, Session, SessionProvider, SshTarget};

/// Collected output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Non-empty stdout lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.stdout
            .split('\n')
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect()
    }
}

/// Run `command` on a fresh session and close it afterwards.
///
/// # Errors
///
/// Returns `AdminError::CommandFailed` on a non-zero exit status, or the
/// transport/I/O error that prevented the command from completing.
pub async fn run_command(
    provider: &dyn SessionProvider,
    target: &SshTarget,
    command: &str,
) -> Result<CommandOutput, AdminError> {
    let mut session = provider.open(target).await?;
    let result = execute(session.as_mut(), command).await;
    close_quietly(session.as_mut()).await;
    result
}

async fn execute(session: &mut dyn Session, command: &str) -> Result<CommandOutput, AdminError> {
    tracing::debug!(command = %command, "SSH command");
    let mut remote = session.exec(command).await?;

    let (stdout, stderr) = tokio::try_join!(
        read_all(remote.take_stdout()),
        read_all(remote.take_stderr())
    )?;
    tracing::debug!(stdout = %stdout, "SSH received stdout");

    let code = remote.exit_status().await?;
    tracing::debug!(code = ?code, "SSH exit status");
    tracing::debug!(stderr = %stderr, "SSH received stderr");

    if code == Some(0) {
        Ok(CommandOutput { stdout, stderr })
    } else {
        Err(AdminError::CommandFailed {
            command: command.to_string(),
            code,
            stderr: stderr.trim().to_string(),
        })
    }
}

async fn read_all(reader: Option<BoxedReader>) -> std::io::Result<String> {
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        reader.read_to_end(&mut buf).await?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
