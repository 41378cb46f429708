//! Command dispatcher
//!
//! Executes exactly one [`Command`] over an authorized handle. Dispatch never
//! blocks waiting for a connection: any state other than `Authorized` fails
//! immediately without touching the transport.

use super::connection::ConnectionHandle;
use super::types::{Command, CommandResult, ErrorKind};

/// Send a single command and report its local outcome
pub async fn dispatch(handle: &mut ConnectionHandle, command: &Command) -> CommandResult {
    if !handle.state().is_authorized() {
        tracing::debug!(endpoint = %handle.endpoint(), state = %handle.state(), %command, "refusing dispatch");
        return CommandResult::failure(
            ErrorKind::NotConnected,
            format!(
                "Not connected to {} (state: {})",
                handle.endpoint(),
                handle.state()
            ),
        );
    }

    let line = command.to_shell();
    let reply = handle.bridge().shell(handle.endpoint(), &line).await;

    match reply {
        Ok(output) => {
            if let Command::LaunchIntent(uri) = command {
                if let Some(reason) = intent_rejection(&output) {
                    tracing::warn!(%uri, reason, "device rejected intent");
                    return CommandResult::failure(ErrorKind::LaunchFailed, output);
                }
            }
            tracing::debug!(endpoint = %handle.endpoint(), %command, "dispatched");
            CommandResult::success(output)
        }
        Err(e) => {
            if e.is_session_lost() {
                handle.mark_lost();
            }
            tracing::warn!(endpoint = %handle.endpoint(), %command, error = %e, "dispatch failed");
            CommandResult::failure(e.kind(), e.to_string())
        }
    }
}

/// First `Error:` line printed by `am start`, if any
///
/// `am` reports unresolvable intents on stdout with a zero exit status.
fn intent_rejection(output: &str) -> Option<&str> {
    output
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("Error"))
}
