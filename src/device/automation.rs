//! Playback automation sequencer
//!
//! Opens a Stremio detail page via deep link and presses OK once the page has
//! had time to render. Stremio's own autoplay parameter only works for titles
//! that were watched before, and the bridge cannot observe when the page has
//! loaded, so the press is blind and purely timing based.

use std::fmt;
use std::time::Duration;

use super::connection::ConnectionHandle;
use super::dispatch::dispatch;
use super::types::{Command, CommandResult, ErrorKind, Key};

/// Time given to the detail page before pressing OK
pub const DEFAULT_PRESS_DELAY: Duration = Duration::from_millis(2500);

/// Sequencer progress
///
/// `Idle -> Launching -> (LaunchFailed | WaitingForUi -> PressingKey -> (Done | KeyFailed))`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoPlayStage {
    Idle,
    Launching,
    LaunchFailed,
    WaitingForUi,
    PressingKey,
    Done,
    KeyFailed,
}

impl AutoPlayStage {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AutoPlayStage::Done | AutoPlayStage::LaunchFailed | AutoPlayStage::KeyFailed
        )
    }
}

impl fmt::Display for AutoPlayStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AutoPlayStage::Idle => "idle",
            AutoPlayStage::Launching => "launching",
            AutoPlayStage::LaunchFailed => "launch failed",
            AutoPlayStage::WaitingForUi => "waiting for ui",
            AutoPlayStage::PressingKey => "pressing key",
            AutoPlayStage::Done => "done",
            AutoPlayStage::KeyFailed => "key failed",
        };
        write!(f, "{}", s)
    }
}

struct Sequencer<'a> {
    handle: &'a mut ConnectionHandle,
    stage: AutoPlayStage,
}

impl<'a> Sequencer<'a> {
    fn advance(&mut self, next: AutoPlayStage) {
        tracing::debug!(from = %self.stage, to = %next, "autoplay stage");
        self.stage = next;
    }

    async fn run(mut self, uri: &str, press_delay: Duration) -> CommandResult {
        self.advance(AutoPlayStage::Launching);
        let launch = dispatch(self.handle, &Command::launch(uri)).await;
        if !launch.ok {
            self.advance(AutoPlayStage::LaunchFailed);
            tracing::warn!(uri, output = %launch.raw_output, "deep link launch failed, not pressing play");
            // Nothing reached the device; keep the more precise kind
            if launch.error_kind == Some(ErrorKind::NotConnected) {
                return launch;
            }
            return launch.with_kind(ErrorKind::LaunchFailed);
        }

        self.advance(AutoPlayStage::WaitingForUi);
        tracing::info!(uri, delay = ?press_delay, "waiting for detail page, then pressing play");
        tokio::time::sleep(press_delay).await;

        self.advance(AutoPlayStage::PressingKey);
        let press = dispatch(self.handle, &Command::key(Key::Center)).await;
        if press.ok {
            self.advance(AutoPlayStage::Done);
            press
        } else {
            self.advance(AutoPlayStage::KeyFailed);
            tracing::warn!(uri, output = %press.raw_output, "detail page opened but play press failed");
            press.with_kind(ErrorKind::KeyPressFailed)
        }
    }
}

/// Launch `uri` and press center after `press_delay`
///
/// Failures are tagged by stage: `LaunchFailed` means nothing was opened,
/// `KeyPressFailed` means the page opened but playback was not started.
/// A handle that is not authorized yields `NotConnected` and no transport
/// call at all.
pub async fn auto_play(
    handle: &mut ConnectionHandle,
    uri: &str,
    press_delay: Duration,
) -> CommandResult {
    let sequencer = Sequencer {
        handle,
        stage: AutoPlayStage::Idle,
    };
    sequencer.run(uri, press_delay).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_stages() {
        assert!(AutoPlayStage::Done.is_terminal());
        assert!(AutoPlayStage::LaunchFailed.is_terminal());
        assert!(AutoPlayStage::KeyFailed.is_terminal());
        assert!(!AutoPlayStage::WaitingForUi.is_terminal());
        assert!(!AutoPlayStage::Idle.is_terminal());
    }

    #[test]
    fn test_default_press_delay() {
        assert_eq!(DEFAULT_PRESS_DELAY, Duration::from_millis(2500));
    }
}
