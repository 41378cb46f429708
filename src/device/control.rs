//! Volume and display power
//!
//! These take the handle directly so callers can run them inside the same
//! critical section as the reconnect that precedes them.

use super::connection::ConnectionHandle;
use super::dispatch::dispatch;
use super::error::DeviceError;
use super::types::{Command, CommandResult, PowerState};

/// Media stream used for `media volume` (STREAM_MUSIC)
const MUSIC_STREAM: u8 = 3;

/// Highest volume index accepted by [`set_volume`]
pub const MAX_VOLUME: u8 = 15;

/// Full dump, filtered locally by [`PowerState::parse_dumpsys`]
pub const POWER_QUERY: &str = "dumpsys power";

/// Set the media volume index (0-15)
pub async fn set_volume(
    handle: &mut ConnectionHandle,
    level: u8,
) -> Result<CommandResult, DeviceError> {
    if level > MAX_VOLUME {
        return Err(DeviceError::InvalidVolume(level));
    }
    let command = Command::query(format!(
        "media volume --stream {} --set {}",
        MUSIC_STREAM, level
    ));
    Ok(dispatch(handle, &command).await)
}

/// Whether the display is on
pub async fn power_state(handle: &mut ConnectionHandle) -> Result<PowerState, DeviceError> {
    let output = dispatch(handle, &Command::query(POWER_QUERY))
        .await
        .into_output()?;
    Ok(PowerState::parse_dumpsys(&output))
}
