//! Android TV remote control over ADB
//!
//! - Bridge: the `adb` process seam
//! - Connection: authorization state for one endpoint
//! - Retry: bounded wait for on-device approval
//! - Dispatch: one command per call, fail-fast when not authorized
//! - Automation: deep link, wait, press OK
//! - Status: foreground app and media session parsing
//! - Control: volume and display power
//! - Session: one serialized session per endpoint

pub mod automation;
pub mod bridge;
pub mod connection;
pub mod control;
pub mod dispatch;
pub mod error;
pub mod retry;
pub mod session;
pub mod status;
pub mod types;

pub use automation::{AutoPlayStage, DEFAULT_PRESS_DELAY};
pub use bridge::{AdbBridge, Bridge, DEFAULT_TRANSPORT_TIMEOUT};
pub use connection::ConnectionHandle;
pub use control::MAX_VOLUME;
pub use error::{BridgeError, DeviceError};
pub use session::{DeviceSession, SessionRegistry};
pub use status::STREMIO_PACKAGE;
pub use types::{
    Command, CommandResult, ConnectOutcome, ConnectionState, DeviceEndpoint, ErrorKind, Key,
    PlayState, PlaybackStatus, PowerState, RetryPolicy, DEFAULT_ADB_PORT,
};
