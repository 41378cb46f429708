//! stremio-remote - control Stremio on Android TV over ADB
//!
//! Opens movies and episodes in the Stremio app via deep links, presses play
//! after the detail page has rendered, and reads back what is playing.
//!
//! # Modules
//!
//! - `device` - ADB bridge, connection state, dispatch, autoplay, status
//! - `deeplink` - Stremio detail-page URIs
//! - `api` - TMDB title search
//! - `models` - Search results
//! - `config` - Config file and environment overrides
//! - `cli` / `commands` - Command line surface
//! - `logging` - tracing subscriber setup

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod deeplink;
pub mod device;
pub mod logging;
pub mod models;

// Re-export commonly used types
pub use api::{TmdbClient, TmdbError};
pub use config::{Config, ConfigError};
pub use deeplink::DeepLink;
pub use device::{
    AdbBridge, Bridge, BridgeError, Command, CommandResult, ConnectOutcome, ConnectionHandle,
    ConnectionState, DeviceEndpoint, DeviceError, DeviceSession, ErrorKind, Key, PlayState,
    PlaybackStatus, RetryPolicy, SessionRegistry,
};
pub use models::{MediaKind, SearchResult};
