//! Error types for the bridge transport and the device core

use std::time::Duration;
use thiserror::Error;

use super::types::{DeviceEndpoint, ErrorKind};

/// Failures of a single `adb` invocation
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Failed to run adb: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("adb did not respond within {0:?}")]
    Timeout(Duration),

    #[error("adb exited with code {code:?}: {stderr}")]
    Exited { code: Option<i32>, stderr: String },

    /// Session dropped (offline, closed, broken pipe); must reconnect
    #[error("Device connection lost: {0}")]
    DeviceLost(String),
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::Timeout(_) => ErrorKind::Timeout,
            BridgeError::DeviceLost(msg) if msg.contains("unauthorized") => {
                ErrorKind::Unauthorized
            }
            _ => ErrorKind::TransportError,
        }
    }

    /// Whether this failure invalidates the current session
    pub fn is_session_lost(&self) -> bool {
        matches!(self, BridgeError::DeviceLost(_))
    }
}

/// Errors surfaced by the device control core
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Not connected to {0}")]
    NotConnected(DeviceEndpoint),

    #[error("Invalid device address '{0}' (expected host or host:port)")]
    InvalidEndpoint(String),

    #[error("Volume level must be between 0 and 15, got {0}")]
    InvalidVolume(u8),

    #[error("{kind}: {message}")]
    Command { kind: ErrorKind, message: String },

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl DeviceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeviceError::NotConnected(_) => ErrorKind::NotConnected,
            DeviceError::InvalidEndpoint(_) | DeviceError::InvalidVolume(_) => {
                ErrorKind::TransportError
            }
            DeviceError::Command { kind, .. } => *kind,
            DeviceError::Bridge(e) => e.kind(),
        }
    }
}
