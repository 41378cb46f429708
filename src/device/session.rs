//! Per-endpoint sessions
//!
//! Each endpoint gets exactly one [`DeviceSession`], handed out by a
//! [`SessionRegistry`]. The session serializes every operation on its
//! connection handle behind an async mutex, so a reconnect can never race a
//! dispatch and two automation sequences never interleave key presses.
//! Sleeps inside the retry loop and the sequencer hold only this endpoint's
//! lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};

use super::automation;
use super::bridge::Bridge;
use super::connection::ConnectionHandle;
use super::control;
use super::dispatch;
use super::error::DeviceError;
use super::retry;
use super::status::{self, STREMIO_PACKAGE};
use super::types::{
    Command, CommandResult, ConnectOutcome, ConnectionState, DeviceEndpoint, Key,
    PlaybackStatus, PowerState, RetryPolicy,
};

/// Serialized access to one device
pub struct DeviceSession {
    endpoint: DeviceEndpoint,
    target_package: String,
    handle: AsyncMutex<ConnectionHandle>,
}

impl DeviceSession {
    pub fn new(endpoint: DeviceEndpoint, bridge: Arc<dyn Bridge>) -> Self {
        Self {
            handle: AsyncMutex::new(ConnectionHandle::new(endpoint.clone(), bridge)),
            endpoint,
            target_package: STREMIO_PACKAGE.to_string(),
        }
    }

    /// Package considered "the app" by status queries
    pub fn with_target_package(mut self, package: impl Into<String>) -> Self {
        self.target_package = package.into();
        self
    }

    pub fn endpoint(&self) -> &DeviceEndpoint {
        &self.endpoint
    }

    pub fn target_package(&self) -> &str {
        &self.target_package
    }

    /// Exclusive access for a multi-step sequence
    pub async fn lock(&self) -> MutexGuard<'_, ConnectionHandle> {
        self.handle.lock().await
    }

    pub async fn state(&self) -> ConnectionState {
        self.lock().await.state()
    }

    /// Run the authentication retry loop
    pub async fn connect(&self, policy: &RetryPolicy) -> ConnectOutcome {
        let mut handle = self.lock().await;
        retry::authenticate(&mut handle, policy).await
    }

    /// Connect only if not already authorized
    pub async fn ensure_connected(&self, policy: &RetryPolicy) -> ConnectOutcome {
        let mut handle = self.lock().await;
        retry::ensure_authorized(&mut handle, policy).await
    }

    pub async fn disconnect(&self) {
        self.lock().await.disconnect().await;
    }

    pub async fn dispatch(&self, command: &Command) -> CommandResult {
        let mut handle = self.lock().await;
        dispatch::dispatch(&mut handle, command).await
    }

    pub async fn press(&self, key: Key) -> CommandResult {
        self.dispatch(&Command::key(key)).await
    }

    /// Open `uri` and press play after `press_delay`
    pub async fn auto_play(&self, uri: &str, press_delay: Duration) -> CommandResult {
        let mut handle = self.lock().await;
        automation::auto_play(&mut handle, uri, press_delay).await
    }

    pub async fn query_status(&self) -> Result<PlaybackStatus, DeviceError> {
        let mut handle = self.lock().await;
        status::query_status(&mut handle, &self.target_package).await
    }

    /// Set the media volume index (0-15)
    pub async fn set_volume(&self, level: u8) -> Result<CommandResult, DeviceError> {
        let mut handle = self.lock().await;
        control::set_volume(&mut handle, level).await
    }

    /// Whether the display is on
    pub async fn power_state(&self) -> Result<PowerState, DeviceError> {
        let mut handle = self.lock().await;
        control::power_state(&mut handle).await
    }
}

/// Owner of the one-session-per-endpoint invariant
pub struct SessionRegistry {
    bridge: Arc<dyn Bridge>,
    target_package: String,
    sessions: Mutex<HashMap<DeviceEndpoint, Arc<DeviceSession>>>,
}

impl SessionRegistry {
    pub fn new(bridge: Arc<dyn Bridge>) -> Self {
        Self {
            bridge,
            target_package: STREMIO_PACKAGE.to_string(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_target_package(mut self, package: impl Into<String>) -> Self {
        self.target_package = package.into();
        self
    }

    /// Session for `endpoint`, created on first use
    pub fn session(&self, endpoint: &DeviceEndpoint) -> Arc<DeviceSession> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions
            .entry(endpoint.clone())
            .or_insert_with(|| {
                tracing::debug!(%endpoint, "creating device session");
                Arc::new(
                    DeviceSession::new(endpoint.clone(), Arc::clone(&self.bridge))
                        .with_target_package(self.target_package.clone()),
                )
            })
            .clone()
    }
}
