//! Connection handle: one bridge session to one endpoint
//!
//! Owns the endpoint's [`ConnectionState`]. A reachable device is not the same
//! as an authorized one: `adb connect` happily reports "connected" while the
//! TV is still showing its "Allow USB debugging?" prompt, so authorization is
//! always confirmed against the `adb devices` listing.

use std::sync::Arc;

use super::bridge::Bridge;
use super::types::{ConnectionState, DeviceEndpoint};

/// Entry of an `adb devices` listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceListing {
    pub serial: String,
    /// `device`, `unauthorized`, `offline`, ...
    pub status: String,
}

impl DeviceListing {
    /// Parse `adb devices` output
    /// Format:
    /// ```text
    /// List of devices attached
    /// 192.168.1.50:5555	device
    /// 10.0.0.50:5555	unauthorized
    /// ```
    pub fn parse_all(output: &str) -> Vec<DeviceListing> {
        output
            .lines()
            .map(str::trim)
            .filter(|line| {
                !line.is_empty() && !line.starts_with("List of devices") && !line.starts_with('*')
            })
            .filter_map(|line| {
                let mut parts = line.split_whitespace();
                let serial = parts.next()?;
                let status = parts.next()?;
                Some(DeviceListing {
                    serial: serial.to_string(),
                    status: status.to_string(),
                })
            })
            .collect()
    }

    pub fn is_authorized(&self) -> bool {
        self.status == "device"
    }
}

/// Whether `endpoint` appears in the listing with status `device`
///
/// Matches the full `host:port` serial only, so `10.0.0.5:5555` never
/// borrows the entry of `10.0.0.50:5555`.
pub fn listed_as_authorized(listing: &str, endpoint: &DeviceEndpoint) -> bool {
    let serial = endpoint.serial();
    DeviceListing::parse_all(listing)
        .iter()
        .any(|entry| entry.serial == serial && entry.is_authorized())
}

/// How `adb connect` answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectReply {
    /// Socket established (authorization still unknown)
    Reached,
    /// Reachable but the key was rejected or is pending approval
    AuthPending,
    Unreachable,
}

fn classify_connect_output(output: &str) -> ConnectReply {
    let lower = output.to_lowercase();
    if lower.contains("authenticate") || lower.contains("unauthorized") {
        ConnectReply::AuthPending
    } else if lower.contains("connected to")
        && !["failed", "unable", "cannot", "refused", "timed out"]
            .iter()
            .any(|marker| lower.contains(marker))
    {
        ConnectReply::Reached
    } else {
        ConnectReply::Unreachable
    }
}

/// Session to a single device endpoint
pub struct ConnectionHandle {
    endpoint: DeviceEndpoint,
    bridge: Arc<dyn Bridge>,
    state: ConnectionState,
}

impl ConnectionHandle {
    pub fn new(endpoint: DeviceEndpoint, bridge: Arc<dyn Bridge>) -> Self {
        Self {
            endpoint,
            bridge,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn endpoint(&self) -> &DeviceEndpoint {
        &self.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub(crate) fn bridge(&self) -> &dyn Bridge {
        self.bridge.as_ref()
    }

    /// Make a single connection attempt and record the resulting state
    pub async fn connect(&mut self) -> ConnectionState {
        self.state = ConnectionState::Connecting;

        let output = match self.bridge.connect(&self.endpoint).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "connect failed");
                self.state = ConnectionState::Failed;
                return self.state;
            }
        };

        self.state = match classify_connect_output(&output) {
            ConnectReply::Unreachable => {
                tracing::warn!(endpoint = %self.endpoint, output = output.trim(), "device unreachable");
                ConnectionState::Failed
            }
            reply => {
                if reply == ConnectReply::AuthPending {
                    tracing::info!(endpoint = %self.endpoint, "waiting for debugging approval on the device");
                }
                if self.is_authorized().await {
                    ConnectionState::Authorized
                } else {
                    ConnectionState::Unauthorized
                }
            }
        };

        tracing::debug!(endpoint = %self.endpoint, state = %self.state, "connect attempt finished");
        self.state
    }

    /// Check the device listing without touching the recorded state
    pub async fn is_authorized(&self) -> bool {
        match self.bridge.devices().await {
            Ok(listing) => listed_as_authorized(&listing, &self.endpoint),
            Err(e) => {
                tracing::debug!(endpoint = %self.endpoint, error = %e, "device listing failed");
                false
            }
        }
    }

    /// Release the session; safe to call repeatedly
    ///
    /// The adb server keeps connections alive across processes, so the
    /// release is sent even when this handle never connected.
    pub async fn disconnect(&mut self) {
        if let Err(e) = self.bridge.disconnect(&self.endpoint).await {
            tracing::debug!(endpoint = %self.endpoint, error = %e, "disconnect reported an error");
        }
        self.state = ConnectionState::Disconnected;
        tracing::info!(endpoint = %self.endpoint, "disconnected");
    }

    /// Record a transport observation that the session dropped
    pub(crate) fn mark_lost(&mut self) {
        if self.state != ConnectionState::Disconnected {
            tracing::warn!(endpoint = %self.endpoint, "session lost, marking disconnected");
        }
        self.state = ConnectionState::Disconnected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "List of devices attached\n\
                           10.0.0.50:5555\tdevice\n\
                           192.168.1.50:5555\tunauthorized\n\
                           emulator-5554\toffline\n";

    #[test]
    fn test_parse_device_listing() {
        let devices = DeviceListing::parse_all(LISTING);
        assert_eq!(devices.len(), 3);
        assert_eq!(devices[0].serial, "10.0.0.50:5555");
        assert!(devices[0].is_authorized());
        assert_eq!(devices[1].status, "unauthorized");
        assert!(!devices[2].is_authorized());
    }

    #[test]
    fn test_parse_skips_daemon_banner() {
        let output = "* daemon not running; starting now at tcp:5037\n\
                      * daemon started successfully\n\
                      List of devices attached\n\n";
        assert!(DeviceListing::parse_all(output).is_empty());
    }

    #[test]
    fn test_authorized_requires_exact_serial() {
        let ep = DeviceEndpoint::new("10.0.0.5", 5555);
        assert!(!listed_as_authorized(LISTING, &ep));

        let ep = DeviceEndpoint::new("10.0.0.50", 5555);
        assert!(listed_as_authorized(LISTING, &ep));

        let ep = DeviceEndpoint::new("10.0.0.50", 555);
        assert!(!listed_as_authorized(LISTING, &ep));
    }

    #[test]
    fn test_unauthorized_entry_is_not_authorized() {
        let ep = DeviceEndpoint::new("192.168.1.50", 5555);
        assert!(!listed_as_authorized(LISTING, &ep));
    }

    #[test]
    fn test_classify_connect_output() {
        assert_eq!(
            classify_connect_output("connected to 192.168.1.50:5555\n"),
            ConnectReply::Reached
        );
        assert_eq!(
            classify_connect_output("already connected to 192.168.1.50:5555\n"),
            ConnectReply::Reached
        );
        assert_eq!(
            classify_connect_output("failed to authenticate to 192.168.1.50:5555\n"),
            ConnectReply::AuthPending
        );
        assert_eq!(
            classify_connect_output(
                "failed to connect to '192.168.1.50:5555': Connection refused\n"
            ),
            ConnectReply::Unreachable
        );
        assert_eq!(
            classify_connect_output("unable to connect to 192.168.1.50:5555"),
            ConnectReply::Unreachable
        );
        assert_eq!(classify_connect_output(""), ConnectReply::Unreachable);
    }
}
