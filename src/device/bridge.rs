//! Debug-bridge transport
//!
//! The core talks to the device only through the [`Bridge`] trait. The
//! production implementation drives the `adb` executable; every invocation is
//! bounded by a timeout since the protocol offers no other way to abort.

use async_trait::async_trait;
use regex::Regex;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::process::Command;

use super::error::BridgeError;
use super::types::DeviceEndpoint;

/// adb's own "device 'serial' not found"
static DEVICE_NOT_FOUND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"device '[^']*' not found").expect("valid regex"));

/// Default bound on a single adb invocation
pub const DEFAULT_TRANSPORT_TIMEOUT: Duration = Duration::from_secs(10);

/// Raw transport operations against the debug bridge
#[async_trait]
pub trait Bridge: Send + Sync {
    /// `adb connect host:port`, returning its console output
    async fn connect(&self, endpoint: &DeviceEndpoint) -> Result<String, BridgeError>;

    /// `adb devices` listing
    async fn devices(&self) -> Result<String, BridgeError>;

    /// Run a shell command on the device, returning stdout
    async fn shell(&self, endpoint: &DeviceEndpoint, command: &str) -> Result<String, BridgeError>;

    /// `adb disconnect host:port`
    async fn disconnect(&self, endpoint: &DeviceEndpoint) -> Result<(), BridgeError>;

    /// Whether the transport can be used at all (e.g. the adb binary exists)
    async fn is_available(&self) -> bool;

    /// Where the transport lives, for error messages
    fn location(&self) -> String;
}

/// Bridge backed by the `adb` CLI
pub struct AdbBridge {
    /// Path to adb binary
    adb_path: String,
    /// Upper bound for each invocation
    timeout: Duration,
}

impl AdbBridge {
    /// Create a bridge using `adb` from PATH
    pub fn new() -> Self {
        Self {
            adb_path: "adb".to_string(),
            timeout: DEFAULT_TRANSPORT_TIMEOUT,
        }
    }

    /// Create with custom adb path
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            adb_path: path.into(),
            timeout: DEFAULT_TRANSPORT_TIMEOUT,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, args: &[&str]) -> Result<(String, String), BridgeError> {
        let mut cmd = Command::new(&self.adb_path);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::trace!(adb = %self.adb_path, ?args, "running adb");

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result?,
            Err(_) => return Err(BridgeError::Timeout(self.timeout)),
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            return Ok((stdout, stderr));
        }

        let message = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };

        if indicates_session_lost(&message) {
            Err(BridgeError::DeviceLost(message))
        } else {
            Err(BridgeError::Exited {
                code: output.status.code(),
                stderr: message,
            })
        }
    }
}

impl Default for AdbBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Bridge for AdbBridge {
    async fn connect(&self, endpoint: &DeviceEndpoint) -> Result<String, BridgeError> {
        let serial = endpoint.serial();
        // adb connect reports refusals on stdout with exit code 0
        let (stdout, stderr) = self.run(&["connect", &serial]).await?;
        Ok(format!("{}{}", stdout, stderr))
    }

    async fn devices(&self) -> Result<String, BridgeError> {
        let (stdout, _) = self.run(&["devices"]).await?;
        Ok(stdout)
    }

    async fn shell(&self, endpoint: &DeviceEndpoint, command: &str) -> Result<String, BridgeError> {
        let serial = endpoint.serial();
        let (stdout, stderr) = self.run(&["-s", &serial, "shell", command]).await?;
        if stdout.trim().is_empty() && indicates_session_lost(&stderr) {
            return Err(BridgeError::DeviceLost(stderr.trim().to_string()));
        }
        Ok(stdout)
    }

    async fn disconnect(&self, endpoint: &DeviceEndpoint) -> Result<(), BridgeError> {
        let serial = endpoint.serial();
        self.run(&["disconnect", &serial]).await?;
        Ok(())
    }

    /// `adb version` runs and succeeds
    async fn is_available(&self) -> bool {
        let version = Command::new(&self.adb_path)
            .arg("version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();
        matches!(
            tokio::time::timeout(self.timeout, version).await,
            Ok(Ok(status)) if status.success()
        )
    }

    fn location(&self) -> String {
        self.adb_path.clone()
    }
}

/// adb messages meaning the session is gone and must be re-established
///
/// Device-side shell errors (`sh: foo: not found`) are not among them.
fn indicates_session_lost(message: &str) -> bool {
    const MARKERS: &[&str] = &[
        "device offline",
        "no devices/emulators found",
        "error: closed",
        "broken pipe",
        "connection reset",
        "unauthorized",
    ];
    let lower = message.to_lowercase();
    MARKERS.iter().any(|m| lower.contains(m)) || DEVICE_NOT_FOUND_RE.is_match(&lower)
}
