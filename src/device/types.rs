//! Value types shared by the device control core
//!
//! - **Endpoint**: the `host:port` pair identifying one Android TV
//! - **Connection**: transport-level authorization state and retry policy
//! - **Commands**: key events, intent launches and diagnostic queries
//! - **Status**: structured playback status derived from device output

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::error::DeviceError;

// =============================================================================
// Endpoint
// =============================================================================

/// Default ADB-over-TCP port
pub const DEFAULT_ADB_PORT: u16 = 5555;

/// Network address of one controllable device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceEndpoint {
    pub host: String,
    pub port: u16,
}

impl DeviceEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Serial as reported by `adb devices` (`host:port`)
    pub fn serial(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for DeviceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for DeviceEndpoint {
    type Err = DeviceError;

    /// Parse `host` or `host:port`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DeviceError::InvalidEndpoint(s.to_string()));
        }

        match s.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| DeviceError::InvalidEndpoint(s.to_string()))?;
                Ok(Self::new(host, port))
            }
            Some(_) => Err(DeviceError::InvalidEndpoint(s.to_string())),
            None => Ok(Self::new(s, DEFAULT_ADB_PORT)),
        }
    }
}

// =============================================================================
// Connection State & Retry Policy
// =============================================================================

/// Authorization state of the bridge session to one endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    /// Reachable, but the device has not approved this client's key
    Unauthorized,
    Authorized,
    /// Unreachable: refused, network error or timeout
    Failed,
}

impl ConnectionState {
    pub fn is_authorized(&self) -> bool {
        matches!(self, ConnectionState::Authorized)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Unauthorized => write!(f, "unauthorized"),
            ConnectionState::Authorized => write!(f, "authorized"),
            ConnectionState::Failed => write!(f, "failed"),
        }
    }
}

/// How patiently to wait for the pairing prompt to be accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay_between_attempts: Duration,
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one
    pub fn new(max_attempts: u32, delay_between_attempts: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay_between_attempts,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay_between_attempts(&self) -> Duration {
        self.delay_between_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

/// Result of the authentication retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ConnectOutcome {
    /// The device approved the session
    Authorized { attempts: u32 },
    /// Retries exhausted; commands will fail until the device is approved
    Degraded {
        last_state: ConnectionState,
        attempts: u32,
    },
}

impl ConnectOutcome {
    pub fn is_authorized(&self) -> bool {
        matches!(self, ConnectOutcome::Authorized { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            ConnectOutcome::Authorized { attempts } => *attempts,
            ConnectOutcome::Degraded { attempts, .. } => *attempts,
        }
    }

    pub fn state(&self) -> ConnectionState {
        match self {
            ConnectOutcome::Authorized { .. } => ConnectionState::Authorized,
            ConnectOutcome::Degraded { last_state, .. } => *last_state,
        }
    }
}

// =============================================================================
// Key Codes
// =============================================================================

/// Remote-control keys understood by `input keyevent`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Center,
    Back,
    Home,
    VolumeUp,
    VolumeDown,
    VolumeMute,
    Up,
    Down,
    Left,
    Right,
    PlayPause,
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    FastForward,
    Rewind,
    Power,
    Wakeup,
    Sleep,
}

/// Key, canonical name, Android keycode
const KEY_TABLE: &[(Key, &str, u16)] = &[
    (Key::Center, "center", 23),
    (Key::Back, "back", 4),
    (Key::Home, "home", 3),
    (Key::VolumeUp, "volume_up", 24),
    (Key::VolumeDown, "volume_down", 25),
    (Key::VolumeMute, "volume_mute", 164),
    (Key::Up, "up", 19),
    (Key::Down, "down", 20),
    (Key::Left, "left", 21),
    (Key::Right, "right", 22),
    (Key::PlayPause, "play_pause", 85),
    (Key::Play, "play", 126),
    (Key::Pause, "pause", 127),
    (Key::Stop, "stop", 86),
    (Key::Next, "next", 87),
    (Key::Previous, "previous", 88),
    (Key::FastForward, "fast_forward", 90),
    (Key::Rewind, "rewind", 89),
    (Key::Power, "power", 26),
    (Key::Wakeup, "wakeup", 224),
    (Key::Sleep, "sleep", 223),
];

impl Key {
    /// Android keycode
    pub fn code(&self) -> u16 {
        KEY_TABLE
            .iter()
            .find(|(key, _, _)| key == self)
            .map(|(_, _, code)| *code)
            .unwrap_or_default()
    }

    pub fn name(&self) -> &'static str {
        KEY_TABLE
            .iter()
            .find(|(key, _, _)| key == self)
            .map(|(_, name, _)| *name)
            .unwrap_or("unknown")
    }

    /// Look up a key by name; accepts `-` or `_` and a few common aliases
    pub fn from_name(name: &str) -> Option<Key> {
        let normalized = name.trim().to_lowercase().replace('-', "_");
        let canonical = match normalized.as_str() {
            "ok" | "select" | "enter" => "center",
            "ffwd" | "forward" => "fast_forward",
            "prev" => "previous",
            "mute" => "volume_mute",
            "toggle" => "play_pause",
            "wake" => "wakeup",
            other => other,
        };
        KEY_TABLE
            .iter()
            .find(|(_, n, _)| *n == canonical)
            .map(|(key, _, _)| *key)
    }

    pub fn from_code(code: u16) -> Option<Key> {
        KEY_TABLE
            .iter()
            .find(|(_, _, c)| *c == code)
            .map(|(key, _, _)| *key)
    }

    pub fn all() -> impl Iterator<Item = Key> {
        KEY_TABLE.iter().map(|(key, _, _)| *key)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

// =============================================================================
// Commands
// =============================================================================

/// One discrete instruction for the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    KeyEvent(u16),
    LaunchIntent(String),
    /// Read-only diagnostic shell command
    ShellQuery(String),
}

impl Command {
    pub fn key(key: Key) -> Self {
        Command::KeyEvent(key.code())
    }

    pub fn launch(uri: impl Into<String>) -> Self {
        Command::LaunchIntent(uri.into())
    }

    pub fn query(text: impl Into<String>) -> Self {
        Command::ShellQuery(text.into())
    }

    /// Shell command line executed on the device
    pub fn to_shell(&self) -> String {
        match self {
            Command::KeyEvent(code) => format!("input keyevent {}", code),
            Command::LaunchIntent(uri) => format!(
                "am start -a android.intent.action.VIEW -d {}",
                shell_quote(uri)
            ),
            Command::ShellQuery(text) => text.clone(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::KeyEvent(code) => match Key::from_code(*code) {
                Some(key) => write!(f, "key {}", key),
                None => write!(f, "key {}", code),
            },
            Command::LaunchIntent(uri) => write!(f, "launch {}", uri),
            Command::ShellQuery(text) => write!(f, "query `{}`", text),
        }
    }
}

/// Single-quote a string for the device's `sh`
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Failure classification carried by [`CommandResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotConnected,
    Unauthorized,
    TransportError,
    Timeout,
    LaunchFailed,
    KeyPressFailed,
    ParseIncomplete,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NotConnected => "not connected",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::TransportError => "transport error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::LaunchFailed => "launch failed",
            ErrorKind::KeyPressFailed => "key press failed",
            ErrorKind::ParseIncomplete => "parse incomplete",
        };
        write!(f, "{}", s)
    }
}

/// Local outcome of a dispatched command
///
/// `ok` only means the transport call succeeded; the protocol has no channel
/// to confirm what the remote UI did with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub ok: bool,
    pub raw_output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl CommandResult {
    pub fn success(raw_output: impl Into<String>) -> Self {
        Self {
            ok: true,
            raw_output: raw_output.into(),
            error_kind: None,
        }
    }

    pub fn failure(kind: ErrorKind, raw_output: impl Into<String>) -> Self {
        Self {
            ok: false,
            raw_output: raw_output.into(),
            error_kind: Some(kind),
        }
    }

    /// Re-tag a failure (e.g. with the automation stage it happened in)
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        if !self.ok {
            self.error_kind = Some(kind);
        }
        self
    }

    /// Convert into a `Result` for `?` propagation
    pub fn into_output(self) -> Result<String, DeviceError> {
        if self.ok {
            Ok(self.raw_output)
        } else {
            Err(DeviceError::Command {
                kind: self.error_kind.unwrap_or(ErrorKind::TransportError),
                message: self.raw_output,
            })
        }
    }
}

// =============================================================================
// Playback Status
// =============================================================================

/// Playback state of the target app's media session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayState {
    Playing,
    Paused,
    Stopped,
    #[default]
    Unknown,
}

impl PlayState {
    /// Map an Android `PlaybackState` code
    pub fn from_code(code: i32) -> Self {
        match code {
            3 | 4 | 5 | 6 => PlayState::Playing,
            2 => PlayState::Paused,
            0 | 1 => PlayState::Stopped,
            _ => PlayState::Unknown,
        }
    }
}

impl fmt::Display for PlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayState::Playing => write!(f, "▶ Playing"),
            PlayState::Paused => write!(f, "⏸ Paused"),
            PlayState::Stopped => write!(f, "⏹ Stopped"),
            PlayState::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Structured view of what the device is playing, recomputed per query
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaybackStatus {
    pub app_in_foreground: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub state: PlayState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl PlaybackStatus {
    /// Status for a foreground app that is not the target
    pub fn foreign(app: impl Into<String>) -> Self {
        Self {
            app_in_foreground: app.into(),
            ..Default::default()
        }
    }

    /// Names of fields the device output did not provide
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.title.is_none() {
            missing.push("title");
        }
        if self.state == PlayState::Unknown {
            missing.push("state");
        }
        if self.position_ms.is_none() {
            missing.push("position_ms");
        }
        if self.duration_ms.is_none() {
            missing.push("duration_ms");
        }
        missing
    }

    /// `ParseIncomplete` when any field is missing; informational only
    pub fn completeness(&self) -> Option<ErrorKind> {
        if self.missing_fields().is_empty() {
            None
        } else {
            Some(ErrorKind::ParseIncomplete)
        }
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.state, self.app_in_foreground)?;
        if let Some(title) = &self.title {
            write!(f, " {}", title)?;
        }
        if let Some(pos) = self.position_ms {
            write!(f, " {}", format_ms(pos))?;
            if let Some(dur) = self.duration_ms {
                write!(f, " / {}", format_ms(dur))?;
            }
        }
        Ok(())
    }
}

/// Display screen power as reported by `dumpsys power`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    On,
    Off,
    Unknown,
}

impl PowerState {
    pub fn parse_dumpsys(output: &str) -> Self {
        if output.contains("Display Power: state=ON") {
            PowerState::On
        } else if output.contains("Display Power: state=OFF") {
            PowerState::Off
        } else {
            PowerState::Unknown
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerState::On => write!(f, "on"),
            PowerState::Off => write!(f, "off"),
            PowerState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Format milliseconds as HH:MM:SS
fn format_ms(ms: u64) -> String {
    let total = ms / 1000;
    let hours = total / 3600;
    let mins = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}", mins, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_parse() {
        let ep: DeviceEndpoint = "192.168.1.50:5555".parse().unwrap();
        assert_eq!(ep, DeviceEndpoint::new("192.168.1.50", 5555));

        let ep: DeviceEndpoint = "tv.local".parse().unwrap();
        assert_eq!(ep.port, DEFAULT_ADB_PORT);

        assert!("".parse::<DeviceEndpoint>().is_err());
        assert!(":5555".parse::<DeviceEndpoint>().is_err());
        assert!("host:notaport".parse::<DeviceEndpoint>().is_err());
    }

    #[test]
    fn test_endpoint_serial() {
        let ep = DeviceEndpoint::new("10.0.0.5", 5555);
        assert_eq!(ep.serial(), "10.0.0.5:5555");
        assert_eq!(ep.to_string(), "10.0.0.5:5555");
    }

    #[test]
    fn test_key_table_matches_android_codes() {
        let expected = [
            (Key::Center, 23),
            (Key::Back, 4),
            (Key::Home, 3),
            (Key::VolumeUp, 24),
            (Key::VolumeDown, 25),
            (Key::VolumeMute, 164),
            (Key::Up, 19),
            (Key::Down, 20),
            (Key::Left, 21),
            (Key::Right, 22),
            (Key::PlayPause, 85),
            (Key::Stop, 86),
            (Key::Next, 87),
            (Key::Previous, 88),
            (Key::FastForward, 90),
            (Key::Rewind, 89),
            (Key::Power, 26),
        ];
        for (key, code) in expected {
            assert_eq!(key.code(), code, "{:?}", key);
        }
    }

    #[test]
    fn test_every_key_has_unique_code() {
        let mut codes: Vec<u16> = Key::all().map(|k| k.code()).collect();
        let total = codes.len();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), total);
        assert!(Key::all().all(|k| k.code() != 0));
    }

    #[test]
    fn test_key_from_name() {
        assert_eq!(Key::from_name("center"), Some(Key::Center));
        assert_eq!(Key::from_name("OK"), Some(Key::Center));
        assert_eq!(Key::from_name("volume-up"), Some(Key::VolumeUp));
        assert_eq!(Key::from_name("ffwd"), Some(Key::FastForward));
        assert_eq!(Key::from_name("mute"), Some(Key::VolumeMute));
        assert_eq!(Key::from_name("teleport"), None);
    }

    #[test]
    fn test_command_shell_lines() {
        assert_eq!(Command::key(Key::Center).to_shell(), "input keyevent 23");
        assert_eq!(
            Command::launch("stremio:///detail/movie/tt0111161/tt0111161").to_shell(),
            "am start -a android.intent.action.VIEW -d 'stremio:///detail/movie/tt0111161/tt0111161'"
        );
        assert_eq!(
            Command::query("dumpsys media_session").to_shell(),
            "dumpsys media_session"
        );
    }

    #[test]
    fn test_shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn test_command_result_with_kind_only_tags_failures() {
        let ok = CommandResult::success("done").with_kind(ErrorKind::LaunchFailed);
        assert_eq!(ok.error_kind, None);

        let failed = CommandResult::failure(ErrorKind::Timeout, "slow")
            .with_kind(ErrorKind::KeyPressFailed);
        assert_eq!(failed.error_kind, Some(ErrorKind::KeyPressFailed));
    }

    #[test]
    fn test_command_result_into_output() {
        assert_eq!(CommandResult::success("x").into_output().unwrap(), "x");
        let err = CommandResult::failure(ErrorKind::NotConnected, "nope")
            .into_output()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotConnected);
    }

    #[test]
    fn test_retry_policy_clamps_attempts() {
        let policy = RetryPolicy::new(0, Duration::from_millis(10));
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn test_play_state_codes() {
        assert_eq!(PlayState::from_code(3), PlayState::Playing);
        assert_eq!(PlayState::from_code(2), PlayState::Paused);
        assert_eq!(PlayState::from_code(1), PlayState::Stopped);
        assert_eq!(PlayState::from_code(7), PlayState::Unknown);
    }

    #[test]
    fn test_playback_status_missing_fields() {
        let status = PlaybackStatus::foreign("com.google.android.youtube.tv");
        assert_eq!(status.state, PlayState::Unknown);
        assert_eq!(status.completeness(), Some(ErrorKind::ParseIncomplete));
        assert_eq!(status.missing_fields().len(), 4);
    }

    #[test]
    fn test_power_state_parse() {
        assert_eq!(
            PowerState::parse_dumpsys("Display Power: state=ON"),
            PowerState::On
        );
        assert_eq!(
            PowerState::parse_dumpsys("  Display Power: state=OFF\n"),
            PowerState::Off
        );
        assert_eq!(PowerState::parse_dumpsys(""), PowerState::Unknown);
    }

    #[test]
    fn test_format_ms() {
        assert_eq!(format_ms(0), "00:00");
        assert_eq!(format_ms(734_000), "12:14");
        assert_eq!(format_ms(5_400_000), "1:30:00");
    }
}
