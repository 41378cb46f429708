//! CLI - Command Line Interface for stremio-remote
//!
//! Every action is scriptable and all output is JSON-parseable.
//!
//! # Examples
//!
//! ```bash
//! # Pair with the TV (accept the prompt on screen)
//! stremio-remote --host 192.168.1.50 connect
//!
//! # Find and play
//! stremio-remote search "the shawshank redemption"
//! stremio-remote play tt0111161
//! stremio-remote watch "breaking bad" -t tv -s 1 -e 1
//!
//! # Remote control
//! stremio-remote key back
//! stremio-remote volume 8
//! stremio-remote status --json
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::device::{ErrorKind, Key, MAX_VOLUME};
use crate::models::MediaKind;

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid arguments or configuration
    InvalidArgs = 2,
    /// Network or transport error
    NetworkError = 3,
    /// Device unreachable or not connected
    DeviceNotFound = 4,
    /// Search returned nothing playable
    NoResults = 5,
    /// Device rejected the launch or key press
    CommandFailed = 6,
    /// Device reachable but debugging not approved
    NotAuthorized = 7,
}

impl ExitCode {
    /// Exit code for a failed device command
    pub fn for_kind(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NotConnected => ExitCode::DeviceNotFound,
            ErrorKind::Unauthorized => ExitCode::NotAuthorized,
            ErrorKind::TransportError | ErrorKind::Timeout => ExitCode::NetworkError,
            ErrorKind::LaunchFailed | ErrorKind::KeyPressFailed => ExitCode::CommandFailed,
            ErrorKind::ParseIncomplete => ExitCode::Success,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// stremio-remote - control Stremio on Android TV over ADB
#[derive(Parser, Debug)]
#[command(
    name = "stremio-remote",
    version,
    about = "Control Stremio on Android TV over ADB",
    long_about = "Opens movies and episodes in Stremio on an Android TV via deep links, \
                  presses play, and reads back what the TV is playing.\n\n\
                  The first connection shows an \"Allow USB debugging?\" prompt on the TV; \
                  accept it (tick \"Always allow\") and run the command again.",
    after_help = "EXAMPLES:\n\
                  stremio-remote --host 192.168.1.50 connect      Pair with the TV\n\
                  stremio-remote play tt0111161                   Open and play a movie\n\
                  stremio-remote play tt0903747 -s 1 -e 1         Open and play an episode\n\
                  stremio-remote watch \"dune\" -t movie            Search and play\n\
                  stremio-remote status --json                    What is playing"
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Android TV host (overrides ANDROID_TV_HOST and the config file)
    #[arg(long, short = 'H', global = true)]
    pub host: Option<String>,

    /// ADB port (overrides ANDROID_TV_PORT and the config file)
    #[arg(long, short = 'p', global = true)]
    pub port: Option<u16>,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect and wait for debugging approval on the TV
    #[command(visible_alias = "c")]
    Connect(ConnectCmd),

    /// Drop the ADB connection
    Disconnect(DisconnectCmd),

    /// Press remote keys by name or key code
    #[command(visible_alias = "k")]
    Key(KeyCmd),

    /// List key names and codes
    Keys(KeysCmd),

    /// Open an arbitrary URI on the TV
    Launch(LaunchCmd),

    /// Open a movie or episode in Stremio by IMDb id
    #[command(visible_alias = "p")]
    Play(PlayCmd),

    /// Search by title and play the first match
    #[command(visible_alias = "w")]
    Watch(WatchCmd),

    /// Search movies or TV shows and show their IMDb ids
    #[command(visible_alias = "s")]
    Search(SearchCmd),

    /// Show what the TV is playing
    #[command(visible_alias = "st")]
    Status(StatusCmd),

    /// Change or set the volume
    #[command(visible_alias = "vol")]
    Volume(VolumeCmd),

    /// Wake, sleep or query the display
    Power(PowerCmd),
}

// =============================================================================
// Connection Commands
// =============================================================================

/// Connect to the configured device
#[derive(Args, Debug)]
pub struct ConnectCmd {
    /// Connection attempts before giving up (overrides retry.max_attempts)
    #[arg(long, short = 'a', value_parser = clap::value_parser!(u32).range(1..))]
    pub attempts: Option<u32>,

    /// Milliseconds between attempts (overrides retry.delay_ms)
    #[arg(long)]
    pub delay_ms: Option<u64>,
}

/// Disconnect from the configured device
#[derive(Args, Debug)]
pub struct DisconnectCmd {}

// =============================================================================
// Key Commands
// =============================================================================

/// Press one or more keys in order
#[derive(Args, Debug)]
pub struct KeyCmd {
    /// Key names (ok, back, home, up, ...) or numeric key codes
    #[arg(required = true, value_parser = parse_key_code)]
    pub keys: Vec<u16>,

    /// Milliseconds between presses
    #[arg(long, default_value = "0")]
    pub interval_ms: u64,
}

/// List known keys
#[derive(Args, Debug)]
pub struct KeysCmd {}

/// Key name or raw Android key code
pub fn parse_key_code(s: &str) -> Result<u16, String> {
    if let Some(key) = Key::from_name(s) {
        return Ok(key.code());
    }
    s.trim().parse::<u16>().map_err(|_| {
        let names: Vec<&str> = Key::all().map(|k| k.name()).collect();
        format!(
            "unknown key '{}' (expected a key code or one of: {})",
            s,
            names.join(", ")
        )
    })
}

// =============================================================================
// Playback Commands
// =============================================================================

/// Open a URI with an ACTION_VIEW intent
#[derive(Args, Debug)]
pub struct LaunchCmd {
    #[arg(required = true)]
    pub uri: String,
}

/// Open a Stremio detail page and press play
#[derive(Args, Debug)]
pub struct PlayCmd {
    /// IMDB ID (e.g., tt0111161)
    #[arg(required = true)]
    pub imdb_id: String,

    /// Season number (for TV shows)
    #[arg(long, short = 's', requires = "episode")]
    pub season: Option<u16>,

    /// Episode number (for TV shows)
    #[arg(long, short = 'e', requires = "season")]
    pub episode: Option<u16>,

    /// Only open the detail page, do not press play
    #[arg(long)]
    pub no_autoplay: bool,

    /// Milliseconds to wait before pressing play (overrides playback.press_delay_ms)
    #[arg(long)]
    pub delay_ms: Option<u64>,
}

impl PlayCmd {
    pub fn media_kind(&self) -> MediaKind {
        if self.season.is_some() {
            MediaKind::Tv
        } else {
            MediaKind::Movie
        }
    }
}

/// Search by title, then play the best match
#[derive(Args, Debug)]
pub struct WatchCmd {
    /// Title to search for
    #[arg(required = true)]
    pub title: String,

    /// Movie or TV show
    #[arg(long = "type", short = 't', value_enum, default_value = "movie")]
    pub kind: MediaKindArg,

    /// Release year (first air year for TV)
    #[arg(long, short = 'y')]
    pub year: Option<u16>,

    /// Season number (required for TV shows)
    #[arg(long, short = 's')]
    pub season: Option<u16>,

    /// Episode number (required for TV shows)
    #[arg(long, short = 'e')]
    pub episode: Option<u16>,

    /// Only open the detail page, do not press play
    #[arg(long)]
    pub no_autoplay: bool,

    /// Milliseconds to wait before pressing play
    #[arg(long)]
    pub delay_ms: Option<u64>,
}

/// Search TMDB
#[derive(Args, Debug)]
pub struct SearchCmd {
    /// Search query (title)
    #[arg(required = true)]
    pub query: String,

    /// Movie, TV show, or both
    #[arg(long = "type", short = 't', value_enum, default_value = "auto")]
    pub kind: SearchKindArg,

    /// Release year (first air year for TV)
    #[arg(long, short = 'y')]
    pub year: Option<u16>,

    /// Maximum number of results per media kind
    #[arg(long, short = 'l', default_value = "5")]
    pub limit: usize,
}

/// Media kind argument
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKindArg {
    /// Movies
    Movie,
    /// TV shows
    #[value(alias = "series", alias = "show")]
    Tv,
}

impl From<MediaKindArg> for MediaKind {
    fn from(arg: MediaKindArg) -> MediaKind {
        match arg {
            MediaKindArg::Movie => MediaKind::Movie,
            MediaKindArg::Tv => MediaKind::Tv,
        }
    }
}

/// Search kind argument
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKindArg {
    /// Movies first, then TV shows
    Auto,
    /// Movies
    Movie,
    /// TV shows
    #[value(alias = "series", alias = "show")]
    Tv,
}

impl SearchKindArg {
    /// Media kinds to query, in display order
    pub fn media_kinds(self) -> &'static [MediaKind] {
        match self {
            SearchKindArg::Auto => &[MediaKind::Movie, MediaKind::Tv],
            SearchKindArg::Movie => &[MediaKind::Movie],
            SearchKindArg::Tv => &[MediaKind::Tv],
        }
    }
}

// =============================================================================
// Device Control Commands
// =============================================================================

/// Get current playback status
#[derive(Args, Debug)]
pub struct StatusCmd {}

/// Change the volume
#[derive(Args, Debug)]
pub struct VolumeCmd {
    /// up, down, mute, or a level 0-15
    #[arg(required = true)]
    pub level: String,
}

impl VolumeCmd {
    /// Parse the volume argument
    pub fn parse_level(&self) -> VolumeAction {
        let s = self.level.trim();
        match s.to_lowercase().as_str() {
            "up" | "+" => VolumeAction::Up,
            "down" | "-" => VolumeAction::Down,
            "mute" => VolumeAction::Mute,
            _ => match s.parse::<u8>() {
                Ok(level) if level <= MAX_VOLUME => VolumeAction::Set(level),
                _ => VolumeAction::Invalid(self.level.clone()),
            },
        }
    }
}

/// Parsed volume argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeAction {
    Up,
    Down,
    Mute,
    /// Absolute media volume index
    Set(u8),
    Invalid(String),
}

/// Display power control
#[derive(Args, Debug)]
pub struct PowerCmd {
    #[arg(value_enum, default_value = "status")]
    pub action: PowerAction,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    /// Turn the display on
    #[value(alias = "on")]
    Wake,
    /// Put the TV to sleep
    #[value(alias = "off")]
    Sleep,
    /// Press the power key
    Toggle,
    /// Report whether the display is on
    Status,
}

// =============================================================================
// JSON Output Types
// =============================================================================

/// Generic JSON output wrapper with status
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl<T: Serialize> JsonOutput<T> {
    /// Create success output with data
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            exit_code: 0,
        }
    }

    /// Create error output (no data)
    pub fn error_msg(msg: impl Into<String>, code: ExitCode) -> JsonOutput<()> {
        JsonOutput::<()> {
            data: None,
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Output handler for consistent formatting
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print success data
    pub fn print<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        if self.json {
            let output = JsonOutput::success(data);
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Ok(())
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let output = JsonOutput::<()>::error_msg(&msg, code);
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Print info message (suppressed in quiet mode)
    pub fn info(&self, msg: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["stremio-remote"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from([
            "stremio-remote",
            "--json",
            "--host",
            "192.168.1.50",
            "--port",
            "5556",
            "-vv",
            "status",
        ]);
        assert!(cli.json);
        assert_eq!(cli.host.as_deref(), Some("192.168.1.50"));
        assert_eq!(cli.port, Some(5556));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Status(_)));
    }

    #[test]
    fn test_play_episode() {
        let cli = Cli::parse_from([
            "stremio-remote",
            "play",
            "tt0903747",
            "-s",
            "1",
            "-e",
            "3",
            "--delay-ms",
            "4000",
        ]);
        if let Command::Play(cmd) = cli.command {
            assert_eq!(cmd.imdb_id, "tt0903747");
            assert_eq!(cmd.season, Some(1));
            assert_eq!(cmd.episode, Some(3));
            assert_eq!(cmd.delay_ms, Some(4000));
            assert!(!cmd.no_autoplay);
            assert_eq!(cmd.media_kind(), MediaKind::Tv);
        } else {
            panic!("Expected Play command");
        }
    }

    #[test]
    fn test_play_season_requires_episode() {
        assert!(Cli::try_parse_from(["stremio-remote", "play", "tt0903747", "-s", "1"]).is_err());
    }

    #[test]
    fn test_key_names_and_codes() {
        let cli = Cli::parse_from(["stremio-remote", "key", "ok", "back", "85"]);
        if let Command::Key(cmd) = cli.command {
            assert_eq!(cmd.keys, vec![23, 4, 85]);
        } else {
            panic!("Expected Key command");
        }
        assert!(Cli::try_parse_from(["stremio-remote", "key", "jump"]).is_err());
    }

    #[test]
    fn test_watch_tv_alias() {
        let cli = Cli::parse_from([
            "stremio-remote",
            "watch",
            "breaking bad",
            "-t",
            "series",
            "-s",
            "2",
            "-e",
            "5",
        ]);
        if let Command::Watch(cmd) = cli.command {
            assert_eq!(MediaKind::from(cmd.kind), MediaKind::Tv);
            assert_eq!(cmd.season, Some(2));
        } else {
            panic!("Expected Watch command");
        }
    }

    #[test]
    fn test_search_defaults_to_both_kinds() {
        let cli = Cli::parse_from(["stremio-remote", "search", "dune"]);
        if let Command::Search(cmd) = cli.command {
            assert_eq!(cmd.kind, SearchKindArg::Auto);
            assert_eq!(cmd.kind.media_kinds(), &[MediaKind::Movie, MediaKind::Tv]);
            assert_eq!(cmd.limit, 5);
        } else {
            panic!("Expected Search command");
        }

        let cli = Cli::parse_from(["stremio-remote", "search", "dune", "-t", "show"]);
        if let Command::Search(cmd) = cli.command {
            assert_eq!(cmd.kind.media_kinds(), &[MediaKind::Tv]);
        } else {
            panic!("Expected Search command");
        }
    }

    #[test]
    fn test_volume_parsing() {
        let parse = |level: &str| {
            VolumeCmd {
                level: level.to_string(),
            }
            .parse_level()
        };
        assert_eq!(parse("up"), VolumeAction::Up);
        assert_eq!(parse("DOWN"), VolumeAction::Down);
        assert_eq!(parse("mute"), VolumeAction::Mute);
        assert_eq!(parse("0"), VolumeAction::Set(0));
        assert_eq!(parse("15"), VolumeAction::Set(15));
        assert_eq!(parse("16"), VolumeAction::Invalid("16".to_string()));
        assert_eq!(parse("loud"), VolumeAction::Invalid("loud".to_string()));
    }

    #[test]
    fn test_power_default_is_status() {
        let cli = Cli::parse_from(["stremio-remote", "power"]);
        if let Command::Power(cmd) = cli.command {
            assert_eq!(cmd.action, PowerAction::Status);
        } else {
            panic!("Expected Power command");
        }
    }

    #[test]
    fn test_connect_rejects_zero_attempts() {
        assert!(Cli::try_parse_from(["stremio-remote", "connect", "-a", "0"]).is_err());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(i32::from(ExitCode::Success), 0);
        assert_eq!(i32::from(ExitCode::InvalidArgs), 2);
        assert_eq!(i32::from(ExitCode::NotAuthorized), 7);
        assert_eq!(
            ExitCode::for_kind(ErrorKind::NotConnected),
            ExitCode::DeviceNotFound
        );
        assert_eq!(
            ExitCode::for_kind(ErrorKind::LaunchFailed),
            ExitCode::CommandFailed
        );
        assert_eq!(ExitCode::for_kind(ErrorKind::Timeout), ExitCode::NetworkError);
    }
}
