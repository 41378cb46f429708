//! CLI Command Handlers
//!
//! Implements all CLI commands on top of the device session and TMDB client.
//! Each handler takes CLI args, the shared [`Context`] and Output, returns
//! ExitCode.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::api::{tmdb, TmdbClient, TmdbError};
use crate::cli::{
    Cli, ConnectCmd, DisconnectCmd, ExitCode, KeyCmd, KeysCmd, LaunchCmd, Output, PlayCmd,
    PowerAction, PowerCmd, SearchCmd, StatusCmd, VolumeAction, VolumeCmd, WatchCmd,
};
use crate::config::{Config, ConfigError};
use crate::deeplink::{DeepLink, DeepLinkError};
use crate::device::{
    automation, control, dispatch, retry, status, AdbBridge, Bridge, Command, CommandResult,
    ConnectOutcome, ConnectionState, DeviceSession, ErrorKind, Key, PlaybackStatus, PowerState,
    RetryPolicy, SessionRegistry,
};
use crate::models::{MediaKind, SearchResult};

// =============================================================================
// Context
// =============================================================================

/// Resolve the effective configuration: file, then environment, then flags
pub fn load_config(cli: &Cli) -> Result<Config, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.apply_env()?;
    if let Some(host) = &cli.host {
        config.device.host = Some(host.clone());
    }
    if let Some(port) = cli.port {
        config.device.port = port;
    }
    config.validate()?;
    Ok(config)
}

/// Configuration plus the session registry shared by all handlers
pub struct Context {
    pub config: Config,
    bridge: Arc<dyn Bridge>,
    registry: SessionRegistry,
    tmdb_base_url: String,
}

impl Context {
    /// Context talking to the real `adb` binary
    pub fn new(config: Config) -> Self {
        let bridge = AdbBridge::with_path(config.device.adb_path.clone())
            .timeout(config.transport_timeout());
        Self::with_bridge(config, Arc::new(bridge))
    }

    pub fn with_bridge(config: Config, bridge: Arc<dyn Bridge>) -> Self {
        let registry = SessionRegistry::new(bridge.clone())
            .with_target_package(config.playback.target_package.clone());
        Self {
            config,
            bridge,
            registry,
            tmdb_base_url: tmdb::DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point title lookups at another TMDB-compatible server
    pub fn with_tmdb_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.tmdb_base_url = base_url.into();
        self
    }

    fn session(&self) -> Result<Arc<DeviceSession>, ConfigError> {
        Ok(self.registry.session(&self.config.endpoint()?))
    }

    fn tmdb(&self) -> TmdbClient {
        TmdbClient::with_base_url(
            self.config.tmdb_api_key.clone().unwrap_or_default(),
            self.tmdb_base_url.clone(),
        )
    }
}

fn session_or_exit(ctx: &Context, output: &Output) -> Result<Arc<DeviceSession>, ExitCode> {
    ctx.session()
        .map_err(|e| output.error(e.to_string(), ExitCode::InvalidArgs))
}

/// Tell the user what to do when a connect did not end authorized
fn report_degraded(outcome: &ConnectOutcome, output: &Output) {
    match outcome.state() {
        ConnectionState::Unauthorized => output.info(
            "Device has not approved this computer. Accept the \"Allow USB debugging?\" \
             prompt on the TV (tick \"Always allow\"), then retry.",
        ),
        ConnectionState::Failed => output.info(
            "Device unreachable. Check that the TV is on, network debugging is enabled \
             and the host/port are correct.",
        ),
        _ => {}
    }
}

/// Exit code for a failed command, refined by how the connect went
fn failure_code(result: &CommandResult, outcome: &ConnectOutcome) -> ExitCode {
    match (result.error_kind, outcome.state()) {
        (Some(ErrorKind::NotConnected), ConnectionState::Unauthorized) => {
            ExitCode::NotAuthorized
        }
        (Some(kind), _) => ExitCode::for_kind(kind),
        (None, _) => ExitCode::Error,
    }
}

fn print_or_error<T: Serialize>(output: &Output, data: T) -> ExitCode {
    if let Err(e) = output.print(data) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    ExitCode::Success
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub endpoint: String,
    #[serde(flatten)]
    pub outcome: ConnectOutcome,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub endpoint: String,
    pub command: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub output: String,
}

#[derive(Debug, Serialize)]
pub struct PlayResponse {
    pub endpoint: String,
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub autoplay: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub endpoint: String,
    #[serde(flatten)]
    pub status: PlaybackStatus,
    pub complete: bool,
}

#[derive(Debug, Serialize)]
pub struct PowerResponse {
    pub endpoint: String,
    pub state: PowerState,
}

#[derive(Debug, Serialize)]
pub struct KeyInfo {
    pub name: &'static str,
    pub code: u16,
}

// =============================================================================
// Connection Commands
// =============================================================================

pub async fn connect_cmd(cmd: ConnectCmd, ctx: &Context, output: &Output) -> ExitCode {
    let session = match session_or_exit(ctx, output) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let base = ctx.config.retry_policy();
    let policy = RetryPolicy::new(
        cmd.attempts.unwrap_or(base.max_attempts()),
        cmd.delay_ms
            .map(Duration::from_millis)
            .unwrap_or(base.delay_between_attempts()),
    );

    if !ctx.bridge.is_available().await {
        return output.error(
            format!(
                "adb not found at '{}' (set ADB_PATH or device.adb_path)",
                ctx.bridge.location()
            ),
            ExitCode::InvalidArgs,
        );
    }

    output.info(format!("Connecting to {}...", session.endpoint()));
    let outcome = session.connect(&policy).await;
    let endpoint = session.endpoint().to_string();

    if outcome.is_authorized() {
        return print_or_error(output, ConnectResponse { endpoint, outcome });
    }

    report_degraded(&outcome, output);
    let code = match outcome.state() {
        ConnectionState::Unauthorized => ExitCode::NotAuthorized,
        _ => ExitCode::DeviceNotFound,
    };
    output.error(
        format!(
            "Not authorized after {} attempts (state: {})",
            outcome.attempts(),
            outcome.state()
        ),
        code,
    )
}

pub async fn disconnect_cmd(_cmd: DisconnectCmd, ctx: &Context, output: &Output) -> ExitCode {
    let session = match session_or_exit(ctx, output) {
        Ok(s) => s,
        Err(code) => return code,
    };
    session.disconnect().await;

    #[derive(Serialize)]
    struct Disconnected {
        endpoint: String,
        state: ConnectionState,
    }
    print_or_error(
        output,
        Disconnected {
            endpoint: session.endpoint().to_string(),
            state: session.state().await,
        },
    )
}

// =============================================================================
// Key / Launch Commands
// =============================================================================

/// Connect if needed, then run `commands` in order under one session lock
///
/// Stops at the first failure.
async fn run_commands(
    ctx: &Context,
    commands: &[Command],
    interval: Duration,
    output: &Output,
) -> ExitCode {
    let session = match session_or_exit(ctx, output) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let policy = ctx.config.retry_policy();

    let mut handle = session.lock().await;
    let outcome = retry::ensure_authorized(&mut handle, &policy).await;
    if !outcome.is_authorized() {
        report_degraded(&outcome, output);
    }

    let mut responses = Vec::new();
    for (i, command) in commands.iter().enumerate() {
        if i > 0 && !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
        let result = dispatch::dispatch(&mut handle, command).await;
        if !result.ok {
            return output.error(
                format!("{} failed: {}", command, result.raw_output.trim()),
                failure_code(&result, &outcome),
            );
        }
        responses.push(CommandResponse {
            endpoint: session.endpoint().to_string(),
            command: command.to_string(),
            output: result.raw_output.trim().to_string(),
        });
    }
    drop(handle);

    print_or_error(output, responses)
}

pub async fn key_cmd(cmd: KeyCmd, ctx: &Context, output: &Output) -> ExitCode {
    let commands: Vec<Command> = cmd.keys.iter().map(|code| Command::KeyEvent(*code)).collect();
    run_commands(ctx, &commands, Duration::from_millis(cmd.interval_ms), output).await
}

pub async fn keys_cmd(_cmd: KeysCmd, output: &Output) -> ExitCode {
    let keys: Vec<KeyInfo> = Key::all()
        .map(|k| KeyInfo {
            name: k.name(),
            code: k.code(),
        })
        .collect();
    print_or_error(output, keys)
}

pub async fn launch_cmd(cmd: LaunchCmd, ctx: &Context, output: &Output) -> ExitCode {
    if cmd.uri.trim().is_empty() || !cmd.uri.contains(':') {
        return output.error(
            format!("Invalid URI '{}' (expected scheme:...)", cmd.uri),
            ExitCode::InvalidArgs,
        );
    }
    run_commands(ctx, &[Command::launch(cmd.uri)], Duration::ZERO, output).await
}

// =============================================================================
// Play Commands
// =============================================================================

/// Open `link` and optionally press play, all under one session lock
async fn play_link(
    ctx: &Context,
    link: &DeepLink,
    title: Option<String>,
    autoplay: bool,
    delay_ms: Option<u64>,
    output: &Output,
) -> ExitCode {
    let uri = match link.to_uri(&ctx.config.playback.uri_scheme) {
        Ok(uri) => uri,
        Err(e) => return output.error(e.to_string(), ExitCode::InvalidArgs),
    };
    let session = match session_or_exit(ctx, output) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let policy = ctx.config.retry_policy();
    let press_delay = delay_ms
        .map(Duration::from_millis)
        .unwrap_or(ctx.config.press_delay());

    output.info(format!("Opening {} on {}...", link, session.endpoint()));

    let mut handle = session.lock().await;
    let outcome = retry::ensure_authorized(&mut handle, &policy).await;
    if !outcome.is_authorized() {
        report_degraded(&outcome, output);
    }

    let result = if autoplay {
        automation::auto_play(&mut handle, &uri, press_delay).await
    } else {
        dispatch::dispatch(&mut handle, &Command::launch(uri.clone())).await
    };
    drop(handle);

    if !result.ok {
        return output.error(
            format!("Failed to play {}: {}", link, result.raw_output.trim()),
            failure_code(&result, &outcome),
        );
    }

    print_or_error(
        output,
        PlayResponse {
            endpoint: session.endpoint().to_string(),
            uri,
            title,
            autoplay,
        },
    )
}

pub async fn play_cmd(cmd: PlayCmd, ctx: &Context, output: &Output) -> ExitCode {
    let link = match DeepLink::for_kind(cmd.media_kind(), &cmd.imdb_id, cmd.season, cmd.episode)
    {
        Ok(link) => link,
        Err(e) => return output.error(e.to_string(), ExitCode::InvalidArgs),
    };
    play_link(ctx, &link, None, !cmd.no_autoplay, cmd.delay_ms, output).await
}

pub async fn watch_cmd(cmd: WatchCmd, ctx: &Context, output: &Output) -> ExitCode {
    let kind = MediaKind::from(cmd.kind);

    // Checked before spending a search
    if kind == MediaKind::Tv && (cmd.season.is_none() || cmd.episode.is_none()) {
        return output.error(
            DeepLinkError::MissingEpisode.to_string(),
            ExitCode::InvalidArgs,
        );
    }

    output.info(format!("Searching for: {}", cmd.title));
    let results = match ctx.tmdb().resolve(&cmd.title, kind, cmd.year, 1).await {
        Ok(results) => results,
        Err(e) => return tmdb_error(e, output),
    };

    let Some(best) = results.into_iter().next() else {
        return output.error(
            format!("No {} found matching '{}'", kind, cmd.title),
            ExitCode::NoResults,
        );
    };
    let Some(imdb_id) = best.external_id.clone() else {
        return output.error(
            format!("Found '{}' but no IMDb ID available", best.title),
            ExitCode::NoResults,
        );
    };

    let link = match DeepLink::for_kind(kind, imdb_id, cmd.season, cmd.episode) {
        Ok(link) => link,
        Err(e) => return output.error(e.to_string(), ExitCode::Error),
    };
    play_link(
        ctx,
        &link,
        Some(best.to_string()),
        !cmd.no_autoplay,
        cmd.delay_ms,
        output,
    )
    .await
}

// =============================================================================
// Search Command
// =============================================================================

fn tmdb_error(e: TmdbError, output: &Output) -> ExitCode {
    let code = match e {
        TmdbError::MissingApiKey => ExitCode::InvalidArgs,
        TmdbError::NotFound => ExitCode::NoResults,
        _ => ExitCode::NetworkError,
    };
    output.error(format!("Search failed: {}", e), code)
}

/// Up to `limit` results per kind, movies before TV shows
pub async fn search_cmd(cmd: SearchCmd, ctx: &Context, output: &Output) -> ExitCode {
    output.info(format!("Searching for: {}", cmd.query));
    let client = ctx.tmdb();

    let mut results: Vec<SearchResult> = Vec::new();
    for &kind in cmd.kind.media_kinds() {
        match client.resolve(&cmd.query, kind, cmd.year, cmd.limit).await {
            Ok(found) => results.extend(found),
            Err(e) => return tmdb_error(e, output),
        }
    }

    for r in &results {
        output.info(r);
    }
    print_or_error(output, results)
}

// =============================================================================
// Status Command
// =============================================================================

pub async fn status_cmd(_cmd: StatusCmd, ctx: &Context, output: &Output) -> ExitCode {
    let session = match session_or_exit(ctx, output) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let policy = ctx.config.retry_policy();

    let mut handle = session.lock().await;
    let outcome = retry::ensure_authorized(&mut handle, &policy).await;
    if !outcome.is_authorized() {
        report_degraded(&outcome, output);
    }
    let result = status::query_status(&mut handle, session.target_package()).await;
    drop(handle);

    match result {
        Ok(status) => {
            output.info(&status);
            let complete = status.completeness().is_none();
            print_or_error(
                output,
                StatusResponse {
                    endpoint: session.endpoint().to_string(),
                    status,
                    complete,
                },
            )
        }
        Err(e) => {
            let code = match (e.kind(), outcome.state()) {
                (ErrorKind::NotConnected, ConnectionState::Unauthorized) => {
                    ExitCode::NotAuthorized
                }
                (kind, _) => ExitCode::for_kind(kind),
            };
            output.error(format!("Status query failed: {}", e), code)
        }
    }
}

// =============================================================================
// Volume / Power Commands
// =============================================================================

pub async fn volume_cmd(cmd: VolumeCmd, ctx: &Context, output: &Output) -> ExitCode {
    let command = match cmd.parse_level() {
        VolumeAction::Up => Command::key(Key::VolumeUp),
        VolumeAction::Down => Command::key(Key::VolumeDown),
        VolumeAction::Mute => Command::key(Key::VolumeMute),
        VolumeAction::Set(level) => {
            let session = match session_or_exit(ctx, output) {
                Ok(s) => s,
                Err(code) => return code,
            };
            let mut handle = session.lock().await;
            let outcome = retry::ensure_authorized(&mut handle, &ctx.config.retry_policy()).await;
            if !outcome.is_authorized() {
                report_degraded(&outcome, output);
            }
            let result = control::set_volume(&mut handle, level).await;
            drop(handle);

            return match result {
                Ok(result) if result.ok => print_or_error(
                    output,
                    CommandResponse {
                        endpoint: session.endpoint().to_string(),
                        command: format!("volume {}", level),
                        output: result.raw_output.trim().to_string(),
                    },
                ),
                Ok(result) => output.error(
                    format!("Setting volume failed: {}", result.raw_output.trim()),
                    failure_code(&result, &outcome),
                ),
                Err(e) => output.error(e.to_string(), ExitCode::InvalidArgs),
            };
        }
        VolumeAction::Invalid(s) => {
            return output.error(
                format!("Invalid volume '{}' (expected up, down, mute or 0-15)", s),
                ExitCode::InvalidArgs,
            )
        }
    };
    run_commands(ctx, &[command], Duration::ZERO, output).await
}

pub async fn power_cmd(cmd: PowerCmd, ctx: &Context, output: &Output) -> ExitCode {
    let key = match cmd.action {
        PowerAction::Wake => Key::Wakeup,
        PowerAction::Sleep => Key::Sleep,
        PowerAction::Toggle => Key::Power,
        PowerAction::Status => return power_status(ctx, output).await,
    };
    run_commands(ctx, &[Command::key(key)], Duration::ZERO, output).await
}

async fn power_status(ctx: &Context, output: &Output) -> ExitCode {
    let session = match session_or_exit(ctx, output) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let mut handle = session.lock().await;
    let outcome = retry::ensure_authorized(&mut handle, &ctx.config.retry_policy()).await;
    if !outcome.is_authorized() {
        report_degraded(&outcome, output);
    }
    let result = control::power_state(&mut handle).await;
    drop(handle);

    match result {
        Ok(state) => {
            output.info(format!("Display is {}", state));
            print_or_error(
                output,
                PowerResponse {
                    endpoint: session.endpoint().to_string(),
                    state,
                },
            )
        }
        Err(e) => {
            let code = match (e.kind(), outcome.state()) {
                (ErrorKind::NotConnected, ConnectionState::Unauthorized) => {
                    ExitCode::NotAuthorized
                }
                (kind, _) => ExitCode::for_kind(kind),
            };
            output.error(format!("Power query failed: {}", e), code)
        }
    }
}
