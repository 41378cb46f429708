//! Status interpreter
//!
//! Derives a [`PlaybackStatus`] from `dumpsys` text. The output format drifts
//! between Android releases, so matching is line oriented and tolerant: any
//! field that cannot be found is left as `None` instead of defaulting.

use regex::Regex;
use std::sync::LazyLock;

use super::connection::ConnectionHandle;
use super::dispatch::dispatch;
use super::error::DeviceError;
use super::types::{Command, PlayState, PlaybackStatus};

/// Package name of Stremio for Android TV
pub const STREMIO_PACKAGE: &str = "com.stremio.one";

/// Foreground window / focused activity
pub const FOCUS_QUERY: &str = "dumpsys window | grep -E 'mCurrentFocus|mFocusedApp'";

/// Active media sessions with playback state and metadata
pub const SESSION_QUERY: &str = "dumpsys media_session";

/// Start of the per-session listing in `dumpsys media_session`
const SESSIONS_STACK_MARKER: &str = "Sessions Stack";

/// Summary lines that look like session headers but are not
const PREAMBLE_PREFIXES: &[&str] = &["Media button session is", "Global priority session is"];

static PACKAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s([A-Za-z][\w]*(?:\.[\w]+)+)/").expect("valid regex"));

static SESSION_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\S.*\(userId=\d+\)\s*$").expect("valid regex"));

static STATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"PlaybackState \{state=(-?\d+)").expect("valid regex"));

// "buffered position=" must not match
static POSITION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[{,]\s*position=(-?\d+)").expect("valid regex"));

static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bduration=(\d+)").expect("valid regex"));

static DESCRIPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"description=([^,]*)").expect("valid regex"));

/// Package owning the focused window, if one can be identified
pub fn parse_foreground(output: &str) -> Option<String> {
    let lines: Vec<&str> = output.lines().collect();
    ["mCurrentFocus", "mFocusedApp"].iter().find_map(|marker| {
        lines
            .iter()
            .filter(|line| line.contains(marker))
            .find_map(|line| PACKAGE_RE.captures(line))
            .map(|caps| caps[1].to_string())
    })
}

/// Lines of the media session owned by `package`
///
/// Only the `Sessions Stack` section is split into blocks; the preamble names
/// the media-button and global-priority sessions with the same header shape.
fn session_block<'a>(output: &'a str, package: &str) -> Option<Vec<&'a str>> {
    let stack = output
        .find(SESSIONS_STACK_MARKER)
        .map_or(output, |start| &output[start..]);

    let mut blocks: Vec<Vec<&str>> = Vec::new();
    for line in stack.lines() {
        if is_session_header(line) || blocks.is_empty() {
            blocks.push(Vec::new());
        }
        if let Some(block) = blocks.last_mut() {
            block.push(line);
        }
    }

    let owner_marker = format!("package={}", package);
    let owner_prefix = format!("{},", owner_marker);
    let header_marker = format!("{}/", package);

    let owned = |block: &Vec<&str>| {
        block.iter().any(|line| {
            let trimmed = line.trim();
            trimmed == owner_marker || trimmed.starts_with(&owner_prefix)
        })
    };
    let named = |block: &Vec<&str>| {
        block
            .first()
            .is_some_and(|line| is_session_header(line) && line.contains(&header_marker))
    };

    match blocks.iter().position(owned) {
        Some(i) => Some(blocks.swap_remove(i)),
        None => blocks.into_iter().find(named),
    }
}

fn is_session_header(line: &str) -> bool {
    let trimmed = line.trim_start();
    SESSION_HEADER_RE.is_match(line)
        && !PREAMBLE_PREFIXES
            .iter()
            .any(|prefix| trimmed.starts_with(prefix))
}

fn parse_title(block: &[&str]) -> Option<String> {
    for (i, line) in block.iter().enumerate() {
        if !line.contains("metadata:") {
            continue;
        }
        // Description sits on the metadata line or the one after it
        let candidate = if line.contains("description=") {
            Some(*line)
        } else {
            block.get(i + 1).copied()
        };
        let title = candidate
            .and_then(|l| DESCRIPTION_RE.captures(l))
            .map(|caps| caps[1].trim().to_string())
            .filter(|t| !t.is_empty() && t != "null");
        if title.is_some() {
            return title;
        }
    }
    None
}

/// Extract title, state, position and duration for `package`
///
/// `app_in_foreground` is left empty; [`parse_status`] fills it in.
pub fn parse_session(output: &str, package: &str) -> PlaybackStatus {
    let Some(block) = session_block(output, package) else {
        return PlaybackStatus::default();
    };

    let mut status = PlaybackStatus::default();

    for line in &block {
        if !line.contains("PlaybackState {") {
            continue;
        }
        if let Some(code) = STATE_RE
            .captures(line)
            .and_then(|caps| caps[1].parse::<i32>().ok())
        {
            status.state = PlayState::from_code(code);
        }
        status.position_ms = POSITION_RE
            .captures(line)
            .and_then(|caps| caps[1].parse::<i64>().ok())
            .and_then(|ms| u64::try_from(ms).ok());
        break;
    }

    status.duration_ms = block
        .iter()
        .find_map(|line| DURATION_RE.captures(line))
        .and_then(|caps| caps[1].parse::<u64>().ok())
        .filter(|ms| *ms > 0);

    status.title = parse_title(&block);
    status
}

/// Combine focus and media-session output into a status for `package`
///
/// When another app is in front nothing else is reported: its session data
/// says nothing about the target app.
pub fn parse_status(focus_output: &str, session_output: &str, package: &str) -> PlaybackStatus {
    let Some(app) = parse_foreground(focus_output) else {
        return PlaybackStatus::default();
    };

    if app != package {
        return PlaybackStatus::foreign(app);
    }

    PlaybackStatus {
        app_in_foreground: app,
        ..parse_session(session_output, package)
    }
}

/// Query the device and interpret the result
pub async fn query_status(
    handle: &mut ConnectionHandle,
    package: &str,
) -> Result<PlaybackStatus, DeviceError> {
    let focus = dispatch(handle, &Command::query(FOCUS_QUERY))
        .await
        .into_output()?;

    match parse_foreground(&focus) {
        Some(app) if app == package => {}
        Some(app) => return Ok(PlaybackStatus::foreign(app)),
        None => return Ok(PlaybackStatus::default()),
    }

    let sessions = dispatch(handle, &Command::query(SESSION_QUERY))
        .await
        .into_output()?;

    let status = parse_status(&focus, &sessions, package);
    if !status.missing_fields().is_empty() {
        tracing::debug!(missing = ?status.missing_fields(), "partial playback status");
    }
    Ok(status)
}
