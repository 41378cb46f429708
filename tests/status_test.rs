//! Status interpreter tests over a scripted device

mod common;

use std::sync::Arc;

use common::{FakeBridge, Reply};
use stremio_remote::device::{
    status::{FOCUS_QUERY, SESSION_QUERY},
    DeviceEndpoint, DeviceSession, ErrorKind, PlayState, RetryPolicy, STREMIO_PACKAGE,
};

const STREMIO_FOCUS: &str =
    "  mCurrentFocus=Window{5c1e9a2 u0 com.stremio.one/com.stremio.one.MainActivity}\n";

const YOUTUBE_FOCUS: &str = "  mCurrentFocus=Window{1 u0 com.google.android.youtube.tv/com.google.android.apps.youtube.tv.activity.ShellActivity}\n";

const SESSIONS: &str = "MEDIA SESSION SERVICE (dumpsys media_session)

  Media button session is com.stremio.one/Stremio (userId=0)
  Global priority session is null
  Sessions Stack - have 1 sessions:
    Stremio com.stremio.one/Stremio (userId=0)
      package=com.stremio.one
      active=true
      state=PlaybackState {state=2, position=61000, buffered position=90000, speed=0.0, updated=7}
      metadata: size=4, description=Dune: Part Two, null, null
      duration=9960000
";

async fn connected_session(bridge: Arc<FakeBridge>) -> DeviceSession {
    let ep = DeviceEndpoint::new("192.168.1.50", 5555);
    bridge.set_devices("192.168.1.50:5555\tdevice\n");
    let session = DeviceSession::new(ep, bridge);
    assert!(session.connect(&RetryPolicy::default()).await.is_authorized());
    session
}

#[tokio::test]
async fn test_foreign_app_reports_unknown() {
    let bridge = Arc::new(FakeBridge::new());
    bridge.on_shell("dumpsys window", Reply::output(YOUTUBE_FOCUS));
    bridge.on_shell(SESSION_QUERY, Reply::output(SESSIONS));
    let session = connected_session(bridge.clone()).await;

    let status = session.query_status().await.unwrap();

    assert_eq!(status.app_in_foreground, "com.google.android.youtube.tv");
    assert_eq!(status.state, PlayState::Unknown);
    assert_eq!(status.title, None);
    assert_eq!(status.position_ms, None);
    assert_eq!(status.duration_ms, None);
    // Media sessions are not consulted for a foreign app
    assert_eq!(bridge.shell_commands(), vec![FOCUS_QUERY.to_string()]);
}

// Stremio holds the media-button session while playing
#[tokio::test]
async fn test_stremio_playback_status() {
    let bridge = Arc::new(FakeBridge::new());
    bridge.on_shell("dumpsys window", Reply::output(STREMIO_FOCUS));
    bridge.on_shell(SESSION_QUERY, Reply::output(SESSIONS));
    let session = connected_session(bridge).await;

    let status = session.query_status().await.unwrap();

    assert_eq!(status.app_in_foreground, STREMIO_PACKAGE);
    assert_eq!(status.state, PlayState::Paused);
    assert_eq!(status.title.as_deref(), Some("Dune: Part Two"));
    assert_eq!(status.position_ms, Some(61000));
    assert_eq!(status.duration_ms, Some(9960000));
    assert_eq!(status.completeness(), None);
}

#[tokio::test]
async fn test_stremio_without_session_is_partial() {
    let bridge = Arc::new(FakeBridge::new());
    bridge.on_shell("dumpsys window", Reply::output(STREMIO_FOCUS));
    bridge.on_shell(
        SESSION_QUERY,
        Reply::output("MEDIA SESSION SERVICE (dumpsys media_session)\n  Sessions Stack - have 0 sessions:\n"),
    );
    let session = connected_session(bridge).await;

    let status = session.query_status().await.unwrap();

    assert_eq!(status.app_in_foreground, STREMIO_PACKAGE);
    assert_eq!(status.state, PlayState::Unknown);
    assert_eq!(status.title, None);
    assert_eq!(status.completeness(), Some(ErrorKind::ParseIncomplete));
}

#[tokio::test]
async fn test_custom_target_package() {
    let bridge = Arc::new(FakeBridge::new());
    bridge.on_shell("dumpsys window", Reply::output(YOUTUBE_FOCUS));
    bridge.on_shell(SESSION_QUERY, Reply::output(SESSIONS));
    bridge.set_devices("192.168.1.50:5555\tdevice\n");
    let session = DeviceSession::new(DeviceEndpoint::new("192.168.1.50", 5555), bridge.clone())
        .with_target_package("com.google.android.youtube.tv");
    session.connect(&RetryPolicy::default()).await;

    let status = session.query_status().await.unwrap();
    assert_eq!(status.app_in_foreground, "com.google.android.youtube.tv");
    assert_eq!(bridge.shell_commands().len(), 2);
}

#[tokio::test]
async fn test_status_not_connected() {
    let bridge = Arc::new(FakeBridge::new());
    let session = DeviceSession::new(DeviceEndpoint::new("192.168.1.50", 5555), bridge.clone());

    let err = session.query_status().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotConnected);
    assert!(bridge.calls().is_empty());
}
