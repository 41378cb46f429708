//! Authentication retry controller
//!
//! Turns a one-shot connect into a bounded wait for someone to tap "Allow"
//! on the TV. Running out of patience is not fatal: the caller gets
//! [`ConnectOutcome::Degraded`] and individual commands keep failing with
//! `NotConnected` until the device is approved and a later connect succeeds.

use super::connection::ConnectionHandle;
use super::types::{ConnectOutcome, RetryPolicy};

/// Connect, then keep re-connecting until authorized or attempts run out
///
/// Each attempt re-issues the connect (a dropped session must be
/// re-established, not just re-checked). Sleeps only between attempts, so
/// `N` attempts cost `N - 1` delays.
pub async fn authenticate(handle: &mut ConnectionHandle, policy: &RetryPolicy) -> ConnectOutcome {
    let mut last_state = handle.state();

    for attempt in 1..=policy.max_attempts() {
        if attempt > 1 {
            tracing::info!(
                endpoint = %handle.endpoint(),
                attempt,
                max_attempts = policy.max_attempts(),
                delay = ?policy.delay_between_attempts(),
                "device not authorized yet, retrying"
            );
            tokio::time::sleep(policy.delay_between_attempts()).await;
        }

        last_state = handle.connect().await;
        if last_state.is_authorized() {
            tracing::info!(endpoint = %handle.endpoint(), attempt, "device authorized");
            return ConnectOutcome::Authorized { attempts: attempt };
        }
    }

    tracing::warn!(
        endpoint = %handle.endpoint(),
        state = %last_state,
        attempts = policy.max_attempts(),
        "authorization retries exhausted, continuing degraded"
    );
    ConnectOutcome::Degraded {
        last_state,
        attempts: policy.max_attempts(),
    }
}

/// Reconnect only when the session is not already authorized
///
/// This is the recovery path after a dispatch observed a dropped session
/// and moved the handle to `Disconnected`.
pub async fn ensure_authorized(
    handle: &mut ConnectionHandle,
    policy: &RetryPolicy,
) -> ConnectOutcome {
    if handle.state().is_authorized() {
        return ConnectOutcome::Authorized { attempts: 0 };
    }
    authenticate(handle, policy).await
}
