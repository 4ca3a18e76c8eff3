//! Login flow: starts a CLI-delegated login and watches for completion.
//!
//! The CLI hands back an auth URL for the user's browser; from then on the
//! only job here is polling `status` until the session reports logged-in,
//! bounded by the window the login reply granted. The watch is one-shot:
//! when the window closes the attempt is abandoned and a fresh login must
//! be issued to try again.

use std::time::Duration;

use anyhow::Result;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::bridge::types::LoginStatus;
use crate::bridge::CostaCli;

pub const LOGIN_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Outcome of the completion watch. Delivered exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    LoggedIn,
    /// The window closed without a logged-in session. No auto-retry.
    TimedOut,
}

/// A login in progress: the URL the user must visit, plus the one-shot
/// completion signal.
#[derive(Debug)]
pub struct PendingLogin {
    pub auth_url: String,
    pub message: Option<String>,
    pub completion: oneshot::Receiver<LoginOutcome>,
}

pub async fn start_login(cli: &CostaCli) -> Result<PendingLogin> {
    start_login_with_interval(cli, LOGIN_POLL_INTERVAL).await
}

/// Starts a login and spawns the completion watch. A reply without an auth
/// URL is a caller-visible failure: there is nothing to open in a browser.
pub async fn start_login_with_interval(
    cli: &CostaCli,
    poll_interval: Duration,
) -> Result<PendingLogin> {
    let reply = cli.login().await?;

    if reply.status == LoginStatus::Error {
        let detail = reply.message.unwrap_or_else(|| "no detail given".to_string());
        anyhow::bail!("costa login failed: {}", detail);
    }
    let window = reply.poll_window();
    let auth_url = match reply.auth_url {
        Some(url) => url,
        None => anyhow::bail!("costa login reply carried no auth URL"),
    };

    let (tx, rx) = oneshot::channel();
    tokio::spawn(watch_completion(cli.clone(), poll_interval, window, tx));

    Ok(PendingLogin {
        auth_url,
        message: reply.message,
        completion: rx,
    })
}

async fn watch_completion(
    cli: CostaCli,
    poll_interval: Duration,
    window: Duration,
    tx: oneshot::Sender<LoginOutcome>,
) {
    let outcome = match tokio::time::timeout(window, poll_until_logged_in(&cli, poll_interval))
        .await
    {
        Ok(()) => LoginOutcome::LoggedIn,
        Err(_) => {
            debug!(
                "login window of {:?} elapsed without a logged-in session",
                window
            );
            LoginOutcome::TimedOut
        }
    };
    // The caller may have dropped the receiver; the watch still ends here.
    let _ = tx.send(outcome);
}

async fn poll_until_logged_in(cli: &CostaCli, poll_interval: Duration) {
    loop {
        tokio::time::sleep(poll_interval).await;
        match cli.status().await {
            Ok(reply) if reply.logged_in => return,
            Ok(_) => {}
            // A single flaky invocation must not abort an otherwise
            // successful login flow.
            Err(err) => warn!("login status poll failed: {}", err),
        }
    }
}

#[cfg(test)]
#[path = "tests/login_flow_tests.rs"]
mod tests;
