use super::*;
use crate::bridge::error::BridgeError;
use crate::bridge::testing::{Reply, ScriptedRunner};
use std::sync::Arc;

const NOT_LOGGED_IN: &str = "{\"logged_in\": false}";
const LOGGED_IN: &str = "{\"logged_in\": true, \"points\": 1}";

fn login_reply(timeout_secs: u64) -> Reply {
    Reply::Stdout(format!(
        "{{\"status\": \"waiting_for_user\", \"auth_url\": \"https://example.com/auth\", \"timeout_seconds\": {}}}",
        timeout_secs
    ))
}

fn cli_with(runner: &Arc<ScriptedRunner>) -> CostaCli {
    CostaCli::with_runner(runner.clone())
}

#[tokio::test(start_paused = true)]
async fn test_login_completes_on_third_poll() {
    let runner = ScriptedRunner::new();
    runner.enqueue(login_reply(30));
    runner.enqueue(Reply::json(NOT_LOGGED_IN));
    runner.enqueue(Reply::json(NOT_LOGGED_IN));
    runner.enqueue(Reply::json(LOGGED_IN));
    runner.set_fallback(Reply::json(NOT_LOGGED_IN));
    let cli = cli_with(&runner);

    let pending = start_login_with_interval(&cli, Duration::from_secs(3))
        .await
        .unwrap();
    assert_eq!(pending.auth_url, "https://example.com/auth");
    assert_eq!(runner.call_count(), 1);

    let outcome = pending.completion.await.unwrap();
    assert_eq!(outcome, LoginOutcome::LoggedIn);
    assert_eq!(runner.call_count(), 4);

    // The watch has stopped; the 30s window closing changes nothing.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(runner.call_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_login_watch_times_out_and_stops_polling() {
    let runner = ScriptedRunner::new();
    runner.enqueue(login_reply(9));
    runner.set_fallback(Reply::json(NOT_LOGGED_IN));
    let cli = cli_with(&runner);

    let pending = start_login_with_interval(&cli, Duration::from_secs(3))
        .await
        .unwrap();
    let outcome = pending.completion.await.unwrap();
    assert_eq!(outcome, LoginOutcome::TimedOut);

    // One login plus at most three polls fit inside the 9s window.
    let after_timeout = runner.call_count();
    assert!(after_timeout <= 4, "got {} calls", after_timeout);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(runner.call_count(), after_timeout);
}

#[tokio::test(start_paused = true)]
async fn test_flaky_polls_do_not_abort_the_watch() {
    let runner = ScriptedRunner::new();
    runner.enqueue(login_reply(60));
    runner.enqueue(Reply::Timeout);
    runner.enqueue(Reply::ExitFailure {
        code: 1,
        stderr: "transient".to_string(),
    });
    runner.enqueue(Reply::json(LOGGED_IN));
    let cli = cli_with(&runner);

    let pending = start_login_with_interval(&cli, Duration::from_secs(3))
        .await
        .unwrap();
    let outcome = pending.completion.await.unwrap();
    assert_eq!(outcome, LoginOutcome::LoggedIn);
    assert_eq!(runner.call_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_default_window_applies_when_cli_omits_timeout() {
    let runner = ScriptedRunner::new();
    runner.enqueue(Reply::json(
        "{\"status\": \"waiting_for_user\", \"auth_url\": \"https://example.com/auth\"}",
    ));
    runner.set_fallback(Reply::json(NOT_LOGGED_IN));
    let cli = cli_with(&runner);

    let pending = start_login_with_interval(&cli, Duration::from_secs(3))
        .await
        .unwrap();
    let outcome = pending.completion.await.unwrap();
    // With no explicit window the watch runs the full 600s before giving up.
    assert_eq!(outcome, LoginOutcome::TimedOut);
    assert!(runner.call_count() > 150, "got {}", runner.call_count());
}

#[tokio::test(start_paused = true)]
async fn test_missing_auth_url_is_a_failure() {
    let runner = ScriptedRunner::new();
    runner.enqueue(Reply::json("{\"status\": \"waiting_for_user\"}"));
    let cli = cli_with(&runner);

    let err = start_login(&cli).await.unwrap_err();
    assert!(err.to_string().contains("auth URL"));
    assert_eq!(runner.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_error_status_surfaces_the_cli_message() {
    let runner = ScriptedRunner::new();
    runner.enqueue(Reply::json(
        "{\"status\": \"error\", \"message\": \"account disabled\"}",
    ));
    let cli = cli_with(&runner);

    let err = start_login(&cli).await.unwrap_err();
    assert!(err.to_string().contains("account disabled"));
}

#[tokio::test(start_paused = true)]
async fn test_bridge_errors_propagate_from_start_login() {
    let runner = ScriptedRunner::new();
    runner.enqueue(Reply::NotFound);
    let cli = cli_with(&runner);

    let err = start_login(&cli).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BridgeError>(),
        Some(BridgeError::CliNotFound)
    ));
}
