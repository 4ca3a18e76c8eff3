//! Bridge to the locally-installed costa CLI.
//!
//! Resolves the agent binary, invokes it as a JSON-producing subprocess and
//! maps its replies onto typed results. Every operation is a fresh process;
//! concurrent invocations are independent. Errors propagate unchanged to the
//! caller; recovery policy belongs to the supervisors built on top.

pub mod error;
pub mod resolve;
pub mod runner;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use error::{BridgeError, BridgeResult};
use resolve::ResolvedBinary;
use runner::{CliOutput, CliRunner, SystemRunner};
use types::{LoginReply, StatusReply, TokenReply};

/// Typed facade over the costa CLI.
#[derive(Clone)]
pub struct CostaCli {
    runner: Arc<dyn CliRunner>,
}

impl CostaCli {
    /// Bridge over a real binary.
    pub fn system(binary: ResolvedBinary, timeout: Duration) -> Self {
        Self {
            runner: Arc::new(SystemRunner::new(binary).with_timeout(timeout)),
        }
    }

    /// Bridge over an arbitrary runner (tests substitute a scripted one).
    pub fn with_runner(runner: Arc<dyn CliRunner>) -> Self {
        Self { runner }
    }

    /// Starts a login; the reply carries the URL the user must visit.
    pub async fn login(&self) -> BridgeResult<LoginReply> {
        let output = self.runner.run(&["login", "--format", "json"]).await?;
        parse_reply("login", &output)
    }

    /// Reports whether a session exists and, if so, its usage counters.
    pub async fn status(&self) -> BridgeResult<StatusReply> {
        let output = self.runner.run(&["status", "--format", "json"]).await?;
        parse_reply("status", &output)
    }

    /// Fetches the current access token.
    pub async fn token(&self) -> BridgeResult<TokenReply> {
        let output = self.runner.run(&["token", "--format", "json"]).await?;
        parse_reply("token", &output)
    }

    /// Ends the session. Output is discarded; exit code zero is success.
    pub async fn logout(&self) -> BridgeResult<()> {
        self.runner.run(&["logout"]).await?;
        debug!("costa logout completed");
        Ok(())
    }

    /// Smoke test: the CLI's version string.
    pub async fn version(&self) -> BridgeResult<String> {
        let output = self.runner.run(&["--version"]).await?;
        Ok(output.stdout.trim().to_string())
    }
}

fn parse_reply<T: DeserializeOwned>(
    operation: &'static str,
    output: &CliOutput,
) -> BridgeResult<T> {
    serde_json::from_str(output.stdout.trim())
        .map_err(|source| BridgeError::MalformedResponse { operation, source })
}
