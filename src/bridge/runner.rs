//! Subprocess execution for the costa CLI.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::error::{BridgeError, BridgeResult};
use super::resolve::{self, ResolvedBinary};

/// Wall-clock limit for a single invocation. Each invocation is single-shot;
/// retries belong to the supervisors, never to this layer.
pub const INVOKE_TIMEOUT: Duration = Duration::from_secs(15);

/// Raw captured output of one invocation. Lives only for the duration of the
/// call; parsing happens in the facade.
#[derive(Debug, Clone, Default)]
pub struct CliOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Seam for executing the CLI, so the facade and the supervisors can be
/// driven by a scripted runner in tests.
#[async_trait]
pub trait CliRunner: Send + Sync {
    async fn run(&self, args: &[&str]) -> BridgeResult<CliOutput>;
}

/// Runner that spawns the real binary. Arguments go to the process verbatim;
/// there is no shell in between.
pub struct SystemRunner {
    binary: ResolvedBinary,
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(binary: ResolvedBinary) -> Self {
        Self {
            binary,
            timeout: INVOKE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl CliRunner for SystemRunner {
    async fn run(&self, args: &[&str]) -> BridgeResult<CliOutput> {
        // Idempotent and cheap, so done before every spawn rather than once.
        resolve::ensure_executable(self.binary.path());

        let mut cmd = Command::new(self.binary.path());
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(err)
                if err.kind() == std::io::ErrorKind::NotFound && self.binary.is_fallback() =>
            {
                return Err(BridgeError::CliNotFound);
            }
            Err(err) => return Err(BridgeError::Spawn { source: err }),
        };

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => return Err(BridgeError::Spawn { source: err }),
            // Dropping the timed-out future drops the child handle, and
            // kill_on_drop reaps the process with it.
            Err(_) => {
                return Err(BridgeError::Timeout {
                    limit: self.timeout,
                })
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(BridgeError::ExitFailure {
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(CliOutput { stdout, stderr })
    }
}
