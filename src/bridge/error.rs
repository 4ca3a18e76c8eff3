use std::time::Duration;

/// Errors produced by the bridge and its typed operations.
///
/// An unauthenticated session is deliberately not represented here: it is a
/// normal outcome of a successful `status` invocation and is handled by the
/// supervisors, not the bridge.
#[derive(Debug)]
pub enum BridgeError {
    /// The CLI could not be located: the bundled binary is missing and
    /// nothing named `costa` is reachable through PATH.
    CliNotFound,
    /// The invocation exceeded the wall-clock limit; the child was killed.
    Timeout { limit: Duration },
    /// The process ran but exited non-zero. `code` is absent when the
    /// process was terminated by a signal.
    ExitFailure { code: Option<i32>, stderr: String },
    /// Spawning the process failed for a reason other than a missing binary.
    Spawn { source: std::io::Error },
    /// Stdout did not parse as the JSON shape the operation expects.
    /// Indicates version skew between this crate and the installed CLI.
    MalformedResponse {
        operation: &'static str,
        source: serde_json::Error,
    },
}

impl std::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BridgeError::CliNotFound => {
                write!(
                    f,
                    "costa CLI not found; install it or point `binary` in the config at it"
                )
            }
            BridgeError::Timeout { limit } => {
                write!(f, "costa invocation timed out after {:?}", limit)
            }
            BridgeError::ExitFailure { code, stderr } => {
                match code {
                    Some(code) => write!(f, "costa exited with status {}", code)?,
                    None => write!(f, "costa was terminated by a signal")?,
                }
                if !stderr.is_empty() {
                    write!(f, ": {}", stderr)?;
                }
                Ok(())
            }
            BridgeError::Spawn { source } => {
                write!(f, "failed to launch costa: {}", source)
            }
            BridgeError::MalformedResponse { operation, source } => {
                write!(f, "costa {} returned malformed JSON: {}", operation, source)
            }
        }
    }
}

impl std::error::Error for BridgeError {}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
