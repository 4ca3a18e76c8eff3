//! Typed replies of the costa CLI's JSON surface.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Login window used when the CLI does not report one.
pub const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 600;

/// Marker reported for the context length until the CLI grows a field for it.
pub const CONTEXT_LENGTH_PLACEHOLDER: &str = "n/a";

/// A quota field that is either a numeric value or a provider-issued sentinel
/// such as "unlimited". The sentinel must round-trip untouched; it is never
/// coerced to a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quota {
    Count(f64),
    Marker(String),
}

impl Quota {
    pub fn zero() -> Self {
        Quota::Count(0.0)
    }
}

impl std::fmt::Display for Quota {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Quota::Count(n) if n.fract() == 0.0 => write!(f, "{}", *n as i64),
            Quota::Count(n) => write!(f, "{}", n),
            Quota::Marker(s) => f.write_str(s),
        }
    }
}

/// State of a login attempt as reported by `costa login`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginStatus {
    WaitingForUser,
    Ready,
    Error,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginReply {
    pub status: LoginStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub auth_url: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl LoginReply {
    /// Window the login completion watch is allowed to run for.
    pub fn poll_window(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(DEFAULT_LOGIN_TIMEOUT_SECS))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusReply {
    pub logged_in: bool,
    #[serde(default)]
    pub points: Option<Quota>,
    #[serde(default)]
    pub total_points: Option<Quota>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenReply {
    #[serde(default)]
    pub access_token: Option<String>,
    /// Expiry as Unix epoch seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// A point-in-time usage reading derived from one authenticated status check.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageSnapshot {
    pub points: Quota,
    pub total_points: Quota,
    pub context_length: Quota,
}

impl UsageSnapshot {
    /// Builds a snapshot from an authenticated status reply.
    ///
    /// Returns `None` when the reply carries no usage fields at all, so a
    /// fully-empty result never turns into an event.
    pub fn from_status(reply: &StatusReply) -> Option<Self> {
        if reply.points.is_none() && reply.total_points.is_none() {
            return None;
        }
        Some(Self {
            points: reply.points.clone().unwrap_or_else(Quota::zero),
            total_points: reply.total_points.clone().unwrap_or_else(Quota::zero),
            context_length: Quota::Marker(CONTEXT_LENGTH_PLACEHOLDER.to_string()),
        })
    }
}
