//! Scripted runner used by bridge and supervisor tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::error::{BridgeError, BridgeResult};
use super::runner::{CliOutput, CliRunner, INVOKE_TIMEOUT};

/// One scripted outcome for a CLI invocation.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Stdout(String),
    Timeout,
    ExitFailure { code: i32, stderr: String },
    NotFound,
    /// Waits on the (virtual) clock before producing the inner reply.
    Delayed(Duration, Box<Reply>),
}

impl Reply {
    pub(crate) fn json(body: &str) -> Self {
        Reply::Stdout(body.to_string())
    }

    fn into_result(self) -> BridgeResult<CliOutput> {
        match self {
            Reply::Stdout(stdout) => Ok(CliOutput {
                stdout,
                stderr: String::new(),
            }),
            Reply::Timeout => Err(BridgeError::Timeout {
                limit: INVOKE_TIMEOUT,
            }),
            Reply::ExitFailure { code, stderr } => Err(BridgeError::ExitFailure {
                code: Some(code),
                stderr,
            }),
            Reply::NotFound => Err(BridgeError::CliNotFound),
            Reply::Delayed(_, inner) => inner.into_result(),
        }
    }
}

/// `CliRunner` that replays a queue of replies and records every call.
///
/// When the queue drains, the fallback reply (if set) answers every further
/// call; otherwise the test has under-scripted and we panic.
#[derive(Default)]
pub(crate) struct ScriptedRunner {
    script: Mutex<VecDeque<Reply>>,
    fallback: Mutex<Option<Reply>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedRunner {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn enqueue(&self, reply: Reply) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    pub(crate) fn set_fallback(&self, reply: Reply) {
        *self.fallback.lock().unwrap_or_else(PoisonError::into_inner) = Some(reply);
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub(crate) fn calls(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl CliRunner for ScriptedRunner {
    async fn run(&self, args: &[&str]) -> BridgeResult<CliOutput> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(args.iter().map(|a| a.to_string()).collect());

        let mut reply = {
            let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
            match script.pop_front() {
                Some(reply) => reply,
                None => self
                    .fallback
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone()
                    .unwrap_or_else(|| panic!("scripted runner exhausted on {:?}", args)),
            }
        };

        while let Reply::Delayed(delay, inner) = reply {
            tokio::time::sleep(delay).await;
            reply = *inner;
        }

        reply.into_result()
    }
}
