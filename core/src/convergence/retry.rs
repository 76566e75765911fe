//! Bounded-time polling of a predicate.
//!
//! `retry_until` drives a predicate that answers with a [`Poll`]: ready,
//! pending (retry after `interval`), or fatal (stop now). On timeout the
//! caller gets the last diagnostic the predicate produced, not a synthetic
//! one, so the most recent reason a wait failed is always visible.

use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{ConvergeError, Result};

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// Time budget and poll interval for one wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_wait: Duration,
    interval: Duration,
}

impl RetryPolicy {
    pub fn new(max_wait: Duration, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(ConvergeError::InvalidConfig(
                "retry interval must be greater than zero".into(),
            ));
        }
        Ok(RetryPolicy { max_wait, interval })
    }

    pub fn from_secs(max_wait_secs: u64, interval_secs: u64) -> Result<Self> {
        Self::new(
            Duration::from_secs(max_wait_secs),
            Duration::from_secs(interval_secs),
        )
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for RetryPolicy {
    /// 120s budget, 2s interval.
    fn default() -> Self {
        RetryPolicy {
            max_wait: Duration::from_secs(120),
            interval: Duration::from_secs(2),
        }
    }
}

// ---------------------------------------------------------------------------
// Poll
// ---------------------------------------------------------------------------

/// One predicate answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Poll {
    Ready(Value),
    /// Not yet; keep polling. Carries the diagnostic of this attempt.
    Pending(Value),
    /// Cannot resolve by waiting.
    Fatal { reason: String, detail: Value },
}

impl Poll {
    pub fn pending(msg: impl Into<String>) -> Self {
        Poll::Pending(Value::String(msg.into()))
    }

    pub fn fatal(reason: &str, detail: Value) -> Self {
        Poll::Fatal {
            reason: reason.to_string(),
            detail,
        }
    }
}

// ---------------------------------------------------------------------------
// RetryOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetryOutcome {
    pub ok: bool,
    pub attempts: u32,
    /// Fatal reason, the last string diagnostic, or `"timeout"`.
    pub error: Option<String>,
    pub detail: Value,
    /// Set when the loop stopped on a fatal signal rather than the budget.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub fatal: bool,
}

impl RetryOutcome {
    pub fn is_timeout(&self) -> bool {
        !self.ok && !self.fatal
    }

    pub fn error_text(&self) -> &str {
        self.error.as_deref().unwrap_or("unknown error")
    }
}

// ---------------------------------------------------------------------------
// retry_until
// ---------------------------------------------------------------------------

/// Poll `predicate` until it is ready, fatal, or `policy.max_wait` elapses.
/// Always runs at least one attempt.
pub fn retry_until<F>(policy: &RetryPolicy, mut predicate: F) -> RetryOutcome
where
    F: FnMut() -> Poll,
{
    let deadline = Instant::now() + policy.max_wait;
    let mut attempts: u32 = 0;
    let mut last_detail = Value::Null;

    loop {
        attempts += 1;
        match predicate() {
            Poll::Ready(detail) => {
                return RetryOutcome {
                    ok: true,
                    attempts,
                    error: None,
                    detail,
                    fatal: false,
                };
            }
            Poll::Fatal { reason, detail } => {
                debug!(attempts, reason = %reason, "poll stopped on fatal signal");
                let detail = if detail.is_null() { last_detail } else { detail };
                return RetryOutcome {
                    ok: false,
                    attempts,
                    error: Some(reason),
                    detail,
                    fatal: true,
                };
            }
            Poll::Pending(detail) => {
                debug!(attempts, detail = %detail, "poll pending");
                last_detail = detail;
            }
        }

        if Instant::now() >= deadline {
            let error = match &last_detail {
                Value::String(s) => s.clone(),
                _ => "timeout".to_string(),
            };
            return RetryOutcome {
                ok: false,
                attempts,
                error: Some(error),
                detail: last_detail,
                fatal: false,
            };
        }

        thread::sleep(policy.interval);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
