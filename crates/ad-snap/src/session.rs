use std::time::Duration;

use chain_client::AdRecord;
use serde::Serialize;
use tokio::time::Instant;

/// Result of a completion attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionOutcome {
    pub verified: bool,
    pub view_duration: Duration,
}

/// Observational snapshot of the session, shaped for the RPC surface.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub has_ad: bool,
    pub ad: Option<AdRecord>,
    pub view_started: bool,
    pub view_completed: bool,
    /// Elapsed viewing time in milliseconds; frozen once completed.
    pub view_duration: u64,
}

/// Display-and-verify lifecycle of at most one ad.
///
/// `Idle → Shown → Completed`, with `reset` returning to `Idle` from any
/// state. Starting a new view while one is in flight replaces it; the handler
/// serves one caller, so there is nothing to hand the old session over to.
#[derive(Debug, Default)]
pub struct ViewSession {
    state: State,
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Idle,
    Shown { ad: AdRecord, started_at: Instant },
    Completed { ad: AdRecord, duration: Duration },
}

impl ViewSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start showing `ad`, replacing any in-flight view.
    pub fn show(&mut self, ad: AdRecord) {
        self.state = State::Shown {
            ad,
            started_at: Instant::now(),
        };
    }

    /// Attempt to mark the view complete.
    ///
    /// Verification succeeds only in `Shown` with at least `min_duration`
    /// elapsed, and at most once per session: a completed session reports its
    /// frozen duration and does not re-verify.
    pub fn complete(&mut self, min_duration: Duration) -> CompletionOutcome {
        match &self.state {
            State::Idle => CompletionOutcome {
                verified: false,
                view_duration: Duration::ZERO,
            },
            State::Shown { ad, started_at } => {
                let elapsed = started_at.elapsed();
                if elapsed < min_duration {
                    return CompletionOutcome {
                        verified: false,
                        view_duration: elapsed,
                    };
                }
                let ad = ad.clone();
                self.state = State::Completed {
                    ad,
                    duration: elapsed,
                };
                CompletionOutcome {
                    verified: true,
                    view_duration: elapsed,
                }
            }
            State::Completed { duration, .. } => CompletionOutcome {
                verified: false,
                view_duration: *duration,
            },
        }
    }

    /// Clear the session unconditionally. Idempotent.
    pub fn reset(&mut self) {
        self.state = State::Idle;
    }

    pub fn ad(&self) -> Option<&AdRecord> {
        match &self.state {
            State::Idle => None,
            State::Shown { ad, .. } | State::Completed { ad, .. } => Some(ad),
        }
    }

    pub fn status(&self) -> SessionStatus {
        match &self.state {
            State::Idle => SessionStatus {
                has_ad: false,
                ad: None,
                view_started: false,
                view_completed: false,
                view_duration: 0,
            },
            State::Shown { ad, started_at } => SessionStatus {
                has_ad: true,
                ad: Some(ad.clone()),
                view_started: true,
                view_completed: false,
                view_duration: started_at.elapsed().as_millis() as u64,
            },
            State::Completed { ad, duration } => SessionStatus {
                has_ad: true,
                ad: Some(ad.clone()),
                view_started: true,
                view_completed: true,
                view_duration: duration.as_millis() as u64,
            },
        }
    }
}
