// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cancellable bounded polling for provider state transitions
//!
//! Every "wait until the resource reaches state X" in the console goes
//! through [`poll_until`].  The wait is bounded by a caller-supplied
//! budget, can treat not-found as success (for deletion-style waits), and
//! aborts cleanly when the caller's [`CancellationToken`] fires.

use crate::error::Error;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Budget and behavior of one bounded wait
#[derive(Clone, Debug)]
pub struct PollParams {
    pub max_wait: Duration,
    pub interval: Duration,
    /// When true, a check that observes the resource as gone counts as
    /// reaching the target (deletion-style waits).
    pub not_found_is_success: bool,
}

impl PollParams {
    pub fn new(max_wait: Duration, interval: Duration) -> PollParams {
        PollParams { max_wait, interval, not_found_is_success: false }
    }

    pub fn succeed_on_not_found(mut self) -> PollParams {
        self.not_found_is_success = true;
        self
    }
}

/// Outcome of a bounded wait
#[derive(Clone, Debug)]
pub struct PollResult<S> {
    /// The state that satisfied the target predicate, when one did.  `None`
    /// on success means the wait ended because the resource was gone and
    /// not-found counts as success.
    pub final_state: Option<S>,
    pub success: bool,
    pub timed_out: bool,
    pub cancelled: bool,
    /// Most recent state observed, whether or not it satisfied the target.
    pub last_observed: Option<S>,
}

impl<S> PollResult<S> {
    fn success(state: Option<S>) -> PollResult<S>
    where
        S: Clone,
    {
        PollResult {
            last_observed: state.clone(),
            final_state: state,
            success: true,
            timed_out: false,
            cancelled: false,
        }
    }

    fn unfinished(last: Option<S>, timed_out: bool) -> PollResult<S> {
        PollResult {
            final_state: None,
            success: false,
            timed_out,
            cancelled: !timed_out,
            last_observed: last,
        }
    }
}

impl<S: std::fmt::Display> PollResult<S> {
    /// Converts an unsuccessful result into the error callers should see.
    /// A timed-out wait means the operation was accepted but not confirmed
    /// (re-check later); a cancelled wait is reported as cancellation, not
    /// as a timeout.
    pub fn into_unfinished_error(self, operation: &str) -> Error {
        let last = match &self.last_observed {
            Some(s) => s.to_string(),
            None => String::from("unknown"),
        };
        if self.cancelled {
            return Error::unavail(&format!(
                "cancelled while waiting for {} (last observed state: {})",
                operation, last
            ));
        }
        Error::PollTimeout { operation: operation.to_owned(), last_observed: last }
    }
}

/// Repeatedly invokes `check` until `target` matches, the resource is gone
/// (when configured), the budget elapses, or `cancel` fires.
///
/// `check` returns `Ok(None)` to report the resource as not found; provider
/// errors propagate immediately and are not retried here.
pub async fn poll_until<S, F, Fut, P>(
    params: &PollParams,
    cancel: &CancellationToken,
    mut check: F,
    target: P,
) -> Result<PollResult<S>, Error>
where
    S: Clone,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<S>, Error>>,
    P: Fn(&S) -> bool,
{
    let deadline = Instant::now() + params.max_wait;
    let mut last: Option<S> = None;

    loop {
        if cancel.is_cancelled() {
            return Ok(PollResult::unfinished(last, false));
        }

        match check().await? {
            None if params.not_found_is_success => {
                return Ok(PollResult::success(None));
            }
            None => {}
            Some(state) => {
                if target(&state) {
                    return Ok(PollResult::success(Some(state)));
                }
                last = Some(state);
            }
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(PollResult::unfinished(last, true));
        }
        let sleep_for = params.interval.min(deadline - now);
        tokio::select! {
            _ = cancel.cancelled() => {
                return Ok(PollResult::unfinished(last, false));
            }
            _ = tokio::time::sleep(sleep_for) => {}
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::atomic::Ordering;

    fn quick() -> PollParams {
        PollParams::new(Duration::from_secs(10), Duration::from_millis(10))
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaches_target() {
        let calls = AtomicU32::new(0);
        let result = poll_until(
            &quick(),
            &CancellationToken::new(),
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    Ok(Some(if n < 3 { "ATTACHING" } else { "ATTACHED" }))
                }
            },
            |s| *s == "ATTACHED",
        )
        .await
        .unwrap();
        assert!(result.success);
        assert!(!result.timed_out);
        assert_eq!(result.final_state, Some("ATTACHED"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_with_last_observed() {
        let result = poll_until(
            &quick(),
            &CancellationToken::new(),
            || async { Ok(Some("DETACHING")) },
            |s| *s == "DETACHED",
        )
        .await
        .unwrap();
        assert!(!result.success);
        assert!(result.timed_out);
        assert!(!result.cancelled);
        assert_eq!(result.last_observed, Some("DETACHING"));

        let err = result.into_unfinished_error("vnic detach");
        match err {
            Error::PollTimeout { operation, last_observed } => {
                assert_eq!(operation, "vnic detach");
                assert_eq!(last_observed, "DETACHING");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_success() {
        let result = poll_until(
            &quick().succeed_on_not_found(),
            &CancellationToken::new(),
            || async { Ok(None::<&str>) },
            |_| false,
        )
        .await
        .unwrap();
        assert!(result.success);
        assert!(result.final_state.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = poll_until(
            &quick(),
            &cancel,
            || async { Ok(Some("STOPPING")) },
            |s| *s == "STOPPED",
        )
        .await
        .unwrap();
        assert!(!result.success);
        assert!(result.cancelled);
        assert!(!result.timed_out);

        // Cancellation is distinguishable from a timeout.
        let err = result.into_unfinished_error("instance stop");
        match err {
            Error::Unavailable { internal_message } => {
                assert!(internal_message.contains("cancelled"));
                assert!(internal_message.contains("instance stop"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_error_propagates() {
        let result: Result<PollResult<&str>, Error> = poll_until(
            &quick(),
            &CancellationToken::new(),
            || async { Err(Error::unavail("throttled")) },
            |_| true,
        )
        .await;
        assert!(matches!(result, Err(Error::Unavailable { .. })));
    }
}
