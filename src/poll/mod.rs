//! Fixed-interval polling until a remote object reaches a terminal status.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

/// Result of a single status fetch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Observation {
    /// The object exists and reports this status label.
    Status(String),
    /// The object no longer exists.
    Gone,
}

impl Observation {
    /// Convenience constructor for [`Observation::Status`].
    #[must_use]
    pub fn status(label: impl Into<String>) -> Self {
        Self::Status(label.into())
    }
}

/// Classification of status labels and timing for one wait.
#[derive(Clone, Copy, Debug)]
pub struct WaitSpec<'a> {
    /// Labels that mean "still transitioning".
    pub pending: &'a [&'a str],
    /// Labels that end the wait, whether success or failure.
    pub target: &'a [&'a str],
    /// Label reported when the object disappears; `None` makes a
    /// disappearance an error.
    pub gone: Option<&'a str>,
    /// Fixed delay before each fetch.
    pub interval: Duration,
    /// Total wait budget.
    pub timeout: Duration,
}

/// Errors raised while waiting.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum PollError<E> {
    /// The budget ran out before a target status was observed.
    #[error(
        "timed out after {waited:?}; last status {}",
        .last_status.as_deref().unwrap_or("<none>")
    )]
    Timeout {
        /// Time spent waiting.
        waited: Duration,
        /// Last status observed, if any fetch completed.
        last_status: Option<String>,
    },
    /// The status fetch failed.
    #[error("status fetch failed: {0}")]
    Fetch(E),
    /// A status outside both the pending and target sets was observed.
    #[error("unexpected status '{0}'")]
    UnexpectedState(String),
    /// The object disappeared while no disappearance label was configured.
    #[error("object disappeared while waiting")]
    Vanished,
    /// The caller cancelled the wait.
    #[error("wait cancelled")]
    Cancelled,
}

/// Polls `refresh` every `spec.interval` until a target status is seen.
///
/// Each observed label is written to `last_status` before it is classified.
/// No fetch is started if its scheduled time would fall after the deadline.
///
/// # Errors
///
/// Returns [`PollError::Timeout`] when the budget is exhausted,
/// [`PollError::Fetch`] when `refresh` fails, [`PollError::UnexpectedState`]
/// for unknown labels, [`PollError::Vanished`] when the object disappears and
/// `spec.gone` is `None`, and [`PollError::Cancelled`] when `cancel` fires.
pub async fn wait_for_state<E, F, Fut>(
    spec: WaitSpec<'_>,
    cancel: &CancellationToken,
    last_status: &mut Option<String>,
    mut refresh: F,
) -> Result<String, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Observation, E>>,
{
    let started = Instant::now();
    let deadline = started + spec.timeout;
    let mut observed: Option<String> = None;

    while Instant::now() + spec.interval <= deadline {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(PollError::Cancelled),
            () = sleep(spec.interval) => {}
        }

        match refresh().await.map_err(PollError::Fetch)? {
            Observation::Gone => {
                let Some(label) = spec.gone else {
                    return Err(PollError::Vanished);
                };
                tracing::debug!(status = label, "object gone");
                *last_status = Some(label.to_owned());
                return Ok(label.to_owned());
            }
            Observation::Status(label) => {
                tracing::debug!(status = %label, "observed status");
                *last_status = Some(label.clone());
                observed = Some(label.clone());
                if spec.target.contains(&label.as_str()) {
                    return Ok(label);
                }
                if !spec.pending.contains(&label.as_str()) {
                    return Err(PollError::UnexpectedState(label));
                }
            }
        }
    }

    Err(PollError::Timeout {
        waited: started.elapsed(),
        last_status: observed,
    })
}

#[cfg(test)]
mod tests;
