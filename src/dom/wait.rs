use crate::errors::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Condition a wait polls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    Present,
    Visible,
    PresentAndVisible,
    Selected,
}

impl Condition {
    pub fn describe(self) -> &'static str {
        match self {
            Condition::Present => "present",
            Condition::Visible => "visible",
            Condition::PresentAndVisible => "present and visible",
            Condition::Selected => "selected",
        }
    }
}

/// Poll `check` every `interval` until it yields a value or `timeout` elapses.
///
/// The check always runs at least once, and a final time at the deadline. Wait failures
/// from the check (element gone mid-poll) count as "not yet"; other errors abort the wait.
pub async fn poll_for<T, F, Fut>(interval: Duration, timeout: Duration, mut check: F) -> Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        match check().await {
            Ok(Some(value)) => return Ok(Some(value)),
            Ok(None) => {}
            Err(err) if err.is_wait_failure() => {}
            Err(err) => return Err(err),
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        sleep(interval.min(deadline - now)).await;
    }
}

/// [`poll_for`] over a boolean condition; returns whether it was met.
pub async fn poll_until<F, Fut>(interval: Duration, timeout: Duration, mut check: F) -> Result<bool>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let met = poll_for(interval, timeout, || {
        let pending = check();
        async move { pending.await.map(|met| met.then_some(())) }
    })
    .await?;
    Ok(met.is_some())
}
