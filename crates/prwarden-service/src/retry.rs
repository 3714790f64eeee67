use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result};

/// The outcome of a single try of a retryable operation.
#[derive(Debug)]
pub enum Attempt<T> {
    /// The operation succeeded with a value; the sequence ends.
    Done(T),
    /// The operation failed in a way that is worth retrying, or explicitly
    /// asked for another try. Consumes one attempt from the budget either way.
    Retry(Error),
    /// The operation failed terminally; the error propagates immediately.
    Fatal(Error),
}

/// A bounded-attempt execution policy with a fixed delay between attempts.
///
/// The policy runs an operation up to `max_attempts` times. A [`Attempt::Retry`]
/// outcome on any attempt but the last suspends for `delay` and tries again;
/// on the last attempt the error propagates unmodified, exactly like a
/// [`Attempt::Fatal`] outcome would on any attempt. With `max_attempts <= 1`
/// no retries happen at all.
///
/// The inter-attempt delay is a cooperative suspension point (a tokio sleep),
/// never a busy wait, and only occurs *between* attempts.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    max_attempts: usize,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// The maximum number of tries before a retryable failure becomes fatal.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Runs `op` until it is done, fails terminally, or exhausts the budget.
    ///
    /// The operation receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Attempt<T>>,
    {
        let max_attempts = self.max_attempts.max(1);

        let mut number = 0;
        loop {
            if number > 0 {
                tokio::time::sleep(self.delay).await;
            }
            number += 1;

            match op(number).await {
                Attempt::Done(value) => return Ok(value),
                Attempt::Fatal(err) => return Err(err),
                Attempt::Retry(err) => {
                    if number >= max_attempts {
                        return Err(err);
                    }
                    tracing::debug!(attempt = number, error = %err, "retrying after failure");
                }
            }
        }
    }

    /// Runs a fallible operation, treating every error as retryable.
    ///
    /// This matches the default behavior of the GitHub fetch path, where even
    /// a 404 is only a transient signal.
    pub async fn run_all_retryable<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run(|_| {
            let fut = op();
            async move {
                match fut.await {
                    Ok(value) => Attempt::Done(value),
                    Err(err) => Attempt::Retry(err),
                }
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::time::Instant;

    use super::*;

    fn policy(max_attempts: usize) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_secs(1))
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicUsize::new(0);

        let res = policy(5)
            .run(|number| {
                let n = calls.fetch_add(1, Ordering::Relaxed) + 1;
                assert_eq!(number, n);
                async move {
                    if n < 3 {
                        Attempt::Retry(Error::NotReady)
                    } else {
                        Attempt::Done(n)
                    }
                }
            })
            .await;

        assert_eq!(res.unwrap(), 3);
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhaustion_propagates() {
        let calls = AtomicUsize::new(0);

        let res: Result<()> = policy(3)
            .run(|_| {
                calls.fetch_add(1, Ordering::Relaxed);
                async { Attempt::Retry(Error::NotReady) }
            })
            .await;

        assert!(matches!(res, Err(Error::NotReady)));
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forced_retry_on_final_attempt_propagates() {
        // A forced retry on the last permitted attempt must not be suppressed.
        let res: Result<()> = policy(2)
            .run(|number| async move {
                if number < 2 {
                    Attempt::Done(())
                } else {
                    unreachable!()
                }
            })
            .await;
        assert!(res.is_ok());

        let res: Result<()> = policy(2)
            .run(|_| async { Attempt::Retry(Error::NotReady) })
            .await;
        assert!(matches!(res, Err(Error::NotReady)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_retries_with_single_attempt_budget() {
        let calls = AtomicUsize::new(0);

        let res: Result<()> = policy(1)
            .run(|_| {
                calls.fetch_add(1, Ordering::Relaxed);
                async { Attempt::Retry(Error::NotReady) }
            })
            .await;

        assert!(res.is_err());
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_short_circuits() {
        let calls = AtomicUsize::new(0);

        let res: Result<()> = policy(5)
            .run(|_| {
                calls.fetch_add(1, Ordering::Relaxed);
                async { Attempt::Fatal(Error::Payload("pull_request")) }
            })
            .await;

        assert!(matches!(res, Err(Error::Payload(_))));
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_only_between_attempts() {
        let start = Instant::now();

        let res = policy(5)
            .run(|number| async move {
                if number < 3 {
                    Attempt::Retry(Error::NotReady)
                } else {
                    Attempt::Done(Instant::now())
                }
            })
            .await
            .unwrap();

        // Two failures means exactly two inter-attempt delays, and none
        // before the first attempt.
        assert_eq!(res.duration_since(start), Duration::from_secs(2));
    }
}
