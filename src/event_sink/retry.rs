//! Bounded retry for delivery attempts.
//!
//! Retries are counted, not timed: an operation gets one initial attempt plus
//! at most `max_retries` more, and only errors the caller classifies as
//! retryable consume the budget. A recovery step (e.g. reconnecting) runs
//! between attempts.

/// How many times a retryable failure may be retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 2 }
    }
}

/// Final failure of a retried operation
#[derive(Debug)]
pub struct RetryFailure<E> {
    /// Error of the last attempt
    pub error: E,
    /// Attempts made, including the first
    pub attempts: u32,
    /// The last error was retryable but the budget ran out
    pub exhausted: bool,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Total number of attempts the policy allows
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Runs `op` against `state` until it succeeds, fails with a
    /// non-retryable error, or the retry budget is spent.
    ///
    /// `recover` is called with the failed attempt's error before each retry.
    pub fn run<S, T, E, Op, Retryable, Recover>(
        &self,
        state: &mut S,
        mut op: Op,
        is_retryable: Retryable,
        mut recover: Recover,
    ) -> Result<T, RetryFailure<E>>
    where
        S: ?Sized,
        Op: FnMut(&mut S) -> Result<T, E>,
        Retryable: Fn(&E) -> bool,
        Recover: FnMut(&mut S, &E, u32),
    {
        let mut retries = 0;
        loop {
            match op(state) {
                Ok(value) => return Ok(value),
                Err(error) => {
                    let retryable = is_retryable(&error);
                    if retryable && retries < self.max_retries {
                        retries += 1;
                        recover(state, &error, retries);
                        continue;
                    }
                    return Err(RetryFailure {
                        error,
                        attempts: retries + 1,
                        exhausted: retryable,
                    });
                }
            }
        }
    }
}
