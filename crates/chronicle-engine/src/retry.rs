use std::future::Future;

use crate::error::{EngineError, EngineResult};
use crate::observer::{EngineObserver, Operation};

/// Anything an attempt can produce: tells the loop whether it failed.
pub trait AttemptReport {
    fn failure(&self) -> Option<&EngineError>;
}

impl<T> AttemptReport for EngineResult<T> {
    fn failure(&self) -> Option<&EngineError> {
        self.as_ref().err()
    }
}

/// Bounded, immediate retry of a whole operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    operation: Operation,
    max_attempts: u32,
}

/// The report of the last attempt run, plus how many ran.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Retried<R> {
    pub last: R,
    pub attempts: u32,
}

impl RetryPolicy {
    /// Fails with `Precondition` when `max_attempts` is zero.
    pub fn new(operation: Operation, max_attempts: u32) -> EngineResult<Self> {
        if max_attempts == 0 {
            return Err(EngineError::precondition("max_attempts must be at least 1"));
        }
        Ok(Self {
            operation,
            max_attempts,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `attempt` until it reports success or the budget is spent.
    ///
    /// Only the most recent report is kept; failures are never aggregated
    /// across attempts.
    pub async fn run<R, F, Fut>(&self, observer: &dyn EngineObserver, mut attempt: F) -> Retried<R>
    where
        R: AttemptReport,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = R>,
    {
        let mut number = 1;
        loop {
            observer.attempt_started(self.operation, number, self.max_attempts);
            let report = attempt(number).await;

            let failed = match report.failure() {
                Some(err) => {
                    observer.attempt_failed(self.operation, number, err);
                    true
                }
                None => {
                    observer.attempt_succeeded(self.operation, number);
                    false
                }
            };

            if !failed || number >= self.max_attempts {
                return Retried {
                    last: report,
                    attempts: number,
                };
            }
            number += 1;
        }
    }
}
