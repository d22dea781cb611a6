//! Bounded polling for long-running upstream jobs
//!
//! Upstream runs are observed by re-fetching them until they leave a pending
//! state. The wait between fetches follows a configurable backoff (fixed when
//! `multiplier == 1.0`) and the whole loop is capped by an attempt count and a
//! wall-clock budget, whichever is hit first.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use backoff::{backoff::Backoff, ExponentialBackoff};

use crate::error::{Result, ServiceError};

/// Poll policy configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    /// Wait before the first re-fetch
    pub interval: Duration,

    /// Growth factor applied to the wait after every fetch (1.0 keeps it fixed)
    pub multiplier: f64,

    /// Upper bound for a single wait
    pub max_interval: Duration,

    /// Maximum number of re-fetches (None means unbounded)
    pub max_attempts: Option<u32>,

    /// Maximum total time to spend waiting (None means unbounded)
    pub max_elapsed: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1500),
            multiplier: 1.0,
            max_interval: Duration::from_secs(10),
            max_attempts: Some(200),
            max_elapsed: Some(Duration::from_secs(300)),
        }
    }
}

impl fmt::Display for PollConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PollConfig {{ interval: {:?}, multiplier: {}, max_interval: {:?}, max_attempts: {:?}, max_elapsed: {:?} }}",
            self.interval,
            self.multiplier,
            self.max_interval,
            self.max_attempts,
            self.max_elapsed
        )
    }
}

impl PollConfig {
    /// Fixed-interval policy with an attempt cap and no wall-clock budget
    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            multiplier: 1.0,
            max_interval: interval,
            max_attempts: Some(max_attempts),
            max_elapsed: None,
        }
    }

    /// Check the policy is usable
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(ServiceError::configuration("Poll interval must be greater than zero"));
        }

        if self.multiplier < 1.0 || !self.multiplier.is_finite() {
            return Err(ServiceError::configuration("Poll multiplier must be a finite value >= 1.0"));
        }

        if self.max_interval < self.interval {
            return Err(ServiceError::configuration("Poll max interval must not be below the interval"));
        }

        if self.max_attempts == Some(0) {
            return Err(ServiceError::configuration("Poll max attempts must be greater than zero"));
        }

        Ok(())
    }
}

/// Final value of a poll loop plus how much it cost to get there
#[derive(Debug, Clone)]
pub struct Polled<T> {
    /// First value observed outside the pending state
    pub value: T,

    /// Number of re-fetches performed (0 if the initial value was already final)
    pub attempts: u32,

    /// Time spent inside the loop
    pub elapsed: Duration,
}

/// Drives a fetch function until its result is no longer pending
#[derive(Debug, Clone)]
pub struct Poller {
    config: PollConfig,
}

impl Poller {
    /// Create a poller with the specified policy
    pub fn new(config: PollConfig) -> Self {
        Self { config }
    }

    /// Get the current poll configuration
    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    fn backoff(&self) -> ExponentialBackoff {
        let mut backoff = ExponentialBackoff {
            current_interval: self.config.interval,
            initial_interval: self.config.interval,
            max_interval: self.config.max_interval,
            multiplier: self.config.multiplier,
            randomization_factor: 0.0,
            max_elapsed_time: self.config.max_elapsed,
            ..ExponentialBackoff::default()
        };
        backoff.reset();
        backoff
    }

    /// Re-fetch with `fetch` while `is_pending` holds for the latest value.
    ///
    /// `initial` is the value already in hand; if it is not pending the loop
    /// returns it without sleeping or fetching. Fetch errors abort the loop
    /// immediately and are not retried.
    pub async fn poll_until<T, F, Fut, P>(&self, initial: T, mut fetch: F, is_pending: P) -> Result<Polled<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: Fn(&T) -> bool,
    {
        let started = Instant::now();
        let mut backoff = self.backoff();
        let mut value = initial;
        let mut attempts = 0u32;

        while is_pending(&value) {
            if let Some(max_attempts) = self.config.max_attempts {
                if attempts >= max_attempts {
                    return Err(ServiceError::PollTimeout { attempts, elapsed: started.elapsed() });
                }
            }

            let wait = match backoff.next_backoff() {
                Some(wait) => wait,
                None => {
                    return Err(ServiceError::PollTimeout { attempts, elapsed: started.elapsed() });
                }
            };

            log::trace!("Still pending, polling again in {:?} (attempt {})", wait, attempts + 1);
            tokio::time::sleep(wait).await;

            value = fetch().await?;
            attempts += 1;
        }

        Ok(Polled {
            value,
            attempts,
            elapsed: started.elapsed(),
        })
    }
}
