//! Backoff and circuit breaking around Product Hunt requests.

use radar_core::{CoreError, ErrorExt};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Ceiling for computed delays and for honoured `Retry-After` waits.
    pub max_delay: Duration,
    pub backoff_factor: f64,
    /// Extra random delay as a fraction of the computed one (0.0 to 1.0).
    pub jitter: f64,
    /// Failed operations in a row before requests are refused.
    pub trip_after: u32,
    pub cool_down: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::producthunt()
    }
}

impl RetryPolicy {
    pub fn producthunt() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            backoff_factor: 2.0,
            jitter: 0.2,
            trip_after: 3,
            cool_down: Duration::from_secs(120),
        }
    }

    /// Delay before retry number `retry` (0-based), jitter included.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = self.backoff_factor.powi(retry.min(32) as i32);
        let raw = self.base_delay.as_secs_f64() * factor;
        let capped = Duration::from_secs_f64(raw.min(self.max_delay.as_secs_f64()));

        let spread = (capped.as_millis() as f64 * self.jitter.clamp(0.0, 1.0)) as u64;
        (capped + Duration::from_millis(fastrand::u64(0..=spread))).min(self.max_delay)
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Backoff,
    /// Wait exactly as long as the server asked.
    Wait(Duration),
    GiveUp,
}

/// Retry transient failures, honour explicit waits, give up on the rest.
/// Auth failures (401/403) are never transient.
pub fn classify(error: &CoreError) -> Verdict {
    match error.retry_after() {
        Some(wait) => Verdict::Wait(wait),
        None if error.is_retryable() => Verdict::Backoff,
        None => Verdict::GiveUp,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
enum Breaker {
    Closed { failures: u32 },
    Open { since: Instant },
    HalfOpen,
}

impl Breaker {
    fn admit(&mut self, cool_down: Duration) -> bool {
        match *self {
            Breaker::Closed { .. } | Breaker::HalfOpen => true,
            Breaker::Open { since } if since.elapsed() >= cool_down => {
                debug!("Circuit half-open, letting one request through");
                *self = Breaker::HalfOpen;
                true
            }
            Breaker::Open { .. } => false,
        }
    }

    fn succeeded(&mut self) {
        if matches!(self, Breaker::HalfOpen) {
            info!("Product Hunt reachable again, circuit closed");
        }
        *self = Breaker::Closed { failures: 0 };
    }

    fn failed(&mut self, trip_after: u32) {
        *self = match *self {
            Breaker::Closed { failures } if failures + 1 >= trip_after => {
                warn!("Circuit opened after {} failed operations", failures + 1);
                Breaker::Open {
                    since: Instant::now(),
                }
            }
            Breaker::Closed { failures } => Breaker::Closed {
                failures: failures + 1,
            },
            Breaker::HalfOpen | Breaker::Open { .. } => {
                warn!("Probe failed, circuit stays open");
                Breaker::Open {
                    since: Instant::now(),
                }
            }
        };
    }

    fn state(&self) -> BreakerState {
        match self {
            Breaker::Closed { .. } => BreakerState::Closed,
            Breaker::Open { .. } => BreakerState::Open,
            Breaker::HalfOpen => BreakerState::HalfOpen,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryStats {
    pub retries: u64,
    pub recovered: u64,
    pub gave_up: u64,
    pub refused: u64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs operations under a [`RetryPolicy`] with one shared breaker.
#[derive(Debug)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    breaker: Mutex<Breaker>,
    stats: Mutex<RetryStats>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            breaker: Mutex::new(Breaker::Closed { failures: 0 }),
            stats: Mutex::new(RetryStats::default()),
        }
    }

    /// Run `operation` until it succeeds or the policy gives up, returning
    /// the last error in that case.
    pub async fn execute<F, Fut, T>(&self, name: &str, operation: F) -> Result<T, CoreError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        if !lock(&self.breaker).admit(self.policy.cool_down) {
            lock(&self.stats).refused += 1;
            warn!("Circuit open, refusing {}", name);
            return Err(CoreError::Internal {
                message: format!("Circuit breaker is open, {} not attempted", name),
            });
        }

        let mut retry = 0;
        let last_error = loop {
            let error = match operation().await {
                Ok(value) => {
                    lock(&self.breaker).succeeded();
                    if retry > 0 {
                        let mut stats = lock(&self.stats);
                        stats.retries += u64::from(retry);
                        stats.recovered += 1;
                        info!("{} succeeded after {} retries", name, retry);
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if retry + 1 >= self.policy.max_attempts {
                break error;
            }
            let delay = match classify(&error) {
                Verdict::Backoff => self.policy.backoff(retry),
                Verdict::Wait(wait) if wait <= self.policy.max_delay => wait,
                Verdict::Wait(wait) => {
                    warn!("Not retrying {}: server asked to wait {:?}", name, wait);
                    break error;
                }
                Verdict::GiveUp => break error,
            };

            info!("Retrying {} in {:?}: {}", name, delay, error);
            sleep(delay).await;
            retry += 1;
        };

        lock(&self.breaker).failed(self.policy.trip_after);
        {
            let mut stats = lock(&self.stats);
            stats.retries += u64::from(retry);
            stats.gave_up += 1;
        }
        error!("{} failed after {} attempt(s): {}", name, retry + 1, last_error);
        Err(last_error)
    }

    pub fn stats(&self) -> RetryStats {
        lock(&self.stats).clone()
    }

    pub fn breaker_state(&self) -> BreakerState {
        lock(&self.breaker).state()
    }
}
