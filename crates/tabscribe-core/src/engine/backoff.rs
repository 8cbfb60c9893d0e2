use std::sync::Mutex;
use std::time::Duration;

/// Decides how long to wait after the `attempt`-th transient failure of a request.
///
/// Returning `None` means the retry budget is spent.
pub trait BackoffPolicy: Send + Sync {
    fn delay(&self, attempt: u32) -> Option<Duration>;
}

/// `attempt * step`, unbounded unless `max_attempts` is set.
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    pub step: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for LinearBackoff {
    fn default() -> Self {
        Self {
            step: Duration::from_secs(60),
            max_attempts: None,
        }
    }
}

impl BackoffPolicy for LinearBackoff {
    fn delay(&self, attempt: u32) -> Option<Duration> {
        if let Some(max) = self.max_attempts {
            if attempt >= max {
                return None;
            }
        }
        Some(self.step.saturating_mul(attempt))
    }
}

/// Retries immediately. Useful for tests and replay runs.
#[derive(Debug, Clone, Default)]
pub struct NoDelay {
    pub max_attempts: Option<u32>,
}

impl BackoffPolicy for NoDelay {
    fn delay(&self, attempt: u32) -> Option<Duration> {
        match self.max_attempts {
            Some(max) if attempt >= max => None,
            _ => Some(Duration::ZERO),
        }
    }
}

/// Wraps another policy, remembering every delay it was asked for but never sleeping.
#[derive(Debug, Default)]
pub struct RecordingBackoff<P> {
    inner: P,
    requested: Mutex<Vec<Duration>>,
}

impl<P: BackoffPolicy> RecordingBackoff<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn requested(&self) -> Vec<Duration> {
        self.requested.lock().unwrap().clone()
    }
}

impl<P: BackoffPolicy> BackoffPolicy for RecordingBackoff<P> {
    fn delay(&self, attempt: u32) -> Option<Duration> {
        let d = self.inner.delay(attempt)?;
        self.requested.lock().unwrap().push(d);
        Some(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_minutes_unbounded() {
        let b = LinearBackoff::default();
        assert_eq!(b.delay(1), Some(Duration::from_secs(60)));
        assert_eq!(b.delay(2), Some(Duration::from_secs(120)));
        assert_eq!(b.delay(500), Some(Duration::from_secs(30_000)));
    }

    #[test]
    fn cap_stops_retries() {
        let b = LinearBackoff {
            step: Duration::from_secs(1),
            max_attempts: Some(3),
        };
        assert!(b.delay(2).is_some());
        assert_eq!(b.delay(3), None);
    }

    #[test]
    fn recording_returns_zero() {
        let b = RecordingBackoff::new(LinearBackoff::default());
        assert_eq!(b.delay(1), Some(Duration::ZERO));
        assert_eq!(b.delay(2), Some(Duration::ZERO));
        assert_eq!(
            b.requested(),
            vec![Duration::from_secs(60), Duration::from_secs(120)]
        );
    }
}
