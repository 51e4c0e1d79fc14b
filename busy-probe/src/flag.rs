use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use super::LoadMonitor;

const UNSET: u64 = u64::MAX;

/// A monitor driven by an explicit overload flag.
///
/// Useful when overload is decided out of band (a supervisor, an admin
/// endpoint, a test) rather than measured in-process. All state lives in
/// atomics, so the flag can be flipped from any thread while requests are
/// being probed.
///
/// Once shut down, the monitor stops reporting overload.
#[derive(Debug)]
pub struct FlagMonitor {
    overloaded: AtomicBool,
    max_lag: AtomicU64,
    shut_down: AtomicBool,
}

impl Default for FlagMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

impl LoadMonitor for FlagMonitor {
    fn is_overloaded(&self) -> bool {
        !self.shut_down.load(Ordering::Acquire) && self.overloaded.load(Ordering::Acquire)
    }

    fn set_max_lag(&self, max_lag: Duration) {
        let nanos = u64::try_from(max_lag.as_nanos()).unwrap_or(UNSET - 1);
        self.max_lag.store(nanos, Ordering::Release);
    }

    fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);
    }
}

impl FlagMonitor {
    /// Creates a new `FlagMonitor`.
    ///
    /// # Arguments
    ///
    /// * `overloaded` - The initial overload state.
    pub fn new(overloaded: bool) -> Self {
        Self {
            overloaded: AtomicBool::new(overloaded),
            max_lag: AtomicU64::new(UNSET),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Flips the overload state; returns the previous one.
    pub fn set_overloaded(&self, overloaded: bool) -> bool {
        self.overloaded.swap(overloaded, Ordering::AcqRel)
    }

    /// The last threshold passed to [`LoadMonitor::set_max_lag`], if any.
    pub fn max_lag(&self) -> Option<Duration> {
        match self.max_lag.load(Ordering::Acquire) {
            UNSET => None,
            nanos => Some(Duration::from_nanos(nanos)),
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_reports_the_flag() {
        let monitor = FlagMonitor::default();
        assert!(!monitor.is_overloaded());

        assert!(!monitor.set_overloaded(true));
        assert!(monitor.is_overloaded());

        assert!(monitor.set_overloaded(false));
        assert!(!monitor.is_overloaded());
    }

    #[test]
    fn test_max_lag_is_recorded() {
        let monitor = FlagMonitor::default();
        assert_eq!(monitor.max_lag(), None);

        monitor.set_max_lag(Duration::from_millis(100));
        assert_eq!(monitor.max_lag(), Some(Duration::from_millis(100)));

        // Last writer wins
        monitor.set_max_lag(Duration::from_millis(10));
        assert_eq!(monitor.max_lag(), Some(Duration::from_millis(10)));
    }

    #[test]
    fn test_zero_max_lag_is_not_unset() {
        let monitor = FlagMonitor::default();
        monitor.set_max_lag(Duration::ZERO);

        assert_eq!(monitor.max_lag(), Some(Duration::ZERO));
    }

    #[test]
    fn test_shutdown_clears_overload() {
        let monitor = FlagMonitor::new(true);
        assert!(monitor.is_overloaded());

        monitor.shutdown();
        assert!(monitor.is_shut_down());
        assert!(!monitor.is_overloaded());

        // Shutting down twice is harmless
        monitor.shutdown();
        assert!(monitor.is_shut_down());
    }

    #[tokio::test]
    async fn test_flag_visible_across_tasks() {
        use std::sync::Arc;

        let monitor = Arc::new(FlagMonitor::default());

        let writer = Arc::clone(&monitor);
        tokio::spawn(async move { writer.set_overloaded(true) })
            .await
            .unwrap();

        let mut handles = vec![];
        for _ in 0..16 {
            let reader = Arc::clone(&monitor);
            handles.push(tokio::spawn(async move { reader.is_overloaded() }));
        }

        let results = futures::future::join_all(handles).await;
        assert!(results.into_iter().all(|r| matches!(r, Ok(true))));
    }
}
