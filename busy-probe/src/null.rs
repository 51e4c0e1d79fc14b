use std::time::Duration;

use super::LoadMonitor;

/// A monitor that never reports overload.
///
/// Stands in for a monitor that could not be found, so a host keeps serving
/// without protection instead of failing to start.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMonitor;

impl LoadMonitor for NullMonitor {
    fn is_overloaded(&self) -> bool {
        false
    }

    fn set_max_lag(&self, _max_lag: Duration) {}

    fn shutdown(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_is_never_overloaded() {
        let monitor = NullMonitor;
        monitor.set_max_lag(Duration::from_millis(1));

        assert!(!monitor.is_overloaded());
    }

    #[test]
    fn test_repeated_shutdown() {
        let monitor = NullMonitor;
        monitor.shutdown();
        monitor.shutdown();

        assert!(!monitor.is_overloaded());
    }
}
