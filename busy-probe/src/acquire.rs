use std::sync::Arc;

use super::BoxError;
use super::LoadMonitor;
use super::NullMonitor;

/// The load monitor is not installed or not available on this platform.
///
/// This is the only failure [`acquire`] recovers from.
#[derive(Debug, Clone, thiserror::Error)]
#[error("load monitor `{name}` not found")]
pub struct MonitorNotFound {
    name: String,
}

impl MonitorNotFound {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The name of the monitor that could not be found.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The outcome of a successful [`acquire`].
#[derive(Debug, Clone)]
pub struct Acquired {
    monitor: Arc<dyn LoadMonitor>,
    degraded: bool,
}

impl Acquired {
    /// The acquired monitor, or a [`NullMonitor`] when degraded.
    pub fn monitor(&self) -> &Arc<dyn LoadMonitor> {
        &self.monitor
    }

    pub fn into_monitor(self) -> Arc<dyn LoadMonitor> {
        self.monitor
    }

    /// `true` if the real monitor was not found and a [`NullMonitor`] stands in.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}

/// Attempts to obtain a load monitor from `loader`.
///
/// * If `loader` succeeds, its monitor is returned.
/// * If `loader` fails with [`MonitorNotFound`], a warning is logged and a
///   [`NullMonitor`] is returned in its place.
///
/// # Errors
///
/// Any other loader failure is returned unchanged, so callers see the same
/// error value the loader produced.
pub fn acquire<F>(loader: F) -> Result<Acquired, BoxError>
where
    F: FnOnce() -> Result<Arc<dyn LoadMonitor>, BoxError>,
{
    match loader() {
        Ok(monitor) => Ok(Acquired {
            monitor,
            degraded: false,
        }),
        Err(err) => {
            if let Some(not_found) = err.downcast_ref::<MonitorNotFound>() {
                tracing::warn!(
                    monitor = not_found.name(),
                    "load monitor is not installed; running without high load protection"
                );
                Ok(Acquired {
                    monitor: Arc::new(NullMonitor),
                    degraded: true,
                })
            } else {
                Err(err)
            }
        }
    }
}
