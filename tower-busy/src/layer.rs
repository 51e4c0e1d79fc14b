use std::fmt;
use std::sync::Arc;

use busy_probe::BoxError;
use busy_probe::LoadMonitor;
use busy_probe::acquire;
use tower::Layer;

use crate::config::TooBusyConfig;
use crate::handler::OverloadHandler;
use crate::service::TooBusyService;

/// Sheds requests while the load monitor reports overload.
///
/// The layer holds a shared reference to a [`LoadMonitor`]. Every service it
/// produces, and every clone of those services, asks that same monitor on
/// each request. Nothing else is shared or mutated per request.
#[derive(Clone)]
pub struct TooBusyLayer {
    monitor: Arc<dyn LoadMonitor>,
    handler: Option<Arc<dyn OverloadHandler>>,
    config: Arc<TooBusyConfig>,
    degraded: bool,
}

impl fmt::Debug for TooBusyLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TooBusyLayer")
            .field("monitor", &self.monitor)
            .field("handler", &self.handler.is_some())
            .field("config", &self.config)
            .field("degraded", &self.degraded)
            .finish()
    }
}

impl TooBusyLayer {
    /// Create a TooBusyLayer
    ///
    /// If the configuration carries a max lag it is forwarded to the monitor
    /// here, exactly once. The monitor's threshold is process-wide, so this
    /// also retunes every other gate sharing the monitor.
    pub fn new(monitor: Arc<dyn LoadMonitor>, config: TooBusyConfig) -> Self {
        if let Some(max_lag) = config.max_lag() {
            monitor.set_max_lag(max_lag);
        }
        Self {
            monitor,
            handler: None,
            config: Arc::new(config),
            degraded: false,
        }
    }

    /// Create a TooBusyLayer which runs `handler` before responding to a shed request.
    pub fn with_handler<H>(monitor: Arc<dyn LoadMonitor>, handler: H, config: TooBusyConfig) -> Self
    where
        H: OverloadHandler,
    {
        Self::new(monitor, config).handler(handler)
    }

    /// Create a TooBusyLayer from a monitor loader.
    ///
    /// If the loader reports the monitor as not found, the layer is built in
    /// degraded mode: it admits every request without consulting any monitor,
    /// whatever the configuration says.
    ///
    /// # Errors
    ///
    /// Any other loader failure is returned unchanged.
    pub fn from_loader<F>(loader: F, config: TooBusyConfig) -> Result<Self, BoxError>
    where
        F: FnOnce() -> Result<Arc<dyn LoadMonitor>, BoxError>,
    {
        let acquired = acquire(loader)?;
        if acquired.is_degraded() {
            Ok(Self {
                monitor: acquired.into_monitor(),
                handler: None,
                config: Arc::new(config),
                degraded: true,
            })
        } else {
            Ok(Self::new(acquired.into_monitor(), config))
        }
    }

    /// Set the handler run before responding to a shed request.
    pub fn handler<H>(mut self, handler: H) -> Self
    where
        H: OverloadHandler,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// `true` if the monitor was not found and this layer admits everything.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn config(&self) -> &TooBusyConfig {
        &self.config
    }

    /// Release the monitor's background resources.
    ///
    /// Call once, at process shutdown. The monitor is shared, so this stops
    /// it for every gate holding it. Does nothing in degraded mode.
    pub fn shutdown(&self) {
        if self.degraded {
            return;
        }
        tracing::info!(monitor = ?self.monitor, "shutting down load monitor");
        self.monitor.shutdown();
    }

    /// Returns a guard which calls [`shutdown`](Self::shutdown) when dropped.
    pub fn shutdown_guard(&self) -> ShutdownGuard {
        ShutdownGuard {
            layer: self.clone(),
        }
    }
}

impl<S> Layer<S> for TooBusyLayer {
    type Service = TooBusyService<S>;

    fn layer(&self, service: S) -> Self::Service {
        TooBusyService::new(
            service,
            self.monitor.clone(),
            self.handler.clone(),
            self.config.clone(),
            self.degraded,
        )
    }
}

/// Shuts the load monitor down when dropped.
///
/// Hold it for the lifetime of the server, e.g. in `main`.
#[derive(Debug)]
#[must_use = "the monitor is shut down as soon as the guard is dropped"]
pub struct ShutdownGuard {
    layer: TooBusyLayer,
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        self.layer.shutdown();
    }
}
