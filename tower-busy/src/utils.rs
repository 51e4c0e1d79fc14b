use std::sync::Arc;

use busy_probe::LoadMonitor;
use tower::ServiceBuilder;
use tower::layer::util::Stack;

use crate::TooBusyConfig;
use crate::TooBusyLayer;

/// Service Builder Extension with additional useful functions for tower::ServiceBuilder.
pub trait ServiceBuilderExt<L> {
    /// Add a load shedding gate backed by `monitor`
    fn too_busy(
        self,
        monitor: Arc<dyn LoadMonitor>,
        config: TooBusyConfig,
    ) -> ServiceBuilder<Stack<TooBusyLayer, L>>;
}

impl<L> ServiceBuilderExt<L> for ServiceBuilder<L> {
    fn too_busy(
        self,
        monitor: Arc<dyn LoadMonitor>,
        config: TooBusyConfig,
    ) -> ServiceBuilder<Stack<TooBusyLayer, L>> {
        self.layer(TooBusyLayer::new(monitor, config))
    }
}
