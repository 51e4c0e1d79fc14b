//! # busy-probe
//!
//! `busy-probe` describes the load monitor a server consults before admitting a request.
//!
//! ## Core Philosophy
//!
//! Measuring lag is somebody else's job. A native event-loop probe, a runtime
//! metrics sampler or an orchestrator signal can all answer the one question a
//! gate asks: "is the process too busy right now?". This crate only fixes the
//! shape of that answer and how a monitor is acquired.
//!
//! ## Key Concepts
//!
//! * **LoadMonitor Trait**: A unified interface: an overload probe, a tuning entry
//!   point and a shutdown hook.
//! * **Capability Probe**: [`acquire`] tries to obtain a monitor. A [`MonitorNotFound`]
//!   failure degrades to the [`NullMonitor`]; anything else is fatal.
//! * **Process-wide Tuning**: [`LoadMonitor::set_max_lag`] changes the threshold for
//!   every holder of the monitor, not just the caller.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use busy_probe::FlagMonitor;
//! use busy_probe::LoadMonitor;
//!
//! let monitor = Arc::new(FlagMonitor::default());
//! monitor.set_max_lag(Duration::from_millis(70));
//!
//! if !monitor.is_overloaded() {
//!     // Request admitted
//! }
//! ```

use std::fmt::Debug;
use std::time::Duration;

mod acquire;
mod flag;
mod null;

pub use acquire::Acquired;
pub use acquire::MonitorNotFound;
pub use acquire::acquire;
pub use flag::FlagMonitor;
pub use null::NullMonitor;

/// A type-erased error, identical to `tower::BoxError`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The interface every load monitor exposes to an admission gate.
///
/// Monitors must be `Send` and `Sync` so a single instance can be shared
/// across every gate in the process via `Arc`.
pub trait LoadMonitor: Debug + Send + Sync {
    /// Reports whether the process is currently overloaded.
    ///
    /// Called once per request, so it must be cheap and must not block.
    fn is_overloaded(&self) -> bool;

    /// Sets the maximum lag tolerated before the process counts as overloaded.
    ///
    /// The threshold is process-wide: every gate holding this monitor observes
    /// the change, and the last caller wins.
    fn set_max_lag(&self, max_lag: Duration);

    /// Releases background resources such as timers or sampling threads.
    ///
    /// Must be safe to call on a monitor that was never tuned. Implementations
    /// are not required to guard against repeated calls.
    fn shutdown(&self);
}
