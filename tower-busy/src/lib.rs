//! # Tower Busy
//!
//! `tower-busy` is an admission-control middleware for the
//! [Tower](https://github.com/tower-rs/tower) ecosystem. It sheds HTTP requests
//! with `503 Service Unavailable` while a [`LoadMonitor`] reports the process
//! as overloaded, and passes everything else through untouched.
//!
//! ## The Gate
//!
//! On every request the [`TooBusyLayer`] asks its monitor one question:
//!
//! 1. **Overloaded**: The optional [`OverloadHandler`] runs first and may send
//!    its own [`Reply`]. If it does not, the gate sends the configured status
//!    and [`Message`]. The inner service is never called.
//! 2. **Not overloaded**: The request goes to the inner service unchanged.
//!
//! If the monitor cannot be found at startup, [`TooBusyLayer::from_loader`]
//! builds a degraded gate which admits everything, so a missing monitor never
//! stops the host from starting.
//!
//! ## Feature Flags
//!
//! - `axum`: Enables `IntoResponse` for [`Reply`].

mod config;
mod error;
mod handler;
mod layer;
mod reply;
mod service;
mod utils;


#[cfg(doc)]
use busy_probe::LoadMonitor;

pub use config::Message;
pub use config::TooBusyConfig;
pub use error::ConfigError;
pub use handler::OverloadHandler;
pub use layer::ShutdownGuard;
pub use layer::TooBusyLayer;
pub use reply::Reply;
pub use service::ResponseFuture;
pub use service::TooBusyService;
pub use utils::ServiceBuilderExt;
