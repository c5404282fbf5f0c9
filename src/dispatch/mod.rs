//! Dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Transport request
//!     → Dispatcher::call (global lock if synchronized)
//!     → pipeline.rs (setup, resolve, before, action, after,
//!                    exception, always, finish)
//!     → Response or unhandled DispatchError
//!
//! Application:
//!     configure(closure) → fresh MappingTable → atomic swap
//!     debug mode re-runs the closure before every request
//! ```
//!
//! # Design Decisions
//! - Pipeline stages are plain functions over a borrowed `Context`
//! - Settings are hot-swappable; the mapping is swapped whole

pub mod application;
pub mod context;
pub mod pipeline;

pub use application::{Application, Configurator};
pub use context::Context;
pub use pipeline::Dispatcher;
