//! Request routing and dispatch for web applications.
//!
//! An [`Application`](dispatch::Application) owns a set of resources and a
//! mapping table built by configuration code. The
//! [`Dispatcher`](dispatch::Dispatcher) runs each request through
//! before/action/after/exception/always stages; the
//! [`HttpServer`](http::HttpServer) puts it behind Axum.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod observability;
pub mod resource;
pub mod routing;

pub use config::AppConfig;
pub use dispatch::{Application, Context, Dispatcher};
pub use error::{DispatchError, ErrorKind};
pub use http::HttpServer;
pub use routing::{MappingTable, Route};
