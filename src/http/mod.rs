//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, body collection)
//!     → request.rs (absolute URL, query + form params)
//!     → [dispatcher runs the pipeline]
//!     → response.rs (status, headers, body, redirect)
//!     → Send to client
//! ```

pub mod params;
pub mod request;
pub mod response;
pub mod server;

pub use params::{ParamValue, Params};
pub use request::{Request, RequestError};
pub use response::Response;
pub use server::HttpServer;
