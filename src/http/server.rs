//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with a single catch-all handler
//! - Wire up middleware (tracing, request timeout)
//! - Collect the body and hand the request to the dispatcher
//! - Run threaded routes, and everything under synchronized dispatch, on
//!   the blocking pool
//! - Translate unhandled dispatch errors into 404 / 500

use std::future::Future;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request as HttpRequest, StatusCode},
    response::{IntoResponse, Response as HttpResponse},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::TimeoutConfig;
use crate::dispatch::Dispatcher;
use crate::error::DispatchError;
use crate::http::request::Request;

/// Largest request body the server will collect.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// HTTP front end for a dispatcher.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(dispatcher: Dispatcher, timeouts: &TimeoutConfig) -> Self {
        Self {
            router: Self::build_router(dispatcher, timeouts),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(dispatcher: Dispatcher, timeouts: &TimeoutConfig) -> Router {
        Router::new()
            .route("/{*path}", any(dispatch_handler))
            .route("/", any(dispatch_handler))
            .with_state(dispatcher)
            .layer(TimeoutLayer::new(Duration::from_secs(timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
    }

    /// The assembled router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler. Every request goes through the dispatcher.
async fn dispatch_handler(
    State(dispatcher): State<Dispatcher>,
    request: HttpRequest<Body>,
) -> HttpResponse {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, path = %parts.uri.path(), "Request body rejected");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let request = match Request::from_parts(&parts, &body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, uri = %parts.uri, "Malformed request target");
            return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
        }
    };

    let outcome = if dispatcher.deferred(&request) {
        let worker = dispatcher.clone();
        match tokio::task::spawn_blocking(move || worker.call(request)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Threaded dispatch panicked");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
            }
        }
    } else {
        dispatcher.call(request)
    };

    match outcome {
        Ok(response) => response.into_response(),
        Err(DispatchError::NotFound(_)) => (StatusCode::NOT_FOUND, "Not Found").into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Unhandled dispatch error");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}
