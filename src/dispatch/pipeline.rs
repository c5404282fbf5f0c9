//! The request pipeline.
//!
//! # Stages
//! ```text
//! SETUP      reload (debug), default content type
//! RESOLVE    mapping lookup, params merged into the request
//! BEFORE     applicable before filters, in order
//! ACTION     action body written to the response
//! AFTER      applicable after filters (skipped on redirect)
//! EXCEPTION  first handler whose kind covers the error
//! ALWAYS     applicable always filters, failures swallowed
//! FINISH     log + metrics
//! ```
//!
//! # Design Decisions
//! - Redirects are signals, not failures: recorded on the response and never
//!   routed through the handler table
//! - An ACTION error wins over an AFTER error; the latter is logged
//! - Unhandled errors propagate to the transport

use std::sync::Arc;
use std::time::Instant;

use crate::dispatch::application::Application;
use crate::dispatch::context::Context;
use crate::error::DispatchError;
use crate::http::{Request, Response};
use crate::observability::metrics;
use crate::routing::action::Action;
use crate::routing::mapping::MappingTable;

/// Runs requests through an application's mapping.
#[derive(Clone)]
pub struct Dispatcher {
    app: Arc<Application>,
}

impl Dispatcher {
    pub fn new(app: Arc<Application>) -> Self {
        Self { app }
    }

    pub fn application(&self) -> &Arc<Application> {
        &self.app
    }

    /// Whether the transport should run `request` off its serving thread.
    /// Synchronized dispatch blocks on the global lock, so every request is
    /// deferred while it is on.
    pub fn deferred(&self, request: &Request) -> bool {
        self.app.settings().synchronize || self.app.mapping().threaded(request)
    }

    /// Dispatch one request. Errors no handler took care of are returned.
    pub fn call(&self, request: Request) -> Result<Response, DispatchError> {
        if self.app.settings().synchronize {
            let _guard = self.app.serialize();
            self.process(request)
        } else {
            self.process(request)
        }
    }

    fn process(&self, mut request: Request) -> Result<Response, DispatchError> {
        let started = Instant::now();
        let settings = self.app.settings();

        if settings.debug {
            if let Err(e) = self.app.reload() {
                tracing::error!(error = %e, "Mapping reload failed, keeping current mapping");
            }
        }
        let mapping = self.app.mapping();

        let mut response = Response::new();
        response.set_content_type(settings.content_type_for(request.path()));

        let (action, resource) = match mapping.resolve(&request) {
            Ok(binding) => {
                let (action, params, resource) = binding.into_parts();
                request.params_mut().merge(params);
                (Ok(action), resource)
            }
            Err(not_found) => (Err(not_found), mapping.resources().default_resource()),
        };

        let method = request.method().clone();
        let location = request.location();
        tracing::debug!(
            method = %method,
            url = %location,
            resource = %resource.name(),
            matched = action.is_ok(),
            "Dispatching request"
        );

        let outcome = {
            let mut ctx = Context::new(&mut request, &mut response, resource, &mapping);
            let outcome = match action.and_then(|action| run_action(&mapping, &action, &mut ctx)) {
                Ok(()) => Ok(()),
                Err(DispatchError::Redirect { location, status }) => {
                    ctx.response_mut().redirect(&location, status);
                    Ok(())
                }
                Err(err) => handle_exception(&mapping, err, &mut ctx),
            };
            run_always(&mapping, &mut ctx);
            outcome
        };

        let elapsed = started.elapsed();
        match &outcome {
            Ok(()) => {
                tracing::info!(
                    method = %method,
                    url = %location,
                    status = response.status().as_u16(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Request dispatched"
                );
                metrics::record_request(method.as_str(), response.status().as_u16(), elapsed);
            }
            Err(err) => {
                tracing::warn!(
                    method = %method,
                    url = %location,
                    error = %err,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Request failed without a handler"
                );
                metrics::record_unhandled(err.kind().map(|k| k.name()).unwrap_or("redirect"));
            }
        }

        outcome.map(|()| response.finish())
    }
}

/// BEFORE, ACTION and AFTER.
fn run_action(
    mapping: &MappingTable,
    action: &Action,
    ctx: &mut Context<'_>,
) -> Result<(), DispatchError> {
    for filter in mapping.before_filters() {
        if filter.applies_to(ctx.request()) {
            filter.call(ctx)?;
        }
    }

    let result = match action.call(ctx) {
        Ok(body) => {
            ctx.response_mut().write(body);
            Ok(())
        }
        Err(redirect @ DispatchError::Redirect { .. }) => return Err(redirect),
        Err(err) => Err(err),
    };

    match (result, run_after(mapping, ctx)) {
        (Err(err), Err(after_err)) => {
            tracing::warn!(error = %after_err, "After filter failed while handling an action error");
            Err(err)
        }
        (result, after) => result.and(after),
    }
}

fn run_after(mapping: &MappingTable, ctx: &mut Context<'_>) -> Result<(), DispatchError> {
    for filter in mapping.after_filters() {
        if filter.applies_to(ctx.request()) {
            filter.call(ctx)?;
        }
    }
    Ok(())
}

fn handle_exception(
    mapping: &MappingTable,
    err: DispatchError,
    ctx: &mut Context<'_>,
) -> Result<(), DispatchError> {
    let Some(handler) = err.kind().and_then(|kind| mapping.handler_for(kind)) else {
        return Err(err);
    };
    tracing::debug!(error = %err, handler = %handler.kind(), "Handling error");

    match handler.call(ctx, &err) {
        Ok(()) => Ok(()),
        Err(DispatchError::Redirect { location, status }) => {
            ctx.response_mut().redirect(&location, status);
            Ok(())
        }
        Err(handler_err) => {
            tracing::warn!(error = %err, handler_error = %handler_err, "Error handler failed");
            Err(handler_err)
        }
    }
}

fn run_always(mapping: &MappingTable, ctx: &mut Context<'_>) {
    for filter in mapping.always_filters() {
        if !filter.applies_to(ctx.request()) {
            continue;
        }
        if let Err(e) = filter.call(ctx) {
            tracing::warn!(error = %e, "Always filter failed");
            metrics::record_swallowed("always");
        }
    }
}
