//! Per-request context handed to actions, filters and handlers.

use std::sync::Arc;

use axum::http::StatusCode;

use crate::error::{DispatchError, UNDEFINED_ACTION};
use crate::http::{Params, Request, Response};
use crate::resource::ResourceType;
use crate::routing::mapping::MappingTable;
use crate::routing::paths::Paths;

/// The request being dispatched, the response being built, and the resource
/// the request was bound to.
pub struct Context<'a> {
    request: &'a mut Request,
    response: &'a mut Response,
    resource: Arc<ResourceType>,
    mapping: &'a MappingTable,
}

impl<'a> Context<'a> {
    pub fn new(
        request: &'a mut Request,
        response: &'a mut Response,
        resource: Arc<ResourceType>,
        mapping: &'a MappingTable,
    ) -> Self {
        Self {
            request,
            response,
            resource,
            mapping,
        }
    }

    pub fn request(&self) -> &Request {
        &*self.request
    }

    pub fn request_mut(&mut self) -> &mut Request {
        &mut *self.request
    }

    pub fn response(&self) -> &Response {
        &*self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut *self.response
    }

    pub fn params(&self) -> &Params {
        self.request.params()
    }

    /// A scalar parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.request.params().get_str(name)
    }

    pub fn resource(&self) -> &Arc<ResourceType> {
        &self.resource
    }

    pub fn mapping(&self) -> &'a MappingTable {
        self.mapping
    }

    /// Path generators as seen from the bound resource.
    pub fn paths(&self) -> Paths<'a> {
        self.mapping.paths_for(self.resource.clone())
    }

    /// Run the action method `name` of the bound resource.
    pub fn invoke(&mut self, name: &str) -> Result<String, DispatchError> {
        let method = self
            .mapping
            .find_method(&self.resource, name)
            .ok_or_else(|| {
                DispatchError::failed(
                    &UNDEFINED_ACTION,
                    format!("resource `{}` has no action `{name}`", self.resource.name()),
                )
            })?;
        method(self)
    }

    /// A `302 Found` signal. Return it as an error to stop the current stage.
    pub fn redirect(&self, location: impl Into<String>) -> DispatchError {
        self.redirect_with(location, StatusCode::FOUND)
    }

    pub fn redirect_with(&self, location: impl Into<String>, status: StatusCode) -> DispatchError {
        DispatchError::Redirect {
            location: location.into(),
            status,
        }
    }

    /// Give up on the request as if nothing had matched.
    pub fn not_found(&self) -> DispatchError {
        DispatchError::NotFound(self.request.location())
    }
}
