//! Route table entries and match results.
//!
//! # Responsibilities
//! - Describe a route to register (`Route` builder)
//! - Hold a compiled route (`Action`): template, constraints, descriptors, target
//! - Bind a request to an action (`Binding`), resolving the target resource
//!
//! # Design Decisions
//! - Constraints are checked before the template
//! - A named action always dispatches through the resource's method lookup,
//!   so a body given with a name is callable by that name elsewhere
//! - Resource precedence: explicit, then `{resource}` capture, then default

use std::fmt;
use std::sync::Arc;

use axum::http::Method;

use crate::dispatch::context::Context;
use crate::error::DispatchError;
use crate::http::{Params, Request};
use crate::resource::{ActionFn, ResourceRegistry, ResourceType};
use crate::routing::constraint::{Constraint, ConstraintSet, MethodConstraint};
use crate::routing::pattern::{PatternTemplate, Shape};

/// A route declaration, compiled by `MappingTable::register`.
pub struct Route {
    pub(crate) name: Option<String>,
    pub(crate) template: String,
    pub(crate) shape: Shape,
    pub(crate) matchers: Vec<(String, String)>,
    pub(crate) constraints: ConstraintSet,
    pub(crate) resource: Option<String>,
    pub(crate) threaded: bool,
    pub(crate) body: Option<Arc<ActionFn>>,
}

impl Route {
    /// A route on a path template such as `/param/{value}`.
    pub fn path(template: impl Into<String>) -> Self {
        Self::with_shape(template.into(), Shape::Path)
    }

    /// A route on a full-URL template such as `http://localhost:{port}/port`.
    pub fn url(template: impl Into<String>) -> Self {
        Self::with_shape(template.into(), Shape::Url)
    }

    pub fn get(template: impl Into<String>) -> Self {
        Self::path(template).method(Method::GET)
    }

    pub fn post(template: impl Into<String>) -> Self {
        Self::path(template).method(Method::POST)
    }

    pub fn put(template: impl Into<String>) -> Self {
        Self::path(template).method(Method::PUT)
    }

    pub fn delete(template: impl Into<String>) -> Self {
        Self::path(template).method(Method::DELETE)
    }

    fn with_shape(template: String, shape: Shape) -> Self {
        Self {
            name: None,
            template,
            shape,
            matchers: Vec::new(),
            constraints: ConstraintSet::new(),
            resource: None,
            threaded: false,
            body: None,
        }
    }

    pub fn method(self, method: Method) -> Self {
        self.when(MethodConstraint::new(method))
    }

    pub fn when(mut self, constraint: impl Constraint + 'static) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Only capture `placeholder` when `regex` matches it.
    pub fn matching(mut self, placeholder: impl Into<String>, regex: impl Into<String>) -> Self {
        self.matchers.push((placeholder.into(), regex.into()));
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Advise the transport to run this route off the serving thread.
    pub fn threaded(mut self) -> Self {
        self.threaded = true;
        self
    }

    pub fn to<F>(mut self, body: F) -> Self
    where
        F: Fn(&mut Context<'_>) -> Result<String, DispatchError> + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(body));
        self
    }
}

/// What an action runs.
#[derive(Clone)]
pub enum ActionTarget {
    /// Named action method on the resource.
    Method(String),
    /// Inline body, evaluated against the resource context.
    Inline(Arc<ActionFn>),
}

impl fmt::Debug for ActionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionTarget::Method(name) => f.debug_tuple("Method").field(name).finish(),
            ActionTarget::Inline(_) => f.write_str("Inline"),
        }
    }
}

/// A compiled route.
#[derive(Debug)]
pub struct Action {
    name: Option<String>,
    pattern: Arc<PatternTemplate>,
    constraints: ConstraintSet,
    threaded: bool,
    resource: Option<Arc<ResourceType>>,
    target: ActionTarget,
}

impl Action {
    pub(crate) fn new(
        name: Option<String>,
        pattern: Arc<PatternTemplate>,
        constraints: ConstraintSet,
        threaded: bool,
        resource: Option<Arc<ResourceType>>,
        target: ActionTarget,
    ) -> Self {
        Self {
            name,
            pattern,
            constraints,
            threaded,
            resource,
            target,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn pattern(&self) -> &PatternTemplate {
        &self.pattern
    }

    pub fn is_threaded(&self) -> bool {
        self.threaded
    }

    /// The explicitly configured resource, if any.
    pub fn resource(&self) -> Option<&Arc<ResourceType>> {
        self.resource.as_ref()
    }

    pub fn target(&self) -> &ActionTarget {
        &self.target
    }

    /// Bind `req` to `action` if its constraints and template both accept it.
    pub fn bind(
        action: &Arc<Action>,
        req: &Request,
        resources: &ResourceRegistry,
    ) -> Option<Binding> {
        if !action.constraints.satisfied_by(req) {
            return None;
        }
        let captures = action.pattern.matches(req, resources)?;
        let resource = action
            .resource
            .clone()
            .or(captures.resource)
            .unwrap_or_else(|| resources.default_resource());

        Some(Binding {
            action: action.clone(),
            params: captures.params,
            resource,
        })
    }

    /// Run the action, returning the response body.
    pub fn call(&self, ctx: &mut Context<'_>) -> Result<String, DispatchError> {
        match &self.target {
            ActionTarget::Method(name) => ctx.invoke(name),
            ActionTarget::Inline(body) => body(ctx),
        }
    }
}

/// A successful match. Consumed by the dispatcher.
#[derive(Debug)]
pub struct Binding {
    action: Arc<Action>,
    params: Params,
    resource: Arc<ResourceType>,
}

impl Binding {
    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn name(&self) -> Option<&str> {
        self.action.name()
    }

    pub fn is_threaded(&self) -> bool {
        self.action.is_threaded()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The resource the request dispatches to.
    pub fn resource(&self) -> &Arc<ResourceType> {
        &self.resource
    }

    pub fn into_parts(self) -> (Arc<Action>, Params, Arc<ResourceType>) {
        (self.action, self.params, self.resource)
    }
}
