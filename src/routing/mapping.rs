//! The mapping table: actions, filters, handlers and path generators.
//!
//! # Responsibilities
//! - Compile and store actions in registration order
//! - Look up the first action matching a request
//! - Hold before/after/always filters and the exception-handler table
//! - Hold the per-resource path generators and route-defined methods
//!
//! # Design Decisions
//! - Built once by configuration code, then frozen behind an `Arc`
//! - First match wins, in registration order
//! - Explicit `NotFound` rather than a silent default

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{DispatchError, ErrorKind, MappingError};
use crate::http::Request;
use crate::resource::{ActionFn, ResourceRegistry, ResourceType};
use crate::routing::action::{Action, ActionTarget, Binding, Route};
use crate::routing::filter::{ErrorHandler, Filter};
use crate::routing::paths::{PathRegistry, Paths};
use crate::routing::pattern::{PatternTemplate, Shape};

/// Everything an application registers for dispatch.
pub struct MappingTable {
    resources: Arc<ResourceRegistry>,
    actions: Vec<Arc<Action>>,
    before: Vec<Filter>,
    after: Vec<Filter>,
    always: Vec<Filter>,
    handlers: Vec<ErrorHandler>,
    paths: PathRegistry,
    methods: HashMap<String, HashMap<String, Arc<ActionFn>>>,
}

impl MappingTable {
    pub fn new(resources: Arc<ResourceRegistry>) -> Self {
        Self {
            resources,
            actions: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
            always: Vec::new(),
            handlers: Vec::new(),
            paths: PathRegistry::default(),
            methods: HashMap::new(),
        }
    }

    /// Compile `route` and append it to the table.
    ///
    /// A named route defines a path generator on its resource (explicit or
    /// default). When it also carries a body, that body becomes an action
    /// method of the same name.
    pub fn register(&mut self, route: Route) -> Result<Arc<Action>, MappingError> {
        let Route {
            name,
            template,
            shape,
            matchers,
            constraints,
            resource,
            threaded,
            body,
        } = route;

        if name.is_none() && body.is_none() {
            return Err(MappingError::MissingTarget);
        }

        let resource = match resource {
            Some(resource) => Some(
                self.resources
                    .get(&resource)
                    .ok_or(MappingError::UnknownResource(resource))?,
            ),
            None => None,
        };

        let pattern = Arc::new(match shape {
            Shape::Path => PatternTemplate::path(&template, &matchers)?,
            Shape::Url => PatternTemplate::url(&template, &matchers)?,
        });

        let target = match name.clone() {
            Some(name) => {
                let owner = resource
                    .clone()
                    .unwrap_or_else(|| self.resources.default_resource());
                if self.paths.contains(owner.name(), &name) {
                    return Err(MappingError::DuplicateName {
                        resource: owner.name().to_string(),
                        name,
                    });
                }
                self.paths.define(owner.name(), &name, pattern.clone());
                if let Some(body) = body {
                    self.methods
                        .entry(owner.name().to_string())
                        .or_default()
                        .insert(name.clone(), body);
                }
                ActionTarget::Method(name)
            }
            None => match body {
                Some(body) => ActionTarget::Inline(body),
                None => return Err(MappingError::MissingTarget),
            },
        };

        tracing::debug!(
            template = %template,
            name = name.as_deref().unwrap_or("-"),
            constraints = constraints.len(),
            threaded,
            "Action registered"
        );

        let action = Arc::new(Action::new(
            name,
            pattern,
            constraints,
            threaded,
            resource,
            target,
        ));
        self.actions.push(action.clone());
        Ok(action)
    }

    pub fn before(&mut self, filter: Filter) {
        self.before.push(filter);
    }

    pub fn after(&mut self, filter: Filter) {
        self.after.push(filter);
    }

    pub fn always(&mut self, filter: Filter) {
        self.always.push(filter);
    }

    /// Append an exception handler. Earlier handlers take priority.
    pub fn handle(&mut self, handler: ErrorHandler) {
        self.handlers.push(handler);
    }

    /// Empty the table. Resources are kept.
    pub fn clear(&mut self) {
        self.actions.clear();
        self.before.clear();
        self.after.clear();
        self.always.clear();
        self.handlers.clear();
        self.paths.clear();
        self.methods.clear();
    }

    /// Find the first action accepting `req`.
    pub fn resolve(&self, req: &Request) -> Result<Binding, DispatchError> {
        self.actions
            .iter()
            .find_map(|action| Action::bind(action, req, &self.resources))
            .ok_or_else(|| DispatchError::NotFound(format!("{} {}", req.method(), req.location())))
    }

    /// Whether `req` resolves to an action marked threaded.
    pub fn threaded(&self, req: &Request) -> bool {
        self.resolve(req).map(|b| b.is_threaded()).unwrap_or(false)
    }

    /// Path generators for the resource called `resource`.
    pub fn paths(&self, resource: &str) -> Option<Paths<'_>> {
        self.resources
            .get(resource)
            .map(|resource| Paths::new(resource, self))
    }

    pub fn paths_for(&self, resource: Arc<ResourceType>) -> Paths<'_> {
        Paths::new(resource, self)
    }

    /// Look up an action method along the resource lineage. At each level a
    /// route-defined method shadows one declared on the type.
    pub fn find_method(&self, resource: &Arc<ResourceType>, name: &str) -> Option<Arc<ActionFn>> {
        self.resources.lineage(resource).iter().find_map(|r| {
            self.methods
                .get(r.name())
                .and_then(|methods| methods.get(name))
                .cloned()
                .or_else(|| r.declared_action(name))
        })
    }

    pub fn responds_to(&self, resource: &Arc<ResourceType>, name: &str) -> bool {
        self.find_method(resource, name).is_some()
    }

    /// The first handler registered for `kind` or one of its ancestors.
    pub fn handler_for(&self, kind: &ErrorKind) -> Option<&ErrorHandler> {
        self.handlers.iter().find(|h| h.handles(kind))
    }

    pub fn resources(&self) -> &Arc<ResourceRegistry> {
        &self.resources
    }

    pub fn actions(&self) -> &[Arc<Action>] {
        &self.actions
    }

    pub fn before_filters(&self) -> &[Filter] {
        &self.before
    }

    pub fn after_filters(&self) -> &[Filter] {
        &self.after
    }

    pub fn always_filters(&self) -> &[Filter] {
        &self.always
    }

    pub fn handlers(&self) -> &[ErrorHandler] {
        &self.handlers
    }

    pub fn path_registry(&self) -> &PathRegistry {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
            && self.before.is_empty()
            && self.after.is_empty()
            && self.always.is_empty()
            && self.handlers.is_empty()
    }
}

impl fmt::Debug for MappingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingTable")
            .field("actions", &self.actions.len())
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .field("always", &self.always.len())
            .field("handlers", &self.handlers.len())
            .finish_non_exhaustive()
    }
}
