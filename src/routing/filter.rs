//! Filters and exception handlers registered around actions.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::dispatch::context::Context;
use crate::error::{DispatchError, ErrorKind};
use crate::http::Request;
use crate::routing::constraint::{Constraint, ConstraintSet};

/// Body of a before/after/always filter. Receives the fixed arguments bound
/// at registration.
pub type FilterFn =
    dyn Fn(&mut Context<'_>, &[Value]) -> Result<(), DispatchError> + Send + Sync;

/// Body of an exception handler. Receives the error being handled and the
/// fixed arguments bound at registration.
pub type HandlerFn =
    dyn Fn(&mut Context<'_>, &DispatchError, &[Value]) -> Result<(), DispatchError> + Send + Sync;

/// A filter gated by its own constraints.
pub struct Filter {
    constraints: ConstraintSet,
    body: Arc<FilterFn>,
    args: Vec<Value>,
}

impl Filter {
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&mut Context<'_>, &[Value]) -> Result<(), DispatchError> + Send + Sync + 'static,
    {
        Self {
            constraints: ConstraintSet::new(),
            body: Arc::new(body),
            args: Vec::new(),
        }
    }

    /// Only run for requests satisfying `constraint`.
    pub fn when(mut self, constraint: impl Constraint + 'static) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn applies_to(&self, req: &Request) -> bool {
        self.constraints.satisfied_by(req)
    }

    pub fn call(&self, ctx: &mut Context<'_>) -> Result<(), DispatchError> {
        (self.body)(ctx, &self.args)
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("constraints", &self.constraints)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

/// An entry of the exception-handler table.
pub struct ErrorHandler {
    kind: &'static ErrorKind,
    body: Arc<HandlerFn>,
    args: Vec<Value>,
}

impl ErrorHandler {
    /// Handle errors of `kind` and of every kind nested under it.
    pub fn new<F>(kind: &'static ErrorKind, body: F) -> Self
    where
        F: Fn(&mut Context<'_>, &DispatchError, &[Value]) -> Result<(), DispatchError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            kind,
            body: Arc::new(body),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    pub fn kind(&self) -> &'static ErrorKind {
        self.kind
    }

    pub fn handles(&self, kind: &ErrorKind) -> bool {
        kind.is_a(self.kind)
    }

    pub fn call(&self, ctx: &mut Context<'_>, error: &DispatchError) -> Result<(), DispatchError> {
        (self.body)(ctx, error, &self.args)
    }
}

impl fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHandler")
            .field("kind", &self.kind.name())
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{APPLICATION, ERROR, NOT_FOUND};
    use crate::routing::constraint::PathPrefixConstraint;
    use serde_json::json;

    #[test]
    fn test_filter_applicability() {
        let filter = Filter::new(|_, _| Ok(())).when(PathPrefixConstraint::new("/admin"));
        assert!(filter.applies_to(&Request::get("/admin/users").unwrap()));
        assert!(!filter.applies_to(&Request::get("/public").unwrap()));

        let everywhere = Filter::new(|_, _| Ok(()));
        assert!(everywhere.applies_to(&Request::get("/public").unwrap()));
    }

    #[test]
    fn test_filter_args_are_fixed() {
        let filter = Filter::new(|_, _| Ok(())).with_args(vec![json!("audit"), json!(3)]);
        assert_eq!(filter.args(), &[json!("audit"), json!(3)]);
    }

    #[test]
    fn test_handler_matches_descendant_kinds() {
        let handler = ErrorHandler::new(&ERROR, |_, _, _| Ok(()));
        assert!(handler.handles(&NOT_FOUND));
        assert!(handler.handles(&APPLICATION));

        let handler = ErrorHandler::new(&NOT_FOUND, |_, _, _| Ok(()));
        assert!(handler.handles(&NOT_FOUND));
        assert!(!handler.handles(&APPLICATION));
        assert!(!handler.handles(&ERROR));
    }
}
