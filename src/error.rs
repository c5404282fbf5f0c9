//! Error taxonomy for routing and dispatch.
//!
//! # Responsibilities
//! - Name the kinds of failure an exception handler can be registered for
//! - Carry the control signals (not found, redirect) raised by handlers
//! - Report registration and reverse-generation failures
//!
//! # Design Decisions
//! - Kinds are explicit statics linked to a parent, not a type hierarchy
//! - Handler lookup asks `kind.is_a(declared)`, walking parent links
//! - Redirect is a signal and has no kind; it never reaches the handler table

use std::fmt;

use axum::http::StatusCode;
use thiserror::Error;

/// A node in the error-kind taxonomy.
///
/// Applications declare their own kinds as statics:
///
/// ```
/// use switchyard::error::{ErrorKind, APPLICATION};
///
/// static VALIDATION: ErrorKind = ErrorKind::new("validation", &APPLICATION);
/// assert!(VALIDATION.is_a(&APPLICATION));
/// ```
#[derive(Debug)]
pub struct ErrorKind {
    name: &'static str,
    parent: Option<&'static ErrorKind>,
}

impl ErrorKind {
    /// A kind with no parent.
    pub const fn root(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    /// A kind nested under `parent`.
    pub const fn new(name: &'static str, parent: &'static ErrorKind) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parent(&self) -> Option<&'static ErrorKind> {
        self.parent
    }

    /// True if `ancestor` is this kind or one of its parents.
    ///
    /// Kinds are compared by identity, so declare them as `static` items. Two
    /// kinds sharing a name are still distinct.
    pub fn is_a(&self, ancestor: &ErrorKind) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if std::ptr::eq(kind, ancestor) {
                return true;
            }
            current = kind.parent;
        }
        false
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Root of every kind.
pub static ERROR: ErrorKind = ErrorKind::root("error");

/// No route matched, or a handler signalled not found.
pub static NOT_FOUND: ErrorKind = ErrorKind::new("not_found", &ERROR);

/// Failures raised by application code.
pub static APPLICATION: ErrorKind = ErrorKind::new("application", &ERROR);

/// Reverse path generation failed inside a handler.
pub static PATH_GENERATION: ErrorKind = ErrorKind::new("path_generation", &APPLICATION);

/// A route named an action the resource does not define.
pub static UNDEFINED_ACTION: ErrorKind = ErrorKind::new("undefined_action", &APPLICATION);

/// Errors and signals raised while a request moves through the pipeline.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Nothing matched the request, or a handler gave up on it.
    #[error("not found: {0}")]
    NotFound(String),

    /// Control signal: answer with a redirect instead of a body.
    #[error("redirect to {location} ({status})")]
    Redirect { location: String, status: StatusCode },

    /// An application failure of the given kind.
    #[error("{kind}: {message}")]
    Failed {
        kind: &'static ErrorKind,
        message: String,
    },

    #[error(transparent)]
    Path(#[from] PathError),
}

impl DispatchError {
    /// An application failure of `kind`.
    pub fn failed(kind: &'static ErrorKind, message: impl Into<String>) -> Self {
        DispatchError::Failed {
            kind,
            message: message.into(),
        }
    }

    /// The kind used for handler lookup. `None` for redirects.
    pub fn kind(&self) -> Option<&'static ErrorKind> {
        match self {
            DispatchError::NotFound(_) => Some(&NOT_FOUND),
            DispatchError::Redirect { .. } => None,
            DispatchError::Failed { kind, .. } => Some(*kind),
            DispatchError::Path(_) => Some(&PATH_GENERATION),
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, DispatchError::Redirect { .. })
    }
}

/// Errors from compiling a route template.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("unbalanced braces in template `{0}`")]
    Unbalanced(String),

    #[error("empty placeholder name in template `{0}`")]
    EmptyName(String),

    #[error("placeholder must span the whole segment: `{0}`")]
    PartialSegment(String),

    #[error("regex given for `{0}` but the template has no such placeholder")]
    UnusedMatcher(String),

    #[error("invalid regex: {0}")]
    Regex(#[from] regex::Error),
}

/// Errors from registering routes in a mapping table.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("an unnamed route needs a body")]
    MissingTarget,

    #[error("unknown resource `{0}`")]
    UnknownResource(String),

    #[error("resource `{resource}` already has a route named `{name}`")]
    DuplicateName { resource: String, name: String },

    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// Errors from reverse path generation.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("resource `{resource}` has no route named `{route}`")]
    UnknownRoute { resource: String, route: String },

    #[error("route `{route}` needs {expected} argument(s), got {supplied}")]
    MissingArgument {
        route: String,
        expected: usize,
        supplied: usize,
    },

    #[error("route `{route}` takes {expected} argument(s), got {supplied}")]
    UnexpectedArguments {
        route: String,
        expected: usize,
        supplied: usize,
    },

    #[error("argument {position} of route `{route}` is {reason}")]
    InvalidArgument {
        route: String,
        position: usize,
        reason: &'static str,
    },
}
