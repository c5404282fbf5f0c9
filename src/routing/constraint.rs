//! Request constraints evaluated before pattern matching.
//!
//! # Responsibilities
//! - Match method (exact)
//! - Match host (exact match, case-insensitive)
//! - Match path prefix (case-sensitive)
//! - Arbitrary predicates supplied by configuration code
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Host matching is case-insensitive
//! - Path matching is case-sensitive
//! - Empty set = always matches (wildcard)
//! - Cheap checks only; the template does the real work afterwards

use std::fmt;
use std::sync::Arc;

use axum::http::Method;

use crate::http::Request;

/// Trait for gating requests on a condition.
pub trait Constraint: Send + Sync + fmt::Debug {
    /// Returns true if the request satisfies this condition.
    fn satisfied_by(&self, req: &Request) -> bool;
}

/// Matches the request method.
#[derive(Debug, Clone)]
pub struct MethodConstraint {
    method: Method,
}

impl MethodConstraint {
    pub fn new(method: Method) -> Self {
        Self { method }
    }
}

impl Constraint for MethodConstraint {
    fn satisfied_by(&self, req: &Request) -> bool {
        *req.method() == self.method
    }
}

/// Matches the request host.
#[derive(Debug, Clone)]
pub struct HostConstraint {
    expected_host: String,
}

impl HostConstraint {
    /// The host is normalized to lowercase for case-insensitive matching.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            expected_host: host.into().to_lowercase(),
        }
    }
}

impl Constraint for HostConstraint {
    fn satisfied_by(&self, req: &Request) -> bool {
        req.host()
            .map(|h| h.to_lowercase() == self.expected_host)
            .unwrap_or(false)
    }
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixConstraint {
    prefix: String,
}

impl PathPrefixConstraint {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Constraint for PathPrefixConstraint {
    fn satisfied_by(&self, req: &Request) -> bool {
        req.path().starts_with(&self.prefix)
    }
}

/// A custom predicate block.
#[derive(Clone)]
pub struct Predicate {
    label: String,
    check: Arc<dyn Fn(&Request) -> bool + Send + Sync>,
}

impl Predicate {
    /// `label` only shows up in debug output.
    pub fn new<F>(label: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Request) -> bool + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            check: Arc::new(check),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.label).finish()
    }
}

impl Constraint for Predicate {
    fn satisfied_by(&self, req: &Request) -> bool {
        (self.check)(req)
    }
}

/// Ordered constraints with AND semantics.
#[derive(Debug, Default)]
pub struct ConstraintSet {
    constraints: Vec<Box<dyn Constraint>>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, constraint: impl Constraint + 'static) {
        self.constraints.push(Box::new(constraint));
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

impl Constraint for ConstraintSet {
    fn satisfied_by(&self, req: &Request) -> bool {
        // All constraints must pass (AND), in declaration order
        self.constraints.iter().all(|c| c.satisfied_by(req))
    }
}
