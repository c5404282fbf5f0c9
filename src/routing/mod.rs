//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Application setup:
//!     Route builder (template, constraints, name, resource, body)
//!     → pattern.rs (compile template into tokens / anchored regex)
//!     → mapping.rs (store Action, define path generator, define method)
//!
//! Incoming Request (method, url, params):
//!     → mapping.rs (actions in registration order)
//!     → constraint.rs (cheap gate)
//!     → pattern.rs (capture params, pick resource)
//!     → Return: Binding or NotFound
//!
//! Inside an action:
//!     paths.rs (route name + args → concrete path)
//! ```
//!
//! # Design Decisions
//! - Tables are built by configuration code, immutable once installed
//! - Deterministic: same input always matches same action
//! - First match wins (registration order)
//! - Regex only where a template or a placeholder asks for it

pub mod action;
pub mod constraint;
pub mod filter;
pub mod mapping;
pub mod paths;
pub mod pattern;

pub use action::{Action, ActionTarget, Binding, Route};
pub use constraint::{
    Constraint, ConstraintSet, HostConstraint, MethodConstraint, PathPrefixConstraint, Predicate,
};
pub use filter::{ErrorHandler, Filter, FilterFn, HandlerFn};
pub use mapping::MappingTable;
pub use paths::{PathRegistry, Paths};
pub use pattern::{PatternTemplate, Shape};
