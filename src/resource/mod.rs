//! Resource subsystem.
//!
//! # Data Flow
//! ```text
//! Application setup:
//!     ResourceType::new("blanket").action("list", ..)
//!     → ResourceRegistry (default + named resources, parent links)
//!     → shared via Arc with every MappingTable
//!
//! Per request:
//!     Binding names a resource
//!     → Context wraps (request, response, resource)
//!     → named action looked up along the resource lineage
//! ```
//!
//! # Design Decisions
//! - Resource types are immutable once registered
//! - Route-defined actions live in the mapping table, not on the type
//! - Every resource except the default inherits from the default

pub mod definition;
pub mod registry;

pub use definition::{pluralize, ActionFn, ResourceType};
pub use registry::ResourceRegistry;
