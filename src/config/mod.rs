//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → compared with the running config
//!     → changed dispatch settings swapped into the Application
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Only the `[dispatch]` section is hot-reloadable; listener and
//!   timeouts need a restart

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{AppConfig, DispatchConfig, ListenerConfig, ObservabilityConfig, TimeoutConfig};
pub use validation::ValidationError;
pub use watcher::{ConfigWatcher, Reload};
