//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the dispatch server.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Dispatcher behaviour. Hot-reloadable.
    pub dispatch: DispatchConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Dispatcher settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Serialize every request behind one global lock.
    pub synchronize: bool,

    /// Rebuild the mapping before every request.
    pub debug: bool,

    /// Content type used when the path has no known extension.
    pub default_content_type: String,

    /// Extension (without the dot) to content type.
    pub mime_types: HashMap<String, String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        let mime_types = [
            ("html", "text/html"),
            ("htm", "text/html"),
            ("txt", "text/plain"),
            ("css", "text/css"),
            ("js", "application/javascript"),
            ("json", "application/json"),
            ("xml", "application/xml"),
            ("png", "image/png"),
            ("jpg", "image/jpeg"),
            ("jpeg", "image/jpeg"),
            ("gif", "image/gif"),
            ("svg", "image/svg+xml"),
            ("ico", "image/x-icon"),
            ("pdf", "application/pdf"),
        ]
        .into_iter()
        .map(|(ext, mime)| (ext.to_string(), mime.to_string()))
        .collect();

        Self {
            synchronize: false,
            debug: false,
            default_content_type: "text/html".to_string(),
            mime_types,
        }
    }
}

impl DispatchConfig {
    /// Content type for a request path, by the extension of its last segment.
    pub fn content_type_for(&self, path: &str) -> &str {
        let segment = path.rsplit('/').next().unwrap_or(path);
        segment
            .rsplit_once('.')
            .and_then(|(_, ext)| self.mime_types.get(&ext.to_ascii_lowercase()))
            .map(String::as_str)
            .unwrap_or(self.default_content_type.as_str())
    }
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
