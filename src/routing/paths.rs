//! Reverse path generation.
//!
//! # Responsibilities
//! - Remember the template of every named route, per resource
//! - Generate a concrete path from a route name and arguments
//! - Fall back to parent resources (a child inherits its parent's routes)

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::PathError;
use crate::resource::ResourceType;
use crate::routing::mapping::MappingTable;
use crate::routing::pattern::PatternTemplate;

/// Named-route templates keyed by resource name, then route name.
#[derive(Debug, Default)]
pub struct PathRegistry {
    generators: HashMap<String, HashMap<String, Arc<PatternTemplate>>>,
}

impl PathRegistry {
    pub fn define(&mut self, resource: &str, route: &str, template: Arc<PatternTemplate>) {
        self.generators
            .entry(resource.to_string())
            .or_default()
            .insert(route.to_string(), template);
    }

    pub fn get(&self, resource: &str, route: &str) -> Option<&Arc<PatternTemplate>> {
        self.generators.get(resource).and_then(|routes| routes.get(route))
    }

    pub fn contains(&self, resource: &str, route: &str) -> bool {
        self.get(resource, route).is_some()
    }

    pub fn clear(&mut self) {
        self.generators.clear();
    }
}

/// The reverse-generation surface of one resource.
pub struct Paths<'a> {
    resource: Arc<ResourceType>,
    mapping: &'a MappingTable,
}

impl<'a> Paths<'a> {
    pub(crate) fn new(resource: Arc<ResourceType>, mapping: &'a MappingTable) -> Self {
        Self { resource, mapping }
    }

    pub fn resource(&self) -> &ResourceType {
        &self.resource
    }

    /// True if `route` generates for this resource or one of its parents.
    pub fn responds_to(&self, route: &str) -> bool {
        self.template(route).is_some()
    }

    /// Build the path of `route` from positional `args`.
    ///
    /// ```
    /// use serde_json::json;
    /// use switchyard::resource::ResourceRegistry;
    /// use switchyard::routing::{MappingTable, Route};
    /// use std::sync::Arc;
    ///
    /// let mut mapping = MappingTable::new(Arc::new(ResourceRegistry::default()));
    /// mapping
    ///     .register(Route::get("/entries/{id}").named("entry").to(|_| Ok(String::new())))
    ///     .unwrap();
    ///
    /// let paths = mapping.paths("default").unwrap();
    /// assert_eq!(paths.generate("entry", &[json!(5), json!({ "draft": true })]).unwrap(), "/entries/5?draft=true");
    /// ```
    pub fn generate(&self, route: &str, args: &[Value]) -> Result<String, PathError> {
        let template = self.template(route).ok_or_else(|| PathError::UnknownRoute {
            resource: self.resource.name().to_string(),
            route: route.to_string(),
        })?;
        template.generate(route, &self.resource, args)
    }

    fn template(&self, route: &str) -> Option<&'a Arc<PatternTemplate>> {
        let registry = self.mapping.path_registry();
        self.mapping
            .resources()
            .lineage(&self.resource)
            .iter()
            .find_map(|r| registry.get(r.name(), route))
    }
}
