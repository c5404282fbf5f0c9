//! Resource lookup by name, singular and plural.

use std::collections::HashMap;
use std::sync::Arc;

use crate::resource::definition::ResourceType;

/// Name of the application's default resource.
pub const DEFAULT_RESOURCE: &str = "default";

/// The set of resources an application routes to.
#[derive(Debug)]
pub struct ResourceRegistry {
    default: Arc<ResourceType>,
    resources: HashMap<String, Arc<ResourceType>>,
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new(ResourceType::new(DEFAULT_RESOURCE))
    }
}

impl ResourceRegistry {
    /// A registry whose default resource is `default`.
    pub fn new(default: ResourceType) -> Self {
        let default = Arc::new(default);
        let mut resources = HashMap::new();
        resources.insert(default.name().to_string(), default.clone());
        Self { default, resources }
    }

    /// Add a resource. Without an explicit parent it inherits from the default.
    pub fn with(mut self, mut resource: ResourceType) -> Self {
        resource.set_parent_if_unset(self.default.name());
        self.resources
            .insert(resource.name().to_string(), Arc::new(resource));
        self
    }

    pub fn default_resource(&self) -> Arc<ResourceType> {
        self.default.clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<ResourceType>> {
        self.resources.get(name).cloned()
    }

    pub fn by_singular(&self, singular: &str) -> Option<Arc<ResourceType>> {
        self.resources
            .values()
            .find(|r| r.singular_name() == singular)
            .cloned()
    }

    pub fn by_plural(&self, plural: &str) -> Option<Arc<ResourceType>> {
        self.resources
            .values()
            .find(|r| r.plural_name() == plural)
            .cloned()
    }

    /// `resource` followed by its ancestors, nearest first.
    /// Stops at a missing parent or a cycle.
    pub fn lineage(&self, resource: &Arc<ResourceType>) -> Vec<Arc<ResourceType>> {
        let mut chain = vec![resource.clone()];
        let mut current = resource.clone();
        while let Some(parent) = current.parent_name().and_then(|p| self.get(p)) {
            if chain.iter().any(|r| r.name() == parent.name()) {
                tracing::warn!(resource = %resource.name(), "Resource parent cycle");
                break;
            }
            chain.push(parent.clone());
            current = parent;
        }
        chain
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ResourceRegistry {
        ResourceRegistry::default()
            .with(ResourceType::new("blanket"))
            .with(ResourceType::new("goose").plural("geese"))
            .with(ResourceType::new("gosling").parent("goose"))
    }

    #[test]
    fn test_lookup() {
        let registry = registry();
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.by_plural("blankets").unwrap().name(), "blanket");
        assert_eq!(registry.by_singular("blanket").unwrap().name(), "blanket");
        assert_eq!(registry.by_plural("geese").unwrap().name(), "goose");
        assert!(registry.by_plural("gooses").is_none());
        assert!(registry.get("smurf").is_none());
    }

    #[test]
    fn test_lineage_ends_at_default() {
        let registry = registry();
        let gosling = registry.get("gosling").unwrap();
        let names: Vec<_> = registry
            .lineage(&gosling)
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["gosling", "goose", "default"]);

        let names: Vec<_> = registry
            .lineage(&registry.default_resource())
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["default"]);
    }

    #[test]
    fn test_lineage_stops_on_cycle() {
        let registry = ResourceRegistry::default()
            .with(ResourceType::new("a").parent("b"))
            .with(ResourceType::new("b").parent("a"));
        let a = registry.get("a").unwrap();
        assert_eq!(registry.lineage(&a).len(), 2);
    }
}
