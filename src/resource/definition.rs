//! Resource type definitions.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::dispatch::context::Context;
use crate::error::DispatchError;

/// Body of an action: runs against the per-request context and returns the
/// response body.
pub type ActionFn = dyn Fn(&mut Context<'_>) -> Result<String, DispatchError> + Send + Sync;

/// A target of routed requests, owning named action methods.
pub struct ResourceType {
    name: String,
    singular: String,
    plural: String,
    parent: Option<String>,
    actions: HashMap<String, Arc<ActionFn>>,
}

impl ResourceType {
    /// A resource called `name`. Singular is the lowercased name; plural is
    /// derived with [`pluralize`] unless overridden.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let singular = name.to_lowercase();
        let plural = pluralize(&singular);
        Self {
            name,
            singular,
            plural,
            parent: None,
            actions: HashMap::new(),
        }
    }

    pub fn plural(mut self, plural: impl Into<String>) -> Self {
        self.plural = plural.into();
        self
    }

    /// Inherit actions and path generators from the resource named `parent`.
    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Declare an action method.
    pub fn action<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut Context<'_>) -> Result<String, DispatchError> + Send + Sync + 'static,
    {
        self.actions.insert(name.into(), Arc::new(body));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn singular_name(&self) -> &str {
        &self.singular
    }

    pub fn plural_name(&self) -> &str {
        &self.plural
    }

    pub fn parent_name(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// A declared action. Does not look at parents.
    pub fn declared_action(&self, name: &str) -> Option<Arc<ActionFn>> {
        self.actions.get(name).cloned()
    }

    pub(crate) fn set_parent_if_unset(&mut self, parent: &str) {
        if self.parent.is_none() {
            self.parent = Some(parent.to_string());
        }
    }
}

impl fmt::Debug for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceType")
            .field("name", &self.name)
            .field("singular", &self.singular)
            .field("plural", &self.plural)
            .field("parent", &self.parent)
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Naive English plural, enough for resource names.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    let ends_with_sibilant = ["s", "x", "z", "ch", "sh"].iter().any(|s| word.ends_with(s));
    if ends_with_sibilant {
        return format!("{word}es");
    }
    if let Some(stem) = word.strip_suffix('y') {
        let before_y = stem.chars().last();
        if before_y.is_some_and(|c| !"aeiou".contains(c)) {
            return format!("{stem}ies");
        }
    }
    format!("{word}s")
}
