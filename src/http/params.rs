//! Request parameters.

use std::collections::btree_map::{self, BTreeMap};

use serde::Serialize;

/// A parameter value: plain text, or a nested mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Text(String),
    Nested(Params),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            ParamValue::Nested(_) => None,
        }
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<Params> for ParamValue {
    fn from(value: Params) -> Self {
        ParamValue::Nested(value)
    }
}

/// Name → value mapping, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    /// The text value of `name`, if present and not nested.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParamValue::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Copy every entry of `other` over this mapping. Later values win.
    pub fn merge(&mut self, other: Params) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, ParamValue> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_overwrites() {
        let mut params: Params = [("page", "1"), ("q", "rust")].into_iter().collect();
        params.merge([("page", "2")].into_iter().collect());

        assert_eq!(params.get_str("page"), Some("2"));
        assert_eq!(params.get_str("q"), Some("rust"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_nested_values_have_no_text() {
        let mut entry = Params::new();
        entry.insert("title", "Hello");

        let mut params = Params::new();
        params.insert("entry", entry);

        assert!(params.get_str("entry").is_none());
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            serde_json::json!({ "entry": { "title": "Hello" } })
        );
    }
}
