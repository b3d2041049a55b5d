// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Builder for caller-defined event properties.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An opaque bag of caller-defined properties attached to an event.
///
/// Keys are strings, values are arbitrary JSON. The pipeline never
/// interprets the contents; it only carries them to the collector.
///
/// # Example
///
/// ```
/// use loom_telemetry_core::Properties;
///
/// let props = Properties::new()
///     .insert("section", "projects")
///     .insert("scroll_depth", 0.75)
///     .insert("first_visit", false);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties {
	entries: Map<String, Value>,
}

impl Properties {
	/// Creates an empty property bag.
	pub fn new() -> Self {
		Self {
			entries: Map::new(),
		}
	}

	/// Inserts a key-value pair, replacing any existing value for the key.
	pub fn insert<K, V>(mut self, key: K, value: V) -> Self
	where
		K: Into<String>,
		V: Into<Value>,
	{
		self.entries.insert(key.into(), value.into());
		self
	}

	/// Removes a key, returning its value if it was present.
	pub fn remove(&mut self, key: &str) -> Option<Value> {
		self.entries.remove(key)
	}

	/// Folds the entries of `other` into this bag; `other` wins on key clashes.
	pub fn merge(mut self, other: Properties) -> Self {
		for (key, value) in other.entries {
			self.entries.insert(key, value);
		}
		self
	}

	/// Gets a value by key.
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.entries.get(key)
	}

	/// Returns true if the key is present.
	pub fn contains_key(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}

	/// Returns the number of properties.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns true if no properties are set.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Iterates over the entries in key order.
	pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
		self.entries.iter()
	}

	/// Converts the bag into a `serde_json::Value` object.
	pub fn into_value(self) -> Value {
		Value::Object(self.entries)
	}
}

impl From<Properties> for Value {
	fn from(props: Properties) -> Self {
		props.into_value()
	}
}

impl From<Value> for Properties {
	fn from(value: Value) -> Self {
		match value {
			Value::Object(entries) => Self { entries },
			_ => Self::new(),
		}
	}
}

impl From<Map<String, Value>> for Properties {
	fn from(entries: Map<String, Value>) -> Self {
		Self { entries }
	}
}

impl FromIterator<(String, Value)> for Properties {
	fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
		Self {
			entries: iter.into_iter().collect(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn new_is_empty() {
		let props = Properties::new();
		assert!(props.is_empty());
		assert_eq!(props.len(), 0);
	}

	#[test]
	fn insert_replaces_existing_key() {
		let props = Properties::new().insert("page", "/home").insert("page", "/about");
		assert_eq!(props.len(), 1);
		assert_eq!(props.get("page"), Some(&Value::String("/about".to_string())));
	}

	#[test]
	fn insert_accepts_mixed_value_types() {
		let props = Properties::new()
			.insert("label", "hero")
			.insert("count", 3)
			.insert("ratio", 0.5)
			.insert("visible", true);
		assert_eq!(props.len(), 4);
		assert!(props.get("ratio").unwrap().is_f64());
		assert_eq!(props.get("visible"), Some(&Value::Bool(true)));
	}

	#[test]
	fn merge_prefers_other_on_clash() {
		let base = Properties::new().insert("a", 1).insert("b", 2);
		let other = Properties::new().insert("b", 20).insert("c", 30);
		let merged = base.merge(other);
		assert_eq!(merged.get("a"), Some(&Value::Number(1.into())));
		assert_eq!(merged.get("b"), Some(&Value::Number(20.into())));
		assert_eq!(merged.get("c"), Some(&Value::Number(30.into())));
	}

	#[test]
	fn remove_returns_value() {
		let mut props = Properties::new().insert("key", "value");
		assert_eq!(props.remove("key"), Some(Value::String("value".to_string())));
		assert_eq!(props.remove("key"), None);
		assert!(props.is_empty());
	}

	#[test]
	fn serializes_transparently_as_object() {
		let props = Properties::new().insert("goal", "contact");
		let json = serde_json::to_string(&props).unwrap();
		assert_eq!(json, r#"{"goal":"contact"}"#);
	}

	#[test]
	fn from_non_object_value_is_empty() {
		let props = Properties::from(Value::String("scalar".to_string()));
		assert!(props.is_empty());
	}

	proptest! {
		#[test]
		fn len_counts_unique_keys(keys in proptest::collection::vec("[a-z]{1,8}", 0..16)) {
			let unique: std::collections::HashSet<_> = keys.iter().cloned().collect();
			let mut props = Properties::new();
			for key in &keys {
				props = props.insert(key.clone(), 1);
			}
			prop_assert_eq!(props.len(), unique.len());
		}

		#[test]
		fn serde_roundtrip(key in "[a-z]{1,12}", value in "[a-zA-Z0-9 ]{0,24}") {
			let props = Properties::new().insert(key.clone(), value.clone());
			let json = serde_json::to_string(&props).unwrap();
			let parsed: Properties = serde_json::from_str(&json).unwrap();
			prop_assert_eq!(parsed.get(&key), Some(&Value::String(value)));
		}
	}
}
