// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Normalizes agent batches into flat dotted keys and accumulates them.
//!
//! The agent is asked for a flat `{ "dotted.key": "text" }` object, but it
//! regularly nests groups, wraps or unwraps the tool envelope, or emits numbers.
//! [`normalize`] accepts all of that and records each deviation as a
//! [`Violation`] instead of failing the turn.

use std::fmt;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

use babel_catalog::PATH_SEPARATOR;

/// Name of the field wrapping the batch in the `translate` tool input.
pub const TRANSLATIONS_FIELD: &str = "translations";

/// Envelope fields that may sit next to the batch.
const ENVELOPE_FIELDS: &[&str] = &[TRANSLATIONS_FIELD, "language", "domain"];

/// A deviation from the flat-output contract that was repaired.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Violation {
	/// A group was returned instead of dotted keys.
	Nested { key: String },
	/// A list was returned; items were keyed by index.
	List { key: String },
	/// A number or boolean was returned instead of a string.
	Scalar { key: String },
	/// A `null` value was dropped.
	Null { key: String },
	/// The batch was not wrapped in the `translations` field.
	BareBatch,
	/// The batch was JSON text instead of an object.
	EncodedBatch,
	/// The batch was not an object at all and was discarded.
	NotAnObject,
	/// The agent answered without calling the `translate` tool.
	NoToolCall,
}

impl fmt::Display for Violation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Violation::Nested { key } => write!(f, "nested group at '{key}'"),
			Violation::List { key } => write!(f, "list at '{key}'"),
			Violation::Scalar { key } => write!(f, "non-string value at '{key}'"),
			Violation::Null { key } => write!(f, "null value at '{key}'"),
			Violation::BareBatch => f.write_str("batch not wrapped in 'translations'"),
			Violation::EncodedBatch => f.write_str("batch encoded as a JSON string"),
			Violation::NotAnObject => f.write_str("batch is not an object"),
			Violation::NoToolCall => f.write_str("no translate tool call"),
		}
	}
}

/// A flat batch plus the violations repaired while producing it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Normalized {
	pub batch: IndexMap<String, String>,
	pub violations: Vec<Violation>,
}

/// Normalizes a `translate` tool input, with or without its envelope.
pub fn normalize(raw: &Value) -> Normalized {
	let mut violations = Vec::new();

	let inner = match raw {
		Value::Object(map) if is_envelope(map) => map.get(TRANSLATIONS_FIELD).unwrap_or(raw),
		Value::Object(_) => {
			violations.push(Violation::BareBatch);
			raw
		}
		_ => raw,
	};

	let mut normalized = normalize_batch(inner);
	violations.append(&mut normalized.violations);
	normalized.violations = violations;

	for violation in &normalized.violations {
		debug!(violation = %violation, "normalized agent batch");
	}
	normalized
}

/// Normalizes a batch that is already unwrapped from its envelope.
pub fn normalize_batch(raw: &Value) -> Normalized {
	let mut out = Normalized::default();

	let decoded;
	let raw = match raw {
		Value::String(text) => match serde_json::from_str::<Value>(text) {
			Ok(value @ Value::Object(_)) => {
				out.violations.push(Violation::EncodedBatch);
				decoded = value;
				&decoded
			}
			_ => {
				out.violations.push(Violation::NotAnObject);
				return out;
			}
		},
		other => other,
	};

	match raw {
		Value::Object(map) => {
			for (key, value) in map {
				flatten_value(key, value, &mut out);
			}
		}
		_ => out.violations.push(Violation::NotAnObject),
	}
	out
}

fn is_envelope(map: &Map<String, Value>) -> bool {
	matches!(
		map.get(TRANSLATIONS_FIELD),
		Some(Value::Object(_)) | Some(Value::String(_))
	) && map.keys().all(|k| ENVELOPE_FIELDS.contains(&k.as_str()))
}

fn flatten_value(path: &str, value: &Value, out: &mut Normalized) {
	match value {
		Value::String(text) => {
			out.batch.insert(path.to_string(), text.clone());
		}
		Value::Number(_) | Value::Bool(_) => {
			out.violations.push(Violation::Scalar {
				key: path.to_string(),
			});
			out.batch.insert(path.to_string(), value.to_string());
		}
		Value::Null => out.violations.push(Violation::Null {
			key: path.to_string(),
		}),
		Value::Object(children) => {
			out.violations.push(Violation::Nested {
				key: path.to_string(),
			});
			for (segment, child) in children {
				flatten_value(&format!("{path}{PATH_SEPARATOR}{segment}"), child, out);
			}
		}
		Value::Array(items) => {
			out.violations.push(Violation::List {
				key: path.to_string(),
			});
			for (index, child) in items.iter().enumerate() {
				flatten_value(&format!("{path}{PATH_SEPARATOR}{index}"), child, out);
			}
		}
	}
}

/// Dotted key → text accumulated across agent turns.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TranslationResult {
	entries: IndexMap<String, String>,
}

impl TranslationResult {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds `batch`, later values winning. Returns how many keys were new.
	pub fn merge(&mut self, batch: IndexMap<String, String>) -> usize {
		let before = self.entries.len();
		self.entries.extend(batch);
		self.entries.len() - before
	}

	pub fn get(&self, key: &str) -> Option<&str> {
		self.entries.get(key).map(String::as_str)
	}

	pub fn contains(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	pub fn clear(&mut self) {
		self.entries.clear();
	}

	pub fn into_inner(self) -> IndexMap<String, String> {
		self.entries
	}
}

impl FromIterator<(String, String)> for TranslationResult {
	fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
		Self {
			entries: iter.into_iter().collect(),
		}
	}
}

/// Functional form of [`TranslationResult::merge`].
pub fn merge(mut accumulated: TranslationResult, incoming: IndexMap<String, String>) -> TranslationResult {
	accumulated.merge(incoming);
	accumulated
}
