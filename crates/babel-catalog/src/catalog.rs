// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! The in-memory catalog tree.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::CatalogError;
use crate::format::StorageFormat;

/// Separator between path segments.
pub const PATH_SEPARATOR: char = '.';

/// Stable identity of a catalog: one logical file in one language.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CatalogKey {
	pub language: String,
	pub domain: String,
}

impl CatalogKey {
	pub fn new(language: impl Into<String>, domain: impl Into<String>) -> Self {
		Self {
			language: language.into(),
			domain: domain.into(),
		}
	}

	/// Both names must be a single path segment: non-empty, without
	/// separators and not starting with `.`.
	pub fn validate(&self) -> Result<(), CatalogError> {
		validate_name(&self.language)?;
		validate_name(&self.domain)
	}
}

/// Checks that `name` can be used as one segment of a store path.
pub fn validate_name(name: &str) -> Result<(), CatalogError> {
	let valid = !name.is_empty()
		&& !name.starts_with('.')
		&& !name.contains(['/', '\\', '\0']);
	if valid {
		Ok(())
	} else {
		Err(CatalogError::InvalidName(name.to_string()))
	}
}

impl fmt::Display for CatalogKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.language, self.domain)
	}
}

/// A node of the catalog tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entry {
	Text(String),
	Group(IndexMap<String, Entry>),
}

impl Entry {
	/// Converts a JSON value into a catalog node.
	///
	/// Numbers and booleans become their JSON text, arrays become groups keyed
	/// by index, and `null` yields `None`.
	pub fn from_json(value: &Value) -> Option<Entry> {
		match value {
			Value::Null => None,
			Value::String(s) => Some(Entry::Text(s.clone())),
			Value::Bool(_) | Value::Number(_) => Some(Entry::Text(value.to_string())),
			Value::Array(items) => Some(Entry::Group(
				items
					.iter()
					.enumerate()
					.filter_map(|(i, item)| Entry::from_json(item).map(|e| (i.to_string(), e)))
					.collect(),
			)),
			Value::Object(map) => Some(Entry::Group(
				map.iter()
					.filter_map(|(k, v)| Entry::from_json(v).map(|e| (k.clone(), e)))
					.collect(),
			)),
		}
	}

	pub fn to_json(&self) -> Value {
		match self {
			Entry::Text(s) => Value::String(s.clone()),
			Entry::Group(children) => Value::Object(
				children
					.iter()
					.map(|(k, v)| (k.clone(), v.to_json()))
					.collect(),
			),
		}
	}
}

/// Outcome of [`Catalog::apply`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
	pub applied: usize,
	pub rejected: Vec<CatalogError>,
}

impl ApplyReport {
	pub fn is_clean(&self) -> bool {
		self.rejected.is_empty()
	}
}

/// Nested key/value texts for one `(language, domain)` pair.
///
/// Every leaf is addressed by the dotted path of its ancestors. Children keep
/// insertion order, so [`Catalog::flatten`] is reproducible.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Catalog {
	key: CatalogKey,
	entries: IndexMap<String, Entry>,
}

impl Catalog {
	pub fn new(language: impl Into<String>, domain: impl Into<String>) -> Self {
		Self::with_entries(CatalogKey::new(language, domain), IndexMap::new())
	}

	pub fn with_entries(key: CatalogKey, entries: IndexMap<String, Entry>) -> Self {
		Self { key, entries }
	}

	/// Builds a catalog from a JSON object tree.
	pub fn from_json_value(key: CatalogKey, value: &Value) -> Result<Self, CatalogError> {
		match Entry::from_json(value) {
			Some(Entry::Group(entries)) => Ok(Self::with_entries(key, entries)),
			None => Ok(Self::with_entries(key, IndexMap::new())),
			Some(Entry::Text(_)) => Err(CatalogError::InvalidDocument(format!(
				"{key}: expected an object at the top level"
			))),
		}
	}

	pub fn key(&self) -> &CatalogKey {
		&self.key
	}

	pub fn language(&self) -> &str {
		&self.key.language
	}

	pub fn domain(&self) -> &str {
		&self.key.domain
	}

	pub fn entries(&self) -> &IndexMap<String, Entry> {
		&self.entries
	}

	/// Resolves a dotted path to its text.
	pub fn get(&self, path: &str) -> Result<&str, CatalogError> {
		let mut segments = path.split(PATH_SEPARATOR);
		let first = segments.next().unwrap_or_default();
		let mut node = self
			.entries
			.get(first)
			.ok_or_else(|| CatalogError::KeyNotFound(path.to_string()))?;

		for segment in segments {
			node = match node {
				Entry::Group(children) => children
					.get(segment)
					.ok_or_else(|| CatalogError::KeyNotFound(path.to_string()))?,
				Entry::Text(_) => return Err(CatalogError::KeyNotFound(path.to_string())),
			};
		}

		match node {
			Entry::Text(text) => Ok(text),
			Entry::Group(_) => Err(CatalogError::KeyNotFound(path.to_string())),
		}
	}

	pub fn contains(&self, path: &str) -> bool {
		self.get(path).is_ok()
	}

	/// Writes `value` at `path`, creating intermediate groups.
	///
	/// A text found where a group is needed, or a group found at the final
	/// segment, is a [`CatalogError::LeafConflict`]; the catalog is left as it
	/// was.
	pub fn set(&mut self, path: &str, value: impl Into<String>) -> Result<(), CatalogError> {
		let segments = split_path(path)?;
		let Some((last, parents)) = segments.split_last() else {
			return Err(CatalogError::InvalidPath(path.to_string()));
		};

		let mut children = &mut self.entries;
		for (depth, segment) in parents.iter().enumerate() {
			let node = children
				.entry((*segment).to_string())
				.or_insert_with(|| Entry::Group(IndexMap::new()));
			children = match node {
				Entry::Group(inner) => inner,
				Entry::Text(_) => {
					return Err(CatalogError::LeafConflict {
						path: path.to_string(),
						existing: parents[..=depth].join("."),
					});
				}
			};
		}

		if let Some(Entry::Group(_)) = children.get(*last) {
			return Err(CatalogError::LeafConflict {
				path: path.to_string(),
				existing: path.to_string(),
			});
		}

		children.insert((*last).to_string(), Entry::Text(value.into()));
		Ok(())
	}

	/// Sets every `(path, value)` pair, collecting the rejected ones.
	pub fn apply<I, K, V>(&mut self, batch: I) -> ApplyReport
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: Into<String>,
	{
		let mut report = ApplyReport::default();
		for (path, value) in batch {
			match self.set(path.as_ref(), value) {
				Ok(()) => report.applied += 1,
				Err(err) => {
					debug!(catalog = %self.key, error = %err, "rejected catalog write");
					report.rejected.push(err);
				}
			}
		}
		report
	}

	/// Dotted paths of every leaf, depth first in insertion order.
	pub fn flatten(&self) -> Vec<String> {
		self.flatten_entries().into_iter().map(|(k, _)| k).collect()
	}

	/// Dotted paths of every leaf with its text.
	pub fn flatten_entries(&self) -> Vec<(String, String)> {
		let mut out = Vec::new();
		flatten_into(&self.entries, "", &mut out);
		out
	}

	/// Number of leaves.
	pub fn len(&self) -> usize {
		count_leaves(&self.entries)
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn to_json_value(&self) -> Value {
		Value::Object(
			self.entries
				.iter()
				.map(|(k, v)| (k.clone(), v.to_json()))
				.collect(),
		)
	}

	/// Pretty JSON of the whole tree, `{}` when empty. Non-ASCII text is kept as is.
	pub fn to_json(&self) -> String {
		if self.entries.is_empty() {
			return "{}".to_string();
		}
		serde_json::to_string_pretty(&self.to_json_value()).unwrap_or_else(|_| "{}".to_string())
	}

	/// On-disk representation in the given format.
	pub fn to_storage_format(&self, format: StorageFormat) -> String {
		format.render(self)
	}
}

fn split_path(path: &str) -> Result<Vec<&str>, CatalogError> {
	let segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
	if segments.iter().any(|s| s.is_empty()) {
		return Err(CatalogError::InvalidPath(path.to_string()));
	}
	Ok(segments)
}

fn flatten_into(children: &IndexMap<String, Entry>, prefix: &str, out: &mut Vec<(String, String)>) {
	for (segment, node) in children {
		let path = if prefix.is_empty() {
			segment.clone()
		} else {
			format!("{prefix}{PATH_SEPARATOR}{segment}")
		};
		match node {
			Entry::Text(text) => out.push((path, text.clone())),
			Entry::Group(inner) => flatten_into(inner, &path, out),
		}
	}
}

fn count_leaves(children: &IndexMap<String, Entry>) -> usize {
	children
		.values()
		.map(|node| match node {
			Entry::Text(_) => 1,
			Entry::Group(inner) => count_leaves(inner),
		})
		.sum()
}
