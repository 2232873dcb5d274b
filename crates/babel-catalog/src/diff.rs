// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Key-presence difference between two catalogs.

use std::collections::HashSet;

use crate::catalog::Catalog;

/// Dotted keys present in a source catalog but absent from a target.
///
/// Ordered like the source's flatten order; never contains duplicates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MissingKeySet {
	keys: Vec<String>,
}

impl MissingKeySet {
	pub fn new(keys: Vec<String>) -> Self {
		let mut seen = HashSet::new();
		let keys = keys
			.into_iter()
			.filter(|key| seen.insert(key.clone()))
			.collect();
		Self { keys }
	}

	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}

	pub fn len(&self) -> usize {
		self.keys.len()
	}

	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.keys.iter().map(String::as_str)
	}

	pub fn contains(&self, key: &str) -> bool {
		self.keys.iter().any(|k| k == key)
	}

	pub fn as_slice(&self) -> &[String] {
		&self.keys
	}

	pub fn into_vec(self) -> Vec<String> {
		self.keys
	}
}

impl<'a> IntoIterator for &'a MissingKeySet {
	type Item = &'a String;
	type IntoIter = std::slice::Iter<'a, String>;

	fn into_iter(self) -> Self::IntoIter {
		self.keys.iter()
	}
}

/// Keys of `source` that `target` lacks.
///
/// Only presence is compared: a target leaf holding an empty string or a stale
/// value still counts as present.
pub fn diff(source: &Catalog, target: &Catalog) -> MissingKeySet {
	let present: HashSet<String> = target.flatten().into_iter().collect();
	MissingKeySet::new(
		source
			.flatten()
			.into_iter()
			.filter(|key| !present.contains(key))
			.collect(),
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::strategies;
	use proptest::prelude::*;

	#[test]
	fn reports_keys_in_source_order() {
		let mut source = Catalog::new("en", "auth");
		source.set("failed", "Failed").unwrap();
		source.set("password", "Wrong password").unwrap();
		source.set("throttle.title", "Slow down").unwrap();

		let mut target = Catalog::new("de", "auth");
		target.set("password", "Falsches Passwort").unwrap();

		assert_eq!(
			diff(&source, &target).into_vec(),
			vec!["failed".to_string(), "throttle.title".to_string()]
		);
	}

	#[test]
	fn empty_target_value_counts_as_present() {
		let mut source = Catalog::new("en", "auth");
		source.set("failed", "Failed").unwrap();
		let mut target = Catalog::new("de", "auth");
		target.set("failed", "").unwrap();

		assert!(diff(&source, &target).is_empty());
	}

	#[test]
	fn missing_key_set_deduplicates() {
		let set = MissingKeySet::new(vec!["a".into(), "b".into(), "a".into()]);
		assert_eq!(set.len(), 2);
		assert!(set.contains("b"));
	}

	proptest! {
			#[test]
			fn catalog_has_nothing_missing_against_itself(a in strategies::catalog("en")) {
					prop_assert!(diff(&a, &a).is_empty());
			}

			#[test]
			fn diff_ignores_target_values(
					a in strategies::catalog("en"),
					b in strategies::catalog("de"),
					replacement in ".*",
			) {
					let mut c = Catalog::new("de", "messages");
					c.apply(b.flatten().into_iter().map(|k| (k, replacement.clone())));
					prop_assert_eq!(diff(&a, &b), diff(&a, &c));
			}

			#[test]
			fn every_missing_key_is_in_source_and_not_in_target(
					a in strategies::catalog("en"),
					b in strategies::catalog("de"),
			) {
					let missing = diff(&a, &b);
					for key in missing.iter() {
							prop_assert!(a.contains(key));
							prop_assert!(!b.contains(key));
					}
			}
	}
}
