// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, CatalogKey};
use crate::error::CatalogError;
use crate::php;

/// On-disk representation of a catalog.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageFormat {
	/// `<?php return [...];` files.
	#[default]
	#[serde(rename = "php", alias = "php_array")]
	PhpArray,
	/// Pretty-printed JSON objects.
	Json,
}

impl StorageFormat {
	pub fn extension(self) -> &'static str {
		match self {
			StorageFormat::PhpArray => "php",
			StorageFormat::Json => "json",
		}
	}

	pub fn render(self, catalog: &Catalog) -> String {
		match self {
			StorageFormat::PhpArray => php::render(catalog.entries()),
			StorageFormat::Json => {
				let mut json = catalog.to_json();
				json.push('\n');
				json
			}
		}
	}

	pub fn parse(self, key: CatalogKey, text: &str) -> Result<Catalog, CatalogError> {
		match self {
			StorageFormat::PhpArray => php::parse(text)
				.map(|entries| Catalog::with_entries(key, entries))
				.map_err(|e| CatalogError::InvalidDocument(e.to_string())),
			StorageFormat::Json => {
				if text.trim().is_empty() {
					return Ok(Catalog::with_entries(key, Default::default()));
				}
				let value: serde_json::Value = serde_json::from_str(text)
					.map_err(|e| CatalogError::InvalidDocument(e.to_string()))?;
				Catalog::from_json_value(key, &value)
			}
		}
	}
}

impl fmt::Display for StorageFormat {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.extension())
	}
}

impl FromStr for StorageFormat {
	type Err = CatalogError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"php" | "php_array" => Ok(StorageFormat::PhpArray),
			"json" => Ok(StorageFormat::Json),
			other => Err(CatalogError::InvalidDocument(format!(
				"unknown storage format '{other}'"
			))),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn json_format_round_trips() {
		let mut catalog = Catalog::new("de", "auth");
		catalog.set("a.b", "Grüße").unwrap();
		let text = StorageFormat::Json.render(&catalog);
		let back = StorageFormat::Json
			.parse(catalog.key().clone(), &text)
			.unwrap();
		assert_eq!(back, catalog);
	}

	#[test]
	fn format_names_parse() {
		assert_eq!("PHP".parse::<StorageFormat>().unwrap(), StorageFormat::PhpArray);
		assert_eq!("json".parse::<StorageFormat>().unwrap(), StorageFormat::Json);
		assert!("yaml".parse::<StorageFormat>().is_err());
	}
}
