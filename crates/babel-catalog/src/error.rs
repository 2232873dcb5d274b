// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by catalog lookups and mutations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
	#[error("key not found: {0}")]
	KeyNotFound(String),

	/// `set` would have turned a leaf into a subtree or the reverse.
	#[error("key '{path}' conflicts with existing entry '{existing}'")]
	LeafConflict { path: String, existing: String },

	#[error("invalid key path: '{0}'")]
	InvalidPath(String),

	/// A language or domain that is not a single path segment.
	#[error("invalid catalog name: '{0}'")]
	InvalidName(String),

	#[error("invalid catalog document: {0}")]
	InvalidDocument(String),
}

/// Errors raised by a backing store.
#[derive(Debug, Error)]
pub enum StoreError {
	#[error("I/O error on {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse {path}: {message}")]
	Parse { path: PathBuf, message: String },

	#[error(transparent)]
	Catalog(#[from] CatalogError),
}

impl StoreError {
	pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
		Self::Io {
			path: path.into(),
			source,
		}
	}

	pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
		Self::Parse {
			path: path.into(),
			message: message.into(),
		}
	}
}
