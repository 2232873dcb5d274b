// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Translation catalogs for Babel.
//!
//! A [`Catalog`] holds the texts of one logical file (a *domain*) in one
//! language as a nested tree. Leaves are addressed by dotted paths:
//!
//! ```
//! use babel_catalog::{diff, Catalog};
//!
//! let mut en = Catalog::new("en", "auth");
//! en.set("throttle.title", "Too many attempts").unwrap();
//! en.set("failed", "These credentials do not match our records.").unwrap();
//!
//! let de = Catalog::new("de", "auth");
//! let missing = diff(&en, &de);
//! assert_eq!(missing.len(), 2);
//! ```
//!
//! Catalogs are persisted through a [`CatalogStore`]; [`FileStore`] lays them
//! out as `<root>/<language>/<domain>.<ext>` in one of the [`StorageFormat`]s.

pub mod catalog;
pub mod diff;
pub mod error;
pub mod format;
pub mod php;
pub mod store;

pub use catalog::{validate_name, ApplyReport, Catalog, CatalogKey, Entry, PATH_SEPARATOR};
pub use diff::{diff, MissingKeySet};
pub use error::{CatalogError, StoreError};
pub use format::StorageFormat;
pub use store::{CatalogStore, FileStore, MemoryStore, DEFAULT_EXCLUDED_DIRS};
