// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::catalog::{validate_name, Catalog, CatalogKey};
use crate::error::StoreError;
use crate::format::StorageFormat;

/// Directory names under the catalog root that are never languages.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &["vendor"];

/// Persistence for catalogs, addressed by `(language, domain)`.
#[async_trait]
pub trait CatalogStore: Send + Sync {
	/// Loads a catalog, or an empty one if it does not exist.
	async fn load(&self, language: &str, domain: &str) -> Result<Catalog, StoreError>;

	async fn exists(&self, language: &str, domain: &str) -> Result<bool, StoreError>;

	/// Replaces the stored catalog. Either the whole catalog is written or nothing is.
	async fn store(&self, catalog: &Catalog) -> Result<(), StoreError>;

	/// Known languages, sorted.
	async fn languages(&self) -> Result<Vec<String>, StoreError>;

	/// Domains stored for `language`, sorted.
	async fn domains(&self, language: &str) -> Result<Vec<String>, StoreError>;
}

/// Catalogs stored as `<root>/<language>/<domain>.<ext>`.
#[derive(Clone, Debug)]
pub struct FileStore {
	root: PathBuf,
	format: StorageFormat,
	excluded: Vec<String>,
}

impl FileStore {
	pub fn new(root: impl Into<PathBuf>, format: StorageFormat) -> Self {
		Self {
			root: root.into(),
			format,
			excluded: DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
		}
	}

	pub fn with_excluded(mut self, excluded: Vec<String>) -> Self {
		self.excluded = excluded;
		self
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn format(&self) -> StorageFormat {
		self.format
	}

	/// Path of a catalog file. Names that would leave the root are refused.
	pub fn path(&self, language: &str, domain: &str) -> Result<PathBuf, StoreError> {
		validate_name(language)?;
		validate_name(domain)?;
		Ok(self
			.root
			.join(language)
			.join(format!("{domain}.{}", self.format.extension())))
	}
}

#[async_trait]
impl CatalogStore for FileStore {
	async fn load(&self, language: &str, domain: &str) -> Result<Catalog, StoreError> {
		let path = self.path(language, domain)?;
		let key = CatalogKey::new(language, domain);

		let text = match tokio::fs::read_to_string(&path).await {
			Ok(text) => text,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				debug!(path = %path.display(), "catalog file not found, starting empty");
				return Ok(Catalog::with_entries(key, Default::default()));
			}
			Err(e) => return Err(StoreError::io(&path, e)),
		};

		let catalog = self
			.format
			.parse(key, &text)
			.map_err(|e| StoreError::parse(&path, e.to_string()))?;

		debug!(
				path = %path.display(),
				keys = catalog.len(),
				"loaded catalog"
		);
		Ok(catalog)
	}

	async fn exists(&self, language: &str, domain: &str) -> Result<bool, StoreError> {
		let path = self.path(language, domain)?;
		tokio::fs::try_exists(&path)
			.await
			.map_err(|e| StoreError::io(&path, e))
	}

	async fn store(&self, catalog: &Catalog) -> Result<(), StoreError> {
		let path = self.path(catalog.language(), catalog.domain())?;
		let dir = self.root.join(catalog.language());
		tokio::fs::create_dir_all(&dir)
			.await
			.map_err(|e| StoreError::io(&dir, e))?;

		let tmp_path = dir.join(format!(
			"{}.{}.tmp",
			catalog.domain(),
			self.format.extension()
		));
		let contents = catalog.to_storage_format(self.format);

		if let Err(e) = tokio::fs::write(&tmp_path, contents.as_bytes()).await {
			let _ = tokio::fs::remove_file(&tmp_path).await;
			return Err(StoreError::io(&tmp_path, e));
		}
		if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
			let _ = tokio::fs::remove_file(&tmp_path).await;
			return Err(StoreError::io(&path, e));
		}

		info!(
				path = %path.display(),
				keys = catalog.len(),
				"wrote catalog"
		);
		Ok(())
	}

	async fn languages(&self) -> Result<Vec<String>, StoreError> {
		let mut entries = match tokio::fs::read_dir(&self.root).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				warn!(root = %self.root.display(), "catalog root does not exist");
				return Ok(Vec::new());
			}
			Err(e) => return Err(StoreError::io(&self.root, e)),
		};

		let mut languages = BTreeSet::new();
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StoreError::io(&self.root, e))?
		{
			let is_dir = entry
				.file_type()
				.await
				.map(|t| t.is_dir())
				.unwrap_or(false);
			if !is_dir {
				continue;
			}
			let name = entry.file_name().to_string_lossy().into_owned();
			if name.starts_with('.') || self.excluded.iter().any(|x| x == &name) {
				continue;
			}
			languages.insert(name);
		}
		Ok(languages.into_iter().collect())
	}

	async fn domains(&self, language: &str) -> Result<Vec<String>, StoreError> {
		validate_name(language)?;
		let dir = self.root.join(language);
		let mut entries = match tokio::fs::read_dir(&dir).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(StoreError::io(&dir, e)),
		};

		let mut domains = BTreeSet::new();
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StoreError::io(&dir, e))?
		{
			let path = entry.path();
			if path.extension().and_then(|e| e.to_str()) != Some(self.format.extension()) {
				continue;
			}
			if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
				domains.insert(stem.to_string());
			}
		}
		Ok(domains.into_iter().collect())
	}
}

/// Catalogs kept in memory, for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
	catalogs: RwLock<BTreeMap<CatalogKey, Catalog>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_catalogs(catalogs: impl IntoIterator<Item = Catalog>) -> Self {
		Self {
			catalogs: RwLock::new(
				catalogs
					.into_iter()
					.map(|c| (c.key().clone(), c))
					.collect(),
			),
		}
	}

	/// Copy of the stored catalog, if any.
	pub async fn get(&self, language: &str, domain: &str) -> Option<Catalog> {
		self.catalogs
			.read()
			.await
			.get(&CatalogKey::new(language, domain))
			.cloned()
	}
}

#[async_trait]
impl CatalogStore for MemoryStore {
	async fn load(&self, language: &str, domain: &str) -> Result<Catalog, StoreError> {
		Ok(self
			.get(language, domain)
			.await
			.unwrap_or_else(|| Catalog::new(language, domain)))
	}

	async fn exists(&self, language: &str, domain: &str) -> Result<bool, StoreError> {
		Ok(self
			.catalogs
			.read()
			.await
			.contains_key(&CatalogKey::new(language, domain)))
	}

	async fn store(&self, catalog: &Catalog) -> Result<(), StoreError> {
		self.catalogs
			.write()
			.await
			.insert(catalog.key().clone(), catalog.clone());
		Ok(())
	}

	async fn languages(&self) -> Result<Vec<String>, StoreError> {
		let catalogs = self.catalogs.read().await;
		let languages: BTreeSet<String> = catalogs.keys().map(|k| k.language.clone()).collect();
		Ok(languages.into_iter().collect())
	}

	async fn domains(&self, language: &str) -> Result<Vec<String>, StoreError> {
		let catalogs = self.catalogs.read().await;
		Ok(catalogs
			.keys()
			.filter(|k| k.language == language)
			.map(|k| k.domain.clone())
			.collect())
	}
}
