// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wiring shared by every command: store, agent, engine and scope selection.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use babel_catalog::{CatalogStore, FileStore};
use babel_cli_config::BabelConfig;
use babel_common_core::LlmClient;
use babel_llm_anthropic::{AnthropicClient, AnthropicConfig};
use babel_sync::Engine;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub struct App {
	config: BabelConfig,
	store: Arc<dyn CatalogStore>,
	cancel: CancellationToken,
}

impl App {
	pub fn new(config: BabelConfig) -> Self {
		let catalog = &config.catalog;
		let store = FileStore::new(&catalog.lang_path, catalog.format)
			.with_excluded(catalog.excluded_dirs.clone());
		Self::with_store(config, Arc::new(store))
	}

	pub fn with_store(config: BabelConfig, store: Arc<dyn CatalogStore>) -> Self {
		Self {
			config,
			store,
			cancel: CancellationToken::new(),
		}
	}

	pub fn source_language(&self) -> &str {
		&self.config.catalog.source_language
	}

	pub fn cancellation_token(&self) -> CancellationToken {
		self.cancel.clone()
	}

	/// Cancel running jobs on the first Ctrl-C.
	pub fn cancel_on_ctrl_c(&self) {
		let cancel = self.cancel.clone();
		tokio::spawn(async move {
			if tokio::signal::ctrl_c().await.is_ok() {
				warn!("interrupted, cancelling running jobs");
				cancel.cancel();
			}
		});
	}

	fn agent(&self, require_key: bool) -> Result<Arc<dyn LlmClient>> {
		let provider = &self.config.provider;
		let api_key = match &provider.api_key {
			Some(key) => key.expose().to_string(),
			None if require_key => bail!(
				"no Anthropic API key configured; set ANTHROPIC_API_KEY or [provider].api_key"
			),
			None => String::new(),
		};

		let config = AnthropicConfig::new(api_key)
			.with_base_url(provider.base_url.clone())
			.with_model(self.config.sync.model.clone())
			.with_timeout(provider.timeout);
		let client = AnthropicClient::new(config).context("failed to create Anthropic client")?;
		Ok(Arc::new(client))
	}

	/// Engine that talks to the translator.
	pub fn engine(&self) -> Result<Engine> {
		let agent = self.agent(true)?;
		Ok(Engine::new(agent, self.store.clone(), self.config.sync.clone())
			.with_cancellation(self.cancel.clone()))
	}

	/// Engine for read-only reports, which never reach the translator and so
	/// work without an API key.
	pub fn offline_engine(&self) -> Result<Engine> {
		let agent = self.agent(false)?;
		Ok(Engine::new(agent, self.store.clone(), self.config.sync.clone())
			.with_cancellation(self.cancel.clone()))
	}

	/// Target languages: the explicit list, else the configured list, else
	/// every language directory in the store. The source and skipped
	/// languages are removed.
	pub async fn target_languages(&self, explicit: &[String], skip: &[String]) -> Result<Vec<String>> {
		let candidates = if !explicit.is_empty() {
			explicit.to_vec()
		} else if !self.config.catalog.languages.is_empty() {
			self.config.catalog.languages.clone()
		} else {
			self
				.store
				.languages()
				.await
				.context("failed to list languages")?
		};

		let languages = select(candidates, skip, Some(self.source_language()));
		debug!(languages = ?languages, "resolved target languages");
		Ok(languages)
	}

	/// Domains: the explicit list, else every catalog of the source language.
	pub async fn domains(&self, explicit: &[String], skip: &[String]) -> Result<Vec<String>> {
		let candidates = if !explicit.is_empty() {
			explicit.to_vec()
		} else {
			let source = self.source_language();
			let domains = self
				.store
				.domains(source)
				.await
				.with_context(|| format!("failed to list catalogs of '{source}'"))?;
			if domains.is_empty() {
				bail!(
					"no catalogs found for source language '{source}' under {}",
					self.config.catalog.lang_path.display()
				);
			}
			domains
		};

		let domains = select(candidates, skip, None);
		debug!(domains = ?domains, "resolved domains");
		Ok(domains)
	}
}

/// Trim, drop blanks, skipped names and `exclude`, keep first occurrences.
fn select(candidates: Vec<String>, skip: &[String], exclude: Option<&str>) -> Vec<String> {
	let mut selected: Vec<String> = Vec::with_capacity(candidates.len());
	for name in candidates {
		let name = name.trim();
		if name.is_empty()
			|| Some(name) == exclude
			|| skip.iter().any(|s| s == name)
			|| selected.iter().any(|s| s == name)
		{
			continue;
		}
		selected.push(name.to_string());
	}
	selected
}
