// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration layer for merging from multiple sources.

use babel_common_core::SecretString;
use serde::Deserialize;
use std::path::PathBuf;

/// Partial configuration layer. Every field is optional so that a source only
/// overrides what it actually sets.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigLayer {
	#[serde(default)]
	pub catalog: Option<CatalogLayer>,
	#[serde(default)]
	pub provider: Option<ProviderLayer>,
	#[serde(default)]
	pub sync: Option<SyncLayer>,
	#[serde(default)]
	pub logging: Option<LoggingLayer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogLayer {
	#[serde(default)]
	pub lang_path: Option<PathBuf>,
	#[serde(default)]
	pub source_language: Option<String>,
	#[serde(default)]
	pub languages: Option<Vec<String>>,
	/// `php` or `json`.
	#[serde(default)]
	pub format: Option<String>,
	#[serde(default)]
	pub excluded_dirs: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderLayer {
	#[serde(default)]
	pub api_key: Option<SecretString>,
	#[serde(default)]
	pub base_url: Option<String>,
	#[serde(default)]
	pub model: Option<String>,
	#[serde(default)]
	pub max_tokens: Option<u32>,
	#[serde(default)]
	pub temperature: Option<f32>,
	#[serde(default)]
	pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncLayer {
	#[serde(default)]
	pub max_turns: Option<u32>,
	#[serde(default)]
	pub rate_limit_backoff_secs: Option<u64>,
	#[serde(default)]
	pub max_rate_limit_restarts: Option<u32>,
	#[serde(default)]
	pub resume_after_rate_limit: Option<bool>,
	#[serde(default)]
	pub allow_incomplete: Option<bool>,
	#[serde(default)]
	pub max_concurrent_jobs: Option<usize>,
	#[serde(default)]
	pub translator_context: Option<String>,
	#[serde(default)]
	pub max_tool_rounds: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingLayer {
	#[serde(default)]
	pub level: Option<String>,
	#[serde(default)]
	pub format: Option<String>,
}

impl ConfigLayer {
	/// Merge `other` on top of `self`; values set in `other` win.
	pub fn merge(&mut self, other: ConfigLayer) {
		merge_option(&mut self.catalog, other.catalog, CatalogLayer::merge);
		merge_option(&mut self.provider, other.provider, ProviderLayer::merge);
		merge_option(&mut self.sync, other.sync, SyncLayer::merge);
		merge_option(&mut self.logging, other.logging, LoggingLayer::merge);
	}

	pub fn catalog_mut(&mut self) -> &mut CatalogLayer {
		self.catalog.get_or_insert_with(Default::default)
	}

	pub fn provider_mut(&mut self) -> &mut ProviderLayer {
		self.provider.get_or_insert_with(Default::default)
	}

	pub fn sync_mut(&mut self) -> &mut SyncLayer {
		self.sync.get_or_insert_with(Default::default)
	}

	pub fn logging_mut(&mut self) -> &mut LoggingLayer {
		self.logging.get_or_insert_with(Default::default)
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

fn overwrite<T>(target: &mut Option<T>, source: Option<T>) {
	if source.is_some() {
		*target = source;
	}
}

impl CatalogLayer {
	fn merge(&mut self, other: CatalogLayer) {
		overwrite(&mut self.lang_path, other.lang_path);
		overwrite(&mut self.source_language, other.source_language);
		overwrite(&mut self.languages, other.languages);
		overwrite(&mut self.format, other.format);
		overwrite(&mut self.excluded_dirs, other.excluded_dirs);
	}
}

impl ProviderLayer {
	fn merge(&mut self, other: ProviderLayer) {
		overwrite(&mut self.api_key, other.api_key);
		overwrite(&mut self.base_url, other.base_url);
		overwrite(&mut self.model, other.model);
		overwrite(&mut self.max_tokens, other.max_tokens);
		overwrite(&mut self.temperature, other.temperature);
		overwrite(&mut self.timeout_secs, other.timeout_secs);
	}
}

impl SyncLayer {
	fn merge(&mut self, other: SyncLayer) {
		overwrite(&mut self.max_turns, other.max_turns);
		overwrite(&mut self.rate_limit_backoff_secs, other.rate_limit_backoff_secs);
		overwrite(&mut self.max_rate_limit_restarts, other.max_rate_limit_restarts);
		overwrite(&mut self.resume_after_rate_limit, other.resume_after_rate_limit);
		overwrite(&mut self.allow_incomplete, other.allow_incomplete);
		overwrite(&mut self.max_concurrent_jobs, other.max_concurrent_jobs);
		overwrite(&mut self.translator_context, other.translator_context);
		overwrite(&mut self.max_tool_rounds, other.max_tool_rounds);
	}
}

impl LoggingLayer {
	fn merge(&mut self, other: LoggingLayer) {
		overwrite(&mut self.level, other.level);
		overwrite(&mut self.format, other.format);
	}
}
