// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration validation rules.

use tracing::warn;

use crate::runtime::BabelConfig;
use crate::ConfigError;

pub fn validate_config(config: &BabelConfig) -> Result<(), ConfigError> {
	validate_catalog(config)?;
	validate_provider(config)?;
	validate_sync(config)?;

	Ok(())
}

fn validate_catalog(config: &BabelConfig) -> Result<(), ConfigError> {
	let catalog = &config.catalog;

	if catalog.source_language.trim().is_empty() {
		return Err(ConfigError::invalid_value(
			"catalog.source_language",
			"cannot be empty",
		));
	}

	if catalog.languages.iter().any(|l| l.trim().is_empty()) {
		return Err(ConfigError::invalid_value(
			"catalog.languages",
			"cannot contain empty language codes",
		));
	}

	if catalog.languages.contains(&catalog.source_language) {
		warn!(
				source_language = %catalog.source_language,
				"source language is listed as a target and will be skipped"
		);
	}

	Ok(())
}

fn validate_provider(config: &BabelConfig) -> Result<(), ConfigError> {
	let provider = &config.provider;

	if provider.base_url.trim().is_empty() {
		return Err(ConfigError::invalid_value(
			"provider.base_url",
			"cannot be empty",
		));
	}

	if provider.api_key.is_none() {
		warn!("no Anthropic API key configured; commands that call the agent will fail");
	}

	if let Some(temperature) = config.sync.temperature {
		if !(0.0..=1.0).contains(&temperature) {
			return Err(ConfigError::invalid_value(
				"provider.temperature",
				"must be between 0.0 and 1.0",
			));
		}
	}

	if config.sync.max_tokens == 0 {
		return Err(ConfigError::invalid_value(
			"provider.max_tokens",
			"must be greater than 0",
		));
	}

	Ok(())
}

fn validate_sync(config: &BabelConfig) -> Result<(), ConfigError> {
	let sync = &config.sync;

	if sync.max_turns == 0 {
		return Err(ConfigError::invalid_value("sync.max_turns", "must be at least 1"));
	}

	if sync.max_concurrent_jobs == 0 {
		return Err(ConfigError::invalid_value(
			"sync.max_concurrent_jobs",
			"must be at least 1",
		));
	}

	if sync.max_tool_rounds == 0 {
		return Err(ConfigError::invalid_value(
			"sync.max_tool_rounds",
			"must be at least 1",
		));
	}

	if sync.rate_limit_backoff.is_zero() {
		warn!("rate_limit_backoff_secs is 0; capacity refusals will be retried immediately");
	}

	Ok(())
}
