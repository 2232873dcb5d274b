// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Runtime configuration types with resolved defaults.

use babel_catalog::{StorageFormat, DEFAULT_EXCLUDED_DIRS};
use babel_common_core::SecretString;
use babel_sync::SyncConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::layer::*;
use crate::paths::PathsConfig;
use crate::ConfigError;

pub const DEFAULT_LANG_PATH: &str = "lang";
pub const DEFAULT_SOURCE_LANGUAGE: &str = "en";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// The final, validated configuration for babel.
#[derive(Debug, Clone, Serialize)]
pub struct BabelConfig {
	pub catalog: CatalogConfig,
	pub provider: ProviderConfig,
	pub sync: SyncConfig,
	pub logging: LoggingConfig,

	#[serde(skip)]
	pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogConfig {
	/// Root of the `<language>/<domain>.<ext>` tree.
	pub lang_path: PathBuf,
	pub source_language: String,
	/// Target languages. Empty means every language directory in the store.
	pub languages: Vec<String>,
	pub format: StorageFormat,
	pub excluded_dirs: Vec<String>,
}

impl Default for CatalogConfig {
	fn default() -> Self {
		Self {
			lang_path: PathBuf::from(DEFAULT_LANG_PATH),
			source_language: DEFAULT_SOURCE_LANGUAGE.to_string(),
			languages: Vec::new(),
			format: StorageFormat::default(),
			excluded_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
		}
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderConfig {
	pub api_key: Option<SecretString>,
	pub base_url: String,
	#[serde(with = "duration_secs")]
	pub timeout: Duration,
}

impl Default for ProviderConfig {
	fn default() -> Self {
		Self {
			api_key: None,
			base_url: DEFAULT_BASE_URL.to_string(),
			timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
		}
	}
}

mod duration_secs {
	use serde::Serializer;
	use std::time::Duration;

	pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_u64(duration.as_secs())
	}
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoggingConfig {
	pub level: LogLevel,
	pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
	Error,
	Warn,
	#[default]
	Info,
	Debug,
	Trace,
}

impl LogLevel {
	pub fn as_str(self) -> &'static str {
		match self {
			LogLevel::Error => "error",
			LogLevel::Warn => "warn",
			LogLevel::Info => "info",
			LogLevel::Debug => "debug",
			LogLevel::Trace => "trace",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	#[default]
	Pretty,
	Json,
	Compact,
}

impl BabelConfig {
	/// Build runtime config from a merged layer and paths.
	pub fn from_layer(layer: ConfigLayer, paths: PathsConfig) -> Result<Self, ConfigError> {
		let catalog = build_catalog_config(layer.catalog)?;
		let (provider, sync) = build_provider_and_sync(layer.provider, layer.sync);
		let logging = build_logging_config(layer.logging)?;

		Ok(Self {
			catalog,
			provider,
			sync,
			logging,
			paths,
		})
	}
}

fn build_catalog_config(layer: Option<CatalogLayer>) -> Result<CatalogConfig, ConfigError> {
	let layer = layer.unwrap_or_default();
	let defaults = CatalogConfig::default();

	let format = match layer.format {
		Some(format) => format
			.parse::<StorageFormat>()
			.map_err(|e| ConfigError::invalid_value("catalog.format", e.to_string()))?,
		None => defaults.format,
	};

	Ok(CatalogConfig {
		lang_path: layer.lang_path.unwrap_or(defaults.lang_path),
		source_language: layer.source_language.unwrap_or(defaults.source_language),
		languages: layer.languages.unwrap_or(defaults.languages),
		format,
		excluded_dirs: layer.excluded_dirs.unwrap_or(defaults.excluded_dirs),
	})
}

/// The model settings live under `[provider]` in files but travel with the
/// sync tuning at runtime.
fn build_provider_and_sync(
	provider: Option<ProviderLayer>,
	sync: Option<SyncLayer>,
) -> (ProviderConfig, SyncConfig) {
	let provider = provider.unwrap_or_default();
	let layer = sync.unwrap_or_default();
	let defaults = SyncConfig::default();

	let sync = SyncConfig {
		model: provider.model.unwrap_or(defaults.model),
		max_tokens: provider.max_tokens.unwrap_or(defaults.max_tokens),
		temperature: provider.temperature.or(defaults.temperature),
		max_turns: layer.max_turns.unwrap_or(defaults.max_turns),
		rate_limit_backoff: layer
			.rate_limit_backoff_secs
			.map(Duration::from_secs)
			.unwrap_or(defaults.rate_limit_backoff),
		max_rate_limit_restarts: layer
			.max_rate_limit_restarts
			.unwrap_or(defaults.max_rate_limit_restarts),
		resume_after_rate_limit: layer
			.resume_after_rate_limit
			.unwrap_or(defaults.resume_after_rate_limit),
		allow_incomplete: layer.allow_incomplete.unwrap_or(defaults.allow_incomplete),
		max_concurrent_jobs: layer
			.max_concurrent_jobs
			.unwrap_or(defaults.max_concurrent_jobs),
		translator_context: layer
			.translator_context
			.unwrap_or(defaults.translator_context),
		max_tool_rounds: layer.max_tool_rounds.unwrap_or(defaults.max_tool_rounds),
	};

	let provider = ProviderConfig {
		api_key: provider.api_key.filter(|key| !key.is_empty()),
		base_url: provider
			.base_url
			.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
		timeout: Duration::from_secs(provider.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
	};

	(provider, sync)
}

fn build_logging_config(layer: Option<LoggingLayer>) -> Result<LoggingConfig, ConfigError> {
	let layer = layer.unwrap_or_default();
	Ok(LoggingConfig {
		level: parse_log_level(layer.level.as_deref())?,
		format: parse_log_format(layer.format.as_deref())?,
	})
}

pub fn parse_log_level(s: Option<&str>) -> Result<LogLevel, ConfigError> {
	match s.map(str::to_ascii_lowercase).as_deref() {
		None => Ok(LogLevel::Info),
		Some("error") => Ok(LogLevel::Error),
		Some("warn") | Some("warning") => Ok(LogLevel::Warn),
		Some("info") => Ok(LogLevel::Info),
		Some("debug") => Ok(LogLevel::Debug),
		Some("trace") => Ok(LogLevel::Trace),
		Some(other) => Err(ConfigError::invalid_value(
			"logging.level",
			format!("unknown level '{other}'"),
		)),
	}
}

pub fn parse_log_format(s: Option<&str>) -> Result<LogFormat, ConfigError> {
	match s.map(str::to_ascii_lowercase).as_deref() {
		None => Ok(LogFormat::Pretty),
		Some("pretty") => Ok(LogFormat::Pretty),
		Some("json") => Ok(LogFormat::Json),
		Some("compact") => Ok(LogFormat::Compact),
		Some(other) => Err(ConfigError::invalid_value(
			"logging.format",
			format!("unknown format '{other}'"),
		)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_layer_resolves_to_defaults() {
		let config = BabelConfig::from_layer(ConfigLayer::default(), PathsConfig::default()).unwrap();

		assert_eq!(config.catalog.lang_path, PathBuf::from("lang"));
		assert_eq!(config.catalog.source_language, "en");
		assert_eq!(config.catalog.format, StorageFormat::PhpArray);
		assert_eq!(config.catalog.excluded_dirs, vec!["vendor"]);
		assert!(config.provider.api_key.is_none());
		assert_eq!(config.provider.base_url, DEFAULT_BASE_URL);
		assert_eq!(config.sync.model, babel_sync::DEFAULT_MODEL);
		assert_eq!(config.sync.max_turns, 10);
		assert_eq!(config.logging.level, LogLevel::Info);
		assert_eq!(config.logging.format, LogFormat::Pretty);
	}

	#[test]
	fn provider_model_flows_into_sync_config() {
		let mut layer = ConfigLayer::default();
		layer.provider_mut().model = Some("claude-3-5-sonnet-latest".to_string());
		layer.provider_mut().temperature = Some(0.2);
		layer.sync_mut().rate_limit_backoff_secs = Some(5);

		let config = BabelConfig::from_layer(layer, PathsConfig::default()).unwrap();

		assert_eq!(config.sync.model, "claude-3-5-sonnet-latest");
		assert_eq!(config.sync.temperature, Some(0.2));
		assert_eq!(config.sync.rate_limit_backoff, Duration::from_secs(5));
	}

	#[test]
	fn empty_api_key_counts_as_unset() {
		let mut layer = ConfigLayer::default();
		layer.provider_mut().api_key = Some(SecretString::new(""));

		let config = BabelConfig::from_layer(layer, PathsConfig::default()).unwrap();
		assert!(config.provider.api_key.is_none());
	}

	#[test]
	fn unknown_format_is_rejected() {
		let mut layer = ConfigLayer::default();
		layer.catalog_mut().format = Some("yaml".to_string());

		let err = BabelConfig::from_layer(layer, PathsConfig::default()).unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "catalog.format"));
	}

	#[test]
	fn log_level_parsing_is_case_insensitive() {
		assert_eq!(parse_log_level(Some("DEBUG")).unwrap(), LogLevel::Debug);
		assert_eq!(parse_log_level(Some("warning")).unwrap(), LogLevel::Warn);
		assert!(parse_log_level(Some("loud")).is_err());
		assert_eq!(parse_log_format(Some("Json")).unwrap(), LogFormat::Json);
	}

	#[test]
	fn serialized_config_redacts_api_key() {
		let mut layer = ConfigLayer::default();
		layer.provider_mut().api_key = Some(SecretString::new("sk-ant-live"));

		let config = BabelConfig::from_layer(layer, PathsConfig::default()).unwrap();
		let rendered = toml::to_string(&config).unwrap();

		assert!(!rendered.contains("sk-ant-live"));
		assert!(!format!("{config:?}").contains("sk-ant-live"));
	}
}
