// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: files, environment, CLI, defaults.

use std::path::PathBuf;
use std::str::FromStr;

use babel_common_core::SecretString;
use tracing::{debug, trace};

use crate::layer::ConfigLayer;
use crate::paths::{self, PathsConfig};
use crate::ConfigError;

const ENV_PREFIX: &str = "BABEL_";

/// Source precedence levels (higher overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	SystemFile = 20,
	UserFile = 30,
	WorkspaceFile = 40,
	/// A file named with `--config`.
	ExplicitFile = 45,
	Environment = 50,
	Cli = 60,
}

pub trait ConfigSource: Send + Sync {
	/// Name for logging
	fn name(&self) -> &'static str;

	fn precedence(&self) -> Precedence;

	fn load(&self) -> Result<ConfigLayer, ConfigError>;
}

/// Built-in defaults. Values are filled in by the runtime config.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ConfigLayer::default())
	}
}

/// TOML config file.
pub struct FileSource {
	path: PathBuf,
	precedence: Precedence,
	name: &'static str,
	required: bool,
}

impl FileSource {
	/// `/etc/babel/config.toml`
	pub fn system() -> Self {
		Self::custom(paths::system_config_path(), Precedence::SystemFile, "system-config")
	}

	/// `$XDG_CONFIG_HOME/babel/config.toml`
	pub fn user(paths: &PathsConfig) -> Self {
		Self::custom(
			paths.user_config_file.clone(),
			Precedence::UserFile,
			"user-config",
		)
	}

	/// `./.babel/config.toml`
	pub fn workspace(paths: &PathsConfig) -> Self {
		Self::custom(
			paths.workspace_config_file.clone(),
			Precedence::WorkspaceFile,
			"workspace-config",
		)
	}

	/// A file the user asked for by name. Unlike the well-known locations it
	/// must exist.
	pub fn explicit(path: PathBuf) -> Self {
		Self {
			required: true,
			..Self::custom(path, Precedence::ExplicitFile, "explicit-config")
		}
	}

	pub fn custom(path: PathBuf, precedence: Precedence, name: &'static str) -> Self {
		Self {
			path,
			precedence,
			name,
			required: false,
		}
	}
}

impl ConfigSource for FileSource {
	fn name(&self) -> &'static str {
		self.name
	}

	fn precedence(&self) -> Precedence {
		self.precedence
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		if !self.path.exists() {
			if self.required {
				return Err(ConfigError::FileNotFound(self.path.clone()));
			}
			debug!(path = %self.path.display(), source = self.name, "config file not found, skipping");
			return Ok(ConfigLayer::default());
		}

		debug!(path = %self.path.display(), source = self.name, "loading config file");
		let content = std::fs::read_to_string(&self.path)?;
		let layer: ConfigLayer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!(source = self.name, "parsed config layer");
		Ok(layer)
	}
}

/// Environment variables: `BABEL_<FIELD>` plus the conventional
/// `ANTHROPIC_API_KEY`.
pub struct EnvSource;

impl EnvSource {
	/// Build a layer from an explicit set of variables.
	pub fn layer_from_vars<I>(vars: I) -> Result<ConfigLayer, ConfigError>
	where
		I: IntoIterator<Item = (String, String)>,
	{
		let mut layer = ConfigLayer::default();
		let mut fallback_key = None;

		for (key, value) in vars {
			let value = value.trim().to_string();
			if value.is_empty() {
				continue;
			}

			if key == "ANTHROPIC_API_KEY" {
				fallback_key = Some(SecretString::new(value));
				continue;
			}
			if !key.starts_with(ENV_PREFIX) {
				continue;
			}

			trace!(key = %key, "processing env var");

			match key.as_str() {
				"BABEL_LANG_PATH" => layer.catalog_mut().lang_path = Some(PathBuf::from(value)),
				"BABEL_SOURCE_LANGUAGE" => layer.catalog_mut().source_language = Some(value),
				"BABEL_LANGUAGES" => layer.catalog_mut().languages = Some(split_list(&value)),
				"BABEL_FORMAT" => layer.catalog_mut().format = Some(value),
				"BABEL_EXCLUDED_DIRS" => {
					layer.catalog_mut().excluded_dirs = Some(split_list(&value));
				}

				"BABEL_ANTHROPIC_API_KEY" => {
					trace!("loaded Anthropic API key from environment");
					layer.provider_mut().api_key = Some(SecretString::new(value));
				}
				"BABEL_ANTHROPIC_BASE_URL" => layer.provider_mut().base_url = Some(value),
				"BABEL_MODEL" => layer.provider_mut().model = Some(value),
				"BABEL_MAX_TOKENS" => layer.provider_mut().max_tokens = Some(parse(&key, &value)?),
				"BABEL_TEMPERATURE" => layer.provider_mut().temperature = Some(parse(&key, &value)?),
				"BABEL_TIMEOUT_SECS" => layer.provider_mut().timeout_secs = Some(parse(&key, &value)?),

				"BABEL_MAX_TURNS" => layer.sync_mut().max_turns = Some(parse(&key, &value)?),
				"BABEL_RATE_LIMIT_BACKOFF_SECS" => {
					layer.sync_mut().rate_limit_backoff_secs = Some(parse(&key, &value)?);
				}
				"BABEL_MAX_RATE_LIMIT_RESTARTS" => {
					layer.sync_mut().max_rate_limit_restarts = Some(parse(&key, &value)?);
				}
				"BABEL_RESUME_AFTER_RATE_LIMIT" => {
					layer.sync_mut().resume_after_rate_limit = Some(parse_bool(&key, &value)?);
				}
				"BABEL_ALLOW_INCOMPLETE" => {
					layer.sync_mut().allow_incomplete = Some(parse_bool(&key, &value)?);
				}
				"BABEL_MAX_CONCURRENT_JOBS" => {
					layer.sync_mut().max_concurrent_jobs = Some(parse(&key, &value)?);
				}
				"BABEL_TRANSLATOR_CONTEXT" => layer.sync_mut().translator_context = Some(value),

				"BABEL_LOG_LEVEL" => layer.logging_mut().level = Some(value),
				"BABEL_LOG_FORMAT" => layer.logging_mut().format = Some(value),

				_ => {}
			}
		}

		// The prefixed variable wins over the conventional one.
		if let Some(key) = fallback_key {
			let provider = layer.provider_mut();
			if provider.api_key.is_none() {
				trace!("loaded Anthropic API key from ANTHROPIC_API_KEY");
				provider.api_key = Some(key);
			}
		}

		Ok(layer)
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Self::layer_from_vars(std::env::vars())
	}
}

fn split_list(value: &str) -> Vec<String> {
	value
		.split(',')
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.map(String::from)
		.collect()
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
	value
		.parse()
		.map_err(|_| ConfigError::Env(format!("{key}: cannot parse '{value}'")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
	match value.to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		_ => Err(ConfigError::Env(format!("{key}: expected a boolean, got '{value}'"))),
	}
}

/// CLI argument overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
	pub config_file: Option<PathBuf>,
	pub lang_path: Option<PathBuf>,
	pub source_language: Option<String>,
	pub model: Option<String>,
	pub allow_incomplete: Option<bool>,
	pub log_level: Option<String>,
	pub log_format: Option<String>,
}

pub struct CliSource {
	overrides: CliOverrides,
}

impl CliSource {
	pub fn new(overrides: CliOverrides) -> Self {
		Self { overrides }
	}
}

impl ConfigSource for CliSource {
	fn name(&self) -> &'static str {
		"cli"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Cli
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading CLI overrides");
		let overrides = &self.overrides;
		let mut layer = ConfigLayer::default();

		if let Some(ref lang_path) = overrides.lang_path {
			layer.catalog_mut().lang_path = Some(lang_path.clone());
		}
		if let Some(ref language) = overrides.source_language {
			layer.catalog_mut().source_language = Some(language.clone());
		}
		if let Some(ref model) = overrides.model {
			layer.provider_mut().model = Some(model.clone());
		}
		if let Some(allow) = overrides.allow_incomplete {
			layer.sync_mut().allow_incomplete = Some(allow);
		}
		if let Some(ref level) = overrides.log_level {
			layer.logging_mut().level = Some(level.clone());
		}
		if let Some(ref format) = overrides.log_format {
			layer.logging_mut().format = Some(format.clone());
		}

		Ok(layer)
	}
}
