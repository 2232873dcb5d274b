// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the babel command-line tool.
//!
//! Layers are merged lowest precedence first:
//! - built-in defaults
//! - `/etc/babel/config.toml`
//! - `$XDG_CONFIG_HOME/babel/config.toml`
//! - `./.babel/config.toml`
//! - a file passed with `--config`
//! - `BABEL_*` and `ANTHROPIC_API_KEY` environment variables
//! - command-line flags

pub mod error;
pub mod layer;
pub mod paths;
pub mod registry;
pub mod runtime;
pub mod sources;
pub mod validation;

pub use error::ConfigError;
pub use layer::ConfigLayer;
pub use paths::PathsConfig;
pub use registry::ConfigRegistry;
pub use runtime::{BabelConfig, CatalogConfig, LogFormat, LogLevel, LoggingConfig, ProviderConfig};
pub use sources::{CliOverrides, ConfigSource, Precedence};

/// Load configuration from files and the environment.
pub fn load_config() -> Result<BabelConfig, ConfigError> {
	load_config_with_cli(CliOverrides::default())
}

/// Load configuration with command-line overrides on top.
pub fn load_config_with_cli(cli: CliOverrides) -> Result<BabelConfig, ConfigError> {
	let paths = paths::resolve_xdg_paths()?;
	let mut registry = ConfigRegistry::new();

	registry.register(Box::new(sources::DefaultsSource));
	registry.register(Box::new(sources::FileSource::system()));
	registry.register(Box::new(sources::FileSource::user(&paths)));
	registry.register(Box::new(sources::FileSource::workspace(&paths)));
	if let Some(ref file) = cli.config_file {
		registry.register(Box::new(sources::FileSource::explicit(file.clone())));
	}
	registry.register(Box::new(sources::EnvSource));
	registry.register(Box::new(sources::CliSource::new(cli)));

	registry.load(paths)
}
