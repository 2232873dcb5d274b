// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! XDG Base Directory compliant path resolution.

use std::path::{Path, PathBuf};

use crate::ConfigError;

const APP_DIR: &str = "babel";
const CONFIG_FILE: &str = "config.toml";

/// Where babel looks for its config files.
#[derive(Debug, Clone)]
pub struct PathsConfig {
	/// `$XDG_CONFIG_HOME/babel/config.toml`
	pub user_config_file: PathBuf,
	/// `/etc/babel/config.toml`
	pub system_config_file: PathBuf,
	/// `./.babel/config.toml` relative to the working directory.
	pub workspace_config_file: PathBuf,
}

impl PathsConfig {
	pub fn config_dir(&self) -> PathBuf {
		self
			.user_config_file
			.parent()
			.map(Path::to_path_buf)
			.unwrap_or_else(|| self.user_config_file.clone())
	}
}

impl Default for PathsConfig {
	fn default() -> Self {
		Self {
			user_config_file: PathBuf::from("~/.config/babel/config.toml"),
			system_config_file: system_config_path(),
			workspace_config_file: PathBuf::from(".babel/config.toml"),
		}
	}
}

pub fn system_config_path() -> PathBuf {
	Path::new("/etc").join(APP_DIR).join(CONFIG_FILE)
}

/// Resolve the config file locations, honouring `XDG_CONFIG_HOME`.
pub fn resolve_xdg_paths() -> Result<PathsConfig, ConfigError> {
	let config_home = match std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
		Some(dir) => PathBuf::from(dir),
		None => dirs::home_dir()
			.ok_or(ConfigError::HomeDirNotFound)?
			.join(".config"),
	};

	tracing::debug!(config_home = %config_home.display(), "resolved XDG paths");

	Ok(PathsConfig {
		user_config_file: config_home.join(APP_DIR).join(CONFIG_FILE),
		system_config_file: system_config_path(),
		workspace_config_file: workspace_config_path()?,
	})
}

pub fn workspace_config_path() -> Result<PathBuf, ConfigError> {
	let cwd = std::env::current_dir()?;
	Ok(cwd.join(format!(".{APP_DIR}")).join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn system_config_is_under_etc() {
		assert_eq!(system_config_path(), PathBuf::from("/etc/babel/config.toml"));
	}

	#[test]
	fn workspace_config_is_hidden_dir_in_cwd() {
		let path = workspace_config_path().unwrap();
		assert!(path.ends_with(".babel/config.toml"));
		assert!(path.is_absolute());
	}

	#[test]
	fn config_dir_is_parent_of_user_file() {
		let paths = PathsConfig {
			user_config_file: PathBuf::from("/home/u/.config/babel/config.toml"),
			..PathsConfig::default()
		};
		assert_eq!(paths.config_dir(), PathBuf::from("/home/u/.config/babel"));
	}
}
