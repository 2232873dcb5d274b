// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";

/// Tuning for synchronization jobs and refinement sessions.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
	pub model: String,
	pub max_tokens: u32,
	pub temperature: Option<f32>,
	/// Agent turns allowed per attempt before giving up.
	pub max_turns: u32,
	#[serde(with = "duration_secs")]
	pub rate_limit_backoff: Duration,
	pub max_rate_limit_restarts: u32,
	/// Keep the partial result across a rate-limit restart instead of starting over.
	pub resume_after_rate_limit: bool,
	/// Write the partial result of a timed-out or aborted job.
	pub allow_incomplete: bool,
	pub max_concurrent_jobs: usize,
	/// What kind of product the catalogs belong to, used in the translator prompt.
	pub translator_context: String,
	/// Tool round trips allowed per human turn of a refinement session.
	pub max_tool_rounds: u32,
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			model: DEFAULT_MODEL.to_string(),
			max_tokens: 4096,
			temperature: None,
			max_turns: 10,
			rate_limit_backoff: Duration::from_secs(60),
			max_rate_limit_restarts: 3,
			resume_after_rate_limit: false,
			allow_incomplete: false,
			max_concurrent_jobs: 1,
			translator_context: "software".to_string(),
			max_tool_rounds: 8,
		}
	}
}

mod duration_secs {
	use serde::{Deserialize, Deserializer, Serialize, Serializer};
	use std::time::Duration;

	pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		duration.as_secs().serialize(serializer)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		let secs = u64::deserialize(deserializer)?;
		Ok(Duration::from_secs(secs))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_match_documented_values() {
		let config = SyncConfig::default();
		assert_eq!(config.max_turns, 10);
		assert_eq!(config.rate_limit_backoff, Duration::from_secs(60));
		assert_eq!(config.max_rate_limit_restarts, 3);
		assert!(!config.resume_after_rate_limit);
		assert_eq!(config.max_concurrent_jobs, 1);
	}

	#[test]
	fn partial_json_falls_back_to_defaults() {
		let config: SyncConfig =
			serde_json::from_str(r#"{"max_turns": 3, "rate_limit_backoff": 5}"#).unwrap();
		assert_eq!(config.max_turns, 3);
		assert_eq!(config.rate_limit_backoff, Duration::from_secs(5));
		assert_eq!(config.model, DEFAULT_MODEL);
	}
}
