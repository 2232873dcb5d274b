// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};

/// Definition of a tool offered to the agent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolDefinition {
	pub name: String,
	pub description: String,
	pub input_schema: serde_json::Value,
}

impl ToolDefinition {
	pub fn new(
		name: impl Into<String>,
		description: impl Into<String>,
		input_schema: serde_json::Value,
	) -> Self {
		let name = name.into();
		tracing::debug!(tool_name = %name, "creating tool definition");
		Self {
			name,
			description: description.into(),
			input_schema,
		}
	}
}

/// How the agent may pick among the offered tools.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolChoice {
	/// The agent decides whether to call a tool.
	Auto,
	/// The agent must call some tool.
	Any,
	/// The agent must call the named tool.
	Tool { name: String },
}

impl ToolChoice {
	pub fn forced(name: impl Into<String>) -> Self {
		ToolChoice::Tool { name: name.into() }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn forced_choice_serializes_with_name() {
		let json = serde_json::to_value(ToolChoice::forced("translate")).unwrap();
		assert_eq!(json, serde_json::json!({"type": "tool", "name": "translate"}));
	}

	#[test]
	fn auto_choice_serializes_bare() {
		let json = serde_json::to_value(ToolChoice::Auto).unwrap();
		assert_eq!(json, serde_json::json!({"type": "auto"}));
	}
}
