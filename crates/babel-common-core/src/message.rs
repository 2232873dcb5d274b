// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};

/// Role of a message participant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	System,
	User,
	Assistant,
	Tool,
}

/// One entry of a conversation with the agent.
///
/// Tool results carry the id of the call they answer and whether the tool
/// failed, so providers can flag the result block as an error.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
	pub role: Role,
	pub content: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tool_call_id: Option<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub tool_calls: Vec<ToolCall>,
	#[serde(default, skip_serializing_if = "std::ops::Not::not")]
	pub is_error: bool,
}

impl Message {
	fn with_role(role: Role, content: impl Into<String>) -> Self {
		Self {
			role,
			content: content.into(),
			tool_call_id: None,
			tool_calls: Vec::new(),
			is_error: false,
		}
	}

	pub fn system(content: impl Into<String>) -> Self {
		Self::with_role(Role::System, content)
	}

	pub fn user(content: impl Into<String>) -> Self {
		Self::with_role(Role::User, content)
	}

	pub fn assistant(content: impl Into<String>) -> Self {
		Self::with_role(Role::Assistant, content)
	}

	pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
		Self {
			tool_calls,
			..Self::with_role(Role::Assistant, content)
		}
	}

	/// Successful result for the tool call `tool_call_id`.
	pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
		Self {
			tool_call_id: Some(tool_call_id.into()),
			..Self::with_role(Role::Tool, content)
		}
	}

	/// Failed result for the tool call `tool_call_id`.
	pub fn tool_error(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
		Self {
			is_error: true,
			..Self::tool_result(tool_call_id, content)
		}
	}
}

/// A tool call requested by the agent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCall {
	pub id: String,
	pub tool_name: String,
	pub arguments_json: serde_json::Value,
}
