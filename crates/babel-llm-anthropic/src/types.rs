// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Anthropic-specific API types and conversions.

use std::time::Duration;

use babel_common_core::{
	LlmError, LlmRequest, LlmResponse, Message, Role, SecretString, ToolCall, ToolChoice, Usage,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Configuration for the Anthropic client.
#[derive(Clone, Debug)]
pub struct AnthropicConfig {
	pub api_key: SecretString,
	pub base_url: String,
	pub model: String,
	/// Upper bound for one HTTP exchange, streaming included.
	pub timeout: Duration,
}

impl AnthropicConfig {
	pub fn new(api_key: impl Into<String>) -> Self {
		Self {
			api_key: SecretString::new(api_key),
			base_url: DEFAULT_BASE_URL.to_string(),
			model: DEFAULT_MODEL.to_string(),
			timeout: Duration::from_secs(300),
		}
	}

	pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = base_url.into().trim_end_matches('/').to_string();
		self
	}

	pub fn with_model(mut self, model: impl Into<String>) -> Self {
		self.model = model.into();
		self
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}
}

/// Anthropic Messages API request.
#[derive(Debug, Clone, Serialize)]
pub struct AnthropicRequest {
	pub model: String,
	pub messages: Vec<AnthropicMessage>,
	pub max_tokens: u32,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub system: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub temperature: Option<f32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tools: Option<Vec<AnthropicTool>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tool_choice: Option<ToolChoice>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub stream: Option<bool>,
}

/// A message in the Anthropic conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicMessage {
	pub role: String,
	pub content: AnthropicMessageContent,
}

/// Content can be a string or a list of content blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnthropicMessageContent {
	Text(String),
	Blocks(Vec<AnthropicContent>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AnthropicContent {
	#[serde(rename = "text")]
	Text { text: String },
	#[serde(rename = "tool_use")]
	ToolUse(AnthropicToolUse),
	#[serde(rename = "tool_result")]
	ToolResult(AnthropicToolResult),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicToolUse {
	pub id: String,
	pub name: String,
	pub input: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicToolResult {
	pub tool_use_id: String,
	pub content: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub is_error: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnthropicTool {
	pub name: String,
	pub description: String,
	pub input_schema: serde_json::Value,
}

/// Response from Anthropic Messages API.
#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicResponse {
	pub id: String,
	pub content: Vec<AnthropicResponseContent>,
	pub model: String,
	pub stop_reason: Option<String>,
	pub usage: AnthropicUsage,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum AnthropicResponseContent {
	#[serde(rename = "text")]
	Text { text: String },
	#[serde(rename = "tool_use")]
	ToolUse {
		id: String,
		name: String,
		input: serde_json::Value,
	},
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicUsage {
	pub input_tokens: u32,
	pub output_tokens: u32,
}

/// Error body returned by the Messages API.
#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicError {
	pub error: AnthropicErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicErrorDetail {
	#[serde(rename = "type")]
	pub error_type: String,
	pub message: String,
}

/// Error types the API uses when it refuses a request for lack of capacity.
pub const CAPACITY_ERROR_TYPES: &[&str] = &["rate_limit_error", "overloaded_error"];

/// Maps a failed exchange onto the agent error kinds the engine branches on.
pub fn classify_error(
	status: u16,
	error_type: Option<&str>,
	message: String,
	retry_after_secs: Option<u64>,
) -> LlmError {
	let capacity = matches!(status, 429 | 529)
		|| error_type.is_some_and(|t| CAPACITY_ERROR_TYPES.contains(&t));
	if capacity {
		return LlmError::RateLimited { retry_after_secs };
	}
	match status {
		400 => LlmError::InvalidRequest(message),
		_ => LlmError::Api(format!("{status}: {message}")),
	}
}

impl From<&LlmRequest> for AnthropicRequest {
	fn from(req: &LlmRequest) -> Self {
		let mut system: Option<String> = None;
		let mut messages: Vec<AnthropicMessage> = Vec::new();

		for msg in &req.messages {
			match msg.role {
				Role::System => {
					system = Some(match system {
						Some(existing) => format!("{existing}\n\n{}", msg.content),
						None => msg.content.clone(),
					});
				}
				Role::User => push_user_text(&mut messages, msg),
				Role::Assistant => messages.push(assistant_message(msg)),
				Role::Tool => push_tool_result(&mut messages, msg),
			}
		}

		let tools = if req.tools.is_empty() {
			None
		} else {
			Some(
				req
					.tools
					.iter()
					.map(|t| AnthropicTool {
						name: t.name.clone(),
						description: t.description.clone(),
						input_schema: t.input_schema.clone(),
					})
					.collect(),
			)
		};

		AnthropicRequest {
			model: req.model.clone(),
			messages,
			max_tokens: req.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
			system,
			temperature: req.temperature,
			tool_choice: tools.as_ref().and(req.tool_choice.clone()),
			tools,
			stream: None,
		}
	}
}

fn assistant_message(msg: &Message) -> AnthropicMessage {
	if msg.tool_calls.is_empty() {
		return AnthropicMessage {
			role: "assistant".to_string(),
			content: AnthropicMessageContent::Text(msg.content.clone()),
		};
	}

	let mut blocks: Vec<AnthropicContent> = Vec::new();
	if !msg.content.is_empty() {
		blocks.push(AnthropicContent::Text {
			text: msg.content.clone(),
		});
	}
	for tc in &msg.tool_calls {
		blocks.push(AnthropicContent::ToolUse(AnthropicToolUse {
			id: tc.id.clone(),
			name: tc.tool_name.clone(),
			input: tc.arguments_json.clone(),
		}));
	}
	AnthropicMessage {
		role: "assistant".to_string(),
		content: AnthropicMessageContent::Blocks(blocks),
	}
}

/// Results of one assistant turn must travel in a single user message, so
/// consecutive tool results are folded together.
fn push_tool_result(messages: &mut Vec<AnthropicMessage>, msg: &Message) {
	let Some(tool_call_id) = &msg.tool_call_id else {
		return;
	};
	let block = AnthropicContent::ToolResult(AnthropicToolResult {
		tool_use_id: tool_call_id.clone(),
		content: msg.content.clone(),
		is_error: msg.is_error.then_some(true),
	});

	if let Some(AnthropicMessage {
		role,
		content: AnthropicMessageContent::Blocks(blocks),
	}) = messages.last_mut()
	{
		if role.as_str() == "user" {
			blocks.push(block);
			return;
		}
	}
	messages.push(AnthropicMessage {
		role: "user".to_string(),
		content: AnthropicMessageContent::Blocks(vec![block]),
	});
}

/// A user text right after tool results joins their message; the API
/// rejects two user messages in a row.
fn push_user_text(messages: &mut Vec<AnthropicMessage>, msg: &Message) {
	if let Some(AnthropicMessage {
		role,
		content: AnthropicMessageContent::Blocks(blocks),
	}) = messages.last_mut()
	{
		if role.as_str() == "user" {
			blocks.push(AnthropicContent::Text {
				text: msg.content.clone(),
			});
			return;
		}
	}
	messages.push(AnthropicMessage {
		role: "user".to_string(),
		content: AnthropicMessageContent::Text(msg.content.clone()),
	});
}

impl TryFrom<AnthropicResponse> for LlmResponse {
	type Error = LlmError;

	fn try_from(resp: AnthropicResponse) -> Result<Self, Self::Error> {
		let mut content = String::new();
		let mut tool_calls = Vec::new();

		for block in resp.content {
			match block {
				AnthropicResponseContent::Text { text } => {
					content.push_str(&text);
				}
				AnthropicResponseContent::ToolUse { id, name, input } => {
					tool_calls.push(ToolCall {
						id,
						tool_name: name,
						arguments_json: input,
					});
				}
			}
		}

		Ok(LlmResponse {
			message: Message::assistant_with_tool_calls(content, tool_calls.clone()),
			tool_calls,
			finish_reason: resp.stop_reason,
			usage: Some(Usage {
				input_tokens: resp.usage.input_tokens,
				output_tokens: resp.usage.output_tokens,
			}),
		})
	}
}
