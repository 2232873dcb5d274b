// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Request, response and streaming types for completion agents.

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::Stream;
use pin_project_lite::pin_project;
use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};

use crate::error::LlmError;
use crate::message::{Message, ToolCall};
use crate::tool::{ToolChoice, ToolDefinition};

/// Request to send to an agent for completion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmRequest {
	pub model: String,
	pub messages: Vec<Message>,
	pub tools: Vec<ToolDefinition>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tool_choice: Option<ToolChoice>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub max_tokens: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub temperature: Option<f32>,
}

impl LlmRequest {
	pub fn new(model: impl Into<String>) -> Self {
		Self {
			model: model.into(),
			messages: Vec::new(),
			tools: Vec::new(),
			tool_choice: None,
			max_tokens: None,
			temperature: None,
		}
	}

	pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
		self.messages = messages;
		self
	}

	pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
		self.tools = tools;
		self
	}

	pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
		self.tool_choice = Some(tool_choice);
		self
	}

	pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
		self.max_tokens = Some(max_tokens);
		self
	}

	pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
		self.temperature = temperature;
		self
	}
}

/// Streaming events emitted by an agent during one turn.
#[derive(Clone, Debug)]
pub enum LlmEvent {
	/// Incremental text from the assistant.
	TextDelta { content: String },
	/// Incremental tool call arguments.
	ToolCallDelta {
		call_id: String,
		tool_name: String,
		arguments_fragment: String,
	},
	/// Terminal: the turn finished.
	Completed(LlmResponse),
	/// Terminal: the turn failed.
	Error(LlmError),
}

/// The agent's answer for one turn.
#[derive(Clone, Debug)]
pub struct LlmResponse {
	pub message: Message,
	pub tool_calls: Vec<ToolCall>,
	pub usage: Option<Usage>,
	pub finish_reason: Option<String>,
}

impl LlmResponse {
	/// Text-only response, mostly useful for scripted agents.
	pub fn text(content: impl Into<String>) -> Self {
		Self {
			message: Message::assistant(content),
			tool_calls: Vec::new(),
			usage: None,
			finish_reason: Some("end_turn".to_string()),
		}
	}

	/// Response consisting of the given tool calls.
	pub fn with_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
		Self {
			message: Message::assistant_with_tool_calls("", tool_calls.clone()),
			tool_calls,
			usage: None,
			finish_reason: Some("tool_use".to_string()),
		}
	}

	/// First call of the named tool, if the agent made one.
	pub fn tool_call(&self, name: &str) -> Option<&ToolCall> {
		self.tool_calls.iter().find(|call| call.tool_name == name)
	}
}

/// Token usage statistics for one turn.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Usage {
	pub input_tokens: u32,
	pub output_tokens: u32,
}

pin_project! {
		/// A stream of agent events for one turn.
		pub struct LlmStream {
				#[pin]
				inner: Pin<Box<dyn Stream<Item = LlmEvent> + Send>>,
		}
}

impl LlmStream {
	pub fn new(inner: Pin<Box<dyn Stream<Item = LlmEvent> + Send>>) -> Self {
		Self { inner }
	}

	/// Stream that replays the given events.
	pub fn from_events(events: Vec<LlmEvent>) -> Self {
		Self::new(Box::pin(futures::stream::iter(events)))
	}

	/// Returns the next event, or `None` once the stream is exhausted.
	#[instrument(skip(self), level = "trace")]
	pub async fn next(&mut self) -> Option<LlmEvent> {
		use futures::StreamExt;
		self.inner.next().await
	}

	/// Drains the stream up to its terminal event.
	///
	/// Text deltas are passed to `on_text` as they arrive. A stream that ends
	/// without a terminal event is reported as an invalid response.
	pub async fn into_response<F>(mut self, mut on_text: F) -> Result<LlmResponse, LlmError>
	where
		F: FnMut(&str),
	{
		while let Some(event) = self.next().await {
			match event {
				LlmEvent::TextDelta { content } => on_text(&content),
				LlmEvent::ToolCallDelta { call_id, .. } => {
					trace!(call_id = %call_id, "tool call delta");
				}
				LlmEvent::Completed(response) => return Ok(response),
				LlmEvent::Error(err) => return Err(err),
			}
		}
		Err(LlmError::InvalidResponse(
			"stream ended before the turn completed".to_string(),
		))
	}
}

impl Stream for LlmStream {
	type Item = LlmEvent;

	fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		self.project().inner.poll_next(cx)
	}
}

/// A completion agent.
///
/// Given a prompt and a set of tools it answers one turn, either at once or as
/// a stream of events.
#[async_trait]
pub trait LlmClient: Send + Sync {
	/// Sends a request and waits for the full response.
	async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, LlmError>;

	/// Sends a request and returns a stream of events.
	async fn complete_streaming(&self, request: LlmRequest) -> Result<LlmStream, LlmError>;
}
