// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server-sent events parser for the streaming Messages API.

use std::collections::HashMap;
use std::pin::Pin;
use std::task::{Context, Poll};

use babel_common_core::{LlmError, LlmEvent, LlmResponse, Message, ToolCall, Usage};
use bytes::Bytes;
use futures::stream::Stream;
use pin_project_lite::pin_project;
use serde::Deserialize;
use tracing::{debug, error, trace, warn};

use crate::types::CAPACITY_ERROR_TYPES;

/// Event payloads of the streaming API.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
	#[serde(rename = "message_start")]
	MessageStart { message: MessageStartData },
	#[serde(rename = "content_block_start")]
	ContentBlockStart {
		index: usize,
		content_block: ContentBlock,
	},
	#[serde(rename = "content_block_delta")]
	ContentBlockDelta { index: usize, delta: ContentDelta },
	#[serde(rename = "content_block_stop")]
	ContentBlockStop { index: usize },
	#[serde(rename = "message_delta")]
	MessageDelta {
		delta: MessageDeltaData,
		usage: Option<MessageDeltaUsage>,
	},
	#[serde(rename = "message_stop")]
	MessageStop,
	#[serde(rename = "ping")]
	Ping,
	#[serde(rename = "error")]
	Error { error: StreamErrorData },
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageStartData {
	pub id: String,
	pub model: String,
	pub usage: Option<MessageStartUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageStartUsage {
	pub input_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageDeltaUsage {
	pub output_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
	#[serde(rename = "text")]
	Text { text: String },
	#[serde(rename = "tool_use")]
	ToolUse { id: String, name: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ContentDelta {
	#[serde(rename = "text_delta")]
	TextDelta { text: String },
	#[serde(rename = "input_json_delta")]
	InputJsonDelta { partial_json: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageDeltaData {
	pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamErrorData {
	#[serde(rename = "type")]
	pub error_type: String,
	pub message: String,
}

#[derive(Debug, Default)]
struct StreamState {
	tool_calls: HashMap<usize, ToolCallBuilder>,
	content: String,
	completed_calls: Vec<ToolCall>,
	stop_reason: Option<String>,
	input_tokens: u32,
	output_tokens: u32,
}

#[derive(Debug, Default)]
struct ToolCallBuilder {
	id: String,
	name: String,
	arguments_json: String,
}

pin_project! {
		pub struct SseStream<S> {
				#[pin]
				inner: S,
				buffer: Vec<u8>,
				state: StreamState,
				finished: bool,
		}
}

impl<S> SseStream<S> {
	fn new(inner: S) -> Self {
		Self {
			inner,
			buffer: Vec::new(),
			state: StreamState::default(),
			finished: false,
		}
	}
}

impl<S, E> Stream for SseStream<S>
where
	S: Stream<Item = Result<Bytes, E>>,
	E: std::error::Error,
{
	type Item = LlmEvent;

	fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		let mut this = self.project();

		if *this.finished {
			return Poll::Ready(None);
		}

		loop {
			if let Some(event) = try_parse_event(this.buffer, this.state) {
				match event {
					Ok(Some(llm_event)) => {
						if matches!(llm_event, LlmEvent::Completed(_) | LlmEvent::Error(_)) {
							*this.finished = true;
						}
						return Poll::Ready(Some(llm_event));
					}
					Ok(None) => continue,
					Err(e) => {
						*this.finished = true;
						return Poll::Ready(Some(LlmEvent::Error(e)));
					}
				}
			}

			match this.inner.as_mut().poll_next(cx) {
				Poll::Ready(Some(Ok(bytes))) => {
					// JSON payloads never carry a raw carriage return.
					this.buffer.extend(bytes.iter().filter(|b| **b != b'\r'));
					trace!(chunk_len = bytes.len(), "received SSE chunk");
				}
				Poll::Ready(Some(Err(e))) => {
					error!(error = %e, "stream error");
					*this.finished = true;
					return Poll::Ready(Some(LlmEvent::Error(LlmError::Http(e.to_string()))));
				}
				Poll::Ready(None) => {
					debug!("stream ended");
					*this.finished = true;
					return Poll::Ready(None);
				}
				Poll::Pending => return Poll::Pending,
			}
		}
	}
}

/// Events are split on blank lines. Decoding waits for a whole event so a
/// multi-byte character split across chunks is never cut.
fn try_parse_event(
	buffer: &mut Vec<u8>,
	state: &mut StreamState,
) -> Option<Result<Option<LlmEvent>, LlmError>> {
	let event_end = buffer.windows(2).position(|w| w == b"\n\n")?;
	let raw: Vec<u8> = buffer.drain(..event_end + 2).collect();
	let event_text = String::from_utf8_lossy(&raw);

	let data: Vec<&str> = event_text
		.lines()
		.filter_map(|line| line.strip_prefix("data:"))
		.map(str::trim_start)
		.collect();
	if data.is_empty() {
		return Some(Ok(None));
	}
	let data = data.join("\n");

	trace!(data = %data, "parsing SSE event");

	let stream_event: StreamEvent = match serde_json::from_str(&data) {
		Ok(e) => e,
		Err(e) => {
			warn!(error = %e, data = %data, "skipping unparseable SSE event");
			return Some(Ok(None));
		}
	};

	Some(process_stream_event(stream_event, state))
}

fn process_stream_event(
	event: StreamEvent,
	state: &mut StreamState,
) -> Result<Option<LlmEvent>, LlmError> {
	match event {
		StreamEvent::MessageStart { message } => {
			debug!(id = %message.id, model = %message.model, "message started");
			if let Some(usage) = message.usage {
				state.input_tokens = usage.input_tokens;
			}
			Ok(None)
		}
		StreamEvent::ContentBlockStart {
			index,
			content_block,
		} => {
			match content_block {
				ContentBlock::Text { text } => {
					if !text.is_empty() {
						state.content.push_str(&text);
						return Ok(Some(LlmEvent::TextDelta { content: text }));
					}
				}
				ContentBlock::ToolUse { id, name } => {
					debug!(index, id = %id, name = %name, "tool use started");
					state.tool_calls.insert(
						index,
						ToolCallBuilder {
							id,
							name,
							arguments_json: String::new(),
						},
					);
				}
			}
			Ok(None)
		}
		StreamEvent::ContentBlockDelta { index, delta } => match delta {
			ContentDelta::TextDelta { text } => {
				state.content.push_str(&text);
				Ok(Some(LlmEvent::TextDelta { content: text }))
			}
			ContentDelta::InputJsonDelta { partial_json } => {
				let Some(builder) = state.tool_calls.get_mut(&index) else {
					warn!(index, "tool delta for unknown content block");
					return Ok(None);
				};
				builder.arguments_json.push_str(&partial_json);
				Ok(Some(LlmEvent::ToolCallDelta {
					call_id: builder.id.clone(),
					tool_name: builder.name.clone(),
					arguments_fragment: partial_json,
				}))
			}
		},
		StreamEvent::ContentBlockStop { index } => {
			if let Some(builder) = state.tool_calls.remove(&index) {
				state.completed_calls.push(finish_tool_call(index, builder));
			}
			Ok(None)
		}
		StreamEvent::MessageDelta { delta, usage } => {
			if let Some(reason) = delta.stop_reason {
				debug!(stop_reason = %reason, "message delta");
				state.stop_reason = Some(reason);
			}
			if let Some(u) = usage {
				state.output_tokens = u.output_tokens;
			}
			Ok(None)
		}
		StreamEvent::MessageStop => {
			let content = std::mem::take(&mut state.content);
			let tool_calls = std::mem::take(&mut state.completed_calls);
			debug!(tool_calls = tool_calls.len(), "message completed");
			Ok(Some(LlmEvent::Completed(LlmResponse {
				message: Message::assistant_with_tool_calls(content, tool_calls.clone()),
				tool_calls,
				finish_reason: state.stop_reason.take(),
				usage: Some(Usage {
					input_tokens: state.input_tokens,
					output_tokens: state.output_tokens,
				}),
			})))
		}
		StreamEvent::Ping => Ok(None),
		StreamEvent::Error { error } => {
			error!(
					error_type = %error.error_type,
					message = %error.message,
					"stream error from API"
			);
			if CAPACITY_ERROR_TYPES.contains(&error.error_type.as_str()) {
				Err(LlmError::RateLimited {
					retry_after_secs: None,
				})
			} else {
				Err(LlmError::Api(error.message))
			}
		}
	}
}

/// Arguments that fail to parse are kept as an empty object; the caller
/// reports the missing fields back to the agent.
fn finish_tool_call(index: usize, builder: ToolCallBuilder) -> ToolCall {
	let arguments = match serde_json::from_str::<serde_json::Value>(&builder.arguments_json) {
		Ok(serde_json::Value::Null) => serde_json::Value::Object(serde_json::Map::new()),
		Ok(value) => value,
		Err(e) => {
			if !builder.arguments_json.is_empty() {
				warn!(
						index,
						id = %builder.id,
						name = %builder.name,
						error = %e,
						"tool arguments are not valid JSON"
				);
			}
			serde_json::Value::Object(serde_json::Map::new())
		}
	};
	ToolCall {
		id: builder.id,
		tool_name: builder.name,
		arguments_json: arguments,
	}
}

pub fn parse_sse_stream<S, E>(stream: S) -> impl Stream<Item = LlmEvent>
where
	S: Stream<Item = Result<Bytes, E>>,
	E: std::error::Error,
{
	SseStream::new(stream)
}
