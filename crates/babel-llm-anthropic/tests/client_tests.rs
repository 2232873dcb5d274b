// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::time::Duration;

use babel_common_core::{LlmClient, LlmError, LlmRequest, Message, ToolChoice, ToolDefinition};
use babel_llm_anthropic::{AnthropicClient, AnthropicConfig, RetryConfig};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> AnthropicClient {
	AnthropicClient::new(AnthropicConfig::new("sk-test").with_base_url(server.uri()))
		.unwrap()
		.with_retry_config(RetryConfig {
			max_attempts: 2,
			base_delay: Duration::from_millis(1),
			max_delay: Duration::from_millis(5),
			backoff_factor: 2.0,
			jitter: false,
		})
}

fn translate_request() -> LlmRequest {
	LlmRequest::new("claude-3-haiku-20240307")
		.with_messages(vec![
			Message::system("You translate catalogs."),
			Message::user("<en-file>{}</en-file>"),
		])
		.with_tools(vec![ToolDefinition::new(
			"translate",
			"Submit translations",
			json!({"type": "object"}),
		)])
		.with_tool_choice(ToolChoice::forced("translate"))
}

fn error_body(error_type: &str, message: &str) -> serde_json::Value {
	json!({"type": "error", "error": {"type": error_type, "message": message}})
}

#[tokio::test]
async fn complete_sends_key_version_and_forced_tool() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/v1/messages"))
		.and(header("x-api-key", "sk-test"))
		.and(header("anthropic-version", "2023-06-01"))
		.and(body_partial_json(json!({
			"tool_choice": {"type": "tool", "name": "translate"},
			"system": "You translate catalogs.",
			"stream": false
		})))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({
			"id": "msg_1",
			"type": "message",
			"role": "assistant",
			"model": "claude-3-haiku-20240307",
			"stop_reason": "tool_use",
			"content": [{
				"type": "tool_use",
				"id": "toolu_1",
				"name": "translate",
				"input": {"translations": {"auth.failed": "Fehlgeschlagen"}}
			}],
			"usage": {"input_tokens": 20, "output_tokens": 9}
		})))
		.expect(1)
		.mount(&server)
		.await;

	let response = client(&server).complete(translate_request()).await.unwrap();

	let call = response.tool_call("translate").unwrap();
	assert_eq!(call.arguments_json["translations"]["auth.failed"], "Fehlgeschlagen");
}

#[tokio::test]
async fn streaming_turn_is_parsed_into_a_response() {
	let server = MockServer::start().await;
	let body = [
		r#"{"type":"message_start","message":{"id":"msg_1","model":"claude-3-haiku-20240307","usage":{"input_tokens":3}}}"#,
		r#"{"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#,
		r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Übersetzt."}}"#,
		r#"{"type":"content_block_stop","index":0}"#,
		r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":2}}"#,
		r#"{"type":"message_stop"}"#,
	]
	.iter()
	.map(|data| format!("data: {data}\n\n"))
	.collect::<String>();

	Mock::given(method("POST"))
		.and(path("/v1/messages"))
		.and(body_partial_json(json!({"stream": true})))
		.respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
		.mount(&server)
		.await;

	let mut streamed = String::new();
	let response = client(&server)
		.complete_streaming(translate_request())
		.await
		.unwrap()
		.into_response(|text| streamed.push_str(text))
		.await
		.unwrap();

	assert_eq!(response.message.content, "Übersetzt.");
	assert_eq!(streamed, "Übersetzt.");
	assert_eq!(response.finish_reason.as_deref(), Some("end_turn"));
}

#[tokio::test]
async fn too_many_requests_carries_retry_after() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.respond_with(
			ResponseTemplate::new(429)
				.insert_header("retry-after", "30")
				.set_body_json(error_body("rate_limit_error", "Number of requests exceeded")),
		)
		.expect(1)
		.mount(&server)
		.await;

	let err = client(&server).complete(translate_request()).await.unwrap_err();
	assert!(matches!(
		err,
		LlmError::RateLimited {
			retry_after_secs: Some(30)
		}
	));
}

#[tokio::test]
async fn overloaded_is_a_rate_limit() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.respond_with(ResponseTemplate::new(529).set_body_json(error_body("overloaded_error", "Overloaded")))
		.mount(&server)
		.await;

	let err = client(&server)
		.complete_streaming(translate_request())
		.await
		.err()
		.unwrap();
	assert!(err.is_capacity_exceeded());
	assert!(matches!(err, LlmError::RateLimited { retry_after_secs: None }));
}

#[tokio::test]
async fn bad_request_is_invalid_request() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.respond_with(ResponseTemplate::new(400).set_body_json(error_body(
			"invalid_request_error",
			"tool_choice.name: unknown tool",
		)))
		.expect(1)
		.mount(&server)
		.await;

	let err = client(&server).complete(translate_request()).await.unwrap_err();
	assert!(matches!(err, LlmError::InvalidRequest(ref m) if m == "tool_choice.name: unknown tool"));
}

#[tokio::test]
async fn unauthorized_is_an_api_error() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.respond_with(ResponseTemplate::new(401).set_body_json(error_body(
			"authentication_error",
			"invalid x-api-key",
		)))
		.mount(&server)
		.await;

	let err = client(&server).complete(translate_request()).await.unwrap_err();
	assert!(matches!(err, LlmError::Api(ref m) if m.contains("invalid x-api-key")));
	assert!(!err.is_capacity_exceeded());
}

#[tokio::test]
async fn transient_server_error_is_retried() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
		.up_to_n_times(1)
		.mount(&server)
		.await;
	Mock::given(method("POST"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({
			"id": "msg_2",
			"model": "claude-3-haiku-20240307",
			"stop_reason": "end_turn",
			"content": [{"type": "text", "text": "ok"}],
			"usage": {"input_tokens": 1, "output_tokens": 1}
		})))
		.mount(&server)
		.await;

	let response = client(&server).complete(translate_request()).await.unwrap();
	assert_eq!(response.message.content, "ok");
}
