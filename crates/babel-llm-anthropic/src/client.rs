// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Anthropic client implementation.

use async_trait::async_trait;
use babel_common_core::{LlmClient, LlmError, LlmRequest, LlmResponse, LlmStream};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use tracing::{debug, error, info, instrument, trace};

use crate::retry::{retry, RetryConfig, RetryableError};
use crate::stream::parse_sse_stream;
use crate::types::{
	classify_error, AnthropicConfig, AnthropicError, AnthropicRequest, AnthropicResponse,
};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

const USER_AGENT: &str = concat!("babel/", env!("CARGO_PKG_VERSION"));

/// Statuses worth a second attempt. 429 and 529 are left to the caller's
/// rate-limit handling.
const TRANSIENT_STATUSES: &[StatusCode] = &[
	StatusCode::REQUEST_TIMEOUT,
	StatusCode::INTERNAL_SERVER_ERROR,
	StatusCode::BAD_GATEWAY,
	StatusCode::SERVICE_UNAVAILABLE,
	StatusCode::GATEWAY_TIMEOUT,
];

#[derive(Debug)]
struct ClientError {
	error: LlmError,
	retryable: bool,
}

impl std::fmt::Display for ClientError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.error)
	}
}

impl RetryableError for ClientError {
	fn is_retryable(&self) -> bool {
		self.retryable
	}
}

impl From<ClientError> for LlmError {
	fn from(err: ClientError) -> Self {
		err.error
	}
}

/// Seconds from a `retry-after` header; the HTTP-date form is ignored.
fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
	headers
		.get(RETRY_AFTER)?
		.to_str()
		.ok()?
		.trim()
		.parse()
		.ok()
}

/// Client for the Anthropic Messages API.
#[derive(Clone, Debug)]
pub struct AnthropicClient {
	config: AnthropicConfig,
	http_client: Client,
	retry_config: RetryConfig,
}

impl AnthropicClient {
	pub fn new(config: AnthropicConfig) -> Result<Self, LlmError> {
		let http_client = Client::builder()
			.user_agent(USER_AGENT)
			.timeout(config.timeout)
			.build()
			.map_err(|e| LlmError::Http(format!("failed to create HTTP client: {e}")))?;

		Ok(Self {
			config,
			http_client,
			retry_config: RetryConfig::default(),
		})
	}

	pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
		self.retry_config = retry_config;
		self
	}

	pub fn config(&self) -> &AnthropicConfig {
		&self.config
	}

	fn messages_url(&self) -> String {
		format!("{}/v1/messages", self.config.base_url)
	}

	/// Fills in the configured model when the request leaves it empty.
	fn build_request(&self, request: &LlmRequest, stream: bool) -> AnthropicRequest {
		let mut body = AnthropicRequest::from(request);
		if body.model.is_empty() {
			body.model = self.config.model.clone();
		}
		body.stream = Some(stream);
		body
	}

	#[instrument(skip(self, request), fields(model = %request.model))]
	async fn send_request(
		&self,
		request: &AnthropicRequest,
	) -> Result<reqwest::Response, ClientError> {
		let url = self.messages_url();
		debug!(url = %url, "sending request to Anthropic API");
		trace!(request = ?request, "request payload");

		let response = self
			.http_client
			.post(&url)
			.header("x-api-key", self.config.api_key.expose())
			.header("anthropic-version", ANTHROPIC_VERSION)
			.header("content-type", "application/json")
			.json(request)
			.send()
			.await
			.map_err(|e| {
				let retryable = e.is_timeout() || e.is_connect();
				error!(error = %e, retryable, "HTTP request failed");
				ClientError {
					error: if e.is_timeout() {
						LlmError::Timeout
					} else {
						LlmError::Http(e.to_string())
					},
					retryable,
				}
			})?;

		let status = response.status();
		debug!(status = %status, "received response");

		if status.is_success() {
			return Ok(response);
		}

		let retry_after = retry_after_secs(response.headers());
		let body = response.text().await.unwrap_or_default();
		let (error_type, message) = match serde_json::from_str::<AnthropicError>(&body) {
			Ok(api_error) => (Some(api_error.error.error_type), api_error.error.message),
			Err(_) => (None, body),
		};

		let retryable = TRANSIENT_STATUSES.contains(&status);
		error!(
				status = %status,
				error_type = ?error_type,
				body = %message,
				retryable,
				"API error response"
		);

		Err(ClientError {
			error: classify_error(status.as_u16(), error_type.as_deref(), message, retry_after),
			retryable,
		})
	}

	async fn send_with_retry(&self, request: &AnthropicRequest) -> Result<reqwest::Response, LlmError> {
		retry(&self.retry_config, || self.send_request(request))
			.await
			.map_err(LlmError::from)
	}
}

#[async_trait]
impl LlmClient for AnthropicClient {
	#[instrument(skip(self, request), fields(model = %request.model))]
	async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
		let body = self.build_request(&request, false);
		let response = self.send_with_retry(&body).await?;

		let response_body = response.text().await.map_err(|e| {
			error!(error = %e, "failed to read response body");
			LlmError::Http(e.to_string())
		})?;
		trace!(body = %response_body, "response body");

		let anthropic_response: AnthropicResponse =
			serde_json::from_str(&response_body).map_err(|e| {
				error!(error = %e, "failed to parse response");
				LlmError::InvalidResponse(format!("failed to parse response: {e}"))
			})?;

		let llm_response = LlmResponse::try_from(anthropic_response)?;
		info!(
				finish_reason = ?llm_response.finish_reason,
				tool_calls = llm_response.tool_calls.len(),
				"completion finished"
		);
		Ok(llm_response)
	}

	#[instrument(skip(self, request), fields(model = %request.model))]
	async fn complete_streaming(&self, request: LlmRequest) -> Result<LlmStream, LlmError> {
		let body = self.build_request(&request, true);
		let response = self.send_with_retry(&body).await?;

		debug!("stream connection established");
		Ok(LlmStream::new(Box::pin(parse_sse_stream(
			response.bytes_stream(),
		))))
	}
}
