// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Errors reported by a completion agent.
///
/// The variants are the machine-distinguishable kinds the engine branches on:
/// `RateLimited` triggers backoff, everything else fails the current job.
#[derive(Clone, Error, Debug)]
pub enum LlmError {
	#[error("HTTP error: {0}")]
	Http(String),

	#[error("API error: {0}")]
	Api(String),

	#[error("Invalid request: {0}")]
	InvalidRequest(String),

	#[error("Request timed out")]
	Timeout,

	#[error("Invalid response: {0}")]
	InvalidResponse(String),

	#[error("Rate limited: retry after {retry_after_secs:?} seconds")]
	RateLimited { retry_after_secs: Option<u64> },
}

const CAPACITY_MARKERS: &[&str] = &[
	"rate limit",
	"rate_limit",
	"overloaded",
	"exceeded",
	"capacity",
	"429",
	"529",
];

impl LlmError {
	/// Returns true when the agent refused the turn because it is out of
	/// capacity, either through the dedicated variant or a transport/API
	/// message matching one of the known "exceeded capacity" phrasings.
	///
	/// Rejected requests and malformed responses never qualify, whatever
	/// their message says.
	pub fn is_capacity_exceeded(&self) -> bool {
		let message = match self {
			LlmError::RateLimited { .. } => return true,
			LlmError::Http(msg) | LlmError::Api(msg) => msg,
			LlmError::InvalidRequest(_) | LlmError::InvalidResponse(_) | LlmError::Timeout => {
				return false
			}
		};
		let lower = message.to_ascii_lowercase();
		CAPACITY_MARKERS.iter().any(|marker| lower.contains(marker))
	}
}

/// Errors produced while executing a tool call on behalf of the agent.
#[derive(Clone, Error, Debug)]
pub enum ToolError {
	#[error("Tool not found: {0}")]
	NotFound(String),

	#[error("Invalid arguments: {0}")]
	InvalidArguments(String),

	#[error("Invalid target: {0}")]
	InvalidTarget(String),

	#[error("IO error: {0}")]
	Io(String),

	#[error("Internal error: {0}")]
	Internal(String),
}

impl From<std::io::Error> for ToolError {
	fn from(err: std::io::Error) -> Self {
		ToolError::Io(err.to_string())
	}
}

impl From<serde_json::Error> for ToolError {
	fn from(err: serde_json::Error) -> Self {
		ToolError::InvalidArguments(err.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rate_limited_variant_is_capacity_exceeded() {
		let err = LlmError::RateLimited {
			retry_after_secs: Some(30),
		};
		assert!(err.is_capacity_exceeded());
	}

	#[test]
	fn provider_messages_are_classified() {
		assert!(LlmError::Api("Overloaded".to_string()).is_capacity_exceeded());
		assert!(LlmError::Http("status 429 Too Many Requests".to_string()).is_capacity_exceeded());
		assert!(
			LlmError::Api("You have exceeded your token capacity".to_string()).is_capacity_exceeded()
		);
	}

	#[test]
	fn rejected_requests_are_never_capacity() {
		assert!(
			!LlmError::InvalidRequest("prompt is too long: max tokens exceeded".to_string())
				.is_capacity_exceeded()
		);
		assert!(!LlmError::InvalidRequest("error 429 in example".to_string()).is_capacity_exceeded());
		assert!(
			!LlmError::InvalidResponse("overloaded stream ended early".to_string())
				.is_capacity_exceeded()
		);
	}

	#[test]
	fn other_errors_are_not_capacity() {
		assert!(!LlmError::Timeout.is_capacity_exceeded());
		assert!(!LlmError::Api("invalid x-api-key".to_string()).is_capacity_exceeded());
		assert!(
			!LlmError::InvalidResponse("missing content".to_string()).is_capacity_exceeded()
		);
	}
}
