// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Anthropic agent for babel.
//!
//! Implements [`LlmClient`](babel_common_core::LlmClient) over the Messages
//! API with an API key.
//!
//! ```rust,no_run
//! use babel_llm_anthropic::{AnthropicClient, AnthropicConfig};
//!
//! let config = AnthropicConfig::new("sk-ant-api03-...");
//! let client = AnthropicClient::new(config).unwrap();
//! ```

mod client;
pub mod retry;
mod stream;
mod types;

pub use client::{AnthropicClient, ANTHROPIC_VERSION};
pub use retry::RetryConfig;
pub use types::*;
