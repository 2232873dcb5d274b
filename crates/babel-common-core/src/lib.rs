// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Types shared between the synchronization engine and completion agents.
//!
//! The engine never talks to a provider directly. It builds an [`LlmRequest`],
//! hands it to an [`LlmClient`], and consumes the resulting [`LlmStream`]
//! until a terminal [`LlmEvent`] arrives.

pub mod error;
pub mod llm;
pub mod message;
pub mod secret;
pub mod tool;

pub use error::*;
pub use llm::*;
pub use message::*;
pub use secret::*;
pub use tool::*;
