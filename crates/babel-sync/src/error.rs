// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use babel_catalog::{CatalogError, StoreError};
use babel_common_core::LlmError;
use thiserror::Error;

use crate::merge::TranslationResult;

/// Errors that end a synchronization job.
///
/// Every variant is fatal to its `(domain, language)` job only; the batch
/// driver moves on to the next job.
#[derive(Debug, Error)]
pub enum SyncError {
	#[error("invalid target: {0}")]
	InvalidTarget(String),

	#[error("no convergence after {turns} turns, {} keys still missing", missing.len())]
	ConvergenceTimeout {
		turns: u32,
		partial: TranslationResult,
		missing: Vec<String>,
		rate_limit_restarts: u32,
		violations: usize,
	},

	#[error("synchronization aborted")]
	Aborted {
		turns: u32,
		partial: TranslationResult,
		rate_limit_restarts: u32,
		violations: usize,
	},

	/// The target catalog refused required keys, see
	/// [`CatalogError::LeafConflict`]. Nothing was written.
	#[error("target refused {} required translations: {}", missing.len(), missing.join(", "))]
	TargetConflict {
		missing: Vec<String>,
		rejected: Vec<CatalogError>,
		partial: TranslationResult,
	},

	#[error("agent still rate limited after {restarts} restarts")]
	RateLimitExhausted { restarts: u32 },

	#[error("agent failure: {0}")]
	AgentFailure(#[source] LlmError),

	#[error("store error: {0}")]
	Store(#[from] StoreError),

	#[error("internal error: {0}")]
	Internal(String),
}

impl SyncError {
	/// Partial result carried by a timed-out, aborted or refused job.
	pub fn partial(&self) -> Option<&TranslationResult> {
		match self {
			SyncError::ConvergenceTimeout { partial, .. }
			| SyncError::Aborted { partial, .. }
			| SyncError::TargetConflict { partial, .. } => Some(partial),
			_ => None,
		}
	}
}

/// Errors of an interactive refinement session.
#[derive(Debug, Error)]
pub enum SessionError {
	#[error("invalid target: {0}")]
	InvalidTarget(String),

	#[error("session already started")]
	AlreadyStarted,

	#[error("session not started")]
	NotStarted,

	#[error("agent made more than {0} tool rounds without answering")]
	ToolRoundsExceeded(u32),

	#[error("agent failure: {0}")]
	Agent(#[from] LlmError),

	#[error("store error: {0}")]
	Store(#[from] StoreError),
}
