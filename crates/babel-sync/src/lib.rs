// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Translation synchronization engine.
//!
//! Given a source and a target [`Catalog`](babel_catalog::Catalog), the engine
//! computes the missing keys, drives a completion agent through a
//! [`ConvergenceLoop`] until every key is translated, and writes the merged
//! result back through a [`CatalogStore`](babel_catalog::CatalogStore).
//!
//! Interactive work on a catalog pair goes through a [`RefinementSession`]
//! instead.

pub mod config;
pub mod convergence;
pub mod engine;
pub mod error;
pub mod merge;
pub mod prompt;
pub mod session;

pub use config::{SyncConfig, DEFAULT_MODEL};
pub use convergence::{
	run_convergence, ConvergenceAction, ConvergenceEvent, ConvergenceInput, ConvergenceLoop,
	ConvergencePhase, ConvergenceReport, ConvergenceState,
};
pub use engine::{
	BatchRequest, Engine, JobReport, MissingReport, SyncReport, SyncRequest, SyncStatus,
};
pub use error::{SessionError, SyncError};
pub use merge::{merge, normalize, normalize_batch, Normalized, TranslationResult, Violation};
pub use session::{LoadCatalogInput, RefinementSession, SessionReply, ToolOutcome, TranslateInput};
