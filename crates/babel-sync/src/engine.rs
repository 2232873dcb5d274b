// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Caller-facing operations: reporting, synchronizing and refining catalogs.

use std::sync::Arc;

use babel_catalog::{diff, CatalogError, CatalogKey, CatalogStore, MissingKeySet};
use babel_common_core::LlmClient;
use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::config::SyncConfig;
use crate::convergence::{run_convergence, ConvergenceInput};
use crate::error::{SessionError, SyncError};
use crate::merge::TranslationResult;
use crate::session::RefinementSession;

/// Missing keys of one target catalog.
#[derive(Clone, Debug)]
pub struct MissingReport {
	pub source: CatalogKey,
	pub target: CatalogKey,
	/// Whether the target catalog exists in the store at all.
	pub target_exists: bool,
	pub missing: MissingKeySet,
	/// Source text of every missing key.
	pub source_texts: IndexMap<String, String>,
}

impl MissingReport {
	pub fn is_complete(&self) -> bool {
		self.missing.is_empty()
	}
}

/// One synchronization job.
#[derive(Clone, Debug)]
pub struct SyncRequest {
	pub source: String,
	pub target: String,
	pub domain: String,
	/// Translate every key, even when nothing is missing.
	pub force_full: bool,
	/// Run the agent but do not write the result.
	pub dry_run: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncStatus {
	/// Nothing was missing; the agent was not called.
	UpToDate,
	/// Every required key was translated.
	Synchronized,
	/// Only part of the keys were translated; `missing` lists the rest.
	Incomplete { missing: Vec<String> },
}

/// Outcome of a successful job.
#[derive(Debug)]
pub struct SyncReport {
	pub target: CatalogKey,
	pub status: SyncStatus,
	pub translations: TranslationResult,
	/// Keys the target catalog refused, see [`CatalogError::LeafConflict`].
	pub rejected: Vec<CatalogError>,
	pub turns: u32,
	pub rate_limit_restarts: u32,
	pub violations: usize,
	pub written: bool,
}

/// Outcome of one job of a batch.
#[derive(Debug)]
pub struct JobReport {
	pub request: SyncRequest,
	pub outcome: Result<SyncReport, SyncError>,
}

/// A batch of jobs: every `(domain, language)` pair, source excluded.
#[derive(Clone, Debug)]
pub struct BatchRequest {
	pub source: String,
	pub languages: Vec<String>,
	pub domains: Vec<String>,
	pub force_full: bool,
	pub dry_run: bool,
}

/// Synchronization engine over one store and one agent.
pub struct Engine {
	client: Arc<dyn LlmClient>,
	store: Arc<dyn CatalogStore>,
	config: SyncConfig,
	cancel: CancellationToken,
}

impl Engine {
	pub fn new(client: Arc<dyn LlmClient>, store: Arc<dyn CatalogStore>, config: SyncConfig) -> Self {
		Self {
			client,
			store,
			config,
			cancel: CancellationToken::new(),
		}
	}

	pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
		self.cancel = cancel;
		self
	}

	/// Token that aborts every running and future job when cancelled.
	pub fn cancellation_token(&self) -> CancellationToken {
		self.cancel.clone()
	}

	pub fn config(&self) -> &SyncConfig {
		&self.config
	}

	pub fn store(&self) -> &Arc<dyn CatalogStore> {
		&self.store
	}

	/// Reports the missing keys of every `(domain, language)` pair against `source`.
	#[instrument(skip(self, languages, domains))]
	pub async fn list_missing(
		&self,
		source: &str,
		languages: &[String],
		domains: &[String],
	) -> Result<Vec<MissingReport>, SyncError> {
		let mut reports = Vec::new();
		for domain in domains {
			let source_catalog = self.store.load(source, domain).await?;
			for language in languages.iter().filter(|l| l.as_str() != source) {
				let target_catalog = self.store.load(language, domain).await?;
				let target_exists = self.store.exists(language, domain).await?;
				let missing = diff(&source_catalog, &target_catalog);
				let source_texts = missing
					.iter()
					.filter_map(|key| {
						source_catalog
							.get(key)
							.ok()
							.map(|text| (key.to_string(), text.to_string()))
					})
					.collect();
				reports.push(MissingReport {
					source: source_catalog.key().clone(),
					target: target_catalog.key().clone(),
					target_exists,
					missing,
					source_texts,
				});
			}
		}
		Ok(reports)
	}

	/// Brings one target catalog up to date with its source.
	///
	/// The target is written only after the loop converged, unless
	/// `allow_incomplete` is set, in which case a timed-out or aborted loop
	/// writes its partial result and the job reports [`SyncStatus::Incomplete`].
	/// Required keys the target refuses (see [`CatalogError::LeafConflict`])
	/// count as missing: without `allow_incomplete` the job fails with
	/// [`SyncError::TargetConflict`] and nothing is written.
	#[instrument(skip(self, request), fields(domain = %request.domain, source = %request.source, target = %request.target))]
	pub async fn synchronize(&self, request: SyncRequest) -> Result<SyncReport, SyncError> {
		if request.source == request.target {
			return Err(SyncError::InvalidTarget(format!(
				"cannot synchronize '{}' into itself",
				request.target
			)));
		}

		let source = self.store.load(&request.source, &request.domain).await?;
		let mut target = self.store.load(&request.target, &request.domain).await?;
		let missing = diff(&source, &target);

		if missing.is_empty() && !request.force_full {
			info!("catalog up to date");
			return Ok(SyncReport {
				target: target.key().clone(),
				status: SyncStatus::UpToDate,
				translations: TranslationResult::new(),
				rejected: Vec::new(),
				turns: 0,
				rate_limit_restarts: 0,
				violations: 0,
				written: false,
			});
		}

		let input = ConvergenceInput {
			source: source.clone(),
			target: target.clone(),
			missing: if request.force_full {
				MissingKeySet::default()
			} else {
				missing
			},
		};

		let outcome = run_convergence(self.client.as_ref(), input, &self.config, &self.cancel).await;
		let (translations, mut missing, turns, restarts, violations) = match outcome {
			Ok(report) => (
				report.result,
				Vec::new(),
				report.turns,
				report.rate_limit_restarts,
				report.violations.len(),
			),
			Err(SyncError::ConvergenceTimeout {
				turns,
				partial,
				missing,
				rate_limit_restarts,
				violations,
			}) if self.config.allow_incomplete => {
				warn!(missing = missing.len(), "writing incomplete translations");
				(partial, missing, turns, rate_limit_restarts, violations)
			}
			Err(SyncError::Aborted {
				turns,
				partial,
				rate_limit_restarts,
				violations,
			}) if self.config.allow_incomplete => {
				warn!(translated = partial.len(), "writing translations of aborted job");
				(partial, Vec::new(), turns, rate_limit_restarts, violations)
			}
			Err(err) => return Err(err),
		};

		let apply = target.apply(translations.iter());
		if !apply.is_clean() {
			warn!(rejected = apply.rejected.len(), "target refused some translations");
		}

		// Keys the target refused stay missing after a converged loop.
		for key in diff(&source, &target).iter() {
			if !missing.iter().any(|m| m == key) {
				missing.push(key.to_string());
			}
		}

		let status = if missing.is_empty() {
			SyncStatus::Synchronized
		} else {
			if !self.config.allow_incomplete {
				warn!(missing = missing.len(), "target refused required translations");
				return Err(SyncError::TargetConflict {
					missing,
					rejected: apply.rejected,
					partial: translations,
				});
			}
			SyncStatus::Incomplete { missing }
		};

		let written = !request.dry_run && !translations.is_empty();
		if written {
			self.store.store(&target).await?;
		}

		info!(
			keys = translations.len(),
			turns,
			written,
			"synchronized catalog"
		);

		Ok(SyncReport {
			target: target.key().clone(),
			status,
			translations,
			rejected: apply.rejected,
			turns,
			rate_limit_restarts: restarts,
			violations,
			written,
		})
	}

	/// Runs every job of the batch, at most `max_concurrent_jobs` at a time.
	///
	/// A failing job does not stop the others. Reports come back in job order.
	#[instrument(skip(self, batch), fields(source = %batch.source))]
	pub async fn synchronize_all(&self, batch: BatchRequest) -> Vec<JobReport> {
		let jobs: Vec<SyncRequest> = batch
			.domains
			.iter()
			.flat_map(|domain| {
				batch
					.languages
					.iter()
					.filter(|language| **language != batch.source)
					.map(|language| SyncRequest {
						source: batch.source.clone(),
						target: language.clone(),
						domain: domain.clone(),
						force_full: batch.force_full,
						dry_run: batch.dry_run,
					})
			})
			.collect();

		info!(
				jobs = jobs.len(),
				concurrency = self.config.max_concurrent_jobs,
				"starting batch"
		);

		let mut results: Vec<(usize, JobReport)> = stream::iter(jobs.into_iter().enumerate())
			.map(|(index, request)| async move {
				let outcome = self.synchronize(request.clone()).await;
				if let Err(err) = &outcome {
					error!(
							domain = %request.domain,
							target = %request.target,
							error = %err,
							"job failed"
					);
				}
				(index, JobReport { request, outcome })
			})
			.buffer_unordered(self.config.max_concurrent_jobs.max(1))
			.collect()
			.await;

		results.sort_by_key(|(index, _)| *index);
		results.into_iter().map(|(_, report)| report).collect()
	}

	/// Opens an interactive session over one catalog pair.
	pub async fn start_refinement_session(
		&self,
		domain: &str,
		source: &str,
		target: &str,
	) -> Result<RefinementSession, SessionError> {
		RefinementSession::open(
			self.client.clone(),
			self.store.clone(),
			self.config.clone(),
			domain,
			source,
			target,
		)
		.await
	}
}
