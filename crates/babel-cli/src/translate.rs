// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt::Write as _;

use anyhow::{bail, Result};
use babel_sync::{BatchRequest, JobReport, SyncError, SyncReport, SyncStatus};
use tracing::info;

use crate::app::App;
use crate::{AddArgs, TranslateArgs};

pub async fn run(app: &App, args: TranslateArgs) -> Result<()> {
	let engine = app.engine()?;
	let source = app.source_language().to_string();
	let languages = app.target_languages(&args.language, &args.skip_languages).await?;
	let domains = app.domains(&args.domain, &args.skip_domains).await?;

	println!("AI Translator");
	println!("Model: {}", engine.config().model);
	println!("Source: {source}");
	println!("Languages: {}", languages.join(", "));
	println!("Domains: {}", domains.join(", "));
	println!();

	if languages.is_empty() || domains.is_empty() {
		println!("Nothing to translate.");
		return Ok(());
	}

	let reports = engine
		.synchronize_all(BatchRequest {
			source,
			languages,
			domains,
			force_full: args.force,
			dry_run: args.dry_run,
		})
		.await;

	let failed = reports.iter().filter(|r| r.outcome.is_err()).count();
	for report in &reports {
		print!("{}", render_job(report));
	}

	info!(jobs = reports.len(), failed, "translation finished");

	if failed > 0 {
		bail!("{failed} of {} jobs failed", reports.len());
	}
	Ok(())
}

/// A new language is a full translate run restricted to that language.
pub async fn add_language(app: &App, args: AddArgs) -> Result<()> {
	if args.language == app.source_language() {
		bail!("'{}' is the source language", args.language);
	}

	run(
		app,
		TranslateArgs {
			language: vec![args.language],
			base_language: args.base_language,
			..Default::default()
		},
	)
	.await
}

fn render_job(job: &JobReport) -> String {
	let request = &job.request;
	let mut out = String::new();
	let _ = writeln!(
		out,
		"Translating from {} to {}: {}",
		request.source, request.target, request.domain
	);

	match &job.outcome {
		Ok(report) => render_report(&mut out, request.dry_run, report),
		Err(err) => render_failure(&mut out, err),
	}

	out.push('\n');
	out
}

fn render_report(out: &mut String, dry_run: bool, report: &SyncReport) {
	if report.status == SyncStatus::UpToDate {
		let _ = writeln!(out, "No missing keys found. Skipping...");
		return;
	}

	let _ = writeln!(out, "Generated translations ({} turns):", report.turns);
	for (key, value) in report.translations.iter() {
		let _ = writeln!(out, "{key}: {}", json_string(value));
	}

	if let SyncStatus::Incomplete { missing } = &report.status {
		let _ = writeln!(out, "Incomplete, still missing: {}", missing.join(", "));
	}
	for rejected in &report.rejected {
		let _ = writeln!(out, "Rejected: {rejected}");
	}

	if report.written {
		let _ = writeln!(out, "Wrote {}", report.target);
	} else if dry_run {
		let _ = writeln!(out, "Dry run, {} left untouched", report.target);
	}
}

fn render_failure(out: &mut String, err: &SyncError) {
	let _ = writeln!(out, "Failed: {err}");
	match err {
		SyncError::ConvergenceTimeout { missing, .. } => {
			let _ = writeln!(out, "Still missing: {}", missing.join(", "));
		}
		SyncError::TargetConflict { rejected, .. } => {
			for rejected in rejected {
				let _ = writeln!(out, "Rejected: {rejected}");
			}
		}
		_ => {}
	}
	if let Some(partial) = err.partial().filter(|p| !p.is_empty()) {
		let _ = writeln!(
			out,
			"{} translations were discarded; rerun with --allow-incomplete to keep them",
			partial.len()
		);
	}
}

fn json_string(value: &str) -> String {
	serde_json::to_string(value).unwrap_or_else(|_| format!("{value:?}"))
}
