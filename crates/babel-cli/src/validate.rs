// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt::Write as _;

use anyhow::{Context, Result};
use babel_sync::MissingReport;

use crate::app::App;
use crate::ValidateArgs;

const KEY_WIDTH: usize = 100;
const VALUE_WIDTH: usize = 70;

pub async fn run(app: &App, args: ValidateArgs) -> Result<()> {
	let engine = app.offline_engine()?;
	let source = app.source_language().to_string();
	let languages = app
		.target_languages(args.language.as_slice(), &[])
		.await?;
	let domains = app.domains(args.domain.as_slice(), &[]).await?;

	println!("Checking translations...");
	println!("Source: {source}");
	println!("Languages: {}", languages.join(", "));
	println!("Domains: {}", domains.join(", "));
	println!();

	let reports = engine
		.list_missing(&source, &languages, &domains)
		.await
		.context("failed to compare catalogs")?;

	if args.verbose {
		print!("{}", render_verbose(&reports));
	} else {
		print!("{}", render_summary(&reports));
	}
	Ok(())
}

/// `-` when the target catalog does not exist, `ok` when complete, otherwise
/// the number of missing keys.
fn status_cell(report: &MissingReport) -> String {
	if !report.target_exists {
		"-".to_string()
	} else if report.is_complete() {
		"ok".to_string()
	} else {
		report.missing.len().to_string()
	}
}

fn render_summary(reports: &[MissingReport]) -> String {
	let mut rows: Vec<Vec<String>> = reports
		.iter()
		.map(|r| vec![r.target.to_string(), status_cell(r)])
		.collect();
	rows.sort();
	render_table(&["Domain", "Missing Keys"], &rows)
}

fn render_verbose(reports: &[MissingReport]) -> String {
	let mut out = String::new();
	for report in reports {
		let (domain, language) = (report.target.domain.as_str(), report.target.language.as_str());
		if report.is_complete() {
			let _ = writeln!(out, "No missing translations for {domain} in {language}");
		} else {
			let _ = writeln!(out, "Missing translations for `{domain}` in `{language}`:");
			let rows: Vec<Vec<String>> = report
				.missing
				.iter()
				.map(|key| {
					let text = report.source_texts.get(key).map(String::as_str).unwrap_or("");
					vec![limit(key, KEY_WIDTH), limit(text, VALUE_WIDTH)]
				})
				.collect();
			out.push_str(&render_table(&["Key", "Value"], &rows));
		}
		out.push('\n');
	}
	out
}

fn limit(text: &str, width: usize) -> String {
	if text.chars().count() <= width {
		return text.to_string();
	}
	let mut cut: String = text.chars().take(width).collect();
	cut.push_str("...");
	cut
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
	let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
	for row in rows {
		for (width, cell) in widths.iter_mut().zip(row) {
			*width = (*width).max(cell.chars().count());
		}
	}

	let mut out = table_line(headers.iter().copied(), &widths);
	let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
	let _ = writeln!(out, "|-{}-|", rule.join("-|-"));
	for row in rows {
		out.push_str(&table_line(row.iter().map(String::as_str), &widths));
	}
	out
}

fn table_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
	let padded: Vec<String> = cells
		.zip(widths)
		.map(|(cell, &width)| format!("{cell:<width$}"))
		.collect();
	format!("| {} |\n", padded.join(" | "))
}

#[cfg(test)]
mod tests {
	use super::*;
	use babel_catalog::{Catalog, CatalogKey, MemoryStore};
	use babel_cli_config::{BabelConfig, ConfigLayer, PathsConfig};
	use std::sync::Arc;

	fn catalog(language: &str, pairs: &[(&str, &str)]) -> Catalog {
		let mut catalog = Catalog::new(language, "auth");
		for (key, value) in pairs {
			catalog.set(key, *value).unwrap();
		}
		catalog
	}

	async fn reports(store: MemoryStore, languages: &[&str]) -> Vec<MissingReport> {
		let config = BabelConfig::from_layer(ConfigLayer::default(), PathsConfig::default()).unwrap();
		let app = App::with_store(config, Arc::new(store));
		let languages: Vec<String> = languages.iter().map(|s| s.to_string()).collect();
		app.offline_engine()
			.unwrap()
			.list_missing("en", &languages, &["auth".to_string()])
			.await
			.unwrap()
	}

	#[tokio::test]
	async fn summary_distinguishes_absent_complete_and_partial() {
		let store = MemoryStore::with_catalogs([
			catalog("en", &[("failed", "Login failed."), ("throttle", "Slow down.")]),
			catalog("de", &[("failed", "Fehlgeschlagen."), ("throttle", "Langsamer.")]),
			catalog("fr", &[("failed", "Échec.")]),
		]);

		let out = render_summary(&reports(store, &["de", "es", "fr"]).await);

		assert!(out.contains("| de/auth | ok "));
		assert!(out.contains("| es/auth | -  "));
		assert!(out.contains("| fr/auth | 1  "));
		let de = out.find("de/auth").unwrap();
		let es = out.find("es/auth").unwrap();
		assert!(de < es);
	}

	#[tokio::test]
	async fn verbose_lists_missing_keys_with_source_text() {
		let store = MemoryStore::with_catalogs([
			catalog("en", &[("failed", "Login failed."), ("throttle", "Slow down.")]),
			catalog("fr", &[("failed", "Échec.")]),
		]);

		let out = render_verbose(&reports(store, &["fr"]).await);

		assert!(out.contains("Missing translations for `auth` in `fr`:"));
		assert!(out.contains("| throttle | Slow down. |"));
		assert!(!out.contains("| failed"));
	}

	#[test]
	fn long_cells_are_truncated() {
		assert_eq!(limit("abcdef", 3), "abc...");
		assert_eq!(limit("äöü", 3), "äöü");
	}

	#[test]
	fn table_columns_are_aligned() {
		let table = render_table(
			&["Domain", "Missing Keys"],
			&[vec!["de/validation".to_string(), "12".to_string()]],
		);
		let lines: Vec<&str> = table.lines().collect();
		assert_eq!(lines[0], "| Domain        | Missing Keys |");
		assert_eq!(lines[1], "|---------------|--------------|");
		assert_eq!(lines[2], "| de/validation | 12           |");
	}

	#[test]
	fn status_cell_prefers_absence() {
		let report = MissingReport {
			source: CatalogKey::new("en", "auth"),
			target: CatalogKey::new("nl", "auth"),
			target_exists: false,
			missing: Default::default(),
			source_texts: Default::default(),
		};
		assert_eq!(status_cell(&report), "-");
	}
}
