// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use babel_cli_config::{load_config_with_cli, CliOverrides, LogFormat, LogLevel, LoggingConfig};

mod app;
mod improve;
mod translate;
mod validate;

use app::App;

/// babel - keep translation catalogs in sync with an AI translator
#[derive(Parser, Debug)]
#[command(name = "babel", version, about, long_about = None)]
struct Args {
	/// Path to an additional configuration file
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Root directory of the language catalogs
	#[arg(long)]
	lang_path: Option<PathBuf>,

	/// Log level (overrides config)
	#[arg(short, long)]
	log_level: Option<String>,

	/// Output logs as JSON (overrides config)
	#[arg(long)]
	json_logs: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Translate missing keys into every target language
	Translate(TranslateArgs),

	/// Report missing translations without calling the translator
	Validate(ValidateArgs),

	/// Chat with the translator to review one catalog
	Improve(ImproveArgs),

	/// Add a new language by translating every domain into it
	Add(AddArgs),
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct TranslateArgs {
	/// Target languages (comma separated)
	#[arg(long, value_delimiter = ',')]
	pub language: Vec<String>,

	/// Domains to translate (comma separated)
	#[arg(long, value_delimiter = ',')]
	pub domain: Vec<String>,

	/// The language to translate from
	#[arg(long)]
	pub base_language: Option<String>,

	/// Languages to leave alone
	#[arg(long, value_delimiter = ',')]
	pub skip_languages: Vec<String>,

	/// Domains to leave alone
	#[arg(long, value_delimiter = ',')]
	pub skip_domains: Vec<String>,

	/// Translate every key again, even in complete catalogs
	#[arg(long)]
	pub force: bool,

	/// Print the translations without writing them
	#[arg(long)]
	pub dry_run: bool,

	/// Write partial results when the translator does not converge
	#[arg(long)]
	pub allow_incomplete: bool,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct ValidateArgs {
	#[arg(long)]
	pub language: Option<String>,

	#[arg(long)]
	pub domain: Option<String>,

	#[arg(long)]
	pub base_language: Option<String>,

	/// List every missing key with its source text
	#[arg(short, long)]
	pub verbose: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ImproveArgs {
	pub domain: String,

	pub language: String,

	#[arg(long)]
	pub base_language: Option<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct AddArgs {
	pub language: String,

	#[arg(long)]
	pub base_language: Option<String>,
}

impl Command {
	fn base_language(&self) -> Option<String> {
		match self {
			Command::Translate(args) => args.base_language.clone(),
			Command::Validate(args) => args.base_language.clone(),
			Command::Improve(args) => args.base_language.clone(),
			Command::Add(args) => args.base_language.clone(),
		}
	}
}

impl From<&Args> for CliOverrides {
	fn from(args: &Args) -> Self {
		let allow_incomplete = match &args.command {
			Command::Translate(translate) if translate.allow_incomplete => Some(true),
			_ => None,
		};

		CliOverrides {
			config_file: args.config.clone(),
			lang_path: args.lang_path.clone(),
			source_language: args.command.base_language(),
			model: None,
			allow_incomplete,
			log_level: args.log_level.clone(),
			log_format: if args.json_logs {
				Some("json".to_string())
			} else {
				None
			},
		}
	}
}

fn log_level_to_tracing(level: LogLevel) -> tracing::Level {
	match level {
		LogLevel::Trace => tracing::Level::TRACE,
		LogLevel::Debug => tracing::Level::DEBUG,
		LogLevel::Info => tracing::Level::INFO,
		LogLevel::Warn => tracing::Level::WARN,
		LogLevel::Error => tracing::Level::ERROR,
	}
}

/// Logs go to stderr; stdout carries command output.
fn init_tracing(logging: &LoggingConfig) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(format!("babel={}", log_level_to_tracing(logging.level))));

	match logging.format {
		LogFormat::Json => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().json().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Compact => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().compact().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Pretty => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().with_writer(std::io::stderr))
				.init();
		}
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let cli_overrides = CliOverrides::from(&args);
	let config = load_config_with_cli(cli_overrides).context("failed to load configuration")?;

	init_tracing(&config.logging);

	info!(
			lang_path = %config.catalog.lang_path.display(),
			source_language = %config.catalog.source_language,
			"starting babel"
	);

	let app = App::new(config);
	app.cancel_on_ctrl_c();

	match args.command {
		Command::Translate(translate) => translate::run(&app, translate).await,
		Command::Validate(validate) => validate::run(&app, validate).await,
		Command::Improve(improve) => improve::run(&app, improve).await,
		Command::Add(add) => translate::add_language(&app, add).await,
	}
}
