// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt::Write as _;
use std::io::Write as _;

use anyhow::{Context, Result};
use babel_sync::{SessionError, SessionReply};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::app::App;
use crate::ImproveArgs;

const EXIT_COMMAND: &str = "/exit";

pub async fn run(app: &App, args: ImproveArgs) -> Result<()> {
	let engine = app.engine()?;
	let source = app.source_language();
	let cancel = app.cancellation_token();

	let mut session = engine
		.start_refinement_session(&args.domain, source, &args.language)
		.await
		.with_context(|| format!("failed to open {}/{}", args.language, args.domain))?;

	println!(
		"Reviewing {}/{} against {source}. Type {EXIT_COMMAND} or press Ctrl-D to stop.",
		args.language, args.domain
	);
	println!();

	let reply = tokio::select! {
		_ = cancel.cancelled() => return Ok(()),
		reply = session.begin() => reply.context("translator did not answer")?,
	};
	print!("{}", render_reply(&reply));

	let mut lines = BufReader::new(tokio::io::stdin()).lines();
	let mut turns = 0u32;
	loop {
		print!("> ");
		let _ = std::io::stdout().flush();

		let line = tokio::select! {
			_ = cancel.cancelled() => break,
			line = lines.next_line() => line.context("failed to read from stdin")?,
		};
		let Some(line) = line else {
			break;
		};
		let text = line.trim();
		if text.is_empty() {
			continue;
		}
		if text == EXIT_COMMAND {
			break;
		}

		let result = tokio::select! {
			_ = cancel.cancelled() => break,
			result = session.send_human_turn(text) => result,
		};
		turns += 1;

		match result {
			Ok(reply) => print!("{}", render_reply(&reply)),
			Err(SessionError::ToolRoundsExceeded(rounds)) => {
				warn!(rounds, "translator kept calling tools without answering");
				println!("The translator made {rounds} tool calls without answering. Try rephrasing.");
				println!();
			}
			Err(err) => return Err(err).context("refinement session failed"),
		}
	}

	info!(turns, domain = %args.domain, language = %args.language, "refinement session ended");
	Ok(())
}

fn render_reply(reply: &SessionReply) -> String {
	let mut out = String::new();
	for outcome in &reply.tool_outcomes {
		match &outcome.result {
			Ok(summary) => {
				let _ = writeln!(out, "[{}] {summary}", outcome.tool_name);
			}
			Err(err) => {
				let _ = writeln!(out, "[{} failed] {err}", outcome.tool_name);
			}
		}
	}

	let text = reply.text.trim();
	let _ = writeln!(out, "{}", if text.is_empty() { "..." } else { text });
	out.push('\n');
	out
}
