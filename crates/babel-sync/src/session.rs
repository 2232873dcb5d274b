// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Interactive refinement of one catalog pair together with a human.

use std::sync::Arc;

use babel_catalog::{CatalogKey, CatalogStore};
use babel_common_core::{
	LlmClient, LlmRequest, Message, ToolCall, ToolChoice, ToolDefinition, ToolError,
};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::config::SyncConfig;
use crate::error::SessionError;
use crate::merge::normalize_batch;
use crate::prompt::{
	load_translation_file_tool, refinement_system_prompt, session_opening_message,
	session_translate_tool, LOAD_TRANSLATION_FILE_TOOL, TRANSLATE_TOOL,
};

/// Input of the session `translate` tool.
#[derive(Debug, Deserialize)]
pub struct TranslateInput {
	pub language: String,
	pub domain: String,
	pub translations: serde_json::Value,
}

/// Input of the `load_translation_file` tool.
#[derive(Debug, Deserialize)]
pub struct LoadCatalogInput {
	pub language: String,
	pub domain: String,
}

/// The agent names catalogs itself; anything that is not a plain
/// language/domain pair is refused before it reaches the store.
fn checked_key(language: &str, domain: &str) -> Result<CatalogKey, ToolError> {
	let key = CatalogKey::new(language, domain);
	key.validate()
		.map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
	Ok(key)
}

/// Result of one tool call made during a human turn.
#[derive(Clone, Debug)]
pub struct ToolOutcome {
	pub call_id: String,
	pub tool_name: String,
	pub result: Result<String, ToolError>,
}

impl ToolOutcome {
	pub fn succeeded(&self) -> bool {
		self.result.is_ok()
	}
}

/// The agent's answer to a human turn.
#[derive(Clone, Debug)]
pub struct SessionReply {
	pub text: String,
	pub tool_outcomes: Vec<ToolOutcome>,
}

/// A multi-turn conversation over a `(domain, source, target)` triple.
///
/// Writes requested by the agent go straight to the store. There is no
/// convergence condition; the session lasts until the human stops sending
/// turns.
pub struct RefinementSession {
	client: Arc<dyn LlmClient>,
	store: Arc<dyn CatalogStore>,
	config: SyncConfig,
	domain: String,
	source: String,
	target: String,
	conversation: Vec<Message>,
	started: bool,
}

impl RefinementSession {
	/// Loads both catalogs and seeds the conversation with them.
	pub async fn open(
		client: Arc<dyn LlmClient>,
		store: Arc<dyn CatalogStore>,
		config: SyncConfig,
		domain: impl Into<String>,
		source: impl Into<String>,
		target: impl Into<String>,
	) -> Result<Self, SessionError> {
		let domain = domain.into();
		let source = source.into();
		let target = target.into();
		if source == target {
			return Err(SessionError::InvalidTarget(format!(
				"target language '{target}' is the source language"
			)));
		}

		let source_catalog = store.load(&source, &domain).await?;
		let target_catalog = store.load(&target, &domain).await?;
		let conversation = vec![
			Message::system(refinement_system_prompt(&config.translator_context)),
			Message::user(session_opening_message(
				&domain,
				&source_catalog,
				&target_catalog,
			)),
		];

		info!(
				domain = %domain,
				source = %source,
				target = %target,
				"opened refinement session"
		);

		Ok(Self {
			client,
			store,
			config,
			domain,
			source,
			target,
			conversation,
			started: false,
		})
	}

	pub fn domain(&self) -> &str {
		&self.domain
	}

	pub fn source_language(&self) -> &str {
		&self.source
	}

	pub fn target_language(&self) -> &str {
		&self.target
	}

	pub fn conversation(&self) -> &[Message] {
		&self.conversation
	}

	/// Sends the seeded opening turn and returns the agent's analysis.
	pub async fn begin(&mut self) -> Result<SessionReply, SessionError> {
		if self.started {
			return Err(SessionError::AlreadyStarted);
		}
		self.started = true;
		self.run_agent().await
	}

	/// Appends a human message and runs the agent until it answers in text.
	pub async fn send_human_turn(&mut self, text: &str) -> Result<SessionReply, SessionError> {
		if !self.started {
			return Err(SessionError::NotStarted);
		}
		self.conversation.push(Message::user(text));
		self.run_agent().await
	}

	fn tools() -> Vec<ToolDefinition> {
		vec![session_translate_tool(), load_translation_file_tool()]
	}

	#[instrument(skip(self), fields(domain = %self.domain, target = %self.target))]
	async fn run_agent(&mut self) -> Result<SessionReply, SessionError> {
		let mut outcomes = Vec::new();

		for round in 0..=self.config.max_tool_rounds {
			let request = LlmRequest::new(self.config.model.clone())
				.with_messages(self.conversation.clone())
				.with_tools(Self::tools())
				.with_tool_choice(ToolChoice::Auto)
				.with_max_tokens(self.config.max_tokens)
				.with_temperature(self.config.temperature);

			let response = self
				.client
				.complete_streaming(request)
				.await?
				.into_response(|_| {})
				.await?;

			self.conversation.push(Message::assistant_with_tool_calls(
				response.message.content.clone(),
				response.tool_calls.clone(),
			));

			if response.tool_calls.is_empty() {
				debug!(round, tool_calls = outcomes.len(), "agent answered");
				return Ok(SessionReply {
					text: response.message.content,
					tool_outcomes: outcomes,
				});
			}

			if round == self.config.max_tool_rounds {
				// Every tool call needs a result before the next human turn.
				for call in &response.tool_calls {
					self.conversation.push(Message::tool_error(
						&call.id,
						"Tool round limit reached. Answer the human without calling tools.",
					));
				}
				break;
			}

			for call in &response.tool_calls {
				let outcome = self.execute_tool(call).await;
				let message = match &outcome.result {
					Ok(content) => Message::tool_result(&call.id, content.clone()),
					Err(err) => Message::tool_error(&call.id, err.to_string()),
				};
				self.conversation.push(message);
				outcomes.push(outcome);
			}
		}

		warn!(
			max_tool_rounds = self.config.max_tool_rounds,
			"agent kept calling tools"
		);
		Err(SessionError::ToolRoundsExceeded(self.config.max_tool_rounds))
	}

	async fn execute_tool(&self, call: &ToolCall) -> ToolOutcome {
		let result = match call.tool_name.as_str() {
			TRANSLATE_TOOL => self.translate(call).await,
			LOAD_TRANSLATION_FILE_TOOL => self.load_translation_file(call).await,
			other => Err(ToolError::NotFound(other.to_string())),
		};
		if let Err(err) = &result {
			warn!(tool = %call.tool_name, error = %err, "tool call failed");
		}
		ToolOutcome {
			call_id: call.id.clone(),
			tool_name: call.tool_name.clone(),
			result,
		}
	}

	async fn translate(&self, call: &ToolCall) -> Result<String, ToolError> {
		let input: TranslateInput = serde_json::from_value(call.arguments_json.clone())?;
		checked_key(&input.language, &input.domain)?;
		if input.language == self.source {
			return Err(ToolError::InvalidTarget(format!(
				"'{}' is the source language of this session; translations can only be written to other languages",
				input.language
			)));
		}

		let normalized = normalize_batch(&input.translations);
		for violation in &normalized.violations {
			debug!(violation = %violation, "normalized session batch");
		}
		if normalized.batch.is_empty() {
			return Err(ToolError::InvalidArguments(
				"`translations` must be a non-empty object of dot-notation keys".to_string(),
			));
		}

		let mut catalog = self
			.store
			.load(&input.language, &input.domain)
			.await
			.map_err(|e| ToolError::Io(e.to_string()))?;
		let report = catalog.apply(normalized.batch);
		if report.applied == 0 {
			let reasons: Vec<String> = report.rejected.iter().map(ToString::to_string).collect();
			return Err(ToolError::InvalidArguments(reasons.join("; ")));
		}
		self.store
			.store(&catalog)
			.await
			.map_err(|e| ToolError::Io(e.to_string()))?;

		info!(
				catalog = %catalog.key(),
				applied = report.applied,
				rejected = report.rejected.len(),
				"session wrote translations"
		);

		let mut summary = format!(
			"Wrote {} translations to {}.",
			report.applied,
			catalog.key()
		);
		for rejected in &report.rejected {
			summary.push_str(&format!("\nRejected: {rejected}"));
		}
		Ok(summary)
	}

	async fn load_translation_file(&self, call: &ToolCall) -> Result<String, ToolError> {
		let input: LoadCatalogInput = serde_json::from_value(call.arguments_json.clone())?;
		let key = checked_key(&input.language, &input.domain)?;
		let catalog = self
			.store
			.load(&key.language, &key.domain)
			.await
			.map_err(|e| ToolError::Io(e.to_string()))?;
		Ok(catalog.to_json())
	}
}
