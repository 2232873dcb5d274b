// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! The convergence loop: drives the agent until every required key is translated.
//!
//! [`ConvergenceLoop`] is a pure state machine. It consumes
//! [`ConvergenceEvent`]s and answers with the [`ConvergenceAction`] the caller
//! must perform next. [`run_convergence`] is the async driver that performs
//! those actions against an [`LlmClient`].

use std::time::Duration;

use babel_catalog::{Catalog, MissingKeySet};
use babel_common_core::{LlmClient, LlmError, LlmRequest, LlmResponse, Message, ToolChoice};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::merge::{normalize, TranslationResult, Violation};
use crate::prompt::{
	corrective_directive, translate_tool, translation_message, translator_system_prompt,
	TRANSLATE_TOOL,
};

/// Inputs of one synchronization pass.
#[derive(Clone, Debug)]
pub struct ConvergenceInput {
	pub source: Catalog,
	pub target: Catalog,
	/// Keys to translate; empty means every key of `source`.
	pub missing: MissingKeySet,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConvergencePhase {
	Requesting,
	AwaitingAgent,
	EvaluatingCoverage,
	Converged,
	RateLimited,
	Failed,
	Aborted,
}

impl ConvergencePhase {
	pub fn name(self) -> &'static str {
		match self {
			Self::Requesting => "Requesting",
			Self::AwaitingAgent => "AwaitingAgent",
			Self::EvaluatingCoverage => "EvaluatingCoverage",
			Self::Converged => "Converged",
			Self::RateLimited => "RateLimited",
			Self::Failed => "Failed",
			Self::Aborted => "Aborted",
		}
	}

	pub fn is_terminal(self) -> bool {
		matches!(self, Self::Converged | Self::Failed | Self::Aborted)
	}
}

/// State accumulated by the loop across turns.
#[derive(Clone, Debug, Default)]
pub struct ConvergenceState {
	pub result: TranslationResult,
	pub conversation: Vec<Message>,
	/// Turns taken in the current attempt.
	pub attempt_turns: u32,
	/// Turns taken across all attempts.
	pub total_turns: u32,
	pub rate_limit_restarts: u32,
	pub violations: Vec<Violation>,
}

#[derive(Debug)]
pub enum ConvergenceEvent {
	Start,
	AgentResponded(LlmResponse),
	AgentFailed(LlmError),
	BackoffElapsed,
	Cancelled,
}

impl ConvergenceEvent {
	fn name(&self) -> &'static str {
		match self {
			Self::Start => "Start",
			Self::AgentResponded(_) => "AgentResponded",
			Self::AgentFailed(_) => "AgentFailed",
			Self::BackoffElapsed => "BackoffElapsed",
			Self::Cancelled => "Cancelled",
		}
	}
}

#[derive(Debug)]
pub enum ConvergenceAction {
	/// Send this request to the agent and report its outcome.
	SendRequest(LlmRequest),
	/// Wait this long, then report [`ConvergenceEvent::BackoffElapsed`].
	Backoff(Duration),
	Finish(ConvergenceReport),
	Fail(SyncError),
}

/// Outcome of a converged loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvergenceReport {
	pub result: TranslationResult,
	pub turns: u32,
	pub rate_limit_restarts: u32,
	pub violations: Vec<Violation>,
}

pub struct ConvergenceLoop {
	phase: ConvergencePhase,
	state: ConvergenceState,
	config: SyncConfig,
	source: Catalog,
	target: Catalog,
	initial_missing: Vec<String>,
	required: Vec<String>,
}

impl ConvergenceLoop {
	pub fn new(input: ConvergenceInput, config: SyncConfig) -> Self {
		let initial_missing = input.missing.into_vec();
		let required = if initial_missing.is_empty() {
			input.source.flatten()
		} else {
			initial_missing.clone()
		};
		debug!(
				source = %input.source.key(),
				target = %input.target.key(),
				required = required.len(),
				full = initial_missing.is_empty(),
				"creating convergence loop"
		);
		Self {
			phase: ConvergencePhase::Requesting,
			state: ConvergenceState::default(),
			config,
			source: input.source,
			target: input.target,
			initial_missing,
			required,
		}
	}

	pub fn phase(&self) -> ConvergencePhase {
		self.phase
	}

	pub fn state(&self) -> &ConvergenceState {
		&self.state
	}

	/// Keys the loop must produce. Fixed for the lifetime of the loop.
	pub fn required(&self) -> &[String] {
		&self.required
	}

	/// Required keys the accumulated result does not cover yet.
	///
	/// An empty translation only counts as missing when the source text is
	/// not empty itself.
	pub fn still_missing(&self) -> Vec<String> {
		self.required
			.iter()
			.filter(|key| match self.state.result.get(key) {
				None => true,
				Some(text) if text.trim().is_empty() => self
					.source
					.get(key)
					.map(|s| !s.trim().is_empty())
					.unwrap_or(true),
				Some(_) => false,
			})
			.cloned()
			.collect()
	}

	/// Handles an event and returns the action the caller should perform.
	pub fn handle_event(&mut self, event: ConvergenceEvent) -> ConvergenceAction {
		debug!(phase = self.phase.name(), event = event.name(), "handling event");

		match (self.phase, event) {
			(ConvergencePhase::Requesting, ConvergenceEvent::Start) => {
				if self.required.is_empty() {
					self.transition(ConvergencePhase::Converged);
					return ConvergenceAction::Finish(self.report());
				}
				self.start_attempt()
			}

			(ConvergencePhase::AwaitingAgent, ConvergenceEvent::AgentResponded(response)) => {
				self.transition(ConvergencePhase::EvaluatingCoverage);
				self.evaluate(response)
			}

			(ConvergencePhase::AwaitingAgent, ConvergenceEvent::AgentFailed(err)) => {
				if !err.is_capacity_exceeded() {
					warn!(error = %err, "agent failed");
					self.transition(ConvergencePhase::Failed);
					return ConvergenceAction::Fail(SyncError::AgentFailure(err));
				}

				if self.state.rate_limit_restarts >= self.config.max_rate_limit_restarts {
					warn!(
							error = %err,
							restarts = self.state.rate_limit_restarts,
							"rate limit restarts exhausted"
					);
					self.transition(ConvergencePhase::Failed);
					return ConvergenceAction::Fail(SyncError::RateLimitExhausted {
						restarts: self.state.rate_limit_restarts,
					});
				}

				self.state.rate_limit_restarts += 1;
				let delay = match err {
					LlmError::RateLimited {
						retry_after_secs: Some(secs),
					} => self.config.rate_limit_backoff.max(Duration::from_secs(secs)),
					_ => self.config.rate_limit_backoff,
				};
				warn!(
						error = %err,
						restart = self.state.rate_limit_restarts,
						delay_secs = delay.as_secs(),
						"agent rate limited, backing off"
				);
				self.transition(ConvergencePhase::RateLimited);
				ConvergenceAction::Backoff(delay)
			}

			(ConvergencePhase::RateLimited, ConvergenceEvent::BackoffElapsed) => {
				if !self.config.resume_after_rate_limit {
					self.state.result.clear();
				}
				self.transition(ConvergencePhase::Requesting);
				self.start_attempt()
			}

			(phase, ConvergenceEvent::Cancelled) if !phase.is_terminal() => {
				info!(
						translated = self.state.result.len(),
						"convergence loop cancelled"
				);
				self.transition(ConvergencePhase::Aborted);
				ConvergenceAction::Fail(SyncError::Aborted {
					turns: self.state.total_turns,
					partial: std::mem::take(&mut self.state.result),
					rate_limit_restarts: self.state.rate_limit_restarts,
					violations: self.state.violations.len(),
				})
			}

			(phase, event) => {
				warn!(
						phase = phase.name(),
						event = event.name(),
						"invalid state transition"
				);
				self.transition(ConvergencePhase::Failed);
				ConvergenceAction::Fail(SyncError::Internal(format!(
					"event {} is not valid in phase {}",
					event.name(),
					phase.name()
				)))
			}
		}
	}

	fn transition(&mut self, to: ConvergencePhase) {
		info!(from = self.phase.name(), to = to.name(), "state transition");
		self.phase = to;
	}

	/// Seeds a fresh conversation and issues its first turn.
	fn start_attempt(&mut self) -> ConvergenceAction {
		let system = translator_system_prompt(
			&self.config.translator_context,
			self.source.language(),
			self.target.language(),
		);

		let opening = if self.state.result.is_empty() {
			translation_message(&self.source, &self.target, &self.initial_missing)
		} else {
			let still_missing = self.still_missing();
			let mut patched = self.target.clone();
			patched.apply(self.state.result.iter());
			format!(
				"{}\n\n{}",
				translation_message(&self.source, &patched, &still_missing),
				corrective_directive(&still_missing)
			)
		};

		self.state.conversation = vec![Message::system(system), Message::user(opening)];
		self.state.attempt_turns = 0;
		self.request()
	}

	fn request(&mut self) -> ConvergenceAction {
		if self.state.attempt_turns >= self.config.max_turns {
			return self.timeout(self.still_missing());
		}
		self.state.attempt_turns += 1;
		self.state.total_turns += 1;
		self.transition(ConvergencePhase::AwaitingAgent);

		let request = LlmRequest::new(self.config.model.clone())
			.with_messages(self.state.conversation.clone())
			.with_tools(vec![translate_tool()])
			.with_tool_choice(ToolChoice::forced(TRANSLATE_TOOL))
			.with_max_tokens(self.config.max_tokens)
			.with_temperature(self.config.temperature);
		ConvergenceAction::SendRequest(request)
	}

	fn timeout(&mut self, missing: Vec<String>) -> ConvergenceAction {
		warn!(
				turns = self.state.attempt_turns,
				missing = missing.len(),
				"convergence turn limit reached"
		);
		self.transition(ConvergencePhase::Failed);
		ConvergenceAction::Fail(SyncError::ConvergenceTimeout {
			turns: self.state.total_turns,
			partial: std::mem::take(&mut self.state.result),
			missing,
			rate_limit_restarts: self.state.rate_limit_restarts,
			violations: self.state.violations.len(),
		})
	}

	fn evaluate(&mut self, response: LlmResponse) -> ConvergenceAction {
		self.state.conversation.push(Message::assistant_with_tool_calls(
			response.message.content.clone(),
			response.tool_calls.clone(),
		));

		let mut replies = Vec::with_capacity(response.tool_calls.len());
		let mut saw_translate = false;
		for call in &response.tool_calls {
			if call.tool_name != TRANSLATE_TOOL {
				warn!(tool = %call.tool_name, "agent called an unknown tool");
				replies.push(Message::tool_error(
					&call.id,
					format!("Unknown tool `{}`. Only `{TRANSLATE_TOOL}` is available.", call.tool_name),
				));
				continue;
			}
			saw_translate = true;
			let mut normalized = normalize(&call.arguments_json);
			let received = normalized.batch.len();
			let added = self.state.result.merge(normalized.batch);
			self.state.violations.append(&mut normalized.violations);
			debug!(received, added, "merged agent batch");
			replies.push(Message::tool_result(
				&call.id,
				format!("Received {received} translations."),
			));
		}
		if !saw_translate {
			warn!("agent answered without calling the translate tool");
			self.state.violations.push(Violation::NoToolCall);
		}

		let still_missing = self.still_missing();
		info!(
				turn = self.state.attempt_turns,
				translated = self.state.result.len(),
				missing = still_missing.len(),
				"evaluated coverage"
		);

		if still_missing.is_empty() {
			self.transition(ConvergencePhase::Converged);
			return ConvergenceAction::Finish(self.report());
		}
		if self.state.attempt_turns >= self.config.max_turns {
			return self.timeout(still_missing);
		}

		let directive = corrective_directive(&still_missing);
		match replies.last_mut() {
			Some(last) => {
				last.content.push_str("\n\n");
				last.content.push_str(&directive);
			}
			None => replies.push(Message::user(directive)),
		}
		self.state.conversation.extend(replies);

		self.transition(ConvergencePhase::Requesting);
		self.request()
	}

	fn report(&mut self) -> ConvergenceReport {
		ConvergenceReport {
			result: std::mem::take(&mut self.state.result),
			turns: self.state.total_turns,
			rate_limit_restarts: self.state.rate_limit_restarts,
			violations: std::mem::take(&mut self.state.violations),
		}
	}
}

/// Runs a convergence loop to completion against `client`.
///
/// Cancellation is checked before every turn and raced against both the
/// in-flight turn and the rate-limit backoff, so a cancelled job stops without
/// waiting for the agent. The answer of an interrupted turn is dropped and the
/// result holds only what earlier turns produced.
#[instrument(
	skip(client, input, config, cancel),
	fields(source = %input.source.key(), target = %input.target.key())
)]
pub async fn run_convergence(
	client: &dyn LlmClient,
	input: ConvergenceInput,
	config: &SyncConfig,
	cancel: &CancellationToken,
) -> Result<ConvergenceReport, SyncError> {
	let mut machine = ConvergenceLoop::new(input, config.clone());
	let mut action = machine.handle_event(ConvergenceEvent::Start);

	loop {
		let event = match action {
			ConvergenceAction::SendRequest(request) => {
				if cancel.is_cancelled() {
					ConvergenceEvent::Cancelled
				} else {
					tokio::select! {
						biased;
						_ = cancel.cancelled() => ConvergenceEvent::Cancelled,
						outcome = agent_turn(client, request) => match outcome {
							Ok(response) => ConvergenceEvent::AgentResponded(response),
							Err(err) => ConvergenceEvent::AgentFailed(err),
						},
					}
				}
			}
			ConvergenceAction::Backoff(delay) => {
				tokio::select! {
					biased;
					_ = cancel.cancelled() => ConvergenceEvent::Cancelled,
					_ = tokio::time::sleep(delay) => ConvergenceEvent::BackoffElapsed,
				}
			}
			ConvergenceAction::Finish(report) => {
				info!(
						turns = report.turns,
						keys = report.result.len(),
						restarts = report.rate_limit_restarts,
						violations = report.violations.len(),
						"converged"
				);
				return Ok(report);
			}
			ConvergenceAction::Fail(err) => return Err(err),
		};
		action = machine.handle_event(event);
	}
}

async fn agent_turn(client: &dyn LlmClient, request: LlmRequest) -> Result<LlmResponse, LlmError> {
	let stream = client.complete_streaming(request).await?;
	stream
		.into_response(|text| trace!(text, "agent text"))
		.await
}

#[cfg(test)]
mod tests {
	use super::*;
	use babel_common_core::{Role, ToolCall};
	use proptest::prelude::*;
	use serde_json::json;

	fn source_catalog(keys: &[&str]) -> Catalog {
		let mut catalog = Catalog::new("en", "auth");
		for key in keys {
			catalog.set(key, format!("text of {key}")).unwrap();
		}
		catalog
	}

	fn input(keys: &[&str]) -> ConvergenceInput {
		let source = source_catalog(keys);
		let target = Catalog::new("de", "auth");
		let missing = babel_catalog::diff(&source, &target);
		ConvergenceInput {
			source,
			target,
			missing,
		}
	}

	fn translate_response(id: &str, batch: serde_json::Value) -> LlmResponse {
		LlmResponse::with_tool_calls(vec![ToolCall {
			id: id.to_string(),
			tool_name: TRANSLATE_TOOL.to_string(),
			arguments_json: json!({ "translations": batch }),
		}])
	}

	fn expect_request(action: ConvergenceAction) -> LlmRequest {
		match action {
			ConvergenceAction::SendRequest(request) => request,
			other => panic!("expected SendRequest, got {other:?}"),
		}
	}

	#[test]
	fn start_sends_forced_translate_request() {
		let mut machine = ConvergenceLoop::new(input(&["failed"]), SyncConfig::default());
		let request = expect_request(machine.handle_event(ConvergenceEvent::Start));

		assert_eq!(machine.phase(), ConvergencePhase::AwaitingAgent);
		assert_eq!(
			request.tool_choice,
			Some(ToolChoice::forced(TRANSLATE_TOOL))
		);
		assert_eq!(request.messages[0].role, Role::System);
		assert!(request.messages[1].content.contains("<missing-keys>\nfailed\n"));
	}

	#[test]
	fn empty_source_converges_without_a_turn() {
		let mut machine = ConvergenceLoop::new(input(&[]), SyncConfig::default());
		match machine.handle_event(ConvergenceEvent::Start) {
			ConvergenceAction::Finish(report) => {
				assert_eq!(report.turns, 0);
				assert!(report.result.is_empty());
			}
			other => panic!("expected Finish, got {other:?}"),
		}
	}

	#[test]
	fn partial_batch_triggers_corrective_tool_result() {
		let mut machine = ConvergenceLoop::new(input(&["a", "b"]), SyncConfig::default());
		machine.handle_event(ConvergenceEvent::Start);

		let request = expect_request(machine.handle_event(ConvergenceEvent::AgentResponded(
			translate_response("call_1", json!({"a": "A"})),
		)));

		let last = request.messages.last().unwrap();
		assert_eq!(last.role, Role::Tool);
		assert_eq!(last.tool_call_id.as_deref(), Some("call_1"));
		assert!(last.content.contains("still missing:\nb"));
		assert_eq!(machine.required(), &["a".to_string(), "b".to_string()]);
	}

	#[test]
	fn response_without_tool_call_is_a_violation_and_retried() {
		let mut machine = ConvergenceLoop::new(input(&["a"]), SyncConfig::default());
		machine.handle_event(ConvergenceEvent::Start);

		let request = expect_request(
			machine.handle_event(ConvergenceEvent::AgentResponded(LlmResponse::text("Sure!"))),
		);
		let last = request.messages.last().unwrap();
		assert_eq!(last.role, Role::User);
		assert!(last.content.contains("still missing"));
		assert_eq!(machine.state().violations, vec![Violation::NoToolCall]);
	}

	#[test]
	fn empty_translation_of_non_empty_source_stays_missing() {
		let mut machine = ConvergenceLoop::new(input(&["a"]), SyncConfig::default());
		machine.handle_event(ConvergenceEvent::Start);
		let action = machine.handle_event(ConvergenceEvent::AgentResponded(translate_response(
			"call_1",
			json!({"a": "  "}),
		)));
		assert!(matches!(action, ConvergenceAction::SendRequest(_)));
		assert_eq!(machine.still_missing(), vec!["a".to_string()]);
	}

	#[test]
	fn turn_limit_yields_timeout_with_partial_result() {
		let config = SyncConfig {
			max_turns: 2,
			..SyncConfig::default()
		};
		let mut machine = ConvergenceLoop::new(input(&["a", "b", "c"]), config);
		machine.handle_event(ConvergenceEvent::Start);
		machine.handle_event(ConvergenceEvent::AgentResponded(translate_response(
			"call_1",
			json!({"a": "A"}),
		)));
		let action = machine.handle_event(ConvergenceEvent::AgentResponded(translate_response(
			"call_2",
			json!({"b": "B"}),
		)));

		match action {
			ConvergenceAction::Fail(SyncError::ConvergenceTimeout {
				turns,
				partial,
				missing,
				..
			}) => {
				assert_eq!(turns, 2);
				assert_eq!(partial.len(), 2);
				assert_eq!(missing, vec!["c".to_string()]);
			}
			other => panic!("expected timeout, got {other:?}"),
		}
		assert_eq!(machine.phase(), ConvergencePhase::Failed);
	}

	#[test]
	fn rate_limit_backs_off_then_restarts_from_scratch() {
		let mut machine = ConvergenceLoop::new(input(&["a", "b"]), SyncConfig::default());
		machine.handle_event(ConvergenceEvent::Start);
		machine.handle_event(ConvergenceEvent::AgentResponded(translate_response(
			"call_1",
			json!({"a": "A"}),
		)));

		let action = machine.handle_event(ConvergenceEvent::AgentFailed(LlmError::Api(
			"Overloaded".to_string(),
		)));
		assert!(matches!(action, ConvergenceAction::Backoff(d) if d == Duration::from_secs(60)));
		assert_eq!(machine.phase(), ConvergencePhase::RateLimited);

		let request = expect_request(machine.handle_event(ConvergenceEvent::BackoffElapsed));
		assert_eq!(request.messages.len(), 2);
		assert!(machine.state().result.is_empty());
		assert_eq!(machine.state().rate_limit_restarts, 1);
	}

	#[test]
	fn resume_keeps_partial_result_and_asks_for_the_rest() {
		let config = SyncConfig {
			resume_after_rate_limit: true,
			..SyncConfig::default()
		};
		let mut machine = ConvergenceLoop::new(input(&["a", "b"]), config);
		machine.handle_event(ConvergenceEvent::Start);
		machine.handle_event(ConvergenceEvent::AgentResponded(translate_response(
			"call_1",
			json!({"a": "A"}),
		)));
		machine.handle_event(ConvergenceEvent::AgentFailed(LlmError::RateLimited {
			retry_after_secs: None,
		}));

		let request = expect_request(machine.handle_event(ConvergenceEvent::BackoffElapsed));
		let opening = &request.messages[1].content;
		assert!(opening.contains("<missing-keys>\nb\n</missing-keys>"));
		assert!(opening.contains("still missing:\nb"));
		assert_eq!(machine.state().result.get("a"), Some("A"));
	}

	#[test]
	fn retry_after_longer_than_backoff_wins() {
		let config = SyncConfig {
			rate_limit_backoff: Duration::from_secs(5),
			..SyncConfig::default()
		};
		let mut machine = ConvergenceLoop::new(input(&["a"]), config);
		machine.handle_event(ConvergenceEvent::Start);
		let action = machine.handle_event(ConvergenceEvent::AgentFailed(LlmError::RateLimited {
			retry_after_secs: Some(30),
		}));
		assert!(matches!(action, ConvergenceAction::Backoff(d) if d == Duration::from_secs(30)));
	}

	#[test]
	fn restarts_are_bounded() {
		let config = SyncConfig {
			max_rate_limit_restarts: 1,
			..SyncConfig::default()
		};
		let mut machine = ConvergenceLoop::new(input(&["a"]), config);
		machine.handle_event(ConvergenceEvent::Start);
		machine.handle_event(ConvergenceEvent::AgentFailed(LlmError::RateLimited {
			retry_after_secs: None,
		}));
		machine.handle_event(ConvergenceEvent::BackoffElapsed);
		let action = machine.handle_event(ConvergenceEvent::AgentFailed(LlmError::RateLimited {
			retry_after_secs: None,
		}));
		assert!(matches!(
			action,
			ConvergenceAction::Fail(SyncError::RateLimitExhausted { restarts: 1 })
		));
	}

	#[test]
	fn other_agent_errors_fail_verbatim() {
		let mut machine = ConvergenceLoop::new(input(&["a"]), SyncConfig::default());
		machine.handle_event(ConvergenceEvent::Start);
		let action = machine.handle_event(ConvergenceEvent::AgentFailed(LlmError::InvalidRequest(
			"bad schema".to_string(),
		)));
		assert!(matches!(
			action,
			ConvergenceAction::Fail(SyncError::AgentFailure(LlmError::InvalidRequest(ref m))) if m == "bad schema"
		));
	}

	#[test]
	fn rejected_request_mentioning_limits_is_not_backed_off() {
		let mut machine = ConvergenceLoop::new(input(&["a"]), SyncConfig::default());
		machine.handle_event(ConvergenceEvent::Start);
		let action = machine.handle_event(ConvergenceEvent::AgentFailed(LlmError::InvalidRequest(
			"prompt is too long: maximum context length exceeded".to_string(),
		)));
		assert!(matches!(
			action,
			ConvergenceAction::Fail(SyncError::AgentFailure(LlmError::InvalidRequest(_)))
		));
		assert_eq!(machine.phase(), ConvergencePhase::Failed);
	}

	#[test]
	fn cancellation_aborts_with_partial_result() {
		let mut machine = ConvergenceLoop::new(input(&["a", "b"]), SyncConfig::default());
		machine.handle_event(ConvergenceEvent::Start);
		machine.handle_event(ConvergenceEvent::AgentResponded(translate_response(
			"call_1",
			json!({"a": "A"}),
		)));
		let action = machine.handle_event(ConvergenceEvent::Cancelled);
		assert!(matches!(
			action,
			ConvergenceAction::Fail(SyncError::Aborted { ref partial, .. }) if partial.len() == 1
		));
		assert_eq!(machine.phase(), ConvergencePhase::Aborted);
	}

	#[test]
	fn events_after_termination_are_rejected() {
		let mut machine = ConvergenceLoop::new(input(&[]), SyncConfig::default());
		machine.handle_event(ConvergenceEvent::Start);
		let action = machine.handle_event(ConvergenceEvent::BackoffElapsed);
		assert!(matches!(action, ConvergenceAction::Fail(SyncError::Internal(_))));
	}

	proptest! {
			/// An agent that translates one new key per turn converges in exactly
			/// as many turns as there are keys.
			#[test]
			fn one_key_per_turn_converges_in_n_turns(n in 1usize..12) {
					let keys: Vec<String> = (0..n).map(|i| format!("k{i}")).collect();
					let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
					let config = SyncConfig { max_turns: n as u32, ..SyncConfig::default() };
					let mut machine = ConvergenceLoop::new(input(&key_refs), config);

					let mut action = machine.handle_event(ConvergenceEvent::Start);
					for (turn, key) in keys.iter().enumerate() {
							prop_assert!(matches!(action, ConvergenceAction::SendRequest(_)));
							action = machine.handle_event(ConvergenceEvent::AgentResponded(
									translate_response(
											&format!("call_{turn}"),
											serde_json::Value::Object([(key.clone(), json!("x"))].into_iter().collect()),
									),
							));
					}

					match action {
							ConvergenceAction::Finish(report) => {
									prop_assert_eq!(report.turns, n as u32);
									prop_assert_eq!(report.result.len(), n);
							}
							other => prop_assert!(false, "expected Finish, got {:?}", other),
					}
			}
	}
}
