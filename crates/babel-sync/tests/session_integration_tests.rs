// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

mod common;

use std::sync::Arc;

use babel_catalog::{CatalogStore, FileStore, MemoryStore, StorageFormat};
use babel_common_core::{LlmClient, LlmResponse, Role, ToolError};
use babel_sync::{Engine, RefinementSession, SessionError, SyncConfig};
use common::{catalog, tool_call, ScriptedClient};
use serde_json::json;
use tempfile::TempDir;

fn store() -> Arc<MemoryStore> {
	Arc::new(MemoryStore::with_catalogs(vec![
		catalog("en", "auth", &[("save", "Save"), ("failed", "Login failed.")]),
		catalog("de", "auth", &[("save", "Sparen")]),
	]))
}

async fn open(client: Arc<ScriptedClient>, store: Arc<MemoryStore>, config: SyncConfig) -> RefinementSession {
	let client: Arc<dyn LlmClient> = client;
	let store: Arc<dyn CatalogStore> = store;
	RefinementSession::open(client, store, config, "auth", "en", "de")
		.await
		.unwrap()
}

fn tool_turn(id: &str, name: &str, arguments: serde_json::Value) -> Result<LlmResponse, babel_common_core::LlmError> {
	Ok(LlmResponse::with_tool_calls(vec![tool_call(id, name, arguments)]))
}

#[tokio::test]
async fn opening_turn_carries_both_catalogs() {
	let client = Arc::new(ScriptedClient::new(vec![Ok(LlmResponse::text(
		"\"Sparen\" means to save money; a button needs \"Speichern\".",
	))]));
	let mut session = open(client.clone(), store(), SyncConfig::default()).await;

	let reply = session.begin().await.unwrap();

	assert!(reply.text.contains("Speichern"));
	assert!(reply.tool_outcomes.is_empty());
	let requests = client.requests();
	assert_eq!(requests[0].messages[0].role, Role::System);
	assert!(requests[0].messages[1].content.contains("Sparen"));
	assert!(requests[0].messages[1].content.contains("Login failed."));
	assert_eq!(requests[0].tools.len(), 2);
}

#[tokio::test]
async fn human_turn_before_begin_is_rejected() {
	let client = Arc::new(ScriptedClient::new(vec![]));
	let mut session = open(client, store(), SyncConfig::default()).await;

	let err = session.send_human_turn("fix it").await.unwrap_err();
	assert!(matches!(err, SessionError::NotStarted));
}

#[tokio::test]
async fn begin_twice_is_rejected() {
	let client = Arc::new(ScriptedClient::new(vec![Ok(LlmResponse::text("ok"))]));
	let mut session = open(client, store(), SyncConfig::default()).await;

	session.begin().await.unwrap();
	assert!(matches!(
		session.begin().await.unwrap_err(),
		SessionError::AlreadyStarted
	));
}

#[tokio::test]
async fn agent_writes_corrections_to_the_target() {
	let store = store();
	let client = Arc::new(ScriptedClient::new(vec![
		Ok(LlmResponse::text("The save button is mistranslated.")),
		tool_turn(
			"call_1",
			"translate",
			json!({
				"language": "de",
				"domain": "auth",
				"translations": {"save": "Speichern", "failed": "Anmeldung fehlgeschlagen."}
			}),
		),
		Ok(LlmResponse::text("Done.")),
	]));
	let mut session = open(client.clone(), store.clone(), SyncConfig::default()).await;
	session.begin().await.unwrap();

	let reply = session.send_human_turn("Please fix it.").await.unwrap();

	assert_eq!(reply.text, "Done.");
	assert_eq!(reply.tool_outcomes.len(), 1);
	assert!(reply.tool_outcomes[0].succeeded());
	assert_eq!(
		reply.tool_outcomes[0].result.as_deref().unwrap(),
		"Wrote 2 translations to de/auth."
	);
	let german = store.get("de", "auth").await.unwrap();
	assert_eq!(german.get("save").unwrap(), "Speichern");

	let last_request = client.requests().pop().unwrap();
	let tool_message = last_request
		.messages
		.iter()
		.find(|m| m.role == Role::Tool)
		.unwrap();
	assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_1"));
	assert!(!tool_message.is_error);
}

#[tokio::test]
async fn writing_to_the_source_language_is_refused() {
	let store = store();
	let client = Arc::new(ScriptedClient::new(vec![
		tool_turn(
			"call_1",
			"translate",
			json!({"language": "en", "domain": "auth", "translations": {"save": "Store"}}),
		),
		Ok(LlmResponse::text("Sorry, I can only change the German catalog.")),
	]));
	let mut session = open(client.clone(), store.clone(), SyncConfig::default()).await;

	let reply = session.begin().await.unwrap();

	assert!(matches!(
		reply.tool_outcomes[0].result,
		Err(ToolError::InvalidTarget(_))
	));
	assert_eq!(store.get("en", "auth").await.unwrap().get("save").unwrap(), "Save");

	let error_message = session
		.conversation()
		.iter()
		.find(|m| m.role == Role::Tool)
		.unwrap();
	assert!(error_message.is_error);
	assert!(error_message.content.contains("source language"));
}

#[tokio::test]
async fn catalog_names_cannot_leave_the_store_root() {
	let tmp = TempDir::new().unwrap();
	let files = FileStore::new(tmp.path().join("lang"), StorageFormat::Json);
	files
		.store(&catalog("en", "auth", &[("save", "Save")]))
		.await
		.unwrap();
	let store: Arc<dyn CatalogStore> = Arc::new(files);
	let client = Arc::new(ScriptedClient::new(vec![
		Ok(LlmResponse::with_tool_calls(vec![
			tool_call(
				"call_1",
				"translate",
				json!({"language": "../escaped", "domain": "pwn", "translations": {"save": "x"}}),
			),
			tool_call(
				"call_2",
				"load_translation_file",
				json!({"language": "de", "domain": "../../secrets"}),
			),
		])),
		Ok(LlmResponse::text("Those catalogs do not exist.")),
	]));
	let agent: Arc<dyn LlmClient> = client;
	let mut session = RefinementSession::open(agent, store, SyncConfig::default(), "auth", "en", "de")
		.await
		.unwrap();

	let reply = session.begin().await.unwrap();

	assert_eq!(reply.tool_outcomes.len(), 2);
	for outcome in &reply.tool_outcomes {
		assert!(
			matches!(outcome.result, Err(ToolError::InvalidArguments(_))),
			"{outcome:?}"
		);
	}
	assert!(!tmp.path().join("escaped").exists());
	let languages: Vec<String> = std::fs::read_dir(tmp.path().join("lang"))
		.unwrap()
		.map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
		.collect();
	assert_eq!(languages, vec!["en".to_string()]);
}

#[tokio::test]
async fn load_tool_returns_catalog_json() {
	let client = Arc::new(ScriptedClient::new(vec![
		tool_turn(
			"call_1",
			"load_translation_file",
			json!({"language": "de", "domain": "auth"}),
		),
		Ok(LlmResponse::text("Loaded.")),
	]));
	let mut session = open(client, store(), SyncConfig::default()).await;

	let reply = session.begin().await.unwrap();

	let loaded = reply.tool_outcomes[0].result.as_ref().unwrap();
	let parsed: serde_json::Value = serde_json::from_str(loaded).unwrap();
	assert_eq!(parsed, json!({"save": "Sparen"}));
}

#[tokio::test]
async fn unknown_tool_is_reported_to_the_agent() {
	let client = Arc::new(ScriptedClient::new(vec![
		tool_turn("call_1", "delete_catalog", json!({})),
		Ok(LlmResponse::text("I cannot delete catalogs.")),
	]));
	let mut session = open(client, store(), SyncConfig::default()).await;

	let reply = session.begin().await.unwrap();
	assert!(matches!(
		reply.tool_outcomes[0].result,
		Err(ToolError::NotFound(ref name)) if name == "delete_catalog"
	));
}

#[tokio::test]
async fn endless_tool_calls_are_bounded() {
	let load = || {
		tool_turn(
			"call",
			"load_translation_file",
			json!({"language": "de", "domain": "auth"}),
		)
	};
	let client = Arc::new(ScriptedClient::new(vec![load(), load(), load()]));
	let config = SyncConfig {
		max_tool_rounds: 2,
		..SyncConfig::default()
	};
	let mut session = open(client.clone(), store(), config).await;

	let err = session.begin().await.unwrap_err();

	assert!(matches!(err, SessionError::ToolRoundsExceeded(2)));
	assert_eq!(client.requests().len(), 3);
}

#[tokio::test]
async fn session_recovers_after_tool_round_limit() {
	let load = |id: &str| {
		tool_turn(
			id,
			"load_translation_file",
			json!({"language": "de", "domain": "auth"}),
		)
	};
	let client = Arc::new(ScriptedClient::new(vec![
		load("call_1"),
		load("call_2"),
		Ok(LlmResponse::text("Both catalogs look consistent now.")),
	]));
	let config = SyncConfig {
		max_tool_rounds: 1,
		..SyncConfig::default()
	};
	let mut session = open(client.clone(), store(), config).await;

	let err = session.begin().await.unwrap_err();
	assert!(matches!(err, SessionError::ToolRoundsExceeded(1)));

	let reply = session.send_human_turn("try again").await.unwrap();
	assert_eq!(reply.text, "Both catalogs look consistent now.");

	let requests = client.requests();
	let messages = &requests[2].messages;
	let tail: Vec<Role> = messages[messages.len() - 3..].iter().map(|m| m.role.clone()).collect();
	assert_eq!(tail, vec![Role::Assistant, Role::Tool, Role::User]);
	let answer = &messages[messages.len() - 2];
	assert_eq!(answer.tool_call_id.as_deref(), Some("call_2"));
	assert!(answer.is_error);
}

#[tokio::test]
async fn engine_refuses_session_on_source_language() {
	let client: Arc<dyn LlmClient> = Arc::new(ScriptedClient::new(vec![]));
	let engine = Engine::new(client, store(), SyncConfig::default());

	let err = engine
		.start_refinement_session("auth", "en", "en")
		.await
		.err()
		.unwrap();
	assert!(matches!(err, SessionError::InvalidTarget(_)));
}
