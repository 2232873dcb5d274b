// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared fixtures: a scripted agent and a store that refuses writes.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use babel_catalog::{Catalog, CatalogStore, MemoryStore, StoreError};
use babel_common_core::{
	LlmClient, LlmError, LlmEvent, LlmRequest, LlmResponse, LlmStream, ToolCall,
};
use serde_json::{json, Value};

/// Agent that replays a fixed script of turns and records every request.
pub struct ScriptedClient {
	script: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
	requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedClient {
	pub fn new(script: Vec<Result<LlmResponse, LlmError>>) -> Self {
		Self {
			script: Mutex::new(script.into()),
			requests: Mutex::new(Vec::new()),
		}
	}

	pub fn requests(&self) -> Vec<LlmRequest> {
		self.requests.lock().unwrap().clone()
	}

	fn next_turn(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
		self.requests.lock().unwrap().push(request);
		self.script
			.lock()
			.unwrap()
			.pop_front()
			.unwrap_or_else(|| Err(LlmError::Api("script exhausted".to_string())))
	}
}

#[async_trait]
impl LlmClient for ScriptedClient {
	async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
		self.next_turn(request)
	}

	async fn complete_streaming(&self, request: LlmRequest) -> Result<LlmStream, LlmError> {
		let event = match self.next_turn(request) {
			Ok(response) => LlmEvent::Completed(response),
			Err(err) => LlmEvent::Error(err),
		};
		Ok(LlmStream::from_events(vec![
			LlmEvent::TextDelta {
				content: String::new(),
			},
			event,
		]))
	}
}

/// Agent whose turns never finish.
pub struct StalledClient;

#[async_trait]
impl LlmClient for StalledClient {
	async fn complete(&self, _request: LlmRequest) -> Result<LlmResponse, LlmError> {
		std::future::pending().await
	}

	async fn complete_streaming(&self, _request: LlmRequest) -> Result<LlmStream, LlmError> {
		std::future::pending().await
	}
}

pub fn tool_call(id: &str, name: &str, arguments: Value) -> ToolCall {
	ToolCall {
		id: id.to_string(),
		tool_name: name.to_string(),
		arguments_json: arguments,
	}
}

/// A synchronization turn answering with `batch`.
pub fn translate_turn(id: &str, batch: Value) -> Result<LlmResponse, LlmError> {
	Ok(LlmResponse::with_tool_calls(vec![tool_call(
		id,
		"translate",
		json!({ "translations": batch }),
	)]))
}

pub fn rate_limited() -> Result<LlmResponse, LlmError> {
	Err(LlmError::RateLimited {
		retry_after_secs: None,
	})
}

pub fn catalog(language: &str, domain: &str, pairs: &[(&str, &str)]) -> Catalog {
	let mut catalog = Catalog::new(language, domain);
	for (key, value) in pairs {
		catalog.set(key, *value).unwrap();
	}
	catalog
}

/// Store that serves reads from memory and fails every write.
pub struct ReadOnlyStore {
	inner: MemoryStore,
}

impl ReadOnlyStore {
	pub fn new(catalogs: Vec<Catalog>) -> Self {
		Self {
			inner: MemoryStore::with_catalogs(catalogs),
		}
	}
}

#[async_trait]
impl CatalogStore for ReadOnlyStore {
	async fn load(&self, language: &str, domain: &str) -> Result<Catalog, StoreError> {
		self.inner.load(language, domain).await
	}

	async fn exists(&self, language: &str, domain: &str) -> Result<bool, StoreError> {
		self.inner.exists(language, domain).await
	}

	async fn store(&self, catalog: &Catalog) -> Result<(), StoreError> {
		Err(StoreError::io(
			format!("{}", catalog.key()),
			std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only store"),
		))
	}

	async fn languages(&self) -> Result<Vec<String>, StoreError> {
		self.inner.languages().await
	}

	async fn domains(&self, language: &str) -> Result<Vec<String>, StoreError> {
		self.inner.domains(language).await
	}
}
