// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Prompts and tool definitions presented to the agent.

use babel_catalog::Catalog;
use babel_common_core::ToolDefinition;
use serde_json::json;

pub const TRANSLATE_TOOL: &str = "translate";
pub const LOAD_TRANSLATION_FILE_TOOL: &str = "load_translation_file";

/// What a translation turn asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Task {
	/// Translate every key of the source catalog.
	Full,
	/// Translate only the listed missing keys.
	MissingOnly,
}

impl Task {
	pub fn for_missing(missing: &[String]) -> Self {
		if missing.is_empty() {
			Task::Full
		} else {
			Task::MissingOnly
		}
	}

	pub fn directive(self, source: &str, target: &str) -> String {
		match self {
			Task::Full => format!(
				"Translate the complete <{source}-file> into `{target}`. Include every key. Skipping keys is not allowed."
			),
			Task::MissingOnly => format!(
				"Translate only the keys listed in <missing-keys> from <{source}-file> into `{target}`. Do not retranslate the rest of the file."
			),
		}
	}
}

/// `translate` tool for synchronization turns: a flat map of dotted keys.
pub fn translate_tool() -> ToolDefinition {
	ToolDefinition::new(
		TRANSLATE_TOOL,
		"Submit translations. Pass a flat object mapping dot-notation keys to translated strings.",
		json!({
			"type": "object",
			"properties": {
				"translations": {
					"type": "object",
					"description": "Flat map of dot-notation keys to translated text. Do not nest objects.",
					"additionalProperties": { "type": "string" }
				}
			},
			"required": ["translations"]
		}),
	)
}

/// `translate` tool for refinement sessions, addressed by language and domain.
pub fn session_translate_tool() -> ToolDefinition {
	ToolDefinition::new(
		TRANSLATE_TOOL,
		"Write translations into the catalog of the given language and domain. Pass a flat object mapping dot-notation keys to translated strings.",
		json!({
			"type": "object",
			"properties": {
				"language": { "type": "string", "description": "Language code of the catalog to write" },
				"domain": { "type": "string", "description": "Domain (file name) of the catalog to write" },
				"translations": {
					"type": "object",
					"additionalProperties": { "type": "string" }
				}
			},
			"required": ["language", "domain", "translations"]
		}),
	)
}

pub fn load_translation_file_tool() -> ToolDefinition {
	ToolDefinition::new(
		LOAD_TRANSLATION_FILE_TOOL,
		"Load the current contents of the catalog for the given language and domain as JSON.",
		json!({
			"type": "object",
			"properties": {
				"language": { "type": "string" },
				"domain": { "type": "string" }
			},
			"required": ["language", "domain"]
		}),
	)
}

pub fn translator_system_prompt(context: &str, source: &str, target: &str) -> String {
	format!(
		"<instructions>\n\
You are a translator for {context} user interfaces.\n\
You translate translation catalogs from the `{source}` language into the `{target}` language.\n\
Never answer with plain text. Only call the `{TRANSLATE_TOOL}` tool, with a flat object of dot-notation keys and their translations.\n\
\n\
You receive the {source} catalog and, if it exists, the current {target} catalog, both as JSON.\n\
Reuse existing {target} translations where they fit and keep new translations consistent with them, so the interface does not change more than needed.\n\
\n\
You also receive the list of missing keys. When the list is empty, translate the whole catalog.\n\
Never skip keys. Keep placeholders such as `:name` and markup unchanged.\n\
</instructions>"
	)
}

/// Opening user message of a synchronization conversation.
pub fn translation_message(source: &Catalog, target: &Catalog, missing: &[String]) -> String {
	let from = source.language();
	let to = target.language();
	let task = Task::for_missing(missing).directive(from, to);
	format!(
		"<{from}-file>\n{}\n</{from}-file>\n\n<{to}-file>\n{}\n</{to}-file>\n\n<missing-keys>\n{}\n</missing-keys>\n\n<task>{task}</task>",
		source.to_json(),
		target.to_json(),
		missing.join("\n"),
	)
}

/// Directive sent back when a turn left required keys untranslated.
pub fn corrective_directive(still_missing: &[String]) -> String {
	format!(
		"The following keys are still missing:\n{}\n\nDo not re-supply keys that are already translated. Translate only the listed keys by calling `{TRANSLATE_TOOL}` again.",
		still_missing.join("\n")
	)
}

pub fn refinement_system_prompt(context: &str) -> String {
	format!(
		"You review translation catalogs of {context} user interfaces.\n\
You are given two catalogs of the same domain: the source language and the target language it is translated into.\n\
\n\
First analyze the target catalog against the source:\n\
- Is it a good translation?\n\
- Are keys missing?\n\
- Are there mistranslations or wrong meanings?\n\
- Does the wording fit the context of a user interface (for example the right verb for a \"Save\" button)?\n\
\n\
Give actionable suggestions and ask the user which of them to apply.\n\
\n\
Tools:\n\
1. `{TRANSLATE_TOOL}` writes translations into a catalog. Pass `language`, `domain` and a flat object of dot-notation keys. Never nest objects. Writing into the source language is rejected.\n\
2. `{LOAD_TRANSLATION_FILE_TOOL}` loads a catalog. Use it when the user asks about other catalogs or edited files in between messages; use the catalogs from the first message otherwise.\n\
\n\
Be terse. No greetings, no thanks, no sign-offs."
	)
}

/// Seeded first message of a refinement session.
pub fn session_opening_message(domain: &str, source: &Catalog, target: &Catalog) -> String {
	format!(
		"Review the `{domain}` catalog. The source language is `{}` and it is translated into `{}`.\n\n<source-file language=\"{}\">\n{}\n</source-file>\n\n<target-file language=\"{}\">\n{}\n</target-file>",
		source.language(),
		target.language(),
		source.language(),
		source.to_json(),
		target.language(),
		target.to_json(),
	)
}
