// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! PHP array catalogs: `<?php return [ 'key' => 'value', ... ];`
//!
//! The writer emits single-quoted literals, whose only escapes are `\\` and
//! `\'`, so every text survives a reload byte for byte. The reader accepts the
//! subset of PHP that translation files are written in: short and long array
//! syntax, single- and double-quoted strings, integer keys, implicit list keys,
//! trailing commas and comments.

use std::fmt;

use indexmap::IndexMap;

use crate::catalog::Entry;

const INDENT: &str = "    ";

/// Renders a catalog tree as a PHP file returning a nested array.
pub fn render(entries: &IndexMap<String, Entry>) -> String {
	let mut out = String::from("<?php\n\nreturn [\n");
	render_entries(entries, 1, &mut out);
	out.push_str("];\n");
	out
}

fn render_entries(entries: &IndexMap<String, Entry>, depth: usize, out: &mut String) {
	let pad = INDENT.repeat(depth);
	for (key, node) in entries {
		out.push_str(&pad);
		if is_integer_key(key) {
			out.push_str(key);
		} else {
			push_quoted(key, out);
		}
		out.push_str(" => ");
		match node {
			Entry::Text(text) => {
				push_quoted(text, out);
				out.push_str(",\n");
			}
			Entry::Group(children) if children.is_empty() => out.push_str("[],\n"),
			Entry::Group(children) => {
				out.push_str("[\n");
				render_entries(children, depth + 1, out);
				out.push_str(&pad);
				out.push_str("],\n");
			}
		}
	}
}

fn push_quoted(text: &str, out: &mut String) {
	out.push('\'');
	for c in text.chars() {
		if c == '\\' || c == '\'' {
			out.push('\\');
		}
		out.push(c);
	}
	out.push('\'');
}

/// Keys PHP itself would store as integers.
fn is_integer_key(key: &str) -> bool {
	let digits = key.strip_prefix('-').unwrap_or(key);
	let canonical = match digits.as_bytes() {
		[] => false,
		[b'0'] => key == "0",
		[first, rest @ ..] => {
			(b'1'..=b'9').contains(first) && rest.iter().all(u8::is_ascii_digit)
		}
	};
	canonical && key.parse::<i64>().is_ok()
}

/// Error raised while reading a PHP catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhpParseError {
	pub line: usize,
	pub message: String,
}

impl fmt::Display for PhpParseError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "line {}: {}", self.line, self.message)
	}
}

impl std::error::Error for PhpParseError {}

/// Parses a PHP file that returns an array of translations.
pub fn parse(source: &str) -> Result<IndexMap<String, Entry>, PhpParseError> {
	let mut parser = Parser::new(source);
	parser.skip_trivia();
	if !parser.eat_keyword("<?php") {
		return Err(parser.error("expected '<?php' opening tag"));
	}
	parser.skip_trivia();
	if !parser.eat_keyword("return") {
		return Err(parser.error("expected 'return'"));
	}
	parser.skip_trivia();
	let entries = parser.array()?;
	parser.skip_trivia();
	parser.eat(b';');
	parser.skip_trivia();
	parser.eat_keyword("?>");
	parser.skip_trivia();
	if !parser.at_end() {
		return Err(parser.error("unexpected content after the returned array"));
	}
	Ok(entries)
}

enum Key {
	Int(i64),
	Str(String),
}

enum Value {
	Text(String),
	Array(IndexMap<String, Entry>),
	Int(i64),
	Null,
}

struct Parser<'a> {
	src: &'a [u8],
	pos: usize,
}

impl<'a> Parser<'a> {
	fn new(source: &'a str) -> Self {
		Self {
			src: source.as_bytes(),
			pos: 0,
		}
	}

	fn at_end(&self) -> bool {
		self.pos >= self.src.len()
	}

	fn peek(&self) -> Option<u8> {
		self.src.get(self.pos).copied()
	}

	fn peek_at(&self, offset: usize) -> Option<u8> {
		self.src.get(self.pos + offset).copied()
	}

	fn eat(&mut self, byte: u8) -> bool {
		if self.peek() == Some(byte) {
			self.pos += 1;
			true
		} else {
			false
		}
	}

	/// Consumes `word` case-insensitively.
	fn eat_keyword(&mut self, word: &str) -> bool {
		let end = self.pos + word.len();
		match self.src.get(self.pos..end) {
			Some(slice) if slice.eq_ignore_ascii_case(word.as_bytes()) => {
				self.pos = end;
				true
			}
			_ => false,
		}
	}

	fn line(&self) -> usize {
		self.src[..self.pos.min(self.src.len())]
			.iter()
			.filter(|b| **b == b'\n')
			.count() + 1
	}

	fn error(&self, message: impl Into<String>) -> PhpParseError {
		PhpParseError {
			line: self.line(),
			message: message.into(),
		}
	}

	/// Skips whitespace and comments.
	fn skip_trivia(&mut self) {
		loop {
			match (self.peek(), self.peek_at(1)) {
				(Some(b), _) if b.is_ascii_whitespace() => self.pos += 1,
				(Some(b'/'), Some(b'/')) | (Some(b'#'), _) => {
					while let Some(b) = self.peek() {
						if b == b'\n' {
							break;
						}
						self.pos += 1;
					}
				}
				(Some(b'/'), Some(b'*')) => {
					self.pos += 2;
					while !self.at_end() && !(self.peek() == Some(b'*') && self.peek_at(1) == Some(b'/')) {
						self.pos += 1;
					}
					self.pos = (self.pos + 2).min(self.src.len());
				}
				_ => return,
			}
		}
	}

	fn array(&mut self) -> Result<IndexMap<String, Entry>, PhpParseError> {
		let close = if self.eat(b'[') {
			b']'
		} else if self.eat_keyword("array") {
			self.skip_trivia();
			if !self.eat(b'(') {
				return Err(self.error("expected '(' after 'array'"));
			}
			b')'
		} else {
			return Err(self.error("expected an array"));
		};

		let mut entries = IndexMap::new();
		let mut next_index: i64 = 0;

		loop {
			self.skip_trivia();
			if self.eat(close) {
				return Ok(entries);
			}

			let first = self.value()?;
			self.skip_trivia();
			let (key, value) = if self.eat_keyword("=>") {
				self.skip_trivia();
				let key = match first {
					Value::Text(s) => Key::Str(s),
					Value::Int(i) => Key::Int(i),
					_ => return Err(self.error("array keys must be strings or integers")),
				};
				(key, self.value()?)
			} else {
				(Key::Int(next_index), first)
			};

			let key = match key {
				Key::Int(i) => {
					next_index = next_index.max(i.saturating_add(1));
					i.to_string()
				}
				Key::Str(s) if is_integer_key(&s) => {
					if let Ok(i) = s.parse::<i64>() {
						next_index = next_index.max(i.saturating_add(1));
					}
					s
				}
				Key::Str(s) => s,
			};

			match value {
				Value::Text(text) => {
					entries.insert(key, Entry::Text(text));
				}
				Value::Int(i) => {
					entries.insert(key, Entry::Text(i.to_string()));
				}
				Value::Array(children) => {
					entries.insert(key, Entry::Group(children));
				}
				Value::Null => {}
			}

			self.skip_trivia();
			if self.eat(b',') {
				continue;
			}
			self.skip_trivia();
			if self.eat(close) {
				return Ok(entries);
			}
			return Err(self.error(format!("expected ',' or '{}'", close as char)));
		}
	}

	fn value(&mut self) -> Result<Value, PhpParseError> {
		match self.peek() {
			Some(b'\'') => self.single_quoted().map(Value::Text),
			Some(b'"') => self.double_quoted().map(Value::Text),
			Some(b'[') => self.array().map(Value::Array),
			Some(b'-') | Some(b'0'..=b'9') => self.number(),
			Some(b) if b.is_ascii_alphabetic() => {
				if self.eat_keyword("array") {
					self.pos -= "array".len();
					return self.array().map(Value::Array);
				}
				let start = self.pos;
				while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
					self.pos += 1;
				}
				let word = String::from_utf8_lossy(&self.src[start..self.pos]).to_ascii_lowercase();
				match word.as_str() {
					"true" => Ok(Value::Text("true".to_string())),
					"false" => Ok(Value::Text("false".to_string())),
					"null" => Ok(Value::Null),
					_ => {
						self.pos = start;
						Err(self.error(format!("unsupported expression '{word}'")))
					}
				}
			}
			Some(b) => Err(self.error(format!("unexpected character '{}'", b as char))),
			None => Err(self.error("unexpected end of file")),
		}
	}

	fn number(&mut self) -> Result<Value, PhpParseError> {
		let start = self.pos;
		self.eat(b'-');
		while matches!(self.peek(), Some(b) if b.is_ascii_digit() || b == b'.' || b == b'_') {
			self.pos += 1;
		}
		let literal: String = String::from_utf8_lossy(&self.src[start..self.pos])
			.chars()
			.filter(|c| *c != '_')
			.collect();
		if let Ok(i) = literal.parse::<i64>() {
			return Ok(Value::Int(i));
		}
		if literal.parse::<f64>().is_ok() {
			return Ok(Value::Text(literal));
		}
		Err(self.error(format!("invalid number '{literal}'")))
	}

	fn single_quoted(&mut self) -> Result<String, PhpParseError> {
		self.pos += 1;
		let mut buf = Vec::new();
		loop {
			match self.peek() {
				None => return Err(self.error("unterminated string")),
				Some(b'\'') => {
					self.pos += 1;
					break;
				}
				Some(b'\\') if matches!(self.peek_at(1), Some(b'\\') | Some(b'\'')) => {
					buf.push(self.src[self.pos + 1]);
					self.pos += 2;
				}
				Some(b) => {
					buf.push(b);
					self.pos += 1;
				}
			}
		}
		self.utf8(buf)
	}

	fn double_quoted(&mut self) -> Result<String, PhpParseError> {
		self.pos += 1;
		let mut buf = Vec::new();
		loop {
			match self.peek() {
				None => return Err(self.error("unterminated string")),
				Some(b'"') => {
					self.pos += 1;
					break;
				}
				Some(b'\\') => {
					self.pos += 1;
					self.escape(&mut buf)?;
				}
				Some(b) => {
					buf.push(b);
					self.pos += 1;
				}
			}
		}
		self.utf8(buf)
	}

	/// Decodes one escape of a double-quoted string, the backslash already consumed.
	fn escape(&mut self, buf: &mut Vec<u8>) -> Result<(), PhpParseError> {
		let Some(b) = self.peek() else {
			return Err(self.error("unterminated string"));
		};
		self.pos += 1;
		let simple = match b {
			b'n' => Some(b'\n'),
			b't' => Some(b'\t'),
			b'r' => Some(b'\r'),
			b'v' => Some(0x0b),
			b'e' => Some(0x1b),
			b'f' => Some(0x0c),
			b'\\' | b'$' | b'"' => Some(b),
			_ => None,
		};
		if let Some(byte) = simple {
			buf.push(byte);
			return Ok(());
		}

		match b {
			b'x' if self.peek().is_some_and(|c| c.is_ascii_hexdigit()) => {
				let digits = self.take_while_max(2, |c| c.is_ascii_hexdigit());
				buf.push(u8::from_str_radix(&digits, 16).unwrap_or_default());
			}
			b'0'..=b'7' => {
				self.pos -= 1;
				let digits = self.take_while_max(3, |c| (b'0'..=b'7').contains(&c));
				buf.push((u32::from_str_radix(&digits, 8).unwrap_or_default() & 0xff) as u8);
			}
			b'u' if self.peek() == Some(b'{') => {
				self.pos += 1;
				let digits = self.take_while_max(6, |c| c.is_ascii_hexdigit());
				if !self.eat(b'}') {
					return Err(self.error("unterminated unicode escape"));
				}
				let ch = u32::from_str_radix(&digits, 16)
					.ok()
					.and_then(char::from_u32)
					.ok_or_else(|| self.error(format!("invalid unicode escape '{digits}'")))?;
				let mut tmp = [0u8; 4];
				buf.extend_from_slice(ch.encode_utf8(&mut tmp).as_bytes());
			}
			other => {
				buf.push(b'\\');
				buf.push(other);
			}
		}
		Ok(())
	}

	fn take_while_max(&mut self, max: usize, pred: impl Fn(u8) -> bool) -> String {
		let start = self.pos;
		while self.pos - start < max && self.peek().is_some_and(&pred) {
			self.pos += 1;
		}
		String::from_utf8_lossy(&self.src[start..self.pos]).into_owned()
	}

	fn utf8(&self, buf: Vec<u8>) -> Result<String, PhpParseError> {
		String::from_utf8(buf).map_err(|_| self.error("string is not valid UTF-8"))
	}
}
