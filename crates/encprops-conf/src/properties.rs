//! `.properties` file format
//!
//! Reads and writes the line-oriented `key=value` format used by Java
//! property files. Parsing follows the rules of `java.util.Properties`:
//!
//! - `#` and `!` start comment lines
//! - a line ending in an odd number of backslashes continues on the next line
//! - keys end at the first unescaped `=`, `:` or whitespace
//! - `\t`, `\n`, `\r`, `\f` and `\uXXXX` escapes are decoded
//!
//! Entries keep the order in which their keys first appear in the file.

use indexmap::IndexMap;
use std::io::{Read, Write};

/// Error type for property file parsing
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum PropertiesError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Malformed \\uxxxx encoding on line {line}")]
	MalformedUnicodeEscape { line: usize },
}

/// Ordered set of string properties
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
	entries: IndexMap<String, String>,
}

impl Properties {
	/// Create an empty property set
	pub fn new() -> Self {
		Self::default()
	}

	/// Parse properties from text
	///
	/// # Examples
	///
	/// ```
	/// use encprops_conf::properties::Properties;
	///
	/// let props = Properties::parse("# database\ndb.url = jdbc:h2:mem\ndb.user:sa\n").unwrap();
	/// assert_eq!(props.get("db.url"), Some("jdbc:h2:mem"));
	/// assert_eq!(props.get("db.user"), Some("sa"));
	/// ```
	pub fn parse(input: &str) -> Result<Self, PropertiesError> {
		let mut properties = Self::new();
		for (line_number, line) in logical_lines(input) {
			let (raw_key, raw_value) = split_key_value(&line);
			let key = unescape(raw_key, line_number)?;
			let value = unescape(raw_value, line_number)?;
			properties.insert(key, value);
		}
		Ok(properties)
	}

	/// Read and parse properties from a reader
	///
	/// Input that is not valid UTF-8 is decoded as ISO-8859-1, the historical
	/// encoding of property files.
	pub fn load(mut reader: impl Read) -> Result<Self, PropertiesError> {
		let mut bytes = Vec::new();
		reader.read_to_end(&mut bytes)?;
		Self::parse(&decode_text(bytes))
	}

	/// Write the properties as escaped `key=value` lines
	pub fn store(&self, mut writer: impl Write) -> Result<(), PropertiesError> {
		for (key, value) in &self.entries {
			writeln!(writer, "{}={}", escape(key, true), escape(value, false))?;
		}
		writer.flush()?;
		Ok(())
	}

	pub fn get(&self, key: &str) -> Option<&str> {
		self.entries.get(key).map(String::as_str)
	}

	/// Insert a property, returning the previous value
	///
	/// A replaced key keeps its original position.
	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
		self.entries.insert(key.into(), value.into())
	}

	pub fn remove(&mut self, key: &str) -> Option<String> {
		self.entries.shift_remove(key)
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.entries.keys().map(String::as_str)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	/// Overlay another property set on top of this one (the other side wins)
	pub fn extend(&mut self, other: Properties) {
		self.entries.extend(other.entries);
	}
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self {
			entries: iter
				.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.collect(),
		}
	}
}

impl IntoIterator for Properties {
	type Item = (String, String);
	type IntoIter = indexmap::map::IntoIter<String, String>;

	fn into_iter(self) -> Self::IntoIter {
		self.entries.into_iter()
	}
}

/// Decode raw file bytes as UTF-8, falling back to ISO-8859-1
///
/// Input that is valid UTF-8 is always read as UTF-8, even when it was
/// written as ISO-8859-1 (`\xc3\xa9` reads as `é`, not `Ã©`).
pub(crate) fn decode_text(bytes: Vec<u8>) -> String {
	match String::from_utf8(bytes) {
		Ok(text) => text,
		Err(e) => e.into_bytes().into_iter().map(char::from).collect(),
	}
}

fn is_blank(c: char) -> bool {
	matches!(c, ' ' | '\t' | '\x0c')
}

/// Split input into natural lines on `\n`, `\r` or `\r\n`
fn natural_lines(input: &str) -> Vec<&str> {
	let bytes = input.as_bytes();
	let mut lines = Vec::new();
	let mut start = 0;
	let mut i = 0;
	while i < bytes.len() {
		match bytes[i] {
			b'\n' => {
				lines.push(&input[start..i]);
				i += 1;
				start = i;
			}
			b'\r' => {
				lines.push(&input[start..i]);
				i += 1;
				if i < bytes.len() && bytes[i] == b'\n' {
					i += 1;
				}
				start = i;
			}
			_ => i += 1,
		}
	}
	if start < bytes.len() {
		lines.push(&input[start..]);
	}
	lines
}

fn has_continuation(line: &str) -> bool {
	line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// Join continued lines and drop comments and blank lines
///
/// Each logical line is paired with the 1-based number of the natural line
/// it starts on.
fn logical_lines(input: &str) -> Vec<(usize, String)> {
	let natural = natural_lines(input);
	let mut logical = Vec::new();
	let mut index = 0;

	while index < natural.len() {
		let line_number = index + 1;
		let mut current = natural[index].trim_start_matches(is_blank);
		index += 1;

		if current.is_empty() || current.starts_with('#') || current.starts_with('!') {
			continue;
		}

		let mut joined = String::new();
		loop {
			if !has_continuation(current) {
				joined.push_str(current);
				break;
			}
			joined.push_str(&current[..current.len() - 1]);
			match natural.get(index) {
				Some(next) => {
					current = next.trim_start_matches(is_blank);
					index += 1;
				}
				None => break,
			}
		}
		logical.push((line_number, joined));
	}

	logical
}

/// Split a logical line into its raw (still escaped) key and value
fn split_key_value(line: &str) -> (&str, &str) {
	let mut key_end = line.len();
	let mut value_start = line.len();
	let mut has_separator = false;
	let mut preceding_backslash = false;

	for (i, c) in line.char_indices() {
		if !preceding_backslash {
			if c == '=' || c == ':' {
				key_end = i;
				value_start = i + 1;
				has_separator = true;
				break;
			}
			if is_blank(c) {
				key_end = i;
				value_start = i + 1;
				break;
			}
		}
		preceding_backslash = c == '\\' && !preceding_backslash;
	}

	let mut rest = &line[value_start..];
	while let Some(c) = rest.chars().next() {
		if is_blank(c) {
			rest = &rest[1..];
		} else if !has_separator && (c == '=' || c == ':') {
			has_separator = true;
			rest = &rest[1..];
		} else {
			break;
		}
	}

	(&line[..key_end], rest)
}

/// Decode backslash escapes
///
/// `\uXXXX` escapes are UTF-16 code units, so surrogate pairs written as two
/// escapes combine into one character.
fn unescape(raw: &str, line: usize) -> Result<String, PropertiesError> {
	if !raw.contains('\\') {
		return Ok(raw.to_string());
	}

	let mut units: Vec<u16> = Vec::with_capacity(raw.len());
	let mut buf = [0u16; 2];
	let mut chars = raw.chars();

	while let Some(c) = chars.next() {
		let decoded = if c == '\\' {
			match chars.next() {
				Some('u') => {
					let hex: String = chars.by_ref().take(4).collect();
					if hex.len() != 4 || !hex.chars().all(|h| h.is_ascii_hexdigit()) {
						return Err(PropertiesError::MalformedUnicodeEscape { line });
					}
					let unit = u16::from_str_radix(&hex, 16)
						.map_err(|_| PropertiesError::MalformedUnicodeEscape { line })?;
					units.push(unit);
					continue;
				}
				Some('t') => '\t',
				Some('n') => '\n',
				Some('r') => '\r',
				Some('f') => '\x0c',
				Some(other) => other,
				None => break,
			}
		} else {
			c
		};
		units.extend_from_slice(decoded.encode_utf16(&mut buf));
	}

	Ok(String::from_utf16_lossy(&units))
}

/// Escape a key or value for writing
///
/// Keys escape every space; values only a leading one.
fn escape(text: &str, is_key: bool) -> String {
	let mut out = String::with_capacity(text.len());
	for (i, c) in text.chars().enumerate() {
		match c {
			' ' if i == 0 || is_key => out.push_str("\\ "),
			'\\' => out.push_str("\\\\"),
			'\t' => out.push_str("\\t"),
			'\n' => out.push_str("\\n"),
			'\r' => out.push_str("\\r"),
			'\x0c' => out.push_str("\\f"),
			'=' | ':' | '#' | '!' => {
				out.push('\\');
				out.push(c);
			}
			c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
			c => out.push(c),
		}
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("key=value", "key", "value")]
	#[case("key = value", "key", "value")]
	#[case("key:value", "key", "value")]
	#[case("key value", "key", "value")]
	#[case("key\t \t=  value", "key", "value")]
	#[case("   indented=yes", "indented", "yes")]
	#[case("key=value with spaces  ", "key", "value with spaces  ")]
	#[case("key==value", "key", "=value")]
	#[case("key", "key", "")]
	#[case("key=", "key", "")]
	#[case("a\\=b=c", "a=b", "c")]
	#[case("a\\ b c", "a b", "c")]
	fn test_parse_separators(#[case] input: &str, #[case] key: &str, #[case] value: &str) {
		// Act
		let props = Properties::parse(input).unwrap();

		// Assert
		assert_eq!(props.len(), 1);
		assert_eq!(props.get(key), Some(value), "input: {:?}", input);
	}

	#[rstest]
	fn test_parse_skips_comments_and_blank_lines() {
		// Arrange
		let input = "# comment\n! also a comment\n\n   \nkey=value\n  # indented comment\n";

		// Act
		let props = Properties::parse(input).unwrap();

		// Assert
		assert_eq!(props.len(), 1);
		assert_eq!(props.get("key"), Some("value"));
	}

	#[rstest]
	fn test_parse_line_continuation() {
		// Arrange
		let input = "fruits = apple, \\\n         banana, \\\n         pear\nnext=1\n";

		// Act
		let props = Properties::parse(input).unwrap();

		// Assert
		assert_eq!(props.get("fruits"), Some("apple, banana, pear"));
		assert_eq!(props.get("next"), Some("1"));
	}

	#[rstest]
	fn test_parse_even_backslashes_do_not_continue() {
		// Act
		let props = Properties::parse("path=C:\\\\\nother=x\n").unwrap();

		// Assert
		assert_eq!(props.get("path"), Some("C:\\"));
		assert_eq!(props.get("other"), Some("x"));
	}

	#[rstest]
	fn test_parse_comment_lines_are_never_continued() {
		// Act
		let props = Properties::parse("# comment \\\nkey=value\n").unwrap();

		// Assert
		assert_eq!(props.get("key"), Some("value"));
	}

	#[rstest]
	#[case("a=1\nb=2", 2)]
	#[case("a=1\r\nb=2\r\n", 2)]
	#[case("a=1\rb=2\r", 2)]
	fn test_parse_line_terminators(#[case] input: &str, #[case] expected: usize) {
		let props = Properties::parse(input).unwrap();
		assert_eq!(props.len(), expected);
		assert_eq!(props.get("b"), Some("2"));
	}

	#[rstest]
	fn test_parse_escapes() {
		// Act
		let props =
			Properties::parse("tabs=a\\tb\nlines=a\\nb\ncafe=caf\\u00e9\nplain=\\q\n").unwrap();

		// Assert
		assert_eq!(props.get("tabs"), Some("a\tb"));
		assert_eq!(props.get("lines"), Some("a\nb"));
		assert_eq!(props.get("cafe"), Some("café"));
		assert_eq!(props.get("plain"), Some("q"));
	}

	#[rstest]
	fn test_parse_surrogate_pair_escape() {
		let props = Properties::parse("emoji=\\uD83D\\uDE00").unwrap();
		assert_eq!(props.get("emoji"), Some("\u{1F600}"));
	}

	#[rstest]
	#[case("bad=\\u12")]
	#[case("bad=\\uZZZZ")]
	fn test_parse_malformed_unicode_escape(#[case] input: &str) {
		// Act
		let result = Properties::parse(&format!("ok=1\n{}", input));

		// Assert
		match result {
			Err(PropertiesError::MalformedUnicodeEscape { line }) => assert_eq!(line, 2),
			other => panic!("Expected MalformedUnicodeEscape, got {:?}", other),
		}
	}

	#[rstest]
	fn test_duplicate_keys_keep_first_position_and_last_value() {
		// Act
		let props = Properties::parse("a=1\nb=2\na=3\n").unwrap();

		// Assert
		assert_eq!(props.keys().collect::<Vec<_>>(), vec!["a", "b"]);
		assert_eq!(props.get("a"), Some("3"));
	}

	#[rstest]
	fn test_load_falls_back_to_latin1() {
		// Arrange
		let bytes: &[u8] = b"name=Jos\xe9\n";

		// Act
		let props = Properties::load(bytes).unwrap();

		// Assert
		assert_eq!(props.get("name"), Some("José"));
	}

	#[rstest]
	#[case(b"name=Jos\xc3\xa9\n", "Jos\u{e9}")]
	#[case(b"sign=\xc2\xb0C\n", "\u{b0}C")]
	fn test_load_prefers_utf8_when_bytes_are_valid_utf8(
		#[case] bytes: &[u8],
		#[case] expected: &str,
	) {
		// Act
		let props = Properties::load(bytes).unwrap();

		// Assert
		assert_eq!(props.iter().next().map(|(_, v)| v), Some(expected));
	}

	#[rstest]
	fn test_store_output_parses_back() {
		// Arrange
		let props: Properties = [
			("simple", "value"),
			("key with spaces", " leading space"),
			("url", "jdbc:postgresql://host:5432/db"),
			("multi", "line1\nline2"),
			("hash#key", "!bang"),
		]
		.into_iter()
		.collect();

		// Act
		let mut out = Vec::new();
		props.store(&mut out).unwrap();
		let reparsed = Properties::parse(std::str::from_utf8(&out).unwrap()).unwrap();

		// Assert
		assert_eq!(reparsed, props);
	}

	#[rstest]
	fn test_extend_overlays_values() {
		// Arrange
		let mut base: Properties = [("a", "1"), ("b", "2")].into_iter().collect();
		let overlay: Properties = [("b", "20"), ("c", "30")].into_iter().collect();

		// Act
		base.extend(overlay);

		// Assert
		assert_eq!(base.get("a"), Some("1"));
		assert_eq!(base.get("b"), Some("20"));
		assert_eq!(base.get("c"), Some("30"));
	}
}
