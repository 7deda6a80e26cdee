//! The host configuration registry
//!
//! An [`Environment`] holds an ordered list of [`PropertySource`]s, highest
//! precedence first. Looking up a property walks the list and returns the
//! first value found. Values may reference other properties with `${name}`
//! or `${name:default}` placeholders.

use crate::source::{PropertyError, PropertySource, SystemEnvironmentPropertySource};
use std::fmt;
use std::str::FromStr;

const PLACEHOLDER_PREFIX: &str = "${";
const PLACEHOLDER_SUFFIX: char = '}';
const VALUE_SEPARATOR: char = ':';

/// Ordered collection of property sources, highest precedence first
///
/// Source names are unique: adding a source whose name is already present
/// removes the existing one first.
#[derive(Default)]
pub struct PropertySources {
	sources: Vec<Box<dyn PropertySource>>,
}

impl PropertySources {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a source with the highest precedence
	pub fn add_first(&mut self, source: impl PropertySource + 'static) {
		self.remove(source.name());
		self.sources.insert(0, Box::new(source));
	}

	/// Add a source with the lowest precedence
	pub fn add_last(&mut self, source: impl PropertySource + 'static) {
		self.remove(source.name());
		self.sources.push(Box::new(source));
	}

	/// Add a source directly above `relative`
	pub fn add_before(
		&mut self,
		relative: &str,
		source: impl PropertySource + 'static,
	) -> Result<(), PropertyError> {
		let index = self.relative_index(relative, source.name())?;
		self.sources.insert(index, Box::new(source));
		Ok(())
	}

	/// Add a source directly below `relative`
	pub fn add_after(
		&mut self,
		relative: &str,
		source: impl PropertySource + 'static,
	) -> Result<(), PropertyError> {
		let index = self.relative_index(relative, source.name())?;
		self.sources.insert(index + 1, Box::new(source));
		Ok(())
	}

	fn relative_index(&mut self, relative: &str, name: &str) -> Result<usize, PropertyError> {
		if relative == name {
			return Err(PropertyError::SelfRelativeSource(name.to_string()));
		}
		if !self.contains(relative) {
			return Err(PropertyError::UnknownSource(relative.to_string()));
		}
		self.remove(name);
		self.precedence_of(relative)
			.ok_or_else(|| PropertyError::UnknownSource(relative.to_string()))
	}

	pub fn remove(&mut self, name: &str) -> Option<Box<dyn PropertySource>> {
		let index = self.precedence_of(name)?;
		Some(self.sources.remove(index))
	}

	pub fn get(&self, name: &str) -> Option<&dyn PropertySource> {
		self.sources
			.iter()
			.find(|s| s.name() == name)
			.map(|s| s.as_ref())
	}

	pub fn contains(&self, name: &str) -> bool {
		self.precedence_of(name).is_some()
	}

	/// Position of a source, 0 being the highest precedence
	pub fn precedence_of(&self, name: &str) -> Option<usize> {
		self.sources.iter().position(|s| s.name() == name)
	}

	pub fn names(&self) -> Vec<&str> {
		self.sources.iter().map(|s| s.name()).collect()
	}

	pub fn iter(&self) -> impl Iterator<Item = &dyn PropertySource> {
		self.sources.iter().map(|s| s.as_ref())
	}

	pub fn len(&self) -> usize {
		self.sources.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sources.is_empty()
	}
}

impl fmt::Debug for PropertySources {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.names()).finish()
	}
}

/// A property as resolved by an [`Environment`]
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ResolvedProperty {
	pub name: String,
	pub value: String,
	/// Name of the source the value came from
	pub source: String,
}

/// Configuration environment
///
/// # Examples
///
/// ```
/// use encprops_conf::environment::Environment;
/// use encprops_conf::source::PropertiesPropertySource;
///
/// let mut env = Environment::new();
/// env.property_sources_mut().add_last(PropertiesPropertySource::from_pairs(
///     "defaults",
///     [("host", "localhost"), ("url", "http://${host}:${port:8080}/")],
/// ));
///
/// assert_eq!(
///     env.get_property("url").unwrap().as_deref(),
///     Some("http://localhost:8080/")
/// );
/// ```
#[derive(Debug, Default)]
pub struct Environment {
	sources: PropertySources,
}

impl Environment {
	/// Create an environment with no sources
	pub fn new() -> Self {
		Self::default()
	}

	/// Create an environment backed by the process environment variables
	pub fn with_system_environment() -> Self {
		let mut env = Self::new();
		env.sources.add_last(SystemEnvironmentPropertySource::new());
		env
	}

	pub fn property_sources(&self) -> &PropertySources {
		&self.sources
	}

	pub fn property_sources_mut(&mut self) -> &mut PropertySources {
		&mut self.sources
	}

	/// Look up a property, resolving placeholders in its value
	///
	/// Placeholders that cannot be resolved are left in place.
	pub fn get_property(&self, key: &str) -> Result<Option<String>, PropertyError> {
		match self.lookup(key)? {
			Some(value) => self.resolve(&value, false, &mut Vec::new()).map(Some),
			None => Ok(None),
		}
	}

	/// Look up a property, falling back to a default
	pub fn get_property_or(&self, key: &str, default: &str) -> Result<String, PropertyError> {
		Ok(self
			.get_property(key)?
			.unwrap_or_else(|| default.to_string()))
	}

	/// Look up a property that must be defined
	pub fn get_required_property(&self, key: &str) -> Result<String, PropertyError> {
		self.get_property(key)?
			.ok_or_else(|| PropertyError::MissingProperty(key.to_string()))
	}

	/// Look up a property and parse it
	///
	/// # Examples
	///
	/// ```
	/// use encprops_conf::environment::Environment;
	/// use encprops_conf::source::PropertiesPropertySource;
	///
	/// let mut env = Environment::new();
	/// env.property_sources_mut()
	///     .add_last(PropertiesPropertySource::from_pairs("defaults", [("pool.size", "16")]));
	///
	/// let size: Option<u32> = env.get_property_as("pool.size").unwrap();
	/// assert_eq!(size, Some(16));
	/// ```
	pub fn get_property_as<T>(&self, key: &str) -> Result<Option<T>, PropertyError>
	where
		T: FromStr,
		T::Err: fmt::Display,
	{
		let Some(value) = self.get_property(key)? else {
			return Ok(None);
		};
		value
			.trim()
			.parse::<T>()
			.map(Some)
			.map_err(|e| PropertyError::Conversion {
				name: key.to_string(),
				value_len: value.len(),
				error: e.to_string(),
			})
	}

	pub fn contains_property(&self, key: &str) -> bool {
		self.sources.iter().any(|s| s.contains_property(key))
	}

	/// Replace `${...}` placeholders, leaving unresolvable ones untouched
	pub fn resolve_placeholders(&self, text: &str) -> Result<String, PropertyError> {
		self.resolve(text, false, &mut Vec::new())
	}

	/// Replace `${...}` placeholders, failing on unresolvable ones
	pub fn resolve_required_placeholders(&self, text: &str) -> Result<String, PropertyError> {
		self.resolve(text, true, &mut Vec::new())
	}

	/// Every enumerable property with its effective value and source
	///
	/// Properties appear in source precedence order, then file order.
	pub fn resolved_properties(&self) -> Result<Vec<ResolvedProperty>, PropertyError> {
		let mut seen = std::collections::HashSet::new();
		let mut resolved = Vec::new();
		for source in self.sources.iter() {
			for name in source.property_names() {
				if !seen.insert(name.clone()) {
					continue;
				}
				if let Some(value) = self.get_property(&name)? {
					resolved.push(ResolvedProperty {
						name,
						value,
						source: source.name().to_string(),
					});
				}
			}
		}
		Ok(resolved)
	}

	/// First raw value for `key` across sources
	fn lookup(&self, key: &str) -> Result<Option<String>, PropertyError> {
		for source in self.sources.iter() {
			if let Some(value) = source.get_property(key)? {
				tracing::trace!(key, source = source.name(), "Resolved property");
				return Ok(Some(value));
			}
		}
		Ok(None)
	}

	fn resolve(
		&self,
		text: &str,
		strict: bool,
		visiting: &mut Vec<String>,
	) -> Result<String, PropertyError> {
		let mut result = String::with_capacity(text.len());
		let mut rest = text;

		while let Some(start) = rest.find(PLACEHOLDER_PREFIX) {
			result.push_str(&rest[..start]);
			let body = &rest[start + PLACEHOLDER_PREFIX.len()..];
			let Some(end) = find_placeholder_end(body) else {
				// Unterminated placeholder stays literal
				result.push_str(&rest[start..]);
				return Ok(result);
			};

			let placeholder = self.resolve(&body[..end], strict, visiting)?;
			if visiting.contains(&placeholder) {
				return Err(PropertyError::CircularPlaceholder(placeholder));
			}
			visiting.push(placeholder.clone());

			let value = match self.lookup(&placeholder)? {
				Some(value) => Some(value),
				None => match placeholder.split_once(VALUE_SEPARATOR) {
					Some((key, default)) => {
						Some(self.lookup(key)?.unwrap_or_else(|| default.to_string()))
					}
					None => None,
				},
			};

			match value {
				Some(value) => {
					let value = self.resolve(&value, strict, visiting)?;
					result.push_str(&value);
				}
				None if strict => {
					return Err(PropertyError::UnresolvablePlaceholder(placeholder));
				}
				None => {
					result.push_str(PLACEHOLDER_PREFIX);
					result.push_str(&placeholder);
					result.push(PLACEHOLDER_SUFFIX);
				}
			}

			visiting.pop();
			rest = &body[end + 1..];
		}

		result.push_str(rest);
		Ok(result)
	}
}

/// Index of the `}` closing a placeholder body, honoring nested `${...}`
fn find_placeholder_end(body: &str) -> Option<usize> {
	let bytes = body.as_bytes();
	let mut depth = 0usize;
	let mut i = 0;
	while i < bytes.len() {
		if bytes[i..].starts_with(PLACEHOLDER_PREFIX.as_bytes()) {
			depth += 1;
			i += PLACEHOLDER_PREFIX.len();
		} else if bytes[i] == b'}' {
			if depth == 0 {
				return Some(i);
			}
			depth -= 1;
			i += 1;
		} else {
			i += 1;
		}
	}
	None
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::source::PropertiesPropertySource;
	use rstest::{fixture, rstest};

	fn source(name: &str, pairs: &[(&str, &str)]) -> PropertiesPropertySource {
		PropertiesPropertySource::from_pairs(name, pairs.iter().copied())
	}

	#[fixture]
	fn env() -> Environment {
		let mut env = Environment::new();
		let sources = env.property_sources_mut();
		sources.add_last(source(
			"high",
			&[("shared", "high"), ("host", "example.com")],
		));
		sources.add_last(source(
			"low",
			&[
				("shared", "low"),
				("only.low", "low-value"),
				("url", "https://${host}:${port:443}/${path}"),
				("port.number", " 8443 "),
				("loop.a", "${loop.b}"),
				("loop.b", "${loop.a}"),
			],
		));
		env
	}

	#[rstest]
	fn test_first_source_wins(env: Environment) {
		assert_eq!(env.get_property("shared").unwrap().as_deref(), Some("high"));
		assert_eq!(
			env.get_property("only.low").unwrap().as_deref(),
			Some("low-value")
		);
		assert_eq!(env.get_property("missing").unwrap(), None);
	}

	#[rstest]
	fn test_get_property_resolves_placeholders_leniently(env: Environment) {
		assert_eq!(
			env.get_property("url").unwrap().as_deref(),
			Some("https://example.com:443/${path}")
		);
	}

	#[rstest]
	fn test_required_placeholders_fail_when_unresolvable(env: Environment) {
		// Act
		let err = env.resolve_required_placeholders("${path}").unwrap_err();

		// Assert
		assert!(matches!(err, PropertyError::UnresolvablePlaceholder(p) if p == "path"));
	}

	#[rstest]
	fn test_nested_placeholder_keys(env: Environment) {
		assert_eq!(
			env.resolve_placeholders("${only.${missing:low}}").unwrap(),
			"low-value"
		);
	}

	#[rstest]
	fn test_circular_placeholders_are_detected(env: Environment) {
		let err = env.get_property("loop.a").unwrap_err();
		assert!(matches!(err, PropertyError::CircularPlaceholder(_)));
	}

	#[rstest]
	fn test_unterminated_placeholder_is_literal(env: Environment) {
		assert_eq!(env.resolve_placeholders("cost: ${host").unwrap(), "cost: ${host");
	}

	#[rstest]
	fn test_get_property_as(env: Environment) {
		// Act
		let port: Option<u16> = env.get_property_as("port.number").unwrap();
		let bad = env.get_property_as::<u16>("host");

		// Assert
		assert_eq!(port, Some(8443));
		match bad {
			Err(PropertyError::Conversion { name, value_len, .. }) => {
				assert_eq!(name, "host");
				assert_eq!(value_len, "example.com".len());
			}
			other => panic!("Expected Conversion error, got {:?}", other),
		}
	}

	#[rstest]
	fn test_required_and_default_lookups(env: Environment) {
		assert_eq!(env.get_required_property("host").unwrap(), "example.com");
		assert!(matches!(
			env.get_required_property("nope"),
			Err(PropertyError::MissingProperty(_))
		));
		assert_eq!(env.get_property_or("nope", "fallback").unwrap(), "fallback");
		assert!(env.contains_property("only.low"));
		assert!(!env.contains_property("nope"));
	}

	#[rstest]
	fn test_add_first_replaces_existing_source() {
		// Arrange
		let mut sources = PropertySources::new();
		sources.add_last(source("a", &[("k", "a")]));
		sources.add_last(source("b", &[("k", "b")]));

		// Act
		sources.add_first(source("b", &[("k", "b2")]));

		// Assert
		assert_eq!(sources.names(), vec!["b", "a"]);
		assert_eq!(
			sources.get("b").unwrap().get_property("k").unwrap().as_deref(),
			Some("b2")
		);
	}

	#[rstest]
	fn test_relative_insertion() {
		// Arrange
		let mut sources = PropertySources::new();
		sources.add_last(source("a", &[]));
		sources.add_last(source("c", &[]));

		// Act
		sources.add_before("c", source("b", &[])).unwrap();
		sources.add_after("c", source("d", &[])).unwrap();

		// Assert
		assert_eq!(sources.names(), vec!["a", "b", "c", "d"]);
		assert!(matches!(
			sources.add_before("zzz", source("e", &[])),
			Err(PropertyError::UnknownSource(_))
		));
		assert!(matches!(
			sources.add_after("a", source("a", &[])),
			Err(PropertyError::SelfRelativeSource(_))
		));
	}

	#[rstest]
	fn test_resolved_properties_propagates_resolution_errors(env: Environment) {
		// Act
		let resolved = env.resolved_properties();

		// Assert
		assert!(matches!(resolved, Err(PropertyError::CircularPlaceholder(_))));
	}

	#[rstest]
	fn test_resolved_properties_snapshot() {
		// Arrange
		let mut env = Environment::new();
		env.property_sources_mut()
			.add_last(source("high", &[("a", "1"), ("b", "2")]));
		env.property_sources_mut()
			.add_last(source("low", &[("b", "20"), ("c", "30")]));

		// Act
		let resolved = env.resolved_properties().unwrap();

		// Assert
		let summary: Vec<_> = resolved
			.iter()
			.map(|p| (p.name.as_str(), p.value.as_str(), p.source.as_str()))
			.collect();
		assert_eq!(
			summary,
			vec![("a", "1", "high"), ("b", "2", "high"), ("c", "30", "low")]
		);
	}
}
