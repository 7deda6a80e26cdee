//! Named sources of configuration properties
//!
//! A property source answers lookups by property name. Sources are stacked
//! in an [`Environment`](crate::environment::Environment), where the first
//! source that knows a property wins.

use crate::encryption::{EncryptionError, StringEncryptor, decrypt_value};
use crate::properties::Properties;
use std::env;
use std::fmt;
use std::sync::Arc;

/// Name of the source exposing process environment variables
pub const SYSTEM_ENVIRONMENT_SOURCE_NAME: &str = "systemEnvironment";

/// Errors raised while reading properties
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum PropertyError {
	#[error("Failed to decrypt property '{name}' from source '{source_name}': {error}")]
	Decryption {
		name: String,
		source_name: String,
		#[source]
		error: EncryptionError,
	},

	#[error("Required property '{0}' is not defined")]
	MissingProperty(String),

	#[error("Failed to convert property '{name}' (value length: {value_len}): {error}")]
	Conversion {
		name: String,
		/// Length of the value, stored instead of the value itself so secrets do not leak
		value_len: usize,
		error: String,
	},

	#[error("Circular placeholder reference '{0}'")]
	CircularPlaceholder(String),

	#[error("Could not resolve placeholder '{0}'")]
	UnresolvablePlaceholder(String),

	#[error("Property source '{0}' does not exist")]
	UnknownSource(String),

	#[error("Property source '{0}' cannot be positioned relative to itself")]
	SelfRelativeSource(String),
}

/// Trait for property sources
pub trait PropertySource: Send + Sync {
	/// Unique name of this source
	fn name(&self) -> &str;

	/// Look up a property
	fn get_property(&self, name: &str) -> Result<Option<String>, PropertyError>;

	/// Names of all properties this source can enumerate
	fn property_names(&self) -> Vec<String>;

	/// Check whether this source defines a property
	fn contains_property(&self, name: &str) -> bool {
		self.property_names().iter().any(|n| n == name)
	}

	/// Get a description of this source
	fn description(&self) -> String {
		self.name().to_string()
	}
}

impl<T: PropertySource + ?Sized> PropertySource for Box<T> {
	fn name(&self) -> &str {
		(**self).name()
	}

	fn get_property(&self, name: &str) -> Result<Option<String>, PropertyError> {
		(**self).get_property(name)
	}

	fn property_names(&self) -> Vec<String> {
		(**self).property_names()
	}

	fn contains_property(&self, name: &str) -> bool {
		(**self).contains_property(name)
	}

	fn description(&self) -> String {
		(**self).description()
	}
}

/// Plain, in-memory property source
///
/// # Examples
///
/// ```
/// use encprops_conf::source::{PropertiesPropertySource, PropertySource};
///
/// let defaults = PropertiesPropertySource::from_pairs("defaults", [("server.port", "8080")]);
/// assert_eq!(defaults.get_property("server.port").unwrap().as_deref(), Some("8080"));
/// ```
#[derive(Debug, Clone)]
pub struct PropertiesPropertySource {
	name: String,
	properties: Properties,
}

impl PropertiesPropertySource {
	pub fn new(name: impl Into<String>, properties: Properties) -> Self {
		Self {
			name: name.into(),
			properties,
		}
	}

	pub fn from_pairs<K, V>(name: impl Into<String>, pairs: impl IntoIterator<Item = (K, V)>) -> Self
	where
		K: Into<String>,
		V: Into<String>,
	{
		Self::new(name, pairs.into_iter().collect())
	}

	pub fn properties(&self) -> &Properties {
		&self.properties
	}
}

impl PropertySource for PropertiesPropertySource {
	fn name(&self) -> &str {
		&self.name
	}

	fn get_property(&self, name: &str) -> Result<Option<String>, PropertyError> {
		Ok(self.properties.get(name).map(str::to_string))
	}

	fn property_names(&self) -> Vec<String> {
		self.properties.keys().map(str::to_string).collect()
	}

	fn contains_property(&self, name: &str) -> bool {
		self.properties.contains_key(name)
	}
}

/// Property source that decrypts `ENC(...)` values when they are read
///
/// Values stay encrypted in memory; each lookup decrypts afresh. Plain
/// values are returned unchanged.
pub struct EncryptablePropertySource {
	name: String,
	properties: Properties,
	encryptor: Arc<dyn StringEncryptor>,
}

impl EncryptablePropertySource {
	pub fn new(
		name: impl Into<String>,
		properties: Properties,
		encryptor: Arc<dyn StringEncryptor>,
	) -> Self {
		Self {
			name: name.into(),
			properties,
			encryptor,
		}
	}

	/// The raw, still encrypted, properties
	pub fn raw_properties(&self) -> &Properties {
		&self.properties
	}
}

impl fmt::Debug for EncryptablePropertySource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EncryptablePropertySource")
			.field("name", &self.name)
			.field("properties", &self.properties.len())
			.finish_non_exhaustive()
	}
}

impl PropertySource for EncryptablePropertySource {
	fn name(&self) -> &str {
		&self.name
	}

	fn get_property(&self, name: &str) -> Result<Option<String>, PropertyError> {
		let Some(value) = self.properties.get(name) else {
			return Ok(None);
		};
		decrypt_value(value, self.encryptor.as_ref())
			.map(Some)
			.map_err(|error| PropertyError::Decryption {
				name: name.to_string(),
				source_name: self.name.clone(),
				error,
			})
	}

	fn property_names(&self) -> Vec<String> {
		self.properties.keys().map(str::to_string).collect()
	}

	fn contains_property(&self, name: &str) -> bool {
		self.properties.contains_key(name)
	}
}

/// Process environment variables as a property source
///
/// Lookups are relaxed so dotted property names match conventional variable
/// names: `db.max-pool` is also looked up as `db_max_pool` and `DB_MAX_POOL`.
#[derive(Debug, Clone)]
pub struct SystemEnvironmentPropertySource {
	name: String,
	prefix: Option<String>,
}

impl SystemEnvironmentPropertySource {
	pub fn new() -> Self {
		Self {
			name: SYSTEM_ENVIRONMENT_SOURCE_NAME.to_string(),
			prefix: None,
		}
	}

	/// Only expose variables starting with `prefix` (which is stripped from names)
	///
	/// # Examples
	///
	/// ```
	/// use encprops_conf::source::SystemEnvironmentPropertySource;
	///
	/// let source = SystemEnvironmentPropertySource::new().with_prefix("APP_");
	/// // `db.url` is now read from APP_DB_URL
	/// ```
	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = Some(prefix.into());
		self
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = name.into();
		self
	}

	fn candidates(name: &str) -> Vec<String> {
		let mut candidates = vec![
			name.to_string(),
			name.replace('.', "_"),
			name.replace('-', "_"),
			name.replace(['.', '-'], "_"),
		];
		let upper: Vec<String> = candidates.iter().map(|c| c.to_uppercase()).collect();
		candidates.extend(upper);
		candidates.dedup();
		candidates
	}

	fn resolve(&self, name: &str) -> Option<String> {
		let prefix = self.prefix.as_deref().unwrap_or("");
		Self::candidates(name)
			.into_iter()
			.find_map(|candidate| env::var(format!("{}{}", prefix, candidate)).ok())
	}
}

impl Default for SystemEnvironmentPropertySource {
	fn default() -> Self {
		Self::new()
	}
}

impl PropertySource for SystemEnvironmentPropertySource {
	fn name(&self) -> &str {
		&self.name
	}

	fn get_property(&self, name: &str) -> Result<Option<String>, PropertyError> {
		Ok(self.resolve(name))
	}

	fn property_names(&self) -> Vec<String> {
		env::vars()
			.filter_map(|(key, _)| match &self.prefix {
				Some(prefix) => key.strip_prefix(prefix.as_str()).map(str::to_string),
				None => Some(key),
			})
			.collect()
	}

	fn contains_property(&self, name: &str) -> bool {
		self.resolve(name).is_some()
	}

	fn description(&self) -> String {
		match &self.prefix {
			Some(prefix) => format!("Environment variables (prefix: {})", prefix),
			None => "Environment variables".to_string(),
		}
	}
}
