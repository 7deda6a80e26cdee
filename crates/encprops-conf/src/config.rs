//! Initializer configuration
//!
//! Describes which property sets to load, where the packaged resources and
//! operator overrides live, and how encrypted values are protected. The
//! configuration is usually read from a small TOML file:
//!
//! ```toml
//! password_env_name = "EXAMPLE_APP_ENCRYPTION_KEY"
//! property_source_names = ["application", "database"]
//! resource_roots = ["resources"]
//! overrides_directory = "/etc/example-app"
//!
//! [encryption]
//! algorithm = "PBEWithMD5AndTripleDES"
//! iterations = 1000
//! ```

use crate::encryption::{DEFAULT_KEY_OBTENTION_ITERATIONS, PbeAlgorithm};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Property set loaded when none are configured
pub const DEFAULT_PROPERTY_SOURCE_NAME: &str = "application";

/// Resource directory used when none are configured
pub const DEFAULT_RESOURCE_ROOT: &str = "resources";

/// Configuration errors
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("Failed to read configuration file {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("Invalid environment variable name '{name}': {reason}")]
	InvalidVariableName { name: String, reason: String },

	#[error("Invalid property source name '{name}': {reason}")]
	InvalidSourceName { name: String, reason: String },

	#[error("Invalid configuration: {0}")]
	Invalid(String),
}

/// Encryption settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncryptionSettings {
	#[serde(default)]
	pub algorithm: PbeAlgorithm,

	#[serde(default = "default_iterations")]
	pub iterations: u32,
}

impl Default for EncryptionSettings {
	fn default() -> Self {
		Self {
			algorithm: PbeAlgorithm::default(),
			iterations: DEFAULT_KEY_OBTENTION_ITERATIONS,
		}
	}
}

fn default_iterations() -> u32 {
	DEFAULT_KEY_OBTENTION_ITERATIONS
}

fn default_property_source_names() -> Vec<String> {
	vec![DEFAULT_PROPERTY_SOURCE_NAME.to_string()]
}

fn default_resource_roots() -> Vec<PathBuf> {
	vec![PathBuf::from(DEFAULT_RESOURCE_ROOT)]
}

/// Settings for the encrypted properties initializer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InitializerConfig {
	/// Environment variable holding the encryption password
	pub password_env_name: String,

	/// Property sets to load, in registration order
	#[serde(default = "default_property_source_names")]
	pub property_source_names: Vec<String>,

	/// Directories searched for packaged `<name>.properties` files
	#[serde(default = "default_resource_roots")]
	pub resource_roots: Vec<PathBuf>,

	/// Directory holding operator overrides, if any
	#[serde(default)]
	pub overrides_directory: Option<PathBuf>,

	#[serde(default)]
	pub encryption: EncryptionSettings,
}

impl InitializerConfig {
	/// Create a configuration with defaults for everything but the password variable
	///
	/// # Examples
	///
	/// ```
	/// use encprops_conf::config::InitializerConfig;
	///
	/// let config = InitializerConfig::new("EXAMPLE_APP_ENCRYPTION_KEY")
	///     .with_property_source_names(["application", "database"])
	///     .with_overrides_directory("/etc/example-app");
	/// assert!(config.validate().is_ok());
	/// ```
	pub fn new(password_env_name: impl Into<String>) -> Self {
		Self {
			password_env_name: password_env_name.into(),
			property_source_names: default_property_source_names(),
			resource_roots: default_resource_roots(),
			overrides_directory: None,
			encryption: EncryptionSettings::default(),
		}
	}

	pub fn with_property_source_names<I, S>(mut self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.property_source_names = names.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_resource_roots<I, P>(mut self, roots: I) -> Self
	where
		I: IntoIterator<Item = P>,
		P: Into<PathBuf>,
	{
		self.resource_roots = roots.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_overrides_directory(mut self, directory: impl Into<PathBuf>) -> Self {
		self.overrides_directory = Some(directory.into());
		self
	}

	pub fn with_algorithm(mut self, algorithm: PbeAlgorithm) -> Self {
		self.encryption.algorithm = algorithm;
		self
	}

	pub fn with_iterations(mut self, iterations: u32) -> Self {
		self.encryption.iterations = iterations;
		self
	}

	/// Parse a configuration from TOML text
	pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(content)?;
		config.validate()?;
		Ok(config)
	}

	/// Read a configuration file
	///
	/// Relative resource roots and override directory are resolved against
	/// the directory containing the file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		let config = Self::from_toml_str(&content)?;
		Ok(match path.parent() {
			Some(base) if !base.as_os_str().is_empty() => config.relative_to(base),
			_ => config,
		})
	}

	/// Resolve relative paths against `base`
	pub fn relative_to(mut self, base: &Path) -> Self {
		self.resource_roots = self
			.resource_roots
			.into_iter()
			.map(|root| base.join(root))
			.collect();
		self.overrides_directory = self.overrides_directory.map(|dir| base.join(dir));
		self
	}

	/// Check the configuration for mistakes that would only show up at startup
	pub fn validate(&self) -> Result<(), ConfigError> {
		validate_env_var_name(&self.password_env_name)?;

		let mut seen = HashSet::new();
		for name in &self.property_source_names {
			validate_source_name(name)?;
			// A repeated name would be re-added with `add_first`, replacing its
			// earlier source and reordering it ahead of the names in between.
			if !seen.insert(name.as_str()) {
				return Err(ConfigError::InvalidSourceName {
					name: name.clone(),
					reason: "listed more than once".to_string(),
				});
			}
		}

		if self.encryption.iterations == 0 {
			return Err(ConfigError::Invalid(
				"encryption.iterations must be greater than zero".to_string(),
			));
		}

		Ok(())
	}
}

/// Validates an environment variable name.
///
/// Rejects names that are empty, contain control characters, or contain
/// the `=` character (which is used as the key-value separator).
pub fn validate_env_var_name(name: &str) -> Result<(), ConfigError> {
	let invalid = |reason: String| ConfigError::InvalidVariableName {
		name: name.to_string(),
		reason,
	};

	if name.is_empty() {
		return Err(invalid(
			"environment variable name must not be empty".to_string(),
		));
	}

	if let Some(pos) = name.find(|c: char| c.is_control()) {
		return Err(invalid(format!(
			"environment variable name contains control character at position {}",
			pos
		)));
	}

	if name.contains('=') {
		return Err(invalid(
			"environment variable name must not contain '='".to_string(),
		));
	}

	Ok(())
}

/// Property source names become file names, so they must be plain names
fn validate_source_name(name: &str) -> Result<(), ConfigError> {
	let invalid = |reason: &str| ConfigError::InvalidSourceName {
		name: name.to_string(),
		reason: reason.to_string(),
	};

	if name.trim().is_empty() {
		return Err(invalid("must not be empty"));
	}
	if name.contains(['/', '\\']) || name == "." || name == ".." {
		return Err(invalid("must not contain path separators"));
	}
	if name.chars().any(char::is_control) {
		return Err(invalid("must not contain control characters"));
	}
	Ok(())
}
