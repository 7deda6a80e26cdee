//! Registers encrypted property files into an [`Environment`] at startup
//!
//! For every configured property set `<name>`:
//!
//! 1. `<name>.properties` is loaded from the [`Classpath`] and registered as
//!    the source `<name>`. The file must exist.
//! 2. If an overrides directory is configured and contains
//!    `<name>.properties`, that file is registered as `<name>Override`.
//!
//! Each source is added with the highest precedence, so overrides shadow the
//! packaged file, later property sets shadow earlier ones, and all of them
//! shadow whatever the environment already held. Encrypted `ENC(...)` values
//! are decrypted when read, with one encryptor shared by all sources.

use crate::config::{ConfigError, InitializerConfig};
use crate::encryption::{EncryptionError, PbeConfig, PbeStringEncryptor, StringEncryptor};
use crate::environment::Environment;
use crate::properties::{Properties, PropertiesError};
use crate::resource::{Classpath, FileSystemResource, Resource, load_properties};
use crate::source::EncryptablePropertySource;
use std::io;
use std::sync::Arc;

/// Suffix appended to a property set name for its override source
pub const OVERRIDE_SUFFIX: &str = "Override";

/// File extension of property files
pub const PROPERTIES_EXTENSION: &str = "properties";

/// Errors raised while initializing the environment
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum InitializerError {
	#[error("Failed to load {resource}: {source}")]
	Load {
		resource: String,
		#[source]
		source: PropertiesError,
	},

	#[error("Configuration error: {0}")]
	Config(#[from] ConfigError),

	#[error("Encryption error: {0}")]
	Encryption(#[from] EncryptionError),
}

/// Something that prepares an [`Environment`] before the application uses it
pub trait EnvironmentInitializer {
	fn initialize(&self, environment: &mut Environment) -> Result<(), InitializerError>;
}

/// Loads packaged property files and operator overrides with decryption support
///
/// # Examples
///
/// ```
/// use encprops_conf::prelude::*;
///
/// let config = InitializerConfig::new("ENCPROPS_DOC_PASSWORD");
/// let classpath = Classpath::new().with_embedded("application.properties", "greeting=hello\n");
/// let initializer = EncryptedPropertiesInitializer::new(config, classpath).unwrap();
///
/// let mut env = Environment::new();
/// initializer.initialize(&mut env).unwrap();
/// assert_eq!(env.get_property("greeting").unwrap().as_deref(), Some("hello"));
/// ```
pub struct EncryptedPropertiesInitializer {
	config: InitializerConfig,
	classpath: Classpath,
	encryptor: Arc<dyn StringEncryptor>,
}

impl EncryptedPropertiesInitializer {
	/// Create an initializer whose password is read from the configured variable
	pub fn new(config: InitializerConfig, classpath: Classpath) -> Result<Self, InitializerError> {
		config.validate()?;
		let pbe = PbeConfig::from_env(&config.password_env_name)
			.algorithm(config.encryption.algorithm)
			.iterations(config.encryption.iterations);
		let encryptor = PbeStringEncryptor::new(pbe)?;
		Ok(Self {
			config,
			classpath,
			encryptor: Arc::new(encryptor),
		})
	}

	/// Create an initializer whose classpath is the configured resource roots
	pub fn from_config(config: InitializerConfig) -> Result<Self, InitializerError> {
		let classpath = config
			.resource_roots
			.iter()
			.fold(Classpath::new(), |classpath, root| classpath.with_root(root));
		Self::new(config, classpath)
	}

	/// Use a different encryptor for all registered sources
	pub fn with_encryptor(mut self, encryptor: Arc<dyn StringEncryptor>) -> Self {
		self.encryptor = encryptor;
		self
	}

	pub fn config(&self) -> &InitializerConfig {
		&self.config
	}

	pub fn classpath(&self) -> &Classpath {
		&self.classpath
	}

	/// The encryptor shared by the registered sources
	pub fn encryptor(&self) -> Arc<dyn StringEncryptor> {
		Arc::clone(&self.encryptor)
	}

	fn add_property_source(
		&self,
		environment: &mut Environment,
		name: &str,
	) -> Result<(), InitializerError> {
		self.add_packaged_source(environment, name)?;
		self.add_override_source(environment, name)
	}

	fn add_packaged_source(
		&self,
		environment: &mut Environment,
		name: &str,
	) -> Result<(), InitializerError> {
		let resource = self
			.classpath
			.resource(format!("/{}.{}", name, PROPERTIES_EXTENSION));
		let properties = load_properties(&resource).map_err(|source| InitializerError::Load {
			resource: resource.description(),
			source,
		})?;
		self.register(environment, name.to_string(), properties);
		Ok(())
	}

	fn add_override_source(
		&self,
		environment: &mut Environment,
		name: &str,
	) -> Result<(), InitializerError> {
		let Some(directory) = &self.config.overrides_directory else {
			return Ok(());
		};

		let resource =
			FileSystemResource::new(directory.join(format!("{}.{}", name, PROPERTIES_EXTENSION)));
		match load_properties(&resource) {
			Ok(properties) => {
				self.register(environment, format!("{}{}", name, OVERRIDE_SUFFIX), properties);
				Ok(())
			}
			Err(PropertiesError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
				tracing::debug!(resource = %resource, "No property overrides found");
				Ok(())
			}
			Err(PropertiesError::Io(e)) => {
				tracing::warn!(resource = %resource, error = %e, "Skipping unreadable property overrides");
				Ok(())
			}
			Err(source) => Err(InitializerError::Load {
				resource: resource.description(),
				source,
			}),
		}
	}

	fn register(&self, environment: &mut Environment, source_name: String, properties: Properties) {
		let count = properties.len();
		environment
			.property_sources_mut()
			.add_first(EncryptablePropertySource::new(
				source_name.clone(),
				properties,
				self.encryptor(),
			));
		tracing::info!(source = %source_name, properties = count, "Encryptable properties added");
	}
}

impl EnvironmentInitializer for EncryptedPropertiesInitializer {
	fn initialize(&self, environment: &mut Environment) -> Result<(), InitializerError> {
		for name in &self.config.property_source_names {
			self.add_property_source(environment, name)?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::encryption::wrap_encrypted;
	use crate::source::PropertiesPropertySource;
	use rstest::rstest;
	use std::fs;
	use tempfile::TempDir;

	fn test_encryptor() -> Arc<dyn StringEncryptor> {
		Arc::new(PbeStringEncryptor::new(PbeConfig::with_password("initializer-test")).unwrap())
	}

	fn initializer(classpath: Classpath, overrides: Option<&TempDir>) -> EncryptedPropertiesInitializer {
		let mut config = InitializerConfig::new("ENCPROPS_INITIALIZER_UNIT_UNSET")
			.with_property_source_names(["application", "database"]);
		if let Some(dir) = overrides {
			config = config.with_overrides_directory(dir.path());
		}
		EncryptedPropertiesInitializer::new(config, classpath)
			.unwrap()
			.with_encryptor(test_encryptor())
	}

	#[rstest]
	fn test_sources_are_registered_in_first_priority_order() {
		// Arrange
		let overrides = TempDir::new().unwrap();
		fs::write(overrides.path().join("application.properties"), "shared=override\n").unwrap();
		let classpath = Classpath::new()
			.with_embedded("application.properties", "shared=application\n")
			.with_embedded("database.properties", "db=1\n");
		let mut env = Environment::new();
		env.property_sources_mut()
			.add_last(PropertiesPropertySource::from_pairs("existing", [("shared", "existing")]));

		// Act
		initializer(classpath, Some(&overrides))
			.initialize(&mut env)
			.unwrap();

		// Assert
		assert_eq!(
			env.property_sources().names(),
			vec!["database", "applicationOverride", "application", "existing"]
		);
		assert_eq!(env.get_property("shared").unwrap().as_deref(), Some("override"));
	}

	#[rstest]
	fn test_missing_packaged_file_is_an_error() {
		// Arrange
		let classpath = Classpath::new().with_embedded("application.properties", "a=1\n");
		let mut env = Environment::new();

		// Act
		let err = initializer(classpath, None).initialize(&mut env).unwrap_err();

		// Assert
		match err {
			InitializerError::Load { resource, .. } => {
				assert_eq!(resource, "class path resource [database.properties]");
			}
			other => panic!("Expected Load error, got {:?}", other),
		}
	}

	#[rstest]
	fn test_unreadable_override_is_skipped() {
		// Arrange
		let overrides = TempDir::new().unwrap();
		fs::create_dir(overrides.path().join("application.properties")).unwrap();
		let classpath = Classpath::new().with_embedded("application.properties", "a=1\n");
		let config = InitializerConfig::new("ENCPROPS_INITIALIZER_UNIT_UNSET")
			.with_property_source_names(["application"])
			.with_overrides_directory(overrides.path());
		let initializer = EncryptedPropertiesInitializer::new(config, classpath)
			.unwrap()
			.with_encryptor(test_encryptor());
		let mut env = Environment::new();

		// Act
		initializer.initialize(&mut env).unwrap();

		// Assert
		assert_eq!(env.property_sources().names(), vec!["application"]);
		assert_eq!(env.get_property("a").unwrap().as_deref(), Some("1"));
	}

	#[rstest]
	fn test_malformed_override_is_an_error() {
		// Arrange
		let overrides = TempDir::new().unwrap();
		fs::write(overrides.path().join("database.properties"), "bad=\\uXYZW\n").unwrap();
		let classpath = Classpath::new()
			.with_embedded("application.properties", "a=1\n")
			.with_embedded("database.properties", "b=2\n");
		let mut env = Environment::new();

		// Act
		let result = initializer(classpath, Some(&overrides)).initialize(&mut env);

		// Assert
		assert!(matches!(
			result,
			Err(InitializerError::Load {
				source: PropertiesError::MalformedUnicodeEscape { .. },
				..
			})
		));
	}

	#[rstest]
	fn test_encrypted_values_are_decrypted_on_read() {
		// Arrange
		let encryptor = test_encryptor();
		let encrypted = wrap_encrypted(&encryptor.encrypt("p@ssw0rd").unwrap());
		let classpath = Classpath::new()
			.with_embedded("application.properties", format!("db.password={}\n", encrypted))
			.with_embedded("database.properties", "db.user=app\n");
		let mut env = Environment::new();

		// Act
		initializer(classpath, None).initialize(&mut env).unwrap();

		// Assert
		assert_eq!(
			env.get_property("db.password").unwrap().as_deref(),
			Some("p@ssw0rd")
		);
		assert_eq!(env.get_property("db.user").unwrap().as_deref(), Some("app"));
	}

	#[rstest]
	fn test_invalid_config_is_rejected() {
		let config = InitializerConfig::new("");
		let result = EncryptedPropertiesInitializer::new(config, Classpath::new());
		assert!(matches!(result, Err(InitializerError::Config(_))));
	}
}
