//! Prelude module for convenient imports
//!
//! Import this module to get access to the most commonly used types and traits.

pub use crate::config::{ConfigError, EncryptionSettings, InitializerConfig};
pub use crate::encryption::{
	EncryptionError, PbeAlgorithm, PbeConfig, PbeStringEncryptor, StringEncryptor,
	decrypt_value, encrypt_value, is_encrypted_value,
};
pub use crate::environment::{Environment, PropertySources, ResolvedProperty};
pub use crate::initializer::{
	EncryptedPropertiesInitializer, EnvironmentInitializer, InitializerError,
};
pub use crate::properties::{Properties, PropertiesError};
pub use crate::resource::{Classpath, FileSystemResource, Resource};
pub use crate::source::{
	EncryptablePropertySource, PropertiesPropertySource, PropertyError, PropertySource,
	SystemEnvironmentPropertySource,
};
