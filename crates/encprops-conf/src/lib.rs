//! # encprops configuration
//!
//! Property files with transparently decrypted values, layered over packaged
//! defaults and operator overrides.
//!
//! Applications ship `<name>.properties` files with their resources. Secret
//! values in those files are stored encrypted as `ENC(<base64>)` and are
//! decrypted on read with a password taken from an environment variable.
//! Operators can drop a file with the same name into an overrides directory
//! to replace individual properties without rebuilding the artifact.
//!
//! ## Features
//!
//! - **Java-compatible property files**: continuation lines, escapes and
//!   `\uXXXX` sequences are read the way `java.util.Properties` reads them
//! - **Jasypt-compatible encryption**: values produced by
//!   `PBEWithMD5AndDES` and `PBEWithMD5AndTripleDES` encryptors decrypt as-is
//! - **First-priority registration**: loaded sources shadow every source
//!   already present in the [`Environment`]
//!
//! ## Quick Start
//!
//! ```rust
//! use encprops_conf::prelude::*;
//!
//! let config = InitializerConfig::new("EXAMPLE_APP_ENCRYPTION_KEY")
//!     .with_property_source_names(["application"]);
//! let classpath = Classpath::new()
//!     .with_embedded("application.properties", "server.port=8080\n");
//!
//! let mut env = Environment::new();
//! EncryptedPropertiesInitializer::new(config, classpath)
//!     .unwrap()
//!     .initialize(&mut env)
//!     .unwrap();
//!
//! assert_eq!(env.get_property_as::<u16>("server.port").unwrap(), Some(8080));
//! ```
//!
//! ## Module Organization
//!
//! - [`properties`]: the `.properties` file format
//! - [`encryption`]: password-based string encryption
//! - [`resource`]: packaged and filesystem resources
//! - [`source`]: property sources, including decrypting ones
//! - [`environment`]: ordered property sources with placeholder resolution
//! - [`initializer`]: registers encrypted property files at startup
//! - [`config`]: initializer configuration

pub mod config;
pub mod encryption;
pub mod environment;
pub mod initializer;
pub mod prelude;
pub mod properties;
pub mod resource;
pub mod source;

// Re-export commonly used types at the crate root for convenience
pub use config::{ConfigError, InitializerConfig};
pub use encryption::{EncryptionError, PbeAlgorithm, PbeConfig, PbeStringEncryptor, StringEncryptor};
pub use environment::Environment;
pub use initializer::{EncryptedPropertiesInitializer, EnvironmentInitializer, InitializerError};
pub use properties::Properties;
