//! # encprops
//!
//! Encrypted property files for Rust applications.
//!
//! An application packages `<name>.properties` files with its resources and
//! keeps secrets in them as `ENC(...)` values. At startup an
//! [`EncryptedPropertiesInitializer`] loads each file, lays an optional
//! operator override from a directory outside the artifact on top of it, and
//! registers both in the [`Environment`] ahead of every other source. Values
//! are decrypted on read with a password taken from an environment variable.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use encprops::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = InitializerConfig::from_file("encprops.toml")?;
//!
//! let mut env = Environment::with_system_environment();
//! EncryptedPropertiesInitializer::from_config(config)?.initialize(&mut env)?;
//!
//! let database_url = env.get_required_property("db.url")?;
//! # let _ = database_url;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`conf`]: property files, encryption, sources and the initializer

pub mod conf;

// Re-export commonly used types at the crate root for convenience
pub use encprops_conf::{
	ConfigError, EncryptedPropertiesInitializer, EncryptionError, Environment,
	EnvironmentInitializer, InitializerConfig, InitializerError, PbeAlgorithm, PbeConfig,
	PbeStringEncryptor, Properties, StringEncryptor,
};

/// Prelude module for convenient imports
pub mod prelude {
	pub use encprops_conf::prelude::*;
}
