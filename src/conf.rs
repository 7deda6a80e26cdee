//! Configuration module.
//!
//! Property files, password-based encryption, property sources and the
//! initializer that registers them.
//!
//! # Examples
//!
//! ```rust
//! use encprops::conf::encryption::{is_encrypted_value, wrap_encrypted};
//!
//! assert!(is_encrypted_value(&wrap_encrypted("CQgHBgkIBwZ7LFwKXa21sw==")));
//! ```

pub use encprops_conf::*;
