//! Password-based encryption of property values
//!
//! Values are encrypted with the PBES1 family of ciphers and stored as
//! `base64(salt || ciphertext)`. The output is byte-compatible with jasypt's
//! `StandardPBEStringEncryptor`, so property files encrypted with the jasypt
//! command-line tools can be read here and the other way around.
//!
//! Encrypted values are marked inside property files as `ENC(<base64>)`.
//!
//! ## Example
//!
//! ```
//! use encprops_conf::encryption::{PbeConfig, PbeStringEncryptor, StringEncryptor};
//!
//! let encryptor = PbeStringEncryptor::new(PbeConfig::with_password("s3cr3t")).unwrap();
//! let encrypted = encryptor.encrypt("hunter2").unwrap();
//! assert_eq!(encryptor.decrypt(&encrypted).unwrap(), "hunter2");
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use md5::{Digest, Md5};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroizing;

/// Prefix marking an encrypted property value
pub const ENCRYPTED_VALUE_PREFIX: &str = "ENC(";

/// Suffix marking an encrypted property value
pub const ENCRYPTED_VALUE_SUFFIX: &str = ")";

/// Default number of hash iterations used to derive the cipher key
pub const DEFAULT_KEY_OBTENTION_ITERATIONS: u32 = 1000;

/// Salt length in bytes (the DES block size)
const SALT_SIZE: usize = 8;

type DesCbcEnc = cbc::Encryptor<des::Des>;
type DesCbcDec = cbc::Decryptor<des::Des>;
type TdesCbcEnc = cbc::Encryptor<des::TdesEde3>;
type TdesCbcDec = cbc::Decryptor<des::TdesEde3>;

/// Encryption errors
///
/// Messages never include the plaintext, the ciphertext or the password.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum EncryptionError {
	#[error("No encryption password available: environment variable '{env_name}' is not set")]
	MissingPassword { env_name: String },

	#[error("No encryption password configured")]
	NoPassword,

	#[error("Invalid encryption password: {0}")]
	InvalidPassword(&'static str),

	#[error("Key obtention iterations must be greater than zero")]
	InvalidIterations,

	#[error("Unknown PBE algorithm: {0}")]
	UnknownAlgorithm(String),

	#[error("Encrypted value is not valid base64")]
	InvalidEncoding,

	#[error("Encrypted value is too short ({len} bytes)")]
	TooShort { len: usize },

	#[error("Decryption failed: wrong password or corrupted value")]
	DecryptionFailed,

	#[error("Decrypted value is not valid UTF-8")]
	InvalidUtf8,

	#[error("Cipher initialization failed")]
	CipherInit,
}

/// Encrypts and decrypts strings
///
/// Implementations are shared between property sources behind an `Arc`.
pub trait StringEncryptor: Send + Sync {
	/// Encrypt a message, returning the encoded ciphertext (without `ENC(...)`)
	fn encrypt(&self, message: &str) -> Result<String, EncryptionError>;

	/// Decrypt an encoded ciphertext (without `ENC(...)`)
	fn decrypt(&self, encrypted: &str) -> Result<String, EncryptionError>;
}

/// Supported password-based encryption algorithms
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PbeAlgorithm {
	/// `PBEWithMD5AndDES`: PKCS#5 PBES1 with DES-CBC
	Md5Des,
	/// `PBEWithMD5AndTripleDES`: the SunJCE PBE scheme with DES-EDE3-CBC
	#[default]
	Md5TripleDes,
}

impl PbeAlgorithm {
	/// All supported algorithms
	pub const ALL: [PbeAlgorithm; 2] = [PbeAlgorithm::Md5Des, PbeAlgorithm::Md5TripleDes];

	/// The standard JCE algorithm name
	pub fn name(self) -> &'static str {
		match self {
			PbeAlgorithm::Md5Des => "PBEWithMD5AndDES",
			PbeAlgorithm::Md5TripleDes => "PBEWithMD5AndTripleDES",
		}
	}

	fn encrypt(
		self,
		password: &[u8],
		salt: &[u8; SALT_SIZE],
		iterations: u32,
		plaintext: &[u8],
	) -> Result<Vec<u8>, EncryptionError> {
		match self {
			PbeAlgorithm::Md5Des => {
				let derived = derive_pbes1_md5(password, salt, iterations);
				let cipher = DesCbcEnc::new_from_slices(&derived[..8], &derived[8..])
					.map_err(|_| EncryptionError::CipherInit)?;
				Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
			}
			PbeAlgorithm::Md5TripleDes => {
				let derived = derive_sunjce_triple_des(password, salt, iterations);
				let cipher = TdesCbcEnc::new_from_slices(&derived[..24], &derived[24..])
					.map_err(|_| EncryptionError::CipherInit)?;
				Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
			}
		}
	}

	fn decrypt(
		self,
		password: &[u8],
		salt: &[u8; SALT_SIZE],
		iterations: u32,
		ciphertext: &[u8],
	) -> Result<Zeroizing<Vec<u8>>, EncryptionError> {
		let plaintext = match self {
			PbeAlgorithm::Md5Des => {
				let derived = derive_pbes1_md5(password, salt, iterations);
				DesCbcDec::new_from_slices(&derived[..8], &derived[8..])
					.map_err(|_| EncryptionError::CipherInit)?
					.decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
			}
			PbeAlgorithm::Md5TripleDes => {
				let derived = derive_sunjce_triple_des(password, salt, iterations);
				TdesCbcDec::new_from_slices(&derived[..24], &derived[24..])
					.map_err(|_| EncryptionError::CipherInit)?
					.decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
			}
		};
		plaintext
			.map(Zeroizing::new)
			.map_err(|_| EncryptionError::DecryptionFailed)
	}
}

impl fmt::Display for PbeAlgorithm {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for PbeAlgorithm {
	type Err = EncryptionError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		PbeAlgorithm::ALL
			.into_iter()
			.find(|algorithm| algorithm.name().eq_ignore_ascii_case(s))
			.ok_or_else(|| EncryptionError::UnknownAlgorithm(s.to_string()))
	}
}

impl serde::Serialize for PbeAlgorithm {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(self.name())
	}
}

impl<'de> serde::Deserialize<'de> for PbeAlgorithm {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let name = String::deserialize(deserializer)?;
		name.parse().map_err(serde::de::Error::custom)
	}
}

/// PKCS#5 PBES1 key derivation: `DK = MD5^c(P || S)`, key = DK[0..8], IV = DK[8..16]
fn derive_pbes1_md5(password: &[u8], salt: &[u8], iterations: u32) -> Zeroizing<[u8; 16]> {
	let mut derived = Zeroizing::new([0u8; 16]);
	derived.copy_from_slice(&Md5::new().chain_update(password).chain_update(salt).finalize());
	for _ in 1..iterations {
		let digest = Md5::digest(&derived[..]);
		derived.copy_from_slice(&digest);
	}
	derived
}

/// SunJCE `PBEWithMD5AndTripleDES` key derivation
///
/// Each salt half is hashed `c` times as `h = MD5(h || P)`. Identical halves
/// get the first half reversed beforehand. The two digests give 32 bytes:
/// a 24-byte DES-EDE3 key followed by an 8-byte IV.
fn derive_sunjce_triple_des(
	password: &[u8],
	salt: &[u8; SALT_SIZE],
	iterations: u32,
) -> Zeroizing<[u8; 32]> {
	let mut salt = *salt;
	if salt[..4] == salt[4..] {
		salt[..4].reverse();
	}

	let mut derived = Zeroizing::new([0u8; 32]);
	for (half, chunk) in salt.chunks(SALT_SIZE / 2).enumerate() {
		let mut digest = Zeroizing::new([0u8; 16]);
		digest.copy_from_slice(&Md5::new().chain_update(chunk).chain_update(password).finalize());
		for _ in 1..iterations {
			let next = Md5::new()
				.chain_update(&digest[..])
				.chain_update(password)
				.finalize();
			digest.copy_from_slice(&next);
		}
		derived[half * 16..(half + 1) * 16].copy_from_slice(&digest[..]);
	}
	derived
}

/// Where the encryption password comes from
#[derive(Debug)]
enum PasswordSource {
	Value(SecretString),
	Env {
		name: String,
		value: Option<SecretString>,
	},
	None,
}

/// Configuration for [`PbeStringEncryptor`]
#[derive(Debug)]
pub struct PbeConfig {
	algorithm: PbeAlgorithm,
	iterations: u32,
	password: PasswordSource,
}

impl PbeConfig {
	/// Create a configuration without a password
	pub fn new() -> Self {
		Self {
			algorithm: PbeAlgorithm::default(),
			iterations: DEFAULT_KEY_OBTENTION_ITERATIONS,
			password: PasswordSource::None,
		}
	}

	/// Create a configuration with an explicit password
	pub fn with_password(password: impl Into<String>) -> Self {
		Self::new().password(password)
	}

	/// Create a configuration reading the password from an environment variable
	///
	/// The variable is read once, now. If it is unset, the encryptor can still
	/// be built and only fails when it is first used.
	///
	/// # Examples
	///
	/// ```
	/// use encprops_conf::encryption::{PbeConfig, PbeStringEncryptor, StringEncryptor};
	///
	/// let config = PbeConfig::from_env("ENCPROPS_DOC_UNSET_PASSWORD");
	/// let encryptor = PbeStringEncryptor::new(config).unwrap();
	/// assert!(encryptor.decrypt("AQIDBAUGBwi/D4l3eHLngQ==").is_err());
	/// ```
	pub fn from_env(env_name: impl Into<String>) -> Self {
		let name = env_name.into();
		let value = std::env::var(&name).ok().map(SecretString::from);
		Self {
			password: PasswordSource::Env { name, value },
			..Self::new()
		}
	}

	pub fn password(mut self, password: impl Into<String>) -> Self {
		self.password = PasswordSource::Value(SecretString::from(password.into()));
		self
	}

	pub fn algorithm(mut self, algorithm: PbeAlgorithm) -> Self {
		self.algorithm = algorithm;
		self
	}

	pub fn iterations(mut self, iterations: u32) -> Self {
		self.iterations = iterations;
		self
	}

	pub fn get_algorithm(&self) -> PbeAlgorithm {
		self.algorithm
	}

	pub fn get_iterations(&self) -> u32 {
		self.iterations
	}

	/// Name of the environment variable the password is read from, if any
	pub fn password_env_name(&self) -> Option<&str> {
		match &self.password {
			PasswordSource::Env { name, .. } => Some(name),
			_ => None,
		}
	}

	fn resolve_password(&self) -> Result<&SecretString, EncryptionError> {
		let password = match &self.password {
			PasswordSource::Value(password) => password,
			PasswordSource::Env {
				value: Some(password),
				..
			} => password,
			PasswordSource::Env { name, value: None } => {
				return Err(EncryptionError::MissingPassword {
					env_name: name.clone(),
				});
			}
			PasswordSource::None => return Err(EncryptionError::NoPassword),
		};
		validate_password(password.expose_secret())?;
		Ok(password)
	}
}

impl Default for PbeConfig {
	fn default() -> Self {
		Self::new()
	}
}

/// PBE keys only accept non-empty printable ASCII passwords
fn validate_password(password: &str) -> Result<(), EncryptionError> {
	if password.is_empty() {
		return Err(EncryptionError::InvalidPassword("password must not be empty"));
	}
	if !password.bytes().all(|b| (0x20..=0x7e).contains(&b)) {
		return Err(EncryptionError::InvalidPassword(
			"password must be printable ASCII",
		));
	}
	Ok(())
}

/// Password-based string encryptor compatible with jasypt
pub struct PbeStringEncryptor {
	config: PbeConfig,
}

impl PbeStringEncryptor {
	/// Create an encryptor
	///
	/// Fails only on invalid static settings. A missing password is reported on
	/// first use.
	pub fn new(config: PbeConfig) -> Result<Self, EncryptionError> {
		if config.iterations == 0 {
			return Err(EncryptionError::InvalidIterations);
		}
		Ok(Self { config })
	}

	pub fn config(&self) -> &PbeConfig {
		&self.config
	}

	/// Encrypt with a caller-supplied salt
	pub(crate) fn encrypt_with_salt(
		&self,
		message: &str,
		salt: [u8; SALT_SIZE],
	) -> Result<String, EncryptionError> {
		let password = self.config.resolve_password()?;
		let ciphertext = self.config.algorithm.encrypt(
			password.expose_secret().as_bytes(),
			&salt,
			self.config.iterations,
			message.as_bytes(),
		)?;

		let mut output = Vec::with_capacity(SALT_SIZE + ciphertext.len());
		output.extend_from_slice(&salt);
		output.extend_from_slice(&ciphertext);
		Ok(STANDARD.encode(output))
	}
}

impl fmt::Debug for PbeStringEncryptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PbeStringEncryptor")
			.field("algorithm", &self.config.algorithm)
			.field("iterations", &self.config.iterations)
			.finish_non_exhaustive()
	}
}

impl StringEncryptor for PbeStringEncryptor {
	fn encrypt(&self, message: &str) -> Result<String, EncryptionError> {
		let mut salt = [0u8; SALT_SIZE];
		rand::rngs::OsRng.fill_bytes(&mut salt);
		self.encrypt_with_salt(message, salt)
	}

	fn decrypt(&self, encrypted: &str) -> Result<String, EncryptionError> {
		let password = self.config.resolve_password()?;
		let bytes = STANDARD
			.decode(encrypted.trim())
			.map_err(|_| EncryptionError::InvalidEncoding)?;

		// Salt plus at least one cipher block
		if bytes.len() < SALT_SIZE * 2 {
			return Err(EncryptionError::TooShort { len: bytes.len() });
		}

		let (salt, ciphertext) = bytes.split_at(SALT_SIZE);
		let mut salt_block = [0u8; SALT_SIZE];
		salt_block.copy_from_slice(salt);

		let plaintext = self.config.algorithm.decrypt(
			password.expose_secret().as_bytes(),
			&salt_block,
			self.config.iterations,
			ciphertext,
		)?;

		String::from_utf8(plaintext.to_vec()).map_err(|_| EncryptionError::InvalidUtf8)
	}
}

/// Check whether a property value is wrapped in `ENC(...)`
///
/// Surrounding whitespace is ignored.
pub fn is_encrypted_value(value: &str) -> bool {
	encrypted_inner(value).is_some()
}

/// The ciphertext inside `ENC(...)`, or `None` for plain values
pub fn encrypted_inner(value: &str) -> Option<&str> {
	value
		.trim()
		.strip_prefix(ENCRYPTED_VALUE_PREFIX)?
		.strip_suffix(ENCRYPTED_VALUE_SUFFIX)
}

/// Wrap a ciphertext as `ENC(...)`
pub fn wrap_encrypted(encrypted: &str) -> String {
	format!("{}{}{}", ENCRYPTED_VALUE_PREFIX, encrypted, ENCRYPTED_VALUE_SUFFIX)
}

/// Encrypt a value and wrap it as `ENC(...)`
pub fn encrypt_value(
	value: &str,
	encryptor: &dyn StringEncryptor,
) -> Result<String, EncryptionError> {
	encryptor.encrypt(value).map(|e| wrap_encrypted(&e))
}

/// Decrypt an `ENC(...)` value; plain values are returned unchanged
pub fn decrypt_value(
	value: &str,
	encryptor: &dyn StringEncryptor,
) -> Result<String, EncryptionError> {
	match encrypted_inner(value) {
		Some(inner) => encryptor.decrypt(inner),
		None => Ok(value.to_string()),
	}
}
