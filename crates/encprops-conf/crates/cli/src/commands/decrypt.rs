//! Decrypt command

use super::password::CipherArgs;
use clap::Args;
use encprops_conf::encryption::{StringEncryptor, encrypted_inner};
use zeroize::Zeroizing;

#[derive(Args, Debug)]
pub(crate) struct DecryptArgs {
	/// Encrypted value, as `ENC(...)` or bare ciphertext (read from stdin when omitted)
	#[arg(value_name = "VALUE")]
	pub value: Option<String>,

	#[command(flatten)]
	pub cipher: CipherArgs,
}

/// Decrypt a value taken from a property file
pub(crate) fn execute(args: DecryptArgs) -> anyhow::Result<()> {
	let value = super::value_or_stdin(args.value)?;
	let ciphertext = encrypted_inner(&value).unwrap_or(value.trim());
	let encryptor = args.cipher.encryptor()?;

	let decrypted = Zeroizing::new(encryptor.decrypt(ciphertext)?);
	println!("{}", decrypted.as_str());
	Ok(())
}
