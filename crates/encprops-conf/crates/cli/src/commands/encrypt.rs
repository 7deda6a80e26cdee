//! Encrypt command

use super::password::CipherArgs;
use clap::Args;
use encprops_conf::encryption::{StringEncryptor, wrap_encrypted};

#[derive(Args, Debug)]
pub(crate) struct EncryptArgs {
	/// Value to encrypt (read from stdin when omitted)
	#[arg(value_name = "VALUE")]
	pub value: Option<String>,

	/// Print the bare ciphertext instead of `ENC(...)`
	#[arg(long)]
	pub raw: bool,

	#[command(flatten)]
	pub cipher: CipherArgs,
}

/// Encrypt a value for use in a property file
pub(crate) fn execute(args: EncryptArgs) -> anyhow::Result<()> {
	let value = super::value_or_stdin(args.value)?;
	let encryptor = args.cipher.encryptor()?;

	let encrypted = encryptor.encrypt(&value)?;
	tracing::debug!(algorithm = %args.cipher.algorithm, "Value encrypted");

	if args.raw {
		println!("{}", encrypted);
	} else {
		println!("{}", wrap_encrypted(&encrypted));
	}
	Ok(())
}
