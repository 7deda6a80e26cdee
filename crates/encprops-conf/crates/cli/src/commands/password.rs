//! Encryption password resolution

use crate::output;
use anyhow::Context;
use clap::Args;
use encprops_conf::encryption::{
	DEFAULT_KEY_OBTENTION_ITERATIONS, PbeAlgorithm, PbeConfig, PbeStringEncryptor,
};
use std::env;
use std::io::IsTerminal;
use zeroize::Zeroizing;

/// Environment variable read when `--password-env` is not given
pub(crate) const DEFAULT_PASSWORD_ENV: &str = "ENCPROPS_PASSWORD";

#[derive(Args, Debug)]
pub(crate) struct CipherArgs {
	/// Encryption password.
	/// WARNING: Using this option exposes the password in process list and shell history.
	/// Prefer the environment variable named by --password-env or interactive prompt.
	#[arg(short, long)]
	pub password: Option<String>,

	/// Environment variable holding the encryption password
	#[arg(long, value_name = "NAME", default_value = DEFAULT_PASSWORD_ENV)]
	pub password_env: String,

	/// PBE algorithm
	#[arg(short, long, default_value_t = PbeAlgorithm::default())]
	pub algorithm: PbeAlgorithm,

	/// Key obtention iterations
	#[arg(short, long, default_value_t = DEFAULT_KEY_OBTENTION_ITERATIONS)]
	pub iterations: u32,
}

impl CipherArgs {
	/// Build an encryptor from the command-line options
	pub(crate) fn encryptor(&self) -> anyhow::Result<PbeStringEncryptor> {
		let password = resolve_password(self.password.as_deref(), &self.password_env)?;
		let config = PbeConfig::with_password(password.as_str())
			.algorithm(self.algorithm)
			.iterations(self.iterations);
		Ok(PbeStringEncryptor::new(config)?)
	}
}

/// Get the encryption password
///
/// The password can be provided via:
/// 1. `--password` argument (not recommended for security reasons)
/// 2. The environment variable named by `env_name` (recommended)
/// 3. Interactive prompt (if a terminal is attached)
pub(crate) fn resolve_password(
	explicit: Option<&str>,
	env_name: &str,
) -> anyhow::Result<Zeroizing<String>> {
	if let Some(password) = explicit {
		output::warning(
			"Passing the password on the command line exposes it in the process list and shell history",
		);
		return Ok(Zeroizing::new(password.to_string()));
	}

	if let Ok(password) = env::var(env_name)
		&& !password.is_empty()
	{
		tracing::debug!(env_name, "Using encryption password from environment");
		return Ok(Zeroizing::new(password));
	}

	if is_interactive() {
		let password = rpassword::prompt_password("Encryption password: ")
			.context("Failed to read password")?;
		return Ok(Zeroizing::new(password));
	}

	anyhow::bail!(
		"No encryption password: set {} or pass --password",
		env_name
	)
}

/// Build the encryption configuration for commands that only decrypt on demand
///
/// Without `--password`, and when no prompt is possible, the variable is read
/// through [`PbeConfig::from_env`]: an unset variable is reported only when an
/// `ENC(...)` value is actually read.
pub(crate) fn on_demand_config(
	explicit: Option<&str>,
	env_name: &str,
) -> anyhow::Result<PbeConfig> {
	let env_set = env::var(env_name).is_ok_and(|value| !value.is_empty());
	if explicit.is_none() && (env_set || !is_interactive()) {
		return Ok(PbeConfig::from_env(env_name));
	}

	let password = resolve_password(explicit, env_name)?;
	Ok(PbeConfig::with_password(password.as_str()))
}

fn is_interactive() -> bool {
	std::io::stdin().is_terminal() && std::io::stderr().is_terminal()
}
