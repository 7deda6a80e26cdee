//! Subcommands of the `encprops` tool

pub(crate) mod algorithms;
pub(crate) mod decrypt;
pub(crate) mod encrypt;
pub(crate) mod password;
pub(crate) mod show;

use anyhow::Context;
use std::io::{self, Read};
use zeroize::Zeroizing;

/// The value argument, or stdin without its trailing newline when absent
fn value_or_stdin(value: Option<String>) -> anyhow::Result<Zeroizing<String>> {
	if let Some(value) = value {
		return Ok(Zeroizing::new(value));
	}

	let mut input = Zeroizing::new(String::new());
	io::stdin()
		.read_to_string(&mut input)
		.context("Failed to read value from stdin")?;
	let len = input.trim_end_matches(['\r', '\n']).len();
	input.truncate(len);
	Ok(input)
}
