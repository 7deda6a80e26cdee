//! Show command

use super::password::on_demand_config;
use crate::output::{self, OutputFormat};
use anyhow::Context;
use clap::Args;
use encprops_conf::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ShowArgs {
	/// Initializer configuration file
	#[arg(short, long, value_name = "FILE", default_value = "encprops.toml")]
	pub config: PathBuf,

	/// Property to show (shows all if not specified)
	#[arg(short, long)]
	pub key: Option<String>,

	/// Output format
	#[arg(short = 'f', long, value_enum, default_value = "text")]
	pub format: OutputFormatArg,

	/// Show sensitive values without redaction (passwords, keys, tokens)
	#[arg(long)]
	pub reveal: bool,

	/// Encryption password, instead of the variable named in the configuration.
	/// WARNING: Using this option exposes the password in process list and shell history.
	#[arg(short, long)]
	pub password: Option<String>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub(crate) enum OutputFormatArg {
	Text,
	Json,
	Toml,
	Properties,
}

impl From<OutputFormatArg> for OutputFormat {
	fn from(arg: OutputFormatArg) -> Self {
		match arg {
			OutputFormatArg::Text => OutputFormat::Text,
			OutputFormatArg::Json => OutputFormat::Json,
			OutputFormatArg::Toml => OutputFormat::Toml,
			OutputFormatArg::Properties => OutputFormat::Properties,
		}
	}
}

/// Load the configured property files and display the merged properties
pub(crate) fn execute(args: ShowArgs) -> anyhow::Result<()> {
	output::info(&format!("Reading configuration file: {:?}", args.config));
	let config = InitializerConfig::from_file(&args.config)
		.with_context(|| format!("Cannot load configuration {:?}", args.config))?;

	let encryptor = PbeStringEncryptor::new(
		on_demand_config(args.password.as_deref(), &config.password_env_name)?
			.algorithm(config.encryption.algorithm)
			.iterations(config.encryption.iterations),
	)?;

	let initializer =
		EncryptedPropertiesInitializer::from_config(config)?.with_encryptor(Arc::new(encryptor));
	let mut env = Environment::new();
	initializer.initialize(&mut env)?;
	output::success(&format!(
		"Loaded property sources: {}",
		env.property_sources().names().join(", ")
	));

	let mut properties = match &args.key {
		Some(key) => {
			let value = env
				.get_property(key)?
				.ok_or_else(|| anyhow::anyhow!("Property not defined: {}", key))?;
			let source = env
				.property_sources()
				.iter()
				.find(|source| source.contains_property(key))
				.map(|source| source.name().to_string())
				.unwrap_or_default();
			vec![ResolvedProperty {
				name: key.clone(),
				value,
				source,
			}]
		}
		None => env.resolved_properties()?,
	};

	if !args.reveal {
		output::redact_sensitive_values(&mut properties);
	}

	match (&args.key, args.format) {
		(Some(_), OutputFormatArg::Text) => {
			for property in &properties {
				println!("{}", property.value);
			}
			Ok(())
		}
		(_, format) => output::print_properties(&properties, format.into()),
	}
}
