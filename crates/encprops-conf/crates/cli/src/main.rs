//! encprops CLI
//!
//! Command-line tool for encrypted property files.
//!
//! ## Usage
//!
//! ```bash
//! export ENCPROPS_PASSWORD=...
//! encprops encrypt 'jdbc:postgresql://db.internal/app'
//! encprops decrypt 'ENC(AQIDBAUGBwjV59Zz...)'
//! encprops show --config encprops.toml --format json
//! encprops algorithms
//! ```

mod commands;
mod output;

use clap::{Parser, Subcommand};
use commands::decrypt::DecryptArgs;
use commands::encrypt::EncryptArgs;
use commands::show::ShowArgs;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "encprops")]
#[command(about = "Encrypt values and inspect encrypted property files", long_about = None)]
#[command(version)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// Verbosity level (can be repeated)
	#[arg(short, long, action = clap::ArgAction::Count, global = true)]
	verbosity: u8,
}

#[derive(Subcommand)]
enum Commands {
	/// Encrypt a value as `ENC(...)`
	Encrypt(EncryptArgs),

	/// Decrypt an `ENC(...)` value
	Decrypt(DecryptArgs),

	/// Load property files as the application would and print the result
	Show(ShowArgs),

	/// List supported encryption algorithms
	Algorithms,
}

fn main() {
	let cli = Cli::parse();
	init_tracing(cli.verbosity);

	let result = match cli.command {
		Commands::Encrypt(args) => commands::encrypt::execute(args),
		Commands::Decrypt(args) => commands::decrypt::execute(args),
		Commands::Show(args) => commands::show::execute(args),
		Commands::Algorithms => commands::algorithms::execute(),
	};

	if let Err(e) = result {
		output::error(&format!("{:#}", e));
		process::exit(1);
	}
}

/// `RUST_LOG` applies unless `-v` is given
fn init_tracing(verbosity: u8) {
	let filter = match verbosity {
		0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
		1 => EnvFilter::new("info"),
		2 => EnvFilter::new("debug"),
		_ => EnvFilter::new("trace"),
	};
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(false)
		.init();
}
