//! Output formatting utilities
//!
//! Status messages go to stderr so command results on stdout can be piped.

use colored::Colorize;
use encprops_conf::environment::ResolvedProperty;
use encprops_conf::properties::Properties;
use serde::Serialize;
use std::io;

/// Output format for displaying properties
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputFormat {
	Text,
	Json,
	Toml,
	Properties,
}

/// Redacted placeholder for sensitive values
pub(crate) const REDACTED: &str = "[REDACTED]";

/// Sensitive key name patterns used to detect credentials and secrets
const SENSITIVE_PATTERNS: &[&str] = &[
	"password",
	"passwd",
	"pwd",
	"secret",
	"token",
	"api_key",
	"apikey",
	"api-key",
	"credential",
	"private_key",
	"private-key",
	"connection_string",
];

/// Sensitive words matched only as a whole `_`/`-` separated word
const SENSITIVE_WORDS: &[&str] = &["auth"];

/// Check whether a property name indicates a sensitive value
///
/// Checks the last segment of a dotted property name (e.g., "db.password"
/// checks "password") against known sensitive patterns.
pub(crate) fn is_sensitive_key(key: &str) -> bool {
	let lower = key.to_lowercase();
	let segment = lower.rsplit('.').next().unwrap_or(&lower);
	SENSITIVE_PATTERNS
		.iter()
		.any(|pattern| segment.contains(pattern))
		|| segment
			.split(['_', '-'])
			.any(|word| SENSITIVE_WORDS.contains(&word))
}

/// Replace the values of sensitive properties with `[REDACTED]`
pub(crate) fn redact_sensitive_values(properties: &mut [ResolvedProperty]) {
	for property in properties.iter_mut().filter(|p| is_sensitive_key(&p.name)) {
		property.value = REDACTED.to_string();
	}
}

/// Print a success message
pub(crate) fn success(msg: &str) {
	eprintln!("{} {}", "✓".green().bold(), msg);
}

/// Print an error message
pub(crate) fn error(msg: &str) {
	eprintln!("{} {}", "✗".red().bold(), msg);
}

/// Print a warning message
pub(crate) fn warning(msg: &str) {
	eprintln!("{} {}", "⚠".yellow().bold(), msg);
}

/// Print an info message
pub(crate) fn info(msg: &str) {
	eprintln!("{} {}", "ℹ".blue().bold(), msg);
}

#[derive(Serialize)]
struct PropertyDocument<'a> {
	property: &'a [ResolvedProperty],
}

/// Print resolved properties in the requested format
pub(crate) fn print_properties(
	properties: &[ResolvedProperty],
	format: OutputFormat,
) -> anyhow::Result<()> {
	match format {
		OutputFormat::Json => {
			println!("{}", serde_json::to_string_pretty(properties)?);
		}
		OutputFormat::Toml => {
			let document = PropertyDocument {
				property: properties,
			};
			print!("{}", toml::to_string_pretty(&document)?);
		}
		OutputFormat::Properties => {
			properties
				.iter()
				.map(|p| (p.name.as_str(), p.value.as_str()))
				.collect::<Properties>()
				.store(io::stdout().lock())?;
		}
		OutputFormat::Text => {
			let width = properties.iter().map(|p| p.name.len()).max().unwrap_or(0);
			for property in properties {
				println!(
					"{} = {} {}",
					format!("{:width$}", property.name).cyan().bold(),
					property.value.green(),
					format!("({})", property.source).dimmed(),
				);
			}
		}
	}
	Ok(())
}
