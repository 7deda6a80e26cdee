//! Algorithms command

use colored::Colorize;
use encprops_conf::encryption::PbeAlgorithm;

/// List the supported PBE algorithms
pub(crate) fn execute() -> anyhow::Result<()> {
	for algorithm in PbeAlgorithm::ALL {
		if algorithm == PbeAlgorithm::default() {
			println!("{} {}", algorithm.name().bold(), "(default)".dimmed());
		} else {
			println!("{}", algorithm.name());
		}
	}
	Ok(())
}
