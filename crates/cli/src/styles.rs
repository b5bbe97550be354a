//! Terminal styling shared by help output and diagnostics.

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use colored::{ColoredString, Colorize};

/// Clap styles matching cargo's help output: green bold headers, cyan
/// literals and placeholders.
pub fn cli_styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Green.on_default().bold())
		.usage(AnsiColor::Green.on_default().bold())
		.literal(AnsiColor::Cyan.on_default())
		.placeholder(AnsiColor::Cyan.on_default())
		.valid(AnsiColor::Cyan.on_default())
}

/// `error:` prefix for fatal diagnostics, styled like cargo's.
pub fn error_label() -> ColoredString {
	"error:".red().bold()
}

/// `help:` prefix for guidance under a diagnostic.
pub fn help_label() -> ColoredString {
	"help:".cyan().bold()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn labels_keep_their_text_without_color() {
		colored::control::set_override(false);
		assert_eq!(error_label().to_string(), "error:");
		assert_eq!(help_label().to_string(), "help:");
	}
}
