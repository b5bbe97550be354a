use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::Overrides;
use crate::output::OutputFormat;
use crate::styles::cli_styles;

#[derive(Parser, Debug)]
#[command(name = "hubrun")]
#[command(about = "Run browser test batches across every browser attached to a hub")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Config file (defaults to ./hubrun.json when present)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Commands,
}

impl Cli {
	/// True when the command asked for debug logging.
	pub fn debug(&self) -> bool {
		matches!(&self.command, Commands::Run(args) if args.debug)
	}
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Run test files on every attached browser
	///
	/// Connects to the hub (starting a local one when none answers), waits
	/// for browsers, and reports results as they arrive. Exits 1 when any
	/// test fails.
	Run(RunArgs),

	/// Start a hub and keep it running until Ctrl+C
	Serve(ServeArgs),

	/// List browsers attached to a running hub
	Agents(AgentsArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
	/// Test files to run
	#[arg(required = true, value_name = "FILE")]
	pub files: Vec<PathBuf>,

	/// Port of the local hub
	#[arg(short, long)]
	pub port: Option<u16>,

	/// URL of a running hub
	#[arg(long, value_name = "URL")]
	pub hub: Option<String>,

	/// Debug logging here and in a locally started hub
	#[arg(long)]
	pub debug: bool,

	/// Directory test paths are relative to (defaults to the working directory)
	#[arg(long, value_name = "DIR")]
	pub basedir: Option<PathBuf>,

	/// Give up on an unresponsive hub after this long
	#[arg(long, value_name = "MS")]
	pub connect_timeout_ms: Option<u64>,

	/// Output format
	#[arg(short = 'f', long, value_enum, default_value = "text")]
	pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
	/// Port to listen on
	#[arg(short, long)]
	pub port: Option<u16>,

	/// Hub log level
	#[arg(long, value_name = "LEVEL")]
	pub log_level: Option<String>,
}

#[derive(Args, Debug)]
pub struct AgentsArgs {
	/// Port of the local hub
	#[arg(short, long)]
	pub port: Option<u16>,

	/// URL of a running hub
	#[arg(long, value_name = "URL")]
	pub hub: Option<String>,

	/// Give up on an unresponsive hub after this long
	#[arg(long, value_name = "MS")]
	pub connect_timeout_ms: Option<u64>,

	/// Output format
	#[arg(short = 'f', long, value_enum, default_value = "text")]
	pub format: OutputFormat,
}

impl Commands {
	/// Settings given as flags, layered over the config file.
	pub fn overrides(&self) -> Overrides {
		match self {
			Commands::Run(args) => Overrides {
				port: args.port,
				hub: args.hub.clone(),
				log_level: None,
				connect_timeout_ms: args.connect_timeout_ms,
			},
			Commands::Serve(args) => Overrides {
				port: args.port,
				log_level: args.log_level.clone(),
				..Overrides::default()
			},
			Commands::Agents(args) => Overrides {
				port: args.port,
				hub: args.hub.clone(),
				log_level: None,
				connect_timeout_ms: args.connect_timeout_ms,
			},
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			Commands::Run(_) => "run",
			Commands::Serve(_) => "serve",
			Commands::Agents(_) => "agents",
		}
	}

	pub fn format(&self) -> OutputFormat {
		match self {
			Commands::Run(args) => args.format,
			Commands::Agents(args) => args.format,
			Commands::Serve(_) => OutputFormat::Text,
		}
	}
}

#[cfg(test)]
mod tests;
