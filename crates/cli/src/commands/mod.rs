mod agents;
mod run;
mod serve;

use std::io::{self, IsTerminal};
use std::time::Duration;

use hubrun::{ProcessHubFactory, WebSocketClientFactory};

use crate::cli::{Cli, Commands};
use crate::config::{ConfigFile, Settings};
use crate::error::{CliError, Result};

/// Runs the parsed command and returns the process exit code.
pub async fn dispatch(cli: Cli) -> Result<i32> {
	let cwd = std::env::current_dir()?;
	let file = ConfigFile::discover(cli.config.as_deref(), &cwd).map_err(CliError::Config)?;
	let settings = Settings::resolve(file, cli.command.overrides());
	tracing::debug!(target = "hubrun.cli", ?settings, command = cli.command.name(), "resolved settings");

	match cli.command {
		Commands::Run(args) => run::execute(args, &settings, cwd).await,
		Commands::Serve(_) => serve::execute(&settings).await,
		Commands::Agents(args) => agents::execute(args.format, &settings).await,
	}
}

/// Whether a person can answer prompts: the error stream is a terminal.
pub fn interactive() -> bool {
	io::stderr().is_terminal()
}

fn hub_factory(settings: &Settings) -> ProcessHubFactory {
	ProcessHubFactory {
		command: settings.hub_command.clone(),
		args: settings.hub_args.clone(),
		ready_timeout: settings.ready_timeout,
	}
}

fn client_factory(connect_timeout: Duration) -> WebSocketClientFactory {
	WebSocketClientFactory { connect_timeout }
}
