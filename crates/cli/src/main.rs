use clap::Parser;
use hubrun_cli::{
	cli::Cli,
	commands,
	error::CliError,
	logging,
	output::{self, OutputFormat, ResultBuilder},
};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose, cli.debug());

	let format = cli.command.format();
	let command = cli.command.name();

	match commands::dispatch(cli).await {
		Ok(code) => std::process::exit(code),
		Err(err) => {
			handle_error(&err, command, format);
			std::process::exit(1);
		}
	}
}

fn handle_error(err: &CliError, command: &str, format: OutputFormat) {
	tracing::debug!(target = "hubrun.cli", error = ?err, "command failed");

	// Always print to stderr for humans
	eprintln!("{}", err.diagnostic());

	if format.is_json() {
		let result: output::CommandResult<()> = ResultBuilder::new(command).error(err.to_command_error()).build();
		output::print_result(&result);
	}
}
