use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

use hubrun::{ProgressOutput, RunOptions, run_batch};
use tokio::io::BufReader;

use super::{client_factory, hub_factory, interactive};
use crate::cli::RunArgs;
use crate::config::Settings;
use crate::error::Result;
use crate::output::{ResultBuilder, print_result};

pub async fn execute(args: RunArgs, settings: &Settings, cwd: PathBuf) -> Result<i32> {
	let started = Instant::now();
	let options = RunOptions {
		files: args.files,
		basedir: args.basedir.unwrap_or(cwd),
		port: settings.port,
		hub: settings.hub.clone(),
		debug: args.debug,
		hub_log_level: settings.log_level.clone(),
		interactive: interactive(),
		progress: if args.format.is_json() {
			ProgressOutput::Stderr
		} else {
			ProgressOutput::Stdout
		},
	};

	let mut human: Box<dyn Write> = if args.format.is_json() {
		Box::new(io::stderr())
	} else {
		Box::new(io::stdout())
	};
	let mut confirm = BufReader::new(tokio::io::stdin());

	let summary = run_batch(
		&options,
		&hub_factory(settings),
		&client_factory(settings.connect_timeout),
		&mut confirm,
		&mut human,
	)
	.await?;

	if args.format.is_json() {
		let result = ResultBuilder::new("run")
			.data(&summary)
			.timings(started.elapsed().into())
			.build();
		print_result(&result);
	}

	Ok(summary.exit_code())
}
