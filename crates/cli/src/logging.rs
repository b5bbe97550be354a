use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Filter used when `RUST_LOG` is unset.
///
/// 0 = errors only, 1 (-v) = info, 2+ (-vv) or `--debug` = debug.
pub fn default_filter(verbosity: u8, debug: bool) -> &'static str {
	match (verbosity, debug) {
		(_, true) | (2.., _) => "debug",
		(1, _) => "info",
		_ => "error",
	}
}

/// Installs the global subscriber. Logs go to stderr so they never mix with
/// results on stdout.
pub fn init_logging(verbosity: u8, debug: bool) {
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity, debug)));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}
