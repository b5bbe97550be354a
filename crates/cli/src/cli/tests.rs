use std::path::PathBuf;

use clap::Parser;

use super::*;

#[test]
fn parse_run_command() {
	let args = vec!["hubrun", "run", "a.html", "b.html", "--port", "9000", "--hub", "ws://ci:8124"];
	let cli = Cli::try_parse_from(args).unwrap();

	match cli.command {
		Commands::Run(args) => {
			assert_eq!(args.files, vec![PathBuf::from("a.html"), PathBuf::from("b.html")]);
			assert_eq!(args.port, Some(9000));
			assert_eq!(args.hub.as_deref(), Some("ws://ci:8124"));
			assert!(!args.debug);
			assert_eq!(args.format, OutputFormat::Text);
		}
		_ => panic!("Expected Run command"),
	}
}

#[test]
fn run_requires_files() {
	assert!(Cli::try_parse_from(["hubrun", "run"]).is_err());
}

#[test]
fn run_debug_is_reported() {
	let cli = Cli::try_parse_from(["hubrun", "run", "--debug", "a.html"]).unwrap();
	assert!(cli.debug());

	let cli = Cli::try_parse_from(["hubrun", "serve"]).unwrap();
	assert!(!cli.debug());
}

#[test]
fn run_json_format() {
	let cli = Cli::try_parse_from(["hubrun", "run", "-f", "json", "a.html"]).unwrap();
	assert_eq!(cli.command.format(), OutputFormat::Json);
}

#[test]
fn parse_serve_command() {
	let cli = Cli::try_parse_from(["hubrun", "serve", "-p", "9001", "--log-level", "debug"]).unwrap();
	let overrides = cli.command.overrides();
	assert_eq!(overrides.port, Some(9001));
	assert_eq!(overrides.log_level.as_deref(), Some("debug"));
	assert_eq!(cli.command.name(), "serve");
}

#[test]
fn parse_agents_command() {
	let cli = Cli::try_parse_from(["hubrun", "agents", "--hub", "http://ci:8124", "--connect-timeout-ms", "250"]).unwrap();
	let overrides = cli.command.overrides();
	assert_eq!(overrides.hub.as_deref(), Some("http://ci:8124"));
	assert_eq!(overrides.connect_timeout_ms, Some(250));
}

#[test]
fn verbose_flag_short_and_long() {
	let short_cli = Cli::try_parse_from(["hubrun", "-v", "serve"]).unwrap();
	assert_eq!(short_cli.verbose, 1);

	let long_cli = Cli::try_parse_from(["hubrun", "serve", "--verbose", "--verbose"]).unwrap();
	assert_eq!(long_cli.verbose, 2);
}

#[test]
fn global_config_flag() {
	let cli = Cli::try_parse_from(["hubrun", "run", "a.html", "--config", "ci.json"]).unwrap();
	assert_eq!(cli.config, Some(PathBuf::from("ci.json")));
}
