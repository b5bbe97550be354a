//! Configuration file and effective settings.
//!
//! Settings come from three layers, highest precedence first: command-line
//! flags, the JSON config file (`--config`, or `hubrun.json` in the working
//! directory), and built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const CONFIG_FILE_NAME: &str = "hubrun.json";
pub const DEFAULT_PORT: u16 = 8124;
pub const DEFAULT_HUB_COMMAND: &str = "hubrun-hub";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_READY_TIMEOUT_MS: u64 = 5000;

/// Contents of a config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigFile {
	pub port: Option<u16>,
	pub hub: Option<String>,
	pub hub_command: Option<PathBuf>,
	pub hub_args: Option<Vec<String>>,
	pub log_level: Option<String>,
	pub connect_timeout_ms: Option<u64>,
	pub ready_timeout_ms: Option<u64>,
}

impl ConfigFile {
	/// Loads `explicit` if given, else `hubrun.json` in `dir` if it exists.
	///
	/// A missing explicit file is an error; a missing implicit one is not.
	pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
		match explicit {
			Some(path) => Self::load(path),
			None => {
				let implicit = dir.join(CONFIG_FILE_NAME);
				if implicit.is_file() { Self::load(&implicit) } else { Ok(Self::default()) }
			}
		}
	}

	pub fn load(path: &Path) -> Result<Self> {
		let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
		serde_json::from_str(&raw).with_context(|| format!("invalid config file {}", path.display()))
	}
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
	pub port: Option<u16>,
	pub hub: Option<String>,
	pub log_level: Option<String>,
	pub connect_timeout_ms: Option<u64>,
}

/// Effective settings after layering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
	pub port: u16,
	pub hub: Option<String>,
	pub hub_command: PathBuf,
	pub hub_args: Vec<String>,
	pub log_level: String,
	pub connect_timeout: Duration,
	pub ready_timeout: Duration,
}

impl Settings {
	pub fn resolve(file: ConfigFile, overrides: Overrides) -> Self {
		Self {
			port: overrides.port.or(file.port).unwrap_or(DEFAULT_PORT),
			hub: overrides.hub.or(file.hub),
			hub_command: file.hub_command.unwrap_or_else(|| PathBuf::from(DEFAULT_HUB_COMMAND)),
			hub_args: file.hub_args.unwrap_or_default(),
			log_level: overrides
				.log_level
				.or(file.log_level)
				.unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
			connect_timeout: Duration::from_millis(
				overrides
					.connect_timeout_ms
					.or(file.connect_timeout_ms)
					.unwrap_or(DEFAULT_CONNECT_TIMEOUT_MS),
			),
			ready_timeout: Duration::from_millis(file.ready_timeout_ms.unwrap_or(DEFAULT_READY_TIMEOUT_MS)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_apply_without_file_or_flags() {
		let settings = Settings::resolve(ConfigFile::default(), Overrides::default());
		assert_eq!(settings.port, 8124);
		assert_eq!(settings.hub, None);
		assert_eq!(settings.hub_command, PathBuf::from("hubrun-hub"));
		assert_eq!(settings.log_level, "info");
		assert_eq!(settings.connect_timeout, Duration::from_secs(5));
	}

	#[test]
	fn flags_beat_file_beats_defaults() {
		let file: ConfigFile =
			serde_json::from_str(r#"{ "port": 9000, "hub": "ws://file-hub:1", "connectTimeoutMs": 750 }"#).unwrap();
		let settings = Settings::resolve(
			file,
			Overrides {
				port: Some(9100),
				..Overrides::default()
			},
		);
		assert_eq!(settings.port, 9100);
		assert_eq!(settings.hub.as_deref(), Some("ws://file-hub:1"));
		assert_eq!(settings.connect_timeout, Duration::from_millis(750));
	}

	#[test]
	fn unknown_keys_are_rejected() {
		assert!(serde_json::from_str::<ConfigFile>(r#"{ "prot": 1 }"#).is_err());
	}

	#[test]
	fn implicit_file_is_discovered() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join(CONFIG_FILE_NAME), r#"{ "hubCommand": "/opt/hub/bin/hub", "hubArgs": ["--quiet"] }"#)
			.unwrap();

		let file = ConfigFile::discover(None, dir.path()).unwrap();
		assert_eq!(file.hub_command, Some(PathBuf::from("/opt/hub/bin/hub")));
		assert_eq!(file.hub_args, Some(vec!["--quiet".to_string()]));
	}

	#[test]
	fn missing_implicit_file_is_fine_but_explicit_is_not() {
		let dir = tempfile::tempdir().unwrap();
		assert_eq!(ConfigFile::discover(None, dir.path()).unwrap(), ConfigFile::default());

		let missing = dir.path().join("nope.json");
		let err = ConfigFile::discover(Some(&missing), dir.path()).unwrap_err();
		assert!(err.to_string().contains("nope.json"));
	}
}
