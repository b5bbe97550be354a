//! Machine-readable result envelope.
//!
//! With `--format json` every command ends by printing one envelope on
//! stdout; human-oriented text moves to stderr so stdout stays parseable.
//!
//! ```json
//! {
//!   "ok": true,
//!   "command": "run",
//!   "data": { "verdict": "passed", "passed": 6, ... },
//!   "timings": { "durationMs": 1234 }
//! }
//! ```
//!
//! On failure:
//!
//! ```json
//! {
//!   "ok": false,
//!   "command": "run",
//!   "error": { "code": "BIND_CONFLICT", "message": "..." }
//! }
//! ```

#[cfg(test)]
mod tests;

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Output format for command results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text
	#[default]
	Text,
	/// JSON envelope on stdout
	Json,
}

impl OutputFormat {
	pub fn is_json(self) -> bool {
		self == OutputFormat::Json
	}
}

/// The result envelope.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T: Serialize> {
	pub ok: bool,

	/// Command name (`run`, `serve`, `agents`)
	pub command: String,

	/// Command-specific result data (only present on success)
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,

	/// Error information (only present on failure)
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub timings: Option<Timings>,
}

/// Error information for failed commands
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
	pub code: ErrorCode,

	/// Human-readable error message
	pub message: String,

	/// Follow-up advice, when there is any
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Stable error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// Hub could not be reached
	ConnectionFailed,
	/// Local hub port already bound
	BindConflict,
	/// No browser attached and nobody to attach one
	NoAgents,
	/// Batch dispatched to zero browsers
	EmptyDispatch,
	/// Hub failed or exited during the run
	HubFailed,
	/// Bad config file or arguments
	InvalidConfig,
	IoError,
	/// Anything unexpected
	InternalError,
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ErrorCode::ConnectionFailed => write!(f, "CONNECTION_FAILED"),
			ErrorCode::BindConflict => write!(f, "BIND_CONFLICT"),
			ErrorCode::NoAgents => write!(f, "NO_AGENTS"),
			ErrorCode::EmptyDispatch => write!(f, "EMPTY_DISPATCH"),
			ErrorCode::HubFailed => write!(f, "HUB_FAILED"),
			ErrorCode::InvalidConfig => write!(f, "INVALID_CONFIG"),
			ErrorCode::IoError => write!(f, "IO_ERROR"),
			ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
		}
	}
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timings {
	pub duration_ms: u64,
}

impl From<Duration> for Timings {
	fn from(duration: Duration) -> Self {
		Timings {
			duration_ms: duration.as_millis() as u64,
		}
	}
}

/// Builder for [`CommandResult`].
pub struct ResultBuilder<T: Serialize> {
	command: String,
	data: Option<T>,
	error: Option<CommandError>,
	timings: Option<Timings>,
}

impl<T: Serialize> ResultBuilder<T> {
	pub fn new(command: impl Into<String>) -> Self {
		Self {
			command: command.into(),
			data: None,
			error: None,
			timings: None,
		}
	}

	pub fn data(mut self, data: T) -> Self {
		self.data = Some(data);
		self
	}

	pub fn error(mut self, error: CommandError) -> Self {
		self.error = Some(error);
		self
	}

	pub fn timings(mut self, timings: Timings) -> Self {
		self.timings = Some(timings);
		self
	}

	pub fn build(self) -> CommandResult<T> {
		CommandResult {
			ok: self.error.is_none(),
			command: self.command,
			data: self.data,
			error: self.error,
			timings: self.timings,
		}
	}
}

/// Prints the envelope as pretty JSON on stdout.
pub fn print_result<T: Serialize>(result: &CommandResult<T>) {
	if let Ok(json) = serde_json::to_string_pretty(result) {
		println!("{json}");
	}
}

/// Agents listed by `hubrun agents`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentsData {
	pub hub: String,
	pub agents: Vec<String>,
}

