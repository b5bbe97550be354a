//! Error types for batch runs.

use thiserror::Error;

/// Result type alias for hubrun operations.
pub type Result<T> = std::result::Result<T, RunError>;

/// Coarse classification of a fatal run error.
///
/// The CLI prints known kinds as a single diagnostic line and everything else
/// as an unhandled fault with version and platform context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
	ConnectionFailure,
	BindConflict,
	NoAgentsAvailable,
	EmptyDispatch,
	Unhandled,
}

/// Errors that end a batch run.
#[derive(Debug, Error)]
pub enum RunError {
	/// The hub could not be reached.
	#[error("Could not connect to hub at {url}: {reason}")]
	ConnectionFailed { url: String, reason: String },

	/// A local hub was needed but its port is taken.
	#[error("Cannot start a local hub: port {port} is already in use")]
	BindConflict { port: u16 },

	/// The hub has no agents and nobody is there to attach one.
	#[error("No agents are connected to the hub at {url}")]
	NoAgentsAvailable { url: String },

	/// The hub dispatched the batch to an empty agent set.
	#[error("No browsers connected to run the batch")]
	EmptyDispatch,

	/// The hub failed or exited while it was needed.
	#[error("Hub failure: {0}")]
	Hub(String),

	/// The batch event stream ended without a completion event.
	#[error("Batch event stream ended before the run completed")]
	BatchInterrupted,

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Runtime(#[from] hubrun_runtime::Error),
}

impl RunError {
	pub fn kind(&self) -> FaultKind {
		match self {
			RunError::ConnectionFailed { .. } => FaultKind::ConnectionFailure,
			RunError::BindConflict { .. } => FaultKind::BindConflict,
			RunError::NoAgentsAvailable { .. } => FaultKind::NoAgentsAvailable,
			RunError::EmptyDispatch => FaultKind::EmptyDispatch,
			RunError::Runtime(err) if err.is_unreachable() => FaultKind::ConnectionFailure,
			RunError::Runtime(err) if err.is_addr_in_use() => FaultKind::BindConflict,
			_ => FaultKind::Unhandled,
		}
	}

	/// Follow-up advice printed under the diagnostic, if any.
	pub fn guidance(&self) -> Option<String> {
		match self {
			RunError::BindConflict { port } => Some(format!(
				"Another process is listening on port {port}. Stop it, choose another port with --port, or pass --hub to use the running hub."
			)),
			RunError::NoAgentsAvailable { url } => Some(format!(
				"Attach a browser to {url} before starting the run, or run from an interactive terminal to wait for one."
			)),
			RunError::EmptyDispatch => Some("The hub accepted the batch but had no browser to run it on. Attach a browser and retry.".to_string()),
			_ => None,
		}
	}
}
