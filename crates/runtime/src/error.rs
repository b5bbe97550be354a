//! Error types for the hubrun runtime.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to or launching a hub.
#[derive(Debug, Error)]
pub enum Error {
	/// The hub could not be reached at all.
	#[error("Failed to connect to hub at {url}: {reason}")]
	ConnectionFailed { url: String, reason: String },

	/// An operation did not finish in time.
	#[error("Timed out after {ms}ms: {operation}")]
	Timeout { ms: u64, operation: String },

	/// WebSocket-level failure after the connection was established.
	#[error("Transport error: {0}")]
	TransportError(String),

	/// A frame that does not match the client↔hub messages.
	#[error("Protocol error: {0}")]
	ProtocolError(String),

	/// The hub answered a request with an error.
	#[error("Hub error: {0}")]
	Remote(String),

	/// Channel closed unexpectedly.
	#[error("Channel closed unexpectedly")]
	ChannelClosed,

	/// The local hub port is already bound by another process.
	#[error("Port {port} is already in use")]
	AddrInUse { port: u16 },

	/// The local hub process could not be started.
	#[error("Failed to launch hub: {0}")]
	LaunchFailed(String),

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns true if this error means the local port is taken.
	pub fn is_addr_in_use(&self) -> bool {
		match self {
			Error::AddrInUse { .. } => true,
			Error::Io(err) => err.kind() == std::io::ErrorKind::AddrInUse,
			_ => false,
		}
	}

	/// Returns true if the hub was never reached.
	pub fn is_unreachable(&self) -> bool {
		matches!(self, Error::ConnectionFailed { .. } | Error::Timeout { .. })
	}
}
