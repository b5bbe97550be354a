use hubrun::{FaultKind, RunError};
use thiserror::Error;

use crate::output::{CommandError, ErrorCode};
use crate::styles::{error_label, help_label};

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error(transparent)]
	Run(#[from] RunError),

	#[error("{0:#}")]
	Config(anyhow::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),
}

impl CliError {
	/// True for faults that are not one of the known run conditions.
	pub fn is_unhandled(&self) -> bool {
		match self {
			CliError::Run(err) => err.kind() == FaultKind::Unhandled && !matches!(err, RunError::Hub(_)),
			CliError::Config(_) => false,
			CliError::Io(_) => true,
		}
	}

	pub fn guidance(&self) -> Option<String> {
		match self {
			CliError::Run(err) => err.guidance(),
			_ => None,
		}
	}

	/// Convert this error to a CommandError for structured output
	pub fn to_command_error(&self) -> CommandError {
		let code = match self {
			CliError::Run(err) => match err.kind() {
				FaultKind::ConnectionFailure => ErrorCode::ConnectionFailed,
				FaultKind::BindConflict => ErrorCode::BindConflict,
				FaultKind::NoAgentsAvailable => ErrorCode::NoAgents,
				FaultKind::EmptyDispatch => ErrorCode::EmptyDispatch,
				FaultKind::Unhandled if matches!(err, RunError::Hub(_)) => ErrorCode::HubFailed,
				FaultKind::Unhandled => ErrorCode::InternalError,
			},
			CliError::Config(_) => ErrorCode::InvalidConfig,
			CliError::Io(_) => ErrorCode::IoError,
		};

		CommandError {
			code,
			message: self.to_string(),
			details: self.guidance().map(|help| serde_json::json!({ "help": help })),
		}
	}

	/// The single diagnostic printed for a fatal error.
	///
	/// Unhandled faults carry version and platform details for bug reports.
	pub fn diagnostic(&self) -> String {
		let mut text = format!("{} {self}", error_label());
		if let Some(help) = self.guidance() {
			text.push_str(&format!("\n{} {help}", help_label()));
		}
		if self.is_unhandled() {
			text.push_str(&format!(
				"\n\nThis looks like a bug in hubrun. Please report it with the output above.\nhubrun {} ({}/{})",
				env!("CARGO_PKG_VERSION"),
				std::env::consts::OS,
				std::env::consts::ARCH
			));
		}
		text
	}
}
