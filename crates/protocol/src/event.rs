//! Events a submitted batch emits while agents run it.

use serde::{Deserialize, Serialize};

use crate::batch::AgentId;
use crate::result::AgentOutcome;

/// Uncaught script error raised inside an agent's test page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptError {
	pub message: String,
	#[serde(default)]
	pub url: String,
	#[serde(default)]
	pub line: u32,
}

/// Agent-side failure that is not tied to a script location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentFault {
	pub message: String,
}

/// The batch event vocabulary.
///
/// Events for different agents may interleave arbitrarily; events of one
/// agent arrive in order. [`BatchEvent::Complete`] is always last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum BatchEvent {
	/// The batch was assigned to these agents.
	Dispatch { agents: Vec<AgentId> },
	/// An agent finished running a test file.
	AgentResult(AgentOutcome),
	AgentScriptError { agent: AgentId, error: ScriptError },
	AgentError { agent: AgentId, error: AgentFault },
	AgentProgress { agent: AgentId },
	/// Liveness signal, only used for throughput display.
	AgentBeat { agent: AgentId },
	/// An agent finished its whole portion of the batch.
	AgentComplete { agent: AgentId },
	/// Every agent is done.
	Complete,
}

impl BatchEvent {
	/// Name of the event as it appears on the wire.
	pub fn name(&self) -> &'static str {
		match self {
			BatchEvent::Dispatch { .. } => "dispatch",
			BatchEvent::AgentResult(_) => "agentResult",
			BatchEvent::AgentScriptError { .. } => "agentScriptError",
			BatchEvent::AgentError { .. } => "agentError",
			BatchEvent::AgentProgress { .. } => "agentProgress",
			BatchEvent::AgentBeat { .. } => "agentBeat",
			BatchEvent::AgentComplete { .. } => "agentComplete",
			BatchEvent::Complete => "complete",
		}
	}

	/// Agent the event belongs to, if any.
	pub fn agent(&self) -> Option<&str> {
		match self {
			BatchEvent::AgentResult(outcome) => Some(&outcome.agent),
			BatchEvent::AgentScriptError { agent, .. }
			| BatchEvent::AgentError { agent, .. }
			| BatchEvent::AgentProgress { agent }
			| BatchEvent::AgentBeat { agent }
			| BatchEvent::AgentComplete { agent } => Some(agent),
			BatchEvent::Dispatch { .. } | BatchEvent::Complete => None,
		}
	}
}

/// Hub-level notification about agents attaching or leaving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentNotification {
	Connected(AgentId),
	Disconnected(AgentId),
}
