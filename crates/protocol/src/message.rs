//! Envelopes exchanged between the client and a hub.
//!
//! Every frame is one JSON object with a `type` tag. Requests carry an `id`
//! that the matching [`HubMessage::Response`] echoes back; everything else the
//! hub sends is an unsolicited notification.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::batch::{AgentId, BatchRequest};
use crate::event::{AgentNotification, BatchEvent};

/// Client → hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
	ListAgents {
		id: u32,
	},
	/// Submit a batch. `batch` is chosen by the client and tags every event
	/// the hub relays for it.
	CreateBatch {
		id: u32,
		batch: String,
		basedir: PathBuf,
		tests: Vec<PathBuf>,
	},
}

impl ClientMessage {
	pub fn create_batch(id: u32, batch: impl Into<String>, request: &BatchRequest) -> Self {
		ClientMessage::CreateBatch {
			id,
			batch: batch.into(),
			basedir: request.basedir.clone(),
			tests: request.tests.clone(),
		}
	}
}

/// Hub → client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HubMessage {
	Response {
		id: u32,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		result: Option<Value>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		error: Option<String>,
	},
	AgentConnect {
		agent: AgentId,
	},
	AgentDisconnect {
		agent: AgentId,
	},
	BatchEvent {
		batch: String,
		event: BatchEvent,
	},
}

impl HubMessage {
	/// Converts agent connect/disconnect frames into notifications.
	pub fn as_notification(&self) -> Option<AgentNotification> {
		match self {
			HubMessage::AgentConnect { agent } => Some(AgentNotification::Connected(agent.clone())),
			HubMessage::AgentDisconnect { agent } => Some(AgentNotification::Disconnected(agent.clone())),
			_ => None,
		}
	}
}

/// Result payload of a `list_agents` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentList {
	pub agents: Vec<AgentId>,
}
