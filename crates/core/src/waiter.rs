//! Agent availability gate.

use std::io::{self, Write};

use hubrun_protocol::{AgentId, AgentNotification};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::info;

use crate::error::{Result, RunError};
use crate::hub::HubClient;

/// What to do given the agents currently attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentGate {
	Proceed,
	/// Nobody can attach an agent; stop now.
	FailFast,
	/// Ask the user to attach an agent and wait for confirmation.
	AwaitConfirmation,
}

pub fn decide(agent_count: usize, interactive: bool) -> AgentGate {
	match (agent_count, interactive) {
		(0, true) => AgentGate::AwaitConfirmation,
		(0, false) => AgentGate::FailFast,
		_ => AgentGate::Proceed,
	}
}

/// Prints one agent connect/disconnect line.
pub fn announce<W: Write>(out: &mut W, notification: &AgentNotification) -> io::Result<()> {
	match notification {
		AgentNotification::Connected(agent) => {
			info!(target = "hubrun.agents", agent = %agent, "agent connected");
			writeln!(out, "Agent connected: {agent}")
		}
		AgentNotification::Disconnected(agent) => {
			info!(target = "hubrun.agents", agent = %agent, "agent disconnected");
			writeln!(out, "Agent disconnected: {agent}")
		}
	}
}

/// Lists the hub's agents and blocks until the batch may be submitted.
///
/// With no agents, an interactive run waits for one line on `confirm`; a
/// non-interactive run fails with [`RunError::NoAgentsAvailable`].
pub async fn wait_for_agents<C, R, W>(client: &C, interactive: bool, confirm: &mut R, out: &mut W) -> Result<Vec<AgentId>>
where
	C: HubClient,
	R: AsyncBufRead + Unpin,
	W: Write,
{
	let agents = client.agents().await?;
	for agent in &agents {
		announce(out, &AgentNotification::Connected(agent.clone()))?;
	}

	match decide(agents.len(), interactive) {
		AgentGate::Proceed => Ok(agents),
		AgentGate::FailFast => Err(RunError::NoAgentsAvailable {
			url: client.url().to_string(),
		}),
		AgentGate::AwaitConfirmation => {
			writeln!(
				out,
				"No agents connected. Point a browser at {} and press Enter to continue.",
				client.url()
			)?;
			out.flush()?;
			let mut line = String::new();
			confirm.read_line(&mut line).await?;
			Ok(agents)
		}
	}
}
