//! Seams between the run logic and the outside world.
//!
//! A run needs two capabilities it does not implement itself: starting a hub
//! and talking to one. Both are traits so the run can be driven against mocks
//! (see [`crate::testing`]); the process launcher and WebSocket client from
//! `hubrun-runtime` are the production implementations.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use hubrun_protocol::{AgentId, BatchRequest};
use hubrun_runtime::{BatchReceiver, HubConnection, HubServer, HubServerOptions, NotificationReceiver};
use thiserror::Error;
use tracing::debug;

use crate::error::{Result, RunError};

/// Parameters for creating a local hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubOptions {
	pub port: u16,
	pub log_level: String,
}

/// Why a local hub could not be created.
#[derive(Debug, Error)]
pub enum HubStartError {
	#[error("port {port} is already in use")]
	BindConflict { port: u16 },

	#[error("{0}")]
	Failed(String),
}

impl From<HubStartError> for RunError {
	fn from(err: HubStartError) -> Self {
		match err {
			HubStartError::BindConflict { port } => RunError::BindConflict { port },
			HubStartError::Failed(reason) => RunError::Hub(reason),
		}
	}
}

/// A hub this process created and must clean up.
#[async_trait]
pub trait HubHandle: Send {
	/// URL clients use to reach the hub.
	fn url(&self) -> String;

	/// Resolves when the hub stops on its own, describing why.
	async fn stopped(&mut self) -> String;

	/// Stops the hub. Safe to call after it already stopped.
	async fn shutdown(&mut self);
}

/// Creates local hubs.
#[async_trait]
pub trait HubFactory: Send + Sync {
	type Hub: HubHandle;

	/// Starts a hub listening on `options.port`.
	async fn listen(&self, options: &HubOptions) -> std::result::Result<Self::Hub, HubStartError>;
}

/// An open connection to a hub.
#[async_trait]
pub trait HubClient: Send + Sync {
	/// URL the connection was opened against.
	fn url(&self) -> &str;

	/// Agents currently attached to the hub.
	async fn agents(&self) -> Result<Vec<AgentId>>;

	/// Submits a batch and returns its event stream.
	async fn create_batch(&self, request: &BatchRequest) -> Result<BatchReceiver>;

	/// Takes the agent connect/disconnect stream; `None` once taken.
	fn take_notifications(&self) -> Option<NotificationReceiver>;
}

/// Opens hub connections.
#[async_trait]
pub trait ClientFactory: Send + Sync {
	type Client: HubClient;

	/// Connects to the hub at `url`. Fails with [`RunError::ConnectionFailed`]
	/// when nothing answers.
	async fn connect(&self, url: &str) -> Result<Self::Client>;
}

/// Starts hubs by launching the hub executable.
#[derive(Debug, Clone)]
pub struct ProcessHubFactory {
	pub command: PathBuf,
	pub args: Vec<String>,
	pub ready_timeout: Duration,
}

#[async_trait]
impl HubFactory for ProcessHubFactory {
	type Hub = HubServer;

	async fn listen(&self, options: &HubOptions) -> std::result::Result<HubServer, HubStartError> {
		let launch = HubServerOptions {
			command: self.command.clone(),
			args: self.args.clone(),
			port: options.port,
			log_level: options.log_level.clone(),
			ready_timeout: self.ready_timeout,
		};

		HubServer::launch(&launch).await.map_err(|err| {
			if err.is_addr_in_use() {
				HubStartError::BindConflict { port: options.port }
			} else {
				HubStartError::Failed(err.to_string())
			}
		})
	}
}

#[async_trait]
impl HubHandle for HubServer {
	fn url(&self) -> String {
		HubServer::url(self)
	}

	async fn stopped(&mut self) -> String {
		match self.wait().await {
			Ok(status) => format!("local hub on port {} exited unexpectedly ({status})", self.port()),
			Err(err) => format!("lost track of local hub on port {}: {err}", self.port()),
		}
	}

	async fn shutdown(&mut self) {
		if let Err(err) = HubServer::shutdown(self).await {
			debug!(target = "hubrun.hub", error = %err, "hub shutdown failed");
		}
	}
}

/// Connects over WebSocket.
#[derive(Debug, Clone)]
pub struct WebSocketClientFactory {
	pub connect_timeout: Duration,
}

#[async_trait]
impl ClientFactory for WebSocketClientFactory {
	type Client = HubConnection;

	async fn connect(&self, url: &str) -> Result<HubConnection> {
		HubConnection::connect(url, self.connect_timeout).await.map_err(|err| match err {
			hubrun_runtime::Error::ConnectionFailed { url, reason } => RunError::ConnectionFailed { url, reason },
			other => RunError::ConnectionFailed {
				url: url.to_string(),
				reason: other.to_string(),
			},
		})
	}
}

#[async_trait]
impl HubClient for HubConnection {
	fn url(&self) -> &str {
		HubConnection::url(self)
	}

	async fn agents(&self) -> Result<Vec<AgentId>> {
		Ok(self.list_agents().await?)
	}

	async fn create_batch(&self, request: &BatchRequest) -> Result<BatchReceiver> {
		Ok(HubConnection::create_batch(self, request).await?)
	}

	fn take_notifications(&self) -> Option<NotificationReceiver> {
		HubConnection::take_notifications(self)
	}
}
