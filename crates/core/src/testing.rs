//! Test doubles for the hub seams.
//!
//! [`MockHubFactory`] and [`MockClientFactory`] stand in for the process
//! launcher and the WebSocket client so whole runs can be exercised without
//! a hub or browsers. Mocks record what they were asked to do for later
//! assertion.
//!
//! ```ignore
//! let client = MockClient::new()
//!     .with_agents(["chrome"])
//!     .with_events([dispatch(["chrome"]), agent_result("chrome", 3, 0, json!({})), BatchEvent::Complete]);
//! let clients = MockClientFactory::new().reachable("ws://localhost:8124", client);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hubrun_protocol::{AgentId, AgentNotification, AgentOutcome, BatchEvent, BatchRequest, ResultNode};
use hubrun_runtime::{BatchReceiver, NotificationReceiver};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::error::{Result, RunError};
use crate::hub::{ClientFactory, HubClient, HubFactory, HubHandle, HubOptions, HubStartError};

/// `dispatch` event for `agents`.
pub fn dispatch<I, S>(agents: I) -> BatchEvent
where
	I: IntoIterator<Item = S>,
	S: Into<AgentId>,
{
	BatchEvent::Dispatch {
		agents: agents.into_iter().map(Into::into).collect(),
	}
}

/// `agentResult` event with a raw result tree.
pub fn agent_result(agent: &str, passed: u64, failed: u64, results: Value) -> BatchEvent {
	BatchEvent::AgentResult(AgentOutcome {
		agent: agent.to_string(),
		passed,
		failed,
		results: ResultNode::from(results),
	})
}

enum StartBehavior {
	Start,
	BindConflict,
	Fail(String),
}

/// Mock hub factory.
///
/// Records every `listen` call. Hubs it creates report the URL
/// `ws://localhost:{port}` and never stop on their own unless a stop signal
/// was requested with [`MockHubFactory::stop_signal`].
pub struct MockHubFactory {
	behavior: StartBehavior,
	listens: Mutex<Vec<HubOptions>>,
	stop_rx: Mutex<Option<oneshot::Receiver<String>>>,
	shut_down: Arc<AtomicBool>,
}

impl MockHubFactory {
	fn with_behavior(behavior: StartBehavior) -> Self {
		Self {
			behavior,
			listens: Mutex::new(Vec::new()),
			stop_rx: Mutex::new(None),
			shut_down: Arc::new(AtomicBool::new(false)),
		}
	}

	/// Factory whose hubs start successfully.
	pub fn starting() -> Self {
		Self::with_behavior(StartBehavior::Start)
	}

	/// Factory that always reports the port as taken.
	pub fn bind_conflict() -> Self {
		Self::with_behavior(StartBehavior::BindConflict)
	}

	pub fn failing(reason: &str) -> Self {
		Self::with_behavior(StartBehavior::Fail(reason.to_string()))
	}

	/// Returns a sender that makes the next created hub stop with the given reason.
	pub fn stop_signal(&self) -> oneshot::Sender<String> {
		let (tx, rx) = oneshot::channel();
		*self.stop_rx.lock().unwrap() = Some(rx);
		tx
	}

	/// Every `listen` call so far.
	pub fn listens(&self) -> Vec<HubOptions> {
		self.listens.lock().unwrap().clone()
	}

	/// True once a hub from this factory was shut down.
	pub fn was_shut_down(&self) -> bool {
		self.shut_down.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl HubFactory for MockHubFactory {
	type Hub = MockHub;

	async fn listen(&self, options: &HubOptions) -> std::result::Result<MockHub, HubStartError> {
		self.listens.lock().unwrap().push(options.clone());
		match &self.behavior {
			StartBehavior::Start => Ok(MockHub {
				url: format!("ws://localhost:{}", options.port),
				stop_rx: self.stop_rx.lock().unwrap().take(),
				shut_down: Arc::clone(&self.shut_down),
			}),
			StartBehavior::BindConflict => Err(HubStartError::BindConflict { port: options.port }),
			StartBehavior::Fail(reason) => Err(HubStartError::Failed(reason.clone())),
		}
	}
}

/// Hub created by [`MockHubFactory`].
pub struct MockHub {
	url: String,
	stop_rx: Option<oneshot::Receiver<String>>,
	shut_down: Arc<AtomicBool>,
}

#[async_trait]
impl HubHandle for MockHub {
	fn url(&self) -> String {
		self.url.clone()
	}

	async fn stopped(&mut self) -> String {
		match self.stop_rx.as_mut() {
			Some(rx) => match rx.await {
				Ok(reason) => reason,
				Err(_) => std::future::pending().await,
			},
			None => std::future::pending().await,
		}
	}

	async fn shutdown(&mut self) {
		self.shut_down.store(true, Ordering::SeqCst);
	}
}

/// Mock client factory.
///
/// Each reachable URL hands out its client once; any other URL fails with
/// [`RunError::ConnectionFailed`].
#[derive(Default)]
pub struct MockClientFactory {
	clients: Mutex<HashMap<String, MockClient>>,
	attempts: Mutex<Vec<String>>,
}

impl MockClientFactory {
	pub fn new() -> Self {
		Self::default()
	}

	/// Makes `url` answer with `client`.
	pub fn reachable(self, url: &str, client: MockClient) -> Self {
		self.clients.lock().unwrap().insert(url.to_string(), client);
		self
	}

	/// URLs connected to so far, in order.
	pub fn attempts(&self) -> Vec<String> {
		self.attempts.lock().unwrap().clone()
	}
}

#[async_trait]
impl ClientFactory for MockClientFactory {
	type Client = MockClient;

	async fn connect(&self, url: &str) -> Result<MockClient> {
		self.attempts.lock().unwrap().push(url.to_string());
		match self.clients.lock().unwrap().remove(url) {
			Some(mut client) => {
				client.url = url.to_string();
				Ok(client)
			}
			None => Err(RunError::ConnectionFailed {
				url: url.to_string(),
				reason: "connection refused".to_string(),
			}),
		}
	}
}

/// Mock hub connection replaying a scripted batch.
///
/// Events are delivered in order and the stream closes after the last one,
/// so a script without [`BatchEvent::Complete`] models an interrupted batch.
#[derive(Default)]
pub struct MockClient {
	url: String,
	agents: Vec<AgentId>,
	events: Vec<BatchEvent>,
	notifications: Mutex<Option<Vec<AgentNotification>>>,
	submitted: Arc<Mutex<Vec<BatchRequest>>>,
	keep_open: bool,
	open_streams: Mutex<Vec<mpsc::UnboundedSender<BatchEvent>>>,
}

impl MockClient {
	pub fn new() -> Self {
		Self {
			notifications: Mutex::new(Some(Vec::new())),
			..Self::default()
		}
	}

	pub fn with_agents<I, S>(mut self, agents: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<AgentId>,
	{
		self.agents = agents.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_events(mut self, events: impl IntoIterator<Item = BatchEvent>) -> Self {
		self.events = events.into_iter().collect();
		self
	}

	pub fn with_notifications(self, notifications: impl IntoIterator<Item = AgentNotification>) -> Self {
		*self.notifications.lock().unwrap() = Some(notifications.into_iter().collect());
		self
	}

	/// Keeps the batch stream open after the scripted events, like a hub
	/// whose agents are still running.
	pub fn stalled(mut self) -> Self {
		self.keep_open = true;
		self
	}

	/// Shared record of submitted batches; clone before handing the client over.
	pub fn submissions(&self) -> Arc<Mutex<Vec<BatchRequest>>> {
		Arc::clone(&self.submitted)
	}
}

#[async_trait]
impl HubClient for MockClient {
	fn url(&self) -> &str {
		&self.url
	}

	async fn agents(&self) -> Result<Vec<AgentId>> {
		Ok(self.agents.clone())
	}

	async fn create_batch(&self, request: &BatchRequest) -> Result<BatchReceiver> {
		self.submitted.lock().unwrap().push(request.clone());
		let (tx, rx) = mpsc::unbounded_channel();
		for event in &self.events {
			let _ = tx.send(event.clone());
		}
		if self.keep_open {
			self.open_streams.lock().unwrap().push(tx);
		}
		Ok(rx)
	}

	fn take_notifications(&self) -> Option<NotificationReceiver> {
		let notifications = self.notifications.lock().unwrap().take()?;
		let (tx, rx) = mpsc::unbounded_channel();
		for notification in notifications {
			let _ = tx.send(notification);
		}
		Some(rx)
	}
}
