//! Connection layer on top of the transport.
//!
//! It handles:
//! - Generating request IDs and correlating hub responses with them
//! - Routing agent connect/disconnect frames to a notification channel
//! - Routing batch events to the stream registered for their batch
//!
//! # Message Flow
//!
//! 1. A caller issues a request; the connection assigns an ID and parks a
//!    oneshot sender under it
//! 2. The writer task sends the request frame
//! 3. The reader task decodes every incoming frame and hands it to [`Router`]
//! 4. Responses complete the parked oneshot, notifications and batch events
//!    are forwarded to their unbounded channels
//!
//! When the transport closes, every pending request fails with
//! [`Error::ChannelClosed`] and every batch stream ends.


use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use hubrun_protocol::{AgentId, AgentList, AgentNotification, BatchEvent, BatchRequest, ClientMessage, HubMessage};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::transport::WebSocketTransport;

/// Stream of events for one submitted batch.
pub type BatchReceiver = mpsc::UnboundedReceiver<BatchEvent>;

/// Stream of agent connect/disconnect notifications.
pub type NotificationReceiver = mpsc::UnboundedReceiver<AgentNotification>;

type PendingMap = HashMap<u32, oneshot::Sender<Result<Value>>>;

/// Routes decoded hub frames to whoever is waiting for them.
pub(crate) struct Router {
	pending: Mutex<PendingMap>,
	batches: Mutex<HashMap<String, mpsc::UnboundedSender<BatchEvent>>>,
	notify_tx: mpsc::UnboundedSender<AgentNotification>,
}

impl Router {
	pub(crate) fn new(notify_tx: mpsc::UnboundedSender<AgentNotification>) -> Self {
		Self {
			pending: Mutex::new(HashMap::new()),
			batches: Mutex::new(HashMap::new()),
			notify_tx,
		}
	}

	pub(crate) fn park(&self, id: u32) -> oneshot::Receiver<Result<Value>> {
		let (tx, rx) = oneshot::channel();
		self.pending.lock().insert(id, tx);
		rx
	}

	pub(crate) fn unpark(&self, id: u32) {
		self.pending.lock().remove(&id);
	}

	pub(crate) fn register_batch(&self, batch: &str) -> BatchReceiver {
		let (tx, rx) = mpsc::unbounded_channel();
		self.batches.lock().insert(batch.to_string(), tx);
		rx
	}

	pub(crate) fn forget_batch(&self, batch: &str) {
		self.batches.lock().remove(batch);
	}

	pub(crate) fn route(&self, message: HubMessage) {
		match message {
			HubMessage::Response { id, result, error } => {
				let Some(waiter) = self.pending.lock().remove(&id) else {
					warn!(target = "hubrun.connection", id, "response for unknown request");
					return;
				};
				let outcome = match error {
					Some(message) => Err(Error::Remote(message)),
					None => Ok(result.unwrap_or(Value::Null)),
				};
				let _ = waiter.send(outcome);
			}
			HubMessage::AgentConnect { .. } | HubMessage::AgentDisconnect { .. } => {
				if let Some(notification) = message.as_notification() {
					let _ = self.notify_tx.send(notification);
				}
			}
			HubMessage::BatchEvent { batch, event } => {
				let finished = matches!(event, BatchEvent::Complete);
				let mut batches = self.batches.lock();
				match batches.get(&batch) {
					Some(tx) => {
						let _ = tx.send(event);
					}
					None => {
						debug!(target = "hubrun.connection", batch = %batch, event = event.name(), "event for unknown batch");
						return;
					}
				}
				if finished {
					batches.remove(&batch);
				}
			}
		}
	}

	/// Fails every pending request and ends every batch stream.
	pub(crate) fn close(&self) {
		for (_, waiter) in self.pending.lock().drain() {
			let _ = waiter.send(Err(Error::ChannelClosed));
		}
		self.batches.lock().clear();
	}
}

/// Live connection to a hub.
///
/// Dropping the connection stops its reader and writer tasks.
pub struct HubConnection {
	url: String,
	last_id: AtomicU32,
	last_batch: AtomicU32,
	router: Arc<Router>,
	outbound_tx: mpsc::UnboundedSender<ClientMessage>,
	notifications: Mutex<Option<NotificationReceiver>>,
	tasks: Vec<JoinHandle<()>>,
}

impl HubConnection {
	/// Connects to the hub at `url`, failing after `timeout` without a handshake.
	pub async fn connect(url: &str, timeout: Duration) -> Result<Self> {
		let (mut sender, mut receiver) = WebSocketTransport::connect(url, timeout).await?;
		let (notify_tx, notify_rx) = mpsc::unbounded_channel();
		let router = Arc::new(Router::new(notify_tx));
		let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ClientMessage>();

		let writer = tokio::spawn(async move {
			while let Some(message) = outbound_rx.recv().await {
				if let Err(err) = sender.send(&message).await {
					warn!(target = "hubrun.connection", error = %err, "failed to send frame");
					break;
				}
			}
			sender.close().await;
		});

		let reader_router = Arc::clone(&router);
		let reader = tokio::spawn(async move {
			while let Some(frame) = receiver.recv().await {
				let value = match frame {
					Ok(value) => value,
					Err(err) => {
						warn!(target = "hubrun.connection", error = %err, "dropping connection");
						break;
					}
				};
				match serde_json::from_value::<HubMessage>(value) {
					Ok(message) => reader_router.route(message),
					Err(err) => debug!(target = "hubrun.connection", error = %err, "ignoring unrecognised frame"),
				}
			}
			reader_router.close();
		});

		debug!(target = "hubrun.connection", url, "connected");

		Ok(Self {
			url: url.to_string(),
			last_id: AtomicU32::new(0),
			last_batch: AtomicU32::new(0),
			router,
			outbound_tx,
			notifications: Mutex::new(Some(notify_rx)),
			tasks: vec![writer, reader],
		})
	}

	/// URL this connection was opened against.
	pub fn url(&self) -> &str {
		&self.url
	}

	async fn request(&self, build: impl FnOnce(u32) -> ClientMessage) -> Result<Value> {
		let id = self.last_id.fetch_add(1, Ordering::SeqCst);
		let rx = self.router.park(id);

		if self.outbound_tx.send(build(id)).is_err() {
			self.router.unpark(id);
			return Err(Error::ChannelClosed);
		}

		rx.await.map_err(|_| Error::ChannelClosed)?
	}

	/// Lists the agents currently attached to the hub.
	pub async fn list_agents(&self) -> Result<Vec<AgentId>> {
		let value = self.request(|id| ClientMessage::ListAgents { id }).await?;
		parse_agent_list(value)
	}

	/// Submits `request` and returns the stream of its events.
	///
	/// The stream is registered before the request is sent, so no event can
	/// slip past it.
	pub async fn create_batch(&self, request: &BatchRequest) -> Result<BatchReceiver> {
		let batch = format!("batch-{}", self.last_batch.fetch_add(1, Ordering::SeqCst) + 1);
		let events = self.router.register_batch(&batch);

		if let Err(err) = self.request(|id| ClientMessage::create_batch(id, batch.as_str(), request)).await {
			self.router.forget_batch(&batch);
			return Err(err);
		}

		debug!(target = "hubrun.connection", batch = %batch, tests = request.len(), "batch submitted");
		Ok(events)
	}

	/// Takes the agent notification stream. Returns `None` after the first call.
	pub fn take_notifications(&self) -> Option<NotificationReceiver> {
		self.notifications.lock().take()
	}
}

impl Drop for HubConnection {
	fn drop(&mut self) {
		for task in &self.tasks {
			task.abort();
		}
	}
}

/// Accepts either `{"agents": [...]}` or a bare array.
pub(crate) fn parse_agent_list(value: Value) -> Result<Vec<AgentId>> {
	if value.is_array() {
		return Ok(serde_json::from_value(value)?);
	}
	let list: AgentList = serde_json::from_value(value).map_err(|e| Error::ProtocolError(format!("invalid agent list: {e}")))?;
	Ok(list.agents)
}
