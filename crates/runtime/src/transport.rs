//! WebSocket transport carrying one JSON object per text frame.


use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};

use crate::error::{Error, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Rewrites `http(s)://` hub URLs to their WebSocket equivalents.
///
/// Hubs are commonly advertised by their HTTP address; the connection itself
/// always upgrades to a WebSocket on the same host and port.
pub fn normalize_hub_url(url: &str) -> String {
	if let Some(rest) = url.strip_prefix("http://") {
		format!("ws://{rest}")
	} else if let Some(rest) = url.strip_prefix("https://") {
		format!("wss://{rest}")
	} else if url.contains("://") {
		url.to_string()
	} else {
		format!("ws://{url}")
	}
}

/// Entry point for opening a transport.
pub struct WebSocketTransport;

impl WebSocketTransport {
	/// Opens a WebSocket to `url`, giving up after `timeout`.
	///
	/// An endpoint that accepts TCP but never completes the handshake counts
	/// as unreachable, the same as a refused connection.
	pub async fn connect(url: &str, timeout: Duration) -> Result<(TransportSender, TransportReceiver)> {
		let url = normalize_hub_url(url);
		debug!(target = "hubrun.transport", url = %url, "connecting");

		let (stream, _response) = match tokio::time::timeout(timeout, connect_async(url.as_str())).await {
			Ok(Ok(connected)) => connected,
			Ok(Err(err)) => {
				return Err(Error::ConnectionFailed {
					url,
					reason: err.to_string(),
				});
			}
			Err(_) => {
				return Err(Error::ConnectionFailed {
					reason: format!("no handshake within {}ms", timeout.as_millis()),
					url,
				});
			}
		};

		let (sink, stream) = stream.split();
		Ok((TransportSender { sink }, TransportReceiver { stream }))
	}
}

/// Write half of the transport.
pub struct TransportSender {
	sink: SplitSink<WsStream, Message>,
}

impl TransportSender {
	/// Serializes `message` and sends it as one text frame.
	pub async fn send<T: Serialize>(&mut self, message: &T) -> Result<()> {
		let payload = serde_json::to_string(message)?;
		trace!(target = "hubrun.transport", %payload, "send");
		self.sink
			.send(Message::Text(payload))
			.await
			.map_err(|e| Error::TransportError(e.to_string()))
	}

	/// Sends a close frame. Errors are ignored; the peer may already be gone.
	pub async fn close(&mut self) {
		let _ = self.sink.close().await;
	}
}

/// Read half of the transport.
pub struct TransportReceiver {
	stream: SplitStream<WsStream>,
}

impl TransportReceiver {
	/// Returns the next JSON frame, or `None` once the peer closed.
	///
	/// Control and binary frames are skipped.
	pub async fn recv(&mut self) -> Option<Result<Value>> {
		loop {
			let frame = match self.stream.next().await? {
				Ok(frame) => frame,
				Err(err) => return Some(Err(Error::TransportError(err.to_string()))),
			};

			match frame {
				Message::Text(text) => {
					trace!(target = "hubrun.transport", payload = %text, "recv");
					return Some(decode_frame(&text));
				}
				Message::Close(_) => return None,
				_ => continue,
			}
		}
	}
}

fn decode_frame(text: &str) -> Result<Value> {
	let value: Value = serde_json::from_str(text)?;
	if !value.is_object() {
		return Err(Error::ProtocolError(format!("expected a JSON object frame, got: {text}")));
	}
	Ok(value)
}
