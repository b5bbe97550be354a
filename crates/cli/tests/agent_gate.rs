//! The agent gate against a hub that never has agents attached.

use std::io::IsTerminal;
use std::process::Stdio;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use hubrun::protocol::ClientMessage;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::process::Command;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Answers every `list_agents` with an empty list.
async fn empty_hub(listener: TcpListener) {
	let (socket, _) = listener.accept().await.unwrap();
	let mut ws = accept_async(socket).await.unwrap();

	while let Some(Ok(Message::Text(text))) = ws.next().await {
		if let ClientMessage::ListAgents { id } = serde_json::from_str(&text).unwrap() {
			let reply = json!({ "type": "response", "id": id, "result": { "agents": [] } });
			ws.send(Message::Text(reply.to_string())).await.unwrap();
		}
	}
}

/// Stdin is inherited, so from a terminal only the redirected error stream
/// keeps the run from waiting on the attach prompt.
#[tokio::test]
async fn redirected_stderr_fails_fast_without_agents() {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let port = listener.local_addr().unwrap().port();
	let hub = tokio::spawn(empty_hub(listener));
	let dir = tempfile::tempdir().unwrap();
	let url = format!("ws://127.0.0.1:{port}");

	let run = Command::new(env!("CARGO_BIN_EXE_hubrun"))
		.current_dir(dir.path())
		.args(["run", "--hub", &url, "a.html"])
		.env_remove("RUST_LOG")
		.stdin(Stdio::inherit())
		.kill_on_drop(true)
		.output();
	let output = tokio::time::timeout(Duration::from_secs(20), run)
		.await
		.expect("run waited for confirmation")
		.unwrap();

	let stderr = String::from_utf8_lossy(&output.stderr);
	assert_eq!(output.status.code(), Some(1), "stderr: {stderr}");
	assert!(stderr.contains("No agents are connected"), "unexpected diagnostic: {stderr}");
	let stdout = String::from_utf8_lossy(&output.stdout);
	assert!(!stdout.contains("press Enter"), "prompt printed: {stdout}");
	hub.abort();
}

#[test]
fn interactivity_follows_the_error_stream() {
	assert_eq!(hubrun_cli::commands::interactive(), std::io::stderr().is_terminal());
}
