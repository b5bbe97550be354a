//! Local hub process management
//!
//! When no hub is reachable, hubrun boots one itself by launching the hub
//! executable on a local port and supervising it for the rest of the run.

use std::net::TcpListener as StdTcpListener;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::error::{Error, Result};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How to launch a local hub.
#[derive(Debug, Clone)]
pub struct HubServerOptions {
	/// Hub executable, resolved through `PATH` when relative.
	pub command: PathBuf,
	/// Extra arguments placed before `--port` and `--log-level`.
	pub args: Vec<String>,
	pub port: u16,
	pub log_level: String,
	/// How long to wait for the hub to accept connections.
	pub ready_timeout: Duration,
}

/// Checks that nothing is listening on `port` on the loopback interface.
///
/// The probe listener is dropped immediately, leaving the port free for the
/// hub process.
pub fn ensure_port_available(port: u16) -> Result<()> {
	match StdTcpListener::bind(("127.0.0.1", port)) {
		Ok(listener) => {
			drop(listener);
			Ok(())
		}
		Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => Err(Error::AddrInUse { port }),
		Err(err) => Err(Error::Io(err)),
	}
}

/// A hub process owned by this run.
///
/// The process is killed when the handle is dropped.
#[derive(Debug)]
pub struct HubServer {
	process: Child,
	port: u16,
}

impl HubServer {
	/// Launch the hub process and wait until it accepts connections.
	///
	/// # Errors
	///
	/// Returns `Error::AddrInUse` if `port` is already bound; nothing is
	/// spawned in that case.
	/// Returns `Error::LaunchFailed` if the process cannot be spawned, exits
	/// early, or never starts listening.
	pub async fn launch(options: &HubServerOptions) -> Result<Self> {
		ensure_port_available(options.port)?;

		let mut cmd = Command::new(&options.command);
		cmd.args(&options.args)
			.arg("--port")
			.arg(options.port.to_string())
			.arg("--log-level")
			.arg(&options.log_level)
			.stdin(Stdio::null())
			.stdout(Stdio::null())
			.stderr(Stdio::inherit())
			.kill_on_drop(true);

		let process = cmd
			.spawn()
			.map_err(|e| Error::LaunchFailed(format!("Failed to spawn {}: {}", options.command.display(), e)))?;

		let mut server = Self {
			process,
			port: options.port,
		};
		server.wait_until_listening(options.ready_timeout).await?;

		info!(target = "hubrun.hub", port = server.port, "local hub listening");
		Ok(server)
	}

	async fn wait_until_listening(&mut self, timeout: Duration) -> Result<()> {
		let attempts = (timeout.as_millis() / READY_POLL_INTERVAL.as_millis()).max(1) as u32;

		for attempt in 0..attempts {
			tokio::time::sleep(READY_POLL_INTERVAL).await;

			if let Some(status) = self.process.try_wait()? {
				return Err(Error::LaunchFailed(format!("Hub process exited before listening (status: {})", status)));
			}

			match TcpStream::connect(("127.0.0.1", self.port)).await {
				Ok(_) => return Ok(()),
				Err(err) => debug!(target = "hubrun.hub", attempt, error = %err, "hub not listening yet"),
			}
		}

		Err(Error::LaunchFailed(format!(
			"Hub did not start listening on port {} within {}ms",
			self.port,
			timeout.as_millis()
		)))
	}

	pub fn port(&self) -> u16 {
		self.port
	}

	/// WebSocket URL clients use to reach this hub.
	pub fn url(&self) -> String {
		format!("ws://localhost:{}", self.port)
	}

	/// Waits for the hub process to exit.
	pub async fn wait(&mut self) -> Result<ExitStatus> {
		Ok(self.process.wait().await?)
	}

	/// Kills the hub process and reaps it.
	pub async fn shutdown(&mut self) -> Result<()> {
		self.process
			.kill()
			.await
			.map_err(|e| Error::LaunchFailed(format!("Failed to kill hub process: {}", e)))?;

		let _ = tokio::time::timeout(Duration::from_millis(500), self.process.wait()).await;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn options(command: &str, args: &[&str], port: u16) -> HubServerOptions {
		HubServerOptions {
			command: PathBuf::from(command),
			args: args.iter().map(|s| s.to_string()).collect(),
			port,
			log_level: "info".into(),
			ready_timeout: Duration::from_millis(500),
		}
	}

	fn free_port() -> u16 {
		let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
		listener.local_addr().unwrap().port()
	}

	#[test]
	fn bound_port_is_reported_as_in_use() {
		let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
		let port = listener.local_addr().unwrap().port();

		let err = ensure_port_available(port).unwrap_err();
		assert!(err.is_addr_in_use());
		assert_eq!(err.to_string(), format!("Port {port} is already in use"));
	}

	#[test]
	fn free_port_is_available() {
		assert!(ensure_port_available(free_port()).is_ok());
	}

	#[tokio::test]
	async fn launch_refuses_bound_port_before_spawning() {
		let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
		let port = listener.local_addr().unwrap().port();

		// The command does not exist; reaching spawn would yield LaunchFailed.
		let err = HubServer::launch(&options("hubrun-definitely-missing-hub", &[], port))
			.await
			.unwrap_err();
		assert!(matches!(err, Error::AddrInUse { port: p } if p == port));
	}

	#[tokio::test]
	async fn missing_executable_fails_to_launch() {
		let err = HubServer::launch(&options("hubrun-definitely-missing-hub", &[], free_port()))
			.await
			.unwrap_err();
		assert!(matches!(err, Error::LaunchFailed(_)), "unexpected error: {err}");
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn early_exit_is_reported() {
		let err = HubServer::launch(&options("sh", &["-c", "exit 3"], free_port()))
			.await
			.unwrap_err();
		assert!(err.to_string().contains("exited before listening"), "unexpected error: {err}");
	}
}
