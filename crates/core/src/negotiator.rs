//! Connect to an existing hub, or start one.

use std::io::Write;

use colored::Colorize;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::hub::{ClientFactory, HubFactory, HubHandle, HubOptions};

/// URL of a hub listening locally on `port`.
pub fn default_hub_url(port: u16) -> String {
	format!("ws://localhost:{port}")
}

/// Where the run should find its hub.
#[derive(Debug, Clone)]
pub struct HubTarget<'a> {
	/// Explicit hub URL; the local default is tried when absent.
	pub hub: Option<&'a str>,
	/// Port for the local default and for a locally created hub.
	pub port: u16,
	/// Log level handed to a locally created hub.
	pub log_level: &'a str,
}

/// How the run obtained its hub connection.
pub enum ConnectionOutcome<H, C> {
	/// An existing hub answered; this process owns no hub.
	ConnectedToRemoteHub(C),
	/// No hub answered, so one was started here and must be shut down later.
	HubCreatedLocally { hub: H, client: C },
}

impl<H, C> ConnectionOutcome<H, C> {
	pub fn client(&self) -> &C {
		match self {
			ConnectionOutcome::ConnectedToRemoteHub(client) => client,
			ConnectionOutcome::HubCreatedLocally { client, .. } => client,
		}
	}

	pub fn is_local(&self) -> bool {
		matches!(self, ConnectionOutcome::HubCreatedLocally { .. })
	}

	/// Splits into the owned hub, if any, and the client.
	pub fn into_parts(self) -> (Option<H>, C) {
		match self {
			ConnectionOutcome::ConnectedToRemoteHub(client) => (None, client),
			ConnectionOutcome::HubCreatedLocally { hub, client } => (Some(hub), client),
		}
	}
}

/// Connects to `target`, falling back to a freshly started local hub.
///
/// An explicit hub that cannot be reached is reported as a warning before
/// the fallback. Once a local hub is running, failing to connect to it is
/// fatal.
pub async fn negotiate<F, C, W>(
	hubs: &F,
	clients: &C,
	target: &HubTarget<'_>,
	out: &mut W,
) -> Result<ConnectionOutcome<F::Hub, C::Client>>
where
	F: HubFactory,
	C: ClientFactory,
	W: Write,
{
	let default_url = default_hub_url(target.port);
	let url = target.hub.unwrap_or(&default_url);
	let explicit = target.hub.is_some_and(|hub| hub != default_url);

	match clients.connect(url).await {
		Ok(client) => {
			info!(target = "hubrun.negotiate", url, "connected to running hub");
			writeln!(out, "Connected to hub at {url}")?;
			return Ok(ConnectionOutcome::ConnectedToRemoteHub(client));
		}
		Err(err) if explicit => {
			warn!(target = "hubrun.negotiate", url, error = %err, "hub unreachable, starting a local one");
			writeln!(
				out,
				"{} {err}; starting a local hub on port {}",
				"warning:".yellow().bold(),
				target.port
			)?;
		}
		Err(err) => {
			debug!(target = "hubrun.negotiate", url, error = %err, "no hub running");
		}
	}

	let mut hub = hubs
		.listen(&HubOptions {
			port: target.port,
			log_level: target.log_level.to_string(),
		})
		.await?;
	let local_url = hub.url();
	info!(target = "hubrun.negotiate", url = %local_url, "started local hub");

	let client = match clients.connect(&local_url).await {
		Ok(client) => client,
		Err(err) => {
			hub.shutdown().await;
			return Err(err);
		}
	};
	writeln!(out, "Started local hub at {local_url}")?;

	Ok(ConnectionOutcome::HubCreatedLocally { hub, client })
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::RunError;
	use crate::hub::HubClient;
	use crate::testing::{MockClient, MockClientFactory, MockHubFactory};

	fn target(hub: Option<&str>) -> HubTarget<'_> {
		HubTarget {
			hub,
			port: 8124,
			log_level: "info",
		}
	}

	#[test]
	fn default_url_uses_port() {
		assert_eq!(default_hub_url(9000), "ws://localhost:9000");
	}

	#[tokio::test]
	async fn running_hub_is_reused() {
		let hubs = MockHubFactory::starting();
		let clients = MockClientFactory::new().reachable("ws://localhost:8124", MockClient::new());
		let mut out = Vec::new();

		let outcome = negotiate(&hubs, &clients, &target(None), &mut out).await.unwrap();

		assert!(!outcome.is_local());
		assert_eq!(outcome.client().url(), "ws://localhost:8124");
		assert!(hubs.listens().is_empty());
	}

	#[tokio::test]
	async fn explicit_default_url_falls_back_silently() {
		colored::control::set_override(false);
		let hubs = MockHubFactory::starting();
		let clients = MockClientFactory::new();
		let mut out = Vec::new();

		// fails on the second connect; only the absence of a warning matters here
		let _ = negotiate(&hubs, &clients, &target(Some("ws://localhost:8124")), &mut out).await;

		assert!(!String::from_utf8(out).unwrap().contains("warning:"));
		assert_eq!(hubs.listens().len(), 1);
	}

	#[tokio::test]
	async fn local_hub_is_owned() {
		let hubs = MockHubFactory::starting();
		let clients = MockClientFactory::new().reachable("ws://localhost:8124", MockClient::new());
		let mut out = Vec::new();

		let outcome = negotiate(&hubs, &clients, &target(Some("ws://gone:1")), &mut out).await.unwrap();

		assert!(outcome.is_local());
		let (hub, _client) = outcome.into_parts();
		assert_eq!(hub.unwrap().url(), "ws://localhost:8124");
	}

	#[tokio::test]
	async fn hub_start_failure_is_fatal() {
		let hubs = MockHubFactory::failing("hubrun-hub not found");
		let clients = MockClientFactory::new();
		let mut out = Vec::new();

		let err = negotiate(&hubs, &clients, &target(None), &mut out).await.err().unwrap();

		assert!(matches!(err, RunError::Hub(reason) if reason.contains("not found")));
	}
}
