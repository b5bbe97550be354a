//! Top-level run entry points.

use std::io::Write;
use std::path::PathBuf;

use hubrun_protocol::BatchRequest;
use tokio::io::AsyncBufRead;
use tracing::{info, warn};

use crate::error::{Result, RunError};
use crate::hub::{ClientFactory, HubClient, HubFactory, HubHandle, HubOptions};
use crate::negotiator::{HubTarget, negotiate};
use crate::orchestrator::{BatchOrchestrator, RunSummary};
use crate::progress::ProgressOutput;
use crate::waiter::wait_for_agents;

/// Inputs of one batch run.
#[derive(Debug, Clone)]
pub struct RunOptions {
	/// Test files, relative to `basedir`.
	pub files: Vec<PathBuf>,
	pub basedir: PathBuf,
	/// Port of the default local hub.
	pub port: u16,
	/// Explicit hub URL.
	pub hub: Option<String>,
	/// Raises the log level of a locally created hub to `debug`.
	pub debug: bool,
	/// Log level of a locally created hub when `debug` is off.
	pub hub_log_level: String,
	/// Whether someone can answer the "attach a browser" prompt.
	pub interactive: bool,
	/// Where the batch progress line is drawn.
	pub progress: ProgressOutput,
}

impl RunOptions {
	fn effective_hub_log_level(&self) -> &str {
		if self.debug { "debug" } else { &self.hub_log_level }
	}
}

/// Runs one batch end to end.
///
/// Connects to (or creates) a hub, waits for agents, submits the batch and
/// reports its events to `out` until completion. A hub created here is
/// stopped before returning, and its unexpected exit mid-run is fatal.
pub async fn run_batch<F, C, R, W>(
	options: &RunOptions,
	hubs: &F,
	clients: &C,
	confirm: &mut R,
	out: &mut W,
) -> Result<RunSummary>
where
	F: HubFactory,
	C: ClientFactory,
	R: AsyncBufRead + Unpin,
	W: Write,
{
	let target = HubTarget {
		hub: options.hub.as_deref(),
		port: options.port,
		log_level: options.effective_hub_log_level(),
	};
	let (hub, client) = negotiate(hubs, clients, &target, out).await?.into_parts();

	match hub {
		Some(mut hub) => {
			let result = tokio::select! {
				result = submit(options, &client, confirm, out) => result,
				reason = hub.stopped() => {
					warn!(target = "hubrun.run", %reason, "local hub stopped during the run");
					Err(RunError::Hub(reason))
				}
			};
			drop(client);
			hub.shutdown().await;
			info!(target = "hubrun.run", "local hub stopped");
			result
		}
		None => submit(options, &client, confirm, out).await,
	}
}

async fn submit<C, R, W>(options: &RunOptions, client: &C, confirm: &mut R, out: &mut W) -> Result<RunSummary>
where
	C: HubClient,
	R: AsyncBufRead + Unpin,
	W: Write,
{
	let notifications = client.take_notifications();
	let agents = wait_for_agents(client, options.interactive, confirm, out).await?;
	info!(target = "hubrun.run", agents = agents.len(), files = options.files.len(), "submitting batch");

	let request = BatchRequest::new(&options.basedir, &options.files);
	let events = client.create_batch(&request).await?;

	let mut orchestrator = BatchOrchestrator::with_progress(&request, &mut *out, options.progress);
	orchestrator.drive(events, notifications).await
}

/// Options for `serve`.
#[derive(Debug, Clone)]
pub struct ServerOptions {
	pub port: u16,
	pub log_level: String,
}

/// Starts a standalone hub, bypassing negotiation.
pub async fn start_server<F: HubFactory>(hubs: &F, options: &ServerOptions) -> Result<F::Hub> {
	let hub = hubs
		.listen(&HubOptions {
			port: options.port,
			log_level: options.log_level.clone(),
		})
		.await?;
	info!(target = "hubrun.run", url = %hub.url(), "hub listening");
	Ok(hub)
}
