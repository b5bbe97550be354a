use hubrun::{HubHandle, RunError, ServerOptions, start_server};
use tracing::info;

use super::hub_factory;
use crate::config::Settings;
use crate::error::Result;

/// Runs a hub in the foreground until Ctrl+C or until it exits on its own.
pub async fn execute(settings: &Settings) -> Result<i32> {
	let options = ServerOptions {
		port: settings.port,
		log_level: settings.log_level.clone(),
	};
	let mut hub = start_server(&hub_factory(settings), &options).await?;

	println!("Hub listening at {}", hub.url());
	println!("Press Ctrl+C to stop");

	tokio::select! {
		signal = tokio::signal::ctrl_c() => {
			signal?;
			info!(target = "hubrun.cli", "stopping hub");
			HubHandle::shutdown(&mut hub).await;
			Ok(0)
		}
		reason = hub.stopped() => Err(RunError::Hub(reason).into()),
	}
}
