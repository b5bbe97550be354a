use std::time::Instant;

use hubrun::{ClientFactory, HubClient, default_hub_url};

use super::client_factory;
use crate::config::Settings;
use crate::error::Result;
use crate::output::{AgentsData, OutputFormat, ResultBuilder, print_result};

/// Lists the agents of a running hub. Never starts a hub.
pub async fn execute(format: OutputFormat, settings: &Settings) -> Result<i32> {
	let started = Instant::now();
	let url = settings.hub.clone().unwrap_or_else(|| default_hub_url(settings.port));

	let client = client_factory(settings.connect_timeout).connect(&url).await?;
	let agents = client.agents().await?;

	match format {
		OutputFormat::Json => {
			let result = ResultBuilder::new("agents")
				.data(AgentsData { hub: url, agents })
				.timings(started.elapsed().into())
				.build();
			print_result(&result);
		}
		OutputFormat::Text if agents.is_empty() => println!("No agents connected to {url}"),
		OutputFormat::Text => {
			println!("{} agent(s) connected to {url}:", agents.len());
			for agent in &agents {
				println!("  {agent}");
			}
		}
	}

	Ok(0)
}
