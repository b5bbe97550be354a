//! Client-side orchestration of distributed browser test batches.
//!
//! A run connects to a hub (starting a local one when none answers), waits
//! for browser agents, submits a batch of test files and follows the batch's
//! event stream to completion:
//!
//! - [`negotiator`] picks or creates the hub
//! - [`waiter`] gates submission on agent availability
//! - [`orchestrator`] turns batch events into output and a [`RunSummary`]
//! - [`runner::run_batch`] ties the steps together
//!
//! The hub and the connection to it are reached only through the traits in
//! [`hub`], so runs can be driven entirely by the mocks in [`testing`].

pub mod aggregate;
pub mod error;
pub mod hub;
pub mod negotiator;
pub mod orchestrator;
pub mod progress;
pub mod runner;
pub mod testing;
pub mod waiter;
pub mod walker;

pub use aggregate::{BatchAggregate, RunVerdict};
pub use error::{FaultKind, Result, RunError};
pub use hub::{
	ClientFactory, HubClient, HubFactory, HubHandle, HubOptions, HubStartError, ProcessHubFactory, WebSocketClientFactory,
};
pub use hubrun_protocol as protocol;
pub use negotiator::{ConnectionOutcome, HubTarget, default_hub_url, negotiate};
pub use orchestrator::{BatchOrchestrator, RunSummary};
pub use progress::{ProgressOutput, ProgressReporter};
pub use runner::{RunOptions, ServerOptions, run_batch, start_server};
pub use waiter::{AgentGate, wait_for_agents};
