//! Batch event handling.
//!
//! [`BatchOrchestrator`] consumes the hub's event stream for one batch,
//! keeps the [`BatchAggregate`] and progress line current, prints failures
//! and diagnostics as they arrive, and produces a [`RunSummary`] once the
//! hub reports completion.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use colored::Colorize;
use hubrun_protocol::{AgentFault, AgentId, AgentNotification, AgentOutcome, BatchEvent, BatchRequest, ScriptError};
use hubrun_runtime::{BatchReceiver, NotificationReceiver};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregate::{BatchAggregate, RunVerdict};
use crate::error::{Result, RunError};
use crate::progress::{ProgressOutput, ProgressReporter};
use crate::waiter::announce;
use crate::walker::write_failures;

/// Final state of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
	pub verdict: RunVerdict,
	pub passed: u64,
	pub failed: u64,
	/// Agent results received.
	pub completed: u64,
	pub total_expected: u64,
	pub agents: Vec<AgentId>,
	#[serde(rename = "durationMs", serialize_with = "as_millis")]
	pub duration: Duration,
}

impl RunSummary {
	pub fn exit_code(&self) -> i32 {
		self.verdict.exit_code()
	}
}

fn as_millis<S: serde::Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
	serializer.serialize_u64(duration.as_millis() as u64)
}

fn tests(count: u64) -> String {
	if count == 1 { "1 test".to_string() } else { format!("{count} tests") }
}

/// Drives one batch from submission to completion.
pub struct BatchOrchestrator<W: Write> {
	aggregate: BatchAggregate,
	progress: ProgressReporter,
	agents: Vec<AgentId>,
	test_files: usize,
	started: Instant,
	out: W,
}

impl<W: Write> BatchOrchestrator<W> {
	/// Orchestrator whose progress line is not drawn anywhere.
	pub fn new(request: &BatchRequest, out: W) -> Self {
		Self::with_progress(request, out, ProgressOutput::Hidden)
	}

	pub fn with_progress(request: &BatchRequest, out: W, progress: ProgressOutput) -> Self {
		let started = Instant::now();
		Self {
			aggregate: BatchAggregate::new(request.len()),
			progress: ProgressReporter::new(started, progress),
			agents: Vec::new(),
			test_files: request.len(),
			started,
			out,
		}
	}

	pub fn aggregate(&self) -> &BatchAggregate {
		&self.aggregate
	}

	pub fn progress(&self) -> &ProgressReporter {
		&self.progress
	}

	pub fn into_output(self) -> W {
		self.out
	}

	/// Consumes events until completion.
	///
	/// Pending agent notifications are printed before the next event. A stream that ends
	/// without a `complete` event fails with [`RunError::BatchInterrupted`].
	pub async fn drive(&mut self, mut events: BatchReceiver, mut notifications: Option<NotificationReceiver>) -> Result<RunSummary> {
		loop {
			tokio::select! {
				biased;
				Some(notification) = next_notification(&mut notifications) => self.notify(&notification)?,
				event = events.recv() => match event {
					Some(event) => {
						if let Some(summary) = self.handle(event)? {
							return Ok(summary);
						}
					}
					None => {
						self.progress.abandon();
						return Err(RunError::BatchInterrupted);
					}
				},
			}
		}
	}

	/// Prints an agent connect/disconnect notification.
	pub fn notify(&mut self, notification: &AgentNotification) -> Result<()> {
		self.emit(|out| announce(out, notification))
	}

	/// Writes to the output with the progress line hidden.
	fn emit<F>(&mut self, write: F) -> Result<()>
	where
		F: FnOnce(&mut W) -> io::Result<()>,
	{
		let out = &mut self.out;
		self.progress.suspend(|| write(out))?;
		Ok(())
	}

	/// Applies one event. Returns the summary once the batch is complete.
	pub fn handle(&mut self, event: BatchEvent) -> Result<Option<RunSummary>> {
		debug!(target = "hubrun.batch", event = event.name(), agent = ?event.agent(), "batch event");

		match event {
			BatchEvent::Dispatch { agents } => self.on_dispatch(agents)?,
			BatchEvent::AgentResult(outcome) => self.on_result(&outcome)?,
			BatchEvent::AgentScriptError { agent, error } => self.on_script_error(&agent, &error)?,
			BatchEvent::AgentError { agent, error } => self.on_agent_error(&agent, &error)?,
			BatchEvent::AgentProgress { .. } => self.progress.draw(&self.aggregate),
			BatchEvent::AgentBeat { .. } => {
				self.progress.beat();
				self.progress.draw(&self.aggregate);
			}
			BatchEvent::AgentComplete { agent } => {
				info!(target = "hubrun.batch", agent = %agent, "agent finished");
			}
			BatchEvent::Complete => return self.on_complete().map(Some),
		}

		Ok(None)
	}

	fn on_dispatch(&mut self, agents: Vec<AgentId>) -> Result<()> {
		if agents.is_empty() {
			self.progress.abandon();
			return Err(RunError::EmptyDispatch);
		}

		self.aggregate.dispatched(agents.len());
		info!(
			target = "hubrun.batch",
			agents = agents.len(),
			total = self.aggregate.total_expected,
			"batch dispatched"
		);
		let files = self.test_files;
		self.emit(|out| writeln!(out, "Running {} file(s) on {}", files, agents.join(", ")))?;
		self.agents = agents;
		Ok(())
	}

	fn on_result(&mut self, outcome: &AgentOutcome) -> Result<()> {
		self.aggregate.record(outcome);
		info!(
			target = "hubrun.batch",
			agent = %outcome.agent,
			passed = outcome.passed,
			failed = outcome.failed,
			"agent result"
		);

		if outcome.failed > 0 {
			self.emit(|out| {
				writeln!(
					out,
					"{} {}: {} failed, {} passed",
					"✗".red(),
					outcome.agent.bold(),
					outcome.failed,
					outcome.passed
				)?;
				write_failures(out, &outcome.results).map(drop)
			})?;
		}

		self.progress.draw(&self.aggregate);
		Ok(())
	}

	fn on_script_error(&mut self, agent: &str, error: &ScriptError) -> Result<()> {
		warn!(target = "hubrun.batch", agent, url = %error.url, line = error.line, "script error: {}", error.message);
		self.emit(|out| {
			writeln!(
				out,
				"{} on {}: {}\n    at {}:{}",
				"Script error".red().bold(),
				agent,
				error.message,
				error.url,
				error.line
			)
		})
	}

	fn on_agent_error(&mut self, agent: &str, error: &AgentFault) -> Result<()> {
		warn!(target = "hubrun.batch", agent, "agent error: {}", error.message);
		self.emit(|out| writeln!(out, "{} on {}: {}", "Agent error".red().bold(), agent, error.message))
	}

	fn on_complete(&mut self) -> Result<RunSummary> {
		self.progress.finish(&self.aggregate);

		let duration = self.started.elapsed();
		let summary = RunSummary {
			verdict: self.aggregate.verdict(),
			passed: self.aggregate.passed,
			failed: self.aggregate.failed,
			completed: self.aggregate.current_index,
			total_expected: self.aggregate.total_expected,
			agents: self.agents.clone(),
			duration,
		};

		let seconds = duration.as_secs_f64();
		match summary.verdict {
			RunVerdict::Passed => writeln!(
				self.out,
				"{} {} passed ({seconds:.2}s)",
				"✔".green(),
				tests(summary.passed)
			)?,
			RunVerdict::Failed => writeln!(
				self.out,
				"{} {} of {} failed ({seconds:.2}s)",
				"✘".red(),
				summary.failed,
				tests(summary.passed + summary.failed)
			)?,
		}
		self.out.flush()?;

		info!(
			target = "hubrun.batch",
			passed = summary.passed,
			failed = summary.failed,
			elapsed_ms = duration.as_millis() as u64,
			"batch complete"
		);
		Ok(summary)
	}
}

/// Next notification, or a future that never resolves once the stream is gone.
async fn next_notification(slot: &mut Option<NotificationReceiver>) -> Option<AgentNotification> {
	let Some(rx) = slot else {
		return std::future::pending().await;
	};
	let next = rx.recv().await;
	if next.is_none() {
		*slot = None;
	}
	next
}

#[cfg(test)]
mod tests {
	use hubrun_protocol::ResultNode;
	use serde_json::json;
	use tokio::sync::mpsc;

	use super::*;

	fn orchestrator(files: &[&str]) -> BatchOrchestrator<Vec<u8>> {
		colored::control::set_override(false);
		BatchOrchestrator::new(&BatchRequest::new("/tests", files.iter().copied()), Vec::new())
	}

	fn result(agent: &str, passed: u64, failed: u64) -> BatchEvent {
		BatchEvent::AgentResult(AgentOutcome {
			agent: agent.into(),
			passed,
			failed,
			results: ResultNode::default(),
		})
	}

	#[test]
	fn dispatch_sets_expected_total() {
		let mut run = orchestrator(&["a.html", "b.html", "c.html"]);
		run.handle(BatchEvent::Dispatch {
			agents: vec!["chrome".into(), "firefox".into()],
		})
		.unwrap();
		assert_eq!(run.aggregate().total_expected, 6);
	}

	#[test]
	fn empty_dispatch_is_fatal() {
		let mut run = orchestrator(&["a.html"]);
		let err = run.handle(BatchEvent::Dispatch { agents: Vec::new() }).unwrap_err();
		assert!(matches!(err, RunError::EmptyDispatch));
	}

	#[test]
	fn beats_feed_the_progress_line() {
		let mut run = orchestrator(&["a.html"]);
		run.handle(BatchEvent::Dispatch {
			agents: vec!["chrome".into()],
		})
		.unwrap();
		run.handle(BatchEvent::AgentBeat { agent: "chrome".into() }).unwrap();
		run.handle(BatchEvent::AgentProgress { agent: "chrome".into() }).unwrap();

		assert_eq!(run.progress().heartbeats(), 1);
		let message = run.progress().message();
		assert!(message.starts_with("0% 0/1 "), "unexpected progress: {message:?}");
	}

	#[test]
	fn progress_before_dispatch_counts_test_files() {
		let mut run = orchestrator(&["a.html", "b.html", "c.html"]);
		run.handle(BatchEvent::AgentProgress { agent: "chrome".into() }).unwrap();

		let message = run.progress().message();
		assert!(message.starts_with("0% 0/3 "), "unexpected progress: {message:?}");
	}

	#[test]
	fn complete_without_results_still_finishes_the_progress_line() {
		let mut run = orchestrator(&["a.html", "b.html"]);
		run.handle(BatchEvent::Dispatch {
			agents: vec!["chrome".into()],
		})
		.unwrap();
		let summary = run.handle(BatchEvent::Complete).unwrap().unwrap();

		assert_eq!(summary.completed, 0);
		assert!(run.progress().is_finished());
		let message = run.progress().message();
		assert!(message.starts_with("0% 0/2 "), "unexpected progress: {message:?}");
	}

	#[test]
	fn complete_reports_tally() {
		let mut run = orchestrator(&["a.html"]);
		run.handle(BatchEvent::Dispatch {
			agents: vec!["chrome".into(), "firefox".into()],
		})
		.unwrap();
		assert!(run.handle(result("chrome", 2, 1)).unwrap().is_none());
		assert!(run.handle(result("firefox", 3, 0)).unwrap().is_none());

		let summary = run.handle(BatchEvent::Complete).unwrap().unwrap();
		assert_eq!(summary.verdict, RunVerdict::Failed);
		assert_eq!((summary.passed, summary.failed, summary.completed), (5, 1, 2));
		assert_eq!(summary.exit_code(), 1);

		let text = String::from_utf8(run.into_output()).unwrap();
		assert!(text.contains("1 of 6 tests failed"), "unexpected output: {text:?}");
	}

	#[test]
	fn script_errors_are_printed_with_location() {
		let mut run = orchestrator(&["a.html"]);
		let event: BatchEvent = serde_json::from_value(json!({
			"event": "agentScriptError",
			"agent": "safari",
			"error": { "message": "ReferenceError: x is not defined", "url": "a.js", "line": 3 }
		}))
		.unwrap();
		run.handle(event).unwrap();

		let text = String::from_utf8(run.into_output()).unwrap();
		assert!(text.contains("Script error on safari: ReferenceError: x is not defined"));
		assert!(text.contains("at a.js:3"));
	}

	#[test]
	fn summary_serializes_duration_in_millis() {
		let summary = RunSummary {
			verdict: RunVerdict::Passed,
			passed: 6,
			failed: 0,
			completed: 2,
			total_expected: 6,
			agents: vec!["chrome".into()],
			duration: Duration::from_millis(1500),
		};
		let value = serde_json::to_value(&summary).unwrap();
		assert_eq!(value["durationMs"], 1500);
		assert_eq!(value["verdict"], "passed");
		assert_eq!(value["totalExpected"], 6);
	}

	#[tokio::test]
	async fn stream_ending_early_is_interrupted() {
		let (tx, rx) = mpsc::unbounded_channel();
		tx.send(BatchEvent::Dispatch {
			agents: vec!["chrome".into()],
		})
		.unwrap();
		drop(tx);

		let mut run = orchestrator(&["a.html"]);
		let err = run.drive(rx, None).await.unwrap_err();
		assert!(matches!(err, RunError::BatchInterrupted));
	}

	#[tokio::test]
	async fn notifications_are_announced_while_driving() {
		let (notify_tx, notify_rx) = mpsc::unbounded_channel();
		notify_tx.send(AgentNotification::Connected("edge".into())).unwrap();
		drop(notify_tx);

		let (tx, rx) = mpsc::unbounded_channel();
		let mut run = orchestrator(&["a.html"]);
		let driver = async move {
			let summary = run.drive(rx, Some(notify_rx)).await;
			(summary, run)
		};
		let feeder = async {
			tokio::task::yield_now().await;
			tx.send(BatchEvent::Dispatch {
				agents: vec!["edge".into()],
			})
			.unwrap();
			tx.send(result("edge", 1, 0)).unwrap();
			tx.send(BatchEvent::Complete).unwrap();
		};
		let ((summary, run), ()) = tokio::join!(driver, feeder);

		assert_eq!(summary.unwrap().verdict, RunVerdict::Passed);
		let text = String::from_utf8(run.into_output()).unwrap();
		assert!(text.contains("Agent connected: edge"));
		assert!(text.contains("1 test passed"));
	}
}
