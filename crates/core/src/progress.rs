//! Single-line progress display.
//!
//! The line is an `indicatif` spinner whose message is rebuilt from the
//! batch tally on every event. Other output goes through
//! [`ProgressReporter::suspend`] so the spinner never interleaves with it.

use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::aggregate::BatchAggregate;

/// Spinner frames; the trailing empty frame is shown once the bar finishes.
pub const SPINNER_FRAMES: [&str; 5] = ["|", "/", "-", "\\", ""];

const TEMPLATE: &str = "{spinner} {msg}";

/// Where the progress line is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressOutput {
	#[default]
	Hidden,
	Stdout,
	Stderr,
}

impl ProgressOutput {
	fn draw_target(self) -> ProgressDrawTarget {
		match self {
			ProgressOutput::Hidden => ProgressDrawTarget::hidden(),
			ProgressOutput::Stdout => ProgressDrawTarget::stdout(),
			ProgressOutput::Stderr => ProgressDrawTarget::stderr(),
		}
	}
}

/// Everything needed to render one progress message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
	pub current: u64,
	pub total: u64,
	pub heartbeats: u64,
	pub elapsed: Duration,
}

/// Integer percentage, 0 while the total is unknown.
pub fn percent_complete(current: u64, total: u64) -> u64 {
	if total == 0 { 0 } else { current.saturating_mul(100) / total }
}

/// Heartbeats per second, 0 before any time has elapsed.
pub fn throughput(heartbeats: u64, elapsed: Duration) -> f64 {
	let ms = elapsed.as_millis();
	if ms == 0 { 0.0 } else { heartbeats as f64 * 1000.0 / ms as f64 }
}

/// Renders the message shown after the spinner.
pub fn render_progress(snapshot: &ProgressSnapshot) -> String {
	format!(
		"{}% {}/{} ({:.2} tests/sec)",
		percent_complete(snapshot.current, snapshot.total),
		snapshot.current,
		snapshot.total,
		throughput(snapshot.heartbeats, snapshot.elapsed),
	)
}

fn spinner_style() -> ProgressStyle {
	ProgressStyle::with_template(TEMPLATE)
		.unwrap_or_else(|_| ProgressStyle::default_spinner())
		.tick_strings(&SPINNER_FRAMES)
}

/// Progress line for one batch: spinner, heartbeat count and run clock.
#[derive(Debug)]
pub struct ProgressReporter {
	bar: ProgressBar,
	started: Instant,
	heartbeats: u64,
}

impl ProgressReporter {
	pub fn new(started: Instant, output: ProgressOutput) -> Self {
		let bar = ProgressBar::with_draw_target(None, output.draw_target());
		bar.set_style(spinner_style());
		Self {
			bar,
			started,
			heartbeats: 0,
		}
	}

	pub fn beat(&mut self) {
		self.heartbeats = self.heartbeats.saturating_add(1);
	}

	pub fn heartbeats(&self) -> u64 {
		self.heartbeats
	}

	/// Message of the most recent frame, empty before the first one.
	pub fn message(&self) -> String {
		self.bar.message()
	}

	pub fn is_finished(&self) -> bool {
		self.bar.is_finished()
	}

	pub fn snapshot(&self, aggregate: &BatchAggregate, now: Instant) -> ProgressSnapshot {
		ProgressSnapshot {
			current: aggregate.current_index,
			total: aggregate.total_expected,
			heartbeats: self.heartbeats,
			elapsed: now.saturating_duration_since(self.started),
		}
	}

	/// Refreshes the message and advances the spinner one frame.
	pub fn draw(&self, aggregate: &BatchAggregate) {
		self.bar.set_message(render_progress(&self.snapshot(aggregate, Instant::now())));
		self.bar.tick();
	}

	/// Hides the line while `f` writes, then redraws it.
	pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
		self.bar.suspend(f)
	}

	/// Leaves a final frame on screen.
	pub fn finish(&self, aggregate: &BatchAggregate) {
		self.bar
			.finish_with_message(render_progress(&self.snapshot(aggregate, Instant::now())));
	}

	/// Removes the line without a final frame.
	pub fn abandon(&self) {
		self.bar.finish_and_clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn snapshot(current: u64, total: u64, heartbeats: u64, elapsed_ms: u64) -> ProgressSnapshot {
		ProgressSnapshot {
			current,
			total,
			heartbeats,
			elapsed: Duration::from_millis(elapsed_ms),
		}
	}

	#[test]
	fn renders_percent_counts_and_rate() {
		assert_eq!(render_progress(&snapshot(3, 6, 6, 2000)), "50% 3/6 (3.00 tests/sec)");
	}

	#[test]
	fn unknown_total_is_zero_percent() {
		assert_eq!(render_progress(&snapshot(0, 0, 0, 0)), "0% 0/0 (0.00 tests/sec)");
	}

	#[test]
	fn percent_truncates() {
		assert_eq!(percent_complete(1, 3), 33);
		assert_eq!(percent_complete(3, 3), 100);
	}

	#[test]
	fn draw_sets_the_message_from_the_tally() {
		let mut aggregate = BatchAggregate::new(2);
		aggregate.dispatched(2);
		let reporter = ProgressReporter::new(Instant::now(), ProgressOutput::Hidden);
		assert!(reporter.message().is_empty());

		reporter.draw(&aggregate);
		assert!(reporter.message().starts_with("0% 0/4 "), "unexpected message: {:?}", reporter.message());
	}

	#[test]
	fn finish_keeps_the_final_frame() {
		let aggregate = BatchAggregate::new(1);
		let reporter = ProgressReporter::new(Instant::now(), ProgressOutput::Hidden);
		reporter.finish(&aggregate);
		assert!(reporter.is_finished());
		assert!(reporter.message().starts_with("0% 0/1 "));
	}

	#[test]
	fn suspend_returns_the_closure_result() {
		let reporter = ProgressReporter::new(Instant::now(), ProgressOutput::Hidden);
		assert_eq!(reporter.suspend(|| 7), 7);
	}

	#[test]
	fn beats_are_counted() {
		let mut reporter = ProgressReporter::new(Instant::now(), ProgressOutput::Hidden);
		reporter.beat();
		reporter.beat();
		assert_eq!(reporter.heartbeats(), 2);
	}
}
