//! Run-wide pass/fail tally.

use hubrun_protocol::AgentOutcome;
use serde::Serialize;

/// Overall verdict of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunVerdict {
	Passed,
	Failed,
}

impl RunVerdict {
	pub fn exit_code(self) -> i32 {
		match self {
			RunVerdict::Passed => 0,
			RunVerdict::Failed => 1,
		}
	}
}

/// Counters accumulated over one batch.
///
/// Totals only grow, and since every update is a sum the final state does
/// not depend on the order agents report in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchAggregate {
	pub passed: u64,
	pub failed: u64,
	/// Number of agent results received so far.
	pub current_index: u64,
	/// Test files, multiplied by the agent count once the batch is dispatched.
	pub total_expected: u64,
}

impl BatchAggregate {
	pub fn new(test_count: usize) -> Self {
		Self {
			total_expected: test_count as u64,
			..Self::default()
		}
	}

	/// Records the agent set the hub dispatched to.
	pub fn dispatched(&mut self, agent_count: usize) {
		self.total_expected = self.total_expected.saturating_mul(agent_count as u64);
	}

	/// Folds one agent's result into the tally.
	pub fn record(&mut self, outcome: &AgentOutcome) {
		self.passed = self.passed.saturating_add(outcome.passed);
		self.failed = self.failed.saturating_add(outcome.failed);
		self.current_index = self.current_index.saturating_add(1);
	}

	pub fn verdict(&self) -> RunVerdict {
		if self.failed > 0 { RunVerdict::Failed } else { RunVerdict::Passed }
	}
}
