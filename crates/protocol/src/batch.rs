//! Batch submission payload.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Identifier a hub assigns to an attached agent (usually a browser label).
pub type AgentId = String;

/// A set of test files submitted to every dispatched agent.
///
/// Built once per run and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
	/// Directory the test paths are relative to.
	pub basedir: PathBuf,
	/// Test files in submission order.
	pub tests: Vec<PathBuf>,
}

impl BatchRequest {
	pub fn new(basedir: impl Into<PathBuf>, tests: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
		Self {
			basedir: basedir.into(),
			tests: tests.into_iter().map(Into::into).collect(),
		}
	}

	/// Number of test files in the batch.
	pub fn len(&self) -> usize {
		self.tests.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tests.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn serializes_with_basedir_and_tests() {
		let request = BatchRequest::new("/work", ["a.html", "b.html"]);
		let value = serde_json::to_value(&request).unwrap();
		assert_eq!(value, serde_json::json!({ "basedir": "/work", "tests": ["a.html", "b.html"] }));
		assert_eq!(request.len(), 2);
	}
}
