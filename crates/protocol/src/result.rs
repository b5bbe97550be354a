//! Per-agent test results.
//!
//! Agents report a nested tree of suites and tests. The payload carries no
//! type tags: a node is a finished test when it has the shape of one, and a
//! suite otherwise. That decision is made once, while decoding, so consumers
//! only ever match on [`ResultNode`].

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::batch::AgentId;

/// Keys whose joint presence marks an object as a finished test.
pub const TEST_SHAPE_KEYS: [&str; 3] = ["name", "result", "message"];

/// Returns true when `object` has the shape of a finished test result.
pub fn looks_like_test(object: &Map<String, Value>) -> bool {
	TEST_SHAPE_KEYS.iter().all(|key| object.contains_key(*key))
}

/// Outcome of a single test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestStatus {
	Pass,
	Fail,
	/// Any other status string an agent reports (skipped, todo, ...).
	Other(String),
}

impl TestStatus {
	fn parse(raw: &str) -> Self {
		match raw {
			"pass" | "passed" => TestStatus::Pass,
			"fail" | "failed" => TestStatus::Fail,
			other => TestStatus::Other(other.to_string()),
		}
	}

	pub fn as_str(&self) -> &str {
		match self {
			TestStatus::Pass => "pass",
			TestStatus::Fail => "fail",
			TestStatus::Other(raw) => raw,
		}
	}
}

/// A leaf of the result tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
	pub name: String,
	pub result: TestStatus,
	/// Failure message; may span several lines, empty for passing tests.
	pub message: String,
}

impl TestResult {
	pub fn is_failure(&self) -> bool {
		self.result == TestStatus::Fail
	}

	fn from_object(object: &Map<String, Value>) -> Self {
		Self {
			name: text_of(object.get("name")),
			result: TestStatus::parse(&text_of(object.get("result"))),
			message: text_of(object.get("message")),
		}
	}
}

fn text_of(value: Option<&Value>) -> String {
	match value {
		None | Some(Value::Null) => String::new(),
		Some(Value::String(s)) => s.clone(),
		Some(other) => other.to_string(),
	}
}

/// A node of an agent's result tree.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "Value")]
pub enum ResultNode {
	/// A finished test.
	Test(TestResult),
	/// Named children in payload order.
	Suite(Vec<(String, ResultNode)>),
}

impl Default for ResultNode {
	fn default() -> Self {
		ResultNode::Suite(Vec::new())
	}
}

impl From<Value> for ResultNode {
	fn from(value: Value) -> Self {
		match value {
			Value::Object(object) if looks_like_test(&object) => ResultNode::Test(TestResult::from_object(&object)),
			Value::Object(object) => ResultNode::Suite(
				object
					.into_iter()
					.filter(|(_, child)| is_node(child))
					.map(|(name, child)| (name, ResultNode::from(child)))
					.collect(),
			),
			Value::Array(items) => ResultNode::Suite(
				items
					.into_iter()
					.enumerate()
					.filter(|(_, child)| is_node(child))
					.map(|(index, child)| (index.to_string(), ResultNode::from(child)))
					.collect(),
			),
			// scalars carry no tests
			_ => ResultNode::default(),
		}
	}
}

fn is_node(value: &Value) -> bool {
	value.is_object() || value.is_array()
}

impl Serialize for ResultNode {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		match self {
			ResultNode::Test(test) => {
				let mut map = serializer.serialize_map(Some(3))?;
				map.serialize_entry("name", &test.name)?;
				map.serialize_entry("result", test.result.as_str())?;
				map.serialize_entry("message", &test.message)?;
				map.end()
			}
			ResultNode::Suite(children) => {
				let mut map = serializer.serialize_map(Some(children.len()))?;
				for (name, child) in children {
					map.serialize_entry(name, child)?;
				}
				map.end()
			}
		}
	}
}

/// Summary an agent reports after running the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentOutcome {
	pub agent: AgentId,
	#[serde(default)]
	pub passed: u64,
	#[serde(default)]
	pub failed: u64,
	#[serde(default)]
	pub results: ResultNode,
}
