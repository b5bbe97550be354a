//! Failure rendering for agent result trees.
//!
//! Only failing leaves are shown. Each is printed under the name of the suite
//! that directly contains it, and consecutive failures from the same suite
//! share one heading:
//!
//! ```text
//!   math
//!     ✗ adds numbers
//!       expected 4
//!         at math.test.js:12
//! ```

use std::io::{self, Write};

use colored::Colorize;
use hubrun_protocol::ResultNode;

/// A failing test located in a result tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailedTest<'a> {
	/// Key of the suite mapping holding the test; `None` at the root.
	pub suite: Option<&'a str>,
	pub name: &'a str,
	pub message: &'a str,
}

/// Collects failing tests depth-first, in payload order.
pub fn failing_tests(root: &ResultNode) -> Vec<FailedTest<'_>> {
	let mut found = Vec::new();
	collect(root, None, &mut found);
	found
}

fn collect<'a>(node: &'a ResultNode, suite: Option<&'a str>, found: &mut Vec<FailedTest<'a>>) {
	match node {
		ResultNode::Test(test) => {
			if test.is_failure() {
				found.push(FailedTest {
					suite,
					name: &test.name,
					message: &test.message,
				});
			}
		}
		ResultNode::Suite(children) => {
			for (key, child) in children {
				let owner = match child {
					ResultNode::Test(_) => suite,
					ResultNode::Suite(_) => Some(key.as_str()),
				};
				collect(child, owner, found);
			}
		}
	}
}

/// Writes a block for every failing test under `root`.
///
/// Returns the number of failures written.
pub fn write_failures<W: Write>(out: &mut W, root: &ResultNode) -> io::Result<usize> {
	let failures = failing_tests(root);
	let mut heading: Option<&str> = None;

	for failure in &failures {
		if let Some(suite) = failure.suite {
			if heading != Some(suite) {
				writeln!(out, "  {}", suite.bold())?;
				heading = Some(suite);
			}
		}

		writeln!(out, "    {} {}", "✗".red(), failure.name)?;
		let mut lines = failure.message.lines();
		if let Some(first) = lines.next() {
			writeln!(out, "      {first}")?;
		}
		for line in lines {
			writeln!(out, "        {line}")?;
		}
	}

	Ok(failures.len())
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn render(payload: serde_json::Value) -> String {
		colored::control::set_override(false);
		let mut out = Vec::new();
		write_failures(&mut out, &ResultNode::from(payload)).unwrap();
		String::from_utf8(out).unwrap()
	}

	#[test]
	fn multi_line_message_is_indented_under_suite() {
		let text = render(json!({
			"math.html": {
				"math": {
					"adds": { "name": "adds", "result": "pass", "message": "" },
					"divides": { "name": "divides by zero", "result": "fail", "message": "expected Infinity\nat math.js:4" },
				}
			}
		}));

		assert_eq!(text, "  math\n    ✗ divides by zero\n      expected Infinity\n        at math.js:4\n");
	}

	#[test]
	fn suite_heading_printed_once_per_run_of_failures() {
		let text = render(json!({
			"a": {
				"one": { "name": "one", "result": "fail", "message": "x" },
				"two": { "name": "two", "result": "fail", "message": "y" },
			},
			"b": {
				"three": { "name": "three", "result": "fail", "message": "z" },
			}
		}));

		assert_eq!(text.matches("  a\n").count(), 1);
		assert_eq!(text.matches("  b\n").count(), 1);
		assert!(text.find("✗ two").unwrap() < text.find("  b\n").unwrap());
	}

	#[test]
	fn nested_suites_use_innermost_name() {
		let tree = ResultNode::from(json!({
			"outer": {
				"inner": {
					"t": { "name": "t", "result": "fail", "message": "" }
				}
			}
		}));
		let failures = failing_tests(&tree);

		assert_eq!(failures.len(), 1);
		assert_eq!(failures[0].suite, Some("inner"));
	}

	#[test]
	fn passing_tree_renders_nothing() {
		assert_eq!(render(json!({ "s": { "t": { "name": "t", "result": "pass", "message": "" } } })), "");
	}

	#[test]
	fn root_level_failure_has_no_heading() {
		let text = render(json!({ "t": { "name": "lonely", "result": "failed", "message": "" } }));
		assert_eq!(text, "    ✗ lonely\n");
	}

	#[test]
	fn root_level_failure_does_not_repeat_the_previous_heading() {
		let text = render(json!({
			"x": { "a": { "one": { "name": "one", "result": "fail", "message": "" } } },
			"t": { "name": "lonely", "result": "fail", "message": "" },
			"y": { "a": { "two": { "name": "two", "result": "fail", "message": "" } } },
		}));

		assert_eq!(text, "  a\n    ✗ one\n    ✗ lonely\n    ✗ two\n");
	}
}
