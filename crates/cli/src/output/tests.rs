use super::*;

#[test]
fn result_builder_success() {
	let result: CommandResult<AgentsData> = ResultBuilder::new("agents")
		.data(AgentsData {
			hub: "ws://localhost:8124".into(),
			agents: vec!["chrome".into()],
		})
		.timings(Duration::from_millis(42).into())
		.build();

	assert!(result.ok);
	assert_eq!(result.command, "agents");
	assert!(result.error.is_none());

	let value = serde_json::to_value(&result).unwrap();
	assert_eq!(value["data"]["agents"][0], "chrome");
	assert_eq!(value["timings"]["durationMs"], 42);
}

#[test]
fn result_builder_error() {
	let result: CommandResult<()> = ResultBuilder::new("run")
		.error(CommandError {
			code: ErrorCode::BindConflict,
			message: "port 8124 is already in use".into(),
			details: None,
		})
		.build();

	assert!(!result.ok);
	assert!(result.data.is_none());

	let value = serde_json::to_value(&result).unwrap();
	assert_eq!(value["error"]["code"], "BIND_CONFLICT");
	assert!(value.get("data").is_none());
}

#[test]
fn error_code_display_matches_serialization() {
	for code in [ErrorCode::NoAgents, ErrorCode::EmptyDispatch, ErrorCode::InternalError] {
		assert_eq!(serde_json::to_value(code).unwrap(), code.to_string());
	}
}
