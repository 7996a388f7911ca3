//! Tool dispatcher - maps tool calls onto the registry, invoker, engine and fan-out
//!
//! 응답은 모두 JSON 값입니다. 실행 실패는 `{"error", "type"}` 형태의 정상 응답으로,
//! 필수 인자 누락이나 타입 오류만 `Err(Error::InvalidInput)`으로 반환합니다.

use crate::tools::{
    tool_definitions, ToolDefinition, ADD_TOOL, GET_RUN_STATUS, LIST_TOOLS, RUN_MULTI_TOOLS,
    RUN_TOOL,
};
use relay_foundation::{
    Error, RelayConfig, Result, SessionManager, SkipFlagPosition, TargetConfig, TargetRegistry,
};
use relay_task::{
    fan_out, probe_targets, CancellationToken, EngineError, FanOutRequest, FileInvoker,
    InvocationError, InvocationRequest, Invoker, TaskEngine, TaskEngineConfig, TaskId,
};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tool call front-end
#[derive(Clone)]
pub struct ToolServer {
    registry: Arc<TargetRegistry>,
    invoker: Arc<dyn Invoker>,
    engine: TaskEngine,
}

impl ToolServer {
    pub fn new(registry: Arc<TargetRegistry>, invoker: Arc<dyn Invoker>, engine: TaskEngine) -> Self {
        Self {
            registry,
            invoker,
            engine,
        }
    }

    /// Wire a file-based invoker and a (stopped) engine from configuration
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        let registry = Arc::new(TargetRegistry::from_config(config)?);
        let sessions = Arc::new(SessionManager::new());

        let mut invoker = FileInvoker::new(Arc::clone(&registry), sessions);
        if let Some(dir) = &config.temp_dir {
            invoker = invoker.with_temp_dir(dir);
        }

        let engine = TaskEngine::new(TaskEngineConfig::from(&config.engine));
        Ok(Self::new(registry, Arc::new(invoker), engine))
    }

    pub fn registry(&self) -> &Arc<TargetRegistry> {
        &self.registry
    }

    pub fn engine(&self) -> &TaskEngine {
        &self.engine
    }

    pub fn invoker(&self) -> &Arc<dyn Invoker> {
        &self.invoker
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        tool_definitions()
    }

    /// Dispatch one tool call
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value> {
        debug!("Tool call: {}", name);
        let args = match arguments {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };

        match name {
            LIST_TOOLS => self.list_tools(&args).await,
            RUN_TOOL => self.run_tool(&args).await,
            GET_RUN_STATUS => self.get_run_status(&args),
            ADD_TOOL => self.add_tool(&args),
            RUN_MULTI_TOOLS => self.run_multi_tools(&args).await,
            other => {
                warn!("Unknown tool requested: {}", other);
                Ok(json!({
                    "error": format!("Unknown tool: {}", other),
                    "type": "UnknownTool",
                }))
            }
        }
    }

    // ========================================================================
    // Handlers
    // ========================================================================

    async fn list_tools(&self, args: &Value) -> Result<Value> {
        let probe = optional_bool(args, "probe")?.unwrap_or(false);
        let clis = probe_targets(&self.registry, probe).await;
        Ok(json!({ "clis": clis }))
    }

    async fn run_tool(&self, args: &Value) -> Result<Value> {
        let request = invocation_request(args)?;
        let run_async = optional_bool(args, "run_async")?.unwrap_or(false);

        if run_async {
            return match self
                .engine
                .submit_invocation(Arc::clone(&self.invoker), request)
            {
                Ok(id) => {
                    info!("Started background task {}", id);
                    Ok(json!({ "task_id": id.to_string(), "status": "running" }))
                }
                Err(e) => Ok(json!({ "error": e.to_string(), "type": "EngineError" })),
            };
        }

        let result = self
            .invoker
            .invoke(&request, &CancellationToken::new())
            .await;
        Ok(match result {
            Ok(response) => json!({ "response": response }),
            Err(e) => error_body(&e),
        })
    }

    fn get_run_status(&self, args: &Value) -> Result<Value> {
        let raw = required_str(args, "task_id")?;
        let not_found = || {
            json!({
                "task_id": raw,
                "status": "not_found",
                "error": format!("Task not found: {}", raw),
            })
        };

        let Some(id) = TaskId::parse(raw) else {
            return Ok(not_found());
        };

        match self.engine.status(id) {
            Ok(view) => Ok(serde_json::to_value(view)?),
            Err(EngineError::NotFound(_)) => Ok(not_found()),
            Err(e) => Ok(json!({ "task_id": raw, "error": e.to_string(), "type": "EngineError" })),
        }
    }

    fn add_tool(&self, args: &Value) -> Result<Value> {
        let name = required_str(args, "name")?;
        let command = required_str(args, "command")?;

        let config = match target_config(command, args) {
            Ok(config) => config,
            Err(e) => return Ok(add_tool_error(&e)),
        };

        if let Err(e) = self.registry.add(name, config.clone()) {
            return Ok(add_tool_error(&e));
        }
        info!("Registered target '{}' ({})", name, command);

        let mut cli = serde_json::to_value(&config)?;
        if let Value::Object(map) = &mut cli {
            map.insert("name".to_string(), Value::String(name.to_string()));
        }

        Ok(json!({
            "success": true,
            "message": format!("Target '{}' registered", name),
            "cli": cli,
        }))
    }

    async fn run_multi_tools(&self, args: &Value) -> Result<Value> {
        let message = required_str(args, "message")?;
        let targets = match optional_strings(args, "cli_names")? {
            Some(names) => names,
            None => self.registry.names(),
        };

        let mut request = FanOutRequest::new(message, targets);
        request.system_prompt = optional_str(args, "system_prompt")?.map(str::to_string);
        request.timeout = optional_timeout(args)?;

        let responses = fan_out(
            Arc::clone(&self.invoker),
            &request,
            &CancellationToken::new(),
            self.engine.worker_permits(),
        )
        .await;
        Ok(json!({
            "prompt": message,
            "responses": responses,
        }))
    }
}

// ============================================================================
// Argument helpers
// ============================================================================

fn invocation_request(args: &Value) -> Result<InvocationRequest> {
    let target = required_str(args, "cli_name")?;
    let message = required_str(args, "message")?;

    let mut request = InvocationRequest::new(target, message);
    request.system_prompt = optional_str(args, "system_prompt")?.map(str::to_string);
    request.args = optional_strings(args, "args")?.unwrap_or_default();
    request.timeout = optional_timeout(args)?;
    request.skip_git_repo_check = optional_bool(args, "skip_git_repo_check")?.unwrap_or(true);

    if let Some(session_id) = optional_str(args, "session_id")? {
        let resume = optional_bool(args, "resume")?.unwrap_or(false);
        request = request.session(session_id, resume);
    }

    Ok(request)
}

fn target_config(command: &str, args: &Value) -> Result<TargetConfig> {
    let mut config = TargetConfig::new(command);

    if let Some(timeout) = optional_timeout(args)? {
        config = config.timeout(timeout);
    }
    if let Some(extra) = optional_strings(args, "extra_args")? {
        config = config.extra_args(extra);
    }
    if let Some(supported) = optional_strings(args, "supported_args")? {
        config = config.supported_args(supported);
    }
    if let Some(env) = optional_string_map(args, "env_vars")? {
        config.env_vars = env;
    }
    if let Some(supports) = optional_bool(args, "supports_skip_git_check")? {
        config.supports_skip_git_check = supports;
    }
    if let Some(position) = optional_str(args, "skip_git_check_position")? {
        config.skip_git_check_position = SkipFlagPosition::from_str(position).ok_or_else(|| {
            Error::InvalidInput(format!("Invalid skip_git_check_position: {}", position))
        })?;
    }

    Ok(config)
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    optional_str(args, key)?
        .ok_or_else(|| Error::InvalidInput(format!("Missing required parameter: {}", key)))
}

fn optional_str<'a>(args: &'a Value, key: &str) -> Result<Option<&'a str>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(wrong_type(key, "a string")),
    }
}

fn optional_bool(args: &Value, key: &str) -> Result<Option<bool>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(wrong_type(key, "a boolean")),
    }
}

fn optional_timeout(args: &Value) -> Result<Option<u64>> {
    match args.get("timeout") {
        None | Some(Value::Null) => Ok(None),
        Some(value) => match value.as_u64() {
            Some(secs) if secs > 0 => Ok(Some(secs)),
            _ => Err(wrong_type("timeout", "a positive integer")),
        },
    }
}

fn optional_strings(args: &Value, key: &str) -> Result<Option<Vec<String>>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| wrong_type(key, "an array of strings"))
            })
            .collect::<Result<Vec<_>>>()
            .map(Some),
        Some(_) => Err(wrong_type(key, "an array of strings")),
    }
}

fn optional_string_map(args: &Value, key: &str) -> Result<Option<BTreeMap<String, String>>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| {
                v.as_str()
                    .map(|v| (k.clone(), v.to_string()))
                    .ok_or_else(|| wrong_type(key, "an object of strings"))
            })
            .collect::<Result<BTreeMap<_, _>>>()
            .map(Some),
        Some(_) => Err(wrong_type(key, "an object of strings")),
    }
}

fn wrong_type(key: &str, expected: &str) -> Error {
    Error::InvalidInput(format!("Parameter '{}' must be {}", key, expected))
}

fn error_body(err: &InvocationError) -> Value {
    json!({ "error": err.to_string(), "type": err.kind() })
}

fn add_tool_error(err: &Error) -> Value {
    json!({ "error": err.to_string(), "type": "AddToolError" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_request_from_args() {
        let args = json!({
            "cli_name": "claude",
            "message": "hi",
            "system_prompt": "sys",
            "args": ["--model", "opus"],
            "timeout": 60,
            "session_id": "conv-1",
            "resume": true,
            "skip_git_repo_check": false
        });

        let request = invocation_request(&args).unwrap();
        assert_eq!(request.target, "claude");
        assert_eq!(request.system_prompt.as_deref(), Some("sys"));
        assert_eq!(request.args, vec!["--model", "opus"]);
        assert_eq!(request.timeout, Some(60));
        assert!(!request.skip_git_repo_check);
        let session = request.session.unwrap();
        assert_eq!(session.session_id, "conv-1");
        assert!(session.resume);
    }

    #[test]
    fn test_missing_and_mistyped_args() {
        assert!(matches!(
            invocation_request(&json!({"message": "hi"})),
            Err(Error::InvalidInput(msg)) if msg.contains("cli_name")
        ));
        assert!(matches!(
            invocation_request(&json!({"cli_name": "claude", "message": 5})),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            invocation_request(&json!({"cli_name": "c", "message": "m", "timeout": 0})),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            invocation_request(&json!({"cli_name": "c", "message": "m", "args": [1]})),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_target_config_from_args() {
        let config = target_config(
            "custom-gpt",
            &json!({
                "extra_args": ["--mode", "chat"],
                "timeout": 120,
                "env_vars": {"API_KEY": "secret"},
                "supports_skip_git_check": true,
                "skip_git_check_position": "after_extra_args"
            }),
        )
        .unwrap();

        assert_eq!(config.command, "custom-gpt");
        assert_eq!(config.timeout, 120);
        assert_eq!(config.extra_args, vec!["--mode", "chat"]);
        assert_eq!(config.env_vars["API_KEY"], "secret");
        assert!(config.supports_skip_git_check);
        assert_eq!(config.skip_git_check_position, SkipFlagPosition::AfterExtraArgs);

        assert!(target_config("x", &json!({"skip_git_check_position": "middle"})).is_err());
    }
}
