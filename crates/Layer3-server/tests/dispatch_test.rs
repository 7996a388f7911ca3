//! ToolServer 통합 테스트 - 스크립트된 Invoker로 도구 응답 형식 검증
//!
//! `cargo test -p relay-server --test dispatch_test`

use async_trait::async_trait;
use relay_foundation::{Error, SessionManager, TargetRegistry};
use relay_server::{serve, ToolServer};
use relay_task::{
    CancellationToken, FileInvoker, InvocationError, InvocationRequest, InvocationResult, Invoker,
    TaskEngine,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;

/// Answers by target name and counts calls
#[derive(Default)]
struct ScriptedInvoker {
    calls: AtomicUsize,
}

#[async_trait]
impl Invoker for ScriptedInvoker {
    async fn invoke(
        &self,
        request: &InvocationRequest,
        _cancel: &CancellationToken,
    ) -> InvocationResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match request.target.as_str() {
            "slow_cli" => Err(InvocationError::Timeout {
                target: "slow_cli".into(),
                secs: request.timeout.unwrap_or(300),
            }),
            "broken" => Err(InvocationError::ExecutionFailed(
                "CLI execution failed (code 1): boom".into(),
            )),
            "nonexistent" => Err(InvocationError::TargetNotFound(
                "CLI 'nonexistent' not found".into(),
            )),
            _ => match &request.system_prompt {
                Some(system) => Ok(format!("[{}] {}", system, request.prompt)),
                None => Ok(format!("Response from {}", request.target)),
            },
        }
    }
}

fn server() -> (ToolServer, Arc<ScriptedInvoker>) {
    let invoker = Arc::new(ScriptedInvoker::default());
    let engine = TaskEngine::default();
    engine.start().unwrap();
    let server = ToolServer::new(
        Arc::new(TargetRegistry::new()),
        Arc::clone(&invoker) as Arc<dyn Invoker>,
        engine,
    );
    (server, invoker)
}

#[tokio::test]
async fn test_list_tools_includes_builtins() {
    let (server, _) = server();
    let result = server.call_tool("list_tools", json!({})).await.unwrap();

    let clis = result["clis"].as_array().unwrap();
    let names: Vec<_> = clis.iter().map(|c| c["name"].as_str().unwrap()).collect();
    for builtin in ["claude", "gemini", "codex", "qwen"] {
        assert!(names.contains(&builtin));
    }
    for cli in clis {
        assert!(cli["command"].is_string());
        assert!(cli["installed"].is_boolean());
        assert!(cli["version"].is_null());
    }
}

#[tokio::test]
async fn test_run_tool_sync() {
    let (server, invoker) = server();
    let result = server
        .call_tool("run_tool", json!({"cli_name": "claude", "message": "Hello"}))
        .await
        .unwrap();

    assert_eq!(result, json!({"response": "Response from claude"}));
    assert_eq!(invoker.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_run_tool_passes_system_prompt() {
    let (server, _) = server();
    let result = server
        .call_tool(
            "run_tool",
            json!({
                "cli_name": "claude",
                "message": "Tell me a story",
                "system_prompt": "You are a storyteller"
            }),
        )
        .await
        .unwrap();
    assert_eq!(result["response"], "[You are a storyteller] Tell me a story");
}

#[tokio::test]
async fn test_run_tool_error_shapes() {
    let (server, _) = server();

    let result = server
        .call_tool("run_tool", json!({"cli_name": "slow_cli", "message": "x", "timeout": 7}))
        .await
        .unwrap();
    assert_eq!(result["type"], "Timeout");
    assert!(result["error"].as_str().unwrap().contains("7s"));

    let result = server
        .call_tool("run_tool", json!({"cli_name": "broken", "message": "x"}))
        .await
        .unwrap();
    assert_eq!(result["type"], "ExecutionFailed");
    assert!(result.get("response").is_none());
}

#[tokio::test]
async fn test_run_tool_missing_parameter_fails_fast() {
    let (server, invoker) = server();
    let err = server
        .call_tool("run_tool", json!({"cli_name": "claude"}))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidInput(msg) if msg.contains("message")));
    assert_eq!(invoker.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_run_async_then_poll() {
    let (server, _) = server();
    let started = server
        .call_tool(
            "run_tool",
            json!({"cli_name": "claude", "message": "Async Test", "run_async": true}),
        )
        .await
        .unwrap();

    assert_eq!(started["status"], "running");
    let task_id = started["task_id"].as_str().unwrap().to_string();

    let mut status = Value::Null;
    for _ in 0..100 {
        status = server
            .call_tool("get_run_status", json!({"task_id": task_id}))
            .await
            .unwrap();
        if status["status"] != "running" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(status["status"], "completed");
    assert_eq!(status["result"], "Response from claude");
    assert_eq!(status["task_id"], task_id.as_str());
}

#[tokio::test]
async fn test_run_async_failure_is_reported() {
    let (server, _) = server();
    let started = server
        .call_tool(
            "run_tool",
            json!({"cli_name": "broken", "message": "x", "run_async": true}),
        )
        .await
        .unwrap();
    let task_id = started["task_id"].as_str().unwrap().to_string();

    let id = relay_task::TaskId::parse(&task_id).unwrap();
    server
        .engine()
        .await_completion(id, Duration::from_secs(5))
        .await
        .unwrap();

    let status = server
        .call_tool("get_run_status", json!({"task_id": task_id}))
        .await
        .unwrap();
    assert_eq!(status["status"], "failed");
    assert_eq!(status["type"], "ExecutionFailed");
}

#[tokio::test]
async fn test_get_run_status_not_found() {
    let (server, _) = server();

    let result = server
        .call_tool("get_run_status", json!({"task_id": "invalid-id"}))
        .await
        .unwrap();
    assert_eq!(result["status"], "not_found");
    assert!(result["error"].is_string());

    let result = server
        .call_tool(
            "get_run_status",
            json!({"task_id": "6f1c2d3e-0000-4000-8000-000000000000"}),
        )
        .await
        .unwrap();
    assert_eq!(result["status"], "not_found");
}

#[tokio::test]
async fn test_add_tool_minimal_then_list() {
    let (server, _) = server();
    let result = server
        .call_tool("add_tool", json!({"name": "deepseek", "command": "deepseek"}))
        .await
        .unwrap();

    assert_eq!(result["success"], true);
    assert_eq!(result["message"], "Target 'deepseek' registered");
    assert_eq!(result["cli"]["name"], "deepseek");
    assert_eq!(result["cli"]["command"], "deepseek");
    assert_eq!(result["cli"]["timeout"], 300);

    let list = server.call_tool("list_tools", Value::Null).await.unwrap();
    let names: Vec<_> = list["clis"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap().to_string())
        .collect();
    assert!(names.contains(&"deepseek".to_string()));
}

#[tokio::test]
async fn test_add_tool_full_options() {
    let (server, _) = server();
    let result = server
        .call_tool(
            "add_tool",
            json!({
                "name": "custom_gpt",
                "command": "custom-gpt",
                "extra_args": ["--mode", "chat"],
                "timeout": 120,
                "env_vars": {"API_KEY": "secret"},
                "supports_skip_git_check": true,
                "skip_git_check_position": "after_extra_args"
            }),
        )
        .await
        .unwrap();

    assert_eq!(result["success"], true);
    assert_eq!(result["cli"]["timeout"], 120);
    assert_eq!(result["cli"]["skip_git_check_position"], "after_extra_args");

    let config = server.registry().resolve("custom_gpt").unwrap();
    assert_eq!(config.extra_args, vec!["--mode", "chat"]);
}

#[tokio::test]
async fn test_add_tool_rejects_invalid() {
    let (server, _) = server();

    let result = server
        .call_tool("add_tool", json!({"name": "bad_cli", "command": "   "}))
        .await
        .unwrap();
    assert_eq!(result["type"], "AddToolError");

    let result = server
        .call_tool(
            "add_tool",
            json!({"name": "bad_pos", "command": "x", "skip_git_check_position": "middle"}),
        )
        .await
        .unwrap();
    assert_eq!(result["type"], "AddToolError");
    assert!(!server.registry().contains("bad_pos"));
}

#[tokio::test]
async fn test_unknown_tool() {
    let (server, _) = server();
    let result = server
        .call_tool("nonexistent_tool", json!({}))
        .await
        .unwrap();
    assert_eq!(result["type"], "UnknownTool");
    assert_eq!(result["error"], "Unknown tool: nonexistent_tool");
}

#[tokio::test]
async fn test_run_multi_tools_default_all() {
    let (server, invoker) = server();
    let result = server
        .call_tool("run_multi_tools", json!({"message": "Review this code"}))
        .await
        .unwrap();

    assert_eq!(result["prompt"], "Review this code");
    let responses = result["responses"].as_object().unwrap();
    assert_eq!(responses.len(), 4);
    assert_eq!(invoker.calls.load(Ordering::SeqCst), 4);
    for response in responses.values() {
        assert_eq!(response["success"], true);
    }
}

#[tokio::test]
async fn test_run_multi_tools_mixed() {
    let (server, _) = server();
    let result = server
        .call_tool(
            "run_multi_tools",
            json!({
                "message": "ping",
                "cli_names": ["claude", "slow_cli", "nonexistent"],
                "timeout": 60
            }),
        )
        .await
        .unwrap();

    let responses = &result["responses"];
    assert_eq!(responses["claude"]["success"], true);
    assert_eq!(responses["claude"]["response"], "Response from claude");
    assert_eq!(responses["slow_cli"]["success"], false);
    assert_eq!(responses["slow_cli"]["type"], "Timeout");
    assert!(responses["slow_cli"]["error"].as_str().unwrap().contains("60s"));
    assert_eq!(responses["nonexistent"]["type"], "TargetNotFound");
}

#[tokio::test]
async fn test_run_multi_tools_empty_list() {
    let (server, _) = server();
    let result = server
        .call_tool("run_multi_tools", json!({"message": "ping", "cli_names": []}))
        .await
        .unwrap();
    assert_eq!(result["responses"], json!({}));
}

#[tokio::test]
async fn test_json_lines_session() {
    let (server, _) = server();
    let input = concat!(
        r#"{"id": 1, "tool": "run_tool", "arguments": {"cli_name": "claude", "message": "hi"}}"#,
        "\n",
        "\n",
        "not json\n",
        r#"{"id": "b", "tool": "run_tool", "arguments": {"cli_name": "claude"}}"#,
        "\n",
        r#"{"id": 3, "tool": "nope"}"#,
        "\n",
    );

    let (writer, mut output) = tokio::io::duplex(64 * 1024);
    serve(server.clone(), input.as_bytes(), writer).await.unwrap();

    let mut text = String::new();
    output.read_to_string(&mut text).await.unwrap();
    let responses: Vec<Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(responses.len(), 4);

    let by_id = |id: Value| responses.iter().find(|r| r["id"] == id).unwrap().clone();
    assert_eq!(by_id(json!(1))["result"]["response"], "Response from claude");
    assert!(by_id(json!("b"))["error"]
        .as_str()
        .unwrap()
        .contains("Missing required parameter"));
    assert_eq!(by_id(json!(3))["result"]["type"], "UnknownTool");
    assert!(by_id(Value::Null)["error"]
        .as_str()
        .unwrap()
        .starts_with("Parse error"));

    assert!(!server.engine().is_running());
}

#[cfg(unix)]
#[tokio::test]
async fn test_end_to_end_with_real_process() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(TargetRegistry::empty());
    let invoker = FileInvoker::new(Arc::clone(&registry), Arc::new(SessionManager::new()))
        .with_temp_dir(dir.path());
    let engine = TaskEngine::default();
    engine.start().unwrap();
    let server = ToolServer::new(registry, Arc::new(invoker), engine);

    let added = server
        .call_tool("add_tool", json!({"name": "echo", "command": "cat"}))
        .await
        .unwrap();
    assert_eq!(added["success"], true);

    let result = server
        .call_tool("run_tool", json!({"cli_name": "echo", "message": "round trip"}))
        .await
        .unwrap();
    assert_eq!(result["response"], "round trip");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
