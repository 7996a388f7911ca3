//! Tool definitions exposed by the server

use serde::Serialize;
use serde_json::{json, Value};

pub const LIST_TOOLS: &str = "list_tools";
pub const RUN_TOOL: &str = "run_tool";
pub const GET_RUN_STATUS: &str = "get_run_status";
pub const ADD_TOOL: &str = "add_tool";
pub const RUN_MULTI_TOOLS: &str = "run_multi_tools";

/// One callable tool with its JSON input schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// All tools, in a stable order
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: LIST_TOOLS,
            description: "List configured target CLIs and whether they are installed",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "probe": {
                        "type": "boolean",
                        "description": "Also run `<command> --version` for installed targets"
                    }
                }
            }),
        },
        ToolDefinition {
            name: RUN_TOOL,
            description: "Send a prompt to one target CLI, synchronously or as a background task",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "cli_name": {
                        "type": "string",
                        "description": "Target name (claude, gemini, codex, qwen, or a custom target)"
                    },
                    "message": {
                        "type": "string",
                        "description": "Prompt to send"
                    },
                    "system_prompt": {
                        "type": "string",
                        "description": "Optional system prompt"
                    },
                    "args": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Extra CLI args, filtered against the target's allow-list"
                    },
                    "timeout": {
                        "type": "integer",
                        "description": "Timeout in seconds (defaults to the target's timeout)"
                    },
                    "session_id": {
                        "type": "string",
                        "description": "Conversation id ([A-Za-z0-9_-], 1-128 chars)"
                    },
                    "resume": {
                        "type": "boolean",
                        "description": "Continue the conversation of session_id"
                    },
                    "skip_git_repo_check": {
                        "type": "boolean",
                        "description": "Allow running outside a git repository (default true)"
                    },
                    "run_async": {
                        "type": "boolean",
                        "description": "Return a task_id immediately instead of waiting"
                    }
                },
                "required": ["cli_name", "message"]
            }),
        },
        ToolDefinition {
            name: GET_RUN_STATUS,
            description: "Poll a background task started by run_tool",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "task_id": {
                        "type": "string",
                        "description": "Task id returned by run_tool"
                    }
                },
                "required": ["task_id"]
            }),
        },
        ToolDefinition {
            name: ADD_TOOL,
            description: "Register a custom target CLI for this server process",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Target name" },
                    "command": { "type": "string", "description": "Executable to run" },
                    "extra_args": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Base launch args"
                    },
                    "timeout": { "type": "integer", "description": "Timeout in seconds" },
                    "env_vars": {
                        "type": "object",
                        "additionalProperties": { "type": "string" },
                        "description": "Environment overrides"
                    },
                    "supported_args": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Allow-list for caller args"
                    },
                    "supports_skip_git_check": { "type": "boolean" },
                    "skip_git_check_position": {
                        "type": "string",
                        "enum": ["before_extra_args", "after_extra_args"]
                    }
                },
                "required": ["name", "command"]
            }),
        },
        ToolDefinition {
            name: RUN_MULTI_TOOLS,
            description: "Send the same prompt to several target CLIs concurrently",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "message": {
                        "type": "string",
                        "description": "Prompt to send to every target"
                    },
                    "cli_names": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Targets to call (defaults to all registered targets)"
                    },
                    "system_prompt": {
                        "type": "string",
                        "description": "Optional system prompt"
                    },
                    "timeout": {
                        "type": "integer",
                        "description": "Timeout in seconds for each target"
                    }
                },
                "required": ["message"]
            }),
        },
    ]
}
