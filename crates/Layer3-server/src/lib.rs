//! # relay-server
//!
//! Tool front-end for relay:
//! - `tools` - 5개 도구 정의와 JSON 입력 스키마
//! - `dispatch` - `ToolServer::call_tool` (레지스트리, 호출기, 엔진, 팬아웃 연결)
//! - `stdio` - stdin/stdout JSON-lines 서버

pub mod dispatch;
pub mod stdio;
pub mod tools;

pub use dispatch::ToolServer;
pub use stdio::{handle_line, serve, serve_stdio};
pub use tools::{tool_definitions, ToolDefinition};
