//! # relay-foundation
//!
//! Foundation layer for relay:
//! - Error: 공통 에러 타입과 Result
//! - Config: 통합 설정 (RelayConfig, EngineSettings)
//! - Storage: 설정 디렉토리와 JSON 읽기 (ConfigDir)
//! - Registry: 대상 CLI 설정과 3단계 병합 레지스트리
//! - Session: 외부 세션 ID ↔ 대상별 세션 ID 매핑
//!
//! ## 아키텍처
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  TargetRegistry                              │
//! │  ├── runtime (add_tool)                      │
//! │  ├── file    (targets.json)                  │
//! │  └── builtin (claude, gemini, codex, qwen)   │
//! │                     │                        │
//! │                     ▼                        │
//! │        TargetConfig (by value)               │
//! │                     │                        │
//! │                     ▼                        │
//! │   relay-task: invocation / engine / fan-out  │
//! └──────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod registry;
pub mod session;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{
    ConfigLayer, EngineLayer, EngineSettings, RelayConfig, RELAY_CONFIG_FILE, TARGETS_FILE_ENV,
};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::{read_json, ConfigDir};

// ============================================================================
// Registry (레지스트리)
// ============================================================================
pub use registry::{
    builtin_targets, SessionStrategy, SkipFlagPosition, SystemPromptMode, TargetConfig,
    TargetRegistry, DEFAULT_TIMEOUT_SECS,
};

// ============================================================================
// Session (세션)
// ============================================================================
pub use session::{validate_session_id, SessionInfo, SessionManager};
