//! Registry - 대상 CLI 등록/관리
//!
//! - `target/` - 대상 설정과 3단계 병합 레지스트리

pub mod target;

pub use target::{
    builtin_targets, SessionStrategy, SkipFlagPosition, SystemPromptMode, TargetConfig,
    TargetRegistry, DEFAULT_TIMEOUT_SECS,
};
