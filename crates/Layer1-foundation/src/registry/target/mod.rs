//! Target - 외부 CLI 대상 설정 및 레지스트리

mod config;
mod registry;

pub use config::{
    builtin_targets, SessionStrategy, SkipFlagPosition, SystemPromptMode, TargetConfig,
    DEFAULT_TIMEOUT_SECS,
};
pub use registry::TargetRegistry;
