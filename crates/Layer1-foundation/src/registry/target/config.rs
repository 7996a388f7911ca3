//! Target Configuration - 외부 CLI 대상 설정
//!
//! 하나의 CLI 에이전트(claude, gemini, codex, qwen, ...)를 실행하기 위한 설정.
//!
//! JSON 형식:
//! ```json
//! {
//!   "command": "codex",
//!   "timeout": 300,
//!   "extra_args": ["exec", "-"],
//!   "supports_skip_git_check": true,
//!   "skip_git_check_position": "after_extra_args"
//! }
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 기본 타임아웃 (초)
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

// ============================================================================
// Skip Flag Position
// ============================================================================

/// `--skip-git-repo-check` 플래그 삽입 위치
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipFlagPosition {
    /// `cli --skip-git-repo-check exec -`
    #[default]
    BeforeExtraArgs,
    /// `cli exec --skip-git-repo-check -`
    AfterExtraArgs,
}

impl SkipFlagPosition {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "before_extra_args" => Some(Self::BeforeExtraArgs),
            "after_extra_args" => Some(Self::AfterExtraArgs),
            _ => None,
        }
    }
}

// ============================================================================
// System Prompt Mode
// ============================================================================

/// 시스템 프롬프트 전달 방식
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SystemPromptMode {
    /// 입력 파일에 `{system_prompt, prompt}` YAML 문서로 기록
    #[default]
    Structured,
    /// 전용 실행 플래그로 전달 (flags 뒤에 시스템 프롬프트가 붙음)
    NativeFlag { flags: Vec<String> },
}

// ============================================================================
// Session Strategy
// ============================================================================

/// 대상별 세션 이어가기 전략
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionStrategy {
    /// 세션 플래그 없음
    #[default]
    None,
    /// 첫 요청은 `--session-id <id>`, 재개 요청은 `--resume <id>`
    ExplicitId {
        #[serde(default = "default_new_session_flag")]
        new_flag: String,
        #[serde(default = "default_resume_flag")]
        resume_flag: String,
    },
    /// 재개 요청만 `--resume latest`
    ImplicitLatest {
        #[serde(default = "default_resume_flag")]
        resume_flag: String,
        #[serde(default = "default_latest_value")]
        latest_value: String,
    },
    /// 재개 시 기본 서브커맨드 자체를 교체해야 하는 방식 (미지원)
    SubcommandRewrite,
}

impl SessionStrategy {
    pub fn explicit_id() -> Self {
        Self::ExplicitId {
            new_flag: default_new_session_flag(),
            resume_flag: default_resume_flag(),
        }
    }

    pub fn implicit_latest() -> Self {
        Self::ImplicitLatest {
            resume_flag: default_resume_flag(),
            latest_value: default_latest_value(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ExplicitId { .. } => "explicit_id",
            Self::ImplicitLatest { .. } => "implicit_latest",
            Self::SubcommandRewrite => "subcommand_rewrite",
        }
    }
}

// ============================================================================
// Target Config
// ============================================================================

/// 개별 대상 CLI 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// 실행 명령어 (PATH에서 검색)
    pub command: String,

    /// 실행 타임아웃 (초)
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// 기본 실행 인자
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// 환경 변수 덮어쓰기
    #[serde(default)]
    pub env_vars: BTreeMap<String, String>,

    /// 호출자가 전달할 수 있는 인자 허용 목록 (비어 있으면 모두 거부)
    #[serde(default)]
    pub supported_args: Vec<String>,

    /// `--skip-git-repo-check` 지원 여부
    #[serde(default)]
    pub supports_skip_git_check: bool,

    /// `--skip-git-repo-check` 삽입 위치
    #[serde(default)]
    pub skip_git_check_position: SkipFlagPosition,

    /// 시스템 프롬프트 전달 방식
    #[serde(default)]
    pub system_prompt_mode: SystemPromptMode,

    /// 세션 전략
    #[serde(default)]
    pub session_strategy: SessionStrategy,
}

impl TargetConfig {
    /// 기본값으로 새 설정 생성
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout: DEFAULT_TIMEOUT_SECS,
            extra_args: Vec::new(),
            env_vars: BTreeMap::new(),
            supported_args: Vec::new(),
            supports_skip_git_check: false,
            skip_git_check_position: SkipFlagPosition::default(),
            system_prompt_mode: SystemPromptMode::default(),
            session_strategy: SessionStrategy::default(),
        }
    }

    /// 유효성 검증
    pub fn validate(&self, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::invalid_target(name, "name must not be empty"));
        }
        if self.command.trim().is_empty() {
            return Err(Error::invalid_target(name, "command must not be empty"));
        }
        if self.timeout == 0 {
            return Err(Error::invalid_target(name, "timeout must be greater than 0"));
        }
        Ok(())
    }

    /// 허용 목록에 인자가 있는지
    pub fn allows(&self, arg: &str) -> bool {
        self.supported_args.iter().any(|a| a == arg)
    }

    // === Builder methods ===

    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout = secs;
        self
    }

    pub fn extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn supported_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    pub fn skip_git_check(mut self, position: SkipFlagPosition) -> Self {
        self.supports_skip_git_check = true;
        self.skip_git_check_position = position;
        self
    }

    pub fn system_prompt_mode(mut self, mode: SystemPromptMode) -> Self {
        self.system_prompt_mode = mode;
        self
    }

    pub fn session_strategy(mut self, strategy: SessionStrategy) -> Self {
        self.session_strategy = strategy;
        self
    }
}

// ============================================================================
// Built-in defaults
// ============================================================================

/// 기본 제공 대상 (claude, gemini, codex, qwen)
pub fn builtin_targets() -> BTreeMap<String, TargetConfig> {
    let mut targets = BTreeMap::new();

    targets.insert(
        "claude".to_string(),
        TargetConfig::new("claude")
            .extra_args(["--print"])
            .supported_args([
                "--model",
                "--session-id",
                "--resume",
                "--allowedTools",
                "--disallowedTools",
                "--permission-mode",
                "--output-format",
                "--add-dir",
            ])
            .system_prompt_mode(SystemPromptMode::NativeFlag {
                flags: vec!["--append-system-prompt".to_string()],
            })
            .session_strategy(SessionStrategy::explicit_id()),
    );

    targets.insert(
        "gemini".to_string(),
        TargetConfig::new("gemini")
            .supported_args(["--model", "-m", "--resume", "--yolo", "--include-directories"])
            .session_strategy(SessionStrategy::implicit_latest()),
    );

    targets.insert(
        "codex".to_string(),
        TargetConfig::new("codex")
            .extra_args(["exec", "-"])
            .supported_args(["--model", "-m", "--sandbox", "--full-auto", "--profile"])
            .skip_git_check(SkipFlagPosition::AfterExtraArgs)
            .session_strategy(SessionStrategy::SubcommandRewrite),
    );

    targets.insert(
        "qwen".to_string(),
        TargetConfig::new("qwen")
            .supported_args(["--model", "-m", "--resume", "--yolo"])
            .session_strategy(SessionStrategy::implicit_latest()),
    );

    targets
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_new_session_flag() -> String {
    "--session-id".to_string()
}

fn default_resume_flag() -> String {
    "--resume".to_string()
}

fn default_latest_value() -> String {
    "latest".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_json_applies_defaults() {
        let config: TargetConfig = serde_json::from_str(r#"{"command": "test"}"#).unwrap();

        assert_eq!(config.command, "test");
        assert_eq!(config.timeout, 300);
        assert!(config.extra_args.is_empty());
        assert!(config.env_vars.is_empty());
        assert!(!config.supports_skip_git_check);
        assert_eq!(
            config.skip_git_check_position,
            SkipFlagPosition::BeforeExtraArgs
        );
        assert_eq!(config.system_prompt_mode, SystemPromptMode::Structured);
        assert_eq!(config.session_strategy, SessionStrategy::None);
    }

    #[test]
    fn test_full_json() {
        let config: TargetConfig = serde_json::from_str(
            r#"{
                "command": "fullcli-cmd",
                "timeout": 120,
                "extra_args": ["arg1", "arg2"],
                "env_vars": {"KEY": "value"},
                "supported_args": ["--model"],
                "supports_skip_git_check": true,
                "skip_git_check_position": "after_extra_args",
                "system_prompt_mode": {"mode": "native_flag", "flags": ["--system"]},
                "session_strategy": {"kind": "explicit_id"}
            }"#,
        )
        .unwrap();

        assert_eq!(config.timeout, 120);
        assert_eq!(config.extra_args, vec!["arg1", "arg2"]);
        assert_eq!(config.env_vars.get("KEY").map(String::as_str), Some("value"));
        assert_eq!(
            config.skip_git_check_position,
            SkipFlagPosition::AfterExtraArgs
        );
        assert_eq!(
            config.system_prompt_mode,
            SystemPromptMode::NativeFlag {
                flags: vec!["--system".to_string()]
            }
        );
        assert_eq!(config.session_strategy, SessionStrategy::explicit_id());
    }

    #[test]
    fn test_validate() {
        assert!(TargetConfig::new("cat").validate("cat").is_ok());
        assert!(TargetConfig::new("").validate("empty").is_err());
        assert!(TargetConfig::new("cat").validate(" ").is_err());
        assert!(TargetConfig::new("cat").timeout(0).validate("cat").is_err());
    }

    #[test]
    fn test_builtin_targets() {
        let targets = builtin_targets();
        let names: Vec<_> = targets.keys().cloned().collect();
        assert_eq!(names, vec!["claude", "codex", "gemini", "qwen"]);

        let codex = &targets["codex"];
        assert_eq!(codex.extra_args, vec!["exec", "-"]);
        assert!(codex.supports_skip_git_check);
        assert_eq!(codex.session_strategy, SessionStrategy::SubcommandRewrite);

        for (name, config) in &targets {
            assert!(config.validate(name).is_ok());
            assert_eq!(config.timeout, DEFAULT_TIMEOUT_SECS);
        }
    }

    #[test]
    fn test_skip_position_from_str() {
        assert_eq!(
            SkipFlagPosition::from_str("after_extra_args"),
            Some(SkipFlagPosition::AfterExtraArgs)
        );
        assert_eq!(SkipFlagPosition::from_str("middle"), None);
    }
}
