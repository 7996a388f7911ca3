//! Error types for relay
//!
//! 설정, 레지스트리, 세션 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// relay 공통 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 레지스트리 관련
    // ========================================================================
    #[error("Target not found: {0}")]
    TargetNotFound(String),

    #[error("Invalid target '{name}': {message}")]
    InvalidTarget { name: String, message: String },

    // ========================================================================
    // 세션 관련
    // ========================================================================
    #[error("Invalid session ID: {0}")]
    SessionValidation(String),

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 호출자의 잘못된 입력으로 인한 에러인지 확인
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::TargetNotFound(_)
                | Error::InvalidTarget { .. }
                | Error::SessionValidation(_)
                | Error::NotFound(_)
                | Error::InvalidInput(_)
        )
    }

    /// 대상 설정 에러 생성 헬퍼
    pub fn invalid_target(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidTarget {
            name: name.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
