//! Session Manager - 외부 세션 ID ↔ 대상별 세션 ID 매핑
//!
//! 호출자가 제공한 세션 ID와 대상 이름 쌍마다 CLI용 세션 ID(UUID)를 하나 발급하고,
//! 요청 횟수를 기록합니다. 메모리에만 유지되며 재시작 시 사라집니다.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// 세션 ID 최대 길이
pub const MAX_SESSION_ID_LEN: usize = 128;

/// 세션 조회 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// 호출자가 제공한 세션 ID
    pub session_id: String,

    /// 대상 이름
    pub target: String,

    /// 대상 CLI에 전달할 세션 ID
    pub cli_session_id: String,

    /// 이번 요청을 포함한 요청 횟수 (첫 요청이면 1)
    pub request_count: u64,

    /// 생성 시각
    pub created_at: DateTime<Utc>,
}

impl SessionInfo {
    /// 첫 요청인지
    pub fn is_first_request(&self) -> bool {
        self.request_count == 1
    }
}

/// 세션 매니저
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: Mutex<HashMap<(String, String), SessionInfo>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 세션 조회 또는 생성 (요청 횟수 1 증가)
    pub fn resolve_or_create(&self, session_id: &str, target: &str) -> Result<SessionInfo> {
        validate_session_id(session_id)?;

        let mut sessions = self.sessions.lock();
        let key = (session_id.to_string(), target.to_string());
        let info = sessions.entry(key).or_insert_with(|| {
            let cli_session_id = Uuid::new_v4().to_string();
            debug!(
                "New session '{}' for {}: {}",
                session_id, target, cli_session_id
            );
            SessionInfo {
                session_id: session_id.to_string(),
                target: target.to_string(),
                cli_session_id,
                request_count: 0,
                created_at: Utc::now(),
            }
        });

        info.request_count += 1;
        Ok(info.clone())
    }

    /// 요청 횟수를 증가시키지 않고 조회
    pub fn get(&self, session_id: &str, target: &str) -> Option<SessionInfo> {
        self.sessions
            .lock()
            .get(&(session_id.to_string(), target.to_string()))
            .cloned()
    }

    /// 세션 제거
    pub fn remove(&self, session_id: &str, target: &str) -> Option<SessionInfo> {
        self.sessions
            .lock()
            .remove(&(session_id.to_string(), target.to_string()))
    }

    /// 세션 수
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 세션 ID 형식 검증: 1~128자의 영문, 숫자, `-`, `_`
pub fn validate_session_id(session_id: &str) -> Result<()> {
    if session_id.is_empty() || session_id.len() > MAX_SESSION_ID_LEN {
        return Err(Error::SessionValidation(format!(
            "session ID must be 1-{} characters long",
            MAX_SESSION_ID_LEN
        )));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
    if !session_id.chars().all(allowed) {
        return Err(Error::SessionValidation(format!(
            "Invalid session ID format: '{}'",
            session_id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_request_then_resume() {
        let manager = SessionManager::new();

        let first = manager.resolve_or_create("fast-session-001", "claude").unwrap();
        assert_eq!(first.request_count, 1);
        assert!(first.is_first_request());

        let second = manager.resolve_or_create("fast-session-001", "claude").unwrap();
        assert_eq!(second.request_count, 2);
        assert!(!second.is_first_request());
        assert_eq!(first.cli_session_id, second.cli_session_id);
    }

    #[test]
    fn test_sessions_are_per_target() {
        let manager = SessionManager::new();

        let claude = manager.resolve_or_create("shared", "claude").unwrap();
        let gemini = manager.resolve_or_create("shared", "gemini").unwrap();
        assert_ne!(claude.cli_session_id, gemini.cli_session_id);
        assert_eq!(gemini.request_count, 1);
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_get_does_not_count() {
        let manager = SessionManager::new();
        manager.resolve_or_create("s1", "qwen").unwrap();

        assert_eq!(manager.get("s1", "qwen").unwrap().request_count, 1);
        assert_eq!(manager.get("s1", "qwen").unwrap().request_count, 1);
        assert!(manager.get("s2", "qwen").is_none());
    }

    #[test]
    fn test_invalid_session_ids() {
        let manager = SessionManager::new();

        assert!(matches!(
            manager.resolve_or_create("", "claude"),
            Err(Error::SessionValidation(_))
        ));
        assert!(matches!(
            manager.resolve_or_create("has space", "claude"),
            Err(Error::SessionValidation(_))
        ));
        assert!(matches!(
            manager.resolve_or_create(&"x".repeat(129), "claude"),
            Err(Error::SessionValidation(_))
        ));
        // 영숫자는 ASCII만 허용
        assert!(matches!(
            manager.resolve_or_create("세션1", "claude"),
            Err(Error::SessionValidation(_))
        ));
        assert!(matches!(
            manager.resolve_or_create("é", "claude"),
            Err(Error::SessionValidation(_))
        ));
        assert!(manager.is_empty());

        assert!(manager.resolve_or_create("Run-01_b", "claude").is_ok());
        assert_eq!(manager.len(), 1);
    }
}
