//! Session - 세션 연속성 관리

mod manager;

pub use manager::{validate_session_id, SessionInfo, SessionManager, MAX_SESSION_ID_LEN};
