//! File-based invocation protocol
//!
//! - `validate_args` - 허용 목록 기반 인자 필터
//! - `session_args` - 대상별 세션 플래그 합성
//! - `build_launch_args` / `render_input` - 실행 인자와 입력 파일 내용
//! - `TempPair` - 자동 삭제되는 입력/출력 임시 파일
//! - `FileInvoker` - 위 단계를 묶어 실제 CLI를 실행하는 `Invoker`

pub mod args;
pub mod command;
pub mod error;
pub mod executor;
pub mod session;
pub mod temp;
pub mod r#trait;

pub use args::validate_args;
pub use command::{build_launch_args, render_input, SKIP_GIT_REPO_CHECK_FLAG};
pub use error::{panic_message, ErrorKind, InvocationError, InvocationResult};
pub use executor::{FileInvoker, InvocationRequest, SessionDirective};
pub use r#trait::Invoker;
pub use session::session_args;
pub use temp::TempPair;
