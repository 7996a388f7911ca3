//! Config - 통합 설정 관리
//!
//! - `relay.rs` - RelayConfig (엔진, 임시 디렉토리, 대상 파일 경로)

mod relay;

pub use relay::{
    ConfigLayer, EngineLayer, EngineSettings, RelayConfig, RELAY_CONFIG_FILE, TARGETS_FILE_ENV,
};
