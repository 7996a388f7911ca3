//! Storage - 설정/대상 JSON 파일 위치와 읽기
//!
//! - `config_dir`: 글로벌(`<config_dir>/relay`) / 프로젝트(`.relay`) 디렉토리

mod config_dir;

pub use config_dir::{read_json, ConfigDir, APP_DIR};
