//! Relay Config - 통합 설정
//!
//! 글로벌(`~/.config/relay/relay.json`)과 프로젝트(`.relay/relay.json`) 설정을
//! 순서대로 병합합니다. 나중에 로드된 값이 우선합니다.

use crate::storage::ConfigDir;
use crate::Result;
use serde::Deserialize;
use std::path::PathBuf;

/// 설정 파일명
pub const RELAY_CONFIG_FILE: &str = "relay.json";

/// 사용자 정의 대상 파일 경로를 지정하는 환경 변수
pub const TARGETS_FILE_ENV: &str = "RELAY_TARGETS_FILE";

/// 기본 대상 파일명 (프로젝트 디렉토리 기준)
const DEFAULT_TARGETS_FILE: &str = "targets.json";

// ============================================================================
// Engine Settings
// ============================================================================

/// 태스크 엔진 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// 동시에 실행 가능한 작업 수 (엔진 작업과 팬아웃 분기 공통)
    pub max_workers: usize,

    /// 저장소에 유지할 최대 태스크 수
    pub store_capacity: usize,

    /// 완료된 태스크 보관 시간 (초)
    pub retention_secs: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_workers: 4,
            store_capacity: 1024,
            retention_secs: 3600,
        }
    }
}

impl EngineSettings {
    /// 파일에 적힌 필드만 덮어씀
    fn merge(&mut self, layer: EngineLayer) {
        if let Some(max_workers) = layer.max_workers {
            self.max_workers = max_workers;
        }
        if let Some(store_capacity) = layer.store_capacity {
            self.store_capacity = store_capacity;
        }
        if let Some(retention_secs) = layer.retention_secs {
            self.retention_secs = retention_secs;
        }
    }
}

// ============================================================================
// File layers
// ============================================================================

/// `relay.json` 한 개의 내용 (적히지 않은 필드는 None)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigLayer {
    #[serde(default)]
    pub engine: EngineLayer,
    pub temp_dir: Option<PathBuf>,
    pub targets_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineLayer {
    pub max_workers: Option<usize>,
    pub store_capacity: Option<usize>,
    pub retention_secs: Option<u64>,
}

// ============================================================================
// Relay Config (통합)
// ============================================================================

/// relay 통합 설정 (모든 층을 병합한 결과)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayConfig {
    pub engine: EngineSettings,

    /// 임시 파일 디렉토리 (없으면 OS 기본값)
    pub temp_dir: Option<PathBuf>,

    /// 사용자 정의 대상 파일 경로
    pub targets_file: Option<PathBuf>,
}

impl RelayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 글로벌 → 프로젝트 순서로 병합 로드
    pub fn load() -> Result<Self> {
        let mut dirs = Vec::new();
        if let Ok(global) = ConfigDir::global() {
            dirs.push(global);
        }
        if let Ok(project) = ConfigDir::current_project() {
            dirs.push(project);
        }
        Self::load_layers(&dirs)
    }

    /// 주어진 디렉토리들의 `relay.json`을 순서대로 병합 (뒤쪽이 우선)
    pub fn load_layers(dirs: &[ConfigDir]) -> Result<Self> {
        let mut config = Self::new();
        for dir in dirs {
            if let Some(layer) = dir.read::<ConfigLayer>(RELAY_CONFIG_FILE)? {
                config.merge(layer);
            }
        }
        Ok(config)
    }

    /// 한 층 병합 (층에 적힌 필드만 덮어씀)
    pub fn merge(&mut self, layer: ConfigLayer) {
        self.engine.merge(layer.engine);
        if layer.temp_dir.is_some() {
            self.temp_dir = layer.temp_dir;
        }
        if layer.targets_file.is_some() {
            self.targets_file = layer.targets_file;
        }
    }

    /// 사용자 정의 대상 파일 경로 결정
    ///
    /// 우선순위: `RELAY_TARGETS_FILE` 환경 변수 > `targetsFile` 설정 > `.relay/targets.json`
    pub fn resolve_targets_file(&self) -> Option<PathBuf> {
        if let Ok(path) = std::env::var(TARGETS_FILE_ENV) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }
        if let Some(path) = &self.targets_file {
            return Some(path.clone());
        }
        ConfigDir::current_project()
            .ok()
            .map(|dir| dir.path(DEFAULT_TARGETS_FILE))
    }
}
