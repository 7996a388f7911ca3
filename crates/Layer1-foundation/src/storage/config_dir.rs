use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// 디렉토리 이름 (글로벌: `<config_dir>/relay`, 프로젝트: `.relay`)
pub const APP_DIR: &str = "relay";

/// 설정 파일이 놓이는 디렉토리 하나
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDir(PathBuf);

impl ConfigDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self(dir.into())
    }

    /// `~/.config/relay/` (플랫폼별 설정 디렉토리)
    pub fn global() -> Result<Self> {
        dirs::config_dir()
            .map(|dir| Self::new(dir.join(APP_DIR)))
            .ok_or_else(|| Error::Config("No config directory on this platform".to_string()))
    }

    /// `<root>/.relay/`
    pub fn project(root: &Path) -> Self {
        Self::new(root.join(format!(".{}", APP_DIR)))
    }

    /// 현재 작업 디렉토리 기준 프로젝트 디렉토리
    pub fn current_project() -> Result<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| Error::Config(format!("Cannot resolve working directory: {}", e)))?;
        Ok(Self::project(&cwd))
    }

    pub fn path(&self, filename: &str) -> PathBuf {
        self.0.join(filename)
    }

    /// 파일이 없으면 `Ok(None)`, 있지만 깨졌으면 `Error::Config`
    pub fn read<T: DeserializeOwned>(&self, filename: &str) -> Result<Option<T>> {
        let path = self.path(filename);
        if !path.is_file() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }
}

/// JSON 파일 하나를 읽어 역직렬화
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
    serde_json::from_str(&raw)
        .map_err(|e| Error::Config(format!("Invalid JSON in {}: {}", path.display(), e)))
}
