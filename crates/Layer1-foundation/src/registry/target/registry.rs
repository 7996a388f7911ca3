//! Target Registry - 3단계 병합 레지스트리
//!
//! 우선순위 (높은 것부터):
//! 1. 런타임 추가 (`add`)
//! 2. 파일 선언 (`targets.json`)
//! 3. 기본 제공 (claude, gemini, codex, qwen)

use super::config::{builtin_targets, TargetConfig};
use crate::config::RelayConfig;
use crate::storage::read_json;
use crate::{Error, Result};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// 대상 CLI 레지스트리
#[derive(Debug, Default)]
pub struct TargetRegistry {
    /// 기본 제공 대상
    builtin: BTreeMap<String, TargetConfig>,

    /// 파일에서 로드한 대상
    file: BTreeMap<String, TargetConfig>,

    /// 런타임에 추가된 대상
    runtime: RwLock<BTreeMap<String, TargetConfig>>,
}

impl TargetRegistry {
    /// 기본 제공 대상만 가진 레지스트리
    pub fn new() -> Self {
        Self {
            builtin: builtin_targets(),
            file: BTreeMap::new(),
            runtime: RwLock::new(BTreeMap::new()),
        }
    }

    /// 아무 대상도 없는 레지스트리
    pub fn empty() -> Self {
        Self::default()
    }

    /// 기본 제공 대상 + 파일 대상
    pub fn with_file(path: &Path) -> Result<Self> {
        let mut registry = Self::new();
        registry.load_file(path)?;
        Ok(registry)
    }

    /// 설정에서 대상 파일 경로를 찾아 생성 (파일이 없으면 기본 제공만)
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        match config.resolve_targets_file() {
            Some(path) if path.exists() => Self::with_file(&path),
            _ => Ok(Self::new()),
        }
    }

    /// 파일 계층 로드 (기존 파일 계층을 교체)
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let targets: BTreeMap<String, TargetConfig> = read_json(path)?;
        for (name, config) in &targets {
            config.validate(name).map_err(|e| {
                Error::Config(format!("{} in {}", e, path.display()))
            })?;
        }

        info!(
            "Loaded {} custom target(s) from {}",
            targets.len(),
            path.display()
        );
        self.file = targets;
        Ok(())
    }

    /// 런타임 대상 추가 (같은 이름이면 덮어씀)
    pub fn add(&self, name: impl Into<String>, config: TargetConfig) -> Result<()> {
        let name = name.into();
        config.validate(&name)?;

        debug!("Registering runtime target '{}' ({})", name, config.command);
        self.runtime.write().insert(name, config);
        Ok(())
    }

    /// 런타임 대상 제거
    pub fn remove(&self, name: &str) -> Option<TargetConfig> {
        self.runtime.write().remove(name)
    }

    /// 이름으로 대상 조회 (런타임 > 파일 > 기본)
    pub fn resolve(&self, name: &str) -> Result<TargetConfig> {
        if let Some(config) = self.runtime.read().get(name) {
            return Ok(config.clone());
        }
        self.file
            .get(name)
            .or_else(|| self.builtin.get(name))
            .cloned()
            .ok_or_else(|| Error::TargetNotFound(name.to_string()))
    }

    /// 대상 존재 여부
    pub fn contains(&self, name: &str) -> bool {
        self.runtime.read().contains_key(name)
            || self.file.contains_key(name)
            || self.builtin.contains_key(name)
    }

    /// 병합된 전체 대상 (이름순)
    pub fn all(&self) -> BTreeMap<String, TargetConfig> {
        let mut merged = self.builtin.clone();
        merged.extend(self.file.clone());
        merged.extend(self.runtime.read().clone());
        merged
    }

    /// 병합된 대상 이름 (이름순)
    pub fn names(&self) -> Vec<String> {
        self.all().into_keys().collect()
    }
}
