//! Scoped temporary input/output files
//!
//! 두 파일 모두 `TempPair`가 drop될 때 삭제됩니다. 삭제 실패는 로그만 남깁니다.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempPath};
use tracing::{debug, warn};
use uuid::Uuid;

const INPUT_PREFIX: &str = "relay_input_";
const OUTPUT_PREFIX: &str = "relay_output_";
const SUFFIX: &str = ".txt";

/// One temp file, removed on drop
#[derive(Debug)]
pub struct ScopedFile {
    path: Option<TempPath>,
}

impl ScopedFile {
    fn create(dir: &Path, prefix: &str) -> io::Result<Self> {
        let file = Builder::new()
            .prefix(prefix)
            .suffix(SUFFIX)
            .tempfile_in(dir)?;
        let path = file.into_temp_path();
        debug!("Created temp file {}", path.display());
        Ok(Self { path: Some(path) })
    }

    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }
}

impl Drop for ScopedFile {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        let shown = path.display().to_string();
        match path.close() {
            Ok(()) => debug!("Removed temp file {}", shown),
            Err(e) => warn!("Failed to remove temp file {}: {}", shown, e),
        }
    }
}

/// Uniquely named input/output file pair for one invocation
#[derive(Debug)]
pub struct TempPair {
    pub input: ScopedFile,
    pub output: ScopedFile,
}

impl TempPair {
    /// Allocate the pair in `dir`, or the system temp dir when `None`
    pub fn create(dir: Option<&Path>) -> io::Result<Self> {
        let dir: PathBuf = match dir {
            Some(dir) => dir.to_path_buf(),
            None => std::env::temp_dir(),
        };
        let id = Uuid::new_v4().simple().to_string();

        let input = ScopedFile::create(&dir, &format!("{}{}_", INPUT_PREFIX, id))?;
        let output = ScopedFile::create(&dir, &format!("{}{}_", OUTPUT_PREFIX, id))?;

        Ok(Self { input, output })
    }

    pub fn input_path(&self) -> &Path {
        self.input.path()
    }

    pub fn output_path(&self) -> &Path {
        self.output.path()
    }
}
