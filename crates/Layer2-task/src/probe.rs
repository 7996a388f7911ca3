//! Target probing - installation and version detection

use relay_foundation::TargetRegistry;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Timeout for `--version` probes
pub const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Installation status of one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetInfo {
    pub name: String,
    pub command: String,
    pub version: Option<String>,
    pub installed: bool,
}

/// Whether `command` resolves on PATH
pub fn is_installed(command: &str) -> bool {
    which::which(command).is_ok()
}

/// First non-empty of stdout/stderr from `<command> --version`, trimmed
pub async fn get_version(command: &str) -> Option<String> {
    let mut cmd = Command::new(command);
    cmd.arg("--version").stdin(Stdio::null()).kill_on_drop(true);

    let output = match tokio::time::timeout(VERSION_PROBE_TIMEOUT, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            debug!("{} --version failed: {}", command, e);
            return None;
        }
        Err(_) => {
            debug!("{} --version timed out", command);
            return None;
        }
    };

    if !output.status.success() {
        return None;
    }

    [output.stdout, output.stderr]
        .iter()
        .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string())
        .find(|text| !text.is_empty())
}

/// Probe every registered target concurrently, sorted by name
pub async fn probe_targets(registry: &TargetRegistry, with_version: bool) -> Vec<TargetInfo> {
    let probes = registry.all().into_iter().map(|(name, config)| async move {
        let installed = is_installed(&config.command);
        let version = if installed && with_version {
            get_version(&config.command).await
        } else {
            None
        };
        TargetInfo {
            name,
            command: config.command,
            version,
            installed,
        }
    });

    futures::future::join_all(probes).await
}
