//! File-based invoker - runs one target CLI through a temp input/output file pair
//!
//! 프로토콜:
//! 1. 타임아웃 결정 (요청 값 > 대상 설정)
//! 2. 세션 인자 합성 후 허용 목록으로 인자 검증
//! 3. PATH에서 실행 파일 확인 (없으면 임시 파일을 만들기 전에 실패)
//! 4. 입력/출력 임시 파일 생성, 입력 기록
//! 5. stdin=입력 파일, stdout=출력 파일, stderr=파이프로 실행
//! 6. 타임아웃/취소 시 프로세스 종료, 성공 시 출력 파일 전체를 반환
//!
//! 임시 파일은 어떤 경로로 반환되든 drop 시 삭제됩니다.

use super::args::validate_args;
use super::command::{build_launch_args, render_input};
use super::error::{InvocationError, InvocationResult};
use super::r#trait::Invoker;
use super::session::session_args;
use super::temp::TempPair;
use async_trait::async_trait;
use relay_foundation::{SessionManager, TargetConfig, TargetRegistry};
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, Command};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

// ============================================================================
// Request
// ============================================================================

/// Session continuation requested by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDirective {
    /// Caller-supplied session id
    pub session_id: String,
    /// Continue the target's existing conversation
    pub resume: bool,
}

/// One invocation of one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    pub target: String,
    pub prompt: String,
    pub system_prompt: Option<String>,
    /// Caller extra args, filtered against the target's allow-list
    pub args: Vec<String>,
    /// Overrides the target's configured timeout (seconds)
    pub timeout: Option<u64>,
    pub skip_git_repo_check: bool,
    pub session: Option<SessionDirective>,
}

impl InvocationRequest {
    pub fn new(target: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            prompt: prompt.into(),
            system_prompt: None,
            args: Vec::new(),
            timeout: None,
            skip_git_repo_check: true,
            session: None,
        }
    }

    pub fn system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout = Some(secs);
        self
    }

    pub fn skip_git_repo_check(mut self, skip: bool) -> Self {
        self.skip_git_repo_check = skip;
        self
    }

    pub fn session(mut self, session_id: impl Into<String>, resume: bool) -> Self {
        self.session = Some(SessionDirective {
            session_id: session_id.into(),
            resume,
        });
        self
    }
}

// ============================================================================
// File Invoker
// ============================================================================

enum WaitOutcome {
    Exited(io::Result<ExitStatus>, Vec<u8>),
    TimedOut,
    Cancelled,
}

/// Invoker that talks to target CLIs through temp files
#[derive(Debug, Clone)]
pub struct FileInvoker {
    registry: Arc<TargetRegistry>,
    sessions: Arc<SessionManager>,
    temp_dir: Option<PathBuf>,
}

impl FileInvoker {
    pub fn new(registry: Arc<TargetRegistry>, sessions: Arc<SessionManager>) -> Self {
        Self {
            registry,
            sessions,
            temp_dir: None,
        }
    }

    /// Place temp files in `dir` instead of the system temp dir
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn registry(&self) -> &Arc<TargetRegistry> {
        &self.registry
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Run `request` against an already resolved target config
    pub async fn invoke_with_config(
        &self,
        config: &TargetConfig,
        request: &InvocationRequest,
        cancel: &CancellationToken,
    ) -> InvocationResult {
        let target = request.target.as_str();
        let timeout_secs = request.timeout.unwrap_or(config.timeout);

        let mut requested = request.args.clone();
        if let Some(directive) = &request.session {
            let info = self
                .sessions
                .resolve_or_create(&directive.session_id, target)?;
            let extra = session_args(
                target,
                &config.session_strategy,
                &info.cli_session_id,
                directive.resume,
                info.is_first_request(),
            )?;
            requested.extend(extra);
        }

        let validated = validate_args(target, &requested, &config.supported_args);

        if let Err(e) = which::which(&config.command) {
            debug!("'{}' not resolvable on PATH: {}", config.command, e);
            return Err(InvocationError::TargetNotFound(format!(
                "CLI '{}' not found (command: {})",
                target, config.command
            )));
        }

        let system_prompt = request.system_prompt.as_deref();
        let launch = build_launch_args(
            config,
            system_prompt,
            request.skip_git_repo_check,
            &validated,
        );
        let input = render_input(config, &request.prompt, system_prompt);

        let files = TempPair::create(self.temp_dir.as_deref()).map_err(|e| {
            InvocationError::Unexpected(format!("Failed to create temp files: {}", e))
        })?;
        tokio::fs::write(files.input_path(), input)
            .await
            .map_err(|e| InvocationError::Unexpected(format!("Failed to write input file: {}", e)))?;

        info!("Invoking {} (timeout {}s)", target, timeout_secs);
        debug!("Launch args: {:?}", launch);

        let stdin = std::fs::File::open(files.input_path())
            .map_err(|e| InvocationError::Unexpected(format!("Failed to open input file: {}", e)))?;
        let stdout = std::fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(files.output_path())
            .map_err(|e| {
                InvocationError::Unexpected(format!("Failed to open output file: {}", e))
            })?;

        let mut cmd = Command::new(&launch[0]);
        cmd.args(&launch[1..])
            .envs(&config.env_vars)
            .stdin(Stdio::from(stdin))
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                InvocationError::TargetNotFound(format!(
                    "CLI '{}' not found (command: {})",
                    target, config.command
                ))
            } else {
                error!("Failed to spawn {}: {}", target, e);
                InvocationError::ExecutionFailed(format!("Failed to start CLI process: {}", e))
            }
        })?;

        // 종료 대기와 stderr 수집 모두 같은 마감 시각 안에서 끝나야 함
        let deadline = Instant::now() + Duration::from_secs(timeout_secs);
        let stderr_pipe = child.stderr.take();
        let outcome = {
            let finished = async { tokio::join!(child.wait(), drain_stderr(stderr_pipe)) };
            tokio::select! {
                (status, stderr) = finished => WaitOutcome::Exited(status, stderr),
                _ = tokio::time::sleep_until(deadline) => WaitOutcome::TimedOut,
                _ = cancel.cancelled() => WaitOutcome::Cancelled,
            }
        };

        let (status, stderr) = match outcome {
            WaitOutcome::Exited(status, stderr) => {
                let status = status.map_err(|e| {
                    error!("Failed to wait for {}: {}", target, e);
                    InvocationError::ExecutionFailed(format!(
                        "Failed to wait for CLI process: {}",
                        e
                    ))
                })?;
                (status, stderr)
            }
            WaitOutcome::TimedOut => {
                kill_child(&mut child, target).await;
                warn!("{} timed out after {}s", target, timeout_secs);
                return Err(InvocationError::Timeout {
                    target: target.to_string(),
                    secs: timeout_secs,
                });
            }
            WaitOutcome::Cancelled => {
                kill_child(&mut child, target).await;
                info!("{} invocation cancelled", target);
                return Err(InvocationError::Cancelled(format!(
                    "Invocation of {} was cancelled",
                    target
                )));
            }
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            let stderr = stderr.trim();
            let code = status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            error!("{} exited with code {}", target, code);
            return Err(InvocationError::ExecutionFailed(format!(
                "CLI execution failed (code {}): {}",
                code,
                if stderr.is_empty() {
                    "unknown error"
                } else {
                    stderr
                }
            )));
        }

        let output = tokio::fs::read(files.output_path())
            .await
            .map_err(|e| InvocationError::Unexpected(format!("Failed to read output file: {}", e)))?;

        debug!("{} produced {} bytes", target, output.len());
        Ok(String::from_utf8_lossy(&output).into_owned())
    }
}

#[async_trait]
impl Invoker for FileInvoker {
    async fn invoke(
        &self,
        request: &InvocationRequest,
        cancel: &CancellationToken,
    ) -> InvocationResult {
        let config = self.registry.resolve(&request.target)?;
        self.invoke_with_config(&config, request, cancel).await
    }
}

async fn drain_stderr(pipe: Option<ChildStderr>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            debug!("stderr read ended early: {}", e);
        }
    }
    buf
}

async fn kill_child(child: &mut Child, target: &str) {
    // 이미 종료된 프로세스 (stderr만 열려 있던 경우)
    if let Ok(Some(_)) = child.try_wait() {
        return;
    }
    if let Err(e) = child.kill().await {
        warn!("Failed to kill {} process: {}", target, e);
    }
}
