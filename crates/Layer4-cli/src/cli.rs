//! Subcommand handlers
//!
//! 결과(응답 본문, JSON)는 stdout, 진행 로그와 오류는 stderr로 출력합니다.

use anyhow::{bail, Context};
use relay_server::{serve_stdio, ToolServer};
use relay_task::{
    fan_out, probe_targets, CancellationToken, FanOutRequest, InvocationRequest, TargetInfo,
};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

/// Options for `relay run`
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub target: String,
    pub prompt: Option<String>,
    pub system_prompt: Option<String>,
    pub args: Vec<String>,
    pub timeout: Option<u64>,
    pub session_id: Option<String>,
    pub resume: bool,
    pub skip_git_repo_check: bool,
}

impl RunOptions {
    fn into_request(self, prompt: String) -> InvocationRequest {
        let mut request = InvocationRequest::new(self.target, prompt)
            .args(self.args)
            .skip_git_repo_check(self.skip_git_repo_check);
        if let Some(system) = self.system_prompt {
            request = request.system_prompt(system);
        }
        if let Some(secs) = self.timeout {
            request = request.timeout(secs);
        }
        if let Some(session_id) = self.session_id {
            request = request.session(session_id, self.resume);
        }
        request
    }
}

// ============================================================================
// Commands
// ============================================================================

/// `relay serve` - JSON-lines server on stdin/stdout
pub async fn serve(server: ToolServer) -> anyhow::Result<ExitCode> {
    info!("relay server ready on stdio");
    serve_stdio(server).await.context("stdio server failed")?;
    Ok(ExitCode::SUCCESS)
}

/// `relay list`
pub async fn list(server: &ToolServer, probe: bool) -> anyhow::Result<ExitCode> {
    let targets = probe_targets(server.registry(), probe).await;
    print!("{}", render_targets(&targets, probe));
    Ok(ExitCode::SUCCESS)
}

/// `relay run`
pub async fn run(server: &ToolServer, options: RunOptions) -> anyhow::Result<ExitCode> {
    let prompt = match options.prompt.clone() {
        Some(prompt) => prompt,
        None => read_stdin_prompt().await?,
    };
    let request = options.into_request(prompt);

    let cancel = cancel_on_ctrl_c();
    match server.invoker().invoke(&request, &cancel).await {
        Ok(response) => {
            println!("{}", response);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("Error [{}]: {}", e.kind(), e);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// `relay multi` - prints the per-target outcome map as JSON
pub async fn multi(
    server: &ToolServer,
    prompt: String,
    targets: Vec<String>,
    system_prompt: Option<String>,
    timeout: Option<u64>,
) -> anyhow::Result<ExitCode> {
    let targets = if targets.is_empty() {
        server.registry().names()
    } else {
        targets
    };

    let mut request = FanOutRequest::new(prompt, targets);
    if let Some(system) = system_prompt {
        request = request.system_prompt(system);
    }
    if let Some(secs) = timeout {
        request = request.timeout(secs);
    }

    let cancel = cancel_on_ctrl_c();
    let permits = server.engine().worker_permits();
    let result = fan_out(Arc::clone(server.invoker()), &request, &cancel, permits).await;
    debug!("{}/{} target(s) succeeded", result.succeeded(), result.len());

    println!("{}", serde_json::to_string_pretty(&result)?);
    if result.succeeded() == result.len() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

// ============================================================================
// Helpers
// ============================================================================

async fn read_stdin_prompt() -> anyhow::Result<String> {
    let mut prompt = String::new();
    tokio::io::stdin()
        .read_to_string(&mut prompt)
        .await
        .context("failed to read prompt from stdin")?;

    if prompt.trim().is_empty() {
        bail!("No prompt given (pass it as an argument or on stdin)");
    }
    Ok(prompt)
}

/// Token cancelled on the first Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupted, cancelling");
                child.cancel();
            }
            Err(e) => debug!("Ctrl-C handler unavailable: {}", e),
        }
    });
    token
}

fn render_targets(targets: &[TargetInfo], probe: bool) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<14} {:<16} {:<10}", "NAME", "COMMAND", "INSTALLED"));
    if probe {
        out.push_str(" VERSION");
    }
    out.push('\n');

    for target in targets {
        let installed = if target.installed { "yes" } else { "no" };
        out.push_str(&format!(
            "{:<14} {:<16} {:<10}",
            target.name, target.command, installed
        ));
        if probe {
            out.push(' ');
            out.push_str(target.version.as_deref().unwrap_or("-"));
        }
        out.push('\n');
    }
    out
}
