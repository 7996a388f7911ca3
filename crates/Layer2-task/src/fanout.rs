//! Multi-target fan-out
//!
//! 같은 프롬프트를 여러 대상에 동시에 보내고, 모든 결과가 끝난 뒤 대상별 결과를 모읍니다.
//! 한 대상의 실패(패닉 포함)는 다른 대상에 영향을 주지 않습니다.
//! 분기는 엔진과 같은 작업 슬롯(`TaskEngine::worker_permits`)을 얻은 뒤에만 프로세스를 띄웁니다.

use crate::invocation::{
    panic_message, ErrorKind, InvocationError, InvocationRequest, InvocationResult, Invoker,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// One prompt, many targets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanOutRequest {
    pub prompt: String,
    pub targets: Vec<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub timeout: Option<u64>,
}

impl FanOutRequest {
    pub fn new<I, S>(prompt: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prompt: prompt.into(),
            targets: targets.into_iter().map(Into::into).collect(),
            system_prompt: None,
            timeout: None,
        }
    }

    pub fn system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout = Some(secs);
        self
    }

    fn invocation_for(&self, target: &str) -> InvocationRequest {
        InvocationRequest {
            target: target.to_string(),
            prompt: self.prompt.clone(),
            system_prompt: self.system_prompt.clone(),
            args: Vec::new(),
            timeout: self.timeout,
            skip_git_repo_check: true,
            session: None,
        }
    }
}

/// Per-target outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl From<InvocationResult> for TargetOutcome {
    fn from(result: InvocationResult) -> Self {
        match result {
            Ok(response) => Self {
                success: true,
                response: Some(response),
                error: None,
                kind: None,
            },
            Err(e) => Self {
                success: false,
                response: None,
                error: Some(e.to_string()),
                kind: Some(e.kind()),
            },
        }
    }
}

/// Outcomes keyed by target name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FanOutResult(pub BTreeMap<String, TargetOutcome>);

impl FanOutResult {
    pub fn get(&self, target: &str) -> Option<&TargetOutcome> {
        self.0.get(target)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.0.values().filter(|o| o.success).count()
    }
}

/// Invoke every target concurrently, at most `permits` at a time, and wait for all of them
pub async fn fan_out(
    invoker: Arc<dyn Invoker>,
    request: &FanOutRequest,
    cancel: &CancellationToken,
    permits: Arc<Semaphore>,
) -> FanOutResult {
    let targets: BTreeSet<&str> = request.targets.iter().map(String::as_str).collect();
    if targets.is_empty() {
        return FanOutResult::default();
    }

    info!("Fanning out to {} target(s)", targets.len());

    let handles: Vec<_> = targets
        .into_iter()
        .map(|target| {
            let invoker = Arc::clone(&invoker);
            let invocation = request.invocation_for(target);
            let cancel = cancel.clone();
            let permits = Arc::clone(&permits);
            let handle = tokio::spawn(async move {
                let permit = tokio::select! {
                    permit = permits.acquire_owned() => permit.ok(),
                    _ = cancel.cancelled() => None,
                };
                let Some(_permit) = permit else {
                    return Err(InvocationError::Cancelled(format!(
                        "Invocation of {} was cancelled before it started",
                        invocation.target
                    )));
                };
                invoker.invoke(&invocation, &cancel).await
            });
            (target.to_string(), handle)
        })
        .collect();

    let (names, handles): (Vec<String>, Vec<_>) = handles.into_iter().unzip();
    let settled = futures::future::join_all(handles).await;

    let mut outcomes = BTreeMap::new();
    for (name, joined) in names.into_iter().zip(settled) {
        let result = match joined {
            Ok(result) => result,
            Err(e) if e.is_panic() => {
                Err(InvocationError::Unexpected(panic_message(e.into_panic().as_ref())))
            }
            Err(_) => Err(InvocationError::Cancelled(format!(
                "Invocation of {} was aborted",
                name
            ))),
        };
        debug!("Fan-out {} settled (ok: {})", name, result.is_ok());
        outcomes.insert(name, TargetOutcome::from(result));
    }

    let result = FanOutResult(outcomes);
    info!(
        "Fan-out finished: {}/{} succeeded",
        result.succeeded(),
        result.len()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Barrier;

    fn slots(n: usize) -> Arc<Semaphore> {
        Arc::new(Semaphore::new(n))
    }

    /// Answers by target name; every call waits on a shared barrier
    struct ScriptedInvoker {
        barrier: Option<Barrier>,
    }

    #[async_trait]
    impl Invoker for ScriptedInvoker {
        async fn invoke(
            &self,
            request: &InvocationRequest,
            _cancel: &CancellationToken,
        ) -> InvocationResult {
            if let Some(barrier) = &self.barrier {
                barrier.wait().await;
            }
            match request.target.as_str() {
                "slow" => Err(InvocationError::Timeout {
                    target: "slow".into(),
                    secs: request.timeout.unwrap_or(300),
                }),
                "panics" => panic!("branch exploded"),
                "missing" => Err(InvocationError::TargetNotFound("missing".into())),
                other => Ok(format!("{}: {}", other, request.prompt)),
            }
        }
    }

    fn invoker(parties: Option<usize>) -> Arc<dyn Invoker> {
        Arc::new(ScriptedInvoker {
            barrier: parties.map(Barrier::new),
        })
    }

    #[tokio::test]
    async fn test_mixed_outcomes() {
        let request = FanOutRequest::new("ping", ["fast", "slow"]).timeout(1);
        let result = fan_out(invoker(None), &request, &CancellationToken::new(), slots(4)).await;

        assert_eq!(result.len(), 2);
        let fast = result.get("fast").unwrap();
        assert!(fast.success);
        assert_eq!(fast.response.as_deref(), Some("fast: ping"));

        let slow = result.get("slow").unwrap();
        assert!(!slow.success);
        assert_eq!(slow.kind, Some(ErrorKind::Timeout));
        assert!(slow.error.as_deref().unwrap().contains("1s"));
    }

    #[tokio::test]
    async fn test_empty_targets() {
        let result = fan_out(
            invoker(None),
            &FanOutRequest::new("ping", Vec::<String>::new()),
            &CancellationToken::new(),
            slots(4),
        )
        .await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_branches_run_concurrently() {
        let request = FanOutRequest::new("ping", ["a", "b", "c"]);
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            fan_out(invoker(Some(3)), &request, &CancellationToken::new(), slots(3)),
        )
        .await
        .expect("branches should meet at the barrier");
        assert_eq!(result.succeeded(), 3);
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let request = FanOutRequest::new("ping", ["ok", "panics", "missing"]);
        let result = fan_out(invoker(None), &request, &CancellationToken::new(), slots(4)).await;

        assert!(result.get("ok").unwrap().success);
        let panicked = result.get("panics").unwrap();
        assert_eq!(panicked.kind, Some(ErrorKind::Unexpected));
        assert_eq!(panicked.error.as_deref(), Some("branch exploded"));
        assert_eq!(
            result.get("missing").unwrap().kind,
            Some(ErrorKind::TargetNotFound)
        );
    }

    #[tokio::test]
    async fn test_duplicate_targets_collapse() {
        let request = FanOutRequest::new("ping", ["a", "a", "b"]);
        let result = fan_out(invoker(None), &request, &CancellationToken::new(), slots(4)).await;
        assert_eq!(result.len(), 2);
    }

    /// Tracks how many invocations are in flight at once
    #[derive(Default)]
    struct CountingInvoker {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Invoker for CountingInvoker {
        async fn invoke(
            &self,
            request: &InvocationRequest,
            _cancel: &CancellationToken,
        ) -> InvocationResult {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(request.target.clone())
        }
    }

    #[tokio::test]
    async fn test_branches_share_worker_bound() {
        let counting = Arc::new(CountingInvoker::default());
        let request = FanOutRequest::new("ping", ["a", "b", "c", "d", "e", "f"]);

        let result = fan_out(
            Arc::clone(&counting) as Arc<dyn Invoker>,
            &request,
            &CancellationToken::new(),
            slots(2),
        )
        .await;

        assert_eq!(result.succeeded(), 6);
        let peak = counting.peak.load(Ordering::SeqCst);
        assert!((1..=2).contains(&peak), "peak concurrency {}", peak);
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_for_slot() {
        let held = slots(1);
        let _busy = Arc::clone(&held).acquire_owned().await.unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let request = FanOutRequest::new("ping", ["a"]);
        let result = fan_out(invoker(None), &request, &cancel, held).await;
        assert_eq!(result.get("a").unwrap().kind, Some(ErrorKind::Cancelled));
    }

    #[test]
    fn test_outcome_json_shape() {
        let ok = serde_json::to_value(TargetOutcome::from(Ok("hi".to_string()))).unwrap();
        assert_eq!(ok, serde_json::json!({"success": true, "response": "hi"}));

        let err = serde_json::to_value(TargetOutcome::from(Err(
            InvocationError::ExecutionFailed("boom".into()),
        )))
        .unwrap();
        assert_eq!(
            err,
            serde_json::json!({"success": false, "error": "boom", "type": "ExecutionFailed"})
        );
    }
}
