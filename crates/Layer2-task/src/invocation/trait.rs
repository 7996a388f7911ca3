//! Invoker trait

use super::error::InvocationResult;
use super::executor::InvocationRequest;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Invoker trait - implement to add new invocation backends
#[async_trait]
pub trait Invoker: Send + Sync {
    /// Run one request to completion, stopping early when `cancel` fires
    async fn invoke(&self, request: &InvocationRequest, cancel: &CancellationToken)
        -> InvocationResult;
}
