//! The function handler capability and its adapters.
//!
//! There is one canonical form, the async [`FunctionHandler`] trait, and
//! two convenience forms adapted into it at the registration boundary: an
//! async closure and a sync closure. Panics from the sync form are captured
//! and become failed outcomes instead of unwinding across the dispatch
//! boundary.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;

use crate::context::FunctionContext;

/// Error type carried out of a handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Asynchronously transforms `(context, payload)` into a response payload.
#[async_trait]
pub trait FunctionHandler: Send + Sync {
    /// Handles one invocation.
    async fn handle(&self, ctx: &FunctionContext, payload: &str) -> Result<String, HandlerError>;
}

/// Adapter for async closures.
pub(crate) struct AsyncFnHandler<F>(pub F);

#[async_trait]
impl<F, Fut> FunctionHandler for AsyncFnHandler<F>
where
    F: Fn(FunctionContext, String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, HandlerError>> + Send,
{
    async fn handle(&self, ctx: &FunctionContext, payload: &str) -> Result<String, HandlerError> {
        (self.0)(ctx.clone(), payload.to_owned()).await
    }
}

/// Adapter for sync closures; panics become failed outcomes.
pub(crate) struct SyncFnHandler<F>(pub F);

#[async_trait]
impl<F> FunctionHandler for SyncFnHandler<F>
where
    F: Fn(&FunctionContext, &str) -> Result<String, HandlerError> + Send + Sync,
{
    async fn handle(&self, ctx: &FunctionContext, payload: &str) -> Result<String, HandlerError> {
        match std::panic::catch_unwind(AssertUnwindSafe(|| (self.0)(ctx, payload))) {
            Ok(result) => result,
            Err(panic) => Err(panic_message(panic.as_ref()).into()),
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("handler panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("handler panicked: {message}")
    } else {
        "handler panicked".to_owned()
    }
}
