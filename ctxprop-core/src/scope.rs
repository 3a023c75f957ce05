//! Ambient access to the current request's context.
//!
//! The context handle is made ambient with a task-local, so any code running
//! on behalf of the request — including the outbound client filters — can
//! reach it without threading an argument through every call. Work handed to
//! another task must be re-scoped explicitly: either through
//! [`spawn_scoped`], which captures the current context at the spawn point,
//! or by wrapping the future in [`scope`] with a cloned handle.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::context::RequestContext;

tokio::task_local! {
    static CURRENT_CONTEXT: Arc<RequestContext>;
}

/// The context of the request this task is working for, when inside a scope.
pub fn current() -> Option<Arc<RequestContext>> {
    CURRENT_CONTEXT.try_with(|ctx| ctx.clone()).ok()
}

/// Run `future` with `ctx` as the ambient context.
pub async fn scope<F>(ctx: Arc<RequestContext>, future: F) -> F::Output
where
    F: Future,
{
    CURRENT_CONTEXT.scope(ctx, future).await
}

/// Spawn a task that inherits the current ambient context, if any.
///
/// This is the fan-out discipline for concurrent outbound calls: the context
/// is captured here, at the spawn point, so the spawned task sees the same
/// store as its parent.
pub fn spawn_scoped<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    match current() {
        Some(ctx) => tokio::spawn(CURRENT_CONTEXT.scope(ctx, future)),
        None => tokio::spawn(future),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RequestContextConfig;
    use crate::index::FieldIndex;

    fn empty_context() -> Arc<RequestContext> {
        let index = Arc::new(FieldIndex::build(&RequestContextConfig::default()).unwrap());
        Arc::new(RequestContext::new(index))
    }

    #[tokio::test]
    async fn current_is_none_outside_scope() {
        assert!(current().is_none());
    }

    #[tokio::test]
    async fn scope_makes_context_ambient() {
        let ctx = empty_context();
        ctx.store().put("requestId", "r1");
        let seen = scope(ctx.clone(), async {
            current().and_then(|c| c.store().get("requestId"))
        })
        .await;
        assert_eq!(seen, Some("r1".to_string()));
        assert!(current().is_none());
    }

    #[tokio::test]
    async fn spawned_tasks_inherit_the_scope() {
        let ctx = empty_context();
        ctx.store().put("requestId", "r2");
        let seen = scope(ctx, async {
            spawn_scoped(async { current().and_then(|c| c.store().get("requestId")) })
                .await
                .unwrap()
        })
        .await;
        assert_eq!(seen, Some("r2".to_string()));
    }
}
