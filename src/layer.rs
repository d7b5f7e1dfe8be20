//! Tower middleware that wraps a service's calls in a [`RetryPolicy`].
//!
//! The request type must be `Clone` so each attempt can replay it. The
//! wrapped service's error type becomes [`AttemptError<E>`], which keeps
//! abort and timeout outcomes distinguishable from the service's own errors.

use crate::{AttemptError, RetryPolicy};
use futures::future::BoxFuture;
use std::fmt;
use std::task::{Context, Poll};
use tower_layer::Layer;
use tower_service::Service;

/// A [`Layer`] that applies a [`RetryPolicy`] to every call of the wrapped
/// service.
pub struct RetryLayer<T, E> {
    policy: RetryPolicy<T, E>,
}

impl<T, E> RetryLayer<T, E> {
    /// Wrap services with the given policy.
    pub fn new(policy: RetryPolicy<T, E>) -> Self {
        Self { policy }
    }
}

impl<T, E> Clone for RetryLayer<T, E> {
    fn clone(&self) -> Self {
        Self { policy: self.policy.clone() }
    }
}

impl<T, E> fmt::Debug for RetryLayer<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryLayer").field("policy", &self.policy).finish()
    }
}

impl<S, T, E> Layer<S> for RetryLayer<T, E> {
    type Service = RetryService<S, T, E>;

    fn layer(&self, inner: S) -> Self::Service {
        RetryService { inner, policy: self.policy.clone() }
    }
}

/// A service combinator returned by [`RetryLayer`].
pub struct RetryService<S, T, E> {
    inner: S,
    policy: RetryPolicy<T, E>,
}

impl<S: Clone, T, E> Clone for RetryService<S, T, E> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone(), policy: self.policy.clone() }
    }
}

impl<S: fmt::Debug, T, E> fmt::Debug for RetryService<S, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryService")
            .field("inner", &self.inner)
            .field("policy", &self.policy)
            .finish()
    }
}

impl<S, Request, T, E> Service<Request> for RetryService<S, T, E>
where
    S: Service<Request, Response = T, Error = E> + Clone + Send + 'static,
    S::Future: Send + 'static,
    Request: Clone + Send + 'static,
    T: Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    type Response = T;
    type Error = AttemptError<E>;
    type Future = BoxFuture<'static, Result<T, AttemptError<E>>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(AttemptError::Inner)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        // Take the ready service and leave a fresh clone in its place.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let policy = self.policy.clone();
        Box::pin(async move {
            policy
                .execute(move |_context, _options| inner.call(request.clone()))
                .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct TestError(String);

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "TestError: {}", self.0)
        }
    }

    impl std::error::Error for TestError {}

    #[tokio::test]
    async fn layered_service_retries_until_success() {
        let counter = Arc::new(AtomicUsize::new(0));
        let calls = counter.clone();
        let flaky = tower::service_fn(move |request: u32| {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(TestError("flaky".into()))
                } else {
                    Ok(request * 2)
                }
            }
        });

        let policy = RetryPolicy::<u32, TestError>::builder()
            .max_attempts(5)
            .delay(Duration::ZERO)
            .build()
            .expect("builder");
        let service = RetryLayer::new(policy).layer(flaky);

        let response = service.oneshot(21).await.expect("retries should win");
        assert_eq!(response, 42);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn layered_service_surfaces_the_last_error() {
        let service = RetryLayer::new(
            RetryPolicy::<u32, TestError>::builder()
                .max_attempts(2)
                .delay(Duration::ZERO)
                .build()
                .expect("builder"),
        )
        .layer(tower::service_fn(|_request: u32| async {
            Err::<u32, _>(TestError("down".into()))
        }));

        match service.oneshot(1).await.unwrap_err() {
            AttemptError::Inner(e) => assert_eq!(e.0, "down"),
            e => panic!("expected Inner, got {e:?}"),
        }
    }
}
