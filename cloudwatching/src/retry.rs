// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Caller-side retry for transient tagging failures.
//!
//! [`TagResolver`](crate::TagResolver) never retries on its own. Callers that
//! want throttling and short outages absorbed wrap their session provider in
//! [`Retrying`]. Only failures classified by [`is_transient`] are retried;
//! credential and request errors surface on the first attempt. Backoff waits
//! end early when the caller's [`CancellationToken`] fires.

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use masterror::{AppError, AppErrorKind};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::tags::{GetResourcesRequest, ResourcePage, TagSessionProvider, TaggingApi};

/// Backoff schedule for transient tagging failures.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct RetryPolicy
{
    /// Attempts per call including the first one. Zero behaves as one.
    pub max_attempts:  u32,
    /// Wait before the second attempt; doubled after every further failure.
    pub initial_delay: Duration,
    /// Upper bound for a single wait.
    pub max_delay:     Duration,
}

impl Default for RetryPolicy
{
    fn default() -> Self
    {
        Self {
            max_attempts:  4,
            initial_delay: Duration::from_millis(200,),
            max_delay:     Duration::from_secs(5,),
        }
    }
}

impl RetryPolicy
{
    /// Wait applied after the failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32,) -> Duration
    {
        let doublings = attempt.saturating_sub(1,).min(16,);
        self.initial_delay.saturating_mul(1 << doublings,).min(self.max_delay,)
    }
}

/// Returns `true` for failures worth another attempt: throttling, timeouts,
/// network trouble and service-side errors.
pub fn is_transient(error: &AppError,) -> bool
{
    matches!(
        error.kind,
        AppErrorKind::Service
            | AppErrorKind::RateLimited
            | AppErrorKind::Timeout
            | AppErrorKind::Network
            | AppErrorKind::DependencyUnavailable
    )
}

/// Runs `call` until it succeeds, fails permanently, runs out of attempts or
/// `cancel` fires during a backoff wait.
///
/// # Errors
///
/// Returns the last error produced by `call`.
///
/// # Example
///
/// ```no_run
/// use cloudwatching::retry::{RetryPolicy, retry_transient};
/// use masterror::AppError;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), AppError> {
/// let cancel = CancellationToken::new();
/// let pages = retry_transient(&RetryPolicy::default(), "count pages", &cancel, || async {
///     Ok::<_, AppError,>(3,)
/// },)
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn retry_transient<F, Fut, T,>(
    policy: &RetryPolicy,
    operation: &str,
    cancel: &CancellationToken,
    mut call: F,
) -> Result<T, AppError,>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError,>,>,
{
    let max_attempts = policy.max_attempts.max(1,);
    let mut attempt = 1;

    loop {
        let error = match call().await {
            Ok(value,) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", operation, attempt);
                }
                return Ok(value,);
            }
            Err(error,) => error,
        };

        if !is_transient(&error,) {
            debug!("{} failed with non-retryable {}: {}", operation, error.kind, error);
            return Err(error,);
        }
        if attempt >= max_attempts {
            warn!("{} failed after {} attempts: {}", operation, attempt, error);
            return Err(error,);
        }

        let delay = policy.delay_after(attempt,);
        warn!(
            "{} failed on attempt {}/{}: {}; retrying in {:?}",
            operation, attempt, max_attempts, error, delay
        );
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("{} retry abandoned after cancellation", operation);
                return Err(error,);
            }
            () = sleep(delay,) => {}
        }
        attempt += 1;
    }
}

/// Decorator adding transient-failure retries to a tagging session or
/// session provider.
#[derive(Debug, Clone,)]
pub struct Retrying<T,>
{
    inner:  T,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl<T,> Retrying<T,>
{
    /// Wraps `inner` with `policy`. Backoff waits run to completion until a
    /// token is attached with [`Retrying::with_cancellation`].
    pub fn new(inner: T, policy: RetryPolicy,) -> Self
    {
        Self {
            inner,
            policy,
            cancel: CancellationToken::new(),
        }
    }

    /// Stops backoff waits once `cancel` fires. Usually the token handed to
    /// [`TagResolver::resolve_tags`](crate::TagResolver::resolve_tags).
    pub fn with_cancellation(mut self, cancel: CancellationToken,) -> Self
    {
        self.cancel = cancel;
        self
    }
}

#[async_trait]
impl<A: TaggingApi,> TaggingApi for Retrying<A,>
{
    async fn get_resources(&self, request: &GetResourcesRequest,)
    -> Result<ResourcePage, AppError,>
    {
        retry_transient(&self.policy, "GetResources", &self.cancel, || {
            self.inner.get_resources(request,)
        },)
        .await
    }
}

/// Sessions opened through the provider retry their page requests and share
/// its cancellation token. Opening the session itself is not retried.
impl<P: TagSessionProvider,> TagSessionProvider for Retrying<P,>
{
    type Api = Retrying<P::Api,>;

    fn open_session(&self, region: &str,) -> Result<Self::Api, AppError,>
    {
        let api = self.inner.open_session(region,)?;
        Ok(Retrying::new(api, self.policy.clone(),).with_cancellation(self.cancel.clone(),),)
    }
}
