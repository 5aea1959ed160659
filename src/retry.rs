// This file is part of the terraform-provider-tencentcloud-postgresql project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bounded retries and status polling against the eventually consistent control plane

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::api::{ApiError, HTTP_STATUS_CODE_ERROR, NETWORK_ERROR};
use crate::error::{Error, Result};

pub const READ_RETRY_TIMEOUT: Duration = Duration::from_secs(3 * 60);
pub const WRITE_RETRY_TIMEOUT: Duration = Duration::from_secs(5 * 60);

const MIN_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Codes, or code prefixes, that denote a transient failure
const RETRYABLE_CODES: &[&str] = &[
    NETWORK_ERROR,
    HTTP_STATUS_CODE_ERROR,
    "FailedOperation",
    "TradeUnknownError",
    "RequestLimitExceeded",
    "ResourceInUse",
    "ResourceInsufficient",
    "ResourceUnavailable",
    "ResourceBusy",
    "InvalidParameter.ActionInProgress",
];

/// Outcome of a failed attempt
#[derive(Debug)]
pub enum RetryError {
    Retryable(Error),
    NonRetryable(Error),
}

impl RetryError {
    pub fn retryable(err: impl Into<Error>) -> Self {
        RetryError::Retryable(err.into())
    }

    pub fn non_retryable(err: impl Into<Error>) -> Self {
        RetryError::NonRetryable(err.into())
    }
}

fn is_retryable_code(code: &str, additional: &[&str]) -> bool {
    let prefix = code.split('.').next().unwrap_or(code);
    RETRYABLE_CODES
        .iter()
        .chain(additional)
        .any(|retryable| *retryable == code || *retryable == prefix)
}

/// Classify an API error as retryable or terminal
///
/// `additional` lists extra codes that are known to be transient for the calling operation.
pub fn retry_error(err: ApiError, additional: &[&str]) -> RetryError {
    match err.code() {
        Some(code) if is_retryable_code(code, additional) => {
            tracing::warn!(code, "retrying after transient error: {err}");
            RetryError::Retryable(err.into())
        }
        _ => RetryError::NonRetryable(err.into()),
    }
}

/// Classify the failure of a composite operation; only its API errors are retried
pub fn retry_any(err: Error, additional: &[&str]) -> RetryError {
    match err {
        Error::Api(err) => retry_error(err, additional),
        err => RetryError::NonRetryable(err),
    }
}

/// Call `f` until it succeeds, fails with a terminal error, or `timeout` elapses
pub async fn retry<T, F, Fut>(timeout: Duration, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, RetryError>>,
{
    let start = Instant::now();
    let mut backoff = MIN_BACKOFF;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(RetryError::NonRetryable(err)) => return Err(err),
            Err(RetryError::Retryable(err)) => {
                let elapsed = start.elapsed();
                if elapsed + backoff > timeout {
                    return Err(Error::Timeout {
                        elapsed,
                        last: Box::new(err),
                    });
                }
                tracing::debug!(?backoff, "retryable error: {err}");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }
    }
}

/// Poll a status until it reaches one of the target values
#[derive(Debug, Clone)]
pub struct StateChangeConf<'s> {
    /// States in which polling goes on; any state when empty
    pub pending: &'s [&'s str],
    pub target: &'s [&'s str],
    pub timeout: Duration,
    /// Wait before the first poll
    pub delay: Duration,
    pub poll_interval: Duration,
}

impl<'s> StateChangeConf<'s> {
    pub fn new(target: &'s [&'s str], timeout: Duration) -> Self {
        Self {
            pending: &[],
            target,
            timeout,
            delay: Duration::ZERO,
            poll_interval: Duration::from_secs(1),
        }
    }

    pub fn pending(mut self, pending: &'s [&'s str]) -> Self {
        self.pending = pending;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn target_owned(&self) -> Vec<String> {
        self.target.iter().map(|s| s.to_string()).collect()
    }

    /// Run `refresh` until the reported state is a target
    ///
    /// `refresh` returns the refreshed object, if any, along with its current state.
    pub async fn wait_for_state<T, F, Fut>(&self, mut refresh: F) -> Result<Option<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(Option<T>, String)>>,
    {
        let start = Instant::now();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let mut last = String::new();
        loop {
            let (object, state) = refresh().await?;
            if self.target.contains(&state.as_str()) {
                return Ok(object);
            }
            if !self.pending.is_empty() && !self.pending.contains(&state.as_str()) {
                return Err(Error::UnexpectedState {
                    state,
                    target: self.target_owned(),
                });
            }
            if last != state {
                tracing::debug!(state, target = ?self.target, "waiting for state");
                last = state;
            }
            if start.elapsed() + self.poll_interval > self.timeout {
                return Err(Error::StateTimeout {
                    target: self.target_owned(),
                    last,
                    timeout: self.timeout,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn service_error(code: &str) -> ApiError {
        ApiError::service(code, "message")
    }

    #[test]
    fn test_retryable_codes() {
        for code in [
            "ClientError.NetworkError",
            "ClientError.HttpStatusCodeError",
            "FailedOperation",
            "FailedOperation.DatabaseAffectedError",
            "ResourceBusy",
            "RequestLimitExceeded.UinLimitExceeded",
            "InvalidParameter.ActionInProgress",
        ] {
            assert!(
                matches!(retry_error(service_error(code), &[]), RetryError::Retryable(_)),
                "{code} should be retryable"
            );
        }
    }

    #[test]
    fn test_non_retryable_codes() {
        for code in [
            "ResourceNotFound.InstanceNotFoundError",
            "InvalidParameter",
            "InvalidParameterValue.InvalidParameterValueError",
            "OperationDenied.InstanceStatusLimitOpError",
            "AuthFailure.SignatureFailure",
        ] {
            assert!(
                matches!(retry_error(service_error(code), &[]), RetryError::NonRetryable(_)),
                "{code} should not be retryable"
            );
        }
    }

    #[test]
    fn test_additional_codes() {
        let err = service_error("OperationDenied.InstanceStatusLimitOpError");
        assert!(matches!(
            retry_error(err, &["OperationDenied.InstanceStatusLimitOpError"]),
            RetryError::Retryable(_)
        ));
    }

    #[test]
    fn test_composite_errors() {
        let err: Error = service_error("ResourceBusy").into();
        assert!(matches!(retry_any(err, &[]), RetryError::Retryable(_)));
        assert!(matches!(
            retry_any(Error::unexpected("no deal"), &[]),
            RetryError::NonRetryable(_)
        ));
    }

    #[test]
    fn test_decode_error_is_terminal() {
        let source = serde_json::from_str::<u32>("x").unwrap_err();
        let err = ApiError::Decode {
            action: "DescribeZones".to_string(),
            source,
        };
        assert!(matches!(retry_error(err, &[]), RetryError::NonRetryable(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_until_success() {
        let calls = AtomicUsize::new(0);
        let value = retry(WRITE_RETRY_TIMEOUT, || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 3 {
                Err(retry_error(service_error("ResourceBusy"), &[]))
            } else {
                Ok(42)
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_stops_on_terminal_error() {
        let calls = AtomicUsize::new(0);
        let err = retry(WRITE_RETRY_TIMEOUT, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(retry_error(service_error("AuthFailure"), &[]))
        })
        .await
        .unwrap_err();
        assert_eq!(err.code(), Some("AuthFailure"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_times_out() {
        let start = Instant::now();
        let err = retry(Duration::from_secs(30), || async {
            Err::<(), _>(retry_error(service_error("ResourceBusy"), &[]))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
        assert_eq!(err.code(), Some("ResourceBusy"));
        assert!(start.elapsed() <= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_state_reaches_target() {
        let polls = AtomicUsize::new(0);
        let object = StateChangeConf::new(&["running"], Duration::from_secs(60))
            .wait_for_state(|| async {
                let state = match polls.fetch_add(1, Ordering::SeqCst) {
                    0 | 1 => "initing",
                    _ => "running",
                };
                Ok((Some("postgres-1"), state.to_string()))
            })
            .await
            .unwrap();
        assert_eq!(object, Some("postgres-1"));
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_state_unexpected() {
        let err = StateChangeConf::new(&["opened"], Duration::from_secs(60))
            .pending(&["opening"])
            .wait_for_state(|| async { Ok((None::<()>, "closed".to_string())) })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedState { state, .. } if state == "closed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_state_timeout() {
        let err = StateChangeConf::new(&["isolated"], Duration::from_secs(10))
            .wait_for_state(|| async { Ok((None::<()>, "running".to_string())) })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StateTimeout { last, .. } if last == "running"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_state_refresh_error() {
        let err = StateChangeConf::new(&["running"], Duration::from_secs(10))
            .wait_for_state(|| async {
                Err::<(Option<()>, String), _>(Error::unexpected("boom"))
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
