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

use std::time::Duration;

use thiserror::Error;

use crate::api::ApiError;

/// Errors raised by the provider operations
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A composite id does not have the expected number of parts
    #[error("broken ID {id:?}: expected {expected} parts separated by '#'")]
    BrokenId { id: String, expected: usize },

    /// A retried operation kept failing with retryable errors
    #[error("timeout after {elapsed:?}: {last}")]
    Timeout {
        elapsed: Duration,
        #[source]
        last: Box<Error>,
    },

    /// A polled status never reached its target
    #[error("timeout while waiting for state to become '{}' (last state: '{last}', timeout: {timeout:?})", target.join(", "))]
    StateTimeout {
        target: Vec<String>,
        last: String,
        timeout: Duration,
    },

    /// A polled status went outside of the expected states
    #[error("unexpected state '{state}', wanted target '{}'", target.join(", "))]
    UnexpectedState { state: String, target: Vec<String> },

    /// Value given by the user cannot be applied
    #[error("{0}")]
    Invalid(String),

    /// The cloud answered with something the provider cannot work with
    #[error("{0}")]
    Unexpected(String),
}

impl Error {
    pub fn invalid(message: impl Into<String>) -> Self {
        Error::Invalid(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Error::Unexpected(message.into())
    }

    /// API error code, looking through timeouts
    pub fn code(&self) -> Option<&str> {
        match self {
            Error::Api(err) => err.code(),
            Error::Timeout { last, .. } => last.code(),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broken_id_display() {
        let err = Error::BrokenId {
            id: "postgres-xxx".to_string(),
            expected: 2,
        };
        assert_eq!(
            err.to_string(),
            "broken ID \"postgres-xxx\": expected 2 parts separated by '#'"
        );
    }

    #[test]
    fn test_state_timeout_display() {
        let err = Error::StateTimeout {
            target: vec!["running".to_string()],
            last: "initing".to_string(),
            timeout: Duration::from_secs(60),
        };
        assert_eq!(
            err.to_string(),
            "timeout while waiting for state to become 'running' (last state: 'initing', timeout: 60s)"
        );
    }

    #[test]
    fn test_code_through_timeout() {
        let err = Error::Timeout {
            elapsed: Duration::from_secs(1),
            last: Box::new(ApiError::service("ResourceBusy", "busy").into()),
        };
        assert_eq!(err.code(), Some("ResourceBusy"));
        assert_eq!(Error::invalid("nope").code(), None);
    }
}
