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

use thiserror::Error;

/// Error code reported for transport failures.
pub const NETWORK_ERROR: &str = "ClientError.NetworkError";
/// Error code reported when the HTTP layer answers with a non-success status.
pub const HTTP_STATUS_CODE_ERROR: &str = "ClientError.HttpStatusCodeError";

/// Errors returned by the cloud API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The service answered with an `Error` object in its response envelope.
    #[error("[TencentCloudSDKError] Code={code}, Message={message}, RequestId={request_id}")]
    Service {
        code: String,
        message: String,
        request_id: String,
    },

    /// The request could not be sent or the answer could not be received.
    #[error("[TencentCloudSDKError] Code=ClientError.NetworkError, Message={0}")]
    Network(#[source] reqwest::Error),

    /// The answer was received but is not a valid response envelope.
    #[error("failed to decode {action} response: {source}")]
    Decode {
        action: String,
        #[source]
        source: serde_json::Error,
    },

    /// The client is not usable with the given settings.
    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// Error code as reported by the service, or the client-side code for transport failures.
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Service { code, .. } => Some(code),
            ApiError::Network(_) => Some(NETWORK_ERROR),
            ApiError::Decode { .. } | ApiError::Config(_) => None,
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            ApiError::Service { request_id, .. } => Some(request_id),
            _ => None,
        }
    }

    /// Build a service error without a request id, mostly used for client-side checks.
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Service {
            code: code.into(),
            message: message.into(),
            request_id: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_display() {
        let err = ApiError::Service {
            code: "ResourceNotFound.InstanceNotFoundError".to_string(),
            message: "instance not found".to_string(),
            request_id: "42".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "[TencentCloudSDKError] Code=ResourceNotFound.InstanceNotFoundError, Message=instance not found, RequestId=42"
        );
        assert_eq!(err.code(), Some("ResourceNotFound.InstanceNotFoundError"));
        assert_eq!(err.request_id(), Some("42"));
    }

    #[test]
    fn test_config_error_has_no_code() {
        let err = ApiError::Config("missing region".to_string());
        assert_eq!(err.code(), None);
        assert_eq!(
            err.to_string(),
            "invalid client configuration: missing region"
        );
    }

    #[test]
    fn test_service_helper() {
        let err = ApiError::service(HTTP_STATUS_CODE_ERROR, "status 502");
        assert_eq!(err.code(), Some(HTTP_STATUS_CODE_ERROR));
        assert_eq!(err.request_id(), Some(""));
    }
}
