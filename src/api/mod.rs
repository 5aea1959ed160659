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

//! Thin client for the TencentCloud JSON API
//!
//! Every action is a signed `POST /` whose body is the JSON request,
//! and whose answer is wrapped into a `{"Response": {...}}` envelope.

mod error;
mod ratelimit;
mod sign;

use std::fmt::Debug;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub use error::{ApiError, HTTP_STATUS_CODE_ERROR, NETWORK_ERROR};
pub use ratelimit::{RateLimiter, DEFAULT_LIMIT};

pub const DEFAULT_DOMAIN: &str = "tencentcloudapi.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Access keys used to sign the requests
#[derive(Clone)]
pub struct Credential {
    pub secret_id: String,
    pub secret_key: String,
    pub token: Option<String>,
}

impl Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("secret_id", &self.secret_id)
            .field("secret_key", &"<redacted>")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Where the requests are sent
#[derive(Debug, Clone)]
pub enum Endpoint {
    /// `{scheme}://{service}.{domain}`
    Domain { scheme: String, domain: String },
    /// Fixed base url for every service
    Base(String),
}

impl Endpoint {
    pub fn url(&self, service: &str) -> String {
        match self {
            Endpoint::Domain { scheme, domain } => format!("{scheme}://{service}.{domain}"),
            Endpoint::Base(base) => base.trim_end_matches('/').to_string(),
        }
    }

    pub fn host(&self, service: &str) -> String {
        match self {
            Endpoint::Domain { domain, .. } => format!("{service}.{domain}"),
            Endpoint::Base(base) => base
                .split_once("://")
                .map_or(base.as_str(), |(_, rest)| rest)
                .trim_end_matches('/')
                .to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Response")]
    response: JsonValue,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct ServiceError {
    code: String,
    message: String,
}

/// Signed client for the TencentCloud API
#[derive(Debug)]
pub struct Client {
    http: reqwest::Client,
    credential: Credential,
    region: String,
    endpoint: Endpoint,
    limiter: RateLimiter,
}

impl Client {
    pub fn new(
        credential: Credential,
        region: impl Into<String>,
        scheme: &str,
        domain: &str,
        timeout: Duration,
        rate_limit: u32,
    ) -> Result<Self, ApiError> {
        Self::build(
            credential,
            region.into(),
            Endpoint::Domain {
                scheme: scheme.to_lowercase(),
                domain: domain.to_string(),
            },
            timeout,
            rate_limit,
        )
    }

    /// Create a client sending every request to `base_url`
    ///
    /// Primarily used for testing with mock servers.
    pub fn with_base_url(
        credential: Credential,
        region: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ApiError> {
        Self::build(
            credential,
            region.into(),
            Endpoint::Base(base_url.into()),
            Duration::from_secs(30),
            1000,
        )
    }

    fn build(
        credential: Credential,
        region: String,
        endpoint: Endpoint,
        timeout: Duration,
        rate_limit: u32,
    ) -> Result<Self, ApiError> {
        if credential.secret_id.is_empty() || credential.secret_key.is_empty() {
            return Err(ApiError::Config(
                "secret_id and secret_key must not be empty".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ApiError::Config(err.to_string()))?;
        Ok(Self {
            http,
            credential,
            region,
            endpoint,
            limiter: RateLimiter::new(rate_limit),
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Send `action` to `service` and decode the content of the response envelope
    pub async fn call<Req, Resp>(
        &self,
        service: &str,
        version: &str,
        action: &str,
        request: &Req,
    ) -> Result<Resp, ApiError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_vec(request).map_err(|source| ApiError::Decode {
            action: action.to_string(),
            source,
        })?;

        self.limiter.check(action).await;

        let host = self.endpoint.host(service);
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
        let authorization = sign::authorization(
            &self.credential.secret_id,
            &self.credential.secret_key,
            service,
            &host,
            timestamp,
            &payload,
        )
        .map_err(|err| ApiError::Config(err.to_string()))?;

        let mut builder = self
            .http
            .post(self.endpoint.url(service))
            .header("Content-Type", sign::CONTENT_TYPE)
            .header("Host", &host)
            .header("Authorization", authorization)
            .header("X-TC-Action", action)
            .header("X-TC-Version", version)
            .header("X-TC-Timestamp", timestamp.to_string())
            .header("X-TC-Language", "en-US");
        if !self.region.is_empty() {
            builder = builder.header("X-TC-Region", &self.region);
        }
        if let Some(token) = &self.credential.token {
            builder = builder.header("X-TC-Token", token);
        }

        let started = std::time::Instant::now();
        tracing::debug!(
            action,
            request = %String::from_utf8_lossy(&payload),
            "api request"
        );

        let response = builder.body(payload).send().await.map_err(ApiError::Network)?;
        let status = response.status();
        let body = response.bytes().await.map_err(ApiError::Network)?;

        if !status.is_success() {
            tracing::debug!(action, %status, "api request failed");
            return Err(ApiError::service(
                HTTP_STATUS_CODE_ERROR,
                format!(
                    "HTTP status {}: {}",
                    status.as_u16(),
                    String::from_utf8_lossy(&body)
                ),
            ));
        }

        let decode = |source| ApiError::Decode {
            action: action.to_string(),
            source,
        };
        let Envelope { mut response } = serde_json::from_slice(&body).map_err(decode)?;
        let request_id = response
            .get("RequestId")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();

        tracing::debug!(
            action,
            request_id = %request_id,
            elapsed = ?started.elapsed(),
            response = %String::from_utf8_lossy(&body),
            "api response"
        );

        if let Some(error) = response.get("Error") {
            let error: ServiceError = serde_json::from_value(error.clone()).map_err(decode)?;
            return Err(ApiError::Service {
                code: error.code,
                message: error.message,
                request_id,
            });
        }

        strip_nulls(&mut response);
        serde_json::from_value(response).map_err(decode)
    }
}

/// Remove `null` members so that absent and null fields both fall back to their default
fn strip_nulls(value: &mut JsonValue) {
    match value {
        JsonValue::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        JsonValue::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => (),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_domain() {
        let endpoint = Endpoint::Domain {
            scheme: "https".to_string(),
            domain: DEFAULT_DOMAIN.to_string(),
        };
        assert_eq!(
            endpoint.url("postgres"),
            "https://postgres.tencentcloudapi.com"
        );
        assert_eq!(endpoint.host("tag"), "tag.tencentcloudapi.com");
    }

    #[test]
    fn test_endpoint_base() {
        let endpoint = Endpoint::Base("http://127.0.0.1:8080/".to_string());
        assert_eq!(endpoint.url("postgres"), "http://127.0.0.1:8080");
        assert_eq!(endpoint.host("postgres"), "127.0.0.1:8080");
    }

    #[test]
    fn test_strip_nulls() {
        let mut value = serde_json::json!({
            "TagList": null,
            "DBInstanceSet": [{"Uid": null, "DBInstanceId": "postgres-1"}],
        });
        strip_nulls(&mut value);
        assert_eq!(
            value,
            serde_json::json!({"DBInstanceSet": [{"DBInstanceId": "postgres-1"}]})
        );
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential {
            secret_id: "AKID".to_string(),
            secret_key: "very-secret".to_string(),
            token: Some("token".to_string()),
        };
        let debug = format!("{credential:?}");
        assert!(debug.contains("AKID"));
        assert!(!debug.contains("very-secret"));
        assert!(!debug.contains("\"token\""));
    }

    #[test]
    fn test_empty_credential_is_rejected() {
        let credential = Credential {
            secret_id: String::new(),
            secret_key: "key".to_string(),
            token: None,
        };
        let err = Client::with_base_url(credential, "ap-guangzhou", "http://localhost").unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }
}
