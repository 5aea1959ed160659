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

//! Provider configuration block and its resolution against the environment

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tf_provider::map;
use tf_provider::schema::{AttributeType, Block, Description, Schema};
use tf_provider::value::{ValueNumber, ValueString};
use tf_provider::{AttributePath, Diagnostics};

use crate::api::{Client, Credential, DEFAULT_DOMAIN, DEFAULT_LIMIT, DEFAULT_TIMEOUT};
use crate::utils::{optional, sensitive, WithSchema};

pub const ENV_SECRET_ID: &str = "TENCENTCLOUD_SECRET_ID";
pub const ENV_SECRET_KEY: &str = "TENCENTCLOUD_SECRET_KEY";
pub const ENV_SECURITY_TOKEN: &str = "TENCENTCLOUD_SECURITY_TOKEN";
pub const ENV_REGION: &str = "TENCENTCLOUD_REGION";
pub const ENV_PROTOCOL: &str = "TENCENTCLOUD_PROTOCOL";
pub const ENV_DOMAIN: &str = "TENCENTCLOUD_DOMAIN";
pub const ENV_REQUEST_TIMEOUT: &str = "TENCENTCLOUD_REQUEST_TIMEOUT";
pub const ENV_RATE_LIMIT: &str = "TENCENTCLOUD_RATE_LIMIT";

const DEFAULT_PROTOCOL: &str = "HTTPS";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig<'a> {
    #[serde(borrow = "'a")]
    pub secret_id: ValueString<'a>,
    pub secret_key: ValueString<'a>,
    pub security_token: ValueString<'a>,
    pub region: ValueString<'a>,
    pub protocol: ValueString<'a>,
    pub domain: ValueString<'a>,
    pub request_timeout: ValueNumber,
    pub rate_limit: ValueNumber,
}

impl WithSchema for ProviderConfig<'_> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "secret_id" => optional(
                        AttributeType::String,
                        "API secret id, defaults to $TENCENTCLOUD_SECRET_ID",
                    ),
                    "secret_key" => sensitive(optional(
                        AttributeType::String,
                        "API secret key, defaults to $TENCENTCLOUD_SECRET_KEY",
                    )),
                    "security_token" => sensitive(optional(
                        AttributeType::String,
                        "Temporary security token, defaults to $TENCENTCLOUD_SECURITY_TOKEN",
                    )),
                    "region" => optional(
                        AttributeType::String,
                        "Region of the resources, defaults to $TENCENTCLOUD_REGION",
                    ),
                    "protocol" => optional(
                        AttributeType::String,
                        "HTTP or HTTPS, defaults to $TENCENTCLOUD_PROTOCOL or HTTPS",
                    ),
                    "domain" => optional(
                        AttributeType::String,
                        "Root domain of the API, defaults to $TENCENTCLOUD_DOMAIN or tencentcloudapi.com",
                    ),
                    "request_timeout" => optional(
                        AttributeType::Number,
                        "Timeout of a single API request in seconds, defaults to 300",
                    ),
                    "rate_limit" => optional(
                        AttributeType::Number,
                        "Maximum number of requests per second and per action, defaults to 20",
                    ),
                },
                description: Description::plain("TencentCloud PostgreSQL"),
                ..Default::default()
            },
        }
    }
}

impl ProviderConfig<'_> {
    /// Check the values that are known at plan time
    pub fn validate(&self, diags: &mut Diagnostics) {
        if let Some(protocol) = self.protocol.as_deref_option() {
            if !protocol.eq_ignore_ascii_case("HTTP") && !protocol.eq_ignore_ascii_case("HTTPS") {
                diags.error(
                    "Invalid protocol",
                    format!("protocol must be HTTP or HTTPS, got {protocol:?}"),
                    AttributePath::new("protocol"),
                );
            }
        }
        for (name, value) in [
            ("request_timeout", &self.request_timeout),
            ("rate_limit", &self.rate_limit),
        ] {
            if let Some(value) = value.as_ref_option() {
                if *value <= 0 {
                    diags.error(
                        format!("Invalid {name}"),
                        format!("{name} must be positive, got {value}"),
                        AttributePath::new(name),
                    );
                }
            }
        }
    }

    /// Merge the configuration with the environment and the defaults
    pub fn resolve<F>(&self, diags: &mut Diagnostics, env: F) -> Option<Settings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |value: &ValueString, name: &str| {
            value
                .as_deref_option()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .or_else(|| env(name).filter(|s| !s.is_empty()))
        };
        let number = |value: &ValueNumber,
                      attribute: &'static str,
                      name: &'static str,
                      diags: &mut Diagnostics| {
            if let Some(value) = value.as_ref_option() {
                if *value > 0 {
                    return Some(*value);
                }
                diags.error(
                    format!("Invalid {attribute}"),
                    format!("{attribute} must be positive, got {value}"),
                    AttributePath::new(attribute),
                );
                return None;
            }
            let raw = env(name)?;
            match raw.trim().parse::<i64>() {
                Ok(value) if value > 0 => Some(value),
                _ => {
                    diags.root_error(
                        format!("Invalid ${name}"),
                        format!("${name} must be a positive integer, got {raw:?}"),
                    );
                    None
                }
            }
        };
        let mut require = |value: &ValueString, attribute: &'static str, name: &str| {
            let resolved = string(value, name);
            if resolved.is_none() {
                diags.error(
                    format!("Missing {attribute}"),
                    format!("`{attribute}` must be set in the provider block or with ${name}"),
                    AttributePath::new(attribute),
                );
            }
            resolved
        };

        let secret_id = require(&self.secret_id, "secret_id", ENV_SECRET_ID);
        let secret_key = require(&self.secret_key, "secret_key", ENV_SECRET_KEY);
        let region = require(&self.region, "region", ENV_REGION);
        let request_timeout =
            number(&self.request_timeout, "request_timeout", ENV_REQUEST_TIMEOUT, diags);
        let rate_limit = number(&self.rate_limit, "rate_limit", ENV_RATE_LIMIT, diags);
        let protocol = string(&self.protocol, ENV_PROTOCOL)
            .unwrap_or_else(|| DEFAULT_PROTOCOL.to_string())
            .to_uppercase();
        if !matches!(protocol.as_str(), "HTTP" | "HTTPS") {
            diags.root_error(
                "Invalid protocol",
                format!("protocol must be HTTP or HTTPS, got {protocol:?}"),
            );
        }
        if !diags.errors.is_empty() {
            return None;
        }

        Some(Settings {
            credential: Credential {
                secret_id: secret_id?,
                secret_key: secret_key?,
                token: string(&self.security_token, ENV_SECURITY_TOKEN),
            },
            region: region?,
            scheme: protocol.to_lowercase(),
            domain: string(&self.domain, ENV_DOMAIN).unwrap_or_else(|| DEFAULT_DOMAIN.to_string()),
            request_timeout: request_timeout
                .map_or(DEFAULT_TIMEOUT, |secs| Duration::from_secs(secs as u64)),
            rate_limit: rate_limit.map_or(DEFAULT_LIMIT, |limit| {
                u32::try_from(limit).unwrap_or(u32::MAX)
            }),
        })
    }
}

/// Fully resolved client settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub credential: Credential,
    pub region: String,
    pub scheme: String,
    pub domain: String,
    pub request_timeout: Duration,
    pub rate_limit: u32,
}

impl Settings {
    pub fn endpoint(&self, service: &str) -> String {
        format!("{}://{service}.{}", self.scheme, self.domain)
    }

    pub fn client(&self) -> Result<Client, crate::api::ApiError> {
        Client::new(
            self.credential.clone(),
            self.region.clone(),
            &self.scheme,
            &self.domain,
            self.request_timeout,
            self.rate_limit,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tf_provider::value::Value;

    use super::*;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_resolve_from_environment() {
        let mut diags = Diagnostics::default();
        let settings = ProviderConfig::default()
            .resolve(
                &mut diags,
                env(&[
                    (ENV_SECRET_ID, "AKID"),
                    (ENV_SECRET_KEY, "secret"),
                    (ENV_REGION, "ap-guangzhou"),
                    (ENV_RATE_LIMIT, "5"),
                ]),
            )
            .unwrap();
        assert!(diags.errors.is_empty());
        assert_eq!(settings.credential.secret_id, "AKID");
        assert_eq!(settings.credential.token, None);
        assert_eq!(settings.region, "ap-guangzhou");
        assert_eq!(settings.rate_limit, 5);
        assert_eq!(settings.request_timeout, DEFAULT_TIMEOUT);
        assert_eq!(
            settings.endpoint("postgres"),
            "https://postgres.tencentcloudapi.com"
        );
    }

    #[test]
    fn test_explicit_values_win() {
        let config = ProviderConfig {
            secret_id: Value::from("explicit"),
            secret_key: Value::from("key"),
            region: Value::from("ap-shanghai"),
            protocol: Value::from("HTTP"),
            domain: Value::from("internal.tencentcloudapi.com"),
            request_timeout: Value::from(30),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        let settings = config
            .resolve(&mut diags, env(&[(ENV_SECRET_ID, "from-env"), (ENV_REGION, "ap-beijing")]))
            .unwrap();
        assert_eq!(settings.credential.secret_id, "explicit");
        assert_eq!(settings.region, "ap-shanghai");
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
        assert_eq!(
            settings.endpoint("postgres"),
            "http://postgres.internal.tencentcloudapi.com"
        );
    }

    #[test]
    fn test_missing_credentials() {
        let mut diags = Diagnostics::default();
        let settings = ProviderConfig::default().resolve(&mut diags, env(&[(ENV_REGION, "ap-guangzhou")]));
        assert!(settings.is_none());
        assert_eq!(diags.errors.len(), 2);
    }

    #[test]
    fn test_invalid_environment_number() {
        let mut diags = Diagnostics::default();
        let settings = ProviderConfig::default().resolve(
            &mut diags,
            env(&[
                (ENV_SECRET_ID, "AKID"),
                (ENV_SECRET_KEY, "secret"),
                (ENV_REGION, "ap-guangzhou"),
                (ENV_REQUEST_TIMEOUT, "soon"),
            ]),
        );
        assert!(settings.is_none());
        assert_eq!(diags.errors.len(), 1);
    }

    #[test]
    fn test_validate() {
        let config = ProviderConfig {
            protocol: Value::from("FTP"),
            rate_limit: Value::from(0),
            request_timeout: Value::Unknown,
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        config.validate(&mut diags);
        assert_eq!(diags.errors.len(), 2);
    }

    #[test]
    fn test_explicit_number_must_be_positive() {
        let config = ProviderConfig {
            request_timeout: Value::from(-5),
            rate_limit: Value::from(0),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        let settings = config.resolve(
            &mut diags,
            env(&[
                (ENV_SECRET_ID, "AKID"),
                (ENV_SECRET_KEY, "secret"),
                (ENV_REGION, "ap-guangzhou"),
            ]),
        );
        assert!(settings.is_none());
        assert_eq!(diags.errors.len(), 2);
    }

    #[test]
    fn test_protocol_case_insensitive() {
        let config = ProviderConfig {
            secret_id: Value::from("AKID"),
            secret_key: Value::from("secret"),
            region: Value::from("ap-guangzhou"),
            protocol: Value::from("https"),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        config.validate(&mut diags);
        assert!(diags.errors.is_empty());
        let settings = config.resolve(&mut diags, env(&[])).unwrap();
        assert!(diags.errors.is_empty());
        assert_eq!(settings.scheme, "https");
    }
}
