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

use serde::Deserialize;
use serde_json::json;
use tencentcloud_postgresql::api::{ApiError, Client, Credential, HTTP_STATUS_CODE_ERROR};
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credential(token: Option<&str>) -> Credential {
    Credential {
        secret_id: "AKIDtest".to_string(),
        secret_key: "secret".to_string(),
        token: token.map(str::to_string),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct Echo {
    request_id: String,
    total_count: i64,
    names: Vec<String>,
}

#[tokio::test]
async fn test_call_unwraps_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("X-TC-Action", "DescribeThings"))
        .and(header("X-TC-Version", "2017-03-12"))
        .and(header("X-TC-Region", "ap-guangzhou"))
        .and(header("X-TC-Token", "session"))
        .and(header("Content-Type", "application/json; charset=utf-8"))
        .and(header_exists("Authorization"))
        .and(header_exists("X-TC-Timestamp"))
        .and(body_json(json!({ "Limit": 10 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Response": {
                "RequestId": "req-1",
                "TotalCount": 2,
                "Names": ["a", null, "b"],
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::with_base_url(credential(Some("session")), "ap-guangzhou", server.uri())
        .unwrap();
    let echo: Echo = client
        .call("postgres", "2017-03-12", "DescribeThings", &json!({ "Limit": 10 }))
        .await
        .unwrap();
    assert_eq!(echo.request_id, "req-1");
    assert_eq!(echo.total_count, 2);
    assert_eq!(echo.names, vec!["a", "b"]);
}

#[tokio::test]
async fn test_call_null_members_fall_back_to_default() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Response": { "RequestId": "req-2", "TotalCount": null, "Names": null }
        })))
        .mount(&server)
        .await;

    let client = Client::with_base_url(credential(None), "ap-guangzhou", server.uri()).unwrap();
    let echo: Echo = client
        .call("postgres", "2017-03-12", "DescribeThings", &json!({}))
        .await
        .unwrap();
    assert_eq!(echo.total_count, 0);
    assert!(echo.names.is_empty());
}

#[tokio::test]
async fn test_call_service_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Response": {
                "RequestId": "req-3",
                "Error": {
                    "Code": "ResourceNotFound.InstanceNotFoundError",
                    "Message": "instance postgres-1 not found",
                }
            }
        })))
        .mount(&server)
        .await;

    let client = Client::with_base_url(credential(None), "ap-guangzhou", server.uri()).unwrap();
    let err = client
        .call::<_, Echo>("postgres", "2017-03-12", "DescribeDBInstanceAttribute", &json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some("ResourceNotFound.InstanceNotFoundError"));
    assert_eq!(err.request_id(), Some("req-3"));
    assert!(err.to_string().contains("instance postgres-1 not found"));
}

#[tokio::test]
async fn test_call_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let client = Client::with_base_url(credential(None), "ap-guangzhou", server.uri()).unwrap();
    let err = client
        .call::<_, Echo>("postgres", "2017-03-12", "DescribeZones", &json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(HTTP_STATUS_CODE_ERROR));
    assert!(err.to_string().contains("HTTP status 502: bad gateway"));
}

#[tokio::test]
async fn test_call_malformed_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Unexpected": {} })))
        .mount(&server)
        .await;

    let client = Client::with_base_url(credential(None), "ap-guangzhou", server.uri()).unwrap();
    let err = client
        .call::<_, Echo>("postgres", "2017-03-12", "DescribeRegions", &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Decode { ref action, .. } if action == "DescribeRegions"));
    assert_eq!(err.code(), None);
}
