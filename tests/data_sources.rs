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

use serde_json::{json, Value as JsonValue};
use tencentcloud_postgresql::api::{Client, Credential};
use tencentcloud_postgresql::data_sources::{InstancesDataSource, ZonesDataSource};
use tencentcloud_postgresql::service::PostgresqlService;
use tencentcloud_postgresql::ServiceHandle;
use tf_provider::value::Value;
use tf_provider::{DataSource, Diagnostics};
use wiremock::matchers::{body_partial_json, header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn handle(server: &MockServer) -> ServiceHandle {
    let credential = Credential {
        secret_id: "AKIDtest".to_string(),
        secret_key: "secret".to_string(),
        token: None,
    };
    ServiceHandle::new(PostgresqlService::new(
        Client::with_base_url(credential, "ap-guangzhou", server.uri()).unwrap(),
    ))
}

fn reply(content: JsonValue) -> ResponseTemplate {
    let mut response = content;
    response["RequestId"] = json!("req");
    ResponseTemplate::new(200).set_body_json(json!({ "Response": response }))
}

#[tokio::test]
async fn test_instances_with_root_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("X-TC-Action", "DescribeDBInstances"))
        .respond_with(reply(json!({
            "TotalCount": 2,
            "DBInstanceSet": [
                {
                    "DBInstanceId": "postgres-1",
                    "DBInstanceName": "main",
                    "DBInstanceStatus": "running",
                    "PayType": "prepaid",
                    "DBInstanceMemory": 4,
                    "DBInstanceNetInfo": [
                        { "NetType": "private", "Ip": "10.0.0.5", "Port": 5432, "Status": "opened" },
                    ],
                    "TagList": [{ "TagKey": "team", "TagValue": "db" }],
                },
                {
                    "DBInstanceId": "pgro-1",
                    "DBInstanceName": "replica",
                    "DBInstanceStatus": "running",
                },
            ],
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header("X-TC-Action", "DescribeAccounts"))
        .and(body_partial_json(json!({ "DBInstanceId": "postgres-1" })))
        .respond_with(reply(json!({
            "Details": [
                { "DBInstanceId": "postgres-1", "UserName": "app", "CreateTime": "2024-02-01 00:00:00" },
                { "DBInstanceId": "postgres-1", "UserName": "root", "CreateTime": "2024-01-01 00:00:00" },
            ],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let data_source = InstancesDataSource::new(handle(&server));
    let mut diags = Diagnostics::default();
    let state = data_source
        .read(&mut diags, Default::default(), Default::default())
        .await
        .unwrap();
    assert!(diags.errors.is_empty());

    let items = state.instance_list.as_ref_option().unwrap();
    assert_eq!(items.len(), 2);
    let main = items[0].as_ref_option().unwrap();
    assert_eq!(main.root_user.as_deref_option(), Some("root"));
    assert_eq!(main.charge_type.as_deref_option(), Some("PREPAID"));
    assert_eq!(main.private_access_ip.as_deref_option(), Some("10.0.0.5"));
    assert_eq!(main.public_access_switch, Value::Value(false));
    let replica = items[1].as_ref_option().unwrap();
    assert!(replica.root_user.is_null());
}

#[tokio::test]
async fn test_zones_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("X-TC-Action", "DescribeZones"))
        .respond_with(reply(json!({
            "Error": { "Code": "AuthFailure.SignatureFailure", "Message": "bad signature" },
        })))
        .mount(&server)
        .await;

    let data_source = ZonesDataSource::new(handle(&server));
    let mut diags = Diagnostics::default();
    let state = data_source
        .read(&mut diags, Default::default(), Default::default())
        .await;
    assert!(state.is_none());
    assert_eq!(diags.errors.len(), 1);
}

#[tokio::test]
async fn test_unconfigured_provider() {
    let data_source = ZonesDataSource::new(ServiceHandle::default());
    let mut diags = Diagnostics::default();
    let state = data_source
        .read(&mut diags, Default::default(), Default::default())
        .await;
    assert!(state.is_none());
    assert_eq!(diags.errors.len(), 1);
}
