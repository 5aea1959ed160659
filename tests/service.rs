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
use tencentcloud_postgresql::error::Error;
use tencentcloud_postgresql::service::models::{CreateInstancesRequest, Filter};
use tencentcloud_postgresql::service::{is_not_found, PostgresqlService};
use wiremock::matchers::{body_partial_json, header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn service(server: &MockServer) -> PostgresqlService {
    let credential = Credential {
        secret_id: "AKIDtest".to_string(),
        secret_key: "secret".to_string(),
        token: None,
    };
    PostgresqlService::new(
        Client::with_base_url(credential, "ap-guangzhou", server.uri()).unwrap(),
    )
}

fn reply(content: JsonValue) -> ResponseTemplate {
    let mut response = content;
    response["RequestId"] = json!("req");
    ResponseTemplate::new(200).set_body_json(json!({ "Response": response }))
}

fn instance(id: &str, status: &str) -> JsonValue {
    json!({
        "DBInstanceId": id,
        "DBInstanceName": format!("name-{id}"),
        "DBInstanceStatus": status,
        "Zone": "ap-guangzhou-3",
        "PayType": "postpaid",
    })
}

#[tokio::test]
async fn test_describe_instances_pages() {
    let server = MockServer::start().await;
    let first: Vec<_> = (0..10).map(|i| instance(&format!("postgres-{i}"), "running")).collect();
    Mock::given(method("POST"))
        .and(header("X-TC-Action", "DescribeDBInstances"))
        .and(body_partial_json(json!({ "Offset": 0, "Limit": 10 })))
        .respond_with(reply(json!({ "TotalCount": 11, "DBInstanceSet": first })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header("X-TC-Action", "DescribeDBInstances"))
        .and(body_partial_json(json!({
            "Offset": 10,
            "Filters": [{ "Name": "db-project-id", "Values": ["0"] }],
        })))
        .respond_with(reply(json!({
            "TotalCount": 11,
            "DBInstanceSet": [instance("postgres-10", "running")],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let instances = service(&server)
        .await
        .describe_instances(&[Filter::new("db-project-id", "0")])
        .await
        .unwrap();
    assert_eq!(instances.len(), 11);
    assert_eq!(instances[10].db_instance_id, "postgres-10");
    assert_eq!(instances[0].db_instance_name, "name-postgres-0");
}

#[tokio::test]
async fn test_isolated_instance_is_gone() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("X-TC-Action", "DescribeDBInstanceAttribute"))
        .and(body_partial_json(json!({ "DBInstanceId": "postgres-1" })))
        .respond_with(reply(json!({ "DBInstance": instance("postgres-1", "isolated") })))
        .mount(&server)
        .await;

    let service = service(&server).await;
    assert!(service
        .describe_instance_by_id("postgres-1")
        .await
        .unwrap()
        .is_none());
    let (object, state) = service.instance_state("postgres-1").await.unwrap();
    assert!(object.is_none());
    assert_eq!(state, "closed");
    let (object, state) = service.instance_raw_state("postgres-1").await.unwrap();
    assert!(object.is_some());
    assert_eq!(state, "isolated");
}

#[tokio::test]
async fn test_not_found_instance_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("X-TC-Action", "DescribeDBInstanceAttribute"))
        .respond_with(reply(json!({
            "Error": {
                "Code": "ResourceNotFound.InstanceNotFoundError",
                "Message": "not found",
            }
        })))
        .mount(&server)
        .await;

    let service = service(&server).await;
    let (object, state) = service.instance_state("postgres-1").await.unwrap();
    assert!(object.is_none());
    assert_eq!(state, "closed");

    let err: Error = service
        .describe_instance_by_id("postgres-1")
        .await
        .unwrap_err()
        .into();
    assert!(is_not_found(&err));
}

#[tokio::test]
async fn test_create_instance_through_deal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("X-TC-Action", "CreateInstances"))
        .and(body_partial_json(json!({
            "SpecCode": "pg.it.medium4",
            "Storage": 100,
            "InstanceCount": 1,
            "Zone": "ap-guangzhou-3",
        })))
        .respond_with(reply(json!({ "DealNames": ["deal-1"], "DBInstanceIdSet": [] })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header("X-TC-Action", "DescribeOrders"))
        .and(body_partial_json(json!({ "DealNames": ["deal-1"] })))
        .respond_with(reply(json!({
            "Deals": [{ "DealName": "deal-1", "DBInstanceIdSet": ["postgres-new"] }],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = CreateInstancesRequest {
        spec_code: "pg.it.medium4".to_string(),
        storage: 100,
        instance_count: 1,
        zone: "ap-guangzhou-3".to_string(),
        ..Default::default()
    };
    let id = service(&server).await.create_instance(&request).await.unwrap();
    assert_eq!(id, "postgres-new");
}

#[tokio::test]
async fn test_create_instance_direct_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("X-TC-Action", "CreateInstances"))
        .respond_with(reply(json!({ "DBInstanceIdSet": ["postgres-direct"] })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header("X-TC-Action", "DescribeOrders"))
        .respond_with(reply(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let id = service(&server)
        .await
        .create_instance(&CreateInstancesRequest::default())
        .await
        .unwrap();
    assert_eq!(id, "postgres-direct");
}

#[tokio::test]
async fn test_open_public_access_retries_transient_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("X-TC-Action", "OpenDBExtranetAccess"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header("X-TC-Action", "OpenDBExtranetAccess"))
        .and(body_partial_json(json!({ "DBInstanceId": "postgres-1" })))
        .respond_with(reply(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    let mut opened = instance("postgres-1", "running");
    opened["DBInstanceNetInfo"] = json!([
        { "NetType": "private", "Ip": "10.0.0.5", "Port": 5432, "Status": "opened" },
        { "NetType": "public", "Address": "pg.example.com", "Port": 15432, "Status": "opened" },
    ]);
    Mock::given(method("POST"))
        .and(header("X-TC-Action", "DescribeDBInstanceAttribute"))
        .respond_with(reply(json!({ "DBInstance": opened })))
        .mount(&server)
        .await;

    service(&server)
        .await
        .modify_public_service(true, "postgres-1")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_close_public_access_without_public_entry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("X-TC-Action", "CloseDBExtranetAccess"))
        .respond_with(reply(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    let mut closed = instance("postgres-1", "running");
    closed["DBInstanceNetInfo"] = json!([
        { "NetType": "private", "Ip": "10.0.0.5", "Port": 5432, "Status": "opened" },
    ]);
    Mock::given(method("POST"))
        .and(header("X-TC-Action", "DescribeDBInstanceAttribute"))
        .respond_with(reply(json!({ "DBInstance": closed })))
        .mount(&server)
        .await;

    service(&server)
        .await
        .modify_public_service(false, "postgres-1")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_describe_readonly_group_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("X-TC-Action", "DescribeReadOnlyGroups"))
        .and(body_partial_json(json!({
            "PageNumber": 1,
            "Filters": [{ "Name": "read-only-group-id", "Values": ["pgrogrp-1"] }],
        })))
        .respond_with(reply(json!({
            "TotalCount": 1,
            "ReadOnlyGroupList": [{
                "ReadOnlyGroupId": "pgrogrp-1",
                "ReadOnlyGroupName": "readers",
                "MasterDBInstanceId": "postgres-1",
                "MaxReplayLag": 12.5,
                "Status": "ok",
            }],
        })))
        .mount(&server)
        .await;

    let group = service(&server)
        .await
        .describe_readonly_group("pgrogrp-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(group.read_only_group_name, "readers");
    assert_eq!(group.master_db_instance_id, "postgres-1");
    assert_eq!(group.max_replay_lag, 12.5);
}
