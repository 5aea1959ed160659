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
use tencentcloud_postgresql::resources::{AccountResource, AccountState};
use tencentcloud_postgresql::service::PostgresqlService;
use tencentcloud_postgresql::ServiceHandle;
use tf_provider::value::Value;
use tf_provider::{Diagnostics, Resource};
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

fn planned_account<'a>() -> AccountState<'a> {
    AccountState {
        id: Value::Unknown,
        db_instance_id: "postgres-1".into(),
        user_name: "app".into(),
        password: "Secret#123".into(),
        account_type: "normal".into(),
        remark: Value::Null,
        lock_status: Value::Value(false),
    }
}

#[tokio::test]
async fn test_account_create_waits_for_busy_instance() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("X-TC-Action", "CreateAccount"))
        .respond_with(reply(json!({
            "Error": {
                "Code": "OperationDenied.InstanceStatusLimitOpError",
                "Message": "instance is busy",
            }
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header("X-TC-Action", "CreateAccount"))
        .and(body_partial_json(json!({
            "DBInstanceId": "postgres-1",
            "UserName": "app",
            "Type": "normal",
        })))
        .respond_with(reply(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header("X-TC-Action", "DescribeAccounts"))
        .respond_with(reply(json!({
            "TotalCount": 1,
            "Details": [{
                "DBInstanceId": "postgres-1",
                "UserName": "app",
                "Status": 4,
                "UserType": "normal",
            }],
        })))
        .mount(&server)
        .await;

    let resource = AccountResource::new(handle(&server));
    let mut diags = Diagnostics::default();
    let (state, _) = resource
        .create(
            &mut diags,
            planned_account(),
            planned_account(),
            Default::default(),
            Default::default(),
        )
        .await
        .unwrap();
    assert!(diags.errors.is_empty());
    assert_eq!(state.id.as_deref_option(), Some("postgres-1#app"));
    assert_eq!(state.lock_status, Value::Value(false));
    assert!(state.remark.is_null());
}

#[tokio::test]
async fn test_account_create_stops_on_terminal_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("X-TC-Action", "CreateAccount"))
        .respond_with(reply(json!({
            "Error": {
                "Code": "InvalidParameterValue.InvalidPasswordFormat",
                "Message": "weak password",
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resource = AccountResource::new(handle(&server));
    let mut diags = Diagnostics::default();
    let state = resource
        .create(
            &mut diags,
            planned_account(),
            planned_account(),
            Default::default(),
            Default::default(),
        )
        .await;
    assert!(state.is_none());
    assert_eq!(diags.errors.len(), 1);
}
