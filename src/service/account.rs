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

use crate::api::ApiError;

use super::models::{AccountInfo, DatabasePrivilege};
use super::PostgresqlService;

/// Account status reported once the account is locked
pub const ACCOUNT_STATUS_LOCKED: i64 = 5;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DescribeAccountsResponse {
    total_count: i64,
    details: Vec<AccountInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DescribeAccountPrivilegesResponse {
    privilege_set: Vec<DatabasePrivilege>,
}

#[derive(Debug, Default, Deserialize)]
struct Empty {}

impl PostgresqlService {
    pub async fn create_account(
        &self,
        instance_id: &str,
        user_name: &str,
        password: &str,
        account_type: &str,
        remark: &str,
    ) -> Result<(), ApiError> {
        let mut request = json!({
            "DBInstanceId": instance_id,
            "UserName": user_name,
            "Password": password,
            "Type": account_type,
        });
        if !remark.is_empty() {
            request["Remark"] = json!(remark);
        }
        let _: Empty = self.call("CreateAccount", &request).await?;
        Ok(())
    }

    /// Look an account up by name
    pub async fn describe_account(
        &self,
        instance_id: &str,
        user_name: &str,
    ) -> Result<Option<AccountInfo>, ApiError> {
        const LIMIT: usize = 100;
        let mut offset = 0;
        loop {
            let response: DescribeAccountsResponse = self
                .call(
                    "DescribeAccounts",
                    &json!({ "DBInstanceId": instance_id, "Offset": offset, "Limit": LIMIT }),
                )
                .await?;
            let count = response.details.len();
            if let Some(account) = response
                .details
                .into_iter()
                .find(|account| account.user_name == user_name)
            {
                return Ok(Some(account));
            }
            if count < LIMIT || (offset + count) as i64 >= response.total_count {
                return Ok(None);
            }
            offset += LIMIT;
        }
    }

    pub async fn delete_account(&self, instance_id: &str, user_name: &str) -> Result<(), ApiError> {
        let _: Empty = self
            .call(
                "DeleteAccount",
                &json!({ "DBInstanceId": instance_id, "UserName": user_name }),
            )
            .await?;
        Ok(())
    }

    pub async fn modify_account_remark(
        &self,
        instance_id: &str,
        user_name: &str,
        remark: &str,
    ) -> Result<(), ApiError> {
        let _: Empty = self
            .call(
                "ModifyAccountRemark",
                &json!({
                    "DBInstanceId": instance_id,
                    "UserName": user_name,
                    "Remark": remark,
                }),
            )
            .await?;
        Ok(())
    }

    /// Lock or unlock an account
    pub async fn set_account_lock(
        &self,
        instance_id: &str,
        user_name: &str,
        locked: bool,
    ) -> Result<(), ApiError> {
        let action = if locked {
            "LockAccount"
        } else {
            "UnlockAccount"
        };
        let _: Empty = self
            .call(
                action,
                &json!({ "DBInstanceId": instance_id, "UserName": user_name }),
            )
            .await?;
        Ok(())
    }

    pub async fn describe_account_privileges(
        &self,
        instance_id: &str,
        user_name: &str,
    ) -> Result<Vec<DatabasePrivilege>, ApiError> {
        let response: DescribeAccountPrivilegesResponse = self
            .call(
                "DescribeAccountPrivileges",
                &json!({ "DBInstanceId": instance_id, "UserName": user_name }),
            )
            .await?;
        Ok(response.privilege_set)
    }
}
