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

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::ApiError;
use crate::error::{Error, Result};
use crate::retry::{retry, retry_error, WRITE_RETRY_TIMEOUT};

use super::models::{BackupPlan, BaseBackup, CreateBackupPlanRequest, Filter, ModifyBackupPlanRequest};
use super::{PostgresqlService, FAILED_OPERATION_ERROR};

pub const BACKUP_PERIOD_TYPE_WEEK: &str = "week";
pub const BACKUP_PERIOD_TYPE_MONTH: &str = "month";
pub const MONTHLY_PLAN_NAME: &str = "custom_month";

/// Criteria of a base backup listing
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct BaseBackupQuery {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub min_finish_time: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub max_finish_time: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub order_by: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub order_by_type: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DescribeBackupPlansResponse {
    plans: Vec<BackupPlan>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct CreateBackupPlanResponse {
    plan_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DescribeBaseBackupsResponse {
    total_count: i64,
    base_backup_set: Vec<BaseBackup>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct CreateBaseBackupResponse {
    base_backup_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct Empty {}

/// Decode the JSON encoded list of days of a backup plan
pub fn backup_period_days(plan: &BackupPlan) -> Result<Vec<String>> {
    if plan.backup_period.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&plan.backup_period).map_err(|err| {
        Error::unexpected(format!(
            "malformed backup period {:?} of plan {}: {err}",
            plan.backup_period, plan.plan_id
        ))
    })
}

impl PostgresqlService {
    pub async fn describe_backup_plans(&self, instance_id: &str) -> Result<Vec<BackupPlan>, ApiError> {
        let response: DescribeBackupPlansResponse = self
            .call("DescribeBackupPlans", &json!({ "DBInstanceId": instance_id }))
            .await?;
        Ok(response.plans)
    }

    pub async fn modify_backup_plan(&self, request: &ModifyBackupPlanRequest) -> Result<(), ApiError> {
        let _: Empty = self.call("ModifyBackupPlan", request).await?;
        Ok(())
    }

    /// Create an additional backup plan and return its id
    pub async fn create_backup_plan(
        &self,
        request: &CreateBackupPlanRequest,
    ) -> Result<String, ApiError> {
        let response: CreateBackupPlanResponse = self.call("CreateBackupPlan", request).await?;
        Ok(response.plan_id)
    }

    pub async fn delete_backup_plan(&self, instance_id: &str, plan_id: &str) -> Result<(), ApiError> {
        let _: Empty = self
            .call(
                "DeleteBackupPlan",
                &json!({ "DBInstanceId": instance_id, "PlanId": plan_id }),
            )
            .await?;
        Ok(())
    }

    pub async fn describe_base_backups(&self, query: &BaseBackupQuery) -> Result<Vec<BaseBackup>, ApiError> {
        const LIMIT: usize = 20;
        let mut backups = Vec::new();
        let mut offset = 0;
        loop {
            let mut request = serde_json::to_value(query).map_err(|err| ApiError::Config(err.to_string()))?;
            request["Offset"] = json!(offset);
            request["Limit"] = json!(LIMIT);
            let response: DescribeBaseBackupsResponse =
                self.call("DescribeBaseBackups", &request).await?;
            let count = response.base_backup_set.len();
            tracing::trace!(total = response.total_count, count, offset, "base backups page");
            backups.extend(response.base_backup_set);
            if count < LIMIT {
                return Ok(backups);
            }
            offset += LIMIT;
        }
    }

    /// Look a base backup up by id
    pub async fn describe_base_backup(&self, backup_id: &str) -> Result<Option<BaseBackup>> {
        let query = BaseBackupQuery {
            filters: vec![Filter::new("base-backup-id", backup_id)],
            ..Default::default()
        };
        let mut backups = self.describe_base_backups(&query).await?;
        match backups.len() {
            0 => Ok(None),
            1 => Ok(backups.pop()),
            n => Err(Error::unexpected(format!(
                "{n} base backups found with id {backup_id}"
            ))),
        }
    }

    /// Start a full backup and return its id
    pub async fn create_base_backup(&self, instance_id: &str) -> Result<String, ApiError> {
        let response: CreateBaseBackupResponse = self
            .call("CreateBaseBackup", &json!({ "DBInstanceId": instance_id }))
            .await?;
        Ok(response.base_backup_id)
    }

    pub async fn modify_base_backup_expire_time(
        &self,
        instance_id: &str,
        backup_id: &str,
        expire_time: &str,
    ) -> Result<(), ApiError> {
        let _: Empty = self
            .call(
                "ModifyBaseBackupExpireTime",
                &json!({
                    "DBInstanceId": instance_id,
                    "BaseBackupId": backup_id,
                    "NewExpireTime": expire_time,
                }),
            )
            .await?;
        Ok(())
    }

    pub async fn delete_base_backup(&self, instance_id: &str, backup_id: &str) -> Result<()> {
        retry(3 * WRITE_RETRY_TIMEOUT, || async {
            let _: Empty = self
                .call(
                    "DeleteBaseBackup",
                    &json!({ "DBInstanceId": instance_id, "BaseBackupId": backup_id }),
                )
                .await
                .map_err(|err| retry_error(err, &[FAILED_OPERATION_ERROR]))?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_period_days() {
        let plan = BackupPlan {
            backup_period: r#"["monday","friday"]"#.to_string(),
            ..Default::default()
        };
        assert_eq!(backup_period_days(&plan).unwrap(), ["monday", "friday"]);

        let plan = BackupPlan::default();
        assert!(backup_period_days(&plan).unwrap().is_empty());

        let plan = BackupPlan {
            backup_period: "monday".to_string(),
            plan_id: "plan-1".to_string(),
            ..Default::default()
        };
        let err = backup_period_days(&plan).unwrap_err();
        assert!(err.to_string().contains("plan-1"));
    }

    #[test]
    fn test_base_backup_query_skips_empty_criteria() {
        let query = BaseBackupQuery {
            order_by: "StartTime".to_string(),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({ "OrderBy": "StartTime" })
        );
    }
}
