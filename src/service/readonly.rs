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
use crate::error::{Error, Result};

use super::models::{CreateReadOnlyInstanceRequest, Filter, ReadOnlyGroup, ReadOnlyGroupConfig};
use super::{PostgresqlService, INSTANCE_NOT_FOUND, STATUS_CLOSED};

/// Status of a read-only group ready to serve
pub const GROUP_STATUS_OK: &str = "ok";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct CreateReadOnlyDBInstanceResponse {
    deal_names: Vec<String>,
    #[serde(rename = "DBInstanceIdSet")]
    db_instance_id_set: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DescribeReadOnlyGroupsResponse {
    total_count: i64,
    read_only_group_list: Vec<ReadOnlyGroup>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct CreateReadOnlyGroupResponse {
    read_only_group_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct Empty {}

/// Group of `groups` the read-only instance `instance_id` belongs to
pub fn group_of_instance<'g>(groups: &'g [ReadOnlyGroup], instance_id: &str) -> Option<&'g ReadOnlyGroup> {
    groups.iter().find(|group| {
        group
            .read_only_db_instance_list
            .iter()
            .any(|instance| instance.db_instance_id == instance_id)
    })
}

impl PostgresqlService {
    /// Create a read-only instance and return its id
    pub async fn create_readonly_instance(
        &self,
        request: &CreateReadOnlyInstanceRequest,
    ) -> Result<String> {
        let response: CreateReadOnlyDBInstanceResponse =
            self.call("CreateReadOnlyDBInstance", request).await?;
        match response.db_instance_id_set.as_slice() {
            [id] => Ok(id.clone()),
            [] => Err(Error::unexpected(format!(
                "CreateReadOnlyDBInstance returned no instance id (deals {:?})",
                response.deal_names
            ))),
            _ => Err(Error::unexpected(
                "CreateReadOnlyDBInstance returned more than one instance id",
            )),
        }
    }

    /// Move a read-only instance from one group to another
    pub async fn modify_instance_readonly_group(
        &self,
        instance_id: &str,
        group_id: &str,
        new_group_id: &str,
    ) -> Result<(), ApiError> {
        let _: Empty = self
            .call(
                "ModifyDBInstanceReadOnlyGroup",
                &json!({
                    "DBInstanceId": instance_id,
                    "ReadOnlyGroupId": group_id,
                    "NewReadOnlyGroupId": new_group_id,
                }),
            )
            .await?;
        Ok(())
    }

    pub async fn describe_readonly_groups(
        &self,
        filters: &[Filter],
        order_by: &str,
        order_by_type: &str,
    ) -> Result<Vec<ReadOnlyGroup>, ApiError> {
        const PAGE_SIZE: usize = 10;
        let mut groups = Vec::new();
        let mut page = 1;
        loop {
            let mut request = json!({ "PageNumber": page, "PageSize": PAGE_SIZE });
            if !filters.is_empty() {
                request["Filters"] = json!(filters);
            }
            if !order_by.is_empty() {
                request["OrderBy"] = json!(order_by);
            }
            if !order_by_type.is_empty() {
                request["OrderByType"] = json!(order_by_type);
            }
            let response: DescribeReadOnlyGroupsResponse =
                self.call("DescribeReadOnlyGroups", &request).await?;
            let count = response.read_only_group_list.len();
            tracing::trace!(total = response.total_count, count, page, "read-only groups page");
            groups.extend(response.read_only_group_list);
            if count < PAGE_SIZE {
                return Ok(groups);
            }
            page += 1;
        }
    }

    /// Read-only groups attached to the master instance
    pub async fn describe_readonly_groups_of(
        &self,
        master_instance_id: &str,
    ) -> Result<Vec<ReadOnlyGroup>, ApiError> {
        self.describe_readonly_groups(
            &[Filter::new("db-master-instance-id", master_instance_id)],
            "",
            "",
        )
        .await
    }

    pub async fn describe_readonly_group(
        &self,
        group_id: &str,
    ) -> Result<Option<ReadOnlyGroup>, ApiError> {
        let groups = self
            .describe_readonly_groups(&[Filter::new("read-only-group-id", group_id)], "", "")
            .await?;
        Ok(groups
            .into_iter()
            .find(|group| group.read_only_group_id == group_id))
    }

    /// Id of the group holding the read-only instance, if any
    pub async fn readonly_group_of(
        &self,
        master_instance_id: &str,
        instance_id: &str,
    ) -> Result<Option<String>, ApiError> {
        let groups = self.describe_readonly_groups_of(master_instance_id).await?;
        Ok(group_of_instance(&groups, instance_id).map(|group| group.read_only_group_id.clone()))
    }

    /// Create a read-only group and return its id
    pub async fn create_readonly_group(&self, config: &ReadOnlyGroupConfig) -> Result<String, ApiError> {
        let response: CreateReadOnlyGroupResponse =
            self.call("CreateReadOnlyGroup", config).await?;
        Ok(response.read_only_group_id)
    }

    pub async fn modify_readonly_group_config(
        &self,
        config: &ReadOnlyGroupConfig,
    ) -> Result<(), ApiError> {
        let request = ReadOnlyGroupConfig {
            master_db_instance_id: String::new(),
            project_id: None,
            vpc_id: String::new(),
            subnet_id: String::new(),
            security_group_ids: Vec::new(),
            ..config.clone()
        };
        let _: Empty = self.call("ModifyReadOnlyGroupConfig", &request).await?;
        Ok(())
    }

    pub async fn delete_readonly_group(&self, group_id: &str) -> Result<(), ApiError> {
        let _: Empty = self
            .call("DeleteReadOnlyGroup", &json!({ "ReadOnlyGroupId": group_id }))
            .await?;
        Ok(())
    }

    /// Refresh the status of a read-only group, `closed` once it is gone
    pub async fn readonly_group_state(
        &self,
        master_instance_id: &str,
        group_id: &str,
    ) -> Result<(Option<ReadOnlyGroup>, String)> {
        let groups = match self.describe_readonly_groups_of(master_instance_id).await {
            Ok(groups) => groups,
            Err(err) if err.code() == Some(INSTANCE_NOT_FOUND) => {
                return Ok((None, STATUS_CLOSED.to_string()))
            }
            Err(err) => return Err(err.into()),
        };
        match groups
            .into_iter()
            .find(|group| group.read_only_group_id == group_id)
        {
            Some(group) => {
                let status = group.status.clone();
                Ok((Some(group), status))
            }
            None => Ok((None, STATUS_CLOSED.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::models::DbInstance;

    fn group(id: &str, instances: &[&str]) -> ReadOnlyGroup {
        ReadOnlyGroup {
            read_only_group_id: id.to_string(),
            read_only_db_instance_list: instances
                .iter()
                .map(|id| DbInstance {
                    db_instance_id: id.to_string(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_group_of_instance() {
        let groups = [
            group("pgrogrp-1", &["pgro-1", "pgro-2"]),
            group("pgrogrp-2", &["pgro-3"]),
        ];
        assert_eq!(
            group_of_instance(&groups, "pgro-3").map(|g| g.read_only_group_id.as_str()),
            Some("pgrogrp-2")
        );
        assert!(group_of_instance(&groups, "pgro-4").is_none());
    }
}
