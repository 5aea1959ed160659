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

//! Security groups and private network access, shared by instances and read-only groups

use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::ApiError;
use crate::error::Result;

use super::models::{Filter, NetInfo, SecurityGroup};
use super::{PostgresqlService, INSTANCE_NOT_FOUND, STATUS_CLOSED};

pub const NET_STATUS_OPENED: &str = "opened";

/// Object owning security groups and network accesses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkTarget<'s> {
    Instance(&'s str),
    ReadOnlyGroup {
        master_instance_id: &'s str,
        group_id: &'s str,
    },
}

impl NetworkTarget<'_> {
    fn request(&self) -> Value {
        match self {
            NetworkTarget::Instance(id) => json!({ "DBInstanceId": id }),
            NetworkTarget::ReadOnlyGroup { group_id, .. } => json!({ "ReadOnlyGroupId": group_id }),
        }
    }

    fn action(&self, instance: &'static str, group: &'static str) -> &'static str {
        match self {
            NetworkTarget::Instance(_) => instance,
            NetworkTarget::ReadOnlyGroup { .. } => group,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DescribeDBInstanceSecurityGroupsResponse {
    security_group_set: Vec<SecurityGroup>,
}

#[derive(Debug, Default, Deserialize)]
struct Empty {}

/// Private address in `vpc_id`/`subnet_id`
///
/// While an address is being replaced, `old_vip` is skipped unless it is also the expected `new_vip`.
pub fn find_private_net_info<'n>(
    infos: &'n [NetInfo],
    vpc_id: &str,
    subnet_id: &str,
    old_vip: &str,
    new_vip: &str,
) -> Option<&'n NetInfo> {
    infos.iter().find(|info| {
        info.net_type == "private"
            && info.vpc_id == vpc_id
            && info.subnet_id == subnet_id
            && (info.ip != old_vip || info.ip == new_vip)
    })
}

impl PostgresqlService {
    pub async fn describe_security_groups(
        &self,
        target: NetworkTarget<'_>,
    ) -> Result<Vec<SecurityGroup>, ApiError> {
        let response: DescribeDBInstanceSecurityGroupsResponse = self
            .call("DescribeDBInstanceSecurityGroups", &target.request())
            .await?;
        Ok(response.security_group_set)
    }

    pub async fn modify_security_groups(
        &self,
        target: NetworkTarget<'_>,
        security_group_ids: &[String],
    ) -> Result<(), ApiError> {
        let mut request = target.request();
        request["SecurityGroupIdSet"] = json!(security_group_ids);
        let _: Empty = self
            .call("ModifyDBInstanceSecurityGroups", &request)
            .await?;
        Ok(())
    }

    pub async fn create_network_access(
        &self,
        target: NetworkTarget<'_>,
        vpc_id: &str,
        subnet_id: &str,
        is_assign_vip: bool,
        vip: &str,
    ) -> Result<(), ApiError> {
        let mut request = target.request();
        request["VpcId"] = json!(vpc_id);
        request["SubnetId"] = json!(subnet_id);
        request["IsAssignVip"] = json!(is_assign_vip);
        if !vip.is_empty() {
            request["Vip"] = json!(vip);
        }
        let action = target.action(
            "CreateDBInstanceNetworkAccess",
            "CreateReadOnlyGroupNetworkAccess",
        );
        let _: Empty = self.call(action, &request).await?;
        Ok(())
    }

    pub async fn delete_network_access(
        &self,
        target: NetworkTarget<'_>,
        vpc_id: &str,
        subnet_id: &str,
        vip: &str,
    ) -> Result<(), ApiError> {
        let mut request = target.request();
        request["VpcId"] = json!(vpc_id);
        request["SubnetId"] = json!(subnet_id);
        request["Vip"] = json!(vip);
        let action = target.action(
            "DeleteDBInstanceNetworkAccess",
            "DeleteReadOnlyGroupNetworkAccess",
        );
        let _: Empty = self.call(action, &request).await?;
        Ok(())
    }

    /// Network addresses of the target
    pub async fn describe_net_infos(&self, target: NetworkTarget<'_>) -> Result<Vec<NetInfo>, ApiError> {
        match target {
            NetworkTarget::Instance(id) => Ok(self
                .describe_instance_attribute(id)
                .await?
                .map(|instance| instance.db_instance_net_info)
                .unwrap_or_default()),
            NetworkTarget::ReadOnlyGroup {
                master_instance_id,
                group_id,
            } => {
                let groups = self
                    .describe_readonly_groups(
                        &[
                            Filter::new("db-master-instance-id", master_instance_id),
                            Filter::new("read-only-group-id", group_id),
                        ],
                        "",
                        "",
                    )
                    .await?;
                Ok(groups
                    .into_iter()
                    .find(|group| group.read_only_group_id == group_id)
                    .map(|group| group.db_instance_net_info)
                    .unwrap_or_default())
            }
        }
    }

    /// Refresh the status of a private address, `closed` once it is gone
    pub async fn network_access_state(
        &self,
        target: NetworkTarget<'_>,
        vpc_id: &str,
        subnet_id: &str,
        old_vip: &str,
        new_vip: &str,
    ) -> Result<(Option<NetInfo>, String)> {
        let infos = match self.describe_net_infos(target).await {
            Ok(infos) => infos,
            Err(err) if err.code() == Some(INSTANCE_NOT_FOUND) => {
                return Ok((None, STATUS_CLOSED.to_string()))
            }
            Err(err) => return Err(err.into()),
        };
        match find_private_net_info(&infos, vpc_id, subnet_id, old_vip, new_vip) {
            Some(info) => Ok((Some(info.clone()), info.status.clone())),
            None => Ok((None, STATUS_CLOSED.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(net_type: &str, vpc: &str, subnet: &str, ip: &str, status: &str) -> NetInfo {
        NetInfo {
            net_type: net_type.to_string(),
            vpc_id: vpc.to_string(),
            subnet_id: subnet.to_string(),
            ip: ip.to_string(),
            status: status.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_find_private_net_info() {
        let infos = [
            info("public", "", "", "1.2.3.4", "opened"),
            info("private", "vpc-1", "subnet-1", "10.0.0.1", "opened"),
            info("private", "vpc-2", "subnet-2", "10.1.0.1", "opening"),
        ];
        let found = find_private_net_info(&infos, "vpc-2", "subnet-2", "", "").unwrap();
        assert_eq!(found.ip, "10.1.0.1");
        assert!(find_private_net_info(&infos, "vpc-3", "subnet-1", "", "").is_none());
    }

    #[test]
    fn test_find_private_net_info_skips_replaced_address() {
        let infos = [
            info("private", "vpc-1", "subnet-1", "10.0.0.1", "closing"),
            info("private", "vpc-1", "subnet-1", "10.0.0.9", "opening"),
        ];
        let found = find_private_net_info(&infos, "vpc-1", "subnet-1", "10.0.0.1", "").unwrap();
        assert_eq!(found.ip, "10.0.0.9");
        let found =
            find_private_net_info(&infos, "vpc-1", "subnet-1", "10.0.0.1", "10.0.0.1").unwrap();
        assert_eq!(found.ip, "10.0.0.1");
    }

    #[test]
    fn test_target_request() {
        assert_eq!(
            NetworkTarget::Instance("postgres-1").request(),
            json!({ "DBInstanceId": "postgres-1" })
        );
        let group = NetworkTarget::ReadOnlyGroup {
            master_instance_id: "postgres-1",
            group_id: "pgrogrp-1",
        };
        assert_eq!(group.request(), json!({ "ReadOnlyGroupId": "pgrogrp-1" }));
        assert_eq!(
            group.action("CreateDBInstanceNetworkAccess", "CreateReadOnlyGroupNetworkAccess"),
            "CreateReadOnlyGroupNetworkAccess"
        );
    }
}
