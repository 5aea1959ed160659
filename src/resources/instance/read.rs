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

use std::collections::{BTreeMap, BTreeSet};

use tf_provider::value::Value;

use crate::error::{Error, Result};
use crate::retry::{retry, retry_error, RetryError, READ_RETRY_TIMEOUT};
use crate::service::models::{BackupPlan, DbInstance, EncryptionKey, Filter, NetInfo};
use crate::service::{
    backup_period_days, charge_type, NetworkTarget, PostgresqlService, BACKUP_PERIOD_TYPE_MONTH,
    BACKUP_PERIOD_TYPE_WEEK, INSTANCE_NOT_FOUND, INVALID_PARAMETER, RETRYABLE_STATUS,
};
use crate::utils::{non_empty, string, strings_list, strings_map, strings_set, text};

use super::state::{DbNodeState, InstanceState};

const MAX_STANDBY_ARCHIVE_DELAY: &str = "max_standby_archive_delay";
const MAX_STANDBY_STREAMING_DELAY: &str = "max_standby_streaming_delay";

/// Describe the instance, waiting out transient statuses
///
/// `None` when the instance is gone.
pub(super) async fn fetch_instance(
    service: &PostgresqlService,
    instance_id: &str,
) -> Result<Option<DbInstance>> {
    retry(READ_RETRY_TIMEOUT, || async {
        let instance = match service.describe_instance_by_id(instance_id).await {
            Ok(instance) => instance,
            Err(err) if matches!(err.code(), Some(INSTANCE_NOT_FOUND | INVALID_PARAMETER)) => {
                return Ok(None)
            }
            Err(err) => return Err(retry_error(err, &[])),
        };
        match instance {
            Some(instance) if RETRYABLE_STATUS.contains(&instance.db_instance_status.as_str()) => {
                Err(RetryError::retryable(Error::unexpected(format!(
                    "instance {instance_id} is {}, retrying",
                    instance.db_instance_status
                ))))
            }
            instance => Ok(instance),
        }
    })
    .await
}

fn is_public_open(info: &NetInfo) -> bool {
    // both spellings are reported
    info.status == "opened" || info.status == "1"
}

impl<'a> InstanceState<'a> {
    /// Refresh the whole state, `false` when the instance is gone
    pub(super) async fn read(&mut self, service: &PostgresqlService) -> Result<bool> {
        let instance_id = text(&self.id).to_string();
        let Some(instance) = fetch_instance(service, &instance_id).await? else {
            return Ok(false);
        };

        let accounts = service.describe_root_user(&instance_id).await?;
        self.apply_instance(&instance, accounts.first().map(|account| account.user_name.as_str()))?;

        let security_groups = service
            .describe_security_groups(NetworkTarget::Instance(&instance_id))
            .await?;
        self.apply_security_groups(
            security_groups
                .into_iter()
                .map(|group| group.security_group_id)
                .collect(),
        );

        let key = service.describe_encryption_key(&instance_id).await?;
        self.apply_encryption_key(key.as_ref());

        let instances = service
            .describe_instances(&[Filter::new("db-instance-id", &instance_id)])
            .await?;
        match instances.as_slice() {
            [listed] => self.uid = Value::Value(listed.uid),
            [] => {
                return Err(Error::unexpected(format!(
                    "no postgresql instance found by id: {instance_id}"
                )))
            }
            _ => {
                return Err(Error::unexpected(format!(
                    "found more than one postgresql instance by id: {instance_id}"
                )))
            }
        }

        let plans = service.describe_backup_plans(&instance_id).await?;
        self.apply_backup_plans(&plans)?;

        let params = service.describe_params(&instance_id).await?;
        self.apply_params(&params)?;
        Ok(true)
    }

    /// Copy the instance description into the state
    pub fn apply_instance(&mut self, instance: &DbInstance, root_user: Option<&str>) -> Result<()> {
        self.project_id = Value::Value(instance.project_id);
        self.availability_zone = string(&instance.zone);
        self.engine_version = string(&instance.db_version);
        self.db_kernel_version = string(&instance.db_kernel_version);
        self.db_major_version = string(&instance.db_major_version);
        self.name = string(&instance.db_instance_name);
        self.charset = string(&instance.db_charset);

        self.public_access_host = Value::Null;
        self.public_access_port = Value::Null;
        let mut public_access_switch = false;
        for info in instance.db_instance_net_info.iter().filter(|info| info.net_type == "public") {
            public_access_switch |= is_public_open(info);
            self.public_access_host = string(&info.address);
            self.public_access_port = Value::Value(info.port);
        }
        self.public_access_switch = Value::Value(public_access_switch);

        match instance.db_instance_net_info.as_slice() {
            [first, _, _] => {
                self.vpc_id = string(&first.vpc_id);
                self.subnet_id = string(&first.subnet_id);
                self.private_access_ip = string(&first.ip);
                self.private_access_port = Value::Value(first.port);
            }
            [_, _] => {
                self.vpc_id = string(&instance.vpc_id);
                self.subnet_id = string(&instance.subnet_id);
                self.private_access_ip = Value::Null;
                self.private_access_port = Value::Null;
                // private and inner never appear together
                let private = instance.db_instance_net_info.iter().find(|info| {
                    matches!(info.net_type.as_str(), "private" | "inner") && !info.ip.is_empty()
                });
                if let Some(private) = private {
                    self.private_access_ip = string(&private.ip);
                    self.private_access_port = Value::Value(private.port);
                }
            }
            _ => {
                return Err(Error::unexpected(
                    "DBInstanceNetInfo returned incorrect information",
                ))
            }
        }

        if let Some(root_user) = root_user.filter(|user| !user.is_empty()) {
            self.root_user = string(root_user);
        }
        self.charge_type = string(charge_type(&instance.pay_type));
        self.create_time = string(&instance.create_time);
        self.memory = Value::Value(instance.db_instance_memory);
        self.storage = Value::Value(instance.db_instance_storage);
        self.cpu = Value::Value(instance.db_instance_cpu);
        self.need_support_tde = Value::Value(instance.is_support_tde);
        self.tags = strings_map(
            instance
                .tag_list
                .iter()
                .map(|tag| (tag.tag_key.clone(), tag.tag_value.clone()))
                .collect(),
        );
        self.apply_nodes(instance);
        Ok(())
    }

    /// Nodes are only tracked when configured, or for multi-zone instances
    fn apply_nodes(&mut self, instance: &DbInstance) {
        let zones: BTreeSet<&str> = instance.db_node_set.iter().map(|node| node.zone.as_str()).collect();
        let configured: Vec<DbNodeState> = self.db_node_set.iter().flatten().flatten().cloned().collect();
        let multi_zone = zones.len() > 1 && zones.contains(instance.zone.as_str());
        if configured.is_empty() && !multi_zone {
            return;
        }
        let nodes = instance
            .db_node_set
            .iter()
            .map(|node| {
                let prior = configured.iter().find(|prior| text(&prior.zone) == node.zone);
                // keep the default role implicit when it was not configured
                let role = match prior {
                    Some(prior) if prior.role.is_null() && node.role == super::state::NODE_ROLE_STANDBY => {
                        Value::Null
                    }
                    _ => string(&node.role),
                };
                Value::Value(DbNodeState {
                    role,
                    zone: string(&node.zone),
                    dedicated_cluster_id: non_empty(&node.dedicated_cluster_id),
                })
            })
            .collect();
        self.db_node_set = Value::Value(nodes);
    }

    /// An instance without security groups keeps the attribute unset
    pub fn apply_security_groups(&mut self, group_ids: Vec<String>) {
        if !group_ids.is_empty() {
            self.security_groups = strings_set(group_ids);
        } else if self.security_groups.is_unknown() {
            self.security_groups = Value::Null;
        }
    }

    pub fn apply_encryption_key(&mut self, key: Option<&EncryptionKey>) {
        match key {
            Some(key) => {
                self.kms_key_id = string(&key.key_id);
                self.kms_region = string(&key.key_region);
                self.kms_cluster_id = non_empty(&key.kms_cluster_id);
            }
            None => {
                if self.kms_key_id.is_unknown() {
                    self.kms_key_id = Value::Null;
                }
                if self.kms_region.is_unknown() {
                    self.kms_region = Value::Null;
                }
                if self.kms_cluster_id.is_unknown() {
                    self.kms_cluster_id = Value::Null;
                }
            }
        }
    }

    /// Weekly plan as the main plan, monthly plan as the `monthly_*` attributes
    ///
    /// The block is only refreshed when it is part of the state.
    pub fn apply_backup_plans(&mut self, plans: &[BackupPlan]) -> Result<()> {
        let Value::Value(state) = &mut self.backup_plan else {
            return Ok(());
        };
        let main = plans
            .iter()
            .find(|plan| plan.backup_period_type == BACKUP_PERIOD_TYPE_WEEK)
            .or_else(|| plans.first());
        let monthly = plans
            .iter()
            .find(|plan| plan.backup_period_type == BACKUP_PERIOD_TYPE_MONTH);

        if let Some(main) = main {
            state.min_backup_start_time = non_empty(&main.min_backup_start_time);
            state.max_backup_start_time = non_empty(&main.max_backup_start_time);
            state.base_backup_retention_period = Value::Value(main.base_backup_retention_period);
            state.backup_period = strings_list(backup_period_days(main)?);
        }
        match monthly {
            Some(monthly) => {
                state.monthly_plan_id = non_empty(&monthly.plan_id);
                state.monthly_backup_period = strings_list(backup_period_days(monthly)?);
                state.monthly_backup_retention_period =
                    Value::Value(monthly.base_backup_retention_period);
            }
            None => state.monthly_plan_id = Value::Null,
        }
        for value in [
            &mut state.min_backup_start_time,
            &mut state.max_backup_start_time,
        ] {
            if value.is_unknown() {
                *value = Value::Null;
            }
        }
        if state.base_backup_retention_period.is_unknown() {
            state.base_backup_retention_period = Value::Null;
        }
        if state.backup_period.is_unknown() {
            state.backup_period = Value::Null;
        }
        Ok(())
    }

    pub fn apply_params(&mut self, params: &BTreeMap<String, String>) -> Result<()> {
        for (name, value) in [
            (MAX_STANDBY_ARCHIVE_DELAY, &mut self.max_standby_archive_delay),
            (MAX_STANDBY_STREAMING_DELAY, &mut self.max_standby_streaming_delay),
        ] {
            *value = match params.get(name) {
                Some(raw) => Value::Value(raw.trim().parse::<i64>().map_err(|_| {
                    Error::unexpected(format!("parameter {name} is not an integer: {raw:?}"))
                })?),
                None => Value::Null,
            };
        }
        Ok(())
    }

    /// Parameters to apply, as configured
    pub fn params(&self) -> BTreeMap<String, String> {
        [
            (MAX_STANDBY_ARCHIVE_DELAY, &self.max_standby_archive_delay),
            (MAX_STANDBY_STREAMING_DELAY, &self.max_standby_streaming_delay),
        ]
        .into_iter()
        .filter_map(|(name, value)| Some((name.to_string(), value.as_ref_option()?.to_string())))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::service::models::{DbNode, Tag};
    use crate::service::{PAY_TYPE_POSTPAID, PAY_TYPE_PREPAID};
    use crate::utils::set_strings;

    use super::super::state::BackupPlanState;
    use super::*;

    fn net(net_type: &str, ip: &str, status: &str) -> NetInfo {
        NetInfo {
            address: format!("{net_type}.postgres.tencentcdb.com"),
            ip: ip.to_string(),
            port: 5432,
            net_type: net_type.to_string(),
            status: status.to_string(),
            vpc_id: "vpc-1".to_string(),
            subnet_id: "subnet-1".to_string(),
            ..Default::default()
        }
    }

    fn instance(net_info: Vec<NetInfo>) -> DbInstance {
        DbInstance {
            db_instance_id: "postgres-1".to_string(),
            db_instance_name: "main".to_string(),
            zone: "ap-guangzhou-3".to_string(),
            vpc_id: "vpc-2".to_string(),
            subnet_id: "subnet-2".to_string(),
            db_version: "13.3".to_string(),
            db_major_version: "13".to_string(),
            db_kernel_version: "v13.3_r1.1".to_string(),
            db_charset: "UTF8".to_string(),
            pay_type: "prepaid".to_string(),
            db_instance_memory: 2,
            db_instance_storage: 20,
            db_instance_cpu: 1,
            db_instance_net_info: net_info,
            tag_list: vec![Tag {
                tag_key: "env".to_string(),
                tag_value: "dev".to_string(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_two_net_infos() {
        let mut state = InstanceState::default();
        state
            .apply_instance(
                &instance(vec![net("inner", "10.0.0.2", "opened"), net("public", "", "1")]),
                Some("admin"),
            )
            .unwrap();
        assert_eq!(state.vpc_id.as_deref_option(), Some("vpc-2"));
        assert_eq!(state.private_access_ip.as_deref_option(), Some("10.0.0.2"));
        assert_eq!(state.public_access_switch, Value::Value(true));
        assert_eq!(
            state.public_access_host.as_deref_option(),
            Some("public.postgres.tencentcdb.com")
        );
        assert_eq!(state.root_user.as_deref_option(), Some("admin"));
        assert_eq!(state.charge_type.as_deref_option(), Some(PAY_TYPE_PREPAID));
        assert_eq!(state.tags.as_ref_option().map(|tags| tags.len()), Some(1));
    }

    #[test]
    fn test_three_net_infos() {
        let mut state = InstanceState {
            root_user: "root".into(),
            ..Default::default()
        };
        let mut instance = instance(vec![
            net("private", "10.0.0.3", "opened"),
            net("inner", "10.0.0.4", "opened"),
            net("public", "", "closed"),
        ]);
        instance.pay_type = "postpaid".to_string();
        state.apply_instance(&instance, None).unwrap();
        assert_eq!(state.vpc_id.as_deref_option(), Some("vpc-1"));
        assert_eq!(state.private_access_ip.as_deref_option(), Some("10.0.0.3"));
        assert_eq!(state.public_access_switch, Value::Value(false));
        assert_eq!(state.root_user.as_deref_option(), Some("root"));
        assert_eq!(state.charge_type.as_deref_option(), Some(PAY_TYPE_POSTPAID));
    }

    #[test]
    fn test_unexpected_net_infos() {
        let mut state = InstanceState::default();
        let err = state
            .apply_instance(&instance(vec![net("inner", "10.0.0.2", "opened")]), None)
            .unwrap_err();
        assert_eq!(err.to_string(), "DBInstanceNetInfo returned incorrect information");
    }

    #[test]
    fn test_nodes_of_multi_zone_instance() {
        let mut instance = instance(vec![net("inner", "10.0.0.2", "opened"), net("public", "", "0")]);
        instance.db_node_set = vec![
            DbNode {
                role: "Primary".to_string(),
                zone: "ap-guangzhou-3".to_string(),
                ..Default::default()
            },
            DbNode {
                role: "Standby".to_string(),
                zone: "ap-guangzhou-6".to_string(),
                ..Default::default()
            },
        ];
        let mut state = InstanceState::default();
        state.apply_instance(&instance, None).unwrap();
        let nodes = state.db_node_set.as_ref_option().unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(state.nodes()[1].role, "Standby");

        instance.db_node_set.truncate(1);
        let mut state = InstanceState::default();
        state.apply_instance(&instance, None).unwrap();
        assert!(state.db_node_set.is_null());
    }

    #[test]
    fn test_backup_plans() {
        let plans = [
            BackupPlan {
                backup_period_type: "month".to_string(),
                backup_period: r#"["1","15"]"#.to_string(),
                base_backup_retention_period: 30,
                plan_id: "plan-month".to_string(),
                ..Default::default()
            },
            BackupPlan {
                backup_period_type: "week".to_string(),
                backup_period: r#"["monday"]"#.to_string(),
                min_backup_start_time: "01:00:00".to_string(),
                max_backup_start_time: "02:00:00".to_string(),
                base_backup_retention_period: 7,
                plan_id: "plan-week".to_string(),
                ..Default::default()
            },
        ];
        let mut state = InstanceState::default();
        state.apply_backup_plans(&plans).unwrap();
        assert!(state.backup_plan.is_null());

        state.backup_plan = Value::Value(BackupPlanState::default());
        state.apply_backup_plans(&plans).unwrap();
        let plan = state.backup_plan.as_ref_option().unwrap();
        assert_eq!(plan.min_backup_start_time.as_deref_option(), Some("01:00:00"));
        assert_eq!(plan.base_backup_retention_period, Value::Value(7));
        assert_eq!(plan.monthly_plan_id.as_deref_option(), Some("plan-month"));
        assert_eq!(plan.monthly_backup_retention_period, Value::Value(30));
        assert_eq!(plan.monthly_backup_period.as_ref_option().map(Vec::len), Some(2));
    }

    #[test]
    fn test_malformed_backup_period() {
        let plans = [BackupPlan {
            backup_period_type: "week".to_string(),
            backup_period: "monday".to_string(),
            ..Default::default()
        }];
        let mut state = InstanceState {
            backup_plan: Value::Value(BackupPlanState::default()),
            ..Default::default()
        };
        assert!(state.apply_backup_plans(&plans).is_err());
    }

    #[test]
    fn test_security_groups() {
        let mut state = InstanceState {
            security_groups: Value::Unknown,
            ..Default::default()
        };
        state.apply_security_groups(Vec::new());
        assert!(state.security_groups.is_null());

        state.apply_security_groups(vec!["sg-2".to_string(), "sg-1".to_string()]);
        assert_eq!(set_strings(&state.security_groups), vec!["sg-1", "sg-2"]);

        state.apply_security_groups(Vec::new());
        assert_eq!(set_strings(&state.security_groups), vec!["sg-1", "sg-2"]);
    }

    #[test]
    fn test_params() {
        let mut state = InstanceState::default();
        let params = BTreeMap::from([
            ("max_standby_archive_delay".to_string(), "300000".to_string()),
            ("work_mem".to_string(), "4096".to_string()),
        ]);
        state.apply_params(&params).unwrap();
        assert_eq!(state.max_standby_archive_delay, Value::Value(300000));
        assert!(state.max_standby_streaming_delay.is_null());
        assert_eq!(
            state.params(),
            BTreeMap::from([("max_standby_archive_delay".to_string(), "300000".to_string())])
        );
    }
}
