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
use tf_provider::map;
use tf_provider::schema::{AttributeType, Block, Description, NestedBlock, Schema};
use tf_provider::value::{
    self, Value, ValueBool, ValueList, ValueMap, ValueNumber, ValueSet, ValueString,
};
use tf_provider::{AttributePath, Diagnostics};

use crate::service::models::DbNode;
use crate::service::{CHARSET_LATIN1, CHARSET_UTF8, PAY_TYPE_POSTPAID, PAY_TYPE_PREPAID};
use crate::utils::{
    computed, list_strings, null_if_unknown, optional, optional_computed, required, sensitive,
    string, string_list_type, string_map_type, string_set_type, text, unknown_if_null,
    WithSchema,
};

pub const DEFAULT_ROOT_USER: &str = "root";
pub const NODE_ROLE_PRIMARY: &str = "Primary";
pub const NODE_ROLE_STANDBY: &str = "Standby";
pub const SWITCH_IMMEDIATELY: i64 = 0;
pub const SWITCH_MAINTENANCE_WINDOW: i64 = 2;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InstanceState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub charge_type: ValueString<'a>,
    pub period: ValueNumber,
    pub auto_renew_flag: ValueNumber,
    pub auto_voucher: ValueNumber,
    pub voucher_ids: ValueList<ValueString<'a>>,
    pub engine_version: ValueString<'a>,
    pub db_major_version: ValueString<'a>,
    pub db_kernel_version: ValueString<'a>,
    pub vpc_id: ValueString<'a>,
    pub subnet_id: ValueString<'a>,
    pub security_groups: ValueSet<ValueString<'a>>,
    pub storage: ValueNumber,
    pub memory: ValueNumber,
    pub cpu: ValueNumber,
    pub project_id: ValueNumber,
    pub availability_zone: ValueString<'a>,
    pub root_user: ValueString<'a>,
    pub root_password: ValueString<'a>,
    pub charset: ValueString<'a>,
    pub need_support_tde: ValueNumber,
    pub kms_key_id: ValueString<'a>,
    pub kms_region: ValueString<'a>,
    pub kms_cluster_id: ValueString<'a>,
    pub public_access_switch: ValueBool,
    pub tags: ValueMap<'a, ValueString<'a>>,
    pub max_standby_archive_delay: ValueNumber,
    pub max_standby_streaming_delay: ValueNumber,
    #[serde(with = "value::serde_as_vec")]
    pub backup_plan: Value<BackupPlanState<'a>>,
    pub db_node_set: ValueList<Value<DbNodeState<'a>>>,
    pub delete_protection: ValueBool,
    pub wait_switch: ValueNumber,
    pub public_access_host: ValueString<'a>,
    pub public_access_port: ValueNumber,
    pub private_access_ip: ValueString<'a>,
    pub private_access_port: ValueNumber,
    pub uid: ValueNumber,
    pub create_time: ValueString<'a>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BackupPlanState<'a> {
    #[serde(borrow = "'a")]
    pub min_backup_start_time: ValueString<'a>,
    pub max_backup_start_time: ValueString<'a>,
    pub base_backup_retention_period: ValueNumber,
    pub backup_period: ValueList<ValueString<'a>>,
    pub monthly_backup_retention_period: ValueNumber,
    pub monthly_backup_period: ValueList<ValueString<'a>>,
    pub monthly_plan_id: ValueString<'a>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DbNodeState<'a> {
    #[serde(borrow = "'a")]
    pub role: ValueString<'a>,
    pub zone: ValueString<'a>,
    pub dedicated_cluster_id: ValueString<'a>,
}

impl DbNodeState<'_> {
    pub fn to_node(&self) -> DbNode {
        DbNode {
            role: self
                .role
                .as_deref_option()
                .unwrap_or(NODE_ROLE_STANDBY)
                .to_string(),
            zone: text(&self.zone).to_string(),
            dedicated_cluster_id: text(&self.dedicated_cluster_id).to_string(),
        }
    }
}

impl WithSchema for InstanceState<'_> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "id" => computed(AttributeType::String, "Instance id"),
                    "name" => required(AttributeType::String, "Name of the instance, from 1 to 60 characters"),
                    "charge_type" => optional_computed(
                        AttributeType::String,
                        "Billing mode: POSTPAID_BY_HOUR (default) or PREPAID; can only go from POSTPAID_BY_HOUR to PREPAID",
                    ),
                    "period" => optional(
                        AttributeType::Number,
                        "Prepaid period in months, used when creating a PREPAID instance or renewing it",
                    ),
                    "auto_renew_flag" => optional(
                        AttributeType::Number,
                        "Auto renew flag of a PREPAID instance: 1 to renew, 0 not to",
                    ),
                    "auto_voucher" => optional(
                        AttributeType::Number,
                        "Whether to use vouchers automatically: 1 to use them, 0 not to",
                    ),
                    "voucher_ids" => optional(string_list_type(), "Vouchers to use, requires `auto_voucher`"),
                    "engine_version" => optional_computed(
                        AttributeType::String,
                        "PostgreSQL version, 10.4 when no version is given",
                    ),
                    "db_major_version" => optional_computed(AttributeType::String, "PostgreSQL major version"),
                    "db_kernel_version" => optional_computed(AttributeType::String, "PostgreSQL kernel version"),
                    "vpc_id" => optional_computed(AttributeType::String, "VPC of the instance"),
                    "subnet_id" => optional_computed(AttributeType::String, "Subnet of the instance"),
                    "security_groups" => optional_computed(string_set_type(), "Security groups bound to the instance"),
                    "storage" => required(AttributeType::Number, "Volume size in GB"),
                    "memory" => required(AttributeType::Number, "Memory size in GB"),
                    "cpu" => optional_computed(AttributeType::Number, "Number of CPU cores"),
                    "project_id" => optional_computed(AttributeType::Number, "Project of the instance, 0 by default"),
                    "availability_zone" => required(AttributeType::String, "Availability zone; use `db_node_set` to move the instance"),
                    "root_user" => optional_computed(AttributeType::String, "Name of the root account, `root` by default"),
                    "root_password" => sensitive(required(AttributeType::String, "Password of the root account")),
                    "charset" => optional_computed(AttributeType::String, "Charset of the instance: UTF8 (default) or LATIN1"),
                    "need_support_tde" => optional_computed(AttributeType::Number, "Whether to enable data encryption: 1 to enable, 0 not to"),
                    "kms_key_id" => optional_computed(AttributeType::String, "KMS key used for data encryption"),
                    "kms_region" => optional_computed(AttributeType::String, "Region of the KMS key"),
                    "kms_cluster_id" => optional_computed(AttributeType::String, "Dedicated KMS cluster"),
                    "public_access_switch" => optional_computed(AttributeType::Bool, "Whether the instance is reachable from the internet"),
                    "tags" => optional(string_map_type(), "Tags of the instance"),
                    "max_standby_archive_delay" => optional_computed(
                        AttributeType::Number,
                        "Maximum delay before canceling queries conflicting with WAL from archive, in ms",
                    ),
                    "max_standby_streaming_delay" => optional_computed(
                        AttributeType::Number,
                        "Maximum delay before canceling queries conflicting with streamed WAL, in ms",
                    ),
                    "delete_protection" => optional_computed(
                        AttributeType::Bool,
                        "When true, deleting the resource only isolates the instance",
                    ),
                    "wait_switch" => optional_computed(
                        AttributeType::Number,
                        "When changes of spec, nodes or version take effect: 0 immediately (default), 2 during the maintenance window",
                    ),
                    "public_access_host" => computed(AttributeType::String, "Public host of the instance"),
                    "public_access_port" => computed(AttributeType::Number, "Public port of the instance"),
                    "private_access_ip" => computed(AttributeType::String, "Private IP of the instance"),
                    "private_access_port" => computed(AttributeType::Number, "Private port of the instance"),
                    "uid" => computed(AttributeType::Number, "Uid of the instance"),
                    "create_time" => computed(AttributeType::String, "Creation time of the instance"),
                },
                blocks: map! {
                    "backup_plan" => NestedBlock::Optional(Block {
                        attributes: map! {
                            "min_backup_start_time" => optional_computed(AttributeType::String, "Earliest start time of a backup"),
                            "max_backup_start_time" => optional_computed(AttributeType::String, "Latest start time of a backup"),
                            "base_backup_retention_period" => optional_computed(AttributeType::Number, "Retention of base backups, in days"),
                            "backup_period" => optional_computed(string_list_type(), "Week days of the backups, like `monday`"),
                            "monthly_backup_retention_period" => optional(AttributeType::Number, "Retention of monthly backups, in days"),
                            "monthly_backup_period" => optional(string_list_type(), "Month days of the monthly backups, like `1`"),
                            "monthly_plan_id" => computed(AttributeType::String, "Id of the monthly backup plan"),
                        },
                        description: Description::plain("Backup plan of the instance"),
                        ..Default::default()
                    }),
                    "db_node_set" => NestedBlock::Set(Block {
                        attributes: map! {
                            "role" => optional(AttributeType::String, "Node role: Primary or Standby (default)"),
                            "zone" => required(AttributeType::String, "Availability zone of the node"),
                            "dedicated_cluster_id" => optional(AttributeType::String, "Dedicated cluster of the node"),
                        },
                        description: Description::plain(
                            "Nodes of a multi-zone instance; the primary zone must be `availability_zone`",
                        ),
                        ..Default::default()
                    }),
                },
                description: Description::plain("PostgreSQL instance"),
                ..Default::default()
            },
        }
    }
}

impl<'a> InstanceState<'a> {
    pub fn nodes(&self) -> Vec<DbNode> {
        self.db_node_set
            .iter()
            .flatten()
            .filter_map(|node| node.as_ref_option().map(DbNodeState::to_node))
            .collect()
    }

    /// Zones of the nodes, in configuration order
    pub fn node_zones(&self) -> Vec<String> {
        self.nodes().into_iter().map(|node| node.zone).collect()
    }

    pub fn switch_tag(&self) -> i64 {
        self.wait_switch
            .as_ref_option()
            .copied()
            .unwrap_or(SWITCH_IMMEDIATELY)
    }

    pub fn validate(&self, diags: &mut Diagnostics) {
        if let Some(name) = self.name.as_deref_option() {
            let len = name.chars().count();
            if !(1..=60).contains(&len) {
                diags.error(
                    "Invalid name",
                    format!("`name` must have between 1 and 60 characters, got {len}"),
                    AttributePath::new("name"),
                );
            }
        }
        let allowed: [(&'static str, &ValueString, &[&str]); 2] = [
            ("charge_type", &self.charge_type, &[PAY_TYPE_POSTPAID, PAY_TYPE_PREPAID]),
            ("charset", &self.charset, &[CHARSET_UTF8, CHARSET_LATIN1]),
        ];
        for (name, value, values) in allowed {
            if let Some(value) = value.as_deref_option() {
                if !values.contains(&value) {
                    diags.error(
                        format!("Invalid {name}"),
                        format!("`{name}` must be one of {}, got {value:?}", values.join(", ")),
                        AttributePath::new(name),
                    );
                }
            }
        }
        if let Some(wait_switch) = self.wait_switch.as_ref_option() {
            if !matches!(*wait_switch, SWITCH_IMMEDIATELY | SWITCH_MAINTENANCE_WINDOW) {
                diags.error(
                    "Invalid wait_switch",
                    format!("`wait_switch` must be 0 or 2, got {wait_switch}"),
                    AttributePath::new("wait_switch"),
                );
            }
        }
        if self.voucher_ids.is_value() && self.auto_voucher.is_null() {
            diags.error(
                "Missing auto_voucher",
                "`voucher_ids` requires `auto_voucher` to be set",
                AttributePath::new("voucher_ids"),
            );
        }
        for node in self.db_node_set.iter().flatten().flatten() {
            if let Some(role) = node.role.as_deref_option() {
                if !matches!(role, NODE_ROLE_PRIMARY | NODE_ROLE_STANDBY) {
                    diags.error(
                        "Invalid node role",
                        format!("`role` must be Primary or Standby, got {role:?}"),
                        AttributePath::new("db_node_set"),
                    );
                }
            }
        }
        if let Err(message) = self.check_zone_included() {
            diags.error("Invalid db_node_set", message, AttributePath::new("availability_zone"));
        }
    }

    /// `availability_zone` must be one of the node zones when nodes are given
    pub fn check_zone_included(&self) -> Result<(), String> {
        let Some(zone) = self.availability_zone.as_deref_option() else {
            return Ok(());
        };
        let known = self
            .db_node_set
            .iter()
            .flatten()
            .flatten()
            .all(|node| node.zone.is_value());
        let zones = self.node_zones();
        if !known || zones.is_empty() || zones.iter().any(|z| z == zone) {
            return Ok(());
        }
        Err(format!(
            "`availability_zone`: {zone} is not included in `db_node_set`: [{}]",
            zones.join(", ")
        ))
    }

    /// Fill the attributes left out of the configuration with their defaults
    pub fn apply_defaults(&mut self, config: &Self) {
        if config.charge_type.is_null() {
            self.charge_type = string(PAY_TYPE_POSTPAID);
        }
        if config.project_id.is_null() {
            self.project_id = Value::Value(0);
        }
        if config.root_user.is_null() {
            self.root_user = string(DEFAULT_ROOT_USER);
        }
        if config.charset.is_null() {
            self.charset = string(CHARSET_UTF8);
        }
        if config.public_access_switch.is_null() {
            self.public_access_switch = Value::Value(false);
        }
        if config.delete_protection.is_null() {
            self.delete_protection = Value::Value(false);
        }
        if config.wait_switch.is_null() {
            self.wait_switch = Value::Value(SWITCH_IMMEDIATELY);
        }
    }

    /// Mark everything the creation computes
    pub fn plan_computed(&mut self) {
        self.id = Value::Unknown;
        unknown_if_null(&mut self.engine_version);
        unknown_if_null(&mut self.db_major_version);
        unknown_if_null(&mut self.db_kernel_version);
        unknown_if_null(&mut self.vpc_id);
        unknown_if_null(&mut self.subnet_id);
        unknown_if_null(&mut self.security_groups);
        unknown_if_null(&mut self.cpu);
        unknown_if_null(&mut self.need_support_tde);
        unknown_if_null(&mut self.kms_key_id);
        unknown_if_null(&mut self.kms_region);
        unknown_if_null(&mut self.kms_cluster_id);
        unknown_if_null(&mut self.max_standby_archive_delay);
        unknown_if_null(&mut self.max_standby_streaming_delay);
        if let Value::Value(plan) = &mut self.backup_plan {
            unknown_if_null(&mut plan.min_backup_start_time);
            unknown_if_null(&mut plan.max_backup_start_time);
            unknown_if_null(&mut plan.base_backup_retention_period);
            unknown_if_null(&mut plan.backup_period);
            plan.monthly_plan_id = Value::Unknown;
        }
        self.public_access_host = Value::Unknown;
        self.public_access_port = Value::Unknown;
        self.private_access_ip = Value::Unknown;
        self.private_access_port = Value::Unknown;
        self.uid = Value::Unknown;
        self.create_time = Value::Unknown;
    }

    /// Mark what an update of `prior` into `self` recomputes
    pub fn plan_recomputed(&mut self, prior: &Self, config: &Self) {
        let versions_changed = self.engine_version != prior.engine_version
            || self.db_major_version != prior.db_major_version
            || self.db_kernel_version != prior.db_kernel_version;
        if versions_changed {
            for (value, configured) in [
                (&mut self.engine_version, &config.engine_version),
                (&mut self.db_major_version, &config.db_major_version),
                (&mut self.db_kernel_version, &config.db_kernel_version),
            ] {
                if configured.is_null() {
                    *value = Value::Unknown;
                }
            }
        }
        if (self.memory != prior.memory || self.storage != prior.storage) && config.cpu.is_null() {
            self.cpu = Value::Unknown;
        }
        if self.vpc_id != prior.vpc_id || self.subnet_id != prior.subnet_id {
            self.private_access_ip = Value::Unknown;
            self.private_access_port = Value::Unknown;
        }
        if self.public_access_switch != prior.public_access_switch {
            self.public_access_host = Value::Unknown;
            self.public_access_port = Value::Unknown;
        }
        if let Value::Value(plan) = &mut self.backup_plan {
            let prior_period = prior
                .backup_plan
                .as_ref_option()
                .map(|prior| &prior.monthly_backup_period);
            if prior_period != Some(&plan.monthly_backup_period) {
                plan.monthly_plan_id = Value::Unknown;
            }
        }
    }

    /// Drop values left unknown by an interrupted creation
    pub fn forget_unknowns(&mut self) {
        null_if_unknown(&mut self.engine_version);
        null_if_unknown(&mut self.db_major_version);
        null_if_unknown(&mut self.db_kernel_version);
        null_if_unknown(&mut self.vpc_id);
        null_if_unknown(&mut self.subnet_id);
        null_if_unknown(&mut self.security_groups);
        null_if_unknown(&mut self.cpu);
        null_if_unknown(&mut self.need_support_tde);
        null_if_unknown(&mut self.kms_key_id);
        null_if_unknown(&mut self.kms_region);
        null_if_unknown(&mut self.kms_cluster_id);
        null_if_unknown(&mut self.max_standby_archive_delay);
        null_if_unknown(&mut self.max_standby_streaming_delay);
        if let Value::Value(plan) = &mut self.backup_plan {
            null_if_unknown(&mut plan.min_backup_start_time);
            null_if_unknown(&mut plan.max_backup_start_time);
            null_if_unknown(&mut plan.base_backup_retention_period);
            null_if_unknown(&mut plan.backup_period);
            null_if_unknown(&mut plan.monthly_plan_id);
        }
        null_if_unknown(&mut self.public_access_host);
        null_if_unknown(&mut self.public_access_port);
        null_if_unknown(&mut self.private_access_ip);
        null_if_unknown(&mut self.private_access_port);
        null_if_unknown(&mut self.uid);
        null_if_unknown(&mut self.create_time);
    }

    pub fn voucher_ids(&self) -> Vec<String> {
        list_strings(&self.voucher_ids)
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;

    fn node<'a>(role: Option<&'a str>, zone: &'a str) -> Value<DbNodeState<'a>> {
        Value::Value(DbNodeState {
            role: role.map(Cow::Borrowed).into(),
            zone: zone.into(),
            dedicated_cluster_id: Value::Null,
        })
    }

    #[test]
    fn test_zone_included() {
        let mut state = InstanceState {
            availability_zone: "ap-guangzhou-3".into(),
            ..Default::default()
        };
        assert!(state.check_zone_included().is_ok());

        state.db_node_set = Value::Value(vec![
            node(Some(NODE_ROLE_PRIMARY), "ap-guangzhou-3"),
            node(None, "ap-guangzhou-6"),
        ]);
        assert!(state.check_zone_included().is_ok());

        state.availability_zone = "ap-guangzhou-4".into();
        assert_eq!(
            state.check_zone_included().unwrap_err(),
            "`availability_zone`: ap-guangzhou-4 is not included in `db_node_set`: [ap-guangzhou-3, ap-guangzhou-6]"
        );
    }

    #[test]
    fn test_node_role_defaults_to_standby() {
        let state = InstanceState {
            db_node_set: Value::Value(vec![node(None, "ap-guangzhou-6")]),
            ..Default::default()
        };
        assert_eq!(state.nodes()[0].role, NODE_ROLE_STANDBY);
    }

    #[test]
    fn test_validate() {
        let state = InstanceState {
            name: "".into(),
            charge_type: "MONTHLY".into(),
            charset: CHARSET_LATIN1.into(),
            wait_switch: Value::Value(1),
            voucher_ids: Value::Value(vec!["v-1".into()]),
            db_node_set: Value::Value(vec![node(Some("Leader"), "ap-guangzhou-3")]),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        state.validate(&mut diags);
        assert_eq!(diags.errors.len(), 5);
    }

    #[test]
    fn test_defaults_follow_configuration() {
        let config = InstanceState {
            charset: CHARSET_LATIN1.into(),
            ..Default::default()
        };
        let mut state = config.clone();
        state.apply_defaults(&config);
        assert_eq!(state.charge_type.as_deref_option(), Some(PAY_TYPE_POSTPAID));
        assert_eq!(state.charset.as_deref_option(), Some(CHARSET_LATIN1));
        assert_eq!(state.root_user.as_deref_option(), Some(DEFAULT_ROOT_USER));
        assert_eq!(state.project_id, Value::Value(0));
        assert_eq!(state.delete_protection, Value::Value(false));
    }

    #[test]
    fn test_plan_computed() {
        let mut state = InstanceState {
            engine_version: "13.3".into(),
            backup_plan: Value::Value(BackupPlanState {
                backup_period: Value::Value(vec!["monday".into()]),
                ..Default::default()
            }),
            ..Default::default()
        };
        state.plan_computed();
        assert!(state.id.is_unknown());
        assert_eq!(state.engine_version.as_deref_option(), Some("13.3"));
        assert!(state.db_kernel_version.is_unknown());
        let plan = state.backup_plan.as_ref_option().unwrap();
        assert!(plan.backup_period.is_value());
        assert!(plan.min_backup_start_time.is_unknown());
        assert!(plan.monthly_backup_period.is_null());

        state.forget_unknowns();
        assert!(state.id.is_unknown());
        assert!(state.db_kernel_version.is_null());
    }

    #[test]
    fn test_plan_recomputed() {
        let prior = InstanceState {
            engine_version: "13.3".into(),
            db_major_version: "13".into(),
            db_kernel_version: "v13.3_r1.1".into(),
            memory: Value::Value(2),
            cpu: Value::Value(1),
            private_access_ip: "10.0.0.2".into(),
            ..Default::default()
        };
        let config = InstanceState {
            db_kernel_version: "v13.3_r1.4".into(),
            memory: Value::Value(4),
            ..Default::default()
        };
        let mut state = InstanceState {
            db_kernel_version: "v13.3_r1.4".into(),
            memory: Value::Value(4),
            ..prior.clone()
        };
        state.plan_recomputed(&prior, &config);
        assert!(state.engine_version.is_unknown());
        assert!(state.db_major_version.is_unknown());
        assert_eq!(state.db_kernel_version.as_deref_option(), Some("v13.3_r1.4"));
        assert!(state.cpu.is_unknown());
        assert_eq!(state.private_access_ip.as_deref_option(), Some("10.0.0.2"));
    }
}
