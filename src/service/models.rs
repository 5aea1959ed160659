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

//! Wire models of the PostgreSQL API (version 2017-03-12)
//!
//! Response models default every missing member, as the API omits or nulls most of them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Filter {
    pub name: String,
    pub values: Vec<String>,
}

impl Filter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct Tag {
    pub tag_key: String,
    pub tag_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct DbNode {
    pub role: String,
    pub zone: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub dedicated_cluster_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct NetInfo {
    pub address: String,
    pub ip: String,
    pub port: i64,
    pub net_type: String,
    pub status: String,
    pub vpc_id: String,
    pub subnet_id: String,
    pub protocol_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct DbInstance {
    pub region: String,
    pub zone: String,
    pub project_id: i64,
    pub vpc_id: String,
    pub subnet_id: String,
    #[serde(rename = "DBInstanceId")]
    pub db_instance_id: String,
    #[serde(rename = "DBInstanceName")]
    pub db_instance_name: String,
    #[serde(rename = "DBInstanceStatus")]
    pub db_instance_status: String,
    #[serde(rename = "DBInstanceMemory")]
    pub db_instance_memory: i64,
    #[serde(rename = "DBInstanceStorage")]
    pub db_instance_storage: i64,
    #[serde(rename = "DBInstanceCpu")]
    pub db_instance_cpu: i64,
    #[serde(rename = "DBInstanceClass")]
    pub db_instance_class: String,
    #[serde(rename = "DBInstanceType")]
    pub db_instance_type: String,
    #[serde(rename = "DBInstanceVersion")]
    pub db_instance_version: String,
    #[serde(rename = "DBCharset")]
    pub db_charset: String,
    #[serde(rename = "DBVersion")]
    pub db_version: String,
    #[serde(rename = "DBMajorVersion")]
    pub db_major_version: String,
    #[serde(rename = "DBKernelVersion")]
    pub db_kernel_version: String,
    pub create_time: String,
    pub update_time: String,
    pub expire_time: String,
    pub isolated_time: String,
    pub pay_type: String,
    pub auto_renew: i64,
    #[serde(rename = "DBInstanceNetInfo")]
    pub db_instance_net_info: Vec<NetInfo>,
    pub uid: i64,
    pub tag_list: Vec<Tag>,
    #[serde(rename = "MasterDBInstanceId")]
    pub master_db_instance_id: String,
    pub read_only_instance_num: i64,
    pub status_in_readonly_group: String,
    #[serde(rename = "DBNodeSet")]
    pub db_node_set: Vec<DbNode>,
    #[serde(rename = "IsSupportTDE")]
    pub is_support_tde: i64,
    pub support_ipv6: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct SpecItemInfo {
    pub spec_code: String,
    pub version: String,
    pub version_name: String,
    pub cpu: i64,
    /// MB
    pub memory: i64,
    pub max_storage: i64,
    pub min_storage: i64,
    pub qps: i64,
    pub major_version: String,
    pub kernel_version: String,
    #[serde(rename = "IsSupportTDE")]
    pub is_support_tde: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct SpecInfo {
    pub region: String,
    pub zone: String,
    pub spec_item_info_list: Vec<SpecItemInfo>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct PgDeal {
    pub deal_name: String,
    pub status: i64,
    #[serde(rename = "DBInstanceIdSet")]
    pub db_instance_id_set: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct AccountInfo {
    #[serde(rename = "DBInstanceId")]
    pub db_instance_id: String,
    pub user_name: String,
    pub remark: String,
    pub status: i64,
    pub create_time: String,
    pub update_time: String,
    pub user_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct DatabaseObject {
    pub object_type: String,
    pub object_name: String,
    pub database_name: String,
    pub schema_name: String,
    pub table_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct DatabasePrivilege {
    pub object: DatabaseObject,
    pub privilege_set: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct BackupPlan {
    pub backup_period_type: String,
    /// JSON encoded list of days
    pub backup_period: String,
    pub min_backup_start_time: String,
    pub max_backup_start_time: String,
    pub base_backup_retention_period: i64,
    pub plan_id: String,
    pub plan_name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct BaseBackup {
    #[serde(rename = "DBInstanceId")]
    pub db_instance_id: String,
    pub id: String,
    pub name: String,
    pub backup_method: String,
    pub backup_mode: String,
    pub state: String,
    pub size: i64,
    pub start_time: String,
    pub finish_time: String,
    pub expire_time: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct ReadOnlyGroup {
    pub read_only_group_id: String,
    pub read_only_group_name: String,
    pub project_id: i64,
    #[serde(rename = "MasterDBInstanceId")]
    pub master_db_instance_id: String,
    pub min_delay_eliminate_reserve: i64,
    pub max_replay_latency: i64,
    pub replay_latency_eliminate: i64,
    pub max_replay_lag: f64,
    pub replay_lag_eliminate: i64,
    pub vpc_id: String,
    pub subnet_id: String,
    pub region: String,
    pub zone: String,
    pub status: String,
    #[serde(rename = "ReadOnlyDBInstanceList")]
    pub read_only_db_instance_list: Vec<DbInstance>,
    pub rebalance: i64,
    #[serde(rename = "DBInstanceNetInfo")]
    pub db_instance_net_info: Vec<NetInfo>,
    pub create_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct ParameterTemplate {
    pub template_id: String,
    pub template_name: String,
    #[serde(rename = "DBMajorVersion")]
    pub db_major_version: String,
    #[serde(rename = "DBEngine")]
    pub db_engine: String,
    pub template_description: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct ParamInfo {
    #[serde(rename = "ID")]
    pub id: i64,
    pub name: String,
    pub param_value_type: String,
    pub unit: String,
    pub default_value: String,
    pub current_value: String,
    pub max: f64,
    pub min: f64,
    pub enum_value: Vec<String>,
    pub need_reboot: bool,
    #[serde(rename = "ClassificationEN")]
    pub classification_en: String,
    #[serde(rename = "ParamDescriptionEN")]
    pub param_description_en: String,
    pub last_modify_time: String,
    pub advanced: bool,
    pub spec_related: bool,
    pub standby_related: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct ParamEntry {
    pub name: String,
    pub expected_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct EventDetail {
    pub param_name: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct EventItem {
    pub param_name: String,
    pub event_type: String,
    pub event_detail: Vec<EventDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct EncryptionKey {
    pub key_id: String,
    pub key_alias: String,
    pub key_region: String,
    #[serde(rename = "KMSClusterId")]
    pub kms_cluster_id: String,
    pub create_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct Version {
    #[serde(rename = "DBEngine")]
    pub db_engine: String,
    #[serde(rename = "DBVersion")]
    pub db_version: String,
    #[serde(rename = "DBMajorVersion")]
    pub db_major_version: String,
    #[serde(rename = "DBKernelVersion")]
    pub db_kernel_version: String,
    pub status: String,
    pub supported_feature_names: Vec<String>,
    pub available_upgrade_target: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct ZoneInfo {
    pub zone: String,
    pub zone_name: String,
    pub zone_id: i64,
    pub zone_state: String,
    pub zone_support_ipv6: i64,
    pub standby_zone_set: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct RegionInfo {
    pub region: String,
    pub region_name: String,
    pub region_id: i64,
    pub region_state: String,
    pub support_international: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct SecurityGroup {
    pub security_group_id: String,
    pub security_group_name: String,
    pub project_id: i64,
}

/// Parameters of `CreateInstances`
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct CreateInstancesRequest {
    pub spec_code: String,
    pub storage: i64,
    pub instance_count: i64,
    pub period: i64,
    pub zone: String,
    pub charset: String,
    pub admin_name: String,
    pub admin_password: String,
    pub project_id: i64,
    #[serde(rename = "DBVersion", skip_serializing_if = "String::is_empty")]
    pub db_version: String,
    #[serde(rename = "DBMajorVersion", skip_serializing_if = "String::is_empty")]
    pub db_major_version: String,
    #[serde(rename = "DBKernelVersion", skip_serializing_if = "String::is_empty")]
    pub db_kernel_version: String,
    pub instance_charge_type: String,
    pub auto_renew_flag: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub vpc_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subnet_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_voucher: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub voucher_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_group_ids: Vec<String>,
    #[serde(rename = "NeedSupportTDE", skip_serializing_if = "Option::is_none")]
    pub need_support_tde: Option<i64>,
    #[serde(rename = "KMSKeyId", skip_serializing_if = "String::is_empty")]
    pub kms_key_id: String,
    #[serde(rename = "KMSRegion", skip_serializing_if = "String::is_empty")]
    pub kms_region: String,
    #[serde(rename = "KMSClusterId", skip_serializing_if = "String::is_empty")]
    pub kms_cluster_id: String,
    #[serde(rename = "DBNodeSet", skip_serializing_if = "Vec::is_empty")]
    pub db_node_set: Vec<DbNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tag_list: Vec<Tag>,
}

/// Parameters of `CreateReadOnlyDBInstance`
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct CreateReadOnlyInstanceRequest {
    #[serde(rename = "DBVersion")]
    pub db_version: String,
    pub spec_code: String,
    pub storage: i64,
    pub instance_count: i64,
    pub period: i64,
    #[serde(rename = "MasterDBInstanceId")]
    pub master_db_instance_id: String,
    pub zone: String,
    pub project_id: i64,
    pub instance_charge_type: String,
    pub auto_renew_flag: i64,
    pub vpc_id: String,
    pub subnet_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_voucher: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub voucher_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_group_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub need_support_ipv6: Option<i64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub read_only_group_id: String,
}

/// Parameters of `CreateReadOnlyGroup` and `ModifyReadOnlyGroupConfig`
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ReadOnlyGroupConfig {
    #[serde(rename = "MasterDBInstanceId", skip_serializing_if = "String::is_empty")]
    pub master_db_instance_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub read_only_group_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub vpc_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subnet_id: String,
    pub replay_lag_eliminate: i64,
    pub replay_latency_eliminate: i64,
    pub max_replay_lag: i64,
    pub max_replay_latency: i64,
    pub min_delay_eliminate_reserve: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_group_ids: Vec<String>,
}

/// Parameters of `ModifyBackupPlan`
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ModifyBackupPlanRequest {
    #[serde(rename = "DBInstanceId")]
    pub db_instance_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub plan_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub min_backup_start_time: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub max_backup_start_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_backup_retention_period: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub backup_period: Vec<String>,
}

/// Parameters of `CreateBackupPlan`
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct CreateBackupPlanRequest {
    #[serde(rename = "DBInstanceId")]
    pub db_instance_id: String,
    pub plan_name: String,
    pub backup_period_type: String,
    pub backup_period: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub min_backup_start_time: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub max_backup_start_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_backup_retention_period: Option<i64>,
}
