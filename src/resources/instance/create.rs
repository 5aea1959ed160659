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

use std::collections::BTreeMap;
use std::time::Duration;

use tf_provider::value::ValueString;

use crate::error::{Error, Result};
use crate::retry::{retry, retry_any, retry_error, READ_RETRY_TIMEOUT, WRITE_RETRY_TIMEOUT};
use crate::service::models::{
    CreateBackupPlanRequest, CreateInstancesRequest, ModifyBackupPlanRequest, SpecItemInfo,
};
use crate::service::{
    PostgresqlService, TagDiff, BACKUP_PERIOD_TYPE_MONTH, DEFAULT_ENGINE_VERSION,
    INSTANCE_STATUS_LIMIT, MONTHLY_PLAN_NAME,
};
use crate::utils::{flag, list_strings, map_strings, number, set_strings, text};

use super::state::{BackupPlanState, InstanceState};

/// Default wait for the instance to be back running
pub(super) const CHECK_TIMEOUT: Duration = Duration::from_secs(2 * 3 * 60);
/// Parameter changes take this long to show up in `DescribeParamsEvent`
pub(super) const PARAMS_SYNC_DELAY: Duration = Duration::from_secs(10);

fn push_unique<'s>(values: &mut Vec<&'s str>, value: &'s str) {
    if !values.contains(&value) {
        values.push(value);
    }
}

/// Pick the sale specification matching the version, the memory (GB) and the cpu when set
pub fn select_spec_code(
    specs: &[SpecItemInfo],
    db_version: &str,
    db_major_version: &str,
    memory: i64,
    cpu: i64,
) -> Result<String> {
    let mut versions = Vec::new();
    let mut major_versions = Vec::new();
    let mut combinations: Vec<String> = Vec::new();
    let mut version_found = false;
    for spec in specs {
        push_unique(&mut versions, &spec.version);
        push_unique(&mut major_versions, &spec.major_version);
        let same_version = (!db_major_version.is_empty() && spec.major_version == db_major_version)
            || (!db_version.is_empty() && spec.version == db_version);
        if !same_version {
            continue;
        }
        version_found = true;
        let spec_memory = spec.memory / 1024;
        if spec_memory == memory && (cpu == 0 || spec.cpu == cpu) {
            return Ok(spec.spec_code.clone());
        }
        let combination = format!("({spec_memory}, {})", spec.cpu);
        if !combinations.contains(&combination) {
            combinations.push(combination);
        }
    }
    if !version_found {
        return Err(Error::invalid(format!(
            r#"The "db_major_version" value: "{db_major_version}" is invalid, Valid values are one of: "{}", The "engine_version" value: "{db_version}" is invalid, Valid values are one of: "{}""#,
            major_versions.join(r#"", ""#),
            versions.join(r#"", ""#),
        )));
    }
    Err(Error::invalid(format!(
        r#"The "memory" value: {memory} or the "cpu" value: {cpu} is invalid, Valid combine values are one of: {} ."#,
        combinations.join("; ")
    )))
}

impl BackupPlanState<'_> {
    /// Changes of the main plan, `plan_id` selecting another plan when not empty
    pub fn modify_request(&self, instance_id: &str, plan_id: &str) -> ModifyBackupPlanRequest {
        ModifyBackupPlanRequest {
            db_instance_id: instance_id.to_string(),
            plan_id: plan_id.to_string(),
            min_backup_start_time: text(&self.min_backup_start_time).to_string(),
            max_backup_start_time: text(&self.max_backup_start_time).to_string(),
            base_backup_retention_period: self
                .base_backup_retention_period
                .as_ref_option()
                .copied()
                .filter(|days| *days != 0),
            backup_period: list_strings(&self.backup_period),
        }
    }

    /// Changes of the monthly plan
    pub fn monthly_modify_request(&self, instance_id: &str, plan_id: &str) -> ModifyBackupPlanRequest {
        ModifyBackupPlanRequest {
            base_backup_retention_period: self
                .monthly_backup_retention_period
                .as_ref_option()
                .copied()
                .filter(|days| *days != 0),
            backup_period: list_strings(&self.monthly_backup_period),
            ..self.modify_request(instance_id, plan_id)
        }
    }

    /// Monthly plan to create, if any month day is given
    pub fn monthly_create_request(&self, instance_id: &str) -> Option<CreateBackupPlanRequest> {
        let days = list_strings(&self.monthly_backup_period);
        if days.is_empty() {
            return None;
        }
        Some(CreateBackupPlanRequest {
            db_instance_id: instance_id.to_string(),
            plan_name: MONTHLY_PLAN_NAME.to_string(),
            backup_period_type: BACKUP_PERIOD_TYPE_MONTH.to_string(),
            backup_period: days,
            min_backup_start_time: text(&self.min_backup_start_time).to_string(),
            max_backup_start_time: text(&self.max_backup_start_time).to_string(),
            base_backup_retention_period: self
                .monthly_backup_retention_period
                .as_ref_option()
                .copied()
                .filter(|days| *days != 0),
        })
    }
}

pub(super) async fn modify_backup_plan(
    service: &PostgresqlService,
    request: &ModifyBackupPlanRequest,
) -> Result<()> {
    retry(WRITE_RETRY_TIMEOUT, || async {
        service
            .modify_backup_plan(request)
            .await
            .map_err(|err| retry_error(err, &[INSTANCE_STATUS_LIMIT]))
    })
    .await
}

pub(super) async fn create_backup_plan(
    service: &PostgresqlService,
    request: &CreateBackupPlanRequest,
) -> Result<String> {
    retry(WRITE_RETRY_TIMEOUT, || async {
        service
            .create_backup_plan(request)
            .await
            .map_err(|err| retry_error(err, &[INSTANCE_STATUS_LIMIT]))
    })
    .await
}

pub(super) async fn modify_params(
    service: &PostgresqlService,
    instance_id: &str,
    params: &BTreeMap<String, String>,
) -> Result<()> {
    retry(WRITE_RETRY_TIMEOUT, || async {
        service
            .modify_params(instance_id, params)
            .await
            .map_err(|err| retry_error(err, &[]))
    })
    .await?;
    tokio::time::sleep(PARAMS_SYNC_DELAY).await;
    Ok(())
}

impl<'a> InstanceState<'a> {
    pub fn create_request(&self, spec_code: String) -> CreateInstancesRequest {
        let mut db_version = text(&self.engine_version).to_string();
        let db_major_version = text(&self.db_major_version).to_string();
        let db_kernel_version = text(&self.db_kernel_version).to_string();
        if db_version.is_empty() && db_major_version.is_empty() && db_kernel_version.is_empty() {
            db_version = DEFAULT_ENGINE_VERSION.to_string();
        }
        let tde = number(&self.need_support_tde) == 1;
        let tde_text = |value: &ValueString| {
            if tde {
                text(value).to_string()
            } else {
                String::new()
            }
        };
        CreateInstancesRequest {
            spec_code,
            storage: number(&self.storage),
            instance_count: 1,
            period: self.period.as_ref_option().copied().unwrap_or(1),
            zone: text(&self.availability_zone).to_string(),
            charset: text(&self.charset).to_string(),
            admin_name: text(&self.root_user).to_string(),
            admin_password: text(&self.root_password).to_string(),
            project_id: number(&self.project_id),
            db_version,
            db_major_version,
            db_kernel_version,
            instance_charge_type: text(&self.charge_type).to_string(),
            auto_renew_flag: number(&self.auto_renew_flag),
            vpc_id: text(&self.vpc_id).to_string(),
            subnet_id: text(&self.subnet_id).to_string(),
            name: text(&self.name).to_string(),
            auto_voucher: self.auto_voucher.as_ref_option().copied().filter(|v| *v > 0),
            voucher_ids: self.voucher_ids(),
            security_group_ids: set_strings(&self.security_groups),
            need_support_tde: tde.then_some(1),
            kms_key_id: tde_text(&self.kms_key_id),
            kms_region: tde_text(&self.kms_region),
            kms_cluster_id: tde_text(&self.kms_cluster_id),
            db_node_set: self.nodes(),
            tag_list: Vec::new(),
        }
    }

    /// Order the instance and return its id
    pub(super) async fn create(&self, service: &PostgresqlService) -> Result<String> {
        let zone = text(&self.availability_zone);
        let specs = retry(5 * READ_RETRY_TIMEOUT, || async {
            service
                .describe_spec_infos(zone)
                .await
                .map_err(|err| retry_error(err, &[]))
        })
        .await?;
        let request = self.create_request(String::new());
        let spec_code = select_spec_code(
            &specs,
            &request.db_version,
            &request.db_major_version,
            number(&self.memory),
            number(&self.cpu),
        )?;
        self.check_zone_included().map_err(Error::Invalid)?;
        let request = CreateInstancesRequest {
            spec_code,
            ..request
        };

        let instance_id = retry(WRITE_RETRY_TIMEOUT, || async {
            service
                .create_instance(&request)
                .await
                .map_err(|err| retry_any(err, &[]))
        })
        .await?;
        tracing::info!(%instance_id, "postgresql instance ordered");
        Ok(instance_id)
    }

    /// Bring a freshly created instance to the configured state
    pub(super) async fn setup(&self, service: &PostgresqlService, instance_id: &str) -> Result<()> {
        service
            .check_instance_status(instance_id, 20 * READ_RETRY_TIMEOUT)
            .await?;

        if flag(&self.public_access_switch) {
            service.modify_public_service(true, instance_id).await?;
            service.check_instance_status(instance_id, CHECK_TIMEOUT).await?;
        }

        let name = text(&self.name);
        retry(WRITE_RETRY_TIMEOUT, || async {
            service
                .modify_instance_name(instance_id, name)
                .await
                .map_err(|err| retry_error(err, &[]))
        })
        .await?;
        service.check_instance_status(instance_id, CHECK_TIMEOUT).await?;

        let tags = map_strings(&self.tags);
        if !tags.is_empty() {
            let diff = TagDiff::new(&BTreeMap::new(), &tags);
            retry(WRITE_RETRY_TIMEOUT, || async {
                service
                    .modify_tags(instance_id, &diff)
                    .await
                    .map_err(|err| retry_error(err, &[]))
            })
            .await?;
        }

        let params = self.params();
        if !params.is_empty() {
            modify_params(service, instance_id, &params).await?;
        }

        if let Some(plan) = self.backup_plan.as_ref_option() {
            if let Some(request) = plan.monthly_create_request(instance_id) {
                create_backup_plan(service, &request).await?;
            }
            modify_backup_plan(service, &plan.modify_request(instance_id, "")).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tf_provider::value::Value;

    use super::*;

    fn spec(code: &str, version: &str, major: &str, memory: i64, cpu: i64) -> SpecItemInfo {
        SpecItemInfo {
            spec_code: code.to_string(),
            version: version.to_string(),
            major_version: major.to_string(),
            memory,
            cpu,
            ..Default::default()
        }
    }

    fn specs() -> Vec<SpecItemInfo> {
        vec![
            spec("pg.it.small2", "10.4", "10", 2048, 1),
            spec("pg.it.medium4", "10.4", "10", 4096, 2),
            spec("pg.it.medium4c4", "10.4", "10", 4096, 4),
            spec("pg.it.small2", "13.3", "13", 2048, 1),
        ]
    }

    #[test]
    fn test_select_by_version_and_memory() {
        assert_eq!(select_spec_code(&specs(), "10.4", "", 4, 0).unwrap(), "pg.it.medium4");
        assert_eq!(select_spec_code(&specs(), "", "10", 4, 4).unwrap(), "pg.it.medium4c4");
        assert_eq!(select_spec_code(&specs(), "", "13", 2, 0).unwrap(), "pg.it.small2");
    }

    #[test]
    fn test_select_unknown_version() {
        let err = select_spec_code(&specs(), "9.6", "", 2, 0).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"The "db_major_version" value: "" is invalid, Valid values are one of: "10", "13", The "engine_version" value: "9.6" is invalid, Valid values are one of: "10.4", "13.3""#
        );
    }

    #[test]
    fn test_select_unknown_memory() {
        let err = select_spec_code(&specs(), "10.4", "", 8, 0).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"The "memory" value: 8 or the "cpu" value: 0 is invalid, Valid combine values are one of: (2, 1); (4, 2); (4, 4) ."#
        );
    }

    #[test]
    fn test_create_request_defaults() {
        let state = InstanceState {
            name: "main".into(),
            charge_type: "POSTPAID_BY_HOUR".into(),
            engine_version: Value::Unknown,
            db_major_version: Value::Unknown,
            db_kernel_version: Value::Unknown,
            kms_key_id: "key-1".into(),
            storage: Value::Value(20),
            auto_voucher: Value::Value(0),
            ..Default::default()
        };
        let request = state.create_request("pg.it.small2".to_string());
        assert_eq!(request.db_version, DEFAULT_ENGINE_VERSION);
        assert_eq!(request.period, 1);
        assert_eq!(request.instance_count, 1);
        assert_eq!(request.auto_voucher, None);
        assert_eq!(request.need_support_tde, None);
        assert!(request.kms_key_id.is_empty());
    }

    #[test]
    fn test_backup_plan_requests() {
        let plan = BackupPlanState {
            min_backup_start_time: "01:00:00".into(),
            base_backup_retention_period: Value::Value(7),
            backup_period: Value::Value(vec!["monday".into()]),
            monthly_backup_period: Value::Value(vec!["1".into(), "15".into()]),
            monthly_backup_retention_period: Value::Value(30),
            ..Default::default()
        };
        let request = plan.modify_request("postgres-1", "");
        assert_eq!(request.base_backup_retention_period, Some(7));
        assert_eq!(request.backup_period, ["monday"]);
        assert!(request.max_backup_start_time.is_empty());

        let monthly = plan.monthly_create_request("postgres-1").unwrap();
        assert_eq!(monthly.backup_period_type, "month");
        assert_eq!(monthly.plan_name, "custom_month");
        assert_eq!(monthly.base_backup_retention_period, Some(30));

        let monthly = plan.monthly_modify_request("postgres-1", "plan-1");
        assert_eq!(monthly.plan_id, "plan-1");
        assert_eq!(monthly.backup_period, ["1", "15"]);
        assert_eq!(monthly.min_backup_start_time, "01:00:00");

        assert!(BackupPlanState::default()
            .monthly_create_request("postgres-1")
            .is_none());
    }
}
