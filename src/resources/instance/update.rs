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
use crate::retry::{
    retry, retry_error, RetryError, StateChangeConf, READ_RETRY_TIMEOUT, WRITE_RETRY_TIMEOUT,
};
use crate::service::models::Version;
use crate::service::{
    filter_versions, NetworkTarget, PostgresqlService, TagDiff, FAILED_OPERATION_ERROR,
    INSTANCE_STATUS_LIMIT, NET_STATUS_OPENED, PAY_TYPE_POSTPAID, PAY_TYPE_PREPAID,
    RETRYABLE_STATUS, STATUS_CLOSED, STATUS_ISOLATED, STATUS_OFFLINE, STATUS_RUNNING,
};
use crate::utils::{flag, list_strings, map_strings, number, set_strings, text};

use super::create::{create_backup_plan, modify_backup_plan, modify_params, CHECK_TIMEOUT};
use super::state::{InstanceState, SWITCH_IMMEDIATELY};

/// Longest wait for a resized instance to be running again
const SPEC_CHECK_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Engine versions as `[engine_version, db_major_version, db_kernel_version]`
type Versions<'s> = [&'s str; 3];

fn known_or<'s>(planned: &'s ValueString<'_>, prior: &'s ValueString<'_>) -> &'s str {
    if planned.is_unknown() {
        text(prior)
    } else {
        text(planned)
    }
}

/// Both the current and the target versions must be listed as available
pub fn check_upgrade(versions: &[Version], current: Versions, target: Versions) -> Result<()> {
    let [engine, major, kernel] = current;
    if filter_versions(versions.to_vec(), engine, major, kernel).is_empty() {
        return Err(Error::invalid(format!(
            "Current postgresql instance engine_version: {engine}, db_major_version: {major} and db_kernel_version: {kernel}. has no available upgrade target verison."
        )));
    }
    let [engine, major, kernel] = target;
    if filter_versions(versions.to_vec(), engine, major, kernel).is_empty() {
        return Err(Error::invalid(format!(
            "The expected modifications of engine_version: {engine}, db_major_version: {major} and db_kernel_version: {kernel} are illegal, available upgrade target verison cannot be found."
        )));
    }
    Ok(())
}

async fn write<F, Fut>(f: F) -> Result<()>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = std::result::Result<(), crate::api::ApiError>>,
{
    retry(WRITE_RETRY_TIMEOUT, || async { f().await.map_err(|err| retry_error(err, &[])) }).await
}

impl<'a> InstanceState<'a> {
    fn versions(&self) -> Versions<'_> {
        [
            text(&self.engine_version),
            text(&self.db_major_version),
            text(&self.db_kernel_version),
        ]
    }

    /// Versions targeted by the update, prior values standing in for recomputed ones
    fn target_versions<'s>(&'s self, prior: &'s InstanceState<'_>) -> Versions<'s> {
        [
            known_or(&self.engine_version, &prior.engine_version),
            known_or(&self.db_major_version, &prior.db_major_version),
            known_or(&self.db_kernel_version, &prior.db_kernel_version),
        ]
    }

    /// Apply the changes from `prior` on the instance
    pub(super) async fn update(
        &self,
        prior: &InstanceState<'_>,
        service: &PostgresqlService,
    ) -> Result<()> {
        let instance_id = text(&prior.id);
        let switch_tag = self.switch_tag();

        if self.charge_type != prior.charge_type {
            if text(&prior.charge_type) != PAY_TYPE_POSTPAID
                || text(&self.charge_type) != PAY_TYPE_PREPAID
            {
                return Err(Error::invalid(
                    "It only support to update the charge type from `POSTPAID_BY_HOUR` to `PREPAID`.",
                ));
            }
            write(|| service.modify_charge_type(instance_id, PAY_TYPE_PREPAID, 1)).await?;
            service.check_instance_status(instance_id, CHECK_TIMEOUT).await?;
        }

        if self.auto_renew_flag != prior.auto_renew_flag {
            let renew = number(&self.auto_renew_flag);
            write(|| service.set_auto_renew_flag(instance_id, renew)).await?;
            service.check_instance_status(instance_id, CHECK_TIMEOUT).await?;
        }

        if self.period != prior.period {
            let period = number(&self.period);
            let auto_voucher = number(&self.auto_voucher);
            let voucher_ids = self.voucher_ids();
            write(|| service.renew_instance(instance_id, period, auto_voucher, &voucher_ids)).await?;
            service.check_instance_status(instance_id, CHECK_TIMEOUT).await?;
        }

        if self.vpc_id != prior.vpc_id || self.subnet_id != prior.subnet_id {
            self.move_network(prior, service).await?;
        }

        if self.name != prior.name {
            let name = text(&self.name);
            write(|| service.modify_instance_name(instance_id, name)).await?;
            service.check_instance_status(instance_id, CHECK_TIMEOUT).await?;
        }

        if self.memory != prior.memory || self.storage != prior.storage || self.cpu != prior.cpu {
            self.resize(instance_id, service).await?;
        }

        if self.project_id != prior.project_id {
            let project_id = number(&self.project_id);
            write(|| service.modify_project(instance_id, project_id)).await?;
            service.check_instance_status(instance_id, CHECK_TIMEOUT).await?;
        }

        if self.public_access_switch != prior.public_access_switch {
            service
                .modify_public_service(flag(&self.public_access_switch), instance_id)
                .await?;
            service.check_instance_status(instance_id, CHECK_TIMEOUT).await?;
        }

        if self.root_password != prior.root_password {
            let user = text(&self.root_user);
            let password = text(&self.root_password);
            write(|| service.reset_account_password(instance_id, user, password)).await?;
            service.check_instance_status(instance_id, CHECK_TIMEOUT).await?;
        }

        if self.security_groups != prior.security_groups && !self.security_groups.is_unknown() {
            let groups = set_strings(&self.security_groups);
            write(|| service.modify_security_groups(NetworkTarget::Instance(instance_id), &groups))
                .await?;
        }

        if self.backup_plan != prior.backup_plan {
            self.update_backup_plan(prior, service).await?;
        }

        if self.db_node_set != prior.db_node_set {
            self.check_zone_included().map_err(Error::Invalid)?;
            let nodes = self.nodes();
            retry(WRITE_RETRY_TIMEOUT, || async {
                service
                    .modify_deployment(instance_id, switch_tag, &nodes)
                    .await
                    .map_err(|err| retry_error(err, &[INSTANCE_STATUS_LIMIT]))
            })
            .await?;
            if switch_tag == SWITCH_IMMEDIATELY {
                wait_settled(service, instance_id).await?;
            }
        }

        if self.availability_zone != prior.availability_zone {
            return Err(Error::invalid(
                "The `availability_zone` cannot be modified, please use `db_node_set` instead of it.",
            ));
        }

        let target = self.target_versions(prior);
        if target != prior.versions() {
            self.upgrade(prior, service).await?;
        }

        if self.tags != prior.tags {
            let diff = TagDiff::new(&map_strings(&prior.tags), &map_strings(&self.tags));
            if !diff.is_empty() {
                write(|| service.modify_tags(instance_id, &diff)).await?;
            }
        }

        let params = changed_params(&prior.params(), self.params());
        if !params.is_empty() {
            modify_params(service, instance_id, &params).await?;
        }
        Ok(())
    }

    /// Open an address in the new subnet before closing the old one
    async fn move_network(
        &self,
        prior: &InstanceState<'_>,
        service: &PostgresqlService,
    ) -> Result<()> {
        let instance_id = text(&prior.id);
        let target = NetworkTarget::Instance(instance_id);
        let instance = super::read::fetch_instance(service, instance_id)
            .await?
            .ok_or_else(|| Error::unexpected(format!("postgresql instance {instance_id} is gone")))?;
        let infos = instance.db_instance_net_info.len();
        if infos > 2 {
            return Err(Error::invalid(format!(
                "There are already {} network information for the current PostgreSQL instance {instance_id}. Please remove one before modifying the instance network information.",
                infos - 1
            )));
        }

        let (vpc_old, subnet_old) = (text(&prior.vpc_id), text(&prior.subnet_id));
        let (vpc_new, subnet_new) = (text(&self.vpc_id), text(&self.subnet_id));
        write(|| service.create_network_access(target, vpc_new, subnet_new, false, "")).await?;

        let opened = StateChangeConf::new(&[NET_STATUS_OPENED], 3 * READ_RETRY_TIMEOUT)
            .wait_for_state(|| service.network_access_state(target, vpc_new, subnet_new, "", ""))
            .await?;
        let vip_new = opened.map(|info| info.ip).unwrap_or_default();
        service
            .wait_instance_status(instance_id, &[STATUS_RUNNING], 3 * READ_RETRY_TIMEOUT)
            .await?;

        let vip_old = text(&prior.private_access_ip);
        service
            .delete_network_access(target, vpc_old, subnet_old, vip_old)
            .await?;
        StateChangeConf::new(&[STATUS_CLOSED], 3 * READ_RETRY_TIMEOUT)
            .wait_for_state(|| {
                service.network_access_state(target, vpc_old, subnet_old, &vip_new, vip_old)
            })
            .await?;
        service
            .wait_instance_status(instance_id, &[STATUS_RUNNING], 3 * READ_RETRY_TIMEOUT)
            .await?;
        tracing::info!(instance_id, vpc_new, subnet_new, %vip_new, "postgresql instance network moved");
        Ok(())
    }

    async fn resize(&self, instance_id: &str, service: &PostgresqlService) -> Result<()> {
        let memory = number(&self.memory);
        let storage = number(&self.storage);
        let cpu = number(&self.cpu);
        let switch_tag = self.switch_tag();
        write(|| service.modify_instance_spec(instance_id, memory, storage, cpu, switch_tag)).await?;
        if switch_tag != SWITCH_IMMEDIATELY {
            return Ok(());
        }

        // the instance may not have left `running` yet
        let _ = retry(Duration::from_secs(10), || async {
            let instance = service
                .describe_instance_by_id(instance_id)
                .await
                .map_err(|err| retry_error(err, &[]))?;
            match instance {
                Some(instance) if instance.db_instance_status == STATUS_RUNNING => Err(
                    RetryError::retryable(Error::unexpected("waiting for upgrade status change")),
                ),
                _ => Ok(()),
            }
        })
        .await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        service
            .check_instance_status(instance_id, SPEC_CHECK_TIMEOUT)
            .await
    }

    async fn update_backup_plan(
        &self,
        prior: &InstanceState<'_>,
        service: &PostgresqlService,
    ) -> Result<()> {
        let Some(plan) = self.backup_plan.as_ref_option() else {
            return Ok(());
        };
        let instance_id = text(&prior.id);
        modify_backup_plan(service, &plan.modify_request(instance_id, "")).await?;

        let monthly_plan_id = prior
            .backup_plan
            .as_ref_option()
            .map(|prior| text(&prior.monthly_plan_id))
            .unwrap_or_default();
        let has_monthly_period = !list_strings(&plan.monthly_backup_period).is_empty();
        match (has_monthly_period, monthly_plan_id.is_empty()) {
            (false, true) => {}
            (false, false) => {
                write(|| service.delete_backup_plan(instance_id, monthly_plan_id)).await?;
            }
            (true, true) => {
                if let Some(request) = plan.monthly_create_request(instance_id) {
                    create_backup_plan(service, &request).await?;
                }
            }
            _ => {
                let request = plan.monthly_modify_request(instance_id, monthly_plan_id);
                modify_backup_plan(service, &request).await?;
            }
        }
        Ok(())
    }

    async fn upgrade(&self, prior: &InstanceState<'_>, service: &PostgresqlService) -> Result<()> {
        let instance_id = text(&prior.id);
        let current = prior.versions();
        let target = self.target_versions(prior);
        let versions = service.describe_db_versions().await?;
        check_upgrade(&versions, current, target)?;

        let [_, major, kernel] = target;
        let major_upgrade = major != current[1];
        let switch_tag = self.switch_tag();
        retry(WRITE_RETRY_TIMEOUT, || async {
            let (kind, result) = if major_upgrade {
                ("major", service.upgrade_major_version(instance_id, kernel, switch_tag).await)
            } else {
                ("kernel", service.upgrade_kernel_version(instance_id, kernel, switch_tag).await)
            };
            result.map_err(|err| {
                if err.code() == Some(FAILED_OPERATION_ERROR) {
                    RetryError::non_retryable(Error::invalid(format!(
                        "Upgrade {kind} version failed: {err}"
                    )))
                } else {
                    retry_error(err, &[])
                }
            })
        })
        .await?;
        tracing::info!(instance_id, kernel, major_upgrade, "postgresql instance upgrade requested");

        if switch_tag == SWITCH_IMMEDIATELY {
            StateChangeConf::new(
                &[STATUS_RUNNING, STATUS_ISOLATED, STATUS_OFFLINE],
                10 * READ_RETRY_TIMEOUT,
            )
            .wait_for_state(|| service.instance_raw_state(instance_id))
            .await?;
        }
        Ok(())
    }
}

/// Wait for the instance to leave the transient statuses
async fn wait_settled(service: &PostgresqlService, instance_id: &str) -> Result<()> {
    retry(10 * READ_RETRY_TIMEOUT, || async {
        let instance = service
            .describe_instance_by_id(instance_id)
            .await
            .map_err(|err| retry_error(err, &[]))?;
        match instance {
            Some(instance) if RETRYABLE_STATUS.contains(&instance.db_instance_status.as_str()) => {
                Err(RetryError::retryable(Error::unexpected(format!(
                    "instance status is {}, retrying",
                    instance.db_instance_status
                ))))
            }
            _ => Ok(()),
        }
    })
    .await
}

/// Parameters added or changed since `prior`
fn changed_params(
    prior: &BTreeMap<String, String>,
    params: BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    params
        .into_iter()
        .filter(|(name, value)| prior.get(name) != Some(value))
        .collect()
}

#[cfg(test)]
mod tests {
    use tf_provider::value::Value;

    use super::*;

    fn version(engine: &str, major: &str, kernel: &str) -> Version {
        Version {
            db_version: engine.to_string(),
            db_major_version: major.to_string(),
            db_kernel_version: kernel.to_string(),
            ..Default::default()
        }
    }

    fn versions() -> Vec<Version> {
        vec![
            version("13.3", "13", "v13.3_r1.1"),
            version("13.3", "13", "v13.3_r1.4"),
            version("14.2", "14", "v14.2_r1.0"),
        ]
    }

    #[test]
    fn test_changed_params() {
        let prior = BTreeMap::from([
            ("max_standby_archive_delay".to_string(), "300000".to_string()),
            ("max_standby_streaming_delay".to_string(), "30000".to_string()),
        ]);
        let params = BTreeMap::from([
            ("max_standby_archive_delay".to_string(), "300000".to_string()),
            ("max_standby_streaming_delay".to_string(), "60000".to_string()),
        ]);
        assert_eq!(
            changed_params(&prior, params),
            BTreeMap::from([("max_standby_streaming_delay".to_string(), "60000".to_string())])
        );

        let added = BTreeMap::from([("max_standby_archive_delay".to_string(), "1000".to_string())]);
        assert_eq!(changed_params(&BTreeMap::new(), added.clone()), added);
        assert!(changed_params(&prior, prior.clone()).is_empty());
    }

    #[test]
    fn test_check_upgrade() {
        let current = ["13.3", "13", "v13.3_r1.1"];
        assert!(check_upgrade(&versions(), current, ["13.3", "13", "v13.3_r1.4"]).is_ok());
        assert!(check_upgrade(&versions(), current, ["", "14", "v14.2_r1.0"]).is_ok());

        let err = check_upgrade(&versions(), current, ["13.3", "13", "v13.3_r9.9"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The expected modifications of engine_version: 13.3, db_major_version: 13 and db_kernel_version: v13.3_r9.9 are illegal, available upgrade target verison cannot be found."
        );

        let err =
            check_upgrade(&versions(), ["10.4", "10", "v10.4_r1.0"], current).unwrap_err();
        assert!(err.to_string().starts_with("Current postgresql instance engine_version: 10.4"));
    }

    #[test]
    fn test_target_versions_keep_prior_values() {
        let prior = InstanceState {
            engine_version: "13.3".into(),
            db_major_version: "13".into(),
            db_kernel_version: "v13.3_r1.1".into(),
            ..Default::default()
        };
        let planned = InstanceState {
            engine_version: Value::Unknown,
            db_major_version: Value::Unknown,
            db_kernel_version: "v13.3_r1.4".into(),
            ..Default::default()
        };
        assert_eq!(
            planned.target_versions(&prior),
            ["13.3", "13", "v13.3_r1.4"]
        );
        assert_eq!(prior.target_versions(&prior), prior.versions());
    }
}
