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

use serde::Deserialize;
use serde_json::json;
use time::{macros::format_description, PrimitiveDateTime};

use crate::api::ApiError;
use crate::error::{Error, Result};
use crate::retry::{retry, retry_error, RetryError, StateChangeConf, READ_RETRY_TIMEOUT, WRITE_RETRY_TIMEOUT};

use super::models::{
    AccountInfo, CreateInstancesRequest, DbInstance, DbNode, EncryptionKey, EventItem, Filter,
    ParamEntry, ParamInfo, PgDeal, RegionInfo, SpecInfo, SpecItemInfo, Version, ZoneInfo,
};
use super::{
    PostgresqlService, INSTANCE_NOT_FOUND, INSTANCE_STATUS_LIMIT, STATUS_CLOSED, STATUS_ISOLATED,
    STATUS_OFFLINE, STATUS_RECYCLED, STATUS_RUNNING,
};

/// Polls tolerated while the public address still reports its former status
const PUBLIC_ACCESS_GRACE_POLLS: usize = 5;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DescribeDBInstanceAttributeResponse {
    #[serde(rename = "DBInstance")]
    db_instance: Option<DbInstance>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DescribeDBInstancesResponse {
    total_count: i64,
    #[serde(rename = "DBInstanceSet")]
    db_instance_set: Vec<DbInstance>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DescribeProductConfigResponse {
    spec_info_list: Vec<SpecInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct CreateInstancesResponse {
    deal_names: Vec<String>,
    #[serde(rename = "DBInstanceIdSet")]
    db_instance_id_set: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DescribeOrdersResponse {
    deals: Vec<PgDeal>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DescribeAccountsResponse {
    details: Vec<AccountInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DescribeParamsEventResponse {
    event_items: Vec<EventItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DescribeDBInstanceParametersResponse {
    detail: Vec<ParamInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DescribeEncryptionKeysResponse {
    encryption_keys: Vec<EncryptionKey>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DescribeDBVersionsResponse {
    version_set: Vec<Version>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DescribeZonesResponse {
    zone_set: Vec<ZoneInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DescribeRegionsResponse {
    region_set: Vec<RegionInfo>,
}

#[derive(Debug, Default, Deserialize)]
struct Empty {}

/// An instance "exists" as long as it was neither isolated nor destroyed
pub fn instance_exists(instance: &DbInstance) -> bool {
    !matches!(
        instance.db_instance_status.as_str(),
        STATUS_ISOLATED | STATUS_RECYCLED | STATUS_OFFLINE
    )
}

/// Keep accounts with a real creation time, oldest first
pub fn sort_accounts_by_creation(accounts: Vec<AccountInfo>) -> Vec<AccountInfo> {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let mut accounts: Vec<(Option<PrimitiveDateTime>, AccountInfo)> = accounts
        .into_iter()
        .filter(|account| !account.create_time.contains("0000-00-00"))
        .map(|account| {
            (
                PrimitiveDateTime::parse(&account.create_time, &format).ok(),
                account,
            )
        })
        .collect();
    // Unparsable dates keep their position relative to each other, after the parsed ones
    accounts.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    accounts.into_iter().map(|(_, account)| account).collect()
}

/// Keep the versions matching every non-empty criterion
pub fn filter_versions(
    versions: Vec<Version>,
    db_version: &str,
    db_major_version: &str,
    db_kernel_version: &str,
) -> Vec<Version> {
    versions
        .into_iter()
        .filter(|version| {
            (db_version.is_empty() || version.db_version == db_version)
                && (db_major_version.is_empty() || version.db_major_version == db_major_version)
                && (db_kernel_version.is_empty()
                    || version.db_kernel_version == db_kernel_version)
        })
        .collect()
}

impl PostgresqlService {
    pub async fn describe_instance_attribute(
        &self,
        instance_id: &str,
    ) -> Result<Option<DbInstance>, ApiError> {
        let response: DescribeDBInstanceAttributeResponse = self
            .call(
                "DescribeDBInstanceAttribute",
                &json!({ "DBInstanceId": instance_id }),
            )
            .await?;
        Ok(response.db_instance)
    }

    /// Describe an instance, `None` when it was isolated or destroyed
    pub async fn describe_instance_by_id(
        &self,
        instance_id: &str,
    ) -> Result<Option<DbInstance>, ApiError> {
        Ok(self
            .describe_instance_attribute(instance_id)
            .await?
            .filter(instance_exists))
    }

    pub async fn describe_instances(&self, filters: &[Filter]) -> Result<Vec<DbInstance>, ApiError> {
        const LIMIT: usize = 10;
        let mut instances = Vec::new();
        let mut offset = 0;
        loop {
            let response: DescribeDBInstancesResponse = self
                .call(
                    "DescribeDBInstances",
                    &json!({ "Offset": offset, "Limit": LIMIT, "Filters": filters }),
                )
                .await?;
            let count = response.db_instance_set.len();
            tracing::trace!(total = response.total_count, count, offset, "instances page");
            instances.extend(response.db_instance_set);
            if count < LIMIT {
                return Ok(instances);
            }
            offset += LIMIT;
        }
    }

    /// Sale specifications available in `zone`
    pub async fn describe_spec_infos(&self, zone: &str) -> Result<Vec<SpecItemInfo>, ApiError> {
        let response: DescribeProductConfigResponse = self
            .call("DescribeProductConfig", &json!({ "Zone": zone }))
            .await?;
        Ok(response
            .spec_info_list
            .into_iter()
            .next()
            .map(|info| info.spec_item_info_list)
            .unwrap_or_default())
    }

    /// Create an instance and return its id
    ///
    /// When the API only returns a deal, the id is taken from the deal once it is delivered.
    pub async fn create_instance(&self, request: &CreateInstancesRequest) -> Result<String> {
        let response: CreateInstancesResponse = self.call("CreateInstances", request).await?;
        match response.db_instance_id_set.as_slice() {
            [id] => Ok(id.clone()),
            [] => {
                let deal_name = response.deal_names.into_iter().next().ok_or_else(|| {
                    Error::unexpected("CreateInstances returned neither instance id nor deal")
                })?;
                tracing::warn!(deal_name, "no instance id returned, requesting the deal");
                let deals = self.describe_orders(&[deal_name]).await?;
                deals
                    .into_iter()
                    .next()
                    .and_then(|deal| deal.db_instance_id_set.into_iter().next())
                    .ok_or_else(|| Error::unexpected("deal returned no instance id"))
            }
            _ => Err(Error::unexpected(
                "CreateInstances returned more than one instance id",
            )),
        }
    }

    async fn describe_orders(&self, deal_names: &[String]) -> Result<Vec<PgDeal>> {
        retry(5 * READ_RETRY_TIMEOUT, || async {
            let response: DescribeOrdersResponse = self
                .call("DescribeOrders", &json!({ "DealNames": deal_names }))
                .await
                .map_err(|err| retry_error(err, &[]))?;
            if response.deals.is_empty() {
                return Err(RetryError::retryable(Error::unexpected(
                    "waiting for deal return instance id",
                )));
            }
            Ok(response.deals)
        })
        .await
    }

    pub async fn modify_instance_name(&self, instance_id: &str, name: &str) -> Result<(), ApiError> {
        let _: Empty = self
            .call(
                "ModifyDBInstanceName",
                &json!({ "DBInstanceId": instance_id, "InstanceName": name }),
            )
            .await?;
        Ok(())
    }

    /// Change memory (GB), storage (GB) and optionally cpu
    pub async fn modify_instance_spec(
        &self,
        instance_id: &str,
        memory: i64,
        storage: i64,
        cpu: i64,
        switch_tag: i64,
    ) -> Result<(), ApiError> {
        let mut request = json!({
            "DBInstanceId": instance_id,
            "Memory": memory,
            "Storage": storage,
            "SwitchTag": switch_tag,
        });
        if cpu != 0 {
            request["Cpu"] = json!(cpu);
        }
        let _: Empty = self.call("ModifyDBInstanceSpec", &request).await?;
        Ok(())
    }

    pub async fn modify_project(&self, instance_id: &str, project_id: i64) -> Result<(), ApiError> {
        let _: Empty = self
            .call(
                "ModifyDBInstancesProject",
                &json!({
                    "DBInstanceIdSet": [instance_id],
                    "ProjectId": project_id.to_string(),
                }),
            )
            .await?;
        Ok(())
    }

    pub async fn set_auto_renew_flag(&self, instance_id: &str, flag: i64) -> Result<(), ApiError> {
        let _: Empty = self
            .call(
                "SetAutoRenewFlag",
                &json!({ "DBInstanceIdSet": [instance_id], "AutoRenewFlag": flag }),
            )
            .await?;
        Ok(())
    }

    pub async fn modify_charge_type(
        &self,
        instance_id: &str,
        charge_type: &str,
        period: i64,
    ) -> Result<(), ApiError> {
        let _: Empty = self
            .call(
                "ModifyDBInstanceChargeType",
                &json!({
                    "DBInstanceId": instance_id,
                    "InstanceChargeType": charge_type,
                    "Period": period,
                }),
            )
            .await?;
        Ok(())
    }

    pub async fn renew_instance(
        &self,
        instance_id: &str,
        period: i64,
        auto_voucher: i64,
        voucher_ids: &[String],
    ) -> Result<(), ApiError> {
        let mut request = json!({
            "DBInstanceId": instance_id,
            "Period": period,
            "AutoVoucher": auto_voucher,
        });
        if !voucher_ids.is_empty() {
            request["VoucherIds"] = json!(voucher_ids);
        }
        let _: Empty = self.call("RenewInstance", &request).await?;
        Ok(())
    }

    pub async fn isolate_instance(&self, instance_id: &str) -> Result<()> {
        retry(WRITE_RETRY_TIMEOUT, || async {
            let _: Empty = self
                .call(
                    "IsolateDBInstances",
                    &json!({ "DBInstanceIdSet": [instance_id] }),
                )
                .await
                .map_err(|err| retry_error(err, &[]))?;
            Ok(())
        })
        .await
    }

    pub async fn destroy_instance(&self, instance_id: &str) -> Result<(), ApiError> {
        let _: Empty = self
            .call("DestroyDBInstance", &json!({ "DBInstanceId": instance_id }))
            .await?;
        Ok(())
    }

    pub async fn reset_account_password(
        &self,
        instance_id: &str,
        user_name: &str,
        password: &str,
    ) -> Result<(), ApiError> {
        let _: Empty = self
            .call(
                "ResetAccountPassword",
                &json!({
                    "DBInstanceId": instance_id,
                    "UserName": user_name,
                    "Password": password,
                }),
            )
            .await?;
        Ok(())
    }

    /// Refresh an instance status, reporting `closed` once it is gone
    pub async fn instance_state(&self, instance_id: &str) -> Result<(Option<DbInstance>, String)> {
        match self.describe_instance_by_id(instance_id).await {
            Ok(Some(instance)) => {
                let status = instance.db_instance_status.clone();
                Ok((Some(instance), status))
            }
            Ok(None) => Ok((None, STATUS_CLOSED.to_string())),
            Err(err) if err.code() == Some(INSTANCE_NOT_FOUND) => {
                Ok((None, STATUS_CLOSED.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Refresh the raw instance status, including isolated instances
    pub async fn instance_raw_state(
        &self,
        instance_id: &str,
    ) -> Result<(Option<DbInstance>, String)> {
        match self.describe_instance_attribute(instance_id).await {
            Ok(Some(instance)) => {
                let status = instance.db_instance_status.clone();
                Ok((Some(instance), status))
            }
            Ok(None) => Ok((None, STATUS_CLOSED.to_string())),
            Err(err) if err.code() == Some(INSTANCE_NOT_FOUND) => {
                Ok((None, STATUS_CLOSED.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Wait for the instance to be `running`
    pub async fn check_instance_status(&self, instance_id: &str, timeout: Duration) -> Result<()> {
        retry(timeout, || async {
            let instance = self
                .describe_instance_by_id(instance_id)
                .await
                .map_err(|err| retry_error(err, &[]))?
                .ok_or_else(|| {
                    RetryError::non_retryable(Error::unexpected(format!(
                        "check postgresql instance {instance_id} fail"
                    )))
                })?;
            if instance.db_instance_status == STATUS_RUNNING {
                Ok(())
            } else {
                Err(RetryError::retryable(Error::unexpected(format!(
                    "checking postgresql instance {instance_id}, status {}",
                    instance.db_instance_status
                ))))
            }
        })
        .await
    }

    /// Wait for the instance status to reach one of `target`
    pub async fn wait_instance_status(
        &self,
        instance_id: &str,
        target: &[&str],
        timeout: Duration,
    ) -> Result<()> {
        StateChangeConf::new(target, timeout)
            .wait_for_state(|| self.instance_raw_state(instance_id))
            .await?;
        Ok(())
    }

    /// Open or close the public address and wait for the change to be effective
    pub async fn modify_public_service(&self, open: bool, instance_id: &str) -> Result<()> {
        let action = if open {
            "OpenDBExtranetAccess"
        } else {
            "CloseDBExtranetAccess"
        };
        retry(WRITE_RETRY_TIMEOUT, || async {
            let _: Empty = self
                .call(action, &json!({ "DBInstanceId": instance_id }))
                .await
                .map_err(|err| retry_error(err, &[INSTANCE_STATUS_LIMIT]))?;
            Ok(())
        })
        .await?;

        let grace = std::sync::atomic::AtomicUsize::new(PUBLIC_ACCESS_GRACE_POLLS);
        retry(3 * READ_RETRY_TIMEOUT, || async {
            let instance = self
                .describe_instance_by_id(instance_id)
                .await
                .map_err(|err| retry_error(err, &[]))?
                .ok_or_else(|| {
                    RetryError::non_retryable(Error::unexpected(format!(
                        "check postgresql instance {instance_id} fail, instance is not exist"
                    )))
                })?;
            if instance.db_instance_net_info.is_empty() {
                return Err(RetryError::non_retryable(Error::unexpected(format!(
                    "illegal net info of postgresql instance {instance_id}"
                ))));
            }
            let Some(public) = instance
                .db_instance_net_info
                .iter()
                .find(|info| info.net_type == "public")
            else {
                return if open {
                    Err(RetryError::retryable(Error::unexpected(format!(
                        "cannot find public status, postgresql instance {instance_id} waiting"
                    ))))
                } else {
                    Ok(())
                };
            };
            match public_access_progress(open, &public.status, &grace) {
                PublicAccessProgress::Done => Ok(()),
                PublicAccessProgress::Waiting => Err(RetryError::retryable(Error::unexpected(
                    format!(
                        "status {}, postgresql instance {instance_id} waiting",
                        public.status
                    ),
                ))),
                PublicAccessProgress::Failed => Err(RetryError::non_retryable(Error::unexpected(
                    format!(
                        "status {}, postgresql instance {instance_id} {} public service fail",
                        public.status,
                        if open { "open" } else { "close" }
                    ),
                ))),
            }
        })
        .await
    }

    /// Accounts of the instance, oldest first; the first one is the root user
    pub async fn describe_root_user(&self, instance_id: &str) -> Result<Vec<AccountInfo>> {
        const LIMIT: usize = 100;
        let mut accounts = Vec::new();
        let mut offset = 0;
        loop {
            let details = retry(READ_RETRY_TIMEOUT, || async {
                let response: DescribeAccountsResponse = self
                    .call(
                        "DescribeAccounts",
                        &json!({
                            "DBInstanceId": instance_id,
                            "Offset": offset,
                            "Limit": LIMIT,
                            "OrderBy": "createTime",
                            "OrderByType": "asc",
                        }),
                    )
                    .await
                    .map_err(|err| retry_error(err, &[]))?;
                Ok(response.details)
            })
            .await?;
            let count = details.len();
            accounts.extend(details);
            if count < LIMIT {
                break;
            }
            offset += LIMIT;
        }
        Ok(sort_accounts_by_creation(accounts))
    }

    pub async fn modify_params(
        &self,
        instance_id: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<(), ApiError> {
        let params: Vec<ParamEntry> = params
            .iter()
            .map(|(name, value)| ParamEntry {
                name: name.clone(),
                expected_value: value.clone(),
            })
            .collect();
        let _: Empty = self
            .call(
                "ModifyDBInstanceParameters",
                &json!({ "DBInstanceId": instance_id, "ParamList": params }),
            )
            .await?;
        Ok(())
    }

    /// Current value of every parameter, once pending parameter changes are applied
    pub async fn describe_params(&self, instance_id: &str) -> Result<BTreeMap<String, String>> {
        retry(READ_RETRY_TIMEOUT, || async {
            let response: DescribeParamsEventResponse = match self
                .call("DescribeParamsEvent", &json!({ "DBInstanceId": instance_id }))
                .await
            {
                Ok(response) => response,
                Err(err) if err.code() == Some(INSTANCE_NOT_FOUND) => return Ok(()),
                Err(err) => return Err(retry_error(err, &[])),
            };
            let updating = response
                .event_items
                .iter()
                .flat_map(|item| &item.event_detail)
                .any(|detail| detail.state != "success");
            if updating {
                Err(RetryError::retryable(Error::unexpected("params is updating")))
            } else {
                Ok(())
            }
        })
        .await?;

        let response: DescribeDBInstanceParametersResponse = self
            .call(
                "DescribeDBInstanceParameters",
                &json!({ "DBInstanceId": instance_id }),
            )
            .await?;
        Ok(response
            .detail
            .into_iter()
            .map(|param| (param.name, param.current_value))
            .collect())
    }

    pub async fn modify_deployment(
        &self,
        instance_id: &str,
        switch_tag: i64,
        nodes: &[DbNode],
    ) -> Result<(), ApiError> {
        let _: Empty = self
            .call(
                "ModifyDBInstanceDeployment",
                &json!({
                    "DBInstanceId": instance_id,
                    "DBNodeSet": nodes,
                    "SwitchTag": switch_tag,
                }),
            )
            .await?;
        Ok(())
    }

    pub async fn describe_encryption_key(
        &self,
        instance_id: &str,
    ) -> Result<Option<EncryptionKey>, ApiError> {
        let response: DescribeEncryptionKeysResponse = self
            .call(
                "DescribeEncryptionKeys",
                &json!({ "DBInstanceId": instance_id }),
            )
            .await?;
        Ok(response.encryption_keys.into_iter().next())
    }

    pub async fn upgrade_kernel_version(
        &self,
        instance_id: &str,
        target_kernel_version: &str,
        switch_tag: i64,
    ) -> Result<(), ApiError> {
        let _: Empty = self
            .call(
                "UpgradeDBInstanceKernelVersion",
                &json!({
                    "DBInstanceId": instance_id,
                    "TargetDBKernelVersion": target_kernel_version,
                    "SwitchTag": switch_tag,
                }),
            )
            .await?;
        Ok(())
    }

    pub async fn upgrade_major_version(
        &self,
        instance_id: &str,
        target_kernel_version: &str,
        upgrade_time_option: i64,
    ) -> Result<(), ApiError> {
        let _: Empty = self
            .call(
                "UpgradeDBInstanceMajorVersion",
                &json!({
                    "DBInstanceId": instance_id,
                    "TargetDBKernelVersion": target_kernel_version,
                    "UpgradeTimeOption": upgrade_time_option,
                }),
            )
            .await?;
        Ok(())
    }

    pub async fn describe_db_versions(&self) -> Result<Vec<Version>> {
        retry(READ_RETRY_TIMEOUT, || async {
            let response: DescribeDBVersionsResponse = self
                .call("DescribeDBVersions", &json!({}))
                .await
                .map_err(|err| retry_error(err, &[]))?;
            Ok(response.version_set)
        })
        .await
    }

    pub async fn describe_zones(&self) -> Result<Vec<ZoneInfo>> {
        retry(READ_RETRY_TIMEOUT, || async {
            let response: DescribeZonesResponse = self
                .call("DescribeZones", &json!({}))
                .await
                .map_err(|err| retry_error(err, &[]))?;
            Ok(response.zone_set)
        })
        .await
    }

    pub async fn describe_regions(&self) -> Result<Vec<RegionInfo>> {
        retry(READ_RETRY_TIMEOUT, || async {
            let response: DescribeRegionsResponse = self
                .call("DescribeRegions", &json!({}))
                .await
                .map_err(|err| retry_error(err, &[]))?;
            Ok(response.region_set)
        })
        .await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PublicAccessProgress {
    Done,
    Waiting,
    Failed,
}

/// Interpret the status of the public address while opening or closing it
///
/// The status may still report the former state for a few polls right after the call,
/// `grace` counts how many such polls are still tolerated.
pub(crate) fn public_access_progress(
    open: bool,
    status: &str,
    grace: &std::sync::atomic::AtomicUsize,
) -> PublicAccessProgress {
    use std::sync::atomic::Ordering;

    let (done, in_progress, former): (&[&str], &[&str], &[&str]) = if open {
        (&["opened", "2"], &["opening", "4"], &["closed", "initing"])
    } else {
        (&["closed", "3", "initing", "1"], &["closing", "4"], &["opened"])
    };

    if done.contains(&status) {
        PublicAccessProgress::Done
    } else if in_progress.contains(&status) {
        if open {
            grace.store(0, Ordering::SeqCst);
        }
        PublicAccessProgress::Waiting
    } else if former.contains(&status)
        && grace
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    {
        PublicAccessProgress::Waiting
    } else {
        PublicAccessProgress::Failed
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn account(name: &str, create_time: &str) -> AccountInfo {
        AccountInfo {
            user_name: name.to_string(),
            create_time: create_time.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_instance_exists() {
        let mut instance = DbInstance {
            db_instance_status: "running".to_string(),
            ..Default::default()
        };
        assert!(instance_exists(&instance));
        for status in ["isolated", "recycled", "offline"] {
            instance.db_instance_status = status.to_string();
            assert!(!instance_exists(&instance));
        }
    }

    #[test]
    fn test_sort_accounts_by_creation() {
        let accounts = sort_accounts_by_creation(vec![
            account("late", "2023-05-02 10:00:00"),
            account("system", "0000-00-00 00:00:00"),
            account("root", "2023-05-01 09:00:00"),
            account("later", "2023-05-02 10:00:01"),
        ]);
        let names: Vec<_> = accounts.iter().map(|a| a.user_name.as_str()).collect();
        assert_eq!(names, ["root", "late", "later"]);
    }

    #[test]
    fn test_filter_versions() {
        let version = |v: &str, major: &str, kernel: &str| Version {
            db_version: v.to_string(),
            db_major_version: major.to_string(),
            db_kernel_version: kernel.to_string(),
            ..Default::default()
        };
        let versions = vec![
            version("13.3", "13", "v13.3_r1.1"),
            version("13.3", "13", "v13.3_r1.2"),
            version("14.2", "14", "v14.2_r1.0"),
        ];
        assert_eq!(filter_versions(versions.clone(), "", "", "").len(), 3);
        assert_eq!(filter_versions(versions.clone(), "13.3", "", "").len(), 2);
        let found = filter_versions(versions, "", "13", "v13.3_r1.2");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].db_kernel_version, "v13.3_r1.2");
    }

    #[test]
    fn test_public_access_open_progress() {
        let grace = AtomicUsize::new(2);
        assert_eq!(
            public_access_progress(true, "closed", &grace),
            PublicAccessProgress::Waiting
        );
        assert_eq!(
            public_access_progress(true, "initing", &grace),
            PublicAccessProgress::Waiting
        );
        assert_eq!(
            public_access_progress(true, "closed", &grace),
            PublicAccessProgress::Failed
        );
        assert_eq!(
            public_access_progress(true, "2", &grace),
            PublicAccessProgress::Done
        );
    }

    #[test]
    fn test_public_access_opening_resets_grace() {
        let grace = AtomicUsize::new(5);
        assert_eq!(
            public_access_progress(true, "opening", &grace),
            PublicAccessProgress::Waiting
        );
        // once opening was seen, going back to closed is a failure
        assert_eq!(
            public_access_progress(true, "closed", &grace),
            PublicAccessProgress::Failed
        );
    }

    #[test]
    fn test_public_access_close_progress() {
        let grace = AtomicUsize::new(1);
        assert_eq!(
            public_access_progress(false, "closing", &grace),
            PublicAccessProgress::Waiting
        );
        assert_eq!(
            public_access_progress(false, "opened", &grace),
            PublicAccessProgress::Waiting
        );
        assert_eq!(
            public_access_progress(false, "opened", &grace),
            PublicAccessProgress::Failed
        );
        assert_eq!(
            public_access_progress(false, "1", &grace),
            PublicAccessProgress::Done
        );
        assert_eq!(
            public_access_progress(false, "weird", &grace),
            PublicAccessProgress::Failed
        );
    }
}
