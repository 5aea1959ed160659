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

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{AttributeType, Block, Description, Schema};
use tf_provider::value::{Value, ValueEmpty, ValueList, ValueNumber, ValueSet, ValueString};
use tf_provider::{map, AttributePath, Diagnostics, Resource};

use crate::error::{Error, Result};
use crate::provider::ServiceHandle;
use crate::retry::{
    retry, retry_any, retry_error, RetryError, StateChangeConf, READ_RETRY_TIMEOUT,
    WRITE_RETRY_TIMEOUT,
};
use crate::service::models::{CreateReadOnlyInstanceRequest, DbInstance, SpecItemInfo};
use crate::service::{
    charge_type, NetworkTarget, PostgresqlService, GROUP_STATUS_OK, INSTANCE_NOT_FOUND,
    PAY_TYPE_POSTPAID, PAY_TYPE_PREPAID, STATUS_ISOLATED, STATUS_RUNNING,
};
use crate::utils::{
    computed, immutable, list_strings, no_errors, number, optional, optional_computed,
    replace_if_changed, required, set_strings, string, string_list_type, string_set_type,
    strings_set, text, unknown_if_null, ResultExt, WithSchema,
};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReadonlyInstanceState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub db_version: ValueString<'a>,
    pub storage: ValueNumber,
    pub memory: ValueNumber,
    pub master_db_instance_id: ValueString<'a>,
    pub instance_id: ValueString<'a>,
    pub zone: ValueString<'a>,
    pub project_id: ValueNumber,
    pub vpc_id: ValueString<'a>,
    pub subnet_id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub security_groups_ids: ValueSet<ValueString<'a>>,
    pub instance_charge_type: ValueString<'a>,
    pub period: ValueNumber,
    pub auto_renew_flag: ValueNumber,
    pub auto_voucher: ValueNumber,
    pub voucher_ids: ValueList<ValueString<'a>>,
    pub need_support_ipv6: ValueNumber,
    pub read_only_group_id: ValueString<'a>,
    pub create_time: ValueString<'a>,
    pub private_access_ip: ValueString<'a>,
    pub private_access_port: ValueNumber,
}

impl WithSchema for ReadonlyInstanceState<'_> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "id" => computed(AttributeType::String, "Read-only instance id"),
                    "db_version" => required(AttributeType::String, "PostgreSQL version, the one of the master instance"),
                    "storage" => required(AttributeType::Number, "Volume size in GB"),
                    "memory" => required(AttributeType::Number, "Memory size in GB"),
                    "master_db_instance_id" => required(AttributeType::String, "Master instance replicated by this instance"),
                    "instance_id" => computed(AttributeType::String, "Read-only instance id"),
                    "zone" => required(AttributeType::String, "Availability zone"),
                    "project_id" => required(AttributeType::Number, "Project of the instance"),
                    "vpc_id" => required(AttributeType::String, "VPC of the instance"),
                    "subnet_id" => required(AttributeType::String, "Subnet of the instance"),
                    "name" => required(AttributeType::String, "Name of the instance"),
                    "security_groups_ids" => required(string_set_type(), "Security groups bound to the instance"),
                    "instance_charge_type" => optional_computed(
                        AttributeType::String,
                        "Billing mode: POSTPAID_BY_HOUR (default) or PREPAID",
                    ),
                    "period" => optional(AttributeType::Number, "Prepaid period in months"),
                    "auto_renew_flag" => optional_computed(AttributeType::Number, "Auto renew flag, 0 by default"),
                    "auto_voucher" => optional(AttributeType::Number, "Whether to use vouchers automatically"),
                    "voucher_ids" => optional(string_list_type(), "Vouchers to use, requires `auto_voucher`"),
                    "need_support_ipv6" => optional_computed(AttributeType::Number, "Whether to support IPv6: 1 to support, 0 not to"),
                    "read_only_group_id" => optional(AttributeType::String, "Read-only group holding the instance"),
                    "create_time" => computed(AttributeType::String, "Creation time of the instance"),
                    "private_access_ip" => computed(AttributeType::String, "Private IP of the instance"),
                    "private_access_port" => computed(AttributeType::Number, "Private port of the instance"),
                },
                description: Description::plain("Read-only replica of a PostgreSQL instance"),
                ..Default::default()
            },
        }
    }
}

/// Pick the sale specification matching the version and the memory (GB)
pub fn select_readonly_spec_code(specs: &[SpecItemInfo], db_version: &str, memory: i64) -> Result<String> {
    let mut versions: Vec<&str> = Vec::new();
    let mut memories: Vec<String> = Vec::new();
    let mut version_found = false;
    for spec in specs {
        if !versions.contains(&spec.version.as_str()) {
            versions.push(&spec.version);
        }
        if spec.version != db_version {
            continue;
        }
        version_found = true;
        let spec_memory = spec.memory / 1024;
        if spec_memory == memory {
            return Ok(spec.spec_code.clone());
        }
        let spec_memory = spec_memory.to_string();
        if !memories.contains(&spec_memory) {
            memories.push(spec_memory);
        }
    }
    if !version_found {
        return Err(Error::invalid(format!(
            r#"The "db_version" value: "{db_version}" is invalid, Valid values are one of: "{}""#,
            versions.join(r#"", ""#)
        )));
    }
    Err(Error::invalid(format!(
        r#"The "memory" value: {memory} is invalid, Valid values are one of: {}"#,
        memories.join(", ")
    )))
}

impl<'a> ReadonlyInstanceState<'a> {
    fn validate(&self, diags: &mut Diagnostics) {
        if let Some(charge_type) = self.instance_charge_type.as_deref_option() {
            if !matches!(charge_type, PAY_TYPE_POSTPAID | PAY_TYPE_PREPAID) {
                diags.error(
                    "Invalid instance_charge_type",
                    format!("`instance_charge_type` must be POSTPAID_BY_HOUR or PREPAID, got {charge_type:?}"),
                    AttributePath::new("instance_charge_type"),
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
    }

    fn apply_defaults(&mut self, config: &Self) {
        if config.instance_charge_type.is_null() {
            self.instance_charge_type = string(PAY_TYPE_POSTPAID);
        }
        if config.auto_renew_flag.is_null() {
            self.auto_renew_flag = Value::Value(0);
        }
    }

    pub fn create_request(&self, spec_code: String) -> CreateReadOnlyInstanceRequest {
        CreateReadOnlyInstanceRequest {
            db_version: text(&self.db_version).to_string(),
            spec_code,
            storage: number(&self.storage),
            instance_count: 1,
            period: 1,
            master_db_instance_id: text(&self.master_db_instance_id).to_string(),
            zone: text(&self.zone).to_string(),
            project_id: number(&self.project_id),
            instance_charge_type: text(&self.instance_charge_type).to_string(),
            auto_renew_flag: number(&self.auto_renew_flag),
            vpc_id: text(&self.vpc_id).to_string(),
            subnet_id: text(&self.subnet_id).to_string(),
            name: text(&self.name).to_string(),
            auto_voucher: self.auto_voucher.as_ref_option().copied().filter(|v| *v > 0),
            voucher_ids: list_strings(&self.voucher_ids),
            security_group_ids: set_strings(&self.security_groups_ids),
            need_support_ipv6: self.need_support_ipv6.as_ref_option().copied().filter(|v| *v > 0),
            read_only_group_id: text(&self.read_only_group_id).to_string(),
        }
    }

    pub fn apply_instance(&mut self, instance: &DbInstance) {
        self.instance_id = string(&instance.db_instance_id);
        self.db_version = string(&instance.db_version);
        self.storage = Value::Value(instance.db_instance_storage);
        self.memory = Value::Value(instance.db_instance_memory);
        self.master_db_instance_id = string(&instance.master_db_instance_id);
        self.zone = string(&instance.zone);
        self.project_id = Value::Value(instance.project_id);
        self.instance_charge_type = string(charge_type(&instance.pay_type));
        self.auto_renew_flag = Value::Value(instance.auto_renew);
        self.vpc_id = string(&instance.vpc_id);
        self.subnet_id = string(&instance.subnet_id);
        self.name = string(&instance.db_instance_name);
        self.need_support_ipv6 = Value::Value(instance.support_ipv6);
        self.create_time = string(&instance.create_time);
        self.private_access_ip = Value::Null;
        self.private_access_port = Value::Null;
        // private and inner addresses never show up together
        for info in &instance.db_instance_net_info {
            if matches!(info.net_type.as_str(), "private" | "inner") && !info.ip.is_empty() {
                self.private_access_ip = string(&info.ip);
                self.private_access_port = Value::Value(info.port);
            }
        }
    }

    /// Refresh the state, `false` when the instance is gone
    async fn read(&mut self, service: &PostgresqlService) -> Result<bool> {
        let instance_id = text(&self.id).to_string();
        let instance = match service.describe_instance_by_id(&instance_id).await {
            Ok(Some(instance)) => instance,
            Ok(None) => return Ok(false),
            Err(err) if err.code() == Some(INSTANCE_NOT_FOUND) => return Ok(false),
            Err(err) => return Err(err.into()),
        };
        self.apply_instance(&instance);

        let groups = service
            .describe_security_groups(NetworkTarget::Instance(&instance_id))
            .await?;
        if !groups.is_empty() {
            self.security_groups_ids =
                strings_set(groups.into_iter().map(|group| group.security_group_id));
        }

        if self.read_only_group_id.is_value() {
            let group_id = service
                .readonly_group_of(&instance.master_db_instance_id, &instance_id)
                .await?;
            self.read_only_group_id = match group_id {
                Some(group_id) => string(group_id),
                None => Value::Null,
            };
        }
        Ok(true)
    }

    async fn create(&self, service: &PostgresqlService) -> Result<String> {
        let zone = text(&self.zone);
        let specs = retry(5 * READ_RETRY_TIMEOUT, || async {
            service
                .describe_spec_infos(zone)
                .await
                .map_err(|err| retry_error(err, &[]))
        })
        .await?;
        let spec_code =
            select_readonly_spec_code(&specs, text(&self.db_version), number(&self.memory))?;
        let request = self.create_request(spec_code);
        let instance_id = retry(WRITE_RETRY_TIMEOUT, || async {
            service
                .create_readonly_instance(&request)
                .await
                .map_err(|err| retry_any(err, &[]))
        })
        .await?;
        tracing::info!(%instance_id, "postgresql read-only instance ordered");

        retry(5 * READ_RETRY_TIMEOUT, || async {
            let instance = service
                .describe_instance_by_id(&instance_id)
                .await
                .map_err(|err| retry_error(err, &[]))?;
            match instance {
                Some(instance) if instance.db_instance_status == STATUS_RUNNING => Ok(()),
                Some(instance) => Err(RetryError::retryable(Error::unexpected(format!(
                    "creating readonly postgresql instance {instance_id}, status {}",
                    instance.db_instance_status
                )))),
                None => Err(RetryError::non_retryable(Error::unexpected(
                    "create postgresql instance fail",
                ))),
            }
        })
        .await?;
        Ok(instance_id)
    }

    async fn update(&self, prior: &Self, service: &PostgresqlService) -> Result<()> {
        let instance_id = text(&prior.id);

        if self.read_only_group_id != prior.read_only_group_id {
            let old = text(&prior.read_only_group_id);
            let new = text(&self.read_only_group_id);
            retry(WRITE_RETRY_TIMEOUT, || async {
                service
                    .modify_instance_readonly_group(instance_id, old, new)
                    .await
                    .map_err(|err| retry_error(err, &[]))
            })
            .await?;
            if !new.is_empty() {
                let master = text(&self.master_db_instance_id);
                StateChangeConf::new(&[GROUP_STATUS_OK], 2 * READ_RETRY_TIMEOUT)
                    .wait_for_state(|| service.readonly_group_state(master, new))
                    .await?;
            }
        }

        if self.name != prior.name {
            let name = text(&self.name);
            retry(WRITE_RETRY_TIMEOUT, || async {
                service
                    .modify_instance_name(instance_id, name)
                    .await
                    .map_err(|err| retry_error(err, &[]))
            })
            .await?;
            service.check_instance_status(instance_id, 2 * READ_RETRY_TIMEOUT).await?;
        }

        if self.memory != prior.memory || self.storage != prior.storage {
            let memory = number(&self.memory);
            let storage = number(&self.storage);
            retry(WRITE_RETRY_TIMEOUT, || async {
                service
                    .modify_instance_spec(instance_id, memory, storage, 0, 0)
                    .await
                    .map_err(|err| retry_error(err, &[]))
            })
            .await?;
            service.check_instance_status(instance_id, 2 * READ_RETRY_TIMEOUT).await?;
        }

        if self.project_id != prior.project_id {
            let project_id = number(&self.project_id);
            retry(WRITE_RETRY_TIMEOUT, || async {
                service
                    .modify_project(instance_id, project_id)
                    .await
                    .map_err(|err| retry_error(err, &[]))
            })
            .await?;
            service.check_instance_status(instance_id, 2 * READ_RETRY_TIMEOUT).await?;
        }

        if self.security_groups_ids != prior.security_groups_ids {
            let groups = set_strings(&self.security_groups_ids);
            retry(WRITE_RETRY_TIMEOUT, || async {
                service
                    .modify_security_groups(NetworkTarget::Instance(instance_id), &groups)
                    .await
                    .map_err(|err| retry_error(err, &[]))
            })
            .await?;
        }
        Ok(())
    }
}

async fn delete_readonly_instance(service: &PostgresqlService, instance_id: &str) -> Result<()> {
    service.isolate_instance(instance_id).await?;
    if let Err(err) = service
        .wait_instance_status(instance_id, &[STATUS_ISOLATED], 5 * READ_RETRY_TIMEOUT)
        .await
    {
        tracing::warn!(instance_id, "read-only instance not isolated yet: {err}");
    }
    retry(WRITE_RETRY_TIMEOUT, || async {
        service
            .destroy_instance(instance_id)
            .await
            .map_err(|err| retry_error(err, &[]))
    })
    .await?;
    tracing::info!(instance_id, "postgresql read-only instance destroyed");
    Ok(())
}

#[derive(Debug, Default)]
pub struct ReadonlyInstanceResource {
    service: ServiceHandle,
}

impl ReadonlyInstanceResource {
    pub fn new(service: ServiceHandle) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Resource for ReadonlyInstanceResource {
    type State<'a> = ReadonlyInstanceState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(ReadonlyInstanceState::schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        config.validate(diags);
        no_errors(diags)
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let service = self.service.get(diags).await?;
        let mut state = state;
        match state.read(&service).await {
            Ok(true) => Some((state, private_state)),
            Ok(false) => None,
            Err(err) => {
                diags.root_error("Could not read the read-only instance", err.to_string());
                Some((state, private_state))
            }
        }
    }

    async fn plan_create<'a>(
        &self,
        _diags: &mut Diagnostics,
        proposed_state: Self::State<'a>,
        config_state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let mut state = proposed_state;
        state.apply_defaults(&config_state);
        state.id = Value::Unknown;
        state.instance_id = Value::Unknown;
        unknown_if_null(&mut state.need_support_ipv6);
        state.create_time = Value::Unknown;
        state.private_access_ip = Value::Unknown;
        state.private_access_port = Value::Unknown;
        Some((state, Default::default()))
    }

    async fn plan_update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        proposed_state: Self::State<'a>,
        config_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>, Vec<AttributePath>)> {
        let mut state = proposed_state;
        state.apply_defaults(&config_state);

        immutable(diags, "period", &prior_state.period, &state.period);
        immutable(diags, "auto_renew_flag", &prior_state.auto_renew_flag, &state.auto_renew_flag);
        immutable(diags, "auto_voucher", &prior_state.auto_voucher, &state.auto_voucher);
        immutable(diags, "voucher_ids", &prior_state.voucher_ids, &state.voucher_ids);
        no_errors(diags)?;

        let mut replace = Vec::new();
        replace_if_changed(&mut replace, "db_version", &prior_state.db_version, &state.db_version);
        replace_if_changed(
            &mut replace,
            "master_db_instance_id",
            &prior_state.master_db_instance_id,
            &state.master_db_instance_id,
        );
        replace_if_changed(&mut replace, "zone", &prior_state.zone, &state.zone);
        replace_if_changed(&mut replace, "vpc_id", &prior_state.vpc_id, &state.vpc_id);
        replace_if_changed(&mut replace, "subnet_id", &prior_state.subnet_id, &state.subnet_id);
        replace_if_changed(
            &mut replace,
            "instance_charge_type",
            &prior_state.instance_charge_type,
            &state.instance_charge_type,
        );
        replace_if_changed(
            &mut replace,
            "need_support_ipv6",
            &prior_state.need_support_ipv6,
            &state.need_support_ipv6,
        );
        Some((state, prior_private_state, replace))
    }

    async fn plan_destroy<'a>(
        &self,
        _diags: &mut Diagnostics,
        _prior_state: Self::State<'a>,
        _prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::PrivateState<'a>> {
        Some(Default::default())
    }

    async fn create<'a>(
        &self,
        diags: &mut Diagnostics,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let service = self.service.get(diags).await?;
        let instance_id = planned_state
            .create(&service)
            .await
            .or_diag(diags, "Could not create the read-only instance")?;
        let mut state = planned_state;
        state.id = Value::Value(instance_id.into());
        if let Err(err) = state.read(&service).await {
            diags.root_error("Could not read the read-only instance", err.to_string());
        }
        Some((state, planned_private_state))
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let service = self.service.get(diags).await?;
        if let Err(err) = planned_state.update(&prior_state, &service).await {
            diags.root_error("Could not update the read-only instance", err.to_string());
        }
        let mut state = planned_state;
        if let Err(err) = state.read(&service).await {
            diags.root_error("Could not read the read-only instance", err.to_string());
        }
        Some((state, planned_private_state))
    }

    async fn destroy<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        _planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        let service = self.service.get(diags).await?;
        delete_readonly_instance(&service, text(&prior_state.id))
            .await
            .or_diag(diags, "Could not delete the read-only instance")
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let service = self.service.get(diags).await?;
        let mut state = ReadonlyInstanceState {
            id: Value::Value(id.clone().into()),
            ..Default::default()
        };
        let found = state
            .read(&service)
            .await
            .or_diag(diags, "Could not import the read-only instance")?;
        if !found {
            diags.root_error(
                "Could not import the read-only instance",
                format!("postgresql read-only instance {id} not found"),
            );
            return None;
        }
        Some((state, Default::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::models::NetInfo;

    fn spec(code: &str, version: &str, memory: i64) -> SpecItemInfo {
        SpecItemInfo {
            spec_code: code.to_string(),
            version: version.to_string(),
            memory,
            ..Default::default()
        }
    }

    #[test]
    fn test_select_readonly_spec_code() {
        let specs = [
            spec("pg.it.small2", "10.4", 2048),
            spec("pg.it.medium4", "10.4", 4096),
            spec("pg.it.small2", "13.3", 2048),
        ];
        assert_eq!(select_readonly_spec_code(&specs, "10.4", 4).unwrap(), "pg.it.medium4");
        assert_eq!(
            select_readonly_spec_code(&specs, "12.4", 4).unwrap_err().to_string(),
            r#"The "db_version" value: "12.4" is invalid, Valid values are one of: "10.4", "13.3""#
        );
        assert_eq!(
            select_readonly_spec_code(&specs, "10.4", 8).unwrap_err().to_string(),
            r#"The "memory" value: 8 is invalid, Valid values are one of: 2, 4"#
        );
    }

    #[test]
    fn test_apply_instance() {
        let instance = DbInstance {
            db_instance_id: "pgro-1".to_string(),
            master_db_instance_id: "postgres-1".to_string(),
            pay_type: "prepaid".to_string(),
            db_instance_net_info: vec![
                NetInfo {
                    net_type: "public".to_string(),
                    ip: "1.2.3.4".to_string(),
                    ..Default::default()
                },
                NetInfo {
                    net_type: "private".to_string(),
                    ip: "10.0.0.3".to_string(),
                    port: 5432,
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let mut state = ReadonlyInstanceState::default();
        state.apply_instance(&instance);
        assert_eq!(state.instance_id.as_deref_option(), Some("pgro-1"));
        assert_eq!(state.instance_charge_type.as_deref_option(), Some(PAY_TYPE_PREPAID));
        assert_eq!(state.private_access_ip.as_deref_option(), Some("10.0.0.3"));
        assert_eq!(state.private_access_port, Value::Value(5432));
    }

    #[test]
    fn test_create_request() {
        let state = ReadonlyInstanceState {
            db_version: "10.4".into(),
            master_db_instance_id: "postgres-1".into(),
            period: Value::Value(6),
            auto_voucher: Value::Value(0),
            security_groups_ids: strings_set(["sg-1".to_string()]),
            ..Default::default()
        };
        let request = state.create_request("pg.it.small2".to_string());
        assert_eq!(request.period, 1);
        assert_eq!(request.instance_count, 1);
        assert_eq!(request.auto_voucher, None);
        assert_eq!(request.security_group_ids, ["sg-1"]);
    }
}
