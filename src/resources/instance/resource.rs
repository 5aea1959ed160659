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
use tf_provider::schema::Schema;
use tf_provider::value::{Value, ValueEmpty};
use tf_provider::{AttributePath, Diagnostics, Resource};

use crate::error::{Error, Result};
use crate::provider::ServiceHandle;
use crate::retry::{retry, retry_error, RetryError, READ_RETRY_TIMEOUT, WRITE_RETRY_TIMEOUT};
use crate::service::{
    PostgresqlService, INSTANCE_NOT_FOUND, INSTANCE_STATUS_LIMIT, PAY_TYPE_POSTPAID,
    PAY_TYPE_PREPAID, STATUS_ISOLATED,
};
use crate::utils::{flag, immutable, no_errors, replace_if_changed, text, ResultExt, WithSchema};

use super::state::{InstanceState, SWITCH_IMMEDIATELY};

#[derive(Debug, Default)]
pub struct InstanceResource {
    service: ServiceHandle,
}

impl InstanceResource {
    pub fn new(service: ServiceHandle) -> Self {
        Self { service }
    }
}

/// Isolate the instance, then destroy it unless it is protected
async fn delete_instance(
    service: &PostgresqlService,
    instance_id: &str,
    delete_protection: bool,
) -> Result<()> {
    let instance = retry(READ_RETRY_TIMEOUT, || async {
        match service.describe_instance_by_id(instance_id).await {
            Ok(instance) => Ok(instance),
            Err(err) if err.code() == Some(INSTANCE_NOT_FOUND) => Ok(None),
            Err(err) => Err(retry_error(err, &[INSTANCE_STATUS_LIMIT])),
        }
    })
    .await?;
    if instance.is_none() {
        return Ok(());
    }

    service.isolate_instance(instance_id).await?;
    if let Err(err) = service
        .wait_instance_status(instance_id, &[STATUS_ISOLATED], 5 * READ_RETRY_TIMEOUT)
        .await
    {
        tracing::warn!(instance_id, "instance not isolated yet: {err}");
    }
    if delete_protection {
        tracing::info!(instance_id, "postgresql instance isolated and kept by delete protection");
        return Ok(());
    }

    retry(WRITE_RETRY_TIMEOUT, || async {
        match service.destroy_instance(instance_id).await {
            Err(err) if err.code() == Some(INSTANCE_NOT_FOUND) => Ok(()),
            result => result.map_err(|err| retry_error(err, &[])),
        }
    })
    .await?;

    retry(READ_RETRY_TIMEOUT, || async {
        match service.describe_instance_by_id(instance_id).await {
            Ok(None) => Ok(()),
            Err(err) if err.code() == Some(INSTANCE_NOT_FOUND) => Ok(()),
            Ok(Some(_)) => Err(RetryError::retryable(Error::unexpected(format!(
                "delete postgresql instance {instance_id} fail, instance still exists"
            )))),
            Err(err) => Err(retry_error(err, &[])),
        }
    })
    .await?;
    tracing::info!(instance_id, "postgresql instance destroyed");
    Ok(())
}

#[async_trait]
impl Resource for InstanceResource {
    type State<'a> = InstanceState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(InstanceState::schema())
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
            Ok(false) => {
                tracing::warn!(id = text(&state.id), "postgresql instance is gone");
                None
            }
            Err(err) => {
                diags.root_error("Could not read the postgresql instance", err.to_string());
                Some((state, private_state))
            }
        }
    }

    async fn plan_create<'a>(
        &self,
        diags: &mut Diagnostics,
        proposed_state: Self::State<'a>,
        config_state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let mut state = proposed_state;
        state.apply_defaults(&config_state);
        state.plan_computed();
        no_errors(diags)?;
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

        immutable(diags, "auto_voucher", &prior_state.auto_voucher, &state.auto_voucher);
        immutable(diags, "voucher_ids", &prior_state.voucher_ids, &state.voucher_ids);
        immutable(diags, "root_user", &prior_state.root_user, &state.root_user);
        immutable(diags, "need_support_tde", &prior_state.need_support_tde, &state.need_support_tde);
        immutable(diags, "kms_key_id", &prior_state.kms_key_id, &state.kms_key_id);
        immutable(diags, "kms_region", &prior_state.kms_region, &state.kms_region);
        immutable(diags, "kms_cluster_id", &prior_state.kms_cluster_id, &state.kms_cluster_id);
        if state.availability_zone != prior_state.availability_zone {
            diags.error(
                "Attribute cannot be changed",
                "The `availability_zone` cannot be modified, please use `db_node_set` instead of it.",
                AttributePath::new("availability_zone"),
            );
        }
        if state.charge_type != prior_state.charge_type
            && (text(&prior_state.charge_type) != PAY_TYPE_POSTPAID
                || text(&state.charge_type) != PAY_TYPE_PREPAID)
        {
            diags.error(
                "Unsupported charge type change",
                "It only support to update the charge type from `POSTPAID_BY_HOUR` to `PREPAID`.",
                AttributePath::new("charge_type"),
            );
        }
        no_errors(diags)?;

        state.plan_recomputed(&prior_state, &config_state);
        let mut replace = Vec::new();
        replace_if_changed(&mut replace, "charset", &prior_state.charset, &state.charset);
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
            .or_diag(diags, "Could not create the postgresql instance")?;

        let mut state = planned_state;
        state.id = Value::Value(instance_id.clone().into());
        if let Err(err) = state.setup(&service, &instance_id).await {
            // the instance exists, keep it in the state so that Terraform taints it
            diags.root_error("Could not set up the postgresql instance", err.to_string());
            state.forget_unknowns();
            return Some((state, planned_private_state));
        }

        if let Err(err) = state.read(&service).await {
            diags.root_error("Could not read the postgresql instance", err.to_string());
        }
        state.forget_unknowns();
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
        let result = planned_state.update(&prior_state, &service).await;
        if let Err(err) = &result {
            diags.root_error("Could not update the postgresql instance", err.to_string());
        }

        let mut state = planned_state.clone();
        match state.read(&service).await {
            Ok(true) => (),
            Ok(false) => {
                diags.root_error_short("The postgresql instance disappeared during the update");
                return None;
            }
            Err(err) => {
                diags.root_error("Could not read the postgresql instance", err.to_string());
            }
        }
        if result.is_ok() && planned_state.switch_tag() != SWITCH_IMMEDIATELY {
            state.keep_deferred(&planned_state);
        }
        state.forget_unknowns();
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
        delete_instance(
            &service,
            text(&prior_state.id),
            flag(&prior_state.delete_protection),
        )
        .await
        .or_diag(diags, "Could not delete the postgresql instance")
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let service = self.service.get(diags).await?;
        let mut state = InstanceState {
            id: Value::Value(id.clone().into()),
            delete_protection: Value::Value(false),
            wait_switch: Value::Value(SWITCH_IMMEDIATELY),
            ..Default::default()
        };
        let found = state
            .read(&service)
            .await
            .or_diag(diags, "Could not import the postgresql instance")?;
        if !found {
            diags.root_error(
                "Could not import the postgresql instance",
                format!("postgresql instance {id} not found"),
            );
            return None;
        }
        Some((state, Default::default()))
    }
}

impl InstanceState<'_> {
    /// Changes scheduled for the maintenance window are reported as already done
    pub fn keep_deferred(&mut self, planned: &Self) {
        for (value, planned) in [
            (&mut self.memory, &planned.memory),
            (&mut self.storage, &planned.storage),
            (&mut self.cpu, &planned.cpu),
        ] {
            if planned.is_value() {
                *value = planned.clone();
            }
        }
        for (value, planned) in [
            (&mut self.engine_version, &planned.engine_version),
            (&mut self.db_major_version, &planned.db_major_version),
            (&mut self.db_kernel_version, &planned.db_kernel_version),
        ] {
            if planned.is_value() {
                *value = planned.clone();
            }
        }
        if planned.db_node_set.is_value() {
            self.db_node_set = planned.db_node_set.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keep_deferred() {
        let planned = InstanceState {
            memory: Value::Value(8),
            cpu: Value::Unknown,
            db_kernel_version: "v13.3_r1.4".into(),
            ..Default::default()
        };
        let mut state = InstanceState {
            memory: Value::Value(4),
            cpu: Value::Value(2),
            db_kernel_version: "v13.3_r1.1".into(),
            engine_version: "13.3".into(),
            ..Default::default()
        };
        state.keep_deferred(&planned);
        assert_eq!(state.memory, Value::Value(8));
        assert_eq!(state.cpu, Value::Value(2));
        assert_eq!(state.db_kernel_version.as_deref_option(), Some("v13.3_r1.4"));
        assert_eq!(state.engine_version.as_deref_option(), Some("13.3"));
    }

    #[tokio::test]
    async fn test_unconfigured_provider() {
        let resource = InstanceResource::default();
        let mut diags = Diagnostics::default();
        let state = resource
            .read(&mut diags, InstanceState::default(), ValueEmpty::default(), ValueEmpty::default())
            .await;
        assert!(state.is_none());
        assert_eq!(diags.errors.len(), 1);
    }
}
