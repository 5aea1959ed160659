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
use tf_provider::value::{Value, ValueEmpty, ValueSet, ValueString};
use tf_provider::{map, AttributePath, Diagnostics, Resource};

use crate::error::Result;
use crate::id;
use crate::provider::ServiceHandle;
use crate::retry::{retry, retry_error, READ_RETRY_TIMEOUT, WRITE_RETRY_TIMEOUT};
use crate::service::{NetworkTarget, PostgresqlService, INSTANCE_NOT_FOUND, INSTANCE_STATUS_LIMIT};
use crate::utils::{
    computed, no_errors, non_empty, optional, replace_if_changed, required, set_strings,
    string, string_set_type, strings_set, text, ResultExt, WithSchema,
};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecurityGroupConfigState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub db_instance_id: ValueString<'a>,
    pub read_only_group_id: ValueString<'a>,
    pub security_group_id_set: ValueSet<ValueString<'a>>,
}

impl WithSchema for SecurityGroupConfigState<'_> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "id" => computed(AttributeType::String, "Config id, `instanceId#readOnlyGroupId`"),
                    "db_instance_id" => optional(AttributeType::String, "Instance to configure; conflicts with `read_only_group_id`"),
                    "read_only_group_id" => optional(AttributeType::String, "Read-only group to configure; conflicts with `db_instance_id`"),
                    "security_group_id_set" => required(string_set_type(), "Security groups bound to the target"),
                },
                description: Description::plain("Security groups of a PostgreSQL instance or read-only group"),
                ..Default::default()
            },
        }
    }
}

impl<'a> SecurityGroupConfigState<'a> {
    fn validate(&self, diags: &mut Diagnostics) {
        // Unknown parts are checked once known
        if self.db_instance_id.is_unknown() || self.read_only_group_id.is_unknown() {
            return;
        }
        if self.db_instance_id.is_value() == self.read_only_group_id.is_value() {
            diags.root_error(
                "Invalid security group config",
                "exactly one of `db_instance_id` and `read_only_group_id` must be set",
            );
        }
    }

    fn target(&self) -> NetworkTarget<'_> {
        match self.read_only_group_id.as_deref_option() {
            Some(group_id) if !group_id.is_empty() => NetworkTarget::ReadOnlyGroup {
                master_instance_id: "",
                group_id,
            },
            _ => NetworkTarget::Instance(text(&self.db_instance_id)),
        }
    }

    fn config_id(&self) -> String {
        id::join(&[text(&self.db_instance_id), text(&self.read_only_group_id)])
    }

    async fn read(&mut self, service: &PostgresqlService) -> Result<bool> {
        let [instance_id, group_id] = id::split::<2>(text(&self.id))?;
        self.db_instance_id = non_empty(instance_id);
        self.read_only_group_id = non_empty(group_id);
        let target = self.target();
        let groups = retry(READ_RETRY_TIMEOUT, || async {
            match service.describe_security_groups(target).await {
                Err(err) if err.code() == Some(INSTANCE_NOT_FOUND) => Ok(None),
                result => result.map(Some).map_err(|err| retry_error(err, &[])),
            }
        })
        .await?;
        let Some(groups) = groups else {
            return Ok(false);
        };
        self.security_group_id_set =
            strings_set(groups.into_iter().map(|group| group.security_group_id));
        Ok(true)
    }

    async fn apply(&self, service: &PostgresqlService) -> Result<()> {
        let groups = set_strings(&self.security_group_id_set);
        let network = self.target();
        retry(WRITE_RETRY_TIMEOUT, || async {
            service
                .modify_security_groups(network, &groups)
                .await
                .map_err(|err| retry_error(err, &[INSTANCE_STATUS_LIMIT]))
        })
        .await?;
        tracing::info!(?network, "postgresql security groups updated");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct SecurityGroupConfigResource {
    service: ServiceHandle,
}

impl SecurityGroupConfigResource {
    pub fn new(service: ServiceHandle) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Resource for SecurityGroupConfigResource {
    type State<'a> = SecurityGroupConfigState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(SecurityGroupConfigState::schema())
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
                diags.root_error("Could not read the security groups", err.to_string());
                Some((state, private_state))
            }
        }
    }

    async fn plan_create<'a>(
        &self,
        _diags: &mut Diagnostics,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let mut state = proposed_state;
        state.id = if state.db_instance_id.is_unknown() || state.read_only_group_id.is_unknown() {
            Value::Unknown
        } else {
            string(state.config_id())
        };
        Some((state, Default::default()))
    }

    async fn plan_update<'a>(
        &self,
        _diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>, Vec<AttributePath>)> {
        let state = proposed_state;
        let mut replace = Vec::new();
        replace_if_changed(&mut replace, "db_instance_id", &prior_state.db_instance_id, &state.db_instance_id);
        replace_if_changed(
            &mut replace,
            "read_only_group_id",
            &prior_state.read_only_group_id,
            &state.read_only_group_id,
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
        let mut state = planned_state;
        state.id = string(state.config_id());
        state
            .apply(&service)
            .await
            .or_diag(diags, "Could not bind the security groups")?;
        if let Err(err) = state.read(&service).await {
            diags.root_error("Could not read the security groups", err.to_string());
        }
        Some((state, planned_private_state))
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        _prior_state: Self::State<'a>,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let service = self.service.get(diags).await?;
        if let Err(err) = planned_state.apply(&service).await {
            diags.root_error("Could not bind the security groups", err.to_string());
        }
        let mut state = planned_state;
        if let Err(err) = state.read(&service).await {
            diags.root_error("Could not read the security groups", err.to_string());
        }
        Some((state, planned_private_state))
    }

    /// Security groups stay bound when the config is removed
    async fn destroy<'a>(
        &self,
        _diags: &mut Diagnostics,
        _prior_state: Self::State<'a>,
        _planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        Some(())
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let service = self.service.get(diags).await?;
        let mut state = SecurityGroupConfigState {
            id: string(id.clone()),
            ..Default::default()
        };
        let found = state
            .read(&service)
            .await
            .or_diag(diags, "Could not import the security groups")?;
        if !found {
            diags.root_error(
                "Could not import the security groups",
                format!("postgresql object {id} not found"),
            );
            return None;
        }
        Some((state, Default::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_and_id() {
        let state = SecurityGroupConfigState {
            read_only_group_id: "pgrogrp-1".into(),
            ..Default::default()
        };
        assert_eq!(state.config_id(), "#pgrogrp-1");
        assert_eq!(
            state.target(),
            NetworkTarget::ReadOnlyGroup {
                master_instance_id: "",
                group_id: "pgrogrp-1"
            }
        );

        let state = SecurityGroupConfigState {
            db_instance_id: "postgres-1".into(),
            ..Default::default()
        };
        assert_eq!(state.config_id(), "postgres-1#");
        assert_eq!(state.target(), NetworkTarget::Instance("postgres-1"));
    }

    #[test]
    fn test_validate_exactly_one_target() {
        let mut diags = Diagnostics::default();
        SecurityGroupConfigState::default().validate(&mut diags);
        assert_eq!(diags.errors.len(), 1);

        let mut diags = Diagnostics::default();
        SecurityGroupConfigState {
            db_instance_id: "postgres-1".into(),
            read_only_group_id: "pgrogrp-1".into(),
            ..Default::default()
        }
        .validate(&mut diags);
        assert_eq!(diags.errors.len(), 1);

        let mut diags = Diagnostics::default();
        SecurityGroupConfigState {
            db_instance_id: "postgres-1".into(),
            ..Default::default()
        }
        .validate(&mut diags);
        assert!(diags.errors.is_empty());
    }
}
