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

use crate::error::Result;
use crate::provider::ServiceHandle;
use crate::retry::{retry, retry_error, StateChangeConf, READ_RETRY_TIMEOUT, WRITE_RETRY_TIMEOUT};
use crate::service::models::{ReadOnlyGroup, ReadOnlyGroupConfig};
use crate::service::{
    NetworkTarget, PostgresqlService, GROUP_STATUS_OK, INSTANCE_NOT_FOUND, STATUS_CLOSED,
};
use crate::utils::{
    computed, computed_list, number, optional_computed, replace_if_changed, required,
    set_strings, string, string_set_type, strings_set, text, ResultExt, WithSchema,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NetInfoState<'a> {
    #[serde(borrow = "'a")]
    pub ip: ValueString<'a>,
    pub port: ValueNumber,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReadonlyGroupState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub master_db_instance_id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub project_id: ValueNumber,
    pub vpc_id: ValueString<'a>,
    pub subnet_id: ValueString<'a>,
    pub replay_lag_eliminate: ValueNumber,
    pub replay_latency_eliminate: ValueNumber,
    pub max_replay_lag: ValueNumber,
    pub max_replay_latency: ValueNumber,
    pub min_delay_eliminate_reserve: ValueNumber,
    pub security_groups_ids: ValueSet<ValueString<'a>>,
    pub create_time: ValueString<'a>,
    pub net_info_list: ValueList<Value<NetInfoState<'a>>>,
}

impl WithSchema for ReadonlyGroupState<'_> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "id" => computed(AttributeType::String, "Read-only group id"),
                    "master_db_instance_id" => required(AttributeType::String, "Master instance of the group"),
                    "name" => required(AttributeType::String, "Name of the group"),
                    "project_id" => required(AttributeType::Number, "Project of the group"),
                    "vpc_id" => required(AttributeType::String, "VPC of the group"),
                    "subnet_id" => required(AttributeType::String, "Subnet of the group"),
                    "replay_lag_eliminate" => required(
                        AttributeType::Number,
                        "Whether to remove a read-only instance lagging by more than `max_replay_lag`: 1 to remove, 0 not to",
                    ),
                    "replay_latency_eliminate" => required(
                        AttributeType::Number,
                        "Whether to remove a read-only instance lagging by more than `max_replay_latency`: 1 to remove, 0 not to",
                    ),
                    "max_replay_lag" => required(AttributeType::Number, "Replication lag threshold, in MB"),
                    "max_replay_latency" => required(AttributeType::Number, "Replication latency threshold, in ms"),
                    "min_delay_eliminate_reserve" => required(
                        AttributeType::Number,
                        "Minimum number of instances kept in the group when removing lagging ones",
                    ),
                    "security_groups_ids" => optional_computed(string_set_type(), "Security groups bound to the group"),
                    "create_time" => computed(AttributeType::String, "Creation time of the group"),
                    "net_info_list" => computed_list(
                        map! {
                            "ip" => computed(AttributeType::String, "Address of the group"),
                            "port" => computed(AttributeType::Number, "Port of the group"),
                        },
                        "Network addresses of the group",
                    ),
                },
                description: Description::plain("Read-only group of a PostgreSQL instance"),
                ..Default::default()
            },
        }
    }
}

impl<'a> ReadonlyGroupState<'a> {
    pub fn config(&self) -> ReadOnlyGroupConfig {
        ReadOnlyGroupConfig {
            master_db_instance_id: text(&self.master_db_instance_id).to_string(),
            read_only_group_id: text(&self.id).to_string(),
            name: text(&self.name).to_string(),
            project_id: Some(number(&self.project_id)),
            vpc_id: text(&self.vpc_id).to_string(),
            subnet_id: text(&self.subnet_id).to_string(),
            replay_lag_eliminate: number(&self.replay_lag_eliminate),
            replay_latency_eliminate: number(&self.replay_latency_eliminate),
            max_replay_lag: number(&self.max_replay_lag),
            max_replay_latency: number(&self.max_replay_latency),
            min_delay_eliminate_reserve: number(&self.min_delay_eliminate_reserve),
            security_group_ids: set_strings(&self.security_groups_ids),
        }
    }

    fn config_changed(&self, prior: &Self) -> bool {
        self.name != prior.name
            || self.replay_lag_eliminate != prior.replay_lag_eliminate
            || self.replay_latency_eliminate != prior.replay_latency_eliminate
            || self.max_replay_lag != prior.max_replay_lag
            || self.max_replay_latency != prior.max_replay_latency
            || self.min_delay_eliminate_reserve != prior.min_delay_eliminate_reserve
    }

    fn target(&self) -> NetworkTarget<'_> {
        NetworkTarget::ReadOnlyGroup {
            master_instance_id: text(&self.master_db_instance_id),
            group_id: text(&self.id),
        }
    }

    pub fn apply_group(&mut self, group: &ReadOnlyGroup) {
        self.master_db_instance_id = string(&group.master_db_instance_id);
        self.name = string(&group.read_only_group_name);
        self.project_id = Value::Value(group.project_id);
        self.vpc_id = string(&group.vpc_id);
        self.subnet_id = string(&group.subnet_id);
        self.replay_lag_eliminate = Value::Value(group.replay_lag_eliminate);
        self.replay_latency_eliminate = Value::Value(group.replay_latency_eliminate);
        self.max_replay_lag = Value::Value(group.max_replay_lag as i64);
        self.max_replay_latency = Value::Value(group.max_replay_latency);
        self.min_delay_eliminate_reserve = Value::Value(group.min_delay_eliminate_reserve);
        self.create_time = string(&group.create_time);
        self.net_info_list = Value::Value(
            group
                .db_instance_net_info
                .iter()
                .map(|info| {
                    Value::Value(NetInfoState {
                        ip: string(&info.ip),
                        port: Value::Value(info.port),
                    })
                })
                .collect(),
        );
    }

    async fn read(&mut self, service: &PostgresqlService) -> Result<bool> {
        let group_id = text(&self.id).to_string();
        let group = match service.describe_readonly_group(&group_id).await {
            Ok(Some(group)) => group,
            Ok(None) => return Ok(false),
            Err(err) if err.code() == Some(INSTANCE_NOT_FOUND) => return Ok(false),
            Err(err) => return Err(err.into()),
        };
        self.apply_group(&group);

        let groups = service.describe_security_groups(self.target()).await?;
        self.security_groups_ids =
            strings_set(groups.into_iter().map(|group| group.security_group_id));
        Ok(true)
    }

    async fn wait_ok(&self, service: &PostgresqlService) -> Result<()> {
        let master = text(&self.master_db_instance_id);
        let group_id = text(&self.id);
        StateChangeConf::new(&[GROUP_STATUS_OK], 3 * READ_RETRY_TIMEOUT)
            .wait_for_state(|| service.readonly_group_state(master, group_id))
            .await?;
        Ok(())
    }

    async fn create(&mut self, service: &PostgresqlService) -> Result<()> {
        let config = self.config();
        let group_id = retry(WRITE_RETRY_TIMEOUT, || async {
            service
                .create_readonly_group(&config)
                .await
                .map_err(|err| retry_error(err, &[]))
        })
        .await?;
        tracing::info!(%group_id, "postgresql read-only group created");
        self.id = string(group_id);
        self.wait_ok(service).await
    }

    async fn update(&self, prior: &Self, service: &PostgresqlService) -> Result<()> {
        if self.config_changed(prior) {
            let config = self.config();
            retry(WRITE_RETRY_TIMEOUT, || async {
                service
                    .modify_readonly_group_config(&config)
                    .await
                    .map_err(|err| retry_error(err, &[]))
            })
            .await?;
            self.wait_ok(service).await?;
        }

        if self.security_groups_ids != prior.security_groups_ids && self.security_groups_ids.is_value() {
            let groups = set_strings(&self.security_groups_ids);
            retry(WRITE_RETRY_TIMEOUT, || async {
                service
                    .modify_security_groups(self.target(), &groups)
                    .await
                    .map_err(|err| retry_error(err, &[]))
            })
            .await?;
        }
        Ok(())
    }

    async fn delete(&self, service: &PostgresqlService) -> Result<()> {
        let group_id = text(&self.id);
        retry(WRITE_RETRY_TIMEOUT, || async {
            service
                .delete_readonly_group(group_id)
                .await
                .map_err(|err| retry_error(err, &[]))
        })
        .await?;
        let master = text(&self.master_db_instance_id);
        StateChangeConf::new(&[STATUS_CLOSED], 3 * READ_RETRY_TIMEOUT)
            .wait_for_state(|| service.readonly_group_state(master, group_id))
            .await?;
        tracing::info!(group_id, "postgresql read-only group deleted");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ReadonlyGroupResource {
    service: ServiceHandle,
}

impl ReadonlyGroupResource {
    pub fn new(service: ServiceHandle) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Resource for ReadonlyGroupResource {
    type State<'a> = ReadonlyGroupState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(ReadonlyGroupState::schema())
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
                diags.root_error("Could not read the read-only group", err.to_string());
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
        state.id = Value::Unknown;
        if state.security_groups_ids.is_null() {
            state.security_groups_ids = Value::Unknown;
        }
        state.create_time = Value::Unknown;
        state.net_info_list = Value::Unknown;
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
        replace_if_changed(
            &mut replace,
            "master_db_instance_id",
            &prior_state.master_db_instance_id,
            &state.master_db_instance_id,
        );
        replace_if_changed(&mut replace, "project_id", &prior_state.project_id, &state.project_id);
        replace_if_changed(&mut replace, "vpc_id", &prior_state.vpc_id, &state.vpc_id);
        replace_if_changed(&mut replace, "subnet_id", &prior_state.subnet_id, &state.subnet_id);
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
        let created = state.create(&service).await;
        if state.id.is_unknown() {
            created.or_diag(diags, "Could not create the read-only group")?;
            return None;
        }
        if let Err(err) = created {
            diags.root_error("Could not create the read-only group", err.to_string());
        }
        if let Err(err) = state.read(&service).await {
            diags.root_error("Could not read the read-only group", err.to_string());
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
            diags.root_error("Could not update the read-only group", err.to_string());
        }
        let mut state = planned_state;
        if let Err(err) = state.read(&service).await {
            diags.root_error("Could not read the read-only group", err.to_string());
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
        prior_state
            .delete(&service)
            .await
            .or_diag(diags, "Could not delete the read-only group")
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let service = self.service.get(diags).await?;
        let mut state = ReadonlyGroupState {
            id: Value::Value(id.clone().into()),
            ..Default::default()
        };
        let found = state
            .read(&service)
            .await
            .or_diag(diags, "Could not import the read-only group")?;
        if !found {
            diags.root_error(
                "Could not import the read-only group",
                format!("postgresql read-only group {id} not found"),
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

    #[test]
    fn test_apply_group() {
        let group = ReadOnlyGroup {
            read_only_group_id: "pgrogrp-1".to_string(),
            read_only_group_name: "replicas".to_string(),
            master_db_instance_id: "postgres-1".to_string(),
            max_replay_lag: 100.0,
            db_instance_net_info: vec![NetInfo {
                ip: "10.0.0.8".to_string(),
                port: 5432,
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut state = ReadonlyGroupState::default();
        state.apply_group(&group);
        assert_eq!(state.name.as_deref_option(), Some("replicas"));
        assert_eq!(state.max_replay_lag, Value::Value(100));
        let infos = state.net_info_list.as_ref_option().unwrap();
        assert_eq!(infos.len(), 1);
        assert_eq!(
            infos[0].as_ref_option().unwrap().ip.as_deref_option(),
            Some("10.0.0.8")
        );
    }

    #[test]
    fn test_config_changes() {
        let prior = ReadonlyGroupState {
            id: "pgrogrp-1".into(),
            name: "replicas".into(),
            project_id: Value::Value(0),
            max_replay_latency: Value::Value(512),
            ..Default::default()
        };
        let mut state = prior.clone();
        assert!(!state.config_changed(&prior));
        state.max_replay_latency = Value::Value(1024);
        assert!(state.config_changed(&prior));

        let config = state.config();
        assert_eq!(config.read_only_group_id, "pgrogrp-1");
        assert_eq!(config.max_replay_latency, 1024);
        assert_eq!(config.project_id, Some(0));
    }
}
