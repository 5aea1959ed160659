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
use tf_provider::value::{Value, ValueEmpty, ValueList, ValueNumber, ValueString};
use tf_provider::{map, DataSource, Diagnostics};

use crate::error::Result;
use crate::provider::ServiceHandle;
use crate::retry::{retry, retry_error, READ_RETRY_TIMEOUT};
use crate::service::models::{DbInstance, NetInfo, ReadOnlyGroup};
use crate::service::PostgresqlService;
use crate::utils::{computed, computed_list, optional, string, text, ResultExt, WithSchema};

use super::{filters_block, result_output_file, save_result, to_filters, Filters};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NetInfoItem<'a> {
    #[serde(borrow = "'a")]
    pub address: ValueString<'a>,
    pub ip: ValueString<'a>,
    pub port: ValueNumber,
    pub net_type: ValueString<'a>,
    pub status: ValueString<'a>,
    pub vpc_id: ValueString<'a>,
    pub subnet_id: ValueString<'a>,
    pub protocol_type: ValueString<'a>,
}

impl From<&NetInfo> for NetInfoItem<'_> {
    fn from(info: &NetInfo) -> Self {
        Self {
            address: string(&info.address),
            ip: string(&info.ip),
            port: Value::Value(info.port),
            net_type: string(&info.net_type),
            status: string(&info.status),
            vpc_id: string(&info.vpc_id),
            subnet_id: string(&info.subnet_id),
            protocol_type: string(&info.protocol_type),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MemberItem<'a> {
    #[serde(borrow = "'a")]
    pub db_instance_id: ValueString<'a>,
    pub db_instance_name: ValueString<'a>,
    pub db_instance_status: ValueString<'a>,
    pub region: ValueString<'a>,
    pub zone: ValueString<'a>,
    pub status_in_readonly_group: ValueString<'a>,
}

impl From<&DbInstance> for MemberItem<'_> {
    fn from(instance: &DbInstance) -> Self {
        Self {
            db_instance_id: string(&instance.db_instance_id),
            db_instance_name: string(&instance.db_instance_name),
            db_instance_status: string(&instance.db_instance_status),
            region: string(&instance.region),
            zone: string(&instance.zone),
            status_in_readonly_group: string(&instance.status_in_readonly_group),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReadonlyGroupItem<'a> {
    #[serde(borrow = "'a")]
    pub read_only_group_id: ValueString<'a>,
    pub read_only_group_name: ValueString<'a>,
    pub project_id: ValueNumber,
    pub master_db_instance_id: ValueString<'a>,
    pub min_delay_eliminate_reserve: ValueNumber,
    pub max_replay_latency: ValueNumber,
    pub replay_latency_eliminate: ValueNumber,
    pub max_replay_lag: Value<f64>,
    pub replay_lag_eliminate: ValueNumber,
    pub vpc_id: ValueString<'a>,
    pub subnet_id: ValueString<'a>,
    pub region: ValueString<'a>,
    pub zone: ValueString<'a>,
    pub status: ValueString<'a>,
    pub read_only_db_instance_list: ValueList<Value<MemberItem<'a>>>,
    pub rebalance: ValueNumber,
    pub db_instance_net_info: ValueList<Value<NetInfoItem<'a>>>,
    pub create_time: ValueString<'a>,
}

impl From<&ReadOnlyGroup> for ReadonlyGroupItem<'_> {
    fn from(group: &ReadOnlyGroup) -> Self {
        Self {
            read_only_group_id: string(&group.read_only_group_id),
            read_only_group_name: string(&group.read_only_group_name),
            project_id: Value::Value(group.project_id),
            master_db_instance_id: string(&group.master_db_instance_id),
            min_delay_eliminate_reserve: Value::Value(group.min_delay_eliminate_reserve),
            max_replay_latency: Value::Value(group.max_replay_latency),
            replay_latency_eliminate: Value::Value(group.replay_latency_eliminate),
            max_replay_lag: Value::Value(group.max_replay_lag),
            replay_lag_eliminate: Value::Value(group.replay_lag_eliminate),
            vpc_id: string(&group.vpc_id),
            subnet_id: string(&group.subnet_id),
            region: string(&group.region),
            zone: string(&group.zone),
            status: string(&group.status),
            read_only_db_instance_list: Value::Value(
                group
                    .read_only_db_instance_list
                    .iter()
                    .map(|instance| Value::Value(instance.into()))
                    .collect(),
            ),
            rebalance: Value::Value(group.rebalance),
            db_instance_net_info: Value::Value(
                group
                    .db_instance_net_info
                    .iter()
                    .map(|info| Value::Value(info.into()))
                    .collect(),
            ),
            create_time: string(&group.create_time),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReadonlyGroupsState<'a> {
    #[serde(borrow = "'a")]
    pub filters: Filters<'a>,
    pub order_by: ValueString<'a>,
    pub order_by_type: ValueString<'a>,
    pub result_output_file: ValueString<'a>,
    pub read_only_group_list: ValueList<Value<ReadonlyGroupItem<'a>>>,
}

impl WithSchema for ReadonlyGroupsState<'_> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "order_by" => optional(AttributeType::String, "Sort key: ROGroupId, CreateTime or Name"),
                    "order_by_type" => optional(AttributeType::String, "Sort order: asc or desc"),
                    "result_output_file" => result_output_file(),
                    "read_only_group_list" => computed_list(
                        map! {
                            "read_only_group_id" => computed(AttributeType::String, "Group id"),
                            "read_only_group_name" => computed(AttributeType::String, "Group name"),
                            "project_id" => computed(AttributeType::Number, "Project of the group"),
                            "master_db_instance_id" => computed(AttributeType::String, "Master instance"),
                            "min_delay_eliminate_reserve" => computed(AttributeType::Number, "Minimum number of instances kept"),
                            "max_replay_latency" => computed(AttributeType::Number, "Latency threshold, in ms"),
                            "replay_latency_eliminate" => computed(AttributeType::Number, "Whether lagging instances are removed on latency"),
                            "max_replay_lag" => computed(AttributeType::Number, "Lag threshold, in MB"),
                            "replay_lag_eliminate" => computed(AttributeType::Number, "Whether lagging instances are removed on lag"),
                            "vpc_id" => computed(AttributeType::String, "VPC of the group"),
                            "subnet_id" => computed(AttributeType::String, "Subnet of the group"),
                            "region" => computed(AttributeType::String, "Region of the group"),
                            "zone" => computed(AttributeType::String, "Zone of the group"),
                            "status" => computed(AttributeType::String, "Status of the group"),
                            "read_only_db_instance_list" => computed_list(
                                map! {
                                    "db_instance_id" => computed(AttributeType::String, "Instance id"),
                                    "db_instance_name" => computed(AttributeType::String, "Instance name"),
                                    "db_instance_status" => computed(AttributeType::String, "Instance status"),
                                    "region" => computed(AttributeType::String, "Region of the instance"),
                                    "zone" => computed(AttributeType::String, "Zone of the instance"),
                                    "status_in_readonly_group" => computed(AttributeType::String, "Status of the instance in the group"),
                                },
                                "Read-only instances of the group",
                            ),
                            "rebalance" => computed(AttributeType::Number, "Whether load is rebalanced automatically"),
                            "db_instance_net_info" => computed_list(
                                map! {
                                    "address" => computed(AttributeType::String, "Domain name"),
                                    "ip" => computed(AttributeType::String, "Address"),
                                    "port" => computed(AttributeType::Number, "Port"),
                                    "net_type" => computed(AttributeType::String, "Network type: inner, private or public"),
                                    "status" => computed(AttributeType::String, "Network status"),
                                    "vpc_id" => computed(AttributeType::String, "VPC of the address"),
                                    "subnet_id" => computed(AttributeType::String, "Subnet of the address"),
                                    "protocol_type" => computed(AttributeType::String, "Protocol of the address"),
                                },
                                "Network addresses of the group",
                            ),
                            "create_time" => computed(AttributeType::String, "Creation time"),
                        },
                        "Read-only groups matching the filters",
                    ),
                },
                blocks: map! {
                    "filters" => filters_block(),
                },
                description: Description::plain("List read-only groups of PostgreSQL instances"),
                ..Default::default()
            },
        }
    }
}

impl<'a> ReadonlyGroupsState<'a> {
    async fn fetch(&mut self, service: &PostgresqlService) -> Result<()> {
        let filters = to_filters(&self.filters);
        let order_by = text(&self.order_by);
        let order_by_type = text(&self.order_by_type);
        let groups = retry(READ_RETRY_TIMEOUT, || async {
            service
                .describe_readonly_groups(&filters, order_by, order_by_type)
                .await
                .map_err(|err| retry_error(err, &[]))
        })
        .await?;
        tracing::debug!(count = groups.len(), "postgresql read-only groups listed");
        self.read_only_group_list = Value::Value(
            groups
                .iter()
                .map(|group| Value::Value(group.into()))
                .collect(),
        );
        save_result(&self.result_output_file, &self.read_only_group_list).await
    }
}

#[derive(Debug, Default)]
pub struct ReadonlyGroupsDataSource {
    service: ServiceHandle,
}

impl ReadonlyGroupsDataSource {
    pub fn new(service: ServiceHandle) -> Self {
        Self { service }
    }
}

#[async_trait]
impl DataSource for ReadonlyGroupsDataSource {
    type State<'a> = ReadonlyGroupsState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(ReadonlyGroupsState::schema())
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        config: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::State<'a>> {
        let service = self.service.get(diags).await?;
        let mut state = config;
        state
            .fetch(&service)
            .await
            .or_diag(diags, "Could not list the read-only groups")?;
        Some(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_item() {
        let group = ReadOnlyGroup {
            read_only_group_id: "pgrogrp-1".to_string(),
            max_replay_lag: 12.5,
            read_only_db_instance_list: vec![DbInstance {
                db_instance_id: "pgro-1".to_string(),
                status_in_readonly_group: "Ok".to_string(),
                ..Default::default()
            }],
            db_instance_net_info: vec![NetInfo {
                ip: "10.0.0.9".to_string(),
                port: 5432,
                ..Default::default()
            }],
            ..Default::default()
        };
        let item = ReadonlyGroupItem::from(&group);
        assert_eq!(item.read_only_group_id.as_deref_option(), Some("pgrogrp-1"));
        assert_eq!(item.max_replay_lag, Value::Value(12.5));
        let members = item.read_only_db_instance_list.as_ref_option().unwrap();
        assert_eq!(
            members[0].as_ref_option().unwrap().db_instance_id.as_deref_option(),
            Some("pgro-1")
        );
        let infos = item.db_instance_net_info.as_ref_option().unwrap();
        assert_eq!(infos[0].as_ref_option().unwrap().port, Value::Value(5432));
    }
}
