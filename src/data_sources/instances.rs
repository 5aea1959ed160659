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

use async_trait::async_trait;
use futures::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use tf_provider::schema::{AttributeType, Block, Description, Schema};
use tf_provider::value::{Value, ValueBool, ValueEmpty, ValueList, ValueMap, ValueNumber, ValueString};
use tf_provider::{map, DataSource, Diagnostics};

use crate::error::Result;
use crate::provider::ServiceHandle;
use crate::retry::{retry, retry_error, READ_RETRY_TIMEOUT};
use crate::service::models::{DbInstance, Filter};
use crate::service::{charge_type, PostgresqlService};
use crate::utils::{
    computed, computed_list, optional, string, string_map_type, strings_map, text, ResultExt,
    WithSchema,
};

use super::{result_output_file, save_result};

/// Concurrent root user lookups
const ROOT_USER_LOOKUPS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InstanceItem<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub charge_type: ValueString<'a>,
    pub auto_renew_flag: ValueNumber,
    pub engine_version: ValueString<'a>,
    pub db_kernel_version: ValueString<'a>,
    pub db_major_version: ValueString<'a>,
    pub vpc_id: ValueString<'a>,
    pub subnet_id: ValueString<'a>,
    pub storage: ValueNumber,
    pub memory: ValueNumber,
    pub project_id: ValueNumber,
    pub availability_zone: ValueString<'a>,
    pub root_user: ValueString<'a>,
    pub public_access_switch: ValueBool,
    pub public_access_host: ValueString<'a>,
    pub public_access_port: ValueNumber,
    pub private_access_ip: ValueString<'a>,
    pub private_access_port: ValueNumber,
    pub charset: ValueString<'a>,
    pub create_time: ValueString<'a>,
    pub tags: ValueMap<'a, ValueString<'a>>,
}

impl InstanceItem<'_> {
    pub fn from_instance(instance: &DbInstance, root_user: Option<String>) -> Self {
        let mut item = Self {
            id: string(&instance.db_instance_id),
            name: string(&instance.db_instance_name),
            charge_type: string(charge_type(&instance.pay_type)),
            auto_renew_flag: Value::Value(instance.auto_renew),
            engine_version: string(&instance.db_version),
            db_kernel_version: string(&instance.db_kernel_version),
            db_major_version: string(&instance.db_major_version),
            vpc_id: string(&instance.vpc_id),
            subnet_id: string(&instance.subnet_id),
            storage: Value::Value(instance.db_instance_storage),
            memory: Value::Value(instance.db_instance_memory),
            project_id: Value::Value(instance.project_id),
            availability_zone: string(&instance.zone),
            root_user: root_user.map_or(Value::Null, |user| string(user)),
            public_access_switch: Value::Value(false),
            public_access_host: string(""),
            charset: string(&instance.db_charset),
            create_time: string(&instance.create_time),
            tags: strings_map(
                instance
                    .tag_list
                    .iter()
                    .map(|tag| (tag.tag_key.clone(), tag.tag_value.clone()))
                    .collect::<BTreeMap<_, _>>(),
            ),
            ..Default::default()
        };
        for info in &instance.db_instance_net_info {
            match info.net_type.as_str() {
                "public" => {
                    if info.status == "opened" || info.status == "1" {
                        item.public_access_switch = Value::Value(true);
                    }
                    item.public_access_host = string(&info.address);
                    item.public_access_port = Value::Value(info.port);
                }
                "private" | "inner" if !info.ip.is_empty() => {
                    item.private_access_ip = string(&info.ip);
                    item.private_access_port = Value::Value(info.port);
                }
                _ => (),
            }
        }
        item
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InstancesState<'a> {
    #[serde(borrow = "'a")]
    pub name: ValueString<'a>,
    pub id: ValueString<'a>,
    pub project_id: ValueString<'a>,
    pub result_output_file: ValueString<'a>,
    pub instance_list: ValueList<Value<InstanceItem<'a>>>,
}

impl WithSchema for InstancesState<'_> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "name" => optional(AttributeType::String, "Name of the instances to list"),
                    "id" => optional(AttributeType::String, "Id of the instance to list"),
                    "project_id" => optional(AttributeType::String, "Project of the instances to list"),
                    "result_output_file" => result_output_file(),
                    "instance_list" => computed_list(
                        map! {
                            "id" => computed(AttributeType::String, "Instance id"),
                            "name" => computed(AttributeType::String, "Instance name"),
                            "charge_type" => computed(AttributeType::String, "Pay type: POSTPAID_BY_HOUR or PREPAID"),
                            "auto_renew_flag" => computed(AttributeType::Number, "Auto renew flag"),
                            "engine_version" => computed(AttributeType::String, "Version of the engine"),
                            "db_kernel_version" => computed(AttributeType::String, "Kernel version"),
                            "db_major_version" => computed(AttributeType::String, "Major version"),
                            "vpc_id" => computed(AttributeType::String, "VPC of the instance"),
                            "subnet_id" => computed(AttributeType::String, "Subnet of the instance"),
                            "storage" => computed(AttributeType::Number, "Storage, in GB"),
                            "memory" => computed(AttributeType::Number, "Memory, in GB"),
                            "project_id" => computed(AttributeType::Number, "Project of the instance"),
                            "availability_zone" => computed(AttributeType::String, "Availability zone"),
                            "root_user" => computed(AttributeType::String, "Root account of the instance"),
                            "public_access_switch" => computed(AttributeType::Bool, "Whether public access is open"),
                            "public_access_host" => computed(AttributeType::String, "Public host"),
                            "public_access_port" => computed(AttributeType::Number, "Public port"),
                            "private_access_ip" => computed(AttributeType::String, "Private address"),
                            "private_access_port" => computed(AttributeType::Number, "Private port"),
                            "charset" => computed(AttributeType::String, "Charset of the instance"),
                            "create_time" => computed(AttributeType::String, "Creation time"),
                            "tags" => computed(string_map_type(), "Tags of the instance"),
                        },
                        "Instances matching the filters",
                    ),
                },
                description: Description::plain("List PostgreSQL instances"),
                ..Default::default()
            },
        }
    }
}

impl<'a> InstancesState<'a> {
    pub fn filters(&self) -> Vec<Filter> {
        [
            ("db-instance-name", &self.name),
            ("db-instance-id", &self.id),
            ("db-project-id", &self.project_id),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_value())
        .map(|(name, value)| Filter::new(name, text(value)))
        .collect()
    }

    async fn fetch(&mut self, service: &PostgresqlService) -> Result<()> {
        let filters = self.filters();
        let instances = retry(READ_RETRY_TIMEOUT, || async {
            service
                .describe_instances(&filters)
                .await
                .map_err(|err| retry_error(err, &[]))
        })
        .await?;

        let items: Vec<_> = stream::iter(&instances)
            .map(|instance| async move {
                let root_user = if instance.db_instance_id.starts_with("postgres-") {
                    match service.describe_root_user(&instance.db_instance_id).await {
                        Ok(accounts) => accounts.into_iter().next().map(|account| account.user_name),
                        Err(err) => {
                            tracing::warn!(instance_id = %instance.db_instance_id, "could not describe the root user: {err}");
                            None
                        }
                    }
                } else {
                    None
                };
                Value::Value(InstanceItem::from_instance(instance, root_user))
            })
            .buffered(ROOT_USER_LOOKUPS)
            .boxed()
            .collect()
            .await;
        tracing::debug!(count = items.len(), "postgresql instances listed");
        self.instance_list = Value::Value(items);
        save_result(&self.result_output_file, &self.instance_list).await
    }
}

#[derive(Debug, Default)]
pub struct InstancesDataSource {
    service: ServiceHandle,
}

impl InstancesDataSource {
    pub fn new(service: ServiceHandle) -> Self {
        Self { service }
    }
}

#[async_trait]
impl DataSource for InstancesDataSource {
    type State<'a> = InstancesState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(InstancesState::schema())
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
            .or_diag(diags, "Could not list the instances")?;
        Some(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::models::{NetInfo, Tag};

    #[test]
    fn test_filters() {
        let state = InstancesState {
            name: "main".into(),
            project_id: "0".into(),
            ..Default::default()
        };
        assert_eq!(
            state.filters(),
            vec![
                Filter::new("db-instance-name", "main"),
                Filter::new("db-project-id", "0"),
            ]
        );
    }

    #[test]
    fn test_from_instance() {
        let instance = DbInstance {
            db_instance_id: "postgres-1".to_string(),
            pay_type: "prepaid".to_string(),
            db_instance_net_info: vec![
                NetInfo {
                    net_type: "public".to_string(),
                    address: "postgres-1.sql.tencentcdb.com".to_string(),
                    port: 5432,
                    status: "1".to_string(),
                    ..Default::default()
                },
                NetInfo {
                    net_type: "inner".to_string(),
                    ip: "10.0.0.8".to_string(),
                    port: 5432,
                    ..Default::default()
                },
            ],
            tag_list: vec![Tag {
                tag_key: "env".to_string(),
                tag_value: "test".to_string(),
            }],
            ..Default::default()
        };
        let item = InstanceItem::from_instance(&instance, Some("root".to_string()));
        assert_eq!(item.charge_type.as_deref_option(), Some("PREPAID"));
        assert_eq!(item.public_access_switch, Value::Value(true));
        assert_eq!(
            item.public_access_host.as_deref_option(),
            Some("postgres-1.sql.tencentcdb.com")
        );
        assert_eq!(item.private_access_ip.as_deref_option(), Some("10.0.0.8"));
        assert_eq!(item.root_user.as_deref_option(), Some("root"));
        let tags = item.tags.as_ref_option().unwrap();
        assert_eq!(tags.get("env").and_then(|tag| tag.as_deref_option()), Some("test"));
    }
}
