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
use crate::service::models::BaseBackup;
use crate::service::{BaseBackupQuery, PostgresqlService};
use crate::utils::{computed, computed_list, optional, string, text, ResultExt, WithSchema};

use super::{filters_block, result_output_file, save_result, to_filters, Filters};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BaseBackupItem<'a> {
    #[serde(borrow = "'a")]
    pub db_instance_id: ValueString<'a>,
    pub id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub backup_method: ValueString<'a>,
    pub backup_mode: ValueString<'a>,
    pub state: ValueString<'a>,
    pub size: ValueNumber,
    pub start_time: ValueString<'a>,
    pub finish_time: ValueString<'a>,
    pub expire_time: ValueString<'a>,
}

impl From<&BaseBackup> for BaseBackupItem<'_> {
    fn from(backup: &BaseBackup) -> Self {
        Self {
            db_instance_id: string(&backup.db_instance_id),
            id: string(&backup.id),
            name: string(&backup.name),
            backup_method: string(&backup.backup_method),
            backup_mode: string(&backup.backup_mode),
            state: string(&backup.state),
            size: Value::Value(backup.size),
            start_time: string(&backup.start_time),
            finish_time: string(&backup.finish_time),
            expire_time: string(&backup.expire_time),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BaseBackupsState<'a> {
    #[serde(borrow = "'a")]
    pub min_finish_time: ValueString<'a>,
    pub max_finish_time: ValueString<'a>,
    pub filters: Filters<'a>,
    pub order_by: ValueString<'a>,
    pub order_by_type: ValueString<'a>,
    pub result_output_file: ValueString<'a>,
    pub base_backup_set: ValueList<Value<BaseBackupItem<'a>>>,
}

impl WithSchema for BaseBackupsState<'_> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "min_finish_time" => optional(AttributeType::String, "Earliest finish time of the backups"),
                    "max_finish_time" => optional(AttributeType::String, "Latest finish time of the backups"),
                    "order_by" => optional(AttributeType::String, "Sort key: StartTime, FinishTime or Size"),
                    "order_by_type" => optional(AttributeType::String, "Sort order: asc or desc"),
                    "result_output_file" => result_output_file(),
                    "base_backup_set" => computed_list(
                        map! {
                            "db_instance_id" => computed(AttributeType::String, "Instance of the backup"),
                            "id" => computed(AttributeType::String, "Backup id"),
                            "name" => computed(AttributeType::String, "Backup name"),
                            "backup_method" => computed(AttributeType::String, "Backup method: physical or logical"),
                            "backup_mode" => computed(AttributeType::String, "Backup mode: automatic or manual"),
                            "state" => computed(AttributeType::String, "Backup state"),
                            "size" => computed(AttributeType::Number, "Size of the backup, in bytes"),
                            "start_time" => computed(AttributeType::String, "Start time"),
                            "finish_time" => computed(AttributeType::String, "Finish time"),
                            "expire_time" => computed(AttributeType::String, "Expiration time"),
                        },
                        "Base backups matching the criteria",
                    ),
                },
                blocks: map! {
                    "filters" => filters_block(),
                },
                description: Description::plain("List base backups of PostgreSQL instances"),
                ..Default::default()
            },
        }
    }
}

impl<'a> BaseBackupsState<'a> {
    pub fn query(&self) -> BaseBackupQuery {
        BaseBackupQuery {
            min_finish_time: text(&self.min_finish_time).to_string(),
            max_finish_time: text(&self.max_finish_time).to_string(),
            filters: to_filters(&self.filters),
            order_by: text(&self.order_by).to_string(),
            order_by_type: text(&self.order_by_type).to_string(),
        }
    }

    async fn fetch(&mut self, service: &PostgresqlService) -> Result<()> {
        let query = self.query();
        let backups = retry(READ_RETRY_TIMEOUT, || async {
            service
                .describe_base_backups(&query)
                .await
                .map_err(|err| retry_error(err, &[]))
        })
        .await?;
        tracing::debug!(count = backups.len(), "postgresql base backups listed");
        self.base_backup_set = Value::Value(
            backups
                .iter()
                .map(|backup| Value::Value(backup.into()))
                .collect(),
        );
        save_result(&self.result_output_file, &self.base_backup_set).await
    }
}

#[derive(Debug, Default)]
pub struct BaseBackupsDataSource {
    service: ServiceHandle,
}

impl BaseBackupsDataSource {
    pub fn new(service: ServiceHandle) -> Self {
        Self { service }
    }
}

#[async_trait]
impl DataSource for BaseBackupsDataSource {
    type State<'a> = BaseBackupsState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(BaseBackupsState::schema())
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
            .or_diag(diags, "Could not list the base backups")?;
        Some(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_sources::FilterState;
    use crate::service::models::Filter;
    use crate::utils::strings_list;

    #[test]
    fn test_query() {
        let state = BaseBackupsState {
            min_finish_time: "2024-01-01 00:00:00".into(),
            filters: Value::Value(vec![Value::Value(FilterState {
                name: "db-instance-id".into(),
                values: strings_list(["postgres-1".to_string()]),
            })]),
            order_by_type: "desc".into(),
            ..Default::default()
        };
        let query = state.query();
        assert_eq!(query.min_finish_time, "2024-01-01 00:00:00");
        assert!(query.max_finish_time.is_empty());
        assert_eq!(query.filters, vec![Filter::new("db-instance-id", "postgres-1")]);
        assert_eq!(query.order_by_type, "desc");
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            serde_json::json!({
                "MinFinishTime": "2024-01-01 00:00:00",
                "Filters": [{ "Name": "db-instance-id", "Values": ["postgres-1"] }],
                "OrderByType": "desc",
            })
        );
    }

    #[test]
    fn test_backup_item() {
        let backup = BaseBackup {
            db_instance_id: "postgres-1".to_string(),
            id: "backup-1".to_string(),
            size: 1024,
            ..Default::default()
        };
        let item = BaseBackupItem::from(&backup);
        assert_eq!(item.id.as_deref_option(), Some("backup-1"));
        assert_eq!(item.size, Value::Value(1024));
        assert_eq!(item.state.as_deref_option(), Some(""));
    }
}
