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
use tf_provider::value::{Value, ValueEmpty, ValueList, ValueString};
use tf_provider::{map, DataSource, Diagnostics};

use crate::error::Result;
use crate::provider::ServiceHandle;
use crate::retry::{retry, retry_error, READ_RETRY_TIMEOUT};
use crate::service::models::{DatabaseObject, DatabasePrivilege};
use crate::service::PostgresqlService;
use crate::utils::{
    computed, computed_list, required, string, string_list_type, strings_list, text, ResultExt,
    WithSchema,
};

use super::{result_output_file, save_result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ObjectItem<'a> {
    #[serde(borrow = "'a")]
    pub object_type: ValueString<'a>,
    pub object_name: ValueString<'a>,
    pub database_name: ValueString<'a>,
    pub schema_name: ValueString<'a>,
    pub table_name: ValueString<'a>,
}

impl From<&DatabaseObject> for ObjectItem<'_> {
    fn from(object: &DatabaseObject) -> Self {
        Self {
            object_type: string(&object.object_type),
            object_name: string(&object.object_name),
            database_name: string(&object.database_name),
            schema_name: string(&object.schema_name),
            table_name: string(&object.table_name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PrivilegeItem<'a> {
    #[serde(borrow = "'a")]
    pub object: Value<ObjectItem<'a>>,
    pub privilege_set: ValueList<ValueString<'a>>,
}

impl From<&DatabasePrivilege> for PrivilegeItem<'_> {
    fn from(privilege: &DatabasePrivilege) -> Self {
        Self {
            object: Value::Value((&privilege.object).into()),
            privilege_set: strings_list(privilege.privilege_set.iter().cloned()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AccountPrivilegesState<'a> {
    #[serde(borrow = "'a")]
    pub db_instance_id: ValueString<'a>,
    pub user_name: ValueString<'a>,
    pub result_output_file: ValueString<'a>,
    pub privilege_set: ValueList<Value<PrivilegeItem<'a>>>,
}

impl WithSchema for AccountPrivilegesState<'_> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "db_instance_id" => required(AttributeType::String, "Instance of the account"),
                    "user_name" => required(AttributeType::String, "Name of the account"),
                    "result_output_file" => result_output_file(),
                    "privilege_set" => computed_list(
                        map! {
                            "object" => computed(
                                AttributeType::AttributeSingle(map! {
                                    "object_type" => computed(AttributeType::String, "Type of the object: account, database, schema, sequence, procedure, type, function, table, view, matview or column"),
                                    "object_name" => computed(AttributeType::String, "Name of the object"),
                                    "database_name" => computed(AttributeType::String, "Database of the object"),
                                    "schema_name" => computed(AttributeType::String, "Schema of the object"),
                                    "table_name" => computed(AttributeType::String, "Table of the object"),
                                }),
                                "Object the privileges apply to",
                            ),
                            "privilege_set" => computed(string_list_type(), "Privileges granted on the object"),
                        },
                        "Privileges of the account",
                    ),
                },
                description: Description::plain("List the privileges of a PostgreSQL account"),
                ..Default::default()
            },
        }
    }
}

impl<'a> AccountPrivilegesState<'a> {
    async fn fetch(&mut self, service: &PostgresqlService) -> Result<()> {
        let instance_id = text(&self.db_instance_id);
        let user_name = text(&self.user_name);
        let privileges = retry(READ_RETRY_TIMEOUT, || async {
            service
                .describe_account_privileges(instance_id, user_name)
                .await
                .map_err(|err| retry_error(err, &[]))
        })
        .await?;
        tracing::debug!(
            instance_id,
            user_name,
            count = privileges.len(),
            "postgresql account privileges listed"
        );
        self.privilege_set = Value::Value(
            privileges
                .iter()
                .map(|privilege| Value::Value(privilege.into()))
                .collect(),
        );
        save_result(&self.result_output_file, &self.privilege_set).await
    }
}

#[derive(Debug, Default)]
pub struct AccountPrivilegesDataSource {
    service: ServiceHandle,
}

impl AccountPrivilegesDataSource {
    pub fn new(service: ServiceHandle) -> Self {
        Self { service }
    }
}

#[async_trait]
impl DataSource for AccountPrivilegesDataSource {
    type State<'a> = AccountPrivilegesState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(AccountPrivilegesState::schema())
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
            .or_diag(diags, "Could not list the account privileges")?;
        Some(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privilege_item() {
        let privilege = DatabasePrivilege {
            object: DatabaseObject {
                object_type: "table".to_string(),
                object_name: "orders".to_string(),
                database_name: "shop".to_string(),
                schema_name: "public".to_string(),
                ..Default::default()
            },
            privilege_set: vec!["SELECT".to_string(), "INSERT".to_string()],
        };
        let item = PrivilegeItem::from(&privilege);
        let object = item.object.as_ref_option().unwrap();
        assert_eq!(object.object_name.as_deref_option(), Some("orders"));
        assert_eq!(object.table_name.as_deref_option(), Some(""));
        assert_eq!(
            item.privilege_set,
            strings_list(["SELECT".to_string(), "INSERT".to_string()])
        );
    }
}
