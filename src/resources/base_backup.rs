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
use tf_provider::value::{Value, ValueEmpty, ValueString};
use tf_provider::{map, AttributePath, Diagnostics, Resource};

use crate::error::{Error, Result};
use crate::id;
use crate::provider::ServiceHandle;
use crate::retry::{retry, retry_any, retry_error, RetryError, READ_RETRY_TIMEOUT, WRITE_RETRY_TIMEOUT};
use crate::service::models::BaseBackup;
use crate::service::{PostgresqlService, INSTANCE_STATUS_LIMIT};
use crate::utils::{computed, optional_computed, replace_if_changed, required, string, text, ResultExt, WithSchema};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BaseBackupState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub db_instance_id: ValueString<'a>,
    pub new_expire_time: ValueString<'a>,
    pub base_backup_id: ValueString<'a>,
}

impl WithSchema for BaseBackupState<'_> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "id" => computed(AttributeType::String, "Backup id, `instanceId#baseBackupId`"),
                    "db_instance_id" => required(AttributeType::String, "Instance to back up"),
                    "new_expire_time" => optional_computed(AttributeType::String, "Expiration time of the backup, like `2024-01-01 00:00:00`"),
                    "base_backup_id" => computed(AttributeType::String, "Id of the base backup"),
                },
                description: Description::plain("Full backup of a PostgreSQL instance"),
                ..Default::default()
            },
        }
    }
}

impl<'a> BaseBackupState<'a> {
    pub fn apply_backup(&mut self, backup: &BaseBackup) {
        self.db_instance_id = string(&backup.db_instance_id);
        self.base_backup_id = string(&backup.id);
        // A configured expiration keeps its own formatting
        if !self.new_expire_time.is_value() {
            self.new_expire_time = string(&backup.expire_time);
        }
    }

    async fn read(&mut self, service: &PostgresqlService) -> Result<bool> {
        let [_, backup_id] = id::split::<2>(text(&self.id))?;
        let backup_id = backup_id.to_string();
        let backup = retry(READ_RETRY_TIMEOUT, || async {
            service
                .describe_base_backup(&backup_id)
                .await
                .map_err(|err| retry_any(err, &[]))
        })
        .await?;
        match backup {
            Some(backup) => {
                self.apply_backup(&backup);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn modify_expire_time(&self, service: &PostgresqlService) -> Result<()> {
        let Some(expire_time) = self.new_expire_time.as_deref_option() else {
            return Ok(());
        };
        let instance_id = text(&self.db_instance_id);
        let backup_id = text(&self.base_backup_id);
        retry(WRITE_RETRY_TIMEOUT, || async {
            service
                .modify_base_backup_expire_time(instance_id, backup_id, expire_time)
                .await
                .map_err(|err| retry_error(err, &[INSTANCE_STATUS_LIMIT]))
        })
        .await
    }

    async fn create(&mut self, service: &PostgresqlService) -> Result<()> {
        let instance_id = text(&self.db_instance_id).to_string();
        let backup_id = retry(WRITE_RETRY_TIMEOUT, || async {
            service
                .create_base_backup(&instance_id)
                .await
                .map_err(|err| retry_error(err, &[INSTANCE_STATUS_LIMIT]))
        })
        .await?;
        tracing::info!(%instance_id, %backup_id, "postgresql base backup started");
        self.id = string(id::join(&[&instance_id, &backup_id]));
        self.base_backup_id = string(&backup_id);

        // The backup is listed a little after its creation
        retry(READ_RETRY_TIMEOUT, || async {
            match service.describe_base_backup(&backup_id).await {
                Ok(Some(_)) => Ok(()),
                Ok(None) => Err(RetryError::retryable(Error::unexpected(format!(
                    "base backup {backup_id} is not listed yet"
                )))),
                Err(err) => Err(retry_any(err, &[])),
            }
        })
        .await?;

        if self.new_expire_time.is_value() {
            self.modify_expire_time(service).await?;
        }
        Ok(())
    }

    async fn delete(&self, service: &PostgresqlService) -> Result<()> {
        let instance_id = text(&self.db_instance_id);
        let backup_id = text(&self.base_backup_id);
        service.delete_base_backup(instance_id, backup_id).await?;
        tracing::info!(instance_id, backup_id, "postgresql base backup deleted");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct BaseBackupResource {
    service: ServiceHandle,
}

impl BaseBackupResource {
    pub fn new(service: ServiceHandle) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Resource for BaseBackupResource {
    type State<'a> = BaseBackupState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(BaseBackupState::schema())
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
                diags.root_error("Could not read the base backup", err.to_string());
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
        state.base_backup_id = Value::Unknown;
        if state.new_expire_time.is_null() {
            state.new_expire_time = Value::Unknown;
        }
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
            created.or_diag(diags, "Could not create the base backup")?;
        } else if let Err(err) = created {
            diags.root_error("Could not configure the base backup", err.to_string());
        }
        if let Err(err) = state.read(&service).await {
            diags.root_error("Could not read the base backup", err.to_string());
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
        if planned_state.new_expire_time != prior_state.new_expire_time {
            if let Err(err) = planned_state.modify_expire_time(&service).await {
                diags.root_error("Could not update the base backup", err.to_string());
            }
        }
        let mut state = planned_state;
        if let Err(err) = state.read(&service).await {
            diags.root_error("Could not read the base backup", err.to_string());
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
            .or_diag(diags, "Could not delete the base backup")
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let service = self.service.get(diags).await?;
        let mut state = BaseBackupState {
            id: string(id.clone()),
            ..Default::default()
        };
        let found = state
            .read(&service)
            .await
            .or_diag(diags, "Could not import the base backup")?;
        if !found {
            diags.root_error(
                "Could not import the base backup",
                format!("postgresql base backup {id} not found"),
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
    fn test_apply_backup_keeps_configured_expiration() {
        let backup = BaseBackup {
            db_instance_id: "postgres-1".to_string(),
            id: "backup-1".to_string(),
            expire_time: "2024-06-01 00:00:00".to_string(),
            ..Default::default()
        };

        let mut state = BaseBackupState::default();
        state.apply_backup(&backup);
        assert_eq!(state.base_backup_id.as_deref_option(), Some("backup-1"));
        assert_eq!(state.new_expire_time.as_deref_option(), Some("2024-06-01 00:00:00"));

        let mut state = BaseBackupState {
            new_expire_time: "2024-06-01T00:00:00+08:00".into(),
            ..Default::default()
        };
        state.apply_backup(&backup);
        assert_eq!(
            state.new_expire_time.as_deref_option(),
            Some("2024-06-01T00:00:00+08:00")
        );
    }
}
