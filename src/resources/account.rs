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
use tf_provider::value::{Value, ValueBool, ValueEmpty, ValueString};
use tf_provider::{map, AttributePath, Diagnostics, Resource};

use crate::error::Result;
use crate::id;
use crate::provider::ServiceHandle;
use crate::retry::{retry, retry_error, READ_RETRY_TIMEOUT, WRITE_RETRY_TIMEOUT};
use crate::service::models::AccountInfo;
use crate::service::{PostgresqlService, ACCOUNT_STATUS_LOCKED, INSTANCE_NOT_FOUND, INSTANCE_STATUS_LIMIT};
use crate::utils::{
    computed, flag, no_errors, non_empty, optional, optional_computed, replace_if_changed,
    required, sensitive, string, text, ResultExt, WithSchema,
};

pub const ACCOUNT_TYPE_NORMAL: &str = "normal";
pub const ACCOUNT_TYPE_SUPER: &str = "tencentDBSuper";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AccountState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub db_instance_id: ValueString<'a>,
    pub user_name: ValueString<'a>,
    pub password: ValueString<'a>,
    #[serde(rename = "type")]
    pub account_type: ValueString<'a>,
    pub remark: ValueString<'a>,
    pub lock_status: ValueBool,
}

impl WithSchema for AccountState<'_> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "id" => computed(AttributeType::String, "Account id, `instanceId#userName`"),
                    "db_instance_id" => required(AttributeType::String, "Instance holding the account"),
                    "user_name" => required(AttributeType::String, "Name of the account"),
                    "password" => sensitive(required(AttributeType::String, "Password of the account")),
                    "type" => required(AttributeType::String, "Type of the account: normal or tencentDBSuper"),
                    "remark" => optional(AttributeType::String, "Remark of the account"),
                    "lock_status" => optional_computed(AttributeType::Bool, "Whether the account is locked, false by default"),
                },
                description: Description::plain("Database account of a PostgreSQL instance"),
                ..Default::default()
            },
        }
    }
}

impl<'a> AccountState<'a> {
    fn validate(&self, diags: &mut Diagnostics) {
        if let Some(account_type) = self.account_type.as_deref_option() {
            if !matches!(account_type, ACCOUNT_TYPE_NORMAL | ACCOUNT_TYPE_SUPER) {
                diags.error(
                    "Invalid type",
                    format!("`type` must be {ACCOUNT_TYPE_NORMAL} or {ACCOUNT_TYPE_SUPER}, got {account_type:?}"),
                    AttributePath::new("type"),
                );
            }
        }
    }

    pub fn apply_account(&mut self, account: &AccountInfo) {
        self.db_instance_id = string(&account.db_instance_id);
        self.user_name = string(&account.user_name);
        self.remark = non_empty(&account.remark);
        if !account.user_type.is_empty() {
            self.account_type = string(&account.user_type);
        }
        self.lock_status = Value::Value(account.status == ACCOUNT_STATUS_LOCKED);
    }

    async fn read(&mut self, service: &PostgresqlService) -> Result<bool> {
        let [instance_id, user_name] = id::split::<2>(text(&self.id))?;
        let (instance_id, user_name) = (instance_id.to_string(), user_name.to_string());
        let account = retry(READ_RETRY_TIMEOUT, || async {
            match service.describe_account(&instance_id, &user_name).await {
                Err(err) if err.code() == Some(INSTANCE_NOT_FOUND) => Ok(None),
                result => result.map_err(|err| retry_error(err, &[])),
            }
        })
        .await?;
        match account {
            Some(account) => {
                self.apply_account(&account);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn write<F, Fut>(f: F) -> Result<()>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<(), crate::api::ApiError>>,
    {
        retry(WRITE_RETRY_TIMEOUT, || async {
            f().await.map_err(|err| retry_error(err, &[INSTANCE_STATUS_LIMIT]))
        })
        .await
    }

    async fn create(&mut self, service: &PostgresqlService) -> Result<()> {
        let instance_id = text(&self.db_instance_id).to_string();
        let user_name = text(&self.user_name).to_string();
        Self::write(|| {
            service.create_account(
                &instance_id,
                &user_name,
                text(&self.password),
                text(&self.account_type),
                text(&self.remark),
            )
        })
        .await?;
        let account_id = id::join(&[&instance_id, &user_name]);
        tracing::info!(%account_id, "postgresql account created");
        self.id = string(account_id);

        if flag(&self.lock_status) {
            Self::write(|| service.set_account_lock(&instance_id, &user_name, true)).await?;
        }
        Ok(())
    }

    async fn update(&self, prior: &Self, service: &PostgresqlService) -> Result<()> {
        let instance_id = text(&self.db_instance_id);
        let user_name = text(&self.user_name);
        if self.password != prior.password {
            Self::write(|| service.reset_account_password(instance_id, user_name, text(&self.password)))
                .await?;
        }
        if self.remark != prior.remark {
            Self::write(|| service.modify_account_remark(instance_id, user_name, text(&self.remark)))
                .await?;
        }
        if self.lock_status != prior.lock_status && self.lock_status.is_value() {
            let locked = flag(&self.lock_status);
            Self::write(|| service.set_account_lock(instance_id, user_name, locked)).await?;
        }
        Ok(())
    }

    async fn delete(&self, service: &PostgresqlService) -> Result<()> {
        let instance_id = text(&self.db_instance_id);
        let user_name = text(&self.user_name);
        retry(WRITE_RETRY_TIMEOUT, || async {
            match service.delete_account(instance_id, user_name).await {
                Err(err) if err.code() == Some(INSTANCE_NOT_FOUND) => Ok(()),
                result => result.map_err(|err| retry_error(err, &[INSTANCE_STATUS_LIMIT])),
            }
        })
        .await?;
        tracing::info!(instance_id, user_name, "postgresql account deleted");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct AccountResource {
    service: ServiceHandle,
}

impl AccountResource {
    pub fn new(service: ServiceHandle) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Resource for AccountResource {
    type State<'a> = AccountState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(AccountState::schema())
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
                diags.root_error("Could not read the account", err.to_string());
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
        state.id = Value::Unknown;
        if config_state.lock_status.is_null() {
            state.lock_status = Value::Value(false);
        }
        Some((state, Default::default()))
    }

    async fn plan_update<'a>(
        &self,
        _diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        proposed_state: Self::State<'a>,
        config_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>, Vec<AttributePath>)> {
        let mut state = proposed_state;
        if config_state.lock_status.is_null() {
            state.lock_status = Value::Value(false);
        }
        let mut replace = Vec::new();
        replace_if_changed(&mut replace, "db_instance_id", &prior_state.db_instance_id, &state.db_instance_id);
        replace_if_changed(&mut replace, "user_name", &prior_state.user_name, &state.user_name);
        replace_if_changed(&mut replace, "type", &prior_state.account_type, &state.account_type);
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
            created.or_diag(diags, "Could not create the account")?;
        } else if let Err(err) = created {
            diags.root_error("Could not configure the account", err.to_string());
        }
        if let Err(err) = state.read(&service).await {
            diags.root_error("Could not read the account", err.to_string());
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
            diags.root_error("Could not update the account", err.to_string());
        }
        let mut state = planned_state;
        if let Err(err) = state.read(&service).await {
            diags.root_error("Could not read the account", err.to_string());
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
            .or_diag(diags, "Could not delete the account")
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let service = self.service.get(diags).await?;
        let mut state = AccountState {
            id: string(id.clone()),
            ..Default::default()
        };
        let found = state
            .read(&service)
            .await
            .or_diag(diags, "Could not import the account")?;
        if !found {
            diags.root_error(
                "Could not import the account",
                format!("postgresql account {id} not found"),
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
    fn test_apply_account() {
        let account = AccountInfo {
            db_instance_id: "postgres-1".to_string(),
            user_name: "app".to_string(),
            status: ACCOUNT_STATUS_LOCKED,
            user_type: ACCOUNT_TYPE_NORMAL.to_string(),
            ..Default::default()
        };
        let mut state = AccountState {
            password: "secret".into(),
            ..Default::default()
        };
        state.apply_account(&account);
        assert_eq!(state.user_name.as_deref_option(), Some("app"));
        assert_eq!(state.account_type.as_deref_option(), Some("normal"));
        assert_eq!(state.remark, Value::Null);
        assert_eq!(state.lock_status, Value::Value(true));
        assert_eq!(state.password.as_deref_option(), Some("secret"));
    }

    #[test]
    fn test_validate_type() {
        let mut diags = Diagnostics::default();
        AccountState {
            account_type: "admin".into(),
            ..Default::default()
        }
        .validate(&mut diags);
        assert_eq!(diags.errors.len(), 1);

        let mut diags = Diagnostics::default();
        AccountState {
            account_type: ACCOUNT_TYPE_SUPER.into(),
            ..Default::default()
        }
        .validate(&mut diags);
        assert!(diags.errors.is_empty());
    }
}
