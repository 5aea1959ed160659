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
use tf_provider::{map, AttributePath, Diagnostics, Resource};

use crate::error::Result;
use crate::provider::ServiceHandle;
use crate::retry::{retry, retry_error, READ_RETRY_TIMEOUT, WRITE_RETRY_TIMEOUT};
use crate::service::models::{BackupPlan, ModifyBackupPlanRequest};
use crate::service::{
    backup_period_days, PostgresqlService, BACKUP_PERIOD_TYPE_WEEK, INSTANCE_NOT_FOUND,
    INSTANCE_STATUS_LIMIT,
};
use crate::utils::{
    computed, list_strings, non_empty, optional_computed, replace_if_changed, required,
    string, string_list_type, strings_list, text, unknown_if_null, ResultExt, WithSchema,
};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BackupPlanConfigState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub db_instance_id: ValueString<'a>,
    pub min_backup_start_time: ValueString<'a>,
    pub max_backup_start_time: ValueString<'a>,
    pub base_backup_retention_period: ValueNumber,
    pub backup_period: ValueList<ValueString<'a>>,
}

impl WithSchema for BackupPlanConfigState<'_> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "id" => computed(AttributeType::String, "Instance id"),
                    "db_instance_id" => required(AttributeType::String, "Instance whose backup plan is managed"),
                    "min_backup_start_time" => optional_computed(AttributeType::String, "Earliest start time of a backup"),
                    "max_backup_start_time" => optional_computed(AttributeType::String, "Latest start time of a backup"),
                    "base_backup_retention_period" => optional_computed(AttributeType::Number, "Retention of base backups, in days"),
                    "backup_period" => optional_computed(string_list_type(), "Week days of the backups, like `monday`"),
                },
                description: Description::plain("Weekly backup plan of a PostgreSQL instance"),
                ..Default::default()
            },
        }
    }
}

/// Plan driven by the resource: the weekly one, or the only one
fn main_plan(plans: &[BackupPlan]) -> Option<&BackupPlan> {
    plans
        .iter()
        .find(|plan| plan.backup_period_type == BACKUP_PERIOD_TYPE_WEEK)
        .or_else(|| plans.first())
}

impl<'a> BackupPlanConfigState<'a> {
    pub fn apply_plan(&mut self, plan: &BackupPlan) -> Result<()> {
        self.min_backup_start_time = non_empty(&plan.min_backup_start_time);
        self.max_backup_start_time = non_empty(&plan.max_backup_start_time);
        self.base_backup_retention_period = Value::Value(plan.base_backup_retention_period);
        self.backup_period = strings_list(backup_period_days(plan)?);
        Ok(())
    }

    fn request(&self, plan_id: String) -> ModifyBackupPlanRequest {
        ModifyBackupPlanRequest {
            db_instance_id: text(&self.db_instance_id).to_string(),
            plan_id,
            min_backup_start_time: text(&self.min_backup_start_time).to_string(),
            max_backup_start_time: text(&self.max_backup_start_time).to_string(),
            base_backup_retention_period: self.base_backup_retention_period.as_ref_option().copied(),
            backup_period: list_strings(&self.backup_period),
        }
    }

    async fn plans(&self, service: &PostgresqlService) -> Result<Option<Vec<BackupPlan>>> {
        let instance_id = text(&self.id);
        retry(READ_RETRY_TIMEOUT, || async {
            match service.describe_backup_plans(instance_id).await {
                Err(err) if err.code() == Some(INSTANCE_NOT_FOUND) => Ok(None),
                result => result.map(Some).map_err(|err| retry_error(err, &[])),
            }
        })
        .await
    }

    async fn read(&mut self, service: &PostgresqlService) -> Result<bool> {
        let Some(plans) = self.plans(service).await? else {
            return Ok(false);
        };
        self.db_instance_id = self.id.clone();
        if let Some(plan) = main_plan(&plans) {
            self.apply_plan(plan)?;
        }
        Ok(true)
    }

    async fn apply(&self, service: &PostgresqlService) -> Result<()> {
        let plan_id = self
            .plans(service)
            .await?
            .and_then(|plans| main_plan(&plans).map(|plan| plan.plan_id.clone()))
            .unwrap_or_default();
        let request = self.request(plan_id);
        retry(WRITE_RETRY_TIMEOUT, || async {
            service
                .modify_backup_plan(&request)
                .await
                .map_err(|err| retry_error(err, &[INSTANCE_STATUS_LIMIT]))
        })
        .await?;
        tracing::info!(instance_id = text(&self.id), "postgresql backup plan updated");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct BackupPlanConfigResource {
    service: ServiceHandle,
}

impl BackupPlanConfigResource {
    pub fn new(service: ServiceHandle) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Resource for BackupPlanConfigResource {
    type State<'a> = BackupPlanConfigState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(BackupPlanConfigState::schema())
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
                diags.root_error("Could not read the backup plan", err.to_string());
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
        state.id = state.db_instance_id.clone();
        unknown_if_null(&mut state.min_backup_start_time);
        unknown_if_null(&mut state.max_backup_start_time);
        unknown_if_null(&mut state.base_backup_retention_period);
        unknown_if_null(&mut state.backup_period);
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
        state.id = state.db_instance_id.clone();
        state
            .apply(&service)
            .await
            .or_diag(diags, "Could not configure the backup plan")?;
        if let Err(err) = state.read(&service).await {
            diags.root_error("Could not read the backup plan", err.to_string());
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
            diags.root_error("Could not update the backup plan", err.to_string());
        }
        let mut state = planned_state;
        if let Err(err) = state.read(&service).await {
            diags.root_error("Could not read the backup plan", err.to_string());
        }
        Some((state, planned_private_state))
    }

    /// The plan lives as long as its instance
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
        let mut state = BackupPlanConfigState {
            id: string(id.clone()),
            ..Default::default()
        };
        let found = state
            .read(&service)
            .await
            .or_diag(diags, "Could not import the backup plan")?;
        if !found {
            diags.root_error(
                "Could not import the backup plan",
                format!("postgresql instance {id} not found"),
            );
            return None;
        }
        Some((state, Default::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(period_type: &str, plan_id: &str) -> BackupPlan {
        BackupPlan {
            backup_period_type: period_type.to_string(),
            plan_id: plan_id.to_string(),
            backup_period: r#"["monday","friday"]"#.to_string(),
            base_backup_retention_period: 7,
            ..Default::default()
        }
    }

    #[test]
    fn test_main_plan() {
        let plans = vec![plan("month", "plan-month"), plan("week", "plan-week")];
        assert_eq!(main_plan(&plans).unwrap().plan_id, "plan-week");
        assert_eq!(main_plan(&plans[..1]).unwrap().plan_id, "plan-month");
        assert!(main_plan(&[]).is_none());
    }

    #[test]
    fn test_apply_plan_and_request() {
        let mut state = BackupPlanConfigState {
            id: "postgres-1".into(),
            db_instance_id: "postgres-1".into(),
            ..Default::default()
        };
        state.apply_plan(&plan("week", "plan-week")).unwrap();
        assert_eq!(state.base_backup_retention_period, Value::Value(7));
        assert_eq!(state.min_backup_start_time, Value::Null);

        let request = state.request("plan-week".to_string());
        assert_eq!(request.db_instance_id, "postgres-1");
        assert_eq!(request.backup_period, vec!["monday", "friday"]);
        assert_eq!(request.base_backup_retention_period, Some(7));
    }

    #[test]
    fn test_malformed_period() {
        let mut state = BackupPlanConfigState::default();
        let plan = BackupPlan {
            backup_period: "monday".to_string(),
            ..Default::default()
        };
        assert!(state.apply_plan(&plan).is_err());
    }
}
