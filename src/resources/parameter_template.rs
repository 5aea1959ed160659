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
use tf_provider::schema::{AttributeType, Block, Description, NestedBlock, Schema};
use tf_provider::value::{Value, ValueBool, ValueEmpty, ValueList, ValueNumber, ValueSet, ValueString};
use tf_provider::{map, AttributePath, Diagnostics, Resource};

use crate::error::Result;
use crate::provider::ServiceHandle;
use crate::retry::{retry, retry_error, READ_RETRY_TIMEOUT, WRITE_RETRY_TIMEOUT};
use crate::service::models::{ParamEntry, ParamInfo};
use crate::service::{ParameterTemplateAttributes, ParameterTemplateChange, PostgresqlService};
use crate::utils::{
    computed, computed_list, immutable, no_errors, non_empty, optional, required, set_strings,
    string, string_list_type, string_set_type, strings_list, text, ResultExt, WithSchema,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ParamEntryState<'a> {
    #[serde(borrow = "'a")]
    pub name: ValueString<'a>,
    pub expected_value: ValueString<'a>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ParamInfoState<'a> {
    pub id: ValueNumber,
    #[serde(borrow = "'a")]
    pub name: ValueString<'a>,
    pub param_value_type: ValueString<'a>,
    pub unit: ValueString<'a>,
    pub default_value: ValueString<'a>,
    pub current_value: ValueString<'a>,
    pub max: Value<f64>,
    pub min: Value<f64>,
    pub enum_value: ValueList<ValueString<'a>>,
    pub need_reboot: ValueBool,
    pub classification_en: ValueString<'a>,
    pub param_description_en: ValueString<'a>,
    pub last_modify_time: ValueString<'a>,
    pub advanced: ValueBool,
    pub spec_related: ValueBool,
    pub standby_related: ValueNumber,
}

impl ParamInfoState<'_> {
    fn from_param(param: &ParamInfo) -> Self {
        Self {
            id: Value::Value(param.id),
            name: string(&param.name),
            param_value_type: string(&param.param_value_type),
            unit: string(&param.unit),
            default_value: string(&param.default_value),
            current_value: string(&param.current_value),
            max: Value::Value(param.max),
            min: Value::Value(param.min),
            enum_value: strings_list(param.enum_value.iter().cloned()),
            need_reboot: Value::Value(param.need_reboot),
            classification_en: string(&param.classification_en),
            param_description_en: string(&param.param_description_en),
            last_modify_time: string(&param.last_modify_time),
            advanced: Value::Value(param.advanced),
            spec_related: Value::Value(param.spec_related),
            standby_related: Value::Value(param.standby_related),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ParameterTemplateState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub template_name: ValueString<'a>,
    pub db_major_version: ValueString<'a>,
    pub db_engine: ValueString<'a>,
    pub template_description: ValueString<'a>,
    pub modify_param_entry_set: ValueList<Value<ParamEntryState<'a>>>,
    pub delete_param_set: ValueSet<ValueString<'a>>,
    pub param_info_set: ValueList<Value<ParamInfoState<'a>>>,
}

impl WithSchema for ParameterTemplateState<'_> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "id" => computed(AttributeType::String, "Template id"),
                    "template_name" => required(AttributeType::String, "Name of the template"),
                    "db_major_version" => required(AttributeType::String, "Major version the template applies to, like `13`"),
                    "db_engine" => required(AttributeType::String, "Engine of the template: postgresql or mssql_compatible"),
                    "template_description" => optional(AttributeType::String, "Description of the template"),
                    "delete_param_set" => optional(string_set_type(), "Parameters removed from the template"),
                    "param_info_set" => computed_list(
                        map! {
                            "id" => computed(AttributeType::Number, "Parameter id"),
                            "name" => computed(AttributeType::String, "Parameter name"),
                            "param_value_type" => computed(AttributeType::String, "Type of the value: integer, real, bool, enum or mutil_enum"),
                            "unit" => computed(AttributeType::String, "Unit of the value"),
                            "default_value" => computed(AttributeType::String, "Default value"),
                            "current_value" => computed(AttributeType::String, "Value in the template"),
                            "max" => computed(AttributeType::Number, "Maximum of a numeric value"),
                            "min" => computed(AttributeType::Number, "Minimum of a numeric value"),
                            "enum_value" => computed(string_list_type(), "Allowed values of an enum"),
                            "need_reboot" => computed(AttributeType::Bool, "Whether a change requires a restart"),
                            "classification_en" => computed(AttributeType::String, "Category of the parameter"),
                            "param_description_en" => computed(AttributeType::String, "Description of the parameter"),
                            "last_modify_time" => computed(AttributeType::String, "Last modification time"),
                            "advanced" => computed(AttributeType::Bool, "Whether the parameter is advanced"),
                            "spec_related" => computed(AttributeType::Bool, "Whether the value depends on the instance spec"),
                            "standby_related" => computed(AttributeType::Number, "Primary and standby relation of the parameter"),
                        },
                        "Parameters of the template",
                    ),
                },
                blocks: map! {
                    "modify_param_entry_set" => NestedBlock::List(Block {
                        attributes: map! {
                            "name" => required(AttributeType::String, "Parameter name"),
                            "expected_value" => required(AttributeType::String, "Value of the parameter"),
                        },
                        description: Description::plain("Parameters set in the template"),
                        ..Default::default()
                    }),
                },
                description: Description::plain("Parameter template of PostgreSQL instances"),
                ..Default::default()
            },
        }
    }
}

impl<'a> ParameterTemplateState<'a> {
    fn entries(&self) -> Vec<ParamEntry> {
        self.modify_param_entry_set
            .iter()
            .flatten()
            .flatten()
            .map(|entry| ParamEntry {
                name: text(&entry.name).to_string(),
                expected_value: text(&entry.expected_value).to_string(),
            })
            .collect()
    }

    /// Changes bringing the template from `prior` to this state
    pub fn change(&self, prior: &Self) -> ParameterTemplateChange {
        let mut change = ParameterTemplateChange {
            template_id: text(&prior.id).to_string(),
            ..Default::default()
        };
        if self.template_name != prior.template_name {
            change.template_name = Some(text(&self.template_name).to_string());
        }
        if self.template_description != prior.template_description {
            change.template_description = Some(text(&self.template_description).to_string());
        }
        if self.modify_param_entry_set != prior.modify_param_entry_set {
            change.modify_param_entry_set = self.entries();
        }
        if self.delete_param_set != prior.delete_param_set {
            change.delete_param_set = set_strings(&self.delete_param_set);
        }
        change
    }

    pub fn apply_template(&mut self, template: &ParameterTemplateAttributes) {
        self.template_name = string(&template.template_name);
        self.db_major_version = string(&template.db_major_version);
        self.db_engine = string(&template.db_engine);
        self.template_description = non_empty(&template.template_description);
        self.param_info_set = Value::Value(
            template
                .param_info_set
                .iter()
                .map(|param| Value::Value(ParamInfoState::from_param(param)))
                .collect(),
        );
    }

    async fn read(&mut self, service: &PostgresqlService) -> Result<bool> {
        let template_id = text(&self.id).to_string();
        let template = retry(READ_RETRY_TIMEOUT, || async {
            match service.describe_parameter_template(&template_id).await {
                Err(err) if err.code().is_some_and(|code| code.starts_with("ResourceNotFound")) => {
                    Ok(None)
                }
                result => result.map(Some).map_err(|err| retry_error(err, &[])),
            }
        })
        .await?;
        match template {
            Some(template) if !template.template_id.is_empty() => {
                self.apply_template(&template);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn modify(service: &PostgresqlService, change: &ParameterTemplateChange) -> Result<()> {
        if change.is_empty() {
            return Ok(());
        }
        retry(WRITE_RETRY_TIMEOUT, || async {
            service
                .modify_parameter_template(change)
                .await
                .map_err(|err| retry_error(err, &[]))
        })
        .await
    }

    async fn create(&mut self, service: &PostgresqlService) -> Result<()> {
        let template_id = retry(WRITE_RETRY_TIMEOUT, || async {
            service
                .create_parameter_template(
                    text(&self.template_name),
                    text(&self.db_major_version),
                    text(&self.db_engine),
                    text(&self.template_description),
                )
                .await
                .map_err(|err| retry_error(err, &[]))
        })
        .await?;
        tracing::info!(%template_id, "postgresql parameter template created");
        self.id = string(&template_id);

        let change = ParameterTemplateChange {
            template_id,
            modify_param_entry_set: self.entries(),
            delete_param_set: set_strings(&self.delete_param_set),
            ..Default::default()
        };
        Self::modify(service, &change).await
    }

    async fn delete(&self, service: &PostgresqlService) -> Result<()> {
        let template_id = text(&self.id);
        retry(WRITE_RETRY_TIMEOUT, || async {
            service
                .delete_parameter_template(template_id)
                .await
                .map_err(|err| retry_error(err, &[]))
        })
        .await?;
        tracing::info!(template_id, "postgresql parameter template deleted");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ParameterTemplateResource {
    service: ServiceHandle,
}

impl ParameterTemplateResource {
    pub fn new(service: ServiceHandle) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Resource for ParameterTemplateResource {
    type State<'a> = ParameterTemplateState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(ParameterTemplateState::schema())
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
                diags.root_error("Could not read the parameter template", err.to_string());
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
        state.param_info_set = Value::Unknown;
        Some((state, Default::default()))
    }

    async fn plan_update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>, Vec<AttributePath>)> {
        let mut state = proposed_state;
        immutable(diags, "db_major_version", &prior_state.db_major_version, &state.db_major_version);
        immutable(diags, "db_engine", &prior_state.db_engine, &state.db_engine);
        no_errors(diags)?;
        if !state.change(&prior_state).is_empty() {
            state.param_info_set = Value::Unknown;
        }
        Some((state, prior_private_state, vec![]))
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
            created.or_diag(diags, "Could not create the parameter template")?;
        } else if let Err(err) = created {
            diags.root_error("Could not set the template parameters", err.to_string());
        }
        if let Err(err) = state.read(&service).await {
            diags.root_error("Could not read the parameter template", err.to_string());
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
        let change = planned_state.change(&prior_state);
        if let Err(err) = ParameterTemplateState::modify(&service, &change).await {
            diags.root_error("Could not update the parameter template", err.to_string());
        }
        let mut state = planned_state;
        if let Err(err) = state.read(&service).await {
            diags.root_error("Could not read the parameter template", err.to_string());
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
            .or_diag(diags, "Could not delete the parameter template")
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let service = self.service.get(diags).await?;
        let mut state = ParameterTemplateState {
            id: string(id.clone()),
            ..Default::default()
        };
        let found = state
            .read(&service)
            .await
            .or_diag(diags, "Could not import the parameter template")?;
        if !found {
            diags.root_error(
                "Could not import the parameter template",
                format!("postgresql parameter template {id} not found"),
            );
            return None;
        }
        Some((state, Default::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::strings_set;

    fn entry<'a>(name: &'a str, value: &'a str) -> Value<ParamEntryState<'a>> {
        Value::Value(ParamEntryState {
            name: name.into(),
            expected_value: value.into(),
        })
    }

    #[test]
    fn test_change_only_carries_updates() {
        let prior = ParameterTemplateState {
            id: "pgpt-1".into(),
            template_name: "tuned".into(),
            template_description: "for tests".into(),
            modify_param_entry_set: Value::Value(vec![entry("timezone", "UTC")]),
            ..Default::default()
        };
        let mut state = prior.clone();
        assert!(state.change(&prior).is_empty());

        state.template_name = "tuned-2".into();
        state.modify_param_entry_set =
            Value::Value(vec![entry("timezone", "UTC"), entry("lock_timeout", "100")]);
        state.delete_param_set = strings_set(["max_wal_size".to_string()]);
        let change = state.change(&prior);
        assert_eq!(change.template_id, "pgpt-1");
        assert_eq!(change.template_name.as_deref(), Some("tuned-2"));
        assert_eq!(change.template_description, None);
        assert_eq!(change.modify_param_entry_set.len(), 2);
        assert_eq!(change.modify_param_entry_set[1].name, "lock_timeout");
        assert_eq!(change.delete_param_set, vec!["max_wal_size".to_string()]);
    }

    #[test]
    fn test_apply_template() {
        let template = ParameterTemplateAttributes {
            template_id: "pgpt-1".to_string(),
            template_name: "tuned".to_string(),
            db_major_version: "13".to_string(),
            db_engine: "postgresql".to_string(),
            param_info_set: vec![ParamInfo {
                name: "timezone".to_string(),
                current_value: "UTC".to_string(),
                need_reboot: true,
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut state = ParameterTemplateState::default();
        state.apply_template(&template);
        assert_eq!(state.db_major_version.as_deref_option(), Some("13"));
        assert_eq!(state.template_description, Value::Null);
        let params = state.param_info_set.as_ref_option().unwrap();
        let param = params[0].as_ref_option().unwrap();
        assert_eq!(param.current_value.as_deref_option(), Some("UTC"));
        assert_eq!(param.need_reboot, Value::Value(true));
    }
}
