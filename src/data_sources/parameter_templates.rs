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
use crate::service::models::ParameterTemplate;
use crate::service::PostgresqlService;
use crate::utils::{computed, computed_list, optional, string, text, ResultExt, WithSchema};

use super::{filters_block, result_output_file, save_result, to_filters, Filters};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TemplateItem<'a> {
    #[serde(borrow = "'a")]
    pub template_id: ValueString<'a>,
    pub template_name: ValueString<'a>,
    pub db_major_version: ValueString<'a>,
    pub db_engine: ValueString<'a>,
    pub template_description: ValueString<'a>,
}

impl From<&ParameterTemplate> for TemplateItem<'_> {
    fn from(template: &ParameterTemplate) -> Self {
        Self {
            template_id: string(&template.template_id),
            template_name: string(&template.template_name),
            db_major_version: string(&template.db_major_version),
            db_engine: string(&template.db_engine),
            template_description: string(&template.template_description),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ParameterTemplatesState<'a> {
    #[serde(borrow = "'a")]
    pub filters: Filters<'a>,
    pub order_by: ValueString<'a>,
    pub order_by_type: ValueString<'a>,
    pub result_output_file: ValueString<'a>,
    pub list: ValueList<Value<TemplateItem<'a>>>,
}

impl WithSchema for ParameterTemplatesState<'_> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "order_by" => optional(AttributeType::String, "Sort key: CreateTime, TemplateName or DBMajorVersion"),
                    "order_by_type" => optional(AttributeType::String, "Sort order: asc or desc"),
                    "result_output_file" => result_output_file(),
                    "list" => computed_list(
                        map! {
                            "template_id" => computed(AttributeType::String, "Template id"),
                            "template_name" => computed(AttributeType::String, "Template name"),
                            "db_major_version" => computed(AttributeType::String, "Major version the template applies to"),
                            "db_engine" => computed(AttributeType::String, "Engine the template applies to"),
                            "template_description" => computed(AttributeType::String, "Description of the template"),
                        },
                        "Parameter templates matching the filters",
                    ),
                },
                blocks: map! {
                    "filters" => filters_block(),
                },
                description: Description::plain("List PostgreSQL parameter templates"),
                ..Default::default()
            },
        }
    }
}

impl<'a> ParameterTemplatesState<'a> {
    async fn fetch(&mut self, service: &PostgresqlService) -> Result<()> {
        let filters = to_filters(&self.filters);
        let order_by = text(&self.order_by);
        let order_by_type = text(&self.order_by_type);
        let templates = retry(READ_RETRY_TIMEOUT, || async {
            service
                .describe_parameter_templates(&filters, order_by, order_by_type)
                .await
                .map_err(|err| retry_error(err, &[]))
        })
        .await?;
        tracing::debug!(count = templates.len(), "postgresql parameter templates listed");
        self.list = Value::Value(
            templates
                .iter()
                .map(|template| Value::Value(template.into()))
                .collect(),
        );
        save_result(&self.result_output_file, &self.list).await
    }
}

#[derive(Debug, Default)]
pub struct ParameterTemplatesDataSource {
    service: ServiceHandle,
}

impl ParameterTemplatesDataSource {
    pub fn new(service: ServiceHandle) -> Self {
        Self { service }
    }
}

#[async_trait]
impl DataSource for ParameterTemplatesDataSource {
    type State<'a> = ParameterTemplatesState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(ParameterTemplatesState::schema())
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
            .or_diag(diags, "Could not list the parameter templates")?;
        Some(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_item() {
        let template = ParameterTemplate {
            template_id: "tpl-1".to_string(),
            template_name: "tuned".to_string(),
            db_major_version: "13".to_string(),
            db_engine: "postgresql".to_string(),
            template_description: String::new(),
        };
        let item = TemplateItem::from(&template);
        assert_eq!(item.template_id.as_deref_option(), Some("tpl-1"));
        assert_eq!(item.db_major_version.as_deref_option(), Some("13"));
        assert_eq!(item.template_description.as_deref_option(), Some(""));
    }
}
