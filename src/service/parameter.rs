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

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::ApiError;

use super::models::{Filter, ParamEntry, ParamInfo, ParameterTemplate};
use super::PostgresqlService;

/// Template definition along with its parameters
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct ParameterTemplateAttributes {
    pub template_id: String,
    pub template_name: String,
    #[serde(rename = "DBMajorVersion")]
    pub db_major_version: String,
    #[serde(rename = "DBEngine")]
    pub db_engine: String,
    pub template_description: String,
    pub total_count: i64,
    pub param_info_set: Vec<ParamInfo>,
}

/// Changes applied by `ModifyParameterTemplate`
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ParameterTemplateChange {
    pub template_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modify_param_entry_set: Vec<ParamEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub delete_param_set: Vec<String>,
}

impl ParameterTemplateChange {
    pub fn is_empty(&self) -> bool {
        self.template_name.is_none()
            && self.template_description.is_none()
            && self.modify_param_entry_set.is_empty()
            && self.delete_param_set.is_empty()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct CreateParameterTemplateResponse {
    template_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DescribeParameterTemplatesResponse {
    total_count: i64,
    parameter_template_set: Vec<ParameterTemplate>,
}

#[derive(Debug, Default, Deserialize)]
struct Empty {}

impl PostgresqlService {
    /// Create an empty template and return its id
    pub async fn create_parameter_template(
        &self,
        name: &str,
        db_major_version: &str,
        db_engine: &str,
        description: &str,
    ) -> Result<String, ApiError> {
        let mut request = json!({
            "TemplateName": name,
            "DBMajorVersion": db_major_version,
            "DBEngine": db_engine,
        });
        if !description.is_empty() {
            request["TemplateDescription"] = json!(description);
        }
        let response: CreateParameterTemplateResponse =
            self.call("CreateParameterTemplate", &request).await?;
        Ok(response.template_id)
    }

    pub async fn modify_parameter_template(
        &self,
        change: &ParameterTemplateChange,
    ) -> Result<(), ApiError> {
        let _: Empty = self.call("ModifyParameterTemplate", change).await?;
        Ok(())
    }

    pub async fn describe_parameter_template(
        &self,
        template_id: &str,
    ) -> Result<ParameterTemplateAttributes, ApiError> {
        self.call(
            "DescribeParameterTemplateAttributes",
            &json!({ "TemplateId": template_id }),
        )
        .await
    }

    pub async fn describe_parameter_templates(
        &self,
        filters: &[Filter],
        order_by: &str,
        order_by_type: &str,
    ) -> Result<Vec<ParameterTemplate>, ApiError> {
        const LIMIT: usize = 20;
        let mut templates = Vec::new();
        let mut offset = 0;
        loop {
            let mut request = json!({ "Offset": offset, "Limit": LIMIT });
            if !filters.is_empty() {
                request["Filters"] = json!(filters);
            }
            if !order_by.is_empty() {
                request["OrderBy"] = json!(order_by);
            }
            if !order_by_type.is_empty() {
                request["OrderByType"] = json!(order_by_type);
            }
            let response: DescribeParameterTemplatesResponse =
                self.call("DescribeParameterTemplates", &request).await?;
            let count = response.parameter_template_set.len();
            tracing::trace!(total = response.total_count, count, offset, "templates page");
            templates.extend(response.parameter_template_set);
            if count < LIMIT {
                return Ok(templates);
            }
            offset += LIMIT;
        }
    }

    pub async fn delete_parameter_template(&self, template_id: &str) -> Result<(), ApiError> {
        let _: Empty = self
            .call(
                "DeleteParameterTemplate",
                &json!({ "TemplateId": template_id }),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_change_serialization() {
        let change = ParameterTemplateChange {
            template_id: "pgpt-1".to_string(),
            template_description: Some(String::new()),
            delete_param_set: vec!["timezone".to_string()],
            ..Default::default()
        };
        assert!(!change.is_empty());
        assert_eq!(
            serde_json::to_value(&change).unwrap(),
            json!({
                "TemplateId": "pgpt-1",
                "TemplateDescription": "",
                "DeleteParamSet": ["timezone"],
            })
        );

        let change = ParameterTemplateChange {
            template_id: "pgpt-1".to_string(),
            ..Default::default()
        };
        assert!(change.is_empty());
    }
}
