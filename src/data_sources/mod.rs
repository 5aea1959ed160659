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

//! Terraform data sources of the provider

use serde::{Deserialize, Serialize};
use tf_provider::schema::{AttributeType, Block, Description, NestedBlock};
use tf_provider::value::{Value, ValueList, ValueString};
use tf_provider::map;

use crate::error::{Error, Result};
use crate::service::models::Filter;
use crate::utils::{list_strings, optional, required, string_list_type, text};

mod account_privileges;
mod base_backups;
mod catalog;
mod instances;
mod parameter_templates;
mod readonly_groups;

pub use account_privileges::AccountPrivilegesDataSource;
pub use base_backups::BaseBackupsDataSource;
pub use catalog::{DbVersionsDataSource, RegionsDataSource, SpecInfosDataSource, ZonesDataSource};
pub use instances::InstancesDataSource;
pub use parameter_templates::ParameterTemplatesDataSource;
pub use readonly_groups::ReadonlyGroupsDataSource;

/// API side filter given in a `filters` block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FilterState<'a> {
    #[serde(borrow = "'a")]
    pub name: ValueString<'a>,
    pub values: ValueList<ValueString<'a>>,
}

pub(crate) type Filters<'a> = ValueList<Value<FilterState<'a>>>;

pub(crate) fn filters_block() -> NestedBlock {
    NestedBlock::List(Block {
        attributes: map! {
            "name" => required(AttributeType::String, "Name of the filter"),
            "values" => required(string_list_type(), "Accepted values"),
        },
        description: Description::plain("Filters of the listing"),
        ..Default::default()
    })
}

pub(crate) fn to_filters(filters: &Filters<'_>) -> Vec<Filter> {
    filters
        .iter()
        .flatten()
        .flatten()
        .map(|filter| Filter {
            name: text(&filter.name).to_string(),
            values: list_strings(&filter.values),
        })
        .collect()
}

pub(crate) fn result_output_file() -> tf_provider::schema::Attribute {
    optional(AttributeType::String, "File where the results are saved as JSON")
}

/// Save `result` as JSON when an output file is configured
pub(crate) async fn save_result<T: Serialize>(path: &ValueString<'_>, result: &T) -> Result<()> {
    let Some(path) = path.as_deref_option().filter(|path| !path.is_empty()) else {
        return Ok(());
    };
    let content = serde_json::to_string_pretty(result)
        .map_err(|err| Error::unexpected(format!("could not encode results: {err}")))?;
    tokio::fs::write(path, content)
        .await
        .map_err(|err| Error::invalid(format!("could not write results to {path}: {err}")))?;
    tracing::debug!(path, "data source results saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::strings_list;

    #[test]
    fn test_to_filters() {
        let filters: Filters = Value::Value(vec![Value::Value(FilterState {
            name: "read-only-group-id".into(),
            values: strings_list(["pgrogrp-1".to_string(), "pgrogrp-2".to_string()]),
        })]);
        assert_eq!(
            to_filters(&filters),
            vec![Filter {
                name: "read-only-group-id".to_string(),
                values: vec!["pgrogrp-1".to_string(), "pgrogrp-2".to_string()],
            }]
        );
        assert!(to_filters(&Value::Null).is_empty());
    }

    #[tokio::test]
    async fn test_save_result() {
        let path = std::env::temp_dir().join(format!("postgresql-result-{}.json", std::process::id()));
        let path_value: ValueString = Value::Value(path.to_string_lossy().into_owned().into());
        save_result(&path_value, &vec!["postgres-1"]).await.unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "[\n  \"postgres-1\"\n]");
        std::fs::remove_file(&path).unwrap();

        save_result(&Value::Null, &vec!["ignored"]).await.unwrap();
    }
}
