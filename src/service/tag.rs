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

use serde::Deserialize;
use serde_json::json;

use crate::api::ApiError;

use super::models::Tag;
use super::{PostgresqlService, SERVICE};

const TAG_SERVICE: &str = "tag";
const TAG_VERSION: &str = "2018-08-13";

/// Tags to set and tag keys to remove
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagDiff {
    pub replace: Vec<Tag>,
    pub delete: Vec<String>,
}

impl TagDiff {
    pub fn new(old: &BTreeMap<String, String>, new: &BTreeMap<String, String>) -> Self {
        let replace = new
            .iter()
            .filter(|(key, value)| old.get(*key) != Some(*value))
            .map(|(key, value)| Tag {
                tag_key: key.clone(),
                tag_value: value.clone(),
            })
            .collect();
        let delete = old
            .keys()
            .filter(|key| !new.contains_key(*key))
            .cloned()
            .collect();
        Self { replace, delete }
    }

    pub fn is_empty(&self) -> bool {
        self.replace.is_empty() && self.delete.is_empty()
    }
}

/// Six-segment resource name of an instance for the tag service
pub fn instance_resource_name(region: &str, instance_id: &str) -> String {
    format!("qcs::{SERVICE}:{region}:uin/:DBInstanceId/{instance_id}")
}

#[derive(Debug, Default, Deserialize)]
struct Empty {}

impl PostgresqlService {
    pub async fn modify_tags(&self, instance_id: &str, diff: &TagDiff) -> Result<(), ApiError> {
        if diff.is_empty() {
            return Ok(());
        }
        let delete: Vec<_> = diff
            .delete
            .iter()
            .map(|key| json!({ "TagKey": key }))
            .collect();
        let mut request = json!({
            "Resource": instance_resource_name(self.region(), instance_id),
        });
        if !diff.replace.is_empty() {
            request["ReplaceTags"] = json!(diff.replace);
        }
        if !delete.is_empty() {
            request["DeleteTags"] = json!(delete);
        }
        let _: Empty = self
            .client
            .call(TAG_SERVICE, TAG_VERSION, "ModifyResourceTags", &request)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_tag_diff() {
        let diff = TagDiff::new(
            &tags(&[("env", "dev"), ("team", "db"), ("owner", "me")]),
            &tags(&[("env", "prod"), ("team", "db"), ("cost", "42")]),
        );
        assert_eq!(
            diff.replace,
            [
                Tag {
                    tag_key: "cost".to_string(),
                    tag_value: "42".to_string()
                },
                Tag {
                    tag_key: "env".to_string(),
                    tag_value: "prod".to_string()
                },
            ]
        );
        assert_eq!(diff.delete, ["owner"]);
        assert!(TagDiff::new(&tags(&[("a", "b")]), &tags(&[("a", "b")])).is_empty());
    }

    #[test]
    fn test_instance_resource_name() {
        assert_eq!(
            instance_resource_name("ap-guangzhou", "postgres-1"),
            "qcs::postgres:ap-guangzhou:uin/:DBInstanceId/postgres-1"
        );
    }
}
