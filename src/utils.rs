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

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Display;

use tf_provider::schema::{Attribute, AttributeConstraint, AttributeType, Description, Schema};
use tf_provider::value::{Value, ValueMap, ValueNumber, ValueSet, ValueString};
use tf_provider::{AttributePath, Diagnostics};

pub(crate) trait WithSchema {
    fn schema() -> Schema;
}

/// Report failures as Terraform diagnostics
pub(crate) trait ResultExt<T> {
    /// Turn an error into a root diagnostic with the given summary
    fn or_diag(self, diags: &mut Diagnostics, summary: &str) -> Option<T>;

    /// Turn an error into a diagnostic attached to the attribute
    fn or_attr_diag(self, diags: &mut Diagnostics, summary: &str, attribute: AttributePath)
        -> Option<T>;
}

impl<T, E: Display> ResultExt<T> for Result<T, E> {
    fn or_diag(self, diags: &mut Diagnostics, summary: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::error!("{summary}: {err}");
                diags.root_error(summary.to_string(), err.to_string());
                None
            }
        }
    }

    fn or_attr_diag(
        self,
        diags: &mut Diagnostics,
        summary: &str,
        attribute: AttributePath,
    ) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::error!(%attribute, "{summary}: {err}");
                diags.error(summary.to_string(), err.to_string(), attribute);
                None
            }
        }
    }
}

pub(crate) fn no_errors(diags: &Diagnostics) -> Option<()> {
    if diags.errors.is_empty() {
        Some(())
    } else {
        None
    }
}

pub(crate) fn attribute(
    attr_type: AttributeType,
    constraint: AttributeConstraint,
    description: &str,
) -> Attribute {
    Attribute {
        attr_type,
        description: Description::plain(description),
        constraint,
        ..Default::default()
    }
}

pub(crate) fn required(attr_type: AttributeType, description: &str) -> Attribute {
    attribute(attr_type, AttributeConstraint::Required, description)
}

pub(crate) fn optional(attr_type: AttributeType, description: &str) -> Attribute {
    attribute(attr_type, AttributeConstraint::Optional, description)
}

pub(crate) fn optional_computed(attr_type: AttributeType, description: &str) -> Attribute {
    attribute(attr_type, AttributeConstraint::OptionalComputed, description)
}

pub(crate) fn computed(attr_type: AttributeType, description: &str) -> Attribute {
    attribute(attr_type, AttributeConstraint::Computed, description)
}

pub(crate) fn sensitive(attribute: Attribute) -> Attribute {
    Attribute {
        sensitive: true,
        ..attribute
    }
}

pub(crate) fn string_set_type() -> AttributeType {
    AttributeType::Set(AttributeType::String.into())
}

pub(crate) fn string_list_type() -> AttributeType {
    AttributeType::List(AttributeType::String.into())
}

pub(crate) fn string_map_type() -> AttributeType {
    AttributeType::Map(AttributeType::String.into())
}

/// Computed list of objects made of `attributes`
pub(crate) fn computed_list(attributes: HashMap<String, Attribute>, description: &str) -> Attribute {
    computed(AttributeType::AttributeList(attributes), description)
}

/// Owned string value, null when empty
pub(crate) fn non_empty<'a>(s: impl Into<String>) -> ValueString<'a> {
    let s = s.into();
    if s.is_empty() {
        Value::Null
    } else {
        Value::Value(Cow::Owned(s))
    }
}

pub(crate) fn string<'a>(s: impl Into<String>) -> ValueString<'a> {
    Value::Value(Cow::Owned(s.into()))
}

/// Content of a string value, empty when null or unknown
pub(crate) fn text<'v>(value: &'v ValueString<'_>) -> &'v str {
    value.as_deref_option().unwrap_or_default()
}

/// Known strings of a set, ignoring null and unknown elements
pub(crate) fn set_strings(set: &ValueSet<ValueString<'_>>) -> Vec<String> {
    set.iter()
        .flatten()
        .filter_map(|s| s.as_ref_option().map(|s| s.to_string()))
        .collect()
}

pub(crate) fn list_strings(list: &Value<Vec<ValueString<'_>>>) -> Vec<String> {
    list.iter()
        .flatten()
        .filter_map(|s| s.as_ref_option().map(|s| s.to_string()))
        .collect()
}

pub(crate) fn strings_set<'a>(strings: impl IntoIterator<Item = String>) -> ValueSet<ValueString<'a>> {
    Value::Value(strings.into_iter().map(string).collect::<BTreeSet<_>>())
}

pub(crate) fn strings_list<'a>(strings: impl IntoIterator<Item = String>) -> Value<Vec<ValueString<'a>>> {
    Value::Value(strings.into_iter().map(string).collect())
}

pub(crate) fn map_strings(map: &ValueMap<'_, ValueString<'_>>) -> BTreeMap<String, String> {
    map.iter()
        .flatten()
        .filter_map(|(k, v)| v.as_ref_option().map(|v| (k.to_string(), v.to_string())))
        .collect()
}

pub(crate) fn strings_map<'a>(map: BTreeMap<String, String>) -> ValueMap<'a, ValueString<'a>> {
    Value::Value(
        map.into_iter()
            .map(|(k, v)| (Cow::Owned(k), string(v)))
            .collect(),
    )
}

/// Value of a number attribute, 0 when null or unknown
pub(crate) fn number(value: &ValueNumber) -> i64 {
    value.as_ref_option().copied().unwrap_or_default()
}

pub(crate) fn flag(value: &Value<bool>) -> bool {
    value.as_ref_option().copied().unwrap_or_default()
}

/// Let the provider compute a value left out of the configuration
pub(crate) fn unknown_if_null<T>(value: &mut Value<T>) {
    if value.is_null() {
        *value = Value::Unknown;
    }
}

/// Drop a value that could not be computed
pub(crate) fn null_if_unknown<T>(value: &mut Value<T>) {
    if value.is_unknown() {
        *value = Value::Null;
    }
}

/// Record `name` as requiring a replacement when its value changed
pub(crate) fn replace_if_changed<T: PartialEq>(
    paths: &mut Vec<AttributePath>,
    name: &'static str,
    prior: &Value<T>,
    proposed: &Value<T>,
) {
    if prior != proposed {
        paths.push(AttributePath::new(name));
    }
}

/// Report an attribute whose update is not supported
pub(crate) fn immutable<T: PartialEq>(
    diags: &mut Diagnostics,
    name: &'static str,
    prior: &Value<T>,
    proposed: &Value<T>,
) {
    if prior != proposed && !proposed.is_unknown() {
        diags.error(
            "Attribute cannot be changed",
            format!("`{name}` cannot be changed once the resource is created"),
            AttributePath::new(name),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty() {
        assert!(non_empty("").is_null());
        assert_eq!(non_empty("vpc-1").as_str(), "vpc-1");
    }

    #[test]
    fn test_sets_skip_unknown() {
        let set: ValueSet<ValueString> = Value::Value(
            [Value::from("sg-1"), Value::Unknown, Value::from("sg-2")]
                .into_iter()
                .collect(),
        );
        assert_eq!(set_strings(&set), ["sg-1", "sg-2"]);
        assert!(set_strings(&Value::Null).is_empty());
    }

    #[test]
    fn test_maps() {
        let map = strings_map(BTreeMap::from([("env".to_string(), "dev".to_string())]));
        assert_eq!(
            map_strings(&map),
            BTreeMap::from([("env".to_string(), "dev".to_string())])
        );
    }

    #[test]
    fn test_replace_if_changed() {
        let mut paths = Vec::new();
        replace_if_changed(&mut paths, "zone", &Value::from(1), &Value::from(1));
        assert!(paths.is_empty());
        replace_if_changed(&mut paths, "zone", &Value::from(1), &Value::from(2));
        assert_eq!(paths, [AttributePath::new("zone")]);
    }

    #[test]
    fn test_immutable() {
        let mut diags = Diagnostics::default();
        immutable::<Cow<str>>(&mut diags, "root_user", &Value::from("root"), &Value::Unknown);
        assert!(diags.errors.is_empty());
        immutable::<Cow<str>>(&mut diags, "root_user", &Value::from("root"), &Value::from("admin"));
        assert_eq!(diags.errors.len(), 1);
    }
}
