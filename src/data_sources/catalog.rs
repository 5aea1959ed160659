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

//! Sale catalog of the service: specifications, zones, regions and versions

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{AttributeType, Block, Description, Schema};
use tf_provider::value::{Value, ValueBool, ValueEmpty, ValueList, ValueNumber, ValueString};
use tf_provider::{map, DataSource, Diagnostics};

use crate::error::Result;
use crate::provider::ServiceHandle;
use crate::retry::{retry, retry_error, READ_RETRY_TIMEOUT};
use crate::service::models::{RegionInfo, SpecItemInfo, Version, ZoneInfo};
use crate::service::PostgresqlService;
use crate::utils::{
    computed, computed_list, required, string, string_list_type, strings_list, text, ResultExt,
    WithSchema,
};

use super::{result_output_file, save_result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SpecItem<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub engine_version: ValueString<'a>,
    pub engine_version_name: ValueString<'a>,
    pub cpu: ValueNumber,
    pub memory: ValueNumber,
    pub storage_max: ValueNumber,
    pub storage_min: ValueNumber,
    pub qps: ValueNumber,
    pub major_version: ValueString<'a>,
    pub kernel_version: ValueString<'a>,
    pub is_support_tde: ValueBool,
}

impl From<&SpecItemInfo> for SpecItem<'_> {
    fn from(spec: &SpecItemInfo) -> Self {
        Self {
            id: string(&spec.spec_code),
            engine_version: string(&spec.version),
            engine_version_name: string(&spec.version_name),
            cpu: Value::Value(spec.cpu),
            // The API reports memory in MB
            memory: Value::Value(spec.memory / 1024),
            storage_max: Value::Value(spec.max_storage),
            storage_min: Value::Value(spec.min_storage),
            qps: Value::Value(spec.qps),
            major_version: string(&spec.major_version),
            kernel_version: string(&spec.kernel_version),
            is_support_tde: Value::Value(spec.is_support_tde == 1),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SpecInfosState<'a> {
    #[serde(borrow = "'a")]
    pub availability_zone: ValueString<'a>,
    pub result_output_file: ValueString<'a>,
    pub list: ValueList<Value<SpecItem<'a>>>,
}

impl WithSchema for SpecInfosState<'_> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "availability_zone" => required(AttributeType::String, "Zone of the specifications"),
                    "result_output_file" => result_output_file(),
                    "list" => computed_list(
                        map! {
                            "id" => computed(AttributeType::String, "Spec code, used as instance class"),
                            "engine_version" => computed(AttributeType::String, "Engine version"),
                            "engine_version_name" => computed(AttributeType::String, "Name of the engine version"),
                            "cpu" => computed(AttributeType::Number, "Number of cores"),
                            "memory" => computed(AttributeType::Number, "Memory, in GB"),
                            "storage_max" => computed(AttributeType::Number, "Maximum storage, in GB"),
                            "storage_min" => computed(AttributeType::Number, "Minimum storage, in GB"),
                            "qps" => computed(AttributeType::Number, "Estimated queries per second"),
                            "major_version" => computed(AttributeType::String, "Major version"),
                            "kernel_version" => computed(AttributeType::String, "Kernel version"),
                            "is_support_tde" => computed(AttributeType::Bool, "Whether data encryption is supported"),
                        },
                        "Specifications sold in the zone",
                    ),
                },
                description: Description::plain("List PostgreSQL specifications sold in a zone"),
                ..Default::default()
            },
        }
    }
}

impl<'a> SpecInfosState<'a> {
    async fn fetch(&mut self, service: &PostgresqlService) -> Result<()> {
        let zone = text(&self.availability_zone);
        let specs = retry(READ_RETRY_TIMEOUT, || async {
            service
                .describe_spec_infos(zone)
                .await
                .map_err(|err| retry_error(err, &[]))
        })
        .await?;
        tracing::debug!(zone, count = specs.len(), "postgresql specifications listed");
        self.list = Value::Value(specs.iter().map(|spec| Value::Value(spec.into())).collect());
        save_result(&self.result_output_file, &self.list).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ZoneItem<'a> {
    #[serde(borrow = "'a")]
    pub zone: ValueString<'a>,
    pub zone_name: ValueString<'a>,
    pub zone_id: ValueNumber,
    pub zone_state: ValueString<'a>,
    pub zone_support_ipv6: ValueNumber,
    pub standby_zone_set: ValueList<ValueString<'a>>,
}

impl From<&ZoneInfo> for ZoneItem<'_> {
    fn from(zone: &ZoneInfo) -> Self {
        Self {
            zone: string(&zone.zone),
            zone_name: string(&zone.zone_name),
            zone_id: Value::Value(zone.zone_id),
            zone_state: string(&zone.zone_state),
            zone_support_ipv6: Value::Value(zone.zone_support_ipv6),
            standby_zone_set: strings_list(zone.standby_zone_set.iter().cloned()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ZonesState<'a> {
    #[serde(borrow = "'a")]
    pub result_output_file: ValueString<'a>,
    pub zone_set: ValueList<Value<ZoneItem<'a>>>,
}

impl WithSchema for ZonesState<'_> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "result_output_file" => result_output_file(),
                    "zone_set" => computed_list(
                        map! {
                            "zone" => computed(AttributeType::String, "Zone"),
                            "zone_name" => computed(AttributeType::String, "Name of the zone"),
                            "zone_id" => computed(AttributeType::Number, "Numeric id of the zone"),
                            "zone_state" => computed(AttributeType::String, "Availability: UNAVAILABLE, AVAILABLE or SELLOUT"),
                            "zone_support_ipv6" => computed(AttributeType::Number, "Whether IPv6 is supported"),
                            "standby_zone_set" => computed(string_list_type(), "Zones usable for standby nodes"),
                        },
                        "Zones of the region",
                    ),
                },
                description: Description::plain("List availability zones of the PostgreSQL service"),
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RegionItem<'a> {
    #[serde(borrow = "'a")]
    pub region: ValueString<'a>,
    pub region_name: ValueString<'a>,
    pub region_id: ValueNumber,
    pub region_state: ValueString<'a>,
    pub support_international: ValueNumber,
}

impl From<&RegionInfo> for RegionItem<'_> {
    fn from(region: &RegionInfo) -> Self {
        Self {
            region: string(&region.region),
            region_name: string(&region.region_name),
            region_id: Value::Value(region.region_id),
            region_state: string(&region.region_state),
            support_international: Value::Value(region.support_international),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RegionsState<'a> {
    #[serde(borrow = "'a")]
    pub result_output_file: ValueString<'a>,
    pub region_set: ValueList<Value<RegionItem<'a>>>,
}

impl WithSchema for RegionsState<'_> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "result_output_file" => result_output_file(),
                    "region_set" => computed_list(
                        map! {
                            "region" => computed(AttributeType::String, "Region"),
                            "region_name" => computed(AttributeType::String, "Name of the region"),
                            "region_id" => computed(AttributeType::Number, "Numeric id of the region"),
                            "region_state" => computed(AttributeType::String, "Availability: UNAVAILABLE or AVAILABLE"),
                            "support_international" => computed(AttributeType::Number, "Whether the region is sold internationally"),
                        },
                        "Regions of the service",
                    ),
                },
                description: Description::plain("List regions of the PostgreSQL service"),
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VersionItem<'a> {
    #[serde(borrow = "'a")]
    pub db_engine: ValueString<'a>,
    pub db_version: ValueString<'a>,
    pub db_major_version: ValueString<'a>,
    pub db_kernel_version: ValueString<'a>,
    pub supported_feature_names: ValueList<ValueString<'a>>,
    pub status: ValueString<'a>,
    pub available_upgrade_target: ValueList<ValueString<'a>>,
}

impl From<&Version> for VersionItem<'_> {
    fn from(version: &Version) -> Self {
        Self {
            db_engine: string(&version.db_engine),
            db_version: string(&version.db_version),
            db_major_version: string(&version.db_major_version),
            db_kernel_version: string(&version.db_kernel_version),
            supported_feature_names: strings_list(version.supported_feature_names.iter().cloned()),
            status: string(&version.status),
            available_upgrade_target: strings_list(version.available_upgrade_target.iter().cloned()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DbVersionsState<'a> {
    #[serde(borrow = "'a")]
    pub result_output_file: ValueString<'a>,
    pub version_set: ValueList<Value<VersionItem<'a>>>,
}

impl WithSchema for DbVersionsState<'_> {
    fn schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "result_output_file" => result_output_file(),
                    "version_set" => computed_list(
                        map! {
                            "db_engine" => computed(AttributeType::String, "Engine of the version"),
                            "db_version" => computed(AttributeType::String, "Community version"),
                            "db_major_version" => computed(AttributeType::String, "Major version"),
                            "db_kernel_version" => computed(AttributeType::String, "Kernel version"),
                            "supported_feature_names" => computed(string_list_type(), "Features supported by the kernel"),
                            "status" => computed(AttributeType::String, "Availability: AVAILABLE or DEPRECATED"),
                            "available_upgrade_target" => computed(string_list_type(), "Kernel versions this one can be upgraded to"),
                        },
                        "Versions sold by the service",
                    ),
                },
                description: Description::plain("List PostgreSQL versions"),
                ..Default::default()
            },
        }
    }
}

/// Data source whose whole state is computed from one listing call
macro_rules! listing_data_source {
    ($name:ident, $state:ident, $field:ident, $describe:ident, $what:literal) => {
        #[derive(Debug, Default)]
        pub struct $name {
            service: ServiceHandle,
        }

        impl $name {
            pub fn new(service: ServiceHandle) -> Self {
                Self { service }
            }
        }

        #[async_trait]
        impl DataSource for $name {
            type State<'a> = $state<'a>;
            type ProviderMetaState<'a> = ValueEmpty;

            fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
                Some($state::schema())
            }

            async fn read<'a>(
                &self,
                diags: &mut Diagnostics,
                config: Self::State<'a>,
                _provider_meta_state: Self::ProviderMetaState<'a>,
            ) -> Option<Self::State<'a>> {
                let service = self.service.get(diags).await?;
                let items = service
                    .$describe()
                    .await
                    .or_diag(diags, concat!("Could not list the ", $what))?;
                tracing::debug!(count = items.len(), listing = $what, "postgresql catalog listed");
                let mut state = config;
                state.$field = Value::Value(items.iter().map(|item| Value::Value(item.into())).collect());
                save_result(&state.result_output_file, &state.$field)
                    .await
                    .or_diag(diags, "Could not save the results")?;
                Some(state)
            }
        }
    };
}

listing_data_source!(ZonesDataSource, ZonesState, zone_set, describe_zones, "zones");
listing_data_source!(RegionsDataSource, RegionsState, region_set, describe_regions, "regions");
listing_data_source!(DbVersionsDataSource, DbVersionsState, version_set, describe_db_versions, "versions");

#[derive(Debug, Default)]
pub struct SpecInfosDataSource {
    service: ServiceHandle,
}

impl SpecInfosDataSource {
    pub fn new(service: ServiceHandle) -> Self {
        Self { service }
    }
}

#[async_trait]
impl DataSource for SpecInfosDataSource {
    type State<'a> = SpecInfosState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(SpecInfosState::schema())
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
            .or_diag(diags, "Could not list the specifications")?;
        Some(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_item() {
        let spec = SpecItemInfo {
            spec_code: "pg.it.medium4".to_string(),
            version: "10.4".to_string(),
            cpu: 2,
            memory: 4096,
            is_support_tde: 1,
            ..Default::default()
        };
        let item = SpecItem::from(&spec);
        assert_eq!(item.id.as_deref_option(), Some("pg.it.medium4"));
        assert_eq!(item.memory, Value::Value(4));
        assert_eq!(item.is_support_tde, Value::Value(true));
    }

    #[test]
    fn test_version_item() {
        let version = Version {
            db_version: "13.3".to_string(),
            available_upgrade_target: vec!["v13.3_r1.2".to_string()],
            ..Default::default()
        };
        let item = VersionItem::from(&version);
        assert_eq!(item.db_version.as_deref_option(), Some("13.3"));
        assert_eq!(
            item.available_upgrade_target,
            strings_list(["v13.3_r1.2".to_string()])
        );
        assert_eq!(item.supported_feature_names, Value::Value(vec![]));
    }
}
