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

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use tf_provider::schema::Schema;
use tf_provider::value::ValueEmpty;
use tf_provider::{map, Diagnostics, DynamicDataSource, DynamicResource, Provider};

use crate::config::ProviderConfig;
use crate::data_sources::{
    AccountPrivilegesDataSource, BaseBackupsDataSource, DbVersionsDataSource,
    InstancesDataSource, ParameterTemplatesDataSource, ReadonlyGroupsDataSource,
    RegionsDataSource, SpecInfosDataSource, ZonesDataSource,
};
use crate::resources::{
    AccountResource, BackupPlanConfigResource, BaseBackupResource, InstanceNetworkAccessResource,
    InstanceResource, ParameterTemplateResource, ReadonlyGroupNetworkAccessResource,
    ReadonlyGroupResource, ReadonlyInstanceResource, SecurityGroupConfigResource,
};
use crate::service::PostgresqlService;
use crate::utils::{no_errors, ResultExt, WithSchema};

/// Service shared by the provider and everything it serves
///
/// Resources are built before the provider is configured, so they all hold the same handle
/// that `configure` fills.
#[derive(Debug, Clone, Default)]
pub struct ServiceHandle(Arc<RwLock<Option<PostgresqlService>>>);

impl ServiceHandle {
    pub fn new(service: PostgresqlService) -> Self {
        Self(Arc::new(RwLock::new(Some(service))))
    }

    pub async fn set(&self, service: PostgresqlService) {
        *self.0.write().await = Some(service);
    }

    /// Configured service, or an error diagnostic
    pub async fn get(&self, diags: &mut Diagnostics) -> Option<PostgresqlService> {
        let service = self.0.read().await.clone();
        if service.is_none() {
            diags.root_error(
                "Provider not configured",
                "the tencentcloud provider must be configured before managing PostgreSQL objects",
            );
        }
        service
    }
}

#[derive(Debug, Default)]
pub struct TencentCloudProvider {
    service: ServiceHandle,
}

impl TencentCloudProvider {
    pub fn service(&self) -> ServiceHandle {
        self.service.clone()
    }
}

#[async_trait]
impl Provider for TencentCloudProvider {
    type Config<'a> = ProviderConfig<'a>;
    type MetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(ProviderConfig::schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::Config<'a>) -> Option<()> {
        config.validate(diags);
        no_errors(diags)
    }

    async fn configure<'a>(
        &self,
        diags: &mut Diagnostics,
        terraform_version: String,
        config: Self::Config<'a>,
    ) -> Option<()> {
        let settings = config.resolve(diags, |name| std::env::var(name).ok())?;
        let client = settings
            .client()
            .or_diag(diags, "Could not create the API client")?;
        tracing::info!(
            terraform_version,
            region = %settings.region,
            endpoint = %settings.endpoint(crate::service::SERVICE),
            "provider configured"
        );
        self.service.set(PostgresqlService::new(client)).await;
        Some(())
    }

    fn get_resources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<HashMap<String, Box<dyn DynamicResource>>> {
        let service = &self.service;
        Some(map! {
            "postgresql_instance" => InstanceResource::new(service.clone()),
            "postgresql_readonly_instance" => ReadonlyInstanceResource::new(service.clone()),
            "postgresql_readonly_group" => ReadonlyGroupResource::new(service.clone()),
            "postgresql_account" => AccountResource::new(service.clone()),
            "postgresql_parameter_template" => ParameterTemplateResource::new(service.clone()),
            "postgresql_base_backup" => BaseBackupResource::new(service.clone()),
            "postgresql_backup_plan_config" => BackupPlanConfigResource::new(service.clone()),
            "postgresql_security_group_config" => SecurityGroupConfigResource::new(service.clone()),
            "postgresql_instance_network_access" => InstanceNetworkAccessResource::new(service.clone()),
            "postgresql_readonly_group_network_access" => ReadonlyGroupNetworkAccessResource::new(service.clone()),
        })
    }

    fn get_data_sources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<HashMap<String, Box<dyn DynamicDataSource>>> {
        let service = &self.service;
        Some(map! {
            "postgresql_instances" => InstancesDataSource::new(service.clone()),
            "postgresql_readonly_groups" => ReadonlyGroupsDataSource::new(service.clone()),
            "postgresql_parameter_templates" => ParameterTemplatesDataSource::new(service.clone()),
            "postgresql_base_backups" => BaseBackupsDataSource::new(service.clone()),
            "postgresql_specinfos" => SpecInfosDataSource::new(service.clone()),
            "postgresql_zones" => ZonesDataSource::new(service.clone()),
            "postgresql_regions" => RegionsDataSource::new(service.clone()),
            "postgresql_db_versions" => DbVersionsDataSource::new(service.clone()),
            "postgresql_account_privileges" => AccountPrivilegesDataSource::new(service.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_service() {
        let handle = ServiceHandle::default();
        let mut diags = Diagnostics::default();
        assert!(handle.get(&mut diags).await.is_none());
        assert_eq!(diags.errors.len(), 1);
    }

    #[test]
    fn test_served_names() {
        let provider = TencentCloudProvider::default();
        let mut diags = Diagnostics::default();
        let resources = provider.get_resources(&mut diags).unwrap();
        assert_eq!(resources.len(), 10);
        assert!(resources.contains_key("postgresql_instance"));
        let data_sources = provider.get_data_sources(&mut diags).unwrap();
        assert_eq!(data_sources.len(), 9);
        assert!(data_sources.contains_key("postgresql_account_privileges"));
    }
}
