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

//! Private network addresses of instances and read-only groups

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{Attribute, AttributeType, Block, Description, Schema};
use tf_provider::value::{Value, ValueBool, ValueEmpty, ValueString};
use tf_provider::{map, AttributePath, Diagnostics, Resource};

use crate::error::{Error, Result};
use crate::id;
use crate::provider::ServiceHandle;
use crate::retry::{retry, retry_any, retry_error, StateChangeConf, READ_RETRY_TIMEOUT, WRITE_RETRY_TIMEOUT};
use crate::service::models::NetInfo;
use crate::service::{
    NetworkTarget, PostgresqlService, GROUP_STATUS_OK, INSTANCE_NOT_FOUND, INSTANCE_STATUS_LIMIT,
    NET_STATUS_OPENED, STATUS_CLOSED,
};
use crate::utils::{
    computed, flag, optional_computed, required, string, text, ResultExt, WithSchema,
};

/// Private address `vip` of `vpc_id`/`subnet_id`, any address of the subnet when `vip` is empty
fn find_access<'n>(infos: &'n [NetInfo], vpc_id: &str, subnet_id: &str, vip: &str) -> Option<&'n NetInfo> {
    infos.iter().find(|info| {
        info.net_type == "private"
            && info.vpc_id == vpc_id
            && info.subnet_id == subnet_id
            && (vip.is_empty() || info.ip == vip)
    })
}

/// Address of a target inside a subnet
#[derive(Debug, Clone, Copy)]
struct Access<'s> {
    target: NetworkTarget<'s>,
    vpc_id: &'s str,
    subnet_id: &'s str,
}

impl Access<'_> {
    async fn state(&self, service: &PostgresqlService, vip: &str) -> Result<(Option<NetInfo>, String)> {
        let infos = match service.describe_net_infos(self.target).await {
            Ok(infos) => infos,
            Err(err) if err.code() == Some(INSTANCE_NOT_FOUND) => {
                return Ok((None, STATUS_CLOSED.to_string()))
            }
            Err(err) => return Err(err.into()),
        };
        match find_access(&infos, self.vpc_id, self.subnet_id, vip) {
            Some(info) => Ok((Some(info.clone()), info.status.clone())),
            None => Ok((None, STATUS_CLOSED.to_string())),
        }
    }

    async fn find(&self, service: &PostgresqlService, vip: &str) -> Result<Option<NetInfo>> {
        retry(READ_RETRY_TIMEOUT, || async {
            self.state(service, vip)
                .await
                .map_err(|err| retry_any(err, &[]))
        })
        .await
        .map(|(info, _)| info)
    }

    /// Open the address and return its ip
    async fn open(&self, service: &PostgresqlService, is_assign_vip: bool, vip: &str) -> Result<String> {
        retry(WRITE_RETRY_TIMEOUT, || async {
            service
                .create_network_access(self.target, self.vpc_id, self.subnet_id, is_assign_vip, vip)
                .await
                .map_err(|err| retry_error(err, &[INSTANCE_STATUS_LIMIT]))
        })
        .await?;
        let info = StateChangeConf::new(&[NET_STATUS_OPENED], 3 * READ_RETRY_TIMEOUT)
            .wait_for_state(|| self.state(service, vip))
            .await?
            .ok_or_else(|| {
                Error::unexpected(format!(
                    "no address opened in {}/{}",
                    self.vpc_id, self.subnet_id
                ))
            })?;
        tracing::info!(vpc_id = self.vpc_id, subnet_id = self.subnet_id, vip = %info.ip, "postgresql network access opened");
        Ok(info.ip)
    }

    async fn close(&self, service: &PostgresqlService, vip: &str) -> Result<()> {
        retry(WRITE_RETRY_TIMEOUT, || async {
            match service
                .delete_network_access(self.target, self.vpc_id, self.subnet_id, vip)
                .await
            {
                Err(err) if err.code() == Some(INSTANCE_NOT_FOUND) => Ok(()),
                result => result.map_err(|err| retry_error(err, &[INSTANCE_STATUS_LIMIT])),
            }
        })
        .await?;
        StateChangeConf::new(&[STATUS_CLOSED], 3 * READ_RETRY_TIMEOUT)
            .wait_for_state(|| self.state(service, vip))
            .await?;
        tracing::info!(vpc_id = self.vpc_id, subnet_id = self.subnet_id, vip, "postgresql network access closed");
        Ok(())
    }
}

/// Attributes shared by all network accesses, added to the owner ones
fn access_attributes(owner: &str, mut attributes: HashMap<String, Attribute>) -> HashMap<String, Attribute> {
    attributes.insert("vpc_id".into(), required(AttributeType::String, "VPC of the address"));
    attributes.insert("subnet_id".into(), required(AttributeType::String, "Subnet of the address"));
    attributes.insert(
        "is_assign_vip".into(),
        required(AttributeType::Bool, "Whether `vip` is chosen by the user"),
    );
    attributes.insert(
        "vip".into(),
        optional_computed(
            AttributeType::String,
            &format!("Address of the {owner}; allocated when not given"),
        ),
    );
    attributes
}

fn replaced_attributes(
    prior: [(&'static str, &ValueString<'_>); 4],
    proposed: [&ValueString<'_>; 4],
) -> Vec<AttributePath> {
    prior
        .into_iter()
        .zip(proposed)
        .filter(|((_, prior), proposed)| prior != proposed)
        .map(|((name, _), _)| AttributePath::new(name))
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InstanceNetworkAccessState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub db_instance_id: ValueString<'a>,
    pub vpc_id: ValueString<'a>,
    pub subnet_id: ValueString<'a>,
    pub is_assign_vip: ValueBool,
    pub vip: ValueString<'a>,
}

impl WithSchema for InstanceNetworkAccessState<'_> {
    fn schema() -> Schema {
        let attributes = access_attributes(
            "instance",
            map! {
                "id" => computed(AttributeType::String, "Access id, `instanceId#vpcId#subnetId#vip`"),
                "db_instance_id" => required(AttributeType::String, "Instance reached through the address"),
            },
        );
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes,
                description: Description::plain("Private network address of a PostgreSQL instance"),
                ..Default::default()
            },
        }
    }
}

impl<'a> InstanceNetworkAccessState<'a> {
    fn access(&self) -> Access<'_> {
        Access {
            target: NetworkTarget::Instance(text(&self.db_instance_id)),
            vpc_id: text(&self.vpc_id),
            subnet_id: text(&self.subnet_id),
        }
    }

    async fn read(&mut self, service: &PostgresqlService) -> Result<bool> {
        let [instance_id, vpc_id, subnet_id, vip] = id::split::<4>(text(&self.id))?;
        self.db_instance_id = string(instance_id);
        self.vpc_id = string(vpc_id);
        self.subnet_id = string(subnet_id);
        let vip = vip.to_string();
        match self.access().find(service, &vip).await? {
            Some(info) => {
                self.vip = string(info.ip);
                if self.is_assign_vip.is_null() {
                    self.is_assign_vip = Value::Value(false);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create(&mut self, service: &PostgresqlService) -> Result<()> {
        let vip = self
            .access()
            .open(service, flag(&self.is_assign_vip), text(&self.vip))
            .await?;
        let instance_id = text(&self.db_instance_id);
        service
            .check_instance_status(instance_id, 3 * READ_RETRY_TIMEOUT)
            .await?;
        self.id = string(id::join(&[
            instance_id,
            text(&self.vpc_id),
            text(&self.subnet_id),
            vip.as_str(),
        ]));
        Ok(())
    }

    async fn delete(&self, service: &PostgresqlService) -> Result<()> {
        self.access().close(service, text(&self.vip)).await?;
        match service
            .check_instance_status(text(&self.db_instance_id), 3 * READ_RETRY_TIMEOUT)
            .await
        {
            Err(err) if err.code() == Some(INSTANCE_NOT_FOUND) => Ok(()),
            result => result,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReadonlyGroupNetworkAccessState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub read_only_group_id: ValueString<'a>,
    pub db_instance_id: ValueString<'a>,
    pub vpc_id: ValueString<'a>,
    pub subnet_id: ValueString<'a>,
    pub is_assign_vip: ValueBool,
    pub vip: ValueString<'a>,
}

impl WithSchema for ReadonlyGroupNetworkAccessState<'_> {
    fn schema() -> Schema {
        let attributes = access_attributes(
            "read-only group",
            map! {
                "id" => computed(AttributeType::String, "Access id, `groupId#vpcId#subnetId#vip`"),
                "read_only_group_id" => required(AttributeType::String, "Read-only group reached through the address"),
                "db_instance_id" => optional_computed(AttributeType::String, "Master instance of the read-only group"),
            },
        );
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes,
                description: Description::plain("Private network address of a PostgreSQL read-only group"),
                ..Default::default()
            },
        }
    }
}

impl<'a> ReadonlyGroupNetworkAccessState<'a> {
    fn access(&self) -> Access<'_> {
        Access {
            target: NetworkTarget::ReadOnlyGroup {
                master_instance_id: text(&self.db_instance_id),
                group_id: text(&self.read_only_group_id),
            },
            vpc_id: text(&self.vpc_id),
            subnet_id: text(&self.subnet_id),
        }
    }

    /// Fill the master instance of the group when it is not known yet
    async fn resolve_master(&mut self, service: &PostgresqlService) -> Result<bool> {
        if self.db_instance_id.is_value() {
            return Ok(true);
        }
        let group_id = text(&self.read_only_group_id).to_string();
        let group = retry(READ_RETRY_TIMEOUT, || async {
            service
                .describe_readonly_group(&group_id)
                .await
                .map_err(|err| retry_error(err, &[]))
        })
        .await?;
        match group {
            Some(group) => {
                self.db_instance_id = string(group.master_db_instance_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn read(&mut self, service: &PostgresqlService) -> Result<bool> {
        let [group_id, vpc_id, subnet_id, vip] = id::split::<4>(text(&self.id))?;
        self.read_only_group_id = string(group_id);
        self.vpc_id = string(vpc_id);
        self.subnet_id = string(subnet_id);
        let vip = vip.to_string();
        if !self.resolve_master(service).await? {
            return Ok(false);
        }
        match self.access().find(service, &vip).await? {
            Some(info) => {
                self.vip = string(info.ip);
                if self.is_assign_vip.is_null() {
                    self.is_assign_vip = Value::Value(false);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn wait_group_ok(&self, service: &PostgresqlService) -> Result<()> {
        let master = text(&self.db_instance_id);
        let group_id = text(&self.read_only_group_id);
        StateChangeConf::new(&[GROUP_STATUS_OK], 3 * READ_RETRY_TIMEOUT)
            .wait_for_state(|| service.readonly_group_state(master, group_id))
            .await?;
        Ok(())
    }

    async fn create(&mut self, service: &PostgresqlService) -> Result<()> {
        if !self.resolve_master(service).await? {
            return Err(Error::invalid(format!(
                "postgresql read-only group {} not found",
                text(&self.read_only_group_id)
            )));
        }
        let vip = self
            .access()
            .open(service, flag(&self.is_assign_vip), text(&self.vip))
            .await?;
        self.wait_group_ok(service).await?;
        self.id = string(id::join(&[
            text(&self.read_only_group_id),
            text(&self.vpc_id),
            text(&self.subnet_id),
            vip.as_str(),
        ]));
        Ok(())
    }

    async fn delete(&self, service: &PostgresqlService) -> Result<()> {
        self.access().close(service, text(&self.vip)).await?;
        self.wait_group_ok(service).await
    }
}

#[derive(Debug, Default)]
pub struct InstanceNetworkAccessResource {
    service: ServiceHandle,
}

impl InstanceNetworkAccessResource {
    pub fn new(service: ServiceHandle) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Resource for InstanceNetworkAccessResource {
    type State<'a> = InstanceNetworkAccessState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(InstanceNetworkAccessState::schema())
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
                diags.root_error("Could not read the network access", err.to_string());
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
        if state.vip.is_null() {
            state.vip = Value::Unknown;
        }
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
        let mut replace = replaced_attributes(
            [
                ("db_instance_id", &prior_state.db_instance_id),
                ("vpc_id", &prior_state.vpc_id),
                ("subnet_id", &prior_state.subnet_id),
                ("vip", &prior_state.vip),
            ],
            [&state.db_instance_id, &state.vpc_id, &state.subnet_id, &state.vip],
        );
        if prior_state.is_assign_vip != state.is_assign_vip {
            replace.push(AttributePath::new("is_assign_vip"));
        }
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
        state
            .create(&service)
            .await
            .or_diag(diags, "Could not open the network access")?;
        if let Err(err) = state.read(&service).await {
            diags.root_error("Could not read the network access", err.to_string());
        }
        Some((state, planned_private_state))
    }

    async fn update<'a>(
        &self,
        _diags: &mut Diagnostics,
        _prior_state: Self::State<'a>,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        Some((planned_state, planned_private_state))
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
            .or_diag(diags, "Could not close the network access")
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let service = self.service.get(diags).await?;
        let mut state = InstanceNetworkAccessState {
            id: string(id.clone()),
            ..Default::default()
        };
        let found = state
            .read(&service)
            .await
            .or_diag(diags, "Could not import the network access")?;
        if !found {
            diags.root_error(
                "Could not import the network access",
                format!("postgresql network access {id} not found"),
            );
            return None;
        }
        Some((state, Default::default()))
    }
}

#[derive(Debug, Default)]
pub struct ReadonlyGroupNetworkAccessResource {
    service: ServiceHandle,
}

impl ReadonlyGroupNetworkAccessResource {
    pub fn new(service: ServiceHandle) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Resource for ReadonlyGroupNetworkAccessResource {
    type State<'a> = ReadonlyGroupNetworkAccessState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(ReadonlyGroupNetworkAccessState::schema())
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
                diags.root_error("Could not read the network access", err.to_string());
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
        if state.vip.is_null() {
            state.vip = Value::Unknown;
        }
        if state.db_instance_id.is_null() {
            state.db_instance_id = Value::Unknown;
        }
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
        let mut replace = replaced_attributes(
            [
                ("read_only_group_id", &prior_state.read_only_group_id),
                ("vpc_id", &prior_state.vpc_id),
                ("subnet_id", &prior_state.subnet_id),
                ("vip", &prior_state.vip),
            ],
            [&state.read_only_group_id, &state.vpc_id, &state.subnet_id, &state.vip],
        );
        if prior_state.is_assign_vip != state.is_assign_vip {
            replace.push(AttributePath::new("is_assign_vip"));
        }
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
        if state.db_instance_id.is_unknown() {
            state.db_instance_id = Value::Null;
        }
        state
            .create(&service)
            .await
            .or_diag(diags, "Could not open the network access")?;
        if let Err(err) = state.read(&service).await {
            diags.root_error("Could not read the network access", err.to_string());
        }
        Some((state, planned_private_state))
    }

    async fn update<'a>(
        &self,
        _diags: &mut Diagnostics,
        _prior_state: Self::State<'a>,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        Some((planned_state, planned_private_state))
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
            .or_diag(diags, "Could not close the network access")
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let service = self.service.get(diags).await?;
        let mut state = ReadonlyGroupNetworkAccessState {
            id: string(id.clone()),
            ..Default::default()
        };
        let found = state
            .read(&service)
            .await
            .or_diag(diags, "Could not import the network access")?;
        if !found {
            diags.root_error(
                "Could not import the network access",
                format!("postgresql network access {id} not found"),
            );
            return None;
        }
        Some((state, Default::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(ip: &str, subnet_id: &str, net_type: &str) -> NetInfo {
        NetInfo {
            ip: ip.to_string(),
            net_type: net_type.to_string(),
            vpc_id: "vpc-1".to_string(),
            subnet_id: subnet_id.to_string(),
            status: "opened".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_find_access() {
        let infos = vec![
            info("1.2.3.4", "", "public"),
            info("10.0.0.3", "subnet-1", "private"),
            info("10.0.1.7", "subnet-2", "private"),
        ];
        assert_eq!(
            find_access(&infos, "vpc-1", "subnet-2", "").map(|info| info.ip.as_str()),
            Some("10.0.1.7")
        );
        assert_eq!(
            find_access(&infos, "vpc-1", "subnet-1", "10.0.0.3").map(|info| info.ip.as_str()),
            Some("10.0.0.3")
        );
        assert!(find_access(&infos, "vpc-1", "subnet-1", "10.0.0.9").is_none());
        assert!(find_access(&infos, "vpc-2", "subnet-1", "").is_none());
    }

    #[test]
    fn test_replaced_attributes() {
        let prior = InstanceNetworkAccessState {
            db_instance_id: "postgres-1".into(),
            vpc_id: "vpc-1".into(),
            subnet_id: "subnet-1".into(),
            vip: "10.0.0.3".into(),
            ..Default::default()
        };
        let mut state = prior.clone();
        state.subnet_id = "subnet-2".into();
        let replace = replaced_attributes(
            [
                ("db_instance_id", &prior.db_instance_id),
                ("vpc_id", &prior.vpc_id),
                ("subnet_id", &prior.subnet_id),
                ("vip", &prior.vip),
            ],
            [&state.db_instance_id, &state.vpc_id, &state.subnet_id, &state.vip],
        );
        assert_eq!(replace, vec![AttributePath::new("subnet_id")]);
    }
}
