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

//! Terraform resources of the provider

mod account;
mod backup_plan_config;
mod base_backup;
mod instance;
mod network_access;
mod parameter_template;
mod readonly_group;
mod readonly_instance;
mod security_group_config;

pub use account::{AccountResource, AccountState};
pub use backup_plan_config::{BackupPlanConfigResource, BackupPlanConfigState};
pub use base_backup::{BaseBackupResource, BaseBackupState};
pub use instance::{BackupPlanState, DbNodeState, InstanceResource, InstanceState};
pub use network_access::{
    InstanceNetworkAccessResource, InstanceNetworkAccessState, ReadonlyGroupNetworkAccessResource,
    ReadonlyGroupNetworkAccessState,
};
pub use parameter_template::{ParameterTemplateResource, ParameterTemplateState};
pub use readonly_group::{ReadonlyGroupResource, ReadonlyGroupState};
pub use readonly_instance::{ReadonlyInstanceResource, ReadonlyInstanceState};
pub use security_group_config::{SecurityGroupConfigResource, SecurityGroupConfigState};
