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

//! Terraform provider for TencentCloud PostgreSQL
//!
//! Manages PostgreSQL instances, read-only replicas and their groups, accounts, parameter
//! templates, backups, security groups and network access, through the TencentCloud API.
//!
//! The provider is served with [`tf_provider::serve`] and works with both Terraform and OpenTofu.

pub mod api;
pub mod config;
pub mod data_sources;
pub mod error;
pub mod id;
pub mod logging;
pub mod provider;
pub mod resources;
pub mod retry;
pub mod service;
mod utils;

pub use provider::{ServiceHandle, TencentCloudProvider};
