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

//! Typed access to the PostgreSQL API shared by every resource and data source

mod account;
mod backup;
mod instance;
pub mod models;
mod network;
mod parameter;
mod readonly;
mod tag;

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use crate::api::{ApiError, Client};
use crate::error::Error;

pub use account::ACCOUNT_STATUS_LOCKED;
pub use backup::{
    backup_period_days, BaseBackupQuery, BACKUP_PERIOD_TYPE_MONTH, BACKUP_PERIOD_TYPE_WEEK,
    MONTHLY_PLAN_NAME,
};
pub use instance::{filter_versions, instance_exists};
pub use network::{find_private_net_info, NetworkTarget, NET_STATUS_OPENED};
pub use parameter::{ParameterTemplateAttributes, ParameterTemplateChange};
pub use readonly::GROUP_STATUS_OK;
pub use tag::TagDiff;

pub const SERVICE: &str = "postgres";
pub const VERSION: &str = "2017-03-12";

pub const STATUS_RUNNING: &str = "running";
pub const STATUS_ISOLATED: &str = "isolated";
pub const STATUS_RECYCLED: &str = "recycled";
pub const STATUS_OFFLINE: &str = "offline";
/// Reported by refreshers once the watched object is gone
pub const STATUS_CLOSED: &str = "closed";

/// Transient statuses during which reads are retried
pub const RETRYABLE_STATUS: &[&str] = &["initing", "expanding", "switching", "restarting"];

pub const PAY_TYPE_PREPAID: &str = "PREPAID";
pub const PAY_TYPE_POSTPAID: &str = "POSTPAID_BY_HOUR";
const POSTGRESQL_PAY_TYPE_PREPAID: &str = "prepaid";

pub const CHARSET_UTF8: &str = "UTF8";
pub const CHARSET_LATIN1: &str = "LATIN1";

pub const DEFAULT_ENGINE_VERSION: &str = "10.4";

pub const INSTANCE_NOT_FOUND: &str = "ResourceNotFound.InstanceNotFoundError";
pub const INVALID_PARAMETER: &str = "InvalidParameter";
pub const INSTANCE_STATUS_LIMIT: &str = "OperationDenied.InstanceStatusLimitOpError";
pub const FAILED_OPERATION_ERROR: &str = "FailedOperation.FailedOperationError";

/// Normalize the billing mode reported by the API
pub fn charge_type(pay_type: &str) -> &'static str {
    if pay_type == POSTGRESQL_PAY_TYPE_PREPAID || pay_type == PAY_TYPE_PREPAID {
        PAY_TYPE_PREPAID
    } else {
        PAY_TYPE_POSTPAID
    }
}

/// Whether the error means the instance does not exist (anymore)
pub fn is_not_found(err: &Error) -> bool {
    err.code() == Some(INSTANCE_NOT_FOUND)
}

/// Client of the PostgreSQL API
#[derive(Debug, Clone)]
pub struct PostgresqlService {
    client: Arc<Client>,
}

impl PostgresqlService {
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn region(&self) -> &str {
        self.client.region()
    }

    async fn call<Req, Resp>(&self, action: &str, request: &Req) -> Result<Resp, ApiError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        self.client.call(SERVICE, VERSION, action, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;

    #[test]
    fn test_charge_type() {
        assert_eq!(charge_type("prepaid"), PAY_TYPE_PREPAID);
        assert_eq!(charge_type("PREPAID"), PAY_TYPE_PREPAID);
        assert_eq!(charge_type("postpaid"), PAY_TYPE_POSTPAID);
        assert_eq!(charge_type(""), PAY_TYPE_POSTPAID);
    }

    #[test]
    fn test_is_not_found() {
        let err: Error = ApiError::service(INSTANCE_NOT_FOUND, "gone").into();
        assert!(is_not_found(&err));
        let err: Error = ApiError::service(INVALID_PARAMETER, "bad").into();
        assert!(!is_not_found(&err));
    }
}
