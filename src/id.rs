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

//! Composite resource ids

use crate::error::{Error, Result};

pub const FIELD_SEPARATOR: &str = "#";

/// Join the parts of a composite id
pub fn join<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(FIELD_SEPARATOR)
}

/// Split a composite id into exactly `N` parts
pub fn split<const N: usize>(id: &str) -> Result<[&str; N]> {
    let parts: Vec<&str> = id.split(FIELD_SEPARATOR).collect();
    parts.try_into().map_err(|_| Error::BrokenId {
        id: id.to_string(),
        expected: N,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join() {
        assert_eq!(join(&["postgres-1", "user"]), "postgres-1#user");
        assert_eq!(join(&["postgres-1", "", "vpc-1"]), "postgres-1##vpc-1");
    }

    #[test]
    fn test_split() {
        let [instance, user] = split::<2>("postgres-1#user").unwrap();
        assert_eq!(instance, "postgres-1");
        assert_eq!(user, "user");

        let [instance, group] = split::<2>("#pgro-1").unwrap();
        assert_eq!(instance, "");
        assert_eq!(group, "pgro-1");
    }

    #[test]
    fn test_split_wrong_arity() {
        assert!(matches!(
            split::<2>("postgres-1"),
            Err(Error::BrokenId { expected: 2, .. })
        ));
        assert!(split::<4>("a#b#c").is_err());
        assert!(split::<2>("a#b#c").is_err());
    }

    #[test]
    fn test_split_inverts_join() {
        let id = join(&["postgres-1", "vpc-1", "subnet-1", "10.0.0.1"]);
        assert_eq!(
            split::<4>(&id).unwrap(),
            ["postgres-1", "vpc-1", "subnet-1", "10.0.0.1"]
        );
    }
}
