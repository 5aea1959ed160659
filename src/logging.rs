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

use std::env;

use tracing_subscriber::EnvFilter;

const DEFAULT_LEVEL: &str = "warn";

/// Filter directives from `TF_LOG_PROVIDER`, then `TF_LOG`
fn directives(provider: Option<String>, global: Option<String>) -> String {
    provider
        .or(global)
        .map(|level| level.trim().to_lowercase())
        .filter(|level| !level.is_empty())
        // Terraform's JSON level logs everything
        .map(|level| if level == "json" { "trace".to_string() } else { level })
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
}

/// Log to stderr, which Terraform forwards to its own log
///
/// Nothing is installed when `PLUGIN_LOG_FILE` is set, as the plugin server logs into that file.
pub fn init() {
    if env::var_os("PLUGIN_LOG_FILE").is_some() {
        return;
    }
    let filter = EnvFilter::try_new(directives(
        env::var("TF_LOG_PROVIDER").ok(),
        env::var("TF_LOG").ok(),
    ))
    .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);
    let result = if env::var_os("TF_LOG_PROVIDER_JSON").is_some() {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(err) = result {
        eprintln!("could not install the log subscriber: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives() {
        assert_eq!(directives(None, None), "warn");
        assert_eq!(directives(None, Some("DEBUG".to_string())), "debug");
        assert_eq!(
            directives(Some("info".to_string()), Some("trace".to_string())),
            "info"
        );
        assert_eq!(directives(Some("JSON".to_string()), None), "trace");
        assert_eq!(directives(Some(" ".to_string()), None), "warn");
    }
}
