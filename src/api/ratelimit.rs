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
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

pub const DEFAULT_LIMIT: u32 = 20;

/// Per-action request limiter
///
/// Requests of a given action are spread evenly: each request reserves the next free slot,
/// slots being `1s / limit` apart. Requests of different actions never wait for each other.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slots: Mutex<HashMap<String, Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT)
    }
}

impl RateLimiter {
    pub fn new(per_second: u32) -> Self {
        Self {
            interval: Duration::from_secs(1) / per_second.max(1),
            next_slots: Default::default(),
        }
    }

    fn reserve(&self, action: &str) -> Instant {
        let now = Instant::now();
        let mut slots = self
            .next_slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let next = slots.entry(action.to_string()).or_insert(now);
        let slot = (*next).max(now);
        *next = slot + self.interval;
        slot
    }

    /// Wait until `action` can be sent
    pub async fn check(&self, action: &str) {
        let slot = self.reserve(action);
        if slot > Instant::now() {
            tracing::trace!(action, "rate limited");
            tokio::time::sleep_until(slot).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_requests_are_spread() {
        let limiter = RateLimiter::new(4);
        let start = Instant::now();
        for _ in 0..5 {
            limiter.check("DescribeDBInstances").await;
        }
        // 5 requests at 4/s: the last one goes out after 4 intervals
        assert_eq!(start.elapsed(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_actions_are_independent() {
        let limiter = RateLimiter::new(1);
        let start = Instant::now();
        limiter.check("CreateInstances").await;
        limiter.check("DescribeDBInstances").await;
        limiter.check("DescribeAccounts").await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_zero_limit_is_clamped() {
        let limiter = RateLimiter::new(0);
        assert_eq!(limiter.interval, Duration::from_secs(1));
    }
}
