/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_HEARTBEAT_PERIOD_SECS: u64 = 5 * 60;
const DEFAULT_ENTITLEMENT_TIMEOUT_SECS: u64 = 5 * 60;
const DEFAULT_RESOLUTION_TIMEOUT_SECS: u64 = 5 * 60;
const DEFAULT_SNAPSHOT_TIMEOUT_MILLIS: u64 = 30_000;

/// Timing knobs of a [`LiveDataClient`][crate::LiveDataClient].
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LiveDataClientConfig {
    pub heartbeat_period_secs: u64,
    pub entitlement_timeout_secs: u64,
    pub resolution_timeout_secs: u64,
    pub snapshot_timeout_millis: u64,
}

impl Default for LiveDataClientConfig {
    fn default() -> Self {
        Self {
            heartbeat_period_secs: DEFAULT_HEARTBEAT_PERIOD_SECS,
            entitlement_timeout_secs: DEFAULT_ENTITLEMENT_TIMEOUT_SECS,
            resolution_timeout_secs: DEFAULT_RESOLUTION_TIMEOUT_SECS,
            snapshot_timeout_millis: DEFAULT_SNAPSHOT_TIMEOUT_MILLIS,
        }
    }
}

impl LiveDataClientConfig {
    pub fn from_json5_str(contents: &str) -> Result<Self, json5::Error> {
        json5::from_str(contents)
    }

    pub fn heartbeat_period(&self) -> Duration {
        Duration::from_secs(self.heartbeat_period_secs)
    }

    pub fn entitlement_timeout(&self) -> Duration {
        Duration::from_secs(self.entitlement_timeout_secs)
    }

    pub fn resolution_timeout(&self) -> Duration {
        Duration::from_secs(self.resolution_timeout_secs)
    }

    pub fn snapshot_timeout(&self) -> Duration {
        Duration::from_millis(self.snapshot_timeout_millis)
    }
}

/// How a user-permission entitlement checker derives the permission it asks for.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct UserPermissionEntitlementConfig {
    /// Prepended verbatim, e.g. `"LiveData:Bloomberg:"`.
    pub permission_prefix: String,
    /// Identifier scheme whose value completes the permission string.
    pub identifier_scheme: String,
}

#[cfg(test)]
mod tests {
    use super::LiveDataClientConfig;
    use std::time::Duration;

    #[test]
    fn defaults_match_five_minute_periods() {
        let config = LiveDataClientConfig::default();

        assert_eq!(config.heartbeat_period(), Duration::from_secs(300));
        assert_eq!(config.entitlement_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn partial_json5_keeps_remaining_defaults() {
        let config = LiveDataClientConfig::from_json5_str(
            "{ heartbeat_period_secs: 10, // short for demos\n }",
        )
        .expect("config should parse");

        assert_eq!(config.heartbeat_period(), Duration::from_secs(10));
        assert_eq!(config.snapshot_timeout(), Duration::from_millis(30_000));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(LiveDataClientConfig::from_json5_str("{ heartbeat: 1 }").is_err());
    }
}
