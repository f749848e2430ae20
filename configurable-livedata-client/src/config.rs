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

use livedata_client::{
    LiveDataClientConfig, LiveDataSpecification, UserPermissionEntitlementConfig, UserPrincipal,
};
use livedata_static_file::parse_external_id;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub(crate) client: LiveDataClientConfig,
    pub(crate) user: UserPrincipal,
    #[serde(default)]
    pub(crate) distribution: DistributionMode,
    pub(crate) resolution: ResolutionConfig,
    pub(crate) entitlement: EntitlementConfig,
    pub(crate) streams: Vec<StreamConfig>,
    pub(crate) ticks: TickConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DistributionMode {
    #[default]
    Direct,
    Topics,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ServiceMode {
    /// Everything resolves to itself, or everyone is entitled.
    #[default]
    Permissive,
    /// Answered in-process from the static file.
    StaticFile,
    /// Asked of the server, which answers from the static file.
    Remote,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ResolutionConfig {
    #[serde(default)]
    pub(crate) mode: ServiceMode,
    pub(crate) aliases_file: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct EntitlementConfig {
    #[serde(default)]
    pub(crate) mode: ServiceMode,
    pub(crate) permissions_file: Option<String>,
    pub(crate) permission: Option<UserPermissionEntitlementConfig>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct StreamConfig {
    pub(crate) normalization_rule_set_id: String,
    /// Identifiers written as `scheme~value`.
    pub(crate) identifiers: Vec<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct TickConfig {
    pub(crate) per_stream: u32,
    pub(crate) interval_millis: u64,
}

impl StreamConfig {
    pub fn specification(&self) -> Result<LiveDataSpecification, String> {
        let identifiers = self
            .identifiers
            .iter()
            .map(|id| parse_external_id(id).ok_or_else(|| format!("malformed identifier: {id}")))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LiveDataSpecification::new(
            &self.normalization_rule_set_id,
            identifiers,
        ))
    }
}

impl ResolutionConfig {
    /// The alias file, required by every mode except `permissive`.
    pub fn aliases_file(&self) -> Result<Option<&str>, String> {
        match (self.mode, self.aliases_file.as_deref()) {
            (ServiceMode::Permissive, _) => Ok(None),
            (_, Some(file)) => Ok(Some(file)),
            (mode, None) => Err(format!("resolution mode {mode:?} needs an aliases_file")),
        }
    }
}

impl EntitlementConfig {
    /// The permission file and derivation rule, required by every mode except `permissive`.
    pub fn permissions(&self) -> Result<Option<(&str, &UserPermissionEntitlementConfig)>, String> {
        match (
            self.mode,
            self.permissions_file.as_deref(),
            self.permission.as_ref(),
        ) {
            (ServiceMode::Permissive, _, _) => Ok(None),
            (_, Some(file), Some(permission)) => Ok(Some((file, permission))),
            (mode, _, _) => Err(format!(
                "entitlement mode {mode:?} needs a permissions_file and a permission rule"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, DistributionMode, ServiceMode};
    use std::fs;

    fn load(path: &str) -> Config {
        json5::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn sample_configs_parse() {
        let direct = load("config/static-file-direct.json5");
        assert_eq!(direct.distribution, DistributionMode::Direct);
        assert_eq!(direct.entitlement.mode, ServiceMode::StaticFile);
        assert!(direct.entitlement.permissions().unwrap().is_some());

        let remote = load("config/remote-topics.json5");
        assert_eq!(remote.distribution, DistributionMode::Topics);
        assert_eq!(remote.resolution.mode, ServiceMode::Remote);
        assert_eq!(remote.client.heartbeat_period_secs, 2);
        for stream in &remote.streams {
            stream.specification().unwrap();
        }
    }

    #[test]
    fn file_backed_mode_without_file_is_rejected() {
        let config: Config = json5::from_str(
            r#"{
                user: { user_name: "trader", ip_address: "127.0.0.1" },
                resolution: { mode: "static_file" },
                entitlement: {},
                streams: [],
                ticks: { per_stream: 1, interval_millis: 10 },
            }"#,
        )
        .unwrap();

        assert!(config.resolution.aliases_file().is_err());
        assert_eq!(config.entitlement.permissions().unwrap(), None);
    }

    #[test]
    fn malformed_identifier_is_reported() {
        let config: Config = json5::from_str(
            r#"{
                user: { user_name: "trader", ip_address: "127.0.0.1" },
                resolution: {},
                entitlement: {},
                streams: [{ normalization_rule_set_id: "Raw", identifiers: ["AAPL"] }],
                ticks: { per_stream: 1, interval_millis: 10 },
            }"#,
        )
        .unwrap();

        assert!(config.streams[0].specification().is_err());
    }
}
