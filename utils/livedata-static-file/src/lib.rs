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

//! File-backed permission store and specification resolver for demos and tests.
//!
//! Both read their JSON file on every call, so edits take effect without a restart.

use async_trait::async_trait;
use livedata_client::{
    ExternalId, LiveDataError, LiveDataSpecification, PermissionStore, SpecificationResolver,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::{self, canonicalize};
use std::path::PathBuf;
use tracing::{debug, error};

const COMPONENT: &str = "livedata_static_file";
const SCHEME_DIVIDER: char = '~';

#[derive(Debug)]
enum StaticFileError {
    NotFound(std::io::Error),
    Unreadable(std::io::Error),
    Unparsable(serde_json::Error),
}

impl std::fmt::Display for StaticFileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StaticFileError::NotFound(err) => write!(f, "static file not found: {err}"),
            StaticFileError::Unreadable(err) => write!(f, "unable to read static file: {err}"),
            StaticFileError::Unparsable(err) => write!(f, "unable to parse static file: {err}"),
        }
    }
}

fn read_json<T: DeserializeOwned>(static_file: &str) -> Result<T, StaticFileError> {
    let path = canonicalize(PathBuf::from(static_file)).map_err(StaticFileError::NotFound)?;
    debug!(component = COMPONENT, path = ?path, "reading static file");
    let data = fs::read_to_string(path).map_err(StaticFileError::Unreadable)?;
    serde_json::from_str(&data).map_err(StaticFileError::Unparsable)
}

/// Permission store backed by a JSON object of user name to permission strings.
///
/// ```json
/// { "trader": ["LiveData:Bloomberg:AAPL US Equity"], "admin": ["*"] }
/// ```
pub struct StaticFilePermissionStore {
    static_file: String,
}

impl StaticFilePermissionStore {
    pub fn new(static_file: String) -> Self {
        Self { static_file }
    }
}

#[async_trait]
impl PermissionStore for StaticFilePermissionStore {
    async fn permissions(&self, user_name: &str) -> Option<Vec<String>> {
        let mut users: HashMap<String, Vec<String>> = match read_json(&self.static_file) {
            Ok(users) => users,
            Err(err) => {
                error!(
                    component = COMPONENT,
                    static_file = self.static_file.as_str(),
                    err = %err,
                    "permission file unusable; treating user as unknown"
                );
                return None;
            }
        };
        users.remove(user_name)
    }
}

#[derive(Debug, Deserialize)]
struct AliasFile {
    normalization_rule_set_id: String,
    canonical_scheme: String,
    /// `scheme~value` of a requested identifier to the canonical identifier value.
    aliases: HashMap<String, String>,
}

impl AliasFile {
    fn resolve(&self, requested: &LiveDataSpecification) -> Option<LiveDataSpecification> {
        let canonical_value = requested
            .identifier(&self.canonical_scheme)
            .map(str::to_string)
            .or_else(|| {
                requested
                    .identifiers
                    .iter()
                    .find_map(|id| self.aliases.get(&id.to_string()).cloned())
            })?;

        Some(LiveDataSpecification::new(
            &self.normalization_rule_set_id,
            [ExternalId::of(&self.canonical_scheme, &canonical_value)],
        ))
    }
}

/// Resolver backed by a JSON alias table.
///
/// A request already carrying the canonical scheme resolves to that identifier; otherwise
/// the first identifier listed in `aliases` wins. Anything else does not resolve.
pub struct StaticFileSpecificationResolver {
    static_file: String,
}

impl StaticFileSpecificationResolver {
    pub fn new(static_file: String) -> Self {
        Self { static_file }
    }
}

#[async_trait]
impl SpecificationResolver for StaticFileSpecificationResolver {
    async fn resolve(
        &self,
        requested: &LiveDataSpecification,
    ) -> Result<Option<LiveDataSpecification>, LiveDataError> {
        let aliases: AliasFile = match read_json(&self.static_file) {
            Ok(aliases) => aliases,
            Err(StaticFileError::Unparsable(err)) => return Err(LiveDataError::Codec(err)),
            Err(err) => {
                error!(
                    component = COMPONENT,
                    static_file = self.static_file.as_str(),
                    err = %err,
                    "alias file unusable; nothing resolves"
                );
                return Ok(None);
            }
        };

        let resolved = aliases.resolve(requested);
        debug!(
            component = COMPONENT,
            requested_spec = %requested,
            qualified_spec = %resolved
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "none".to_string()),
            "resolved from alias file"
        );
        Ok(resolved)
    }
}

/// Parses `scheme~value` into an identifier.
pub fn parse_external_id(scheme_value: &str) -> Option<ExternalId> {
    let (scheme, value) = scheme_value.split_once(SCHEME_DIVIDER)?;
    (!scheme.is_empty() && !value.is_empty()).then(|| ExternalId::of(scheme, value))
}
