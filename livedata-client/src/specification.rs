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

//! Stream specifications and consumer principals.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fmt::{Display, Formatter};

/// One `scheme~value` identifier of a market-data stream.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ExternalId {
    pub scheme: String,
    pub value: String,
}

impl ExternalId {
    pub fn of(scheme: &str, value: &str) -> Self {
        Self {
            scheme: scheme.to_string(),
            value: value.to_string(),
        }
    }
}

impl Display for ExternalId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}~{}", self.scheme, self.value)
    }
}

///
/// [`LiveDataSpecification`] names "what data" a consumer wants: a normalization rule set
/// plus a bundle of identifiers.
///
/// The same type is used for the caller-supplied *requested* specification and for the
/// *qualified* (canonical) specification a resolver produces. Equality, ordering and hashing
/// are structural; identifiers are held in a sorted set so two bundles listing the same ids in
/// a different order compare equal.
///
/// # Examples
///
/// ```
/// use livedata_client::{ExternalId, LiveDataSpecification};
///
/// let a = LiveDataSpecification::new(
///     "OpenGamma",
///     [ExternalId::of("TICKER", "AAPL"), ExternalId::of("BBG", "AAPL US Equity")],
/// );
/// let b = LiveDataSpecification::new(
///     "OpenGamma",
///     [ExternalId::of("BBG", "AAPL US Equity"), ExternalId::of("TICKER", "AAPL")],
/// );
/// assert_eq!(a, b);
/// assert_eq!(a.identifier("BBG"), Some("AAPL US Equity"));
/// ```
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct LiveDataSpecification {
    pub normalization_rule_set_id: String,
    pub identifiers: BTreeSet<ExternalId>,
}

impl LiveDataSpecification {
    pub fn new(
        normalization_rule_set_id: &str,
        identifiers: impl IntoIterator<Item = ExternalId>,
    ) -> Self {
        Self {
            normalization_rule_set_id: normalization_rule_set_id.to_string(),
            identifiers: identifiers.into_iter().collect(),
        }
    }

    /// Returns the value of the first identifier with the given scheme.
    pub fn identifier(&self, scheme: &str) -> Option<&str> {
        self.identifiers
            .iter()
            .find(|id| id.scheme == scheme)
            .map(|id| id.value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }
}

impl Display for LiveDataSpecification {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.normalization_rule_set_id)?;
        for (index, id) in self.identifiers.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{id}")?;
        }
        write!(f, "]")
    }
}

/// The consumer on whose behalf data is requested.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct UserPrincipal {
    pub user_name: String,
    pub ip_address: String,
}

impl UserPrincipal {
    pub fn new(user_name: &str, ip_address: &str) -> Self {
        Self {
            user_name: user_name.to_string(),
            ip_address: ip_address.to_string(),
        }
    }
}

impl Display for UserPrincipal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user_name, self.ip_address)
    }
}
