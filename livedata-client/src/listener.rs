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

//! Consumer callback contract and the payloads delivered through it.

use crate::specification::LiveDataSpecification;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::{Display, Formatter};

/// Outcome code of a subscription or snapshot request.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionResult {
    Success,
    NotPresent,
    NotAuthorized,
    InternalError,
}

impl Display for SubscriptionResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubscriptionResult::Success => "SUCCESS",
            SubscriptionResult::NotPresent => "NOT_PRESENT",
            SubscriptionResult::NotAuthorized => "NOT_AUTHORIZED",
            SubscriptionResult::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{name}")
    }
}

/// Whether a request asks for a live stream or a one-shot value.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionType {
    NonPersistent,
    Snapshot,
}

/// One tick for one qualified stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LiveDataValueUpdate {
    pub sequence_number: u64,
    /// Milliseconds since the Unix epoch, as stamped by the publisher.
    pub timestamp: u64,
    pub specification: LiveDataSpecification,
    pub fields: BTreeMap<String, Value>,
}

/// Answer to one subscription or snapshot request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LiveDataSubscriptionResponse {
    pub requested_specification: LiveDataSpecification,
    pub fully_qualified_specification: Option<LiveDataSpecification>,
    pub result: SubscriptionResult,
    pub user_message: Option<String>,
    /// Message-queue topic the qualified stream is published on, when the server uses one.
    pub tick_distribution_specification: Option<String>,
    pub snapshot: Option<LiveDataValueUpdate>,
}

impl LiveDataSubscriptionResponse {
    /// Builds a failure response that never reached (or never came back from) the server.
    pub fn failure(
        requested_specification: LiveDataSpecification,
        fully_qualified_specification: Option<LiveDataSpecification>,
        result: SubscriptionResult,
        user_message: impl Into<String>,
    ) -> Self {
        Self {
            requested_specification,
            fully_qualified_specification,
            result,
            user_message: Some(user_message.into()),
            tick_distribution_specification: None,
            snapshot: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == SubscriptionResult::Success
    }
}

///
/// [`LiveDataListener`] is the callback a consumer hands to
/// [`LiveDataClient::subscribe`][crate::LiveDataClient::subscribe].
///
/// Every outcome, including recoverable failures such as `NOT_PRESENT` or `NOT_AUTHORIZED`,
/// arrives through [`subscription_result_received`][LiveDataListener::subscription_result_received].
/// Listener identity is the `Arc` allocation: subscribing the same `Arc` twice to the same
/// stream is one subscription, two different `Arc`s are two.
#[async_trait]
pub trait LiveDataListener: Send + Sync {
    async fn subscription_result_received(&self, response: LiveDataSubscriptionResponse);

    async fn value_update(&self, update: &LiveDataValueUpdate);

    async fn subscription_stopped(&self, fully_qualified_specification: &LiveDataSpecification);
}
