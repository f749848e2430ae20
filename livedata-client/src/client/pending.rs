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

use crate::client::orchestrator::SubscriptionOrchestrator;
use crate::identity::SubscriptionRequestRecord;
use crate::listener::{LiveDataSubscriptionResponse, SubscriptionResult};
use crate::specification::{LiveDataSpecification, UserPrincipal};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

///
/// [`PendingSubscription`] is the completion handle a binding receives for one in-flight
/// subscribe request.
///
/// Only the first completion of a given request has an effect. Completing a handle whose
/// request was already completed or abandoned at close is logged and ignored, so a binding
/// may safely race a failure path against a late response.
#[derive(Clone)]
pub struct PendingSubscription {
    record: SubscriptionRequestRecord,
    token: u64,
    orchestrator: Arc<SubscriptionOrchestrator>,
}

impl PendingSubscription {
    pub(crate) fn new(
        record: SubscriptionRequestRecord,
        token: u64,
        orchestrator: Arc<SubscriptionOrchestrator>,
    ) -> Self {
        Self {
            record,
            token,
            orchestrator,
        }
    }

    pub fn user(&self) -> &UserPrincipal {
        self.record.user()
    }

    pub fn fully_qualified_specification(&self) -> &LiveDataSpecification {
        self.record.fully_qualified_specification()
    }

    /// Hands the server's answer to the client.
    pub async fn complete(self, response: LiveDataSubscriptionResponse) {
        self.orchestrator
            .complete(self.record, self.token, response)
            .await;
    }

    /// Completes the request with a locally produced failure.
    pub async fn fail(self, result: SubscriptionResult, user_message: impl Into<String>) {
        let response = LiveDataSubscriptionResponse::failure(
            self.record.requested_specification.clone(),
            Some(self.record.fully_qualified_specification().clone()),
            result,
            user_message,
        );
        self.complete(response).await;
    }
}

impl Debug for PendingSubscription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingSubscription")
            .field("record", &self.record)
            .field("token", &self.token)
            .finish()
    }
}
