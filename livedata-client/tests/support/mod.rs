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

#![allow(dead_code)]

use async_trait::async_trait;
use livedata_client::wire::{
    self, EntitlementRequestMessage, EntitlementResponseMessage, SubscriptionRequestMessage,
    SubscriptionResponseMessage,
};
use livedata_client::{
    ByteMessageReceiver, ByteRequestSender, EntitlementChecker, LiveDataError,
    LiveDataSpecification, LiveDataSubscriptionResponse, SpecificationResolver,
    SubscriptionResult, TransportError, UserPrincipal,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Entitles everything except the listed streams, counting each check.
pub(crate) struct DenyListChecker {
    denied: HashSet<LiveDataSpecification>,
    checks: AtomicUsize,
}

impl DenyListChecker {
    pub(crate) fn denying(denied: impl IntoIterator<Item = LiveDataSpecification>) -> Arc<Self> {
        Arc::new(Self {
            denied: denied.into_iter().collect(),
            checks: AtomicUsize::new(0),
        })
    }

    pub(crate) fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntitlementChecker for DenyListChecker {
    async fn is_entitled(
        &self,
        _user: &UserPrincipal,
        specification: &LiveDataSpecification,
    ) -> Result<bool, LiveDataError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        Ok(!self.denied.contains(specification))
    }
}

/// Resolves only the listed streams, each to itself.
pub(crate) struct KnownStreamsResolver {
    known: HashSet<LiveDataSpecification>,
}

impl KnownStreamsResolver {
    pub(crate) fn knowing(known: impl IntoIterator<Item = LiveDataSpecification>) -> Arc<Self> {
        Arc::new(Self {
            known: known.into_iter().collect(),
        })
    }
}

#[async_trait]
impl SpecificationResolver for KnownStreamsResolver {
    async fn resolve(
        &self,
        requested: &LiveDataSpecification,
    ) -> Result<Option<LiveDataSpecification>, LiveDataError> {
        Ok(self.known.contains(requested).then(|| requested.clone()))
    }
}

/// Entitlement service that acknowledges each request but answers for none of its streams.
pub(crate) struct EmptyEntitlementAnswers;

#[async_trait]
impl ByteRequestSender for EmptyEntitlementAnswers {
    async fn send_request(
        &self,
        request: Vec<u8>,
        response_receiver: Arc<dyn ByteMessageReceiver>,
    ) -> Result<(), TransportError> {
        let request: EntitlementRequestMessage = wire::decode(&request).unwrap();
        let reply = EntitlementResponseMessage {
            correlation_id: request.correlation_id,
            responses: vec![],
        };
        response_receiver
            .message_received(wire::encode(&reply).unwrap())
            .await;
        Ok(())
    }
}

/// Subscription service that accepts every stream but stamps replies with a new correlation id.
pub(crate) struct ForeignSubscriptionReplies;

#[async_trait]
impl ByteRequestSender for ForeignSubscriptionReplies {
    async fn send_request(
        &self,
        request: Vec<u8>,
        response_receiver: Arc<dyn ByteMessageReceiver>,
    ) -> Result<(), TransportError> {
        let request: SubscriptionRequestMessage = wire::decode(&request).unwrap();
        let responses = request
            .specifications
            .iter()
            .map(|specification| LiveDataSubscriptionResponse {
                requested_specification: specification.clone(),
                fully_qualified_specification: Some(specification.clone()),
                result: SubscriptionResult::Success,
                user_message: None,
                tick_distribution_specification: None,
                snapshot: None,
            })
            .collect();
        let reply = SubscriptionResponseMessage {
            correlation_id: Uuid::new_v4(),
            requesting_user: request.user,
            responses,
        };
        response_receiver
            .message_received(wire::encode(&reply).unwrap())
            .await;
        Ok(())
    }
}
