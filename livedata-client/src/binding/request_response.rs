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

//! Binding that carries subscribe and snapshot requests over an asynchronous request channel.

use crate::binding::SubscriptionTransport;
use crate::client::PendingSubscription;
use crate::error::LiveDataError;
use crate::listener::{LiveDataSubscriptionResponse, SubscriptionResult, SubscriptionType};
use crate::observability::{events, fields};
use crate::remote_call;
use crate::specification::{LiveDataSpecification, UserPrincipal};
use crate::transport::{ByteMessageReceiver, ByteRequestSender};
use crate::wire::{self, SubscriptionRequestMessage, SubscriptionResponseMessage};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

const COMPONENT: &str = "request_response_binding";
const SNAPSHOT_OPERATION: &str = "snapshot";

/// Picks the answer for `specification` out of a batched response.
fn select_response(
    message: SubscriptionResponseMessage,
    specification: &LiveDataSpecification,
) -> Option<LiveDataSubscriptionResponse> {
    let mut responses = message.responses;
    let position = responses
        .iter()
        .position(|response| &response.requested_specification == specification)?;
    Some(responses.swap_remove(position))
}

/// Completes one pending subscription with the first response delivered to it.
struct SubscriptionResponseReceiver {
    request: SubscriptionRequestMessage,
    pending: Mutex<Option<PendingSubscription>>,
}

#[async_trait]
impl ByteMessageReceiver for SubscriptionResponseReceiver {
    async fn message_received(&self, message: Vec<u8>) {
        let Some(pending) = self.pending.lock().await.take() else {
            warn!(
                event = events::RESPONSE_DUPLICATE,
                component = COMPONENT,
                "subscription response arrived after one was already handled"
            );
            return;
        };

        let decoded = wire::decode::<SubscriptionResponseMessage>(&message).and_then(|message| {
            wire::check_correlation(&self.request, &message)?;
            Ok(select_response(
                message,
                pending.fully_qualified_specification(),
            ))
        });
        match decoded {
            Ok(Some(response)) => pending.complete(response).await,
            Ok(None) => {
                warn!(
                    event = events::RESPONSE_DECODE_FAILED,
                    component = COMPONENT,
                    qualified_spec = %fields::format_spec(pending.fully_qualified_specification()),
                    "subscription response carried no answer for the stream"
                );
                pending
                    .fail(
                        SubscriptionResult::InternalError,
                        "server answered without a response for the stream",
                    )
                    .await;
            }
            Err(err) => {
                warn!(
                    event = events::RESPONSE_DECODE_FAILED,
                    component = COMPONENT,
                    qualified_spec = %fields::format_spec(pending.fully_qualified_specification()),
                    err = %err,
                    "unusable subscription response"
                );
                pending
                    .fail(
                        SubscriptionResult::InternalError,
                        format!("unusable subscription response: {err}"),
                    )
                    .await;
            }
        }
    }
}

///
/// [`RequestResponseSubscriptionTransport`] sends each subscribe request as one message on
/// the request channel and completes the subscription from the reply.
///
/// Value updates do not flow through this binding. Whatever channel carries them must be
/// wired to a [`ValueUpdateDispatcher`][crate::binding::ValueUpdateDispatcher]. Cancelling a
/// publication sends nothing; the server stops publishing once heartbeats no longer name
/// the stream.
pub struct RequestResponseSubscriptionTransport {
    request_sender: Arc<dyn ByteRequestSender>,
}

impl RequestResponseSubscriptionTransport {
    pub fn new(request_sender: Arc<dyn ByteRequestSender>) -> Self {
        Self { request_sender }
    }
}

#[async_trait]
impl SubscriptionTransport for RequestResponseSubscriptionTransport {
    async fn send_subscribe_request(
        &self,
        pending: PendingSubscription,
    ) -> Result<(), LiveDataError> {
        let request = SubscriptionRequestMessage {
            correlation_id: Uuid::new_v4(),
            user: pending.user().clone(),
            subscription_type: SubscriptionType::NonPersistent,
            specifications: vec![pending.fully_qualified_specification().clone()],
        };
        let encoded = wire::encode(&request)?;

        let receiver = Arc::new(SubscriptionResponseReceiver {
            request,
            pending: Mutex::new(Some(pending)),
        });
        self.request_sender.send_request(encoded, receiver).await?;
        Ok(())
    }

    async fn cancel_publication(&self, fully_qualified_specification: &LiveDataSpecification) {
        debug!(
            event = events::UNSUBSCRIBE_LAST_LISTENER,
            component = COMPONENT,
            qualified_spec = %fields::format_spec(fully_qualified_specification),
            "publication lapses with the next heartbeat"
        );
    }

    async fn snapshot(
        &self,
        user: &UserPrincipal,
        requested_specification: &LiveDataSpecification,
        timeout: Duration,
    ) -> Result<LiveDataSubscriptionResponse, LiveDataError> {
        let request = SubscriptionRequestMessage {
            correlation_id: Uuid::new_v4(),
            user: user.clone(),
            subscription_type: SubscriptionType::Snapshot,
            specifications: vec![requested_specification.clone()],
        };

        let response: SubscriptionResponseMessage = remote_call::call(
            self.request_sender.as_ref(),
            &request,
            SNAPSHOT_OPERATION,
            timeout,
        )
        .await?;

        select_response(response, requested_specification).ok_or_else(|| {
            LiveDataError::UnexpectedResponse(format!(
                "snapshot reply for {requested_specification} carried no answers"
            ))
        })
    }
}
