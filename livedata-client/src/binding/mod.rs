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

//! Transport bindings that carry subscription requests to the server and route the
//! resulting value updates back into a [`ValueDistributor`][crate::ValueDistributor].

mod message_queue;
mod request_response;
mod update_dispatcher;

pub use message_queue::MessageQueueSubscriptionTransport;
pub use request_response::RequestResponseSubscriptionTransport;
pub use update_dispatcher::ValueUpdateDispatcher;

use crate::client::PendingSubscription;
use crate::distributor::ValueDistributor;
use crate::error::LiveDataError;
use crate::listener::LiveDataSubscriptionResponse;
use crate::specification::{LiveDataSpecification, UserPrincipal};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

///
/// [`SubscriptionTransport`] is the seam between the subscription orchestration in
/// [`LiveDataClient`][crate::LiveDataClient] and a concrete wire binding.
///
/// A binding never owns subscription bookkeeping. It sends the request described by a
/// [`PendingSubscription`] and, when the server answers, hands the answer back through
/// [`PendingSubscription::complete`]. Publication start and cancel are invoked by the client
/// while it holds the per-stream transition lock, so a binding sees them strictly ordered for
/// any one qualified stream.
#[async_trait]
pub trait SubscriptionTransport: Send + Sync {
    /// Sends the subscribe request for `pending`.
    ///
    /// On `Ok` the binding must eventually complete `pending` (success or failure). On `Err`
    /// the client fails the subscription with `INTERNAL_ERROR` itself.
    async fn send_subscribe_request(
        &self,
        pending: PendingSubscription,
    ) -> Result<(), LiveDataError>;

    /// Called for every successful subscription before its listener is registered.
    ///
    /// Must be idempotent per stream. An error turns the subscription into `INTERNAL_ERROR`.
    async fn start_publication(
        &self,
        _response: &LiveDataSubscriptionResponse,
    ) -> Result<(), LiveDataError> {
        Ok(())
    }

    /// Called once when the last listener of a qualified stream is removed.
    async fn cancel_publication(&self, fully_qualified_specification: &LiveDataSpecification);

    /// Requests one current value and waits up to `timeout` for the answer.
    async fn snapshot(
        &self,
        user: &UserPrincipal,
        requested_specification: &LiveDataSpecification,
        timeout: Duration,
    ) -> Result<LiveDataSubscriptionResponse, LiveDataError>;

    /// The distributor this binding delivers value updates into, if it was given one.
    ///
    /// When present, the client registers listeners here rather than in the distributor
    /// passed to [`LiveDataClient::builder`][crate::LiveDataClient::builder].
    fn value_distributor(&self) -> Option<Arc<ValueDistributor>> {
        None
    }

    /// Releases every resource held by the binding; later requests fail.
    async fn stop(&self) {}
}
