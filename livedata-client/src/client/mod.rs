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

//! Public client facade.

mod builder;
mod orchestrator;
mod pending;
mod transition_locks;

pub use builder::LiveDataClientBuilder;
pub use pending::PendingSubscription;

use crate::binding::SubscriptionTransport;
use crate::config::LiveDataClientConfig;
use crate::distributor::ValueDistributor;
use crate::error::LiveDataError;
use crate::heartbeat::HeartbeatSender;
use crate::listener::{LiveDataListener, LiveDataValueUpdate};
use crate::observability::events;
use crate::specification::{LiveDataSpecification, UserPrincipal};
use orchestrator::SubscriptionOrchestrator;
use std::collections::{HashMap, HashSet};
use std::slice;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const COMPONENT: &str = "livedata_client";

///
/// [`LiveDataClient`] subscribes consumers to live market-data streams.
///
/// Subscribing resolves the requested specification to a fully-qualified stream, checks the
/// user's entitlement, sends one request per distinct (user, stream, listener) and later
/// delivers the outcome through the listener. Value updates then flow from the transport
/// binding through the shared [`ValueDistributor`] to every listener of the stream, and a
/// background heartbeat keeps the server informed of which streams are still wanted.
///
/// Recoverable outcomes (`NOT_PRESENT`, `NOT_AUTHORIZED`, `INTERNAL_ERROR`) never surface as
/// `Err`; they are delivered to the listener. `Err` is reserved for failures that leave the
/// caller without an answer, such as a resolution or entitlement service timing out.
///
/// Construct with [`LiveDataClient::builder`]. Must be built inside a tokio runtime when a
/// heartbeat destination is configured.
pub struct LiveDataClient {
    orchestrator: Arc<SubscriptionOrchestrator>,
    heartbeat: Option<HeartbeatSender>,
    config: LiveDataClientConfig,
}

impl LiveDataClient {
    /// Starts a builder over `transport`.
    ///
    /// `distributor` must be the one the binding's value updates are delivered into. A
    /// binding that owns its distributor, such as
    /// [`MessageQueueSubscriptionTransport`][crate::MessageQueueSubscriptionTransport], reports
    /// it through [`SubscriptionTransport::value_distributor`] and that one is used instead.
    pub fn builder(
        transport: Arc<dyn SubscriptionTransport>,
        distributor: Arc<ValueDistributor>,
    ) -> LiveDataClientBuilder {
        LiveDataClientBuilder::new(transport, distributor)
    }

    pub fn config(&self) -> &LiveDataClientConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.orchestrator.is_running()
    }

    /// Subscribes `listener` to the stream `requested_specification` resolves to.
    ///
    /// Returns once the request is sent, or once a local outcome (not present, not
    /// authorized, duplicate of an in-flight request) has been delivered to the listener.
    pub async fn subscribe(
        &self,
        user: &UserPrincipal,
        requested_specification: &LiveDataSpecification,
        listener: Arc<dyn LiveDataListener>,
    ) -> Result<(), LiveDataError> {
        self.orchestrator
            .subscribe_all(user, slice::from_ref(requested_specification), listener)
            .await
    }

    /// Batch form of [`subscribe`][LiveDataClient::subscribe]: one resolution and one
    /// entitlement round for the whole batch, then one outcome per specification.
    pub async fn subscribe_all(
        &self,
        user: &UserPrincipal,
        requested_specifications: &[LiveDataSpecification],
        listener: Arc<dyn LiveDataListener>,
    ) -> Result<(), LiveDataError> {
        self.orchestrator
            .subscribe_all(user, requested_specifications, listener)
            .await
    }

    /// Removes `listener` from the stream and tells it via
    /// [`subscription_stopped`][LiveDataListener::subscription_stopped].
    ///
    /// When it was the stream's last listener the binding cancels the publication.
    pub async fn unsubscribe(
        &self,
        user: &UserPrincipal,
        fully_qualified_specification: &LiveDataSpecification,
        listener: Arc<dyn LiveDataListener>,
    ) {
        self.orchestrator
            .unsubscribe(user, fully_qualified_specification, listener)
            .await;
    }

    pub async fn unsubscribe_all(
        &self,
        user: &UserPrincipal,
        fully_qualified_specifications: &[LiveDataSpecification],
        listener: Arc<dyn LiveDataListener>,
    ) {
        for specification in fully_qualified_specifications {
            self.orchestrator
                .unsubscribe(user, specification, listener.clone())
                .await;
        }
    }

    /// Fetches one current value without subscribing.
    pub async fn snapshot(
        &self,
        user: &UserPrincipal,
        requested_specification: &LiveDataSpecification,
        timeout: Duration,
    ) -> Result<LiveDataValueUpdate, LiveDataError> {
        self.orchestrator
            .snapshot(user, requested_specification, timeout)
            .await
    }

    /// Whether `user` may consume the stream `requested_specification` resolves to.
    ///
    /// An unresolvable specification is reported as not entitled.
    pub async fn is_entitled(
        &self,
        user: &UserPrincipal,
        requested_specification: &LiveDataSpecification,
    ) -> Result<bool, LiveDataError> {
        let entitlements = self
            .orchestrator
            .is_entitled_all(user, slice::from_ref(requested_specification))
            .await?;
        Ok(entitlements
            .get(requested_specification)
            .copied()
            .unwrap_or(false))
    }

    pub async fn is_entitled_all(
        &self,
        user: &UserPrincipal,
        requested_specifications: &[LiveDataSpecification],
    ) -> Result<HashMap<LiveDataSpecification, bool>, LiveDataError> {
        self.orchestrator
            .is_entitled_all(user, requested_specifications)
            .await
    }

    /// Streams with at least one registered listener.
    pub fn active_specifications(&self) -> HashSet<LiveDataSpecification> {
        self.orchestrator.distributor().active_specifications()
    }

    pub fn listener_count(&self, fully_qualified_specification: &LiveDataSpecification) -> usize {
        self.orchestrator
            .distributor()
            .listener_count(fully_qualified_specification)
    }

    pub async fn pending_subscription_count(&self) -> usize {
        self.orchestrator.pending_subscription_count().await
    }

    /// Stops the heartbeat and the binding and fails every in-flight subscription with
    /// `INTERNAL_ERROR`. Later subscribes are answered with `INTERNAL_ERROR`; later snapshots
    /// and entitlement queries fail with [`LiveDataError::NotRunning`]. Closing twice is a
    /// no-op.
    pub async fn close(&self) {
        if let Some(heartbeat) = self.heartbeat.as_ref() {
            heartbeat.stop();
        }
        if self.orchestrator.close().await {
            info!(
                event = events::CLIENT_CLOSED,
                component = COMPONENT,
                "live data client closed"
            );
        }
    }
}
