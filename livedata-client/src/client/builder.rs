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

use crate::binding::SubscriptionTransport;
use crate::client::orchestrator::SubscriptionOrchestrator;
use crate::client::LiveDataClient;
use crate::config::LiveDataClientConfig;
use crate::distributor::ValueDistributor;
use crate::entitlement::{EntitlementChecker, PermissiveEntitlementChecker};
use crate::heartbeat::HeartbeatSender;
use crate::observability::events;
use crate::resolver::{PassThroughResolver, SpecificationResolver};
use crate::transport::ByteMessageSender;
use std::sync::Arc;
use tracing::warn;

const COMPONENT: &str = "livedata_client_builder";

/// Assembles a [`LiveDataClient`].
///
/// Without further configuration the client resolves every non-empty specification to
/// itself, entitles everyone, and sends no heartbeats.
pub struct LiveDataClientBuilder {
    transport: Arc<dyn SubscriptionTransport>,
    distributor: Arc<ValueDistributor>,
    resolver: Arc<dyn SpecificationResolver>,
    entitlement_checker: Arc<dyn EntitlementChecker>,
    heartbeat_sender: Option<Arc<dyn ByteMessageSender>>,
    config: LiveDataClientConfig,
}

impl LiveDataClientBuilder {
    pub(crate) fn new(
        transport: Arc<dyn SubscriptionTransport>,
        distributor: Arc<ValueDistributor>,
    ) -> Self {
        Self {
            transport,
            distributor,
            resolver: Arc::new(PassThroughResolver),
            entitlement_checker: Arc::new(PermissiveEntitlementChecker),
            heartbeat_sender: None,
            config: LiveDataClientConfig::default(),
        }
    }

    pub fn config(mut self, config: LiveDataClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn SpecificationResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn entitlement_checker(mut self, entitlement_checker: Arc<dyn EntitlementChecker>) -> Self {
        self.entitlement_checker = entitlement_checker;
        self
    }

    /// Destination of the periodic heartbeat; its period comes from the config.
    pub fn heartbeat_sender(mut self, heartbeat_sender: Arc<dyn ByteMessageSender>) -> Self {
        self.heartbeat_sender = Some(heartbeat_sender);
        self
    }

    pub fn build(self) -> LiveDataClient {
        let distributor = match self.transport.value_distributor() {
            Some(bound) if !Arc::ptr_eq(&bound, &self.distributor) => {
                warn!(
                    event = events::CLIENT_DISTRIBUTOR_REPLACED,
                    component = COMPONENT,
                    "binding delivers updates into another distributor; registering listeners there"
                );
                bound
            }
            _ => self.distributor,
        };

        let heartbeat = self.heartbeat_sender.map(|sender| {
            HeartbeatSender::start(
                distributor.clone(),
                sender,
                self.config.heartbeat_period(),
            )
        });

        let orchestrator = Arc::new(SubscriptionOrchestrator::new(
            self.resolver,
            self.entitlement_checker,
            self.transport,
            distributor,
        ));

        LiveDataClient {
            orchestrator,
            heartbeat,
            config: self.config,
        }
    }
}
