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

use crate::counting_transport::CountingSubscriptionTransport;
use livedata_client::{
    LiveDataClient, LiveDataClientBuilder, MessageQueueSubscriptionTransport,
    RequestResponseSubscriptionTransport, SubscriptionTransport, ValueDistributor,
    ValueUpdateDispatcher,
};
use loopback_livedata_server::{LoopbackLiveDataServer, TickDistribution};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Installs a test-friendly `tracing` subscriber once; later calls are no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Polls `condition` until it holds or [`WAIT_TIMEOUT`] passes; returns the last outcome.
pub async fn wait_until<F, Fut>(mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// A client wired to a loopback server through a counted binding.
pub struct LoopbackHarness {
    pub server: LoopbackLiveDataServer,
    pub distributor: Arc<ValueDistributor>,
    pub transport: Arc<CountingSubscriptionTransport>,
    pub client: LiveDataClient,
}

impl LoopbackHarness {
    /// Request/response binding with ticks pushed straight to the client.
    pub async fn direct() -> Self {
        Self::build(LoopbackLiveDataServer::new(TickDistribution::Direct), |builder| builder)
            .await
    }

    /// Message-queue binding with ticks on per-stream topics.
    pub async fn topics() -> Self {
        Self::build(LoopbackLiveDataServer::new(TickDistribution::Topics), |builder| builder)
            .await
    }

    /// Wires `server` to a new client using the binding matching its distribution mode.
    pub async fn build<F>(server: LoopbackLiveDataServer, configure: F) -> Self
    where
        F: FnOnce(LiveDataClientBuilder) -> LiveDataClientBuilder,
    {
        init_logging();
        let distributor = Arc::new(ValueDistributor::new());

        let binding: Arc<dyn SubscriptionTransport> = match server.distribution() {
            TickDistribution::Direct => {
                server
                    .connect_tick_receiver(Arc::new(ValueUpdateDispatcher::new(
                        distributor.clone(),
                    )))
                    .await;
                Arc::new(RequestResponseSubscriptionTransport::new(
                    server.subscription_channel(),
                ))
            }
            TickDistribution::Topics => Arc::new(MessageQueueSubscriptionTransport::new(
                server.subscription_channel(),
                server.broker(),
                distributor.clone(),
            )),
        };
        let transport = Arc::new(CountingSubscriptionTransport::new(binding));

        let client = configure(LiveDataClient::builder(transport.clone(), distributor.clone()))
            .build();

        Self {
            server,
            distributor,
            transport,
            client,
        }
    }
}
