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

use async_trait::async_trait;
use livedata_client::{
    LiveDataError, LiveDataSpecification, LiveDataSubscriptionResponse, PendingSubscription,
    SubscriptionTransport, UserPrincipal, ValueDistributor,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Wraps a binding and counts the calls the client makes on it.
pub struct CountingSubscriptionTransport {
    inner: Arc<dyn SubscriptionTransport>,
    sends: AtomicUsize,
    starts: AtomicUsize,
    cancels: Mutex<HashMap<LiveDataSpecification, usize>>,
    stops: AtomicUsize,
}

impl CountingSubscriptionTransport {
    pub fn new(inner: Arc<dyn SubscriptionTransport>) -> Self {
        Self {
            inner,
            sends: AtomicUsize::new(0),
            starts: AtomicUsize::new(0),
            cancels: Mutex::new(HashMap::new()),
            stops: AtomicUsize::new(0),
        }
    }

    pub fn send_count(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub async fn cancel_count(&self, specification: &LiveDataSpecification) -> usize {
        self.cancels
            .lock()
            .await
            .get(specification)
            .copied()
            .unwrap_or(0)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubscriptionTransport for CountingSubscriptionTransport {
    async fn send_subscribe_request(
        &self,
        pending: PendingSubscription,
    ) -> Result<(), LiveDataError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        self.inner.send_subscribe_request(pending).await
    }

    async fn start_publication(
        &self,
        response: &LiveDataSubscriptionResponse,
    ) -> Result<(), LiveDataError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.inner.start_publication(response).await
    }

    async fn cancel_publication(&self, fully_qualified_specification: &LiveDataSpecification) {
        *self
            .cancels
            .lock()
            .await
            .entry(fully_qualified_specification.clone())
            .or_default() += 1;
        self.inner
            .cancel_publication(fully_qualified_specification)
            .await;
    }

    async fn snapshot(
        &self,
        user: &UserPrincipal,
        requested_specification: &LiveDataSpecification,
        timeout: Duration,
    ) -> Result<LiveDataSubscriptionResponse, LiveDataError> {
        self.inner
            .snapshot(user, requested_specification, timeout)
            .await
    }

    fn value_distributor(&self) -> Option<Arc<ValueDistributor>> {
        self.inner.value_distributor()
    }

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.inner.stop().await;
    }
}
