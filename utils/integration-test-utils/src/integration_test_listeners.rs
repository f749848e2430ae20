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
    LiveDataListener, LiveDataSpecification, LiveDataSubscriptionResponse, LiveDataValueUpdate,
    SubscriptionResult,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Listener that records every callback it receives.
#[derive(Default)]
pub struct RecordingListener {
    name: String,
    responses: Mutex<Vec<LiveDataSubscriptionResponse>>,
    updates: Mutex<Vec<LiveDataValueUpdate>>,
    stopped: Mutex<Vec<LiveDataSpecification>>,
}

impl RecordingListener {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            ..Default::default()
        })
    }

    pub async fn responses(&self) -> Vec<LiveDataSubscriptionResponse> {
        self.responses.lock().await.clone()
    }

    pub async fn results(&self) -> Vec<SubscriptionResult> {
        self.responses
            .lock()
            .await
            .iter()
            .map(|response| response.result)
            .collect()
    }

    pub async fn updates(&self) -> Vec<LiveDataValueUpdate> {
        self.updates.lock().await.clone()
    }

    pub async fn stopped(&self) -> Vec<LiveDataSpecification> {
        self.stopped.lock().await.clone()
    }

    pub async fn response_count(&self) -> usize {
        self.responses.lock().await.len()
    }

    pub async fn update_count(&self) -> usize {
        self.updates.lock().await.len()
    }
}

#[async_trait]
impl LiveDataListener for RecordingListener {
    async fn subscription_result_received(&self, response: LiveDataSubscriptionResponse) {
        debug!(
            listener = self.name.as_str(),
            result = %response.result,
            requested_spec = %response.requested_specification,
            "subscription result"
        );
        self.responses.lock().await.push(response);
    }

    async fn value_update(&self, update: &LiveDataValueUpdate) {
        debug!(
            listener = self.name.as_str(),
            qualified_spec = %update.specification,
            sequence_number = update.sequence_number,
            "value update"
        );
        self.updates.lock().await.push(update.clone());
    }

    async fn subscription_stopped(&self, fully_qualified_specification: &LiveDataSpecification) {
        self.stopped
            .lock()
            .await
            .push(fully_qualified_specification.clone());
    }
}
