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
use livedata_client::{ByteMessageReceiver, TopicBroker, TransportError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

const COMPONENT: &str = "loopback_broker";

#[derive(Default)]
struct BrokerState {
    consumers: HashMap<String, Arc<dyn ByteMessageReceiver>>,
    registrations: HashMap<String, usize>,
}

/// In-memory topic broker allowing one consumer per topic.
///
/// Registering a second consumer on a consumed topic fails, which makes a client that
/// starts consumption twice visible in tests.
#[derive(Default)]
pub struct LoopbackTopicBroker {
    state: Mutex<BrokerState>,
}

impl LoopbackTopicBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `message` to the topic's consumer; `false` when nobody consumes it.
    pub async fn deliver(&self, topic: &str, message: Vec<u8>) -> bool {
        let consumer = self.state.lock().await.consumers.get(topic).cloned();
        match consumer {
            Some(consumer) => {
                consumer.message_received(message).await;
                true
            }
            None => false,
        }
    }

    pub async fn is_consumed(&self, topic: &str) -> bool {
        self.state.lock().await.consumers.contains_key(topic)
    }

    pub async fn consumed_topic_count(&self) -> usize {
        self.state.lock().await.consumers.len()
    }

    /// How many times a consumer was successfully registered on `topic`.
    pub async fn registration_count(&self, topic: &str) -> usize {
        self.state
            .lock()
            .await
            .registrations
            .get(topic)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl TopicBroker for LoopbackTopicBroker {
    async fn register_consumer(
        &self,
        topic: &str,
        receiver: Arc<dyn ByteMessageReceiver>,
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        if state.consumers.contains_key(topic) {
            return Err(TransportError::ConsumerFailed {
                topic: topic.to_string(),
                reason: "topic already has a consumer".to_string(),
            });
        }
        state.consumers.insert(topic.to_string(), receiver);
        *state.registrations.entry(topic.to_string()).or_default() += 1;
        debug!(component = COMPONENT, topic, "consumer registered");
        Ok(())
    }

    async fn unregister_consumer(&self, topic: &str) -> Result<(), TransportError> {
        match self.state.lock().await.consumers.remove(topic) {
            Some(_) => {
                debug!(component = COMPONENT, topic, "consumer unregistered");
                Ok(())
            }
            None => Err(TransportError::ConsumerFailed {
                topic: topic.to_string(),
                reason: "topic has no consumer".to_string(),
            }),
        }
    }
}
