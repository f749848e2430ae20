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

//! Binding that receives value updates from per-stream message-queue topics.

use crate::binding::{
    RequestResponseSubscriptionTransport, SubscriptionTransport, ValueUpdateDispatcher,
};
use crate::client::PendingSubscription;
use crate::distributor::ValueDistributor;
use crate::error::LiveDataError;
use crate::listener::LiveDataSubscriptionResponse;
use crate::observability::{events, fields};
use crate::specification::{LiveDataSpecification, UserPrincipal};
use crate::transport::{ByteRequestSender, TopicBroker};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const COMPONENT: &str = "message_queue_binding";

#[derive(Default)]
struct TopicConsumers {
    /// Topics with a registered consumer.
    consuming: HashSet<String>,
    /// Qualified stream to the topic it is published on.
    stream_topics: HashMap<LiveDataSpecification, String>,
}

///
/// [`MessageQueueSubscriptionTransport`] sends subscribe requests like
/// [`RequestResponseSubscriptionTransport`] and then consumes the topic named in each
/// successful response.
///
/// Starting consumption is idempotent per topic: a topic already being consumed is never
/// registered twice. When the last stream on a topic is cancelled its consumer is
/// unregistered. [`stop`][SubscriptionTransport::stop] unregisters every consumer and makes
/// further publication starts fail with [`LiveDataError::NotRunning`].
pub struct MessageQueueSubscriptionTransport {
    requests: RequestResponseSubscriptionTransport,
    broker: Arc<dyn TopicBroker>,
    distributor: Arc<ValueDistributor>,
    consumers: Mutex<TopicConsumers>,
    running: AtomicBool,
}

impl MessageQueueSubscriptionTransport {
    pub fn new(
        request_sender: Arc<dyn ByteRequestSender>,
        broker: Arc<dyn TopicBroker>,
        distributor: Arc<ValueDistributor>,
    ) -> Self {
        Self {
            requests: RequestResponseSubscriptionTransport::new(request_sender),
            broker,
            distributor,
            consumers: Mutex::new(TopicConsumers::default()),
            running: AtomicBool::new(true),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn consumed_topics(&self) -> HashSet<String> {
        self.consumers.lock().await.consuming.clone()
    }
}

#[async_trait]
impl SubscriptionTransport for MessageQueueSubscriptionTransport {
    async fn send_subscribe_request(
        &self,
        pending: PendingSubscription,
    ) -> Result<(), LiveDataError> {
        if !self.is_running() {
            return Err(LiveDataError::NotRunning);
        }
        self.requests.send_subscribe_request(pending).await
    }

    async fn start_publication(
        &self,
        response: &LiveDataSubscriptionResponse,
    ) -> Result<(), LiveDataError> {
        if !self.is_running() {
            return Err(LiveDataError::NotRunning);
        }
        let (Some(fully_qualified), Some(topic)) = (
            response.fully_qualified_specification.as_ref(),
            response.tick_distribution_specification.as_deref(),
        ) else {
            return Err(LiveDataError::UnexpectedResponse(format!(
                "successful response for {} names no distribution topic",
                response.requested_specification
            )));
        };

        let mut consumers = self.consumers.lock().await;
        consumers
            .stream_topics
            .insert(fully_qualified.clone(), topic.to_string());

        if consumers.consuming.contains(topic) {
            debug!(
                event = events::TOPIC_CONSUMER_REUSE,
                component = COMPONENT,
                topic,
                qualified_spec = %fields::format_spec(fully_qualified),
                "topic already consumed"
            );
            return Ok(());
        }

        let dispatcher = Arc::new(ValueUpdateDispatcher::for_topic(
            self.distributor.clone(),
            topic,
        ));
        if let Err(err) = self.broker.register_consumer(topic, dispatcher).await {
            warn!(
                event = events::TOPIC_CONSUMER_START_FAILED,
                component = COMPONENT,
                topic,
                err = %err,
                "unable to start topic consumer"
            );
            consumers.stream_topics.remove(fully_qualified);
            return Err(err.into());
        }
        consumers.consuming.insert(topic.to_string());
        info!(
            event = events::TOPIC_CONSUMER_START,
            component = COMPONENT,
            topic,
            qualified_spec = %fields::format_spec(fully_qualified),
            "topic consumer started"
        );
        Ok(())
    }

    async fn cancel_publication(&self, fully_qualified_specification: &LiveDataSpecification) {
        let mut consumers = self.consumers.lock().await;
        let Some(topic) = consumers.stream_topics.remove(fully_qualified_specification) else {
            return;
        };
        if consumers.stream_topics.values().any(|other| *other == topic) {
            return;
        }
        if !consumers.consuming.remove(&topic) {
            return;
        }

        match self.broker.unregister_consumer(&topic).await {
            Ok(()) => info!(
                event = events::TOPIC_CONSUMER_STOP,
                component = COMPONENT,
                topic = topic.as_str(),
                qualified_spec = %fields::format_spec(fully_qualified_specification),
                "topic consumer stopped"
            ),
            Err(err) => warn!(
                event = events::TOPIC_CONSUMER_STOP_FAILED,
                component = COMPONENT,
                topic = topic.as_str(),
                err = %err,
                "unable to stop topic consumer"
            ),
        }
    }

    async fn snapshot(
        &self,
        user: &UserPrincipal,
        requested_specification: &LiveDataSpecification,
        timeout: Duration,
    ) -> Result<LiveDataSubscriptionResponse, LiveDataError> {
        if !self.is_running() {
            return Err(LiveDataError::NotRunning);
        }
        self.requests
            .snapshot(user, requested_specification, timeout)
            .await
    }

    fn value_distributor(&self) -> Option<Arc<ValueDistributor>> {
        Some(self.distributor.clone())
    }

    async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);

        let mut consumers = self.consumers.lock().await;
        consumers.stream_topics.clear();
        for topic in std::mem::take(&mut consumers.consuming) {
            match self.broker.unregister_consumer(&topic).await {
                Ok(()) => info!(
                    event = events::TOPIC_CONSUMER_STOP,
                    component = COMPONENT,
                    topic = topic.as_str(),
                    reason = fields::REASON_TRANSPORT_STOPPED,
                    "topic consumer stopped"
                ),
                Err(err) => warn!(
                    event = events::TOPIC_CONSUMER_STOP_FAILED,
                    component = COMPONENT,
                    topic = topic.as_str(),
                    err = %err,
                    "unable to stop topic consumer"
                ),
            }
        }
    }
}
