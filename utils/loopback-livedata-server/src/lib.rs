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

//! # loopback-livedata-server
//!
//! In-process stand-in for a live-data server. It answers subscription, snapshot,
//! entitlement and resolution requests over `livedata-client`'s byte channels, records
//! heartbeats, and publishes ticks either directly to connected receivers or on per-stream
//! topics of a [`LoopbackTopicBroker`].
//!
//! Requests are answered inline on the caller's task unless answering is switched off, in
//! which case they are held until [`LoopbackLiveDataServer::release_held`].

mod broker;

pub use broker::LoopbackTopicBroker;

use async_trait::async_trait;
use livedata_client::wire::{
    self, EntitlementRequestMessage, EntitlementResponse, EntitlementResponseMessage,
    HeartbeatMessage, ResolveRequestMessage, ResolveResponseMessage, ResolvedSpecification,
    SubscriptionRequestMessage, SubscriptionResponseMessage,
};
use livedata_client::{
    ByteMessageReceiver, ByteMessageSender, ByteRequestSender, EntitlementChecker,
    LiveDataSpecification, LiveDataSubscriptionResponse, LiveDataValueUpdate,
    PassThroughResolver, PermissiveEntitlementChecker, SpecificationResolver, SubscriptionResult,
    SubscriptionType, TransportError, UserPrincipal,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tracing::{debug, warn};

const COMPONENT: &str = "loopback_server";

/// How the server pushes ticks to the client.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TickDistribution {
    /// To every receiver passed to [`LoopbackLiveDataServer::connect_tick_receiver`].
    Direct,
    /// On the topic named by [`topic_for`], announced in each successful response.
    Topics,
}

/// Topic on which `specification` is published in [`TickDistribution::Topics`] mode.
pub fn topic_for(specification: &LiveDataSpecification) -> String {
    format!("livedata.ticks.{specification}")
}

#[derive(Clone, Copy, Debug)]
enum Service {
    Subscription,
    Entitlement,
    Resolution,
}

struct HeldRequest {
    service: Service,
    request: Vec<u8>,
    receiver: Arc<dyn ByteMessageReceiver>,
}

#[derive(Default)]
struct ServerState {
    available: Option<HashSet<LiveDataSpecification>>,
    published: HashSet<LiveDataSpecification>,
    last_values: HashMap<LiveDataSpecification, LiveDataValueUpdate>,
    tick_receivers: Vec<Arc<dyn ByteMessageReceiver>>,
    heartbeats: Vec<HeartbeatMessage>,
    held: Vec<HeldRequest>,
    subscription_requests: usize,
    snapshot_requests: usize,
}

struct ServerInner {
    distribution: TickDistribution,
    resolver: Arc<dyn SpecificationResolver>,
    entitlement_checker: Arc<dyn EntitlementChecker>,
    broker: Arc<LoopbackTopicBroker>,
    state: Mutex<ServerState>,
    reachable: AtomicBool,
    answering: AtomicBool,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

impl ServerInner {
    async fn handle(
        &self,
        service: Service,
        request: Vec<u8>,
        receiver: Arc<dyn ByteMessageReceiver>,
    ) {
        let response = match service {
            Service::Subscription => self.handle_subscription(&request).await,
            Service::Entitlement => self.handle_entitlement(&request).await,
            Service::Resolution => self.handle_resolution(&request).await,
        };
        match response {
            Some(response) => receiver.message_received(response).await,
            None => warn!(
                component = COMPONENT,
                service = ?service,
                "dropping request the server could not process"
            ),
        }
    }

    async fn handle_subscription(&self, request: &[u8]) -> Option<Vec<u8>> {
        let request: SubscriptionRequestMessage = wire::decode(request).ok()?;
        {
            let mut state = self.state.lock().await;
            match request.subscription_type {
                SubscriptionType::NonPersistent => state.subscription_requests += 1,
                SubscriptionType::Snapshot => state.snapshot_requests += 1,
            }
        }

        let mut responses = Vec::with_capacity(request.specifications.len());
        for specification in &request.specifications {
            responses.push(
                self.answer_subscription(&request.user, request.subscription_type, specification)
                    .await,
            );
        }

        wire::encode(&SubscriptionResponseMessage {
            correlation_id: request.correlation_id,
            requesting_user: request.user,
            responses,
        })
        .ok()
    }

    async fn answer_subscription(
        &self,
        user: &UserPrincipal,
        subscription_type: SubscriptionType,
        specification: &LiveDataSpecification,
    ) -> LiveDataSubscriptionResponse {
        let known = {
            let state = self.state.lock().await;
            state
                .available
                .as_ref()
                .map_or(true, |available| available.contains(specification))
        };
        if !known {
            return LiveDataSubscriptionResponse::failure(
                specification.clone(),
                None,
                SubscriptionResult::NotPresent,
                format!("{specification} is not published by this server"),
            );
        }

        match self.entitlement_checker.is_entitled(user, specification).await {
            Ok(true) => {}
            Ok(false) => {
                return LiveDataSubscriptionResponse::failure(
                    specification.clone(),
                    Some(specification.clone()),
                    SubscriptionResult::NotAuthorized,
                    format!("{user} is not entitled to {specification}"),
                )
            }
            Err(err) => {
                return LiveDataSubscriptionResponse::failure(
                    specification.clone(),
                    Some(specification.clone()),
                    SubscriptionResult::InternalError,
                    err.to_string(),
                )
            }
        }

        let mut state = self.state.lock().await;
        let last_value = state.last_values.get(specification).cloned();
        let (tick_distribution_specification, snapshot) = match subscription_type {
            SubscriptionType::NonPersistent => {
                state.published.insert(specification.clone());
                let topic = (self.distribution == TickDistribution::Topics)
                    .then(|| topic_for(specification));
                (topic, last_value)
            }
            SubscriptionType::Snapshot => {
                let snapshot = last_value.unwrap_or_else(|| LiveDataValueUpdate {
                    sequence_number: 0,
                    timestamp: now_millis(),
                    specification: specification.clone(),
                    fields: BTreeMap::new(),
                });
                (None, Some(snapshot))
            }
        };

        LiveDataSubscriptionResponse {
            requested_specification: specification.clone(),
            fully_qualified_specification: Some(specification.clone()),
            result: SubscriptionResult::Success,
            user_message: None,
            tick_distribution_specification,
            snapshot,
        }
    }

    async fn handle_entitlement(&self, request: &[u8]) -> Option<Vec<u8>> {
        let request: EntitlementRequestMessage = wire::decode(request).ok()?;
        let mut responses = Vec::with_capacity(request.specifications.len());
        for specification in request.specifications {
            let (is_entitled, message) = match self
                .entitlement_checker
                .is_entitled(&request.user, &specification)
                .await
            {
                Ok(is_entitled) => (is_entitled, None),
                Err(err) => (false, Some(err.to_string())),
            };
            responses.push(EntitlementResponse {
                specification,
                is_entitled,
                message,
            });
        }
        wire::encode(&EntitlementResponseMessage {
            correlation_id: request.correlation_id,
            responses,
        })
        .ok()
    }

    async fn handle_resolution(&self, request: &[u8]) -> Option<Vec<u8>> {
        let request: ResolveRequestMessage = wire::decode(request).ok()?;
        let mut resolved = Vec::with_capacity(request.specifications.len());
        for requested in request.specifications {
            let qualified = self.resolver.resolve(&requested).await.ok().flatten();
            resolved.push(ResolvedSpecification {
                requested,
                resolved: qualified,
            });
        }
        wire::encode(&ResolveResponseMessage {
            correlation_id: request.correlation_id,
            resolved,
        })
        .ok()
    }
}

struct ServiceChannel {
    inner: Arc<ServerInner>,
    service: Service,
}

#[async_trait]
impl ByteRequestSender for ServiceChannel {
    async fn send_request(
        &self,
        request: Vec<u8>,
        response_receiver: Arc<dyn ByteMessageReceiver>,
    ) -> Result<(), TransportError> {
        if !self.inner.reachable.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed(
                "loopback server unreachable".to_string(),
            ));
        }
        if !self.inner.answering.load(Ordering::SeqCst) {
            self.inner.state.lock().await.held.push(HeldRequest {
                service: self.service,
                request,
                receiver: response_receiver,
            });
            return Ok(());
        }
        self.inner
            .handle(self.service, request, response_receiver)
            .await;
        Ok(())
    }
}

struct HeartbeatChannel {
    inner: Arc<ServerInner>,
}

#[async_trait]
impl ByteMessageSender for HeartbeatChannel {
    async fn send(&self, message: Vec<u8>) -> Result<(), TransportError> {
        if !self.inner.reachable.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed(
                "loopback server unreachable".to_string(),
            ));
        }
        let heartbeat: HeartbeatMessage = wire::decode(&message)
            .map_err(|err| TransportError::SendFailed(err.to_string()))?;

        let mut state = self.inner.state.lock().await;
        let wanted: HashSet<&LiveDataSpecification> =
            heartbeat.live_data_specifications.iter().collect();
        state
            .published
            .retain(|specification| wanted.contains(specification));
        debug!(
            component = COMPONENT,
            streams = heartbeat.live_data_specifications.len(),
            "heartbeat received"
        );
        state.heartbeats.push(heartbeat);
        Ok(())
    }
}

///
/// [`LoopbackLiveDataServer`] owns the server-side state and hands out the client-facing
/// channels.
///
/// A stream is published from the first successful subscribe until a heartbeat stops
/// naming it. [`publish`][LoopbackLiveDataServer::publish] always records the value for
/// later snapshots but delivers it only while the stream is published.
#[derive(Clone)]
pub struct LoopbackLiveDataServer {
    inner: Arc<ServerInner>,
}

impl LoopbackLiveDataServer {
    /// A server that knows every stream and entitles everyone.
    pub fn new(distribution: TickDistribution) -> Self {
        Self::with_services(
            distribution,
            Arc::new(PassThroughResolver),
            Arc::new(PermissiveEntitlementChecker),
        )
    }

    pub fn with_services(
        distribution: TickDistribution,
        resolver: Arc<dyn SpecificationResolver>,
        entitlement_checker: Arc<dyn EntitlementChecker>,
    ) -> Self {
        Self {
            inner: Arc::new(ServerInner {
                distribution,
                resolver,
                entitlement_checker,
                broker: Arc::new(LoopbackTopicBroker::new()),
                state: Mutex::new(ServerState::default()),
                reachable: AtomicBool::new(true),
                answering: AtomicBool::new(true),
            }),
        }
    }

    pub fn distribution(&self) -> TickDistribution {
        self.inner.distribution
    }

    pub fn subscription_channel(&self) -> Arc<dyn ByteRequestSender> {
        Arc::new(ServiceChannel {
            inner: self.inner.clone(),
            service: Service::Subscription,
        })
    }

    pub fn entitlement_channel(&self) -> Arc<dyn ByteRequestSender> {
        Arc::new(ServiceChannel {
            inner: self.inner.clone(),
            service: Service::Entitlement,
        })
    }

    pub fn resolution_channel(&self) -> Arc<dyn ByteRequestSender> {
        Arc::new(ServiceChannel {
            inner: self.inner.clone(),
            service: Service::Resolution,
        })
    }

    pub fn heartbeat_channel(&self) -> Arc<dyn ByteMessageSender> {
        Arc::new(HeartbeatChannel {
            inner: self.inner.clone(),
        })
    }

    pub fn broker(&self) -> Arc<LoopbackTopicBroker> {
        self.inner.broker.clone()
    }

    pub async fn connect_tick_receiver(&self, receiver: Arc<dyn ByteMessageReceiver>) {
        self.inner.state.lock().await.tick_receivers.push(receiver);
    }

    /// Limits the streams the server answers `SUCCESS` for; others get `NOT_PRESENT`.
    pub async fn restrict_available(
        &self,
        specifications: impl IntoIterator<Item = LiveDataSpecification>,
    ) {
        self.inner.state.lock().await.available = Some(specifications.into_iter().collect());
    }

    /// While unreachable every channel fails its send.
    pub fn set_reachable(&self, reachable: bool) {
        self.inner.reachable.store(reachable, Ordering::SeqCst);
    }

    /// While not answering, requests are accepted and held without a response.
    pub fn set_answering(&self, answering: bool) {
        self.inner.answering.store(answering, Ordering::SeqCst);
    }

    /// Answers every held request in arrival order; returns how many were answered.
    pub async fn release_held(&self) -> usize {
        let held = std::mem::take(&mut self.inner.state.lock().await.held);
        let count = held.len();
        for request in held {
            self.inner
                .handle(request.service, request.request, request.receiver)
                .await;
        }
        count
    }

    pub async fn held_request_count(&self) -> usize {
        self.inner.state.lock().await.held.len()
    }

    /// Records a new value for `specification` and delivers it if the stream is published.
    ///
    /// Returns whether the tick reached at least one receiver.
    pub async fn publish(
        &self,
        specification: &LiveDataSpecification,
        fields: impl IntoIterator<Item = (&str, Value)>,
    ) -> bool {
        let (message, receivers) = {
            let mut state = self.inner.state.lock().await;
            let sequence_number = state
                .last_values
                .get(specification)
                .map_or(1, |last| last.sequence_number + 1);
            let update = LiveDataValueUpdate {
                sequence_number,
                timestamp: now_millis(),
                specification: specification.clone(),
                fields: fields
                    .into_iter()
                    .map(|(name, value)| (name.to_string(), value))
                    .collect(),
            };
            state
                .last_values
                .insert(specification.clone(), update.clone());

            if !state.published.contains(specification) {
                return false;
            }
            let message = match wire::encode(&update) {
                Ok(message) => message,
                Err(err) => {
                    warn!(component = COMPONENT, err = %err, "unable to encode tick");
                    return false;
                }
            };
            (message, state.tick_receivers.clone())
        };

        match self.inner.distribution {
            TickDistribution::Direct => {
                for receiver in &receivers {
                    receiver.message_received(message.clone()).await;
                }
                !receivers.is_empty()
            }
            TickDistribution::Topics => {
                self.inner
                    .broker
                    .deliver(&topic_for(specification), message)
                    .await
            }
        }
    }

    pub async fn is_publishing(&self, specification: &LiveDataSpecification) -> bool {
        self.inner
            .state
            .lock()
            .await
            .published
            .contains(specification)
    }

    pub async fn heartbeats(&self) -> Vec<HeartbeatMessage> {
        self.inner.state.lock().await.heartbeats.clone()
    }

    pub async fn subscription_request_count(&self) -> usize {
        self.inner.state.lock().await.subscription_requests
    }

    pub async fn snapshot_request_count(&self) -> usize {
        self.inner.state.lock().await.snapshot_requests
    }
}

#[cfg(test)]
mod tests {
    use super::{topic_for, LoopbackLiveDataServer, TickDistribution};
    use async_trait::async_trait;
    use livedata_client::wire::{
        self, HeartbeatMessage, SubscriptionRequestMessage, SubscriptionResponseMessage,
    };
    use livedata_client::{
        ByteMessageReceiver, ExternalId, LiveDataSpecification, SubscriptionResult,
        SubscriptionType, TopicBroker, UserPrincipal,
    };
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct Collect(Mutex<Vec<Vec<u8>>>);

    #[async_trait]
    impl ByteMessageReceiver for Collect {
        async fn message_received(&self, message: Vec<u8>) {
            self.0.lock().await.push(message);
        }
    }

    fn spec() -> LiveDataSpecification {
        LiveDataSpecification::new("OpenGamma", [ExternalId::of("TICKER", "AAPL")])
    }

    async fn subscribe(server: &LoopbackLiveDataServer) -> SubscriptionResponseMessage {
        let request = wire::encode(&SubscriptionRequestMessage {
            correlation_id: Uuid::new_v4(),
            user: UserPrincipal::new("trader", "127.0.0.1"),
            subscription_type: SubscriptionType::NonPersistent,
            specifications: vec![spec()],
        })
        .unwrap();

        let collect = Arc::new(Collect::default());
        server
            .subscription_channel()
            .send_request(request, collect.clone())
            .await
            .unwrap();
        let responses = collect.0.lock().await;
        wire::decode(&responses[0]).unwrap()
    }

    #[tokio::test]
    async fn topic_mode_names_topic_and_publishes_on_it() {
        let server = LoopbackLiveDataServer::new(TickDistribution::Topics);

        let response = subscribe(&server).await;
        assert_eq!(response.responses[0].result, SubscriptionResult::Success);
        assert_eq!(
            response.responses[0].tick_distribution_specification,
            Some(topic_for(&spec()))
        );

        let consumer = Arc::new(Collect::default());
        server
            .broker()
            .register_consumer(&topic_for(&spec()), consumer.clone())
            .await
            .unwrap();
        assert!(server.publish(&spec(), [("LAST", serde_json::json!(1.0))]).await);
        assert_eq!(consumer.0.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn unpublished_value_is_kept_for_snapshots_only() {
        let server = LoopbackLiveDataServer::new(TickDistribution::Direct);
        let receiver = Arc::new(Collect::default());
        server.connect_tick_receiver(receiver.clone()).await;

        assert!(!server.publish(&spec(), [("LAST", serde_json::json!(1.0))]).await);
        let response = subscribe(&server).await;

        assert!(receiver.0.lock().await.is_empty());
        assert_eq!(
            response.responses[0]
                .snapshot
                .as_ref()
                .map(|snapshot| snapshot.sequence_number),
            Some(1)
        );
    }

    #[tokio::test]
    async fn heartbeat_without_stream_stops_publication() {
        let server = LoopbackLiveDataServer::new(TickDistribution::Direct);
        subscribe(&server).await;
        assert!(server.is_publishing(&spec()).await);

        let heartbeat = wire::encode(&HeartbeatMessage {
            live_data_specifications: vec![],
        })
        .unwrap();
        server.heartbeat_channel().send(heartbeat).await.unwrap();

        assert!(!server.is_publishing(&spec()).await);
        assert_eq!(server.heartbeats().await.len(), 1);
    }
}
