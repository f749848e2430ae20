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

//! # livedata-client
//!
//! `livedata-client` is the consumer side of a streaming market-data protocol. A consumer
//! asks for a stream by a possibly loose [`LiveDataSpecification`]; the client resolves it to
//! a fully-qualified stream, checks that the [`UserPrincipal`] is entitled to it, asks the
//! server to publish it, and fans every value update out to the registered
//! [`LiveDataListener`]s.
//!
//! Typical usage is centered on [`LiveDataClient`], a [`ValueDistributor`] shared with the
//! transport binding, and one of the two bindings:
//!
//! - [`RequestResponseSubscriptionTransport`] for servers that answer subscribe requests on
//!   a request channel and push ticks on a separate channel wired to a
//!   [`ValueUpdateDispatcher`];
//! - [`MessageQueueSubscriptionTransport`] for servers that publish each stream on a
//!   message-queue topic named in the subscription response.
//!
//! Resolution and entitlement are pluggable through [`SpecificationResolver`] and
//! [`EntitlementChecker`]. The remote variants suspend the caller until the service answers
//! or a deadline passes; a deadline is an `Err`, never a silent denial.
//!
//! ## Quick start
//!
//! ```
//! use std::sync::Arc;
//! use livedata_client::{
//!     ExternalId, LiveDataClient, LiveDataSpecification, RequestResponseSubscriptionTransport,
//!     UserPrincipal, ValueDistributor,
//! };
//!
//! # pub mod mock {
//! #     use std::sync::Arc;
//! #     use async_trait::async_trait;
//! #     use livedata_client::{
//! #         ByteMessageReceiver, ByteRequestSender, LiveDataListener, LiveDataSpecification,
//! #         LiveDataSubscriptionResponse, LiveDataValueUpdate, SubscriptionResult,
//! #         TransportError,
//! #     };
//! #     use livedata_client::wire::{self, SubscriptionRequestMessage, SubscriptionResponseMessage};
//! #
//! #     /// Accepts every subscription.
//! #     pub struct AcceptAll;
//! #
//! #     #[async_trait]
//! #     impl ByteRequestSender for AcceptAll {
//! #         async fn send_request(
//! #             &self,
//! #             request: Vec<u8>,
//! #             response_receiver: Arc<dyn ByteMessageReceiver>,
//! #         ) -> Result<(), TransportError> {
//! #             let request: SubscriptionRequestMessage = wire::decode(&request).unwrap();
//! #             let responses = request
//! #                 .specifications
//! #                 .iter()
//! #                 .map(|spec| LiveDataSubscriptionResponse {
//! #                     requested_specification: spec.clone(),
//! #                     fully_qualified_specification: Some(spec.clone()),
//! #                     result: SubscriptionResult::Success,
//! #                     user_message: None,
//! #                     tick_distribution_specification: None,
//! #                     snapshot: None,
//! #                 })
//! #                 .collect();
//! #             let response = SubscriptionResponseMessage {
//! #                 correlation_id: request.correlation_id,
//! #                 requesting_user: request.user,
//! #                 responses,
//! #             };
//! #             response_receiver
//! #                 .message_received(wire::encode(&response).unwrap())
//! #                 .await;
//! #             Ok(())
//! #         }
//! #     }
//! #
//! #     pub struct PrintingListener;
//! #
//! #     #[async_trait]
//! #     impl LiveDataListener for PrintingListener {
//! #         async fn subscription_result_received(&self, response: LiveDataSubscriptionResponse) {
//! #             println!("{}: {}", response.requested_specification, response.result);
//! #         }
//! #         async fn value_update(&self, update: &LiveDataValueUpdate) {
//! #             println!("{:?}", update.fields);
//! #         }
//! #         async fn subscription_stopped(&self, _spec: &LiveDataSpecification) {}
//! #     }
//! # }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let distributor = Arc::new(ValueDistributor::new());
//! let transport = Arc::new(RequestResponseSubscriptionTransport::new(Arc::new(mock::AcceptAll)));
//! let client = LiveDataClient::builder(transport, distributor).build();
//!
//! let user = UserPrincipal::new("trader", "10.0.0.7");
//! let aapl = LiveDataSpecification::new("OpenGamma", [ExternalId::of("TICKER", "AAPL")]);
//! let listener = Arc::new(mock::PrintingListener);
//!
//! client.subscribe(&user, &aapl, listener.clone()).await.unwrap();
//! assert_eq!(client.listener_count(&aapl), 1);
//!
//! client.unsubscribe(&user, &aapl, listener).await;
//! assert!(client.active_specifications().is_empty());
//! client.close().await;
//! # });
//! ```

mod binding;
mod client;
mod config;
mod distributor;
mod entitlement;
mod error;
mod heartbeat;
mod identity;
mod listener;
#[doc(hidden)]
pub mod observability;
mod remote_call;
mod resolver;
mod specification;
mod transport;
pub mod wire;

pub use binding::{
    MessageQueueSubscriptionTransport, RequestResponseSubscriptionTransport,
    SubscriptionTransport, ValueUpdateDispatcher,
};
pub use client::{LiveDataClient, LiveDataClientBuilder, PendingSubscription};
pub use config::{LiveDataClientConfig, UserPermissionEntitlementConfig};
pub use distributor::{ListenerRemoval, ValueDistributor};
pub use entitlement::{
    DistributedEntitlementChecker, EntitlementChecker, PermissionStore,
    PermissiveEntitlementChecker, UserPermissionEntitlementChecker, WildcardPermission,
};
pub use error::{LiveDataError, TransportError};
pub use heartbeat::HeartbeatSender;
pub use identity::{ListenerKey, SubscriptionKey, SubscriptionRequestRecord};
pub use listener::{
    LiveDataListener, LiveDataSubscriptionResponse, LiveDataValueUpdate, SubscriptionResult,
    SubscriptionType,
};
pub use resolver::{DistributedSpecificationResolver, PassThroughResolver, SpecificationResolver};
pub use specification::{ExternalId, LiveDataSpecification, UserPrincipal};
pub use transport::{ByteMessageReceiver, ByteMessageSender, ByteRequestSender, TopicBroker};
