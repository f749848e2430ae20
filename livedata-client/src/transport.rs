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

//! Byte-level transport seams.
//!
//! The client never touches sockets or brokers directly. It talks to opaque byte channels
//! through these traits; concrete transports (a message bus, an RPC fabric, the in-process
//! loopback server used by tests) implement them.

use crate::error::TransportError;
use async_trait::async_trait;
use std::sync::Arc;

/// Receives inbound messages: responses, ticks, topic traffic.
#[async_trait]
pub trait ByteMessageReceiver: Send + Sync {
    async fn message_received(&self, message: Vec<u8>);
}

/// Fire-and-forget outbound channel, e.g. the heartbeat destination.
#[async_trait]
pub trait ByteMessageSender: Send + Sync {
    async fn send(&self, message: Vec<u8>) -> Result<(), TransportError>;
}

/// Asynchronous request channel.
///
/// `send_request` returns once the request is handed to the transport; exactly one response
/// is later delivered to `response_receiver`, possibly from another task.
#[async_trait]
pub trait ByteRequestSender: Send + Sync {
    async fn send_request(
        &self,
        request: Vec<u8>,
        response_receiver: Arc<dyn ByteMessageReceiver>,
    ) -> Result<(), TransportError>;
}

/// Message-queue broker addressed by topic name.
#[async_trait]
pub trait TopicBroker: Send + Sync {
    async fn register_consumer(
        &self,
        topic: &str,
        receiver: Arc<dyn ByteMessageReceiver>,
    ) -> Result<(), TransportError>;

    async fn unregister_consumer(&self, topic: &str) -> Result<(), TransportError>;
}
