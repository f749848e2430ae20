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

//! Synchronous-looking calls over the asynchronous request channel.

use crate::error::{LiveDataError, TransportError};
use crate::observability::events;
use crate::transport::{ByteMessageReceiver, ByteRequestSender};
use crate::wire::{self, Correlated};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tracing::warn;

const COMPONENT: &str = "remote_call";

/// One-shot response handler: forwards the first response and ignores any later ones.
struct OneShotResponseReceiver {
    sender: Mutex<Option<oneshot::Sender<Vec<u8>>>>,
}

#[async_trait]
impl ByteMessageReceiver for OneShotResponseReceiver {
    async fn message_received(&self, message: Vec<u8>) {
        let Some(sender) = self.sender.lock().await.take() else {
            warn!(
                event = events::RESPONSE_DUPLICATE,
                component = COMPONENT,
                "response arrived after one was already handled"
            );
            return;
        };
        // The waiter may have given up already; a late response is simply dropped.
        let _ = sender.send(message);
    }
}

/// Sends `request` and waits for its response for at most `timeout`.
///
/// Fails with [`LiveDataError::Timeout`] when the deadline passes, and with
/// [`TransportError::Closed`] when the transport drops the handler without answering.
pub(crate) async fn request_with_deadline(
    request_sender: &dyn ByteRequestSender,
    request: Vec<u8>,
    operation: &'static str,
    timeout: Duration,
) -> Result<Vec<u8>, LiveDataError> {
    let (response_tx, response_rx) = oneshot::channel();
    let receiver = Arc::new(OneShotResponseReceiver {
        sender: Mutex::new(Some(response_tx)),
    });

    request_sender.send_request(request, receiver).await?;

    match tokio::time::timeout(timeout, response_rx).await {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(_)) => Err(LiveDataError::Transport(TransportError::Closed)),
        Err(_) => Err(LiveDataError::Timeout { operation, timeout }),
    }
}

/// Typed wrapper over [`request_with_deadline`] using the wire codec.
///
/// The reply must carry the request's correlation id.
pub(crate) async fn call<Req, Resp>(
    request_sender: &dyn ByteRequestSender,
    request: &Req,
    operation: &'static str,
    timeout: Duration,
) -> Result<Resp, LiveDataError>
where
    Req: Serialize + Correlated,
    Resp: DeserializeOwned + Correlated,
{
    let encoded = wire::encode(request)?;
    let response = request_with_deadline(request_sender, encoded, operation, timeout).await?;
    let response: Resp = wire::decode(&response)?;
    wire::check_correlation(request, &response)?;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::{call, request_with_deadline};
    use crate::error::{LiveDataError, TransportError};
    use crate::specification::UserPrincipal;
    use crate::transport::{ByteMessageReceiver, ByteRequestSender};
    use crate::wire::{self, EntitlementRequestMessage, EntitlementResponseMessage};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use uuid::Uuid;

    /// Echoes the request back as the response, twice.
    struct EchoTwice;

    #[async_trait]
    impl ByteRequestSender for EchoTwice {
        async fn send_request(
            &self,
            request: Vec<u8>,
            response_receiver: Arc<dyn ByteMessageReceiver>,
        ) -> Result<(), TransportError> {
            response_receiver.message_received(request.clone()).await;
            response_receiver.message_received(b"late".to_vec()).await;
            Ok(())
        }
    }

    /// Keeps the handler and never answers.
    #[derive(Default)]
    struct Silent {
        held: Mutex<Vec<Arc<dyn ByteMessageReceiver>>>,
    }

    #[async_trait]
    impl ByteRequestSender for Silent {
        async fn send_request(
            &self,
            _request: Vec<u8>,
            response_receiver: Arc<dyn ByteMessageReceiver>,
        ) -> Result<(), TransportError> {
            self.held.lock().await.push(response_receiver);
            Ok(())
        }
    }

    /// Drops the handler without answering.
    struct Dropping;

    #[async_trait]
    impl ByteRequestSender for Dropping {
        async fn send_request(
            &self,
            _request: Vec<u8>,
            _response_receiver: Arc<dyn ByteMessageReceiver>,
        ) -> Result<(), TransportError> {
            Ok(())
        }
    }

    /// Answers every entitlement request under a fresh correlation id.
    struct Misaddressed;

    #[async_trait]
    impl ByteRequestSender for Misaddressed {
        async fn send_request(
            &self,
            _request: Vec<u8>,
            response_receiver: Arc<dyn ByteMessageReceiver>,
        ) -> Result<(), TransportError> {
            let reply = EntitlementResponseMessage {
                correlation_id: Uuid::new_v4(),
                responses: vec![],
            };
            response_receiver
                .message_received(wire::encode(&reply).unwrap())
                .await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn reply_for_another_request_is_unexpected() {
        let request = EntitlementRequestMessage {
            correlation_id: Uuid::new_v4(),
            user: UserPrincipal::new("trader", "127.0.0.1"),
            specifications: vec![],
        };

        let result: Result<EntitlementResponseMessage, _> =
            call(&Misaddressed, &request, "entitlement check", Duration::from_secs(1)).await;

        assert!(matches!(result, Err(LiveDataError::UnexpectedResponse(_))));
    }

    #[tokio::test]
    async fn first_response_wins() {
        let response = request_with_deadline(
            &EchoTwice,
            b"ping".to_vec(),
            "echo",
            Duration::from_secs(1),
        )
        .await
        .expect("echo should answer");

        assert_eq!(response, b"ping".to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn silence_past_deadline_is_a_timeout() {
        let started = tokio::time::Instant::now();
        let result =
            request_with_deadline(&Silent::default(), vec![], "silent", Duration::from_secs(5))
                .await;

        assert!(matches!(
            result,
            Err(LiveDataError::Timeout {
                operation: "silent",
                ..
            })
        ));
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn dropped_handler_is_a_closed_transport() {
        let result =
            request_with_deadline(&Dropping, vec![], "dropping", Duration::from_secs(5)).await;

        assert!(matches!(
            result,
            Err(LiveDataError::Transport(TransportError::Closed))
        ));
    }
}
