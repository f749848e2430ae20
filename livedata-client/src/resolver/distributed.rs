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

use crate::error::LiveDataError;
use crate::observability::{events, fields};
use crate::remote_call;
use crate::resolver::SpecificationResolver;
use crate::specification::LiveDataSpecification;
use crate::transport::ByteRequestSender;
use crate::wire::{ResolveRequestMessage, ResolveResponseMessage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;
use uuid::Uuid;

const COMPONENT: &str = "distributed_resolver";
const OPERATION: &str = "specification resolution";

/// Resolves specifications by asking a remote resolution service.
///
/// A request that is not answered within the timeout fails with
/// [`LiveDataError::Timeout`]; it is never reported as "unresolvable".
pub struct DistributedSpecificationResolver {
    request_sender: Arc<dyn ByteRequestSender>,
    timeout: Duration,
}

impl DistributedSpecificationResolver {
    pub fn new(request_sender: Arc<dyn ByteRequestSender>, timeout: Duration) -> Self {
        Self {
            request_sender,
            timeout,
        }
    }
}

#[async_trait]
impl SpecificationResolver for DistributedSpecificationResolver {
    async fn resolve(
        &self,
        requested: &LiveDataSpecification,
    ) -> Result<Option<LiveDataSpecification>, LiveDataError> {
        let mut resolved = self.resolve_all(std::slice::from_ref(requested)).await?;
        Ok(resolved.remove(requested).flatten())
    }

    async fn resolve_all(
        &self,
        requested: &[LiveDataSpecification],
    ) -> Result<HashMap<LiveDataSpecification, Option<LiveDataSpecification>>, LiveDataError> {
        let request = ResolveRequestMessage {
            correlation_id: Uuid::new_v4(),
            specifications: requested.to_vec(),
        };

        let response: ResolveResponseMessage = remote_call::call(
            self.request_sender.as_ref(),
            &request,
            OPERATION,
            self.timeout,
        )
        .await
        .inspect_err(|err| {
            if matches!(err, LiveDataError::Timeout { .. }) {
                error!(
                    event = events::RESOLUTION_TIMEOUT,
                    component = COMPONENT,
                    requested_spec = %fields::format_spec_list(requested),
                    "remote resolver did not answer in time"
                );
            }
        })?;

        let mut answers: HashMap<LiveDataSpecification, Option<LiveDataSpecification>> = response
            .resolved
            .into_iter()
            .map(|entry| (entry.requested, entry.resolved))
            .collect();

        Ok(requested
            .iter()
            .map(|spec| (spec.clone(), answers.remove(spec).flatten()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::DistributedSpecificationResolver;
    use crate::error::{LiveDataError, TransportError};
    use crate::resolver::SpecificationResolver;
    use crate::specification::{ExternalId, LiveDataSpecification};
    use crate::transport::{ByteMessageReceiver, ByteRequestSender};
    use crate::wire::{self, ResolveRequestMessage, ResolveResponseMessage, ResolvedSpecification};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;

    /// Qualifies every `TICKER` request with a `BBG` id and refuses everything else.
    struct TickerQualifier;

    #[async_trait]
    impl ByteRequestSender for TickerQualifier {
        async fn send_request(
            &self,
            request: Vec<u8>,
            response_receiver: Arc<dyn ByteMessageReceiver>,
        ) -> Result<(), TransportError> {
            let request: ResolveRequestMessage = wire::decode(&request).unwrap();
            let resolved = request
                .specifications
                .into_iter()
                .map(|requested| {
                    let resolved = requested.identifier("TICKER").map(|ticker| {
                        LiveDataSpecification::new(
                            "OpenGamma",
                            [ExternalId::of("BBG", &format!("{ticker} US Equity"))],
                        )
                    });
                    ResolvedSpecification {
                        requested,
                        resolved,
                    }
                })
                .collect();
            let response = ResolveResponseMessage {
                correlation_id: request.correlation_id,
                resolved,
            };
            response_receiver
                .message_received(wire::encode(&response).unwrap())
                .await;
            Ok(())
        }
    }

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

    #[tokio::test]
    async fn remote_answer_is_used() {
        let resolver =
            DistributedSpecificationResolver::new(Arc::new(TickerQualifier), Duration::from_secs(1));
        let requested = LiveDataSpecification::new("OpenGamma", [ExternalId::of("TICKER", "AAPL")]);
        let unknown = LiveDataSpecification::new("OpenGamma", [ExternalId::of("RIC", "AAPL.O")]);

        let resolved = resolver.resolve(&requested).await.unwrap();
        assert_eq!(
            resolved.and_then(|spec| spec.identifier("BBG").map(str::to_string)),
            Some("AAPL US Equity".to_string())
        );
        assert_eq!(resolver.resolve(&unknown).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_resolution_times_out() {
        let resolver =
            DistributedSpecificationResolver::new(Arc::new(Silent::default()), Duration::from_secs(3));
        let requested = LiveDataSpecification::new("OpenGamma", [ExternalId::of("TICKER", "AAPL")]);

        let result = resolver.resolve(&requested).await;

        assert!(matches!(result, Err(LiveDataError::Timeout { .. })));
    }
}
