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

use crate::entitlement::EntitlementChecker;
use crate::error::LiveDataError;
use crate::observability::{events, fields};
use crate::remote_call;
use crate::specification::{LiveDataSpecification, UserPrincipal};
use crate::transport::ByteRequestSender;
use crate::wire::{EntitlementRequestMessage, EntitlementResponseMessage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};
use uuid::Uuid;

const COMPONENT: &str = "distributed_entitlement";
const OPERATION: &str = "entitlement check";

///
/// [`DistributedEntitlementChecker`] asks a remote entitlement service over the request
/// channel and suspends the caller until the answer arrives or the timeout passes.
///
/// The wait is a one-shot channel receive bounded by `tokio::time::timeout`; nothing polls.
/// Past the deadline the call fails with [`LiveDataError::Timeout`], which callers can tell
/// apart from a denial.
pub struct DistributedEntitlementChecker {
    request_sender: Arc<dyn ByteRequestSender>,
    timeout: Duration,
}

impl DistributedEntitlementChecker {
    pub fn new(request_sender: Arc<dyn ByteRequestSender>, timeout: Duration) -> Self {
        Self {
            request_sender,
            timeout,
        }
    }
}

#[async_trait]
impl EntitlementChecker for DistributedEntitlementChecker {
    async fn is_entitled(
        &self,
        user: &UserPrincipal,
        specification: &LiveDataSpecification,
    ) -> Result<bool, LiveDataError> {
        let entitlements = self
            .is_entitled_all(user, std::slice::from_ref(specification))
            .await?;
        entitlements.get(specification).copied().ok_or_else(|| {
            LiveDataError::UnexpectedResponse(format!(
                "no entitlement answer for {specification}"
            ))
        })
    }

    async fn is_entitled_all(
        &self,
        user: &UserPrincipal,
        specifications: &[LiveDataSpecification],
    ) -> Result<HashMap<LiveDataSpecification, bool>, LiveDataError> {
        let request = EntitlementRequestMessage {
            correlation_id: Uuid::new_v4(),
            user: user.clone(),
            specifications: specifications.to_vec(),
        };

        let response: EntitlementResponseMessage = remote_call::call(
            self.request_sender.as_ref(),
            &request,
            OPERATION,
            self.timeout,
        )
        .await
        .inspect_err(|err| {
            if matches!(err, LiveDataError::Timeout { .. }) {
                error!(
                    event = events::ENTITLEMENT_TIMEOUT,
                    component = COMPONENT,
                    user = %user,
                    qualified_spec = %fields::format_spec_list(specifications),
                    timeout = ?self.timeout,
                    "remote entitlement service did not answer in time"
                );
            }
        })?;

        let mut entitlements = HashMap::with_capacity(response.responses.len());
        for answer in response.responses {
            debug!(
                event = events::ENTITLEMENT_CHECK,
                component = COMPONENT,
                user = %user,
                qualified_spec = %fields::format_spec(&answer.specification),
                entitled = answer.is_entitled,
                message = answer.message.as_deref().unwrap_or(fields::NONE),
                "received remote entitlement"
            );
            entitlements.insert(answer.specification, answer.is_entitled);
        }

        let unanswered: Vec<LiveDataSpecification> = specifications
            .iter()
            .filter(|specification| !entitlements.contains_key(*specification))
            .cloned()
            .collect();
        if !unanswered.is_empty() {
            error!(
                event = events::ENTITLEMENT_INCOMPLETE,
                component = COMPONENT,
                user = %user,
                qualified_spec = %fields::format_spec_list(&unanswered),
                "remote entitlement service skipped requested streams"
            );
            return Err(LiveDataError::UnexpectedResponse(format!(
                "no entitlement answer for {}",
                fields::format_spec_list(&unanswered)
            )));
        }
        Ok(entitlements)
    }
}

#[cfg(test)]
mod tests {
    use super::DistributedEntitlementChecker;
    use crate::entitlement::EntitlementChecker;
    use crate::error::{LiveDataError, TransportError};
    use crate::specification::{ExternalId, LiveDataSpecification, UserPrincipal};
    use crate::transport::{ByteMessageReceiver, ByteRequestSender};
    use crate::wire::{
        self, EntitlementRequestMessage, EntitlementResponse, EntitlementResponseMessage,
    };
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use tokio::time::Instant;

    /// Entitles only the user named "trader".
    struct TraderOnly;

    #[async_trait]
    impl ByteRequestSender for TraderOnly {
        async fn send_request(
            &self,
            request: Vec<u8>,
            response_receiver: Arc<dyn ByteMessageReceiver>,
        ) -> Result<(), TransportError> {
            let request: EntitlementRequestMessage = wire::decode(&request).unwrap();
            let entitled = request.user.user_name == "trader";
            let response = EntitlementResponseMessage {
                correlation_id: request.correlation_id,
                responses: request
                    .specifications
                    .into_iter()
                    .map(|specification| EntitlementResponse {
                        specification,
                        is_entitled: entitled,
                        message: None,
                    })
                    .collect(),
            };
            tokio::spawn(async move {
                response_receiver
                    .message_received(wire::encode(&response).unwrap())
                    .await;
            });
            Ok(())
        }
    }

    /// Answers only for streams whose ticker is not "MSFT".
    struct SkipsMsft;

    #[async_trait]
    impl ByteRequestSender for SkipsMsft {
        async fn send_request(
            &self,
            request: Vec<u8>,
            response_receiver: Arc<dyn ByteMessageReceiver>,
        ) -> Result<(), TransportError> {
            let request: EntitlementRequestMessage = wire::decode(&request).unwrap();
            let response = EntitlementResponseMessage {
                correlation_id: request.correlation_id,
                responses: request
                    .specifications
                    .into_iter()
                    .filter(|specification| *specification != spec("MSFT"))
                    .map(|specification| EntitlementResponse {
                        specification,
                        is_entitled: true,
                        message: None,
                    })
                    .collect(),
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

    fn spec(ticker: &str) -> LiveDataSpecification {
        LiveDataSpecification::new("OpenGamma", [ExternalId::of("TICKER", ticker)])
    }

    #[tokio::test]
    async fn remote_grant_and_denial_are_returned() {
        let checker = DistributedEntitlementChecker::new(Arc::new(TraderOnly), Duration::from_secs(5));

        let trader = UserPrincipal::new("trader", "10.0.0.1");
        let guest = UserPrincipal::new("guest", "10.0.0.2");

        assert!(checker.is_entitled(&trader, &spec("AAPL")).await.unwrap());
        assert!(!checker.is_entitled(&guest, &spec("AAPL")).await.unwrap());
    }

    #[tokio::test]
    async fn batch_check_sends_one_request_for_all_specs() {
        let checker = DistributedEntitlementChecker::new(Arc::new(TraderOnly), Duration::from_secs(5));
        let trader = UserPrincipal::new("trader", "10.0.0.1");

        let entitlements = checker
            .is_entitled_all(&trader, &[spec("AAPL"), spec("MSFT")])
            .await
            .unwrap();

        assert_eq!(entitlements.len(), 2);
        assert!(entitlements.values().all(|entitled| *entitled));
    }

    #[tokio::test]
    async fn partial_answer_is_unexpected_not_a_denial() {
        let checker = DistributedEntitlementChecker::new(Arc::new(SkipsMsft), Duration::from_secs(5));
        let trader = UserPrincipal::new("trader", "10.0.0.1");

        let result = checker
            .is_entitled_all(&trader, &[spec("AAPL"), spec("MSFT")])
            .await;

        match result {
            Err(LiveDataError::UnexpectedResponse(message)) => {
                assert!(message.contains("MSFT"));
                assert!(!message.contains("AAPL"));
            }
            other => panic!("expected an unexpected response, got {other:?}"),
        }
        assert!(checker.is_entitled(&trader, &spec("AAPL")).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn silence_fails_fatally_at_the_deadline() {
        let timeout = Duration::from_secs(300);
        let checker = DistributedEntitlementChecker::new(Arc::new(Silent::default()), timeout);
        let trader = UserPrincipal::new("trader", "10.0.0.1");

        let started = Instant::now();
        let result = checker.is_entitled(&trader, &spec("AAPL")).await;
        let waited = started.elapsed();

        assert!(matches!(result, Err(LiveDataError::Timeout { .. })));
        assert!(waited >= timeout);
        assert!(waited < timeout + Duration::from_secs(1));
    }
}
