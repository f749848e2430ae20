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

use crate::distributor::ValueDistributor;
use crate::listener::LiveDataValueUpdate;
use crate::observability::{events, fields};
use crate::transport::ByteMessageReceiver;
use crate::wire;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

const COMPONENT: &str = "update_dispatcher";

/// Decodes inbound value-update messages and fans them out through a [`ValueDistributor`].
///
/// Undecodable messages are logged and dropped.
pub struct ValueUpdateDispatcher {
    distributor: Arc<ValueDistributor>,
    topic: Option<String>,
}

impl ValueUpdateDispatcher {
    pub fn new(distributor: Arc<ValueDistributor>) -> Self {
        Self {
            distributor,
            topic: None,
        }
    }

    pub(crate) fn for_topic(distributor: Arc<ValueDistributor>, topic: &str) -> Self {
        Self {
            distributor,
            topic: Some(topic.to_string()),
        }
    }

    fn topic(&self) -> &str {
        self.topic.as_deref().unwrap_or(fields::NONE)
    }
}

#[async_trait]
impl ByteMessageReceiver for ValueUpdateDispatcher {
    async fn message_received(&self, message: Vec<u8>) {
        let update: LiveDataValueUpdate = match wire::decode(&message) {
            Ok(update) => update,
            Err(err) => {
                warn!(
                    event = events::VALUE_UPDATE_DECODE_FAILED,
                    component = COMPONENT,
                    topic = self.topic(),
                    err = %err,
                    "dropping undecodable value update"
                );
                return;
            }
        };

        if self.distributor.notify(&update).await == 0 {
            debug!(
                event = events::VALUE_UPDATE_NO_LISTENERS,
                component = COMPONENT,
                topic = self.topic(),
                qualified_spec = %fields::format_spec(&update.specification),
                sequence_number = update.sequence_number,
                "value update for a stream without listeners"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ValueUpdateDispatcher;
    use crate::distributor::ValueDistributor;
    use crate::listener::{LiveDataListener, LiveDataSubscriptionResponse, LiveDataValueUpdate};
    use crate::specification::{ExternalId, LiveDataSpecification};
    use crate::transport::ByteMessageReceiver;
    use crate::wire;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct CollectingListener {
        updates: Mutex<Vec<LiveDataValueUpdate>>,
    }

    #[async_trait]
    impl LiveDataListener for CollectingListener {
        async fn subscription_result_received(&self, _response: LiveDataSubscriptionResponse) {}

        async fn value_update(&self, update: &LiveDataValueUpdate) {
            self.updates.lock().await.push(update.clone());
        }

        async fn subscription_stopped(&self, _spec: &LiveDataSpecification) {}
    }

    #[tokio::test]
    async fn decoded_update_reaches_registered_listener() {
        let distributor = Arc::new(ValueDistributor::new());
        let listener = Arc::new(CollectingListener::default());
        let spec = LiveDataSpecification::new("OpenGamma", [ExternalId::of("TICKER", "AAPL")]);
        distributor.add_listener(&spec, listener.clone()).await;

        let update = LiveDataValueUpdate {
            sequence_number: 7,
            timestamp: 1_700_000_000_000,
            specification: spec,
            fields: BTreeMap::from([("BID".to_string(), serde_json::json!(99.25))]),
        };
        let dispatcher = ValueUpdateDispatcher::new(distributor);
        dispatcher
            .message_received(wire::encode(&update).unwrap())
            .await;
        dispatcher.message_received(b"garbage".to_vec()).await;

        assert_eq!(*listener.updates.lock().await, vec![update]);
    }
}
