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

//! Periodic keep-alive announcing which streams this client still consumes.

use crate::distributor::ValueDistributor;
use crate::error::LiveDataError;
use crate::observability::events;
use crate::transport::ByteMessageSender;
use crate::wire::{self, HeartbeatMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

const COMPONENT: &str = "heartbeat";
const MIN_HEARTBEAT_PERIOD: Duration = Duration::from_millis(1);

///
/// [`HeartbeatSender`] owns a background task that, once per period, sends the current set
/// of active qualified streams to the heartbeat destination.
///
/// The first heartbeat goes out one full period after [`start`][HeartbeatSender::start].
/// A heartbeat is sent even when nothing is active. A failed send is logged and the next
/// period proceeds as usual; the server drops publications only after missing several.
///
/// The task is aborted by [`stop`][HeartbeatSender::stop] or when the sender is dropped.
pub struct HeartbeatSender {
    task: JoinHandle<()>,
    period: Duration,
}

impl HeartbeatSender {
    /// Spawns the heartbeat task on the current tokio runtime.
    pub fn start(
        distributor: Arc<ValueDistributor>,
        message_sender: Arc<dyn ByteMessageSender>,
        period: Duration,
    ) -> Self {
        let period = period.max(MIN_HEARTBEAT_PERIOD);
        let task = tokio::spawn(Self::heartbeat_loop(distributor, message_sender, period));
        Self { task, period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn stop(&self) {
        if !self.task.is_finished() {
            self.task.abort();
            info!(
                event = events::HEARTBEAT_STOPPED,
                component = COMPONENT,
                "heartbeat stopped"
            );
        }
    }

    async fn heartbeat_loop(
        distributor: Arc<ValueDistributor>,
        message_sender: Arc<dyn ByteMessageSender>,
        period: Duration,
    ) {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match send_heartbeat(&distributor, message_sender.as_ref()).await {
                Ok(count) => {
                    debug!(
                        event = events::HEARTBEAT_SEND_OK,
                        component = COMPONENT,
                        active_streams = count,
                        "heartbeat sent"
                    );
                }
                Err(LiveDataError::Codec(err)) => {
                    warn!(
                        event = events::HEARTBEAT_ENCODE_FAILED,
                        component = COMPONENT,
                        err = %err,
                        "unable to encode heartbeat"
                    );
                }
                Err(err) => {
                    warn!(
                        event = events::HEARTBEAT_SEND_FAILED,
                        component = COMPONENT,
                        err = %err,
                        "heartbeat send failed; retrying next period"
                    );
                }
            }
        }
    }
}

impl Drop for HeartbeatSender {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Sends one heartbeat carrying a snapshot of the active streams, sorted for stable output.
pub(crate) async fn send_heartbeat(
    distributor: &ValueDistributor,
    message_sender: &dyn ByteMessageSender,
) -> Result<usize, LiveDataError> {
    let mut live_data_specifications: Vec<_> =
        distributor.active_specifications().into_iter().collect();
    live_data_specifications.sort();
    let count = live_data_specifications.len();

    let message = wire::encode(&HeartbeatMessage {
        live_data_specifications,
    })?;
    message_sender.send(message).await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::HeartbeatSender;
    use crate::distributor::ValueDistributor;
    use crate::error::TransportError;
    use crate::listener::{LiveDataListener, LiveDataSubscriptionResponse, LiveDataValueUpdate};
    use crate::specification::{ExternalId, LiveDataSpecification};
    use crate::transport::ByteMessageSender;
    use crate::wire::{self, HeartbeatMessage};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<HeartbeatMessage>>,
        failing: AtomicBool,
    }

    impl RecordingSink {
        async fn sent(&self) -> Vec<HeartbeatMessage> {
            self.sent.lock().await.clone()
        }
    }

    #[async_trait]
    impl ByteMessageSender for RecordingSink {
        async fn send(&self, message: Vec<u8>) -> Result<(), TransportError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(TransportError::SendFailed("sink offline".to_string()));
            }
            let heartbeat = wire::decode(&message).expect("heartbeat should decode");
            self.sent.lock().await.push(heartbeat);
            Ok(())
        }
    }

    struct NoopListener;

    #[async_trait]
    impl LiveDataListener for NoopListener {
        async fn subscription_result_received(&self, _response: LiveDataSubscriptionResponse) {}
        async fn value_update(&self, _update: &LiveDataValueUpdate) {}
        async fn subscription_stopped(&self, _spec: &LiveDataSpecification) {}
    }

    const PERIOD: Duration = Duration::from_secs(300);

    #[tokio::test(start_paused = true)]
    async fn sends_one_heartbeat_per_period_even_when_idle() {
        let distributor = Arc::new(ValueDistributor::new());
        let sink = Arc::new(RecordingSink::default());
        let heartbeat = HeartbeatSender::start(distributor, sink.clone(), PERIOD);

        tokio::time::sleep(PERIOD * 3 + PERIOD / 2).await;

        let sent = sink.sent().await;
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|hb| hb.live_data_specifications.is_empty()));
        heartbeat.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_carries_current_active_set() {
        let distributor = Arc::new(ValueDistributor::new());
        let sink = Arc::new(RecordingSink::default());
        let spec = LiveDataSpecification::new("OpenGamma", [ExternalId::of("TICKER", "AAPL")]);
        distributor
            .add_listener(&spec, Arc::new(NoopListener))
            .await;

        let _heartbeat = HeartbeatSender::start(distributor, sink.clone(), PERIOD);
        tokio::time::sleep(PERIOD + PERIOD / 2).await;

        let sent = sink.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].live_data_specifications, vec![spec]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_send_does_not_stop_the_schedule() {
        let distributor = Arc::new(ValueDistributor::new());
        let sink = Arc::new(RecordingSink::default());
        sink.failing.store(true, Ordering::SeqCst);
        let _heartbeat = HeartbeatSender::start(distributor, sink.clone(), PERIOD);

        tokio::time::sleep(PERIOD + PERIOD / 2).await;
        assert!(sink.sent().await.is_empty());

        sink.failing.store(false, Ordering::SeqCst);
        tokio::time::sleep(PERIOD).await;
        assert_eq!(sink.sent().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_ends_the_schedule() {
        let distributor = Arc::new(ValueDistributor::new());
        let sink = Arc::new(RecordingSink::default());
        let heartbeat = HeartbeatSender::start(distributor, sink.clone(), PERIOD);

        tokio::time::sleep(PERIOD + PERIOD / 2).await;
        heartbeat.stop();
        tokio::time::sleep(PERIOD * 4).await;

        assert_eq!(sink.sent().await.len(), 1);
    }
}
