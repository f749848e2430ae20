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

use integration_test_utils::{aapl, trader, LoopbackHarness, RecordingListener};
use livedata_client::SubscriptionResult;
use loopback_livedata_server::topic_for;
use serde_json::json;
use std::sync::Arc;

const WORKERS: usize = 8;
const ROUNDS: usize = 25;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn churning_listeners_keep_topic_consumption_consistent() {
    let harness = Arc::new(LoopbackHarness::topics().await);
    let listeners: Vec<_> = (0..WORKERS)
        .map(|worker| RecordingListener::new(&format!("worker-{worker}")))
        .collect();

    let mut tasks = Vec::with_capacity(WORKERS);
    for (worker, listener) in listeners.iter().cloned().enumerate() {
        let harness = harness.clone();
        tasks.push(tokio::spawn(async move {
            for round in 0..ROUNDS {
                harness
                    .client
                    .subscribe(&trader(), &aapl(), listener.clone())
                    .await
                    .unwrap();
                let keep_last = worker % 2 == 0 && round == ROUNDS - 1;
                if !keep_last {
                    harness
                        .client
                        .unsubscribe(&trader(), &aapl(), listener.clone())
                        .await;
                }
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    for listener in &listeners {
        let results = listener.results().await;
        assert_eq!(results.len(), ROUNDS);
        assert!(results
            .iter()
            .all(|result| *result == SubscriptionResult::Success));
    }

    let broker = harness.server.broker();
    assert_eq!(harness.client.listener_count(&aapl()), WORKERS / 2);
    assert!(broker.is_consumed(&topic_for(&aapl())).await);

    assert!(harness.server.publish(&aapl(), [("LAST", json!(42.0))]).await);
    for (worker, listener) in listeners.iter().enumerate() {
        let expected = usize::from(worker % 2 == 0);
        assert_eq!(listener.update_count().await, expected);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn final_unsubscribes_race_down_to_zero_consumers() {
    let harness = Arc::new(LoopbackHarness::topics().await);
    let listeners: Vec<_> = (0..WORKERS)
        .map(|worker| RecordingListener::new(&format!("leaver-{worker}")))
        .collect();
    for listener in &listeners {
        harness
            .client
            .subscribe(&trader(), &aapl(), listener.clone())
            .await
            .unwrap();
    }

    let mut tasks = Vec::with_capacity(WORKERS);
    for listener in listeners.iter().cloned() {
        let harness = harness.clone();
        tasks.push(tokio::spawn(async move {
            harness
                .client
                .unsubscribe(&trader(), &aapl(), listener)
                .await;
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert!(harness.client.active_specifications().is_empty());
    assert_eq!(harness.transport.cancel_count(&aapl()).await, 1);
    assert!(!harness.server.broker().is_consumed(&topic_for(&aapl())).await);
    for listener in &listeners {
        assert_eq!(listener.stopped().await, vec![aapl()]);
    }
}
