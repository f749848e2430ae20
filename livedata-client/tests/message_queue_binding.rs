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

use integration_test_utils::{aapl, msft, trader, LoopbackHarness, RecordingListener};
use livedata_client::{
    LiveDataClient, MessageQueueSubscriptionTransport, SubscriptionResult, ValueDistributor,
};
use loopback_livedata_server::{topic_for, LoopbackLiveDataServer, TickDistribution};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn one_topic_consumer_serves_every_listener_of_a_stream() {
    let harness = LoopbackHarness::topics().await;
    let first = RecordingListener::new("first");
    let second = RecordingListener::new("second");

    for listener in [first.clone(), second.clone()] {
        harness
            .client
            .subscribe(&trader(), &aapl(), listener)
            .await
            .unwrap();
    }

    assert_eq!(first.results().await, vec![SubscriptionResult::Success]);
    assert_eq!(second.results().await, vec![SubscriptionResult::Success]);
    assert_eq!(harness.transport.start_count(), 2);
    assert_eq!(
        harness.server.broker().registration_count(&topic_for(&aapl())).await,
        1
    );

    assert!(
        harness
            .server
            .publish(&aapl(), [("BID", json!(189.4)), ("ASK", json!(189.6))])
            .await
    );
    assert_eq!(first.update_count().await, 1);
    assert_eq!(second.update_count().await, 1);
}

#[tokio::test]
async fn last_unsubscribe_stops_the_topic_consumer() {
    let harness = LoopbackHarness::topics().await;
    let aapl_listener = RecordingListener::new("aapl");
    let msft_listener = RecordingListener::new("msft");
    harness
        .client
        .subscribe(&trader(), &aapl(), aapl_listener.clone())
        .await
        .unwrap();
    harness
        .client
        .subscribe(&trader(), &msft(), msft_listener.clone())
        .await
        .unwrap();
    let broker = harness.server.broker();
    assert_eq!(broker.consumed_topic_count().await, 2);

    harness
        .client
        .unsubscribe(&trader(), &aapl(), aapl_listener.clone())
        .await;

    assert!(!broker.is_consumed(&topic_for(&aapl())).await);
    assert!(broker.is_consumed(&topic_for(&msft())).await);
    assert!(!harness.server.publish(&aapl(), [("LAST", json!(1.0))]).await);
    assert!(harness.server.publish(&msft(), [("LAST", json!(2.0))]).await);
    assert_eq!(aapl_listener.update_count().await, 0);
    assert_eq!(msft_listener.update_count().await, 1);
}

#[tokio::test]
async fn resubscribing_after_teardown_consumes_the_topic_again() {
    let harness = LoopbackHarness::topics().await;
    let listener = RecordingListener::new("returning");
    let broker = harness.server.broker();

    harness
        .client
        .subscribe(&trader(), &aapl(), listener.clone())
        .await
        .unwrap();
    harness
        .client
        .unsubscribe(&trader(), &aapl(), listener.clone())
        .await;
    assert!(!broker.is_consumed(&topic_for(&aapl())).await);

    harness
        .client
        .subscribe(&trader(), &aapl(), listener.clone())
        .await
        .unwrap();

    assert!(broker.is_consumed(&topic_for(&aapl())).await);
    assert_eq!(broker.registration_count(&topic_for(&aapl())).await, 2);
    assert_eq!(
        listener.results().await,
        vec![SubscriptionResult::Success, SubscriptionResult::Success]
    );
}

#[tokio::test]
async fn close_releases_every_topic_consumer() {
    let harness = LoopbackHarness::topics().await;
    let listener = RecordingListener::new("closing");
    harness
        .client
        .subscribe_all(&trader(), &[aapl(), msft()], listener.clone())
        .await
        .unwrap();
    let broker = harness.server.broker();
    assert_eq!(broker.consumed_topic_count().await, 2);

    harness.client.close().await;
    harness.client.close().await;

    assert_eq!(harness.transport.stop_count(), 1);
    assert_eq!(broker.consumed_topic_count().await, 0);
    assert!(!harness.server.publish(&aapl(), [("LAST", json!(3.0))]).await);
    assert_eq!(listener.update_count().await, 0);
    assert!(!harness.client.is_running());
}

#[tokio::test]
async fn ticks_reach_listeners_when_builder_gets_another_distributor() {
    let server = LoopbackLiveDataServer::new(TickDistribution::Topics);
    let bound = Arc::new(ValueDistributor::new());
    let transport = Arc::new(MessageQueueSubscriptionTransport::new(
        server.subscription_channel(),
        server.broker(),
        bound.clone(),
    ));
    let client = LiveDataClient::builder(transport, Arc::new(ValueDistributor::new())).build();
    let listener = RecordingListener::new("separate-distributor");

    client
        .subscribe(&trader(), &aapl(), listener.clone())
        .await
        .unwrap();
    assert!(server.publish(&aapl(), [("LAST", json!(190.0))]).await);

    assert_eq!(listener.update_count().await, 1);
    assert_eq!(client.listener_count(&aapl()), 1);
    assert!(bound.active_specifications().contains(&aapl()));
    client.close().await;
}
