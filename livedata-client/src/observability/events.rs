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

//! Canonical structured event names used across `livedata-client`.

// Subscription lifecycle events.
pub const SUBSCRIBE_START: &str = "subscribe_start";
pub const SUBSCRIBE_NOT_PRESENT: &str = "subscribe_not_present";
pub const SUBSCRIBE_NOT_AUTHORIZED: &str = "subscribe_not_authorized";
pub const SUBSCRIBE_COALESCED: &str = "subscribe_coalesced";
pub const SUBSCRIBE_REQUEST_SENT: &str = "subscribe_request_sent";
pub const SUBSCRIBE_REQUEST_SEND_FAILED: &str = "subscribe_request_send_failed";
pub const SUBSCRIBE_OK: &str = "subscribe_ok";
pub const SUBSCRIBE_FAILED: &str = "subscribe_failed";
pub const SUBSCRIBE_COMPLETION_UNKNOWN: &str = "subscribe_completion_unknown";
pub const UNSUBSCRIBE_START: &str = "unsubscribe_start";
pub const UNSUBSCRIBE_LAST_LISTENER: &str = "unsubscribe_last_listener";
pub const UNSUBSCRIBE_UNKNOWN_LISTENER: &str = "unsubscribe_unknown_listener";
pub const SNAPSHOT_START: &str = "snapshot_start";
pub const SNAPSHOT_FAILED: &str = "snapshot_failed";

// Resolution and entitlement events.
pub const RESOLUTION_TIMEOUT: &str = "resolution_timeout";
pub const ENTITLEMENT_CHECK: &str = "entitlement_check";
pub const ENTITLEMENT_TIMEOUT: &str = "entitlement_timeout";
pub const ENTITLEMENT_INCOMPLETE: &str = "entitlement_incomplete";
pub const ENTITLEMENT_MISSING_IDENTIFIER: &str = "entitlement_missing_identifier";
pub const ENTITLEMENT_UNKNOWN_USER: &str = "entitlement_unknown_user";

// Data-plane events.
pub const VALUE_UPDATE_DECODE_FAILED: &str = "value_update_decode_failed";
pub const VALUE_UPDATE_NO_LISTENERS: &str = "value_update_no_listeners";
pub const RESPONSE_DECODE_FAILED: &str = "response_decode_failed";
pub const RESPONSE_DUPLICATE: &str = "response_duplicate";
pub const TOPIC_CONSUMER_START: &str = "topic_consumer_start";
pub const TOPIC_CONSUMER_REUSE: &str = "topic_consumer_reuse";
pub const TOPIC_CONSUMER_START_FAILED: &str = "topic_consumer_start_failed";
pub const TOPIC_CONSUMER_STOP: &str = "topic_consumer_stop";
pub const TOPIC_CONSUMER_STOP_FAILED: &str = "topic_consumer_stop_failed";

// Heartbeat and lifecycle events.
pub const HEARTBEAT_SEND_OK: &str = "heartbeat_send_ok";
pub const HEARTBEAT_SEND_FAILED: &str = "heartbeat_send_failed";
pub const HEARTBEAT_ENCODE_FAILED: &str = "heartbeat_encode_failed";
pub const HEARTBEAT_STOPPED: &str = "heartbeat_stopped";
pub const CLIENT_CLOSED: &str = "client_closed";
pub const CLIENT_DISTRIBUTOR_REPLACED: &str = "client_distributor_replaced";
