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

//! Wire messages exchanged with the live-data server, and their JSON codec.

use crate::error::LiveDataError;
use crate::listener::{LiveDataSubscriptionResponse, SubscriptionType};
use crate::specification::{LiveDataSpecification, UserPrincipal};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRequestMessage {
    pub correlation_id: Uuid,
    pub user: UserPrincipal,
    pub subscription_type: SubscriptionType,
    pub specifications: Vec<LiveDataSpecification>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionResponseMessage {
    pub correlation_id: Uuid,
    pub requesting_user: UserPrincipal,
    pub responses: Vec<LiveDataSubscriptionResponse>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntitlementRequestMessage {
    pub correlation_id: Uuid,
    pub user: UserPrincipal,
    pub specifications: Vec<LiveDataSpecification>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntitlementResponse {
    pub specification: LiveDataSpecification,
    pub is_entitled: bool,
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntitlementResponseMessage {
    pub correlation_id: Uuid,
    pub responses: Vec<EntitlementResponse>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolveRequestMessage {
    pub correlation_id: Uuid,
    pub specifications: Vec<LiveDataSpecification>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSpecification {
    pub requested: LiveDataSpecification,
    pub resolved: Option<LiveDataSpecification>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolveResponseMessage {
    pub correlation_id: Uuid,
    pub resolved: Vec<ResolvedSpecification>,
}

/// Messages that belong to one request/reply exchange.
///
/// A reply carries the id of the request it answers; a reply with any other id is a
/// protocol failure.
pub trait Correlated {
    fn correlation_id(&self) -> Uuid;
}

macro_rules! correlated {
    ($($message:ty),* $(,)?) => {
        $(impl Correlated for $message {
            fn correlation_id(&self) -> Uuid {
                self.correlation_id
            }
        })*
    };
}

correlated!(
    SubscriptionRequestMessage,
    SubscriptionResponseMessage,
    EntitlementRequestMessage,
    EntitlementResponseMessage,
    ResolveRequestMessage,
    ResolveResponseMessage,
);

/// Fails with [`LiveDataError::UnexpectedResponse`] unless `reply` answers `request`.
pub fn check_correlation(
    request: &impl Correlated,
    reply: &impl Correlated,
) -> Result<(), LiveDataError> {
    if request.correlation_id() == reply.correlation_id() {
        Ok(())
    } else {
        Err(LiveDataError::UnexpectedResponse(format!(
            "reply {} does not answer request {}",
            reply.correlation_id(),
            request.correlation_id()
        )))
    }
}

/// Streams this client still wants; no reply is sent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatMessage {
    pub live_data_specifications: Vec<LiveDataSpecification>,
}

pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, LiveDataError> {
    Ok(serde_json::to_vec(message)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, LiveDataError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::{
        check_correlation, decode, HeartbeatMessage, ResolveRequestMessage,
        ResolveResponseMessage, SubscriptionResponseMessage,
    };
    use crate::error::LiveDataError;
    use uuid::Uuid;

    #[test]
    fn corrupt_bytes_surface_as_codec_error() {
        let result: Result<SubscriptionResponseMessage, _> = decode(b"{not json");

        assert!(matches!(result, Err(LiveDataError::Codec(_))));
    }

    #[test]
    fn heartbeat_uses_stable_field_name() {
        let heartbeat: HeartbeatMessage =
            decode(br#"{"live_data_specifications":[]}"#).expect("heartbeat should decode");

        assert!(heartbeat.live_data_specifications.is_empty());
    }

    #[test]
    fn reply_to_another_request_is_rejected() {
        let request = ResolveRequestMessage {
            correlation_id: Uuid::new_v4(),
            specifications: vec![],
        };
        let answer = ResolveResponseMessage {
            correlation_id: request.correlation_id,
            resolved: vec![],
        };
        let stray = ResolveResponseMessage {
            correlation_id: Uuid::new_v4(),
            resolved: vec![],
        };

        assert!(check_correlation(&request, &answer).is_ok());
        assert!(matches!(
            check_correlation(&request, &stray),
            Err(LiveDataError::UnexpectedResponse(_))
        ));
    }
}
