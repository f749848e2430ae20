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

//! Unrecoverable failures surfaced to directly-blocked callers.

use crate::listener::SubscriptionResult;
use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Failure of a byte-level transport operation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TransportError {
    SendFailed(String),
    ConsumerFailed { topic: String, reason: String },
    Closed,
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::SendFailed(reason) => write!(f, "send failed: {reason}"),
            TransportError::ConsumerFailed { topic, reason } => {
                write!(f, "consumer for topic {topic} failed: {reason}")
            }
            TransportError::Closed => write!(f, "transport closed"),
        }
    }
}

impl Error for TransportError {}

/// Errors that propagate to the caller instead of travelling through a listener.
///
/// A timeout is never a denial: a remote entitlement check that does not answer in time
/// yields [`LiveDataError::Timeout`], not `Ok(false)`.
#[derive(Debug)]
pub enum LiveDataError {
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
    Transport(TransportError),
    Codec(serde_json::Error),
    SnapshotFailed {
        result: SubscriptionResult,
        message: Option<String>,
    },
    UnexpectedResponse(String),
    NotRunning,
}

impl Display for LiveDataError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LiveDataError::Timeout { operation, timeout } => {
                write!(f, "{operation} timed out after {timeout:?}")
            }
            LiveDataError::Transport(err) => write!(f, "transport failure: {err}"),
            LiveDataError::Codec(err) => write!(f, "unable to encode or decode message: {err}"),
            LiveDataError::SnapshotFailed { result, message } => match message {
                Some(message) => write!(f, "snapshot failed with {result}: {message}"),
                None => write!(f, "snapshot failed with {result}"),
            },
            LiveDataError::UnexpectedResponse(reason) => {
                write!(f, "unexpected response: {reason}")
            }
            LiveDataError::NotRunning => write!(f, "live data client is not running"),
        }
    }
}

impl Error for LiveDataError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LiveDataError::Transport(err) => Some(err),
            LiveDataError::Codec(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransportError> for LiveDataError {
    fn from(err: TransportError) -> Self {
        LiveDataError::Transport(err)
    }
}

impl From<serde_json::Error> for LiveDataError {
    fn from(err: serde_json::Error) -> Self {
        LiveDataError::Codec(err)
    }
}
