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

//! Subscription identity keying used for dedupe and listener registration.

use crate::listener::LiveDataListener;
use crate::specification::{LiveDataSpecification, UserPrincipal};
use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity of a listener: the address of its `Arc` allocation.
#[derive(Clone)]
pub struct ListenerKey {
    listener: Arc<dyn LiveDataListener>,
}

impl ListenerKey {
    pub fn new(listener: Arc<dyn LiveDataListener>) -> Self {
        Self { listener }
    }

    pub fn listener(&self) -> &Arc<dyn LiveDataListener> {
        &self.listener
    }

    fn address(&self) -> *const () {
        Arc::as_ptr(&self.listener) as *const ()
    }
}

impl Hash for ListenerKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

impl PartialEq for ListenerKey {
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl Eq for ListenerKey {}

impl Debug for ListenerKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerKey")
            .field("address", &self.address())
            .finish()
    }
}

///
/// [`SubscriptionKey`] is the dedupe key of one subscription: (consumer, qualified stream,
/// listener).
///
/// The caller's requested specification is not part of the key, so two differently phrased
/// requests that resolve to the same qualified stream for the same listener are the same
/// subscription.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SubscriptionKey {
    pub user: UserPrincipal,
    pub fully_qualified_specification: LiveDataSpecification,
    pub listener: ListenerKey,
}

impl SubscriptionKey {
    pub fn new(
        user: UserPrincipal,
        fully_qualified_specification: LiveDataSpecification,
        listener: Arc<dyn LiveDataListener>,
    ) -> Self {
        Self {
            user,
            fully_qualified_specification,
            listener: ListenerKey::new(listener),
        }
    }
}

/// A subscription request: its identity plus the specification as the caller phrased it.
#[derive(Clone, Debug)]
pub struct SubscriptionRequestRecord {
    pub key: SubscriptionKey,
    pub requested_specification: LiveDataSpecification,
}

impl SubscriptionRequestRecord {
    pub fn user(&self) -> &UserPrincipal {
        &self.key.user
    }

    pub fn fully_qualified_specification(&self) -> &LiveDataSpecification {
        &self.key.fully_qualified_specification
    }

    pub fn listener(&self) -> &Arc<dyn LiveDataListener> {
        self.key.listener.listener()
    }
}
