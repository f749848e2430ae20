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

//! Registry of listeners per qualified stream, with fan-out of value updates.

use crate::identity::ListenerKey;
use crate::listener::{LiveDataListener, LiveDataValueUpdate};
use crate::specification::LiveDataSpecification;
use arc_swap::ArcSwap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

type ListenerSnapshot = HashMap<LiveDataSpecification, Arc<[Arc<dyn LiveDataListener>]>>;

/// Outcome of [`ValueDistributor::remove_listener`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ListenerRemoval {
    /// Other listeners remain registered for the stream.
    StillActive,
    /// The removed listener was the last one; the stream is no longer active and the
    /// caller is responsible for cancelling the upstream publication.
    LastListenerRemoved,
    /// The listener was not registered for the stream; nothing changed.
    NotRegistered,
}

///
/// [`ValueDistributor`] maps each qualified stream to the listeners registered for it.
///
/// A stream is present iff it has at least one listener. Writers serialize on one mutex and
/// publish an immutable snapshot after every change; [`notify`][ValueDistributor::notify]
/// and [`active_specifications`][ValueDistributor::active_specifications] read that snapshot
/// without taking the mutex, so neither fan-out nor a heartbeat ever blocks a subscribe.
///
/// `notify` delivers to the listeners registered at the moment it loads the snapshot. A
/// listener added or removed while a fan-out is in flight may or may not see that update.
pub struct ValueDistributor {
    registry: Mutex<HashMap<LiveDataSpecification, Vec<ListenerKey>>>,
    snapshot: ArcSwap<ListenerSnapshot>,
}

impl Default for ValueDistributor {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueDistributor {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(HashMap::new()),
            snapshot: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    fn publish(&self, specification: &LiveDataSpecification, listeners: Option<&[ListenerKey]>) {
        let mut next: ListenerSnapshot = (**self.snapshot.load()).clone();
        match listeners {
            Some(listeners) => {
                let listeners: Vec<Arc<dyn LiveDataListener>> = listeners
                    .iter()
                    .map(|key| key.listener().clone())
                    .collect();
                next.insert(specification.clone(), listeners.into());
            }
            None => {
                next.remove(specification);
            }
        }
        self.snapshot.store(Arc::new(next));
    }

    /// Registers `listener` for `specification`.
    ///
    /// Returns `true` when this made the stream active (it had no listeners before).
    /// Registering an already registered listener is a no-op returning `false`.
    pub async fn add_listener(
        &self,
        specification: &LiveDataSpecification,
        listener: Arc<dyn LiveDataListener>,
    ) -> bool {
        let key = ListenerKey::new(listener);
        let mut registry = self.registry.lock().await;

        let newly_active = !registry.contains_key(specification);
        let listeners = registry.entry(specification.clone()).or_default();
        if listeners.contains(&key) {
            return false;
        }
        listeners.push(key);
        self.publish(specification, Some(listeners));
        newly_active
    }

    /// Removes `listener` from `specification`, dropping the stream when it was the last one.
    pub async fn remove_listener(
        &self,
        specification: &LiveDataSpecification,
        listener: &Arc<dyn LiveDataListener>,
    ) -> ListenerRemoval {
        let key = ListenerKey::new(listener.clone());
        let mut registry = self.registry.lock().await;

        let Some(listeners) = registry.get_mut(specification) else {
            return ListenerRemoval::NotRegistered;
        };
        let Some(position) = listeners.iter().position(|registered| *registered == key) else {
            return ListenerRemoval::NotRegistered;
        };
        listeners.remove(position);

        if listeners.is_empty() {
            registry.remove(specification);
            self.publish(specification, None);
            ListenerRemoval::LastListenerRemoved
        } else {
            self.publish(specification, Some(listeners));
            ListenerRemoval::StillActive
        }
    }

    /// Delivers `update` to every listener currently registered for its specification.
    ///
    /// Returns how many listeners were notified.
    pub async fn notify(&self, update: &LiveDataValueUpdate) -> usize {
        let listeners = self.snapshot.load().get(&update.specification).cloned();
        let Some(listeners) = listeners else {
            return 0;
        };
        for listener in listeners.iter() {
            listener.value_update(update).await;
        }
        listeners.len()
    }

    /// Point-in-time copy of the streams that have at least one listener.
    pub fn active_specifications(&self) -> HashSet<LiveDataSpecification> {
        self.snapshot.load().keys().cloned().collect()
    }

    pub fn listener_count(&self, specification: &LiveDataSpecification) -> usize {
        self.snapshot
            .load()
            .get(specification)
            .map(|listeners| listeners.len())
            .unwrap_or(0)
    }

    pub fn is_active(&self, specification: &LiveDataSpecification) -> bool {
        self.snapshot.load().contains_key(specification)
    }
}
