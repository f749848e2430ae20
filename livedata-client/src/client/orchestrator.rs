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

//! Subscription lifecycle: resolve, authorize, dedupe, send, complete, unsubscribe.

use crate::binding::SubscriptionTransport;
use crate::client::pending::PendingSubscription;
use crate::client::transition_locks::TransitionLocks;
use crate::distributor::{ListenerRemoval, ValueDistributor};
use crate::entitlement::EntitlementChecker;
use crate::error::LiveDataError;
use crate::identity::{SubscriptionKey, SubscriptionRequestRecord};
use crate::listener::{
    LiveDataListener, LiveDataSubscriptionResponse, LiveDataValueUpdate, SubscriptionResult,
};
use crate::observability::{events, fields};
use crate::resolver::SpecificationResolver;
use crate::specification::{LiveDataSpecification, UserPrincipal};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const COMPONENT: &str = "subscription_orchestrator";
const CLOSED_MESSAGE: &str = "live data client is closed";

struct PendingEntry {
    token: u64,
    requested_specification: LiveDataSpecification,
}

///
/// [`SubscriptionOrchestrator`] owns the pending-subscription bookkeeping and sequences every
/// activation and deactivation of a qualified stream.
///
/// The set of active streams lives only in the [`ValueDistributor`]. A successful completion
/// registers its listener, and an unsubscribe removes one, while both hold the same
/// per-stream transition lock. The binding's publication start and cancel run under that
/// lock too, so "last listener removed, cancel publication" can never interleave with "first
/// listener added" for the same stream.
pub(crate) struct SubscriptionOrchestrator {
    resolver: Arc<dyn SpecificationResolver>,
    entitlement_checker: Arc<dyn EntitlementChecker>,
    transport: Arc<dyn SubscriptionTransport>,
    distributor: Arc<ValueDistributor>,
    pending: Mutex<HashMap<SubscriptionKey, PendingEntry>>,
    next_token: AtomicU64,
    transitions: TransitionLocks,
    running: AtomicBool,
}

/// A checker that leaves a requested stream unanswered has failed, not denied it.
fn entitlement_answer(
    entitlements: &HashMap<LiveDataSpecification, bool>,
    fully_qualified_specification: &LiveDataSpecification,
) -> Result<bool, LiveDataError> {
    entitlements
        .get(fully_qualified_specification)
        .copied()
        .ok_or_else(|| {
            LiveDataError::UnexpectedResponse(format!(
                "entitlement checker gave no answer for {fully_qualified_specification}"
            ))
        })
}

impl SubscriptionOrchestrator {
    pub(crate) fn new(
        resolver: Arc<dyn SpecificationResolver>,
        entitlement_checker: Arc<dyn EntitlementChecker>,
        transport: Arc<dyn SubscriptionTransport>,
        distributor: Arc<ValueDistributor>,
    ) -> Self {
        Self {
            resolver,
            entitlement_checker,
            transport,
            distributor,
            pending: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(0),
            transitions: TransitionLocks::new(),
            running: AtomicBool::new(true),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn distributor(&self) -> &Arc<ValueDistributor> {
        &self.distributor
    }

    pub(crate) async fn pending_subscription_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    pub(crate) async fn subscribe_all(
        self: &Arc<Self>,
        user: &UserPrincipal,
        requested_specifications: &[LiveDataSpecification],
        listener: Arc<dyn LiveDataListener>,
    ) -> Result<(), LiveDataError> {
        if !self.is_running() {
            for requested in requested_specifications {
                listener
                    .subscription_result_received(LiveDataSubscriptionResponse::failure(
                        requested.clone(),
                        None,
                        SubscriptionResult::InternalError,
                        CLOSED_MESSAGE,
                    ))
                    .await;
            }
            return Ok(());
        }

        info!(
            event = events::SUBSCRIBE_START,
            component = COMPONENT,
            user = %user,
            requested_spec = %fields::format_spec_list(requested_specifications),
            "subscription requested"
        );

        let resolved = self.resolver.resolve_all(requested_specifications).await?;

        let mut qualified = Vec::with_capacity(requested_specifications.len());
        for requested in requested_specifications {
            match resolved.get(requested).cloned().flatten() {
                Some(fully_qualified) => qualified.push((requested.clone(), fully_qualified)),
                None => {
                    info!(
                        event = events::SUBSCRIBE_NOT_PRESENT,
                        component = COMPONENT,
                        user = %user,
                        requested_spec = %fields::format_spec(requested),
                        "specification could not be resolved"
                    );
                    listener
                        .subscription_result_received(LiveDataSubscriptionResponse::failure(
                            requested.clone(),
                            None,
                            SubscriptionResult::NotPresent,
                            format!("when resolved, {requested} did not map to a live data stream"),
                        ))
                        .await;
                }
            }
        }
        if qualified.is_empty() {
            return Ok(());
        }

        let fully_qualified: Vec<LiveDataSpecification> = qualified
            .iter()
            .map(|(_, fully_qualified)| fully_qualified.clone())
            .collect();
        let entitlements = self
            .entitlement_checker
            .is_entitled_all(user, &fully_qualified)
            .await?;
        let decisions = qualified
            .into_iter()
            .map(|(requested, fully_qualified)| {
                let entitled = entitlement_answer(&entitlements, &fully_qualified)?;
                Ok((requested, fully_qualified, entitled))
            })
            .collect::<Result<Vec<_>, LiveDataError>>()?;

        for (requested, fully_qualified, entitled) in decisions {
            if !entitled {
                info!(
                    event = events::SUBSCRIBE_NOT_AUTHORIZED,
                    component = COMPONENT,
                    user = %user,
                    qualified_spec = %fields::format_spec(&fully_qualified),
                    "user is not entitled to stream"
                );
                let message = format!("{user} is not entitled to {fully_qualified}");
                listener
                    .subscription_result_received(LiveDataSubscriptionResponse::failure(
                        requested,
                        Some(fully_qualified),
                        SubscriptionResult::NotAuthorized,
                        message,
                    ))
                    .await;
                continue;
            }

            self.request_subscription(user, requested, fully_qualified, listener.clone())
                .await;
        }
        Ok(())
    }

    async fn request_subscription(
        self: &Arc<Self>,
        user: &UserPrincipal,
        requested_specification: LiveDataSpecification,
        fully_qualified_specification: LiveDataSpecification,
        listener: Arc<dyn LiveDataListener>,
    ) {
        let key = SubscriptionKey::new(user.clone(), fully_qualified_specification, listener);
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);

        {
            let mut pending = self.pending.lock().await;
            if pending.contains_key(&key) {
                debug!(
                    event = events::SUBSCRIBE_COALESCED,
                    component = COMPONENT,
                    user = %user,
                    qualified_spec = %fields::format_spec(&key.fully_qualified_specification),
                    "identical subscription already in flight"
                );
                return;
            }
            pending.insert(
                key.clone(),
                PendingEntry {
                    token,
                    requested_specification: requested_specification.clone(),
                },
            );
        }

        let qualified_spec = fields::format_spec(&key.fully_qualified_specification);
        let pending = PendingSubscription::new(
            SubscriptionRequestRecord {
                key,
                requested_specification,
            },
            token,
            self.clone(),
        );

        match self
            .transport
            .send_subscribe_request(pending.clone())
            .await
        {
            Ok(()) => {
                debug!(
                    event = events::SUBSCRIBE_REQUEST_SENT,
                    component = COMPONENT,
                    user = %user,
                    qualified_spec = qualified_spec.as_str(),
                    "subscription request sent"
                );
            }
            Err(err) => {
                warn!(
                    event = events::SUBSCRIBE_REQUEST_SEND_FAILED,
                    component = COMPONENT,
                    user = %user,
                    qualified_spec = qualified_spec.as_str(),
                    err = %err,
                    "unable to send subscription request"
                );
                pending
                    .fail(
                        SubscriptionResult::InternalError,
                        format!("unable to send subscription request: {err}"),
                    )
                    .await;
            }
        }
    }

    /// Removes the pending entry for `key` if it still belongs to the request `token`.
    async fn take_pending(&self, key: &SubscriptionKey, token: u64) -> bool {
        let mut pending = self.pending.lock().await;
        match pending.get(key) {
            Some(entry) if entry.token == token => {
                pending.remove(key);
                true
            }
            _ => false,
        }
    }

    pub(crate) async fn complete(
        &self,
        record: SubscriptionRequestRecord,
        token: u64,
        mut response: LiveDataSubscriptionResponse,
    ) {
        let listener = record.listener().clone();
        response.requested_specification = record.requested_specification.clone();

        if !response.is_success() {
            if !self.take_pending(&record.key, token).await {
                self.log_unknown_completion(&record);
                return;
            }
            warn!(
                event = events::SUBSCRIBE_FAILED,
                component = COMPONENT,
                user = %record.user(),
                qualified_spec = %fields::format_spec(record.fully_qualified_specification()),
                result = %response.result,
                reason = response.user_message.as_deref().unwrap_or(fields::NONE),
                "subscription failed"
            );
            listener.subscription_result_received(response).await;
            return;
        }

        let fully_qualified = response
            .fully_qualified_specification
            .clone()
            .unwrap_or_else(|| record.fully_qualified_specification().clone());
        response.fully_qualified_specification = Some(fully_qualified.clone());

        let activation = {
            let _transition = self.transitions.lock(&fully_qualified).await;
            if !self.take_pending(&record.key, token).await {
                None
            } else if !self.is_running() {
                Some(Err(LiveDataError::NotRunning))
            } else {
                match self.transport.start_publication(&response).await {
                    Ok(()) => {
                        self.distributor
                            .add_listener(&fully_qualified, listener.clone())
                            .await;
                        Some(Ok(()))
                    }
                    Err(err) => Some(Err(err)),
                }
            }
        };

        match activation {
            None => self.log_unknown_completion(&record),
            Some(Ok(())) => {
                info!(
                    event = events::SUBSCRIBE_OK,
                    component = COMPONENT,
                    user = %record.user(),
                    requested_spec = %fields::format_spec(&record.requested_specification),
                    qualified_spec = %fields::format_spec(&fully_qualified),
                    topic = response
                        .tick_distribution_specification
                        .as_deref()
                        .unwrap_or(fields::NONE),
                    "subscription established"
                );
                let snapshot = response.snapshot.clone();
                listener.subscription_result_received(response).await;
                if let Some(snapshot) = snapshot {
                    listener.value_update(&snapshot).await;
                }
            }
            Some(Err(err)) => {
                warn!(
                    event = events::SUBSCRIBE_FAILED,
                    component = COMPONENT,
                    user = %record.user(),
                    qualified_spec = %fields::format_spec(&fully_qualified),
                    result = %SubscriptionResult::InternalError,
                    err = %err,
                    "unable to start publication"
                );
                listener
                    .subscription_result_received(LiveDataSubscriptionResponse::failure(
                        record.requested_specification.clone(),
                        Some(fully_qualified),
                        SubscriptionResult::InternalError,
                        format!("unable to start publication: {err}"),
                    ))
                    .await;
            }
        }
    }

    fn log_unknown_completion(&self, record: &SubscriptionRequestRecord) {
        debug!(
            event = events::SUBSCRIBE_COMPLETION_UNKNOWN,
            component = COMPONENT,
            user = %record.user(),
            qualified_spec = %fields::format_spec(record.fully_qualified_specification()),
            "ignoring completion of a request that is no longer pending"
        );
    }

    pub(crate) async fn unsubscribe(
        &self,
        user: &UserPrincipal,
        fully_qualified_specification: &LiveDataSpecification,
        listener: Arc<dyn LiveDataListener>,
    ) {
        info!(
            event = events::UNSUBSCRIBE_START,
            component = COMPONENT,
            user = %user,
            qualified_spec = %fields::format_spec(fully_qualified_specification),
            "unsubscribe requested"
        );

        let removal = {
            let _transition = self.transitions.lock(fully_qualified_specification).await;
            let removal = self
                .distributor
                .remove_listener(fully_qualified_specification, &listener)
                .await;
            if removal == ListenerRemoval::LastListenerRemoved {
                self.transport
                    .cancel_publication(fully_qualified_specification)
                    .await;
            }
            removal
        };

        match removal {
            ListenerRemoval::LastListenerRemoved => {
                info!(
                    event = events::UNSUBSCRIBE_LAST_LISTENER,
                    component = COMPONENT,
                    user = %user,
                    qualified_spec = %fields::format_spec(fully_qualified_specification),
                    "last listener removed; publication cancelled"
                );
            }
            ListenerRemoval::NotRegistered => {
                debug!(
                    event = events::UNSUBSCRIBE_UNKNOWN_LISTENER,
                    component = COMPONENT,
                    user = %user,
                    qualified_spec = %fields::format_spec(fully_qualified_specification),
                    "listener was not registered for stream"
                );
            }
            ListenerRemoval::StillActive => {}
        }

        listener
            .subscription_stopped(fully_qualified_specification)
            .await;
    }

    pub(crate) async fn snapshot(
        &self,
        user: &UserPrincipal,
        requested_specification: &LiveDataSpecification,
        timeout: Duration,
    ) -> Result<LiveDataValueUpdate, LiveDataError> {
        if !self.is_running() {
            return Err(LiveDataError::NotRunning);
        }
        info!(
            event = events::SNAPSHOT_START,
            component = COMPONENT,
            user = %user,
            requested_spec = %fields::format_spec(requested_specification),
            timeout = ?timeout,
            "snapshot requested"
        );

        let response = self
            .transport
            .snapshot(user, requested_specification, timeout)
            .await
            .inspect_err(|err| {
                warn!(
                    event = events::SNAPSHOT_FAILED,
                    component = COMPONENT,
                    user = %user,
                    requested_spec = %fields::format_spec(requested_specification),
                    err = %err,
                    "snapshot request failed"
                );
            })?;

        if !response.is_success() {
            warn!(
                event = events::SNAPSHOT_FAILED,
                component = COMPONENT,
                user = %user,
                requested_spec = %fields::format_spec(requested_specification),
                result = %response.result,
                "snapshot refused"
            );
            return Err(LiveDataError::SnapshotFailed {
                result: response.result,
                message: response.user_message,
            });
        }

        response.snapshot.ok_or_else(|| {
            LiveDataError::UnexpectedResponse(format!(
                "snapshot response for {requested_specification} carried no value"
            ))
        })
    }

    pub(crate) async fn is_entitled_all(
        &self,
        user: &UserPrincipal,
        requested_specifications: &[LiveDataSpecification],
    ) -> Result<HashMap<LiveDataSpecification, bool>, LiveDataError> {
        if !self.is_running() {
            return Err(LiveDataError::NotRunning);
        }
        let resolved = self.resolver.resolve_all(requested_specifications).await?;

        let mut fully_qualified: Vec<LiveDataSpecification> =
            resolved.values().flatten().cloned().collect();
        fully_qualified.sort();
        fully_qualified.dedup();

        let entitlements = if fully_qualified.is_empty() {
            HashMap::new()
        } else {
            self.entitlement_checker
                .is_entitled_all(user, &fully_qualified)
                .await?
        };

        requested_specifications
            .iter()
            .map(|requested| {
                let entitled = match resolved.get(requested).cloned().flatten() {
                    Some(fully_qualified) => entitlement_answer(&entitlements, &fully_qualified)?,
                    None => false,
                };
                Ok((requested.clone(), entitled))
            })
            .collect()
    }

    /// Marks the client closed, stops the binding, and fails every in-flight subscription.
    pub(crate) async fn close(&self) -> bool {
        if !self.running.swap(false, Ordering::SeqCst) {
            return false;
        }

        self.transport.stop().await;

        let abandoned: Vec<(SubscriptionKey, PendingEntry)> =
            self.pending.lock().await.drain().collect();
        for (key, entry) in abandoned {
            debug!(
                event = events::SUBSCRIBE_FAILED,
                component = COMPONENT,
                user = %key.user,
                qualified_spec = %fields::format_spec(&key.fully_qualified_specification),
                reason = fields::REASON_CLIENT_CLOSED,
                "abandoning in-flight subscription"
            );
            key.listener
                .listener()
                .subscription_result_received(LiveDataSubscriptionResponse::failure(
                    entry.requested_specification,
                    Some(key.fully_qualified_specification.clone()),
                    SubscriptionResult::InternalError,
                    CLOSED_MESSAGE,
                ))
                .await;
        }
        true
    }
}
