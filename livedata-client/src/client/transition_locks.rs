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

use crate::specification::LiveDataSpecification;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tokio::sync::{Mutex, MutexGuard};

const TRANSITION_STRIPES: usize = 64;

/// Striped locks serializing activation and deactivation of each qualified stream.
///
/// Two streams may share a stripe; that only costs concurrency, never correctness. Holders
/// must not take a second stripe.
pub(crate) struct TransitionLocks {
    stripes: Vec<Mutex<()>>,
}

impl TransitionLocks {
    pub(crate) fn new() -> Self {
        Self {
            stripes: (0..TRANSITION_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    fn stripe_index(&self, specification: &LiveDataSpecification) -> usize {
        let mut hasher = DefaultHasher::new();
        specification.hash(&mut hasher);
        (hasher.finish() % self.stripes.len() as u64) as usize
    }

    pub(crate) async fn lock(&self, specification: &LiveDataSpecification) -> MutexGuard<'_, ()> {
        self.stripes[self.stripe_index(specification)].lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::TransitionLocks;
    use crate::specification::{ExternalId, LiveDataSpecification};
    use std::time::Duration;

    #[tokio::test]
    async fn same_stream_always_maps_to_same_stripe() {
        let locks = TransitionLocks::new();
        let spec = LiveDataSpecification::new("OpenGamma", [ExternalId::of("TICKER", "AAPL")]);

        assert_eq!(locks.stripe_index(&spec), locks.stripe_index(&spec.clone()));

        let _held = locks.lock(&spec).await;
        let second = tokio::time::timeout(Duration::from_millis(10), locks.lock(&spec)).await;
        assert!(second.is_err());
    }
}
