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

//! Specification resolution: requested stream → canonical stream.

mod distributed;
pub use distributed::DistributedSpecificationResolver;

use crate::error::LiveDataError;
use crate::specification::LiveDataSpecification;
use async_trait::async_trait;
use std::collections::HashMap;

/// Maps a caller-supplied specification to its canonical, fully-qualified form.
///
/// `Ok(None)` means the stream cannot be mapped to anything publishable. Implementations make
/// one attempt per call; there are no retries at this layer.
#[async_trait]
pub trait SpecificationResolver: Send + Sync {
    async fn resolve(
        &self,
        requested: &LiveDataSpecification,
    ) -> Result<Option<LiveDataSpecification>, LiveDataError>;

    async fn resolve_all(
        &self,
        requested: &[LiveDataSpecification],
    ) -> Result<HashMap<LiveDataSpecification, Option<LiveDataSpecification>>, LiveDataError> {
        let mut resolved = HashMap::with_capacity(requested.len());
        for spec in requested {
            resolved.insert(spec.clone(), self.resolve(spec).await?);
        }
        Ok(resolved)
    }
}

/// Treats every non-empty request as already canonical.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassThroughResolver;

#[async_trait]
impl SpecificationResolver for PassThroughResolver {
    async fn resolve(
        &self,
        requested: &LiveDataSpecification,
    ) -> Result<Option<LiveDataSpecification>, LiveDataError> {
        if requested.is_empty() {
            Ok(None)
        } else {
            Ok(Some(requested.clone()))
        }
    }
}
