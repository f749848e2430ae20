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

//! Entitlement checking: may this consumer receive this stream?
//!
//! Three interchangeable strategies share the [`EntitlementChecker`] trait:
//!
//! - [`PermissiveEntitlementChecker`] grants everything (trusted test environments).
//! - [`UserPermissionEntitlementChecker`] derives a permission string from the stream and asks
//!   a [`PermissionStore`] whether the user holds it, wildcards included.
//! - [`DistributedEntitlementChecker`] asks a remote entitlement service and waits for the
//!   answer with a deadline.

mod distributed;
mod permissive;
mod user_permission;
mod wildcard;

pub use distributed::DistributedEntitlementChecker;
pub use permissive::PermissiveEntitlementChecker;
pub use user_permission::{PermissionStore, UserPermissionEntitlementChecker};
pub use wildcard::WildcardPermission;

use crate::error::LiveDataError;
use crate::specification::{LiveDataSpecification, UserPrincipal};
use async_trait::async_trait;
use std::collections::HashMap;

/// Decides whether `user` may receive the qualified stream `specification`.
///
/// `Ok(false)` is a denial. `Err` is an infrastructure failure, e.g. an unreachable remote
/// entitlement service, and must not be read as a denial.
#[async_trait]
pub trait EntitlementChecker: Send + Sync {
    async fn is_entitled(
        &self,
        user: &UserPrincipal,
        specification: &LiveDataSpecification,
    ) -> Result<bool, LiveDataError>;

    async fn is_entitled_all(
        &self,
        user: &UserPrincipal,
        specifications: &[LiveDataSpecification],
    ) -> Result<HashMap<LiveDataSpecification, bool>, LiveDataError> {
        let mut entitlements = HashMap::with_capacity(specifications.len());
        for specification in specifications {
            let entitled = self.is_entitled(user, specification).await?;
            entitlements.insert(specification.clone(), entitled);
        }
        Ok(entitlements)
    }
}
