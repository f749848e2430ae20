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

use crate::entitlement::EntitlementChecker;
use crate::error::LiveDataError;
use crate::specification::{LiveDataSpecification, UserPrincipal};
use async_trait::async_trait;

/// Grants every request.
#[derive(Clone, Copy, Debug, Default)]
pub struct PermissiveEntitlementChecker;

#[async_trait]
impl EntitlementChecker for PermissiveEntitlementChecker {
    async fn is_entitled(
        &self,
        _user: &UserPrincipal,
        _specification: &LiveDataSpecification,
    ) -> Result<bool, LiveDataError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::PermissiveEntitlementChecker;
    use crate::entitlement::EntitlementChecker;
    use crate::specification::{ExternalId, LiveDataSpecification, UserPrincipal};

    #[tokio::test]
    async fn grants_batch() {
        let user = UserPrincipal::new("anyone", "10.0.0.1");
        let specs = [
            LiveDataSpecification::new("Raw", [ExternalId::of("BBG", "A")]),
            LiveDataSpecification::new("Raw", [ExternalId::of("BBG", "B")]),
        ];

        let entitlements = PermissiveEntitlementChecker
            .is_entitled_all(&user, &specs)
            .await
            .unwrap();

        assert_eq!(entitlements.len(), 2);
        assert!(entitlements.values().all(|entitled| *entitled));
    }
}
