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

use crate::config::UserPermissionEntitlementConfig;
use crate::entitlement::{EntitlementChecker, WildcardPermission};
use crate::error::LiveDataError;
use crate::observability::{events, fields};
use crate::specification::{LiveDataSpecification, UserPrincipal};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

const COMPONENT: &str = "user_permission_entitlement";

/// External user/permission store.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Permission strings held by `user_name`, or `None` when the user is unknown.
    async fn permissions(&self, user_name: &str) -> Option<Vec<String>>;
}

/// Grants a stream when the user holds `permission_prefix + <identifier value>`.
pub struct UserPermissionEntitlementChecker {
    store: Arc<dyn PermissionStore>,
    config: UserPermissionEntitlementConfig,
}

impl UserPermissionEntitlementChecker {
    pub fn new(store: Arc<dyn PermissionStore>, config: UserPermissionEntitlementConfig) -> Self {
        Self { store, config }
    }

    /// The permission a user must hold to receive `specification`, if it can be derived.
    pub fn required_permission(&self, specification: &LiveDataSpecification) -> Option<String> {
        specification
            .identifier(&self.config.identifier_scheme)
            .map(|value| format!("{}{}", self.config.permission_prefix, value))
    }
}

#[async_trait]
impl EntitlementChecker for UserPermissionEntitlementChecker {
    async fn is_entitled(
        &self,
        user: &UserPrincipal,
        specification: &LiveDataSpecification,
    ) -> Result<bool, LiveDataError> {
        let Some(required) = self.required_permission(specification) else {
            warn!(
                event = events::ENTITLEMENT_MISSING_IDENTIFIER,
                component = COMPONENT,
                qualified_spec = %fields::format_spec(specification),
                identifier_scheme = self.config.identifier_scheme.as_str(),
                "specification carries no identifier of the permission scheme"
            );
            return Ok(false);
        };

        let Some(held) = self.store.permissions(&user.user_name).await else {
            debug!(
                event = events::ENTITLEMENT_UNKNOWN_USER,
                component = COMPONENT,
                user = %user,
                "user not present in permission store"
            );
            return Ok(false);
        };

        let Some(required) = WildcardPermission::parse(&required) else {
            return Ok(false);
        };

        let entitled = held
            .iter()
            .filter_map(|permission| WildcardPermission::parse(permission))
            .any(|permission| permission.implies(&required));

        debug!(
            event = events::ENTITLEMENT_CHECK,
            component = COMPONENT,
            user = %user,
            qualified_spec = %fields::format_spec(specification),
            entitled,
            "checked user permission"
        );
        Ok(entitled)
    }
}

#[cfg(test)]
mod tests {
    use super::{PermissionStore, UserPermissionEntitlementChecker};
    use crate::config::UserPermissionEntitlementConfig;
    use crate::entitlement::EntitlementChecker;
    use crate::specification::{ExternalId, LiveDataSpecification, UserPrincipal};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct MapStore(HashMap<String, Vec<String>>);

    #[async_trait]
    impl PermissionStore for MapStore {
        async fn permissions(&self, user_name: &str) -> Option<Vec<String>> {
            self.0.get(user_name).cloned()
        }
    }

    fn checker() -> UserPermissionEntitlementChecker {
        let store = MapStore(HashMap::from([
            (
                "trader".to_string(),
                vec!["LiveData:BBG:IBM US Equity".to_string()],
            ),
            ("admin".to_string(), vec!["LiveData:*".to_string()]),
        ]));
        UserPermissionEntitlementChecker::new(
            Arc::new(store),
            UserPermissionEntitlementConfig {
                permission_prefix: "LiveData:BBG:".to_string(),
                identifier_scheme: "BLOOMBERG_TICKER".to_string(),
            },
        )
    }

    fn bbg(ticker: &str) -> LiveDataSpecification {
        LiveDataSpecification::new("OpenGamma", [ExternalId::of("BLOOMBERG_TICKER", ticker)])
    }

    #[tokio::test]
    async fn permission_string_is_prefix_plus_identifier() {
        assert_eq!(
            checker().required_permission(&bbg("IBM US Equity")),
            Some("LiveData:BBG:IBM US Equity".to_string())
        );
    }

    #[tokio::test]
    async fn exact_and_wildcard_holders_are_entitled() {
        let checker = checker();
        let trader = UserPrincipal::new("trader", "10.0.0.1");
        let admin = UserPrincipal::new("admin", "10.0.0.2");

        assert!(checker.is_entitled(&trader, &bbg("IBM US Equity")).await.unwrap());
        assert!(!checker.is_entitled(&trader, &bbg("MSFT US Equity")).await.unwrap());
        assert!(checker.is_entitled(&admin, &bbg("MSFT US Equity")).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_user_and_missing_identifier_are_denied() {
        let checker = checker();
        let stranger = UserPrincipal::new("stranger", "10.0.0.3");
        let admin = UserPrincipal::new("admin", "10.0.0.2");
        let ric_only = LiveDataSpecification::new("OpenGamma", [ExternalId::of("RIC", "IBM.N")]);

        assert!(!checker.is_entitled(&stranger, &bbg("IBM US Equity")).await.unwrap());
        assert!(!checker.is_entitled(&admin, &ric_only).await.unwrap());
    }
}
