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

//! Colon-separated wildcard permissions, e.g. `LiveData:Bloomberg:*`.

use std::collections::BTreeSet;

const WILDCARD_TOKEN: &str = "*";
const PART_DIVIDER: char = ':';
const SUBPART_DIVIDER: char = ',';

///
/// [`WildcardPermission`] is a permission split into `:`-separated parts, each part being a
/// `,`-separated set of alternatives or the wildcard `*`.
///
/// A held permission implies a requested one when every part of the held permission is a
/// wildcard or a superset of the corresponding requested part. A held permission with fewer
/// parts implies everything below it.
///
/// # Examples
///
/// ```
/// use livedata_client::WildcardPermission;
///
/// let held = WildcardPermission::parse("LiveData:Bloomberg,Reuters").unwrap();
/// let requested = WildcardPermission::parse("LiveData:Bloomberg:AAPL US Equity").unwrap();
/// assert!(held.implies(&requested));
///
/// let narrow = WildcardPermission::parse("LiveData:Reuters:*").unwrap();
/// assert!(!narrow.implies(&requested));
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WildcardPermission {
    parts: Vec<BTreeSet<String>>,
}

impl WildcardPermission {
    /// Parses a permission string; `None` when it is blank or has an empty part.
    pub fn parse(permission: &str) -> Option<Self> {
        let permission = permission.trim();
        if permission.is_empty() {
            return None;
        }

        let mut parts = Vec::new();
        for part in permission.split(PART_DIVIDER) {
            let subparts: BTreeSet<String> = part
                .split(SUBPART_DIVIDER)
                .map(str::trim)
                .filter(|subpart| !subpart.is_empty())
                .map(str::to_string)
                .collect();
            if subparts.is_empty() {
                return None;
            }
            parts.push(subparts);
        }
        Some(Self { parts })
    }

    pub fn implies(&self, requested: &WildcardPermission) -> bool {
        for (index, requested_part) in requested.parts.iter().enumerate() {
            let Some(held_part) = self.parts.get(index) else {
                return true;
            };
            if !held_part.contains(WILDCARD_TOKEN) && !held_part.is_superset(requested_part) {
                return false;
            }
        }

        self.parts
            .iter()
            .skip(requested.parts.len())
            .all(|held_part| held_part.contains(WILDCARD_TOKEN))
    }
}
