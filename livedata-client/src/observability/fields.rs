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

//! Canonical structured field keys and value-format helpers.

use crate::specification::LiveDataSpecification;

pub const EVENT: &str = "event";
pub const COMPONENT: &str = "component";
pub const USER: &str = "user";
pub const REQUESTED_SPEC: &str = "requested_spec";
pub const QUALIFIED_SPEC: &str = "qualified_spec";
pub const TOPIC: &str = "topic";
pub const RESULT: &str = "result";
pub const REASON: &str = "reason";
pub const ERR: &str = "err";

pub const NONE: &str = "none";
pub const REASON_TRANSPORT_STOPPED: &str = "transport_stopped";
pub const REASON_CLIENT_CLOSED: &str = "client_closed";

pub fn format_spec(spec: &LiveDataSpecification) -> String {
    spec.to_string()
}

pub fn format_optional_spec(spec: Option<&LiveDataSpecification>) -> String {
    spec.map(format_spec).unwrap_or_else(|| NONE.to_string())
}

pub fn format_spec_list(specs: &[LiveDataSpecification]) -> String {
    let formatted: Vec<String> = specs.iter().map(format_spec).collect();
    format!("[{}]", formatted.join("; "))
}
