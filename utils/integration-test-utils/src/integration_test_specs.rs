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

use livedata_client::{ExternalId, LiveDataSpecification, UserPrincipal};

pub fn trader() -> UserPrincipal {
    UserPrincipal::new("trader", "10.0.0.7")
}

pub fn viewer() -> UserPrincipal {
    UserPrincipal::new("viewer", "10.0.0.8")
}

/// A fully-qualified stream keyed by Bloomberg ticker.
pub fn canonical(bloomberg_ticker: &str) -> LiveDataSpecification {
    LiveDataSpecification::new(
        "OpenGamma",
        [ExternalId::of("BLOOMBERG_TICKER", bloomberg_ticker)],
    )
}

/// A loosely phrased request by exchange ticker.
pub fn raw_ticker(ticker: &str) -> LiveDataSpecification {
    LiveDataSpecification::new("Raw", [ExternalId::of("TICKER", ticker)])
}

pub fn aapl() -> LiveDataSpecification {
    canonical("AAPL US Equity")
}

pub fn msft() -> LiveDataSpecification {
    canonical("MSFT US Equity")
}

pub fn ibm() -> LiveDataSpecification {
    canonical("IBM US Equity")
}
