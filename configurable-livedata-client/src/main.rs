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

mod config;

use crate::config::{Config, DistributionMode, ServiceMode};
use async_trait::async_trait;
use clap::Parser;
use livedata_client::{
    DistributedEntitlementChecker, DistributedSpecificationResolver, EntitlementChecker,
    LiveDataClient, LiveDataListener, LiveDataSpecification, LiveDataSubscriptionResponse,
    LiveDataValueUpdate, MessageQueueSubscriptionTransport, PassThroughResolver,
    PermissiveEntitlementChecker, RequestResponseSubscriptionTransport, SpecificationResolver,
    SubscriptionTransport, UserPermissionEntitlementChecker, ValueDistributor,
    ValueUpdateDispatcher,
};
use livedata_static_file::{StaticFilePermissionStore, StaticFileSpecificationResolver};
use loopback_livedata_server::{LoopbackLiveDataServer, TickDistribution};
use serde_json::json;
use std::error::Error;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command()]
struct ClientArgs {
    #[arg(short, long, value_name = "FILE")]
    config: String,
}

/// Logs everything the client hands it.
struct LoggingListener;

#[async_trait]
impl LiveDataListener for LoggingListener {
    async fn subscription_result_received(&self, response: LiveDataSubscriptionResponse) {
        info!(
            requested = %response.requested_specification,
            qualified = %response
                .fully_qualified_specification
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            result = %response.result,
            message = response.user_message.as_deref().unwrap_or_default(),
            "subscription result"
        );
    }

    async fn value_update(&self, update: &LiveDataValueUpdate) {
        info!(
            spec = %update.specification,
            seq = update.sequence_number,
            fields = %json!(update.fields),
            "value update"
        );
    }

    async fn subscription_stopped(&self, fully_qualified_specification: &LiveDataSpecification) {
        info!(spec = %fully_qualified_specification, "subscription stopped");
    }
}

/// Services the server runs for itself, backed by the same files the client may use.
fn server_services(
    config: &Config,
) -> Result<(Arc<dyn SpecificationResolver>, Arc<dyn EntitlementChecker>), Box<dyn Error>> {
    let resolver: Arc<dyn SpecificationResolver> = match config.resolution.aliases_file()? {
        Some(file) => Arc::new(StaticFileSpecificationResolver::new(file.to_string())),
        None => Arc::new(PassThroughResolver),
    };
    let entitlement_checker: Arc<dyn EntitlementChecker> = match config.entitlement.permissions()?
    {
        Some((file, permission)) => Arc::new(UserPermissionEntitlementChecker::new(
            Arc::new(StaticFilePermissionStore::new(file.to_string())),
            permission.clone(),
        )),
        None => Arc::new(PermissiveEntitlementChecker),
    };
    Ok((resolver, entitlement_checker))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let _ = tracing_subscriber::fmt::try_init();

    info!("Started configurable-livedata-client");

    let args = ClientArgs::parse();
    let contents = fs::read_to_string(&args.config)
        .map_err(|e| format!("Unable to read config file {}: {e:?}", args.config))?;
    let config: Config = json5::from_str(&contents)
        .map_err(|e| format!("Unable to parse config file: {e:?}"))?;

    let requested = config
        .streams
        .iter()
        .map(|stream| stream.specification())
        .collect::<Result<Vec<_>, _>>()?;

    let (server_resolver, server_entitlement_checker) = server_services(&config)?;
    let distribution = match config.distribution {
        DistributionMode::Direct => TickDistribution::Direct,
        DistributionMode::Topics => TickDistribution::Topics,
    };
    let server = LoopbackLiveDataServer::with_services(
        distribution,
        server_resolver.clone(),
        server_entitlement_checker.clone(),
    );

    let distributor = Arc::new(ValueDistributor::new());
    let transport: Arc<dyn SubscriptionTransport> = match config.distribution {
        DistributionMode::Direct => {
            server
                .connect_tick_receiver(Arc::new(ValueUpdateDispatcher::new(distributor.clone())))
                .await;
            Arc::new(RequestResponseSubscriptionTransport::new(
                server.subscription_channel(),
            ))
        }
        DistributionMode::Topics => Arc::new(MessageQueueSubscriptionTransport::new(
            server.subscription_channel(),
            server.broker(),
            distributor.clone(),
        )),
    };

    let resolver: Arc<dyn SpecificationResolver> = match config.resolution.mode {
        ServiceMode::Permissive | ServiceMode::StaticFile => server_resolver,
        ServiceMode::Remote => Arc::new(DistributedSpecificationResolver::new(
            server.resolution_channel(),
            config.client.resolution_timeout(),
        )),
    };
    let entitlement_checker: Arc<dyn EntitlementChecker> = match config.entitlement.mode {
        ServiceMode::Permissive | ServiceMode::StaticFile => server_entitlement_checker,
        ServiceMode::Remote => Arc::new(DistributedEntitlementChecker::new(
            server.entitlement_channel(),
            config.client.entitlement_timeout(),
        )),
    };

    let client = LiveDataClient::builder(transport, distributor)
        .config(config.client.clone())
        .resolver(resolver)
        .entitlement_checker(entitlement_checker)
        .heartbeat_sender(server.heartbeat_channel())
        .build();

    let listener: Arc<dyn LiveDataListener> = Arc::new(LoggingListener);
    client
        .subscribe_all(&config.user, &requested, listener.clone())
        .await?;

    let active: Vec<LiveDataSpecification> = client.active_specifications().into_iter().collect();
    info!(streams = active.len(), "publishing ticks");

    tokio::select! {
        _ = publish_ticks(&server, &active, config.ticks.per_stream, config.ticks.interval_millis) => {}
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }

    if let Some(specification) = active.first() {
        match client
            .snapshot(&config.user, specification, config.client.snapshot_timeout())
            .await
        {
            Ok(update) => info!(
                spec = %update.specification,
                seq = update.sequence_number,
                fields = %json!(update.fields),
                "snapshot"
            ),
            Err(err) => warn!(spec = %specification, err = %err, "snapshot failed"),
        }
    }

    client
        .unsubscribe_all(&config.user, &active, listener)
        .await;
    client.close().await;

    Ok(())
}

async fn publish_ticks(
    server: &LoopbackLiveDataServer,
    specifications: &[LiveDataSpecification],
    per_stream: u32,
    interval_millis: u64,
) {
    let mut interval = tokio::time::interval(Duration::from_millis(interval_millis.max(1)));
    for tick in 0..per_stream {
        interval.tick().await;
        for (index, specification) in specifications.iter().enumerate() {
            let last = 100.0 + index as f64 * 10.0 + f64::from(tick) * 0.25;
            server
                .publish(
                    specification,
                    [("LAST", json!(last)), ("VOLUME", json!(100 * (tick + 1)))],
                )
                .await;
        }
    }
}
