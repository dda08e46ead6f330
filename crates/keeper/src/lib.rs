// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tokenkeeper: keeps every tenant's OAuth access token renewed ahead of expiry.

pub mod config;
pub mod credential;
pub mod error;
pub mod provider;
pub mod refresh;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod test_support;
pub mod transport;

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::provider::{HttpTokenExchange, TokenExchange};
use crate::state::AppState;
use crate::store::{CredentialStore, JsonStore};
use crate::transport::build_router;

/// Install the global tracing subscriber. A second call is a no-op.
pub fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match config.log_format.as_str() {
        "json" => fmt::fmt().with_env_filter(filter).json().try_init(),
        _ => fmt::fmt().with_env_filter(filter).try_init(),
    };
    drop(result);
}

/// Open the configured store: file-backed when a path is set.
pub fn open_store(config: &Config) -> anyhow::Result<Arc<dyn CredentialStore>> {
    Ok(match config.store_path {
        Some(ref path) => Arc::new(JsonStore::open(path)?),
        None => {
            tracing::warn!("no --store-path given, credentials will not survive a restart");
            Arc::new(JsonStore::in_memory())
        }
    })
}

/// Run the keeper until Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    provider::install_crypto_provider();

    let store = open_store(&config)?;
    let provider: Arc<dyn TokenExchange> = Arc::new(
        HttpTokenExchange::new(config.provider_settings())
            .context("failed to build token endpoint client")?,
    );
    let state = AppState::new(&config, store, provider);

    if config.no_scheduler {
        tracing::info!("scheduler disabled at boot");
    } else {
        let scheduler = Arc::clone(&state.scheduler);
        tokio::spawn(async move {
            scheduler.start().await;
        });
    }

    let shutdown = state.shutdown.clone();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("interrupt received, shutting down");
                    shutdown.cancel();
                }
                Err(e) => tracing::warn!(err = %e, "cannot listen for interrupt"),
            }
        }
    });

    let addr = format!("{}:{}", config.host, config.port);
    let listener =
        TcpListener::bind(&addr).await.with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("tokenkeeper listening on {}", listener.local_addr()?);

    let scheduler = Arc::clone(&state.scheduler);
    let router = build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            scheduler.stop();
        })
        .await?;

    Ok(())
}
