use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};

use prwarden_service::{Service, sweep};

use crate::config::Config;
use crate::endpoints;

/// Starts the sweep task and the HTTP server based on the loaded config.
pub fn run(config: Config) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("prwarden")
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let service = Arc::new(
            Service::create(config.github.clone(), &config.cache, &config.retry)
                .context("failed to create the service")?,
        );

        if config.sweep.enabled && config.github.repo.is_some() {
            let service = service.clone();
            let interval = config.sweep.interval;
            tokio::spawn(async move {
                let mut timer = tokio::time::interval(interval);
                timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                // The first tick fires immediately; skip it so a restart loop
                // does not hammer the API.
                timer.tick().await;

                loop {
                    timer.tick().await;
                    if let Err(err) = sweep::sweep_once(&service).await {
                        tracing::error!(error = %err, "conflict sweep failed");
                    }
                }
            });
        } else {
            tracing::info!("conflict sweep disabled");
        }

        let socket = config.bind().parse::<SocketAddr>()?;
        tracing::info!("Starting HTTP server on {}", socket);
        axum_server::bind(socket)
            .serve(endpoints::create_app(service).into_make_service())
            .await?;
        tracing::info!("System shutdown complete");

        Ok(())
    })
}
