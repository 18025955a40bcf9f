//! cto-agent - scheduler entry point
//!
//! Runs the workflow once, or every `SCHEDULE_INTERVAL_SECS` seconds until
//! Ctrl-C.

use cto_agent::{config::Config, workflow::run_on_schedule, CtoWorkflow};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async_main())
}

async fn async_main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cto_agent=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Loaded configuration: board={} repo={}/{} base={} model={} max_steps={}",
        config.notion_database_id,
        config.repository.owner,
        config.repository.repo,
        config.repository.base_branch,
        config.default_model,
        config.max_steps
    );

    let interval = config.schedule_interval;
    let workflow = CtoWorkflow::from_config(config);

    let Some(interval) = interval else {
        let result = workflow.run().await;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested");
                on_signal.cancel();
            }
            Err(e) => warn!("Could not listen for Ctrl-C: {}", e),
        }
    });

    info!("Running every {:?}", interval);
    run_on_schedule(&workflow, interval, cancel).await;
    Ok(())
}
