mod signals;

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use ddc_client::{ClientConfig, HttpControlPlane};
use ddc_core::{AgentConfig, Reconciler, arch, platform};
use ddc_exec::ProcessPool;
use ddc_observe::{LoggerConfig, logger_init};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1) Config + logger
    let cfg = AgentConfig::from_env().context("invalid agent configuration")?;
    let log_cfg = LoggerConfig::parse(&cfg.log_level, &cfg.log_format)?;
    logger_init(&log_cfg)?;
    info!(
        platform = platform(),
        arch = arch(),
        api_url = %cfg.api_url,
        "starting ddc agent"
    );

    // 2) Control plane client + process pool
    let client = HttpControlPlane::new(
        ClientConfig::new(cfg.api_url.clone()).with_timeout(cfg.request_timeout),
    )
    .context("failed to build control plane client")?;
    let pool = Arc::new(ProcessPool::new());

    // 3) Signals
    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        match signals::wait_for_shutdown_signal().await {
            Ok(signal) => {
                info!(signal, "shutdown signal received");
                trigger.cancel();
            }
            Err(e) => error!(error = %e, "failed to install signal handlers"),
        }
    });

    // 4) Reconcile until shutdown or fatal credential error
    Reconciler::new(
        Arc::new(client),
        pool,
        cfg.reconcile.clone(),
        cfg.supported_types.clone(),
        shutdown,
    )
    .run()
    .await?;

    info!("agent stopped");
    Ok(())
}
