use anyhow::{anyhow, Context};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use curator_core::config::{Config, WarnLevel};
use curator_core::gateway::LedgerGateway;
use curator_core::rules::RuleTable;
use curator_core::scanner::BlockScanner;
use curator_core::scheduler::ActionScheduler;
use curator_core::shutdown;
use curator_core::store::StateDb;

use crate::gateway::SteemGateway;

pub fn run(config_path: &Path, state_dir: Option<&Path>, start_from: Option<u64>) -> anyhow::Result<()> {
    let (config, findings) = Config::load_validated(config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    for w in findings.iter().filter(|w| w.level == WarnLevel::Warning) {
        warn!("{}", w.message);
    }

    let rules = Arc::new(config.rule_table()?);
    let (db_path, db) = super::open_state(&config, state_dir)?;
    let gateway = SteemGateway::from_config(&config).context("failed to build ledger client")?;
    info!(
        account = %config.account,
        nodes = ?gateway.nodes(),
        rules = rules.len(),
        state_db = %db_path.display(),
        "curator starting"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(serve(config, rules, Arc::new(db), Arc::new(gateway), start_from))
}

async fn serve(
    config: Config,
    rules: Arc<RuleTable>,
    db: Arc<StateDb>,
    gateway: Arc<SteemGateway>,
    start_from: Option<u64>,
) -> anyhow::Result<()> {
    let head = gateway
        .head_height()
        .await
        .map_err(|e| anyhow!("no reachable ledger node: {e}"))?;
    info!(head, "connected to ledger");

    let scheduler = Arc::new(ActionScheduler::new(
        gateway.clone(),
        rules.clone(),
        db.clone(),
        config.scheduler.clone(),
    ));
    let mut scanner = BlockScanner::new(gateway, rules, db, scheduler.clone(), config.scanner.clone());

    let (stop, stop_rx) = shutdown::channel();
    let mut scan = tokio::spawn(async move { scanner.run(start_from, stop_rx).await });

    let scanned = tokio::select! {
        res = &mut scan => res,
        _ = shutdown_signal() => {
            info!("shutdown requested; finishing current block");
            stop.send_replace(true);
            scan.await
        }
    };

    scheduler.shutdown().await;
    scanned.context("scanner task panicked")??;
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
                return;
            }
            Err(e) => warn!(error = %e, "cannot listen for SIGTERM"),
        }
    }
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C; running until killed");
        std::future::pending::<()>().await;
    }
}
