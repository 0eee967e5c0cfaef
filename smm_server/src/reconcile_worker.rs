use std::time::Duration;

use log::*;
use smm_engine::{deposit_objects::DepositUrls, BatchReport, DepositApi, OrderSyncApi, SqliteDatabase};
use tokio::task::JoinHandle;

use crate::server::RemoteClients;

/// Starts the reconciliation worker, which syncs orders with their providers and pending deposits with their gateways
/// every `interval`. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_reconcile_worker(
    db: SqliteDatabase,
    clients: RemoteClients,
    urls: DepositUrls,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        let orders = OrderSyncApi::new(db.clone(), clients.provider);
        let deposits = DepositApi::new(db, clients.paypal, clients.cryptomus, urls);
        info!("🕰️ Reconciliation worker started. Running every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            info!("🕰️ Running reconciliation job");
            match orders.sync_all_orders().await {
                Ok(report) => log_report("Order sync", &report),
                Err(e) => error!("🕰️ Error running order sync: {e}"),
            }
            match deposits.update_all_deposits().await {
                Ok(report) => log_report("Deposit update", &report),
                Err(e) => error!("🕰️ Error running deposit update: {e}"),
            }
        }
    })
}

fn log_report(job: &str, report: &BatchReport) {
    info!("🕰️ {job}: {report}");
    if !report.failures.is_empty() {
        let failures =
            report.failures.iter().map(|f| format!("[{}] {}", f.id, f.message)).collect::<Vec<String>>().join(", ");
        debug!("🕰️ {job} failures: {failures}");
    }
}
