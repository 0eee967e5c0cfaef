use std::{env, time::Duration};

use log::*;
use provider_tools::RemoteConfig;
use smm_engine::{deposit_objects::DepositUrls, order_objects::CommentsRangePolicy};

const DEFAULT_SMM_HOST: &str = "127.0.0.1";
const DEFAULT_SMM_PORT: u16 = 8360;
const DEFAULT_SMM_DATABASE_URL: &str = "sqlite://data/smm_panel.db";
const DEFAULT_RETURN_URL: &str = "http://localhost:8360/deposits/{id}/return";
const DEFAULT_CANCEL_URL: &str = "http://localhost:8360/deposits/{id}/cancel";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Apply outstanding migrations before the server starts accepting requests.
    pub run_migrations: bool,
    /// Whether custom-comment orders must respect the service's quantity range.
    pub comments_policy: CommentsRangePolicy,
    /// Return, cancel and callback URLs handed to hosted checkouts. `{id}` is replaced with the deposit id.
    pub deposit_urls: DepositUrls,
    /// How often the background worker syncs orders and deposits. `None` disables the worker.
    pub reconcile_interval: Option<Duration>,
    pub remote: RemoteConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SMM_HOST.to_string(),
            port: DEFAULT_SMM_PORT,
            database_url: DEFAULT_SMM_DATABASE_URL.to_string(),
            run_migrations: true,
            comments_policy: CommentsRangePolicy::default(),
            deposit_urls: DepositUrls {
                return_url: DEFAULT_RETURN_URL.to_string(),
                cancel_url: DEFAULT_CANCEL_URL.to_string(),
                callback_url: None,
            },
            reconcile_interval: None,
            remote: RemoteConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SMM_HOST").ok().unwrap_or_else(|| DEFAULT_SMM_HOST.into());
        let port = env::var("SMM_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SMM_PORT. {e} Using the default, {DEFAULT_SMM_PORT}, instead."
                    );
                    DEFAULT_SMM_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SMM_PORT);
        let database_url = env::var("SMM_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ SMM_DATABASE_URL is not set. Using {DEFAULT_SMM_DATABASE_URL}.");
            DEFAULT_SMM_DATABASE_URL.to_string()
        });
        let run_migrations = env::var("SMM_RUN_MIGRATIONS").map(|s| &s != "0" && &s != "false").unwrap_or(true);
        let comments_policy = env::var("SMM_COMMENTS_RANGE_POLICY")
            .ok()
            .and_then(|s| s.parse::<CommentsRangePolicy>().map_err(|e| warn!("🪛️ {e}. Using the default.")).ok())
            .unwrap_or_default();
        info!("🪛️ Custom comment orders: quantity range policy is '{comments_policy}'");
        let deposit_urls = configure_deposit_urls();
        let reconcile_interval = configure_reconcile_interval();
        let remote = RemoteConfig::new_from_env_or_default();
        Self { host, port, database_url, run_migrations, comments_policy, deposit_urls, reconcile_interval, remote }
    }
}

fn configure_deposit_urls() -> DepositUrls {
    let return_url = env::var("SMM_DEPOSIT_RETURN_URL").ok().unwrap_or_else(|| {
        warn!("🪛️ SMM_DEPOSIT_RETURN_URL is not set. Payers will be returned to {DEFAULT_RETURN_URL}");
        DEFAULT_RETURN_URL.to_string()
    });
    let cancel_url = env::var("SMM_DEPOSIT_CANCEL_URL").ok().unwrap_or_else(|| {
        warn!("🪛️ SMM_DEPOSIT_CANCEL_URL is not set. Abandoned checkouts will land on {DEFAULT_CANCEL_URL}");
        DEFAULT_CANCEL_URL.to_string()
    });
    let callback_url = env::var("SMM_CRYPTOMUS_CALLBACK_URL").ok().filter(|s| !s.trim().is_empty());
    DepositUrls { return_url, cancel_url, callback_url }
}

fn configure_reconcile_interval() -> Option<Duration> {
    let secs = env::var("SMM_RECONCILE_INTERVAL")
        .map_err(|_| info!("🪛️ SMM_RECONCILE_INTERVAL is not set. Background reconciliation is off."))
        .and_then(|s| {
            s.parse::<u64>().map_err(|e| warn!("🪛️ Invalid configuration value for SMM_RECONCILE_INTERVAL. {e}"))
        })
        .ok()
        .unwrap_or(0);
    (secs > 0).then(|| Duration::from_secs(secs))
}
