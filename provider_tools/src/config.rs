use std::time::Duration;

use log::*;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const PAYPAL_SANDBOX_URL: &str = "https://api-m.sandbox.paypal.com";
const PAYPAL_LIVE_URL: &str = "https://api-m.paypal.com";
const CRYPTOMUS_URL: &str = "https://api.cryptomus.com";

#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Applies to every outbound request, connection included
    pub timeout: Duration,
    pub paypal_sandbox_url: String,
    pub paypal_live_url: String,
    pub cryptomus_url: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            paypal_sandbox_url: PAYPAL_SANDBOX_URL.to_string(),
            paypal_live_url: PAYPAL_LIVE_URL.to_string(),
            cryptomus_url: CRYPTOMUS_URL.to_string(),
        }
    }
}

impl RemoteConfig {
    pub fn new_from_env_or_default() -> Self {
        let defaults = Self::default();
        let timeout = std::env::var("SMM_REMOTE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ SMM_REMOTE_TIMEOUT_SECS is not a valid number of seconds ({e}). Using the default."))
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);
        let paypal_sandbox_url = std::env::var("SMM_PAYPAL_SANDBOX_URL").unwrap_or(defaults.paypal_sandbox_url);
        let paypal_live_url = std::env::var("SMM_PAYPAL_LIVE_URL").unwrap_or(defaults.paypal_live_url);
        let cryptomus_url = std::env::var("SMM_CRYPTOMUS_URL").unwrap_or(defaults.cryptomus_url);
        Self { timeout, paypal_sandbox_url, paypal_live_url, cryptomus_url }
    }
}
