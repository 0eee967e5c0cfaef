//! Concrete HTTP clients for the remote services the panel talks to.
//!
//! Each client implements one of the remote traits from `smm_common::remote`, so the panel engine never sees a URL or a
//! JSON payload. Every client shares the same [`RemoteConfig`], which carries the request timeout and the base URLs.
mod config;
mod cryptomus;
mod error;
mod helpers;
mod paypal;
mod smm_provider;

pub use config::RemoteConfig;
pub use cryptomus::{sign_payload, CryptomusClient};
pub use error::ClientInitError;
pub use paypal::PaypalClient;
pub use smm_provider::SmmProviderClient;

fn build_client(config: &RemoteConfig) -> Result<reqwest::Client, ClientInitError> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .user_agent(concat!("smm-panel/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ClientInitError(e.to_string()))
}
