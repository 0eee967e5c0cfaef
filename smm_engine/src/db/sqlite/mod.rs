//! SQLite backend.
//!
//! Writes that end in `RETURNING` are always read with `fetch_all`. `fetch_one` and `fetch_optional` stop stepping the
//! statement after the first row, and an unfinished write is not committed when the connection goes back to the pool.
pub mod db;

pub mod catalog;
pub mod deposits;
pub mod ledger;
pub mod orders;
pub mod users;

use std::{env, str::FromStr, time::Duration};

pub use db::SqliteDatabase;
use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use crate::db::traits::PanelDatabaseError;

const SQLITE_DB_URL: &str = "sqlite://data/smm_panel.db";
/// How long a writer waits for another connection's write lock before giving up with "database is locked"
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

pub fn db_url() -> String {
    let result = env::var("SMM_DATABASE_URL").unwrap_or_else(|_| {
        info!("SMM_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, PanelDatabaseError> {
    let options = SqliteConnectOptions::from_str(url)?.busy_timeout(BUSY_TIMEOUT);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}
