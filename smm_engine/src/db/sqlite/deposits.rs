use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db::traits::PanelDatabaseError,
    db_types::{Deposit, DepositDetail, DepositStatus, NewDeposit},
};

pub async fn insert_deposit(deposit: NewDeposit, conn: &mut SqliteConnection) -> Result<Deposit, PanelDatabaseError> {
    let deposit: Deposit = sqlx::query_as(
        r#"
            INSERT INTO deposits (user_id, gateway_id, amount, provider, detail)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
        "#,
    )
    .bind(deposit.user_id)
    .bind(deposit.gateway_id)
    .bind(deposit.amount)
    .bind(deposit.detail.provider_tag())
    .bind(deposit.detail.encode())
    .fetch_all(conn)
    .await?
    .into_iter()
    .next()
    .ok_or(sqlx::Error::RowNotFound)?;
    trace!("🗃️ Deposit #{} of {} inserted for user #{}", deposit.id, deposit.amount, deposit.user_id);
    Ok(deposit)
}

pub async fn fetch_deposit(deposit_id: i64, conn: &mut SqliteConnection) -> Result<Option<Deposit>, PanelDatabaseError> {
    let deposit =
        sqlx::query_as("SELECT * FROM deposits WHERE id = $1").bind(deposit_id).fetch_optional(conn).await?;
    Ok(deposit)
}

pub async fn fetch_deposits_for_user(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Deposit>, PanelDatabaseError> {
    let deposits = sqlx::query_as("SELECT * FROM deposits WHERE user_id = $1 ORDER BY id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(deposits)
}

pub async fn fetch_pending_remote_deposits(conn: &mut SqliteConnection) -> Result<Vec<Deposit>, PanelDatabaseError> {
    let deposits = sqlx::query_as(
        "SELECT * FROM deposits WHERE status = $1 AND provider IN ('PAYPAL', 'CRYPTOMUS') ORDER BY id",
    )
    .bind(DepositStatus::Pending)
    .fetch_all(conn)
    .await?;
    Ok(deposits)
}

pub async fn update_detail(
    deposit_id: i64,
    detail: &DepositDetail,
    conn: &mut SqliteConnection,
) -> Result<Deposit, PanelDatabaseError> {
    let deposit: Option<Deposit> = sqlx::query_as(
        r#"
            UPDATE deposits SET provider = $1, detail = $2, updated_at = CURRENT_TIMESTAMP
            WHERE id = $3
            RETURNING *
        "#,
    )
    .bind(detail.provider_tag())
    .bind(detail.encode())
    .bind(deposit_id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    deposit.ok_or(PanelDatabaseError::DepositNotFound(deposit_id))
}

/// Takes the database write lock before the deposit is read, so that a read-then-write transaction never has to upgrade
/// a read lock (which SQLite refuses with `SQLITE_BUSY` while another writer is active). Returns `false` if the deposit
/// does not exist.
pub async fn lock_for_update(deposit_id: i64, conn: &mut SqliteConnection) -> Result<bool, PanelDatabaseError> {
    let result = sqlx::query("UPDATE deposits SET id = id WHERE id = $1").bind(deposit_id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

/// Compare-and-set status write. Returns `None` if the deposit no longer has the `expected` status.
pub async fn compare_and_set_status(
    deposit_id: i64,
    expected: DepositStatus,
    status: DepositStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Deposit>, PanelDatabaseError> {
    let deposit: Option<Deposit> = sqlx::query_as(
        r#"
            UPDATE deposits SET status = $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND status = $3
            RETURNING *
        "#,
    )
    .bind(status)
    .bind(deposit_id)
    .bind(expected)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    Ok(deposit)
}
