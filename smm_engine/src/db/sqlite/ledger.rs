//! The wallet ledger.
//!
//! `users.balance` is only ever modified by the functions in this module. Every change is journalled in
//! `wallet_ledger`, whose `UNIQUE (cause, cause_id)` constraint guarantees that a single event (an order, a deposit, a
//! refund) can move a wallet at most once.
//!
//! None of these functions are atomic by themselves. Call them inside a transaction, together with the status write
//! that causes the mutation, and pass `&mut *tx` as the connection.
use log::{debug, info, trace};
use smm_common::Money;
use sqlx::SqliteConnection;

use super::users;
use crate::{
    db::traits::{CreditOutcome, PanelDatabaseError},
    db_types::{CauseRef, LedgerEntry},
};

/// Removes `amount` from the user's balance if, and only if, the balance covers it. The check and the reservation are
/// a single conditional `UPDATE`, so two concurrent debits cannot both pass the check.
///
/// Returns the new balance. The caller must record the ledger entry with [`record_entry`] once the cause id is known.
pub async fn debit(user_id: i64, amount: Money, conn: &mut SqliteConnection) -> Result<Money, PanelDatabaseError> {
    if amount.is_negative() {
        return Err(PanelDatabaseError::InvalidData(format!("Cannot debit a negative amount ({amount})")));
    }
    let balance: Option<Money> = sqlx::query_scalar(
        r#"
            UPDATE users SET balance = balance - $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND balance >= $3
            RETURNING balance
        "#,
    )
    .bind(amount)
    .bind(user_id)
    .bind(amount)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .next();
    match balance {
        Some(balance) => {
            trace!("💰️ Debited {amount} from user #{user_id}. New balance: {balance}");
            Ok(balance)
        },
        None => {
            let user = users::fetch_user(user_id, conn).await?.ok_or(PanelDatabaseError::UserNotFound(user_id))?;
            debug!("💰️ User #{user_id} cannot cover {amount}. Balance is {}", user.balance);
            Err(PanelDatabaseError::InsufficientBalance { balance: user.balance, required: amount })
        },
    }
}

/// Credits `amount` to the user's wallet for the given cause, unless that cause has already been credited.
pub async fn credit_once(
    user_id: i64,
    amount: Money,
    cause: CauseRef,
    memo: &str,
    conn: &mut SqliteConnection,
) -> Result<CreditOutcome, PanelDatabaseError> {
    if amount.is_negative() || amount.is_zero() {
        return Err(PanelDatabaseError::InvalidData(format!("Cannot credit a non-positive amount ({amount})")));
    }
    if entry_exists(cause, &mut *conn).await? {
        info!("💰️ {cause} has already been credited to user #{user_id}. Not crediting it again.");
        return Ok(CreditOutcome::AlreadyApplied);
    }
    let balance: Option<Money> = sqlx::query_scalar(
        "UPDATE users SET balance = balance + $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING balance",
    )
    .bind(amount)
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .next();
    let balance = balance.ok_or(PanelDatabaseError::UserNotFound(user_id))?;
    record_entry(user_id, amount, cause, balance, memo, conn).await?;
    debug!("💰️ Credited {amount} to user #{user_id} for {cause}. New balance: {balance}");
    Ok(CreditOutcome::Credited(balance))
}

/// Journals a balance change. Fails with a unique-constraint violation if the cause has already been journalled,
/// which rolls back the surrounding transaction.
pub async fn record_entry(
    user_id: i64,
    amount: Money,
    cause: CauseRef,
    balance_after: Money,
    memo: &str,
    conn: &mut SqliteConnection,
) -> Result<LedgerEntry, PanelDatabaseError> {
    let entry: LedgerEntry = sqlx::query_as(
        r#"
            INSERT INTO wallet_ledger (user_id, amount, cause, cause_id, balance_after, memo)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .bind(cause.cause)
    .bind(cause.id)
    .bind(balance_after)
    .bind(memo)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next()
    .ok_or(sqlx::Error::RowNotFound)?;
    Ok(entry)
}

pub async fn entry_exists(cause: CauseRef, conn: &mut SqliteConnection) -> Result<bool, PanelDatabaseError> {
    let id: Option<i64> = sqlx::query_scalar("SELECT id FROM wallet_ledger WHERE cause = $1 AND cause_id = $2")
        .bind(cause.cause)
        .bind(cause.id)
        .fetch_optional(conn)
        .await?;
    Ok(id.is_some())
}

pub async fn fetch_entries_for_user(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<LedgerEntry>, PanelDatabaseError> {
    let entries = sqlx::query_as("SELECT * FROM wallet_ledger WHERE user_id = $1 ORDER BY id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(entries)
}
