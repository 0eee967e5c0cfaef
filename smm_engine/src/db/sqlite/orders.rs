use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db::traits::PanelDatabaseError,
    db_types::{NewOrder, Order, OrderProgress, OrderStatusType},
};

/// Inserts a new order into the database using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, PanelDatabaseError> {
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                invoice,
                user_id,
                service_id,
                provider_id,
                link,
                quantity,
                comments,
                runs,
                run_interval,
                price_api,
                price_sale,
                price_seller,
                charge,
                remains,
                refill
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *;
        "#,
    )
    .bind(order.invoice)
    .bind(order.user_id)
    .bind(order.service_id)
    .bind(order.provider_id)
    .bind(order.link)
    .bind(order.quantity)
    .bind(order.comments)
    .bind(order.runs)
    .bind(order.run_interval)
    .bind(order.price_api)
    .bind(order.price_sale)
    .bind(order.price_seller)
    .bind(order.charge)
    .bind(order.quantity)
    .bind(order.refill)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next()
    .ok_or(sqlx::Error::RowNotFound)?;
    trace!("🗃️ Order #{} ({}) inserted", order.id, order.invoice);
    Ok(order)
}

pub async fn fetch_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, PanelDatabaseError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_orders_for_user(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, PanelDatabaseError> {
    let orders =
        sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY id DESC").bind(user_id).fetch_all(conn).await?;
    Ok(orders)
}

/// Orders that a provider may still report progress on: dispatched (they have a `pid`) and not yet terminal.
pub async fn fetch_syncable_orders(conn: &mut SqliteConnection) -> Result<Vec<Order>, PanelDatabaseError> {
    let orders = sqlx::query_as(
        r#"
            SELECT * FROM orders
            WHERE provider_id IS NOT NULL
              AND pid IS NOT NULL
              AND status NOT IN ($1, $2, $3)
            ORDER BY id
        "#,
    )
    .bind(OrderStatusType::Completed)
    .bind(OrderStatusType::Canceled)
    .bind(OrderStatusType::Error)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

pub async fn mark_dispatched(order_id: i64, pid: &str, conn: &mut SqliteConnection) -> Result<Order, PanelDatabaseError> {
    let order: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET pid = $1, provider_error = NULL, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2
            RETURNING *
        "#,
    )
    .bind(pid)
    .bind(order_id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    order.ok_or(PanelDatabaseError::OrderNotFound(order_id))
}

pub async fn mark_dispatch_failed(
    order_id: i64,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<Order, PanelDatabaseError> {
    let order: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET status = $1, provider_error = $2, updated_at = CURRENT_TIMESTAMP
            WHERE id = $3
            RETURNING *
        "#,
    )
    .bind(OrderStatusType::Error)
    .bind(reason)
    .bind(order_id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    order.ok_or(PanelDatabaseError::OrderNotFound(order_id))
}

/// Compare-and-set update of an order's progress. The update applies only if the order still has the `expected`
/// status and that status is not terminal. Returns `None` if nothing was updated.
pub async fn apply_progress(
    order_id: i64,
    expected: OrderStatusType,
    progress: OrderProgress,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, PanelDatabaseError> {
    let order: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = $1,
                start_count = COALESCE($2, start_count),
                remains = COALESCE($3, remains),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $4
              AND status = $5
              AND status NOT IN ($6, $7, $8)
            RETURNING *
        "#,
    )
    .bind(progress.status)
    .bind(progress.start_count)
    .bind(progress.remains)
    .bind(order_id)
    .bind(expected)
    .bind(OrderStatusType::Completed)
    .bind(OrderStatusType::Canceled)
    .bind(OrderStatusType::Error)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    match &order {
        Some(o) => debug!("🗃️ Order #{order_id} moved from {expected} to {}", o.status),
        None => debug!("🗃️ Order #{order_id} is no longer {expected}. Progress update skipped"),
    }
    Ok(order)
}

/// Takes the database write lock before the order is read. See [`super::deposits::lock_for_update`].
pub async fn lock_for_update(order_id: i64, conn: &mut SqliteConnection) -> Result<bool, PanelDatabaseError> {
    let result = sqlx::query("UPDATE orders SET id = id WHERE id = $1").bind(order_id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn update_status(
    order_id: i64,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Order, PanelDatabaseError> {
    let order: Option<Order> =
        sqlx::query_as("UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(status)
            .bind(order_id)
            .fetch_all(conn)
            .await?
            .into_iter()
            .next();
    order.ok_or(PanelDatabaseError::OrderNotFound(order_id))
}

pub async fn delete_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Order, PanelDatabaseError> {
    let order: Option<Order> = sqlx::query_as("DELETE FROM orders WHERE id = $1 RETURNING *")
        .bind(order_id)
        .fetch_all(conn)
        .await?
        .into_iter()
        .next();
    order.ok_or(PanelDatabaseError::OrderNotFound(order_id))
}
