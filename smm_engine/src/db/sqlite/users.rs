use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db::traits::PanelDatabaseError,
    db_types::{NewUser, User, UserStatus},
};

pub async fn insert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<User, PanelDatabaseError> {
    let user: User = sqlx::query_as("INSERT INTO users (username, role) VALUES ($1, $2) RETURNING *")
        .bind(user.username)
        .bind(user.role)
        .fetch_all(conn)
        .await?
        .into_iter()
        .next()
        .ok_or(sqlx::Error::RowNotFound)?;
    debug!("🗃️ Created user #{} ({}) with role {}", user.id, user.username, user.role);
    Ok(user)
}

pub async fn fetch_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<User>, PanelDatabaseError> {
    let user = sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(user_id).fetch_optional(conn).await?;
    Ok(user)
}

pub async fn update_user_status(
    user_id: i64,
    status: UserStatus,
    conn: &mut SqliteConnection,
) -> Result<User, PanelDatabaseError> {
    let user: Option<User> =
        sqlx::query_as("UPDATE users SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(status)
            .bind(user_id)
            .fetch_all(conn)
            .await?
            .into_iter()
            .next();
    user.ok_or(PanelDatabaseError::UserNotFound(user_id))
}
