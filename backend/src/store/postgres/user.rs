use chrono::{DateTime, Utc};
use shared::{ListRange, Page, SortSpec, User};
use sqlx::FromRow;

use super::{convert_all, order_by, PgStore, UserRow};
use crate::error::{AppError, AppResult};
use crate::store::{NewUser, UserCredentials, UserStore, USER_SORT_FIELDS};

#[derive(Debug, FromRow)]
struct CredentialsRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

#[axum::async_trait]
impl UserStore for PgStore {
    async fn find_user(&self, id: i64) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn find_credentials(&self, email: &str) -> AppResult<Option<UserCredentials>> {
        let row = sqlx::query_as::<_, CredentialsRow>(concat!(
            "SELECT ",
            user_columns!(),
            ", password_hash FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => Ok(Some(UserCredentials {
                user: User::try_from(row.user)?,
                password_hash: row.password_hash,
            })),
            None => Ok(None),
        }
    }

    async fn insert_user(&self, user: NewUser) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "INSERT INTO users (email, name, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING ",
            user_columns!()
        ))
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.db)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict {
                resource: "email".to_string(),
                message: "A user with this email already exists".to_string(),
            },
            _ => AppError::DatabaseError(e),
        })?;

        User::try_from(row)
    }

    async fn list_users(&self, sort: &SortSpec, range: ListRange) -> AppResult<Page<User>> {
        let total = self.count_users().await?;

        let query = format!(
            "SELECT {} FROM users{} LIMIT $1 OFFSET $2",
            user_columns!(),
            order_by(sort, USER_SORT_FIELDS)
        );
        let rows = sqlx::query_as::<_, UserRow>(&query)
            .bind(range.limit)
            .bind(range.offset)
            .fetch_all(&self.db)
            .await?;

        Ok(Page::new(convert_all(rows)?, total, range.offset))
    }

    async fn count_users(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    async fn record_login(&self, id: i64, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_login_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
