use shared::{ActivityLog, ListRange, NewActivity, NewStockTransaction, Page, StockTransaction};
use sqlx::{Postgres, QueryBuilder};

use super::{convert_all, order_by, ActivityRow, PgStore, TransactionRow};
use crate::error::{AppError, AppResult};
use crate::store::{ActivityQuery, AuditStore, ACTIVITY_SORT_FIELDS};

const TRANSACTION_COLUMNS: &str = "id, stock_id, type, quantity_change, quantity_before, \
     quantity_after, performed_by, reason, created_at";

fn push_activity_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &ActivityQuery) {
    qb.push(" WHERE TRUE");
    if let Some(action_type) = &query.action_type {
        qb.push(" AND action_type = ").push_bind(action_type.clone());
    }
    if let Some(entity_type) = &query.entity_type {
        qb.push(" AND entity_type = ").push_bind(entity_type.clone());
    }
    if let Some(entity_id) = query.entity_id {
        qb.push(" AND entity_id = ").push_bind(entity_id);
    }
    if let Some(user_id) = query.user_id {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
}

#[axum::async_trait]
impl AuditStore for PgStore {
    async fn insert_transaction(&self, tx: NewStockTransaction) -> AppResult<StockTransaction> {
        let query = format!(
            "INSERT INTO stock_transactions \
             (stock_id, type, quantity_change, quantity_before, quantity_after, performed_by, reason) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            TRANSACTION_COLUMNS
        );
        let row = sqlx::query_as::<_, TransactionRow>(&query)
            .bind(tx.stock_id)
            .bind(tx.transaction_type.as_str())
            .bind(tx.quantity_change)
            .bind(tx.quantity_before)
            .bind(tx.quantity_after)
            .bind(tx.performed_by)
            .bind(&tx.reason)
            .fetch_one(&self.db)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    AppError::not_found("Stock", tx.stock_id)
                }
                _ => AppError::DatabaseError(e),
            })?;

        StockTransaction::try_from(row)
    }

    async fn list_transactions(
        &self,
        stock_id: i64,
        range: ListRange,
    ) -> AppResult<Page<StockTransaction>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM stock_transactions WHERE stock_id = $1")
                .bind(stock_id)
                .fetch_one(&self.db)
                .await?;

        let query = format!(
            "SELECT {} FROM stock_transactions WHERE stock_id = $1 \
             ORDER BY id DESC LIMIT $2 OFFSET $3",
            TRANSACTION_COLUMNS
        );
        let rows = sqlx::query_as::<_, TransactionRow>(&query)
            .bind(stock_id)
            .bind(range.limit)
            .bind(range.offset)
            .fetch_all(&self.db)
            .await?;

        Ok(Page::new(convert_all(rows)?, total, range.offset))
    }

    async fn insert_activity(&self, entry: NewActivity) -> AppResult<ActivityLog> {
        let row = sqlx::query_as::<_, ActivityRow>(
            r#"
            INSERT INTO activity_logs (user_id, action_type, entity_type, entity_id, details)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, action_type, entity_type, entity_id, details, created_at
            "#,
        )
        .bind(entry.user_id)
        .bind(&entry.action_type)
        .bind(&entry.entity_type)
        .bind(entry.entity_id)
        .bind(&entry.details)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    async fn list_activity(&self, query: &ActivityQuery) -> AppResult<Page<ActivityLog>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM activity_logs");
        push_activity_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.db).await?;

        let mut select = QueryBuilder::<Postgres>::new(
            "SELECT id, user_id, action_type, entity_type, entity_id, details, created_at \
             FROM activity_logs",
        );
        push_activity_filters(&mut select, query);
        select.push(order_by(&query.sort, ACTIVITY_SORT_FIELDS));
        select
            .push(" LIMIT ")
            .push_bind(query.range.limit)
            .push(" OFFSET ")
            .push_bind(query.range.offset);

        let rows: Vec<ActivityRow> = select.build_query_as().fetch_all(&self.db).await?;
        Ok(Page::new(
            rows.into_iter().map(ActivityLog::from).collect(),
            total,
            query.range.offset,
        ))
    }
}
