use rust_decimal::Decimal;
use shared::{Order, OrderStats, OrderStatus, Page, StatusCount};
use sqlx::{types::Json, FromRow, Postgres, QueryBuilder};

use super::{convert_all, like_pattern, order_by, parse_column, OrderRow, PgStore};
use crate::error::AppResult;
use crate::store::{NewOrder, OrderChanges, OrderQuery, OrderStore, ORDER_SORT_FIELDS};

#[derive(Debug, FromRow)]
struct StatusCountRow {
    status: String,
    count: i64,
}

#[derive(Debug, FromRow)]
struct OrderTotalsRow {
    total_orders: i64,
    total_revenue: Decimal,
    unpriced_orders: i64,
}

fn push_order_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &OrderQuery) {
    qb.push(" WHERE TRUE");
    if let Some(status) = query.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(product) = &query.product {
        qb.push(" AND product = ").push_bind(product.clone());
    }
    if let Some(search) = &query.search {
        let pattern = like_pattern(search);
        qb.push(" AND (customer_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR customer_email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[axum::async_trait]
impl OrderStore for PgStore {
    async fn insert_order(&self, order: NewOrder) -> AppResult<Order> {
        let row = sqlx::query_as::<_, OrderRow>(concat!(
            r#"
            INSERT INTO orders (
                customer_name, customer_email, customer_phone, business_type, product,
                quantity, status, total_price, message, status_history
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $8, $9)
            RETURNING "#,
            order_columns!()
        ))
        .bind(&order.customer_name)
        .bind(&order.customer_email)
        .bind(&order.customer_phone)
        .bind(order.business_type.as_str())
        .bind(&order.product)
        .bind(order.quantity)
        .bind(order.total_price)
        .bind(&order.message)
        .bind(Json(vec![order.initial_history]))
        .fetch_one(&self.db)
        .await?;

        Order::try_from(row)
    }

    async fn find_order(&self, id: i64) -> AppResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(Order::try_from).transpose()
    }

    async fn list_orders(&self, query: &OrderQuery) -> AppResult<Page<Order>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders");
        push_order_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.db).await?;

        let mut select =
            QueryBuilder::<Postgres>::new(concat!("SELECT ", order_columns!(), " FROM orders"));
        push_order_filters(&mut select, query);
        select.push(order_by(&query.sort, ORDER_SORT_FIELDS));
        select
            .push(" LIMIT ")
            .push_bind(query.range.limit)
            .push(" OFFSET ")
            .push_bind(query.range.offset);

        let rows: Vec<OrderRow> = select.build_query_as().fetch_all(&self.db).await?;
        Ok(Page::new(convert_all(rows)?, total, query.range.offset))
    }

    async fn update_order(&self, id: i64, changes: OrderChanges) -> AppResult<Option<Order>> {
        let history = changes.history_entry.map(|entry| Json(vec![entry]));

        let row = sqlx::query_as::<_, OrderRow>(concat!(
            r#"
            UPDATE orders SET
                status = COALESCE($2, status),
                notes = COALESCE($3, notes),
                total_price = COALESCE($4, total_price),
                status_history = status_history || COALESCE($5, '[]'::jsonb),
                updated_by = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING "#,
            order_columns!()
        ))
        .bind(id)
        .bind(changes.status.map(|s| s.as_str()))
        .bind(&changes.notes)
        .bind(changes.total_price)
        .bind(history)
        .bind(changes.updated_by)
        .fetch_optional(&self.db)
        .await?;

        row.map(Order::try_from).transpose()
    }

    async fn delete_order(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn order_stats(&self) -> AppResult<OrderStats> {
        let totals = sqlx::query_as::<_, OrderTotalsRow>(
            r#"
            SELECT COUNT(*) AS total_orders,
                   COALESCE(SUM(total_price) FILTER (WHERE status <> 'cancelled'), 0) AS total_revenue,
                   COUNT(*) FILTER (WHERE total_price IS NULL) AS unpriced_orders
            FROM orders
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, StatusCountRow>(
            "SELECT status, COUNT(*) AS count FROM orders GROUP BY status",
        )
        .fetch_all(&self.db)
        .await?;

        let mut by_status = rows
            .into_iter()
            .map(|row| {
                Ok(StatusCount {
                    status: parse_column::<OrderStatus>(&row.status)?,
                    count: row.count,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;
        by_status.sort_by_key(|c| c.status);

        Ok(OrderStats {
            total_orders: totals.total_orders,
            by_status,
            total_revenue: totals.total_revenue,
            unpriced_orders: totals.unpriced_orders,
        })
    }
}
