//! Stock queries, including the conditional quantity update

use shared::{CategoryStats, Page, StockCategory, StockItem, StockStats};
use sqlx::{FromRow, Postgres, QueryBuilder};

use super::{convert_all, like_pattern, order_by, parse_column, PgStore, StockRow};
use crate::error::AppResult;
use crate::store::{
    NewStock, StockChanges, StockQuery, StockStore, UpdatedStock, STOCK_SORT_FIELDS,
};

#[derive(Debug, FromRow)]
struct UpdatedStockRow {
    #[sqlx(flatten)]
    stock: StockRow,
    previous_quantity: i32,
}

#[derive(Debug, FromRow)]
struct StockTotalsRow {
    total_items: i64,
    active_items: i64,
    low_stock_count: i64,
    total_quantity: i64,
    total_value: rust_decimal::Decimal,
}

#[derive(Debug, FromRow)]
struct CategoryRow {
    category: String,
    items: i64,
    quantity: i64,
    low_stock_count: i64,
}

fn push_stock_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &StockQuery) {
    qb.push(" WHERE TRUE");
    if let Some(category) = query.category {
        qb.push(" AND category = ").push_bind(category.as_str());
    }
    if let Some(is_active) = query.is_active {
        qb.push(" AND is_active = ").push_bind(is_active);
    }
    if let Some(is_low_stock) = query.is_low_stock {
        qb.push(" AND is_low_stock = ").push_bind(is_low_stock);
    }
    if let Some(search) = &query.search {
        let pattern = like_pattern(search);
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[axum::async_trait]
impl StockStore for PgStore {
    async fn find_stock(&self, id: i64) -> AppResult<Option<StockItem>> {
        let row = sqlx::query_as::<_, StockRow>(concat!(
            "SELECT ",
            stock_columns!(),
            " FROM stocks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(StockItem::try_from).transpose()
    }

    async fn find_stock_by_name(&self, name: &str) -> AppResult<Option<StockItem>> {
        let row = sqlx::query_as::<_, StockRow>(concat!(
            "SELECT ",
            stock_columns!(),
            " FROM stocks WHERE name = $1 ORDER BY is_active DESC, id ASC LIMIT 1"
        ))
        .bind(name)
        .fetch_optional(&self.db)
        .await?;

        row.map(StockItem::try_from).transpose()
    }

    async fn list_stocks(&self, query: &StockQuery) -> AppResult<Page<StockItem>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM stocks");
        push_stock_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.db).await?;

        let mut select = QueryBuilder::<Postgres>::new(concat!("SELECT ", stock_columns!(), " FROM stocks"));
        push_stock_filters(&mut select, query);
        select.push(order_by(&query.sort, STOCK_SORT_FIELDS));
        select
            .push(" LIMIT ")
            .push_bind(query.range.limit)
            .push(" OFFSET ")
            .push_bind(query.range.offset);

        let rows: Vec<StockRow> = select.build_query_as().fetch_all(&self.db).await?;
        Ok(Page::new(convert_all(rows)?, total, query.range.offset))
    }

    async fn insert_stock(&self, stock: NewStock) -> AppResult<StockItem> {
        let row = sqlx::query_as::<_, StockRow>(concat!(
            r#"
            INSERT INTO stocks (
                name, description, quantity, unit, price, category, is_active, minimum_threshold,
                last_restocked_by, last_restocked_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8,
                    CASE WHEN $3 > 0 THEN $9::BIGINT END,
                    CASE WHEN $3 > 0 THEN NOW() END)
            RETURNING "#,
            stock_columns!()
        ))
        .bind(&stock.name)
        .bind(&stock.description)
        .bind(stock.quantity)
        .bind(&stock.unit)
        .bind(stock.price)
        .bind(stock.category.as_str())
        .bind(stock.is_active)
        .bind(stock.minimum_threshold)
        .bind(stock.created_by)
        .fetch_one(&self.db)
        .await?;

        StockItem::try_from(row)
    }

    async fn update_stock(&self, id: i64, changes: StockChanges) -> AppResult<Option<UpdatedStock>> {
        // The CTE locks the row so previous_quantity is the value this update replaced.
        let row = sqlx::query_as::<_, UpdatedStockRow>(
            r#"
            WITH previous AS (
                SELECT id, quantity FROM stocks WHERE id = $1 FOR UPDATE
            )
            UPDATE stocks s SET
                name = COALESCE($2, s.name),
                description = COALESCE($3, s.description),
                quantity = COALESCE($4, s.quantity),
                unit = COALESCE($5, s.unit),
                price = COALESCE($6, s.price),
                category = COALESCE($7, s.category),
                is_active = COALESCE($8, s.is_active),
                minimum_threshold = COALESCE($9, s.minimum_threshold),
                updated_at = NOW()
            FROM previous
            WHERE s.id = previous.id
            RETURNING s.id, s.name, s.description, s.quantity, s.unit, s.price, s.category,
                      s.is_active, s.minimum_threshold, s.is_low_stock, s.last_restocked_by,
                      s.last_restocked_at, s.created_at, s.updated_at,
                      previous.quantity AS previous_quantity
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(changes.quantity)
        .bind(&changes.unit)
        .bind(changes.price)
        .bind(changes.category.map(|c| c.as_str()))
        .bind(changes.is_active)
        .bind(changes.minimum_threshold)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => Ok(Some(UpdatedStock {
                stock: StockItem::try_from(row.stock)?,
                previous_quantity: row.previous_quantity,
            })),
            None => Ok(None),
        }
    }

    async fn adjust_quantity(
        &self,
        id: i64,
        adjustment: i32,
        actor: Option<i64>,
    ) -> AppResult<Option<StockItem>> {
        let row = sqlx::query_as::<_, StockRow>(concat!(
            r#"
            UPDATE stocks SET
                quantity = quantity + $2,
                updated_at = NOW(),
                last_restocked_at = CASE WHEN $2 > 0 THEN NOW() ELSE last_restocked_at END,
                last_restocked_by = CASE WHEN $2 > 0 THEN $3 ELSE last_restocked_by END
            WHERE id = $1 AND quantity + $2 >= 0
            RETURNING "#,
            stock_columns!()
        ))
        .bind(id)
        .bind(adjustment)
        .bind(actor)
        .fetch_optional(&self.db)
        .await?;

        row.map(StockItem::try_from).transpose()
    }

    async fn deactivate_stock(&self, id: i64) -> AppResult<Option<StockItem>> {
        let row = sqlx::query_as::<_, StockRow>(concat!(
            "UPDATE stocks SET is_active = FALSE, updated_at = NOW() WHERE id = $1 RETURNING ",
            stock_columns!()
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(StockItem::try_from).transpose()
    }

    async fn low_stock_items(&self) -> AppResult<Vec<StockItem>> {
        let rows = sqlx::query_as::<_, StockRow>(concat!(
            "SELECT ",
            stock_columns!(),
            " FROM stocks WHERE is_active AND is_low_stock ORDER BY quantity ASC, id ASC"
        ))
        .fetch_all(&self.db)
        .await?;

        convert_all(rows)
    }

    async fn stock_stats(&self) -> AppResult<StockStats> {
        let totals = sqlx::query_as::<_, StockTotalsRow>(
            r#"
            SELECT COUNT(*) AS total_items,
                   COUNT(*) FILTER (WHERE is_active) AS active_items,
                   COUNT(*) FILTER (WHERE is_active AND is_low_stock) AS low_stock_count,
                   COALESCE(SUM(quantity) FILTER (WHERE is_active), 0)::BIGINT AS total_quantity,
                   COALESCE(SUM(price * quantity) FILTER (WHERE is_active), 0) AS total_value
            FROM stocks
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, CategoryRow>(
            r#"
            SELECT category,
                   COUNT(*) AS items,
                   COALESCE(SUM(quantity), 0)::BIGINT AS quantity,
                   COUNT(*) FILTER (WHERE is_low_stock) AS low_stock_count
            FROM stocks
            WHERE is_active
            GROUP BY category
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let mut by_category = rows
            .into_iter()
            .map(|row| {
                Ok(CategoryStats {
                    category: parse_column::<StockCategory>(&row.category)?,
                    items: row.items,
                    quantity: row.quantity,
                    low_stock_count: row.low_stock_count,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;
        by_category.sort_by_key(|c| c.category);

        Ok(StockStats {
            total_items: totals.total_items,
            active_items: totals.active_items,
            low_stock_count: totals.low_stock_count,
            total_quantity: totals.total_quantity,
            total_value: totals.total_value,
            by_category,
        })
    }
}
