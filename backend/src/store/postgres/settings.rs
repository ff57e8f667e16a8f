use shared::{StockCategory, StockSetting};

use super::{convert_all, PgStore, SettingRow};
use crate::error::AppResult;
use crate::store::SettingsStore;

#[axum::async_trait]
impl SettingsStore for PgStore {
    async fn find_setting(&self, category: StockCategory) -> AppResult<Option<StockSetting>> {
        let row = sqlx::query_as::<_, SettingRow>(
            "SELECT category, minimum_threshold, updated_by, updated_at \
             FROM stock_settings WHERE category = $1",
        )
        .bind(category.as_str())
        .fetch_optional(&self.db)
        .await?;

        row.map(StockSetting::try_from).transpose()
    }

    async fn list_settings(&self) -> AppResult<Vec<StockSetting>> {
        let rows = sqlx::query_as::<_, SettingRow>(
            "SELECT category, minimum_threshold, updated_by, updated_at FROM stock_settings",
        )
        .fetch_all(&self.db)
        .await?;

        let mut settings: Vec<StockSetting> = convert_all(rows)?;
        settings.sort_by_key(|s| s.category);
        Ok(settings)
    }

    async fn upsert_setting(
        &self,
        category: StockCategory,
        minimum_threshold: i32,
        updated_by: Option<i64>,
    ) -> AppResult<StockSetting> {
        let row = sqlx::query_as::<_, SettingRow>(
            r#"
            INSERT INTO stock_settings (category, minimum_threshold, updated_by, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (category) DO UPDATE SET
                minimum_threshold = EXCLUDED.minimum_threshold,
                updated_by = EXCLUDED.updated_by,
                updated_at = NOW()
            RETURNING category, minimum_threshold, updated_by, updated_at
            "#,
        )
        .bind(category.as_str())
        .bind(minimum_threshold)
        .bind(updated_by)
        .fetch_one(&self.db)
        .await?;

        StockSetting::try_from(row)
    }
}
