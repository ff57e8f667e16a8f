//! Per-category low-stock thresholds

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    actions, entities, resolve_threshold, validation, DefaultThresholds, NewActivity,
    ResolvedThreshold, StockCategory, StockSetting, ThresholdSource,
};

use crate::error::{AppError, AppResult};
use crate::services::audit::AuditRecorder;
use crate::store::SettingsStore;

/// Threshold for one category as the API reports it
#[derive(Debug, Clone, Serialize)]
pub struct CategoryThreshold {
    pub category: StockCategory,
    pub minimum_threshold: i32,
    pub source: ThresholdSource,
    pub updated_by: Option<i64>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingInput {
    pub minimum_threshold: i32,
}

#[derive(Clone)]
pub struct SettingsService {
    settings: Arc<dyn SettingsStore>,
    defaults: DefaultThresholds,
    recorder: AuditRecorder,
}

impl SettingsService {
    pub fn new(settings: Arc<dyn SettingsStore>, defaults: DefaultThresholds, recorder: AuditRecorder) -> Self {
        Self {
            settings,
            defaults,
            recorder,
        }
    }

    /// Threshold for a new item: explicit value, stored setting, default table, then 0
    pub async fn threshold_for(&self, category: StockCategory, explicit: Option<i32>) -> AppResult<ResolvedThreshold> {
        let stored = match explicit {
            Some(_) => None,
            None => self
                .settings
                .find_setting(category)
                .await?
                .map(|s| s.minimum_threshold),
        };
        Ok(resolve_threshold(category, explicit, stored, &self.defaults))
    }

    /// Every category with its effective threshold
    pub async fn list(&self) -> AppResult<Vec<CategoryThreshold>> {
        let stored = self.settings.list_settings().await?;

        Ok(StockCategory::ALL
            .into_iter()
            .map(|category| {
                let setting = stored.iter().find(|s| s.category == category);
                self.describe(category, setting)
            })
            .collect())
    }

    pub async fn get(&self, category: StockCategory) -> AppResult<CategoryThreshold> {
        let setting = self.settings.find_setting(category).await?;
        Ok(self.describe(category, setting.as_ref()))
    }

    /// Store a threshold for future items of a category; existing items keep theirs
    pub async fn update(
        &self,
        category: StockCategory,
        input: UpdateSettingInput,
        actor: Option<i64>,
    ) -> AppResult<StockSetting> {
        validation::validate_threshold(input.minimum_threshold)
            .map_err(|m| AppError::validation("minimum_threshold", m))?;

        let previous = self.settings.find_setting(category).await?;
        let setting = self
            .settings
            .upsert_setting(category, input.minimum_threshold, actor)
            .await?;

        tracing::info!(
            category = %category,
            minimum_threshold = setting.minimum_threshold,
            "Stock setting updated"
        );

        self.recorder
            .record_activity(
                NewActivity::new(actions::SETTING_UPDATED, entities::STOCK_SETTING, None)
                    .by(actor)
                    .details(serde_json::json!({
                        "category": category,
                        "previous_threshold": previous.map(|p| p.minimum_threshold),
                        "minimum_threshold": setting.minimum_threshold,
                    })),
            )
            .await;

        Ok(setting)
    }

    fn describe(&self, category: StockCategory, setting: Option<&StockSetting>) -> CategoryThreshold {
        let resolved = resolve_threshold(
            category,
            None,
            setting.map(|s| s.minimum_threshold),
            &self.defaults,
        );
        CategoryThreshold {
            category,
            minimum_threshold: resolved.minimum_threshold,
            source: resolved.source,
            updated_by: setting.and_then(|s| s.updated_by),
            updated_at: setting.map(|s| s.updated_at),
        }
    }
}
