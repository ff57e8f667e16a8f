//! Staff notifications for new orders and low stock
//!
//! Events go to an e-mail relay webhook as signed JSON. Without a configured
//! webhook the events are only logged.

use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use shared::{Order, StockItem};
use uuid::Uuid;

use crate::config::NotificationConfig;
use crate::error::{AppError, AppResult};

/// Header carrying the base64 HMAC-SHA256 of the request body
pub const SIGNATURE_HEADER: &str = "X-Injera-Signature";

type HmacSha256 = Hmac<Sha256>;

/// Outbound notification channel
#[axum::async_trait]
pub trait Notifier: Send + Sync {
    async fn order_placed(&self, order: &Order) -> AppResult<()>;

    async fn low_stock(&self, stock: &StockItem) -> AppResult<()>;
}

/// Event body posted to the relay
#[derive(Debug, Clone, Serialize)]
pub struct NotificationEvent {
    pub event_id: Uuid,
    pub event: &'static str,
    pub recipient: Option<String>,
    pub subject: String,
    pub occurred_at: DateTime<Utc>,
    pub data: serde_json::Value,
}

impl NotificationEvent {
    pub fn order_placed(order: &Order, recipient: Option<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event: "order_placed",
            recipient,
            subject: format!(
                "New order #{}: {} x {} for {}",
                order.id, order.quantity, order.product, order.customer_name
            ),
            occurred_at: Utc::now(),
            data: serde_json::json!({
                "order_id": order.id,
                "customer_name": order.customer_name,
                "customer_email": order.customer_email,
                "customer_phone": order.customer_phone,
                "business_type": order.business_type,
                "product": order.product,
                "quantity": order.quantity,
                "total_price": order.total_price,
                "message": order.message,
            }),
        }
    }

    pub fn low_stock(stock: &StockItem, recipient: Option<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event: "low_stock",
            recipient,
            subject: format!(
                "Low stock: {} ({} {} left, threshold {})",
                stock.name, stock.quantity, stock.unit, stock.minimum_threshold
            ),
            occurred_at: Utc::now(),
            data: serde_json::json!({
                "stock_id": stock.id,
                "name": stock.name,
                "category": stock.category,
                "quantity": stock.quantity,
                "unit": stock.unit,
                "minimum_threshold": stock.minimum_threshold,
            }),
        }
    }
}

/// Sign a request body with the shared secret
pub fn sign_payload(secret: &str, body: &[u8]) -> AppResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Configuration(format!("Invalid signing secret: {}", e)))?;
    mac.update(body);
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// Posts events to an e-mail relay webhook
#[derive(Clone)]
pub struct WebhookNotifier {
    http_client: reqwest::Client,
    webhook_url: String,
    signing_secret: Option<String>,
    recipient: Option<String>,
}

impl WebhookNotifier {
    pub fn new(
        webhook_url: String,
        signing_secret: Option<String>,
        recipient: Option<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build notification client: {}", e)))?;

        Ok(Self {
            http_client,
            webhook_url,
            signing_secret,
            recipient,
        })
    }

    async fn deliver(&self, event: &NotificationEvent) -> AppResult<()> {
        let body = serde_json::to_vec(event)
            .map_err(|e| AppError::Internal(format!("Failed to encode notification: {}", e)))?;

        let mut request = self
            .http_client
            .post(&self.webhook_url)
            .header("Content-Type", "application/json");
        if let Some(secret) = &self.signing_secret {
            request = request.header(SIGNATURE_HEADER, sign_payload(secret, &body)?);
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to send notification: {}", e)))?;

        if response.status().is_success() {
            tracing::debug!(event_id = %event.event_id, event = event.event, "Notification delivered");
            Ok(())
        } else {
            Err(AppError::Internal(format!(
                "Notification relay answered {}",
                response.status()
            )))
        }
    }
}

#[axum::async_trait]
impl Notifier for WebhookNotifier {
    async fn order_placed(&self, order: &Order) -> AppResult<()> {
        self.deliver(&NotificationEvent::order_placed(order, self.recipient.clone()))
            .await
    }

    async fn low_stock(&self, stock: &StockItem) -> AppResult<()> {
        self.deliver(&NotificationEvent::low_stock(stock, self.recipient.clone()))
            .await
    }
}

/// Writes events to the log only
#[derive(Clone, Default)]
pub struct LogNotifier;

#[axum::async_trait]
impl Notifier for LogNotifier {
    async fn order_placed(&self, order: &Order) -> AppResult<()> {
        tracing::info!(
            order_id = order.id,
            product = %order.product,
            quantity = order.quantity,
            "New order received (no notification webhook configured)"
        );
        Ok(())
    }

    async fn low_stock(&self, stock: &StockItem) -> AppResult<()> {
        tracing::info!(
            stock_id = stock.id,
            name = %stock.name,
            quantity = stock.quantity,
            minimum_threshold = stock.minimum_threshold,
            "Stock fell below threshold (no notification webhook configured)"
        );
        Ok(())
    }
}

/// Gives up on a delivery that takes longer than `limit`.
///
/// Notifications are awaited inside request handlers, so a stalled relay
/// must not hold the response.
pub struct TimeoutNotifier {
    inner: Arc<dyn Notifier>,
    limit: Duration,
}

impl TimeoutNotifier {
    pub fn new(inner: Arc<dyn Notifier>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<F>(&self, event: &str, delivery: F) -> AppResult<()>
    where
        F: std::future::Future<Output = AppResult<()>> + Send,
    {
        tokio::time::timeout(self.limit, delivery).await.map_err(|_| {
            AppError::Internal(format!(
                "{} notification timed out after {} ms",
                event,
                self.limit.as_millis()
            ))
        })?
    }
}

#[axum::async_trait]
impl Notifier for TimeoutNotifier {
    async fn order_placed(&self, order: &Order) -> AppResult<()> {
        self.bounded("order_placed", self.inner.order_placed(order)).await
    }

    async fn low_stock(&self, stock: &StockItem) -> AppResult<()> {
        self.bounded("low_stock", self.inner.low_stock(stock)).await
    }
}

/// Pick the notifier for the configured channel
pub fn notifier_from_config(config: &NotificationConfig) -> AppResult<Arc<dyn Notifier>> {
    let notifier: Arc<dyn Notifier> = match &config.webhook_url {
        Some(url) if !url.trim().is_empty() => Arc::new(WebhookNotifier::new(
            url.clone(),
            config.signing_secret.clone(),
            config.recipient.clone(),
            config.delivery_timeout(),
        )?),
        _ => Arc::new(LogNotifier),
    };
    Ok(notifier)
}
