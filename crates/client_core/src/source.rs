//! Menu backends: a latency-simulating mock and the live HTTP API.

use std::{
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Response};
use shared::{
    domain::{MenuEntry, OrderId},
    error::ApiError,
    protocol::{OrderRequest, OrderResult},
};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    config::ClientSettings,
    error::{ClientError, Result},
};

pub const MOCK_LIST_LATENCY: Duration = Duration::from_millis(500);
pub const MOCK_SUBMIT_LATENCY: Duration = Duration::from_millis(800);

#[async_trait]
pub trait MenuDataSource: Send + Sync {
    async fn list_menus(&self) -> Result<Vec<MenuEntry>>;
    async fn submit_order(&self, request: &OrderRequest) -> Result<OrderResult>;
}

/// Picks the backend named by `settings.use_mock`.
pub fn menu_source_from_settings(settings: &ClientSettings) -> Result<Arc<dyn MenuDataSource>> {
    if settings.use_mock {
        info!("using mock menu backend");
        return Ok(Arc::new(MockMenuSource::default()));
    }
    info!(base_url = %settings.api_base_url, "using live menu backend");
    Ok(Arc::new(HttpMenuSource::new(
        &settings.api_base_url,
        settings.request_timeout(),
    )?))
}

pub fn mock_catalog() -> Vec<MenuEntry> {
    vec![
        MenuEntry::new("1", "espresso"),
        MenuEntry::new("2", "matcha latte"),
        MenuEntry::new("3", "vanilla latte"),
    ]
}

pub fn order_confirmation(items: &[String]) -> String {
    format!("Order placed: {}", items.join(", "))
}

pub struct MockMenuSource {
    list_latency: Duration,
    submit_latency: Duration,
    last_order_millis: AtomicI64,
}

impl Default for MockMenuSource {
    fn default() -> Self {
        Self::with_latency(MOCK_LIST_LATENCY, MOCK_SUBMIT_LATENCY)
    }
}

impl MockMenuSource {
    pub fn with_latency(list_latency: Duration, submit_latency: Duration) -> Self {
        Self {
            list_latency,
            submit_latency,
            last_order_millis: AtomicI64::new(0),
        }
    }

    /// `ORD-<unix millis>`, bumped past the previous id when two orders land in
    /// the same millisecond.
    fn next_order_id(&self) -> OrderId {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last_order_millis
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        OrderId::new(format!("ORD-{}", now.max(previous + 1)))
    }
}

#[async_trait]
impl MenuDataSource for MockMenuSource {
    async fn list_menus(&self) -> Result<Vec<MenuEntry>> {
        tokio::time::sleep(self.list_latency).await;
        Ok(mock_catalog())
    }

    async fn submit_order(&self, request: &OrderRequest) -> Result<OrderResult> {
        if request.is_empty() {
            return Err(ClientError::empty_selection());
        }
        tokio::time::sleep(self.submit_latency).await;
        let order_id = self.next_order_id();
        debug!(%order_id, items = request.items.len(), "mock order accepted");
        Ok(OrderResult {
            success: true,
            order_id,
            message: order_confirmation(&request.items),
        })
    }
}

pub struct HttpMenuSource {
    http: Client,
    base_url: Url,
}

impl HttpMenuSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| ClientError::Config(format!("invalid api base url '{base_url}': {e}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::Config(format!("invalid endpoint '{path}': {e}")))
    }
}

async fn failure_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiError>(&body) {
        Ok(api_error) => api_error.message,
        Err(_) => format!("request failed with status {status}"),
    }
}

#[async_trait]
impl MenuDataSource for HttpMenuSource {
    async fn list_menus(&self) -> Result<Vec<MenuEntry>> {
        let url = self.endpoint("menus")?;
        debug!(%url, "fetching menus");
        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::Fetch(e.to_string()))?;
        if !res.status().is_success() {
            let message = failure_message(res).await;
            warn!(%message, "menu listing rejected");
            return Err(ClientError::Fetch(message));
        }
        res.json()
            .await
            .map_err(|e| ClientError::Fetch(format!("invalid menu payload: {e}")))
    }

    async fn submit_order(&self, request: &OrderRequest) -> Result<OrderResult> {
        if request.is_empty() {
            return Err(ClientError::empty_selection());
        }
        let url = self.endpoint("orders")?;
        let res = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| ClientError::Submit(e.to_string()))?;
        if !res.status().is_success() {
            let message = failure_message(res).await;
            warn!(%message, "order rejected");
            return Err(ClientError::Submit(message));
        }
        let result: OrderResult = res
            .json()
            .await
            .map_err(|e| ClientError::Submit(format!("invalid order payload: {e}")))?;
        if !result.success {
            return Err(ClientError::Submit(result.message));
        }
        Ok(result)
    }
}

#[cfg(test)]
#[path = "tests/source_tests.rs"]
mod tests;
