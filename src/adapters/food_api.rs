use crate::domain::model::{Product, SearchResponse};
use crate::domain::ports::FoodLookup;
use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://world.openfoodfacts.org/cgi/search.pl";
pub const DEFAULT_USER_AGENT: &str = concat!("sugar-log/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct FoodApiSettings {
    pub endpoint: String,
    pub timeout: Duration,
    pub page_size: usize,
    pub user_agent: String,
    /// 失敗後額外重試的次數，只針對可重試的錯誤
    pub retry_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for FoodApiSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(10),
            page_size: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry_attempts: 1,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Open Food Facts 搜尋 API 用戶端，由呼叫端建立後注入
#[derive(Debug, Clone)]
pub struct OpenFoodFactsClient {
    client: Client,
    settings: FoodApiSettings,
}

impl OpenFoodFactsClient {
    pub fn new(settings: FoodApiSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.timeout)
            .build()?;
        Ok(Self { client, settings })
    }

    pub fn endpoint(&self) -> &str {
        &self.settings.endpoint
    }

    async fn fetch(&self, query: &str) -> Result<SearchResponse> {
        let page_size = self.settings.page_size.to_string();
        let response = self
            .client
            .get(&self.settings.endpoint)
            .query(&[
                ("search_simple", "1"),
                ("search_terms", query),
                ("action", "process"),
                ("json", "1"),
                ("page_size", page_size.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Food API response status: {}", status);

        if !status.is_success() {
            let message = status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string();
            return Err(AppError::ApiStatusError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl FoodLookup for OpenFoodFactsClient {
    async fn search(&self, query: &str) -> Result<Vec<Product>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!("Searching food API at {} for '{}'", self.settings.endpoint, query);

        let mut attempt = 0;
        let body = loop {
            match self.fetch(query).await {
                Ok(body) => break body,
                Err(e) if e.is_retryable() && attempt < self.settings.retry_attempts => {
                    attempt += 1;
                    tracing::warn!(
                        "⚠️ Food API request for '{}' failed ({}), retry {}/{}",
                        query,
                        e,
                        attempt,
                        self.settings.retry_attempts
                    );
                    tokio::time::sleep(self.settings.retry_delay).await;
                }
                Err(e) => {
                    tracing::warn!("⚠️ Food API request for '{}' failed: {}", query, e);
                    return Err(e);
                }
            }
        };
        tracing::debug!(
            "Food API matched {} products (returned {})",
            body.count,
            body.products.len()
        );

        Ok(body
            .products
            .into_iter()
            .filter(|p| !p.product_name.trim().is_empty())
            .collect())
    }
}
