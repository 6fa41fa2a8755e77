//! Remote catalog client.

use std::future::Future;

use reqwest::StatusCode;
use tracing::debug;

use crate::catalog::{ShowDetail, ShowSummary};
use crate::config::SourceConfig;
use crate::error::CatalogError;

/// Where shows come from. The HTTP implementation is the only production
/// one; tests substitute in-memory sources.
pub trait CatalogSource: Send + Sync + 'static {
    /// Flat show index, in source order.
    fn fetch_catalog(
        &self,
    ) -> impl Future<Output = Result<Vec<ShowSummary>, CatalogError>> + Send;

    /// Detail record for a single show.
    fn fetch_detail(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<ShowDetail, CatalogError>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(config: &SourceConfig) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, CatalogError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?;
        Ok(response)
    }
}

impl CatalogSource for HttpSource {
    async fn fetch_catalog(&self) -> Result<Vec<ShowSummary>, CatalogError> {
        let url = format!("{}/", self.base_url);
        let response = self.get(&url).await?;

        if !response.status().is_success() {
            return Err(CatalogError::Network(format!(
                "catalog returned status: {}",
                response.status()
            )));
        }

        // Read the body first so transport failures and malformed JSON are
        // reported as different kinds.
        let body = response.bytes().await?;
        let summaries: Vec<ShowSummary> = serde_json::from_slice(&body)?;
        Ok(summaries)
    }

    async fn fetch_detail(&self, id: &str) -> Result<ShowDetail, CatalogError> {
        let url = format!("{}/id/{}", self.base_url, id);
        let response = self.get(&url).await?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(CatalogError::NotFound(id.to_string())),
            status => {
                return Err(CatalogError::Network(format!(
                    "detail for {} returned status: {}",
                    id, status
                )))
            }
        }

        let body = response.bytes().await?;
        let detail: ShowDetail = serde_json::from_slice(&body)?;
        Ok(detail)
    }
}
