//! Pull adapter: paginated range queries against the remote file.

use anyhow::{Context, Result};

use crate::protocol::{HistoryRequest, HistoryResponse};

/// Trait for history backends
#[async_trait::async_trait]
pub trait HistoryFetcher: Send + Sync {
    /// Run one paginated query.
    async fn fetch(&self, req: &HistoryRequest) -> Result<HistoryResponse>;
}

/// Queries the viewer server's history endpoint over HTTP.
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
    alias: String,
}

impl HttpFetcher {
    pub fn new(base_url: &str, alias: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            alias: alias.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/history/{}", self.base_url, self.alias)
    }
}

#[async_trait::async_trait]
impl HistoryFetcher for HttpFetcher {
    async fn fetch(&self, req: &HistoryRequest) -> Result<HistoryResponse> {
        let response = self
            .client
            .get(self.endpoint())
            .query(&req.query_params())
            .send()
            .await
            .context("history request failed")?
            .error_for_status()
            .context("history endpoint rejected the request")?;

        response
            .json::<HistoryResponse>()
            .await
            .context("malformed history response")
    }
}

/// Fetch the alias → path map of tracked logs, once at startup.
pub async fn fetch_aliases(base_url: &str) -> Result<Vec<String>> {
    let url = format!("{}/aliases", base_url.trim_end_matches('/'));
    let map: std::collections::BTreeMap<String, String> = reqwest::get(&url)
        .await
        .context("alias request failed")?
        .error_for_status()
        .context("alias endpoint rejected the request")?
        .json()
        .await
        .context("malformed alias response")?;
    Ok(map.into_keys().collect())
}
