use super::marc;
use crate::config::UndlConfig;
use crate::domain::SearchResults;
use crate::error::{truncate_body, ApiError, Result, MAX_ERROR_BODY};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use std::time::Duration;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub prompt: String,
    pub search_id: Option<String>,
    pub page_size: Option<u32>,
}

impl SearchParams {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            search_id: None,
            page_size: None,
        }
    }

    pub fn with_search_id(mut self, search_id: Option<String>) -> Self {
        self.search_id = search_id;
        self
    }
}

/// Client for the United Nations Digital Library search API
pub struct UndlClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    page_size: u32,
    verbose: bool,
}

impl UndlClient {
    pub fn new(config: &UndlConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("semun-api/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            page_size: config.page_size,
            verbose: config.verbose,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// First page of results for `prompt`
    pub async fn query(&self, prompt: &str) -> Result<SearchResults> {
        self.query_page(&SearchParams::new(prompt)).await
    }

    #[instrument(skip(self))]
    pub async fn query_page(&self, params: &SearchParams) -> Result<SearchResults> {
        let prompt = params.prompt.trim();
        if prompt.is_empty() {
            return Err(ApiError::InvalidRequest(
                "search prompt must not be empty".to_string(),
            ));
        }

        let page_size = params.page_size.unwrap_or(self.page_size);
        let mut query = vec![
            ("p", prompt.to_string()),
            ("format", "xml".to_string()),
            ("rg", page_size.to_string()),
        ];
        if let Some(search_id) = &params.search_id {
            query.push(("search_id", search_id.clone()));
        }

        let url = format!("{}/search", self.base_url);
        if self.verbose {
            debug!("Querying Digital Library at {} with {:?}", url, query);
        }

        let mut request = self
            .client
            .get(&url)
            .query(&query)
            .header(ACCEPT, "application/xml");
        if let Some(key) = &self.api_key {
            request = request.header(AUTHORIZATION, format!("Token {key}"));
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Undl {
                status: status.as_u16(),
                message: truncate_body(&body, MAX_ERROR_BODY),
            });
        }

        let results = marc::parse_search_response(&body)?;
        if self.verbose {
            info!(
                "Digital Library returned {} of {} records for '{}'",
                results.records.len(),
                results.total,
                prompt
            );
        }
        Ok(results)
    }

    /// The page after `previous`, or `None` once the search is exhausted
    pub async fn next_page(
        &self,
        prompt: &str,
        previous: &SearchResults,
    ) -> Result<Option<SearchResults>> {
        match &previous.search_id {
            Some(search_id) if !previous.records.is_empty() => {
                let params = SearchParams::new(prompt).with_search_id(Some(search_id.clone()));
                self.query_page(&params).await.map(Some)
            }
            _ => Ok(None),
        }
    }
}
