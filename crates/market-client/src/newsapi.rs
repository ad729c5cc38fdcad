use crate::{build_http_client, transport_error, truncate_summary};
use analysis_core::{NewsArticle, NewsConfig, NewsSource, NewsSourceError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

const PAGE_SIZE: u32 = 20;
const MAX_ARTICLES: usize = 15;

/// Primary news source backed by the NewsAPI `/v2/everything` endpoint.
///
/// Without a credential the source reports `Unavailable` on every call and
/// never touches the network.
#[derive(Clone)]
pub struct NewsApiSource {
    api_key: Option<String>,
    base_url: String,
    client: Client,
}

impl NewsApiSource {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>, config: &NewsConfig) -> Self {
        Self {
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: build_http_client(config.source_timeout()),
        }
    }

    pub fn from_config(config: &NewsConfig) -> Self {
        Self::new(config.newsapi_key.clone(), config.newsapi_base_url.clone(), config)
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    fn classify_failure(status: StatusCode, code: &str, detail: &str) -> NewsSourceError {
        if status == StatusCode::TOO_MANY_REQUESTS || code == "rateLimited" {
            NewsSourceError::RateLimited(format!("NewsAPI quota exhausted ({})", status))
        } else if status == StatusCode::UNAUTHORIZED
            || status == StatusCode::FORBIDDEN
            || code.starts_with("apiKey")
        {
            NewsSourceError::Unavailable(format!("NewsAPI rejected credential ({}: {})", status, code))
        } else {
            NewsSourceError::Network(format!("NewsAPI HTTP {}: {}", status, detail))
        }
    }
}

#[async_trait]
impl NewsSource for NewsApiSource {
    fn name(&self) -> &str {
        "NewsAPI"
    }

    async fn fetch(
        &self,
        symbol: &str,
        since: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<NewsArticle>, NewsSourceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| NewsSourceError::Unavailable("NEWSAPI_KEY not configured".to_string()))?;

        let url = format!("{}/v2/everything", self.base_url);
        let from = since.format("%Y-%m-%d").to_string();
        let to = until.format("%Y-%m-%d").to_string();
        let page_size = PAGE_SIZE.to_string();

        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", api_key)
            .query(&[
                ("q", symbol),
                ("from", from.as_str()),
                ("to", to.as_str()),
                ("language", "en"),
                ("sortBy", "relevancy"),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let code = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.code)
                .unwrap_or_default();
            return Err(Self::classify_failure(status, &code, &body));
        }

        let payload: EverythingResponse = response
            .json()
            .await
            .map_err(|e| NewsSourceError::Network(format!("invalid NewsAPI payload: {}", e)))?;

        if payload.status != "ok" {
            let code = payload.code.unwrap_or_default();
            return Err(Self::classify_failure(status, &code, &payload.status));
        }

        let articles: Vec<NewsArticle> = payload
            .articles
            .into_iter()
            .filter_map(|raw| {
                let title = raw.title.filter(|t| !t.trim().is_empty() && t != "[Removed]")?;
                let published = DateTime::parse_from_rfc3339(raw.published_at.as_deref()?)
                    .ok()?
                    .with_timezone(&Utc);
                let publisher = raw
                    .source
                    .and_then(|s| s.name)
                    .unwrap_or_else(|| "NewsAPI".to_string());
                Some(NewsArticle::new(
                    publisher,
                    title,
                    truncate_summary(raw.description.as_deref()),
                    published,
                    raw.url.unwrap_or_default(),
                ))
            })
            .take(MAX_ARTICLES)
            .collect();

        if articles.is_empty() {
            return Err(NewsSourceError::EmptyResult);
        }

        tracing::debug!("NewsAPI returned {} articles for {}", articles.len(), symbol);
        Ok(articles)
    }
}

#[derive(Debug, Deserialize)]
struct EverythingResponse {
    status: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArticle {
    source: Option<RawSource>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    code: Option<String>,
}
