use crate::build_http_client;
use analysis_core::{AnalysisError, HistoryProvider, Quote};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use reqwest::Client;
use serde::Deserialize;

/// Daily OHLCV history from the Yahoo Finance chart endpoint
#[derive(Clone)]
pub struct YahooChartClient {
    base_url: String,
    client: Client,
}

impl YahooChartClient {
    pub fn new(base_url: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: build_http_client(timeout),
        }
    }

    async fn get_chart(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Quote>, AnalysisError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let period1 = from.and_time(NaiveTime::MIN).and_utc().timestamp();
        // period2 is exclusive; include the whole `to` day
        let period2 = (to + Duration::days(1)).and_time(NaiveTime::MIN).and_utc().timestamp();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AnalysisError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let envelope: ChartEnvelope = response
            .json()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        let chart = envelope
            .chart
            .ok_or_else(|| AnalysisError::InvalidData("chart payload missing".to_string()))?;

        if let Some(err) = chart.error {
            return Err(AnalysisError::ApiError(format!("{}: {}", err.code, err.description)));
        }

        let result = chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| AnalysisError::InsufficientHistory(format!("no chart data for {}", symbol)))?;

        Ok(assemble_quotes(symbol, result))
    }
}

/// Zip the columnar chart payload into quotes, skipping rows with any gap
fn assemble_quotes(symbol: &str, result: ChartResult) -> Vec<Quote> {
    let timestamps = result.timestamp.unwrap_or_default();
    let Some(block) = result.indicators.quote.into_iter().next() else {
        return Vec::new();
    };

    timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            Some(Quote {
                symbol: symbol.to_string(),
                timestamp: DateTime::from_timestamp(ts, 0)?,
                open: (*block.open.get(i)?)?,
                high: (*block.high.get(i)?)?,
                low: (*block.low.get(i)?)?,
                close: (*block.close.get(i)?)?,
                volume: (*block.volume.get(i)?)? as f64,
            })
        })
        .collect()
}

#[async_trait]
impl HistoryProvider for YahooChartClient {
    async fn daily_history(
        &self,
        symbol: &str,
        until: NaiveDate,
        days: u32,
    ) -> Result<Vec<Quote>, AnalysisError> {
        let from = until
            .checked_sub_signed(Duration::days(i64::from(days)))
            .ok_or_else(|| {
                AnalysisError::InvalidConfig(format!("history window of {} days is out of range", days))
            })?;
        let quotes = self.get_chart(symbol, from, until).await?;
        tracing::debug!("Fetched {} daily quotes for {}", quotes.len(), symbol);
        Ok(quotes)
    }

    async fn latest_quote(&self, symbol: &str) -> Result<Quote, AnalysisError> {
        let today = chrono::Utc::now().date_naive();
        self.get_chart(symbol, today - Duration::days(7), today)
            .await?
            .pop()
            .ok_or_else(|| AnalysisError::InsufficientHistory(format!("no recent quote for {}", symbol)))
    }
}

#[derive(Deserialize)]
struct ChartEnvelope {
    chart: Option<ChartNode>,
}

#[derive(Deserialize)]
struct ChartNode {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteBlock>,
}

#[derive(Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, MockServer};
    use serde_json::json;

    #[tokio::test]
    async fn test_out_of_range_history_window_is_rejected() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/v8/finance/chart/ABC");
            then.status(200).json_body(json!({"chart": {"result": [], "error": null}}));
        });

        let client = YahooChartClient::new(server.base_url(), std::time::Duration::from_secs(5));
        let until = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
        let err = client.daily_history("ABC", until, u32::MAX).await.unwrap_err();

        assert!(matches!(err, AnalysisError::InvalidConfig(_)));
        mock.assert_calls(0);
    }

    #[tokio::test]
    async fn test_daily_history_skips_null_rows() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v8/finance/chart/ABC")
                .query_param("interval", "1d");
            then.status(200).json_body(json!({
                "chart": {
                    "result": [{
                        "meta": {"symbol": "ABC"},
                        "timestamp": [1709559000, 1709645400, 1709731800],
                        "indicators": {
                            "quote": [{
                                "open":   [10.0, null, 10.4],
                                "high":   [10.5, 10.6, 10.9],
                                "low":    [9.8, 10.0, 10.2],
                                "close":  [10.2, 10.3, 10.8],
                                "volume": [1000, 1100, 1500]
                            }]
                        }
                    }],
                    "error": null
                }
            }));
        });

        let client = YahooChartClient::new(server.base_url(), std::time::Duration::from_secs(5));
        let until = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
        let quotes = client.daily_history("ABC", until, 30).await.unwrap();

        mock.assert();
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].close, 10.2);
        assert_eq!(quotes[1].volume, 1500.0);
        assert!(quotes[0].timestamp < quotes[1].timestamp);
    }

    #[tokio::test]
    async fn test_chart_error_is_api_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v8/finance/chart/NOPE");
            then.status(200).json_body(json!({
                "chart": {
                    "result": null,
                    "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}
                }
            }));
        });

        let client = YahooChartClient::new(server.base_url(), std::time::Duration::from_secs(5));
        let until = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
        let err = client.daily_history("NOPE", until, 30).await.unwrap_err();

        assert!(matches!(err, AnalysisError::ApiError(_)));
    }
}
