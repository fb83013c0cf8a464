use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use signal_core::{DailySeriesSource, FetchError, HistoricalCandle};
use std::time::Duration;

const BASE_URL: &str = "https://www.alphavantage.co/query";

/// Alpha Vantage daily-series client. The free tier allows 5 requests per
/// minute; quota spacing is the batch downloader's responsibility, this
/// client only classifies the responses.
#[derive(Clone)]
pub struct AlphaVantageClient {
    api_key: String,
    client: Client,
}

impl AlphaVantageClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { api_key, client }
    }
}

#[async_trait]
impl DailySeriesSource for AlphaVantageClient {
    async fn fetch_daily(&self, ticker: &str) -> Result<Vec<HistoricalCandle>, FetchError> {
        let response = self
            .client
            .get(BASE_URL)
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", ticker),
                ("outputsize", "full"),
                ("apikey", &self.api_key),
            ])
            .send()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Http(format!("HTTP {}", response.status())));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| FetchError::MalformedPayload(e.to_string()))?;

        parse_daily_series(&payload)
    }
}

/// Classify and map an Alpha Vantage daily payload. Quota responses come
/// back HTTP 200 with a "Note"/"Information" field instead of data.
fn parse_daily_series(payload: &serde_json::Value) -> Result<Vec<HistoricalCandle>, FetchError> {
    if payload.get("Note").is_some() || payload.get("Information").is_some() {
        return Err(FetchError::QuotaExceeded);
    }

    let series = payload
        .get("Time Series (Daily)")
        .and_then(|v| v.as_object())
        .ok_or(FetchError::Empty)?;

    let mut candles = Vec::with_capacity(series.len());
    for (date, fields) in series {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| FetchError::MalformedPayload(format!("bad date {}: {}", date, e)))?;

        candles.push(HistoricalCandle {
            date,
            open: field(fields, "1. open")?,
            high: field(fields, "2. high")?,
            low: field(fields, "3. low")?,
            close: field(fields, "4. close")?,
            volume: field(fields, "5. volume")?,
        });
    }

    if candles.is_empty() {
        return Err(FetchError::Empty);
    }

    candles.sort_by_key(|c| c.date);
    Ok(candles)
}

fn field(fields: &serde_json::Value, key: &str) -> Result<f64, FetchError> {
    fields
        .get(key)
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| FetchError::MalformedPayload(format!("missing field {}", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quota_note_detected() {
        let payload = json!({
            "Note": "Thank you for using Alpha Vantage! Our standard API rate limit is 5 requests per minute."
        });
        assert!(matches!(
            parse_daily_series(&payload),
            Err(FetchError::QuotaExceeded)
        ));
    }

    #[test]
    fn test_missing_series_is_empty() {
        let payload = json!({ "Meta Data": {} });
        assert!(matches!(parse_daily_series(&payload), Err(FetchError::Empty)));
    }

    #[test]
    fn test_parse_and_sort_ascending() {
        let payload = json!({
            "Time Series (Daily)": {
                "2026-08-06": {
                    "1. open": "101.0", "2. high": "103.0", "3. low": "100.0",
                    "4. close": "102.0", "5. volume": "1200000"
                },
                "2026-08-05": {
                    "1. open": "99.0", "2. high": "101.5", "3. low": "98.0",
                    "4. close": "101.0", "5. volume": "900000"
                }
            }
        });

        let candles = parse_daily_series(&payload).unwrap();
        assert_eq!(candles.len(), 2);
        assert!(candles[0].date < candles[1].date);
        assert_eq!(candles[0].close, 101.0);
        assert_eq!(candles[1].volume, 1_200_000.0);
    }

    #[test]
    fn test_malformed_field_rejected() {
        let payload = json!({
            "Time Series (Daily)": {
                "2026-08-06": { "1. open": "oops" }
            }
        });
        assert!(matches!(
            parse_daily_series(&payload),
            Err(FetchError::MalformedPayload(_))
        ));
    }
}
