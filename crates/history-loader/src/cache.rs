use anyhow::Result;
use chrono::Utc;
use signal_core::HistoricalCandle;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// SQLite-backed candle store, one row per ticker. Writes are whole-record
/// replacements, so a record is either fully updated or left as it was.
#[derive(Clone)]
pub struct CandleCache {
    pool: SqlitePool,
}

impl CandleCache {
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let cache = Self { pool };
        cache.init_schema().await?;

        Ok(cache)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS candle_series (
                ticker TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Replace the full series for a ticker
    pub async fn put(&self, ticker: &str, candles: &[HistoricalCandle]) -> Result<()> {
        let data = serde_json::to_string(candles)?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO candle_series (ticker, data, updated_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(ticker)
        .bind(data)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, ticker: &str) -> Result<Option<Vec<HistoricalCandle>>> {
        let row: Option<String> =
            sqlx::query_scalar("SELECT data FROM candle_series WHERE ticker = ?")
                .bind(ticker)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    /// Number of candles stored for one ticker
    pub async fn series_len(&self, ticker: &str) -> Result<usize> {
        Ok(self.get(ticker).await?.map(|c| c.len()).unwrap_or(0))
    }

    /// Number of tickers cached
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM candle_series")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Drop every cached series
    pub async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM candle_series")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    async fn setup_cache() -> CandleCache {
        CandleCache::new("sqlite::memory:").await.unwrap()
    }

    fn make_candles(n: usize) -> Vec<HistoricalCandle> {
        (0..n)
            .map(|i| HistoricalCandle {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64),
                open: 100.0 + i as f64,
                high: 101.0 + i as f64,
                low: 99.0 + i as f64,
                close: 100.5 + i as f64,
                volume: 1_000_000.0,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let cache = setup_cache().await;
        let candles = make_candles(3);

        cache.put("NVDA", &candles).await.unwrap();
        let loaded = cache.get("NVDA").await.unwrap().unwrap();
        assert_eq!(loaded, candles);

        assert!(cache.get("AMD").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_not_appends() {
        let cache = setup_cache().await;

        cache.put("NVDA", &make_candles(3)).await.unwrap();
        cache.put("NVDA", &make_candles(5)).await.unwrap();

        assert_eq!(cache.count().await.unwrap(), 1);
        assert_eq!(cache.series_len("NVDA").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_count_and_clear() {
        let cache = setup_cache().await;
        cache.put("NVDA", &make_candles(2)).await.unwrap();
        cache.put("AMD", &make_candles(2)).await.unwrap();
        assert_eq!(cache.count().await.unwrap(), 2);

        cache.clear().await.unwrap();
        assert_eq!(cache.count().await.unwrap(), 0);
        assert_eq!(cache.series_len("NVDA").await.unwrap(), 0);
    }
}
