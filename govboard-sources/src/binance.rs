//! Binance public klines, used for historical ADA prices.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde_json::Value;

use crate::http::{build_client, decode_json, Result, SourceError};

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";
pub const DEFAULT_SYMBOL: &str = "ADAUSDT";

const SERVICE: &str = "binance";
const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Clone)]
pub struct BinanceClient {
    http: Client,
    base_url: String,
}

impl BinanceClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: build_client(Duration::from_secs(15))?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Close of the UTC daily candle for `date`, or `None` when Binance has
    /// no candle for that day.
    pub async fn daily_close(&self, symbol: &str, date: NaiveDate) -> Result<Option<f64>> {
        let start = day_start_ms(date)?;
        let response = self
            .http
            .get(format!("{}/api/v3/klines", self.base_url))
            .query(&[
                ("symbol", symbol.to_string()),
                ("interval", "1d".to_string()),
                ("startTime", start.to_string()),
                ("endTime", (start + DAY_MS - 1).to_string()),
                ("limit", "1".to_string()),
            ])
            .send()
            .await
            .map_err(SourceError::transport(SERVICE))?;
        let klines: Value = decode_json(SERVICE, response).await?;
        parse_close(&klines)
    }
}

fn day_start_ms(date: NaiveDate) -> Result<i64> {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
        .ok_or_else(|| SourceError::Config(format!("invalid date {date}")))
}

/// Klines are arrays; the close price is element 4, as a decimal string.
pub fn parse_close(klines: &Value) -> Result<Option<f64>> {
    let rows = klines.as_array().ok_or_else(|| decode_error("klines is not an array"))?;
    let Some(first) = rows.first() else {
        return Ok(None);
    };
    let close = first
        .get(4)
        .ok_or_else(|| decode_error("kline has no close field"))?;

    let parsed = match close {
        Value::String(s) => s.parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed
        .map(Some)
        .ok_or_else(|| decode_error(&format!("unparseable close price {close}")))
}

fn decode_error(message: &str) -> SourceError {
    SourceError::Decode {
        service: SERVICE,
        message: message.to_string(),
    }
}
