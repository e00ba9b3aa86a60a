//! `govboard price`: historical daily close from Binance.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use govboard_sources::binance::DEFAULT_SYMBOL;
use govboard_sources::BinanceClient;
use serde_json::json;

#[derive(Parser, Debug)]
pub struct PriceArgs {
    /// UTC day, YYYY-MM-DD
    #[arg(long)]
    pub date: NaiveDate,

    #[arg(long, default_value = DEFAULT_SYMBOL)]
    pub symbol: String,
}

pub async fn run_price(args: PriceArgs) -> Result<()> {
    let symbol = args.symbol.to_ascii_uppercase();
    let client = BinanceClient::new().context("Failed to build Binance client")?;
    let close = client
        .daily_close(&symbol, args.date)
        .await
        .with_context(|| format!("Failed to fetch {symbol} for {}", args.date))?;

    let Some(close) = close else {
        bail!("no {symbol} candle for {}", args.date);
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "symbol": symbol,
            "date": args.date,
            "close": close,
        }))?
    );
    Ok(())
}
