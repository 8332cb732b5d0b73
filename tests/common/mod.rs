#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use stockchat::adapters::sqlite_adapter::SqliteAdapter;
use stockchat::domain::portfolio::Position;
use stockchat::domain::quote::{RealtimeQuote, StockInfo};
use stockchat::domain::series::{IndicatorRow, KlineBar, SeriesKind};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(0, 0, 0).unwrap()
}

pub fn empty_database() -> SqliteAdapter {
    let adapter = SqliteAdapter::in_memory().unwrap();
    adapter.initialize_schema().unwrap();
    adapter
}

pub fn make_bar(ts_code: &str, time: NaiveDateTime, close: f64) -> KlineBar {
    KlineBar {
        ts_code: ts_code.to_string(),
        time,
        open: close - 1.0,
        high: close + 2.0,
        low: close - 2.0,
        close,
        volume: 10_000,
    }
}

/// `count` consecutive daily bars starting 2024-01-01 with closes
/// `base, base+1, ...`. January only; keep `count` under 31.
pub fn generate_daily_bars(ts_code: &str, count: u32, base: f64) -> Vec<KlineBar> {
    (0..count)
        .map(|i| make_bar(ts_code, midnight(2024, 1, 1 + i), base + i as f64))
        .collect()
}

pub fn generate_indicator_rows(count: u32) -> Vec<IndicatorRow> {
    (0..count)
        .map(|i| IndicatorRow {
            trade_date: date(2024, 1, 1 + i),
            macd: 0.1 + i as f64 * 0.01,
            macd_signal: 0.05,
            macd_hist: 0.02,
            ema_12: 100.0 + i as f64,
            ema_26: 99.0 + i as f64,
            rsi_6: 55.0,
            rsi_12: 52.0,
            rsi_24: 50.0,
        })
        .collect()
}

/// Database seeded with the fixtures most tests share: 复旦微电 (688385.SH)
/// with 20 daily bars and indicator rows, a realtime quote, one position and
/// a cash balance for user 1.
pub fn seeded_database() -> SqliteAdapter {
    let adapter = empty_database();

    adapter
        .upsert_stock(&StockInfo {
            ts_code: "688385.SH".to_string(),
            name: "复旦微电".to_string(),
        })
        .unwrap();
    adapter
        .insert_bars(
            SeriesKind::Daily,
            &generate_daily_bars("688385.SH", 20, 100.0),
        )
        .unwrap();
    adapter
        .insert_indicators("688385.SH", &generate_indicator_rows(20))
        .unwrap();
    adapter
        .upsert_quote(&RealtimeQuote {
            ts_code: "688385.SH".to_string(),
            stock_name: Some("复旦微电".to_string()),
            price: Some(119.0),
            change: Some(1.5),
            change_percent: Some(1.28),
            open: Some(118.0),
            pre_close: Some(117.5),
            high: Some(120.0),
            low: Some(117.0),
            updated_at: Some("2024-01-20 15:00:05".to_string()),
            ..Default::default()
        })
        .unwrap();
    adapter
        .upsert_position(
            1,
            &Position {
                stock_code: "688385.SH".to_string(),
                stock_name: "复旦微电".to_string(),
                quantity: 100,
                cost_price: 95.0,
                current_price: Some(119.0),
                profit_loss: Some(2400.0),
                profit_loss_pct: Some(25.26),
            },
        )
        .unwrap();
    adapter.set_cash_balance(1, 50_000.0).unwrap();

    adapter
}
