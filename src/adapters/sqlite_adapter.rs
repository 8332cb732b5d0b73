//! SQLite adapter backing the market-data and portfolio ports.
//!
//! Schema mirrors the product database: one table per series granularity,
//! one indicator table, the realtime snapshot table written by the refresh
//! job, and the per-user position/cash tables. Window queries select the
//! newest `window` rows and re-order oldest-first for display.

use crate::domain::error::StockchatError;
use crate::domain::portfolio::{PortfolioSummary, Position};
use crate::domain::quote::{RealtimeQuote, StockInfo};
use crate::domain::series::{IndicatorRow, KlineBar, SeriesKind};
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::portfolio_port::PortfolioPort;
use chrono::{NaiveDate, NaiveDateTime};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

fn pool_err(e: r2d2::Error) -> StockchatError {
    StockchatError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> StockchatError {
    StockchatError::DatabaseQuery {
        reason: e.to_string(),
    }
}

/// Canonicalize a bare numeric code the way the product does: six digits are
/// A-shares (`6xxxxx` Shanghai, otherwise Shenzhen), five or fewer digits are
/// zero-padded Hong Kong listings. Codes already carrying an exchange suffix
/// pass through uppercased; anything else is treated as a stock name.
pub fn normalize_stock_code(query: &str) -> Option<String> {
    let trimmed = query.trim();
    if trimmed.contains('.') {
        return Some(trimmed.to_uppercase());
    }
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    match trimmed.len() {
        6 => {
            if trimmed.starts_with('6') {
                Some(format!("{trimmed}.SH"))
            } else {
                Some(format!("{trimmed}.SZ"))
            }
        }
        len if len <= 5 => Some(format!("{:0>5}.HK", trimmed)),
        _ => Some(format!("{trimmed}.SZ")),
    }
}

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, StockchatError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| StockchatError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_err)?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, StockchatError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_err)?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StockchatError> {
        self.pool.get().map_err(pool_err)
    }

    pub fn initialize_schema(&self) -> Result<(), StockchatError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS stocks (
                    ts_code TEXT PRIMARY KEY,
                    name TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS stock_daily (
                    ts_code TEXT NOT NULL,
                    trade_date TEXT NOT NULL,
                    open REAL, high REAL, low REAL, close REAL,
                    volume INTEGER,
                    UNIQUE(ts_code, trade_date)
                );
                CREATE TABLE IF NOT EXISTS stock_weekly (
                    ts_code TEXT NOT NULL,
                    trade_date TEXT NOT NULL,
                    open REAL, high REAL, low REAL, close REAL,
                    volume INTEGER,
                    UNIQUE(ts_code, trade_date)
                );
                CREATE TABLE IF NOT EXISTS stock_minute (
                    ts_code TEXT NOT NULL,
                    trade_time TEXT NOT NULL,
                    open REAL, high REAL, low REAL, close REAL,
                    volume INTEGER,
                    UNIQUE(ts_code, trade_time)
                );
                CREATE TABLE IF NOT EXISTS stock_indicators (
                    ts_code TEXT NOT NULL,
                    trade_date TEXT NOT NULL,
                    macd REAL, macd_signal REAL, macd_hist REAL,
                    ema_12 REAL, ema_26 REAL,
                    rsi_6 REAL, rsi_12 REAL, rsi_24 REAL,
                    UNIQUE(ts_code, trade_date)
                );
                CREATE TABLE IF NOT EXISTS stock_realtime (
                    ts_code TEXT PRIMARY KEY,
                    stock_name TEXT,
                    price REAL, change REAL, change_percent REAL,
                    open REAL, pre_close REAL, high REAL, low REAL,
                    amplitude REAL,
                    volume REAL, amount REAL, turnover_ratio REAL,
                    total_mv REAL, circ_mv REAL,
                    pe REAL, pe_ttm REAL, pb REAL, dv_ratio REAL,
                    trade_date TEXT,
                    updated_at TEXT
                );
                CREATE TABLE IF NOT EXISTS positions (
                    user_id INTEGER NOT NULL,
                    stock_code TEXT NOT NULL,
                    stock_name TEXT,
                    quantity INTEGER NOT NULL,
                    cost_price REAL NOT NULL,
                    current_price REAL,
                    profit_loss REAL,
                    profit_loss_pct REAL,
                    UNIQUE(user_id, stock_code)
                );
                CREATE TABLE IF NOT EXISTS cash_balance (
                    user_id INTEGER PRIMARY KEY,
                    balance REAL NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_stock_daily_code ON stock_daily(ts_code);
                CREATE INDEX IF NOT EXISTS idx_stock_weekly_code ON stock_weekly(ts_code);
                CREATE INDEX IF NOT EXISTS idx_stock_minute_code ON stock_minute(ts_code);
                CREATE INDEX IF NOT EXISTS idx_stock_indicators_code ON stock_indicators(ts_code);",
            )
            .map_err(query_err)
    }

    pub fn upsert_stock(&self, info: &StockInfo) -> Result<(), StockchatError> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO stocks (ts_code, name) VALUES (?1, ?2)",
                params![info.ts_code, info.name],
            )
            .map_err(query_err)?;
        Ok(())
    }

    pub fn insert_bars(&self, kind: SeriesKind, bars: &[KlineBar]) -> Result<(), StockchatError> {
        let (table, time_col) = table_for(kind);
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        {
            let sql = format!(
                "INSERT OR REPLACE INTO {table}
                 (ts_code, {time_col}, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
            );
            let mut stmt = tx.prepare(&sql).map_err(query_err)?;
            for bar in bars {
                stmt.execute(params![
                    bar.ts_code,
                    time_string(kind, bar.time),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume
                ])
                .map_err(query_err)?;
            }
        }
        tx.commit().map_err(query_err)
    }

    pub fn insert_indicators(
        &self,
        ts_code: &str,
        rows: &[IndicatorRow],
    ) -> Result<(), StockchatError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR REPLACE INTO stock_indicators
                     (ts_code, trade_date, macd, macd_signal, macd_hist,
                      ema_12, ema_26, rsi_6, rsi_12, rsi_24)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                )
                .map_err(query_err)?;
            for row in rows {
                stmt.execute(params![
                    ts_code,
                    row.trade_date.format("%Y-%m-%d").to_string(),
                    row.macd,
                    row.macd_signal,
                    row.macd_hist,
                    row.ema_12,
                    row.ema_26,
                    row.rsi_6,
                    row.rsi_12,
                    row.rsi_24
                ])
                .map_err(query_err)?;
            }
        }
        tx.commit().map_err(query_err)
    }

    pub fn upsert_quote(&self, quote: &RealtimeQuote) -> Result<(), StockchatError> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO stock_realtime
                 (ts_code, stock_name, price, change, change_percent, open, pre_close,
                  high, low, amplitude, volume, amount, turnover_ratio,
                  total_mv, circ_mv, pe, pe_ttm, pb, dv_ratio, trade_date, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                         ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)",
                params![
                    quote.ts_code,
                    quote.stock_name,
                    quote.price,
                    quote.change,
                    quote.change_percent,
                    quote.open,
                    quote.pre_close,
                    quote.high,
                    quote.low,
                    quote.amplitude,
                    quote.volume,
                    quote.amount,
                    quote.turnover_ratio,
                    quote.total_mv,
                    quote.circ_mv,
                    quote.pe,
                    quote.pe_ttm,
                    quote.pb,
                    quote.dv_ratio,
                    quote.trade_date,
                    quote.updated_at
                ],
            )
            .map_err(query_err)?;
        Ok(())
    }

    pub fn upsert_position(&self, user_id: i64, pos: &Position) -> Result<(), StockchatError> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO positions
                 (user_id, stock_code, stock_name, quantity, cost_price,
                  current_price, profit_loss, profit_loss_pct)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    user_id,
                    pos.stock_code,
                    pos.stock_name,
                    pos.quantity,
                    pos.cost_price,
                    pos.current_price,
                    pos.profit_loss,
                    pos.profit_loss_pct
                ],
            )
            .map_err(query_err)?;
        Ok(())
    }

    pub fn set_cash_balance(&self, user_id: i64, balance: f64) -> Result<(), StockchatError> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO cash_balance (user_id, balance) VALUES (?1, ?2)",
                params![user_id, balance],
            )
            .map_err(query_err)?;
        Ok(())
    }
}

fn table_for(kind: SeriesKind) -> (&'static str, &'static str) {
    match kind {
        SeriesKind::Daily => ("stock_daily", "trade_date"),
        SeriesKind::Weekly => ("stock_weekly", "trade_date"),
        SeriesKind::Minute => ("stock_minute", "trade_time"),
    }
}

fn time_string(kind: SeriesKind, time: NaiveDateTime) -> String {
    match kind {
        SeriesKind::Minute => time.format("%Y-%m-%d %H:%M:%S").to_string(),
        SeriesKind::Daily | SeriesKind::Weekly => time.format("%Y-%m-%d").to_string(),
    }
}

fn parse_time(kind: SeriesKind, raw: &str) -> Result<NaiveDateTime, rusqlite::Error> {
    let parsed = match kind {
        SeriesKind::Minute => NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"),
        SeriesKind::Daily | SeriesKind::Weekly => {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d").map(|d| d.and_hms_opt(0, 0, 0).unwrap())
        }
    };
    parsed.map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            raw.len(),
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}

impl MarketDataPort for SqliteAdapter {
    fn fetch_kline(
        &self,
        ts_code: &str,
        kind: SeriesKind,
        window: usize,
    ) -> Result<Vec<KlineBar>, StockchatError> {
        let (table, time_col) = table_for(kind);
        let conn = self.conn()?;

        let sql = format!(
            "SELECT ts_code, {time_col}, open, high, low, close, volume
             FROM {table}
             WHERE ts_code = ?1
             ORDER BY {time_col} DESC
             LIMIT ?2"
        );
        let mut stmt = conn.prepare(&sql).map_err(query_err)?;
        let rows = stmt
            .query_map(params![ts_code, window as i64], |row| {
                let raw_time: String = row.get(1)?;
                Ok(KlineBar {
                    ts_code: row.get(0)?,
                    time: parse_time(kind, &raw_time)?,
                    open: row.get(2)?,
                    high: row.get(3)?,
                    low: row.get(4)?,
                    close: row.get(5)?,
                    volume: row.get(6)?,
                })
            })
            .map_err(query_err)?;

        let mut bars = Vec::new();
        for row in rows {
            bars.push(row.map_err(query_err)?);
        }
        // Newest-first from the query; display order is oldest-first.
        bars.reverse();
        Ok(bars)
    }

    fn fetch_indicators(
        &self,
        ts_code: &str,
        window: usize,
    ) -> Result<Vec<IndicatorRow>, StockchatError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT trade_date, macd, macd_signal, macd_hist,
                        ema_12, ema_26, rsi_6, rsi_12, rsi_24
                 FROM stock_indicators
                 WHERE ts_code = ?1
                 ORDER BY trade_date DESC
                 LIMIT ?2",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![ts_code, window as i64], |row| {
                let raw_date: String = row.get(0)?;
                let trade_date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d").map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        raw_date.len(),
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                // Nullable columns coalesce to zero, matching the renderers.
                Ok(IndicatorRow {
                    trade_date,
                    macd: row.get::<_, Option<f64>>(1)?.unwrap_or(0.0),
                    macd_signal: row.get::<_, Option<f64>>(2)?.unwrap_or(0.0),
                    macd_hist: row.get::<_, Option<f64>>(3)?.unwrap_or(0.0),
                    ema_12: row.get::<_, Option<f64>>(4)?.unwrap_or(0.0),
                    ema_26: row.get::<_, Option<f64>>(5)?.unwrap_or(0.0),
                    rsi_6: row.get::<_, Option<f64>>(6)?.unwrap_or(0.0),
                    rsi_12: row.get::<_, Option<f64>>(7)?.unwrap_or(0.0),
                    rsi_24: row.get::<_, Option<f64>>(8)?.unwrap_or(0.0),
                })
            })
            .map_err(query_err)?;

        let mut indicators = Vec::new();
        for row in rows {
            indicators.push(row.map_err(query_err)?);
        }
        indicators.reverse();
        Ok(indicators)
    }

    fn lookup_stock(&self, query: &str) -> Result<Option<StockInfo>, StockchatError> {
        let conn = self.conn()?;

        let (sql, key) = match normalize_stock_code(query) {
            Some(ts_code) => ("SELECT ts_code, name FROM stocks WHERE ts_code = ?1", ts_code),
            None => (
                "SELECT ts_code, name FROM stocks WHERE name = ?1",
                query.trim().to_string(),
            ),
        };

        let mut stmt = conn.prepare(sql).map_err(query_err)?;
        let mut rows = stmt
            .query_map(params![key], |row| {
                Ok(StockInfo {
                    ts_code: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .map_err(query_err)?;

        match rows.next() {
            Some(row) => Ok(Some(row.map_err(query_err)?)),
            None => Ok(None),
        }
    }

    fn fetch_quote(&self, ts_code: &str) -> Result<Option<RealtimeQuote>, StockchatError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT ts_code, stock_name, price, change, change_percent, open, pre_close,
                        high, low, amplitude, volume, amount, turnover_ratio,
                        total_mv, circ_mv, pe, pe_ttm, pb, dv_ratio, trade_date, updated_at
                 FROM stock_realtime WHERE ts_code = ?1",
            )
            .map_err(query_err)?;
        let mut rows = stmt
            .query_map(params![ts_code], |row| {
                Ok(RealtimeQuote {
                    ts_code: row.get(0)?,
                    stock_name: row.get(1)?,
                    price: row.get(2)?,
                    change: row.get(3)?,
                    change_percent: row.get(4)?,
                    open: row.get(5)?,
                    pre_close: row.get(6)?,
                    high: row.get(7)?,
                    low: row.get(8)?,
                    amplitude: row.get(9)?,
                    volume: row.get(10)?,
                    amount: row.get(11)?,
                    turnover_ratio: row.get(12)?,
                    total_mv: row.get(13)?,
                    circ_mv: row.get(14)?,
                    pe: row.get(15)?,
                    pe_ttm: row.get(16)?,
                    pb: row.get(17)?,
                    dv_ratio: row.get(18)?,
                    trade_date: row.get(19)?,
                    updated_at: row.get(20)?,
                })
            })
            .map_err(query_err)?;

        match rows.next() {
            Some(row) => Ok(Some(row.map_err(query_err)?)),
            None => Ok(None),
        }
    }
}

impl PortfolioPort for SqliteAdapter {
    fn portfolio_summary(&self, user_id: i64) -> Result<PortfolioSummary, StockchatError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT stock_code, stock_name, quantity, cost_price,
                        current_price, profit_loss, profit_loss_pct
                 FROM positions WHERE user_id = ?1 ORDER BY stock_code",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok(Position {
                    stock_code: row.get(0)?,
                    stock_name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    quantity: row.get(2)?,
                    cost_price: row.get(3)?,
                    current_price: row.get(4)?,
                    profit_loss: row.get(5)?,
                    profit_loss_pct: row.get(6)?,
                })
            })
            .map_err(query_err)?;

        let mut positions = Vec::new();
        for row in rows {
            positions.push(row.map_err(query_err)?);
        }

        drop(stmt);
        drop(conn);

        let cash = self.cash_balance(user_id)?;
        Ok(PortfolioSummary::new(positions, cash))
    }

    fn cash_balance(&self, user_id: i64) -> Result<f64, StockchatError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT balance FROM cash_balance WHERE user_id = ?1")
            .map_err(query_err)?;
        let mut rows = stmt
            .query_map(params![user_id], |row| row.get::<_, f64>(0))
            .map_err(query_err)?;

        match rows.next() {
            Some(row) => row.map_err(query_err),
            None => Ok(0.0),
        }
    }
}
