//! CSV bar importer for seeding the database from provider exports.
//!
//! Expected columns: `time,open,high,low,close,volume` with a header row.
//! Daily and weekly files carry `%Y-%m-%d` dates, minute files carry
//! `%Y-%m-%d %H:%M:%S` timestamps.

use crate::domain::error::StockchatError;
use crate::domain::series::{KlineBar, SeriesKind};
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::Path;

pub struct CsvImportAdapter {
    kind: SeriesKind,
}

impl CsvImportAdapter {
    pub fn new(kind: SeriesKind) -> Self {
        Self { kind }
    }

    fn parse_time(&self, raw: &str) -> Result<NaiveDateTime, String> {
        match self.kind {
            SeriesKind::Minute => NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .map_err(|e| format!("invalid timestamp {raw:?}: {e}")),
            SeriesKind::Daily | SeriesKind::Weekly => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(|d| d.and_hms_opt(0, 0, 0).unwrap())
                .map_err(|e| format!("invalid date {raw:?}: {e}")),
        }
    }

    pub fn read_bars<P: AsRef<Path>>(
        &self,
        path: P,
        ts_code: &str,
    ) -> Result<Vec<KlineBar>, StockchatError> {
        let path = path.as_ref();
        let import_err = |reason: String| StockchatError::Import {
            file: path.display().to_string(),
            reason,
        };

        let content = fs::read_to_string(path)
            .map_err(|e| import_err(format!("failed to read file: {e}")))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| import_err(format!("CSV parse error: {e}")))?;

            let field = |idx: usize, name: &str| {
                record
                    .get(idx)
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| import_err(format!("missing {name} column")))
            };

            let time = self.parse_time(field(0, "time")?).map_err(import_err)?;
            let open: f64 = field(1, "open")?
                .parse()
                .map_err(|e| import_err(format!("invalid open value: {e}")))?;
            let high: f64 = field(2, "high")?
                .parse()
                .map_err(|e| import_err(format!("invalid high value: {e}")))?;
            let low: f64 = field(3, "low")?
                .parse()
                .map_err(|e| import_err(format!("invalid low value: {e}")))?;
            let close: f64 = field(4, "close")?
                .parse()
                .map_err(|e| import_err(format!("invalid close value: {e}")))?;
            let volume: i64 = field(5, "volume")?
                .parse()
                .map_err(|e| import_err(format!("invalid volume value: {e}")))?;

            bars.push(KlineBar {
                ts_code: ts_code.to_string(),
                time,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        bars.sort_by_key(|b| b.time);
        Ok(bars)
    }
}
