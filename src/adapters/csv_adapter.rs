//! CSV bar feed.
//!
//! Columns are located by header name, accepting the usual spellings
//! (`Date`/`datetime`/`trade_date`, `Open`/`open_price`, `Vol`, ...).
//! Timestamps may be dates or date-times. Rows with an empty or
//! unparsable field, or with prices that do not form a valid bar, are
//! skipped with a warning; the remaining bars are sorted by time and
//! duplicate timestamps are rejected.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::warn;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::domain::error::SniperError;
use crate::domain::ohlcv::Bar;
use crate::ports::feed_port::FeedPort;

const TIMESTAMP_HEADERS: &[&str] = &[
    "date", "datetime", "timestamp", "time", "trade_date", "tradedate", "日期", "时间", "交易日期",
];
const OPEN_HEADERS: &[&str] = &["open", "open_price", "开盘", "开盘价"];
const HIGH_HEADERS: &[&str] = &["high", "high_price", "最高", "最高价"];
const LOW_HEADERS: &[&str] = &["low", "low_price", "最低", "最低价"];
const CLOSE_HEADERS: &[&str] = &["close", "close_price", "收盘", "收盘价"];
const VOLUME_HEADERS: &[&str] = &["volume", "vol", "成交量"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, SniperError> {
        let find = |names: &[&str], label: &str| {
            headers
                .iter()
                .position(|h| {
                    let h = h.trim().to_lowercase();
                    names.iter().any(|n| *n == h)
                })
                .ok_or_else(|| SniperError::Data {
                    reason: format!(
                        "no {label} column (available: {})",
                        headers.iter().collect::<Vec<_>>().join(", ")
                    ),
                })
        };
        Ok(ColumnMap {
            timestamp: find(TIMESTAMP_HEADERS, "date/time")?,
            open: find(OPEN_HEADERS, "open")?,
            high: find(HIGH_HEADERS, "high")?,
            low: find(LOW_HEADERS, "low")?,
            close: find(CLOSE_HEADERS, "close")?,
            volume: find(VOLUME_HEADERS, "volume")?,
        })
    }

    fn parse(&self, record: &csv::StringRecord) -> Option<Bar> {
        let number = |i: usize| -> Option<f64> {
            let v: f64 = record.get(i)?.trim().parse().ok()?;
            v.is_finite().then_some(v)
        };
        Some(Bar {
            timestamp: parse_timestamp(record.get(self.timestamp)?)?,
            open: number(self.open)?,
            high: number(self.high)?,
            low: number(self.low)?,
            close: number(self.close)?,
            volume: number(self.volume)?,
        })
    }
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Reads, cleans and sorts every bar in a CSV stream.
pub fn load_bars<R: Read>(source_name: &str, reader: R) -> Result<Vec<Bar>, SniperError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| SniperError::Data {
            reason: format!("{source_name}: cannot read header: {e}"),
        })?
        .clone();
    let columns = ColumnMap::from_headers(&headers)?;

    let mut bars = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.records() {
        let record = result.map_err(|e| SniperError::Data {
            reason: format!("{source_name}: CSV parse error: {e}"),
        })?;
        match columns.parse(&record).filter(Bar::is_well_formed) {
            Some(bar) => bars.push(bar),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!("{source_name}: skipped {skipped} rows with missing, invalid or inconsistent fields");
    }
    if bars.is_empty() {
        return Err(SniperError::NoData {
            source_name: source_name.to_string(),
        });
    }

    bars.sort_by_key(|b| b.timestamp);
    if let Some(pair) = bars.windows(2).find(|w| w[0].timestamp == w[1].timestamp) {
        return Err(SniperError::Data {
            reason: format!("{source_name}: duplicate timestamp {}", pair[0].timestamp),
        });
    }
    Ok(bars)
}

pub fn load_bars_from_path(path: &Path) -> Result<Vec<Bar>, SniperError> {
    let file = fs::File::open(path).map_err(|e| SniperError::Data {
        reason: format!("failed to read {}: {e}", path.display()),
    })?;
    load_bars(&path.display().to_string(), file)
}

/// `*.csv` files directly under `dir`, sorted by name.
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>, SniperError> {
    let entries = fs::read_dir(dir).map_err(|e| SniperError::Data {
        reason: format!("failed to read directory {}: {e}", dir.display()),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// A [`FeedPort`] over bars loaded from a CSV file.
pub struct CsvFeed {
    name: String,
    bars: std::vec::IntoIter<Bar>,
}

impl CsvFeed {
    pub fn open(path: &Path) -> Result<Self, SniperError> {
        Ok(CsvFeed {
            name: path.display().to_string(),
            bars: load_bars_from_path(path)?.into_iter(),
        })
    }

    pub fn from_reader<R: Read>(name: &str, reader: R) -> Result<Self, SniperError> {
        Ok(CsvFeed {
            name: name.to_string(),
            bars: load_bars(name, reader)?.into_iter(),
        })
    }
}

impl FeedPort for CsvFeed {
    fn next_bar(&mut self) -> Result<Option<Bar>, SniperError> {
        Ok(self.bars.next())
    }

    fn source_name(&self) -> String {
        self.name.clone()
    }
}
