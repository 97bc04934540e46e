//! Reader for the normalized transaction feed written by the chain fetcher.
//!
//! Expected header: `DateTime,Chain,From,Asset,Amount,Direction,TxHash`
//! (extra columns are ignored).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use csv::StringRecord;
use rust_decimal::Decimal;
use vippulse_core::AppError;
use vippulse_recon::{Asset, Chain, Direction, Feed, Transaction};

const REQUIRED_COLUMNS: [&str; 7] = ["DateTime", "Chain", "From", "Asset", "Amount", "Direction", "TxHash"];

/// Parsed feed plus the number of rows that could not be interpreted.
#[derive(Debug, Clone)]
pub struct FeedLoad {
    pub feed: Feed,
    pub rejected: usize,
}

struct Columns([usize; 7]);

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self, AppError> {
        let mut indices = [0usize; 7];
        for (slot, name) in indices.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
                .ok_or_else(|| AppError::Input(format!("feed is missing column {name}")))?;
        }
        Ok(Self(indices))
    }

    fn field<'r>(&self, record: &'r StringRecord, column: usize) -> &'r str {
        record.get(self.0[column]).unwrap_or("").trim()
    }
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc)))
}

pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    raw.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

fn parse_record(record: &StringRecord, cols: &Columns) -> Result<Transaction, String> {
    let timestamp = parse_timestamp(cols.field(record, 0))
        .ok_or_else(|| format!("bad timestamp {:?}", cols.field(record, 0)))?;
    let chain: Chain = cols.field(record, 1).parse()?;
    let asset: Asset = cols.field(record, 3).parse()?;
    let amount = parse_amount(cols.field(record, 4))
        .ok_or_else(|| format!("bad amount {:?}", cols.field(record, 4)))?;
    let direction: Direction = cols.field(record, 5).parse()?;

    Transaction::new(
        timestamp,
        chain,
        cols.field(record, 2),
        asset,
        amount,
        direction,
        cols.field(record, 6),
    )
    .map_err(|reason| format!("payer address: {reason}"))
}

/// Parse a feed from any reader. `complete` is the fetcher's completeness flag.
pub fn read_feed<R: Read>(reader: R, complete: bool) -> Result<FeedLoad, AppError> {
    let mut csv = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = csv
        .headers()
        .map_err(|e| AppError::Input(format!("failed to read feed header: {e}")))?
        .clone();
    let cols = Columns::locate(&headers)?;

    let mut transactions = Vec::new();
    let mut rejected = 0;
    for (idx, result) in csv.records().enumerate() {
        let parsed = result
            .map_err(|e| e.to_string())
            .and_then(|record| parse_record(&record, &cols));
        match parsed {
            Ok(tx) => transactions.push(tx),
            Err(reason) => {
                rejected += 1;
                tracing::debug!(row = idx + 2, %reason, "Skipped feed row");
            }
        }
    }

    Ok(FeedLoad {
        feed: Feed { transactions, complete },
        rejected,
    })
}

/// Load the feed file at `path`.
pub fn load_feed(path: &Path, complete: bool) -> Result<FeedLoad, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::Input(format!("cannot open feed {}: {e}", path.display())))?;
    let load = read_feed(file, complete)?;
    tracing::info!(
        path = %path.display(),
        transactions = load.feed.transactions.len(),
        rejected = load.rejected,
        "Loaded transaction feed"
    );
    Ok(load)
}
