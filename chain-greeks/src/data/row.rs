//! Fixed-position rows of the historical option-chain CSV files.
//!
//! Columns consumed (0-indexed):
//! - 1 underlying spot price
//! - 5 option type (`call` / `put`)
//! - 6 expiration date (`MM/DD/YYYY`)
//! - 7 quote date (`MM/DD/YYYY`)
//! - 8 strike
//! - 10 bid, 11 ask
//!
//! All other columns are carried through untouched as raw bytes; only the
//! consumed columns need to be UTF-8.

use csv::ByteRecord;

use crate::calendar::{days_between, CivilDate};
use crate::error::{BatchError, BatchResult};

use super::types::OptionType;

pub const SPOT_COLUMN: usize = 1;
pub const OPTION_TYPE_COLUMN: usize = 5;
pub const EXPIRATION_COLUMN: usize = 6;
pub const QUOTE_DATE_COLUMN: usize = 7;
pub const STRIKE_COLUMN: usize = 8;
pub const BID_COLUMN: usize = 10;
pub const ASK_COLUMN: usize = 11;

/// Fewest columns a data row can have.
pub const MIN_COLUMNS: usize = ASK_COLUMN + 1;

/// One quote parsed from a data row.
#[derive(Debug, Clone)]
pub struct OptionRow {
    pub spot: f64,
    pub option_type: OptionType,
    pub expiration: CivilDate,
    pub quote_date: CivilDate,
    pub strike: f64,
    pub bid: f64,
    pub ask: f64,

    /// Original fields, for pass-through output.
    pub record: ByteRecord,
}

impl OptionRow {
    /// Parse a data row.
    ///
    /// Fails on missing columns, unparseable numbers or dates, and any option
    /// type other than `call` or `put`. Consumed columns that are not valid
    /// UTF-8 count as unparseable.
    pub fn from_record(record: ByteRecord) -> BatchResult<Self> {
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.len() < MIN_COLUMNS {
            return Err(BatchError::parse(format!(
                "line {}: expected at least {} columns, found {}",
                line,
                MIN_COLUMNS,
                record.len()
            )));
        }

        let spot = number(&record, SPOT_COLUMN, line)?;
        let strike = number(&record, STRIKE_COLUMN, line)?;
        let quote_date = date(&record, QUOTE_DATE_COLUMN, line)?;
        let expiration = date(&record, EXPIRATION_COLUMN, line)?;
        let bid = number(&record, BID_COLUMN, line)?;
        let ask = number(&record, ASK_COLUMN, line)?;

        let raw_type = text(&record, OPTION_TYPE_COLUMN, line)?;
        let option_type =
            OptionType::parse(raw_type).ok_or_else(|| BatchError::UnknownOptionType {
                line,
                value: raw_type.to_string(),
            })?;

        Ok(Self {
            spot,
            option_type,
            expiration,
            quote_date,
            strike,
            bid,
            ask,
            record,
        })
    }

    /// Mid of the bid/ask quote.
    pub fn market_price(&self) -> f64 {
        0.5 * (self.bid + self.ask)
    }

    /// Calendar days from the quote date to expiration.
    pub fn days_to_expiry(&self) -> i64 {
        days_between(&self.quote_date, &self.expiration)
    }
}

fn text(record: &ByteRecord, column: usize, line: u64) -> BatchResult<&str> {
    std::str::from_utf8(&record[column]).map_err(|_| {
        BatchError::parse(format!("line {}: column {} is not valid UTF-8", line, column))
    })
}

fn number(record: &ByteRecord, column: usize, line: u64) -> BatchResult<f64> {
    let raw = text(record, column, line)?;
    raw.trim().parse::<f64>().map_err(|_| {
        BatchError::parse(format!(
            "line {}: column {} is not a number: [{}]",
            line, column, raw
        ))
    })
}

fn date(record: &ByteRecord, column: usize, line: u64) -> BatchResult<CivilDate> {
    CivilDate::parse(text(record, column, line)?).map_err(|e| match e {
        BatchError::Parse(msg) => {
            BatchError::parse(format!("line {}: column {}: {}", line, column, msg))
        }
        other => other,
    })
}
