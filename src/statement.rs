//! Broker account statement ingestion.
//!
//! Reads a DEGIRO-style account statement exported as CSV. Columns are taken by
//! position because the export repeats the `Change` and `Balance` headers for
//! the currency and amount halves of each pair.

use crate::core::RawRecord;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sharematch_derive::CsvSchema;
use std::io::Read;
use std::str::FromStr;

/// Column metadata generated by `#[derive(CsvSchema)]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvColumn {
    pub position: usize,
    pub name: &'static str,
    pub required: bool,
    pub description: &'static str,
}

/// One row of the account statement, in column order
#[allow(dead_code)] // ignored columns are still deserialized positionally
#[derive(Debug, Clone, Deserialize, CsvSchema)]
pub struct StatementRow {
    /// Trade date (dd-mm-yyyy)
    #[serde(rename = "Date")]
    pub date: String,
    /// Trade time, ignored
    #[serde(rename = "Time")]
    pub time: Option<String>,
    /// Settlement date, ignored
    #[serde(rename = "Value date")]
    pub value_date: Option<String>,
    /// Asset name
    #[serde(rename = "Product")]
    pub product: String,
    /// Asset identifier; one ISIN per file
    #[serde(rename = "ISIN")]
    pub isin: String,
    /// "Buy 1,000 Company A@..." or "Sell 10 ...". Any other row fails matching
    #[serde(rename = "Description")]
    pub description: String,
    /// Exchange rate, ignored
    #[serde(rename = "FX")]
    pub fx: Option<String>,
    /// Currency of the change amount, expected GBP
    #[serde(rename = "Change")]
    pub change_currency: Option<String>,
    /// Signed GBP change: sells positive, buys negative
    #[serde(rename = "Change amount")]
    pub change_amount: String,
    /// Currency of the running balance, ignored
    #[serde(rename = "Balance")]
    pub balance_currency: Option<String>,
    /// Running balance, ignored
    #[serde(rename = "Balance amount")]
    pub balance_amount: Option<String>,
    /// Source transaction identifier
    #[serde(rename = "Order Id")]
    pub order_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum StatementError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("line {line}: invalid date {value:?}, expected dd-mm-yyyy")]
    InvalidDate { line: u64, value: String },
    #[error("line {line}: invalid amount {value:?}")]
    InvalidAmount { line: u64, value: String },
    #[error("statement mixes assets {first} and {other}; export one product per file")]
    MixedAssets { first: String, other: String },
    #[error("statement contains no transactions")]
    Empty,
}

/// The single asset a statement file covers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct Asset {
    pub name: String,
    pub isin: String,
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "--- {} --- ISIN: {} ---", self.name, self.isin)
    }
}

#[derive(Debug, Clone)]
pub struct Statement {
    pub asset: Asset,
    pub records: Vec<RawRecord>,
}

pub fn read_statement<R: Read>(reader: R, has_headers: bool) -> Result<Statement, StatementError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .from_reader(reader);

    let mut asset: Option<Asset> = None;
    let mut records = Vec::new();

    for result in rdr.records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line());
        let row: StatementRow = record.deserialize(None)?;

        let current = asset.get_or_insert_with(|| Asset {
            name: row.product.clone(),
            isin: row.isin.clone(),
        });
        if current.isin != row.isin {
            return Err(StatementError::MixedAssets {
                first: current.isin.clone(),
                other: row.isin,
            });
        }

        if let Some(currency) = row.change_currency.as_deref() {
            if currency != "GBP" {
                log::warn!("line {}: change in {} is passed through as GBP", line, currency);
            }
        }

        records.push(raw_record(row, line)?);
    }

    let asset = asset.ok_or(StatementError::Empty)?;
    log::debug!("Read {} records for {}", records.len(), asset.name);
    Ok(Statement { asset, records })
}

fn raw_record(row: StatementRow, line: u64) -> Result<RawRecord, StatementError> {
    let date = NaiveDate::parse_from_str(row.date.trim(), "%d-%m-%Y").map_err(|_| {
        StatementError::InvalidDate {
            line,
            value: row.date.clone(),
        }
    })?;
    let amount = Decimal::from_str(row.change_amount.trim()).map_err(|_| {
        StatementError::InvalidAmount {
            line,
            value: row.change_amount.clone(),
        }
    })?;
    let id = row
        .order_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| format!("line {line}"));

    Ok(RawRecord {
        id,
        date,
        description: row.description,
        amount,
    })
}
