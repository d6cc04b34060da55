pub mod pools;
pub mod report;
pub mod schema;
pub mod validate;

use crate::core::{
    match_records, Lot, MatchError, MatchEvent, MatchReport, PoolHistoryEntry, Section104Holding,
    TaxYear, Totals,
};
use crate::statement::{self, Asset, Statement};
use anyhow::Context;
use schemars::JsonSchema;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

/// Statement files and how to read them, shared by every subcommand
#[derive(clap::Args, Debug)]
pub struct StatementArgs {
    /// Account statement CSV files, one asset per file ("-" for stdin)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Statements have no header row
    #[arg(long)]
    pub no_headers: bool,
}

impl StatementArgs {
    pub fn read(&self, path: &Path) -> anyhow::Result<Statement> {
        read_statement(path, !self.no_headers)
    }
}

/// Read an account statement (or stdin with "-")
pub fn read_statement(path: &Path, has_headers: bool) -> anyhow::Result<Statement> {
    if path.as_os_str() == "-" {
        read_from_stdin(has_headers)
    } else {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let statement = statement::read_statement(BufReader::new(file), has_headers)
            .with_context(|| format!("reading {}", path.display()))?;
        Ok(statement)
    }
}

fn read_from_stdin(has_headers: bool) -> anyhow::Result<Statement> {
    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin.lock());

    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;

    if buffer.is_empty() {
        anyhow::bail!("No input received. Provide a file or pipe data to stdin.");
    }

    Ok(statement::read_statement(io::Cursor::new(buffer), has_headers)?)
}

/// Match one statement, one asset per run
pub fn match_statement(statement: &Statement) -> Result<MatchReport, MatchError> {
    log::info!("{}", statement.asset);
    match_records(&statement.records)
}

/// A single asset's report, optionally narrowed to one tax year
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct AssetReport {
    pub asset: Asset,
    /// "2023/24" style tax year, or "All Years"
    pub tax_year: String,
    pub events: Vec<MatchEvent>,
    pub totals: Totals,
    pub outstanding_buys: Vec<Lot>,
    pub outstanding_sells: Vec<Lot>,
    pub carry_forward: Option<Section104Holding>,
    pub pool_history: Vec<PoolHistoryEntry>,
}

impl AssetReport {
    pub fn new(asset: Asset, report: &MatchReport, year: Option<TaxYear>) -> Self {
        AssetReport {
            asset,
            tax_year: year_label(year),
            events: report.events_in(year).cloned().collect(),
            totals: report.totals_for(year),
            outstanding_buys: report.outstanding_buys.clone(),
            outstanding_sells: report.outstanding_sells.clone(),
            carry_forward: report.carry_forward.clone(),
            pool_history: report
                .pool_history
                .iter()
                .filter(|e| year.is_none_or(|y| TaxYear::from_date(e.date) == y))
                .cloned()
                .collect(),
        }
    }
}

pub fn year_label(year: Option<TaxYear>) -> String {
    year.map_or("All Years".to_string(), |y| y.display())
}
