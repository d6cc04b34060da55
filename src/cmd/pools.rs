//! Pools command - Section 104 holding over time

use super::{match_statement, year_label, StatementArgs};
use crate::core::{format_gbp, format_price, Direction, PoolHistoryEntry, Section104Holding, TaxYear};
use crate::statement::Asset;
use anyhow::Context;
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct PoolsCommand {
    #[command(flatten)]
    statements: StatementArgs,

    /// Tax year to filter (e.g., 2025 for 2024/25)
    #[arg(short, long)]
    year: Option<i32>,

    /// Output as JSON instead of formatted table
    #[arg(long)]
    json: bool,
}

/// Pool history of one asset
#[derive(Debug, Clone, Serialize)]
struct PoolView {
    asset: Asset,
    tax_year: String,
    entries: Vec<PoolHistoryEntry>,
    carry_forward: Option<Section104Holding>,
}

impl PoolsCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let tax_year = self.year.map(TaxYear);

        let mut views = Vec::with_capacity(self.statements.files.len());
        for path in &self.statements.files {
            let statement = self.statements.read(path)?;
            let report = match_statement(&statement).with_context(|| {
                format!("matching {} ({})", statement.asset.name, path.display())
            })?;
            views.push(PoolView {
                asset: statement.asset,
                tax_year: year_label(tax_year),
                entries: filter_entries(&report.pool_history, tax_year).cloned().collect(),
                carry_forward: report.carry_forward,
            });
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&views)?);
        } else {
            for view in &views {
                print_history(view);
            }
        }
        Ok(())
    }
}

fn print_history(view: &PoolView) {
    println!();
    println!("{} POOL HISTORY ({})", view.asset, view.tax_year);
    println!();

    if view.entries.is_empty() {
        println!("No pool history found matching filters");
    } else {
        let rows: Vec<PoolRow> = view.entries.iter().map(PoolRow::from).collect();
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
    }

    if let Some(holding) = &view.carry_forward {
        println!();
        println!("Carry forward: {}", holding);
    }
}

#[derive(Debug, Clone, Tabled)]
struct PoolRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Event")]
    event: String,
    #[tabled(rename = "Quantity")]
    quantity: u64,
    #[tabled(rename = "Cost (GBP)")]
    cost: String,
    #[tabled(rename = "Pool Quantity")]
    pool_quantity: u64,
    #[tabled(rename = "Pool Cost")]
    pool_cost: String,
    #[tabled(rename = "Cost Basis")]
    cost_basis: String,
}

impl From<&PoolHistoryEntry> for PoolRow {
    fn from(entry: &PoolHistoryEntry) -> Self {
        let event = match entry.direction {
            Direction::Buy => "Acquisition",
            Direction::Sell => "Disposal",
        };
        PoolRow {
            date: entry.date.format("%Y-%m-%d").to_string(),
            event: event.to_string(),
            quantity: entry.quantity,
            cost: format_gbp(entry.cost),
            pool_quantity: entry.pool_quantity,
            pool_cost: format_gbp(entry.pool_cost),
            cost_basis: format_price(cost_basis(entry.pool_quantity, entry.pool_cost)),
        }
    }
}

fn filter_entries(
    entries: &[PoolHistoryEntry],
    year: Option<TaxYear>,
) -> impl Iterator<Item = &PoolHistoryEntry> {
    entries
        .iter()
        .filter(move |entry| year.is_none_or(|y| TaxYear::from_date(entry.date) == y))
}

fn cost_basis(quantity: u64, cost: Decimal) -> Decimal {
    if quantity == 0 {
        Decimal::ZERO
    } else {
        (cost / Decimal::from(quantity)).round_dp(6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn entry(date: &str, direction: Direction, pool_quantity: u64, pool_cost: Decimal) -> PoolHistoryEntry {
        PoolHistoryEntry {
            date: date.parse::<NaiveDate>().unwrap(),
            direction,
            ids: vec!["x".to_string()],
            quantity: 5,
            cost: dec!(50.00),
            pool_quantity,
            pool_cost,
        }
    }

    #[test]
    fn filters_entries_by_tax_year() {
        let entries = vec![
            entry("2023-04-05", Direction::Buy, 5, dec!(50.00)),
            entry("2023-04-06", Direction::Buy, 10, dec!(100.00)),
        ];

        let filtered: Vec<_> = filter_entries(&entries, Some(TaxYear(2024))).collect();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].pool_quantity, 10);
        assert_eq!(filter_entries(&entries, None).count(), 2);
    }

    #[test]
    fn row_shows_pool_cost_basis() {
        let row = PoolRow::from(&entry("2023-04-05", Direction::Sell, 3, dec!(10.00)));

        assert_eq!(row.event, "Disposal");
        assert_eq!(row.cost_basis, "3.333333");
        assert_eq!(PoolRow::from(&entry("2023-04-05", Direction::Buy, 0, Decimal::ZERO)).cost_basis, "0");
    }
}
