//! Report command - match every statement and print the disposals

use super::{match_statement, AssetReport, StatementArgs};
use crate::core::{format_gbp, format_price, Lot, MatchEvent, MatchingRule, TaxYear, Totals};
use anyhow::Context;
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::{self, Write};
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One narrative line per match
    #[default]
    Text,
    /// Formatted table of matches
    Table,
    /// CSV rows of matches
    Csv,
    /// Full report as JSON
    Json,
}

#[derive(Args, Debug)]
pub struct ReportCommand {
    #[command(flatten)]
    statements: StatementArgs,

    /// Tax year to report (e.g., 2025 for 2024/25)
    #[arg(short, long)]
    year: Option<i32>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

impl ReportCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let tax_year = self.year.map(TaxYear);

        // Each file is a separate asset and a separate run; any failure halts.
        let mut reports = Vec::with_capacity(self.statements.files.len());
        for path in &self.statements.files {
            let statement = self.statements.read(path)?;
            let report = match_statement(&statement).with_context(|| {
                format!("matching {} ({})", statement.asset.name, path.display())
            })?;
            reports.push(AssetReport::new(statement.asset, &report, tax_year));
        }

        match self.format {
            OutputFormat::Text => {
                for report in &reports {
                    print_text(report);
                }
                Ok(())
            }
            OutputFormat::Table => {
                for report in &reports {
                    print_table(report);
                }
                Ok(())
            }
            OutputFormat::Csv => write_csv(&reports, io::stdout()),
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&reports)?);
                Ok(())
            }
        }
    }
}

fn print_text(report: &AssetReport) {
    println!("{}", report.asset);
    println!();

    for event in &report.events {
        println!("{}", describe(event));
        println!();
    }

    print_outstanding(report);
    print_carry_forward(report);
    print_summary(&report.tax_year, &report.totals);
}

fn print_table(report: &AssetReport) {
    println!();
    println!("{} ({})", report.asset, report.tax_year);
    println!();

    if report.events.is_empty() {
        println!("No disposals found");
    } else {
        let rows: Vec<MatchRow> = report.events.iter().map(MatchRow::from).collect();
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
    }
    println!();

    print_outstanding(report);
    print_carry_forward(report);
    print_summary(&report.tax_year, &report.totals);
}

/// Narrative line for one match, in the wording of an HMRC computation
pub fn describe(event: &MatchEvent) -> String {
    let outcome = describe_profit_or_loss(event.profit_or_loss);
    match (event.rule, event.buy_date) {
        (MatchingRule::Section104, _) | (_, None) => format!(
            "{} {} shares from sell transaction(s) (IDs {}) dated {} identified with the \
             Section 104 holding. The average price of the sold shares was {} GBP, and the \
             average price of the shares in the Section 104 holding was {} GBP. {}",
            event.rule.heading(),
            event.quantity,
            event.sell_ids.join(", "),
            event.sell_date,
            format_price(event.average_sell_price),
            format_price(event.average_buy_price),
            outcome
        ),
        (rule, Some(buy_date)) => format!(
            "{} Sell transaction(s) (IDs {}) identified with buy transaction(s) (IDs {}). \
             {} shares sold for an average price of {} GBP on {} identified with shares \
             bought on {} for an average price of {} GBP. {}",
            rule.heading(),
            event.sell_ids.join(", "),
            event.buy_ids.join(", "),
            event.quantity,
            format_price(event.average_sell_price),
            event.sell_date,
            buy_date,
            format_price(event.average_buy_price),
            outcome
        ),
    }
}

fn describe_profit_or_loss(amount: Decimal) -> String {
    if amount >= Decimal::ZERO {
        format!("Profit = {}.", format_gbp(amount))
    } else {
        format!("Loss = {}.", format_gbp(amount))
    }
}

fn print_outstanding(report: &AssetReport) {
    if report.outstanding_buys.is_empty() && report.outstanding_sells.is_empty() {
        return;
    }

    println!(
        "WARNING: the following transactions could not be matched. They may belong to another \
         tax year, or the input may be incomplete."
    );
    for lot in report.outstanding_buys.iter().chain(&report.outstanding_sells) {
        println!("  {}", describe_lot(lot));
    }
    println!();
}

fn describe_lot(lot: &Lot) -> String {
    format!(
        "{} {} shares on {} for {} (IDs {})",
        lot.direction,
        lot.quantity,
        lot.date,
        format_gbp(lot.total_price),
        lot.ids_display()
    )
}

fn print_carry_forward(report: &AssetReport) {
    if let Some(holding) = &report.carry_forward {
        println!(
            "CARRY FORWARD: there are purchased shares remaining in the Section 104 holding. \
             These may need to be carried forward to be matched with future disposals."
        );
        println!(
            "  {} shares costing {} (average {} GBP, IDs {})",
            holding.quantity,
            format_gbp(holding.total_cost),
            format_price(holding.average_cost()),
            holding.ids.join(", ")
        );
        println!();
    }
}

fn print_summary(tax_year: &str, totals: &Totals) {
    println!("SUMMARY ({})", tax_year);
    println!("  Total gains:   {:>12}", format_gbp(totals.gains));
    println!("  Total losses:  {:>12}", format_gbp(totals.losses));
    println!("  Net profit:    {:>12}", format_gbp(totals.net));
    println!();
}

#[derive(Debug, Clone, Tabled)]
struct MatchRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Rule")]
    rule: String,
    #[tabled(rename = "Quantity")]
    quantity: u64,
    #[tabled(rename = "Proceeds")]
    proceeds: String,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "Gain/Loss")]
    profit_or_loss: String,
    #[tabled(rename = "Matched With")]
    matched_with: String,
}

impl From<&MatchEvent> for MatchRow {
    fn from(event: &MatchEvent) -> Self {
        MatchRow {
            date: event.sell_date.format("%Y-%m-%d").to_string(),
            rule: event.rule.display().to_string(),
            quantity: event.quantity,
            proceeds: format_gbp(event.proceeds),
            cost: format_gbp(event.cost),
            profit_or_loss: format_gbp(event.profit_or_loss),
            matched_with: event
                .buy_date
                .map_or("Pool".to_string(), |d| d.format("%Y-%m-%d").to_string()),
        }
    }
}

/// Flat CSV row for one match
#[derive(Debug, Serialize)]
struct MatchRecord<'a> {
    asset: &'a str,
    isin: &'a str,
    tax_year: String,
    rule: &'static str,
    sell_date: String,
    buy_date: String,
    sell_ids: String,
    buy_ids: String,
    quantity: u64,
    average_sell_price: String,
    average_buy_price: String,
    proceeds: String,
    cost: String,
    profit_or_loss: String,
}

fn write_csv<W: Write>(reports: &[AssetReport], writer: W) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for report in reports {
        for event in &report.events {
            wtr.serialize(MatchRecord {
                asset: &report.asset.name,
                isin: &report.asset.isin,
                tax_year: event.tax_year.display(),
                rule: event.rule.display(),
                sell_date: event.sell_date.to_string(),
                buy_date: event.buy_date.map_or(String::new(), |d| d.to_string()),
                sell_ids: event.sell_ids.join(" "),
                buy_ids: event.buy_ids.join(" "),
                quantity: event.quantity,
                average_sell_price: format_price(event.average_sell_price),
                average_buy_price: format_price(event.average_buy_price),
                proceeds: format!("{:.2}", event.proceeds),
                cost: format!("{:.2}", event.cost),
                profit_or_loss: format!("{:.2}", event.profit_or_loss),
            })?;
        }
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::Asset;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn event(rule: MatchingRule, buy_date: Option<&str>, profit_or_loss: Decimal) -> MatchEvent {
        let sell_date = NaiveDate::from_ymd_opt(2022, 5, 16).unwrap();
        MatchEvent {
            rule,
            tax_year: TaxYear::from_date(sell_date),
            sell_ids: vec!["s1".to_string()],
            buy_ids: vec!["b1".to_string(), "b2".to_string()],
            sell_date,
            buy_date: buy_date.map(|d| d.parse().unwrap()),
            quantity: 10,
            average_sell_price: dec!(20.654),
            average_buy_price: dec!(19.999),
            proceeds: dec!(206.54),
            cost: dec!(199.99),
            profit_or_loss,
        }
    }

    #[test]
    fn describes_lot_match() {
        let text = describe(&event(MatchingRule::SameDay, Some("2022-05-16"), dec!(6.55)));

        assert!(text.starts_with("SAME DAY Sell transaction(s) (IDs s1)"));
        assert!(text.contains("buy transaction(s) (IDs b1, b2)"));
        assert!(text.contains("average price of 20.654 GBP"));
        assert!(text.ends_with("Profit = £6.55."));
    }

    #[test]
    fn describes_pool_match_and_loss() {
        let text = describe(&event(MatchingRule::Section104, None, dec!(-0.10)));

        assert!(text.starts_with("SECTION 104 10 shares"));
        assert!(text.contains("Section 104 holding was 19.999 GBP"));
        assert!(text.ends_with("Loss = -£0.10."));
    }

    #[test]
    fn csv_has_one_row_per_match() {
        let report = AssetReport {
            asset: Asset {
                name: "COMPANY A PLC".to_string(),
                isin: "GB0000000001".to_string(),
            },
            tax_year: "All Years".to_string(),
            events: vec![
                event(MatchingRule::SameDay, Some("2022-05-16"), dec!(6.55)),
                event(MatchingRule::Section104, None, dec!(-0.10)),
            ],
            totals: Totals::default(),
            outstanding_buys: vec![],
            outstanding_sells: vec![],
            carry_forward: None,
            pool_history: vec![],
        };

        let mut out = Vec::new();
        write_csv(&[report], &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("asset,isin,tax_year,rule"));
        assert!(lines[1].contains("Same-Day"));
        assert!(lines[1].ends_with("6.55"));
        assert!(lines[2].contains("S104"));
        assert!(lines[2].ends_with("-0.10"));
    }
}
