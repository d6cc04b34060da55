//! Validate command - surface unmatched lots and input problems without generating full reports

use super::StatementArgs;
use crate::cmd::match_statement;
use crate::core::{format_gbp, Lot, MatchError};
use clap::Args;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct ValidateCommand {
    #[command(flatten)]
    statements: StatementArgs,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// A validation issue for output
#[derive(Debug, Clone, Serialize)]
struct ValidationIssue {
    #[serde(rename = "type")]
    issue_type: String,
    file: String,
    asset: String,
    message: String,
}

/// JSON output structure
#[derive(Debug, Serialize)]
struct ValidationOutput {
    file_count: usize,
    issue_count: usize,
    issues: Vec<ValidationIssue>,
}

impl ValidateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let mut issues = Vec::new();

        for path in &self.statements.files {
            let file = path.display().to_string();
            let statement = match self.statements.read(path) {
                Ok(statement) => statement,
                Err(err) => {
                    issues.push(ValidationIssue {
                        issue_type: "UnreadableStatement".to_string(),
                        file,
                        asset: "unknown".to_string(),
                        message: format!("{err:#}"),
                    });
                    continue;
                }
            };
            let asset = statement.asset.name.clone();
            let issue = |issue_type: &str, message: String| ValidationIssue {
                issue_type: issue_type.to_string(),
                file: file.clone(),
                asset: asset.clone(),
                message,
            };

            match match_statement(&statement) {
                Ok(report) => {
                    for lot in &report.outstanding_buys {
                        issues.push(issue("UnmatchedBuy", describe_unmatched(lot)));
                    }
                    for lot in &report.outstanding_sells {
                        issues.push(issue("UnmatchedSell", describe_unmatched(lot)));
                    }
                }
                Err(err) => issues.push(issue(error_type_name(&err), err.to_string())),
            }
        }

        if self.json {
            self.print_json(&issues)?;
        } else {
            self.print_text(&issues);
        }

        // Exit with code 1 if issues found
        if !issues.is_empty() {
            std::process::exit(1);
        }
        Ok(())
    }

    fn print_text(&self, issues: &[ValidationIssue]) {
        println!();
        println!("VALIDATION RESULTS ({} file(s))", self.statements.files.len());
        println!();

        if issues.is_empty() {
            println!("\u{2713} No issues found.");
        } else {
            println!("\u{26A0} {} issue(s) found:", issues.len());
            println!();

            for (i, issue) in issues.iter().enumerate() {
                println!("  {}. [{}] {} ({})", i + 1, issue.issue_type, issue.asset, issue.file);
                println!("     {}", issue.message);
                println!();
            }
        }
    }

    fn print_json(&self, issues: &[ValidationIssue]) -> anyhow::Result<()> {
        let output = ValidationOutput {
            file_count: self.statements.files.len(),
            issue_count: issues.len(),
            issues: issues.to_vec(),
        };

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}

fn describe_unmatched(lot: &Lot) -> String {
    format!(
        "{} {} shares on {} for {} (IDs {}) could not be matched; it may belong to another tax year",
        lot.direction,
        lot.quantity,
        lot.date,
        format_gbp(lot.total_price),
        lot.ids_display()
    )
}

fn error_type_name(err: &MatchError) -> &'static str {
    match err {
        MatchError::MalformedRecord { .. } => "MalformedRecord",
        MatchError::AcquisitionNotFollowingDisposal { .. } => "AcquisitionNotFollowingDisposal",
        MatchError::MissingLot { .. } => "InternalError",
    }
}
