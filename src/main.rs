mod cmd;
mod core;
mod statement;

use clap::{Parser, Subcommand};

/// Match UK share disposals to acquisitions (same day, bed and breakfast,
/// Section 104, acquisitions following disposals) and report gains and losses.
#[derive(Parser, Debug)]
#[command(name = "sharematch", version, about, long_about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Match each statement and print every disposal with the totals
    Report(cmd::report::ReportCommand),
    /// Section 104 holding history
    Pools(cmd::pools::PoolsCommand),
    /// Check statements for unmatched lots and bad rows; exits 1 on issues
    Validate(cmd::validate::ValidateCommand),
    /// Print the statement CSV format or the report JSON schema
    Schema(cmd::schema::SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Report(report) => report.exec(),
        Command::Pools(pools) => pools.exec(),
        Command::Validate(validate) => validate.exec(),
        Command::Schema(schema) => schema.exec(),
    }
}
