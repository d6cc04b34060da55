//! Schema command - print the statement input format and the report output format

use crate::cmd::AssetReport;
use crate::statement::StatementRow;
use clap::Args;
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Output format: csv-fields, csv-header or json-schema
    #[arg(value_enum, default_value = "csv-fields")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// Statement column descriptions
    CsvFields,
    /// Statement header row
    CsvHeader,
    /// JSON Schema of `report --format json` output
    JsonSchema,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::CsvFields => self.print_csv_fields(),
            SchemaFormat::CsvHeader => self.print_csv_header(),
            SchemaFormat::JsonSchema => self.print_json_schema(),
        }
    }

    fn print_json_schema(&self) -> anyhow::Result<()> {
        let schema = schema_for!(Vec<AssetReport>);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        Ok(())
    }

    fn print_csv_header(&self) -> anyhow::Result<()> {
        let names: Vec<&str> = StatementRow::csv_columns().iter().map(|c| c.name).collect();
        println!("{}", names.join(","));
        Ok(())
    }

    fn print_csv_fields(&self) -> anyhow::Result<()> {
        println!("Account Statement CSV Format");
        println!("============================");
        println!();
        for column in StatementRow::csv_columns() {
            let req = if column.required { "required" } else { "optional" };
            println!(
                "{:2}  {:16} ({:8})  {}",
                column.position + 1,
                column.name,
                req,
                column.description
            );
        }
        println!();
        println!("Columns are read by position; the header row is optional (--no-headers).");
        println!("Only Buy and Sell rows may appear. One ISIN per file.");
        Ok(())
    }
}
