use std::io::{self, Write};

use bas_balance_core::TransactionRecord;
use clap::ValueEnum;
use prettytable::{Cell, Row, Table};
use serde::Deserialize;
use thiserror::Error;

/// Printed after the last record once the listing completed.
pub const CLOSING_LINE: &str = "Hello, World!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One `Transaction: {column:value ...}` line per record
    #[default]
    Text,
    /// One JSON object per line
    Json,
    /// A single table with a header row
    Table,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode record: {0}")]
    Json(#[from] serde_json::Error),
}

pub struct Renderer {
    format: OutputFormat,
}

impl Renderer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Writes `records` in order, then the closing line.
    pub fn render(&self, records: &[TransactionRecord], out: &mut dyn Write) -> Result<(), RenderError> {
        match self.format {
            OutputFormat::Text => {
                for record in records {
                    writeln!(out, "Transaction: {}", record)?;
                }
            }
            OutputFormat::Json => {
                for record in records {
                    serde_json::to_writer(&mut *out, record)?;
                    writeln!(out)?;
                }
            }
            OutputFormat::Table => {
                if let Some(first) = records.first() {
                    write!(out, "{}", build_table(first, records))?;
                }
            }
        }

        writeln!(out, "{}", CLOSING_LINE)?;
        out.flush()?;
        Ok(())
    }
}

fn build_table(first: &TransactionRecord, records: &[TransactionRecord]) -> Table {
    let mut table = Table::new();
    table.set_titles(Row::new(
        first.columns().iter().map(|(name, _)| Cell::new(name)).collect(),
    ));
    for record in records {
        table.add_row(Row::new(
            record
                .columns()
                .iter()
                .map(|(_, value)| Cell::new(&value.to_string()))
                .collect(),
        ));
    }
    table
}
