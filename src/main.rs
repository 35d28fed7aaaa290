use ledger_import::store::SqliteStore;
use ledger_import::transaction::Transaction;
use ledger_import::{ImportConfig, Importer};

use clap::Parser;
use serde::Serialize;
use std::io::stdout;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Import a transactions CSV into the ledger database
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// CSV file with `title,type,value,category` rows; removed after import
    file: PathBuf,

    /// SQLite database holding the category catalog and transactions
    #[arg(long, default_value = "ledger.db")]
    database: PathBuf,

    /// Leading lines to skip before data rows
    #[arg(long, default_value_t = 1)]
    header_lines: usize,

    /// Field delimiter, a single ASCII character
    #[arg(long, default_value = ",", value_parser = parse_delimiter)]
    delimiter: u8,
}

fn parse_delimiter(arg: &str) -> Result<u8, String> {
    let mut chars = arg.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c as u8),
        _ => Err(format!("expected a single ASCII character, got {arg:?}")),
    }
}

#[derive(Serialize)]
struct TransactionRow<'a> {
    id: i64,
    title: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    value: String,
    category: &'a str,
}

impl<'a> From<&'a Transaction> for TransactionRow<'a> {
    fn from(tx: &'a Transaction) -> Self {
        Self {
            id: tx.id,
            title: &tx.title,
            kind: tx.kind.as_str(),
            value: tx.amount.to_string(),
            category: &tx.category.title,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = ImportConfig::default()
        .with_header_lines(args.header_lines)
        .with_delimiter(args.delimiter);

    let store = SqliteStore::open(&args.database)?;
    let importer = Importer::with_config(store, config);
    let transactions = importer.execute(&args.file).await?;

    let mut writer = csv::Writer::from_writer(stdout());
    for tx in &transactions {
        writer.serialize(TransactionRow::from(tx))?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delimiter_accepts_ascii() {
        assert_eq!(parse_delimiter(","), Ok(b','));
        assert_eq!(parse_delimiter(";"), Ok(b';'));
        assert_eq!(parse_delimiter("\t"), Ok(b'\t'));
    }

    #[test]
    fn test_parse_delimiter_rejects_non_ascii() {
        assert!(parse_delimiter("é").is_err());
        assert!(parse_delimiter("§").is_err());
    }

    #[test]
    fn test_parse_delimiter_rejects_empty_and_multiple() {
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter(",;").is_err());
    }

    #[test]
    fn test_args_reject_non_ascii_delimiter() {
        let result = Args::try_parse_from(["ledger-import", "in.csv", "--delimiter", "é"]);
        assert!(result.is_err());

        let args = Args::try_parse_from(["ledger-import", "in.csv", "--delimiter", ";"]).unwrap();
        assert_eq!(args.delimiter, b';');
    }
}
