pub mod category;
pub mod config;
pub mod error;
pub mod import;
pub mod quote;
pub mod store;
pub mod transaction;

pub use crate::config::ImportConfig;
pub use crate::error::{CleanupWarning, ImportError, StoreError};
pub use crate::import::{ImportReport, Importer};

use crate::quote::{QuoteGuard, UnclosedQuote};

use csv::{ErrorKind, ReaderBuilder, StringRecord, StringRecordsIntoIter};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One parsed line of the input, before any validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub line: u64,
    pub fields: Vec<String>,
}

impl RawRow {
    fn from_record(record: &StringRecord) -> Self {
        Self {
            line: record.position().map(|p| p.line()).unwrap_or_default(),
            fields: record.iter().map(str::to_owned).collect(),
        }
    }

    pub fn field(&self, idx: usize) -> &str {
        self.fields.get(idx).map(String::as_str).unwrap_or("")
    }
}

/// Lazy row sequence over a reader. Leading header records are discarded
/// but their read errors are still reported. The stream ends after the
/// first error.
pub struct RowStream<R> {
    records: StringRecordsIntoIter<QuoteGuard<R>>,
    skip: usize,
    failed: bool,
}

impl<R: Read> Iterator for RowStream<R> {
    type Item = Result<RawRow, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(source) => {
                    self.failed = true;
                    return Some(Err(ImportError::MalformedInput {
                        line: error_line(&source),
                        source,
                    }))
                }
            };

            if self.skip > 0 {
                self.skip -= 1;
                continue;
            }

            return Some(Ok(RawRow::from_record(&record)));
        }
    }
}

fn error_line(err: &csv::Error) -> Option<u64> {
    if let Some(position) = err.position() {
        return Some(position.line());
    }

    match err.kind() {
        ErrorKind::Io(io) => io
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<UnclosedQuote>())
            .map(|quote| quote.line),
        _ => None,
    }
}

pub fn stream_rows<R: Read>(reader: R, config: &ImportConfig) -> RowStream<R> {
    // Row width is checked by validation, not by the reader
    let records = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(config.delimiter)
        .from_reader(QuoteGuard::new(reader, config.delimiter))
        .into_records();

    RowStream {
        records,
        skip: config.header_lines,
        failed: false,
    }
}

pub fn stream_rows_from_path(
    path: impl AsRef<Path>,
    config: &ImportConfig,
) -> Result<RowStream<File>, ImportError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ImportError::SourceUnreadable {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(stream_rows(file, config))
}
