use crate::error::ImportError;
use crate::transaction::{SkipReason, TransactionCandidate};
use crate::RawRow;

use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub line: u64,
    pub reason: SkipReason,
}

/// Everything pulled out of one input file.
#[derive(Debug, Default)]
pub struct ParsedFile {
    pub candidates: Vec<TransactionCandidate>,
    /// Category title of each candidate, in row order, duplicates kept.
    pub category_titles: Vec<String>,
    pub skipped: Vec<SkippedRow>,
}

/// Drains the whole row sequence. A read error aborts; an incomplete row
/// is recorded and dropped.
pub fn drain_rows<I>(rows: I) -> Result<ParsedFile, ImportError>
where
    I: IntoIterator<Item = Result<RawRow, ImportError>>,
{
    let mut parsed = ParsedFile::default();

    for row in rows {
        let row = row?;
        let line = row.line;

        match TransactionCandidate::try_from(row) {
            Ok(candidate) => {
                parsed.category_titles.push(candidate.category.clone());
                parsed.candidates.push(candidate);
            }
            Err(reason) => {
                warn!(line, %reason, "skipping row");
                parsed.skipped.push(SkippedRow { line, reason });
            }
        }
    }

    Ok(parsed)
}
