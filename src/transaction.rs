use crate::category::Category;
use crate::RawRow;

use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    Income,
    Outcome,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Outcome => "outcome",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = SkipReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionKind::Income),
            "outcome" => Ok(TransactionKind::Outcome),
            other => Err(SkipReason::UnknownKind(other.to_string())),
        }
    }
}

/// Why a data row was dropped instead of imported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("unknown transaction type {0:?}")]
    UnknownKind(String),

    #[error("invalid amount {0:?}")]
    InvalidAmount(String),
}

/// A validated row, bound to its category only by name.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionCandidate {
    pub line: u64,
    pub title: String,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub category: String,
}

impl TryFrom<RawRow> for TransactionCandidate {
    type Error = SkipReason;

    fn try_from(row: RawRow) -> Result<Self, Self::Error> {
        let title = row.field(0).trim();
        let kind = row.field(1).trim();
        let amount = row.field(2).trim();
        let category = row.field(3).trim();

        if title.is_empty() {
            return Err(SkipReason::MissingField("title"));
        }
        if kind.is_empty() {
            return Err(SkipReason::MissingField("type"));
        }
        if amount.is_empty() {
            return Err(SkipReason::MissingField("value"));
        }

        let kind = kind.parse()?;
        let amount = Decimal::from_str(amount)
            .map_err(|_| SkipReason::InvalidAmount(amount.to_string()))?;

        Ok(TransactionCandidate {
            line: row.line,
            title: title.to_string(),
            kind,
            amount,
            category: category.to_string(),
        })
    }
}

/// A transaction bound to a resolved category, not yet saved.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub title: String,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub category: Category,
}

impl NewTransaction {
    pub fn new(candidate: TransactionCandidate, category: Category) -> Self {
        Self {
            title: candidate.title,
            kind: candidate.kind,
            amount: candidate.amount,
            category,
        }
    }

    pub fn into_saved(self, id: i64) -> Transaction {
        Transaction {
            id,
            title: self.title,
            kind: self.kind,
            amount: self.amount,
            category: self.category,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: i64,
    pub title: String,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub category: Category,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fields: &[&str]) -> RawRow {
        RawRow {
            line: 2,
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    #[test]
    fn test_candidate_fields_are_trimmed() {
        let candidate =
            TransactionCandidate::try_from(row(&["  Bus ", " outcome", "12.00 ", " Transport "]))
                .unwrap();

        assert_eq!(candidate.title, "Bus");
        assert_eq!(candidate.kind, TransactionKind::Outcome);
        assert_eq!(candidate.amount, Decimal::from_str("12.00").unwrap());
        assert_eq!(candidate.category, "Transport");
        assert_eq!(candidate.line, 2);
    }

    #[test]
    fn test_blank_title_is_skipped() {
        let result = TransactionCandidate::try_from(row(&["  ", "outcome", "50", "Food"]));
        assert_eq!(result, Err(SkipReason::MissingField("title")));
    }

    #[test]
    fn test_missing_amount_is_skipped() {
        let result = TransactionCandidate::try_from(row(&["Lunch", "outcome"]));
        assert_eq!(result, Err(SkipReason::MissingField("value")));
    }

    #[test]
    fn test_unknown_kind_is_skipped() {
        let result = TransactionCandidate::try_from(row(&["Gift", "transfer", "10", "Misc"]));
        assert_eq!(result, Err(SkipReason::UnknownKind("transfer".to_string())));
    }

    #[test]
    fn test_kind_is_case_sensitive() {
        let result = TransactionCandidate::try_from(row(&["Gift", "Income", "10", "Misc"]));
        assert!(matches!(result, Err(SkipReason::UnknownKind(_))));
    }

    #[test]
    fn test_unparseable_amount_is_skipped() {
        let result = TransactionCandidate::try_from(row(&["Gift", "income", "ten", "Misc"]));
        assert_eq!(result, Err(SkipReason::InvalidAmount("ten".to_string())));
    }

    #[test]
    fn test_missing_category_becomes_empty_title() {
        let candidate = TransactionCandidate::try_from(row(&["Gift", "income", "10"])).unwrap();
        assert_eq!(candidate.category, "");
    }
}
