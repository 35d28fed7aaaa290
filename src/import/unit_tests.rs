use crate::category::{Category, NewCategory};
use crate::error::{ImportError, StoreError};
use crate::import::materialize::materialize;
use crate::import::reconcile::{missing_titles, reconcile};
use crate::import::validate::drain_rows;
use crate::store::{MemoryStore, Store};
use crate::transaction::{NewTransaction, SkipReason, Transaction, TransactionCandidate, TransactionKind};
use crate::RawRow;

use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashSet};
use std::sync::Mutex;

fn raw(line: u64, fields: &[&str]) -> Result<RawRow, ImportError> {
    Ok(RawRow {
        line,
        fields: fields.iter().map(|f| f.to_string()).collect(),
    })
}

fn titles(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn candidate(title: &str, category: &str) -> TransactionCandidate {
    TransactionCandidate {
        line: 2,
        title: title.to_string(),
        kind: TransactionKind::Outcome,
        amount: Decimal::from(10),
        category: category.to_string(),
    }
}

/// Another importer commits `rival` right after our first catalog lookup.
struct RacingStore {
    inner: MemoryStore,
    rival: Mutex<Option<String>>,
}

impl RacingStore {
    fn new(rival: &str) -> Self {
        Self {
            inner: MemoryStore::new(),
            rival: Mutex::new(Some(rival.to_string())),
        }
    }
}

impl Store for RacingStore {
    async fn find_categories_by_title_in(
        &self,
        titles: &BTreeSet<String>,
    ) -> Result<Vec<Category>, StoreError> {
        let found = self.inner.find_categories_by_title_in(titles).await?;
        let rival = self.rival.lock().unwrap().take();
        if let Some(title) = rival {
            self.inner
                .save_categories(vec![NewCategory::new(title)])
                .await?;
        }
        Ok(found)
    }

    async fn save_categories(
        &self,
        categories: Vec<NewCategory>,
    ) -> Result<Vec<Category>, StoreError> {
        self.inner.save_categories(categories).await
    }

    async fn save_transactions(
        &self,
        transactions: Vec<NewTransaction>,
    ) -> Result<Vec<Transaction>, StoreError> {
        self.inner.save_transactions(transactions).await
    }
}

/// Every category save loses the race.
struct ConflictingStore;

impl Store for ConflictingStore {
    async fn find_categories_by_title_in(
        &self,
        _titles: &BTreeSet<String>,
    ) -> Result<Vec<Category>, StoreError> {
        Ok(Vec::new())
    }

    async fn save_categories(
        &self,
        categories: Vec<NewCategory>,
    ) -> Result<Vec<Category>, StoreError> {
        Err(StoreError::Conflict {
            title: categories[0].title.clone(),
        })
    }

    async fn save_transactions(
        &self,
        _transactions: Vec<NewTransaction>,
    ) -> Result<Vec<Transaction>, StoreError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod drain_tests {
    use super::*;

    #[test]
    fn test_drain_keeps_duplicate_category_titles() {
        let rows = vec![
            raw(2, &["Lunch", "outcome", "12", "Food"]),
            raw(3, &["Dinner", "outcome", "30", "Food"]),
        ];

        let parsed = drain_rows(rows).unwrap();

        assert_eq!(parsed.candidates.len(), 2);
        assert_eq!(parsed.category_titles, titles(&["Food", "Food"]));
        assert!(parsed.skipped.is_empty());
    }

    #[test]
    fn test_skipped_row_does_not_reference_its_category() {
        let rows = vec![
            raw(2, &["", "outcome", "50", "Food"]),
            raw(3, &["Bus", "outcome", "12.00", "Transport"]),
        ];

        let parsed = drain_rows(rows).unwrap();

        assert_eq!(parsed.candidates.len(), 1);
        assert_eq!(parsed.category_titles, titles(&["Transport"]));
        assert_eq!(parsed.skipped.len(), 1);
        assert_eq!(parsed.skipped[0].line, 2);
        assert_eq!(parsed.skipped[0].reason, SkipReason::MissingField("title"));
    }

    #[test]
    fn test_read_error_aborts_drain() {
        let rows = vec![
            raw(2, &["Lunch", "outcome", "12", "Food"]),
            Err(ImportError::MalformedInput {
                line: Some(3),
                source: csv::Error::from(std::io::Error::other("truncated")),
            }),
            raw(4, &["Dinner", "outcome", "30", "Food"]),
        ];

        let result = drain_rows(rows);

        match result {
            Err(ImportError::MalformedInput { line, .. }) => assert_eq!(line, Some(3)),
            other => panic!("Expected MalformedInput, got {:?}", other),
        }
    }
}

#[cfg(test)]
mod reconcile_tests {
    use super::*;

    #[test]
    fn test_missing_titles_dedup_in_first_occurrence_order() {
        let referenced = titles(&["Rent", "Food", "Salary", "Food", "Rent", "Gym"]);
        let existing = HashSet::from(["Salary"]);

        assert_eq!(
            missing_titles(&referenced, &existing),
            titles(&["Rent", "Food", "Gym"])
        );
    }

    #[tokio::test]
    async fn test_repeated_new_title_is_created_once() {
        let store = MemoryStore::new();

        let reconciliation = reconcile(&store, &titles(&["Food", "Food"])).await.unwrap();

        assert_eq!(reconciliation.created.len(), 1);
        assert_eq!(reconciliation.pool.len(), 1);
        assert_eq!(store.categories().len(), 1);
        assert_eq!(reconciliation.pool.get("Food").unwrap().title, "Food");
    }

    #[tokio::test]
    async fn test_existing_category_is_reused() {
        let store = MemoryStore::with_categories(["Transport"]);
        let transport_id = store.categories()[0].id;

        let reconciliation = reconcile(&store, &titles(&["Transport", "Salary"]))
            .await
            .unwrap();

        assert_eq!(reconciliation.created.len(), 1);
        assert_eq!(reconciliation.created[0].title, "Salary");
        assert_eq!(reconciliation.pool.get("Transport").unwrap().id, transport_id);
        assert_eq!(store.categories().len(), 2);
    }

    #[tokio::test]
    async fn test_nothing_to_create_skips_save() {
        let store = MemoryStore::with_categories(["Food", "Rent"]);

        let reconciliation = reconcile(&store, &titles(&["Rent", "Food"])).await.unwrap();

        assert!(reconciliation.created.is_empty());
        assert_eq!(reconciliation.pool.len(), 2);
        assert_eq!(store.categories().len(), 2);
    }

    #[tokio::test]
    async fn test_no_references_yields_empty_pool() {
        let store = MemoryStore::new();

        let reconciliation = reconcile(&store, &[]).await.unwrap();

        assert!(reconciliation.pool.is_empty());
        assert!(reconciliation.created.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_create_is_refetched_not_duplicated() {
        let store = RacingStore::new("Food");

        let reconciliation = reconcile(&store, &titles(&["Food", "Rent"])).await.unwrap();

        let catalog = store.inner.categories();
        assert_eq!(catalog.len(), 2);
        let food = catalog.iter().find(|c| c.title == "Food").unwrap();

        assert_eq!(reconciliation.pool.get("Food").unwrap().id, food.id);
        assert_eq!(reconciliation.created.len(), 1);
        assert_eq!(reconciliation.created[0].title, "Rent");
    }

    #[tokio::test]
    async fn test_persistent_conflict_surfaces_as_persistence_error() {
        let result = reconcile(&ConflictingStore, &titles(&["Food"])).await;

        match result {
            Err(ImportError::Persistence { context, source }) => {
                assert_eq!(context, "saving categories");
                assert!(source.is_conflict());
            }
            other => panic!("Expected Persistence error, got {:?}", other),
        }
    }
}

#[cfg(test)]
mod materialize_tests {
    use super::*;

    #[tokio::test]
    async fn test_candidates_bind_to_pool_categories() {
        let store = MemoryStore::new();
        let reconciliation = reconcile(&store, &titles(&["Food"])).await.unwrap();

        let drafts = materialize(
            &store,
            vec![candidate("Lunch", "Food"), candidate("Dinner", "Food")],
            &reconciliation.pool,
        )
        .unwrap();

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].category, drafts[1].category);
        assert_eq!(drafts[0].title, "Lunch");
    }

    #[test]
    fn test_unresolved_category_is_an_error() {
        let store = MemoryStore::new();
        let pool = Default::default();

        let result = materialize(&store, vec![candidate("Lunch", "Food")], &pool);

        match result {
            Err(ImportError::UnresolvedCategory { title }) => assert_eq!(title, "Food"),
            other => panic!("Expected UnresolvedCategory, got {:?}", other),
        }
    }
}
