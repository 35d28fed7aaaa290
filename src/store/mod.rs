mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::category::{Category, NewCategory};
use crate::error::StoreError;
use crate::transaction::{NewTransaction, Transaction, TransactionCandidate};

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

/// Persistence for the category catalog and imported transactions.
///
/// `create_*` only construct unsaved entities; `save_*` commit a whole batch
/// or nothing. `save_categories` must report a title that is already in the
/// catalog as [`StoreError::Conflict`].
pub trait Store: Send + Sync {
    fn find_categories_by_title_in(
        &self,
        titles: &BTreeSet<String>,
    ) -> impl Future<Output = Result<Vec<Category>, StoreError>> + Send;

    fn create_categories(&self, titles: Vec<String>) -> Vec<NewCategory> {
        titles.into_iter().map(NewCategory::new).collect()
    }

    fn save_categories(
        &self,
        categories: Vec<NewCategory>,
    ) -> impl Future<Output = Result<Vec<Category>, StoreError>> + Send;

    fn create_transactions(
        &self,
        bound: Vec<(TransactionCandidate, Category)>,
    ) -> Vec<NewTransaction> {
        bound
            .into_iter()
            .map(|(candidate, category)| NewTransaction::new(candidate, category))
            .collect()
    }

    fn save_transactions(
        &self,
        transactions: Vec<NewTransaction>,
    ) -> impl Future<Output = Result<Vec<Transaction>, StoreError>> + Send;
}

impl<S: Store> Store for Arc<S> {
    fn find_categories_by_title_in(
        &self,
        titles: &BTreeSet<String>,
    ) -> impl Future<Output = Result<Vec<Category>, StoreError>> + Send {
        (**self).find_categories_by_title_in(titles)
    }

    fn create_categories(&self, titles: Vec<String>) -> Vec<NewCategory> {
        (**self).create_categories(titles)
    }

    fn save_categories(
        &self,
        categories: Vec<NewCategory>,
    ) -> impl Future<Output = Result<Vec<Category>, StoreError>> + Send {
        (**self).save_categories(categories)
    }

    fn create_transactions(
        &self,
        bound: Vec<(TransactionCandidate, Category)>,
    ) -> Vec<NewTransaction> {
        (**self).create_transactions(bound)
    }

    fn save_transactions(
        &self,
        transactions: Vec<NewTransaction>,
    ) -> impl Future<Output = Result<Vec<Transaction>, StoreError>> + Send {
        (**self).save_transactions(transactions)
    }
}
