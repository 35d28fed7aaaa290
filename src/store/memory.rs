use super::Store;
use crate::category::{Category, NewCategory};
use crate::error::StoreError;
use crate::transaction::{NewTransaction, Transaction};

use std::collections::{BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// In-process store. Enforces unique category titles and that every saved
/// transaction points at a known category.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    categories: Vec<Category>,
    transactions: Vec<Transaction>,
    next_category_id: i64,
    next_transaction_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with one category per title, ids assigned in order.
    pub fn with_categories<I, T>(titles: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let store = Self::new();
        {
            let mut inner = store.lock();
            for title in titles {
                inner.push_category(NewCategory::new(title));
            }
        }
        store
    }

    pub fn categories(&self) -> Vec<Category> {
        self.lock().categories.clone()
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.lock().transactions.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Inner {
    fn push_category(&mut self, category: NewCategory) -> Category {
        self.next_category_id += 1;
        let saved = category.into_saved(self.next_category_id);
        self.categories.push(saved.clone());
        saved
    }
}

impl Store for MemoryStore {
    async fn find_categories_by_title_in(
        &self,
        titles: &BTreeSet<String>,
    ) -> Result<Vec<Category>, StoreError> {
        Ok(self
            .lock()
            .categories
            .iter()
            .filter(|c| titles.contains(&c.title))
            .cloned()
            .collect())
    }

    async fn save_categories(
        &self,
        categories: Vec<NewCategory>,
    ) -> Result<Vec<Category>, StoreError> {
        let mut inner = self.lock();

        {
            let mut seen: HashSet<&str> =
                inner.categories.iter().map(|c| c.title.as_str()).collect();
            for category in &categories {
                if !seen.insert(category.title.as_str()) {
                    return Err(StoreError::Conflict {
                        title: category.title.clone(),
                    });
                }
            }
        }

        Ok(categories
            .into_iter()
            .map(|category| inner.push_category(category))
            .collect())
    }

    async fn save_transactions(
        &self,
        transactions: Vec<NewTransaction>,
    ) -> Result<Vec<Transaction>, StoreError> {
        let mut inner = self.lock();

        let known: HashSet<i64> = inner.categories.iter().map(|c| c.id).collect();
        if let Some(tx) = transactions.iter().find(|tx| !known.contains(&tx.category.id)) {
            return Err(StoreError::MissingCategory(tx.category.id));
        }

        let mut saved = Vec::with_capacity(transactions.len());
        for tx in transactions {
            inner.next_transaction_id += 1;
            let tx = tx.into_saved(inner.next_transaction_id);
            inner.transactions.push(tx.clone());
            saved.push(tx);
        }

        Ok(saved)
    }
}
