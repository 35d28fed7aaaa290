use crate::category::Category;
use crate::error::ImportError;
use crate::store::Store;

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

/// Attempts at creating missing categories before a title conflict is fatal.
const MAX_CREATE_ATTEMPTS: usize = 3;

/// Title to category lookup for one import run.
#[derive(Debug, Default)]
pub struct CategoryPool {
    by_title: HashMap<String, Category>,
}

impl CategoryPool {
    fn insert(&mut self, category: Category) {
        match self.by_title.entry(category.title.clone()) {
            Entry::Occupied(kept) => {
                warn!(
                    title = %category.title,
                    kept_id = kept.get().id,
                    dropped_id = category.id,
                    "catalog holds duplicate category title"
                );
            }
            Entry::Vacant(slot) => {
                slot.insert(category);
            }
        }
    }

    pub fn get(&self, title: &str) -> Option<&Category> {
        self.by_title.get(title)
    }

    pub fn len(&self) -> usize {
        self.by_title.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_title.is_empty()
    }
}

#[derive(Debug)]
pub struct Reconciliation {
    pub pool: CategoryPool,
    /// Categories this run added to the catalog, in first-reference order.
    pub created: Vec<Category>,
}

/// Titles from `referenced` absent from `existing`, first occurrence kept.
pub fn missing_titles(referenced: &[String], existing: &HashSet<&str>) -> Vec<String> {
    let mut queued = HashSet::new();
    referenced
        .iter()
        .filter(|title| !existing.contains(title.as_str()))
        .filter(|title| queued.insert(title.as_str()))
        .cloned()
        .collect()
}

/// Resolves every referenced title to a stored category, creating the
/// missing ones in one bulk save.
///
/// If the save hits a title another writer created after our lookup, the
/// pending titles are fetched again and only the still-missing ones are
/// retried.
pub async fn reconcile<S: Store>(
    store: &S,
    referenced: &[String],
) -> Result<Reconciliation, ImportError> {
    let wanted: BTreeSet<String> = referenced.iter().cloned().collect();
    let mut existing = store
        .find_categories_by_title_in(&wanted)
        .await
        .map_err(|source| ImportError::Persistence {
            context: "finding categories",
            source,
        })?;

    let mut attempt = 1;
    let created = loop {
        let to_create = {
            let existing_titles: HashSet<&str> =
                existing.iter().map(|c| c.title.as_str()).collect();
            missing_titles(referenced, &existing_titles)
        };
        if to_create.is_empty() {
            break Vec::new();
        }

        debug!(count = to_create.len(), attempt, "creating categories");
        let new_categories = store.create_categories(to_create.clone());

        match store.save_categories(new_categories).await {
            Ok(created) => break created,
            Err(err) if err.is_conflict() && attempt < MAX_CREATE_ATTEMPTS => {
                warn!(error = %err, attempt, "category created concurrently, refetching");
                attempt += 1;

                let pending: BTreeSet<String> = to_create.into_iter().collect();
                let raced = store
                    .find_categories_by_title_in(&pending)
                    .await
                    .map_err(|source| ImportError::Persistence {
                        context: "refetching categories",
                        source,
                    })?;
                existing.extend(raced);
            }
            Err(source) => {
                return Err(ImportError::Persistence {
                    context: "saving categories",
                    source,
                })
            }
        }
    };

    let mut pool = CategoryPool::default();
    for category in created.iter().cloned().chain(existing) {
        pool.insert(category);
    }

    Ok(Reconciliation { pool, created })
}
