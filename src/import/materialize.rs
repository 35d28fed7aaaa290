use super::reconcile::CategoryPool;
use crate::error::ImportError;
use crate::store::Store;
use crate::transaction::{NewTransaction, TransactionCandidate};

/// Binds each candidate to its category from the pool.
pub fn materialize<S: Store>(
    store: &S,
    candidates: Vec<TransactionCandidate>,
    pool: &CategoryPool,
) -> Result<Vec<NewTransaction>, ImportError> {
    let bound = candidates
        .into_iter()
        .map(|candidate| match pool.get(&candidate.category).cloned() {
            Some(category) => Ok((candidate, category)),
            None => Err(ImportError::UnresolvedCategory {
                title: candidate.category,
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(store.create_transactions(bound))
}
