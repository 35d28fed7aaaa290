pub mod materialize;
pub mod reconcile;
pub mod validate;

#[cfg(test)]
mod unit_tests;

pub use reconcile::{CategoryPool, Reconciliation};
pub use validate::{ParsedFile, SkippedRow};

use crate::category::Category;
use crate::config::ImportConfig;
use crate::error::{CleanupWarning, ImportError};
use crate::store::Store;
use crate::stream_rows;
use crate::transaction::Transaction;

use std::fmt;
use std::io;
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Opened,
    Parsing,
    Reconciling,
    Persisting,
    Cleanup,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Opened => "opened",
            Stage::Parsing => "parsing",
            Stage::Reconciling => "reconciling",
            Stage::Persisting => "persisting",
            Stage::Cleanup => "cleanup",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct ImportReport {
    pub transactions: Vec<Transaction>,
    pub created_categories: Vec<Category>,
    pub skipped_rows: Vec<SkippedRow>,
    /// Set when the source file could not be removed after commit.
    pub cleanup_warning: Option<CleanupWarning>,
}

/// Imports transaction files into a store, one file per call.
pub struct Importer<S> {
    store: S,
    config: ImportConfig,
}

impl<S: Store> Importer<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, ImportConfig::default())
    }

    pub fn with_config(store: S, config: ImportConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Imports `path` and returns the persisted transactions. The file is
    /// deleted only once the transactions are committed.
    pub async fn execute(&self, path: impl AsRef<Path>) -> Result<Vec<Transaction>, ImportError> {
        Ok(self.import(path).await?.transactions)
    }

    /// Like [`Importer::execute`], with skipped rows, created categories and
    /// any cleanup failure reported alongside.
    pub async fn import(&self, path: impl AsRef<Path>) -> Result<ImportReport, ImportError> {
        self.run(path.as_ref()).await
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    async fn run(&self, path: &Path) -> Result<ImportReport, ImportError> {
        let mut stage = Stage::Opened;
        match self.run_stages(path, &mut stage).await {
            Ok(report) => Ok(report),
            Err(err) => {
                error!(%stage, error = %err, "import failed");
                Err(err)
            }
        }
    }

    async fn run_stages(&self, path: &Path, stage: &mut Stage) -> Result<ImportReport, ImportError> {
        let file = open_source(path).await?;

        enter(stage, Stage::Parsing);
        let config = self.config;
        let parsed =
            tokio::task::spawn_blocking(move || validate::drain_rows(stream_rows(file, &config)))
                .await??;

        enter(stage, Stage::Reconciling);
        let Reconciliation { pool, created } =
            reconcile::reconcile(&self.store, &parsed.category_titles).await?;

        enter(stage, Stage::Persisting);
        let new_transactions = materialize::materialize(&self.store, parsed.candidates, &pool)?;
        let transactions = self
            .store
            .save_transactions(new_transactions)
            .await
            .map_err(|source| ImportError::Persistence {
                context: "saving transactions",
                source,
            })?;

        enter(stage, Stage::Cleanup);
        let cleanup_warning = match tokio::fs::remove_file(path).await {
            Ok(()) => None,
            Err(source) => {
                warn!(error = %source, "could not remove imported file");
                Some(CleanupWarning {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        enter(stage, Stage::Done);
        info!(
            imported = transactions.len(),
            created_categories = created.len(),
            skipped_rows = parsed.skipped.len(),
            "import complete"
        );

        Ok(ImportReport {
            transactions,
            created_categories: created,
            skipped_rows: parsed.skipped,
            cleanup_warning,
        })
    }
}

fn enter(stage: &mut Stage, next: Stage) {
    debug!(from = %stage, to = %next, "stage");
    *stage = next;
}

async fn open_source(path: &Path) -> Result<std::fs::File, ImportError> {
    let unreadable = |source: io::Error| ImportError::SourceUnreadable {
        path: path.to_path_buf(),
        source,
    };

    let file = tokio::fs::File::open(path).await.map_err(unreadable)?;
    let metadata = file.metadata().await.map_err(unreadable)?;
    if !metadata.is_file() {
        return Err(unreadable(io::Error::other("not a regular file")));
    }

    Ok(file.into_std().await)
}
