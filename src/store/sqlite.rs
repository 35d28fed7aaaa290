use super::Store;
use crate::category::{Category, NewCategory};
use crate::error::StoreError;
use crate::transaction::{NewTransaction, Transaction};

use anyhow::{anyhow, Context};
use rusqlite::{params, params_from_iter, Connection, ErrorCode};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// SQLite-backed catalog. The UNIQUE index on `categories.title` is what
/// keeps concurrent imports from creating the same title twice.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("opening database {}", path.display()))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> anyhow::Result<Self> {
        setup_database(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn categories(&self) -> Result<Vec<Category>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, title FROM categories ORDER BY id")
            .map_err(backend)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    title: row.get(1)?,
                })
            })
            .map_err(backend)?;

        rows.collect::<Result<_, _>>().map_err(backend)
    }

    pub fn transaction_count(&self) -> Result<i64, StoreError> {
        self.lock()?
            .query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))
            .map_err(backend)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        lock(&self.conn)
    }

    /// Runs `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = lock(&conn)?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Backend(e.into()))?
    }
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, StoreError> {
    conn.lock()
        .map_err(|_| StoreError::Backend(anyhow!("sqlite connection lock poisoned")))
}

fn setup_database(conn: &Connection) -> anyhow::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL UNIQUE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            type TEXT NOT NULL CHECK (type IN ('income', 'outcome')),
            value TEXT NOT NULL,
            category_id INTEGER NOT NULL REFERENCES categories(id),
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    Ok(())
}

fn backend(err: rusqlite::Error) -> StoreError {
    StoreError::Backend(err.into())
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

impl Store for SqliteStore {
    async fn find_categories_by_title_in(
        &self,
        titles: &BTreeSet<String>,
    ) -> Result<Vec<Category>, StoreError> {
        if titles.is_empty() {
            return Ok(Vec::new());
        }

        let titles: Vec<String> = titles.iter().cloned().collect();
        self.with_conn(move |conn| {
            let placeholders = vec!["?"; titles.len()].join(", ");
            let sql = format!("SELECT id, title FROM categories WHERE title IN ({placeholders})");

            let mut stmt = conn.prepare(&sql).map_err(backend)?;
            let rows = stmt
                .query_map(params_from_iter(titles.iter()), |row| {
                    Ok(Category {
                        id: row.get(0)?,
                        title: row.get(1)?,
                    })
                })
                .map_err(backend)?;

            rows.collect::<Result<_, _>>().map_err(backend)
        })
        .await
    }

    async fn save_categories(
        &self,
        categories: Vec<NewCategory>,
    ) -> Result<Vec<Category>, StoreError> {
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(backend)?;

            let mut saved = Vec::with_capacity(categories.len());
            for category in categories {
                let inserted = tx.execute(
                    "INSERT INTO categories (title) VALUES (?1)",
                    params![category.title],
                );
                match inserted {
                    Ok(_) => {
                        let id = tx.last_insert_rowid();
                        saved.push(category.into_saved(id));
                    }
                    // Dropping `tx` rolls back the rows inserted so far
                    Err(e) if is_constraint_violation(&e) => {
                        return Err(StoreError::Conflict {
                            title: category.title,
                        });
                    }
                    Err(e) => return Err(backend(e)),
                }
            }

            tx.commit().map_err(backend)?;
            debug!(count = saved.len(), "saved categories");

            Ok(saved)
        })
        .await
    }

    async fn save_transactions(
        &self,
        transactions: Vec<NewTransaction>,
    ) -> Result<Vec<Transaction>, StoreError> {
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(backend)?;

            let mut saved = Vec::with_capacity(transactions.len());
            for new_tx in transactions {
                let inserted = tx.execute(
                    "INSERT INTO transactions (title, type, value, category_id)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        new_tx.title,
                        new_tx.kind.as_str(),
                        new_tx.amount.to_string(),
                        new_tx.category.id,
                    ],
                );
                match inserted {
                    Ok(_) => {
                        let id = tx.last_insert_rowid();
                        saved.push(new_tx.into_saved(id));
                    }
                    Err(e) if is_constraint_violation(&e) => {
                        return Err(StoreError::MissingCategory(new_tx.category.id));
                    }
                    Err(e) => return Err(backend(e)),
                }
            }

            tx.commit().map_err(backend)?;
            debug!(count = saved.len(), "saved transactions");

            Ok(saved)
        })
        .await
    }
}
