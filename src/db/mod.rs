mod category;
mod group;
mod transaction;
mod user;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

pub use category::{Category, CategoryStore};
pub use group::{Group, GroupStore};
pub use transaction::{NewTransaction, Transaction, TransactionQuery, TransactionStore};
pub use user::{NewUser, Role, User, UserStore, UserSummary};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open or create a database at the given path.
    /// Use ":memory:" for an in-memory database.
    pub async fn open(path: &str) -> Result<Self, sqlx::Error> {
        let url = if path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{}?mode=rwc", path)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub fn users(&self) -> UserStore {
        UserStore::new(self.pool.clone())
    }

    pub fn categories(&self) -> CategoryStore {
        CategoryStore::new(self.pool.clone())
    }

    pub fn transactions(&self) -> TransactionStore {
        TransactionStore::new(self.pool.clone())
    }

    pub fn groups(&self) -> GroupStore {
        GroupStore::new(self.pool.clone())
    }

    /// Get the current schema version.
    async fn get_version(&self) -> Result<i32, sqlx::Error> {
        let result: Option<(i32,)> = sqlx::query_as("SELECT version FROM schema_version LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(result.map(|r| r.0).unwrap_or(0))
    }

    /// Set the schema version within a transaction.
    async fn set_version(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        version: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM schema_version")
            .execute(&mut **tx)
            .await?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
            .bind(version)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Run database migrations.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
            .execute(&self.pool)
            .await?;

        let version = self.get_version().await?;

        if version < 1 {
            self.migrate_v1().await?;
        }

        Ok(())
    }

    /// Execute a list of queries in a transaction, then set the version.
    async fn run_migration(
        &self,
        version: i32,
        queries: &[&'static str],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for query in queries {
            sqlx::query(*query).execute(&mut *tx).await?;
        }
        Self::set_version(&mut tx, version).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn migrate_v1(&self) -> Result<(), sqlx::Error> {
        self.run_migration(
            1,
            &[
                "CREATE TABLE users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    username TEXT UNIQUE NOT NULL,
                    email TEXT UNIQUE NOT NULL,
                    password_hash TEXT NOT NULL,
                    role TEXT NOT NULL DEFAULT 'Regular',
                    refresh_token TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_users_refresh_token ON users(refresh_token)",
                // Category `type` is the name transactions refer to
                "CREATE TABLE categories (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    type TEXT UNIQUE NOT NULL,
                    color TEXT NOT NULL
                )",
                // Dates are Unix milliseconds (UTC)
                "CREATE TABLE transactions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT UNIQUE NOT NULL,
                    username TEXT NOT NULL,
                    amount REAL NOT NULL,
                    type TEXT NOT NULL,
                    date_ms INTEGER NOT NULL
                )",
                "CREATE INDEX idx_transactions_username ON transactions(username)",
                "CREATE INDEX idx_transactions_date ON transactions(date_ms)",
                "CREATE TABLE groups (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT UNIQUE NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                // A user belongs to at most one group
                "CREATE TABLE group_members (
                    group_id INTEGER NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
                    email TEXT UNIQUE NOT NULL
                )",
                "CREATE INDEX idx_group_members_group_id ON group_members(group_id)",
            ],
        )
        .await
    }
}
