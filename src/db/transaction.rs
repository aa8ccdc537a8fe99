//! Transaction storage and filtered listing.
//!
//! Listing takes the predicates built by [`crate::filters`] as-is and turns
//! their inclusive bounds into SQL conditions.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::{QueryBuilder, Sqlite};

use crate::filters::{AmountFilter, DateFilter};

#[derive(Clone)]
pub struct TransactionStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Transaction {
    pub id: String,
    pub username: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub date: DateTime<Utc>,
    /// Color of the transaction's category, if the category still exists.
    pub color: Option<String>,
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    uuid: String,
    username: String,
    amount: f64,
    #[sqlx(rename = "type")]
    kind: String,
    date_ms: i64,
    color: Option<String>,
}

impl From<TransactionRow> for Transaction {
    fn from(row: TransactionRow) -> Self {
        Self {
            id: row.uuid,
            username: row.username,
            amount: row.amount,
            kind: row.kind,
            date: DateTime::from_timestamp_millis(row.date_ms).unwrap_or_default(),
            color: row.color,
        }
    }
}

pub struct NewTransaction<'a> {
    pub username: &'a str,
    pub amount: f64,
    pub kind: &'a str,
    pub date: DateTime<Utc>,
}

/// Which transactions to list. Empty fields do not constrain the result.
#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    /// Restrict to these owners. `Some(vec![])` matches nothing.
    pub usernames: Option<Vec<String>>,
    pub kind: Option<String>,
    pub date: DateFilter,
    pub amount: AmountFilter,
}

impl TransactionQuery {
    pub fn for_user(username: &str) -> Self {
        Self {
            usernames: Some(vec![username.to_string()]),
            ..Self::default()
        }
    }
}

impl TransactionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a transaction and return it as stored.
    pub async fn create(&self, new: &NewTransaction<'_>) -> Result<Transaction, sqlx::Error> {
        let uuid = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO transactions (uuid, username, amount, type, date_ms) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&uuid)
        .bind(new.username)
        .bind(new.amount)
        .bind(new.kind)
        .bind(new.date.timestamp_millis())
        .execute(&self.pool)
        .await?;

        self.get(&uuid)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get(&self, uuid: &str) -> Result<Option<Transaction>, sqlx::Error> {
        let mut query = Self::select();
        query.push(" AND t.uuid = ").push_bind(uuid.to_string());
        let row: Option<TransactionRow> = query.build_query_as().fetch_optional(&self.pool).await?;
        Ok(row.map(Transaction::from))
    }

    /// List transactions matching `filter`, oldest first.
    pub async fn list(&self, filter: &TransactionQuery) -> Result<Vec<Transaction>, sqlx::Error> {
        let mut query = Self::select();

        if let Some(usernames) = &filter.usernames {
            if usernames.is_empty() {
                return Ok(Vec::new());
            }
            query.push(" AND t.username IN (");
            let mut separated = query.separated(", ");
            for username in usernames {
                separated.push_bind(username.clone());
            }
            separated.push_unseparated(")");
        }

        if let Some(kind) = &filter.kind {
            query.push(" AND t.type = ").push_bind(kind.clone());
        }

        if let Some(range) = &filter.date.date {
            if let Some(gte) = range.gte {
                query.push(" AND t.date_ms >= ").push_bind(gte.timestamp_millis());
            }
            if let Some(lte) = range.lte {
                query.push(" AND t.date_ms <= ").push_bind(lte.timestamp_millis());
            }
        }

        if let Some(range) = &filter.amount.amount {
            if let Some(gte) = range.gte {
                query.push(" AND t.amount >= ").push_bind(gte);
            }
            if let Some(lte) = range.lte {
                query.push(" AND t.amount <= ").push_bind(lte);
            }
        }

        query.push(" ORDER BY t.date_ms, t.id");

        let rows: Vec<TransactionRow> = query.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Transaction::from).collect())
    }

    /// Delete one of `username`'s transactions.
    pub async fn delete(&self, username: &str, uuid: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM transactions WHERE uuid = ? AND username = ?")
            .bind(uuid)
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    fn select() -> QueryBuilder<'static, Sqlite> {
        QueryBuilder::new(
            "SELECT t.uuid, t.username, t.amount, t.type, t.date_ms, c.color \
             FROM transactions t LEFT JOIN categories c ON c.type = t.type WHERE 1 = 1",
        )
    }
}
