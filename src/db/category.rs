use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct CategoryStore {
    pool: SqlitePool,
}

/// Expense category. `kind` is the category's name and is what transactions reference.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, sqlx::FromRow)]
pub struct Category {
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
    pub color: String,
}

impl CategoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a category. Returns false if the type already exists.
    pub async fn create(&self, kind: &str, color: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("INSERT OR IGNORE INTO categories (type, color) VALUES (?, ?)")
            .bind(kind)
            .bind(color)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get(&self, kind: &str) -> Result<Option<Category>, sqlx::Error> {
        sqlx::query_as("SELECT type, color FROM categories WHERE type = ?")
            .bind(kind)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn list(&self) -> Result<Vec<Category>, sqlx::Error> {
        sqlx::query_as("SELECT type, color FROM categories ORDER BY id")
            .fetch_all(&self.pool)
            .await
    }
}
