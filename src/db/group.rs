use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct GroupStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Group {
    pub name: String,
    /// Member emails in insertion order.
    pub members: Vec<String>,
}

impl GroupStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a group with its initial members in one transaction.
    pub async fn create(&self, name: &str, emails: &[String]) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("INSERT INTO groups (name) VALUES (?)")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        let group_id = result.last_insert_rowid();
        for email in emails {
            sqlx::query("INSERT INTO group_members (group_id, email) VALUES (?, ?)")
                .bind(group_id)
                .bind(email)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(group_id)
    }

    pub async fn exists(&self, name: &str) -> Result<bool, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM groups WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0 > 0)
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<Group>, sqlx::Error> {
        let group: Option<(i64, String)> =
            sqlx::query_as("SELECT id, name FROM groups WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        match group {
            Some((id, name)) => Ok(Some(Group {
                name,
                members: self.members(id).await?,
            })),
            None => Ok(None),
        }
    }

    /// Name of the group `email` belongs to, if any.
    pub async fn group_of(&self, email: &str) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT g.name FROM groups g JOIN group_members m ON m.group_id = g.id WHERE m.email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(name,)| name))
    }

    pub async fn list(&self) -> Result<Vec<Group>, sqlx::Error> {
        let groups: Vec<(i64, String)> = sqlx::query_as("SELECT id, name FROM groups ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        let mut result = Vec::with_capacity(groups.len());
        for (id, name) in groups {
            result.push(Group {
                name,
                members: self.members(id).await?,
            });
        }
        Ok(result)
    }

    async fn members(&self, group_id: i64) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT email FROM group_members WHERE group_id = ? ORDER BY rowid")
                .bind(group_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(email,)| email).collect())
    }
}
