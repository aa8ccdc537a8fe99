use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// User role for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Role {
    Regular,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Regular => "Regular",
            Role::Admin => "Admin",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "Admin" => Role::Admin,
            _ => Role::Regular,
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub refresh_token: Option<String>,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    refresh_token: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role: Role::from_str(&row.role),
            refresh_token: row.refresh_token,
        }
    }
}

/// Public user view. Never exposes hashes or tokens.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct UserSummary {
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            email: user.email,
            role: user.role,
        }
    }
}

/// Fields of a user to be created.
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
}

const USER_COLUMNS: &str = "id, username, email, password_hash, role, refresh_token";

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a user. Returns the user ID.
    pub async fn create(&self, user: &NewUser<'_>) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash, role) VALUES (?, ?, ?, ?)",
        )
        .bind(user.username)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.role.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Whether the username or the email is already taken.
    pub async fn is_taken(&self, username: &str, email: &str) -> Result<bool, sqlx::Error> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ? OR email = ?")
                .bind(username)
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.0 > 0)
    }

    /// Get a user by username.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        self.fetch_one_where("username = ?", username).await
    }

    /// Get a user by email.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        self.fetch_one_where("email = ?", email).await
    }

    /// Get the user currently holding the given refresh token.
    pub async fn get_by_refresh_token(&self, token: &str) -> Result<Option<User>, sqlx::Error> {
        self.fetch_one_where("refresh_token = ?", token).await
    }

    async fn fetch_one_where(
        &self,
        condition: &str,
        value: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let sql = format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, condition);
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    /// Store (or clear) the refresh token issued at login.
    pub async fn set_refresh_token(
        &self,
        id: i64,
        token: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET refresh_token = ? WHERE id = ?")
            .bind(token)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List all users, oldest first.
    pub async fn list(&self) -> Result<Vec<UserSummary>, sqlx::Error> {
        let sql = format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS);
        let rows: Vec<UserRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|row| UserSummary::from(User::from(row)))
            .collect())
    }

    /// Usernames of the users with the given emails. Unknown emails are skipped.
    pub async fn usernames_for_emails(&self, emails: &[String]) -> Result<Vec<String>, sqlx::Error> {
        if emails.is_empty() {
            return Ok(Vec::new());
        }
        let mut query = sqlx::QueryBuilder::<sqlx::Sqlite>::new(
            "SELECT username FROM users WHERE email IN (",
        );
        let mut separated = query.separated(", ");
        for email in emails {
            separated.push_bind(email.clone());
        }
        separated.push_unseparated(") ORDER BY id");

        let rows: Vec<(String,)> = query.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(username,)| username).collect())
    }
}
