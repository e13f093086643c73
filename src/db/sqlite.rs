use crate::db::models::{
    ConnectionChanges, DbErpConnection, DbUser, NewErpConnection, NewUser, PublicUser,
    UserChanges, UserRole,
};
use crate::db::schema::SQLITE_INIT;
use crate::error::BridgeError;
use backon::{ExponentialBuilder, Retryable};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

pub type SqlitePool = Pool<Sqlite>;

const USER_COLUMNS: &str = "id, email, password_hash, role, created_at";
const CONNECTION_COLUMNS: &str =
    "id, user_id, erp_domain, encrypted_api_key, encrypted_api_secret, created_at";

#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the pool (5 attempts, growing delay) and apply the schema.
    pub async fn connect(database_url: &str) -> Result<Self, BridgeError> {
        let opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let policy = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(500))
            .with_max_delay(Duration::from_secs(4))
            .with_max_times(4);

        let pool = (|| async { SqlitePoolOptions::new().connect_with(opts.clone()).await })
            .retry(policy)
            .notify(|err, dur: Duration| {
                warn!(error = %err, "database connection failed, retrying in {:?}", dur);
            })
            .await?;
        info!("database connection established");

        let storage = Self::new(pool);
        storage.init_schema().await?;
        Ok(storage)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), BridgeError> {
        // execute multiple statements one by one (sqlx::query runs a single statement)
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), BridgeError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<DbUser>, BridgeError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_user).transpose()
    }

    pub async fn find_user(&self, id: &str) -> Result<Option<PublicUser>, BridgeError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Self::row_to_user).transpose()?.map(PublicUser::from))
    }

    /// Insert a user, and its ERP connection when given, in one transaction.
    /// Returns the new user id.
    pub async fn create_user(
        &self,
        user: NewUser,
        connection: Option<NewErpConnection>,
    ) -> Result<String, BridgeError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO users (id, email, password_hash, role, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        if let Some(conn) = connection {
            sqlx::query(
                r#"INSERT INTO erp_connections (
                    user_id, erp_domain, encrypted_api_key, encrypted_api_secret, created_at
                ) VALUES (?, ?, ?, ?, ?)"#,
            )
            .bind(&id)
            .bind(conn.erp_domain)
            .bind(conn.encrypted_api_key)
            .bind(conn.encrypted_api_secret)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    /// Apply a partial update. Returns `false` when no such user exists.
    pub async fn update_user(&self, id: &str, changes: UserChanges) -> Result<bool, BridgeError> {
        if changes.is_empty() {
            return Ok(self.find_user(id).await?.is_some());
        }
        let result = sqlx::query(
            r#"UPDATE users SET
                email = COALESCE(?, email),
                password_hash = COALESCE(?, password_hash),
                role = COALESCE(?, role)
              WHERE id = ?"#,
        )
        .bind(changes.email)
        .bind(changes.password_hash)
        .bind(changes.role.map(|r| r.as_str()))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;
        Ok(result.rows_affected() > 0)
    }

    /// Page is 1-based. `search` matches a case-insensitive email substring.
    pub async fn list_users(
        &self,
        page: u32,
        limit: u32,
        search: Option<&str>,
    ) -> Result<Vec<PublicUser>, BridgeError> {
        let offset = i64::from(page.max(1) - 1) * i64::from(limit);
        let rows = match search.filter(|s| !s.is_empty()) {
            Some(term) => {
                sqlx::query(&format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE email LIKE '%' || ? || '%' \
                     ORDER BY created_at LIMIT ? OFFSET ?"
                ))
                .bind(term)
                .bind(i64::from(limit))
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {USER_COLUMNS} FROM users ORDER BY created_at LIMIT ? OFFSET ?"
                ))
                .bind(i64::from(limit))
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.into_iter()
            .map(|row| Self::row_to_user(row).map(PublicUser::from))
            .collect()
    }

    pub async fn find_connection(
        &self,
        user_id: &str,
    ) -> Result<Option<DbErpConnection>, BridgeError> {
        let row = sqlx::query(&format!(
            "SELECT {CONNECTION_COLUMNS} FROM erp_connections WHERE user_id = ? LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_connection).transpose()
    }

    /// Upsert by unique user_id.
    pub async fn upsert_connection(
        &self,
        user_id: &str,
        conn: NewErpConnection,
    ) -> Result<(), BridgeError> {
        sqlx::query(
            r#"
            INSERT INTO erp_connections (
                user_id, erp_domain, encrypted_api_key, encrypted_api_secret, created_at
            ) VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                erp_domain=excluded.erp_domain,
                encrypted_api_key=excluded.encrypted_api_key,
                encrypted_api_secret=excluded.encrypted_api_secret
            "#,
        )
        .bind(user_id)
        .bind(conn.erp_domain)
        .bind(conn.encrypted_api_key)
        .bind(conn.encrypted_api_secret)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Partial update of an existing connection. Returns `false` if the user
    /// has none.
    pub async fn update_connection(
        &self,
        user_id: &str,
        changes: ConnectionChanges,
    ) -> Result<bool, BridgeError> {
        let result = sqlx::query(
            r#"UPDATE erp_connections SET
                erp_domain = COALESCE(?, erp_domain),
                encrypted_api_key = COALESCE(?, encrypted_api_key),
                encrypted_api_secret = COALESCE(?, encrypted_api_secret)
              WHERE user_id = ?"#,
        )
        .bind(changes.erp_domain)
        .bind(changes.encrypted_api_key)
        .bind(changes.encrypted_api_secret)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    fn row_to_user(row: SqliteRow) -> Result<DbUser, BridgeError> {
        let role_str: String = row.try_get("role")?;
        let role = UserRole::from_str(&role_str)
            .map_err(|e| sqlx::Error::Decode(e.into()))?;
        let created_at: String = row.try_get("created_at")?;

        Ok(DbUser {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role,
            created_at: parse_timestamp(&created_at)?,
        })
    }

    fn row_to_connection(row: SqliteRow) -> Result<DbErpConnection, BridgeError> {
        let created_at: String = row.try_get("created_at")?;
        Ok(DbErpConnection {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            erp_domain: row.try_get("erp_domain")?,
            encrypted_api_key: row.try_get("encrypted_api_key")?,
            encrypted_api_secret: row.try_get("encrypted_api_secret")?,
            created_at: parse_timestamp(&created_at)?,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, BridgeError> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?
        .with_timezone(&Utc))
}

fn map_unique_violation(err: sqlx::Error) -> BridgeError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            BridgeError::Conflict("User already exists".to_string())
        }
        _ => BridgeError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn storage() -> (Storage, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("test.sqlite").display());
        (Storage::connect(&url).await.unwrap(), dir)
    }

    fn user(email: &str, role: UserRole) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role,
        }
    }

    fn connection(domain: &str) -> NewErpConnection {
        NewErpConnection {
            erp_domain: domain.to_string(),
            encrypted_api_key: "k".to_string(),
            encrypted_api_secret: "s".to_string(),
        }
    }

    #[tokio::test]
    async fn create_and_find_user() {
        let (db, _dir) = storage().await;
        let id = db
            .create_user(user("a@example.com", UserRole::Admin), None)
            .await
            .unwrap();

        let found = db.find_user(&id).await.unwrap().unwrap();
        assert_eq!(found.email, "a@example.com");
        assert_eq!(found.role, UserRole::Admin);

        let by_email = db.find_user_by_email("a@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, id);
        assert!(db.find_connection(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict() {
        let (db, _dir) = storage().await;
        db.create_user(user("dup@example.com", UserRole::Client), None)
            .await
            .unwrap();
        let err = db
            .create_user(user("dup@example.com", UserRole::Client), None)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Conflict(_)));
    }

    #[tokio::test]
    async fn connection_is_stored_with_user() {
        let (db, _dir) = storage().await;
        let id = db
            .create_user(
                user("c@example.com", UserRole::Client),
                Some(connection("erp.example.com")),
            )
            .await
            .unwrap();
        let conn = db.find_connection(&id).await.unwrap().unwrap();
        assert_eq!(conn.erp_domain, "erp.example.com");
        assert_eq!(conn.user_id, id);
    }

    #[tokio::test]
    async fn partial_updates_keep_other_columns() {
        let (db, _dir) = storage().await;
        let id = db
            .create_user(
                user("p@example.com", UserRole::Client),
                Some(connection("old.example.com")),
            )
            .await
            .unwrap();

        let changed = db
            .update_user(
                &id,
                UserChanges {
                    role: Some(UserRole::Admin),
                    ..UserChanges::default()
                },
            )
            .await
            .unwrap();
        assert!(changed);
        let u = db.find_user(&id).await.unwrap().unwrap();
        assert_eq!(u.email, "p@example.com");
        assert_eq!(u.role, UserRole::Admin);

        db.update_connection(
            &id,
            ConnectionChanges {
                erp_domain: Some("new.example.com".into()),
                ..ConnectionChanges::default()
            },
        )
        .await
        .unwrap();
        let conn = db.find_connection(&id).await.unwrap().unwrap();
        assert_eq!(conn.erp_domain, "new.example.com");
        assert_eq!(conn.encrypted_api_key, "k");
    }

    #[tokio::test]
    async fn update_missing_user_reports_false() {
        let (db, _dir) = storage().await;
        let changed = db
            .update_user(
                "missing",
                UserChanges {
                    email: Some("x@example.com".into()),
                    ..UserChanges::default()
                },
            )
            .await
            .unwrap();
        assert!(!changed);
    }

    #[tokio::test]
    async fn list_users_paginates_and_searches() {
        let (db, _dir) = storage().await;
        for i in 0..5 {
            db.create_user(user(&format!("user{i}@shop.com"), UserRole::Client), None)
                .await
                .unwrap();
        }
        db.create_user(user("boss@corp.com", UserRole::Admin), None)
            .await
            .unwrap();

        assert_eq!(db.list_users(1, 4, None).await.unwrap().len(), 4);
        assert_eq!(db.list_users(2, 4, None).await.unwrap().len(), 2);

        let found = db.list_users(1, 10, Some("CORP")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].email, "boss@corp.com");
    }

    #[tokio::test]
    async fn upsert_replaces_existing_connection() {
        let (db, _dir) = storage().await;
        let id = db
            .create_user(user("u@example.com", UserRole::Client), None)
            .await
            .unwrap();
        db.upsert_connection(&id, connection("one.example.com"))
            .await
            .unwrap();
        db.upsert_connection(&id, connection("two.example.com"))
            .await
            .unwrap();
        let conn = db.find_connection(&id).await.unwrap().unwrap();
        assert_eq!(conn.erp_domain, "two.example.com");
    }
}
