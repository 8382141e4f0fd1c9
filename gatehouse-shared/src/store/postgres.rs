/// PostgreSQL store
///
/// Accounts and profiles are read with a single join and written in one
/// transaction. Unique violations are reported as [`StoreError::Conflict`]
/// based on the constraint name.
///
/// # Example
///
/// ```no_run
/// use gatehouse_shared::db::pool::{create_pool, DatabaseConfig};
/// use gatehouse_shared::store::{postgres::PgStore, AccountRepository};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let store = PgStore::new(pool);
///
/// let demo = store.find_by_login("demo").await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{AccountRepository, SessionRepository, StoreError};
use crate::models::{account::Account, session::SessionRecord};

const ACCOUNT_COLUMNS: &str = r#"
    a.id, a.username, a.email, a.password_hash, a.role, a.status,
    a.activation_key, a.created_time,
    p.first_name, p.last_name, p.gender, p.dob, p.phone, p.bio, p.url
"#;

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let field = match db_err.constraint() {
                    Some("accounts_username_key") => "username",
                    Some("accounts_email_key") => "email",
                    Some("accounts_pkey") => "id",
                    _ => "token_hash",
                };
                return StoreError::Conflict { field };
            }
        }
        StoreError::Database(err.to_string())
    }
}

/// sqlx-backed account and session store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_account(&self, filter: &str, binds: &[&str]) -> Result<Option<Account>, StoreError> {
        let sql = format!(
            "SELECT {} FROM accounts a JOIN account_profiles p ON p.account_id = a.id WHERE {} LIMIT 1",
            ACCOUNT_COLUMNS, filter
        );

        let mut query = sqlx::query_as::<_, Account>(&sql);
        for value in binds {
            query = query.bind(*value);
        }

        Ok(query.fetch_optional(&self.pool).await?)
    }
}

#[async_trait]
impl AccountRepository for PgStore {
    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO accounts
                (id, username, email, password_hash, role, status, activation_key, created_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(account.id)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.role)
        .bind(account.status)
        .bind(&account.activation_key)
        .bind(account.created_time)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO account_profiles
                (account_id, first_name, last_name, gender, dob, phone, bio, url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(account.id)
        .bind(&account.profile.first_name)
        .bind(&account.profile.last_name)
        .bind(&account.profile.gender)
        .bind(account.profile.dob)
        .bind(&account.profile.phone)
        .bind(&account.profile.bio)
        .bind(&account.profile.url)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn update_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE accounts
            SET username = $2,
                email = $3,
                password_hash = $4,
                role = $5,
                status = $6,
                activation_key = $7
            WHERE id = $1
            "#,
        )
        .bind(account.id)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.role)
        .bind(account.status)
        .bind(&account.activation_key)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        sqlx::query(
            r#"
            UPDATE account_profiles
            SET first_name = $2,
                last_name = $3,
                gender = $4,
                dob = $5,
                phone = $6,
                bio = $7,
                url = $8
            WHERE account_id = $1
            "#,
        )
        .bind(account.id)
        .bind(&account.profile.first_name)
        .bind(&account.profile.last_name)
        .bind(&account.profile.gender)
        .bind(account.profile.dob)
        .bind(&account.profile.phone)
        .bind(&account.profile.bio)
        .bind(&account.profile.url)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let sql = format!(
            "SELECT {} FROM accounts a JOIN account_profiles p ON p.account_id = a.id WHERE a.id = $1",
            ACCOUNT_COLUMNS
        );

        Ok(sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        self.fetch_account("a.username = $1", &[username]).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        self.fetch_account("LOWER(a.email) = LOWER($1)", &[email]).await
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<Account>, StoreError> {
        // A username match wins over an email match
        self.fetch_account(
            "a.username = $1 OR LOWER(a.email) = LOWER($1) ORDER BY (a.username = $1) DESC",
            &[login],
        )
        .await
    }

    async fn find_by_activation(&self, email: &str, key: &str) -> Result<Option<Account>, StoreError> {
        self.fetch_account(
            "LOWER(a.email) = LOWER($1) AND a.activation_key = $2",
            &[email, key],
        )
        .await
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let sql = format!(
            "SELECT {} FROM accounts a JOIN account_profiles p ON p.account_id = a.id \
             ORDER BY a.created_time ASC, a.username ASC",
            ACCOUNT_COLUMNS
        );

        Ok(sqlx::query_as::<_, Account>(&sql).fetch_all(&self.pool).await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(crate::db::pool::health_check(&self.pool).await?)
    }
}

#[async_trait]
impl SessionRepository for PgStore {
    async fn insert_session(&self, session: &SessionRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, account_id, token_hash, created_at, fresh_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(session.id)
        .bind(session.account_id)
        .bind(&session.token_hash)
        .bind(session.created_at)
        .bind(session.fresh_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<SessionRecord>, StoreError> {
        Ok(sqlx::query_as::<_, SessionRecord>(
            r#"
            SELECT id, account_id, token_hash, created_at, fresh_at, expires_at
            FROM sessions
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn refresh_session(&self, session_id: Uuid, fresh_at: DateTime<Utc>) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE sessions SET fresh_at = $2 WHERE id = $1")
            .bind(session_id)
            .bind(fresh_at)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_session(&self, session_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_account_sessions(&self, account_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM sessions WHERE account_id = $1")
            .bind(account_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
