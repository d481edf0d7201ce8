use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use joss_shared::clients::db::DbPool;

use super::{AccountStore, PhotoStore, StoreError, StoreResult, UniqueField};
use crate::models::{Account, AccountChanges, NewAccount, NewPhoto, Photo};
use crate::schema::{accounts, photos};

/// diesel is synchronous: every call runs on the blocking pool and is
/// abandoned after `timeout`. Abandoning does not stop the blocking task; the
/// pool's `statement_timeout` has Postgres cancel the statement instead, but a
/// write that already reached commit can still land after the caller saw
/// [`StoreError::Timeout`].
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
    timeout: Duration,
}

impl PgStore {
    pub fn new(pool: DbPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn run<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> Result<T, DieselError> + Send + 'static,
    {
        let pool = self.pool.clone();
        let task = tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| StoreError::Unavailable(format!("pool: {e}")))?;
            f(&mut conn).map_err(map_diesel_error)
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(StoreError::Unavailable(format!("store task failed: {join}"))),
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        }
    }
}

fn map_diesel_error(err: DieselError) -> StoreError {
    match &err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            match info.constraint_name() {
                Some("accounts_username_key") => StoreError::Conflict(UniqueField::Username),
                Some("accounts_email_key") => StoreError::Conflict(UniqueField::Email),
                Some("accounts_google_id_key") => StoreError::Conflict(UniqueField::ExternalId),
                _ => StoreError::Unavailable(err.to_string()),
            }
        }
        _ => StoreError::Unavailable(err.to_string()),
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn insert_account(&self, account: NewAccount) -> StoreResult<Account> {
        self.run(move |conn| {
            diesel::insert_into(accounts::table)
                .values(&account)
                .returning(Account::as_returning())
                .get_result(conn)
        })
        .await
    }

    async fn find_account(&self, id: Uuid) -> StoreResult<Option<Account>> {
        self.run(move |conn| {
            accounts::table
                .find(id)
                .select(Account::as_select())
                .first(conn)
                .optional()
        })
        .await
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let email = email.to_string();
        self.run(move |conn| {
            accounts::table
                .filter(accounts::email.eq(email))
                .select(Account::as_select())
                .first(conn)
                .optional()
        })
        .await
    }

    async fn find_by_google_id(&self, google_id: &str) -> StoreResult<Option<Account>> {
        let google_id = google_id.to_string();
        self.run(move |conn| {
            accounts::table
                .filter(accounts::google_id.eq(google_id))
                .select(Account::as_select())
                .first(conn)
                .optional()
        })
        .await
    }

    async fn find_by_username_or_email(&self, username: &str, email: &str) -> StoreResult<Option<Account>> {
        let (username, email) = (username.to_string(), email.to_string());
        self.run(move |conn| {
            accounts::table
                .filter(accounts::username.eq(username).or(accounts::email.eq(email)))
                .select(Account::as_select())
                .first(conn)
                .optional()
        })
        .await
    }

    async fn find_by_verification_token(&self, token_hash: &str) -> StoreResult<Option<Account>> {
        let token_hash = token_hash.to_string();
        self.run(move |conn| {
            accounts::table
                .filter(accounts::verification_token_hash.eq(token_hash))
                .select(Account::as_select())
                .first(conn)
                .optional()
        })
        .await
    }

    async fn update_account(&self, id: Uuid, changes: AccountChanges) -> StoreResult<Option<Account>> {
        if changes.is_empty() {
            return self.find_account(id).await;
        }
        self.run(move |conn| {
            diesel::update(accounts::table.find(id))
                .set((&changes, accounts::updated_at.eq(Utc::now())))
                .returning(Account::as_returning())
                .get_result(conn)
                .optional()
        })
        .await
    }

    async fn delete_account(&self, id: Uuid) -> StoreResult<bool> {
        self.run(move |conn| {
            diesel::delete(accounts::table.find(id))
                .execute(conn)
                .map(|n| n > 0)
        })
        .await
    }

    async fn link_external_identity(
        &self,
        id: Uuid,
        google_id: &str,
        avatar_url: Option<&str>,
    ) -> StoreResult<Option<Account>> {
        let google_id = google_id.to_string();
        let avatar_url = avatar_url.map(str::to_string);
        self.run(move |conn| {
            conn.transaction::<_, DieselError, _>(|conn| {
                let now = Utc::now();
                let linked = diesel::update(
                    accounts::table
                        .filter(accounts::id.eq(id))
                        .filter(accounts::google_id.is_null()),
                )
                .set((
                    accounts::google_id.eq(Some(google_id)),
                    accounts::is_verified.eq(true),
                    accounts::updated_at.eq(now),
                ))
                .returning(Account::as_returning())
                .get_result(conn)
                .optional()?;

                let Some(account) = linked else {
                    return Ok(None);
                };
                if account.avatar_url.is_some() || avatar_url.is_none() {
                    return Ok(Some(account));
                }

                diesel::update(
                    accounts::table
                        .filter(accounts::id.eq(id))
                        .filter(accounts::avatar_url.is_null()),
                )
                .set(accounts::avatar_url.eq(avatar_url))
                .returning(Account::as_returning())
                .get_result(conn)
                .optional()
                .map(|adopted| adopted.or(Some(account)))
            })
        })
        .await
    }

    async fn set_verification_token(&self, id: Uuid, token_hash: &str, expires_at: DateTime<Utc>) -> StoreResult<bool> {
        let token_hash = token_hash.to_string();
        self.run(move |conn| {
            diesel::update(accounts::table.find(id))
                .set((
                    accounts::verification_token_hash.eq(Some(token_hash)),
                    accounts::verification_token_expires_at.eq(Some(expires_at)),
                    accounts::updated_at.eq(Utc::now()),
                ))
                .execute(conn)
                .map(|n| n > 0)
        })
        .await
    }

    async fn set_reset_token(&self, id: Uuid, token_hash: &str, expires_at: DateTime<Utc>) -> StoreResult<bool> {
        let token_hash = token_hash.to_string();
        self.run(move |conn| {
            diesel::update(accounts::table.find(id))
                .set((
                    accounts::reset_token_hash.eq(Some(token_hash)),
                    accounts::reset_token_expires_at.eq(Some(expires_at)),
                    accounts::updated_at.eq(Utc::now()),
                ))
                .execute(conn)
                .map(|n| n > 0)
        })
        .await
    }

    async fn clear_reset_token(&self, id: Uuid, token_hash: &str) -> StoreResult<()> {
        let token_hash = token_hash.to_string();
        self.run(move |conn| {
            diesel::update(
                accounts::table
                    .filter(accounts::id.eq(id))
                    .filter(accounts::reset_token_hash.eq(token_hash)),
            )
            .set((
                accounts::reset_token_hash.eq(None::<String>),
                accounts::reset_token_expires_at.eq(None::<DateTime<Utc>>),
            ))
            .execute(conn)
            .map(|_| ())
        })
        .await
    }

    async fn consume_verification_token(&self, token_hash: &str, now: DateTime<Utc>) -> StoreResult<Option<Account>> {
        let token_hash = token_hash.to_string();
        self.run(move |conn| {
            diesel::update(
                accounts::table
                    .filter(accounts::verification_token_hash.eq(token_hash))
                    .filter(accounts::verification_token_expires_at.gt(now)),
            )
            .set((
                accounts::is_verified.eq(true),
                accounts::verification_token_hash.eq(None::<String>),
                accounts::verification_token_expires_at.eq(None::<DateTime<Utc>>),
                accounts::updated_at.eq(now),
            ))
            .returning(Account::as_returning())
            .get_result(conn)
            .optional()
        })
        .await
    }

    async fn consume_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> StoreResult<Option<Account>> {
        let token_hash = token_hash.to_string();
        let password_hash = password_hash.to_string();
        self.run(move |conn| {
            diesel::update(
                accounts::table
                    .filter(accounts::reset_token_hash.eq(token_hash))
                    .filter(accounts::reset_token_expires_at.gt(now)),
            )
            .set((
                accounts::password_hash.eq(Some(password_hash)),
                accounts::reset_token_hash.eq(None::<String>),
                accounts::reset_token_expires_at.eq(None::<DateTime<Utc>>),
                accounts::updated_at.eq(now),
            ))
            .returning(Account::as_returning())
            .get_result(conn)
            .optional()
        })
        .await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.run(|conn| diesel::sql_query("SELECT 1").execute(conn).map(|_| ()))
            .await
    }
}

#[async_trait]
impl PhotoStore for PgStore {
    async fn insert_photo(&self, photo: NewPhoto) -> StoreResult<Photo> {
        self.run(move |conn| {
            diesel::insert_into(photos::table)
                .values(&photo)
                .returning(Photo::as_returning())
                .get_result(conn)
        })
        .await
    }

    async fn list_photos(&self, account_id: Uuid) -> StoreResult<Vec<Photo>> {
        self.run(move |conn| {
            photos::table
                .filter(photos::account_id.eq(account_id))
                .order(photos::created_at.desc())
                .select(Photo::as_select())
                .load(conn)
        })
        .await
    }
}
