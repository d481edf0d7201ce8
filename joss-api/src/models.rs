use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::schema::{accounts, photos};

// --- Accounts ---

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = accounts)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub is_verified: bool,
    pub google_id: Option<String>,
    pub avatar_url: Option<String>,
    pub verification_token_hash: Option<String>,
    pub verification_token_expires_at: Option<DateTime<Utc>>,
    pub reset_token_hash: Option<String>,
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn view(&self) -> AccountView {
        AccountView::from(self)
    }

    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = accounts)]
pub struct NewAccount {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub is_verified: bool,
    pub google_id: Option<String>,
    pub avatar_url: Option<String>,
    pub verification_token_hash: Option<String>,
    pub verification_token_expires_at: Option<DateTime<Utc>>,
}

impl NewAccount {
    pub fn into_account(self, now: DateTime<Utc>) -> Account {
        Account {
            id: self.id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            is_verified: self.is_verified,
            google_id: self.google_id,
            avatar_url: self.avatar_url,
            verification_token_hash: self.verification_token_hash,
            verification_token_expires_at: self.verification_token_expires_at,
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fields a caller may change on their own account. Password and token
/// columns are never reachable through here.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = accounts)]
pub struct AccountChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub is_verified: Option<bool>,
    pub avatar_url: Option<String>,
}

impl AccountChanges {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.is_verified.is_none() && self.avatar_url.is_none()
    }
}

/// Public view of an account: no password hash, no token fields.
#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_verified: bool,
    pub avatar_url: Option<String>,
    pub has_google: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            is_verified: account.is_verified,
            avatar_url: account.avatar_url.clone(),
            has_google: account.google_id.is_some(),
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

// --- Photos ---

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = photos)]
pub struct Photo {
    pub id: Uuid,
    pub account_id: Uuid,
    pub url: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = photos)]
pub struct NewPhoto {
    pub id: Uuid,
    pub account_id: Uuid,
    pub url: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl From<NewPhoto> for Photo {
    fn from(p: NewPhoto) -> Self {
        Self {
            id: p.id,
            account_id: p.account_id,
            url: p.url,
            title: p.title,
            created_at: p.created_at,
        }
    }
}
