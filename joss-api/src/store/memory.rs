use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{AccountStore, PhotoStore, StoreError, StoreResult, UniqueField};
use crate::models::{Account, AccountChanges, NewAccount, NewPhoto, Photo};

#[derive(Default)]
struct MemoryData {
    accounts: HashMap<Uuid, Account>,
    photos: Vec<Photo>,
}

impl MemoryData {
    /// First unique column `candidate` would collide on, ignoring itself.
    fn collision(&self, candidate: &Account) -> Option<UniqueField> {
        self.accounts
            .values()
            .filter(|a| a.id != candidate.id)
            .find_map(|a| {
                if a.username == candidate.username {
                    Some(UniqueField::Username)
                } else if a.email == candidate.email {
                    Some(UniqueField::Email)
                } else if a.google_id.is_some() && a.google_id == candidate.google_id {
                    Some(UniqueField::ExternalId)
                } else {
                    None
                }
            })
    }

    fn find_where(&self, pred: impl Fn(&Account) -> bool) -> Option<Account> {
        self.accounts.values().find(|a| pred(a)).cloned()
    }
}

/// Process-local store. Every operation holds the one lock for its whole
/// duration, which makes check-and-clear on tokens atomic.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<MemoryData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn insert_account(&self, new: NewAccount) -> StoreResult<Account> {
        let mut data = self.data.lock().await;
        let account = new.into_account(Utc::now());
        if let Some(field) = data.collision(&account) {
            return Err(StoreError::Conflict(field));
        }
        data.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_account(&self, id: Uuid) -> StoreResult<Option<Account>> {
        Ok(self.data.lock().await.accounts.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        Ok(self.data.lock().await.find_where(|a| a.email == email))
    }

    async fn find_by_google_id(&self, google_id: &str) -> StoreResult<Option<Account>> {
        Ok(self
            .data
            .lock()
            .await
            .find_where(|a| a.google_id.as_deref() == Some(google_id)))
    }

    async fn find_by_username_or_email(&self, username: &str, email: &str) -> StoreResult<Option<Account>> {
        Ok(self
            .data
            .lock()
            .await
            .find_where(|a| a.username == username || a.email == email))
    }

    async fn find_by_verification_token(&self, token_hash: &str) -> StoreResult<Option<Account>> {
        Ok(self
            .data
            .lock()
            .await
            .find_where(|a| a.verification_token_hash.as_deref() == Some(token_hash)))
    }

    async fn update_account(&self, id: Uuid, changes: AccountChanges) -> StoreResult<Option<Account>> {
        let mut data = self.data.lock().await;
        let Some(current) = data.accounts.get(&id) else {
            return Ok(None);
        };

        let mut updated = current.clone();
        if let Some(username) = changes.username {
            updated.username = username;
        }
        if let Some(email) = changes.email {
            updated.email = email;
        }
        if let Some(is_verified) = changes.is_verified {
            updated.is_verified = is_verified;
        }
        if let Some(avatar_url) = changes.avatar_url {
            updated.avatar_url = Some(avatar_url);
        }
        updated.updated_at = Utc::now();

        if let Some(field) = data.collision(&updated) {
            return Err(StoreError::Conflict(field));
        }
        data.accounts.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn delete_account(&self, id: Uuid) -> StoreResult<bool> {
        let mut data = self.data.lock().await;
        let removed = data.accounts.remove(&id).is_some();
        if removed {
            data.photos.retain(|p| p.account_id != id);
        }
        Ok(removed)
    }

    async fn link_external_identity(
        &self,
        id: Uuid,
        google_id: &str,
        avatar_url: Option<&str>,
    ) -> StoreResult<Option<Account>> {
        let mut data = self.data.lock().await;
        if data
            .accounts
            .values()
            .any(|a| a.id != id && a.google_id.as_deref() == Some(google_id))
        {
            return Err(StoreError::Conflict(UniqueField::ExternalId));
        }

        let Some(account) = data.accounts.get_mut(&id) else {
            return Ok(None);
        };
        if account.google_id.is_some() {
            return Ok(None);
        }

        account.google_id = Some(google_id.to_string());
        account.is_verified = true;
        if account.avatar_url.is_none() {
            account.avatar_url = avatar_url.map(str::to_string);
        }
        account.updated_at = Utc::now();
        Ok(Some(account.clone()))
    }

    async fn set_verification_token(&self, id: Uuid, token_hash: &str, expires_at: DateTime<Utc>) -> StoreResult<bool> {
        let mut data = self.data.lock().await;
        let Some(account) = data.accounts.get_mut(&id) else {
            return Ok(false);
        };
        account.verification_token_hash = Some(token_hash.to_string());
        account.verification_token_expires_at = Some(expires_at);
        account.updated_at = Utc::now();
        Ok(true)
    }

    async fn set_reset_token(&self, id: Uuid, token_hash: &str, expires_at: DateTime<Utc>) -> StoreResult<bool> {
        let mut data = self.data.lock().await;
        let Some(account) = data.accounts.get_mut(&id) else {
            return Ok(false);
        };
        account.reset_token_hash = Some(token_hash.to_string());
        account.reset_token_expires_at = Some(expires_at);
        account.updated_at = Utc::now();
        Ok(true)
    }

    async fn clear_reset_token(&self, id: Uuid, token_hash: &str) -> StoreResult<()> {
        let mut data = self.data.lock().await;
        if let Some(account) = data.accounts.get_mut(&id) {
            if account.reset_token_hash.as_deref() == Some(token_hash) {
                account.reset_token_hash = None;
                account.reset_token_expires_at = None;
            }
        }
        Ok(())
    }

    async fn consume_verification_token(&self, token_hash: &str, now: DateTime<Utc>) -> StoreResult<Option<Account>> {
        let mut data = self.data.lock().await;
        let holder = data.accounts.values_mut().find(|a| {
            a.verification_token_hash.as_deref() == Some(token_hash)
                && a.verification_token_expires_at.is_some_and(|exp| exp > now)
        });

        Ok(holder.map(|account| {
            account.is_verified = true;
            account.verification_token_hash = None;
            account.verification_token_expires_at = None;
            account.updated_at = now;
            account.clone()
        }))
    }

    async fn consume_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> StoreResult<Option<Account>> {
        let mut data = self.data.lock().await;
        let holder = data.accounts.values_mut().find(|a| {
            a.reset_token_hash.as_deref() == Some(token_hash)
                && a.reset_token_expires_at.is_some_and(|exp| exp > now)
        });

        Ok(holder.map(|account| {
            account.password_hash = Some(password_hash.to_string());
            account.reset_token_hash = None;
            account.reset_token_expires_at = None;
            account.updated_at = now;
            account.clone()
        }))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl PhotoStore for MemoryStore {
    async fn insert_photo(&self, photo: NewPhoto) -> StoreResult<Photo> {
        let mut data = self.data.lock().await;
        if !data.accounts.contains_key(&photo.account_id) {
            return Err(StoreError::Unavailable(format!("account {} does not exist", photo.account_id)));
        }
        let photo = Photo::from(photo);
        data.photos.push(photo.clone());
        Ok(photo)
    }

    async fn list_photos(&self, account_id: Uuid) -> StoreResult<Vec<Photo>> {
        let data = self.data.lock().await;
        let mut photos: Vec<Photo> = data
            .photos
            .iter()
            .filter(|p| p.account_id == account_id)
            .cloned()
            .collect();
        photos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(photos)
    }
}
