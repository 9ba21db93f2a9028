use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{CreateUserParams, RepoError, UsersRepo, UsersWriteRepo};
use crate::cache::CacheEnsemble;
use crate::domain::accounts::{calculate_passhash, validate_registration, verify_passhash};
use crate::domain::entities::{UserId, UserRecord};
use crate::domain::error::DomainError;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Invalid(#[from] DomainError),
    #[error("account name `{0}` is already taken")]
    AccountTaken(String),
    #[error("account name or password is incorrect")]
    InvalidCredentials,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct AccountService {
    reader: Arc<dyn UsersRepo>,
    writer: Arc<dyn UsersWriteRepo>,
    caches: Arc<CacheEnsemble>,
}

impl AccountService {
    pub fn new(
        reader: Arc<dyn UsersRepo>,
        writer: Arc<dyn UsersWriteRepo>,
        caches: Arc<CacheEnsemble>,
    ) -> Self {
        Self {
            reader,
            writer,
            caches,
        }
    }

    pub async fn register(
        &self,
        account_name: &str,
        password: &str,
    ) -> Result<UserRecord, AccountError> {
        validate_registration(account_name, password)?;

        if self
            .reader
            .find_by_account_name(account_name)
            .await?
            .is_some()
        {
            return Err(AccountError::AccountTaken(account_name.to_string()));
        }

        let params = CreateUserParams {
            account_name: account_name.to_string(),
            passhash: calculate_passhash(account_name, password),
        };
        let user = match self.writer.create_user(params).await {
            Ok(user) => user,
            Err(RepoError::Duplicate { .. }) => {
                return Err(AccountError::AccountTaken(account_name.to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        info!(
            target = "application::accounts::register",
            user_id = user.id,
            "account registered"
        );
        Ok(user)
    }

    /// Authenticate a non-banned user.
    pub async fn login(
        &self,
        account_name: &str,
        password: &str,
    ) -> Result<UserRecord, AccountError> {
        let user = self
            .reader
            .find_by_account_name(account_name)
            .await?
            .filter(|user| !user.is_banned())
            .ok_or(AccountError::InvalidCredentials)?;

        if !verify_passhash(account_name, password, &user.passhash) {
            return Err(AccountError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Resolve the user behind a session through the users cache.
    ///
    /// A missing row is not cached, so a later registration under a reused id
    /// is still found.
    pub async fn session_user(&self, user_id: UserId) -> Result<Option<UserRecord>, AccountError> {
        if let Some(user) = self.caches.users.get(&user_id) {
            return Ok(Some(user));
        }

        let found = self.reader.find_by_id(user_id).await?;
        if let Some(user) = &found {
            self.caches.users.set(user_id, user.clone());
        }
        Ok(found)
    }
}
