//! Service wiring: store selection, token issuer, and the session flows that
//! need both.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use taskboard_auth::{Actor, AuthError, TokenError, TokenIssuer, verify_password};
use taskboard_core::{ProjectId, UserId};
use taskboard_infra::records::normalize_email;
use taskboard_infra::{AppConfig, InMemoryStore, Project, StorageConfig, Store, StoreError, User};

use crate::app::errors::ApiError;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("persistent storage requested but this build lacks the `postgres` feature")]
    PostgresUnavailable,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct Session {
    pub session_token: String,
    pub refresh_token: String,
    pub user: User,
}

pub struct AppServices {
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenIssuer>,
}

impl AppServices {
    pub fn new(store: Arc<dyn Store>, tokens: Arc<TokenIssuer>) -> Self {
        Self { store, tokens }
    }

    /// Exchange credentials for a session/refresh token pair.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let Some(user) = self.store.find_user_by_email(&normalize_email(email)).await? else {
            debug!("login for unknown email");
            return Err(AuthError::InvalidCredentials.into());
        };
        if !verify_password(password, &user.password_hash) {
            debug!(user_id = %user.id, "login with wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }

        let session_token = self.tokens.issue_session(&Actor::new(user.id, user.role))?;
        let refresh_token = self.tokens.issue_refresh(user.id)?;
        info!(user_id = %user.id, role = %user.role, "login succeeded");

        Ok(Session {
            session_token,
            refresh_token,
            user,
        })
    }

    /// Mint a new session token from a refresh token, using the identity's
    /// current role rather than the one it had at login.
    pub async fn renew_session(&self, refresh_token: &str) -> Result<String, ApiError> {
        let claims = self
            .tokens
            .verify_refresh(refresh_token)
            .inspect_err(|e| debug!(error = %e, "refresh token rejected"))?;

        let user = self
            .store
            .find_user(claims.sub)
            .await?
            .ok_or(AuthError::IdentityNotFound)?;

        Ok(self.tokens.issue_session(&Actor::new(user.id, user.role))?)
    }

    /// Identities by id, for expanding references in list responses.
    pub async fn users_by_id(&self, ids: Vec<UserId>) -> Result<HashMap<UserId, User>, ApiError> {
        let ids = dedup(ids);
        let users = self.store.find_users(&ids).await?;
        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }

    pub async fn projects_by_id(
        &self,
        ids: Vec<ProjectId>,
    ) -> Result<HashMap<ProjectId, Project>, ApiError> {
        let ids = dedup(ids);
        let projects = self.store.find_projects(&ids).await?;
        Ok(projects.into_iter().map(|p| (p.id, p)).collect())
    }
}

fn dedup<T: Ord>(mut ids: Vec<T>) -> Vec<T> {
    ids.sort();
    ids.dedup();
    ids
}

/// Build the store selected by configuration plus the token issuer.
pub async fn build_services(config: &AppConfig) -> Result<AppServices, StartupError> {
    let tokens = TokenIssuer::new(
        config.session_secret.as_bytes(),
        config.refresh_secret.as_bytes(),
    )?;

    let store: Arc<dyn Store> = match &config.storage {
        StorageConfig::InMemory => {
            info!("using in-memory stores");
            Arc::new(InMemoryStore::new())
        }
        StorageConfig::Postgres { database_url } => connect_postgres(database_url).await?,
    };

    Ok(AppServices::new(store, Arc::new(tokens)))
}

#[cfg(feature = "postgres")]
async fn connect_postgres(database_url: &str) -> Result<Arc<dyn Store>, StartupError> {
    let store = taskboard_infra::PostgresStore::connect(database_url).await?;
    store.migrate().await?;
    info!("using postgres stores");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "postgres"))]
async fn connect_postgres(_database_url: &str) -> Result<Arc<dyn Store>, StartupError> {
    Err(StartupError::PostgresUnavailable)
}
