//! Start-up seeding of the first administrator.

use tracing::info;

use taskboard_auth::{Role, hash_password};

use crate::config::SeedAdmin;
use crate::records::NewUser;
use crate::store::{StoreError, UserRepository};

/// Create the seed administrator unless its email is already registered.
///
/// Returns `true` when a new identity was created.
pub async fn ensure_admin<S>(store: &S, seed: &SeedAdmin) -> Result<bool, StoreError>
where
    S: UserRepository + ?Sized,
{
    if store.find_user_by_email(&seed.email).await?.is_some() {
        return Ok(false);
    }

    let password_hash =
        hash_password(&seed.password).map_err(|e| StoreError::validation(e.to_string()))?;

    match store
        .create_user(NewUser {
            name: seed.name.clone(),
            email: seed.email.clone(),
            password_hash,
            role: Role::Admin,
        })
        .await
    {
        Ok(user) => {
            info!(user_id = %user.id, "seed administrator created");
            Ok(true)
        }
        // Another instance won the race.
        Err(StoreError::Conflict(_)) => Ok(false),
        Err(e) => Err(e),
    }
}
