//! Moderator credential checks.
//!
//! The credential is stored as an Argon2 PHC hash. Verification still succeeds only for the
//! exact password that was set. Rows holding a non-PHC value (written before hashing existed)
//! are compared byte for byte. There is no attempt throttling or lockout.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::{info, warn};

use crate::{dao::poll_store::PollStore, error::ServiceError};

/// Minimum number of characters accepted for a new moderator password.
pub const MIN_PASSWORD_LENGTH: usize = 6;
const PHC_PREFIX: &str = "$argon2";

/// Settings the auth gate is constructed with.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    default_password: String,
    min_password_length: usize,
}

impl AuthConfig {
    pub fn new(default_password: impl Into<String>) -> Self {
        Self {
            default_password: default_password.into(),
            min_password_length: MIN_PASSWORD_LENGTH,
        }
    }

    /// Credential seeded when the store holds none.
    pub fn default_password(&self) -> &str {
        &self.default_password
    }

    pub fn min_password_length(&self) -> usize {
        self.min_password_length
    }
}

/// Verifies and rotates the moderator password stored in the poll store.
#[derive(Debug, Clone)]
pub struct AuthGate {
    config: AuthConfig,
}

impl AuthGate {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Seed the default credential when none is stored yet. Safe to call on every start.
    pub async fn seed(&self, store: &dyn PollStore) -> Result<bool, ServiceError> {
        let hash = hash_password(self.config.default_password.clone()).await?;
        let seeded = store.seed_moderator_password(hash).await?;
        if seeded {
            info!("seeded default moderator password");
        }
        Ok(seeded)
    }

    /// Return whether `input` is exactly the current moderator password.
    pub async fn authenticate(&self, store: &dyn PollStore, input: &str) -> Result<bool, ServiceError> {
        match store.moderator_password().await? {
            Some(stored) => verify_password(stored, input.to_owned()).await,
            None => {
                warn!("no moderator password stored; checking against the configured default");
                Ok(input == self.config.default_password)
            }
        }
    }

    /// Replace the stored password after checking the current one, the confirmation and the
    /// minimum length. Other visitors' sign-ins are left untouched.
    pub async fn change_password(
        &self,
        store: &dyn PollStore,
        current: &str,
        new: &str,
        confirm: &str,
    ) -> Result<(), ServiceError> {
        if !self.authenticate(store, current).await? {
            return Err(ServiceError::Unauthorized(
                "current password is incorrect".into(),
            ));
        }

        if new != confirm || new.chars().count() < self.config.min_password_length {
            return Err(ServiceError::InvalidInput(format!(
                "passwords do not match or are too short (minimum {} characters)",
                self.config.min_password_length
            )));
        }

        let hash = hash_password(new.to_owned()).await?;
        store.set_moderator_password(hash).await?;
        info!("moderator password changed");
        Ok(())
    }
}

/// Argon2 is CPU-bound and runs on the blocking pool.
async fn hash_password(password: String) -> Result<String, ServiceError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| ServiceError::Internal(format!("failed to hash password: {err}")))
    })
    .await
    .map_err(join_failed)?
}

async fn verify_password(stored: String, input: String) -> Result<bool, ServiceError> {
    if !stored.starts_with(PHC_PREFIX) {
        return Ok(stored == input);
    }

    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&stored).map_err(|err| {
            ServiceError::Internal(format!("stored password hash is invalid: {err}"))
        })?;
        Ok(Argon2::default()
            .verify_password(input.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(join_failed)?
}

fn join_failed(err: tokio::task::JoinError) -> ServiceError {
    ServiceError::Internal(format!("password hashing task failed: {err}"))
}

#[cfg(all(test, feature = "sqlite-store"))]
mod tests {
    use super::*;
    use crate::dao::poll_store::sqlite::SqlitePollStore;

    async fn seeded(password: &str) -> (AuthGate, SqlitePollStore) {
        let store = SqlitePollStore::in_memory().unwrap();
        let gate = AuthGate::new(AuthConfig::new(password));
        gate.seed(&store).await.unwrap();
        (gate, store)
    }

    #[tokio::test]
    async fn authenticates_only_the_exact_password() {
        let (gate, store) = seeded("admin123").await;
        assert!(gate.authenticate(&store, "admin123").await.unwrap());
        assert!(!gate.authenticate(&store, "admin123 ").await.unwrap());
        assert!(!gate.authenticate(&store, "ADMIN123").await.unwrap());
        assert!(!gate.authenticate(&store, "").await.unwrap());
    }

    #[tokio::test]
    async fn stored_value_is_not_plaintext() {
        let (_gate, store) = seeded("admin123").await;
        let stored = store.moderator_password().await.unwrap().unwrap();
        assert_ne!(stored, "admin123");
        assert!(stored.starts_with(PHC_PREFIX));
    }

    #[tokio::test]
    async fn seeding_twice_keeps_the_first_credential() {
        let (gate, store) = seeded("admin123").await;
        gate.change_password(&store, "admin123", "new-secret", "new-secret")
            .await
            .unwrap();

        assert!(!gate.seed(&store).await.unwrap());
        assert!(gate.authenticate(&store, "new-secret").await.unwrap());
    }

    #[tokio::test]
    async fn change_password_swaps_credentials() {
        let (gate, store) = seeded("admin123").await;
        gate.change_password(&store, "admin123", "new123", "new123")
            .await
            .unwrap();

        assert!(!gate.authenticate(&store, "admin123").await.unwrap());
        assert!(gate.authenticate(&store, "new123").await.unwrap());
    }

    #[tokio::test]
    async fn wrong_current_password_is_rejected() {
        let (gate, store) = seeded("admin123").await;
        let err = gate
            .change_password(&store, "wrong-current", "new123", "new123")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
        assert!(gate.authenticate(&store, "admin123").await.unwrap());
    }

    #[tokio::test]
    async fn short_or_mismatched_passwords_are_rejected() {
        let (gate, store) = seeded("admin123").await;

        let short = gate
            .change_password(&store, "admin123", "abc", "abc")
            .await
            .unwrap_err();
        assert!(matches!(short, ServiceError::InvalidInput(_)));

        let mismatch = gate
            .change_password(&store, "admin123", "abcdef", "abcdeg")
            .await
            .unwrap_err();
        assert!(matches!(mismatch, ServiceError::InvalidInput(_)));

        assert!(gate.authenticate(&store, "admin123").await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_sign_ins_share_the_blocking_pool() {
        let (gate, store) = seeded("admin123").await;
        let store = std::sync::Arc::new(store);
        let checks = (0..8).map(|n| {
            let (gate, store) = (gate.clone(), store.clone());
            let input = if n % 2 == 0 { "admin123" } else { "nope" };
            tokio::spawn(async move { gate.authenticate(store.as_ref(), input).await })
        });

        let results = futures::future::join_all(checks).await;
        for (n, result) in results.into_iter().enumerate() {
            assert_eq!(result.unwrap().unwrap(), n % 2 == 0);
        }
    }

    #[tokio::test]
    async fn legacy_plaintext_rows_still_verify() {
        let store = SqlitePollStore::in_memory().unwrap();
        store.set_moderator_password("legacy-pass".into()).await.unwrap();
        let gate = AuthGate::new(AuthConfig::new("unused"));

        assert!(gate.authenticate(&store, "legacy-pass").await.unwrap());
        assert!(!gate.authenticate(&store, "unused").await.unwrap());
    }
}
