//! Who is signed in.
//!
//! The identity store checks credentials against the seeded accounts plus
//! anything registered during its lifetime, and keeps the current user in
//! storage under [`USER_KEY`] so a restart resumes the session.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::instrument;

use crate::dto::{Role, User};
use crate::notify::Notifier;
use crate::seed::{self, SeededAccount};
use crate::storage::{self, Storage, USER_KEY};
use crate::{Error, Result};

struct IdentityState {
    current: Option<User>,
    accounts: Vec<SeededAccount>,
}

impl IdentityState {
    fn find_by_email(&self, email: &str) -> Option<&SeededAccount> {
        self.accounts
            .iter()
            .find(|a| a.user.email.eq_ignore_ascii_case(email.trim()))
    }
}

#[derive(Clone)]
pub struct IdentityStore {
    state: Arc<Mutex<IdentityState>>,
    storage: Arc<dyn Storage>,
    notifier: Notifier,
    latency: Duration,
}

impl IdentityStore {
    /// Creates the store, restoring a previously saved session if any.
    pub fn open(storage: Arc<dyn Storage>, notifier: Notifier, latency: Duration) -> Result<Self> {
        let current: Option<User> = storage::load_json(storage.as_ref(), USER_KEY)?;
        if let Some(user) = &current {
            tracing::info!(user_id = user.id, "restored session");
        }
        Ok(Self {
            state: Arc::new(Mutex::new(IdentityState {
                current,
                accounts: seed::accounts(),
            })),
            storage,
            notifier,
            latency,
        })
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.lock().current.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.lock().current.is_some()
    }

    /// Signs in with an email (case-insensitive) and password.
    /// On failure the current user is left as it was.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        tokio::time::sleep(self.latency).await;

        let found = {
            let state = self.state.lock();
            state
                .find_by_email(email)
                .filter(|a| a.password == password)
                .map(|a| a.user.clone())
        };
        let Some(user) = found else {
            tracing::warn!("login rejected");
            return Err(self.reject(Error::InvalidCredentials));
        };

        self.set_current(user.clone()).map_err(|e| self.reject(e))?;
        tracing::info!(user_id = user.id, "logged in");
        self.notifier
            .success(format!("Welcome back, {}!", user.name));
        Ok(user)
    }

    /// Creates an account and signs it in. Only the buyer and seller roles
    /// can be chosen; the email must not belong to an existing account.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<User> {
        tokio::time::sleep(self.latency).await;

        if role == Role::Admin {
            return Err(self.reject(Error::RoleNotSelfAssignable));
        }

        let user = {
            let mut state = self.state.lock();
            if state.find_by_email(email).is_some() {
                drop(state);
                tracing::warn!("registration rejected: email in use");
                return Err(self.reject(Error::EmailInUse));
            }
            let id = state.accounts.iter().map(|a| a.user.id).max().unwrap_or(0) + 1;
            let user = User {
                id,
                name: name.to_owned(),
                email: email.trim().to_owned(),
                role,
                avatar_url: Some(seed::avatar_for(name)),
            };
            // Saved while still holding the lock, before the account exists
            if let Err(e) = storage::save_json(self.storage.as_ref(), USER_KEY, &user) {
                drop(state);
                return Err(self.reject(e));
            }
            state.accounts.push(SeededAccount {
                user: user.clone(),
                password: password.to_owned(),
            });
            state.current = Some(user.clone());
            user
        };

        tracing::info!(user_id = user.id, ?role, "registered");
        self.notifier.success("Account created successfully!");
        Ok(user)
    }

    pub fn logout(&self) -> Result<()> {
        self.storage
            .remove(USER_KEY)
            .map_err(|e| self.reject(e.into()))?;
        let previous = self.state.lock().current.take();
        if let Some(user) = previous {
            tracing::info!(user_id = user.id, "logged out");
        }
        self.notifier.info("You have been logged out");
        Ok(())
    }

    fn set_current(&self, user: User) -> Result<()> {
        storage::save_json(self.storage.as_ref(), USER_KEY, &user)?;
        self.state.lock().current = Some(user);
        Ok(())
    }

    fn reject(&self, err: Error) -> Error {
        self.notifier.error(err.to_string());
        err
    }
}
