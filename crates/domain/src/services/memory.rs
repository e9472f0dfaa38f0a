//! In-memory store for development and testing.
//!
//! Implements every store trait over process-local collections. Nothing is
//! persisted.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{SessionStore, SetupStore, StoreError, StoreHealth, StoreResult, UserStore};
use crate::models::{NewSession, NewUser, Session, SetupState, User};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    users: RwLock<Vec<User>>,
    sessions: RwLock<HashMap<String, Session>>,
    setup: RwLock<SetupState>,
    setup_reads: AtomicUsize,
    /// Whether to simulate backend failures for testing.
    simulate_failure: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose setup has already been completed by an admin with the
    /// given credentials hash.
    pub async fn with_admin(username: &str, password_hash: &str) -> Self {
        let store = Self::new();
        // A fresh store cannot conflict.
        let _ = store
            .complete_with_admin(NewUser::admin(username, password_hash))
            .await;
        store
    }

    /// Number of times the setup state has been read.
    pub fn setup_reads(&self) -> usize {
        self.setup_reads.load(Ordering::SeqCst)
    }

    pub fn set_simulate_failure(&self, fail: bool) {
        self.simulate_failure.store(fail, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.simulate_failure.load(Ordering::SeqCst) {
            tracing::warn!("In-memory store simulating failure");
            return Err(StoreError::Backend("Simulated failure".to_string()));
        }
        Ok(())
    }

    fn build_user(user: NewUser) -> User {
        User {
            id: Uuid::new_v4(),
            username: user.username,
            password_hash: user.password_hash,
            is_admin: user.is_admin,
            created_at: Utc::now(),
            last_login_at: None,
        }
    }
}

#[async_trait::async_trait]
impl UserStore for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.check_available()?;
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        self.check_available()?;
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        self.check_available()?;
        Ok(self.users.read().await.clone())
    }

    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        self.check_available()?;
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict(format!(
                "User '{}' already exists",
                user.username
            )));
        }
        let user = Self::build_user(user);
        users.push(user.clone());
        Ok(user)
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        self.check_available()?;
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("User {id}")))?;
        user.last_login_at = Some(at);
        Ok(())
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemoryStore {
    async fn create(&self, session: NewSession) -> StoreResult<Session> {
        self.check_available()?;
        let session = Session {
            token_hash: session.token_hash,
            user_id: session.user_id,
            logged_in: true,
            created_at: Utc::now(),
            expires_at: session.expires_at,
            ip_address: session.ip_address,
            user_agent: session.user_agent,
        };
        self.sessions
            .write()
            .await
            .insert(session.token_hash.clone(), session.clone());
        Ok(session)
    }

    async fn find_active(&self, token_hash: &str) -> StoreResult<Option<Session>> {
        self.check_available()?;
        let now = Utc::now();
        Ok(self
            .sessions
            .read()
            .await
            .get(token_hash)
            .filter(|s| s.is_active_at(now))
            .cloned())
    }

    async fn delete(&self, token_hash: &str) -> StoreResult<()> {
        self.check_available()?;
        self.sessions.write().await.remove(token_hash);
        Ok(())
    }

    async fn purge_expired(&self) -> StoreResult<u64> {
        self.check_available()?;
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        Ok((before - sessions.len()) as u64)
    }
}

#[async_trait::async_trait]
impl SetupStore for InMemoryStore {
    async fn state(&self) -> StoreResult<SetupState> {
        self.check_available()?;
        self.setup_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.setup.read().await.clone())
    }

    async fn complete_with_admin(&self, admin: NewUser) -> StoreResult<User> {
        self.check_available()?;
        // Hold the setup lock across the user insert so two racing setups
        // cannot both succeed.
        let mut setup = self.setup.write().await;
        if setup.completed {
            return Err(StoreError::Conflict("Setup already completed".to_string()));
        }
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.username == admin.username) {
            return Err(StoreError::Conflict(format!(
                "User '{}' already exists",
                admin.username
            )));
        }
        let user = Self::build_user(admin);
        users.push(user.clone());
        *setup = SetupState::completed_now();
        Ok(user)
    }

    async fn mark_complete(&self) -> StoreResult<SetupState> {
        self.check_available()?;
        let mut setup = self.setup.write().await;
        if !setup.completed {
            *setup = SetupState::completed_now();
        }
        Ok(setup.clone())
    }
}

#[async_trait::async_trait]
impl StoreHealth for InMemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.check_available()
    }
}
