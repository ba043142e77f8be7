use std::sync::{Mutex, MutexGuard};

use crate::domain::ports::{AuthGateway, Credentials, SessionStore};
use crate::domain::session::Session;
use crate::errors::AppError;

use super::lock;

/// Owns the signed-in session and hands clones of it to whoever needs the
/// bearer token or the role.
pub struct SessionManager<A, S> {
    auth: A,
    store: S,
    current: Mutex<Option<Session>>,
}

impl<A: AuthGateway, S: SessionStore> SessionManager<A, S> {
    pub fn new(auth: A, store: S) -> Self {
        Self {
            auth,
            store,
            current: Mutex::new(None),
        }
    }

    /// Load a previously persisted session, if any.
    pub fn restore(&self) -> Result<Option<Session>, AppError> {
        let restored = self.store.load()?;
        if let Some(session) = &restored {
            log::info!("Restored session for {} ({})", session.user_name, session.role);
        }
        *self.slot() = restored.clone();
        Ok(restored)
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<Session, AppError> {
        let session = match self.auth.login(credentials).await {
            Ok(session) => session,
            Err(e) => {
                log::warn!("Login failed for {}: {e}", credentials.username);
                return Err(e);
            }
        };
        self.store.save(&session)?;
        *self.slot() = Some(session.clone());
        log::info!("Signed in as {} ({})", session.user_name, session.role);
        Ok(session)
    }

    pub fn logout(&self) -> Result<(), AppError> {
        let previous = self.slot().take();
        self.store.clear()?;
        if let Some(session) = previous {
            log::info!("Signed out {}", session.user_name);
        }
        Ok(())
    }

    /// Drop a session the backend no longer accepts and sign in again when
    /// credentials are at hand.
    pub async fn reauthenticate(
        &self,
        credentials: Option<&Credentials>,
    ) -> Result<Session, AppError> {
        self.logout()?;
        match credentials {
            Some(credentials) => self.login(credentials).await,
            None => {
                log::error!("Session expired and no credentials are configured");
                Err(AppError::NotAuthenticated)
            }
        }
    }

    pub fn current(&self) -> Option<Session> {
        self.slot().clone()
    }

    /// The current session, or `NotAuthenticated`.
    pub fn require_session(&self) -> Result<Session, AppError> {
        self.current().ok_or(AppError::NotAuthenticated)
    }

    fn slot(&self) -> MutexGuard<'_, Option<Session>> {
        lock(&self.current)
    }
}
