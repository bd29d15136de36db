//! Login state with explicit load/save against a session store

use crate::{Result, SessionStore, UpiHandle};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const AUTH_KEY: &str = "auth";
const PHONE_HANDLE_BANK: &str = "ybl";
const GUEST_PAYER_HANDLE: &str = "yourname@okhdfc";

/// Persisted login state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    /// Whether a user is logged in
    pub is_logged_in: bool,
    /// Backend user id
    pub user_id: Option<String>,
    /// Phone number used to log in
    pub phone_number: Option<String>,
}

/// Login session.
///
/// Nothing is written until [`AuthSession::save`] is called.
#[derive(Debug, Clone, Default)]
pub struct AuthSession {
    state: AuthState,
}

impl AuthSession {
    /// Load the stored state. Missing or unreadable state means logged out.
    pub fn load(store: &dyn SessionStore) -> Result<Self> {
        let state = match store.get(AUTH_KEY)? {
            Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!("Stored auth state unreadable, starting logged out: {}", e);
                AuthState::default()
            }),
            None => AuthState::default(),
        };
        Ok(Self { state })
    }

    /// Persist the current state
    pub fn save(&self, store: &dyn SessionStore) -> Result<()> {
        store.set(AUTH_KEY, &serde_json::to_string(&self.state)?)
    }

    /// Current state
    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// Whether a user is logged in
    pub fn is_logged_in(&self) -> bool {
        self.state.is_logged_in
    }

    /// Mark a user as logged in
    pub fn login(&mut self, user_id: impl Into<String>, phone_number: impl Into<String>) {
        let user_id = user_id.into();
        info!(user_id = %user_id, "User logged in");
        self.state = AuthState {
            is_logged_in: true,
            user_id: Some(user_id),
            phone_number: Some(phone_number.into()),
        };
    }

    /// Reset to logged out and drop the stored state
    pub fn logout(&mut self, store: &dyn SessionStore) -> Result<()> {
        self.state = AuthState::default();
        store.remove(AUTH_KEY)
    }

    /// Handle the user pays from: last ten digits of the phone number at
    /// `@ybl`, or a placeholder handle for guests.
    pub fn payer_handle(&self) -> UpiHandle {
        let from_phone = self
            .state
            .phone_number
            .as_deref()
            .filter(|_| self.state.is_logged_in)
            .and_then(|phone| {
                let digits: Vec<char> = phone.chars().filter(|c| c.is_ascii_digit()).collect();
                let start = digits.len().saturating_sub(10);
                let local: String = digits[start..].iter().collect();
                UpiHandle::parse(format!("{}@{}", local, PHONE_HANDLE_BANK)).ok()
            });

        match from_phone {
            Some(handle) => handle,
            None => UpiHandle(GUEST_PAYER_HANDLE.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemorySessionStore;

    #[test]
    fn test_login_save_load() {
        let store = MemorySessionStore::new();
        let mut session = AuthSession::load(&store).unwrap();
        assert!(!session.is_logged_in());

        session.login("u-17", "+91 98765-43210");
        session.save(&store).unwrap();

        let json = store.get("auth").unwrap().unwrap();
        assert!(json.contains("\"isLoggedIn\":true"));

        let reloaded = AuthSession::load(&store).unwrap();
        assert_eq!(reloaded.state(), session.state());
        assert_eq!(reloaded.payer_handle().as_str(), "9876543210@ybl");
    }

    #[test]
    fn test_logout_clears_store() {
        let store = MemorySessionStore::new();
        let mut session = AuthSession::default();
        session.login("u-1", "9876543210");
        session.save(&store).unwrap();

        session.logout(&store).unwrap();
        assert!(!session.is_logged_in());
        assert!(store.get("auth").unwrap().is_none());
        assert_eq!(session.payer_handle().as_str(), "yourname@okhdfc");
    }

    #[test]
    fn test_corrupt_state_loads_logged_out() {
        let store = MemorySessionStore::new();
        store.set("auth", "garbage").unwrap();
        assert!(!AuthSession::load(&store).unwrap().is_logged_in());
    }
}
