//! User directory and recipient resolution
//!
//! Maps the identifiers people actually type (email, account number,
//! customer id, profile URL, mobile number) to an account. The resolver
//! and the PIN verifier sit behind traits so the gateway never depends
//! on this concrete store.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use crate::core_types::{AccountId, UserId};

/// Resolved recipient: the account to credit plus display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountRef {
    pub account_id: AccountId,
    pub user_id: UserId,
    pub display_name: String,
}

/// Turns a free-form recipient identifier into an account.
#[async_trait]
pub trait RecipientResolver: Send + Sync {
    async fn resolve(&self, identifier: &str) -> Option<AccountRef>;
}

/// Verifies a user's transaction PIN.
#[async_trait]
pub trait AuthorizationVerifier: Send + Sync {
    async fn verify_pin(&self, user_id: UserId, pin: &str) -> bool;
}

/// Directory profile for one user.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    /// Bank account number, "NB" prefix
    pub account_number: String,
    pub customer_id: String,
    pub profile_url: String,
    pub mobile_number: String,
    #[serde(skip_serializing)]
    pub pin: String,
    /// Account credited when this user is a transfer recipient
    pub default_account: AccountId,
    pub active: bool,
}

/// In-process user directory.
#[derive(Default)]
pub struct UserDirectory {
    users: DashMap<UserId, UserProfile>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, profile: UserProfile) {
        self.users.insert(profile.user_id, profile);
    }

    pub fn get(&self, user_id: UserId) -> Option<UserProfile> {
        self.users.get(&user_id).map(|p| p.clone())
    }

    pub fn set_active(&self, user_id: UserId, active: bool) -> Option<UserProfile> {
        let mut profile = self.users.get_mut(&user_id)?;
        profile.active = active;
        Some(profile.clone())
    }

    fn find(&self, predicate: impl Fn(&UserProfile) -> bool) -> Option<UserProfile> {
        self.users
            .iter()
            .find(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
    }

    /// Resolution cascade. The identifier's shape picks the field:
    /// anything with `@` is an email, an `NB` prefix is an account
    /// number, then customer id, profile URL and mobile number are
    /// tried in order.
    fn lookup(&self, identifier: &str) -> Option<UserProfile> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return None;
        }

        if identifier.contains('@') {
            return self.find(|p| p.email.eq_ignore_ascii_case(identifier));
        }
        if identifier.starts_with("NB") {
            return self.find(|p| p.account_number == identifier);
        }
        self.find(|p| p.customer_id == identifier)
            .or_else(|| self.find(|p| p.profile_url == identifier))
            .or_else(|| self.find(|p| p.mobile_number == identifier))
    }
}

#[async_trait]
impl RecipientResolver for UserDirectory {
    async fn resolve(&self, identifier: &str) -> Option<AccountRef> {
        let profile = self.lookup(identifier)?;
        debug!(identifier, user_id = profile.user_id, "recipient resolved");
        Some(AccountRef {
            account_id: profile.default_account,
            user_id: profile.user_id,
            display_name: profile.name,
        })
    }
}

#[async_trait]
impl AuthorizationVerifier for UserDirectory {
    async fn verify_pin(&self, user_id: UserId, pin: &str) -> bool {
        self.users
            .get(&user_id)
            .map(|p| p.active && p.pin == pin)
            .unwrap_or(false)
    }
}

/// Shared handles the gateway consumes.
pub type SharedResolver = Arc<dyn RecipientResolver>;
pub type SharedVerifier = Arc<dyn AuthorizationVerifier>;
