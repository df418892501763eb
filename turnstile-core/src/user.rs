//! User identity records
//!
//! A [`UserRecord`] is the durable half of an account: the identifier the user
//! signs in with and a free-form role label. Lockout state lives separately in
//! [`AccountState`](crate::account::AccountState) and is never persisted.
//!
//! | Field            | Type     | Durable | Description                                  |
//! | ---------------- | -------- | ------- | -------------------------------------------- |
//! | `id`             | `UserId` | yes     | Unique, case-sensitive identifier.           |
//! | `role`           | `String` | yes     | Free-form label, not interpreted here.       |
//! | `session_active` | `bool`   | no      | Set by a successful login, cleared on logout |
use serde::{Deserialize, Serialize};

/// A unique, case-sensitive identifier for an account
///
/// The identifier is compared byte for byte; no trimming or case folding is applied.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: &str) -> Self {
        UserId(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered account.
///
/// The id and role are fixed at creation. Only the session flag changes, through
/// [`login`](Self::login) and [`logout`](Self::logout).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    id: UserId,
    role: String,
    #[serde(skip)]
    session_active: bool,
}

impl UserRecord {
    pub fn new(id: UserId, role: impl Into<String>) -> Self {
        Self {
            id,
            role: role.into(),
            session_active: false,
        }
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn is_session_active(&self) -> bool {
        self.session_active
    }

    /// Start a session for this user.
    ///
    /// Returns `false` without starting a session if the record has no usable id.
    pub fn login(&mut self) -> bool {
        if self.id.is_empty() {
            return false;
        }
        self.session_active = true;
        true
    }

    /// End the current session, if any.
    pub fn logout(&mut self) {
        self.session_active = false;
    }
}
