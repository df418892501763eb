use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::{UserId, error::AuthError};

/// Default number of events buffered per subscriber before the oldest are dropped.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Reason why an account was unlocked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UnlockReason {
    /// Lockout period expired and the unlock timer fired
    LockoutExpired,
}

/// Why a counted login attempt failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FailureReason {
    UserNotFound,
    BadCredentials,
}

impl FailureReason {
    pub fn from_auth_error(error: &AuthError) -> Option<Self> {
        match error {
            AuthError::UserNotFound => Some(FailureReason::UserNotFound),
            AuthError::BadCredentials => Some(FailureReason::BadCredentials),
            _ => None,
        }
    }
}

/// Represents events that can be emitted by the event bus
///
/// Events let the presentation layer react to account changes (for example
/// re-enabling a login form when an account unlocks) without polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    UserRegistered {
        user_id: UserId,
        role: String,
    },
    LoginSucceeded {
        user_id: UserId,
    },
    UserLoggedOut {
        user_id: UserId,
    },

    /// Emitted when a counted login attempt fails.
    LoginFailed {
        user_id: UserId,
        /// Consecutive failures including this one
        failed_attempts: u32,
        reason: FailureReason,
        timestamp: DateTime<Utc>,
    },

    /// Emitted when an account becomes locked due to too many failed attempts.
    AccountLocked {
        user_id: UserId,
        failed_attempts: u32,
        /// When the unlock timer is due
        unlock_at: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },

    /// Emitted when an account is unlocked.
    AccountUnlocked {
        user_id: UserId,
        reason: UnlockReason,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    /// The account this event concerns.
    pub fn user_id(&self) -> &UserId {
        match self {
            Event::UserRegistered { user_id, .. }
            | Event::LoginSucceeded { user_id }
            | Event::UserLoggedOut { user_id }
            | Event::LoginFailed { user_id, .. }
            | Event::AccountLocked { user_id, .. }
            | Event::AccountUnlocked { user_id, .. } => user_id,
        }
    }
}

/// Event bus that fans events out to every subscriber
///
/// Emitting never blocks and never fails: with no subscribers the event is
/// simply dropped, and a subscriber that falls more than the channel capacity
/// behind loses the oldest events.
///
/// # Examples
///
/// ```
/// # use turnstile_core::{UserId, events::{Event, EventBus}};
/// let event_bus = EventBus::default();
/// let mut events = event_bus.subscribe();
///
/// event_bus.emit(Event::LoginSucceeded { user_id: UserId::new("alice") });
/// assert!(matches!(events.try_recv(), Ok(Event::LoginSucceeded { .. })));
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBus {
    /// Create a new event bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to every event emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Emit an event to all current subscribers
    pub fn emit(&self, event: Event) {
        // Err only means nobody is listening
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
