//! Service layer for business logic
//!
//! This module contains the service that orchestrates the account registry,
//! the lockout policy and the unlock scheduler.

pub mod authentication;

pub use authentication::{AuthenticationService, CredentialVerifier, IdPresenceVerifier};
