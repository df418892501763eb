//! Registration through the public API

use std::sync::Arc;

use chrono::Duration;
use turnstile::{
    AuthError, Error, Event, ManualClock, ManualUnlockScheduler, TurnstileBuilder,
    ValidationError,
};

#[tokio::test]
async fn test_duplicate_registration_rejected() {
    let _ = tracing_subscriber::fmt().try_init();
    let turnstile = TurnstileBuilder::new()
        .with_memory_storage()
        .build()
        .await
        .unwrap();

    turnstile.register("alice", "User").await.unwrap();
    let _ = turnstile.authenticate("alice");
    let before = turnstile.lockout_status("alice");

    let result = turnstile.register("alice", "Admin").await;
    assert!(matches!(
        result,
        Err(Error::Auth(AuthError::UserAlreadyExists))
    ));

    assert_eq!(turnstile.user("alice").unwrap().role(), "User");
    assert_eq!(turnstile.lockout_status("alice"), before);
    assert_eq!(turnstile.users().len(), 1);
}

#[tokio::test]
async fn test_invalid_ids_and_roles() {
    let turnstile = TurnstileBuilder::new()
        .with_memory_storage()
        .build()
        .await
        .unwrap();

    assert!(matches!(
        turnstile.register("", "User").await,
        Err(Error::Validation(ValidationError::InvalidUserId(_)))
    ));
    assert!(matches!(
        turnstile.register("a,b", "User").await,
        Err(Error::Validation(ValidationError::InvalidUserId(_)))
    ));
    assert!(matches!(
        turnstile.register("carol", "Admin\nUser").await,
        Err(Error::Validation(ValidationError::InvalidRole(_)))
    ));

    // Empty roles are allowed
    turnstile.register("dave", "").await.unwrap();
    assert_eq!(turnstile.user("dave").unwrap().role(), "");
    assert!(!turnstile.exists("carol"));
}

#[tokio::test]
async fn test_registration_refused_while_locked() {
    let clock = ManualClock::default();
    let scheduler = ManualUnlockScheduler::new(clock.clone());
    let turnstile = TurnstileBuilder::new()
        .with_memory_storage()
        .with_clock(Arc::new(clock))
        .with_scheduler(Arc::new(scheduler.clone()))
        .build()
        .await
        .unwrap();

    for _ in 0..5 {
        let _ = turnstile.authenticate("newcomer");
    }

    assert!(matches!(
        turnstile.register("newcomer", "User").await,
        Err(Error::Auth(AuthError::AccountLocked { .. }))
    ));
    assert!(!turnstile.exists("newcomer"));

    scheduler.advance(Duration::seconds(60));

    turnstile.register("newcomer", "User").await.unwrap();
    assert_eq!(turnstile.authenticate("newcomer"), Ok(()));
}

#[tokio::test]
async fn test_registration_starts_unlocked_with_no_failures() {
    let turnstile = TurnstileBuilder::new()
        .with_memory_storage()
        .build()
        .await
        .unwrap();

    for _ in 0..3 {
        let _ = turnstile.authenticate("eve");
    }
    assert_eq!(turnstile.lockout_status("eve").failed_attempts, 3);

    turnstile.register("eve", "User").await.unwrap();

    let status = turnstile.lockout_status("eve");
    assert_eq!(status.failed_attempts, 0);
    assert!(!status.is_locked);
}

#[tokio::test]
async fn test_registration_event() {
    let turnstile = TurnstileBuilder::new()
        .with_memory_storage()
        .build()
        .await
        .unwrap();
    let mut events = turnstile.subscribe();

    turnstile.register("alice", "User").await.unwrap();
    let _ = turnstile.register("alice", "User").await;

    assert!(matches!(
        events.try_recv(),
        Ok(Event::UserRegistered { ref role, .. }) if role == "User"
    ));
    assert!(events.try_recv().is_err());
}
