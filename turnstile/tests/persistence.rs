//! Flat-file persistence through the public API
#![cfg(feature = "file")]

use std::sync::Arc;

use turnstile::{
    AuthError, Error, ManualClock, ManualUnlockScheduler, StorageError, TurnstileBuilder,
    UserRecord,
};

#[tokio::test]
async fn test_round_trip_through_file() {
    let _ = tracing_subscriber::fmt().try_init();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.txt");

    let turnstile = TurnstileBuilder::new()
        .with_file_storage(&path)
        .build()
        .await
        .unwrap();
    turnstile.register("bob", "Admin").await.unwrap();
    turnstile.register("alice", "User").await.unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents, "alice,User\nbob,Admin\n");

    let reloaded = TurnstileBuilder::new()
        .with_file_storage(&path)
        .build()
        .await
        .unwrap();
    assert!(reloaded.exists("bob"));
    assert_eq!(reloaded.user("bob").unwrap().role(), "Admin");
    assert_eq!(reloaded.users().len(), 2);
}

#[tokio::test]
async fn test_lock_state_not_restored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.txt");

    let clock = ManualClock::default();
    let turnstile = TurnstileBuilder::new()
        .with_file_storage(&path)
        .with_clock(Arc::new(clock.clone()))
        .with_scheduler(Arc::new(ManualUnlockScheduler::new(clock)))
        .with_verifier(Arc::new(|_: &UserRecord| false))
        .build()
        .await
        .unwrap();

    turnstile.register("bob", "Admin").await.unwrap();
    for _ in 0..5 {
        let _ = turnstile.authenticate("bob");
    }
    assert!(turnstile.is_locked("bob"));
    turnstile.save().await.unwrap();

    let reloaded = TurnstileBuilder::new()
        .with_file_storage(&path)
        .build()
        .await
        .unwrap();

    assert!(!reloaded.is_locked("bob"));
    assert_eq!(reloaded.lockout_status("bob").failed_attempts, 0);
    assert_eq!(reloaded.authenticate("bob"), Ok(()));
}

#[tokio::test]
async fn test_missing_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("users.txt");

    let turnstile = TurnstileBuilder::new()
        .with_file_storage(&path)
        .build()
        .await
        .unwrap();
    assert!(turnstile.users().is_empty());
    assert!(!path.exists());

    turnstile.register("alice", "User").await.unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "alice,User\n");
}

#[tokio::test]
async fn test_malformed_lines_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.txt");
    std::fs::write(
        &path,
        "alice,User\nno-comma\n\nbob,Admin,extra\n,Orphan\ncarol,\r\n",
    )
    .unwrap();

    let turnstile = TurnstileBuilder::new()
        .with_file_storage(&path)
        .build()
        .await
        .unwrap();

    let ids: Vec<_> = turnstile
        .users()
        .iter()
        .map(|u| u.id().to_string())
        .collect();
    assert_eq!(ids, vec!["alice", "carol"]);
    assert_eq!(turnstile.user("carol").unwrap().role(), "");

    // The next write drops the skipped lines
    turnstile.register("dave", "User").await.unwrap();
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "alice,User\ncarol,\ndave,User\n"
    );
}

#[tokio::test]
async fn test_undecodable_line_does_not_lose_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.txt");
    std::fs::write(&path, b"alice,User\nbad\xff,User\nbob,Admin\n").unwrap();

    let turnstile = TurnstileBuilder::new()
        .with_file_storage(&path)
        .build()
        .await
        .expect("one bad line should not fail the whole store");

    assert!(turnstile.exists("alice"));
    assert_eq!(turnstile.user("bob").unwrap().role(), "Admin");
    assert_eq!(turnstile.users().len(), 2);
}

#[tokio::test]
async fn test_failed_write_keeps_registration() {
    let dir = tempfile::tempdir().unwrap();
    let store_dir = dir.path().join("store");
    let path = store_dir.join("users.txt");

    let turnstile = TurnstileBuilder::new()
        .with_file_storage(&path)
        .build()
        .await
        .unwrap();

    // A regular file where the store directory should be makes every write fail
    std::fs::write(&store_dir, "").unwrap();

    let result = turnstile.register("alice", "User").await;
    assert!(matches!(result, Err(Error::Storage(StorageError::Io(_)))));
    assert!(turnstile.exists("alice"));
    assert_eq!(turnstile.authenticate("alice"), Ok(()));

    assert!(matches!(
        turnstile.register("alice", "User").await,
        Err(Error::Auth(AuthError::UserAlreadyExists))
    ));
    assert!(turnstile.save().await.is_err());
}
