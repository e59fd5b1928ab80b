//! Event watcher tests.

mod lifecycle_test;

/// Verify the public watcher types are exported from the library.
#[test]
fn test_all_watcher_types_exported() {
    use gerrit_ssh::watcher::{
        AttemptLimit, AttemptPlan, ConnectError, ConnectionAttempt, StatusTracker, WatcherError,
        WatcherSettings, WatcherStatus,
    };

    let _ = AttemptPlan::new(AttemptLimit::Unbounded, std::time::Duration::ZERO);
    let _ = StatusTracker::new();
    let _ = WatcherSettings::default();
    let _: fn() -> ConnectError = || ConnectError::Cancelled;
    let _ = ConnectionAttempt {
        number: 1,
        retry_delay: None,
    };
    let _: Option<WatcherError> = None;
    assert_eq!(WatcherStatus::default(), WatcherStatus::Idle);
}
