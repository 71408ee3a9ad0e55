//! Test to verify test infrastructure works correctly

mod common;

use common::builders::ShellLoggerBuilder;
use common::mock_helpers::healthy_controller;
use std::time::Duration;

#[test]
fn test_infrastructure_setup() {
    let settings = ShellLoggerBuilder::long_running()
        .grace(Duration::from_millis(100))
        .build();

    assert_eq!(settings.leading_args, vec!["-c", "exec sleep 30"]);
    assert_eq!(settings.stop_grace_duration(), Duration::from_millis(100));
}

#[test]
fn test_scripted_controller_starts_empty() {
    let controller = healthy_controller();
    assert_eq!(controller.session_count(), 0);
    assert!(controller.backend().calls().is_empty());
}

#[test]
fn test_wait_until() {
    assert!(common::wait_until(common::test_timeout(), || true));
    assert!(!common::wait_until(Duration::from_millis(20), || false));
}
