//! Unit tests for the floating IP binding resource.

use std::sync::Arc;
use std::time::Duration;

use rstest::{fixture, rstest};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::api::ApiError;
use crate::context::Timeouts;
use crate::test_support::{FakeTagApi, FakeVpcApi};

struct Harness {
    vpc: Arc<FakeVpcApi>,
    ctx: ProviderContext,
}

#[fixture]
fn harness() -> Harness {
    let vpc = Arc::new(FakeVpcApi::new());
    vpc.register_floating_ip("fip-1", "203.0.113.10");
    vpc.register_floating_ip("fip-2", "203.0.113.20");
    let ctx = ProviderContext::new(vpc.clone(), Arc::new(FakeTagApi::default()));
    Harness { vpc, ctx }
}

fn config(floating_ip: &str) -> FloatingIpConfig {
    FloatingIpConfig {
        bare_metal_server: String::from("srv-1"),
        network_interface: String::from("nic-1"),
        floating_ip: floating_ip.to_owned(),
    }
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn available_binding_skips_the_wait(harness: Harness) {
    let state = NicFloatingIpResource
        .create(&harness.ctx, &config("fip-1"))
        .await
        .expect("create succeeds");

    assert_eq!(state.id, "srv-1/nic-1/fip-1");
    assert_eq!(state.status, "available");
    assert_eq!(state.address, "203.0.113.10");
    assert_eq!(state.zone, "us-south-1");
    assert_eq!(state.target.as_deref(), Some("nic-1"));
    assert!(harness.vpc.calls_to(GET_CALL).is_empty());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn composite_interface_uses_its_last_segment(harness: Harness) {
    let mut cfg = config("fip-1");
    cfg.network_interface = String::from("srv-1/nic-9");

    let state = NicFloatingIpResource
        .create(&harness.ctx, &cfg)
        .await
        .expect("create succeeds");

    assert_eq!(state.id, "srv-1/nic-9/fip-1");
    assert!(harness.vpc.is_bound("srv-1", "nic-9", "fip-1"));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn pending_binding_is_polled_until_available(harness: Harness) {
    harness.vpc.set_add_status("pending");
    harness
        .vpc
        .script_statuses("fip-1", &["pending", "pending", "available"]);
    let started = Instant::now();

    let state = NicFloatingIpResource
        .create(&harness.ctx, &config("fip-1"))
        .await
        .expect("create succeeds");

    assert_eq!(state.status, "available");
    assert_eq!(harness.vpc.calls_to(GET_CALL).len(), 3);
    assert_eq!(started.elapsed(), Duration::from_secs(30));
}

#[rstest]
#[case::pci(&["pci_pending", "available"])]
#[case::mixed(&["pending", "pci_pending", "available"])]
#[tokio::test(start_paused = true)]
async fn transitional_statuses_keep_the_bind_wait_going(
    harness: Harness,
    #[case] statuses: &[&str],
) {
    harness.vpc.set_add_status("pending");
    harness.vpc.script_statuses("fip-1", statuses);

    let state = NicFloatingIpResource
        .create(&harness.ctx, &config("fip-1"))
        .await
        .expect("create succeeds");

    assert_eq!(state.status, "available");
    assert_eq!(harness.vpc.calls_to(GET_CALL).len(), statuses.len());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn failed_binding_is_returned_as_state(harness: Harness) {
    harness.vpc.set_add_status("pending");
    harness.vpc.script_statuses("fip-1", &["failed"]);

    let state = NicFloatingIpResource
        .create(&harness.ctx, &config("fip-1"))
        .await
        .expect("terminal failure is not an error");
    assert_eq!(state.status, "failed");
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn stuck_binding_times_out(harness: Harness) {
    harness.vpc.set_add_status("pending");
    harness.vpc.script_statuses("fip-1", &["pending"]);
    let ctx = harness.ctx.clone().with_timeouts(Timeouts {
        create: Duration::from_secs(35),
        ..Timeouts::default()
    });

    let err = NicFloatingIpResource
        .create(&ctx, &config("fip-1"))
        .await
        .expect_err("wait times out");

    match err {
        ProviderError::Timeout {
            target,
            last_status,
            waited,
            ..
        } => {
            assert_eq!(target, "srv-1/nic-1/fip-1");
            assert_eq!(last_status.as_deref(), Some("pending"));
            assert_eq!(waited, Duration::from_secs(30));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn not_found_while_binding_is_fatal(harness: Harness) {
    harness.vpc.set_add_status("pending");
    harness
        .vpc
        .fail_next(GET_CALL, ApiError::not_found("floating IP fip-1 not found"));

    let err = NicFloatingIpResource
        .create(&harness.ctx, &config("fip-1"))
        .await
        .expect_err("create-path refresh errors are fatal");
    assert!(matches!(
        err,
        ProviderError::Remote {
            status: Some(404),
            operation: Operation::Create,
            ..
        }
    ));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn empty_floating_ip_is_rejected(harness: Harness) {
    let err = NicFloatingIpResource
        .create(&harness.ctx, &config(""))
        .await
        .expect_err("validation fails");
    assert!(matches!(err, ProviderError::Validation { .. }));
    assert!(harness.vpc.calls().is_empty());
}

#[rstest]
#[case("srv-1/nic-1")]
#[case("srv-1//fip-1")]
#[case("a/b/c/d")]
#[tokio::test]
async fn malformed_ids_are_rejected(harness: Harness, #[case] id: &str) {
    let err = NicFloatingIpResource
        .read(&harness.ctx, id)
        .await
        .expect_err("id rejected");
    assert!(matches!(err, ProviderError::Validation { .. }));
}

#[rstest]
#[tokio::test]
async fn read_of_missing_binding_is_none(harness: Harness) {
    let state = NicFloatingIpResource
        .read(&harness.ctx, "srv-1/nic-1/fip-1")
        .await
        .expect("read succeeds");
    assert!(state.is_none());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn delete_waits_until_binding_disappears(harness: Harness) {
    let created = NicFloatingIpResource
        .create(&harness.ctx, &config("fip-1"))
        .await
        .expect("create succeeds");
    harness.vpc.set_removal_lag(2);
    let started = Instant::now();

    NicFloatingIpResource
        .delete(&harness.ctx, &created.id)
        .await
        .expect("delete succeeds");

    // One existence check, two lagging reads, then the 404.
    assert_eq!(harness.vpc.calls_to(GET_CALL).len(), 4);
    assert_eq!(started.elapsed(), Duration::from_secs(30));
    assert!(!harness.vpc.is_bound("srv-1", "nic-1", "fip-1"));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn delete_of_missing_binding_succeeds(harness: Harness) {
    NicFloatingIpResource
        .delete(&harness.ctx, "srv-1/nic-1/fip-1")
        .await
        .expect("delete succeeds");
    assert!(harness
        .vpc
        .calls_to("remove_bare_metal_nic_floating_ip")
        .is_empty());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn cancelled_delete_wait_reports_cancellation(harness: Harness) {
    let created = NicFloatingIpResource
        .create(&harness.ctx, &config("fip-1"))
        .await
        .expect("create succeeds");
    harness.vpc.set_removal_lag(100);
    let token = CancellationToken::new();
    token.cancel();
    let ctx = harness.ctx.clone().with_cancellation(token);

    let err = NicFloatingIpResource
        .delete(&ctx, &created.id)
        .await
        .expect_err("wait cancelled");
    assert_eq!(
        err,
        ProviderError::Cancelled {
            resource: RESOURCE,
            operation: Operation::Delete,
            target: created.id.clone(),
            last_status: None,
        }
    );
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn cancelling_a_running_bind_wait_reports_the_last_status(harness: Harness) {
    harness.vpc.set_add_status("pending");
    harness.vpc.script_statuses("fip-1", &["pci_pending"]);
    let token = CancellationToken::new();
    let ctx = harness.ctx.clone().with_cancellation(token.clone());
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(15)).await;
        token.cancel();
    });

    let err = NicFloatingIpResource
        .create(&ctx, &config("fip-1"))
        .await
        .expect_err("wait cancelled");

    assert_eq!(
        err,
        ProviderError::Cancelled {
            resource: RESOURCE,
            operation: Operation::Create,
            target: String::from("srv-1/nic-1/fip-1"),
            last_status: Some(String::from("pending")),
        }
    );
    assert_eq!(harness.vpc.calls_to(GET_CALL).len(), 1);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn update_binds_the_new_floating_ip(harness: Harness) {
    let created = NicFloatingIpResource
        .create(&harness.ctx, &config("fip-1"))
        .await
        .expect("create succeeds");

    let updated = NicFloatingIpResource
        .update(&harness.ctx, &created, &config("fip-2"))
        .await
        .expect("update succeeds")
        .expect("binding exists");

    assert_eq!(updated.id, "srv-1/nic-1/fip-2");
    assert_eq!(updated.address, "203.0.113.20");
    assert!(harness.vpc.is_bound("srv-1", "nic-1", "fip-2"));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn unchanged_update_only_reads(harness: Harness) {
    let created = NicFloatingIpResource
        .create(&harness.ctx, &config("fip-1"))
        .await
        .expect("create succeeds");

    let updated = NicFloatingIpResource
        .update(&harness.ctx, &created, &config("fip-1"))
        .await
        .expect("update succeeds");

    assert_eq!(updated, Some(created));
    assert_eq!(harness.vpc.calls_to("add_bare_metal_nic_floating_ip").len(), 1);
}

#[rstest]
#[tokio::test]
async fn exists_follows_read(harness: Harness) {
    assert!(!NicFloatingIpResource
        .exists(&harness.ctx, "srv-1/nic-1/fip-1")
        .await
        .expect("exists succeeds"));
    NicFloatingIpResource
        .create(&harness.ctx, &config("fip-1"))
        .await
        .expect("create succeeds");
    assert!(NicFloatingIpResource
        .exists(&harness.ctx, "srv-1/nic-1/fip-1")
        .await
        .expect("exists succeeds"));
}
