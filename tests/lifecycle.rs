//! End-to-end lifecycles against the in-memory API doubles.

use std::sync::Arc;
use std::time::Duration;

use ibmvpc::api::TagKind;
use ibmvpc::data_sources::ManagersQuery;
use ibmvpc::resources::network_acl::{PortSpec, RuleSpec};
use ibmvpc::resources::{FloatingIpConfig, NetworkAclConfig};
use ibmvpc::test_support::{FakeTagApi, FakeVpcApi};
use ibmvpc::{
    DataSource, InstanceGroupManagersDataSource, NetworkAclResource, NicFloatingIpResource,
    ProviderContext, ProviderError, Resource, Timeouts,
};
use rstest::{fixture, rstest};

struct World {
    vpc: Arc<FakeVpcApi>,
    tags: Arc<FakeTagApi>,
    ctx: ProviderContext,
}

#[fixture]
fn world() -> World {
    let vpc = Arc::new(FakeVpcApi::new());
    let tags = Arc::new(FakeTagApi::default());
    let ctx = ProviderContext::new(vpc.clone(), tags.clone())
        .with_env_tags(vec![String::from("env:test")])
        .with_poll_interval(Duration::from_secs(5))
        .with_timeouts(Timeouts {
            delete: Duration::from_secs(60),
            ..Timeouts::default()
        });
    World { vpc, tags, ctx }
}

fn https_rule() -> RuleSpec {
    RuleSpec {
        name: String::from("allow-https"),
        action: String::from("allow"),
        direction: String::from("inbound"),
        source: String::from("0.0.0.0/0"),
        destination: String::from("10.240.0.0/24"),
        icmp: None,
        tcp: Some(PortSpec {
            port_min: 443,
            port_max: 443,
            ..PortSpec::default()
        }),
        udp: None,
    }
}

#[rstest]
#[tokio::test]
async fn network_acl_create_read_update_delete(world: World) {
    let config = NetworkAclConfig {
        name: Some(String::from("edge-acl")),
        vpc: String::from("vpc-7"),
        tags: vec![String::from("tier:edge")],
        access_tags: vec![String::from("project:edge")],
        rules: vec![https_rule()],
        ..NetworkAclConfig::default()
    };

    let created = NetworkAclResource
        .create(&world.ctx, &config)
        .await
        .expect("create succeeds");
    assert_eq!(created.vpc, "vpc-7");
    assert_eq!(created.rules.len(), 1);
    assert_eq!(created.access_tags, ["project:edge"]);
    assert_eq!(
        world.tags.tags_of(&created.crn, TagKind::User),
        ["tier:edge", "env:test"]
    );

    let read = NetworkAclResource
        .read(&world.ctx, &created.id)
        .await
        .expect("read succeeds");
    assert_eq!(read.as_ref(), Some(&created));

    let emptied = NetworkAclConfig {
        rules: Vec::new(),
        ..config
    };
    let updated = NetworkAclResource
        .update(&world.ctx, &created, &emptied)
        .await
        .expect("update succeeds")
        .expect("acl exists");
    assert!(updated.rules.is_empty());

    NetworkAclResource
        .delete(&world.ctx, &created.id)
        .await
        .expect("delete succeeds");
    let gone = NetworkAclResource
        .read(&world.ctx, &created.id)
        .await
        .expect("read after delete succeeds");
    assert!(gone.is_none());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn floating_ip_bind_and_unbind(world: World) {
    world.vpc.register_floating_ip("fip-a", "198.51.100.7");
    world.vpc.set_add_status("pending");
    world.vpc.script_statuses("fip-a", &["pending", "available"]);

    let config = FloatingIpConfig {
        bare_metal_server: String::from("bms-1"),
        network_interface: String::from("bms-1/nic-0"),
        floating_ip: String::from("fip-a"),
    };
    let bound = NicFloatingIpResource
        .create(&world.ctx, &config)
        .await
        .expect("bind succeeds");
    assert_eq!(bound.id, "bms-1/nic-0/fip-a");
    assert_eq!(bound.status, "available");

    world.vpc.set_removal_lag(1);
    NicFloatingIpResource
        .delete(&world.ctx, &bound.id)
        .await
        .expect("unbind succeeds");
    assert!(!world.vpc.is_bound("bms-1", "nic-0", "fip-a"));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn stalled_unbind_reports_timeout(world: World) {
    world.vpc.register_floating_ip("fip-a", "198.51.100.7");
    let config = FloatingIpConfig {
        bare_metal_server: String::from("bms-1"),
        network_interface: String::from("nic-0"),
        floating_ip: String::from("fip-a"),
    };
    let bound = NicFloatingIpResource
        .create(&world.ctx, &config)
        .await
        .expect("bind succeeds");

    world.vpc.set_removal_lag(1_000);
    let err = NicFloatingIpResource
        .delete(&world.ctx, &bound.id)
        .await
        .expect_err("unbind times out");
    let ProviderError::Timeout { last_status, .. } = err else {
        panic!("expected timeout, got {err:?}");
    };
    assert_eq!(last_status.as_deref(), Some("deleting"));
}

#[rstest]
#[tokio::test]
async fn empty_instance_group_lists_no_managers(world: World) {
    world.vpc.set_managers("group-empty", Vec::new());
    let state = InstanceGroupManagersDataSource
        .read(
            &world.ctx,
            &ManagersQuery {
                instance_group: String::from("group-empty"),
            },
        )
        .await
        .expect("read succeeds");
    assert!(state.managers.is_empty());
    assert_eq!(state.instance_group, "group-empty");
}
