// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end orchestrator scenarios against the simulated provider

use camino_tempfile::Utf8TempDir;
use console_common::model::ActionRequest;
use console_common::model::InstanceState;
use console_common::model::LimitValue;
use console_common::model::RouteRule;
use console_common::model::SecurityRule;
use console_common::model::UsageLineItem;
use console_common::model::VolumeAttachmentHandle;
use console_common::model::VolumeHandle;
use console_common::Error;
use console_common::ResourceType;
use console_credentials::CredentialStore;
use console_credentials::NewTenantCredential;
use console_orchestrator::Orchestrator;
use console_orchestrator::WaitPolicy;
use console_provider::sim::SimCloud;
use slog::o;
use slog::Logger;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

struct TestContext {
    _dir: Utf8TempDir,
    sim: SimCloud,
    orchestrator: Orchestrator,
    tenant_id: Uuid,
}

async fn setup() -> TestContext {
    let dir = Utf8TempDir::new().unwrap();
    let key_file = dir.path().join("key.pem");
    tokio::fs::write(&key_file, "-----BEGIN TEST KEY-----").await.unwrap();

    let log = Logger::root(slog::Discard, o!());
    let store = Arc::new(CredentialStore::new(
        dir.path().join("tenants.toml"),
        &log,
    ));
    let tenant = store
        .create(NewTenantCredential {
            display_name: String::from("test"),
            user_ocid: String::from("ocid1.user.oc1..test"),
            fingerprint: String::from("aa:bb:cc"),
            key_file,
            tenancy_id: String::from("ocid1.tenancy.oc1..test"),
            default_region: String::from("us-ashburn-1"),
            compartment_id: None,
        })
        .await
        .unwrap();

    let sim = SimCloud::new();
    let orchestrator = Orchestrator::new(
        store,
        Arc::new(sim.clone()),
        WaitPolicy::default(),
        &log,
    );
    TestContext { _dir: dir, sim, orchestrator, tenant_id: tenant.id }
}

fn action(ctx: &TestContext, instance_id: &str, action: &str) -> ActionRequest {
    ActionRequest {
        tenant_id: ctx.tenant_id,
        instance_id: instance_id.to_owned(),
        action: action.to_owned(),
        region: None,
    }
}

#[tokio::test(start_paused = true)]
async fn test_start_on_stopped_instance() {
    let ctx = setup().await;
    let seeded = ctx.sim.seed_instance("web-1", InstanceState::Stopped);

    let outcome = ctx
        .orchestrator
        .instance_action(&action(&ctx, &seeded.instance.id, "start"))
        .await
        .unwrap();
    assert!(matches!(
        outcome.state,
        Some(InstanceState::Starting | InstanceState::Running)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_start_on_running_is_rejected_locally() {
    let ctx = setup().await;
    let seeded = ctx.sim.seed_instance("web-1", InstanceState::Running);

    let err = ctx
        .orchestrator
        .instance_action(&action(&ctx, &seeded.instance.id, "start"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRequest { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_action_string() {
    let ctx = setup().await;
    let seeded = ctx.sim.seed_instance("web-1", InstanceState::Running);

    let err = ctx
        .orchestrator
        .instance_action(&action(&ctx, &seeded.instance.id, "softreset"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRequest { .. }));

    // "restart" is an accepted alias for reset.
    let outcome = ctx
        .orchestrator
        .instance_action(&action(&ctx, &seeded.instance.id, "restart"))
        .await
        .unwrap();
    assert!(outcome.state.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_terminate_is_idempotent_and_destroys_boot_volume() {
    let ctx = setup().await;
    let seeded = ctx.sim.seed_instance("web-1", InstanceState::Running);

    ctx.orchestrator
        .instance_action(&action(&ctx, &seeded.instance.id, "terminate"))
        .await
        .unwrap();
    // The boot volume goes with the instance.
    assert_eq!(ctx.sim.last_preserve_boot_volume(), Some(false));

    // Terminating a terminated instance succeeds without a provider call.
    let gone = ctx.sim.seed_instance("old", InstanceState::Terminated);
    let outcome = ctx
        .orchestrator
        .instance_action(&action(&ctx, &gone.instance.id, "terminate"))
        .await
        .unwrap();
    assert_eq!(outcome.state, Some(InstanceState::Terminated));

    // Any other action on a terminated instance is a caller error.
    let err = ctx
        .orchestrator
        .instance_action(&action(&ctx, &gone.instance.id, "stop"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRequest { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_unknown_tenant_and_instance() {
    let ctx = setup().await;

    let err = ctx
        .orchestrator
        .get_instance(Uuid::new_v4(), None, "ocid1.instance.oc1..x")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::ObjectNotFound { type_name: ResourceType::Tenant, .. }
    ));

    let err = ctx
        .orchestrator
        .get_instance(ctx.tenant_id, None, "ocid1.instance.oc1..x")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::ObjectNotFound { type_name: ResourceType::Instance, .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_listing_enriches_addresses() {
    let ctx = setup().await;
    let seeded = ctx.sim.seed_instance("web-1", InstanceState::Running);

    let views = ctx
        .orchestrator
        .list_instances(ctx.tenant_id, None)
        .await
        .unwrap();
    assert_eq!(views.len(), 1);
    let view = &views[0];
    assert_eq!(view.id, seeded.instance.id);
    assert_eq!(view.private_ip.as_deref(), Some(seeded.vnic.private_ip.as_str()));
    assert_eq!(view.public_ip, seeded.vnic.public_ip);
    assert_eq!(view.ocpus, Some(2.0));
}

#[tokio::test(start_paused = true)]
async fn test_change_public_ip_yields_new_address() {
    let ctx = setup().await;
    let seeded = ctx.sim.seed_instance("web-1", InstanceState::Running);
    let old_address = seeded.public_ip.ip_address.clone();

    let view = ctx
        .orchestrator
        .change_public_ip(
            ctx.tenant_id,
            None,
            &seeded.instance.id,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    let new_address = view.public_ip.expect("replacement address assigned");
    assert_ne!(new_address, old_address);
}

#[tokio::test(start_paused = true)]
async fn test_change_public_ip_cancellation() {
    let ctx = setup().await;
    let seeded = ctx.sim.seed_instance("web-1", InstanceState::Running);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = ctx
        .orchestrator
        .change_public_ip(ctx.tenant_id, None, &seeded.instance.id, &cancel)
        .await
        .unwrap_err();
    // The failure names the step that was interrupted.
    assert!(matches!(err, Error::PublicIpReplacement { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_change_public_ip_cancelled_during_settle() {
    let ctx = setup().await;
    let seeded = ctx.sim.seed_instance("web-1", InstanceState::Running);

    // Fire the cancellation while the post-release settle pause (10s by
    // default) is in progress.
    let cancel = CancellationToken::new();
    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            cancel.cancel();
        })
    };
    let err = ctx
        .orchestrator
        .change_public_ip(ctx.tenant_id, None, &seeded.instance.id, &cancel)
        .await
        .unwrap_err();
    canceller.await.unwrap();

    // Even an interrupted settle pause is tagged with its step.
    match err {
        Error::PublicIpReplacement { step, source } => {
            assert_eq!(step, "settle after release");
            assert!(matches!(*source, Error::Unavailable { .. }));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_vnic_attach_and_detach() {
    let ctx = setup().await;
    let seeded = ctx.sim.seed_instance("web-1", InstanceState::Running);
    let cancel = CancellationToken::new();

    let vnic = ctx
        .orchestrator
        .attach_vnic(
            ctx.tenant_id,
            None,
            &seeded.instance.id,
            "ocid1.subnet.oc1..second",
            Some("secondary"),
            false,
            &cancel,
        )
        .await
        .unwrap();
    assert!(!vnic.is_primary);
    assert!(vnic.public_ip.is_none());

    let views = ctx
        .orchestrator
        .list_vnics(ctx.tenant_id, None, &seeded.instance.id)
        .await
        .unwrap();
    assert_eq!(views.len(), 2);

    ctx.orchestrator
        .detach_vnic(ctx.tenant_id, None, &vnic.attachment_id, &cancel)
        .await
        .unwrap();

    // Detaching an attachment that never existed is success.
    ctx.orchestrator
        .detach_vnic(
            ctx.tenant_id,
            None,
            "ocid1.vnicattachment.oc1..gone",
            &cancel,
        )
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_volume_attach_detach_round_trip() {
    let ctx = setup().await;
    let seeded = ctx.sim.seed_instance("db-1", InstanceState::Running);
    let volume = ctx.sim.seed_volume(false, "data", 100);
    let cancel = CancellationToken::new();

    let attachment = ctx
        .orchestrator
        .attach_volume(
            ctx.tenant_id,
            None,
            &seeded.instance.id,
            &volume.handle,
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(attachment.volume, volume.handle);

    let views = ctx
        .orchestrator
        .list_volumes(ctx.tenant_id, None, &seeded.instance.id)
        .await
        .unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].size_in_gbs, 100);

    ctx.orchestrator
        .detach_volume(ctx.tenant_id, None, &attachment.handle, &cancel)
        .await
        .unwrap();

    // Idempotent: a second detach of the same attachment also succeeds.
    ctx.orchestrator
        .detach_volume(ctx.tenant_id, None, &attachment.handle, &cancel)
        .await
        .unwrap();

    // As does a detach of an attachment that never existed.
    ctx.orchestrator
        .detach_volume(
            ctx.tenant_id,
            None,
            &VolumeAttachmentHandle::Block(String::from(
                "ocid1.volumeattachment.oc1..gone",
            )),
            &cancel,
        )
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_boot_volume_reattach_is_idempotent() {
    let ctx = setup().await;
    let a = ctx.sim.seed_instance("a", InstanceState::Stopped);
    let b = ctx.sim.seed_instance("b", InstanceState::Stopped);
    let (volume, existing) =
        ctx.sim.seed_attached_volume(&a.instance.id, true, "boot", 50);
    let cancel = CancellationToken::new();

    // Re-attaching to the same instance resolves to the existing
    // attachment instead of surfacing the provider conflict.
    let attachment = ctx
        .orchestrator
        .attach_volume(
            ctx.tenant_id,
            None,
            &a.instance.id,
            &volume.handle,
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(attachment.handle, existing.handle);

    // Attaching to a different instance is a real conflict.
    let err = ctx
        .orchestrator
        .attach_volume(
            ctx.tenant_id,
            None,
            &b.instance.id,
            &volume.handle,
            &cancel,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ResourceBusy { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_boot_volume_shrink_rejected_locally() {
    let ctx = setup().await;
    let boot = ctx.sim.seed_volume(true, "boot", 100);

    let err = ctx
        .orchestrator
        .update_volume(ctx.tenant_id, None, &boot.handle, 50, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRequest { .. }));

    // Growth is fine.
    let grown = ctx
        .orchestrator
        .update_volume(ctx.tenant_id, None, &boot.handle, 200, Some(20))
        .await
        .unwrap();
    assert_eq!(grown.size_in_gbs, 200);
    assert_eq!(grown.vpus_per_gb, 20);
}

#[tokio::test(start_paused = true)]
async fn test_busy_volume_update_is_retryable() {
    let ctx = setup().await;
    let volume = ctx.sim.seed_volume(false, "data", 100);
    ctx.sim.set_volume_busy(volume.handle.id());

    let err = ctx
        .orchestrator
        .update_volume(ctx.tenant_id, None, &volume.handle, 200, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ResourceBusy { .. }));
    assert!(err.retryable());
}

#[tokio::test(start_paused = true)]
async fn test_volume_handles_parse_once_at_boundary() {
    let ctx = setup().await;
    let seeded = ctx.sim.seed_instance("db-1", InstanceState::Running);
    ctx.sim.seed_attached_volume(&seeded.instance.id, true, "boot", 50);
    ctx.sim.seed_attached_volume(&seeded.instance.id, false, "data", 100);

    let views = ctx
        .orchestrator
        .list_volumes(ctx.tenant_id, None, &seeded.instance.id)
        .await
        .unwrap();
    assert_eq!(views.len(), 2);
    let boot: Vec<_> = views.iter().filter(|v| v.handle.is_boot()).collect();
    assert_eq!(boot.len(), 1);
    assert!(matches!(boot[0].attachment, VolumeAttachmentHandle::Boot(_)));
    assert!(boot[0].handle.id().starts_with("ocid1.bootvolume."));
}

#[tokio::test(start_paused = true)]
async fn test_security_list_full_replacement_round_trip() {
    let ctx = setup().await;
    let vcn = ctx.sim.seed_vcn("main", "10.0.0.0/16");
    let list = ctx.sim.seed_security_list(
        &vcn.id,
        "default",
        vec![SecurityRule {
            protocol: String::from("6"),
            cidr: String::from("0.0.0.0/0"),
            description: Some(String::from("ssh")),
            port_min: Some(22),
            port_max: Some(22),
        }],
        vec![],
    );

    let replacement = vec![SecurityRule {
        protocol: String::from("6"),
        cidr: String::from("10.0.0.0/8"),
        description: Some(String::from("internal https")),
        port_min: Some(443),
        port_max: Some(443),
    }];
    ctx.orchestrator
        .update_security_list(ctx.tenant_id, None, &list.id, &replacement, &[])
        .await
        .unwrap();

    let fetched = ctx
        .orchestrator
        .get_security_list(ctx.tenant_id, None, &list.id)
        .await
        .unwrap();
    assert_eq!(fetched.ingress_rules, replacement);
    assert!(fetched.egress_rules.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_route_table_full_replacement_round_trip() {
    let ctx = setup().await;
    let vcn = ctx.sim.seed_vcn("main", "10.0.0.0/16");
    let table = ctx.sim.seed_route_table(
        &vcn.id,
        "default",
        vec![RouteRule {
            destination: String::from("0.0.0.0/0"),
            network_entity_id: String::from("ocid1.internetgateway.oc1..a"),
            description: None,
        }],
    );

    let replacement = vec![RouteRule {
        destination: String::from("192.168.0.0/16"),
        network_entity_id: String::from("ocid1.drg.oc1..b"),
        description: Some(String::from("on-prem")),
    }];
    ctx.orchestrator
        .update_route_table(ctx.tenant_id, None, &table.id, &replacement)
        .await
        .unwrap();

    let fetched = ctx
        .orchestrator
        .get_route_table(ctx.tenant_id, None, &table.id)
        .await
        .unwrap();
    assert_eq!(fetched.route_rules, replacement);
}

#[tokio::test(start_paused = true)]
async fn test_vcn_and_subnet_lifecycle() {
    let ctx = setup().await;
    let vcn = ctx
        .orchestrator
        .create_vcn(ctx.tenant_id, None, "main", "10.0.0.0/16", Some("main"))
        .await
        .unwrap();
    let subnet = ctx
        .orchestrator
        .create_subnet(ctx.tenant_id, None, &vcn.id, "app", "10.0.1.0/24")
        .await
        .unwrap();

    // A VCN with subnets cannot be deleted.
    let err = ctx
        .orchestrator
        .delete_vcn(ctx.tenant_id, None, &vcn.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ResourceBusy { .. }));

    ctx.orchestrator
        .delete_subnet(ctx.tenant_id, None, &subnet.id)
        .await
        .unwrap();
    ctx.orchestrator
        .delete_vcn(ctx.tenant_id, None, &vcn.id)
        .await
        .unwrap();
    // Deleting again is idempotent success.
    ctx.orchestrator
        .delete_vcn(ctx.tenant_id, None, &vcn.id)
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_usage_summary_spans_pages() {
    let ctx = setup().await;
    ctx.sim.seed_usage_page(vec![
        UsageLineItem {
            service: Some(String::from("Compute")),
            sku_name: Some(String::from("E4 OCPU")),
            unit: Some(String::from("OCPU Hours")),
            computed_quantity: Some(10.0),
            computed_amount: Some(1.0),
        },
        UsageLineItem {
            service: Some(String::from("Compute")),
            sku_name: Some(String::from("E4 Memory")),
            unit: None,
            computed_quantity: Some(0.0),
            computed_amount: Some(5.0),
        },
    ]);
    ctx.sim.seed_usage_page(vec![UsageLineItem {
        service: Some(String::from("Compute")),
        sku_name: Some(String::from("E4 OCPU")),
        unit: Some(String::from("OCPU Hours")),
        computed_quantity: Some(5.0),
        computed_amount: Some(0.5),
    }]);

    let now = chrono::Utc::now();
    let summaries = ctx
        .orchestrator
        .get_usage_summary(
            ctx.tenant_id,
            now - chrono::Duration::days(30),
            now,
            "DAILY",
        )
        .await
        .unwrap();
    // The zero-quantity memory line is dropped; the OCPU lines from both
    // pages fold into one row.
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].total_quantity, 15.0);
    assert!((summaries[0].total_cost - 1.5).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_quota_report_skips_zero_limits_and_sorts_by_usage() {
    let ctx = setup().await;
    ctx.sim.seed_service("compute", "Compute");
    ctx.sim.seed_limit(
        "compute",
        LimitValue {
            name: String::from("standard-e4-core-count"),
            scope_type: String::from("AD"),
            availability_domain: Some(String::from("sim-AD-1")),
            value: 100,
        },
    );
    ctx.sim.seed_limit(
        "compute",
        LimitValue {
            name: String::from("gpu-count"),
            scope_type: String::from("AD"),
            availability_domain: Some(String::from("sim-AD-1")),
            value: 0,
        },
    );
    ctx.sim.seed_limit(
        "compute",
        LimitValue {
            name: String::from("vcn-count"),
            scope_type: String::from("REGION"),
            availability_domain: None,
            value: 50,
        },
    );
    ctx.sim.seed_availability("compute", "standard-e4-core-count", 80, 20);
    // No availability seeded for vcn-count: reported as unused.

    let entries = ctx
        .orchestrator
        .get_service_quotas(ctx.tenant_id, None, "compute")
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].limit_name, "standard-e4-core-count");
    assert_eq!(entries[0].used, 80);
    assert!((entries[0].usage_rate - 80.0).abs() < 1e-9);
    assert_eq!(entries[1].limit_name, "vcn-count");
    assert_eq!(entries[1].used, 0);
    assert_eq!(entries[1].available, 50);
    assert_eq!(entries[1].usage_rate, 0.0);

    let services = ctx
        .orchestrator
        .list_limit_services(ctx.tenant_id, None)
        .await
        .unwrap();
    assert_eq!(services.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_console_connection_lifecycle() {
    let ctx = setup().await;
    let seeded = ctx.sim.seed_instance("web-1", InstanceState::Running);

    let conn = ctx
        .orchestrator
        .create_console_connection(
            ctx.tenant_id,
            None,
            &seeded.instance.id,
            "ssh-ed25519 AAAA...",
        )
        .await
        .unwrap();
    assert!(conn.connection_string.is_some());

    let listed = ctx
        .orchestrator
        .list_console_connections(ctx.tenant_id, None, &seeded.instance.id)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    ctx.orchestrator
        .delete_console_connection(ctx.tenant_id, None, &conn.id)
        .await
        .unwrap();
    // Idempotent.
    ctx.orchestrator
        .delete_console_connection(ctx.tenant_id, None, &conn.id)
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_launch_instance_then_list() {
    let ctx = setup().await;
    let spec = console_common::model::LaunchInstanceSpec {
        display_name: String::from("fresh"),
        availability_domain: String::from("sim-AD-1"),
        shape: String::from("VM.Standard.E4.Flex"),
        image_id: String::from("ocid1.image.oc1..ol9"),
        subnet_id: String::from("ocid1.subnet.oc1..app"),
        boot_volume_size_in_gbs: Some(100),
        ocpus: Some(4.0),
        memory_in_gbs: Some(64.0),
        ssh_authorized_keys: Some(String::from("ssh-ed25519 AAAA...")),
        assign_public_ip: true,
    };
    // Launch waits for the instance to come up.
    let view = ctx
        .orchestrator
        .launch_instance(ctx.tenant_id, None, &spec, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(view.lifecycle_state, InstanceState::Running);
    assert_eq!(view.ocpus, Some(4.0));
    assert!(view.public_ip.is_some());
    assert!(view.private_ip.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_available_volume_listing() {
    let ctx = setup().await;
    ctx.sim.seed_volume(false, "data", 100);
    ctx.sim.seed_volume(true, "boot", 50);

    let volumes = ctx
        .orchestrator
        .list_available_volumes(ctx.tenant_id, None, "sim-AD-1")
        .await
        .unwrap();
    assert_eq!(volumes.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_security_list_create_and_delete() {
    let ctx = setup().await;
    let vcn = ctx.sim.seed_vcn("main", "10.0.0.0/16");

    let list = ctx
        .orchestrator
        .create_security_list(ctx.tenant_id, None, &vcn.id, "app", &[], &[])
        .await
        .unwrap();
    let listed = ctx
        .orchestrator
        .list_security_lists(ctx.tenant_id, None, &vcn.id)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    ctx.orchestrator
        .delete_security_list(ctx.tenant_id, None, &list.id)
        .await
        .unwrap();
    // Idempotent.
    ctx.orchestrator
        .delete_security_list(ctx.tenant_id, None, &list.id)
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_region_override_reaches_client() {
    let ctx = setup().await;
    let seeded = ctx.sim.seed_instance("web-1", InstanceState::Stopped);
    let mut request = action(&ctx, &seeded.instance.id, "start");
    request.region = Some(String::from("eu-frankfurt-1"));
    // The sim serves all regions; this exercises the override path end to
    // end, including key re-resolution.
    ctx.orchestrator.instance_action(&request).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_block_volume_attach_unknown_volume() {
    let ctx = setup().await;
    let seeded = ctx.sim.seed_instance("db-1", InstanceState::Running);
    let err = ctx
        .orchestrator
        .attach_volume(
            ctx.tenant_id,
            None,
            &seeded.instance.id,
            &VolumeHandle::Block(String::from("ocid1.volume.oc1..gone")),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::ObjectNotFound { type_name: ResourceType::BlockVolume, .. }
    ));
}
