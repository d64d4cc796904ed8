//! Create, read, upsert, and delete through the public store API.

use gwstore_core::{
    Consumer, DeleteOpts, ForeignKey, ObjectStore, ObjectType, Plugin, ReadOpts, Resource,
    Service, StoreConfig, StoreError,
};
use gwstore_kv::InMemoryKv;
use gwstore_testkit::prelude::*;
use std::sync::Arc;

#[test]
fn every_kind_round_trips() {
    init_test_logging();
    let fx = TestStore::new();
    let svc = fx.service("billing");
    let route = fx.route("billing-route", &svc);
    let consumer = fx.consumer("alice");
    let plugin = fx.plugin("rate-limiting", &svc);
    let upstream = fx.upstream("billing.upstream");
    let target = fx.target("10.0.0.7:8080", &upstream);
    let cert = fx.certificate();
    let sni = fx.sni("billing.example.com", &cert);

    let expected = [
        Resource::Service(svc),
        Resource::Route(route),
        Resource::Consumer(consumer),
        Resource::Plugin(plugin),
        Resource::Upstream(upstream),
        Resource::Target(target),
        Resource::Certificate(cert),
        Resource::Sni(sni),
    ];
    for resource in expected {
        let ty = gwstore_core::Object::object_type(&resource);
        let id = gwstore_core::Object::id(&resource).to_string();
        let read = fx.store.get(&fx.ctx, ty, &id).unwrap();
        assert_eq!(read, resource, "{ty} did not round-trip");
    }
}

#[test]
fn read_by_index_and_name_or_id() {
    let fx = TestStore::new();
    let consumer = fx.consumer("bob");

    let mut by_username = Consumer::default();
    fx.store
        .read(&fx.ctx, &mut by_username, &ReadOpts::by_index("username", "bob"))
        .unwrap();
    assert_eq!(by_username, consumer);

    let svc = fx.service("checkout");
    let mut by_name = Service::default();
    fx.store
        .read(&fx.ctx, &mut by_name, &ReadOpts::by_name_or_id("checkout"))
        .unwrap();
    assert_eq!(by_name.meta.id, svc.meta.id);

    let mut by_id = Service::default();
    fx.store
        .read(&fx.ctx, &mut by_id, &ReadOpts::by_name_or_id(svc.meta.id.clone()))
        .unwrap();
    assert_eq!(by_id, svc);

    let mut missing = Service::default();
    let err = fx
        .store
        .read(&fx.ctx, &mut missing, &ReadOpts::by_name_or_id("nobody"))
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn create_rejects_invalid_objects_without_writing() {
    let fx = TestStore::new();
    let mut svc = Service {
        name: "bad name!".to_string(),
        ..Service::default()
    };
    let err = fx.store.create(&fx.ctx, &mut svc).unwrap_err();
    let validation = err.as_validation().unwrap();
    assert!(!validation.messages_for("name").is_empty());
    assert_eq!(validation.messages_for("host"), ["required"]);
    assert!(fx.keys().is_empty());
}

#[test]
fn upsert_creates_then_replaces() {
    let fx = TestStore::new();
    let mut svc = sample_service("orders");
    fx.store.upsert(&fx.ctx, &mut svc).unwrap();
    let keys_after_create = fx.keys();

    svc.port = 8443;
    svc.protocol = "https".to_string();
    fx.store.upsert(&fx.ctx, &mut svc).unwrap();
    assert_eq!(fx.keys(), keys_after_create);

    let read = fx.store.get(&fx.ctx, ObjectType::Service, &svc.meta.id).unwrap();
    let read: Service = read.expect_kind();
    assert_eq!(read.port, 8443);
    assert_eq!(read.protocol, "https");
}

#[test]
fn upsert_reconciles_changed_index_values() {
    let fx = TestStore::new();
    let mut svc = sample_service("old-name");
    fx.store.create(&fx.ctx, &mut svc).unwrap();

    svc.name = "new-name".to_string();
    fx.store.upsert(&fx.ctx, &mut svc).unwrap();

    let keys = fx.keys();
    assert!(keys.contains(&"ix/u/service/name/new-name".to_string()));
    assert!(!keys.contains(&"ix/u/service/name/old-name".to_string()));

    // The old name is free again.
    fx.service("old-name");
}

#[test]
fn upsert_moves_reverse_index() {
    let fx = TestStore::new();
    let first = fx.service("first");
    let second = fx.service("second");
    let mut route = fx.route("moving", &first);

    route.service = Some(ForeignKey::new(second.meta.id.clone()));
    fx.store.upsert(&fx.ctx, &mut route).unwrap();

    // The first service has no referrers left.
    fx.store
        .delete(&fx.ctx, &DeleteOpts::new(ObjectType::Service, first.meta.id.clone()))
        .unwrap();
    let err = fx
        .store
        .delete(&fx.ctx, &DeleteOpts::new(ObjectType::Service, second.meta.id.clone()))
        .unwrap_err();
    assert!(err.as_constraint().is_some());
}

#[test]
fn upsert_conflicting_with_another_object_keeps_previous_state() {
    let fx = TestStore::new();
    fx.service("taken");
    let mut svc = fx.service("mine");
    let before = fx.keys();

    svc.name = "taken".to_string();
    let err = fx.store.upsert(&fx.ctx, &mut svc).unwrap_err();
    assert!(err.as_constraint().is_some());
    assert_eq!(fx.keys(), before);

    let mut by_name = Service::default();
    fx.store
        .read(&fx.ctx, &mut by_name, &ReadOpts::by_name("mine"))
        .unwrap();
}

#[test]
fn delete_missing_is_not_found() {
    let fx = TestStore::new();
    let err = fx
        .store
        .delete(
            &fx.ctx,
            &DeleteOpts::new(ObjectType::Route, "0b3a6f43-6c1e-4d4d-8f0e-6a7a1b9c2d11"),
        )
        .unwrap_err();
    assert_eq!(err, StoreError::NotFound);
}

#[test]
fn delete_leaves_no_keys_behind() {
    let fx = TestStore::new();
    let svc = fx.service("svc");
    let consumer = fx.consumer("carol");
    let mut plugin = Plugin {
        name: "key-auth".to_string(),
        service: Some(ForeignKey::new(svc.meta.id.clone())),
        consumer: Some(ForeignKey::new(consumer.meta.id.clone())),
        ..Plugin::default()
    };
    fx.store.create(&fx.ctx, &mut plugin).unwrap();

    fx.store
        .delete(&fx.ctx, &DeleteOpts::new(ObjectType::Plugin, plugin.meta.id.clone()))
        .unwrap();
    fx.store
        .delete(&fx.ctx, &DeleteOpts::new(ObjectType::Consumer, consumer.meta.id.clone()))
        .unwrap();
    fx.store
        .delete(&fx.ctx, &DeleteOpts::new(ObjectType::Service, svc.meta.id.clone()))
        .unwrap();
    assert!(fx.keys().is_empty(), "leftover keys: {:?}", fx.keys());
}

#[test]
fn clusters_are_isolated() {
    let kv = Arc::new(InMemoryKv::new());
    let tenant_a = ObjectStore::new(kv.clone(), StoreConfig::new().cluster("tenant-a"));
    let tenant_b = tenant_a.for_cluster("tenant-b");
    let ctx = gwstore_core::Context::background();

    let mut a = sample_service("shared-name");
    tenant_a.create(&ctx, &mut a).unwrap();
    let mut b = sample_service("shared-name");
    tenant_b.create(&ctx, &mut b).unwrap();

    let err = tenant_b
        .get(&ctx, ObjectType::Service, &a.meta.id)
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(kv.keys().iter().all(|k| k.starts_with("c/tenant-")));
    assert_eq!(kv.len(), 4);
}
