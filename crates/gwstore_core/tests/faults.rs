//! Backend failures, cancellation, and deadlines.

use gwstore_core::{
    Context, DeleteOpts, Index, Object, ObjectType, StoreError, StoreResult, ValidationError,
};
use gwstore_testkit::prelude::*;
use std::time::{Duration, Instant};

#[test]
fn index_cleanup_failure_does_not_fail_delete() {
    init_test_logging();
    let fx = TestStore::faulty();
    let svc = fx.service("web");
    fx.kv.fail(FaultOp::Delete, "ix/");

    fx.store
        .delete(&fx.ctx, &DeleteOpts::new(ObjectType::Service, svc.meta.id.clone()))
        .unwrap();
    assert_eq!(fx.kv.injected_count(), 1);

    let keys = fx.kv.inner().keys();
    assert_eq!(keys, ["ix/u/service/name/web"]);
    let err = fx
        .store
        .get(&fx.ctx, ObjectType::Service, &svc.meta.id)
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn backend_write_failure_is_opaque_and_atomic() {
    let fx = TestStore::faulty();
    fx.kv.fail(FaultOp::Put, "service/");

    let mut svc = sample_service("web");
    let err = fx.store.create(&fx.ctx, &mut svc).unwrap_err();
    assert_eq!(err, StoreError::Internal);
    assert_eq!(err.to_string(), "internal error");
    assert!(fx.kv.inner().is_empty());
}

#[test]
fn backend_read_failure_is_opaque() {
    let fx = TestStore::faulty();
    let svc = fx.service("web");
    fx.kv.fail(FaultOp::Get, "service/");

    let err = fx
        .store
        .get(&fx.ctx, ObjectType::Service, &svc.meta.id)
        .unwrap_err();
    assert_eq!(err.to_string(), "internal error");
}

#[test]
fn commit_failure_leaves_nothing_behind() {
    let fx = TestStore::faulty();
    fx.kv.fail(FaultOp::Commit, "");
    let mut svc = sample_service("web");
    assert_eq!(fx.store.create(&fx.ctx, &mut svc).unwrap_err(), StoreError::Internal);
    assert!(fx.kv.inner().is_empty());
}

#[test]
fn expired_deadline_is_rejected_before_writing() {
    let fx = TestStore::new();
    let ctx = Context::with_deadline(Instant::now());
    let err = fx.store.create(&ctx, &mut sample_service("late")).unwrap_err();
    assert_eq!(err, StoreError::DeadlineExceeded);
    assert!(fx.keys().is_empty());

    let ctx = Context::with_timeout(Duration::from_secs(60));
    fx.store.create(&ctx, &mut sample_service("on-time")).unwrap();
}

/// An object that cancels its context while its indexes are being written.
#[derive(Debug, Clone)]
struct CancelsMidway {
    id: String,
    ctx: Context,
}

impl Object for CancelsMidway {
    fn object_type(&self) -> ObjectType {
        ObjectType::Consumer
    }
    fn id(&self) -> &str {
        &self.id
    }
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
    fn tags(&self) -> &[String] {
        &[]
    }
    fn indexes(&self) -> Vec<Index> {
        self.ctx.cancel();
        vec![Index::unique("username", "username", "midway")]
    }
    fn process_defaults(&mut self) -> StoreResult<()> {
        Ok(())
    }
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
    fn encode(&self) -> StoreResult<Vec<u8>> {
        Ok(b"{}".to_vec())
    }
    fn decode_into(&mut self, _bytes: &[u8]) -> StoreResult<()> {
        Ok(())
    }
}

#[test]
fn cancellation_inside_transaction_rolls_back() {
    let fx = TestStore::new();
    let ctx = Context::background();
    let mut object = CancelsMidway {
        id: String::new(),
        ctx: ctx.clone(),
    };

    let err = fx.store.create(&ctx, &mut object).unwrap_err();
    assert_eq!(err, StoreError::Cancelled);
    assert!(!object.id.is_empty());
    assert!(fx.keys().is_empty(), "committed: {:?}", fx.keys());
}
