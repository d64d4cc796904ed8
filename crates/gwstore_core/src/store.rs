//! Object store facade.

use crate::config::StoreConfig;
use crate::context::Context;
use crate::error::{ConstraintError, StoreError, StoreResult};
use crate::index::{Index, IndexEngine};
use crate::keys::{ClusterId, KeySpace};
use crate::object::{Object, ObjectType};
use crate::options::{DeleteOpts, ListOpts, ListScope, ReadOpts};
use crate::resource::{Resource, ResourceKind};
use gwstore_kv::{KvBackend, KvError, KvListOpts, KvPair, KvTx};
use std::sync::Arc;
use uuid::Uuid;

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage<O> {
    /// Objects in this page, ordered by storage key.
    pub items: Vec<O>,
    /// Number of matching objects across all pages.
    pub total_count: usize,
    /// The next page number, present only if more objects remain.
    pub next_page: Option<usize>,
}

impl<O> ListPage<O> {
    fn map<T>(self, f: impl FnMut(O) -> T) -> ListPage<T> {
        ListPage {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            next_page: self.next_page,
        }
    }
}

/// Typed CRUD over a [`KvBackend`].
///
/// Every mutation runs in one backend transaction: the primary record and
/// all index entries are written together or not at all.
///
/// ```rust
/// use gwstore_core::{Context, ObjectStore, ReadOpts, Service, StoreConfig};
/// use gwstore_kv::InMemoryKv;
/// use std::sync::Arc;
///
/// let store = ObjectStore::new(Arc::new(InMemoryKv::new()), StoreConfig::default());
/// let ctx = Context::background();
///
/// let mut svc = Service { name: "billing".into(), host: "billing.internal".into(), ..Service::default() };
/// store.create(&ctx, &mut svc).unwrap();
///
/// let mut read = Service::default();
/// store.read(&ctx, &mut read, &ReadOpts::by_name("billing")).unwrap();
/// assert_eq!(read.meta.id, svc.meta.id);
/// ```
#[derive(Clone)]
pub struct ObjectStore {
    kv: Arc<dyn KvBackend>,
    keys: KeySpace,
    config: StoreConfig,
}

impl std::fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStore")
            .field("keys", &self.keys)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ObjectStore {
    /// Creates a store over `kv`.
    ///
    /// # Panics
    ///
    /// Panics if `config.cluster` is not a valid cluster identifier. A store
    /// must never silently fall back to another key space.
    #[must_use]
    pub fn new(kv: Arc<dyn KvBackend>, config: StoreConfig) -> Self {
        let keys = match &config.cluster {
            Some(cluster) => KeySpace::clustered(&cluster_id(cluster)),
            None => KeySpace::global(),
        };
        Self { kv, keys, config }
    }

    /// Returns a store over the same backend namespaced under `cluster`.
    ///
    /// # Panics
    ///
    /// Panics if `cluster` is not a valid cluster identifier.
    #[must_use]
    pub fn for_cluster(&self, cluster: &str) -> Self {
        let config = self.config.clone().cluster(cluster);
        Self {
            kv: Arc::clone(&self.kv),
            keys: KeySpace::clustered(&cluster_id(cluster)),
            config,
        }
    }

    /// Returns the store's configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the key space this store reads and writes.
    #[must_use]
    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    fn engine(&self) -> IndexEngine<'_> {
        IndexEngine::new(&self.keys, self.config.reference_scan_limit)
    }

    /// Runs `f` in a transaction, committing if it succeeds and the context
    /// is still live, rolling back otherwise.
    fn with_tx<T, F>(&self, ctx: &Context, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut dyn KvTx) -> StoreResult<T>,
    {
        ctx.check()?;
        let mut tx = self
            .kv
            .begin()
            .map_err(|e| StoreError::internal("begin transaction", e))?;

        let result = f(tx.as_mut()).and_then(|value| ctx.check().map(|()| value));
        match result {
            Ok(value) => {
                tx.commit()
                    .map_err(|e| StoreError::internal("commit transaction", e))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback() {
                    tracing::warn!(
                        target: "gwstore::store",
                        error = %rollback,
                        "failed to roll back transaction"
                    );
                }
                Err(err)
            }
        }
    }

    /// Prepares an object for writing: assigns an ID if missing, fills
    /// defaults, validates, and encodes it.
    fn prepare<O: Object>(object: &mut O) -> StoreResult<Vec<u8>> {
        if object.id().is_empty() {
            object.set_id(Uuid::new_v4().to_string());
        }
        object.process_defaults()?;
        if let Err(errors) = object.validate() {
            tracing::debug!(
                object_type = %object.object_type(),
                object_id = object.id(),
                %errors,
                "object failed validation"
            );
            return Err(errors.into());
        }
        object.encode()
    }

    /// Stores a new object.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Validation`] if the object is invalid
    /// - [`StoreError::Constraint`] if the ID or a unique value is taken, or
    ///   a referenced object does not exist
    /// - [`StoreError::Cancelled`] / [`StoreError::DeadlineExceeded`]
    /// - [`StoreError::Internal`] on backend failures
    pub fn create<O: Object>(&self, ctx: &Context, object: &mut O) -> StoreResult<()> {
        let value = Self::prepare(object)?;
        let object = &*object;
        let key = self.keys.primary(object.object_type(), object.id());
        let engine = self.engine();

        self.with_tx(ctx, |tx| {
            match tx.get(&key) {
                Ok(_) => {
                    return Err(ConstraintError::unique(Index::unique("id", "id", object.id())).into())
                }
                Err(KvError::NotFound { .. }) => {}
                Err(e) => return Err(StoreError::internal("check primary key", e)),
            }
            engine.create_indexes(tx, object)?;
            tx.put(&key, &value)
                .map_err(|e| StoreError::internal("write object", e))
        })?;

        tracing::debug!(object_type = %object.object_type(), object_id = object.id(), "created object");
        Ok(())
    }

    /// Stores an object, replacing any previous version with the same ID.
    ///
    /// Index entries of the previous version are removed before the new
    /// ones are written, so changed values free their old unique keys.
    ///
    /// # Errors
    ///
    /// Same as [`ObjectStore::create`], except an existing ID is not an error.
    pub fn upsert<O: Object>(&self, ctx: &Context, object: &mut O) -> StoreResult<()> {
        let value = Self::prepare(object)?;
        let object = &*object;
        let key = self.keys.primary(object.object_type(), object.id());
        let engine = self.engine();

        let replaced = self.with_tx(ctx, |tx| {
            let previous = match tx.get(&key) {
                Ok(bytes) => {
                    let mut previous = object.clone();
                    previous.decode_into(&bytes)?;
                    Some(previous)
                }
                Err(KvError::NotFound { .. }) => None,
                Err(e) => return Err(StoreError::internal("read previous object", e)),
            };
            if let Some(previous) = &previous {
                engine.delete_indexes(tx, previous);
            }
            engine.create_indexes(tx, object)?;
            tx.put(&key, &value)
                .map_err(|e| StoreError::internal("write object", e))?;
            Ok(previous.is_some())
        })?;

        tracing::debug!(
            object_type = %object.object_type(),
            object_id = object.id(),
            replaced,
            "upserted object"
        );
        Ok(())
    }

    /// Reads an object into `object`, whose type selects the namespace.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Client`] if `opts` selects nothing
    /// - [`StoreError::NotFound`] if no object matches
    /// - [`StoreError::Internal`] on backend or decoding failures
    pub fn read<O: Object>(&self, ctx: &Context, object: &mut O, opts: &ReadOpts) -> StoreResult<()> {
        ctx.check()?;
        opts.check()?;
        let object_type = object.object_type();

        let id = match opts.index() {
            Some((name, value)) => match self.lookup_unique(object_type, name, value) {
                Ok(id) => id,
                Err(StoreError::NotFound) if opts.falls_back_to_id() => match opts.id() {
                    Some(id) => id.to_string(),
                    None => return Err(StoreError::NotFound),
                },
                Err(err) => return Err(err),
            },
            None => opts.id().map(str::to_string).unwrap_or_default(),
        };

        let bytes = self
            .kv
            .get(&self.keys.primary(object_type, &id))
            .map_err(|e| StoreError::from_kv("read object", e))?;
        object.decode_into(&bytes)
    }

    fn lookup_unique(&self, object_type: ObjectType, name: &str, value: &str) -> StoreResult<String> {
        let bytes = self
            .kv
            .get(&self.keys.unique(object_type, name, value))
            .map_err(|e| StoreError::from_kv("read unique index", e))?;
        String::from_utf8(bytes).map_err(|e| StoreError::internal("decode unique index", e))
    }

    /// Reads a resource by type and ID.
    ///
    /// # Errors
    ///
    /// Same as [`ObjectStore::read`].
    pub fn get(&self, ctx: &Context, object_type: ObjectType, id: &str) -> StoreResult<Resource> {
        let mut resource = Resource::new(object_type);
        self.read(ctx, &mut resource, &ReadOpts::by_id(id))?;
        Ok(resource)
    }

    /// Deletes an object and its index entries.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the object does not exist
    /// - [`StoreError::Constraint`] (`foreign references exist`) if other
    ///   objects still refer to it
    /// - [`StoreError::Internal`] on backend failures
    pub fn delete(&self, ctx: &Context, opts: &DeleteOpts) -> StoreResult<()> {
        opts.check()?;
        let (object_type, id) = (opts.object_type(), opts.id());
        let key = self.keys.primary(object_type, id);
        let engine = self.engine();

        self.with_tx(ctx, |tx| {
            let bytes = tx
                .get(&key)
                .map_err(|e| StoreError::from_kv("read object", e))?;
            let mut existing = Resource::new(object_type);
            existing.decode_into(&bytes)?;

            engine.check_foreign_indexes_for_delete(tx, object_type, id)?;
            engine.delete_indexes(tx, &existing);
            tx.delete(&key)
                .map_err(|e| StoreError::internal("delete object", e))
        })?;

        tracing::debug!(object_type = %object_type, object_id = id, "deleted object");
        Ok(())
    }

    /// Lists objects of `object_type`.
    ///
    /// With a scope, only objects referring to the scoped resource are
    /// listed. With a filter, only objects whose tags satisfy it are listed
    /// and counted.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Internal`] on backend or decoding failures
    pub fn list(
        &self,
        ctx: &Context,
        object_type: ObjectType,
        opts: &ListOpts,
    ) -> StoreResult<ListPage<Resource>> {
        ctx.check()?;
        let page = match (opts.scope(), opts.filter()) {
            (Some(scope), _) => self.list_referrers(object_type, scope, opts)?,
            (None, Some(_)) => self.list_filtered(object_type, opts)?,
            (None, None) => {
                let listed = self
                    .kv
                    .list(&self.keys.type_prefix(object_type), &kv_page(opts))
                    .map_err(|e| StoreError::internal("list objects", e))?;
                let items = decode_all(object_type, &listed.kvs)?;
                page_of(items, listed.total_count, opts)
            }
        };
        ctx.check()?;
        Ok(page)
    }

    /// Like [`ObjectStore::list`], yielding one concrete kind.
    ///
    /// # Errors
    ///
    /// Same as [`ObjectStore::list`].
    pub fn list_kind<K: ResourceKind>(&self, ctx: &Context, opts: &ListOpts) -> StoreResult<ListPage<K>> {
        let page = self.list(ctx, K::TYPE, opts)?;
        Ok(page.map(Resource::expect_kind::<K>))
    }

    fn list_referrers(
        &self,
        object_type: ObjectType,
        scope: &ListScope,
        opts: &ListOpts,
    ) -> StoreResult<ListPage<Resource>> {
        let prefix = self
            .keys
            .referrers_of_type_prefix(scope.object_type, &scope.id, object_type);
        let listed = self
            .kv
            .list(&prefix, &kv_page(opts))
            .map_err(|e| StoreError::internal("list reverse index", e))?;

        let mut items = Vec::with_capacity(listed.kvs.len());
        for entry in &listed.kvs {
            let Some(id) = entry.key.strip_prefix(&prefix) else {
                continue;
            };
            let bytes = match self.kv.get(&self.keys.primary(object_type, id)) {
                Ok(bytes) => bytes,
                Err(KvError::NotFound { .. }) => {
                    tracing::warn!(
                        target: "gwstore::integrity",
                        index_key = %entry.key,
                        object_type = %object_type,
                        object_id = id,
                        "reverse index entry points at a missing object"
                    );
                    continue;
                }
                Err(e) => return Err(StoreError::internal("read referring object", e)),
            };
            let mut resource = Resource::new(object_type);
            resource.decode_into(&bytes)?;
            items.push(resource);
        }
        Ok(page_of(items, listed.total_count, opts))
    }

    fn list_filtered(&self, object_type: ObjectType, opts: &ListOpts) -> StoreResult<ListPage<Resource>> {
        let listed = self
            .kv
            .list(&self.keys.type_prefix(object_type), &KvListOpts::all())
            .map_err(|e| StoreError::internal("list objects", e))?;

        let mut matching = Vec::new();
        if let Some(filter) = opts.filter() {
            for resource in decode_all(object_type, &listed.kvs)? {
                let keep = filter
                    .matches(resource.tags())
                    .map_err(|e| StoreError::internal("evaluate filter", e))?;
                if keep {
                    matching.push(resource);
                }
            }
        }

        let total_count = matching.len();
        let offset = (opts.page() - 1).saturating_mul(opts.page_size());
        let items = matching
            .into_iter()
            .skip(offset)
            .take(opts.page_size())
            .collect();
        Ok(page_of(items, total_count, opts))
    }
}

fn cluster_id(cluster: &str) -> ClusterId {
    match ClusterId::new(cluster) {
        Ok(id) => id,
        Err(err) => panic!("{err}"),
    }
}

fn kv_page(opts: &ListOpts) -> KvListOpts {
    KvListOpts::new(opts.page(), opts.page_size())
}

fn decode_all(object_type: ObjectType, kvs: &[KvPair]) -> StoreResult<Vec<Resource>> {
    kvs.iter()
        .map(|kv| {
            let mut resource = Resource::new(object_type);
            resource.decode_into(&kv.value)?;
            Ok(resource)
        })
        .collect()
}

fn page_of(items: Vec<Resource>, total_count: usize, opts: &ListOpts) -> ListPage<Resource> {
    ListPage {
        items,
        total_count,
        next_page: opts.next_page(total_count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ForeignKey, Route, Service};
    use gwstore_kv::InMemoryKv;

    fn store() -> ObjectStore {
        ObjectStore::new(Arc::new(InMemoryKv::new()), StoreConfig::default())
    }

    fn service(name: &str) -> Service {
        Service {
            name: name.to_string(),
            host: "example.com".to_string(),
            ..Service::default()
        }
    }

    #[test]
    fn create_assigns_id_and_indexes() {
        let store = store();
        let ctx = Context::background();
        let mut svc = service("web");
        store.create(&ctx, &mut svc).unwrap();
        assert!(Uuid::parse_str(&svc.meta.id).is_ok());
        assert_eq!(svc.port, 80);

        let mut by_name = Service::default();
        store.read(&ctx, &mut by_name, &ReadOpts::by_name("web")).unwrap();
        assert_eq!(by_name, svc);
    }

    #[test]
    fn duplicate_id_is_constraint() {
        let store = store();
        let ctx = Context::background();
        let mut svc = service("web");
        store.create(&ctx, &mut svc).unwrap();
        let mut again = Service {
            name: "other".to_string(),
            ..svc.clone()
        };
        let err = store.create(&ctx, &mut again).unwrap_err();
        assert_eq!(err.as_constraint().unwrap().index.as_ref().unwrap().name, "id");
    }

    #[test]
    fn read_missing_is_not_found() {
        let store = store();
        let mut svc = Service::default();
        let err = store
            .read(&Context::background(), &mut svc, &ReadOpts::by_id("nope"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn read_requires_selector() {
        let store = store();
        let mut svc = Service::default();
        let err = store
            .read(&Context::background(), &mut svc, &ReadOpts::default())
            .unwrap_err();
        assert_eq!(err, StoreError::client("id or index required"));
    }

    #[test]
    fn name_or_id_falls_back() {
        let store = store();
        let ctx = Context::background();
        let mut svc = service("web");
        store.create(&ctx, &mut svc).unwrap();

        let mut read = Service::default();
        store
            .read(&ctx, &mut read, &ReadOpts::by_name_or_id(svc.meta.id.clone()))
            .unwrap();
        assert_eq!(read.name, "web");
    }

    #[test]
    fn delete_removes_indexes() {
        let kv = Arc::new(InMemoryKv::new());
        let store = ObjectStore::new(kv.clone(), StoreConfig::default());
        let ctx = Context::background();
        let mut svc = service("web");
        store.create(&ctx, &mut svc).unwrap();
        store
            .delete(&ctx, &DeleteOpts::new(ObjectType::Service, svc.meta.id.clone()))
            .unwrap();
        assert!(kv.is_empty());
    }

    #[test]
    fn list_for_yields_referrers() {
        let store = store();
        let ctx = Context::background();
        let mut svc = service("web");
        store.create(&ctx, &mut svc).unwrap();
        let mut route = Route {
            name: "r".to_string(),
            paths: vec!["/".to_string()],
            service: Some(ForeignKey::new(svc.meta.id.clone())),
            ..Route::default()
        };
        store.create(&ctx, &mut route).unwrap();

        let opts = ListOpts::builder()
            .list_for(ObjectType::Service, svc.meta.id.clone())
            .build()
            .unwrap();
        let page = store.list_kind::<Route>(&ctx, &opts).unwrap();
        assert_eq!(page.items, vec![route]);
        assert_eq!(page.total_count, 1);
        assert_eq!(page.next_page, None);
    }

    #[test]
    fn cancelled_context_writes_nothing() {
        let kv = Arc::new(InMemoryKv::new());
        let store = ObjectStore::new(kv.clone(), StoreConfig::default());
        let ctx = Context::background();
        ctx.cancel();
        let err = store.create(&ctx, &mut service("web")).unwrap_err();
        assert_eq!(err, StoreError::Cancelled);
        assert!(kv.is_empty());
    }

    #[test]
    #[should_panic(expected = "invalid cluster id")]
    fn invalid_cluster_panics() {
        let _ = ObjectStore::new(
            Arc::new(InMemoryKv::new()),
            StoreConfig::new().cluster("not/valid"),
        );
    }
}
