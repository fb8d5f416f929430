//! Cached views over a remote collection.
//!
//! A [`CollectionStore`] owns the in-memory list for one resource. The remote
//! API is the source of truth; the [`SnapshotCache`] is a write-through mirror
//! that only serves reads when the remote cannot.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;

use crate::api::ApiError;
use crate::cache::SnapshotCache;
use crate::error::StoreError;
use crate::validate::Validate;

pub trait Entity: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Snapshot key in the local cache.
    const CACHE_KEY: &'static str;

    fn id(&self) -> &str;

    /// Shown when neither the remote nor a snapshot is available.
    fn defaults() -> Vec<Self> {
        Vec::new()
    }

    /// Gives a snapshot entry without a server id a local one.
    fn assign_local_id(&mut self, id: String);
}

#[async_trait]
pub trait RemoteCollection: Send + Sync {
    type Entity: Entity;
    type Draft: Validate + Send + Sync;
    type Patch: Validate + Send + Sync;

    async fn list(&self) -> Result<Vec<Self::Entity>, ApiError>;

    async fn create(&self, draft: &Self::Draft) -> Result<Self::Entity, ApiError>;

    async fn update(&self, id: &str, patch: &Self::Patch) -> Result<Self::Entity, ApiError>;

    async fn delete(&self, id: &str) -> Result<(), ApiError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreState<E> {
    pub items: Vec<E>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<E> Default for StoreState<E> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            error: None,
        }
    }
}

/// Which source ended up filling the store on a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadTier {
    Remote,
    Snapshot,
    Defaults,
}

impl fmt::Display for ReadTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReadTier::Remote => "remote",
            ReadTier::Snapshot => "snapshot",
            ReadTier::Defaults => "defaults",
        };
        f.write_str(name)
    }
}

pub struct CollectionStore<R: RemoteCollection> {
    remote: R,
    cache: Arc<SnapshotCache>,
    state: watch::Sender<StoreState<R::Entity>>,
}

impl<R: RemoteCollection> CollectionStore<R> {
    pub fn new(remote: R, cache: Arc<SnapshotCache>) -> Self {
        let (state, _) = watch::channel(StoreState::default());
        Self {
            remote,
            cache,
            state,
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn state(&self) -> StoreState<R::Entity> {
        self.state.borrow().clone()
    }

    pub fn items(&self) -> Vec<R::Entity> {
        self.state.borrow().items.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    /// Receives every state change made after this call.
    pub fn subscribe(&self) -> watch::Receiver<StoreState<R::Entity>> {
        self.state.subscribe()
    }

    /// Looks only at the loaded items; never goes to the remote.
    pub fn get(&self, id: &str) -> Option<R::Entity> {
        self.state
            .borrow()
            .items
            .iter()
            .find(|item| item.id() == id)
            .cloned()
    }

    /// Reloads the whole collection. Never fails: a remote error is kept in
    /// `error` and the items come from the snapshot, or from the defaults
    /// when no usable snapshot exists.
    pub async fn refresh(&self) -> ReadTier {
        let resource = <R::Entity as Entity>::CACHE_KEY;
        self.begin();
        tracing::info!(resource, "Fetching collection from API");

        match self.remote.list().await {
            Ok(items) => {
                tracing::info!(resource, count = items.len(), "Collection fetched");
                self.persist(&items);
                self.state.send_modify(|state| {
                    state.items = items;
                    state.error = None;
                    state.loading = false;
                });
                ReadTier::Remote
            }
            Err(err) => {
                tracing::error!(resource, error = %err, "Failed to fetch collection, falling back to local data");
                let (items, tier) = self.fallback();
                let message = err.to_string();
                self.state.send_modify(|state| {
                    state.items = items;
                    state.error = Some(message);
                    state.loading = false;
                });
                tier
            }
        }
    }

    /// Adds the server's version of the entity at the front once the remote
    /// has accepted it.
    pub async fn create(&self, draft: &R::Draft) -> Result<R::Entity, StoreError> {
        draft.validate()?;
        self.begin();

        match self.remote.create(draft).await {
            Ok(entity) => {
                tracing::info!(resource = <R::Entity as Entity>::CACHE_KEY, id = entity.id(), "Entity created");
                let created = entity.clone();
                self.commit(|items| items.insert(0, created));
                Ok(entity)
            }
            Err(err) => {
                self.record_failure("create", &err);
                Err(err.into())
            }
        }
    }

    pub async fn update(&self, id: &str, patch: &R::Patch) -> Result<R::Entity, StoreError> {
        patch.validate()?;
        self.begin();

        match self.remote.update(id, patch).await {
            Ok(entity) => {
                tracing::info!(resource = <R::Entity as Entity>::CACHE_KEY, id, "Entity updated");
                let updated = entity.clone();
                self.commit(|items| replace_by_id(items, id, updated));
                Ok(entity)
            }
            Err(err) => {
                self.record_failure("update", &err);
                Err(err.into())
            }
        }
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.begin();

        match self.remote.delete(id).await {
            Ok(()) => {
                tracing::info!(resource = <R::Entity as Entity>::CACHE_KEY, id, "Entity deleted");
                self.commit(|items| items.retain(|item| item.id() != id));
                Ok(())
            }
            Err(err) => {
                self.record_failure("delete", &err);
                Err(err.into())
            }
        }
    }

    pub(crate) fn begin(&self) {
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
    }

    /// Applies a confirmed change and writes the result through to the cache.
    pub(crate) fn commit<F>(&self, apply: F)
    where
        F: FnOnce(&mut Vec<R::Entity>),
    {
        self.state.send_modify(|state| {
            apply(&mut state.items);
            state.loading = false;
        });
        let state = self.state.borrow();
        self.persist(&state.items);
    }

    pub(crate) fn record_failure(&self, operation: &str, err: &ApiError) {
        tracing::error!(
            resource = <R::Entity as Entity>::CACHE_KEY,
            operation,
            error = %err,
            "Remote operation failed"
        );
        let message = err.to_string();
        self.state.send_modify(|state| {
            state.error = Some(message);
            state.loading = false;
        });
    }

    fn fallback(&self) -> (Vec<R::Entity>, ReadTier) {
        let resource = <R::Entity as Entity>::CACHE_KEY;
        match self.cache.load::<R::Entity>(resource) {
            Ok(Some(mut items)) => {
                assign_local_ids(&mut items);
                tracing::info!(resource, count = items.len(), "Using local snapshot");
                (items, ReadTier::Snapshot)
            }
            Ok(None) => {
                tracing::info!(resource, "No local snapshot, using built-in defaults");
                (self.seed_defaults(), ReadTier::Defaults)
            }
            Err(err) => {
                tracing::warn!(resource, error = %err, "Local snapshot unusable, using built-in defaults");
                (self.seed_defaults(), ReadTier::Defaults)
            }
        }
    }

    fn seed_defaults(&self) -> Vec<R::Entity> {
        let items = <R::Entity as Entity>::defaults();
        self.persist(&items);
        items
    }

    fn persist(&self, items: &[R::Entity]) {
        let resource = <R::Entity as Entity>::CACHE_KEY;
        if let Err(err) = self.cache.save(resource, items) {
            tracing::warn!(resource, error = %err, "Failed to write local snapshot");
        }
    }
}

pub(crate) fn replace_by_id<E: Entity>(items: &mut [E], id: &str, entity: E) {
    if let Some(slot) = items.iter_mut().find(|item| item.id() == id) {
        *slot = entity;
    }
}

fn assign_local_ids<E: Entity>(items: &mut [E]) {
    let stamp = Utc::now().timestamp_millis();
    for (index, item) in items.iter_mut().enumerate() {
        if item.id().is_empty() {
            item.assign_local_id(format!("local-{}-{}", stamp, index));
        }
    }
}
