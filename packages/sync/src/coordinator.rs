//! The per-identity location sync state machine.
//!
//! Lifecycle: `Uninitialized → LocalOnly` (hydrate from cache) `→
//! ServerAuthoritative` (first successful server fetch) `→ LocalOnly`
//! (logout or auth loss). A successful fetch wholly replaces in-memory
//! state and is written through to the cache; a failed fetch leaves
//! prior state untouched.
//!
//! Ordering: every fetch is tagged with a monotonic sequence number at
//! issue time and applied only if nothing newer has been applied since,
//! so a slow fetch can never clobber a more recent mutation. Identity
//! switches bump an epoch; anything in flight under an older epoch is
//! discarded on arrival. Mutations serialize on an async lock so a rapid
//! second write is evaluated against the result of the first.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use meetmap_client::ApiClient;
use meetmap_models::{
    Identity, Location, LocationDraft, LocationPatch, LocationsSnapshot, resolve_active,
};
use meetmap_store::{KeyedStore, StoreKind};
use serde_json::Value;

use crate::SyncError;

/// Where the coordinator currently gets its truth from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// No identity attached yet; empty state.
    Uninitialized,
    /// Cache-backed only: guest, offline, or auth lost.
    LocalOnly,
    /// At least one server fetch has succeeded for this identity.
    ServerAuthoritative,
}

/// A consistent snapshot of the coordinator's state, cheap to clone.
///
/// The location list is behind an `Arc` and replaced wholesale on every
/// update, so a concurrently-rendering view never observes a
/// half-updated list.
#[derive(Debug, Clone)]
pub struct EngineView {
    /// The identity this state belongs to.
    pub identity: Identity,
    /// Current truth source.
    pub mode: SyncMode,
    /// The canonical location list.
    pub locations: Arc<Vec<Location>>,
    /// The location the UI treats as "current position", if any.
    pub active_location: Option<Location>,
}

struct Shared {
    identity: Identity,
    client: Option<Arc<dyn ApiClient>>,
    mode: SyncMode,
    locations: Arc<Vec<Location>>,
    active: Option<Location>,
}

/// Owns the canonical in-memory `Location` list for one identity at a
/// time and reconciles it between the persistent cache and the server.
///
/// The coordinator is the only writer to the [`KeyedStore`]; keeping a
/// single writer keeps cache invalidation in one place.
pub struct SyncCoordinator {
    store: KeyedStore,
    shared: Mutex<Shared>,
    epoch: AtomicU64,
    seq: AtomicU64,
    last_applied: AtomicU64,
    mutation_lock: tokio::sync::Mutex<()>,
    temp_id: AtomicI64,
}

impl SyncCoordinator {
    /// Creates an uninitialized coordinator over the given cache.
    #[must_use]
    pub fn new(store: KeyedStore) -> Self {
        Self {
            store,
            shared: Mutex::new(Shared {
                identity: Identity::Guest,
                client: None,
                mode: SyncMode::Uninitialized,
                locations: Arc::new(Vec::new()),
                active: None,
            }),
            epoch: AtomicU64::new(0),
            seq: AtomicU64::new(0),
            last_applied: AtomicU64::new(0),
            mutation_lock: tokio::sync::Mutex::new(()),
            temp_id: AtomicI64::new(0),
        }
    }

    /// Attaches an identity: bumps the epoch (discarding anything in
    /// flight for the previous identity) and synchronously hydrates
    /// in-memory state from the cache for immediate render.
    ///
    /// Callers with a session token should follow up with [`refresh`]
    /// to reconcile against the server.
    ///
    /// [`refresh`]: Self::refresh
    pub fn switch_identity(
        &self,
        identity: Identity,
        client: Option<Arc<dyn ApiClient>>,
    ) -> EngineView {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.last_applied.store(0, Ordering::SeqCst);

        let namespace = identity.namespace().to_string();
        let snapshot: Option<LocationsSnapshot> = self.store.get(&namespace, StoreKind::Locations);
        let stored_active: Option<Location> = self
            .store
            .get::<Option<Location>>(&namespace, StoreKind::ActiveLocation)
            .flatten();

        let locations = snapshot.map(|s| s.locations).unwrap_or_default();
        // A stale cached active (not in the list anymore) is recomputed.
        let active = stored_active
            .filter(|a| locations.iter().any(|l| l.id == a.id))
            .or_else(|| resolve_active(&locations).cloned());

        let mut shared = self.shared.lock().unwrap();
        shared.identity = identity;
        shared.client = client;
        shared.mode = SyncMode::LocalOnly;
        shared.locations = Arc::new(locations);
        shared.active = active;
        Self::view_of(&shared)
    }

    /// Hydrates an identity and immediately attempts a server refresh
    /// when a session token is present. Refresh failures are logged,
    /// not fatal — the hydrated local state stands.
    pub async fn initialize(
        &self,
        identity: Identity,
        client: Option<Arc<dyn ApiClient>>,
    ) -> EngineView {
        self.switch_identity(identity, client);
        if let Err(e) = self.refresh().await {
            log::warn!("Initial server fetch failed, staying on local state: {e}");
        }
        self.view()
    }

    /// Detaches the coordinator from its UI scope: anything still in
    /// flight resolves into the void instead of updating state.
    pub fn detach(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Returns the current state snapshot.
    #[must_use]
    pub fn view(&self) -> EngineView {
        Self::view_of(&self.shared.lock().unwrap())
    }

    /// Fetches the full location list from the server and, if it is
    /// still current (same epoch, nothing newer applied), replaces
    /// in-memory state and writes it through to the cache.
    ///
    /// Returns `Ok(false)` when there is nothing to do (no session
    /// token) or the response was discarded as stale.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Refresh`] when the fetch fails; prior state
    /// is left untouched. An auth rejection additionally drops the
    /// coordinator back to [`SyncMode::LocalOnly`].
    pub async fn refresh(&self) -> Result<bool, SyncError> {
        let Some((epoch, tag, client)) = self.fetch_context() else {
            return Ok(false);
        };

        match client.get("/locations").await {
            Ok(raw) => {
                let list = parse_location_list(&raw).map_err(SyncError::Refresh)?;
                self.apply_server_list(epoch, tag, list)
            }
            Err(e) => {
                if matches!(e.status(), Some(401 | 403)) {
                    log::warn!("Session rejected by server, dropping to local-only: {e}");
                    let mut shared = self.shared.lock().unwrap();
                    if self.epoch.load(Ordering::SeqCst) == epoch {
                        shared.mode = SyncMode::LocalOnly;
                    }
                } else {
                    log::warn!("Location refresh failed, keeping prior state: {e}");
                }
                Err(SyncError::Refresh(e))
            }
        }
    }

    /// Saves a new location.
    ///
    /// With a session token the draft is POSTed and the full list is
    /// re-fetched so server-side side effects (id assignment,
    /// default reassignment) are captured. Without a token, or when the
    /// server call fails, the draft is applied optimistically to the
    /// local list under a temporary negative id.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Invalid`] for an empty name, or
    /// [`SyncError::Store`] if the cache write fails.
    pub async fn add_location(&self, draft: LocationDraft) -> Result<EngineView, SyncError> {
        if draft.name.trim().is_empty() {
            return Err(SyncError::Invalid {
                message: "location name must not be empty".to_string(),
            });
        }

        let _guard = self.mutation_lock.lock().await;
        let (epoch, client) = self.mutation_context();

        if let Some(client) = client {
            let body = draft_body(&draft)?;
            match client.post("/locations", &body).await {
                Ok(_) => return self.refetch_after_mutation(epoch).await,
                Err(e) => {
                    log::warn!("add_location: server path failed, applying local fallback: {e}");
                }
            }
        }

        let make_default = draft.is_default;
        let id = self.next_temp_id();
        self.apply_local(epoch, move |list| {
            let first = list.is_empty();
            if make_default {
                for l in list.iter_mut() {
                    l.is_default = false;
                }
            }
            list.push(Location {
                id,
                name: draft.name,
                address: draft.address,
                lat: draft.lat,
                lng: draft.lng,
                is_default: make_default || first,
            });
            Ok(())
        })
    }

    /// Deletes a location.
    ///
    /// If the removed location was the active default, another entry is
    /// promoted (flagged default, else first) and the new active
    /// location is persisted before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownLocation`] on the local path when the
    /// id is not in the list, or [`SyncError::Store`] if the cache write
    /// fails.
    pub async fn delete_location(&self, id: i64) -> Result<EngineView, SyncError> {
        let _guard = self.mutation_lock.lock().await;
        let (epoch, client) = self.mutation_context();

        if let Some(client) = client {
            match client.delete(&format!("/locations/{id}")).await {
                Ok(_) => return self.refetch_after_mutation(epoch).await,
                Err(e) => {
                    log::warn!("delete_location: server path failed, applying local fallback: {e}");
                }
            }
        }

        self.apply_local(epoch, move |list| {
            let before = list.len();
            list.retain(|l| l.id != id);
            if list.len() == before {
                return Err(SyncError::UnknownLocation { id });
            }
            if !list.is_empty() && !list.iter().any(|l| l.is_default) {
                list[0].is_default = true;
            }
            Ok(())
        })
    }

    /// Makes a location the identity's default, clearing the flag on
    /// every sibling in the same atomic replace.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownLocation`] on the local path when the
    /// id is not in the list, or [`SyncError::Store`] if the cache write
    /// fails.
    pub async fn set_default_location(&self, id: i64) -> Result<EngineView, SyncError> {
        let _guard = self.mutation_lock.lock().await;
        let (epoch, client) = self.mutation_context();

        if let Some(client) = client {
            match client
                .post(&format!("/locations/{id}/default"), &Value::Null)
                .await
            {
                Ok(_) => return self.refetch_after_mutation(epoch).await,
                Err(e) => {
                    log::warn!(
                        "set_default_location: server path failed, applying local fallback: {e}"
                    );
                }
            }
        }

        self.apply_local(epoch, move |list| {
            if !list.iter().any(|l| l.id == id) {
                return Err(SyncError::UnknownLocation { id });
            }
            for l in list.iter_mut() {
                l.is_default = l.id == id;
            }
            Ok(())
        })
    }

    /// Applies a partial update (rename, address, coordinate edit).
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownLocation`] on the local path when the
    /// id is not in the list, or [`SyncError::Store`] if the cache write
    /// fails.
    pub async fn update_location(
        &self,
        id: i64,
        patch: LocationPatch,
    ) -> Result<EngineView, SyncError> {
        let _guard = self.mutation_lock.lock().await;
        let (epoch, client) = self.mutation_context();

        if let Some(client) = client {
            let body = serde_json::to_value(&patch).map_err(|e| SyncError::Invalid {
                message: format!("patch serialization failed: {e}"),
            })?;
            match client.patch(&format!("/locations/{id}"), &body).await {
                Ok(_) => return self.refetch_after_mutation(epoch).await,
                Err(e) => {
                    log::warn!("update_location: server path failed, applying local fallback: {e}");
                }
            }
        }

        self.apply_local(epoch, move |list| {
            let Some(target) = list.iter_mut().find(|l| l.id == id) else {
                return Err(SyncError::UnknownLocation { id });
            };
            target.apply_patch(&patch);
            Ok(())
        })
    }

    // ── Internals ───────────────────────────────────────────────────

    fn view_of(shared: &Shared) -> EngineView {
        EngineView {
            identity: shared.identity.clone(),
            mode: shared.mode,
            locations: Arc::clone(&shared.locations),
            active_location: shared.active.clone(),
        }
    }

    fn next_tag(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn next_temp_id(&self) -> i64 {
        -(self.temp_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Captures `(epoch, tag, client)` for a server fetch, or `None`
    /// when the current identity has no session.
    fn fetch_context(&self) -> Option<(u64, u64, Arc<dyn ApiClient>)> {
        let shared = self.shared.lock().unwrap();
        if shared.identity.session_token().is_none() {
            return None;
        }
        let client = shared.client.clone()?;
        Some((self.epoch.load(Ordering::SeqCst), self.next_tag(), client))
    }

    /// Captures `(epoch, client-if-authenticated)` for a mutation.
    fn mutation_context(&self) -> (u64, Option<Arc<dyn ApiClient>>) {
        let shared = self.shared.lock().unwrap();
        let client = if shared.identity.session_token().is_some() {
            shared.client.clone()
        } else {
            None
        };
        (self.epoch.load(Ordering::SeqCst), client)
    }

    /// Applies a server-fetched list if it is still current.
    fn apply_server_list(
        &self,
        epoch: u64,
        tag: u64,
        list: Vec<Location>,
    ) -> Result<bool, SyncError> {
        let mut shared = self.shared.lock().unwrap();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            log::debug!("Discarding fetch from a previous identity epoch");
            return Ok(false);
        }
        if tag <= self.last_applied.load(Ordering::SeqCst) {
            log::debug!("Discarding out-of-order fetch (tag {tag})");
            return Ok(false);
        }
        self.last_applied.store(tag, Ordering::SeqCst);

        shared.mode = SyncMode::ServerAuthoritative;
        shared.locations = Arc::new(list);
        shared.active = resolve_active(&shared.locations).cloned();
        self.persist(&shared)?;
        Ok(true)
    }

    /// Server mutation succeeded: re-fetch the full list so server-side
    /// side effects are captured. A refetch failure is non-fatal — the
    /// mutation already happened, prior local state stands.
    async fn refetch_after_mutation(&self, epoch: u64) -> Result<EngineView, SyncError> {
        if self.epoch.load(Ordering::SeqCst) != epoch {
            log::debug!("Identity changed mid-mutation, skipping refetch");
            return Ok(self.view());
        }
        if let Err(e) = self.refresh().await {
            log::warn!("Post-mutation refetch failed, state unchanged: {e}");
        }
        Ok(self.view())
    }

    /// Applies a mutation to a copy of the local list, recomputes the
    /// active location, persists, and atomically replaces state.
    fn apply_local<F>(&self, epoch: u64, mutate: F) -> Result<EngineView, SyncError>
    where
        F: FnOnce(&mut Vec<Location>) -> Result<(), SyncError>,
    {
        let mut shared = self.shared.lock().unwrap();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            log::debug!("Identity changed mid-mutation, dropping local write");
            return Ok(Self::view_of(&shared));
        }

        let mut list = (*shared.locations).clone();
        mutate(&mut list)?;

        self.last_applied.store(self.next_tag(), Ordering::SeqCst);
        shared.locations = Arc::new(list);
        shared.active = resolve_active(&shared.locations).cloned();
        self.persist(&shared)?;
        Ok(Self::view_of(&shared))
    }

    fn persist(&self, shared: &Shared) -> Result<(), SyncError> {
        let namespace = shared.identity.namespace();
        let snapshot = LocationsSnapshot::new((*shared.locations).clone());
        self.store
            .set(namespace, StoreKind::Locations, &snapshot)?;
        self.store
            .set(namespace, StoreKind::ActiveLocation, &shared.active)?;
        Ok(())
    }
}

fn draft_body(draft: &LocationDraft) -> Result<Value, SyncError> {
    serde_json::to_value(draft).map_err(|e| SyncError::Invalid {
        message: format!("draft serialization failed: {e}"),
    })
}

/// Parses the server's location list, tolerating a `{"locations": [...]}`
/// wrapper around the bare array.
fn parse_location_list(raw: &Value) -> Result<Vec<Location>, meetmap_client::ClientError> {
    let payload = raw.get("locations").cloned().unwrap_or_else(|| raw.clone());
    Ok(serde_json::from_value(payload)?)
}
