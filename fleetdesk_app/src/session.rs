//! Explicitly constructed session context.
//!
//! One [`FleetSession`] owns the token vault, the outbound pipeline, the
//! resource clients and the client-side mirrors. Nothing here is global;
//! callers build a session and pass it where it is needed.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fleetdesk_api::{
    ApiClient, ApiError, ApiResult, AuthService, BearerAuth, Clock, DashboardClient,
    DashboardOverview, DevicesClient, HttpTransport, LocationsClient, RefreshCoordinator,
    RefreshMetrics, RefreshOnUnauthorized, RequestLogger, SessionStatus, SystemClock,
    TokenLifetimes, TokenStore, TokenVault,
};
use fleetdesk_core::{
    Device, DeviceId, DevicePatch, Location, LocationId, LocationPatch,
    MAX_DEVICES_PER_LOCATION, NewDevice, NewLocation, RouteDecision, RouteGuard, User,
};
use tokio::sync::watch;

use crate::{
    AppError, AppResult,
    state::{Entity, StateMirror},
};

pub struct FleetSession<S, T = SystemClock>
where
    S: TokenStore,
    T: Clock,
{
    vault: Arc<TokenVault<S, T>>,
    coordinator: Arc<RefreshCoordinator<S, T>>,
    auth: AuthService<S, T>,
    locations: LocationsClient,
    devices: DevicesClient,
    dashboard: DashboardClient,
    guard: RouteGuard,
    location_mirror: Mutex<StateMirror<Location>>,
    device_mirror: Mutex<StateMirror<Device>>,
}

impl<S> FleetSession<S, SystemClock>
where
    S: TokenStore + Send + Sync + 'static,
{
    pub fn new(store: S, transport: Arc<dyn HttpTransport>, lifetimes: TokenLifetimes) -> Self {
        Self::with_clock(store, transport, lifetimes, SystemClock)
    }
}

impl<S, T> FleetSession<S, T>
where
    S: TokenStore + Send + Sync + 'static,
    T: Clock + Send + Sync + 'static,
{
    /// Persisted credentials in `store` are picked up immediately, so a
    /// session survives process restarts until the refresh token expires.
    pub fn with_clock(
        store: S,
        transport: Arc<dyn HttpTransport>,
        lifetimes: TokenLifetimes,
        clock: T,
    ) -> Self {
        let vault = Arc::new(TokenVault::with_clock(store, lifetimes, clock));
        let coordinator = Arc::new(RefreshCoordinator::new(
            Arc::clone(&vault),
            Arc::clone(&transport),
        ));
        let api = ApiClient::builder(transport)
            .with(RefreshOnUnauthorized::new(Arc::clone(&coordinator)))
            .with(BearerAuth::new(Arc::clone(&vault)))
            .with(RequestLogger)
            .build();
        log::debug!("request pipeline: {}", api.stage_names().join(" -> "));

        Self {
            auth: AuthService::new(api.clone(), Arc::clone(&coordinator)),
            locations: LocationsClient::new(api.clone()),
            devices: DevicesClient::new(api.clone()),
            dashboard: DashboardClient::new(api),
            vault,
            coordinator,
            guard: RouteGuard::default(),
            location_mirror: Mutex::new(StateMirror::default()),
            device_mirror: Mutex::new(StateMirror::default()),
        }
    }

    pub fn with_guard(mut self, guard: RouteGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn vault(&self) -> &Arc<TokenVault<S, T>> {
        &self.vault
    }

    pub fn is_authenticated(&self) -> bool {
        self.vault.is_authenticated()
    }

    pub fn status(&self) -> SessionStatus {
        self.vault.status()
    }

    /// Fires `LoginRequired` when a refresh fails or the user logs out.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.vault.subscribe()
    }

    pub fn refresh_metrics(&self) -> RefreshMetrics {
        self.coordinator.metrics()
    }

    pub fn route_guard(&self) -> &RouteGuard {
        &self.guard
    }

    pub fn guard(&self, path: &str) -> RouteDecision {
        self.guard.evaluate(path, self.is_authenticated())
    }

    pub fn locations(&self) -> StateMirror<Location> {
        lock(&self.location_mirror).clone()
    }

    pub fn devices(&self) -> StateMirror<Device> {
        lock(&self.device_mirror).clone()
    }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<User> {
        Ok(self.auth.login(email, password).await?)
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> AppResult<User> {
        Ok(self.auth.register(name, email, password).await?)
    }

    pub async fn logout(&self) {
        self.auth.logout().await;
        lock(&self.location_mirror).clear();
        lock(&self.device_mirror).clear();
    }

    pub async fn current_user(&self) -> AppResult<User> {
        Ok(self.auth.current_user().await?)
    }

    pub async fn refresh_session(&self) -> AppResult<()> {
        Ok(self.auth.refresh_session().await?)
    }

    pub async fn dashboard(&self) -> AppResult<DashboardOverview> {
        Ok(self.dashboard.overview().await?)
    }

    pub async fn fetch_locations(&self) -> AppResult<Vec<Location>> {
        lock(&self.location_mirror).begin_load();
        let result = self.locations.list().await;
        load_all(&self.location_mirror, result)
    }

    pub async fn fetch_location(&self, id: &LocationId) -> AppResult<Location> {
        let result = self.locations.get(id).await;
        settle(&self.location_mirror, result, |mirror, location| {
            mirror.upsert(location.clone())
        })
    }

    pub async fn create_location(&self, location: &NewLocation) -> AppResult<Location> {
        let result = self.locations.create(location).await;
        settle(&self.location_mirror, result, |mirror, location| {
            mirror.upsert(location.clone())
        })
    }

    pub async fn update_location(
        &self,
        id: &LocationId,
        patch: &LocationPatch,
    ) -> AppResult<Location> {
        if patch.is_empty() {
            return Err(AppError::EmptyUpdate {
                entity: "location",
                id: id.to_string(),
            });
        }
        let result = self.locations.update(id, patch).await;
        settle(&self.location_mirror, result, |mirror, location| {
            mirror.upsert(location.clone())
        })
    }

    /// Cached devices of the removed location stay as they are.
    pub async fn delete_location(&self, id: &LocationId) -> AppResult<()> {
        let result = self.locations.delete(id).await;
        settle(&self.location_mirror, result, |mirror, _| {
            mirror.remove(id);
        })
    }

    pub async fn fetch_devices(&self) -> AppResult<Vec<Device>> {
        lock(&self.device_mirror).begin_load();
        let result = self.devices.list().await;
        load_all(&self.device_mirror, result)
    }

    pub async fn fetch_device(&self, id: &DeviceId) -> AppResult<Device> {
        let result = self.devices.get(id).await;
        settle(&self.device_mirror, result, |mirror, device| {
            mirror.upsert(device.clone())
        })
    }

    /// A cached target location that is already full rejects the create
    /// without touching the network. Otherwise the client's own
    /// fetch-then-check runs.
    pub async fn create_device(&self, device: &NewDevice) -> AppResult<Device> {
        let result = match self.cached_capacity(&device.location_id, None) {
            Ok(()) => self.devices.create(device).await,
            Err(err) => Err(err),
        };
        let created = settle(&self.device_mirror, result, |mirror, device| {
            mirror.upsert(device.clone())
        })?;
        self.sync_location(&created.location_id).await;
        Ok(created)
    }

    pub async fn update_device(&self, id: &DeviceId, patch: &DevicePatch) -> AppResult<Device> {
        if patch.is_empty() {
            return Err(AppError::EmptyUpdate {
                entity: "device",
                id: id.to_string(),
            });
        }

        let previous_location = self.cached_parent(id);
        let result = match &patch.location_id {
            Some(destination) => match self.cached_capacity(destination, Some(id)) {
                Ok(()) => self.devices.update(id, patch).await,
                Err(err) => Err(err),
            },
            None => self.devices.update(id, patch).await,
        };
        let updated = settle(&self.device_mirror, result, |mirror, device| {
            mirror.upsert(device.clone())
        })?;

        let stayed = previous_location.as_ref() == Some(&updated.location_id);
        if patch.location_id.is_some() && !stayed {
            if let Some(previous) = &previous_location {
                self.sync_location(previous).await;
            }
            self.sync_location(&updated.location_id).await;
        }
        Ok(updated)
    }

    pub async fn delete_device(&self, id: &DeviceId) -> AppResult<()> {
        let parent = self.cached_parent(id);
        let result = self.devices.delete(id).await;
        settle(&self.device_mirror, result, |mirror, _| {
            mirror.remove(id);
        })?;
        if let Some(parent) = parent {
            self.sync_location(&parent).await;
        }
        Ok(())
    }

    /// Parent from the device mirror, else from a cached location listing it.
    fn cached_parent(&self, id: &DeviceId) -> Option<LocationId> {
        let from_device = lock(&self.device_mirror)
            .get(id)
            .map(|device| device.location_id.clone());
        from_device.or_else(|| {
            lock(&self.location_mirror)
                .items()
                .into_iter()
                .find(|location| location.device_ids.contains(id))
                .map(|location| location.id)
        })
    }

    fn cached_capacity(&self, location_id: &LocationId, moving: Option<&DeviceId>) -> ApiResult<()> {
        let mirror = lock(&self.location_mirror);
        let Some(location) = mirror.get(location_id) else {
            return Ok(());
        };
        let already_there = moving.is_some_and(|id| location.device_ids.contains(id));
        if location.is_at_capacity() && !already_there {
            log::debug!("cached location {location_id} is full; not sending request");
            return Err(ApiError::DeviceLimitReached {
                location_id: location_id.clone(),
                limit: MAX_DEVICES_PER_LOCATION,
            });
        }
        Ok(())
    }

    /// Re-reads a location whose device list just changed on the server.
    async fn sync_location(&self, id: &LocationId) {
        match self.locations.get(id).await {
            Ok(location) => lock(&self.location_mirror).upsert(location),
            Err(err) => log::warn!(
                "could not refresh location {id} after device change: {}",
                err.display_chain()
            ),
        }
    }
}

fn load_all<E: Entity>(mirror: &Mutex<StateMirror<E>>, result: ApiResult<Vec<E>>) -> AppResult<Vec<E>> {
    let mut mirror = lock(mirror);
    match result {
        Ok(items) => {
            mirror.replace_all(items.clone());
            Ok(items)
        }
        Err(err) => {
            mirror.fail(err.to_string());
            Err(err.into())
        }
    }
}

fn settle<E, R>(
    mirror: &Mutex<StateMirror<E>>,
    result: ApiResult<R>,
    apply: impl FnOnce(&mut StateMirror<E>, &R),
) -> AppResult<R>
where
    E: Entity,
{
    let mut mirror = lock(mirror);
    match result {
        Ok(value) => {
            apply(&mut mirror, &value);
            Ok(value)
        }
        Err(err) => {
            mirror.record_error(err.to_string());
            Err(err.into())
        }
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
