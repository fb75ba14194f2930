#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fleetdesk_api::{ApiRequest, ApiResponse, ApiResult, HttpTransport, MemoryTokenStore, TokenLifetimes};
use fleetdesk_app::FleetSession;
use fleetdesk_core::{
    Device, DeviceId, DeviceType, EntityStatus, Location, LocationId, MAX_DEVICES_PER_LOCATION,
    Timestamp,
};
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};

pub const EMAIL: &str = "ops@example.com";
pub const PASSWORD: &str = "correct-horse";

pub fn ts(epoch_secs: i64) -> Timestamp {
    Timestamp::from_epoch_secs(epoch_secs).expect("valid epoch seconds")
}

#[derive(Default)]
struct BackendState {
    locations: Vec<Location>,
    devices: Vec<Device>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    issued: u32,
    next_id: u32,
    refresh_revoked: bool,
    outage: bool,
    calls: Vec<(Method, String)>,
}

impl BackendState {
    fn issue_access(&mut self) -> String {
        self.issued += 1;
        let token = format!("access-{}", self.issued);
        self.access_token = Some(token.clone());
        token
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

/// REST backend living in memory. Tokens, capacity and cascading of
/// device ids into their location behave like the real server.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<BackendState>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed_location(&self, id: &str, device_count: usize) {
        let mut state = self.state.lock().expect("backend lock");
        let location_id = LocationId::from(id);
        let mut device_ids = Vec::new();
        for n in 0..device_count {
            let device_id = DeviceId::from(format!("{id}-seed-{n}").as_str());
            state.devices.push(device(&device_id, &location_id));
            device_ids.push(device_id);
        }
        state.locations.push(Location {
            id: location_id,
            title: format!("Site {id}"),
            address: "1 Harbour Rd".to_string(),
            status: EntityStatus::Active,
            device_ids,
            created_at: ts(1_700_000_000),
            updated_at: ts(1_700_000_000),
        });
    }

    /// Rotates the server-side access token so the client's copy is stale.
    pub fn expire_access(&self) {
        self.state.lock().expect("backend lock").issue_access();
    }

    pub fn revoke_refresh(&self) {
        self.state.lock().expect("backend lock").refresh_revoked = true;
    }

    pub fn set_outage(&self, outage: bool) {
        self.state.lock().expect("backend lock").outage = outage;
    }

    pub fn calls(&self, method: Method, route: &str) -> usize {
        self.state
            .lock()
            .expect("backend lock")
            .calls
            .iter()
            .filter(|(m, r)| *m == method && r == route)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().expect("backend lock").calls.len()
    }

    pub fn location(&self, id: &str) -> Option<Location> {
        self.state
            .lock()
            .expect("backend lock")
            .locations
            .iter()
            .find(|location| location.id.as_str() == id)
            .cloned()
    }

    pub fn device_count(&self) -> usize {
        self.state.lock().expect("backend lock").devices.len()
    }

    fn route(&self, request: &ApiRequest) -> (StatusCode, Value) {
        let mut state = self.state.lock().expect("backend lock");
        state
            .calls
            .push((request.method().clone(), request.route().to_owned()));

        let method = request.method().clone();
        let route = request.route().to_owned();
        let segments: Vec<&str> = route.trim_start_matches('/').split('/').collect();
        let body = request.body().cloned().unwrap_or(Value::Null);

        match (method.as_str(), segments.as_slice()) {
            ("POST", ["auth", "login"]) => {
                if body["email"] != EMAIL || body["password"] != PASSWORD {
                    return unauthorized("Invalid credentials");
                }
                let access = state.issue_access();
                let refresh = format!("refresh-{}", state.issued);
                state.refresh_token = Some(refresh.clone());
                state.refresh_revoked = false;
                (
                    StatusCode::CREATED,
                    json!({
                        "statusCode": 201,
                        "message": "Login successful",
                        "data": { "user": user(), "access_token": access, "refresh_token": refresh },
                    }),
                )
            }
            ("POST", ["auth", "refresh"]) => {
                let valid = !state.refresh_revoked
                    && state.refresh_token.is_some()
                    && request.bearer_token() == state.refresh_token.as_deref();
                if !valid {
                    return unauthorized("Invalid refresh token");
                }
                let access = state.issue_access();
                (StatusCode::OK, json!({ "access_token": access }))
            }
            ("POST", ["auth", "logout"]) => {
                state.access_token = None;
                state.refresh_token = None;
                (StatusCode::OK, json!({ "message": "Logged out" }))
            }
            _ if request.bearer_token().is_none()
                || request.bearer_token() != state.access_token.as_deref() =>
            {
                unauthorized("Unauthorized")
            }
            _ if state.outage => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "message": "Service Unavailable" }),
            ),
            ("GET", ["auth", "me"]) => ok(user()),
            ("GET", ["locations"]) => ok(to_value(&state.locations)),
            ("GET", ["locations", id]) => match find_location(&state, id) {
                Some(index) => ok(to_value(&state.locations[index])),
                None => not_found("Location not found"),
            },
            ("POST", ["locations"]) => {
                let id = state.next_id("loc");
                let location = Location {
                    id: LocationId::from(id.as_str()),
                    title: body["title"].as_str().unwrap_or_default().to_owned(),
                    address: body["address"].as_str().unwrap_or_default().to_owned(),
                    status: serde_json::from_value(body["status"].clone())
                        .unwrap_or(EntityStatus::Active),
                    device_ids: serde_json::from_value(body["deviceIds"].clone())
                        .unwrap_or_default(),
                    created_at: ts(1_700_000_100),
                    updated_at: ts(1_700_000_100),
                };
                state.locations.push(location.clone());
                (StatusCode::CREATED, json!({ "data": location }))
            }
            ("PATCH", ["locations", id]) => match find_location(&state, id) {
                Some(index) => {
                    let location = &mut state.locations[index];
                    if let Some(title) = body["title"].as_str() {
                        location.title = title.to_owned();
                    }
                    if let Some(address) = body["address"].as_str() {
                        location.address = address.to_owned();
                    }
                    if let Ok(status) = serde_json::from_value(body["status"].clone()) {
                        location.status = status;
                    }
                    ok(to_value(&*location))
                }
                None => not_found("Location not found"),
            },
            ("DELETE", ["locations", id]) => match find_location(&state, id) {
                Some(index) => {
                    state.locations.remove(index);
                    ok(Value::Null)
                }
                None => not_found("Location not found"),
            },
            ("GET", ["devices"]) => ok(to_value(&state.devices)),
            ("GET", ["devices", id]) => match find_device(&state, id) {
                Some(index) => ok(to_value(&state.devices[index])),
                None => not_found("Device not found"),
            },
            ("POST", ["devices"]) => {
                let location_id = body["locationId"].as_str().unwrap_or_default().to_owned();
                let Some(index) = find_location(&state, &location_id) else {
                    return (
                        StatusCode::BAD_REQUEST,
                        json!({ "message": ["locationId must reference a location"] }),
                    );
                };
                if state.locations[index].device_ids.len() >= MAX_DEVICES_PER_LOCATION {
                    return (
                        StatusCode::BAD_REQUEST,
                        json!({ "message": "Location has reached maximum device limit (10)" }),
                    );
                }
                let id = DeviceId::from(state.next_id("dev").as_str());
                let mut created = device(&id, &LocationId::from(location_id.as_str()));
                if let Some(serial) = body["serialNumber"].as_str() {
                    created.serial_number = serial.to_owned();
                }
                state.locations[index].device_ids.push(id);
                state.devices.push(created.clone());
                (StatusCode::CREATED, json!({ "data": created }))
            }
            ("PATCH", ["devices", id]) => match find_device(&state, id) {
                Some(index) => {
                    if let Some(name) = body["name"].as_str() {
                        state.devices[index].name = Some(name.to_owned());
                    }
                    if let Some(destination) = body["locationId"].as_str() {
                        let device_id = state.devices[index].id.clone();
                        for location in &mut state.locations {
                            location.device_ids.retain(|existing| existing != &device_id);
                            if location.id.as_str() == destination {
                                location.device_ids.push(device_id.clone());
                            }
                        }
                        state.devices[index].location_id = LocationId::from(destination);
                    }
                    ok(to_value(&state.devices[index]))
                }
                None => not_found("Device not found"),
            },
            ("DELETE", ["devices", id]) => match find_device(&state, id) {
                Some(index) => {
                    let removed = state.devices.remove(index);
                    for location in &mut state.locations {
                        location.device_ids.retain(|existing| existing != &removed.id);
                    }
                    ok(Value::Null)
                }
                None => not_found("Device not found"),
            },
            ("GET", ["dashboard", "stats"]) => {
                let active_locations = state
                    .locations
                    .iter()
                    .filter(|location| location.status == EntityStatus::Active)
                    .count();
                let active_devices = state
                    .devices
                    .iter()
                    .filter(|device| device.status == EntityStatus::Active)
                    .count();
                ok(json!({
                    "totalLocations": state.locations.len(),
                    "activeLocations": active_locations,
                    "totalDevices": state.devices.len(),
                    "activeDevices": active_devices,
                    "issues": 0,
                }))
            }
            ("GET", ["dashboard", "recent-locations"]) => {
                ok(to_value(&state.locations.iter().rev().take(5).collect::<Vec<_>>()))
            }
            ("GET", ["dashboard", "recent-devices"]) => {
                ok(to_value(&state.devices.iter().rev().take(5).collect::<Vec<_>>()))
            }
            _ => not_found("Cannot route request"),
        }
    }
}

#[async_trait]
impl HttpTransport for FakeBackend {
    async fn execute(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let (status, body) = self.route(&request);
        Ok(ApiResponse::json_body(status, &body))
    }
}

pub struct TestHarness {
    pub backend: Arc<FakeBackend>,
    pub store: Arc<MemoryTokenStore>,
    pub session: FleetSession<Arc<MemoryTokenStore>>,
}

impl TestHarness {
    pub fn new() -> Self {
        let backend = FakeBackend::new();
        let store = Arc::new(MemoryTokenStore::default());
        let session = session_over(&backend, &store);
        Self {
            backend,
            store,
            session,
        }
    }

    pub async fn signed_in() -> Self {
        let harness = Self::new();
        harness
            .session
            .login(EMAIL, PASSWORD)
            .await
            .expect("login succeeds");
        harness
    }

    /// A second session sharing the persisted credentials, as after a
    /// process restart.
    pub fn restart(&self) -> FleetSession<Arc<MemoryTokenStore>> {
        session_over(&self.backend, &self.store)
    }
}

fn session_over(
    backend: &Arc<FakeBackend>,
    store: &Arc<MemoryTokenStore>,
) -> FleetSession<Arc<MemoryTokenStore>> {
    let _ = pretty_env_logger::try_init();
    FleetSession::new(
        Arc::clone(store),
        Arc::clone(backend) as Arc<dyn HttpTransport>,
        TokenLifetimes::default(),
    )
}

fn device(id: &DeviceId, location_id: &LocationId) -> Device {
    Device {
        id: id.clone(),
        serial_number: format!("SN-{id}"),
        name: None,
        device_type: DeviceType::Pos,
        status: EntityStatus::Active,
        location_id: location_id.clone(),
        image_ref: None,
        created_at: ts(1_700_000_000),
        updated_at: ts(1_700_000_000),
    }
}

fn user() -> Value {
    json!({ "_id": "user-1", "name": "Ops", "email": EMAIL })
}

fn find_location(state: &BackendState, id: &str) -> Option<usize> {
    state
        .locations
        .iter()
        .position(|location| location.id.as_str() == id)
}

fn find_device(state: &BackendState, id: &str) -> Option<usize> {
    state.devices.iter().position(|device| device.id.as_str() == id)
}

fn to_value<T: serde::Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).expect("serializable fixture")
}

fn ok(data: Value) -> (StatusCode, Value) {
    (StatusCode::OK, json!({ "data": data, "statusCode": 200 }))
}

fn unauthorized(message: &str) -> (StatusCode, Value) {
    (
        StatusCode::UNAUTHORIZED,
        json!({ "message": message, "statusCode": 401 }),
    )
}

fn not_found(message: &str) -> (StatusCode, Value) {
    (
        StatusCode::NOT_FOUND,
        json!({ "message": message, "statusCode": 404 }),
    )
}
