use fleetdesk_core::{Device, DeviceId, DevicePatch, Location, MAX_DEVICES_PER_LOCATION, NewDevice};

use super::locations::LocationsClient;
use crate::{ApiError, ApiResult, http::ApiClient};

pub const DEVICES_PATH: &str = "/devices";

#[derive(Clone)]
pub struct DevicesClient {
    api: ApiClient,
    locations: LocationsClient,
}

impl DevicesClient {
    pub fn new(api: ApiClient) -> Self {
        Self {
            locations: LocationsClient::new(api.clone()),
            api,
        }
    }

    pub async fn list(&self) -> ApiResult<Vec<Device>> {
        self.api.get_json(DEVICES_PATH).await
    }

    pub async fn get(&self, id: &DeviceId) -> ApiResult<Device> {
        self.api.get_json(&device_path(id)).await
    }

    /// Fetches the target location first and refuses to post when it is
    /// already full. The server still enforces the limit; two clients can
    /// race past this check.
    pub async fn create(&self, device: &NewDevice) -> ApiResult<Device> {
        let target = self.locations.get(&device.location_id).await?;
        ensure_capacity(&target)?;
        self.create_unchecked(device).await
    }

    /// Posts without the capacity lookup, for callers that already hold a
    /// current view of the target location.
    pub async fn create_unchecked(&self, device: &NewDevice) -> ApiResult<Device> {
        self.api.post_json(DEVICES_PATH, device).await
    }

    /// Moving a device checks the destination's capacity first.
    pub async fn update(&self, id: &DeviceId, patch: &DevicePatch) -> ApiResult<Device> {
        if let Some(destination) = &patch.location_id {
            let target = self.locations.get(destination).await?;
            if !target.device_ids.contains(id) {
                ensure_capacity(&target)?;
            }
        }
        self.api.patch_json(&device_path(id), patch).await
    }

    pub async fn delete(&self, id: &DeviceId) -> ApiResult<()> {
        self.api.delete(&device_path(id)).await
    }
}

fn ensure_capacity(location: &Location) -> ApiResult<()> {
    if location.is_at_capacity() {
        log::debug!(
            "location {} already holds {} devices",
            location.id,
            location.device_count()
        );
        return Err(ApiError::DeviceLimitReached {
            location_id: location.id.clone(),
            limit: MAX_DEVICES_PER_LOCATION,
        });
    }
    Ok(())
}

fn device_path(id: &DeviceId) -> String {
    format!("{DEVICES_PATH}/{id}")
}
