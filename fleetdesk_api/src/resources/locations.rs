use fleetdesk_core::{Location, LocationId, LocationPatch, MAX_DEVICES_PER_LOCATION, NewLocation};

use crate::{ApiError, ApiResult, http::ApiClient};

pub const LOCATIONS_PATH: &str = "/locations";

#[derive(Clone)]
pub struct LocationsClient {
    api: ApiClient,
}

impl LocationsClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> ApiResult<Vec<Location>> {
        self.api.get_json(LOCATIONS_PATH).await
    }

    pub async fn get(&self, id: &LocationId) -> ApiResult<Location> {
        self.api.get_json(&location_path(id)).await
    }

    pub async fn create(&self, location: &NewLocation) -> ApiResult<Location> {
        check_device_ids(location.device_ids.len())?;
        self.api.post_json(LOCATIONS_PATH, location).await
    }

    /// Sends only the fields set on `patch`.
    pub async fn update(&self, id: &LocationId, patch: &LocationPatch) -> ApiResult<Location> {
        if let Some(device_ids) = &patch.device_ids {
            check_device_ids(device_ids.len())?;
        }
        self.api.patch_json(&location_path(id), patch).await
    }

    pub async fn delete(&self, id: &LocationId) -> ApiResult<()> {
        self.api.delete(&location_path(id)).await
    }

    /// Fetches the location and reports whether one more device fits.
    pub async fn has_device_capacity(&self, id: &LocationId) -> ApiResult<bool> {
        let location = self.get(id).await?;
        Ok(!location.is_at_capacity())
    }
}

fn location_path(id: &LocationId) -> String {
    format!("{LOCATIONS_PATH}/{id}")
}

fn check_device_ids(count: usize) -> ApiResult<()> {
    if count > MAX_DEVICES_PER_LOCATION {
        return Err(ApiError::TooManyDevices {
            count,
            limit: MAX_DEVICES_PER_LOCATION,
        });
    }
    Ok(())
}
