use fleetdesk_core::{DashboardStats, Device, Location};

use crate::{ApiResult, http::ApiClient};

const STATS_PATH: &str = "/dashboard/stats";
const RECENT_LOCATIONS_PATH: &str = "/dashboard/recent-locations";
const RECENT_DEVICES_PATH: &str = "/dashboard/recent-devices";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DashboardOverview {
    pub stats: DashboardStats,
    pub recent_locations: Vec<Location>,
    pub recent_devices: Vec<Device>,
}

#[derive(Clone)]
pub struct DashboardClient {
    api: ApiClient,
}

impl DashboardClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn stats(&self) -> ApiResult<DashboardStats> {
        self.api.get_json(STATS_PATH).await
    }

    pub async fn recent_locations(&self) -> ApiResult<Vec<Location>> {
        self.api.get_json(RECENT_LOCATIONS_PATH).await
    }

    pub async fn recent_devices(&self) -> ApiResult<Vec<Device>> {
        self.api.get_json(RECENT_DEVICES_PATH).await
    }

    /// All three dashboard calls in flight at once; the first failure wins.
    pub async fn overview(&self) -> ApiResult<DashboardOverview> {
        let (stats, recent_locations, recent_devices) = tokio::try_join!(
            self.stats(),
            self.recent_locations(),
            self.recent_devices()
        )?;
        Ok(DashboardOverview {
            stats,
            recent_locations,
            recent_devices,
        })
    }
}
