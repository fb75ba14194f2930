//! Typed wrappers over the REST resources. One HTTP call per operation,
//! except where a capacity check needs the target location first.

mod dashboard;
mod devices;
mod locations;

pub use dashboard::{DashboardClient, DashboardOverview};
pub use devices::{DEVICES_PATH, DevicesClient};
pub use locations::{LOCATIONS_PATH, LocationsClient};
