pub mod ids;
pub mod models;
pub mod routes;
pub mod time;

pub use ids::{DeviceId, LocationId, UserId};
pub use models::{
    DashboardStats, Device, DevicePatch, DeviceType, EntityStatus, Location, LocationPatch,
    MAX_DEVICES_PER_LOCATION, NewDevice, NewLocation, ParseDeviceTypeError,
    ParseEntityStatusError, User,
};
pub use routes::{RouteDecision, RouteGuard};
pub use time::Timestamp;
