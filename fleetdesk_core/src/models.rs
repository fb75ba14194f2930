use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    ids::{DeviceId, LocationId, UserId},
    time::Timestamp,
};

/// Upper bound on devices attached to one location.
///
/// The backend owns the authoritative check. Clients use this to skip
/// requests that would be rejected anyway.
pub const MAX_DEVICES_PER_LOCATION: usize = 10;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EntityStatus {
    #[serde(alias = "active")]
    Active,
    #[serde(alias = "inactive", alias = "InActive")]
    Inactive,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Pos,
    Kiosk,
    Signage,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown status '{0}', expected active or inactive")]
pub struct ParseEntityStatusError(String);

#[derive(Debug, thiserror::Error)]
#[error("unknown device type '{0}', expected pos, kiosk or signage")]
pub struct ParseDeviceTypeError(String);

impl FromStr for EntityStatus {
    type Err = ParseEntityStatusError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            _ => Err(ParseEntityStatusError(raw.to_owned())),
        }
    }
}

impl FromStr for DeviceType {
    type Err = ParseDeviceTypeError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pos" => Ok(Self::Pos),
            "kiosk" => Ok(Self::Kiosk),
            "signage" => Ok(Self::Signage),
            _ => Err(ParseDeviceTypeError(raw.to_owned())),
        }
    }
}

impl fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::Inactive => write!(f, "Inactive"),
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pos => write!(f, "pos"),
            Self::Kiosk => write!(f, "kiosk"),
            Self::Signage => write!(f, "signage"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(alias = "_id")]
    pub id: LocationId,
    pub title: String,
    pub address: String,
    pub status: EntityStatus,
    #[serde(default, alias = "devices")]
    pub device_ids: Vec<DeviceId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Location {
    pub fn device_count(&self) -> usize {
        self.device_ids.len()
    }

    pub fn is_at_capacity(&self) -> bool {
        self.device_count() >= MAX_DEVICES_PER_LOCATION
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(alias = "_id")]
    pub id: DeviceId,
    pub serial_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub status: EntityStatus,
    #[serde(alias = "location")]
    pub location_id: LocationId,
    #[serde(rename = "image", default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewLocation {
    pub title: String,
    pub address: String,
    pub status: EntityStatus,
    pub device_ids: Vec<DeviceId>,
}

#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LocationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EntityStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_ids: Option<Vec<DeviceId>>,
}

impl LocationPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.address.is_none()
            && self.status.is_none()
            && self.device_ids.is_none()
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewDevice {
    pub serial_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub status: EntityStatus,
    pub location_id: LocationId,
    #[serde(rename = "image", skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DevicePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub device_type: Option<DeviceType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EntityStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<LocationId>,
    #[serde(rename = "image", skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}

impl DevicePatch {
    pub fn is_empty(&self) -> bool {
        self.serial_number.is_none()
            && self.name.is_none()
            && self.device_type.is_none()
            && self.status.is_none()
            && self.location_id.is_none()
            && self.image_ref.is_none()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_locations: u64,
    pub active_locations: u64,
    pub total_devices: u64,
    pub active_devices: u64,
    #[serde(default)]
    pub issues: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    #[serde(alias = "_id")]
    pub id: UserId,
    pub name: String,
    pub email: String,
}
