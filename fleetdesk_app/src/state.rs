use std::{collections::HashMap, hash::Hash};

use fleetdesk_core::{Device, DeviceId, Location, LocationId};

/// Anything a [`StateMirror`] can cache, keyed by its server id.
pub trait Entity: Clone {
    type Id: Clone + Eq + Hash;

    fn id(&self) -> &Self::Id;
}

impl Entity for Location {
    type Id = LocationId;

    fn id(&self) -> &LocationId {
        &self.id
    }
}

impl Entity for Device {
    type Id = DeviceId;

    fn id(&self) -> &DeviceId {
        &self.id
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MirrorStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed,
}

/// Client-side copy of one server collection.
///
/// Only confirmed server results are applied; there are no optimistic
/// writes to roll back. Items keep the order the server listed them in,
/// with newly created ones appended.
#[derive(Clone, Debug)]
pub struct StateMirror<T: Entity> {
    items: HashMap<T::Id, T>,
    order: Vec<T::Id>,
    status: MirrorStatus,
    last_error: Option<String>,
}

impl<T: Entity> Default for StateMirror<T> {
    fn default() -> Self {
        Self {
            items: HashMap::new(),
            order: Vec::new(),
            status: MirrorStatus::Idle,
            last_error: None,
        }
    }
}

impl<T: Entity> StateMirror<T> {
    pub fn status(&self) -> MirrorStatus {
        self.status
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.items.get(id)
    }

    pub fn items(&self) -> Vec<T> {
        self.order
            .iter()
            .filter_map(|id| self.items.get(id))
            .cloned()
            .collect()
    }

    pub fn begin_load(&mut self) {
        self.status = MirrorStatus::Loading;
        self.last_error = None;
    }

    /// A fetch-all result replaces the whole collection.
    pub fn replace_all(&mut self, items: Vec<T>) {
        self.items.clear();
        self.order.clear();
        for item in items {
            self.insert(item);
        }
        self.status = MirrorStatus::Ready;
    }

    pub fn upsert(&mut self, item: T) {
        self.insert(item);
    }

    pub fn remove(&mut self, id: &T::Id) -> Option<T> {
        let removed = self.items.remove(id)?;
        self.order.retain(|existing| existing != id);
        Some(removed)
    }

    /// A failed fetch keeps the previous items around.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = MirrorStatus::Failed;
        self.last_error = Some(message.into());
    }

    /// A failed create, update or delete leaves items and status alone.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn insert(&mut self, item: T) {
        let id = item.id().clone();
        if self.items.insert(id.clone(), item).is_none() {
            self.order.push(id);
        }
    }
}

impl StateMirror<Device> {
    pub fn at_location(&self, location_id: &LocationId) -> Vec<Device> {
        self.items()
            .into_iter()
            .filter(|device| &device.location_id == location_id)
            .collect()
    }
}
