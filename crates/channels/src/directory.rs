//! Member directory: presence, display names, and private channel cache.
//!
//! The adapter owns a [`DirectoryState`] and mutates it as gateway events
//! arrive. Everything else reads it through the [`Directory`] trait.

use std::{
    collections::HashMap,
    sync::RwLock,
};

use {
    aula_common::{ChannelId, UserId},
    serde::{Deserialize, Serialize},
};

use crate::event::PresenceUpdate;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnlineStatus {
    Online,
    Idle,
    DoNotDisturb,
    #[default]
    Offline,
}

/// Client class a user is connected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    Desktop,
    Mobile,
    Web,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Presence {
    pub status: OnlineStatus,
    pub devices: Vec<Device>,
}

impl Presence {
    pub fn is_online(&self) -> bool {
        self.status != OnlineStatus::Offline
    }

    /// Online with a desktop client attached.
    pub fn on_desktop(&self) -> bool {
        self.is_online() && self.devices.contains(&Device::Desktop)
    }
}

/// Read-only view of the member directory.
pub trait Directory: Send + Sync {
    /// Users whose last known status is not offline.
    fn online_users(&self) -> Vec<UserId>;

    fn presence(&self, user: &UserId) -> Option<Presence>;

    fn display_name(&self, user: &UserId) -> Option<String>;
}

/// Concrete directory, mutated only by the transport adapter.
#[derive(Debug, Default)]
pub struct DirectoryState {
    presences: RwLock<HashMap<UserId, Presence>>,
    names: RwLock<HashMap<UserId, String>>,
    dm_channels: RwLock<HashMap<UserId, ChannelId>>,
}

impl DirectoryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_presence(&self, update: &PresenceUpdate) {
        let mut presences = self.presences.write().unwrap_or_else(|e| e.into_inner());
        presences.insert(update.user.clone(), Presence {
            status: update.status,
            devices: update.devices.clone(),
        });
    }

    pub fn set_display_name(&self, user: UserId, name: impl Into<String>) {
        let mut names = self.names.write().unwrap_or_else(|e| e.into_inner());
        names.insert(user, name.into());
    }

    pub fn cache_dm_channel(&self, user: UserId, channel: ChannelId) {
        let mut channels = self.dm_channels.write().unwrap_or_else(|e| e.into_inner());
        channels.insert(user, channel);
    }

    pub fn cached_dm_channel(&self, user: &UserId) -> Option<ChannelId> {
        let channels = self.dm_channels.read().unwrap_or_else(|e| e.into_inner());
        channels.get(user).cloned()
    }
}

impl Directory for DirectoryState {
    fn online_users(&self) -> Vec<UserId> {
        let presences = self.presences.read().unwrap_or_else(|e| e.into_inner());
        let mut users: Vec<UserId> = presences
            .iter()
            .filter(|(_, p)| p.is_online())
            .map(|(user, _)| user.clone())
            .collect();
        users.sort();
        users
    }

    fn presence(&self, user: &UserId) -> Option<Presence> {
        let presences = self.presences.read().unwrap_or_else(|e| e.into_inner());
        presences.get(user).cloned()
    }

    fn display_name(&self, user: &UserId) -> Option<String> {
        let names = self.names.read().unwrap_or_else(|e| e.into_inner());
        names.get(user).cloned()
    }
}
