//! Server-mirrored user and channel state.
//!
//! The store reflects what the server has told us; only inbound dispatch
//! mutates it. The reconciler and the facade read it to resolve names to
//! ids.

use std::collections::{BTreeMap, HashMap};

/// A connected user as described by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Server-assigned session id, unique while connected.
    pub session: u32,
    /// Stable id assigned by the hosting application, 0 when unset.
    pub server_id: u32,
    /// Display name.
    pub name: String,
    /// Current channel.
    pub channel_id: u32,
}

/// A channel as described by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    /// Channel id; 0 is the root.
    pub id: u32,
    /// Parent channel id; 0 for children of the root.
    pub parent: u32,
    /// Channel name.
    pub name: String,
    /// Whether the server will remove the channel once empty.
    pub temporary: bool,
}

/// Users and channels indexed by session id and channel id.
#[derive(Debug, Default)]
pub struct StateStore {
    users: HashMap<u32, User>,
    channels: BTreeMap<u32, Channel>,
    session: u32,
    username: String,
}

impl StateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all server state; keeps the configured username.
    pub fn reset(&mut self) {
        self.users.clear();
        self.channels.clear();
        self.session = 0;
    }

    /// Our own session id, 0 until the server sync.
    #[must_use]
    pub fn session(&self) -> u32 {
        self.session
    }

    /// Record our session id from the server sync.
    pub fn set_session(&mut self, session: u32) {
        self.session = session;
    }

    /// Configured username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Set the username used for authentication.
    pub fn set_username(&mut self, username: String) {
        self.username = username;
    }

    /// Fetch or create the user for a session.
    pub fn upsert_user(&mut self, session: u32) -> &mut User {
        self.users.entry(session).or_insert_with(|| User {
            session,
            server_id: 0,
            name: String::new(),
            channel_id: 0,
        })
    }

    /// Remove a user.
    pub fn remove_user(&mut self, session: u32) -> Option<User> {
        self.users.remove(&session)
    }

    /// Look up a user by session id.
    #[must_use]
    pub fn user(&self, session: u32) -> Option<&User> {
        self.users.get(&session)
    }

    /// Iterate all users in unspecified order.
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    /// Look up a user by display name.
    #[must_use]
    pub fn user_by_name(&self, name: &str) -> Option<&User> {
        self.users.values().find(|u| u.name == name)
    }

    /// Look up a user by stable server id.
    #[must_use]
    pub fn user_by_server_id(&self, server_id: u32) -> Option<&User> {
        self.users.values().find(|u| u.server_id == server_id)
    }

    /// Fetch or create a channel.
    pub fn upsert_channel(&mut self, id: u32) -> &mut Channel {
        self.channels.entry(id).or_insert_with(|| Channel {
            id,
            parent: 0,
            name: String::new(),
            temporary: false,
        })
    }

    /// Remove a channel.
    pub fn remove_channel(&mut self, id: u32) -> Option<Channel> {
        self.channels.remove(&id)
    }

    /// Look up a channel by id.
    #[must_use]
    pub fn channel(&self, id: u32) -> Option<&Channel> {
        self.channels.get(&id)
    }

    /// View of all channels keyed by id.
    #[must_use]
    pub fn channels(&self) -> &BTreeMap<u32, Channel> {
        &self.channels
    }

    /// Resolve a channel name to its id by exact match.
    #[must_use]
    pub fn channel_id_by_name(&self, name: &str) -> Option<u32> {
        self.channels.values().find(|c| c.name == name).map(|c| c.id)
    }
}
