//! In-memory entity cache
//!
//! Holds guilds, channels and users reconstructed from the dispatch stream.
//! Uses `DashMap` so application tasks can read while the gateway session,
//! the only writer, applies events.

use cord_core::{
    Channel, Guild, GuildCreateEvent, Id, Member, PresenceUpdateEvent, ReadyEvent, User,
};
use dashmap::DashMap;
use std::sync::Arc;

/// Cache of guilds, channels and users
#[derive(Debug, Default)]
pub struct EntityCache {
    /// Guilds by id (stubs from READY, snapshots from GUILD_CREATE)
    guilds: DashMap<Id, Guild>,

    /// Channels by id, each stamped with its guild id
    channels: DashMap<Id, Channel>,

    /// Users by id, shared across every guild they belong to
    users: DashMap<Id, User>,
}

impl EntityCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    // === Read accessors ===

    /// Get a guild by id
    pub fn get_guild(&self, id: &str) -> Option<Guild> {
        self.guilds.get(id).map(|g| g.clone())
    }

    /// Get a channel by id
    pub fn get_channel(&self, id: &str) -> Option<Channel> {
        self.channels.get(id).map(|c| c.clone())
    }

    /// Get a user by id
    pub fn get_user(&self, id: &str) -> Option<User> {
        self.users.get(id).map(|u| u.clone())
    }

    /// Get one guild's view of a member
    pub fn guild_member(&self, guild_id: &str, user_id: &str) -> Option<Member> {
        self.guilds
            .get(guild_id)
            .and_then(|g| g.members.get(user_id).cloned())
    }

    /// Channels belonging to a guild, ordered by position
    pub fn guild_channels(&self, guild_id: &str) -> Vec<Channel> {
        let ids = match self.guilds.get(guild_id) {
            Some(guild) => guild.channel_ids.clone(),
            None => return Vec::new(),
        };

        let mut channels: Vec<Channel> = ids
            .iter()
            .filter_map(|id| self.get_channel(id.as_str()))
            .collect();
        channels.sort_by_key(|c| c.position.unwrap_or(i64::MAX));
        channels
    }

    /// Ids of every cached guild
    pub fn guild_ids(&self) -> Vec<Id> {
        self.guilds.iter().map(|g| g.key().clone()).collect()
    }

    /// Ids of the guilds a user is a member of
    pub fn guilds_of(&self, user_id: &str) -> Vec<Id> {
        self.guilds
            .iter()
            .filter(|g| g.members.contains_key(user_id))
            .map(|g| g.key().clone())
            .collect()
    }

    pub fn guild_count(&self) -> usize {
        self.guilds.len()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Drop every cached entity
    pub fn clear(&self) {
        self.guilds.clear();
        self.channels.clear();
        self.users.clear();
    }

    // === Mutations (driven by dispatch events) ===

    /// Apply READY: store the current user and a stub for every listed guild
    pub fn apply_ready(&self, ready: &ReadyEvent) {
        self.users.insert(ready.user.id.clone(), ready.user.clone());

        for stub in &ready.guilds {
            self.guilds.insert(stub.id.clone(), Guild::stub(stub));
        }

        tracing::debug!(
            user_id = %ready.user.id,
            guilds = ready.guilds.len(),
            "Ready applied to cache"
        );
    }

    /// Apply GUILD_CREATE: replace the guild wholesale
    ///
    /// Members' users are upserted into the global user map, channels are
    /// stamped with the guild id, and channels the previous snapshot of this
    /// guild listed but the new one does not are removed. Applying the same
    /// snapshot twice leaves the cache unchanged.
    pub fn apply_guild_create(&self, snapshot: GuildCreateEvent) {
        let (guild, channels) = Guild::from_snapshot(snapshot);

        // Copy the old channel list out before touching the guild map again
        let stale: Vec<Id> = self
            .guilds
            .get(guild.id.as_str())
            .map(|old| {
                old.channel_ids
                    .iter()
                    .filter(|id| !guild.channel_ids.contains(id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        // A channel another guild has since claimed stays with that guild
        for id in &stale {
            self.channels
                .remove_if(id.as_str(), |_, channel| channel.guild_id.as_ref() == Some(&guild.id));
        }

        for member in guild.members.values() {
            self.upsert_member_user(member);
        }

        let channel_count = channels.len();
        for channel in channels {
            self.channels.insert(channel.id.clone(), channel);
        }

        tracing::debug!(
            guild_id = %guild.id,
            members = guild.members.len(),
            channels = channel_count,
            removed_channels = stale.len(),
            "Guild snapshot applied to cache"
        );

        self.guilds.insert(guild.id.clone(), guild);
    }

    /// Apply PRESENCE_UPDATE to the global user and every guild-local member
    ///
    /// Returns the number of guilds whose member record was updated.
    pub fn apply_presence_update(&self, update: &PresenceUpdateEvent) -> usize {
        let user_id = &update.user.id;

        self.users
            .entry(user_id.clone())
            .and_modify(|user| user.apply_presence(update))
            .or_insert_with(|| {
                let mut user = User::from(&update.user);
                user.apply_presence(update);
                user
            });

        let mut touched = 0;
        for mut guild in self.guilds.iter_mut() {
            if let Some(member) = guild.members.get_mut(user_id) {
                member.apply_presence(update);
                touched += 1;
            }
        }

        tracing::trace!(
            user_id = %user_id,
            status = ?update.status,
            guilds = touched,
            "Presence applied to cache"
        );

        touched
    }

    /// Store a member's user globally without losing a presence already known
    fn upsert_member_user(&self, member: &Member) {
        let mut user = member.user.clone();
        if member.presence.is_some() {
            user.presence.clone_from(&member.presence);
        } else if let Some(existing) = self.users.get(user.id.as_str()) {
            user.presence.clone_from(&existing.presence);
        }
        self.users.insert(user.id.clone(), user);
    }
}
