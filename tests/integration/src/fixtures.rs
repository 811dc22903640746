//! Dispatch payload fixtures

use serde_json::{json, Value};

/// READY for user `u1` listing `guilds` as unavailable stubs
pub fn ready(guilds: &[&str]) -> Value {
    json!({
        "v": 6,
        "session_id": "remote-session",
        "user": {"id": "u1", "username": "me", "discriminator": "0001"},
        "guilds": guilds
            .iter()
            .map(|id| json!({"id": id, "unavailable": true}))
            .collect::<Vec<_>>(),
    })
}

/// GUILD_CREATE with the given members and channels
pub fn guild_create(id: &str, members: &[&str], channels: &[&str]) -> Value {
    json!({
        "id": id,
        "name": format!("guild {id}"),
        "members": members
            .iter()
            .map(|user| json!({"user": {"id": user, "username": format!("name-{user}")}}))
            .collect::<Vec<_>>(),
        "channels": channels
            .iter()
            .enumerate()
            .map(|(position, channel)| json!({"id": channel, "type": 0, "position": position}))
            .collect::<Vec<_>>(),
    })
}

/// PRESENCE_UPDATE for `user`
pub fn presence_update(user: &str, status: &str, game: Option<&str>) -> Value {
    json!({
        "user": {"id": user},
        "status": status,
        "game": game.map(|name| json!({"name": name, "type": 0})),
    })
}

/// A message as returned by the REST API
pub fn message(id: &str, channel_id: &str, content: &str) -> Value {
    json!({
        "id": id,
        "channel_id": channel_id,
        "author": {"id": "u1", "username": "me"},
        "content": content,
        "timestamp": "2017-02-01T10:00:00+00:00",
    })
}
