use serde::{Deserialize, Serialize};

use crate::engine::modlist::Modlist;

/// A stored modlist.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ModlistRow {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub version: String,
    pub image_link: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ModlistRow> for Modlist {
    fn from(row: ModlistRow) -> Self {
        Modlist {
            id: row.id,
            author_id: row.author_id,
            title: row.title,
            version: row.version,
            image_link: row.image_link,
        }
    }
}

/// A stored server (guild).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ServerRow {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

/// A stored channel of a server.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChannelRow {
    pub server_id: String,
    pub id: String,
    pub auto_listen: i32,
    pub created_at: String,
}

/// A channel's subscription to a modlist.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ListenerRow {
    pub server_id: String,
    pub channel_id: String,
    pub modlist_id: String,
}

/// The role pinged in a server when a modlist releases.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ListRoleRow {
    pub server_id: String,
    pub modlist_id: String,
    pub role_id: String,
}
