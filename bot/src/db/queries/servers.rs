use sqlx::{SqliteConnection, SqlitePool};

use crate::db::models::{ChannelRow, ListRoleRow, ListenerRow, ServerRow};

/// Create a server or update its name.
async fn upsert_server(conn: &mut SqliteConnection, id: &str, name: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO servers (id, name) VALUES (?, ?) \
         ON CONFLICT(id) DO UPDATE SET name = excluded.name",
    )
    .bind(id)
    .bind(name)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// List all servers.
pub async fn list_servers(pool: &SqlitePool) -> Result<Vec<ServerRow>, sqlx::Error> {
    sqlx::query_as::<_, ServerRow>("SELECT * FROM servers ORDER BY id")
        .fetch_all(pool)
        .await
}

/// Ensure a channel exists in a server.
async fn ensure_channel(
    conn: &mut SqliteConnection,
    server_id: &str,
    channel_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT OR IGNORE INTO channels (server_id, id) VALUES (?, ?)")
        .bind(server_id)
        .bind(channel_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// List all channels of a server.
pub async fn list_channels(
    pool: &SqlitePool,
    server_id: &str,
) -> Result<Vec<ChannelRow>, sqlx::Error> {
    sqlx::query_as::<_, ChannelRow>("SELECT * FROM channels WHERE server_id = ? ORDER BY id")
        .bind(server_id)
        .fetch_all(pool)
        .await
}

/// Set a channel's auto-listen flag, creating the server and channel rows as needed.
/// All writes commit together or not at all.
pub async fn set_auto_listen(
    pool: &SqlitePool,
    server_id: &str,
    server_name: &str,
    channel_id: &str,
    enabled: bool,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    upsert_server(&mut *tx, server_id, server_name).await?;
    ensure_channel(&mut *tx, server_id, channel_id).await?;
    sqlx::query("UPDATE channels SET auto_listen = ? WHERE server_id = ? AND id = ?")
        .bind(enabled as i32)
        .bind(server_id)
        .bind(channel_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

/// Insert one subscription row. The channel row must exist.
pub(crate) async fn add_listener(
    conn: &mut SqliteConnection,
    server_id: &str,
    channel_id: &str,
    modlist_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT OR IGNORE INTO channel_listeners (server_id, channel_id, modlist_id) \
         VALUES (?, ?, ?)",
    )
    .bind(server_id)
    .bind(channel_id)
    .bind(modlist_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Subscribe a channel to a modlist, creating the server and channel rows as needed.
/// All writes commit together or not at all.
pub async fn subscribe(
    pool: &SqlitePool,
    server_id: &str,
    server_name: &str,
    channel_id: &str,
    modlist_id: &str,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    upsert_server(&mut *tx, server_id, server_name).await?;
    ensure_channel(&mut *tx, server_id, channel_id).await?;
    add_listener(&mut *tx, server_id, channel_id, modlist_id).await?;
    tx.commit().await?;
    Ok(())
}

/// Unsubscribe a channel from a modlist.
pub async fn remove_listener(
    pool: &SqlitePool,
    server_id: &str,
    channel_id: &str,
    modlist_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "DELETE FROM channel_listeners WHERE server_id = ? AND channel_id = ? AND modlist_id = ?",
    )
    .bind(server_id)
    .bind(channel_id)
    .bind(modlist_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// All subscriptions of a server's channels.
pub async fn list_listeners(
    pool: &SqlitePool,
    server_id: &str,
) -> Result<Vec<ListenerRow>, sqlx::Error> {
    sqlx::query_as::<_, ListenerRow>(
        "SELECT server_id, channel_id, modlist_id FROM channel_listeners WHERE server_id = ?",
    )
    .bind(server_id)
    .fetch_all(pool)
    .await
}

/// Set (or replace) the role pinged for a modlist in a server.
pub async fn set_list_role(
    pool: &SqlitePool,
    server_id: &str,
    modlist_id: &str,
    role_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO list_roles (server_id, modlist_id, role_id) VALUES (?, ?, ?) \
         ON CONFLICT(server_id, modlist_id) DO UPDATE SET role_id = excluded.role_id",
    )
    .bind(server_id)
    .bind(modlist_id)
    .bind(role_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// All list roles configured in a server.
pub async fn list_list_roles(
    pool: &SqlitePool,
    server_id: &str,
) -> Result<Vec<ListRoleRow>, sqlx::Error> {
    sqlx::query_as::<_, ListRoleRow>(
        "SELECT server_id, modlist_id, role_id FROM list_roles WHERE server_id = ?",
    )
    .bind(server_id)
    .fetch_all(pool)
    .await
}
