use sqlx::SqlitePool;

use crate::db::models::ModlistRow;
use crate::db::queries::servers::add_listener;
use crate::engine::modlist::Modlist;

/// Insert a new modlist and subscribe the given (server id, channel id) pairs to it
/// in one transaction.
pub async fn insert_modlist(
    pool: &SqlitePool,
    modlist: &Modlist,
    listeners: &[(String, String)],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query(
        "INSERT INTO modlists (id, author_id, title, version, image_link) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&modlist.id)
    .bind(&modlist.author_id)
    .bind(&modlist.title)
    .bind(&modlist.version)
    .bind(&modlist.image_link)
    .execute(&mut *tx)
    .await?;
    for (server_id, channel_id) in listeners {
        add_listener(&mut *tx, server_id, channel_id, &modlist.id).await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Store refreshed metadata for a modlist.
pub async fn update_metadata(pool: &SqlitePool, modlist: &Modlist) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE modlists SET title = ?, version = ?, image_link = ?, updated_at = datetime('now') \
         WHERE id = ?",
    )
    .bind(&modlist.title)
    .bind(&modlist.version)
    .bind(&modlist.image_link)
    .bind(&modlist.id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Get a modlist by id.
pub async fn get_modlist(pool: &SqlitePool, id: &str) -> Result<Option<ModlistRow>, sqlx::Error> {
    sqlx::query_as::<_, ModlistRow>("SELECT * FROM modlists WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// List all modlists.
pub async fn list_modlists(pool: &SqlitePool) -> Result<Vec<ModlistRow>, sqlx::Error> {
    sqlx::query_as::<_, ModlistRow>("SELECT * FROM modlists ORDER BY id")
        .fetch_all(pool)
        .await
}

/// Delete a modlist together with every channel subscription to it.
/// Returns false if no modlist row existed.
pub async fn delete_modlist(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM channel_listeners WHERE modlist_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM modlists WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}
