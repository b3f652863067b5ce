//! Integration tests for WabbaBot: cross-layer tests that run commands
//! through the handler and HTTP surface against a real (in-memory) database.
//!
//! Each test creates its own in-memory SQLite database so tests are fully isolated.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use sqlx::SqlitePool;
    use tower::ServiceExt;

    use crate::commands::permissions::Permissions;
    use crate::commands::{CommandEvent, CommandHandler};
    use crate::db::pool::{create_pool, run_migrations};
    use crate::db::queries;
    use crate::engine::herald::Herald;
    use crate::error::HeraldError;
    use crate::testing::{FakeDirectory, RecordingSink, StaticMetadata};
    use crate::web::app_state::AppState;
    use crate::web::router::build_router;

    const ADMIN: &str = "100";
    const AUTHOR: &str = "200";
    const BOT: &str = "999";

    // ── Helpers ──────────────────────────────────────────────────

    /// Create an in-memory SQLite pool with all migrations applied.
    async fn setup_db() -> SqlitePool {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    fn metadata() -> Arc<StaticMetadata> {
        let metadata = StaticMetadata::with("tpf", "The Phoenix Flavour", "2.0");
        metadata.insert("lotus", "Lotus", "1.4");
        Arc::new(metadata)
    }

    fn directory() -> FakeDirectory {
        FakeDirectory::default()
            .with_channel("s1", "10", "#releases")
            .with_channel("s1", "11", "#general")
            .with_channel("s2", "20", "#announcements")
            .with_member("s1", AUTHOR, "Alice")
            .with_member("s1", BOT, "WabbaBot")
            .with_role("s1", "300", "Phoenix Fans")
    }

    struct Bot {
        handler: CommandHandler,
        sink: Arc<RecordingSink>,
        metadata: Arc<StaticMetadata>,
    }

    fn bot_with(pool: Option<SqlitePool>, metadata: Arc<StaticMetadata>) -> Bot {
        let sink = Arc::new(RecordingSink::default());
        let herald = Herald::new(metadata.clone(), sink.clone(), vec![ADMIN.to_string()], pool);
        Bot {
            handler: CommandHandler::new(
                Arc::new(herald),
                Arc::new(directory()),
                "!".into(),
                BOT.into(),
            ),
            sink,
            metadata,
        }
    }

    async fn bot(pool: &SqlitePool) -> Bot {
        bot_with(Some(pool.clone()), metadata())
    }

    fn event(server_id: &str, author_id: &str, content: &str) -> CommandEvent {
        CommandEvent {
            server_id: server_id.into(),
            server_name: format!("Server {server_id}"),
            channel_id: "11".into(),
            author_id: author_id.into(),
            author_name: if author_id == AUTHOR { "Alice".into() } else { format!("user{author_id}") },
            content: content.into(),
            author_permissions: Permissions::MANAGE_ROLES.bits(),
        }
    }

    async fn say(bot: &Bot, server_id: &str, author_id: &str, content: &str) -> String {
        bot.handler
            .handle(&event(server_id, author_id, content))
            .await
            .join("\n")
    }

    // ── Release lifecycle ────────────────────────────────────────

    #[tokio::test]
    async fn test_release_revise_delete_lifecycle() {
        let pool = setup_db().await;
        let bot = bot(&pool).await;

        say(&bot, "s1", ADMIN, "!addmodlist tpf <@200>").await;
        assert_eq!(
            say(&bot, "s1", ADMIN, "!listen tpf <#10>").await,
            "Now listening to **The Phoenix Flavour** in #releases."
        );

        assert_eq!(
            say(&bot, "s1", AUTHOR, "!release tpf New ENB preset and bug fixes").await,
            "Modlist was released in 1 channels!"
        );
        let sent = bot.sink.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].message.channel_id, "10");
        assert_eq!(
            sent[0].notification.title,
            "Alice just released The Phoenix Flavour 2.0!"
        );
        assert_eq!(sent[0].notification.description, "New ENB preset and bug fixes");

        assert_eq!(
            say(&bot, "s1", AUTHOR, "!revise tpf New ENB preset, more bug fixes").await,
            "Succesfully revised 1 release messages for The Phoenix Flavour!"
        );
        let edits = bot.sink.edits();
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].message, sent[0].message);

        assert_eq!(
            say(&bot, "s1", ADMIN, "!delmodlist tpf").await,
            "Modlist `The Phoenix Flavour` was deleted."
        );
        let herald = bot.handler.herald();
        assert!(herald.subscriptions().servers_listening_to("tpf").is_empty());
        assert!(queries::modlists::get_modlist(&pool, "tpf").await.unwrap().is_none());
        assert!(
            queries::servers::list_listeners(&pool, "s1")
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_second_release_replaces_revision_target() {
        let pool = setup_db().await;
        let bot = bot(&pool).await;
        say(&bot, "s1", ADMIN, "!addmodlist tpf 200").await;
        say(&bot, "s1", ADMIN, "!listen tpf <#10>").await;
        say(&bot, "s2", ADMIN, "!listen tpf <#20>").await;

        say(&bot, "s1", AUTHOR, "!release tpf first").await;
        bot.metadata.set_version("tpf", "2.1");
        assert_eq!(
            say(&bot, "s1", AUTHOR, "!release tpf second").await,
            "Modlist was released in 2 channels!"
        );

        say(&bot, "s1", AUTHOR, "!revise tpf second, edited").await;
        let sent = bot.sink.sent();
        let second: Vec<_> = sent[2..].iter().map(|s| s.message.clone()).collect();
        let edited: Vec<_> = bot.sink.edits().into_iter().map(|e| e.message).collect();
        assert_eq!(edited, second);
        // The revision carries the refreshed version
        assert!(
            bot.sink
                .edits()
                .iter()
                .all(|e| e.notification.title.ends_with("2.1!"))
        );
    }

    #[tokio::test]
    async fn test_release_refresh_is_persisted() {
        let pool = setup_db().await;
        let bot = bot(&pool).await;
        say(&bot, "s1", ADMIN, "!addmodlist tpf 200").await;
        say(&bot, "s1", ADMIN, "!listen tpf <#10>").await;

        bot.metadata.set_version("tpf", "3.0");
        say(&bot, "s1", AUTHOR, "!release tpf 3.0!").await;

        let row = queries::modlists::get_modlist(&pool, "tpf")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.version, "3.0");
    }

    #[tokio::test]
    async fn test_release_without_listeners() {
        let pool = setup_db().await;
        let bot = bot(&pool).await;
        say(&bot, "s1", ADMIN, "!addmodlist tpf 200").await;

        assert_eq!(
            say(&bot, "s1", AUTHOR, "!release tpf hello").await,
            "An error occurred! **There are no servers listening to modlist The Phoenix Flavour.**"
        );
        assert_eq!(
            say(&bot, "s1", AUTHOR, "!revise tpf hello").await,
            "An error occurred! **Could not edit last message for The Phoenix Flavour - was there one?.**"
        );
    }

    // ── Subscriptions ────────────────────────────────────────────

    #[tokio::test]
    async fn test_setrole_requires_listening_channel() {
        let pool = setup_db().await;
        let bot = bot(&pool).await;
        say(&bot, "s1", ADMIN, "!addmodlist tpf 200").await;

        let herald = bot.handler.herald();
        let err = herald.set_role("s1", "tpf", "300").await.unwrap_err();
        assert!(matches!(err, HeraldError::NotFound(_)));
        assert!(
            queries::servers::list_list_roles(&pool, "s1")
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_repeated_listen_is_idempotent() {
        let pool = setup_db().await;
        let bot = bot(&pool).await;
        say(&bot, "s1", ADMIN, "!addmodlist tpf 200").await;

        for _ in 0..3 {
            say(&bot, "s1", ADMIN, "!listen tpf <#10>").await;
        }
        assert_eq!(
            queries::servers::list_listeners(&pool, "s1")
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            say(&bot, "s1", AUTHOR, "!release tpf once").await,
            "Modlist was released in 1 channels!"
        );
    }

    #[tokio::test]
    async fn test_unlisten_persists() {
        let pool = setup_db().await;
        let bot = bot(&pool).await;
        say(&bot, "s1", ADMIN, "!addmodlist tpf 200").await;
        say(&bot, "s1", ADMIN, "!listen tpf <#10>").await;
        say(&bot, "s1", ADMIN, "!listen tpf <#11>").await;

        say(&bot, "s1", "1", "!unlisten tpf <#10>").await;
        let listeners = queries::servers::list_listeners(&pool, "s1").await.unwrap();
        assert_eq!(listeners.len(), 1);
        assert_eq!(listeners[0].channel_id, "11");
    }

    // ── Persistence ──────────────────────────────────────────────

    #[tokio::test]
    async fn test_state_survives_restart() {
        let pool = setup_db().await;
        {
            let bot = bot(&pool).await;
            say(&bot, "s1", ADMIN, "!addmodlist tpf 200").await;
            say(&bot, "s1", ADMIN, "!listen tpf <#10>").await;
            say(&bot, "s1", ADMIN, "!setrole tpf <@&300>").await;
            say(&bot, "s1", ADMIN, "!autolisten <#11> on").await;
            say(&bot, "s1", AUTHOR, "!release tpf before restart").await;
        }

        let bot = bot(&pool).await;
        bot.handler.herald().load_from_db().await.unwrap();

        let herald = bot.handler.herald();
        let modlist = herald.modlist("tpf").unwrap().read().clone();
        assert_eq!(modlist.author_id, AUTHOR);
        assert_eq!(modlist.title, "The Phoenix Flavour");

        let server = herald.subscriptions().get_server("s1").unwrap();
        assert_eq!(server.name, "Server s1");
        assert!(server.channels["10"].is_listening_to("tpf"));
        assert!(server.channels["11"].auto_listen_to_new_lists);
        assert_eq!(server.list_roles["tpf"], "300");

        // Release records are process-lifetime only
        assert_eq!(
            say(&bot, "s1", AUTHOR, "!revise tpf after restart").await,
            "An error occurred! **Could not edit last message for The Phoenix Flavour - was there one?.**"
        );

        // Auto-listen still applies after the restart
        say(&bot, "s1", ADMIN, "!addmodlist lotus 200").await;
        assert_eq!(
            say(&bot, "s1", AUTHOR, "!release lotus lotus is out").await,
            "Modlist was released in 1 channels!"
        );
        assert_eq!(
            queries::servers::list_listeners(&pool, "s1")
                .await
                .unwrap()
                .iter()
                .filter(|l| l.modlist_id == "lotus")
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_failed_metadata_fetch_adds_nothing() {
        let pool = setup_db().await;
        let bot = bot(&pool).await;

        let reply = say(&bot, "s1", ADMIN, "!addmodlist unknown 200").await;
        assert!(reply.starts_with("An error occurred! **Could not fetch modlist metadata"));
        assert!(bot.handler.herald().list_modlists().is_empty());
        assert!(
            queries::modlists::list_modlists(&pool)
                .await
                .unwrap()
                .is_empty()
        );
    }

    // ── Concurrency ──────────────────────────────────────────────

    #[tokio::test]
    async fn test_concurrent_listens_on_one_server() {
        let bot = Arc::new(bot_with(None, metadata()));
        say(&bot, "s1", ADMIN, "!addmodlist tpf 200").await;
        say(&bot, "s1", ADMIN, "!addmodlist lotus 200").await;

        let mut handles = Vec::new();
        for (modlist, channel) in [("tpf", "10"), ("lotus", "10"), ("tpf", "11"), ("lotus", "11")] {
            let bot = bot.clone();
            handles.push(tokio::spawn(async move {
                say(&bot, "s1", ADMIN, &format!("!listen {modlist} <#{channel}>")).await
            }));
        }
        for h in handles {
            assert!(h.await.unwrap().starts_with("Now listening"));
        }

        let server = bot.handler.herald().subscriptions().get_server("s1").unwrap();
        assert_eq!(server.channels.len(), 2);
        for channel in server.channels.values() {
            assert_eq!(channel.listening_to.len(), 2);
        }
    }

    // ── HTTP surface ─────────────────────────────────────────────

    fn app(bot: Bot, secret: &str) -> axum::Router {
        build_router(Arc::new(AppState {
            handler: bot.handler,
            ingest_secret: secret.into(),
        }))
    }

    fn post_event(token: Option<&str>, content: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/events")
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let body = json!({
            "server_id": "s1",
            "server_name": "Server s1",
            "channel_id": "11",
            "author_id": ADMIN,
            "author_name": "Admin",
            "content": content,
        });
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(resp: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_event_ingest_runs_commands() {
        let pool = setup_db().await;
        let app = app(bot(&pool).await, "s3cret");

        let resp = app
            .clone()
            .oneshot(post_event(Some("s3cret"), "!addmodlist tpf 200"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            json_body(resp).await,
            json!({ "replies": ["Modlist **The Phoenix Flavour** managed by **Alice** was added to the database."] })
        );

        let resp = app
            .clone()
            .oneshot(post_event(Some("s3cret"), "nice weather today"))
            .await
            .unwrap();
        assert_eq!(json_body(resp).await, json!({ "replies": [] }));

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/modlists")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let modlists = json_body(resp).await;
        assert_eq!(modlists[0]["id"], "tpf");
        assert_eq!(modlists[0]["version"], "2.0");
    }

    #[tokio::test]
    async fn test_event_ingest_requires_secret() {
        let app = app(bot_with(None, metadata()), "s3cret");

        let resp = app
            .clone()
            .oneshot(post_event(None, "!help"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = app
            .clone()
            .oneshot(post_event(Some("wrong"), "!help"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_event_ingest_disabled_without_secret() {
        let app = app(bot_with(None, metadata()), "");
        let resp = app.oneshot(post_event(Some(""), "!help")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
