use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::commands::directory::{Directory, DirectoryError, Named};
use crate::engine::notification::Notification;
use crate::engine::sink::{MessageRef, MessageSink, SinkError};

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Client for a Discord-compatible REST API, authenticated as the bot.
pub struct RestClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

#[derive(Deserialize)]
struct CreatedMessage {
    id: String,
}

#[derive(Deserialize)]
struct ChannelObject {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    guild_id: Option<String>,
}

#[derive(Deserialize)]
struct UserObject {
    id: String,
    username: String,
    #[serde(default)]
    global_name: Option<String>,
}

#[derive(Deserialize)]
struct MemberObject {
    user: UserObject,
    #[serde(default)]
    nick: Option<String>,
}

#[derive(Deserialize)]
struct RoleObject {
    id: String,
    name: String,
}

/// Embed payload for a release notification.
pub fn embed_json(notification: &Notification) -> Value {
    let mut embed = json!({
        "title": notification.title,
        "description": notification.description,
        "color": notification.color,
        "timestamp": notification.timestamp.to_rfc3339(),
        "footer": { "text": notification.footer },
    });
    if let Some(url) = &notification.image_url {
        embed["image"] = json!({ "url": url });
    }
    embed
}

impl RestClient {
    pub fn new(api_base: &str, token: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent("WabbaBot (https://github.com/wabbajack-tools, 1.0)")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.api_base))
            .header("Authorization", format!("Bot {}", self.token))
    }

    async fn sink_call(&self, builder: RequestBuilder) -> Result<Response, SinkError> {
        let resp = builder
            .send()
            .await
            .map_err(|e| SinkError::Request(e.to_string()))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(SinkError::Rejected {
            status: status.as_u16(),
            body,
        })
    }

    /// GET a directory resource. 404 maps to `None`.
    async fn lookup<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
    ) -> Result<Option<T>, DirectoryError> {
        let resp = self
            .request(Method::GET, path)
            .send()
            .await
            .map_err(|e| DirectoryError::Request(e.to_string()))?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DirectoryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        resp.json::<T>()
            .await
            .map(Some)
            .map_err(|e| DirectoryError::Request(e.to_string()))
    }
}

#[async_trait]
impl MessageSink for RestClient {
    async fn send(
        &self,
        server_id: &str,
        channel_id: &str,
        notification: &Notification,
    ) -> Result<MessageRef, SinkError> {
        let resp = self
            .sink_call(
                self.request(Method::POST, &format!("/channels/{channel_id}/messages"))
                    .json(&json!({ "embeds": [embed_json(notification)] })),
            )
            .await?;
        let created: CreatedMessage = resp
            .json()
            .await
            .map_err(|e| SinkError::Request(e.to_string()))?;

        debug!(%channel_id, message_id = %created.id, "announcement posted");
        Ok(MessageRef {
            server_id: server_id.to_string(),
            channel_id: channel_id.to_string(),
            message_id: created.id,
        })
    }

    async fn send_text(
        &self,
        _server_id: &str,
        channel_id: &str,
        text: &str,
    ) -> Result<(), SinkError> {
        self.sink_call(
            self.request(Method::POST, &format!("/channels/{channel_id}/messages"))
                .json(&json!({ "content": text })),
        )
        .await?;
        Ok(())
    }

    async fn edit(
        &self,
        message: &MessageRef,
        notification: &Notification,
    ) -> Result<(), SinkError> {
        self.sink_call(
            self.request(
                Method::PATCH,
                &format!(
                    "/channels/{}/messages/{}",
                    message.channel_id, message.message_id
                ),
            )
            .json(&json!({ "embeds": [embed_json(notification)] })),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Directory for RestClient {
    async fn channel(
        &self,
        server_id: &str,
        channel_id: &str,
    ) -> Result<Option<Named>, DirectoryError> {
        let channel: Option<ChannelObject> =
            self.lookup(&format!("/channels/{channel_id}")).await?;
        // A channel of another server does not exist as far as this server is concerned
        Ok(channel
            .filter(|c| c.guild_id.as_deref() == Some(server_id))
            .map(|c| Named {
                name: c.name.unwrap_or_else(|| c.id.clone()),
                id: c.id,
            }))
    }

    async fn member(
        &self,
        server_id: &str,
        user_id: &str,
    ) -> Result<Option<Named>, DirectoryError> {
        let member: Option<MemberObject> = self
            .lookup(&format!("/guilds/{server_id}/members/{user_id}"))
            .await?;
        Ok(member.map(|m| Named {
            name: m
                .nick
                .or(m.user.global_name)
                .unwrap_or(m.user.username),
            id: m.user.id,
        }))
    }

    async fn role(&self, server_id: &str, role_id: &str) -> Result<Option<Named>, DirectoryError> {
        let roles: Option<Vec<RoleObject>> =
            self.lookup(&format!("/guilds/{server_id}/roles")).await?;
        Ok(roles
            .unwrap_or_default()
            .into_iter()
            .find(|r| r.id == role_id)
            .map(|r| Named {
                id: r.id,
                name: r.name,
            }))
    }
}
