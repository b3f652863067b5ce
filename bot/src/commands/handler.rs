use std::sync::Arc;

use tracing::{debug, warn};

use crate::engine::herald::Herald;
use crate::engine::subscriptions::Unlisten;
use crate::engine::validation::{MAX_MESSAGE_LENGTH, validate_modlist_id, validate_release_body};
use crate::error::{HeraldError, HeraldResult};

use super::directory::{Directory, Named};
use super::event::CommandEvent;
use super::mentions::{parse_channel, parse_role, parse_user};
use super::parser::{self, Command, help_text};
use super::permissions::{admins_only, manage_roles_only};

/// The reply sent when a command fails.
pub fn error_reply(err: &HeraldError) -> String {
    format!("An error occurred! **{err}.**")
}

/// Split text into messages of at most `max` bytes, preferring line breaks.
pub fn split_message(text: &str, max: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        let mut line = line;
        // A single line longer than a message is cut at char boundaries
        while line.len() > max {
            let mut cut = max;
            while !line.is_char_boundary(cut) {
                cut -= 1;
            }
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            chunks.push(line[..cut].to_string());
            line = &line[cut..];
        }

        let needed = if current.is_empty() {
            line.len()
        } else {
            current.len() + 1 + line.len()
        };
        if needed > max {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Turns inbound chat events into core operations and reply messages.
pub struct CommandHandler {
    herald: Arc<Herald>,
    directory: Arc<dyn Directory>,
    prefix: String,
    /// The bot's own user id; it may never be made a modlist author.
    client_id: String,
}

impl CommandHandler {
    pub fn new(
        herald: Arc<Herald>,
        directory: Arc<dyn Directory>,
        prefix: String,
        client_id: String,
    ) -> Self {
        Self {
            herald,
            directory,
            prefix,
            client_id,
        }
    }

    pub fn herald(&self) -> &Herald {
        &self.herald
    }

    /// Handle one event. Returns the replies to post in the event's channel;
    /// empty when the content is not a command.
    pub async fn handle(&self, event: &CommandEvent) -> Vec<String> {
        let command = match parser::parse(&self.prefix, &event.content) {
            None => return Vec::new(),
            Some(Ok(command)) => command,
            Some(Err(usage)) => {
                let err = HeraldError::InvalidArgument(usage.usage(&self.prefix));
                return vec![error_reply(&err)];
            }
        };

        debug!(
            server_id = %event.server_id,
            author_id = %event.author_id,
            ?command,
            "dispatching command"
        );

        match self.dispatch(event, command).await {
            Ok(replies) => replies,
            Err(e) => {
                warn!(
                    server_id = %event.server_id,
                    author_id = %event.author_id,
                    error = %e,
                    "command failed"
                );
                vec![error_reply(&e)]
            }
        }
    }

    async fn dispatch(&self, event: &CommandEvent, command: Command) -> HeraldResult<Vec<String>> {
        let herald = self.herald.as_ref();

        let reply = match command {
            Command::Help => help_text(&self.prefix),

            Command::Listen {
                modlist_id,
                channel,
            } => {
                manage_roles_only(herald, event)?;
                herald.modlist(&modlist_id)?;
                let channel = self.resolve_channel(event, &channel).await?;
                let modlist = herald
                    .listen(&event.server_id, &event.server_name, &channel.id, &modlist_id)
                    .await?;
                format!(
                    "Now listening to **{}** in {}.",
                    modlist.display_title(),
                    channel.name
                )
            }

            Command::Unlisten {
                modlist_id,
                channel,
            } => {
                let channel = self.resolve_channel(event, &channel).await?;
                let (modlist, outcome) = herald
                    .unlisten(&event.server_id, &channel.id, &modlist_id)
                    .await?;
                match outcome {
                    Unlisten::Removed => format!(
                        "No longer listening to {} in {}.",
                        modlist.display_title(),
                        channel.name
                    ),
                    Unlisten::NotListening => {
                        return Err(HeraldError::not_found(format!(
                            "{} wasn't listening to {}!",
                            modlist.display_title(),
                            channel.name
                        )));
                    }
                }
            }

            Command::ShowListeners { modlist_id } => {
                admins_only(herald, event)?;
                let (modlist, servers) = herald.listeners(&modlist_id)?;
                let lines: Vec<String> = servers
                    .iter()
                    .map(|server| {
                        let channels: Vec<String> = server
                            .listening_channels(&modlist_id)
                            .map(|c| format!("`{}`", c.id))
                            .collect();
                        format!(
                            "Server {} (`{}`) is listening to {} in the following channels: {}",
                            server.name,
                            server.id,
                            modlist.display_title(),
                            channels.join(", ")
                        )
                    })
                    .collect();
                return Ok(split_message(&lines.join("\n"), MAX_MESSAGE_LENGTH));
            }

            Command::Release { modlist_id, body } => {
                validate_release_body(&body).map_err(HeraldError::InvalidArgument)?;
                let caller = herald.caller(&event.author_id, &event.author_name);
                let outcome = herald.release(&modlist_id, &caller, &body).await?;
                format!("Modlist was released in {} channels!", outcome.channel_count)
            }

            Command::Revise { modlist_id, body } => {
                validate_release_body(&body).map_err(HeraldError::InvalidArgument)?;
                let caller = herald.caller(&event.author_id, &event.author_name);
                let (modlist, revised) = herald.revise(&modlist_id, &caller, &body).await?;
                format!(
                    "Succesfully revised {revised} release messages for {}!",
                    modlist.display_title()
                )
            }

            Command::AddModlist { modlist_id, user } => {
                admins_only(herald, event)?;
                validate_modlist_id(&modlist_id).map_err(HeraldError::InvalidArgument)?;
                let member = self.resolve_member(event, &user).await?;
                if member.id == self.client_id {
                    return Err(HeraldError::InvalidArgument(
                        "I can't manage a modlist myself".into(),
                    ));
                }
                let modlist = herald.add_modlist(&modlist_id, &member.id).await?;
                format!(
                    "Modlist **{}** managed by **{}** was added to the database.",
                    modlist.display_title(),
                    member.name
                )
            }

            Command::DelModlist { modlist_id } => {
                admins_only(herald, event)?;
                let modlist = herald.delete_modlist(&modlist_id).await?;
                format!("Modlist `{}` was deleted.", modlist.display_title())
            }

            Command::SetRole { modlist_id, role } => {
                manage_roles_only(herald, event)?;
                let role = self.resolve_role(event, &role).await?;
                let modlist = herald
                    .set_role(&event.server_id, &modlist_id, &role.id)
                    .await?;
                format!(
                    "Releases for {} will now ping the {} role!",
                    modlist.display_title(),
                    role.name
                )
            }

            Command::ShowModlists => {
                manage_roles_only(herald, event)?;
                let modlists = herald.list_modlists();
                if modlists.is_empty() {
                    return Ok(vec!["There are no modlists yet.".to_string()]);
                }
                let lines: Vec<String> = modlists
                    .iter()
                    .map(|m| {
                        format!(
                            "`{}`: **{}** {} (managed by `{}`)",
                            m.id,
                            m.display_title(),
                            m.version,
                            m.author_id
                        )
                    })
                    .collect();
                return Ok(split_message(&lines.join("\n"), MAX_MESSAGE_LENGTH));
            }

            Command::AutoListen { channel, enabled } => {
                manage_roles_only(herald, event)?;
                let channel = self.resolve_channel(event, &channel).await?;
                herald
                    .set_auto_listen(&event.server_id, &event.server_name, &channel.id, enabled)
                    .await?;
                if enabled {
                    format!("{} will now listen to every new modlist.", channel.name)
                } else {
                    format!(
                        "{} will no longer listen to new modlists automatically.",
                        channel.name
                    )
                }
            }
        };

        Ok(vec![reply])
    }

    // ── Mention resolution ──────────────────────────────────────────

    async fn resolve_channel(&self, event: &CommandEvent, raw: &str) -> HeraldResult<Named> {
        let id = parse_channel(raw)
            .ok_or_else(|| HeraldError::InvalidArgument("Invalid channel provided".into()))?;
        self.directory
            .channel(&event.server_id, id)
            .await?
            .ok_or_else(|| HeraldError::not_found("Channel does not exist in server"))
    }

    async fn resolve_member(&self, event: &CommandEvent, raw: &str) -> HeraldResult<Named> {
        let not_found = || HeraldError::not_found("User does not exist in server");
        let id = parse_user(raw).ok_or_else(not_found)?;
        self.directory
            .member(&event.server_id, id)
            .await?
            .ok_or_else(not_found)
    }

    async fn resolve_role(&self, event: &CommandEvent, raw: &str) -> HeraldResult<Named> {
        let not_found = || HeraldError::not_found("Role does not exist in server");
        let id = parse_role(raw).ok_or_else(not_found)?;
        self.directory
            .role(&event.server_id, id)
            .await?
            .ok_or_else(not_found)
    }
}
