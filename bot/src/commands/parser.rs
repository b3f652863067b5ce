/// A recognised bot command with its raw arguments.
/// Mentions are resolved later by the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Listen { modlist_id: String, channel: String },
    Unlisten { modlist_id: String, channel: String },
    ShowListeners { modlist_id: String },
    Release { modlist_id: String, body: String },
    Revise { modlist_id: String, body: String },
    AddModlist { modlist_id: String, user: String },
    DelModlist { modlist_id: String },
    SetRole { modlist_id: String, role: String },
    ShowModlists,
    AutoListen { channel: String, enabled: bool },
}

/// Usage line and description of a command, for `help` and argument errors.
pub struct CommandInfo {
    pub verb: &'static str,
    pub args: &'static str,
    pub description: &'static str,
}

pub const COMMANDS: &[CommandInfo] = &[
    CommandInfo {
        verb: "listen",
        args: "<modlist id> <channel>",
        description: "Listen to new releases of a modlist in a channel",
    },
    CommandInfo {
        verb: "unlisten",
        args: "<modlist id> <channel>",
        description: "Stop listening to new releases of a modlist in a channel",
    },
    CommandInfo {
        verb: "showlisteners",
        args: "<modlist id>",
        description: "Show all servers and channels listening to a modlist",
    },
    CommandInfo {
        verb: "release",
        args: "<modlist id> <message>",
        description: "Put out a new release of your list",
    },
    CommandInfo {
        verb: "revise",
        args: "<modlist id> <new message>",
        description: "Edit the last release message of your list",
    },
    CommandInfo {
        verb: "addmodlist",
        args: "<modlist id> <user>",
        description: "Add a new modlist",
    },
    CommandInfo {
        verb: "delmodlist",
        args: "<modlist id>",
        description: "Delete a modlist",
    },
    CommandInfo {
        verb: "setrole",
        args: "<modlist id> <role>",
        description: "Set the role to ping when a modlist releases a new version",
    },
    CommandInfo {
        verb: "showmodlists",
        args: "",
        description: "List all modlists",
    },
    CommandInfo {
        verb: "autolisten",
        args: "<channel> <on|off>",
        description: "Make a channel listen to every modlist added from now on",
    },
    CommandInfo {
        verb: "help",
        args: "",
        description: "Show this message",
    },
];

/// Arguments did not match the command's usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageError {
    pub verb: &'static str,
}

impl UsageError {
    pub fn usage(&self, prefix: &str) -> String {
        let args = COMMANDS
            .iter()
            .find(|c| c.verb == self.verb)
            .map(|c| c.args)
            .unwrap_or_default();
        format!("Usage: {prefix}{} {args}", self.verb).trim_end().to_string()
    }
}

/// Split off the first whitespace-delimited word. The remainder keeps its
/// internal whitespace but loses the leading run.
fn next_word(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => Some((word, rest.trim_start())),
        None => Some((s, "")),
    }
}

/// Parse message content into a command.
///
/// Returns `None` when the content is not addressed to the bot (no prefix,
/// or an unknown verb), so unrelated chatter sharing the prefix is ignored.
pub fn parse(prefix: &str, content: &str) -> Option<Result<Command, UsageError>> {
    let rest = content.strip_prefix(prefix)?;
    // The verb must follow the prefix directly ("! listen" is not a command)
    if rest.starts_with(char::is_whitespace) {
        return None;
    }
    let (verb, rest) = next_word(rest)?;
    let info = COMMANDS.iter().find(|c| c.verb == verb)?;
    let usage = || UsageError { verb: info.verb };

    let first = next_word(rest);
    let two_args = || -> Result<(String, String), UsageError> {
        let (a, rest) = first.ok_or_else(usage)?;
        let (b, _) = next_word(rest).ok_or_else(usage)?;
        Ok((a.to_string(), b.to_string()))
    };
    let id_and_text = || -> Result<(String, String), UsageError> {
        let (id, text) = first.ok_or_else(usage)?;
        if text.is_empty() {
            return Err(usage());
        }
        Ok((id.to_string(), text.to_string()))
    };
    let one_arg = || -> Result<String, UsageError> {
        first.map(|(id, _)| id.to_string()).ok_or_else(usage)
    };

    let command = match info.verb {
        "help" => Ok(Command::Help),
        "showmodlists" => Ok(Command::ShowModlists),
        "listen" => two_args().map(|(modlist_id, channel)| Command::Listen {
            modlist_id,
            channel,
        }),
        "unlisten" => two_args().map(|(modlist_id, channel)| Command::Unlisten {
            modlist_id,
            channel,
        }),
        "showlisteners" => one_arg().map(|modlist_id| Command::ShowListeners { modlist_id }),
        "release" => id_and_text().map(|(modlist_id, body)| Command::Release { modlist_id, body }),
        "revise" => id_and_text().map(|(modlist_id, body)| Command::Revise { modlist_id, body }),
        "addmodlist" => two_args().map(|(modlist_id, user)| Command::AddModlist { modlist_id, user }),
        "delmodlist" => one_arg().map(|modlist_id| Command::DelModlist { modlist_id }),
        "setrole" => two_args().map(|(modlist_id, role)| Command::SetRole { modlist_id, role }),
        "autolisten" => two_args().and_then(|(channel, flag)| {
            let enabled = match flag.to_ascii_lowercase().as_str() {
                "on" | "true" | "yes" => true,
                "off" | "false" | "no" => false,
                _ => return Err(usage()),
            };
            Ok(Command::AutoListen { channel, enabled })
        }),
        _ => return None,
    };
    Some(command)
}

/// The `help` reply.
pub fn help_text(prefix: &str) -> String {
    let mut text = String::from("**WabbaBot commands**\n");
    for c in COMMANDS {
        let usage = format!("{prefix}{} {}", c.verb, c.args);
        text.push_str(&format!("`{}` - {}\n", usage.trim_end(), c.description));
    }
    text.trim_end().to_string()
}
