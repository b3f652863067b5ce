use bitflags::bitflags;

use crate::engine::herald::Herald;
use crate::error::{HeraldError, HeraldResult};

use super::event::CommandEvent;

bitflags! {
    /// Platform permission bits of the command author, as delivered with the event.
    /// Bit positions follow the Discord permission layout.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u64 {
        const CREATE_INVITES    = 1 << 0;
        const KICK_MEMBERS      = 1 << 1;
        const BAN_MEMBERS       = 1 << 2;
        const ADMINISTRATOR     = 1 << 3;
        const MANAGE_CHANNELS   = 1 << 4;
        const MANAGE_SERVER     = 1 << 5;
        const SEND_MESSAGES     = 1 << 11;
        const MANAGE_MESSAGES   = 1 << 13;
        const EMBED_LINKS       = 1 << 14;
        const MENTION_EVERYONE  = 1 << 17;
        const MANAGE_ROLES      = 1 << 28;
    }
}

impl Permissions {
    /// Server administrators implicitly hold every permission.
    pub fn can_manage_roles(self) -> bool {
        self.intersects(Self::MANAGE_ROLES | Self::ADMINISTRATOR)
    }
}

pub const ADMINS_ONLY: &str = "This command is reserved for bot administrators";
pub const MANAGE_ROLES_ONLY: &str =
    "This command is reserved for people with the Manage Roles permission";

/// Fail unless the author is a bot administrator.
pub fn admins_only(herald: &Herald, event: &CommandEvent) -> HeraldResult<()> {
    if herald.is_admin(&event.author_id) {
        Ok(())
    } else {
        Err(HeraldError::Unauthorized(ADMINS_ONLY.into()))
    }
}

/// Fail unless the author is a bot administrator or may manage roles in this server.
pub fn manage_roles_only(herald: &Herald, event: &CommandEvent) -> HeraldResult<()> {
    if herald.is_admin(&event.author_id) || event.permissions().can_manage_roles() {
        Ok(())
    } else {
        Err(HeraldError::Unauthorized(MANAGE_ROLES_ONLY.into()))
    }
}
