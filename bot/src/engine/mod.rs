pub mod broadcaster;
pub mod channel;
pub mod herald;
pub mod metadata;
pub mod modlist;
pub mod modlists;
pub mod notification;
pub mod server;
pub mod sink;
pub mod subscriptions;
pub mod validation;
