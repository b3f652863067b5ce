pub mod directory;
pub mod event;
pub mod handler;
pub mod mentions;
pub mod parser;
pub mod permissions;

pub use directory::{Directory, DirectoryError, Named};
pub use event::CommandEvent;
pub use handler::CommandHandler;
