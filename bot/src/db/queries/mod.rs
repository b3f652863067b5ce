pub mod modlists;
pub mod servers;
