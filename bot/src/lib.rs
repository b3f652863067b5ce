pub mod commands;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod platform;
pub mod web;

#[cfg(test)]
mod integration_tests;
#[cfg(test)]
pub(crate) mod testing;
