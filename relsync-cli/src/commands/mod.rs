//! Subcommand implementations.

pub mod cleanup;
pub mod common;
pub mod config;
pub mod install;
pub mod list;
pub mod uninstall;
pub mod verify;
