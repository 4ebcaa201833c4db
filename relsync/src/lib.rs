//! relsync - release resolution and artifact sync for a game launcher
//!
//! This library keeps a local game directory in step with a remote release
//! catalog: it resolves inheriting release descriptors, downloads verified
//! libraries and content-addressed assets on a bounded worker pool, and
//! reclaims files no installed release needs.
//!
//! # Modules
//!
//! - [`version`] - release descriptors, rules and inheritance resolution
//! - [`download`] - verified transfers, jobs and the worker pool
//! - [`assets`] - the content-addressed asset store
//! - [`catalog`] - local and remote release catalogs
//! - [`updater`] - the [`SyncManager`] tying it all together
//! - [`reclaim`] - cleanup sweeps
//! - [`paths`] - checks on remote names before they touch the disk
//! - [`config`], [`logging`], [`platform`] - ambient setup

pub mod assets;
pub mod catalog;
pub mod config;
pub mod download;
pub mod error;
pub mod logging;
pub mod paths;
pub mod platform;
pub mod reclaim;
pub mod updater;
pub mod version;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use platform::LaunchEnvironment;
pub use updater::{LaunchPlan, SyncManager};
