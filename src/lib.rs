//! taskhub - role-aware task assignment library
//!
//! Core pieces: a task store with progress-driven status transitions, an
//! identity resolver that attributes free-text assignees to principals, and
//! an access policy gating mutations by role.

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod lock;
pub mod notify;
pub mod output;
pub mod policy;
pub mod principal;
pub mod resolver;
pub mod storage;
pub mod store;
pub mod task;

pub use error::{Error, Result};
