//! CLI command handlers.

pub mod auth;
pub mod comments;
pub mod config;
pub mod device;
pub mod feed;
pub mod likes;
pub mod posts;
pub mod sidebar;
