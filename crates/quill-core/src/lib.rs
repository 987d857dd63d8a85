//! Core quill library (session state, request pipeline, feed, likes, config).

pub mod api;
pub mod config;
pub mod feed;
pub mod likes;
pub mod logging;
pub mod session;
pub mod storage;
