//! Blog API access: error taxonomy, authenticated request pipeline, wire types
//! and the typed client.

pub mod client;
pub mod error;
pub mod pipeline;
pub mod types;

pub use client::BlogClient;
pub use error::{ApiError, ApiErrorKind, ApiResult};
pub use pipeline::RequestPipeline;
pub use types::*;
