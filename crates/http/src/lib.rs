//! LinkSphere HTTP client
//!
//! Typed access to the LinkSphere backend and its auth provider, with
//! expired-credential recovery and session persistence.

pub mod client;
pub mod types;

pub use client::{ApiClient, ApiClientBuilder, ClientError, RequestOptions, ResponseBody, ResponseType};
pub use types::{CreatePost, LoginData, LoginRequest, Post};
