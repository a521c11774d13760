//! Web-related modules for HTTP handlers and types

pub mod errors;
pub mod gist;
pub mod handlers;
pub mod types;

pub use handlers::*;
