//! Business logic sitting between handlers and `vive_core`.

pub mod auth;
