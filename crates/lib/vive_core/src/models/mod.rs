//! Domain models.

pub mod auth;
pub mod social;
