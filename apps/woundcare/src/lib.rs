//! # woundcare
//!
//! Application layer around `woundcare-core`: the axum HTTP API, the
//! clap CLI and the TOML configuration. Exposed as a library so the
//! integration tests can build routers and commands directly.

pub mod api;
pub mod cli;
pub mod config;
