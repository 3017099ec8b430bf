pub mod auth;
pub mod cleanup;
pub mod config;
pub mod sync;
