//! Server internals, exposed as a library so integration tests can drive
//! the request pipeline against a fixture adapter.

pub mod api;
pub mod compute;
pub mod config;
