// ABOUTME: Library root for hotpatch - exposes the build engine, live-update model and adapters.
// ABOUTME: The main binary is in main.rs.

pub mod build;
pub mod config;
pub mod error;
pub mod liveupdate;
pub mod output;
pub mod runtime;
pub mod types;
