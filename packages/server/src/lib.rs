//! Cost-management backend server core.
//!
//! Wires the database, the HTTP application, the scheduled extraction
//! sweep, and the provider connectivity checks around the `metering`
//! pipeline library.

pub mod config;
pub mod kernel;
pub mod server;

pub use config::Config;
