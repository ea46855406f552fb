//! Command implementations
//!
//! Each command module provides a clap-derived struct and execute method.

pub mod add;
pub mod build;
pub mod clean;
pub mod init;
pub mod new;
pub mod remove;
pub mod run;
pub mod vendor;
pub mod version;
