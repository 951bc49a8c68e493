//! Foundation types for conduit.
//!
//! This crate holds the pieces shared by the runtime and the shell binary:
//! the error taxonomy, the tagged command output value, and the TOML shell
//! configuration.

pub mod config;
pub mod error;
pub mod output;
