//! Error types for conduit.

use std::io;

/// Errors produced by the conduit session runtime.
#[derive(Debug, thiserror::Error)]
pub enum ConduitError {
    /// A source URL without the `prefix:` separator.
    #[error("malformed source URL (expected prefix:path): {0}")]
    MalformedSourceUrl(String),

    /// Input that could not be tokenized (e.g. an unterminated quote).
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("invalid arguments for '{command}': {reason}")]
    InvalidArguments { command: String, reason: String },

    /// A host command could not be started or exited abnormally.
    #[error("passthrough failed: {0}")]
    Passthrough(String),

    /// Every candidate decoder rejected the payload. `reason` is the last
    /// candidate's failure.
    #[error("decode failed for '{topic}': {reason}")]
    Decode { topic: String, reason: String },

    #[error("teardown of module '{module}' failed: {reason}")]
    ModuleTeardown { module: String, reason: String },

    #[error("query error: {0}")]
    Query(String),

    #[error("module error: {0}")]
    Module(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ConduitError>;
