//! Session runtime for the conduit shell.
//!
//! A [`RuntimeSession`] owns the registered backend modules, routes source
//! URLs to them, resolves message decoders, and interprets input lines.
//! Modules implement [`Module`] and contribute [`Command`]s; everything
//! else (query grammar, wire protocols, rendering) sits behind traits.

pub mod args;
pub mod codec;
pub mod decoder;
mod interpreter;
pub mod manager;
pub mod module;
mod passthrough;
pub mod settings;
mod session;
pub mod source;

/// Unix-style argument parsing and validation.
pub use args::{FlagSpec, ParamSpec, ParsedArgs};
/// Decoder-reference resolution and the built-in codecs.
pub use codec::{BuiltinCodecs, CodecResolver};
/// Decoders and the concurrent decoder registry.
pub use decoder::{CompositeDecoder, DecoderRegistry, MessageDecoder};
/// How an input line is classified before dispatch.
pub use interpreter::{LineKind, classify};
/// Module registry and aggregated command set.
pub use manager::ModuleManager;
/// The module contract.
pub use module::{Command, InputSource, Module, OutputSource, Record};
/// Run a host command and capture its stdout.
pub use passthrough::run_host_command;
/// The session facade and the `select` collaborator.
pub use session::{QueryEngine, RuntimeSession};
/// Configuration consumed by a session.
pub use settings::{DecoderBinding, DecoderSource, SessionSettings};
/// Source URL helpers.
pub use source::{split_source_url, with_default_prefix};
