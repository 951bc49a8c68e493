//! Contract between the session runtime and backend modules.
//!
//! A backend (broker client, document store, search index, ...) implements
//! [`Module`] and exposes its operations as [`Command`]s. The runtime never
//! sees concrete backend types.

use std::sync::Arc;

use conduit_types::error::Result;
use conduit_types::output::CommandOutput;

use crate::args::{ParamSpec, ParsedArgs};

/// A single executable command owned by a module.
pub trait Command: Send + Sync {
    /// The command name (what the user types).
    fn name(&self) -> &str;

    /// One-line description for `help`.
    fn description(&self) -> &str;

    /// Usage string (e.g. "consume --topic <name> \[--limit n\]").
    fn usage(&self) -> &str;

    /// Flags and positional arity accepted by this command.
    fn params(&self) -> ParamSpec {
        ParamSpec::any()
    }

    /// Whether a successful run should make the owning module active even
    /// when that module is `core`.
    fn prompt_aware(&self) -> bool {
        false
    }

    /// Execute with arguments that already passed [`Command::params`].
    fn execute(&self, args: &ParsedArgs) -> Result<CommandOutput>;
}

/// A raw record read from or written to a data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Option<Vec<u8>>,
    pub payload: Vec<u8>,
}

impl Record {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            key: None,
            payload: payload.into(),
        }
    }

    pub fn with_key(key: impl Into<Vec<u8>>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            key: Some(key.into()),
            payload: payload.into(),
        }
    }
}

/// A readable data source created by a module for a source URL.
pub trait InputSource: Send {
    /// The URL this source was opened for.
    fn url(&self) -> &str;

    /// Next record, or `None` once the source is exhausted.
    fn next_record(&mut self) -> Result<Option<Record>>;
}

/// A writable data sink created by a module for a source URL.
pub trait OutputSource: Send {
    fn url(&self) -> &str;

    fn write_record(&mut self, record: &Record) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A pluggable backend adapter.
pub trait Module: Send + Sync {
    /// Unique module name.
    fn name(&self) -> &str;

    /// URL prefix routed to this module (`prefix:path`).
    fn prefix(&self) -> &str;

    /// Commands contributed to the session.
    fn commands(&self) -> Vec<Arc<dyn Command>>;

    /// Open an input source for `url` (the full `prefix:path` string).
    ///
    /// `Ok(None)` means the module does not serve that path.
    fn input_source(&self, _url: &str) -> Result<Option<Box<dyn InputSource>>> {
        Ok(None)
    }

    /// Open an output source for `url`.
    fn output_source(&self, _url: &str) -> Result<Option<Box<dyn OutputSource>>> {
        Ok(None)
    }

    /// Release backend resources. Called once at session shutdown.
    fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}
