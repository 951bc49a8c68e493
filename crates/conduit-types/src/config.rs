//! Shell configuration loaded from TOML.
//!
//! ```toml
//! auto_switching = true
//!
//! [[decoder]]
//! topic = "orders"
//! codec = "json"
//!
//! [[decoder]]
//! topic = "orders"
//! reference = "codec:utf8"
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{ConduitError, Result};

/// Name of the module that is active when a session starts.
pub const DEFAULT_MODULE: &str = "core";

/// Top-level shell configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ShellConfig {
    /// Switch the active module after a successful command from another module.
    #[serde(default)]
    pub auto_switching: bool,
    /// Module that starts out active.
    #[serde(default = "default_module")]
    pub default_module: String,
    /// Per-topic decoder declarations, in declaration order.
    #[serde(default, rename = "decoder")]
    pub decoders: Vec<DecoderDecl>,
}

/// One `[[decoder]]` entry.
///
/// Exactly one of `codec` and `reference` must be set.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DecoderDecl {
    pub topic: String,
    /// Name of a built-in codec (e.g. `json`, `utf8`, `hex`).
    #[serde(default)]
    pub codec: Option<String>,
    /// Decoder reference URL handed to the codec resolver.
    #[serde(default)]
    pub reference: Option<String>,
}

/// What a decoder declaration points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderTarget<'a> {
    Codec(&'a str),
    Reference(&'a str),
}

impl DecoderDecl {
    /// The declared codec or reference.
    pub fn target(&self) -> Result<DecoderTarget<'_>> {
        match (self.codec.as_deref(), self.reference.as_deref()) {
            (Some(codec), None) => Ok(DecoderTarget::Codec(codec)),
            (None, Some(reference)) => Ok(DecoderTarget::Reference(reference)),
            (Some(_), Some(_)) => Err(ConduitError::Config(format!(
                "decoder for topic '{}' sets both codec and reference",
                self.topic
            ))),
            (None, None) => Err(ConduitError::Config(format!(
                "decoder for topic '{}' needs a codec or a reference",
                self.topic
            ))),
        }
    }
}

fn default_module() -> String {
    DEFAULT_MODULE.to_string()
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            auto_switching: false,
            default_module: default_module(),
            decoders: Vec::new(),
        }
    }
}

impl ShellConfig {
    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = parse_config(&text)?;
        log::info!(
            "Loaded config {} ({} decoder declarations)",
            path.display(),
            config.decoders.len()
        );
        Ok(config)
    }
}

/// Parse shell configuration from TOML text.
pub fn parse_config(toml_str: &str) -> Result<ShellConfig> {
    let config: ShellConfig = toml::from_str(toml_str)?;
    for decl in &config.decoders {
        if decl.topic.is_empty() {
            return Err(ConduitError::Config(
                "decoder declaration with empty topic".to_string(),
            ));
        }
        decl.target()?;
    }
    Ok(config)
}
