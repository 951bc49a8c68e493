//! Configuration consumed by a session.

use std::sync::Arc;

use conduit_types::config::{DEFAULT_MODULE, DecoderTarget, ShellConfig};

use crate::codec::builtin_codec;
use crate::decoder::MessageDecoder;

/// A decoder declared for a topic: either ready to use or a reference the
/// codec resolver must turn into one.
#[derive(Clone)]
pub enum DecoderSource {
    Concrete(Arc<dyn MessageDecoder>),
    Reference(String),
}

/// One configured `(topic, decoder)` pair.
#[derive(Clone)]
pub struct DecoderBinding {
    pub topic: String,
    pub source: DecoderSource,
}

/// Session-level settings.
pub trait SessionSettings: Send + Sync {
    /// Configured decoders, in declaration order.
    fn decoder_bindings(&self) -> Vec<DecoderBinding>;

    /// Whether successful commands switch the active module.
    fn auto_switching(&self) -> bool;

    /// Module active at session start.
    fn default_module(&self) -> &str {
        DEFAULT_MODULE
    }
}

impl SessionSettings for ShellConfig {
    fn decoder_bindings(&self) -> Vec<DecoderBinding> {
        self.decoders
            .iter()
            .filter_map(|decl| {
                let source = match decl.target() {
                    Ok(DecoderTarget::Codec(name)) => match builtin_codec(name) {
                        Some(decoder) => DecoderSource::Concrete(decoder),
                        None => DecoderSource::Reference(name.to_string()),
                    },
                    Ok(DecoderTarget::Reference(reference)) => {
                        DecoderSource::Reference(reference.to_string())
                    },
                    Err(e) => {
                        log::warn!("skipping decoder declaration: {e}");
                        return None;
                    },
                };
                Some(DecoderBinding {
                    topic: decl.topic.clone(),
                    source,
                })
            })
            .collect()
    }

    fn auto_switching(&self) -> bool {
        self.auto_switching
    }

    fn default_module(&self) -> &str {
        &self.default_module
    }
}
