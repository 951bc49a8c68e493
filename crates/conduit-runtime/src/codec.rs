//! Built-in codecs and decoder-reference resolution.

use std::sync::Arc;

use conduit_types::error::{ConduitError, Result};

use crate::decoder::MessageDecoder;

/// Resolves a decoder reference (a named codec, a schema-registry entry,
/// ...) that is not in the session's decoder registry.
pub trait CodecResolver: Send + Sync {
    fn resolve(&self, reference: &str) -> Option<Arc<dyn MessageDecoder>>;
}

fn decode_error(topic: &str, reason: impl Into<String>) -> ConduitError {
    ConduitError::Decode {
        topic: topic.to_string(),
        reason: reason.into(),
    }
}

/// Parses the payload as a JSON document.
pub struct JsonDecoder;

impl MessageDecoder for JsonDecoder {
    fn name(&self) -> &str {
        "json"
    }

    fn decode(&self, topic: &str, payload: &[u8]) -> Result<serde_json::Value> {
        serde_json::from_slice(payload)
            .map_err(|e| decode_error(topic, format!("invalid JSON: {e}")))
    }
}

/// Interprets the payload as UTF-8 text.
pub struct Utf8Decoder;

impl MessageDecoder for Utf8Decoder {
    fn name(&self) -> &str {
        "utf8"
    }

    fn decode(&self, topic: &str, payload: &[u8]) -> Result<serde_json::Value> {
        std::str::from_utf8(payload)
            .map(|s| serde_json::Value::String(s.to_string()))
            .map_err(|e| decode_error(topic, format!("invalid UTF-8: {e}")))
    }
}

/// Renders any payload as lowercase hex. Never fails.
pub struct HexDecoder;

impl MessageDecoder for HexDecoder {
    fn name(&self) -> &str {
        "hex"
    }

    fn decode(&self, _topic: &str, payload: &[u8]) -> Result<serde_json::Value> {
        let mut out = String::with_capacity(payload.len() * 2);
        for b in payload {
            out.push_str(&format!("{b:02x}"));
        }
        Ok(serde_json::Value::String(out))
    }
}

/// Names accepted by [`builtin_codec`].
pub const BUILTIN_CODECS: &[&str] = &["json", "utf8", "hex"];

/// Look up a built-in codec by name.
pub fn builtin_codec(name: &str) -> Option<Arc<dyn MessageDecoder>> {
    match name {
        "json" => Some(Arc::new(JsonDecoder)),
        "utf8" | "string" => Some(Arc::new(Utf8Decoder)),
        "hex" => Some(Arc::new(HexDecoder)),
        _ => None,
    }
}

/// Resolves `codec:<name>` (or a bare built-in name) to a built-in codec.
///
/// Anything else, such as a schema-registry URL, resolves to nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinCodecs;

impl CodecResolver for BuiltinCodecs {
    fn resolve(&self, reference: &str) -> Option<Arc<dyn MessageDecoder>> {
        let name = reference.strip_prefix("codec:").unwrap_or(reference);
        builtin_codec(name)
    }
}
