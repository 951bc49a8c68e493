//! Message decoders, composite decoders, and the thread-safe decoder
//! registry.
//!
//! [`DecoderRegistry`] stores decoders behind `RwLock<HashMap<..>>` so
//! background consumers can register and resolve from any thread.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Once, RwLock};

use conduit_types::error::{ConduitError, Result};

/// Turns a raw payload read from `topic` into a structured value.
pub trait MessageDecoder: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn decode(&self, topic: &str, payload: &[u8]) -> Result<serde_json::Value>;
}

impl fmt::Debug for dyn MessageDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageDecoder({})", self.name())
    }
}

/// An ordered chain of decoders tried until one succeeds.
///
/// When every candidate fails, the error carries the reason reported by
/// the last candidate.
pub struct CompositeDecoder {
    name: String,
    candidates: Vec<Arc<dyn MessageDecoder>>,
}

impl CompositeDecoder {
    pub fn new(name: &str, candidates: Vec<Arc<dyn MessageDecoder>>) -> Self {
        Self {
            name: name.to_string(),
            candidates,
        }
    }

    pub fn candidates(&self) -> &[Arc<dyn MessageDecoder>] {
        &self.candidates
    }
}

impl MessageDecoder for CompositeDecoder {
    fn name(&self) -> &str {
        &self.name
    }

    fn decode(&self, topic: &str, payload: &[u8]) -> Result<serde_json::Value> {
        let mut last_reason = String::from("no candidate decoders");
        for candidate in &self.candidates {
            match candidate.decode(topic, payload) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    log::debug!("decoder '{}' rejected '{topic}': {e}", candidate.name());
                    last_reason = match e {
                        ConduitError::Decode { reason, .. } => reason,
                        other => other.to_string(),
                    };
                },
            }
        }
        Err(ConduitError::Decode {
            topic: topic.to_string(),
            reason: last_reason,
        })
    }
}

/// A thread-safe mapping from topic or name to decoder.
///
/// Writes replace any existing entry under the same key. The registry also
/// owns the one-shot bootstrap latch used to populate it from configuration.
pub struct DecoderRegistry {
    decoders: RwLock<HashMap<String, Arc<dyn MessageDecoder>>>,
    bootstrap: Once,
}

impl DecoderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            decoders: RwLock::new(HashMap::new()),
            bootstrap: Once::new(),
        }
    }

    /// Register a decoder. Replaces any existing decoder with the same name.
    pub fn register(&self, name: &str, decoder: Arc<dyn MessageDecoder>) {
        let mut map = self.decoders.write().unwrap_or_else(|e| e.into_inner());
        if map.insert(name.to_string(), decoder).is_some() {
            log::debug!("decoder '{name}' replaced");
        }
    }

    /// Look up a decoder by exact name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn MessageDecoder>> {
        let map = self.decoders.read().unwrap_or_else(|e| e.into_inner());
        map.get(name).map(Arc::clone)
    }

    /// Registered names, sorted for deterministic output.
    pub fn names(&self) -> Vec<String> {
        let map = self.decoders.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = map.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.decoders.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `populate` exactly once for the lifetime of this registry.
    ///
    /// Concurrent callers block until the first caller's `populate` has
    /// finished, so every caller observes the populated registry.
    pub fn bootstrap_once(&self, populate: impl FnOnce(&Self)) {
        self.bootstrap.call_once(|| populate(self));
    }

    /// Whether [`DecoderRegistry::bootstrap_once`] has completed.
    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrap.is_completed()
    }

    /// Group `(topic, decoder)` pairs by topic in first-seen order and
    /// register one composite per topic.
    pub fn register_composites(
        &self,
        bindings: impl IntoIterator<Item = (String, Arc<dyn MessageDecoder>)>,
    ) -> usize {
        let mut order: Vec<String> = Vec::new();
        let mut grouped: HashMap<String, Vec<Arc<dyn MessageDecoder>>> = HashMap::new();
        for (topic, decoder) in bindings {
            let entry = grouped.entry(topic.clone()).or_default();
            if entry.is_empty() {
                order.push(topic);
            }
            entry.push(decoder);
        }

        let count = order.len();
        for topic in order {
            if let Some(candidates) = grouped.remove(&topic) {
                log::debug!(
                    "composite decoder for '{topic}' with {} candidate(s)",
                    candidates.len()
                );
                let composite = CompositeDecoder::new(&topic, candidates);
                self.register(&topic, Arc::new(composite));
            }
        }
        count
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Accepts payloads that start with `prefix`, rejecting everything else.
    struct PrefixDecoder {
        name: String,
        prefix: &'static [u8],
    }

    impl PrefixDecoder {
        fn arc(name: &str, prefix: &'static [u8]) -> Arc<dyn MessageDecoder> {
            Arc::new(Self {
                name: name.to_string(),
                prefix,
            })
        }
    }

    impl MessageDecoder for PrefixDecoder {
        fn name(&self) -> &str {
            &self.name
        }

        fn decode(&self, topic: &str, payload: &[u8]) -> Result<serde_json::Value> {
            if payload.starts_with(self.prefix) {
                Ok(serde_json::json!({ "by": self.name }))
            } else {
                Err(ConduitError::Decode {
                    topic: topic.to_string(),
                    reason: format!("{} rejected", self.name),
                })
            }
        }
    }

    fn abc() -> CompositeDecoder {
        CompositeDecoder::new(
            "t",
            vec![
                PrefixDecoder::arc("A", b"a"),
                PrefixDecoder::arc("B", b"b"),
                PrefixDecoder::arc("C", b"c"),
            ],
        )
    }

    #[test]
    fn composite_returns_first_success() {
        let value = abc().decode("t", b"b-payload").unwrap();
        assert_eq!(value["by"], "B");
    }

    #[test]
    fn composite_prefers_declared_order() {
        let composite = CompositeDecoder::new(
            "t",
            vec![PrefixDecoder::arc("first", b""), PrefixDecoder::arc("second", b"")],
        );
        assert_eq!(composite.decode("t", b"x").unwrap()["by"], "first");
    }

    #[test]
    fn composite_all_fail_reports_last_reason() {
        let err = abc().decode("t", b"zzz").unwrap_err();
        match err {
            ConduitError::Decode { topic, reason } => {
                assert_eq!(topic, "t");
                assert_eq!(reason, "C rejected");
            },
            other => panic!("expected Decode, got {other:?}"),
        }
    }

    #[test]
    fn empty_composite_fails() {
        let composite = CompositeDecoder::new("t", Vec::new());
        let err = composite.decode("t", b"x").unwrap_err();
        assert!(err.to_string().contains("no candidate decoders"));
    }

    #[test]
    fn registry_last_write_wins() {
        let reg = DecoderRegistry::new();
        reg.register("orders", PrefixDecoder::arc("old", b""));
        reg.register("orders", PrefixDecoder::arc("new", b""));
        assert_eq!(reg.get("orders").unwrap().name(), "new");
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn registry_get_missing() {
        let reg = DecoderRegistry::new();
        assert!(reg.get("nope").is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn registry_names_sorted() {
        let reg = DecoderRegistry::new();
        reg.register("zeta", PrefixDecoder::arc("z", b""));
        reg.register("alpha", PrefixDecoder::arc("a", b""));
        assert_eq!(reg.names(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn register_composites_groups_by_topic() {
        let reg = DecoderRegistry::new();
        let count = reg.register_composites(vec![
            ("orders".to_string(), PrefixDecoder::arc("A", b"a")),
            ("payments".to_string(), PrefixDecoder::arc("P", b"p")),
            ("orders".to_string(), PrefixDecoder::arc("B", b"b")),
        ]);
        assert_eq!(count, 2);
        let orders = reg.get("orders").unwrap();
        assert_eq!(orders.decode("orders", b"b").unwrap()["by"], "B");
        assert!(orders.decode("orders", b"p").is_err());
    }

    #[test]
    fn bootstrap_runs_once() {
        let reg = DecoderRegistry::new();
        let mut runs = 0;
        reg.bootstrap_once(|_| runs += 1);
        reg.bootstrap_once(|_| runs += 1);
        assert_eq!(runs, 1);
        assert!(reg.is_bootstrapped());
    }

    #[test]
    fn concurrent_registration_loses_no_writes() {
        let reg = DecoderRegistry::new();
        std::thread::scope(|s| {
            for t in 0..8 {
                let reg = &reg;
                s.spawn(move || {
                    for i in 0..50 {
                        reg.register(&format!("t{t}-{i}"), PrefixDecoder::arc("x", b""));
                    }
                });
            }
        });
        assert_eq!(reg.len(), 400);
    }
}
