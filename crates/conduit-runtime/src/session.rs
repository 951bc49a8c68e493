//! The runtime session: one object tying modules, decoders, the query
//! engine and the interpreter together for the lifetime of a shell.

use std::sync::Arc;

use conduit_types::error::{ConduitError, Result};
use conduit_types::output::CommandOutput;

use crate::codec::{BuiltinCodecs, CodecResolver};
use crate::decoder::{DecoderRegistry, MessageDecoder};
use crate::interpreter;
use crate::manager::ModuleManager;
use crate::module::{InputSource, Module, OutputSource};
use crate::settings::{DecoderSource, SessionSettings};
use crate::source::split_source_url;

/// Executes `select ...` statements.
pub trait QueryEngine: Send + Sync {
    /// Run the full trimmed statement, keyword included.
    fn execute(&self, statement: &str, session: &RuntimeSession) -> Result<CommandOutput>;
}

/// Session state shared by every command in a shell.
pub struct RuntimeSession {
    settings: Arc<dyn SessionSettings>,
    modules: ModuleManager,
    decoders: DecoderRegistry,
    codecs: Arc<dyn CodecResolver>,
    query: Option<Arc<dyn QueryEngine>>,
}

impl RuntimeSession {
    /// Create a session with no modules, the built-in codec resolver and no
    /// query engine.
    pub fn new(settings: Arc<dyn SessionSettings>) -> Self {
        let modules = ModuleManager::new(settings.default_module());
        Self {
            settings,
            modules,
            decoders: DecoderRegistry::new(),
            codecs: Arc::new(BuiltinCodecs),
            query: None,
        }
    }

    pub fn with_codec_resolver(mut self, codecs: Arc<dyn CodecResolver>) -> Self {
        self.codecs = codecs;
        self
    }

    pub fn with_query_engine(mut self, engine: Arc<dyn QueryEngine>) -> Self {
        self.query = Some(engine);
        self
    }

    pub fn settings(&self) -> &dyn SessionSettings {
        self.settings.as_ref()
    }

    pub(crate) fn query_engine(&self) -> Option<&Arc<dyn QueryEngine>> {
        self.query.as_ref()
    }

    // -- Modules --

    pub fn register_modules(&self, modules: impl IntoIterator<Item = Arc<dyn Module>>) {
        self.modules.register(modules);
    }

    pub fn modules(&self) -> &ModuleManager {
        &self.modules
    }

    pub fn active_module(&self) -> Option<Arc<dyn Module>> {
        self.modules.active_module()
    }

    pub fn set_active_module(&self, module: Arc<dyn Module>) {
        self.modules.set_active_module(module);
    }

    /// Prompt text for the active module, e.g. `"kafka> "`.
    pub fn prompt(&self) -> String {
        match self.active_module() {
            Some(module) => format!("{}> ", module.name()),
            None => "> ".to_string(),
        }
    }

    // -- Decoders --

    /// Decoder for a topic name or decoder-reference URL.
    ///
    /// The first call populates the registry from configuration. Registry
    /// misses fall back to the codec resolver.
    pub fn resolve_decoder(&self, topic_or_url: &str) -> Option<Arc<dyn MessageDecoder>> {
        self.decoders.bootstrap_once(|registry| self.bootstrap(registry));
        self.decoders
            .get(topic_or_url)
            .or_else(|| self.codecs.resolve(topic_or_url))
    }

    /// Register (or replace) a decoder under `name`.
    pub fn register_decoder(&self, name: &str, decoder: Arc<dyn MessageDecoder>) {
        self.decoders.register(name, decoder);
    }

    /// Registry lookup only: no bootstrap, no resolver fallback.
    pub fn lookup_decoder(&self, name: &str) -> Option<Arc<dyn MessageDecoder>> {
        self.decoders.get(name)
    }

    fn bootstrap(&self, registry: &DecoderRegistry) {
        let bindings = self.settings.decoder_bindings();
        log::debug!("bootstrapping decoders from {} binding(s)", bindings.len());
        let resolved = bindings.into_iter().filter_map(|binding| {
            let decoder = match binding.source {
                DecoderSource::Concrete(decoder) => decoder,
                DecoderSource::Reference(reference) => match self.codecs.resolve(&reference) {
                    Some(decoder) => decoder,
                    None => {
                        log::warn!(
                            "decoder reference '{reference}' for topic '{}' did not resolve",
                            binding.topic
                        );
                        return None;
                    },
                },
            };
            Some((binding.topic, decoder))
        });
        let topics = registry.register_composites(resolved);
        log::info!("Registered composite decoders for {topics} topic(s)");
    }

    // -- Sources --

    /// Open an input source for `prefix:path` via the module owning `prefix`.
    pub fn input_handler(&self, url: &str) -> Result<Option<Box<dyn InputSource>>> {
        match self.module_for_url(url)? {
            Some(module) => module.input_source(url),
            None => Ok(None),
        }
    }

    /// Open an output source for `prefix:path` via the module owning `prefix`.
    pub fn output_handler(&self, url: &str) -> Result<Option<Box<dyn OutputSource>>> {
        match self.module_for_url(url)? {
            Some(module) => module.output_source(url),
            None => Ok(None),
        }
    }

    fn module_for_url(&self, url: &str) -> Result<Option<Arc<dyn Module>>> {
        let (prefix, _) = split_source_url(url)?;
        let module = self.modules.find_by_prefix(prefix);
        if module.is_none() {
            log::debug!("no module serves prefix '{prefix}'");
        }
        Ok(module)
    }

    // -- Commands --

    /// Interpret one line of user input.
    pub fn interpret(&self, input: &str) -> Result<CommandOutput> {
        interpreter::interpret(self, input)
    }

    /// Tear down all modules; see [`ModuleManager::shutdown`].
    pub fn shutdown(&self) -> Vec<ConduitError> {
        self.modules.shutdown()
    }
}

impl Drop for RuntimeSession {
    fn drop(&mut self) {
        for failure in self.shutdown() {
            log::error!("{failure}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;
    use crate::codec::{JsonDecoder, Utf8Decoder};
    use crate::module::{Command, Record};
    use crate::settings::DecoderBinding;

    /// Settings that count how often decoder bindings are read.
    struct CountingSettings {
        reads: AtomicUsize,
        bindings: Vec<DecoderBinding>,
    }

    impl CountingSettings {
        fn new(bindings: Vec<DecoderBinding>) -> Self {
            Self {
                reads: AtomicUsize::new(0),
                bindings,
            }
        }
    }

    impl SessionSettings for CountingSettings {
        fn decoder_bindings(&self) -> Vec<DecoderBinding> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.bindings.clone()
        }
        fn auto_switching(&self) -> bool {
            false
        }
    }

    fn concrete(topic: &str, decoder: Arc<dyn MessageDecoder>) -> DecoderBinding {
        DecoderBinding {
            topic: topic.to_string(),
            source: DecoderSource::Concrete(decoder),
        }
    }

    fn reference(topic: &str, reference: &str) -> DecoderBinding {
        DecoderBinding {
            topic: topic.to_string(),
            source: DecoderSource::Reference(reference.to_string()),
        }
    }

    struct VecInput {
        url: String,
        records: Vec<Record>,
    }

    impl InputSource for VecInput {
        fn url(&self) -> &str {
            &self.url
        }
        fn next_record(&mut self) -> Result<Option<Record>> {
            Ok(self.records.pop())
        }
    }

    struct SharedOutput {
        url: String,
        written: Arc<Mutex<Vec<Record>>>,
    }

    impl OutputSource for SharedOutput {
        fn url(&self) -> &str {
            &self.url
        }
        fn write_record(&mut self, record: &Record) -> Result<()> {
            self.written.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    /// Serves every path except `missing`; remembers requested URLs.
    struct SourceModule {
        prefix: &'static str,
        requested: Mutex<Vec<String>>,
        written: Arc<Mutex<Vec<Record>>>,
        teardowns: AtomicUsize,
    }

    impl SourceModule {
        fn new(prefix: &'static str) -> Self {
            Self {
                prefix,
                requested: Mutex::new(Vec::new()),
                written: Arc::new(Mutex::new(Vec::new())),
                teardowns: AtomicUsize::new(0),
            }
        }
    }

    impl Module for SourceModule {
        fn name(&self) -> &str {
            self.prefix
        }
        fn prefix(&self) -> &str {
            self.prefix
        }
        fn commands(&self) -> Vec<Arc<dyn Command>> {
            Vec::new()
        }
        fn input_source(&self, url: &str) -> Result<Option<Box<dyn InputSource>>> {
            self.requested.lock().unwrap().push(url.to_string());
            if url.ends_with(":missing") {
                return Ok(None);
            }
            Ok(Some(Box::new(VecInput {
                url: url.to_string(),
                records: vec![Record::new("r1")],
            })))
        }
        fn output_source(&self, url: &str) -> Result<Option<Box<dyn OutputSource>>> {
            Ok(Some(Box::new(SharedOutput {
                url: url.to_string(),
                written: Arc::clone(&self.written),
            })))
        }
        fn shutdown(&self) -> Result<()> {
            self.teardowns.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn session_with(prefixes: &[&'static str]) -> (RuntimeSession, Vec<Arc<SourceModule>>) {
        let session = RuntimeSession::new(Arc::new(CountingSettings::new(Vec::new())));
        let modules: Vec<Arc<SourceModule>> = prefixes
            .iter()
            .map(|p| Arc::new(SourceModule::new(p)))
            .collect();
        session.register_modules(
            modules
                .iter()
                .map(|m| Arc::clone(m) as Arc<dyn Module>)
                .collect::<Vec<_>>(),
        );
        (session, modules)
    }

    // -- Decoders --

    #[test]
    fn concurrent_first_resolution_bootstraps_once() {
        let settings = Arc::new(CountingSettings::new(vec![concrete(
            "orders",
            Arc::new(JsonDecoder),
        )]));
        let session = RuntimeSession::new(Arc::clone(&settings) as Arc<dyn SessionSettings>);

        thread::scope(|scope| {
            for _ in 0..16 {
                scope.spawn(|| {
                    assert!(session.resolve_decoder("orders").is_some());
                });
            }
        });

        assert_eq!(settings.reads.load(Ordering::SeqCst), 1);
        session.resolve_decoder("orders");
        assert_eq!(settings.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn configured_bindings_form_composite() {
        let session = RuntimeSession::new(Arc::new(CountingSettings::new(vec![
            concrete("orders", Arc::new(JsonDecoder)),
            reference("orders", "codec:utf8"),
            concrete("events", Arc::new(JsonDecoder)),
        ])));

        let orders = session.resolve_decoder("orders").unwrap();
        assert_eq!(
            orders.decode("orders", br#"{"id":1}"#).unwrap(),
            serde_json::json!({"id": 1})
        );
        // Falls through to the utf8 candidate.
        assert_eq!(
            orders.decode("orders", b"plain text").unwrap(),
            serde_json::json!("plain text")
        );

        let events = session.lookup_decoder("events").unwrap();
        let err = events.decode("events", b"not json").unwrap_err();
        assert!(matches!(err, ConduitError::Decode { .. }));
    }

    #[test]
    fn unresolvable_reference_is_skipped() {
        let session = RuntimeSession::new(Arc::new(CountingSettings::new(vec![
            reference("orders", "schema-registry:orders-value"),
            concrete("orders", Arc::new(Utf8Decoder)),
        ])));
        let decoder = session.resolve_decoder("orders").unwrap();
        assert_eq!(
            decoder.decode("orders", b"x").unwrap(),
            serde_json::json!("x")
        );
    }

    #[test]
    fn registry_miss_falls_back_to_resolver() {
        let session = RuntimeSession::new(Arc::new(CountingSettings::new(Vec::new())));
        assert_eq!(session.resolve_decoder("codec:hex").unwrap().name(), "hex");
        assert!(session.resolve_decoder("no-such-topic").is_none());
    }

    #[test]
    fn lookup_does_not_bootstrap() {
        let settings = Arc::new(CountingSettings::new(vec![concrete(
            "orders",
            Arc::new(JsonDecoder),
        )]));
        let session = RuntimeSession::new(Arc::clone(&settings) as Arc<dyn SessionSettings>);
        assert!(session.lookup_decoder("orders").is_none());
        assert_eq!(settings.reads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn registered_decoder_replaces_composite() {
        let session = RuntimeSession::new(Arc::new(CountingSettings::new(vec![concrete(
            "orders",
            Arc::new(JsonDecoder),
        )])));
        session.resolve_decoder("orders");
        session.register_decoder("orders", Arc::new(Utf8Decoder));
        assert_eq!(session.resolve_decoder("orders").unwrap().name(), "utf8");
    }

    // -- Sources --

    #[test]
    fn input_handler_routes_by_prefix_with_full_url() {
        let (session, modules) = session_with(&["kafka", "es"]);
        let mut source = session.input_handler("es:index/a:b").unwrap().unwrap();
        assert_eq!(source.url(), "es:index/a:b");
        assert_eq!(source.next_record().unwrap(), Some(Record::new("r1")));
        assert_eq!(*modules[1].requested.lock().unwrap(), vec!["es:index/a:b"]);
        assert!(modules[0].requested.lock().unwrap().is_empty());
    }

    #[test]
    fn input_handler_passes_through_module_none() {
        let (session, _modules) = session_with(&["kafka"]);
        assert!(session.input_handler("kafka:missing").unwrap().is_none());
    }

    #[test]
    fn unknown_prefix_is_none() {
        let (session, _modules) = session_with(&["kafka"]);
        assert!(session.input_handler("mongo:db").unwrap().is_none());
        assert!(session.output_handler("mongo:db").unwrap().is_none());
    }

    #[test]
    fn url_without_colon_is_malformed() {
        let (session, _modules) = session_with(&["kafka"]);
        for result in [
            session.input_handler("mytopic").map(|_| ()),
            session.output_handler("mytopic").map(|_| ()),
        ] {
            match result.unwrap_err() {
                ConduitError::MalformedSourceUrl(url) => assert_eq!(url, "mytopic"),
                other => panic!("expected MalformedSourceUrl, got {other:?}"),
            }
        }
    }

    #[test]
    fn output_handler_writes_through_module() {
        let (session, modules) = session_with(&["kafka"]);
        let mut sink = session.output_handler("kafka:out").unwrap().unwrap();
        sink.write_record(&Record::new("hello")).unwrap();
        sink.flush().unwrap();
        assert_eq!(*modules[0].written.lock().unwrap(), vec![Record::new("hello")]);
    }

    // -- Lifecycle --

    #[test]
    fn prompt_follows_active_module() {
        let (session, modules) = session_with(&["core", "kafka"]);
        assert_eq!(session.prompt(), "core> ");
        session.set_active_module(Arc::clone(&modules[1]) as Arc<dyn Module>);
        assert_eq!(session.prompt(), "kafka> ");
    }

    #[test]
    fn prompt_without_active_module() {
        let (session, _modules) = session_with(&[]);
        assert_eq!(session.prompt(), "> ");
    }

    #[test]
    fn drop_after_shutdown_tears_down_once() {
        let (session, modules) = session_with(&["kafka"]);
        assert!(session.shutdown().is_empty());
        drop(session);
        assert_eq!(modules[0].teardowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_runs_shutdown() {
        let (session, modules) = session_with(&["kafka"]);
        drop(session);
        assert_eq!(modules[0].teardowns.load(Ordering::SeqCst), 1);
    }
}
