//! # Transform Stage Module
//!
//! Il cuore della libreria: riceve un file alla volta, decide se elaborarlo,
//! pilota il motore di minificazione e restituisce il file trasformato oppure
//! un errore tipizzato.
//!
//! ## Macchina a stati per invocazione:
//! ```text
//! RECEIVED → CLASSIFIED → PASSTHROUGH → EMITTED
//!                       → PROCESSING  → EMITTED | FAILED
//!                       → FAILED (stream)
//! ```
//!
//! ## Contratto:
//! - Carrier vuoti: inoltrati intatti, motore e callback non invocati
//! - Carrier in streaming: `Streaming not supported!`, callback non invocato
//! - Errori del motore: il primo errore diventa l'errore della pipeline
//! - Warning del motore: raccolti nel report, l'output viene emesso comunque
//! - Il callback riceve il report prima che il carrier venga restituito
//!
//! ## Esempio:
//! ```rust
//! use css_minify_stage::{FileCarrier, MinifyStage, Options, Transform};
//!
//! # tokio_test::block_on(async {
//! let stage = MinifyStage::with_options_and_callback(Options::new(), |details| {
//!     println!("{}: {} -> {}", details.name, details.stats.original_size, details.stats.minified_size);
//! });
//! let carrier = stage
//!     .transform(FileCarrier::buffered("/css/site.css", "p { color: green; }"))
//!     .await?;
//! assert_eq!(carrier.text().as_deref(), Some("p{color:green}"));
//! # Ok::<(), css_minify_stage::StageError>(())
//! # }).unwrap();
//! ```

use crate::{
    carrier::{Contents, FileCarrier},
    config::Options,
    engine::{LightningEngine, MinifyEngine, SourceInput},
    error::StageError,
    normalize::{normalize, Callback, Resolved, StageArg},
    pipeline::Transform,
    report::{Details, DetailsBuilder},
    source_map,
};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Outcome of inspecting an incoming carrier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// No content: forward untouched
    Passthrough,
    /// Open stream: refuse
    Unsupported,
    /// Buffered content: minify
    Process,
}

impl Classification {
    pub fn of(carrier: &FileCarrier) -> Self {
        match &carrier.contents {
            Contents::Streamed(_) => Classification::Unsupported,
            contents if contents.is_empty() => Classification::Passthrough,
            _ => Classification::Process,
        }
    }
}

/// Pipeline stage minifying buffered stylesheets
pub struct MinifyStage<E = LightningEngine> {
    options: Options,
    callback: Callback,
    engine: E,
}

impl MinifyStage<LightningEngine> {
    pub fn new() -> Self {
        Self::from_args(None, None)
    }

    pub fn with_options(options: Options) -> Self {
        Self::from_args(Some(options.into()), None)
    }

    pub fn with_callback<F>(callback: F) -> Self
    where
        F: Fn(&Details) + Send + Sync + 'static,
    {
        Self::from_args(Some(StageArg::callback(callback)), None)
    }

    pub fn with_options_and_callback<F>(options: Options, callback: F) -> Self
    where
        F: Fn(&Details) + Send + Sync + 'static,
    {
        Self::from_args(Some(options.into()), Some(StageArg::callback(callback)))
    }

    /// Build from the positional `(options?, callback?)` call shapes
    pub fn from_args(first: Option<StageArg>, second: Option<StageArg>) -> Self {
        Self::with_engine(LightningEngine::new(), normalize(first, second))
    }
}

impl Default for MinifyStage<LightningEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: MinifyEngine> MinifyStage<E> {
    pub fn with_engine(engine: E, resolved: Resolved) -> Self {
        Self {
            options: resolved.options,
            callback: resolved.callback,
            engine,
        }
    }

    /// Run one carrier through the stage
    pub fn process(&self, mut carrier: FileCarrier) -> Result<FileCarrier, StageError> {
        let name = carrier.name();

        match Classification::of(&carrier) {
            Classification::Passthrough => {
                debug!("{}: no content, passing through", carrier.path.display());
                return Ok(carrier);
            }
            Classification::Unsupported => {
                debug!("{}: content is a stream, refusing", carrier.path.display());
                return Err(StageError::StreamingNotSupported);
            }
            Classification::Process => {}
        }

        let text = carrier.text().unwrap_or_default();
        let input = SourceInput::new(&text).with_path(&carrier.path);
        let mut output = self.engine.minify(input, &self.options);

        if let Some(first) = output.errors.first() {
            for extra in output.errors.iter().skip(1) {
                warn!("{}: additional engine error: {}", name, extra);
            }
            return Err(StageError::Engine(first.clone()));
        }

        for warning in &output.warnings {
            warn!("{}: {}", name, warning);
        }

        let mut builder = DetailsBuilder::new(name.as_str()).engine_output(&output);

        if self.options.source_map {
            let prior = carrier.source_map.take();
            let merged = match output.source_map.take() {
                Some(produced) => Some(source_map::chain(prior, produced)?),
                None => prior,
            };
            let value = match merged {
                Some(mut map) => {
                    let value = source_map::to_value(&mut map)?;
                    carrier.source_map = Some(map);
                    value
                }
                None => Value::Null,
            };
            builder = builder.source_map(value);
        }

        let details = builder.build();

        if self.options.debug {
            info!(
                "{}: {} -> {} bytes ({:.1}% saved, {}ms, {} warning(s))",
                name,
                details.stats.original_size,
                details.stats.minified_size,
                details.stats.efficiency * 100.0,
                details.stats.time_spent,
                details.warnings.len()
            );
        }

        (self.callback)(&details);

        carrier.contents = Contents::Buffered(output.styles.into_bytes());
        Ok(carrier)
    }
}

impl<E: MinifyEngine> Transform for MinifyStage<E> {
    async fn transform(&self, carrier: FileCarrier) -> Result<FileCarrier, StageError> {
        self.process(carrier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineOutput, EngineStats};
    use std::sync::{Arc, Mutex};
    use tokio_test::{assert_err, assert_ok};

    const FIXTURE: &str = include_str!("../tests/fixtures/test.css");
    const FIXTURE_PATH: &str = "/test/fixtures/test.css";

    type Seen = Arc<Mutex<Vec<Details>>>;

    fn recording(options: Options) -> (MinifyStage, Seen) {
        let seen: Seen = Arc::default();
        let sink = Arc::clone(&seen);
        let stage = MinifyStage::with_options_and_callback(options, move |details| {
            sink.lock().unwrap().push(details.clone());
        });
        (stage, seen)
    }

    fn fixture() -> FileCarrier {
        FileCarrier::buffered(FIXTURE_PATH, FIXTURE)
    }

    #[tokio::test]
    async fn test_produces_expected_file() {
        let stage = MinifyStage::new();
        let carrier = assert_ok!(stage.transform(fixture()).await);
        assert_eq!(carrier.text().as_deref(), Some("p{text-align:center;color:green}"));
        assert_eq!(carrier.path.to_str(), Some(FIXTURE_PATH));
    }

    #[tokio::test]
    async fn test_debug_callback_gets_stats() {
        let (stage, seen) = recording(Options::new().debug(true));
        assert_ok!(stage.transform(fixture()).await);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].stats.original_size, FIXTURE.len());
        assert_eq!(seen[0].stats.minified_size, "p{text-align:center;color:green}".len());
    }

    #[tokio::test]
    async fn test_callback_only_report_shape() {
        let seen: Seen = Arc::default();
        let sink = Arc::clone(&seen);
        let stage = MinifyStage::with_callback(move |details| sink.lock().unwrap().push(details.clone()));
        assert_ok!(stage.transform(fixture()).await);

        let seen = seen.lock().unwrap();
        let value = serde_json::to_value(&seen[0]).unwrap();
        let object = value.as_object().unwrap();
        assert!(object.contains_key("stats"));
        assert!(object.contains_key("errors"));
        assert!(object.contains_key("warnings"));
        assert!(!object.contains_key("sourceMap"));
        assert!(!seen[0].has_source_map());
    }

    #[tokio::test]
    async fn test_source_map_mode_adds_report_key() {
        let (stage, seen) = recording(Options::new().source_map(true));
        let carrier = assert_ok!(stage.transform(fixture()).await);

        assert!(carrier.source_map.is_some());
        let seen = seen.lock().unwrap();
        assert!(seen[0].has_source_map());
        assert_eq!(seen[0].source_map.as_ref().unwrap()["version"], 3);
    }

    #[tokio::test]
    async fn test_source_map_chains_prior_map() {
        let prior = r#"{"version":3,"sources":["a.css"],"names":[],"mappings":"AAAA"}"#;
        let carrier = FileCarrier::buffered("/out/bundle.css", "p{color:red}")
            .with_source_map(source_map::from_json(prior).unwrap());

        let (stage, seen) = recording(Options::new().source_map(true));
        assert_ok!(stage.transform(carrier).await);

        let seen = seen.lock().unwrap();
        let map = seen[0].source_map.as_ref().unwrap();
        assert!(map["sources"].to_string().contains("a.css"), "{map}");
    }

    #[tokio::test]
    async fn test_report_carries_file_name() {
        let (stage, seen) = recording(Options::new());
        assert_ok!(stage.transform(fixture()).await);
        assert_eq!(seen.lock().unwrap()[0].name, "test.css");
    }

    #[tokio::test]
    async fn test_improper_syntax_is_a_warning() {
        let (stage, seen) = recording(Options::new().debug(true));
        let carrier = assert_ok!(stage.transform(FileCarrier::buffered("/", "body{")).await);
        assert!(carrier.is_buffer());

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].warnings.len(), 1);
        assert_eq!(seen[0].warnings[0], "Missing '}' after 'body'. Ignoring.");
        assert!(seen[0].errors.is_empty());
    }

    #[tokio::test]
    async fn test_streaming_not_supported() {
        let (stage, seen) = recording(Options::new());
        let carrier = FileCarrier::streamed(FIXTURE_PATH, std::io::Cursor::new(FIXTURE.as_bytes().to_vec()));

        let err = assert_err!(stage.transform(carrier).await);
        assert_eq!(err.to_string(), "Streaming not supported!");
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_broken_import_is_a_pipeline_error() {
        let (stage, seen) = recording(Options::new());
        let carrier = FileCarrier::buffered("/", "@import url(/some/fake/file);");

        let err = assert_err!(stage.transform(carrier).await);
        assert_eq!(err.to_string(), "Broken @import declaration of \"/some/fake/file\"");
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_non_ascii_import_is_an_error_not_a_crash() {
        let stage = MinifyStage::new();
        let carrier = FileCarrier::buffered("/missing/site.css", "@import \"éé.css\";\na{color:red}");

        let err = assert_err!(stage.process(carrier));
        assert_eq!(err.to_string(), "Broken @import declaration of \"éé.css\"");
    }

    #[tokio::test]
    async fn test_empty_carrier_passes_through() {
        let (stage, seen) = recording(Options::new().source_map(true));

        let carrier = assert_ok!(stage.transform(FileCarrier::empty("/test/dir")).await);
        assert!(matches!(carrier.contents, Contents::Empty));
        assert!(carrier.source_map.is_none());

        let carrier = assert_ok!(stage.transform(FileCarrier::buffered("/zero.css", Vec::new())).await);
        assert_eq!(carrier.bytes(), Some(&[][..]));

        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_pass_is_idempotent() {
        let stage = MinifyStage::new();
        let once = assert_ok!(stage.transform(fixture()).await);
        let expected = once.text();
        let twice = assert_ok!(stage.transform(once).await);
        assert_eq!(twice.text(), expected);
    }

    #[test]
    fn test_classification() {
        assert_eq!(Classification::of(&FileCarrier::empty("/d")), Classification::Passthrough);
        assert_eq!(Classification::of(&fixture()), Classification::Process);
        let streamed = FileCarrier::streamed("/s.css", tokio::io::empty());
        assert_eq!(Classification::of(&streamed), Classification::Unsupported);
    }

    /// Engine double that records the options it was handed
    struct ScriptedEngine {
        seen: Arc<Mutex<Vec<Options>>>,
        errors: Vec<String>,
    }

    impl MinifyEngine for ScriptedEngine {
        fn minify(&self, input: SourceInput<'_>, options: &Options) -> EngineOutput {
            self.seen.lock().unwrap().push(options.clone());
            EngineOutput {
                styles: input.text.to_uppercase(),
                errors: self.errors.clone(),
                stats: EngineStats::new(input.text.len(), input.text.len(), 0),
                ..Default::default()
            }
        }
    }

    #[test]
    fn test_unrecognized_options_reach_engine_verbatim() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let options = Options::new().set("compatibility", "ie9").set("level", 2);
        let engine = ScriptedEngine {
            seen: Arc::clone(&seen),
            errors: Vec::new(),
        };
        let stage = MinifyStage::with_engine(engine, normalize(Some(options.clone().into()), None));

        let carrier = assert_ok!(stage.process(FileCarrier::buffered("/a.css", "a{}")));
        assert_eq!(carrier.text().as_deref(), Some("A{}"));
        assert_eq!(seen.lock().unwrap()[0], options);
    }

    #[test]
    fn test_first_engine_error_wins() {
        let calls = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&calls);
        let engine = ScriptedEngine {
            seen: Arc::default(),
            errors: vec!["first".to_string(), "second".to_string()],
        };
        let resolved = normalize(
            Some(StageArg::callback(move |_| *counter.lock().unwrap() += 1)),
            None,
        );
        let stage = MinifyStage::with_engine(engine, resolved);

        let err = assert_err!(stage.process(FileCarrier::buffered("/a.css", "a{}")));
        assert!(matches!(err, StageError::Engine(ref msg) if msg == "first"));
        assert_eq!(*calls.lock().unwrap(), 0);
    }
}
