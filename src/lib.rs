//! # CSS Minify Stage Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare della libreria
//! - Espone lo stage di minificazione e i tipi che attraversano la pipeline
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `stage`: Lo stage di trasformazione (il cuore)
//! - `normalize`: Risoluzione delle forme `(options?, callback?)`
//! - `carrier`: Il file che attraversa la pipeline
//! - `engine`: Motore di minificazione (lightningcss) e sua interfaccia
//! - `report`: Report per file passato al callback
//! - `source_map`: Concatenazione delle source map
//! - `pipeline`: Plumbing minimo per far scorrere i carrier
//! - `config`: Opzioni dello stage e configurazione della run
//! - `error`: Tipi di errore
//! - `file_manager`, `optimizer`, `progress`, `json_output`: Tool da riga di comando
//!
//! ## Utilizzo:
//! ```rust
//! use css_minify_stage::{FileCarrier, MinifyStage, Options};
//!
//! let stage = MinifyStage::with_options_and_callback(Options::new().debug(true), |details| {
//!     assert!(details.warnings.is_empty());
//! });
//! let carrier = stage.process(FileCarrier::buffered("site.css", "a { color: #ff0000; }"))?;
//! assert_eq!(carrier.text().as_deref(), Some("a{color:red}"));
//! # Ok::<(), css_minify_stage::StageError>(())
//! ```

pub mod carrier;
pub mod config;
pub mod engine;
pub mod error;
pub mod file_manager;
pub mod json_output;
pub mod normalize;
pub mod optimizer;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod source_map;
pub mod stage;

pub use carrier::{Contents, FileCarrier};
pub use config::{Config, Options};
pub use engine::{EngineOutput, EngineStats, LightningEngine, MinifyEngine, SourceInput};
pub use error::StageError;
pub use normalize::{normalize, Callback, StageArg};
pub use optimizer::CssOptimizer;
pub use pipeline::{pipe, PipelineEvent, Transform};
pub use report::{Details, DetailsBuilder};
pub use stage::MinifyStage;
