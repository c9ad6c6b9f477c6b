//! # Options Normalizer
//!
//! Lo stage accetta due forme di costruzione: `(options?, callback?)` oppure
//! `(callback)`. Questo modulo le riduce a una coppia canonica
//! `(Options, Callback)`, fissata una volta per istanza dello stage.
//!
//! ## Regole:
//! - primo argomento callback → callback, opzioni vuote
//! - opzioni + callback → entrambi
//! - nessun callback → no-op
//! - input malformato degrada ai default, mai un errore

use crate::config::Options;
use crate::report::Details;
use std::sync::Arc;

/// Per-file callback receiving the details report
pub type Callback = Arc<dyn Fn(&Details) + Send + Sync>;

/// One positional construction argument
pub enum StageArg {
    Options(Options),
    Callback(Callback),
}

impl StageArg {
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&Details) + Send + Sync + 'static,
    {
        StageArg::Callback(Arc::new(f))
    }
}

impl From<Options> for StageArg {
    fn from(options: Options) -> Self {
        StageArg::Options(options)
    }
}

impl From<Callback> for StageArg {
    fn from(callback: Callback) -> Self {
        StageArg::Callback(callback)
    }
}

/// Canonical `(options, callback)` pair
#[derive(Clone)]
pub struct Resolved {
    pub options: Options,
    pub callback: Callback,
}

impl Default for Resolved {
    fn default() -> Self {
        Self {
            options: Options::default(),
            callback: noop(),
        }
    }
}

impl std::fmt::Debug for Resolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolved")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Callback that does nothing
pub fn noop() -> Callback {
    Arc::new(|_: &Details| {})
}

/// Resolve up to two positional arguments into options and callback
pub fn normalize(first: Option<StageArg>, second: Option<StageArg>) -> Resolved {
    match (first, second) {
        (Some(StageArg::Callback(callback)), _) => Resolved {
            options: Options::default(),
            callback,
        },
        (Some(StageArg::Options(options)), Some(StageArg::Callback(callback))) => {
            Resolved { options, callback }
        }
        (Some(StageArg::Options(options)), _) => Resolved {
            options,
            callback: noop(),
        },
        (None, Some(StageArg::Callback(callback))) => Resolved {
            options: Options::default(),
            callback,
        },
        (None, _) => Resolved::default(),
    }
}
