//! # Error Types Module
//!
//! Questo modulo definisce i tipi di errore dello stage di minificazione.
//!
//! ## Responsabilità:
//! - Definisce `StageError` enum per tutti gli esiti fatali di una invocazione
//! - Mantiene i messaggi esatti che la pipeline host si aspetta
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `StreamingNotSupported`: contenuto aperto come stream invece che bufferizzato
//! - `Engine`: primo errore fatale riportato dal motore di minificazione (verbatim)
//! - `SourceMap`: errore nel concatenare o serializzare le source map
//!
//! ## Esempio:
//! ```rust
//! use css_minify_stage::StageError;
//!
//! let err = StageError::StreamingNotSupported;
//! assert_eq!(err.to_string(), "Streaming not supported!");
//! ```

/// Fatal outcome of a single stage invocation
#[derive(thiserror::Error, Debug)]
pub enum StageError {
    #[error("Streaming not supported!")]
    StreamingNotSupported,

    /// The engine's own message, surfaced without decoration.
    #[error("{0}")]
    Engine(String),

    #[error("Source map error: {0}")]
    SourceMap(String),
}
