//! # File Carrier Module
//!
//! L'unità che attraversa la pipeline: un file logico con il suo contenuto.
//!
//! ## Modalità del contenuto (mutuamente esclusive):
//! - `Empty`: nessun contenuto (directory o payload vuoto), passa intatto
//! - `Buffered`: contenuto interamente in memoria, l'unico che lo stage elabora
//! - `Streamed`: stream aperto, rifiutato dallo stage
//!
//! ## Source map:
//! Un carrier può portare la source map prodotta da uno stage precedente;
//! lo stage la sostituisce con la mappa concatenata.

use parcel_sourcemap::SourceMap;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::io::AsyncRead;

/// Readable stream content
pub type ContentStream = Pin<Box<dyn AsyncRead + Send>>;

/// Content payload of a carrier
pub enum Contents {
    Empty,
    Buffered(Vec<u8>),
    Streamed(ContentStream),
}

impl Contents {
    pub fn is_empty(&self) -> bool {
        match self {
            Contents::Empty => true,
            Contents::Buffered(bytes) => bytes.is_empty(),
            Contents::Streamed(_) => false,
        }
    }
}

impl std::fmt::Debug for Contents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Contents::Empty => f.write_str("Empty"),
            Contents::Buffered(bytes) => write!(f, "Buffered({} bytes)", bytes.len()),
            Contents::Streamed(_) => f.write_str("Streamed"),
        }
    }
}

/// One file flowing through the pipeline
pub struct FileCarrier {
    pub path: PathBuf,
    /// Directory the path is relative to, for hosts that mirror trees
    pub base: Option<PathBuf>,
    pub contents: Contents,
    pub source_map: Option<SourceMap>,
}

impl FileCarrier {
    pub fn new(path: impl Into<PathBuf>, contents: Contents) -> Self {
        Self {
            path: path.into(),
            base: None,
            contents,
            source_map: None,
        }
    }

    /// Directory marker or empty file
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self::new(path, Contents::Empty)
    }

    pub fn buffered(path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(path, Contents::Buffered(bytes.into()))
    }

    pub fn streamed(path: impl Into<PathBuf>, stream: impl AsyncRead + Send + 'static) -> Self {
        Self::new(path, Contents::Streamed(Box::pin(stream)))
    }

    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn with_source_map(mut self, map: SourceMap) -> Self {
        self.source_map = Some(map);
        self
    }

    /// Basename of the path, empty when the path has none (e.g. `/`)
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Path relative to `base`, or the bare name when there is no usable base
    pub fn relative(&self) -> PathBuf {
        self.base
            .as_deref()
            .and_then(|base| self.path.strip_prefix(base).ok())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(self.name()))
    }

    pub fn is_null(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn is_stream(&self) -> bool {
        matches!(self.contents, Contents::Streamed(_))
    }

    pub fn is_buffer(&self) -> bool {
        matches!(self.contents, Contents::Buffered(_))
    }

    /// Buffered bytes, if any
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.contents {
            Contents::Buffered(bytes) => Some(bytes.as_slice()),
            _ => None,
        }
    }

    /// Buffered contents as text, lossily decoded
    pub fn text(&self) -> Option<String> {
        self.bytes().map(|b| String::from_utf8_lossy(b).into_owned())
    }
}

impl std::fmt::Debug for FileCarrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileCarrier")
            .field("path", &self.path)
            .field("base", &self.base)
            .field("contents", &self.contents)
            .field("source_map", &self.source_map.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_is_basename() {
        let carrier = FileCarrier::buffered("/test/fixtures/test.css", "p{}");
        assert_eq!(carrier.name(), "test.css");
        assert_eq!(FileCarrier::empty("/").name(), "");
    }

    #[test]
    fn test_relative_to_base() {
        let carrier = FileCarrier::buffered("/site/css/a/b.css", "b{}").with_base("/site/css");
        assert_eq!(carrier.relative(), PathBuf::from("a/b.css"));

        let carrier = FileCarrier::buffered("/elsewhere/b.css", "b{}").with_base("/site/css");
        assert_eq!(carrier.relative(), PathBuf::from("b.css"));
    }

    #[test]
    fn test_content_modes() {
        let empty = FileCarrier::empty("/dir");
        assert!(empty.is_null() && !empty.is_buffer() && !empty.is_stream());

        let zero = FileCarrier::buffered("/zero.css", Vec::new());
        assert!(zero.is_null() && zero.is_buffer());

        let buffered = FileCarrier::buffered("/a.css", "a{}");
        assert!(!buffered.is_null());
        assert_eq!(buffered.text().as_deref(), Some("a{}"));

        let streamed = FileCarrier::streamed("/s.css", std::io::Cursor::new(b"a{}".to_vec()));
        assert!(streamed.is_stream() && !streamed.is_null());
        assert!(streamed.bytes().is_none());
    }
}
