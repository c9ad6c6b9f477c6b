//! # Minification Engine Module
//!
//! Il motore di minificazione è un collaboratore esterno dello stage: una
//! funzione pura da testo + opzioni a testo minificato + diagnostica.
//!
//! ## Responsabilità:
//! - Definisce il trait `MinifyEngine`, il punto di aggancio dello stage
//! - Definisce `EngineOutput` e `EngineStats`
//! - Traduce le chiavi passthrough di `Options` in `EngineSettings`
//!
//! ## Sottomoduli:
//! - `lightning`: motore di default basato su `lightningcss`
//! - `imports`: sorgenti degli `@import` per il bundler di `lightningcss`
//! - `diagnostics`: warning non fatali (blocchi non chiusi, valori vuoti)
//!
//! ## Classificazione:
//! - `warnings`: non fatali, l'output viene comunque prodotto
//! - `errors`: fatali, lo stage interrompe l'invocazione

pub mod diagnostics;
pub mod imports;
pub mod lightning;

pub use lightning::LightningEngine;

use crate::config::{is_truthy, Options};
use parcel_sourcemap::SourceMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Engine keys understood by [`EngineSettings`]
const KNOWN_KEYS: &[&str] = &["level", "inline", "rebaseTo", "sourceMapInlineSources"];

/// Text handed to the engine, plus where it came from
#[derive(Debug, Clone, Copy)]
pub struct SourceInput<'a> {
    pub text: &'a str,
    /// Logical path of the carrier, used for import resolution and map sources
    pub path: Option<&'a Path>,
}

impl<'a> SourceInput<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, path: None }
    }

    pub fn with_path(mut self, path: &'a Path) -> Self {
        self.path = Some(path);
        self
    }

    /// Name recorded in emitted source maps
    pub fn source_name(&self) -> String {
        self.path
            .map(|p| p.to_string_lossy().into_owned())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "stdin.css".to_string())
    }
}

/// Size and timing figures for one engine call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    pub original_size: usize,
    pub minified_size: usize,
    /// Fraction of the original size saved, 0.0 for empty input
    pub efficiency: f64,
    /// Milliseconds spent in the engine
    pub time_spent: u64,
}

impl EngineStats {
    pub fn new(original_size: usize, minified_size: usize, time_spent: u64) -> Self {
        let efficiency = if original_size > 0 {
            1.0 - (minified_size as f64 / original_size as f64)
        } else {
            0.0
        };

        Self {
            original_size,
            minified_size,
            efficiency,
            time_spent,
        }
    }
}

/// Everything the engine reports for one call
#[derive(Default)]
pub struct EngineOutput {
    pub styles: String,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub stats: EngineStats,
    /// Present only when source maps were requested
    pub source_map: Option<SourceMap>,
}

impl std::fmt::Debug for EngineOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineOutput")
            .field("styles", &self.styles)
            .field("warnings", &self.warnings)
            .field("errors", &self.errors)
            .field("stats", &self.stats)
            .field("source_map", &self.source_map.is_some())
            .finish()
    }
}

/// The minification routine the stage drives
pub trait MinifyEngine {
    fn minify(&self, input: SourceInput<'_>, options: &Options) -> EngineOutput;
}

/// Which `@import`s get inlined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineScope {
    None,
    Local,
}

/// Typed view of the engine passthrough keys
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// 0 prints compactly, anything above also runs the optimisation pass
    pub level: u8,
    pub inline: InlineScope,
    pub rebase_to: Option<PathBuf>,
    pub source_map: bool,
    pub source_map_inline_sources: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            level: 1,
            inline: InlineScope::Local,
            rebase_to: None,
            source_map: false,
            source_map_inline_sources: false,
        }
    }
}

impl EngineSettings {
    /// Read settings out of an options bag; malformed values fall back to defaults
    pub fn from_options(options: &Options) -> Self {
        let mut settings = Self {
            source_map: options.source_map,
            ..Self::default()
        };

        if let Some(level) = options.get("level").and_then(Value::as_u64) {
            settings.level = level.min(2) as u8;
        }

        if let Some(inline) = options.get("inline") {
            settings.inline = parse_inline(inline);
        }

        if let Some(rebase_to) = options.get("rebaseTo").and_then(Value::as_str) {
            settings.rebase_to = Some(PathBuf::from(rebase_to));
        }

        if let Some(inline_sources) = options.get("sourceMapInlineSources") {
            settings.source_map_inline_sources = is_truthy(inline_sources);
        }

        for key in options.engine.keys() {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                debug!("Engine option '{}' is not used by this engine", key);
            }
        }

        settings
    }
}

fn parse_inline(value: &Value) -> InlineScope {
    let allows_local = |s: &str| matches!(s, "local" | "all");
    match value {
        Value::Bool(false) | Value::Null => InlineScope::None,
        Value::Bool(true) => InlineScope::Local,
        Value::String(s) if allows_local(s) => InlineScope::Local,
        Value::Array(items) if items.iter().filter_map(Value::as_str).any(allows_local) => {
            InlineScope::Local
        }
        _ => InlineScope::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_settings_defaults() {
        let settings = EngineSettings::from_options(&Options::new());
        assert_eq!(settings, EngineSettings::default());
        assert_eq!(settings.inline, InlineScope::Local);
    }

    #[test]
    fn test_settings_from_passthrough_keys() {
        let options = Options::new()
            .source_map(true)
            .set("level", 0)
            .set("inline", json!(["none"]))
            .set("rebaseTo", "/srv/styles")
            .set("sourceMapInlineSources", true);
        let settings = EngineSettings::from_options(&options);

        assert_eq!(settings.level, 0);
        assert_eq!(settings.inline, InlineScope::None);
        assert_eq!(settings.rebase_to, Some(PathBuf::from("/srv/styles")));
        assert!(settings.source_map);
        assert!(settings.source_map_inline_sources);
    }

    #[test]
    fn test_inline_shapes() {
        assert_eq!(parse_inline(&json!(false)), InlineScope::None);
        assert_eq!(parse_inline(&json!("none")), InlineScope::None);
        assert_eq!(parse_inline(&json!("all")), InlineScope::Local);
        assert_eq!(parse_inline(&json!(["remote", "local"])), InlineScope::Local);
        assert_eq!(parse_inline(&json!(["remote"])), InlineScope::None);
    }

    #[test]
    fn test_stats_efficiency() {
        let stats = EngineStats::new(200, 50, 3);
        assert!((stats.efficiency - 0.75).abs() < f64::EPSILON);
        assert_eq!(EngineStats::new(0, 0, 0).efficiency, 0.0);
    }

    #[test]
    fn test_source_name_falls_back() {
        assert_eq!(SourceInput::new("a{}").source_name(), "stdin.css");
        let path = Path::new("/styles/site.css");
        assert_eq!(SourceInput::new("a{}").with_path(path).source_name(), "/styles/site.css");
    }
}
