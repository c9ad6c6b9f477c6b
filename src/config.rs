//! # Configuration Management Module
//!
//! Questo modulo gestisce la configurazione dello stage e del tool da riga di comando.
//!
//! ## Responsabilità:
//! - Definisce `Options`, il bag di opzioni passato allo stage
//! - Definisce `Config`, la configurazione di una run su una directory
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//!
//! ## Opzioni riconosciute dallo stage:
//! - `sourceMap`: abilita propagazione e merge delle source map (truthy, default: false)
//! - `debug`: log delle statistiche per file (default: false)
//! - qualsiasi altra chiave viene passata verbatim al motore (`level`, `inline`, `rebaseTo`, ...)
//!
//! ## Parametri della run:
//! - `output_path`: Directory di output (default: None = replace in place)
//! - `suffix`: Suffisso per il nome dei file prodotti (es. `.min`)
//! - `dry_run`: Simulazione senza scrivere file
//! - `buffer`: Se false i file vengono aperti come stream
//! - `json_output`: Eventi JSON su stdout
//!
//! ## Esempio:
//! ```rust
//! use css_minify_stage::config::{Config, Options};
//!
//! let config = Config {
//!     options: Options::new().source_map(true).set("level", 2),
//!     suffix: Some(".min".to_string()),
//!     ..Default::default()
//! };
//! config.validate()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Options bag handed to a [`crate::MinifyStage`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    /// Propagate and merge source maps, and include them in the report
    #[serde(default, deserialize_with = "truthy")]
    pub source_map: bool,
    /// Log per-file stats at info level
    #[serde(default)]
    pub debug: bool,
    /// Everything else, forwarded untouched to the engine
    #[serde(flatten)]
    pub engine: Map<String, Value>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source_map(mut self, enabled: bool) -> Self {
        self.source_map = enabled;
        self
    }

    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Set an engine passthrough key
    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.engine.insert(key.to_string(), value.into());
        self
    }

    /// Look up an engine passthrough key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.engine.get(key)
    }
}

/// JS-style truthiness for "boolean-ish" flags
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn truthy<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(is_truthy(&value))
}

/// Configuration for a directory run of the `css-minify` tool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Options handed to the stage
    pub options: Options,
    /// Output directory for minified files (None = replace in place)
    pub output_path: Option<PathBuf>,
    /// Suffix inserted before the extension of written files
    pub suffix: Option<String>,
    /// Dry run - don't actually write files
    pub dry_run: bool,
    /// Read files fully before handing them to the stage
    pub buffer: bool,
    /// Output progress and status as JSON for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            options: Options::default(),
            output_path: None,
            suffix: None,
            dry_run: false,
            buffer: true,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if let Some(level) = self.options.get("level") {
            match level.as_u64() {
                Some(0..=2) => {}
                _ => return Err(anyhow::anyhow!("Optimization level must be 0, 1 or 2")),
            }
        }

        if let Some(ref suffix) = self.suffix {
            if suffix.is_empty() || suffix.contains(['/', '\\']) {
                return Err(anyhow::anyhow!("Invalid output suffix: {:?}", suffix));
            }
        }

        if let Some(ref output_path) = self.output_path {
            if output_path.exists() && !output_path.is_dir() {
                return Err(anyhow::anyhow!("Output path is not a directory: {}", output_path.display()));
            }
        }

        Ok(())
    }

    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("css-minify").join("config.json"))
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config file {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
