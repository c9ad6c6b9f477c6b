//! # Details Report Module
//!
//! Il report passato al callback per ogni file effettivamente minificato.
//!
//! ## Contratto:
//! - `name`, `stats`, `errors`, `warnings` sono sempre presenti (anche vuoti)
//! - `sourceMap` è presente solo quando la modalità source map è attiva:
//!   chi legge il report usa la presenza della chiave, non il suo valore
//!
//! ## Esempio di report serializzato:
//! ```json
//! {
//!   "name": "test.css",
//!   "stats": { "originalSize": 45, "minifiedSize": 32, "efficiency": 0.28, "timeSpent": 0 },
//!   "errors": [],
//!   "warnings": []
//! }
//! ```

use crate::engine::{EngineOutput, EngineStats};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Summary of one minification, handed to the stage callback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Details {
    pub name: String,
    pub stats: EngineStats,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_map: Option<Value>,
}

impl Details {
    /// Whether the report was built in source-map mode
    pub fn has_source_map(&self) -> bool {
        self.source_map.is_some()
    }
}

/// Assembles a [`Details`] from engine output and carrier metadata
#[derive(Debug, Default)]
pub struct DetailsBuilder {
    name: String,
    stats: EngineStats,
    errors: Vec<String>,
    warnings: Vec<String>,
    source_map: Option<Value>,
}

impl DetailsBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Copy stats and diagnostics out of an engine call
    pub fn engine_output(mut self, output: &EngineOutput) -> Self {
        self.stats = output.stats.clone();
        self.errors = output.errors.clone();
        self.warnings = output.warnings.clone();
        self
    }

    /// Set in source-map mode only; `Value::Null` still marks the mode as active
    pub fn source_map(mut self, map: Value) -> Self {
        self.source_map = Some(map);
        self
    }

    pub fn build(self) -> Details {
        Details {
            name: self.name,
            stats: self.stats,
            errors: self.errors,
            warnings: self.warnings,
            source_map: self.source_map,
        }
    }
}
