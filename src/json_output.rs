//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per l'uso programmatico
//! del tool (una riga JSON per evento su stdout).
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio della run
//! - `file_complete`: File minificato, con il report completo
//! - `file_passthrough`: File vuoto inoltrato senza modifiche
//! - `file_error`: File fallito
//! - `complete`: Fine della run con statistiche finali

use crate::{config::Options, progress::RunStats, report::Details};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage {
    /// Inizio della run
    Start {
        input_dir: PathBuf,
        output_dir: Option<PathBuf>,
        total_files: usize,
        options: Options,
    },

    /// File minificato
    FileComplete {
        path: PathBuf,
        details: Details,
    },

    /// File inoltrato senza modifiche
    FilePassthrough { path: PathBuf },

    /// File fallito
    FileError { name: String, message: String },

    /// Run completata
    Complete {
        files_processed: usize,
        files_minified: usize,
        files_passed_through: usize,
        errors: usize,
        warnings: usize,
        total_bytes_saved: u64,
        average_reduction: f64,
        duration_seconds: f64,
    },
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    /// Crea un messaggio di completamento generale
    pub fn complete(stats: &RunStats, duration_seconds: f64) -> Self {
        Self::Complete {
            files_processed: stats.files_processed,
            files_minified: stats.files_minified,
            files_passed_through: stats.files_passed_through,
            errors: stats.errors,
            warnings: stats.warnings,
            total_bytes_saved: stats.total_bytes_saved,
            average_reduction: stats.overall_reduction_percent(),
            duration_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::DetailsBuilder;

    #[test]
    fn test_messages_are_tagged() {
        let message = JsonMessage::FileError {
            name: "a.css".to_string(),
            message: "Streaming not supported!".to_string(),
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "file_error");
        assert_eq!(value["message"], "Streaming not supported!");
    }

    #[test]
    fn test_file_complete_embeds_report() {
        let message = JsonMessage::FileComplete {
            path: PathBuf::from("/css/a.css"),
            details: DetailsBuilder::new("a.css").build(),
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "file_complete");
        assert_eq!(value["details"]["name"], "a.css");
        assert!(value["details"].get("sourceMap").is_none());
    }

    #[test]
    fn test_complete_from_stats() {
        let mut stats = RunStats::new();
        stats.add_passed_through();
        let value = serde_json::to_value(JsonMessage::complete(&stats, 0.5)).unwrap();
        assert_eq!(value["type"], "complete");
        assert_eq!(value["files_passed_through"], 1);
    }
}
