//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce il progress tracking e le statistiche di una run.
//!
//! ## Componenti principali:
//! - `ProgressManager`: progress bar con `indicatif` (disattivata in modalità JSON)
//! - `RunStats`: statistiche cumulative della run
//!
//! ## Statistiche tracciate:
//! - **files_processed**: Totale file ricevuti dallo stage
//! - **files_minified**: File minificati ed emessi
//! - **files_passed_through**: File vuoti inoltrati senza modifiche
//! - **warnings**: Warning del motore, sommati su tutti i file
//! - **errors**: File falliti (stream o errore del motore)
//! - **total_bytes_saved** / **total_original_size**

use crate::{file_manager::FileManager, report::Details};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Manages progress reporting for a minification run
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// A manager that draws nothing, for JSON runs and tests
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// Statistics tracker for a minification run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunStats {
    pub files_processed: usize,
    pub files_minified: usize,
    pub files_passed_through: usize,
    pub warnings: usize,
    pub errors: usize,
    pub total_bytes_saved: u64,
    pub total_original_size: u64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_minified(&mut self, details: &Details) {
        let original = details.stats.original_size as u64;
        let minified = details.stats.minified_size as u64;
        self.files_processed += 1;
        self.files_minified += 1;
        self.warnings += details.warnings.len();
        self.total_original_size += original;
        self.total_bytes_saved += original.saturating_sub(minified);
    }

    pub fn add_passed_through(&mut self) {
        self.files_processed += 1;
        self.files_passed_through += 1;
    }

    pub fn add_error(&mut self) {
        self.files_processed += 1;
        self.errors += 1;
    }

    pub fn overall_reduction_percent(&self) -> f64 {
        FileManager::calculate_reduction(
            self.total_original_size,
            self.total_original_size - self.total_bytes_saved,
        )
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Processed: {} files | Minified: {} | Passed through: {} | Errors: {} | Warnings: {} | Total saved: {} ({:.2}%)",
            self.files_processed,
            self.files_minified,
            self.files_passed_through,
            self.errors,
            self.warnings,
            FileManager::format_size(self.total_bytes_saved),
            self.overall_reduction_percent()
        )
    }
}
