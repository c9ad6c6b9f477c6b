//! # Main Optimizer Orchestrator Module
//!
//! Questo è il modulo che orchestra una run del tool su una directory.
//!
//! ## Responsabilità:
//! - Discovery dei fogli di stile e caricamento dei carrier
//! - Costruzione dello stage con le opzioni della configurazione
//! - Esecuzione della pipeline, un file alla volta
//! - Scrittura dei file emessi (in-place o in output directory)
//! - Progress bar o eventi JSON, e report finale
//!
//! ## Flusso di esecuzione:
//! 1. **Inizializzazione**: Validazione config
//! 2. **File discovery**: Trova tutti i `.css` nella directory
//! 3. **Caricamento**: Buffer o stream, con eventuale source map affiancata
//! 4. **Pipeline**: Ogni carrier produce esattamente un evento (dato o errore)
//! 5. **Scrittura**: I file minificati vengono scritti, quelli vuoti copiati
//! 6. **Reporting**: Statistiche della run
//!
//! ## Error handling:
//! - Errori per singoli file non bloccano la run
//! - Le statistiche tracciano il numero di errori
//!
//! ## Esempio:
//! ```rust,no_run
//! use css_minify_stage::{Config, CssOptimizer};
//! use std::path::Path;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let optimizer = CssOptimizer::new(Path::new("styles"), Config::default())?;
//! let stats = optimizer.run().await?;
//! println!("{}", stats.format_summary());
//! # Ok(())
//! # }
//! ```

use crate::{
    config::Config,
    file_manager::{FileManager, LoadMode},
    json_output::JsonMessage,
    pipeline::{pipe, PipelineEvent},
    progress::{ProgressManager, RunStats},
    report::Details,
    stage::MinifyStage,
    FileCarrier,
};
use anyhow::Result;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, error, info};

/// Runs the minify stage over every stylesheet in a directory
pub struct CssOptimizer {
    config: Config,
    input_dir: PathBuf,
}

impl CssOptimizer {
    /// Create a new optimizer instance
    pub fn new(input_dir: &Path, config: Config) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            input_dir: input_dir.to_path_buf(),
        })
    }

    /// Run the minification over the whole directory
    pub async fn run(&self) -> Result<RunStats> {
        let started = Instant::now();
        info!("Starting CSS minification in: {}", self.input_dir.display());
        self.log_mode();

        let files = FileManager::find_css_files(&self.input_dir)?;
        info!("Found {} stylesheets to process", files.len());

        if self.config.json_output {
            JsonMessage::Start {
                input_dir: self.input_dir.clone(),
                output_dir: self.config.output_path.clone(),
                total_files: files.len(),
                options: self.config.options.clone(),
            }
            .emit();
        }

        let mut stats = RunStats::new();
        if files.is_empty() {
            info!("No stylesheets found to process");
            self.finish(&stats, started);
            return Ok(stats);
        }

        let mode = if self.config.buffer { LoadMode::Buffer } else { LoadMode::Stream };
        let mut carriers = Vec::with_capacity(files.len());
        for file in &files {
            carriers.push(
                FileManager::load_carrier(file, &self.input_dir, mode, self.config.options.source_map).await?,
            );
        }

        let progress = if self.config.json_output {
            ProgressManager::hidden()
        } else {
            ProgressManager::new(files.len() as u64)
        };

        // The callback always fires before its carrier is emitted
        let last_report: Arc<Mutex<Option<Details>>> = Arc::default();
        let sink = Arc::clone(&last_report);
        let stage = MinifyStage::with_options_and_callback(self.config.options.clone(), move |details| {
            let mut slot = sink.lock().unwrap_or_else(|e| e.into_inner());
            *slot = Some(details.clone());
        });

        let events = pipe(&stage, futures::stream::iter(carriers));
        futures::pin_mut!(events);

        while let Some(event) = events.next().await {
            match event {
                PipelineEvent::Data(mut carrier) => {
                    let report = last_report.lock().unwrap_or_else(|e| e.into_inner()).take();
                    let message = match report {
                        Some(details) => {
                            self.write_minified(&mut carrier).await?;
                            stats.add_minified(&details);
                            let message = format!(
                                "{}: {:.1}% saved",
                                details.name,
                                details.stats.efficiency * 100.0
                            );
                            if self.config.json_output {
                                JsonMessage::FileComplete {
                                    path: carrier.path.clone(),
                                    details,
                                }
                                .emit();
                            }
                            message
                        }
                        None => {
                            self.copy_passthrough(&carrier).await?;
                            stats.add_passed_through();
                            if self.config.json_output {
                                JsonMessage::FilePassthrough {
                                    path: carrier.path.clone(),
                                }
                                .emit();
                            }
                            format!("{}: empty, passed through", carrier.name())
                        }
                    };
                    progress.update(&message);
                }
                PipelineEvent::Error { name, error } => {
                    error!("Failed to minify {}: {}", name, error);
                    stats.add_error();
                    if self.config.json_output {
                        JsonMessage::FileError {
                            name: name.clone(),
                            message: error.to_string(),
                        }
                        .emit();
                    }
                    progress.update(&format!("{}: error", name));
                }
            }
        }

        progress.finish(&stats.format_summary());
        self.finish(&stats, started);

        Ok(stats)
    }

    fn log_mode(&self) {
        match self.config.output_path {
            Some(ref output_path) => info!("Output directory: {}", output_path.display()),
            None => info!("Mode: Replace files in place"),
        }
        if let Some(ref suffix) = self.config.suffix {
            info!("Output suffix: {}", suffix);
        }
        if self.config.options.source_map {
            info!("Source maps: enabled");
        }
        if !self.config.buffer {
            info!("Reading files as streams");
        }
        if self.config.dry_run {
            info!("Dry run mode: No files will be written");
        }
    }

    async fn write_minified(&self, carrier: &mut FileCarrier) -> Result<()> {
        let dest = FileManager::output_path(
            carrier,
            self.config.output_path.as_deref(),
            self.config.suffix.as_deref(),
        );

        if self.config.dry_run {
            debug!("Dry run: would write {}", dest.display());
            return Ok(());
        }

        let written = FileManager::write_carrier(carrier, &dest).await?;
        debug!("Wrote {} ({})", dest.display(), FileManager::format_size(written));
        Ok(())
    }

    /// Empty inputs are mirrored into the output directory unchanged
    async fn copy_passthrough(&self, carrier: &FileCarrier) -> Result<()> {
        if self.config.dry_run || self.config.output_path.is_none() {
            return Ok(());
        }

        let dest = FileManager::output_path(
            carrier,
            self.config.output_path.as_deref(),
            self.config.suffix.as_deref(),
        );
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(&carrier.path, &dest)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to copy {}: {}", carrier.path.display(), e))?;
        Ok(())
    }

    fn finish(&self, stats: &RunStats, started: Instant) {
        let duration = started.elapsed().as_secs_f64();

        if self.config.json_output {
            JsonMessage::complete(stats, duration).emit();
        }

        info!("=== Minification Complete ===");
        info!("Files processed: {}", stats.files_processed);
        info!("Files minified: {}", stats.files_minified);
        info!("Files passed through: {}", stats.files_passed_through);
        info!("Warnings: {}", stats.warnings);
        info!("Errors: {}", stats.errors);
        info!("Bytes saved: {}", FileManager::format_size(stats.total_bytes_saved));
        info!("Average reduction: {:.2}%", stats.overall_reduction_percent());
        info!("Duration: {:.2}s", duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use tempfile::TempDir;

    const FIXTURE: &str = include_str!("../tests/fixtures/test.css");

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("pages")).unwrap();
        std::fs::write(dir.path().join("test.css"), FIXTURE).unwrap();
        std::fs::write(dir.path().join("pages/empty.css"), "").unwrap();
        std::fs::write(dir.path().join("pages/broken.css"), "@import url(/some/fake/file);").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_run_into_output_directory() {
        let input = tree();
        let output = TempDir::new().unwrap();
        let config = Config {
            output_path: Some(output.path().to_path_buf()),
            suffix: Some(".min".to_string()),
            ..Default::default()
        };

        let stats = CssOptimizer::new(input.path(), config).unwrap().run().await.unwrap();

        assert_eq!(stats.files_processed, 3);
        assert_eq!(stats.files_minified, 1);
        assert_eq!(stats.files_passed_through, 1);
        assert_eq!(stats.errors, 1);

        let minified = std::fs::read_to_string(output.path().join("test.min.css")).unwrap();
        assert_eq!(minified, "p{text-align:center;color:green}");
        assert!(output.path().join("pages/empty.min.css").exists());
        assert!(!output.path().join("pages/broken.min.css").exists());
        // Sources untouched
        assert_eq!(std::fs::read_to_string(input.path().join("test.css")).unwrap(), FIXTURE);
    }

    #[tokio::test]
    async fn test_in_place_with_source_maps() {
        let input = TempDir::new().unwrap();
        std::fs::write(input.path().join("test.css"), FIXTURE).unwrap();
        let config = Config {
            options: Options::new().source_map(true),
            ..Default::default()
        };

        let stats = CssOptimizer::new(input.path(), config).unwrap().run().await.unwrap();
        assert_eq!(stats.files_minified, 1);

        let written = std::fs::read_to_string(input.path().join("test.css")).unwrap();
        assert!(written.starts_with("p{text-align:center;color:green}"));
        assert!(written.contains("sourceMappingURL=test.css.map"));
        assert!(input.path().join("test.css.map").exists());
    }

    #[tokio::test]
    async fn test_streamed_run_fails_every_non_empty_file() {
        let input = tree();
        let config = Config {
            buffer: false,
            dry_run: true,
            ..Default::default()
        };

        let stats = CssOptimizer::new(input.path(), config).unwrap().run().await.unwrap();
        assert_eq!(stats.errors, 2);
        assert_eq!(stats.files_passed_through, 1);
        assert_eq!(stats.files_minified, 0);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let input = tree();
        let config = Config {
            dry_run: true,
            ..Default::default()
        };

        CssOptimizer::new(input.path(), config).unwrap().run().await.unwrap();
        assert_eq!(std::fs::read_to_string(input.path().join("test.css")).unwrap(), FIXTURE);
    }
}
