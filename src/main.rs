//! # CSS Minify - Main Entry Point
//!
//! Questo è il punto di ingresso del tool da riga di comando.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Merge tra file di configurazione e flag da riga di comando
//! - Avvio della run sulla directory indicata
//!
//! ## Esempio di utilizzo:
//! ```bash
//! css-minify ./styles --output ./dist --suffix .min --source-map --verbose
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use css_minify_stage::{Config, CssOptimizer};

#[derive(Parser)]
#[command(name = "css-minify")]
#[command(about = "Minify stylesheets in place or into an output directory")]
struct Args {
    /// Directory containing stylesheets to minify
    css_directory: PathBuf,

    /// Configuration file (JSON); defaults to the user config directory
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory for minified files (if not specified, replace originals in place)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Suffix inserted before the extension of written files, e.g. ".min"
    #[arg(short, long)]
    suffix: Option<String>,

    /// Optimization level (0 = compact printing only, 1-2 = full optimization)
    #[arg(short, long)]
    level: Option<u8>,

    /// Emit and chain source maps
    #[arg(long)]
    source_map: bool,

    /// Do not inline local @import rules
    #[arg(long)]
    no_inline: bool,

    /// Log per-file statistics
    #[arg(long)]
    debug: bool,

    /// Hand files to the stage as streams instead of buffers
    #[arg(long)]
    no_buffer: bool,

    /// Dry run - don't actually write files
    #[arg(long)]
    dry_run: bool,

    /// Output progress and status as JSON lines on stdout
    #[arg(long)]
    json: bool,

    /// Write the effective configuration to the config file and exit
    #[arg(long)]
    save_config: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    if !args.css_directory.is_dir() {
        return Err(anyhow::anyhow!("CSS directory does not exist: {}", args.css_directory.display()));
    }

    let config_path = args.config.clone().or_else(Config::default_path);
    let mut config = match config_path {
        Some(ref path) => Config::from_file(path).await?,
        None => Config::default(),
    };

    if let Some(ref output_dir) = args.output {
        if !output_dir.exists() {
            std::fs::create_dir_all(output_dir)?;
            info!("Created output directory: {}", output_dir.display());
        }
        config.output_path = Some(output_dir.clone());
    }
    if args.suffix.is_some() {
        config.suffix = args.suffix.clone();
    }
    if let Some(level) = args.level {
        config.options.engine.insert("level".to_string(), level.into());
    }
    if args.no_inline {
        config.options.engine.insert("inline".to_string(), serde_json::json!(["none"]));
    }
    config.options.source_map |= args.source_map;
    config.options.debug |= args.debug;
    config.buffer &= !args.no_buffer;
    config.dry_run |= args.dry_run;
    config.json_output |= args.json;

    if args.save_config {
        let path = config_path.ok_or_else(|| anyhow::anyhow!("Could not determine a config file location"))?;
        config.validate()?;
        config.save_to_file(&path).await?;
        info!("Saved configuration to {}", path.display());
        return Ok(());
    }

    let optimizer = CssOptimizer::new(&args.css_directory, config)?;
    let stats = optimizer.run().await?;

    if stats.errors > 0 {
        return Err(anyhow::anyhow!("{} stylesheet(s) failed to minify", stats.errors));
    }

    Ok(())
}
