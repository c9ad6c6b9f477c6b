//! # File Management Module
//!
//! Questo modulo è il lato host della pipeline: trova i fogli di stile,
//! li carica come carrier e scrive su disco i carrier emessi.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva di file `.css` in una directory
//! - Caricamento carrier in modalità buffer o stream
//! - Caricamento della source map affiancata (`<file>.map`) se richiesta
//! - Calcolo path di output (in-place, output directory, suffisso)
//! - Scrittura del contenuto e della source map con `sourceMappingURL`
//! - Formattazione human-readable delle dimensioni
//!
//! ## Esempio:
//! ```rust,no_run
//! use css_minify_stage::file_manager::{FileManager, LoadMode};
//! use std::path::Path;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let dir = Path::new("styles");
//! for file in FileManager::find_css_files(dir)? {
//!     let carrier = FileManager::load_carrier(&file, dir, LoadMode::Buffer, false).await?;
//!     println!("{} ({} bytes)", carrier.name(), carrier.bytes().map_or(0, |b| b.len()));
//! }
//! # Ok(())
//! # }
//! ```

use crate::{carrier::FileCarrier, source_map};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

/// How file contents are handed to the stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    Buffer,
    Stream,
}

/// Manages stylesheet discovery and carrier I/O
pub struct FileManager;

impl FileManager {
    /// Find all stylesheets below a directory, sorted for a stable run order
    pub fn find_css_files(css_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = WalkDir::new(css_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| Self::is_css(p))
            .collect();

        files.sort();
        Ok(files)
    }

    /// Check if a file is a stylesheet
    pub fn is_css(path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("css"))
            .unwrap_or(false)
    }

    /// Read a file into a carrier; empty files become empty carriers
    pub async fn load_carrier(
        path: &Path,
        base: &Path,
        mode: LoadMode,
        with_source_map: bool,
    ) -> Result<FileCarrier> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read metadata for {}: {}", path.display(), e))?;

        let carrier = if metadata.is_dir() || metadata.len() == 0 {
            FileCarrier::empty(path)
        } else {
            match mode {
                LoadMode::Buffer => {
                    let bytes = fs::read(path)
                        .await
                        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
                    FileCarrier::buffered(path, bytes)
                }
                LoadMode::Stream => {
                    let file = fs::File::open(path)
                        .await
                        .map_err(|e| anyhow::anyhow!("Failed to open {}: {}", path.display(), e))?;
                    FileCarrier::streamed(path, file)
                }
            }
        };
        let mut carrier = carrier.with_base(base);

        if with_source_map {
            let map_path = Self::map_path(path);
            if map_path.exists() {
                let json = fs::read_to_string(&map_path).await?;
                let map = source_map::from_json(&json)
                    .map_err(|e| anyhow::anyhow!("Invalid source map {}: {}", map_path.display(), e))?;
                debug!("Loaded prior source map: {}", map_path.display());
                carrier.source_map = Some(map);
            }
        }

        Ok(carrier)
    }

    /// Sibling source map location, `<file>.map`
    pub fn map_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(".map");
        PathBuf::from(name)
    }

    /// Where a carrier is written: in place, or mirrored into `output_dir`
    pub fn output_path(carrier: &FileCarrier, output_dir: Option<&Path>, suffix: Option<&str>) -> PathBuf {
        let target = match output_dir {
            Some(dir) => dir.join(carrier.relative()),
            None => carrier.path.clone(),
        };

        match suffix {
            Some(suffix) => {
                let stem = target
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let filename = match target.extension() {
                    Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
                    None => format!("{}{}", stem, suffix),
                };
                target.with_file_name(filename)
            }
            None => target,
        }
    }

    /// Write a buffered carrier, plus its source map when it has one
    pub async fn write_carrier(carrier: &mut FileCarrier, dest: &Path) -> Result<u64> {
        let Some(bytes) = carrier.bytes() else {
            return Err(anyhow::anyhow!("Cannot write {}: content is not buffered", carrier.path.display()));
        };
        let mut contents = bytes.to_vec();

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to create parent directories for {}: {}", dest.display(), e))?;
        }

        if let Some(map) = carrier.source_map.as_mut() {
            let map_path = Self::map_path(dest);
            let value = source_map::to_value(map)?;
            fs::write(&map_path, serde_json::to_string(&value)?).await?;

            let map_name = map_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            contents.extend_from_slice(format!("\n/*# sourceMappingURL={} */", map_name).as_bytes());
            debug!("Wrote source map: {}", map_path.display());
        }

        fs::write(dest, &contents)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", dest.display(), e))?;
        Ok(contents.len() as u64)
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Calculate percentage reduction
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_css_files() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b.css"), "b{}").unwrap();
        std::fs::write(dir.path().join("nested/a.CSS"), "a{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let files = FileManager::find_css_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| FileManager::is_css(f)));
    }

    #[tokio::test]
    async fn test_load_modes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.css");
        let empty = dir.path().join("empty.css");
        std::fs::write(&path, "a{color:red}").unwrap();
        std::fs::write(&empty, "").unwrap();

        let buffered = FileManager::load_carrier(&path, dir.path(), LoadMode::Buffer, false).await.unwrap();
        assert_eq!(buffered.text().as_deref(), Some("a{color:red}"));
        assert_eq!(buffered.relative(), PathBuf::from("a.css"));

        let streamed = FileManager::load_carrier(&path, dir.path(), LoadMode::Stream, false).await.unwrap();
        assert!(streamed.is_stream());

        let null = FileManager::load_carrier(&empty, dir.path(), LoadMode::Buffer, false).await.unwrap();
        assert!(null.is_null());
    }

    #[tokio::test]
    async fn test_load_sibling_source_map() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.css");
        std::fs::write(&path, "a{color:red}").unwrap();
        std::fs::write(
            dir.path().join("a.css.map"),
            r#"{"version":3,"sources":["a.scss"],"names":[],"mappings":"AAAA"}"#,
        )
        .unwrap();

        let carrier = FileManager::load_carrier(&path, dir.path(), LoadMode::Buffer, true).await.unwrap();
        assert!(carrier.source_map.is_some());

        let carrier = FileManager::load_carrier(&path, dir.path(), LoadMode::Buffer, false).await.unwrap();
        assert!(carrier.source_map.is_none());
    }

    #[test]
    fn test_output_path() {
        let carrier = FileCarrier::buffered("/src/css/theme/site.css", "a{}").with_base("/src/css");

        assert_eq!(
            FileManager::output_path(&carrier, None, None),
            PathBuf::from("/src/css/theme/site.css")
        );
        assert_eq!(
            FileManager::output_path(&carrier, Some(Path::new("/dist")), None),
            PathBuf::from("/dist/theme/site.css")
        );
        assert_eq!(
            FileManager::output_path(&carrier, Some(Path::new("/dist")), Some(".min")),
            PathBuf::from("/dist/theme/site.min.css")
        );
    }

    #[tokio::test]
    async fn test_write_carrier_with_map() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out").join("a.min.css");
        let mut carrier = FileCarrier::buffered("/a.css", "a{color:red}").with_source_map(
            source_map::from_json(r#"{"version":3,"sources":["a.css"],"names":[],"mappings":"AAAA"}"#)
                .unwrap(),
        );

        FileManager::write_carrier(&mut carrier, &dest).await.unwrap();

        let written = std::fs::read_to_string(&dest).unwrap();
        assert!(written.starts_with("a{color:red}"));
        assert!(written.ends_with("/*# sourceMappingURL=a.min.css.map */"));
        assert!(dir.path().join("out").join("a.min.css.map").exists());
    }

    #[tokio::test]
    async fn test_write_refuses_unbuffered() {
        let dir = TempDir::new().unwrap();
        let mut carrier = FileCarrier::empty("/d");
        assert!(FileManager::write_carrier(&mut carrier, &dir.path().join("d")).await.is_err());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(FileManager::format_size(512), "512 B");
        assert_eq!(FileManager::format_size(2048), "2.00 KB");
    }

    #[test]
    fn test_calculate_reduction() {
        assert_eq!(FileManager::calculate_reduction(0, 0), 0.0);
        assert_eq!(FileManager::calculate_reduction(200, 50), 75.0);
    }
}
