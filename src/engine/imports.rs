//! # Import Sources
//!
//! Fornisce al bundler di `lightningcss` il contenuto dei fogli di stile
//! raggiunti dagli `@import`.
//!
//! ## Regole:
//! - Il file di ingresso è servito dal testo in memoria del carrier
//! - Gli import locali sono risolti rispetto al file che li contiene (o a `rebaseTo` per l'ingresso)
//! - Un import locale che non si può leggere è un errore fatale
//! - Gli import remoti restano nell'output come `@import` esterni (warning)
//! - Un file già importato non viene incluso una seconda volta (warning)
//!
//! Il grafo degli import viene caricato tutto prima del bundling, così
//! `read` restituisce sempre testo già posseduto dal provider.

use lightningcss::bundler::{ResolveResult, SourceProvider};
use lightningcss::rules::CssRule;
use lightningcss::stylesheet::{ParserOptions, StyleSheet};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Fatal error for a local import that cannot be read
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Broken @import declaration of \"{url}\"")]
pub struct BrokenImport {
    pub url: String,
}

/// In-memory view of an entry stylesheet and every local file it imports
pub struct ImportSources {
    entry: PathBuf,
    rebase_to: Option<PathBuf>,
    files: HashMap<PathBuf, String>,
    seen: Mutex<HashSet<PathBuf>>,
    warnings: Mutex<Vec<String>>,
}

impl ImportSources {
    /// Load `text` as the entry at `entry`, then every local file reachable through `@import`
    pub fn load(entry: &Path, text: &str, rebase_to: Option<&Path>) -> Self {
        let mut sources = Self {
            entry: entry.to_path_buf(),
            rebase_to: rebase_to.map(Path::to_path_buf),
            files: HashMap::new(),
            seen: Mutex::new(HashSet::from([entry.to_path_buf()])),
            warnings: Mutex::new(Vec::new()),
        };
        sources.files.insert(entry.to_path_buf(), strip_bom(text).to_string());

        let mut attempted = HashSet::new();
        let mut pending = vec![entry.to_path_buf()];
        while let Some(file) = pending.pop() {
            let Some(code) = sources.files.get(&file) else {
                continue;
            };

            for specifier in import_specifiers(code, &file) {
                if is_remote(&specifier) {
                    continue;
                }
                let path = sources.locate(&specifier, &file);
                if sources.files.contains_key(&path) || !attempted.insert(path.clone()) {
                    continue;
                }
                match std::fs::read_to_string(&path) {
                    Ok(content) => {
                        debug!("Loaded @import \"{}\" from {}", specifier, path.display());
                        sources.files.insert(path.clone(), strip_bom(&content).to_string());
                        pending.push(path);
                    }
                    Err(e) => debug!("Cannot read @import \"{}\" ({}): {}", specifier, path.display(), e),
                }
            }
        }

        sources
    }

    /// Source text of a loaded file
    pub fn content(&self, path: &Path) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    /// Warnings raised while resolving imports, in resolution order
    pub fn take_warnings(&self) -> Vec<String> {
        std::mem::take(&mut *lock(&self.warnings))
    }

    fn warn(&self, message: String) {
        lock(&self.warnings).push(message);
    }

    /// Filesystem path an import specifier points at, seen from `originating`
    fn locate(&self, specifier: &str, originating: &Path) -> PathBuf {
        let clean = specifier.split(['?', '#']).next().unwrap_or(specifier);
        let target = Path::new(clean);
        if target.is_absolute() {
            return normalize(target);
        }

        let base = match self.rebase_to {
            Some(ref rebase_to) if originating == self.entry => rebase_to.as_path(),
            _ => originating.parent().unwrap_or_else(|| Path::new("")),
        };
        normalize(&base.join(target))
    }
}

impl SourceProvider for ImportSources {
    type Error = BrokenImport;

    fn read<'a>(&'a self, file: &Path) -> Result<&'a str, Self::Error> {
        self.content(file).ok_or_else(|| BrokenImport {
            url: file.display().to_string(),
        })
    }

    fn resolve(&self, specifier: &str, originating_file: &Path) -> Result<ResolveResult, Self::Error> {
        if is_remote(specifier) {
            self.warn(format!(
                "Skipping remote @import of \"{}\" as resource is not allowed.",
                specifier
            ));
            return Ok(ResolveResult::External(specifier.to_string()));
        }

        let path = self.locate(specifier, originating_file);
        // The bundler needs UTF-8 file names
        if !self.files.contains_key(&path) || path.to_str().is_none() {
            return Err(BrokenImport {
                url: specifier.to_string(),
            });
        }

        if !lock(&self.seen).insert(path.clone()) {
            self.warn(format!(
                "Ignoring local @import of \"{}\" as it has already been imported.",
                specifier
            ));
        }

        Ok(ResolveResult::File(path))
    }
}

/// Urls of the `@import` rules of one stylesheet
fn import_specifiers(code: &str, file: &Path) -> Vec<String> {
    let options = ParserOptions {
        filename: file.to_string_lossy().into_owned(),
        error_recovery: true,
        ..ParserOptions::default()
    };

    match StyleSheet::parse(code, options) {
        Ok(stylesheet) => stylesheet
            .rules
            .0
            .iter()
            .filter_map(|rule| match rule {
                CssRule::Import(import) => Some(import.url.to_string()),
                _ => None,
            })
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn is_remote(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("//")
}

fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
