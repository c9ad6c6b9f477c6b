//! Default minification engine, built on [`lightningcss`].

use super::diagnostics::{self, EmptyValues};
use super::imports::ImportSources;
use super::{EngineOutput, EngineSettings, EngineStats, InlineScope, MinifyEngine, SourceInput};
use crate::config::Options;
use lightningcss::bundler::{BundleErrorKind, Bundler};
use lightningcss::error::Error as CssError;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::visitor::Visit;
use parcel_sourcemap::SourceMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::debug;

/// CSS minifier backed by lightningcss
#[derive(Debug, Clone, Copy, Default)]
pub struct LightningEngine;

impl LightningEngine {
    pub fn new() -> Self {
        Self
    }

    fn process(
        &self,
        input: SourceInput<'_>,
        settings: &EngineSettings,
        warnings: &mut Vec<String>,
    ) -> Result<(String, Option<SourceMap>), String> {
        let name = input.source_name();
        let entry = PathBuf::from(&name);

        // Declared before the parser state that borrows from it
        let sources = match settings.inline {
            InlineScope::Local => Some(ImportSources::load(&entry, input.text, settings.rebase_to.as_deref())),
            InlineScope::None => None,
        };

        let recovered = Arc::new(RwLock::new(Vec::new()));
        let parser_options = ParserOptions {
            filename: name.clone(),
            error_recovery: true,
            warnings: Some(Arc::clone(&recovered)),
            ..ParserOptions::default()
        };

        let mut stylesheet = match sources {
            Some(ref sources) => {
                let mut bundler = Bundler::new(sources, None, parser_options);
                let bundled = bundler.bundle(&entry).map_err(|e| describe_bundle(&e));
                warnings.extend(sources.take_warnings());
                bundled?
            }
            None => StyleSheet::parse(input.text, parser_options).map_err(|e| describe(&e))?,
        };

        let mut empty_values = EmptyValues::default();
        stylesheet
            .visit(&mut empty_values)
            .unwrap_or_else(|never| match never {});

        if settings.level > 0 {
            stylesheet
                .minify(MinifyOptions::default())
                .map_err(|e| describe(&e))?;
        }

        let mut source_map = if settings.source_map {
            let mut map = SourceMap::new("/");
            for (index, source) in stylesheet.sources.iter().enumerate() {
                map.add_source(source);
                if settings.source_map_inline_sources {
                    let content = sources
                        .as_ref()
                        .and_then(|s| s.content(Path::new(source)))
                        .unwrap_or(input.text);
                    map.set_source_content(index, content)
                        .map_err(|e| format!("Could not embed source of {}: {:?}", source, e))?;
                }
            }
            Some(map)
        } else {
            None
        };

        let printed = stylesheet
            .to_css(PrinterOptions {
                minify: true,
                source_map: source_map.as_mut(),
                ..PrinterOptions::default()
            })
            .map_err(|e| describe(&e))?;

        if let Ok(recovered) = recovered.read() {
            warnings.extend(recovered.iter().map(|w| format!("{}. Ignoring.", describe(w))));
        }
        warnings.extend(empty_values.warnings);

        Ok((printed.code, source_map))
    }
}

impl MinifyEngine for LightningEngine {
    fn minify(&self, input: SourceInput<'_>, options: &Options) -> EngineOutput {
        let started = Instant::now();
        let settings = EngineSettings::from_options(options);
        let mut warnings = diagnostics::scan(input.text);

        let result = self.process(input, &settings, &mut warnings);
        let time_spent = started.elapsed().as_millis() as u64;

        match result {
            Ok((styles, source_map)) => {
                debug!(
                    "lightningcss: {} -> {} bytes in {}ms",
                    input.text.len(),
                    styles.len(),
                    time_spent
                );
                EngineOutput {
                    stats: EngineStats::new(input.text.len(), styles.len(), time_spent),
                    styles,
                    warnings,
                    errors: Vec::new(),
                    source_map,
                }
            }
            Err(error) => EngineOutput {
                styles: String::new(),
                warnings,
                errors: vec![error],
                stats: EngineStats::new(input.text.len(), 0, time_spent),
                source_map: None,
            },
        }
    }
}

fn describe<T: Display>(error: &CssError<T>) -> String {
    match error.loc {
        Some(ref loc) => format!("{} at line {}, column {}", error.kind, loc.line + 1, loc.column),
        None => error.kind.to_string(),
    }
}

/// Resolver failures carry the exact message, everything else gets a location
fn describe_bundle<E: std::error::Error>(error: &CssError<BundleErrorKind<'_, E>>) -> String {
    match error.kind {
        BundleErrorKind::ResolverError(ref e) => e.to_string(),
        _ => describe(error),
    }
}
