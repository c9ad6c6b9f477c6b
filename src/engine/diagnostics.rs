//! Diagnostics for problems the parser silently recovers from.
//!
//! Unclosed blocks and unterminated comments never abort minification, but
//! they usually mean trailing content got dropped, so they surface as warnings.
//! Stray `}` and invalid rules are already reported by the parser itself.
//! Declarations with no value are dropped from the stylesheet with a warning.

use lightningcss::declaration::DeclarationBlock;
use lightningcss::properties::custom::{CustomPropertyName, TokenList};
use lightningcss::properties::Property;
use lightningcss::visit_types;
use lightningcss::visitor::{VisitTypes, Visitor};
use std::convert::Infallible;

/// Scan `text` and return one warning per structural problem found
pub fn scan(text: &str) -> Vec<String> {
    let mut warnings = Vec::new();
    // Byte offsets of the currently open `{`, innermost last
    let mut open: Vec<usize> = Vec::new();
    let mut quote: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        if let Some(q) = quote {
            match c {
                '\\' => {
                    chars.next();
                }
                '\n' => quote = None,
                _ if c == q => quote = None,
                _ => {}
            }
            continue;
        }

        match c {
            '"' | '\'' => quote = Some(c),
            '\\' => {
                chars.next();
            }
            '/' if matches!(chars.peek(), Some((_, '*'))) => {
                chars.next();
                let mut closed = false;
                let mut prev = '\0';
                for (_, inner) in chars.by_ref() {
                    if prev == '*' && inner == '/' {
                        closed = true;
                        break;
                    }
                    prev = inner;
                }
                if !closed {
                    warnings.push("Unterminated comment at end of input. Ignoring.".to_string());
                }
            }
            '{' => open.push(offset),
            '}' => {
                open.pop();
            }
            _ => {}
        }
    }

    if let Some(&offset) = open.last() {
        warnings.push(format!(
            "Missing '}}' after '{}'. Ignoring.",
            prelude_before(text, offset)
        ));
    }

    warnings
}

/// Removes declarations whose value is empty, e.g. `color:`
#[derive(Debug, Default)]
pub struct EmptyValues {
    pub warnings: Vec<String>,
}

impl<'i> Visitor<'i> for EmptyValues {
    type Error = Infallible;

    fn visit_types(&self) -> VisitTypes {
        visit_types!(PROPERTIES)
    }

    fn visit_declaration_block(&mut self, decls: &mut DeclarationBlock<'i>) -> Result<(), Self::Error> {
        for list in [&mut decls.declarations, &mut decls.important_declarations] {
            list.retain(|property| match empty_property_name(property) {
                Some(name) => {
                    self.warnings
                        .push(format!("Empty value for property '{}'. Ignoring.", name));
                    false
                }
                None => true,
            });
        }
        Ok(())
    }
}

/// Name of a known or unknown property declared without a value; custom properties may be empty
fn empty_property_name(property: &Property<'_>) -> Option<String> {
    match property {
        Property::Unparsed(unparsed) if is_blank(&unparsed.value) => {
            Some(unparsed.property_id.name().to_string())
        }
        Property::Custom(custom) if is_blank(&custom.value) => match custom.name {
            CustomPropertyName::Unknown(ref ident) => Some(ident.0.to_string()),
            CustomPropertyName::Custom(_) => None,
        },
        _ => None,
    }
}

fn is_blank(value: &TokenList<'_>) -> bool {
    value.0.iter().all(|token| token.is_whitespace())
}

/// The selector or at-rule prelude that precedes the `{` at `offset`
fn prelude_before(text: &str, offset: usize) -> &str {
    let head = &text[..offset];
    let start = head
        .rfind(['{', '}', ';'])
        .map(|i| i + 1)
        .unwrap_or(0);
    head[start..].trim()
}
