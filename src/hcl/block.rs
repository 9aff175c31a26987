use std::ops::Range;

use regex::Regex;

use crate::error::{AppError, Result};

/// A labeled block found in configuration text, e.g. `module "dns" { ... }`.
///
/// All fields borrow from the scanned text. `header`, `body` and `closer`
/// concatenate back to exactly `&text[span]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredBlock<'t> {
    pub label: &'t str,
    pub header: &'t str,
    pub body: &'t str,
    pub closer: &'t str,
    pub span: Range<usize>,
}

/// Finds structured blocks in configuration text.
///
/// Extraction never fails: malformed input just yields fewer blocks.
pub trait BlockExtractor: Send + Sync {
    fn blocks<'a>(
        &'a self,
        text: &'a str,
    ) -> Box<dyn Iterator<Item = StructuredBlock<'a>> + 'a>;
}

/// Pattern-based extractor that does not balance braces.
///
/// The body runs from the opening brace to the first `}` that follows it, so a
/// nested `{ ... }` inside the body ends the match early.
pub struct ShallowExtractor {
    pattern: Regex,
}

impl ShallowExtractor {
    pub fn new(block_type: &str) -> Result<Self> {
        let valid = !block_type.is_empty()
            && block_type
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(AppError::Config(format!("Invalid block type: {block_type:?}")));
        }

        let pattern = format!(
            r#"(?s)(\b{}\s*"([^"]*)"\s*\{{)([^}}]*)(\}})"#,
            regex::escape(block_type)
        );
        let pattern = Regex::new(&pattern)
            .map_err(|e| AppError::Config(format!("Invalid block pattern: {e}")))?;

        Ok(Self { pattern })
    }
}

impl BlockExtractor for ShallowExtractor {
    fn blocks<'a>(
        &'a self,
        text: &'a str,
    ) -> Box<dyn Iterator<Item = StructuredBlock<'a>> + 'a> {
        Box::new(self.pattern.captures_iter(text).filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(StructuredBlock {
                label: caps.get(2)?.as_str(),
                header: caps.get(1)?.as_str(),
                body: caps.get(3)?.as_str(),
                closer: caps.get(4)?.as_str(),
                span: whole.range(),
            })
        }))
    }
}
