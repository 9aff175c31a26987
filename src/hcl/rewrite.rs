use regex::{NoExpand, Regex};

use crate::config::MigrationConfig;
use crate::error::{AppError, Result};

const DEFAULT_INDENT: &str = "  ";

/// Why a block that mentions the legacy source was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The legacy source sits behind a comment marker, or the whole block does.
    CommentedOut,
    /// A nested block or interpolation shares the source line, or a version
    /// pin sits past the point where the body was cut short.
    NestedBlock,
}

/// Result of rewriting one block body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    /// No live legacy source in the body.
    Untouched,
    /// Legacy source present but the block was left unchanged.
    Skipped(SkipReason),
    /// The new body text.
    Rewritten(String),
}

/// Swaps the legacy module source for the canonical one and pins its version.
pub struct SourceRewriter {
    legacy: Regex,
    version_pin: Regex,
    source_line: String,
    version_line: String,
}

impl SourceRewriter {
    pub fn new(
        legacy_source: &str,
        canonical_source: &str,
        canonical_version: &str,
    ) -> Result<Self> {
        if legacy_source.is_empty() {
            return Err(AppError::Config("Legacy source must not be empty".to_string()));
        }

        let legacy = Regex::new(&format!(
            r#"\bsource\s*=\s*"{}""#,
            regex::escape(legacy_source)
        ))
        .map_err(|e| AppError::Config(format!("Invalid legacy source pattern: {e}")))?;

        let version_pin = Regex::new(r#"(?:^|\s)version\s*=\s*(?:"[^"]*"|[^\s"{]\S*)"#)
            .map_err(|e| AppError::Config(format!("Invalid version pattern: {e}")))?;

        Ok(Self {
            legacy,
            version_pin,
            source_line: format!("source = \"{canonical_source}\""),
            version_line: format!("version = \"{canonical_version}\""),
        })
    }

    pub fn from_config(config: &MigrationConfig) -> Result<Self> {
        Self::new(
            &config.legacy_source,
            &config.canonical_source,
            &config.canonical_version,
        )
    }

    /// Rewrite a block body (the text between `{` and `}`).
    ///
    /// Calling this on its own output returns `Rewrite::Untouched`.
    pub fn rewrite(&self, body: &str) -> Rewrite {
        self.rewrite_body(body, true)
    }

    /// Rewrite a body that was cut short at a `}` belonging to a nested map,
    /// interpolation or string. The last line runs on past the cut, so it is
    /// never touched and the closer stays where it is.
    pub fn rewrite_partial(&self, body: &str) -> Rewrite {
        self.rewrite_body(body, false)
    }

    /// Whether any line of `text` carries a live version pin.
    pub fn has_version_pin(&self, text: &str) -> bool {
        text.lines()
            .any(|line| self.version_pin.is_match(code_of(line)))
    }

    fn rewrite_body(&self, body: &str, complete: bool) -> Rewrite {
        let lines: Vec<&str> = body.split('\n').collect();

        let mut live_reference = false;
        for line in &lines {
            let comment = comment_start(line);
            for m in self.legacy.find_iter(line) {
                match comment {
                    Some(pos) if pos <= m.start() => {
                        return Rewrite::Skipped(SkipReason::CommentedOut);
                    }
                    _ => live_reference = true,
                }
            }
        }

        if !live_reference {
            return Rewrite::Untouched;
        }

        let last = lines.len() - 1;
        let nested_on_source_line = lines.iter().enumerate().any(|(i, line)| {
            let code = code_of(line);
            self.legacy.is_match(code) && (code.contains('{') || (!complete && i == last))
        });
        if nested_on_source_line {
            return Rewrite::Skipped(SkipReason::NestedBlock);
        }

        Rewrite::Rewritten(self.apply(&lines, complete))
    }

    fn apply(&self, lines: &[&str], complete: bool) -> String {
        let mut out: Vec<String> = Vec::with_capacity(lines.len() + 2);
        let mut pinned = false;

        for (i, raw) in lines.iter().enumerate() {
            let (line, cr) = match raw.strip_suffix('\r') {
                Some(line) => (line, "\r"),
                None => (*raw, ""),
            };
            let (code, comment) = line.split_at(comment_start(line).unwrap_or(line.len()));

            let has_pin = self.version_pin.is_match(code);
            let has_source = self.legacy.is_match(code);
            let cut_line = !complete && i == lines.len() - 1;
            if cut_line || (!has_pin && !has_source) {
                out.push(raw.to_string());
                continue;
            }

            // Content sharing the header's line moves onto its own line.
            let indent = if i == 0 {
                out.push(cr.to_string());
                DEFAULT_INDENT
            } else {
                leading_whitespace(line)
            };

            let mut code = code.to_string();
            if has_pin {
                code = self.version_pin.replace_all(&code, "").into_owned();
            }
            if has_source {
                code = self
                    .legacy
                    .replace_all(&code, NoExpand(&self.source_line))
                    .into_owned();
            }

            let code = code.trim();
            let comment = comment.trim();
            let rebuilt = match (code.is_empty(), comment.is_empty()) {
                (true, true) => None,
                (false, true) => Some(format!("{indent}{code}{cr}")),
                (true, false) => Some(format!("{indent}{comment}{cr}")),
                (false, false) => Some(format!("{indent}{code} {comment}{cr}")),
            };
            if let Some(rebuilt) = rebuilt {
                out.push(rebuilt);
            }

            if has_source && !pinned {
                out.push(format!("{indent}{}{cr}", self.version_line));
                pinned = true;
            }
        }

        // Keep the closing brace off the last attribute's line.
        if complete && out.last().is_some_and(|line| !line.trim().is_empty()) {
            out.push(String::new());
        }

        out.join("\n")
    }
}

/// Byte offset where a comment starts on this line, ignoring markers inside strings.
fn comment_start(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'#' => return Some(i),
            b'/' if matches!(bytes.get(i + 1), Some(b'/') | Some(b'*')) => return Some(i),
            _ => {}
        }
    }

    None
}

fn code_of(line: &str) -> &str {
    &line[..comment_start(line).unwrap_or(line.len())]
}

fn leading_whitespace(line: &str) -> &str {
    let end = line.len() - line.trim_start().len();
    &line[..end]
}
