pub mod discover;

use std::path::{Path, PathBuf};

use crate::config::MigrationConfig;
use crate::error::Result;
use crate::hcl::{
    lex, BlockExtractor, Rewrite, ShallowExtractor, SkipReason, SourceRewriter, StructuredBlock,
};

/// Result of migrating one file's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRewrite {
    pub text: String,
    pub changed: bool,
    pub rewritten_blocks: usize,
    pub skipped_blocks: usize,
}

/// Whether a tree pass writes its results back to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Apply,
    DryRun,
}

/// Summary of a pass over a directory tree.
#[derive(Debug, Default, Clone)]
pub struct TreeReport {
    /// Candidate files found, whether or not they changed.
    pub scanned: usize,
    pub changed_files: Vec<PathBuf>,
}

/// Applies the source rewrite to every matching block of every config file.
pub struct Migrator {
    extractor: Box<dyn BlockExtractor>,
    rewriter: SourceRewriter,
    extension: String,
}

impl Migrator {
    pub fn new(
        extractor: Box<dyn BlockExtractor>,
        rewriter: SourceRewriter,
        extension: &str,
    ) -> Self {
        Self {
            extractor,
            rewriter,
            extension: extension.to_string(),
        }
    }

    pub fn from_config(config: &MigrationConfig) -> Result<Self> {
        Ok(Self::new(
            Box::new(ShallowExtractor::new(&config.block_type)?),
            SourceRewriter::from_config(config)?,
            &config.file_extension,
        ))
    }

    /// Candidate configuration files under `root`.
    pub fn discover(&self, root: &Path) -> Vec<PathBuf> {
        discover::find_config_files(root, &self.extension)
    }

    /// Rewrite every matching block in `text`. Text outside rewritten blocks
    /// is copied through byte for byte.
    pub fn migrate_text(&self, text: &str) -> FileRewrite {
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        let mut rewritten_blocks = 0;
        let mut skipped_blocks = 0;

        for block in self.extractor.blocks(text) {
            match self.rewrite_block(text, &block) {
                Rewrite::Untouched => {}
                Rewrite::Skipped(reason) => {
                    tracing::debug!(label = block.label, reason = ?reason, "Leaving block unchanged");
                    skipped_blocks += 1;
                }
                Rewrite::Rewritten(body) => {
                    out.push_str(&text[cursor..block.span.start]);
                    out.push_str(block.header);
                    out.push_str(&body);
                    out.push_str(block.closer);
                    cursor = block.span.end;
                    rewritten_blocks += 1;
                }
            }
        }

        if rewritten_blocks == 0 {
            return FileRewrite {
                text: text.to_string(),
                changed: false,
                rewritten_blocks,
                skipped_blocks,
            };
        }

        out.push_str(&text[cursor..]);
        let changed = out != text;
        FileRewrite {
            text: out,
            changed,
            rewritten_blocks,
            skipped_blocks,
        }
    }

    fn rewrite_block(&self, text: &str, block: &StructuredBlock<'_>) -> Rewrite {
        let open = block.span.start + block.header.len() - 1;
        let cut = block.span.end - block.closer.len();
        let close = lex::closing_brace(text, open);
        let complete = close == Some(cut);

        let rewrite = if complete {
            self.rewriter.rewrite(block.body)
        } else {
            self.rewriter.rewrite_partial(block.body)
        };
        if !matches!(rewrite, Rewrite::Rewritten(_)) {
            return rewrite;
        }

        if !lex::is_live(text, block.span.start) {
            return Rewrite::Skipped(SkipReason::CommentedOut);
        }

        if !complete {
            // The body's last line and everything up to the real closer were
            // left as they are; a pin there would survive next to the new one.
            let last_line = block.body.rfind('\n').map_or(0, |i| i + 1);
            let from = open + 1 + last_line;
            let to = close.unwrap_or(text.len());
            match text.get(from..to) {
                Some(rest) if !self.rewriter.has_version_pin(rest) => {}
                _ => return Rewrite::Skipped(SkipReason::NestedBlock),
            }
        }

        rewrite
    }

    /// Migrate a single file in place. Returns whether it changed.
    ///
    /// Files that are not valid UTF-8 are left alone.
    pub async fn migrate_file(&self, path: &Path, mode: WriteMode) -> Result<bool> {
        let bytes = tokio::fs::read(path).await?;
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => {
                tracing::warn!(path = %path.display(), "Skipping file that is not valid UTF-8");
                return Ok(false);
            }
        };

        let result = self.migrate_text(&text);
        if result.skipped_blocks > 0 {
            tracing::warn!(
                path = %path.display(),
                skipped = result.skipped_blocks,
                "Left commented or ambiguous blocks unchanged"
            );
        }
        if !result.changed {
            return Ok(false);
        }

        let dry_run = mode == WriteMode::DryRun;
        if !dry_run {
            tokio::fs::write(path, &result.text).await?;
        }
        tracing::info!(
            path = %path.display(),
            blocks = result.rewritten_blocks,
            dry_run,
            "Updated module source"
        );
        Ok(true)
    }

    /// Migrate every candidate file under `root`.
    pub async fn migrate_tree(&self, root: &Path, mode: WriteMode) -> Result<TreeReport> {
        let files = self.discover(root);
        self.migrate_files(&files, mode).await
    }

    pub async fn migrate_files(&self, files: &[PathBuf], mode: WriteMode) -> Result<TreeReport> {
        let mut report = TreeReport {
            scanned: files.len(),
            changed_files: Vec::new(),
        };

        for file in files {
            if self.migrate_file(file, mode).await? {
                report.changed_files.push(file.clone());
            }
        }

        Ok(report)
    }
}
