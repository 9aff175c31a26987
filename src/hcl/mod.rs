//! Shallow, pattern-based handling of HCL configuration text.
//!
//! Nothing here builds a syntax tree. Blocks are found by matching their
//! header and the first closing brace after it, and rewrites work line by line
//! inside a block body.

pub mod block;
pub mod lex;
pub mod rewrite;

pub use block::{BlockExtractor, ShallowExtractor, StructuredBlock};
pub use rewrite::{Rewrite, SkipReason, SourceRewriter};
