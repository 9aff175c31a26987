//! Just enough lexing to tell code from strings and comments.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Code,
    Str,
    LineComment,
    BlockComment,
}

/// Walks the bytes of a text, tagging each with the context it belongs to.
///
/// Comment and string delimiters are tagged with the context they open or
/// close. A string left open at the end of a line is closed there.
struct Scanner<'t> {
    bytes: &'t [u8],
    pos: usize,
    context: Context,
    escaped: bool,
}

impl<'t> Scanner<'t> {
    fn new(text: &'t str, start: usize) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: start,
            context: Context::Code,
            escaped: false,
        }
    }
}

impl Iterator for Scanner<'_> {
    type Item = (usize, u8, Context);

    fn next(&mut self) -> Option<Self::Item> {
        let i = self.pos;
        let b = *self.bytes.get(i)?;
        let next = self.bytes.get(i + 1).copied();
        self.pos += 1;

        let tag = match self.context {
            Context::Code => match (b, next) {
                (b'"', _) => {
                    self.context = Context::Str;
                    Context::Str
                }
                (b'#', _) | (b'/', Some(b'/')) => {
                    self.context = Context::LineComment;
                    Context::LineComment
                }
                (b'/', Some(b'*')) => {
                    // Consume the `*` too, so `/*/` does not close itself.
                    self.pos += 1;
                    self.context = Context::BlockComment;
                    Context::BlockComment
                }
                _ => Context::Code,
            },
            Context::Str => {
                if self.escaped {
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == b'"' || b == b'\n' {
                    self.context = Context::Code;
                }
                if b == b'\n' {
                    Context::Code
                } else {
                    Context::Str
                }
            }
            Context::LineComment => {
                if b == b'\n' {
                    self.context = Context::Code;
                    Context::Code
                } else {
                    Context::LineComment
                }
            }
            Context::BlockComment => {
                if b == b'*' && next == Some(b'/') {
                    self.pos += 1;
                    self.context = Context::Code;
                }
                Context::BlockComment
            }
        };

        Some((i, b, tag))
    }
}

/// Whether byte offset `pos` of `text` is live code, not inside a comment or
/// a string.
pub fn is_live(text: &str, pos: usize) -> bool {
    let mut scanner = Scanner::new(text, 0);
    while scanner.pos < pos {
        if scanner.next().is_none() {
            break;
        }
    }
    // A two-byte delimiter can step past `pos`; it then sits inside the comment.
    scanner.pos == pos && scanner.context == Context::Code
}

/// Offset of the `}` matching the `{` at `open`, skipping braces inside
/// strings and comments.
pub fn closing_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (i, b, context) in Scanner::new(text, open + 1) {
        if context != Context::Code {
            continue;
        }
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closing_brace_skips_nested_maps_and_strings() {
        let text = "module \"x\" {\n  tags = { a = \"}\" }\n  name = \"${var.env}-dns\"\n}\n";
        let open = text.find('{').unwrap();
        assert_eq!(closing_brace(text, open), Some(text.len() - 2));
    }

    #[test]
    fn test_closing_brace_ignores_comments() {
        let text = "{ # }\n /* } */ }";
        assert_eq!(closing_brace(text, 0), Some(text.len() - 1));
        assert_eq!(closing_brace("{ { }", 0), None);
    }

    #[test]
    fn test_is_live() {
        let text = "a\n/*\nmodule\n*/\nmodule # module\nx = \"module\"\n";
        let offsets: Vec<usize> = text.match_indices("module").map(|(i, _)| i).collect();
        let live: Vec<bool> = offsets.iter().map(|&i| is_live(text, i)).collect();
        assert_eq!(live, vec![false, true, false, false]);
        assert!(is_live(text, 0));
        assert!(!is_live("/*x", 1));
    }
}
