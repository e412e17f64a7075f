//! Locating and replacing the embedded literal inside an artifact.
//!
//! An artifact is arbitrary text containing one `const <BINDING> = <literal>;`
//! statement. The literal span is found by scanning bracket depth while
//! skipping strings and comments, so a `};` inside a string value does not end
//! the span early. Everything outside the span is carried through a write-back
//! byte for byte.

use crate::domain::error::PendtagError;
use serde_json::Value;

/// Byte range of the literal within the artifact text, `start..end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiteralSpan {
    pub start: usize,
    pub end: usize,
}

/// Artifact text paired with the located literal span.
#[derive(Debug, Clone)]
pub struct Artifact {
    text: String,
    binding: String,
    span: LiteralSpan,
}

impl Artifact {
    pub fn locate(text: String, binding: &str) -> Result<Self, PendtagError> {
        let span = locate(&text, binding)?;
        Ok(Self {
            text,
            binding: binding.to_string(),
            span,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn binding(&self) -> &str {
        &self.binding
    }

    pub fn span(&self) -> LiteralSpan {
        self.span
    }

    pub fn literal(&self) -> &str {
        &self.text[self.span.start..self.span.end]
    }

    /// The artifact text with the literal span replaced.
    pub fn with_literal(&self, replacement: &str) -> String {
        splice(&self.text, self.span, replacement)
    }
}

/// Find the literal assigned to `binding`.
pub fn locate(text: &str, binding: &str) -> Result<LiteralSpan, PendtagError> {
    let not_found = || PendtagError::BindingNotFound {
        binding: binding.to_string(),
    };
    if binding.is_empty() {
        return Err(not_found());
    }

    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find(binding) {
        let name_start = search_from + offset;
        let name_end = name_start + binding.len();
        search_from = name_end;

        if !preceded_by_const(text, name_start) || starts_identifier(&text[name_end..]) {
            continue;
        }
        let Some(open) = literal_start(text, name_end) else {
            continue;
        };
        return match matching_close(text, open) {
            Some(close) => Ok(LiteralSpan {
                start: open,
                end: close + 1,
            }),
            None => Err(not_found()),
        };
    }
    Err(not_found())
}

/// Replace `span` in `text` with `replacement`, leaving every other byte intact.
pub fn splice(text: &str, span: LiteralSpan, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len() - (span.end - span.start) + replacement.len());
    out.push_str(&text[..span.start]);
    out.push_str(replacement);
    out.push_str(&text[span.end..]);
    out
}

/// Pretty-print a literal with two-space indentation in stored key order.
pub fn render(value: &Value) -> String {
    format!("{:#}", value)
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

fn starts_identifier(rest: &str) -> bool {
    rest.chars().next().is_some_and(is_ident_char)
}

/// `const` keyword, then at least one whitespace character, directly before `name_start`.
fn preceded_by_const(text: &str, name_start: usize) -> bool {
    let before = &text[..name_start];
    let trimmed = before.trim_end();
    if trimmed.len() == before.len() {
        return false;
    }
    let Some(head) = trimmed.strip_suffix("const") else {
        return false;
    };
    !head.chars().next_back().is_some_and(is_ident_char)
}

/// Position of the opening bracket after `= `, if the binding is followed by one.
fn literal_start(text: &str, name_end: usize) -> Option<usize> {
    let rest = &text[name_end..];
    let after_ws = rest.trim_start();
    let after_eq = after_ws.strip_prefix('=')?;
    let value = after_eq.trim_start();
    if value.starts_with('{') || value.starts_with('[') {
        Some(text.len() - value.len())
    } else {
        None
    }
}

#[derive(Clone, Copy, PartialEq)]
enum ScanState {
    Code,
    Str(char),
    LineComment,
    BlockComment,
}

/// Index of the bracket closing the one at `open`, skipping strings and comments.
fn matching_close(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth: usize = 0;
    let mut state = ScanState::Code;
    let mut i = open;

    // Only ASCII bytes are significant here; multi-byte UTF-8 sequences never
    // contain bytes in the ASCII range.
    while i < bytes.len() {
        let b = bytes[i];
        match state {
            ScanState::Code => match b {
                b'{' | b'[' => depth += 1,
                b'}' | b']' => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                b'"' | b'\'' | b'`' => state = ScanState::Str(b as char),
                b'/' if bytes.get(i + 1) == Some(&b'/') => {
                    state = ScanState::LineComment;
                    i += 1;
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    state = ScanState::BlockComment;
                    i += 1;
                }
                _ => {}
            },
            ScanState::Str(quote) => {
                if b == b'\\' {
                    i += 1;
                } else if b as char == quote {
                    state = ScanState::Code;
                }
            }
            ScanState::LineComment => {
                if b == b'\n' {
                    state = ScanState::Code;
                }
            }
            ScanState::BlockComment => {
                if b == b'*' && bytes.get(i + 1) == Some(&b'/') {
                    state = ScanState::Code;
                    i += 1;
                }
            }
        }
        i += 1;
    }
    None
}
