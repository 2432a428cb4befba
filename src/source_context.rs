// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Byte-level source classification for Zig code.
//!
//! Classifies every byte of a source buffer as code, line comment,
//! string, character literal, or multiline-string content so the
//! analyzers never match patterns inside text that only looks like
//! code. Zig has no block comments; `//` always runs to the end of the
//! line.

/// Lexical class of a single source byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteClass {
    /// Real code
    Code,
    /// Inside a `//` comment, including doc comments
    LineComment,
    /// Inside a double-quoted string literal
    String,
    /// Inside a single-quoted character literal
    Char,
    /// Content of a `\\` multiline string line
    MultilineString
}

/// Per-byte classification of a source buffer.
///
/// Built once per file with a single left-to-right pass and queried by
/// the scope tracker and analyzers. Invalid UTF-8 is treated as opaque
/// bytes; classification never decodes code points.
///
/// # Examples
///
/// ```
/// use zigcheck::source_context::SourceContext;
///
/// let ctx = SourceContext::new("const x = 1; // trailing\n");
/// assert!(ctx.is_code(0));
/// assert!(!ctx.is_code(14));
/// ```
#[derive(Debug)]
pub struct SourceContext {
    classes:     Vec<ByteClass>,
    line_starts: Vec<usize>
}

impl SourceContext {
    /// Classify a source buffer.
    ///
    /// A UTF-8 byte-order mark at the start of the file is skipped.
    /// Unterminated strings and character literals close at the end of
    /// their line (or at EOF); no diagnostic is emitted here.
    ///
    /// # Arguments
    ///
    /// * `source` - Raw source text
    ///
    /// # Returns
    ///
    /// Classification index for the whole buffer
    pub fn new(source: &str) -> Self {
        let bytes = source.as_bytes();
        let mut classes = vec![ByteClass::Code; bytes.len()];
        let mut line_starts = vec![0];

        let mut i = 0;
        if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
            i = 3;
        }

        let mut at_line_start = true;
        while i < bytes.len() {
            if at_line_start {
                // A line whose first non-whitespace bytes are `\\` is
                // multiline-string content through the newline.
                let mut j = i;
                while j < bytes.len() && (bytes[j] == b' ' || bytes[j] == b'\t') {
                    j += 1;
                }
                if j + 1 < bytes.len() && bytes[j] == b'\\' && bytes[j + 1] == b'\\' {
                    while j < bytes.len() && bytes[j] != b'\n' {
                        classes[j] = ByteClass::MultilineString;
                        j += 1;
                    }
                    i = j;
                    at_line_start = false;
                    continue;
                }
                at_line_start = false;
            }

            match bytes[i] {
                b'\n' => {
                    line_starts.push(i + 1);
                    at_line_start = true;
                    i += 1;
                }
                b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'/' => {
                    while i < bytes.len() && bytes[i] != b'\n' {
                        classes[i] = ByteClass::LineComment;
                        i += 1;
                    }
                }
                b'"' => {
                    classes[i] = ByteClass::String;
                    i += 1;
                    while i < bytes.len() && bytes[i] != b'"' && bytes[i] != b'\n' {
                        classes[i] = ByteClass::String;
                        if bytes[i] == b'\\' && i + 1 < bytes.len() && bytes[i + 1] != b'\n' {
                            classes[i + 1] = ByteClass::String;
                            i += 1;
                        }
                        i += 1;
                    }
                    if i < bytes.len() && bytes[i] == b'"' {
                        classes[i] = ByteClass::String;
                        i += 1;
                    }
                }
                b'\'' => {
                    classes[i] = ByteClass::Char;
                    i += 1;
                    while i < bytes.len() && bytes[i] != b'\'' && bytes[i] != b'\n' {
                        classes[i] = ByteClass::Char;
                        if bytes[i] == b'\\' && i + 1 < bytes.len() && bytes[i + 1] != b'\n' {
                            classes[i + 1] = ByteClass::Char;
                            i += 1;
                        }
                        i += 1;
                    }
                    if i < bytes.len() && bytes[i] == b'\'' {
                        classes[i] = ByteClass::Char;
                        i += 1;
                    }
                }
                _ => {
                    i += 1;
                }
            }
        }

        Self {
            classes,
            line_starts
        }
    }

    /// Lexical class of the byte at `offset`.
    ///
    /// Offsets past the end of the buffer report `Code`.
    pub fn class_at(&self, offset: usize) -> ByteClass {
        self.classes.get(offset).copied().unwrap_or(ByteClass::Code)
    }

    /// Whether the byte at `offset` is real code.
    pub fn is_code(&self, offset: usize) -> bool {
        self.class_at(offset) == ByteClass::Code
    }

    /// Whether every byte of `[start, start + len)` is real code.
    pub fn is_code_span(&self, start: usize, len: usize) -> bool {
        (start..start + len).all(|o| self.is_code(o))
    }

    /// Byte offset of the start of a 1-based line.
    ///
    /// # Arguments
    ///
    /// * `line` - Line number, 1-based
    ///
    /// # Returns
    ///
    /// Offset of the first byte of the line, or None past EOF
    pub fn line_start(&self, line: usize) -> Option<usize> {
        if line == 0 {
            return None;
        }
        self.line_starts.get(line - 1).copied()
    }

    /// Number of lines in the classified buffer.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Length of the classified buffer in bytes.
    pub fn source_len(&self) -> usize {
        self.classes.len()
    }

    /// Check that `needle` occurs as real code on the given line.
    ///
    /// Scans every occurrence of `needle` in `line_text` and returns
    /// true only if at least one occurrence is fully classified as
    /// code. Occurrences inside comments, strings, character literals,
    /// or multiline-string content do not count.
    ///
    /// # Arguments
    ///
    /// * `line` - Line number, 1-based
    /// * `line_text` - Text of that line as sliced from the source
    /// * `needle` - Literal pattern to look for
    ///
    /// # Returns
    ///
    /// True if the pattern occurs in code context on the line
    pub fn validate_pattern(&self, line: usize, line_text: &str, needle: &str) -> bool {
        if needle.is_empty() {
            return false;
        }

        let Some(base) = self.line_start(line) else {
            return false;
        };

        let mut from = 0;
        while let Some(found) = line_text[from..].find(needle) {
            let start = from + found;
            if self.is_code_span(base + start, needle.len()) {
                return true;
            }
            from = start + 1;
        }

        false
    }

    /// Copy of a line with every non-code byte blanked to a space.
    ///
    /// The scope tracker matches keywords and braces against this view
    /// so comments and string contents can never open or close scopes.
    /// Non-ASCII and tab bytes are blanked too, which keeps the view
    /// pure ASCII with byte offsets identical to the raw line.
    ///
    /// # Arguments
    ///
    /// * `line` - Line number, 1-based
    /// * `line_text` - Text of that line as sliced from the source
    ///
    /// # Returns
    ///
    /// The line with non-code bytes replaced by spaces
    pub fn code_view(&self, line: usize, line_text: &str) -> String {
        let Some(base) = self.line_start(line) else {
            return String::new();
        };

        line_text
            .bytes()
            .enumerate()
            .map(|(i, b)| {
                if self.is_code(base + i) && b.is_ascii() && b != b'\t' {
                    b as char
                } else {
                    ' '
                }
            })
            .collect()
    }
}
