//! Minimal script tokenizer: splits text into code, comments and string
//! literals so pattern scans can skip what isn't code.
//!
//! Not a parser. Regex literals are read as code, which is wrong for
//! `/"/`-style patterns but keeps the state machine small.

/// What a span of script text is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Code,
    LineComment,
    BlockComment,
    /// `'...'` or `"..."`, quotes included.
    Str,
    /// Literal parts of a `` `...` `` template. `${...}` bodies are code.
    Template,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub start: usize,
    pub end: usize,
}

impl Segment {
    #[must_use]
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    #[must_use]
    pub const fn is_comment(&self) -> bool {
        matches!(self.kind, SegmentKind::LineComment | SegmentKind::BlockComment)
    }
}

/// Split `text` into consecutive segments covering every byte.
/// Unterminated comments and strings run to the end of the text (strings
/// stop at the end of their line, as the language does).
#[must_use]
pub fn segments(text: &str) -> Vec<Segment> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    // One entry per open `${`: the brace depth inside that interpolation.
    let mut interpolations: Vec<u32> = Vec::new();
    let mut code_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        let (kind, end) = match (b, next) {
            (b'/', Some(b'/')) => {
                let end = memchr::memchr(b'\n', &bytes[i..]).map_or(bytes.len(), |n| i + n);
                (SegmentKind::LineComment, end)
            }
            (b'/', Some(b'*')) => {
                let end = memchr::memmem::find(&bytes[i + 2..], b"*/")
                    .map_or(bytes.len(), |n| i + 2 + n + 2);
                (SegmentKind::BlockComment, end)
            }
            (b'\'' | b'"', _) => (SegmentKind::Str, scan_quoted(bytes, i, b)),
            (b'`', _) => {
                let (end, opened) = scan_template(bytes, i + 1);
                push(&mut out, SegmentKind::Code, code_start, i);
                push(&mut out, SegmentKind::Template, i, end);
                if opened {
                    interpolations.push(0);
                }
                code_start = end;
                i = end;
                continue;
            }
            (b'{', _) if !interpolations.is_empty() => {
                if let Some(depth) = interpolations.last_mut() {
                    *depth += 1;
                }
                i += 1;
                continue;
            }
            (b'}', _) if !interpolations.is_empty() => {
                let depth = interpolations.last().copied().unwrap_or(0);
                if depth > 0 {
                    if let Some(d) = interpolations.last_mut() {
                        *d -= 1;
                    }
                    i += 1;
                    continue;
                }
                // Closing `}` of `${`: resume the template.
                interpolations.pop();
                push(&mut out, SegmentKind::Code, code_start, i);
                let (end, opened) = scan_template(bytes, i + 1);
                push(&mut out, SegmentKind::Template, i, end);
                if opened {
                    interpolations.push(0);
                }
                code_start = end;
                i = end;
                continue;
            }
            _ => {
                i += 1;
                continue;
            }
        };
        push(&mut out, SegmentKind::Code, code_start, i);
        push(&mut out, kind, i, end);
        code_start = end;
        i = end;
    }
    push(&mut out, SegmentKind::Code, code_start, bytes.len());
    out
}

fn push(out: &mut Vec<Segment>, kind: SegmentKind, start: usize, end: usize) {
    if end > start {
        out.push(Segment { kind, start, end });
    }
}

/// End offset (exclusive) of a quoted string starting at `start`.
fn scan_quoted(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Scan template literal text from `i` until the closing backtick or a
/// `${`. Returns the end offset and whether an interpolation was opened.
fn scan_template(bytes: &[u8], mut i: usize) -> (usize, bool) {
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => return (i + 1, false),
            b'$' if bytes.get(i + 1) == Some(&b'{') => return (i + 2, true),
            _ => i += 1,
        }
    }
    (bytes.len(), false)
}

/// Copy of `text` with every comment and string byte blanked to a space
/// (newlines kept). Byte offsets and line numbers are unchanged, so matches
/// found in the mask map straight back onto the original text.
#[must_use]
pub fn code_mask(text: &str) -> String {
    let mut bytes = text.as_bytes().to_vec();
    for seg in segments(text) {
        if seg.kind == SegmentKind::Code {
            continue;
        }
        for b in &mut bytes[seg.start..seg.end] {
            if *b != b'\n' {
                *b = b' ';
            }
        }
    }
    // Only whole segments were blanked, and those start and end on ASCII
    // delimiters, so the result is still UTF-8.
    String::from_utf8(bytes).unwrap_or_default()
}
